//! Session records
//!
//! Sessions are keyed by `created_at` (big-endian) followed by the id, so a
//! reverse scan yields newest first.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::current_timestamp;

/// Lifecycle status of a BRD session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Complete,
    #[default]
    Draft,
}

/// A stored session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: SessionStatus,
    /// Unix seconds
    pub created_at: u64,
}

/// Fields accepted when creating a session
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewSession {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: SessionStatus,
}

impl SessionRecord {
    /// Materialize a new record with a fresh id and the current time
    pub fn create(new: NewSession) -> Self {
        Self::with_timestamp(new, current_timestamp())
    }

    pub(crate) fn with_timestamp(new: NewSession, created_at: u64) -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("sess_{}", &uuid[..8]),
            name: new.name,
            description: new.description,
            status: new.status,
            created_at,
        }
    }

    /// Storage key: timestamp then id
    pub fn storage_key(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(8 + self.id.len());
        key.extend_from_slice(&self.created_at.to_be_bytes());
        key.extend_from_slice(self.id.as_bytes());
        key
    }
}
