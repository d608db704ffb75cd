//! Storage layer for brd-api
//!
//! The database is opened lazily by [`Storage::initialize`], which the
//! startup sequencer runs after the listener is already serving. The opened
//! handles are published exactly once; until then (or if opening failed)
//! every session operation reports the storage as not ready.

pub mod database;
pub mod sessions;

use database::{create_database, fallback_backend, Database, DatabaseBackend, Tree, SESSIONS_TREE};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::{debug, info};

pub use sessions::{NewSession, SessionRecord, SessionStatus};

/// Deferred initialization errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InitError {
    #[error("Failed to prepare data directory {path}: {reason}")]
    DataDir { path: String, reason: String },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Session operation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage is still initializing")]
    NotInitialized,

    #[error("Storage is unavailable: {0}")]
    Unavailable(String),

    #[error("Storage operation failed: {0}")]
    Operation(String),

    #[error("Corrupt session record: {0}")]
    Corrupt(String),
}

/// Observable initialization state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Ready,
    Failed(String),
}

impl Readiness {
    /// Short label used in 503 bodies
    pub fn label(&self) -> &'static str {
        match self {
            Readiness::Pending => "initializing",
            Readiness::Ready => "ready",
            Readiness::Failed(_) => "unavailable",
        }
    }
}

/// Heavy initialization run by the startup sequencer
pub trait StorageBackend: Send + Sync {
    /// Perform (or replay the outcome of) initialization; blocking
    fn initialize(&self) -> Result<(), InitError>;

    /// Current initialization state
    fn readiness(&self) -> Readiness;
}

/// Session persistence used by the required routes
pub trait SessionStore: Send + Sync {
    /// All sessions, newest first
    fn list_sessions(&self) -> Result<Vec<SessionRecord>, StorageError>;

    /// Persist a new session and return the stored record
    fn insert_session(&self, new: NewSession) -> Result<SessionRecord, StorageError>;
}

struct Published {
    db: Arc<dyn Database>,
    sessions: Arc<dyn Tree>,
}

/// Lazily opened key-value storage
pub struct Storage {
    data_dir: PathBuf,
    backend: DatabaseBackend,
    published: OnceLock<Result<Published, InitError>>,
}

impl Storage {
    /// Describe storage without touching the filesystem
    pub fn new<P: AsRef<Path>>(data_dir: P, backend: DatabaseBackend) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            backend,
            published: OnceLock::new(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Flush pending writes if the database is open
    pub fn flush(&self) -> anyhow::Result<()> {
        match self.published.get() {
            Some(Ok(published)) => published.db.flush(),
            _ => Ok(()),
        }
    }

    fn open(&self) -> Result<Published, InitError> {
        std::fs::create_dir_all(&self.data_dir).map_err(|e| InitError::DataDir {
            path: self.data_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let db = match create_database(&self.data_dir, self.backend) {
            Ok(db) => db,
            Err(primary) => match fallback_backend(self.backend) {
                Some(fallback) => {
                    // Reported once, by the caller, if the fallback fails too
                    debug!(
                        "Failed to initialize {:?} backend: {}. Falling back to {:?}.",
                        self.backend, primary, fallback
                    );
                    let db = create_database(&self.data_dir, fallback).map_err(|e| {
                        InitError::Backend(format!(
                            "Failed to initialize {:?} backend: {}; fallback backend {:?} also failed: {}",
                            self.backend, primary, fallback, e
                        ))
                    })?;
                    info!("Using fallback {:?} backend", fallback);
                    db
                }
                None => {
                    return Err(InitError::Backend(format!(
                        "Failed to initialize {:?} backend: {}. No fallback backend available.",
                        self.backend, primary
                    )));
                }
            },
        };

        let db: Arc<dyn Database> = Arc::from(db);
        let sessions: Arc<dyn Tree> = Arc::from(
            db.open_tree(SESSIONS_TREE)
                .map_err(|e| InitError::Backend(e.to_string()))?,
        );

        info!("Storage opened at {}", self.data_dir.display());
        Ok(Published { db, sessions })
    }

    fn sessions_tree(&self) -> Result<&Arc<dyn Tree>, StorageError> {
        match self.published.get() {
            None => Err(StorageError::NotInitialized),
            Some(Err(e)) => Err(StorageError::Unavailable(e.to_string())),
            Some(Ok(published)) => Ok(&published.sessions),
        }
    }
}

impl StorageBackend for Storage {
    fn initialize(&self) -> Result<(), InitError> {
        debug!("Initializing storage at {}", self.data_dir.display());
        match self.published.get_or_init(|| self.open()) {
            Ok(_) => Ok(()),
            Err(e) => Err(e.clone()),
        }
    }

    fn readiness(&self) -> Readiness {
        match self.published.get() {
            None => Readiness::Pending,
            Some(Ok(_)) => Readiness::Ready,
            Some(Err(e)) => Readiness::Failed(e.to_string()),
        }
    }
}

impl SessionStore for Storage {
    fn list_sessions(&self) -> Result<Vec<SessionRecord>, StorageError> {
        let tree = self.sessions_tree()?;
        let mut records = Vec::new();
        for item in tree.iter() {
            let (_, value) = item.map_err(|e| StorageError::Operation(e.to_string()))?;
            let record: SessionRecord = serde_json::from_slice(&value)
                .map_err(|e| StorageError::Corrupt(e.to_string()))?;
            records.push(record);
        }
        records.reverse();
        Ok(records)
    }

    fn insert_session(&self, new: NewSession) -> Result<SessionRecord, StorageError> {
        let tree = self.sessions_tree()?;
        let record = SessionRecord::create(new);
        let value =
            serde_json::to_vec(&record).map_err(|e| StorageError::Corrupt(e.to_string()))?;
        tree.insert(&record.storage_key(), &value)
            .map_err(|e| StorageError::Operation(e.to_string()))?;
        debug!(session = %record.id, "Session created");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn preferred_backend() -> DatabaseBackend {
        if cfg!(feature = "redb") {
            DatabaseBackend::Redb
        } else {
            DatabaseBackend::Sled
        }
    }

    fn new_session(name: &str) -> NewSession {
        NewSession {
            name: name.to_string(),
            description: "from test".to_string(),
            status: SessionStatus::Active,
        }
    }

    #[test]
    fn test_operations_before_initialize() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path(), preferred_backend());

        assert_eq!(storage.readiness(), Readiness::Pending);
        assert_eq!(storage.list_sessions(), Err(StorageError::NotInitialized));
        assert_eq!(
            storage.insert_session(new_session("early")),
            Err(StorageError::NotInitialized)
        );
    }

    #[test]
    fn test_initialize_then_insert_and_list() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path().join("nested"), preferred_backend());

        storage.initialize().unwrap();
        assert_eq!(storage.readiness(), Readiness::Ready);

        let first = storage.insert_session(new_session("first")).unwrap();
        let listed = storage.list_sessions().unwrap();
        assert_eq!(listed, vec![first]);
        storage.flush().unwrap();
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::new(temp_dir.path(), preferred_backend());
        storage.initialize().unwrap();
        storage.initialize().unwrap();
        assert_eq!(storage.readiness(), Readiness::Ready);
    }

    #[test]
    fn test_failed_initialize_is_replayed() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the data directory should be
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let storage = Storage::new(&blocker, preferred_backend());

        let first = storage.initialize().unwrap_err();
        let second = storage.initialize().unwrap_err();
        assert_eq!(first, second);
        assert!(matches!(storage.readiness(), Readiness::Failed(_)));
        assert!(matches!(
            storage.list_sessions(),
            Err(StorageError::Unavailable(_))
        ));
    }

    #[test]
    fn test_readiness_labels() {
        assert_eq!(Readiness::Pending.label(), "initializing");
        assert_eq!(Readiness::Failed("x".into()).label(), "unavailable");
    }
}
