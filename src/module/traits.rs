//! Capability module traits and descriptors
//!
//! Defines the resolution seam between the registry and whatever knows how to
//! produce a capability's routes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::http::RouteSet;

/// Which tier a capability is mounted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityDomain {
    /// Application-domain routers (mounted first)
    App,
    /// External integration routers (mounted after the app domain)
    Integration,
}

impl fmt::Display for CapabilityDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityDomain::App => write!(f, "app"),
            CapabilityDomain::Integration => write!(f, "integration"),
        }
    }
}

/// Opaque handle to a capability's routing contribution
///
/// Cheap to clone; the route set behind it is immutable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapabilityHandle(Arc<RouteSet>);

impl CapabilityHandle {
    pub fn new(routes: RouteSet) -> Self {
        Self(Arc::new(routes))
    }

    pub fn routes(&self) -> &RouteSet {
        &self.0
    }
}

/// Outcome of resolving a single locator
#[derive(Debug, Clone)]
pub enum Resolution {
    Found(CapabilityHandle),
    NotFound(String),
}

/// Name-based capability resolution
///
/// Implementations must be total: every locator yields a [`Resolution`].
pub trait Resolver: Send + Sync {
    fn resolve(&self, locator: &str) -> Resolution;
}

/// Resolution status carried by a descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityStatus {
    Available(CapabilityHandle),
    Unavailable { diagnostic: String },
}

/// Discovery-time record of one capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityDescriptor {
    name: String,
    locator: String,
    status: CapabilityStatus,
}

impl CapabilityDescriptor {
    pub fn available(name: impl Into<String>, locator: impl Into<String>, handle: CapabilityHandle) -> Self {
        Self {
            name: name.into(),
            locator: locator.into(),
            status: CapabilityStatus::Available(handle),
        }
    }

    pub fn unavailable(
        name: impl Into<String>,
        locator: impl Into<String>,
        diagnostic: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            locator: locator.into(),
            status: CapabilityStatus::Unavailable {
                diagnostic: diagnostic.into(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    pub fn status(&self) -> &CapabilityStatus {
        &self.status
    }

    pub fn is_available(&self) -> bool {
        matches!(self.status, CapabilityStatus::Available(_))
    }

    /// Routing handle, present iff available
    pub fn handle(&self) -> Option<&CapabilityHandle> {
        match &self.status {
            CapabilityStatus::Available(handle) => Some(handle),
            CapabilityStatus::Unavailable { .. } => None,
        }
    }

    /// Diagnostic, present iff unavailable
    pub fn diagnostic(&self) -> Option<&str> {
        match &self.status {
            CapabilityStatus::Available(_) => None,
            CapabilityStatus::Unavailable { diagnostic } => Some(diagnostic),
        }
    }
}

/// Capability resolution errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModuleError {
    #[error("Capability not found: {0}")]
    ModuleNotFound(String),

    #[error("Capability disabled by configuration")]
    Disabled,

    #[error("Capability panicked during resolution: {0}")]
    ResolverPanicked(String),
}
