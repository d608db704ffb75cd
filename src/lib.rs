//! BRD Generation API - service composition and staged startup
//!
//! This crate provides the orchestration layer of the BRD Generation API:
//! optional capability discovery, deterministic route composition, and a
//! staged startup lifecycle that tolerates degraded initialization.
//!
//! ## Startup Flow
//!
//! 1. `ModuleRegistry` resolves declared capabilities (never fails as a whole)
//! 2. `ServiceComposer` assembles required + available capability routes
//! 3. The host binds the listener and starts serving
//! 4. `StartupSequencer` runs deferred storage initialization, then reports ready
//!
//! ## Design Principles
//!
//! 1. **Fail-Open Discovery**: A missing capability is a diagnostic, not an error
//! 2. **Immutable Composition**: The assembled route table never changes after boot
//! 3. **Degraded, Not Dead**: Storage failure never prevents the service from serving
//! 4. **Unconditional Liveness**: `GET /` answers whenever the listener is up

pub mod config;
pub mod error;
pub mod http;
pub mod module;
pub mod service;
pub mod storage;
pub mod utils;

pub use config::{CapabilitiesConfig, CapabilitySpec, ServiceConfig};
pub use error::ServiceError;
pub use crate::http::{AssembledService, HealthProbe, ServiceComposer};
pub use module::{CapabilityDescriptor, ModuleRegistry, Resolution, Resolver};
pub use service::{InitOutcome, StartupSequencer, StartupState};
pub use storage::Storage;
