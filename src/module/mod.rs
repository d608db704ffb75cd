//! Optional capability modules
//!
//! Capabilities are optional, independently loadable units that contribute
//! request-handling routes to the service.
//!
//! ## Architecture
//!
//! - **Resolution**: A [`Resolver`] maps a stable locator to a route set or a reason
//! - **Discovery**: [`ModuleRegistry`] resolves every declared spec, in order, once at boot
//! - **Fail-Open**: An unresolvable capability becomes a descriptor with a diagnostic
//! - **All-or-Nothing**: A capability contributes its whole route set or nothing

pub mod builtin;
pub mod registry;
pub mod traits;

pub use builtin::builtin_catalog;
pub use registry::{CatalogResolver, ModuleRegistry};
pub use traits::{
    CapabilityDescriptor, CapabilityDomain, CapabilityHandle, CapabilityStatus, ModuleError,
    Resolution, Resolver,
};
