//! Capability registry and discovery
//!
//! Handles locator resolution and descriptor production.

pub mod catalog;
pub mod discovery;

pub use catalog::CatalogResolver;
pub use discovery::ModuleRegistry;
