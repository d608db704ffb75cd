//! Capability discovery
//!
//! Resolves declared capability specs into descriptors. Discovery is total:
//! every spec produces exactly one descriptor, in input order, and a failure
//! for one spec never stops evaluation of the rest.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::CapabilitySpec;
use crate::error::ServiceError;
use crate::module::traits::{CapabilityDescriptor, ModuleError, Resolution, Resolver};

/// Registry that turns capability specs into availability descriptors
#[derive(Clone)]
pub struct ModuleRegistry {
    resolver: Arc<dyn Resolver>,
}

impl ModuleRegistry {
    /// Create a registry backed by `resolver`
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self { resolver }
    }

    /// Discover every spec in order
    ///
    /// Emits exactly one warning per unavailable capability.
    pub fn discover(&self, specs: &[CapabilitySpec]) -> Vec<CapabilityDescriptor> {
        let descriptors: Vec<CapabilityDescriptor> =
            specs.iter().map(|spec| self.discover_one(spec)).collect();

        let available = descriptors.iter().filter(|d| d.is_available()).count();
        info!(
            available,
            unavailable = descriptors.len() - available,
            "Discovered {} of {} capabilities",
            available,
            descriptors.len()
        );
        descriptors
    }

    fn discover_one(&self, spec: &CapabilitySpec) -> CapabilityDescriptor {
        match self.resolve(spec) {
            Ok(descriptor) => {
                debug!(
                    capability = %spec.name,
                    locator = %spec.locator,
                    "Capability available"
                );
                descriptor
            }
            Err(e) => {
                let diagnostic = e.to_string();
                let unavailable = ServiceError::CapabilityUnavailable {
                    name: spec.name.clone(),
                    reason: diagnostic.clone(),
                };
                warn!(
                    capability = %spec.name,
                    locator = %spec.locator,
                    "Skipping optional capability: {}",
                    unavailable
                );
                CapabilityDescriptor::unavailable(&spec.name, &spec.locator, diagnostic)
            }
        }
    }

    fn resolve(&self, spec: &CapabilitySpec) -> Result<CapabilityDescriptor, ModuleError> {
        if !spec.enabled {
            return Err(ModuleError::Disabled);
        }

        let resolver = &self.resolver;
        let resolution = catch_unwind(AssertUnwindSafe(|| resolver.resolve(&spec.locator)))
            .map_err(|payload| ModuleError::ResolverPanicked(panic_message(payload.as_ref())))?;

        match resolution {
            Resolution::Found(handle) => Ok(CapabilityDescriptor::available(
                &spec.name,
                &spec.locator,
                handle,
            )),
            Resolution::NotFound(reason) => Err(ModuleError::ModuleNotFound(reason)),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
