//! In-process capability catalog
//!
//! Maps locators to factories that build a capability's route set. A locator
//! with no registered factory, or whose factory fails, resolves to
//! `NotFound` with the reason attached.

use std::collections::HashMap;
use std::sync::Arc;

use crate::http::RouteSet;
use crate::module::traits::{CapabilityHandle, Resolution, Resolver};

type Factory = Arc<dyn Fn() -> Result<RouteSet, String> + Send + Sync>;

/// Locator-keyed capability catalog
#[derive(Clone, Default)]
pub struct CatalogResolver {
    factories: HashMap<String, Factory>,
}

impl CatalogResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for `locator`
    pub fn register<F>(&mut self, locator: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<RouteSet, String> + Send + Sync + 'static,
    {
        self.factories.insert(locator.into(), Arc::new(factory));
    }

    /// Whether a factory exists for `locator`
    pub fn contains(&self, locator: &str) -> bool {
        self.factories.contains_key(locator)
    }
}

impl Resolver for CatalogResolver {
    fn resolve(&self, locator: &str) -> Resolution {
        let Some(factory) = self.factories.get(locator) else {
            return Resolution::NotFound(format!("no capability installed for '{}'", locator));
        };

        match factory() {
            Ok(routes) => Resolution::Found(CapabilityHandle::new(routes)),
            Err(reason) => Resolution::NotFound(format!("'{}' failed to load: {}", locator, reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::json_response;
    use crate::http::route::{HttpRequest, HttpResponse};
    use http::StatusCode;

    async fn ok(_req: HttpRequest) -> HttpResponse {
        json_response(StatusCode::OK, &serde_json::json!({}))
    }

    #[test]
    fn test_resolve_registered() {
        let mut catalog = CatalogResolver::new();
        catalog.register("routers.review", || {
            RouteSet::builder()
                .get("/review", ok)
                .build()
                .map_err(|e| e.to_string())
        });

        match catalog.resolve("routers.review") {
            Resolution::Found(handle) => assert_eq!(handle.routes().len(), 1),
            Resolution::NotFound(reason) => panic!("unexpected: {}", reason),
        }
    }

    #[test]
    fn test_resolve_missing() {
        let catalog = CatalogResolver::new();
        match catalog.resolve("integrations.slack") {
            Resolution::NotFound(reason) => assert!(reason.contains("integrations.slack")),
            Resolution::Found(_) => panic!("expected NotFound"),
        }
    }

    #[test]
    fn test_resolve_failing_factory() {
        let mut catalog = CatalogResolver::new();
        catalog.register("integrations.pdf", || Err("missing native library".to_string()));

        match catalog.resolve("integrations.pdf") {
            Resolution::NotFound(reason) => assert!(reason.contains("missing native library")),
            Resolution::Found(_) => panic!("expected NotFound"),
        }
    }

    #[test]
    fn test_register_replaces_factory() {
        let mut catalog = CatalogResolver::new();
        catalog.register("a", || Err("first".to_string()));
        catalog.register("a", || Err("second".to_string()));
        assert!(catalog.contains("a"));
        assert!(!catalog.contains("c"));

        match catalog.resolve("a") {
            Resolution::NotFound(reason) => assert!(reason.contains("second")),
            Resolution::Found(_) => panic!("expected NotFound"),
        }
    }
}
