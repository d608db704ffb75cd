//! Service composition
//!
//! Builds the single, immutable route table the server dispatches against.
//! Mount order is fixed: required routes, then available app-domain
//! capabilities, then available integration-domain capabilities, each tier
//! in declaration order. The first matching route wins.

use futures::FutureExt;
use http::StatusCode;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, info, warn};

use super::cors::CorsPolicy;
use super::response::{empty, internal_error, method_not_allowed, not_found};
use super::route::{normalize_path, HttpRequest, HttpResponse, Route, RouteSet};
use crate::module::CapabilityDescriptor;

/// Where a mounted route came from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteOrigin {
    Required,
    Capability(String),
}

impl fmt::Display for RouteOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteOrigin::Required => write!(f, "required"),
            RouteOrigin::Capability(name) => write!(f, "capability '{}'", name),
        }
    }
}

#[derive(Clone)]
struct MountedRoute {
    origin: RouteOrigin,
    route: Route,
}

/// Builder for [`AssembledService`]
///
/// Domains may be supplied in any order; the output order is fixed.
pub struct ServiceComposer {
    required: RouteSet,
    app: Vec<CapabilityDescriptor>,
    integration: Vec<CapabilityDescriptor>,
    cors: CorsPolicy,
}

impl ServiceComposer {
    pub fn new(required: RouteSet) -> Self {
        Self {
            required,
            app: Vec::new(),
            integration: Vec::new(),
            cors: CorsPolicy::default(),
        }
    }

    /// App-domain descriptors, in declaration order
    pub fn app_domain(mut self, descriptors: &[CapabilityDescriptor]) -> Self {
        self.app = descriptors.to_vec();
        self
    }

    /// Integration-domain descriptors, in declaration order
    pub fn integration_domain(mut self, descriptors: &[CapabilityDescriptor]) -> Self {
        self.integration = descriptors.to_vec();
        self
    }

    /// Assemble the final route table
    pub fn build(self) -> AssembledService {
        let mut routes: Vec<MountedRoute> = self
            .required
            .routes()
            .iter()
            .map(|route| MountedRoute {
                origin: RouteOrigin::Required,
                route: route.clone(),
            })
            .collect();

        let mut owners: HashMap<(http::Method, String), RouteOrigin> = routes
            .iter()
            .map(|m| {
                (
                    (m.route.method().clone(), m.route.path().to_string()),
                    m.origin.clone(),
                )
            })
            .collect();

        let mut mounted_capabilities = 0usize;
        for descriptor in self.app.iter().chain(self.integration.iter()) {
            let Some(handle) = descriptor.handle() else {
                continue;
            };
            let origin = RouteOrigin::Capability(descriptor.name().to_string());

            for route in handle.routes().routes() {
                let key = (route.method().clone(), route.path().to_string());
                if let Some(owner) = owners.get(&key) {
                    warn!(
                        "Route {} {} from {} is shadowed by {}",
                        route.method(),
                        route.path(),
                        origin,
                        owner
                    );
                } else {
                    owners.insert(key, origin.clone());
                }
                routes.push(MountedRoute {
                    origin: origin.clone(),
                    route: route.clone(),
                });
            }
            mounted_capabilities += 1;
        }

        info!(
            routes = routes.len(),
            capabilities = mounted_capabilities,
            "Assembled service with {} routes from {} capabilities",
            routes.len(),
            mounted_capabilities
        );

        AssembledService {
            routes,
            cors: self.cors,
        }
    }
}

/// Compose `required` with both capability domains
pub fn compose(
    required: RouteSet,
    app: &[CapabilityDescriptor],
    integration: &[CapabilityDescriptor],
) -> AssembledService {
    ServiceComposer::new(required)
        .app_domain(app)
        .integration_domain(integration)
        .build()
}

/// Immutable, ordered route table plus the response policy
pub struct AssembledService {
    routes: Vec<MountedRoute>,
    cors: CorsPolicy,
}

impl AssembledService {
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Mounted routes in resolution order
    pub fn route_table(&self) -> Vec<(RouteOrigin, http::Method, String)> {
        self.routes
            .iter()
            .map(|m| {
                (
                    m.origin.clone(),
                    m.route.method().clone(),
                    m.route.path().to_string(),
                )
            })
            .collect()
    }

    /// Route one request and apply the cross-origin policy to the response
    pub async fn dispatch(&self, req: HttpRequest) -> HttpResponse {
        let mut response = if CorsPolicy::is_preflight(req.method(), req.headers()) {
            empty(StatusCode::OK)
        } else {
            self.route(req).await
        };
        self.cors.apply(response.headers_mut());
        response
    }

    async fn route(&self, req: HttpRequest) -> HttpResponse {
        let target = format!("{} {}", req.method(), req.uri().path());
        let path = normalize_path(req.uri().path());

        let mut path_matched = false;
        let mut handler = None;
        for mounted in &self.routes {
            if mounted.route.path() != path {
                continue;
            }
            path_matched = true;
            if mounted.route.method() == req.method() {
                handler = Some(mounted.route.handler());
                break;
            }
        }

        let Some(handler) = handler else {
            debug!("No route for {}", target);
            return if path_matched {
                method_not_allowed()
            } else {
                not_found()
            };
        };

        match AssertUnwindSafe(handler.call(req)).catch_unwind().await {
            Ok(response) => response,
            Err(_) => {
                error!("Handler for {} panicked", target);
                internal_error()
            }
        }
    }
}

impl fmt::Debug for AssembledService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|m| format!("{} ({})", m.route.path(), m.origin)))
            .finish()
    }
}
