//! Route table primitives
//!
//! A [`RouteSet`] is the unit of contribution: required routes form one set,
//! and every capability resolves to exactly one set. Sets are validated when
//! built, so a set that exists is always mountable as a whole.

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, Request, Response};
use http_body_util::Full;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Response type produced by every handler
pub type HttpResponse = Response<Full<Bytes>>;

/// Request type seen by every handler (body already collected)
pub type HttpRequest = Request<Bytes>;

/// Request handler
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handle a single request
    async fn call(&self, req: HttpRequest) -> HttpResponse;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    async fn call(&self, req: HttpRequest) -> HttpResponse {
        (self)(req).await
    }
}

/// Route table errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Invalid route path: {0} (must start with '/')")]
    InvalidPath(String),

    #[error("Duplicate route: {0} {1}")]
    Duplicate(Method, String),

    #[error("Route set is empty")]
    Empty,
}

/// A single method + path binding
#[derive(Clone)]
pub struct Route {
    method: Method,
    path: String,
    handler: Arc<dyn Handler>,
}

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn handler(&self) -> Arc<dyn Handler> {
        Arc::clone(&self.handler)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Validated, ordered collection of routes
#[derive(Clone, Debug)]
pub struct RouteSet {
    routes: Vec<Route>,
}

impl RouteSet {
    /// Start building a route set
    pub fn builder() -> RouteSetBuilder {
        RouteSetBuilder::default()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Method/path pairs in declaration order
    pub fn signatures(&self) -> Vec<(Method, String)> {
        self.routes
            .iter()
            .map(|r| (r.method.clone(), r.path.clone()))
            .collect()
    }
}

impl PartialEq for RouteSet {
    fn eq(&self, other: &Self) -> bool {
        self.signatures() == other.signatures()
    }
}

impl Eq for RouteSet {}

/// Builder for [`RouteSet`]
#[derive(Default)]
pub struct RouteSetBuilder {
    routes: Vec<Route>,
}

impl RouteSetBuilder {
    /// Add a route for an arbitrary method
    pub fn route<H: Handler>(mut self, method: Method, path: impl Into<String>, handler: H) -> Self {
        self.routes.push(Route {
            method,
            path: path.into(),
            handler: Arc::new(handler),
        });
        self
    }

    pub fn get<H: Handler>(self, path: impl Into<String>, handler: H) -> Self {
        self.route(Method::GET, path, handler)
    }

    pub fn post<H: Handler>(self, path: impl Into<String>, handler: H) -> Self {
        self.route(Method::POST, path, handler)
    }

    /// Validate and freeze the set
    pub fn build(self) -> Result<RouteSet, RouteError> {
        if self.routes.is_empty() {
            return Err(RouteError::Empty);
        }

        let mut seen = HashSet::new();
        for route in &self.routes {
            if !route.path.starts_with('/') {
                return Err(RouteError::InvalidPath(route.path.clone()));
            }
            if !seen.insert((route.method.clone(), route.path.clone())) {
                return Err(RouteError::Duplicate(route.method.clone(), route.path.clone()));
            }
        }

        Ok(RouteSet {
            routes: self.routes,
        })
    }
}

/// Normalize a request path for matching (`/sessions/` matches `/sessions`)
pub fn normalize_path(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}
