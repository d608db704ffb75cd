//! Liveness endpoint
//!
//! `GET /` depends on nothing but the process being up: not storage, not
//! capability availability, not startup state.

use http::StatusCode;
use serde::Serialize;
use std::sync::Arc;

use super::response::json_response;
use super::route::{HttpRequest, RouteSetBuilder};

/// Body of the health response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub message: String,
}

/// Dependency-free status probe
#[derive(Debug, Clone)]
pub struct HealthProbe {
    message: Arc<str>,
}

impl HealthProbe {
    /// Probe announcing `<service_name> is running.`
    pub fn new(service_name: &str) -> Self {
        Self {
            message: Arc::from(format!("{} is running.", service_name)),
        }
    }

    pub fn status(&self) -> HealthStatus {
        HealthStatus {
            status: "ok",
            message: self.message.to_string(),
        }
    }

    /// Add `GET /` to a route set
    pub fn mount(&self, builder: RouteSetBuilder) -> RouteSetBuilder {
        let probe = self.clone();
        builder.get("/", move |_req: HttpRequest| {
            let status = probe.status();
            async move { json_response(StatusCode::OK, &status) }
        })
    }
}
