//! Capability availability report (`GET /capabilities`)

use http::StatusCode;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use super::response::json_response;
use super::route::{HttpRequest, RouteSetBuilder};
use crate::module::{CapabilityDescriptor, CapabilityDomain};

/// One reported capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityReportEntry {
    pub name: String,
    pub locator: String,
    pub domain: CapabilityDomain,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

/// Snapshot of discovery results, in resolved order
#[derive(Debug, Clone, Default)]
pub struct CapabilityReport {
    entries: Arc<Vec<CapabilityReportEntry>>,
}

impl CapabilityReport {
    pub fn new(app: &[CapabilityDescriptor], integration: &[CapabilityDescriptor]) -> Self {
        let tagged = app
            .iter()
            .map(|d| (CapabilityDomain::App, d))
            .chain(integration.iter().map(|d| (CapabilityDomain::Integration, d)));

        let entries = tagged
            .map(|(domain, d)| CapabilityReportEntry {
                name: d.name().to_string(),
                locator: d.locator().to_string(),
                domain,
                status: if d.is_available() { "available" } else { "unavailable" },
                diagnostic: d.diagnostic().map(str::to_string),
            })
            .collect();

        Self {
            entries: Arc::new(entries),
        }
    }

    pub fn entries(&self) -> &[CapabilityReportEntry] {
        &self.entries
    }

    pub fn unavailable(&self) -> impl Iterator<Item = &CapabilityReportEntry> {
        self.entries.iter().filter(|e| e.diagnostic.is_some())
    }

    /// Add `GET /capabilities` to a route set
    pub fn mount(&self, builder: RouteSetBuilder) -> RouteSetBuilder {
        let entries = Arc::clone(&self.entries);
        builder.get("/capabilities", move |_req: HttpRequest| {
            let entries = Arc::clone(&entries);
            async move { json_response(StatusCode::OK, &json!({ "capabilities": entries.as_slice() })) }
        })
    }
}
