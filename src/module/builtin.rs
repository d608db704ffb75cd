//! Built-in capabilities compiled in behind cargo features
//!
//! Each built-in contributes an index route under its prefix announcing that
//! the capability is mounted. A capability whose feature is off is simply
//! absent from the catalog and resolves to `NotFound`.

use http::StatusCode;
use serde_json::json;

use crate::http::response::json_response;
use crate::http::route::HttpRequest;
use crate::http::RouteSet;
use crate::module::registry::CatalogResolver;
use crate::module::traits::CapabilityDomain;

pub const INGEST: &str = "routers.ingest";
pub const REVIEW: &str = "routers.review";
pub const BRD: &str = "routers.brd";
pub const GMAIL: &str = "integrations.gmail";
pub const SLACK: &str = "integrations.slack";
pub const PDF: &str = "integrations.pdf";

/// Build an index route set for a built-in capability
#[cfg_attr(
    not(any(
        feature = "cap-ingest",
        feature = "cap-review",
        feature = "cap-brd",
        feature = "cap-gmail",
        feature = "cap-slack",
        feature = "cap-pdf"
    )),
    allow(dead_code)
)]
fn index_routes(name: &'static str, domain: CapabilityDomain, prefix: &'static str) -> Result<RouteSet, String> {
    RouteSet::builder()
        .get(prefix, move |_req: HttpRequest| async move {
            json_response(
                StatusCode::OK,
                &json!({
                    "capability": name,
                    "domain": domain,
                    "status": "ok",
                }),
            )
        })
        .build()
        .map_err(|e| e.to_string())
}

/// Catalog of every built-in capability enabled at compile time
#[allow(unused_mut)]
pub fn builtin_catalog() -> CatalogResolver {
    let mut catalog = CatalogResolver::new();

    #[cfg(feature = "cap-ingest")]
    catalog.register(INGEST, || index_routes("ingest", CapabilityDomain::App, "/ingest"));
    #[cfg(feature = "cap-review")]
    catalog.register(REVIEW, || index_routes("review", CapabilityDomain::App, "/review"));
    #[cfg(feature = "cap-brd")]
    catalog.register(BRD, || index_routes("brd", CapabilityDomain::App, "/brd"));
    #[cfg(feature = "cap-gmail")]
    catalog.register(GMAIL, || {
        index_routes("gmail", CapabilityDomain::Integration, "/integrations/gmail")
    });
    #[cfg(feature = "cap-slack")]
    catalog.register(SLACK, || {
        index_routes("slack", CapabilityDomain::Integration, "/integrations/slack")
    });
    #[cfg(feature = "cap-pdf")]
    catalog.register(PDF, || {
        index_routes("pdf", CapabilityDomain::Integration, "/integrations/pdf")
    });

    catalog
}
