//! HTTP surface
//!
//! - [`route`]: route sets, the unit every contributor hands over
//! - [`composer`]: the immutable, ordered route table and its dispatch
//! - [`server`]: hyper accept loop with graceful draining
//! - [`health`], [`sessions`], [`capabilities`]: the required routes

pub mod capabilities;
pub mod composer;
pub mod cors;
pub mod health;
pub mod response;
pub mod route;
pub mod server;
pub mod sessions;

pub use capabilities::{CapabilityReport, CapabilityReportEntry};
pub use composer::{compose, AssembledService, RouteOrigin, ServiceComposer};
pub use cors::CorsPolicy;
pub use health::{HealthProbe, HealthStatus};
pub use route::{Handler, HttpRequest, HttpResponse, Route, RouteError, RouteSet, RouteSetBuilder};
pub use server::HttpServer;
