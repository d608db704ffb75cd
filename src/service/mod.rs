//! Service bootstrap
//!
//! Wires discovery, composition, serving and the startup lifecycle together.
//! [`assemble`] is pure with respect to I/O; [`serve`] takes a listener the
//! host has already bound.

pub mod startup;

use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::http::{
    sessions, AssembledService, CapabilityReport, HealthProbe, HttpServer, RouteError, RouteSet,
    ServiceComposer,
};
use crate::module::{CapabilityDescriptor, CapabilityDomain, ModuleRegistry, Resolver};
use crate::storage::{SessionStore, StorageBackend};

pub use startup::{InitOutcome, StartupSequencer, StartupState};

/// Build the required route set: health, sessions, capability report
pub fn required_routes(
    health: &HealthProbe,
    store: Arc<dyn SessionStore>,
    report: &CapabilityReport,
) -> Result<RouteSet, RouteError> {
    let builder = health.mount(RouteSet::builder());
    let builder = sessions::mount(store, builder);
    report.mount(builder).build()
}

/// Everything produced before the listener starts serving
pub struct Bootstrap {
    pub service: AssembledService,
    pub app: Vec<CapabilityDescriptor>,
    pub integration: Vec<CapabilityDescriptor>,
    pub report: CapabilityReport,
}

fn discover_domains(
    config: &ServiceConfig,
    resolver: Arc<dyn Resolver>,
) -> (Vec<CapabilityDescriptor>, Vec<CapabilityDescriptor>) {
    let registry = ModuleRegistry::new(resolver);
    let app = registry.discover(config.capabilities.domain(CapabilityDomain::App));
    let integration = registry.discover(config.capabilities.domain(CapabilityDomain::Integration));
    (app, integration)
}

/// Result of a discovery-only availability check
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub report: CapabilityReport,
    pub passed: bool,
}

impl CheckOutcome {
    /// Number of declared capabilities that resolved
    pub fn available(&self) -> usize {
        self.report.entries().len() - self.report.unavailable().count()
    }
}

/// Resolve every declared capability without serving anything
///
/// Always passes unless `strict`, in which case any unavailable capability
/// (disabled ones included) fails the check.
pub fn check(config: &ServiceConfig, resolver: Arc<dyn Resolver>, strict: bool) -> CheckOutcome {
    let (app, integration) = discover_domains(config, resolver);
    let report = CapabilityReport::new(&app, &integration);
    let passed = !strict || report.unavailable().next().is_none();
    CheckOutcome { report, passed }
}

/// Discover capabilities and compose the service
///
/// Only a broken required route set is an error; unavailable capabilities
/// are reported in the returned descriptors.
pub fn assemble(
    config: &ServiceConfig,
    resolver: Arc<dyn Resolver>,
    store: Arc<dyn SessionStore>,
) -> Result<Bootstrap, ServiceError> {
    let (app, integration) = discover_domains(config, resolver);
    let report = CapabilityReport::new(&app, &integration);

    let health = HealthProbe::new(&config.service_name);
    let required = required_routes(&health, store, &report)?;

    let service = ServiceComposer::new(required)
        .app_domain(&app)
        .integration_domain(&integration)
        .build();

    Ok(Bootstrap {
        service,
        app,
        integration,
        report,
    })
}

/// Run the service on an already bound listener until `shutdown` fires
///
/// Requests are served while deferred initialization is still running.
/// Returns once open connections have drained.
pub async fn serve<S>(
    config: &ServiceConfig,
    listener: TcpListener,
    resolver: Arc<dyn Resolver>,
    storage: Arc<S>,
    shutdown: CancellationToken,
) -> Result<InitOutcome, ServiceError>
where
    S: StorageBackend + SessionStore + 'static,
{
    let sequencer = StartupSequencer::new();
    serve_with(&sequencer, config, listener, resolver, storage, shutdown).await
}

/// [`serve`] with a caller-owned sequencer, so state can be observed
pub async fn serve_with<S>(
    sequencer: &StartupSequencer,
    config: &ServiceConfig,
    listener: TcpListener,
    resolver: Arc<dyn Resolver>,
    storage: Arc<S>,
    shutdown: CancellationToken,
) -> Result<InitOutcome, ServiceError>
where
    S: StorageBackend + SessionStore + 'static,
{
    let store: Arc<dyn SessionStore> = storage.clone();
    let bootstrap = assemble(config, resolver, store)?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServiceError::Configuration(format!("listener has no local address: {}", e)))?;

    sequencer.announce_start();
    let server = HttpServer::new(listener, Arc::new(bootstrap.service));
    let server_task = tokio::spawn(server.serve(shutdown.clone()));
    sequencer.mark_listening(addr);

    let backend: Arc<dyn StorageBackend> = storage;
    let outcome = sequencer.run(backend, shutdown).await;

    if let Err(e) = server_task.await {
        error!("HTTP server task failed: {}", e);
    }
    info!("Shutdown complete");
    Ok(outcome)
}
