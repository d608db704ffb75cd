//! Staged startup lifecycle
//!
//! Starting → Listening → Initializing → Ready → ShuttingDown, strictly
//! forward. Deferred initialization failure still leads to Ready (degraded);
//! shutdown during initialization abandons it and skips straight to
//! ShuttingDown.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::storage::StorageBackend;
use crate::utils::env_or_default;

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StartupState {
    Starting,
    Listening,
    Initializing,
    Ready,
    ShuttingDown,
}

/// Result of the deferred initialization phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Initialized,
    Failed(String),
    /// Shutdown arrived while initialization was still running
    Abandoned,
}

impl InitOutcome {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, InitOutcome::Initialized)
    }
}

/// Drives and publishes the startup lifecycle
pub struct StartupSequencer {
    state: watch::Sender<StartupState>,
    port_hint: String,
}

impl StartupSequencer {
    /// Sequencer whose port hint comes from the PORT environment variable
    pub fn new() -> Self {
        Self::with_port_hint(env_or_default("PORT", "unknown"))
    }

    pub fn with_port_hint(port_hint: impl Into<String>) -> Self {
        let (state, _) = watch::channel(StartupState::Starting);
        Self {
            state,
            port_hint: port_hint.into(),
        }
    }

    pub fn state(&self) -> StartupState {
        *self.state.borrow()
    }

    /// Observe state transitions
    pub fn subscribe(&self) -> watch::Receiver<StartupState> {
        self.state.subscribe()
    }

    /// Move forward to `next`; backward or repeated transitions are ignored
    pub fn advance(&self, next: StartupState) -> bool {
        self.state.send_if_modified(|current| {
            if next > *current {
                *current = next;
                true
            } else {
                false
            }
        })
    }

    pub fn announce_start(&self) {
        info!(port = %self.port_hint, "Starting service on port {}", self.port_hint);
    }

    /// Record that the host has bound the listener
    pub fn mark_listening(&self, addr: SocketAddr) {
        if self.advance(StartupState::Listening) {
            info!("Listening on {}", addr);
        }
    }

    /// Run deferred initialization, then report ready
    ///
    /// Initialization runs on the blocking pool. Failure produces exactly one
    /// warning and still reaches Ready. Shutdown while it runs detaches the
    /// blocking call and returns [`InitOutcome::Abandoned`] without reaching
    /// Ready.
    pub async fn initialize(
        &self,
        storage: Arc<dyn StorageBackend>,
        shutdown: &CancellationToken,
    ) -> InitOutcome {
        self.advance(StartupState::Initializing);

        let observed = Arc::clone(&storage);
        let task = tokio::task::spawn_blocking(move || storage.initialize());
        let outcome = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!("Shutdown requested during initialization, abandoning it");
                return InitOutcome::Abandoned;
            }
            joined = task => match joined {
                Ok(Ok(())) => {
                    info!("Storage initialized");
                    InitOutcome::Initialized
                }
                Ok(Err(e)) => {
                    let e = ServiceError::from(e);
                    warn!("Continuing without storage: {}", e);
                    InitOutcome::Failed(e.to_string())
                }
                Err(e) => {
                    warn!("Continuing without storage: initialization task failed: {}", e);
                    InitOutcome::Failed(e.to_string())
                }
            },
        };

        self.advance(StartupState::Ready);
        info!(
            degraded = outcome.is_degraded(),
            storage = observed.readiness().label(),
            "Service ready"
        );
        outcome
    }

    /// Full lifecycle after the listener is up: initialize, serve until
    /// shutdown, then announce shutdown
    pub async fn run(
        &self,
        storage: Arc<dyn StorageBackend>,
        shutdown: CancellationToken,
    ) -> InitOutcome {
        let outcome = self.initialize(storage, &shutdown).await;
        shutdown.cancelled().await;

        self.advance(StartupState::ShuttingDown);
        info!("Service shutting down");
        outcome
    }
}

impl Default for StartupSequencer {
    fn default() -> Self {
        Self::new()
    }
}
