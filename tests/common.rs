//! Shared fixtures for integration tests
#![allow(dead_code)]

use brd_api::config::{CapabilitySpec, ServiceConfig};
use brd_api::error::ServiceError;
use brd_api::http::response::json_response;
use brd_api::http::{HttpRequest, RouteSet};
use brd_api::module::CatalogResolver;
use brd_api::service::{serve_with, InitOutcome, StartupSequencer};
use brd_api::storage::{
    InitError, NewSession, Readiness, SessionRecord, SessionStore, StorageBackend, StorageError,
};
use http::StatusCode;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::MakeWriter;

/// Storage double whose initialization outcome and timing are controlled by the test
pub struct TestStorage {
    outcome: Result<(), InitError>,
    gate: Option<Arc<(Mutex<bool>, Condvar)>>,
    published: OnceLock<Result<(), InitError>>,
    sessions: Mutex<Vec<SessionRecord>>,
}

impl TestStorage {
    /// Initialization succeeds immediately
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self::build(Ok(()), None))
    }

    /// Initialization fails immediately with `reason`
    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self::build(Err(InitError::Backend(reason.to_string())), None))
    }

    /// Initialization blocks until [`TestStorage::release`] (or a safety timeout)
    pub fn gated(outcome: Result<(), InitError>) -> Arc<Self> {
        Arc::new(Self::build(
            outcome,
            Some(Arc::new((Mutex::new(false), Condvar::new()))),
        ))
    }

    fn build(outcome: Result<(), InitError>, gate: Option<Arc<(Mutex<bool>, Condvar)>>) -> Self {
        Self {
            outcome,
            gate,
            published: OnceLock::new(),
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Let a gated initialization finish
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            let (open, cvar) = &**gate;
            *open.lock().unwrap() = true;
            cvar.notify_all();
        }
    }

    fn ready(&self) -> Result<(), StorageError> {
        match self.published.get() {
            None => Err(StorageError::NotInitialized),
            Some(Err(e)) => Err(StorageError::Unavailable(e.to_string())),
            Some(Ok(())) => Ok(()),
        }
    }
}

impl StorageBackend for TestStorage {
    fn initialize(&self) -> Result<(), InitError> {
        if let Some(gate) = &self.gate {
            let (open, cvar) = &**gate;
            let guard = open.lock().unwrap();
            let _ = cvar
                .wait_timeout_while(guard, Duration::from_secs(10), |open| !*open)
                .unwrap();
        }
        self.published.get_or_init(|| self.outcome.clone()).clone()
    }

    fn readiness(&self) -> Readiness {
        match self.published.get() {
            None => Readiness::Pending,
            Some(Ok(())) => Readiness::Ready,
            Some(Err(e)) => Readiness::Failed(e.to_string()),
        }
    }
}

impl SessionStore for TestStorage {
    fn list_sessions(&self) -> Result<Vec<SessionRecord>, StorageError> {
        self.ready()?;
        Ok(self.sessions.lock().unwrap().clone())
    }

    fn insert_session(&self, new: NewSession) -> Result<SessionRecord, StorageError> {
        self.ready()?;
        let record = SessionRecord::create(new);
        self.sessions.lock().unwrap().insert(0, record.clone());
        Ok(record)
    }
}

/// Catalog where each `(locator, path, available)` entry either mounts
/// `GET path` or fails to load
pub fn catalog(entries: &[(&str, &'static str, bool)]) -> CatalogResolver {
    let mut catalog = CatalogResolver::new();
    for &(locator, path, available) in entries {
        if available {
            catalog.register(locator, move || {
                RouteSet::builder()
                    .get(path, move |_req: HttpRequest| async move {
                        json_response(StatusCode::OK, &serde_json::json!({ "path": path }))
                    })
                    .build()
                    .map_err(|e| e.to_string())
            });
        } else {
            catalog.register(locator, || Err("simulated import failure".to_string()));
        }
    }
    catalog
}

/// Config declaring the given app and integration capabilities
pub fn config_with(app: &[(&str, &str)], integration: &[(&str, &str)]) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.capabilities.app = app
        .iter()
        .map(|(name, locator)| CapabilitySpec::new(*name, *locator))
        .collect();
    config.capabilities.integration = integration
        .iter()
        .map(|(name, locator)| CapabilitySpec::new(*name, *locator))
        .collect();
    config
}

/// A service running in the background on an ephemeral port
pub struct RunningService {
    pub addr: SocketAddr,
    pub shutdown: CancellationToken,
    pub sequencer: Arc<StartupSequencer>,
    pub handle: JoinHandle<Result<InitOutcome, ServiceError>>,
}

impl RunningService {
    pub async fn stop(self) -> Result<InitOutcome, ServiceError> {
        self.shutdown.cancel();
        self.handle.await.expect("service task panicked")
    }
}

pub async fn spawn_service<S>(
    config: ServiceConfig,
    resolver: CatalogResolver,
    storage: Arc<S>,
) -> RunningService
where
    S: StorageBackend + SessionStore + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let sequencer = Arc::new(StartupSequencer::with_port_hint(addr.port().to_string()));

    let handle = {
        let shutdown = shutdown.clone();
        let sequencer = Arc::clone(&sequencer);
        tokio::spawn(async move {
            serve_with(
                &sequencer,
                &config,
                listener,
                Arc::new(resolver),
                storage,
                shutdown,
            )
            .await
        })
    };

    RunningService {
        addr,
        shutdown,
        sequencer,
        handle,
    }
}

/// Minimal parsed HTTP response
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("response body is not JSON")
    }
}

/// Send one HTTP/1.1 request over a fresh connection
pub async fn send(
    addr: SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: &str,
) -> RawResponse {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut request = format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\nContent-Length: {}\r\n",
        method,
        path,
        addr,
        body.len()
    );
    for (name, value) in headers {
        request.push_str(&format!("{}: {}\r\n", name, value));
    }
    request.push_str("\r\n");
    request.push_str(body);
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let raw = String::from_utf8(raw).unwrap();

    let (head, body) = raw.split_once("\r\n\r\n").expect("malformed response");
    let mut lines = head.lines();
    let status = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .expect("missing status line");
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    RawResponse {
        status,
        headers,
        body: body.to_string(),
    }
}

pub async fn get(addr: SocketAddr, path: &str) -> RawResponse {
    send(addr, "GET", path, &[], "").await
}

/// In-memory log sink for asserting on emitted diagnostics
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Number of captured lines at WARN level
    pub fn warn_count(&self) -> usize {
        self.contents().lines().filter(|l| l.contains(" WARN ")).count()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Capture logs on the current thread until the guard is dropped
///
/// Use with `#[tokio::test]` (current-thread runtime) so spawned tasks log here too.
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}

/// Wait until the sequencer reaches `state`
pub async fn wait_for_state(sequencer: &StartupSequencer, state: brd_api::StartupState) {
    let mut rx = sequencer.subscribe();
    tokio::time::timeout(Duration::from_secs(10), async {
        while *rx.borrow_and_update() < state {
            if rx.changed().await.is_err() {
                break;
            }
        }
    })
    .await
    .expect("timed out waiting for startup state");
}
