//! Session routes
//!
//! The storage-dependent part of the required route set. Storage is read
//! through [`SessionStore`], which reports "not ready" until deferred
//! initialization has published the database, so these handlers are safe to
//! serve from the moment the listener is up.

use http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

use super::response::{detail, internal_error, json_response};
use super::route::{HttpRequest, HttpResponse, RouteSetBuilder};
use crate::storage::{NewSession, Readiness, SessionStore, StorageError};

/// Add `GET /sessions` and `POST /sessions` to a route set
pub fn mount(store: Arc<dyn SessionStore>, builder: RouteSetBuilder) -> RouteSetBuilder {
    let list_store = Arc::clone(&store);
    builder
        .get("/sessions", move |_req: HttpRequest| {
            list_sessions(Arc::clone(&list_store))
        })
        .post("/sessions", move |req: HttpRequest| {
            create_session(Arc::clone(&store), req)
        })
}

async fn list_sessions(store: Arc<dyn SessionStore>) -> HttpResponse {
    match tokio::task::spawn_blocking(move || store.list_sessions()).await {
        Ok(Ok(sessions)) => json_response(StatusCode::OK, &json!({ "sessions": sessions })),
        Ok(Err(e)) => storage_error_response(e),
        Err(e) => {
            error!("Session listing task failed: {}", e);
            internal_error()
        }
    }
}

async fn create_session(store: Arc<dyn SessionStore>, req: HttpRequest) -> HttpResponse {
    let new: NewSession = match serde_json::from_slice(req.body()) {
        Ok(new) => new,
        Err(e) => {
            return detail(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Invalid request body: {}", e),
            )
        }
    };

    match tokio::task::spawn_blocking(move || store.insert_session(new)).await {
        Ok(Ok(record)) => json_response(StatusCode::CREATED, &record),
        Ok(Err(e)) => storage_error_response(e),
        Err(e) => {
            error!("Session insert task failed: {}", e);
            internal_error()
        }
    }
}

fn storage_error_response(e: StorageError) -> HttpResponse {
    match e {
        StorageError::NotInitialized => not_ready("Storage is still initializing", &Readiness::Pending),
        StorageError::Unavailable(reason) => {
            not_ready("Storage is unavailable", &Readiness::Failed(reason))
        }
        StorageError::Operation(_) | StorageError::Corrupt(_) => {
            warn!("Session storage error: {}", e);
            internal_error()
        }
    }
}

fn not_ready(message: &str, readiness: &Readiness) -> HttpResponse {
    json_response(
        StatusCode::SERVICE_UNAVAILABLE,
        &json!({ "detail": message, "storage": readiness.label() }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::route::{Handler, RouteSet};
    use crate::storage::{SessionRecord, SessionStatus};
    use bytes::Bytes;
    use http::{Method, Request};
    use http_body_util::BodyExt;
    use std::sync::Mutex;

    /// In-memory store toggled between states
    struct MemoryStore {
        state: Mutex<Result<Vec<SessionRecord>, StorageError>>,
    }

    impl SessionStore for MemoryStore {
        fn list_sessions(&self) -> Result<Vec<SessionRecord>, StorageError> {
            self.state.lock().unwrap().clone()
        }

        fn insert_session(&self, new: NewSession) -> Result<SessionRecord, StorageError> {
            let mut state = self.state.lock().unwrap();
            let records = state.as_mut().map_err(|e| e.clone())?;
            let record = SessionRecord::create(new);
            records.insert(0, record.clone());
            Ok(record)
        }
    }

    fn routes(state: Result<Vec<SessionRecord>, StorageError>) -> RouteSet {
        let store = Arc::new(MemoryStore {
            state: Mutex::new(state),
        });
        mount(store, RouteSet::builder()).build().unwrap()
    }

    async fn call(set: &RouteSet, method: Method, body: &'static str) -> (StatusCode, serde_json::Value) {
        let route = set
            .routes()
            .iter()
            .find(|r| r.method() == method)
            .unwrap();
        let req = Request::builder()
            .method(method)
            .uri("/sessions")
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap();
        let response = route.handler().call(req).await;
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_pending_storage_is_503_initializing() {
        let set = routes(Err(StorageError::NotInitialized));
        let (status, body) = call(&set, Method::GET, "").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["storage"], "initializing");
    }

    #[tokio::test]
    async fn test_failed_storage_is_503_unavailable() {
        let set = routes(Err(StorageError::Unavailable("disk".to_string())));
        let (status, body) = call(&set, Method::POST, r#"{"name": "x"}"#).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["storage"], "unavailable");
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let set = routes(Ok(Vec::new()));
        let (status, created) =
            call(&set, Method::POST, r#"{"name": "Checkout BRD", "status": "active"}"#).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["name"], "Checkout BRD");
        assert_eq!(created["status"], "active");

        let (status, listed) = call(&set, Method::GET, "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed["sessions"][0]["id"], created["id"]);
    }

    #[tokio::test]
    async fn test_malformed_body_is_422() {
        let set = routes(Ok(Vec::new()));
        let (status, body) = call(&set, Method::POST, "{not json").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().starts_with("Invalid request body"));
    }

    #[test]
    fn test_default_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(SessionStatus::Draft).unwrap(), "draft");
    }
}
