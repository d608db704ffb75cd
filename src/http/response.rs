//! JSON response helpers

use bytes::Bytes;
use http::{header, Response, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use super::route::HttpResponse;

/// Serialize `body` as a JSON response with the given status
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> HttpResponse {
    match serde_json::to_vec(body) {
        Ok(bytes) => build(status, Bytes::from(bytes)),
        Err(e) => {
            error!("Failed to serialize response body: {}", e);
            build(
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(br#"{"detail":"Internal Server Error"}"#),
            )
        }
    }
}

/// `{"detail": ...}` error body
pub fn detail(status: StatusCode, message: impl AsRef<str>) -> HttpResponse {
    json_response(status, &json!({ "detail": message.as_ref() }))
}

pub fn not_found() -> HttpResponse {
    detail(StatusCode::NOT_FOUND, "Not Found")
}

pub fn method_not_allowed() -> HttpResponse {
    detail(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

pub fn internal_error() -> HttpResponse {
    detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

/// Empty-bodied response (preflight answers)
pub fn empty(status: StatusCode) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

fn build(status: StatusCode, body: Bytes) -> HttpResponse {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_detail_body() {
        let response = detail(StatusCode::SERVICE_UNAVAILABLE, "Storage is not ready");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["detail"], "Storage is not ready");
    }

    #[test]
    fn test_not_found_status() {
        assert_eq!(not_found().status(), StatusCode::NOT_FOUND);
        assert_eq!(method_not_allowed().status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
