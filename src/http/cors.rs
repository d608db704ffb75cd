//! Cross-origin policy
//!
//! The service ships with a wide-open policy so browser frontends on any
//! origin can call it. This is a default posture, not a security boundary.

use http::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_METHOD,
    ORIGIN,
};
use http::Method;

/// Headers applied to every response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    allow_origin: HeaderValue,
    allow_credentials: bool,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
}

impl CorsPolicy {
    /// Allow every origin, method and header, with credentials
    pub fn permissive() -> Self {
        Self {
            allow_origin: HeaderValue::from_static("*"),
            allow_credentials: true,
            allow_methods: HeaderValue::from_static("*"),
            allow_headers: HeaderValue::from_static("*"),
        }
    }

    /// Write the policy headers, replacing any a handler set
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        if self.allow_credentials {
            headers.insert(
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
    }

    /// Whether a request is a CORS preflight
    pub fn is_preflight(method: &Method, headers: &HeaderMap) -> bool {
        method == Method::OPTIONS
            && headers.contains_key(ORIGIN)
            && headers.contains_key(ACCESS_CONTROL_REQUEST_METHOD)
    }
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self::permissive()
    }
}
