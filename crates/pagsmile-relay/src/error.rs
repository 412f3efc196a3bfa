use actix_web::{HttpResponse, ResponseError};
use std::fmt;

#[derive(Debug)]
pub enum RelayError {
    /// Inbound request body or parameters are unusable
    InvalidRequest(String),
    /// Proxy sub-path failed sanitisation
    InvalidPath(String),
    /// Gateway call failed before a usable reply was obtained.
    /// `error` is the caller-facing summary, `details` the upstream body or error text.
    Gateway {
        error: &'static str,
        details: serde_json::Value,
    },
    /// Proxied call never reached the gateway
    ProxyTransport(String),
    /// Upstream reply exceeded the relay's body limit
    ResponseTooLarge(usize),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::InvalidRequest(msg) => write!(f, "invalid request: {}", msg),
            RelayError::InvalidPath(msg) => write!(f, "invalid proxy path: {}", msg),
            RelayError::Gateway { error, details } => write!(f, "{}: {}", error, details),
            RelayError::ProxyTransport(msg) => write!(f, "proxy error: {}", msg),
            RelayError::ResponseTooLarge(max) => {
                write!(f, "upstream response too large (max {} bytes)", max)
            }
        }
    }
}

impl std::error::Error for RelayError {}

impl From<crate::gateway::CallError> for RelayError {
    fn from(e: crate::gateway::CallError) -> Self {
        match e {
            crate::gateway::CallError::TooLarge(max) => RelayError::ResponseTooLarge(max),
            other => RelayError::ProxyTransport(other.to_string()),
        }
    }
}

impl ResponseError for RelayError {
    fn error_response(&self) -> HttpResponse {
        match self {
            RelayError::InvalidRequest(msg) => HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": msg,
            })),
            RelayError::InvalidPath(msg) => HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "status": "failed",
                "message": msg,
            })),
            RelayError::Gateway { error, details } => {
                tracing::error!(%details, "{}", error);
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "success": false,
                    "error": error,
                    "details": details,
                }))
            }
            RelayError::ProxyTransport(msg) => {
                tracing::error!("Proxy error: {}", msg);
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "success": false,
                    "status": "failed",
                    "message": msg,
                }))
            }
            RelayError::ResponseTooLarge(max) => {
                tracing::error!("Upstream response exceeded {} bytes", max);
                HttpResponse::BadGateway().json(serde_json::json!({
                    "success": false,
                    "status": "failed",
                    "message": "upstream response too large",
                }))
            }
        }
    }
}

/// Turn JSON extractor failures into the relay's error shape instead of actix's plain text.
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    RelayError::InvalidRequest(err.to_string()).into()
}
