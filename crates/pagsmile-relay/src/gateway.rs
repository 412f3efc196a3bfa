//! Outbound calls to the Pagsmile gateway.
//!
//! All calls share one pooled [`reqwest::Client`] and the static Basic-Auth
//! header built from the configured credentials. Nothing is retried.

use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use crate::auth::basic_auth_header;
use crate::config::RelayConfig;
use crate::logging;

/// Maximum upstream response body size (10 MB).
pub const MAX_RESPONSE_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Reply code the gateway uses for an accepted request.
pub const SUCCESS_CODE: &str = "10000";

const CREATE_PATH: &str = "trade/create";
const QUERY_PATH: &str = "trade/query";

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("gateway unreachable: {0}")]
    Transport(String),

    #[error("gateway returned {status}")]
    Status {
        status: u16,
        body: serde_json::Value,
    },

    #[error("failed to decode gateway reply: {0}")]
    Decode(String),

    #[error("upstream response too large (max {0} bytes)")]
    TooLarge(usize),
}

impl CallError {
    /// What to show the caller: the upstream body when there was one, otherwise the error text.
    pub fn details(&self) -> serde_json::Value {
        match self {
            CallError::Status { body, .. } => body.clone(),
            other => serde_json::Value::String(other.to_string()),
        }
    }
}

/// Common envelope of gateway replies. Fields the relay doesn't look at are kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayReply {
    #[serde(default, deserialize_with = "string_or_number")]
    pub code: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub sub_code: Option<String>,
    #[serde(default)]
    pub sub_msg: Option<String>,
    #[serde(default)]
    pub prepay_id: Option<String>,
    #[serde(default)]
    pub trade_no: Option<String>,
    #[serde(default)]
    pub trade_status: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Accept a JSON string or number as an optional string. Reply codes are
/// documented as strings but some endpoints send numbers.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl GatewayReply {
    pub fn is_success(&self) -> bool {
        self.code.as_deref() == Some(SUCCESS_CODE)
    }
}

/// Raw upstream reply, relayed as-is by the proxy.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    auth_header: String,
}

impl GatewayClient {
    pub fn new(config: &RelayConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: reqwest::Client, config: &RelayConfig) -> Self {
        Self {
            http,
            base_url: config.gateway_url.trim_end_matches('/').to_string(),
            auth_header: basic_auth_header(&config.app_id, &config.security_key),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth_header(&self) -> &str {
        &self.auth_header
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Absolute URL for a gateway sub-path.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST /trade/create
    pub async fn trade_create<T: Serialize>(&self, payload: &T) -> Result<GatewayReply, CallError> {
        let value = self.post_json(CREATE_PATH, payload).await?;
        serde_json::from_value(value).map_err(|e| CallError::Decode(e.to_string()))
    }

    /// POST /trade/query. The reply is handed back untouched.
    pub async fn trade_query<T: Serialize>(
        &self,
        payload: &T,
    ) -> Result<serde_json::Value, CallError> {
        self.post_json(QUERY_PATH, payload).await
    }

    /// Authenticated JSON POST. Non-2xx replies are errors carrying the upstream body.
    pub async fn post_json<T: Serialize>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<serde_json::Value, CallError> {
        let url = self.url_for(path);
        logging::log_outbound("POST", &url, None, serde_json::to_value(payload).ok().as_ref());

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, &self.auth_header)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %url, "gateway request failed");
                CallError::Transport(e.to_string())
            })?;

        let upstream = read_limited(response).await?;
        let body = decode_body(&upstream.body);
        logging::log_upstream_reply(upstream.status, &upstream.headers, &body);

        if !(200..300).contains(&upstream.status) {
            return Err(CallError::Status {
                status: upstream.status,
                body,
            });
        }
        Ok(body)
    }

    /// Send an already-built request and read the reply without judging its status.
    pub async fn forward(&self, request: reqwest::RequestBuilder) -> Result<UpstreamResponse, CallError> {
        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, "proxy request failed");
            CallError::Transport(e.to_string())
        })?;
        read_limited(response).await
    }
}

/// Read a reply body, aborting as soon as it exceeds [`MAX_RESPONSE_BODY_SIZE`].
async fn read_limited(mut response: reqwest::Response) -> Result<UpstreamResponse, CallError> {
    let status = response.status().as_u16();
    let headers = response.headers().clone();

    if let Some(cl) = response.content_length() {
        if cl > MAX_RESPONSE_BODY_SIZE as u64 {
            return Err(CallError::TooLarge(MAX_RESPONSE_BODY_SIZE));
        }
    }

    let mut body_buf = Vec::with_capacity(
        response
            .content_length()
            .map(|cl| cl as usize)
            .unwrap_or(8192)
            .min(MAX_RESPONSE_BODY_SIZE),
    );
    while let Some(chunk) = response.chunk().await.map_err(|e| {
        tracing::error!(error = %e, "failed to read gateway response body");
        CallError::Transport(e.to_string())
    })? {
        if body_buf.len() + chunk.len() > MAX_RESPONSE_BODY_SIZE {
            return Err(CallError::TooLarge(MAX_RESPONSE_BODY_SIZE));
        }
        body_buf.extend_from_slice(&chunk);
    }

    Ok(UpstreamResponse {
        status,
        headers,
        body: Bytes::from(body_buf),
    })
}

/// JSON if the body parses as JSON, otherwise the body as a string.
pub fn decode_body(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(body).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_success_code() {
        let reply: GatewayReply = serde_json::from_value(serde_json::json!({
            "code": "10000",
            "msg": "Success",
            "prepay_id": "cHJlcGF5",
            "trade_no": "T123",
            "web_url": "https://checkout.example/pay"
        }))
        .unwrap();
        assert!(reply.is_success());
        assert_eq!(reply.prepay_id.as_deref(), Some("cHJlcGF5"));
        assert_eq!(reply.extra["web_url"], "https://checkout.example/pay");
    }

    #[test]
    fn test_reply_failure_code() {
        let reply: GatewayReply =
            serde_json::from_value(serde_json::json!({"code": "40001", "msg": "Param error"}))
                .unwrap();
        assert!(!reply.is_success());
    }

    #[test]
    fn test_reply_numeric_code() {
        let reply: GatewayReply = serde_json::from_value(serde_json::json!({"code": 10000})).unwrap();
        assert!(reply.is_success());
    }

    #[test]
    fn test_decode_body_falls_back_to_text() {
        assert_eq!(decode_body(br#"{"a":1}"#)["a"], 1);
        assert_eq!(decode_body(b"Bad Gateway"), serde_json::json!("Bad Gateway"));
    }

    #[test]
    fn test_call_error_details() {
        let err = CallError::Status {
            status: 401,
            body: serde_json::json!({"msg": "unauthorized"}),
        };
        assert_eq!(err.details()["msg"], "unauthorized");
        assert_eq!(
            CallError::Transport("refused".into()).details(),
            serde_json::json!("gateway unreachable: refused")
        );
    }
}
