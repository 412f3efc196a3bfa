//! Generic pass-through to the gateway for the browser SDK.
//!
//! The SDK talks to `/pagsmile-proxy/<path>` on this relay instead of the
//! gateway host. Query parameters are folded into the JSON body, the relay's
//! credentials and an explicit origin are attached, and whatever the gateway
//! answers goes back unchanged.

use actix_web::{HttpRequest, HttpResponse};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Map, Value};
use std::time::Instant;

use crate::diagnostics;
use crate::error::RelayError;
use crate::gateway::{decode_body, UpstreamResponse};
use crate::logging;
use crate::metrics::{PROXY_LATENCY, PROXY_REQUESTS_TOTAL};
use crate::origin::{resolve_origin, OriginSources, ResolvedOrigin};
use crate::state::AppState;

/// User agent sent when the browser didn't supply one.
pub const DEFAULT_USER_AGENT: &str = "Pagsmile-Proxy/1.0";

/// Allowlist of response headers to forward from the upstream.
/// CORS and caching headers are left to the relay's own middleware.
const ALLOWED_RESPONSE_HEADERS: &[&str] = &[
    "content-type",
    "content-encoding",
    "etag",
    "last-modified",
    "date",
    "vary",
    "x-request-id",
    "x-ratelimit-limit",
    "x-ratelimit-remaining",
    "x-ratelimit-reset",
];

/// Sanitize a proxy path segment to prevent path traversal and URL authority injection.
/// Validates against the decoded form but returns the original (still-encoded) path.
pub fn sanitize_path(path: &str) -> Result<String, RelayError> {
    let decoded = urlencoding::decode(path)
        .map_err(|_| RelayError::InvalidPath("invalid URL encoding in path".to_string()))?;

    if decoded.contains("..") {
        return Err(RelayError::InvalidPath("path traversal not allowed".to_string()));
    }

    // Leading slashes would turn into //host authority injection
    if decoded.starts_with('/') {
        return Err(RelayError::InvalidPath("path must not start with /".to_string()));
    }

    if decoded.contains('@') {
        return Err(RelayError::InvalidPath("path must not contain @".to_string()));
    }

    if decoded.contains('\r') || decoded.contains('\n') {
        return Err(RelayError::InvalidPath("path must not contain newlines".to_string()));
    }

    if decoded.contains('\0') {
        return Err(RelayError::InvalidPath("path must not contain null bytes".to_string()));
    }

    // An encoded ? or # would open a query or fragment on the target URL
    if decoded.contains('?') || decoded.contains('#') {
        return Err(RelayError::InvalidPath("path must not contain ? or #".to_string()));
    }

    Ok(path.to_string())
}

/// Sanitize a query string kept on the URL (GET/HEAD only).
fn sanitize_query(query: &str) -> Result<String, RelayError> {
    if query.contains('\r') || query.contains('\n') || query.contains('\0') {
        return Err(RelayError::InvalidPath(
            "query string must not contain control characters".to_string(),
        ));
    }
    let sanitized = match query.find('#') {
        Some(idx) => &query[..idx],
        None => query,
    };
    Ok(sanitized.to_string())
}

/// Decode a query string into a JSON object. Repeated keys collect into an array.
pub fn parse_query(query: &str) -> Map<String, Value> {
    parse_pairs(url::form_urlencoded::parse(query.as_bytes()))
}

fn parse_pairs<'a, I>(pairs: I) -> Map<String, Value>
where
    I: Iterator<Item = (std::borrow::Cow<'a, str>, std::borrow::Cow<'a, str>)>,
{
    let mut out = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value.into_owned());
        match out.get_mut(key.as_ref()) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                out.insert(key.into_owned(), value);
            }
        }
    }
    out
}

/// Decode an inbound body into a JSON object.
/// Empty, non-JSON and non-object bodies become an empty object.
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Map<String, Value> {
    if body.is_empty() {
        return Map::new();
    }
    let is_form = content_type
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);
    if is_form {
        return parse_pairs(url::form_urlencoded::parse(body));
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            tracing::warn!("request body is JSON but not an object, reading it as empty");
            Map::new()
        }
        Err(_) => {
            tracing::warn!("request body is not JSON, reading it as empty");
            Map::new()
        }
    }
}

/// Body fields overlaid with query parameters. Query values win on conflicts.
pub fn merge_query_into_body(mut body: Map<String, Value>, query: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in query {
        body.insert(key, value);
    }
    body
}

/// Whether the outbound request carries a body at all.
pub fn sends_body(method: &str) -> bool {
    !matches!(method, "GET" | "HEAD")
}

/// The exact header set presented to the gateway.
pub fn outbound_headers(
    auth_header: &str,
    origin: &str,
    user_agent: Option<&str>,
) -> Result<HeaderMap, RelayError> {
    let value = |v: &str| {
        HeaderValue::from_str(v)
            .map_err(|_| RelayError::InvalidRequest(format!("invalid header value: {}", v)))
    };
    let mut headers = HeaderMap::new();
    headers.insert(reqwest::header::AUTHORIZATION, value(auth_header)?);
    headers.insert(
        reqwest::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        reqwest::header::ACCEPT,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(reqwest::header::ORIGIN, value(origin)?);
    headers.insert(reqwest::header::REFERER, value(origin)?);
    headers.insert(
        reqwest::header::USER_AGENT,
        value(user_agent.filter(|ua| !ua.is_empty()).unwrap_or(DEFAULT_USER_AGENT))?,
    );
    Ok(headers)
}

/// Build the client-facing response from the gateway reply: same status, same body.
pub fn relay_response(upstream: UpstreamResponse) -> HttpResponse {
    let status = actix_web::http::StatusCode::from_u16(upstream.status)
        .unwrap_or(actix_web::http::StatusCode::BAD_GATEWAY);
    let mut builder = HttpResponse::build(status);

    for (name, value) in upstream.headers.iter() {
        let name_lower = name.as_str().to_lowercase();
        if ALLOWED_RESPONSE_HEADERS.contains(&name_lower.as_str()) {
            if let Ok(value_str) = value.to_str() {
                builder.insert_header((name.as_str(), value_str));
            }
        }
    }

    builder.body(upstream.body)
}

/// Forward one inbound request to `{gateway}/{path}` and relay the reply.
pub async fn relay(
    state: &AppState,
    req: &HttpRequest,
    path: &str,
    body: Bytes,
) -> Result<HttpResponse, RelayError> {
    let started = Instant::now();
    let method = req.method().as_str().to_string();

    let inbound_headers = logging::redacted_headers(
        req.headers()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_bytes())),
    );
    let content_type = req
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok());
    let query = parse_query(req.query_string());
    let inbound_body = parse_body(content_type, &body);

    tracing::info!(method = %method, path, "proxy request received");
    tracing::debug!(
        headers = %inbound_headers,
        query = %serde_json::Value::Object(query.clone()),
        body = %serde_json::Value::Object(inbound_body.clone()),
        "proxy inbound"
    );

    let mut target_url = state.gateway.url_for(path);
    let outbound_body = if sends_body(&method) {
        if !query.is_empty() {
            tracing::debug!(keys = query.len(), "merging query params into body");
        }
        Some(merge_query_into_body(inbound_body, query))
    } else {
        let raw_query = sanitize_query(req.query_string())?;
        if !raw_query.is_empty() {
            target_url = format!("{}?{}", target_url, raw_query);
        }
        None
    };

    if let Some(ref body) = outbound_body {
        if diagnostics::is_card_pay_path(path) {
            let missing = diagnostics::missing_params(body);
            if !missing.is_empty() {
                tracing::warn!(missing = ?missing, "card payment is missing required parameters");
            }
        }
    }

    let sources = OriginSources::from_request(
        req,
        state.config.frontend_origin.as_deref(),
        Some(state.config.domain.as_str()),
    );
    let ResolvedOrigin { value: origin, source } = resolve_origin(&sources);
    tracing::info!(origin = %origin, source = ?source, "origin resolved");
    tracing::debug!(
        sources = %serde_json::to_value(&sources).unwrap_or_default(),
        "origin sources"
    );

    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok());
    let headers = outbound_headers(state.gateway.auth_header(), &origin, user_agent)?;

    let reqwest_method = reqwest::Method::from_bytes(method.as_bytes())
        .map_err(|_| RelayError::InvalidRequest(format!("unsupported HTTP method: {}", method)))?;

    let body_value = outbound_body.map(Value::Object);
    logging::log_outbound(&method, &target_url, Some(&headers), body_value.as_ref());

    let mut request = state
        .gateway
        .http()
        .request(reqwest_method, &target_url)
        .headers(headers);
    if let Some(ref body) = body_value {
        request = request.json(body);
    }

    let result = state.gateway.forward(request).await;
    let elapsed = started.elapsed();
    PROXY_LATENCY.observe(elapsed.as_secs_f64());

    match result {
        Ok(upstream) => {
            logging::log_upstream_reply(upstream.status, &upstream.headers, &decode_body(&upstream.body));
            tracing::info!(
                status = upstream.status,
                duration_ms = elapsed.as_millis() as u64,
                "proxy request completed"
            );
            let status_label = upstream.status.to_string();
            PROXY_REQUESTS_TOTAL
                .with_label_values(&[status_label.as_str()])
                .inc();
            Ok(relay_response(upstream))
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                url = %target_url,
                duration_ms = elapsed.as_millis() as u64,
                "proxy request to gateway failed"
            );
            PROXY_REQUESTS_TOTAL.with_label_values(&["error"]).inc();
            Err(e.into())
        }
    }
}
