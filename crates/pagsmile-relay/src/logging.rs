//! Tracing setup and request/response dump events.
//!
//! Payload dumps go out at `debug` so production logs keep only the summary
//! lines; set `RUST_LOG=pagsmile_relay=debug` to see full bodies.

use reqwest::header::HeaderMap;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Header values never written to logs verbatim.
const REDACTED_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "cookie",
    "set-cookie",
    "pagsmile-signature",
];

/// Hosting platform variables worth echoing at startup.
const PLATFORM_VARS: &[&str] = &["VERCEL", "VERCEL_ENV", "VERCEL_REGION", "VERCEL_URL"];

/// Install the global subscriber. `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Name of the hosting platform, if the relay runs on a known one.
pub fn hosting_platform() -> Option<&'static str> {
    let on_vercel = std::env::var("VERCEL").map(|v| v == "1").unwrap_or(false)
        || std::env::var("VERCEL_ENV").is_ok();
    on_vercel.then_some("vercel")
}

/// Log the hosting environment once at startup.
pub fn log_environment() {
    let Some(platform) = hosting_platform() else {
        return;
    };
    let vars: serde_json::Map<String, serde_json::Value> = PLATFORM_VARS
        .iter()
        .filter_map(|k| std::env::var(k).ok().map(|v| (k.to_string(), v.into())))
        .collect();
    tracing::info!(platform, vars = %serde_json::Value::Object(vars), "hosting environment");
}

/// Header map rendered as JSON with secrets masked.
pub fn redacted_headers<'a, I>(headers: I) -> serde_json::Value
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let map: serde_json::Map<String, serde_json::Value> = headers
        .into_iter()
        .map(|(name, value)| {
            let name = name.to_ascii_lowercase();
            let shown = if REDACTED_HEADERS.contains(&name.as_str()) {
                mask(value)
            } else {
                String::from_utf8_lossy(value).into_owned()
            };
            (name, serde_json::Value::String(shown))
        })
        .collect();
    serde_json::Value::Object(map)
}

fn mask(value: &[u8]) -> String {
    let text = String::from_utf8_lossy(value);
    // Keep the scheme word ("Basic", "Bearer") so the header kind is still visible.
    match text.split_once(' ') {
        Some((scheme, _)) => format!("{} [REDACTED]", scheme),
        None => "[REDACTED]".to_string(),
    }
}

fn pretty(body: &serde_json::Value) -> String {
    serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string())
}

/// Request about to leave for the gateway.
pub fn log_outbound(
    method: &str,
    url: &str,
    headers: Option<&HeaderMap>,
    body: Option<&serde_json::Value>,
) {
    tracing::info!(method, url, "sending request to gateway");
    if let Some(headers) = headers {
        let shown = redacted_headers(headers.iter().map(|(k, v)| (k.as_str(), v.as_bytes())));
        tracing::debug!(headers = %shown, "outbound headers");
        if !headers.contains_key(reqwest::header::ORIGIN) {
            tracing::warn!(url, "outbound request carries no Origin header");
        }
    }
    if let Some(body) = body {
        tracing::debug!("outbound body:\n{}", pretty(body));
    }
}

/// Reply received from the gateway.
pub fn log_upstream_reply(status: u16, headers: &HeaderMap, body: &serde_json::Value) {
    tracing::info!(status, "gateway replied");
    let shown = redacted_headers(headers.iter().map(|(k, v)| (k.as_str(), v.as_bytes())));
    tracing::debug!(headers = %shown, "gateway reply headers");
    tracing::debug!("gateway reply body:\n{}", pretty(body));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_auth_headers() {
        let shown = redacted_headers(vec![
            ("Authorization", b"Basic YXBwOnNlY3JldA==".as_slice()),
            ("Content-Type", b"application/json".as_slice()),
            ("Cookie", b"sid=abc".as_slice()),
        ]);
        assert_eq!(shown["authorization"], "Basic [REDACTED]");
        assert_eq!(shown["content-type"], "application/json");
        assert_eq!(shown["cookie"], "[REDACTED]");
    }

    #[test]
    fn test_redacts_reqwest_header_map() {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            "Bearer token123".parse().unwrap(),
        );
        let shown = redacted_headers(headers.iter().map(|(k, v)| (k.as_str(), v.as_bytes())));
        assert_eq!(shown["authorization"], "Bearer [REDACTED]");
        assert!(!shown.to_string().contains("token123"));
    }
}
