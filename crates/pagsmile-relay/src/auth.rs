//! Credential helpers for talking to the gateway.

use base64::Engine;
use chrono::{DateTime, Local, TimeZone};

/// Format the gateway expects for the `timestamp` field.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Build the static `Authorization` header value from the app id and security key.
pub fn basic_auth_header(app_id: &str, security_key: &str) -> String {
    let credentials = format!("{}:{}", app_id, security_key);
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(credentials)
    )
}

/// Truncated form of an auth header, safe to show on diagnostic endpoints.
pub fn auth_header_sample(header: &str) -> String {
    let prefix: String = header.chars().take(20).collect();
    format!("{}...", prefix)
}

/// Current local time in the gateway timestamp format.
pub fn gateway_timestamp() -> String {
    format_timestamp(&Local::now())
}

pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}
