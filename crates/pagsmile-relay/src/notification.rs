//! Payment notifications pushed by the gateway.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::gateway::string_or_number;

type HmacSha256 = Hmac<Sha256>;

/// Header the gateway signs notifications with.
pub const SIGNATURE_HEADER: &str = "pagsmile-signature";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeStatus {
    Success,
    Failed,
    Processing,
    Unknown(String),
}

impl TradeStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("SUCCESS") => TradeStatus::Success,
            Some("FAILED") => TradeStatus::Failed,
            Some("PROCESSING") => TradeStatus::Processing,
            Some(other) => TradeStatus::Unknown(other.to_string()),
            None => TradeStatus::Unknown(String::new()),
        }
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            TradeStatus::Success => "success",
            TradeStatus::Failed => "failed",
            TradeStatus::Processing => "processing",
            TradeStatus::Unknown(_) => "unknown",
        }
    }
}

/// The fields the relay reads. Everything else stays in `extra` and is forwarded untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentNotification {
    #[serde(default, deserialize_with = "string_or_number")]
    pub trade_status: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub trade_no: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub out_trade_no: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PaymentNotification {
    pub fn status(&self) -> TradeStatus {
        TradeStatus::parse(self.trade_status.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureVerdict {
    /// No secret configured
    Unchecked,
    Missing,
    Valid,
    Invalid,
}

impl SignatureVerdict {
    pub fn label(&self) -> &'static str {
        match self {
            SignatureVerdict::Unchecked => "unchecked",
            SignatureVerdict::Missing => "missing",
            SignatureVerdict::Valid => "valid",
            SignatureVerdict::Invalid => "invalid",
        }
    }
}

/// Compute HMAC-SHA256 over the body, hex-encoded. None if the key is rejected.
pub fn compute_signature(secret: &[u8], body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Check a hex HMAC-SHA256 signature in constant time. A rejected key never verifies.
pub fn verify_signature(secret: &[u8], body: &[u8], signature: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        tracing::warn!("webhook secret rejected as an HMAC key");
        return false;
    };
    mac.update(body);
    // Invalid hex still goes through verify_slice to keep timing uniform
    let expected = hex::decode(signature.trim()).unwrap_or_else(|_| vec![0u8; 32]);
    mac.verify_slice(&expected).is_ok()
}

pub fn check_signature(secret: Option<&[u8]>, body: &[u8], header: Option<&str>) -> SignatureVerdict {
    match (secret, header) {
        (None, _) => SignatureVerdict::Unchecked,
        (Some(_), None) => SignatureVerdict::Missing,
        (Some(secret), Some(sig)) => {
            if verify_signature(secret, body, sig) {
                SignatureVerdict::Valid
            } else {
                SignatureVerdict::Invalid
            }
        }
    }
}

/// Fire-and-forget POST of the raw notification to each downstream URL,
/// keeping the content type it arrived with.
pub fn forward_notification(
    client: &reqwest::Client,
    urls: &[String],
    content_type: &str,
    body: bytes::Bytes,
) {
    for url in urls {
        let client = client.clone();
        let url = url.clone();
        let body = body.clone();
        let content_type = content_type.to_string();

        tokio::spawn(async move {
            let result = client
                .post(&url)
                .header("content-type", content_type)
                .timeout(std::time::Duration::from_secs(5))
                .body(body)
                .send()
                .await;
            match result {
                Ok(resp) => {
                    tracing::debug!(url = %url, status = %resp.status(), "notification forwarded")
                }
                Err(e) => tracing::warn!(url = %url, error = %e, "notification forward failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_status_parse() {
        assert_eq!(TradeStatus::parse(Some("SUCCESS")), TradeStatus::Success);
        assert_eq!(TradeStatus::parse(Some("FAILED")), TradeStatus::Failed);
        assert_eq!(TradeStatus::parse(Some("PROCESSING")), TradeStatus::Processing);
        assert_eq!(
            TradeStatus::parse(Some("REFUNDED")),
            TradeStatus::Unknown("REFUNDED".into())
        );
        assert_eq!(TradeStatus::parse(None).label(), "unknown");
    }

    #[test]
    fn test_notification_keeps_extra_fields() {
        let n: PaymentNotification = serde_json::from_value(serde_json::json!({
            "trade_status": "SUCCESS",
            "trade_no": "T1",
            "amount": "10.00"
        }))
        .unwrap();
        assert_eq!(n.status(), TradeStatus::Success);
        assert_eq!(n.extra["amount"], "10.00");
    }

    #[test]
    fn test_notification_accepts_numeric_ids() {
        let n: PaymentNotification = serde_json::from_value(serde_json::json!({
            "trade_status": "FAILED",
            "trade_no": 2024100112,
            "out_trade_no": null
        }))
        .unwrap();
        assert_eq!(n.trade_no.as_deref(), Some("2024100112"));
        assert_eq!(n.out_trade_no, None);
        assert_eq!(n.status(), TradeStatus::Failed);
    }

    #[test]
    fn test_signature_roundtrip() {
        let sig = compute_signature(b"whsec", b"{\"trade_no\":\"T1\"}").unwrap();
        assert!(verify_signature(b"whsec", b"{\"trade_no\":\"T1\"}", &sig));
        assert!(!verify_signature(b"other", b"{\"trade_no\":\"T1\"}", &sig));
        assert!(!verify_signature(b"whsec", b"{\"trade_no\":\"T2\"}", &sig));
        assert!(!verify_signature(b"whsec", b"{}", "zz-not-hex"));
    }

    #[test]
    fn test_check_signature_verdicts() {
        let body = b"{}";
        let sig = compute_signature(b"k", body).unwrap();
        assert_eq!(check_signature(None, body, Some(&sig)), SignatureVerdict::Unchecked);
        assert_eq!(check_signature(Some(b"k".as_slice()), body, None), SignatureVerdict::Missing);
        assert_eq!(check_signature(Some(b"k".as_slice()), body, Some(&sig)), SignatureVerdict::Valid);
        assert_eq!(check_signature(Some(b"k".as_slice()), body, Some("00")), SignatureVerdict::Invalid);
    }

    #[test]
    fn test_empty_secret_does_not_panic() {
        let body = b"{\"trade_no\":\"T1\"}";
        let sig = compute_signature(b"", body).unwrap();
        assert!(verify_signature(b"", body, &sig));
        assert_eq!(check_signature(Some(b"".as_slice()), body, Some("00")), SignatureVerdict::Invalid);
    }
}
