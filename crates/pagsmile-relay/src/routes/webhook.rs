use actix_web::{web, HttpRequest, HttpResponse};

use crate::logging;
use crate::metrics::{WEBHOOKS_TOTAL, WEBHOOK_SIGNATURES};
use crate::notification::{
    check_signature, forward_notification, PaymentNotification, SignatureVerdict, TradeStatus,
    SIGNATURE_HEADER,
};
use crate::proxy::parse_body;
use crate::state::AppState;

/// POST /api/webhook/payment - payment status notification from the gateway.
///
/// Always acknowledged with `{"result":"success"}` so the gateway stops retrying.
/// JSON and form bodies are read; an empty or unreadable body is logged and
/// treated as a notification without fields. Signature problems are logged, not
/// rejected.
pub async fn payment_notification(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> HttpResponse {
    let headers = logging::redacted_headers(
        req.headers()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_bytes())),
    );
    tracing::info!(bytes = body.len(), "payment notification received");
    tracing::debug!(
        headers = %headers,
        body = %String::from_utf8_lossy(&body),
        "notification payload"
    );

    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let verdict = check_signature(state.config.webhook_secret.as_deref(), &body, signature);
    WEBHOOK_SIGNATURES
        .with_label_values(&[verdict.label()])
        .inc();
    match verdict {
        SignatureVerdict::Missing => {
            tracing::warn!("notification arrived without a signature header")
        }
        SignatureVerdict::Invalid => tracing::warn!("notification signature does not match"),
        _ => {}
    }

    let content_type = req
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json");
    let fields = parse_body(Some(content_type), &body);
    let readable = !fields.is_empty();
    let notification =
        match serde_json::from_value::<PaymentNotification>(serde_json::Value::Object(fields)) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, "notification fields unreadable");
                PaymentNotification::default()
            }
        };
    let status = notification.status();
    if readable {
        WEBHOOKS_TOTAL.with_label_values(&[status.label()]).inc();
    } else {
        tracing::warn!("notification body empty or unreadable");
        WEBHOOKS_TOTAL.with_label_values(&["malformed"]).inc();
    }

    let trade_no = notification.trade_no.as_deref().unwrap_or_default();
    let out_trade_no = notification.out_trade_no.as_deref().unwrap_or_default();
    match &status {
        TradeStatus::Success => {
            tracing::info!(trade_no, out_trade_no, "payment succeeded")
        }
        TradeStatus::Failed => {
            tracing::warn!(trade_no, out_trade_no, "payment failed")
        }
        TradeStatus::Processing => {
            tracing::info!(trade_no, out_trade_no, "payment processing")
        }
        TradeStatus::Unknown(raw) => {
            tracing::info!(trade_no, out_trade_no, trade_status = %raw, "unrecognised payment status")
        }
    }

    if !state.config.notify_forward_urls.is_empty() {
        forward_notification(
            state.http_client(),
            &state.config.notify_forward_urls,
            content_type,
            body,
        );
    }

    HttpResponse::Ok().json(serde_json::json!({ "result": "success" }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/webhook/payment", web::post().to(payment_notification));
}
