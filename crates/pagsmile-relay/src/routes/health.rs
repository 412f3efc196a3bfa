use actix_web::{http::header, web, HttpRequest, HttpResponse};
use prometheus::{Encoder, TextEncoder};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::logging::hosting_platform;
use crate::metrics::REGISTRY;
use crate::state::AppState;

/// GET /health - liveness plus the environment the relay runs in
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "OK",
        "service": "pagsmile-relay",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": {
            "env": state.config.env,
            "region": state.config.region_code,
            "platform": hosting_platform().unwrap_or("standalone"),
        },
    }))
}

/// Token comparison over SHA-256 digests so neither content nor length leaks through timing.
fn tokens_match(given: &str, expected: &str) -> bool {
    Sha256::digest(given.as_bytes())
        .ct_eq(&Sha256::digest(expected.as_bytes()))
        .into()
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// GET /metrics - Prometheus exposition, gated by METRICS_TOKEN when set
pub async fn metrics(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    if let Some(expected) = state.config.metrics_token.as_deref() {
        if !bearer_token(&req).is_some_and(|token| tokens_match(token, expected)) {
            tracing::warn!("rejected /metrics scrape without a valid token");
            return HttpResponse::Unauthorized().json(serde_json::json!({
                "success": false,
                "error": "bearer token required",
            }));
        }
    }

    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&REGISTRY.gather()) {
        Ok(text) => HttpResponse::Ok()
            .content_type(encoder.format_type())
            .body(text),
        Err(e) => {
            tracing::error!(error = %e, "metrics encoding failed");
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics));
}
