use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::auth::auth_header_sample;
use crate::state::AppState;

/// Public settings the checkout page needs to initialise the gateway SDK.
#[derive(Debug, Serialize)]
pub struct PublicConfig {
    pub app_id: String,
    pub public_key: String,
    pub env: String,
    pub region_code: String,
    pub domain: String,
}

/// GET /api/config
pub async fn public_config(state: web::Data<AppState>) -> HttpResponse {
    let config = &state.config;
    HttpResponse::Ok().json(PublicConfig {
        app_id: config.app_id.clone(),
        public_key: config.public_key.clone(),
        env: config.env.clone(),
        region_code: config.region_code.clone(),
        domain: config.domain.clone(),
    })
}

/// GET /api/test-credentials - which credentials are present, never their values
pub async fn test_credentials(state: web::Data<AppState>) -> HttpResponse {
    let config = &state.config;
    HttpResponse::Ok().json(serde_json::json!({
        "app_id_exists": !config.app_id.is_empty(),
        "security_key_exists": !config.security_key.is_empty(),
        "public_key_exists": !config.public_key.is_empty(),
        "env": config.env,
        "region": config.region_code,
        "gateway_url": state.gateway.base_url(),
        "auth_header_sample": auth_header_sample(state.gateway.auth_header()),
    }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/config", web::get().to(public_config))
        .route("/api/test-credentials", web::get().to(test_credentials));
}
