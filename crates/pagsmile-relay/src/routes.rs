//! HTTP route table. Each module exposes a `configure` hook for `App::configure`.

pub mod health;
pub mod meta;
pub mod orders;
pub mod proxy;
pub mod webhook;

use actix_web::{middleware::DefaultHeaders, web};

/// Mount every relay route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::configure)
        .configure(meta::configure)
        .configure(orders::configure)
        .configure(webhook::configure)
        .configure(proxy::configure);
}

/// Headers that keep browsers and intermediaries from caching any relay reply.
pub fn no_cache_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Cache-Control", "no-store, no-cache, must-revalidate, private"))
        .add(("Pragma", "no-cache"))
        .add(("Expires", "0"))
}
