use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};
use std::sync::LazyLock;

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Proxy metrics
pub static PROXY_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "relay_proxy_requests_total",
            "Proxied gateway requests by upstream status",
        ),
        &["status"],
    )
    .unwrap()
});

pub static PROXY_LATENCY: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("relay_proxy_latency_seconds", "Proxy request latency")
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    )
    .unwrap()
});

// Order metrics
pub static ORDERS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("relay_orders_total", "Order creation attempts by outcome"),
        &["outcome"],
    )
    .unwrap()
});

pub static ORDER_LATENCY: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("relay_order_latency_seconds", "Order creation latency")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .unwrap()
});

// Webhook metrics
pub static WEBHOOKS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "relay_webhooks_total",
            "Payment notifications received by trade status",
        ),
        &["status"],
    )
    .unwrap()
});

pub static WEBHOOK_SIGNATURES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "relay_webhook_signature_total",
            "Notification signature checks by verdict",
        ),
        &["verdict"],
    )
    .unwrap()
});

/// Register all metrics with the registry. Safe to call more than once.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(PROXY_REQUESTS_TOTAL.clone()),
        Box::new(PROXY_LATENCY.clone()),
        Box::new(ORDERS_TOTAL.clone()),
        Box::new(ORDER_LATENCY.clone()),
        Box::new(WEBHOOKS_TOTAL.clone()),
        Box::new(WEBHOOK_SIGNATURES.clone()),
    ];
    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => tracing::error!("Failed to register metric: {}", e),
        }
    }
}
