use actix_web::{web, HttpResponse};
use std::time::Instant;

use crate::error::RelayError;
use crate::metrics::{ORDERS_TOTAL, ORDER_LATENCY};
use crate::orders::{CreateOrderRequest, TradeCreatePayload, TradeQueryPayload};
use crate::state::AppState;

/// POST /api/create-order - create a gateway order and hand back its prepay id
pub async fn create_order(
    body: web::Json<CreateOrderRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, RelayError> {
    let started = Instant::now();
    let request = body.into_inner();

    let payload = TradeCreatePayload::build(&state.config, &request).inspect_err(|_| {
        ORDERS_TOTAL.with_label_values(&["invalid"]).inc();
    })?;
    tracing::info!(
        out_trade_no = %payload.out_trade_no,
        amount = %payload.order_amount,
        currency = payload.order_currency,
        "creating order"
    );

    let result = state.gateway.trade_create(&payload).await;
    let elapsed = started.elapsed();
    ORDER_LATENCY.observe(elapsed.as_secs_f64());

    let reply = result.map_err(|e| {
        ORDERS_TOTAL.with_label_values(&["error"]).inc();
        RelayError::Gateway {
            error: "failed to process payment",
            details: e.details(),
        }
    })?;

    if reply.is_success() {
        ORDERS_TOTAL.with_label_values(&["created"]).inc();
        tracing::info!(
            prepay_id = reply.prepay_id.as_deref().unwrap_or_default(),
            trade_no = reply.trade_no.as_deref().unwrap_or_default(),
            out_trade_no = %payload.out_trade_no,
            duration_ms = elapsed.as_millis() as u64,
            "order created"
        );
        Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "prepay_id": reply.prepay_id,
            "trade_no": reply.trade_no,
            "out_trade_no": payload.out_trade_no,
        })))
    } else {
        ORDERS_TOTAL.with_label_values(&["rejected"]).inc();
        tracing::error!(
            code = ?reply.code,
            msg = ?reply.msg,
            sub_code = ?reply.sub_code,
            sub_msg = ?reply.sub_msg,
            "gateway rejected order"
        );
        Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": reply.msg.as_deref().unwrap_or("failed to create order"),
            "sub_error": reply.sub_msg,
            "code": reply.code,
            "sub_code": reply.sub_code,
        })))
    }
}

/// GET /api/query-transaction/{trade_no} - look up by gateway trade number
pub async fn query_transaction(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, RelayError> {
    let trade_no = path.into_inner();
    tracing::info!(trade_no = %trade_no, "querying transaction");

    let payload = TradeQueryPayload::by_trade_no(&state.config.app_id, trade_no);
    let reply = state
        .gateway
        .trade_query(&payload)
        .await
        .map_err(|e| RelayError::Gateway {
            error: "failed to query transaction",
            details: e.details(),
        })?;

    tracing::info!(trade_status = ?reply.get("trade_status"), "transaction status");
    Ok(HttpResponse::Ok().json(reply))
}

/// GET /api/query-by-order/{out_trade_no} - look up by merchant order number
pub async fn query_by_order(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, RelayError> {
    let out_trade_no = path.into_inner();
    tracing::info!(out_trade_no = %out_trade_no, "querying order");

    let payload = TradeQueryPayload::by_out_trade_no(&state.config.app_id, out_trade_no);
    let reply = state
        .gateway
        .trade_query(&payload)
        .await
        .map_err(|e| RelayError::Gateway {
            error: "failed to query order",
            details: e.details(),
        })?;

    Ok(HttpResponse::Ok().json(reply))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/create-order", web::post().to(create_order))
        .route(
            "/api/query-transaction/{trade_no}",
            web::get().to(query_transaction),
        )
        .route(
            "/api/query-by-order/{out_trade_no}",
            web::get().to(query_by_order),
        );
}
