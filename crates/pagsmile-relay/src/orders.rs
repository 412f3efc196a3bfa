//! Payloads for `/trade/create` and `/trade/query`.

use serde::{Deserialize, Serialize};

use crate::auth::gateway_timestamp;
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::gateway::string_or_number;

const PAYMENT_METHOD: &str = "CreditCard";
const SUBJECT: &str = "Product payment";
const CONTENT: &str = "Product or service description";
const TIMEOUT_EXPRESS: &str = "1d";
const API_VERSION: &str = "2.0";
const TRADE_TYPE: &str = "API";
const IDENTIFY_TYPE: &str = "CPF";
const STREET_NUMBER: &str = "1";

/// Body of `POST /api/create-order`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Number or numeric string
    pub amount: serde_json::Value,
    pub customer_info: CustomerInfo,
}

/// Checkout fields are passed through as text; numeric JSON values (phone, CPF,
/// postal code) are accepted and rendered as their digits.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    #[serde(default, deserialize_with = "string_or_number")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub cpf: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub zip_code: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeCreatePayload {
    pub app_id: String,
    pub out_trade_no: String,
    pub method: &'static str,
    pub order_amount: String,
    pub order_currency: &'static str,
    pub subject: &'static str,
    pub content: &'static str,
    pub notify_url: String,
    pub return_url: String,
    pub timestamp: String,
    pub timeout_express: &'static str,
    pub version: &'static str,
    pub trade_type: &'static str,
    pub buyer_id: String,
    pub customer: Customer,
    pub address: Address,
}

#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub identify: Identify,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Identify {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub number: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Address {
    pub zip_code: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub street_name: Option<String>,
    pub street_number: &'static str,
}

/// Lookup by gateway trade number or by the merchant's order number.
#[derive(Debug, Clone, Serialize)]
pub struct TradeQueryPayload {
    pub app_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_trade_no: Option<String>,
    pub timestamp: String,
}

impl TradeQueryPayload {
    pub fn by_trade_no(app_id: &str, trade_no: String) -> Self {
        Self {
            app_id: app_id.to_string(),
            trade_no: Some(trade_no),
            out_trade_no: None,
            timestamp: gateway_timestamp(),
        }
    }

    pub fn by_out_trade_no(app_id: &str, out_trade_no: String) -> Self {
        Self {
            app_id: app_id.to_string(),
            trade_no: None,
            out_trade_no: Some(out_trade_no),
            timestamp: gateway_timestamp(),
        }
    }
}

/// Settlement currency for a region code.
pub fn currency_for_region(region_code: &str) -> &'static str {
    match region_code {
        "EUP" => "EUR",
        "USA" => "USD",
        _ => "BRL",
    }
}

/// Merchant order number: `ORDER_{unix millis}_{9 random lowercase chars}`.
pub fn new_out_trade_no() -> String {
    let suffix: String = uuid::Uuid::new_v4().simple().to_string().chars().take(9).collect();
    format!("ORDER_{}_{}", chrono::Utc::now().timestamp_millis(), suffix)
}

/// Parse the inbound amount and render it with two decimals.
pub fn format_amount(amount: &serde_json::Value) -> Result<String, RelayError> {
    let value = match amount {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match value {
        Some(v) if v.is_finite() && v > 0.0 => Ok(format!("{:.2}", v)),
        _ => Err(RelayError::InvalidRequest(format!(
            "amount must be a positive number, got {}",
            amount
        ))),
    }
}

impl TradeCreatePayload {
    pub fn build(config: &RelayConfig, request: &CreateOrderRequest) -> Result<Self, RelayError> {
        let order_amount = format_amount(&request.amount)?;
        let info = &request.customer_info;

        let buyer_id = info
            .email
            .clone()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| format!("buyer_{}", chrono::Utc::now().timestamp_millis()));

        Ok(Self {
            app_id: config.app_id.clone(),
            out_trade_no: new_out_trade_no(),
            method: PAYMENT_METHOD,
            order_amount,
            order_currency: currency_for_region(&config.region_code),
            subject: SUBJECT,
            content: CONTENT,
            notify_url: format!("{}/api/webhook/payment", config.domain),
            return_url: format!("{}/success", config.domain),
            timestamp: gateway_timestamp(),
            timeout_express: TIMEOUT_EXPRESS,
            version: API_VERSION,
            trade_type: TRADE_TYPE,
            buyer_id,
            customer: Customer {
                identify: Identify {
                    kind: IDENTIFY_TYPE,
                    number: info.cpf.clone(),
                },
                name: info.name.clone(),
                email: info.email.clone(),
                phone: info.phone.clone(),
            },
            address: Address {
                zip_code: info.zip_code.clone(),
                state: info.state.clone(),
                city: info.city.clone(),
                street_name: info.address.clone(),
                street_number: STREET_NUMBER,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(region: &str) -> RelayConfig {
        let region = region.to_string();
        RelayConfig::from_lookup(move |key| match key {
            "PAGSMILE_APP_ID" => Some("app-1".to_string()),
            "PAGSMILE_SECURITY_KEY" => Some("sk".to_string()),
            "PAGSMILE_REGION_CODE" => Some(region.clone()),
            "DOMAIN" => Some("https://relay.example.com".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn request(amount: serde_json::Value) -> CreateOrderRequest {
        serde_json::from_value(serde_json::json!({
            "amount": amount,
            "customerInfo": {
                "name": "Maria Silva",
                "email": "maria@example.com",
                "cpf": "12345678900",
                "phone": "5511999999999",
                "zipCode": "01310100",
                "state": "SP",
                "city": "São Paulo",
                "address": "Avenida Paulista"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_customer_info_accepts_numbers() {
        let req: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "amount": 10,
            "customerInfo": {
                "email": "maria@example.com",
                "cpf": 12345678900u64,
                "phone": 5511999999999u64,
                "zipCode": 1310100,
                "city": null
            }
        }))
        .unwrap();
        let info = &req.customer_info;
        assert_eq!(info.phone.as_deref(), Some("5511999999999"));
        assert_eq!(info.cpf.as_deref(), Some("12345678900"));
        assert_eq!(info.zip_code.as_deref(), Some("1310100"));
        assert_eq!(info.email.as_deref(), Some("maria@example.com"));
        assert_eq!(info.city, None);
        assert_eq!(info.name, None);
    }

    #[test]
    fn test_currency_for_region() {
        assert_eq!(currency_for_region("BRA"), "BRL");
        assert_eq!(currency_for_region("EUP"), "EUR");
        assert_eq!(currency_for_region("USA"), "USD");
        assert_eq!(currency_for_region("MEX"), "BRL");
    }

    #[test]
    fn test_out_trade_no_shape() {
        let id = new_out_trade_no();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORDER");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_uppercase()));
        assert_ne!(new_out_trade_no(), id);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(&serde_json::json!(10)).unwrap(), "10.00");
        assert_eq!(format_amount(&serde_json::json!("99.9")).unwrap(), "99.90");
        assert_eq!(format_amount(&serde_json::json!(1.005)).unwrap(), "1.00");
        assert!(format_amount(&serde_json::json!("abc")).is_err());
        assert!(format_amount(&serde_json::json!(null)).is_err());
        assert!(format_amount(&serde_json::json!(-5)).is_err());
    }

    #[test]
    fn test_build_payload() {
        let payload = TradeCreatePayload::build(&config("EUP"), &request(serde_json::json!("25.5")))
            .unwrap();
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["app_id"], "app-1");
        assert_eq!(v["method"], "CreditCard");
        assert_eq!(v["order_amount"], "25.50");
        assert_eq!(v["order_currency"], "EUR");
        assert_eq!(v["notify_url"], "https://relay.example.com/api/webhook/payment");
        assert_eq!(v["return_url"], "https://relay.example.com/success");
        assert_eq!(v["version"], "2.0");
        assert_eq!(v["trade_type"], "API");
        assert_eq!(v["timeout_express"], "1d");
        assert_eq!(v["buyer_id"], "maria@example.com");
        assert_eq!(v["customer"]["identify"]["type"], "CPF");
        assert_eq!(v["customer"]["identify"]["number"], "12345678900");
        assert_eq!(v["address"]["street_name"], "Avenida Paulista");
        assert_eq!(v["address"]["street_number"], "1");
    }

    #[test]
    fn test_buyer_id_without_email() {
        let mut req = request(serde_json::json!(1));
        req.customer_info.email = None;
        let payload = TradeCreatePayload::build(&config("BRA"), &req).unwrap();
        assert!(payload.buyer_id.starts_with("buyer_"));
    }

    #[test]
    fn test_query_payload_skips_absent_id() {
        let v = serde_json::to_value(TradeQueryPayload::by_trade_no("app-1", "T1".into())).unwrap();
        assert_eq!(v["trade_no"], "T1");
        assert!(v.get("out_trade_no").is_none());

        let v = serde_json::to_value(TradeQueryPayload::by_out_trade_no("app-1", "ORDER_1".into()))
            .unwrap();
        assert_eq!(v["out_trade_no"], "ORDER_1");
        assert!(v.get("trade_no").is_none());
    }
}
