//! Checklist of parameters the gateway requires on `submit-card-pay`.
//!
//! The proxy uses it to warn about incomplete card payments before they are
//! rejected upstream with error 40001, and `pagsmile-doctor params` prints it.

use serde_json::Value;

#[derive(Debug, Clone, Copy)]
pub struct RequiredParam {
    pub name: &'static str,
    pub description: &'static str,
    pub source: &'static str,
    pub example: &'static str,
}

pub const CARD_PAY_PARAMS: &[RequiredParam] = &[
    RequiredParam {
        name: "prepay_id",
        description: "Prepay id returned by /trade/create",
        source: "Query or body",
        example: "dGVzdFByZXBheUlkRm9yRXhhbXBsZQ==",
    },
    RequiredParam {
        name: "card_token",
        description: "Card token produced by the browser SDK",
        source: "Query or body",
        example: "tok_abc123xyz456",
    },
    RequiredParam {
        name: "app_id",
        description: "Pagsmile application id",
        source: "Body",
        example: "1234567890123456",
    },
    RequiredParam {
        name: "phone",
        description: "Customer phone with country code",
        source: "Body",
        example: "5511999999999",
    },
    RequiredParam {
        name: "email",
        description: "Customer email",
        source: "Body",
        example: "customer@example.com",
    },
    RequiredParam {
        name: "postal_code",
        description: "Customer postal code",
        source: "Body",
        example: "01310100",
    },
    RequiredParam {
        name: "payer_id",
        description: "Customer tax id (CPF, 11 digits)",
        source: "Body",
        example: "12345678900",
    },
    RequiredParam {
        name: "address",
        description: "Address object (country_code, state, city, street)",
        source: "Body",
        example: "{ country_code, zip_code, state, city, street }",
    },
];

/// Fields the address object must carry.
pub const ADDRESS_FIELDS: &[&str] = &["country_code", "state", "city", "street"];

/// Likely causes of gateway error 40001 and how to check each.
pub const COMMON_CAUSES: &[(&str, &str)] = &[
    (
        "prepay_id missing or empty",
        "check that /trade/create returned a valid prepay_id",
    ),
    (
        "card_token missing",
        "check that the SDK is producing the card token",
    ),
    ("app_id not sent in the body", "add app_id to the payload"),
    (
        "query params not merged into the body",
        "check the relay logs for the merged outbound body",
    ),
    (
        "incomplete address fields",
        "address.country_code, state, city and street must be present",
    ),
    (
        "malformed field",
        "phone needs the country code, CPF needs 11 digits",
    ),
];

/// Whether a path targets the card payment submission endpoint.
pub fn is_card_pay_path(path: &str) -> bool {
    path.trim_end_matches('/').ends_with("submit-card-pay")
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Object(m)) => m.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        _ => false,
    }
}

/// Names of required card-pay parameters that are absent or empty in `body`.
/// Incomplete addresses are reported as `address.<field>`.
pub fn missing_params(body: &serde_json::Map<String, Value>) -> Vec<String> {
    let mut missing = Vec::new();
    for param in CARD_PAY_PARAMS {
        let value = body.get(param.name);
        if is_blank(value) {
            missing.push(param.name.to_string());
            continue;
        }
        if param.name == "address" {
            if let Some(Value::Object(address)) = value {
                for field in ADDRESS_FIELDS {
                    if is_blank(address.get(*field)) {
                        missing.push(format!("address.{}", field));
                    }
                }
            }
        }
    }
    missing
}

/// A complete, well-formed card-pay body.
pub fn example_payload() -> Value {
    serde_json::json!({
        "prepay_id": "dGVzdFByZXBheUlkRm9yRXhhbXBsZQ==",
        "card_token": "tok_abc123xyz456",
        "app_id": "1234567890123456",
        "phone": "5511999999999",
        "email": "customer@example.com",
        "postal_code": "01310100",
        "payer_id": "12345678900",
        "address": {
            "country_code": "BRA",
            "zip_code": "01310100",
            "state": "SP",
            "city": "São Paulo",
            "street": "Avenida Paulista 1000"
        }
    })
}
