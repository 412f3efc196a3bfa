use std::env;
use url::Url;

const PRODUCTION_GATEWAY_URL: &str = "https://gateway.pagsmile.com";
const SANDBOX_GATEWAY_URL: &str = "https://gateway-test.pagsmile.com";
const DEFAULT_ENV: &str = "sandbox";
const DEFAULT_REGION_CODE: &str = "BRA";
const DEFAULT_DOMAIN: &str = "http://localhost:3000";
const DEFAULT_PORT: u16 = 3000;

#[derive(Clone)]
pub struct RelayConfig {
    /// Pagsmile application id
    pub app_id: String,
    /// Pagsmile security key, half of the Basic-Auth credential
    pub security_key: String,
    /// Public key handed to the browser SDK
    pub public_key: String,
    /// Gateway environment ("sandbox" or "prod")
    pub env: String,
    /// Region code (e.g. "BRA", "EUP", "USA")
    pub region_code: String,
    /// Base URL of the upstream gateway, without trailing slash
    pub gateway_url: String,
    /// Public domain this relay is reachable at
    pub domain: String,
    /// Frontend origin that always wins origin resolution for proxied calls
    pub frontend_origin: Option<String>,
    /// Server port
    pub port: u16,
    /// CORS allowed origins
    pub allowed_origins: Vec<String>,
    /// Directory with the checkout page and its assets (None = don't serve)
    pub static_dir: Option<String>,
    /// Key used to check the `pagsmile-signature` header on notifications
    pub webhook_secret: Option<Vec<u8>>,
    /// Downstream URLs that receive a copy of every payment notification
    pub notify_forward_urls: Vec<String>,
    /// Bearer token required for /metrics endpoint (None = public)
    pub metrics_token: Option<String>,
}

impl std::fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayConfig")
            .field("app_id", &self.app_id)
            .field("security_key", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .field("env", &self.env)
            .field("region_code", &self.region_code)
            .field("gateway_url", &self.gateway_url)
            .field("domain", &self.domain)
            .field("frontend_origin", &self.frontend_origin)
            .field("port", &self.port)
            .field("allowed_origins", &self.allowed_origins)
            .field("static_dir", &self.static_dir)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("notify_forward_urls", &self.notify_forward_urls)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // Gateway credentials. The relay still starts without them so
        // /api/test-credentials can report what is missing.
        let app_id = var("PAGSMILE_APP_ID").unwrap_or_default();
        if app_id.is_empty() {
            tracing::warn!("PAGSMILE_APP_ID not set; gateway calls will be rejected");
        }
        let security_key = var("PAGSMILE_SECURITY_KEY").unwrap_or_default();
        if security_key.is_empty() {
            tracing::warn!("PAGSMILE_SECURITY_KEY not set; gateway calls will be rejected");
        }

        let public_key = var("PAGSMILE_PUBLIC_KEY").unwrap_or_default();
        if public_key.is_empty() {
            tracing::warn!("PAGSMILE_PUBLIC_KEY not set; the browser SDK cannot encrypt cards");
        }

        let env_name = var("PAGSMILE_ENV").unwrap_or_else(|| DEFAULT_ENV.to_string());
        let region_code = var("PAGSMILE_REGION_CODE").unwrap_or_else(|| DEFAULT_REGION_CODE.to_string());

        // Optional: explicit upstream, otherwise picked from the environment flag
        let gateway_url = var("PAGSMILE_GATEWAY_URL")
            .unwrap_or_else(|| gateway_url_for(&env_name).to_string());
        let gateway_url = validate_url(&gateway_url)?.trim_end_matches('/').to_string();

        let domain = var("DOMAIN").unwrap_or_else(|| DEFAULT_DOMAIN.to_string());
        let domain = validate_url(&domain)?.trim_end_matches('/').to_string();

        let frontend_origin = match var("FRONTEND_ORIGIN") {
            Some(origin) => Some(validate_url(&origin)?.trim_end_matches('/').to_string()),
            None => None,
        };

        let port = var("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        // The checkout page may be served from anywhere, so CORS is open unless narrowed.
        let allowed_origins = var("ALLOWED_ORIGINS")
            .map(|s| split_list(&s))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| vec!["*".to_string()]);

        let static_dir = var("STATIC_DIR");

        let webhook_secret = var("PAGSMILE_WEBHOOK_SECRET").map(String::into_bytes);

        let notify_forward_urls = match var("NOTIFY_FORWARD_URLS") {
            Some(list) => split_list(&list)
                .into_iter()
                .map(|u| validate_url(&u))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let metrics_token = var("METRICS_TOKEN");
        if metrics_token.is_none() {
            tracing::warn!("METRICS_TOKEN not set; /metrics endpoint is publicly accessible");
        }

        Ok(Self {
            app_id,
            security_key,
            public_key,
            env: env_name,
            region_code,
            gateway_url,
            domain,
            frontend_origin,
            port,
            allowed_origins,
            static_dir,
            webhook_secret,
            notify_forward_urls,
            metrics_token,
        })
    }

    pub fn is_production(&self) -> bool {
        self.env == "prod"
    }
}

/// Gateway host for an environment flag. Only "prod" selects production.
pub fn gateway_url_for(env_name: &str) -> &'static str {
    if env_name == "prod" {
        PRODUCTION_GATEWAY_URL
    } else {
        SANDBOX_GATEWAY_URL
    }
}

fn validate_url(raw: &str) -> Result<String, ConfigError> {
    Url::parse(raw).map_err(|_| ConfigError::InvalidUrl(raw.to_string()))?;
    Ok(raw.to_string())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const CREDS: [(&str, &str); 2] = [
        ("PAGSMILE_APP_ID", "1234567890123456"),
        ("PAGSMILE_SECURITY_KEY", "sk_test"),
    ];

    #[test]
    fn test_defaults() {
        let config = RelayConfig::from_lookup(lookup(&CREDS)).unwrap();
        assert_eq!(config.env, "sandbox");
        assert_eq!(config.region_code, "BRA");
        assert_eq!(config.gateway_url, "https://gateway-test.pagsmile.com");
        assert_eq!(config.domain, "http://localhost:3000");
        assert_eq!(config.port, 3000);
        assert_eq!(config.allowed_origins, vec!["*"]);
        assert!(config.frontend_origin.is_none());
        assert!(!config.is_production());
    }

    #[test]
    fn test_prod_selects_production_gateway() {
        let mut pairs = CREDS.to_vec();
        pairs.push(("PAGSMILE_ENV", "prod"));
        let config = RelayConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.gateway_url, "https://gateway.pagsmile.com");
        assert!(config.is_production());
    }

    #[test]
    fn test_gateway_override_strips_trailing_slash() {
        let mut pairs = CREDS.to_vec();
        pairs.push(("PAGSMILE_GATEWAY_URL", "http://127.0.0.1:9999/"));
        let config = RelayConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.gateway_url, "http://127.0.0.1:9999");
    }

    #[test]
    fn test_missing_credentials_still_load() {
        let config =
            RelayConfig::from_lookup(lookup(&[("PAGSMILE_SECURITY_KEY", "sk_test")])).unwrap();
        assert!(config.app_id.is_empty());
        assert_eq!(config.security_key, "sk_test");

        let config = RelayConfig::from_lookup(lookup(&[("PAGSMILE_APP_ID", "  ")])).unwrap();
        assert!(config.app_id.is_empty());
        assert!(config.security_key.is_empty());
    }

    #[test]
    fn test_invalid_domain_rejected() {
        let mut pairs = CREDS.to_vec();
        pairs.push(("DOMAIN", "not a url"));
        let err = RelayConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl(_)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut pairs = CREDS.to_vec();
        pairs.push(("PAGSMILE_WEBHOOK_SECRET", "whsec"));
        let config = RelayConfig::from_lookup(lookup(&pairs)).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk_test"));
        assert!(!debug.contains("whsec"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_forward_urls_parsed() {
        let mut pairs = CREDS.to_vec();
        pairs.push((
            "NOTIFY_FORWARD_URLS",
            "https://a.example/hook, https://b.example/hook,",
        ));
        let config = RelayConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.notify_forward_urls.len(), 2);
    }
}
