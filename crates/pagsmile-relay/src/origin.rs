//! Origin resolution for proxied gateway calls.
//!
//! The gateway checks `Origin`/`Referer` against the domains registered for the
//! merchant, so every proxied call carries an explicit origin. It is picked from
//! the first available source in a fixed order:
//!
//! 1. pinned frontend origin (`FRONTEND_ORIGIN`)
//! 2. configured `DOMAIN`, unless it points at localhost
//! 3. the request's `Origin` header
//! 4. the request's `Referer` header, reduced to `scheme://host[:port]`
//! 5. `X-Forwarded-Host` (with `X-Forwarded-Proto`, default `https`)
//! 6. the connection scheme and `Host` the relay itself was reached on

use actix_web::HttpRequest;
use serde::Serialize;
use url::Url;

/// Raw inputs for origin resolution, captured from config and the request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OriginSources {
    pub pinned: Option<String>,
    pub configured_domain: Option<String>,
    pub header_origin: Option<String>,
    pub header_referer: Option<String>,
    pub forwarded_proto: Option<String>,
    pub forwarded_host: Option<String>,
    pub request_scheme: Option<String>,
    pub request_host: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginSource {
    Pinned,
    ConfiguredDomain,
    OriginHeader,
    RefererHeader,
    ForwardedHost,
    RequestHost,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOrigin {
    pub value: String,
    pub source: OriginSource,
}

impl OriginSources {
    /// Collect origin inputs from an inbound request.
    pub fn from_request(
        req: &HttpRequest,
        pinned: Option<&str>,
        configured_domain: Option<&str>,
    ) -> Self {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let conn = req.connection_info();

        Self {
            pinned: pinned.map(str::to_string),
            configured_domain: configured_domain.map(str::to_string),
            header_origin: header("origin"),
            header_referer: header("referer"),
            forwarded_proto: header("x-forwarded-proto"),
            forwarded_host: header("x-forwarded-host"),
            request_scheme: Some(conn.scheme().to_string()),
            request_host: header("host").or_else(|| Some(conn.host().to_string())),
        }
    }
}

/// Pick the origin to present to the gateway. Always yields a value.
pub fn resolve_origin(sources: &OriginSources) -> ResolvedOrigin {
    let non_empty = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_string);

    if let Some(pinned) = non_empty(&sources.pinned) {
        return ResolvedOrigin {
            value: pinned,
            source: OriginSource::Pinned,
        };
    }

    if let Some(domain) = non_empty(&sources.configured_domain) {
        if !domain.contains("localhost") {
            return ResolvedOrigin {
                value: domain,
                source: OriginSource::ConfiguredDomain,
            };
        }
    }

    if let Some(origin) = non_empty(&sources.header_origin) {
        return ResolvedOrigin {
            value: origin,
            source: OriginSource::OriginHeader,
        };
    }

    if let Some(referer) = non_empty(&sources.header_referer) {
        return ResolvedOrigin {
            value: origin_of(&referer).unwrap_or(referer),
            source: OriginSource::RefererHeader,
        };
    }

    if let Some(host) = non_empty(&sources.forwarded_host) {
        let proto = non_empty(&sources.forwarded_proto).unwrap_or_else(|| "https".to_string());
        return ResolvedOrigin {
            value: format!("{}://{}", proto, host),
            source: OriginSource::ForwardedHost,
        };
    }

    let scheme = non_empty(&sources.request_scheme).unwrap_or_else(|| "http".to_string());
    let host = non_empty(&sources.request_host).unwrap_or_default();
    ResolvedOrigin {
        value: format!("{}://{}", scheme, host),
        source: OriginSource::RequestHost,
    }
}

/// `scheme://host[:port]` of an absolute URL, or None if it does not parse.
fn origin_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn all_sources() -> OriginSources {
        OriginSources {
            pinned: Some("https://shop.example.com".to_string()),
            configured_domain: Some("https://relay.example.com".to_string()),
            header_origin: Some("https://origin.example.com".to_string()),
            header_referer: Some("https://referer.example.com/checkout?x=1".to_string()),
            forwarded_proto: Some("http".to_string()),
            forwarded_host: Some("edge.example.com".to_string()),
            request_scheme: Some("http".to_string()),
            request_host: Some("127.0.0.1:3000".to_string()),
        }
    }

    #[test]
    fn test_priority_order() {
        let mut s = all_sources();
        assert_eq!(resolve_origin(&s).source, OriginSource::Pinned);
        assert_eq!(resolve_origin(&s).value, "https://shop.example.com");

        s.pinned = None;
        assert_eq!(resolve_origin(&s).source, OriginSource::ConfiguredDomain);

        s.configured_domain = None;
        assert_eq!(resolve_origin(&s).value, "https://origin.example.com");

        s.header_origin = None;
        let r = resolve_origin(&s);
        assert_eq!(r.source, OriginSource::RefererHeader);
        assert_eq!(r.value, "https://referer.example.com");

        s.header_referer = None;
        let r = resolve_origin(&s);
        assert_eq!(r.source, OriginSource::ForwardedHost);
        assert_eq!(r.value, "http://edge.example.com");

        s.forwarded_host = None;
        let r = resolve_origin(&s);
        assert_eq!(r.source, OriginSource::RequestHost);
        assert_eq!(r.value, "http://127.0.0.1:3000");
    }

    #[test]
    fn test_localhost_domain_is_skipped() {
        let mut s = all_sources();
        s.pinned = None;
        s.configured_domain = Some("http://localhost:3000".to_string());
        assert_eq!(resolve_origin(&s).source, OriginSource::OriginHeader);
    }

    #[test]
    fn test_referer_keeps_port() {
        let s = OriginSources {
            header_referer: Some("http://checkout.example.com:8080/pay/step2".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_origin(&s).value, "http://checkout.example.com:8080");
    }

    #[test]
    fn test_unparseable_referer_used_raw() {
        let s = OriginSources {
            header_referer: Some("checkout-page".to_string()),
            ..Default::default()
        };
        let r = resolve_origin(&s);
        assert_eq!(r.source, OriginSource::RefererHeader);
        assert_eq!(r.value, "checkout-page");
    }

    #[test]
    fn test_forwarded_proto_defaults_to_https() {
        let s = OriginSources {
            forwarded_host: Some("app.vercel.example".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_origin(&s).value, "https://app.vercel.example");
    }

    #[test]
    fn test_empty_values_fall_through() {
        let s = OriginSources {
            pinned: Some(String::new()),
            header_origin: Some(String::new()),
            request_host: Some("relay.local".to_string()),
            ..Default::default()
        };
        let r = resolve_origin(&s);
        assert_eq!(r.source, OriginSource::RequestHost);
        assert_eq!(r.value, "http://relay.local");
    }

    #[test]
    fn test_from_request_reads_headers() {
        let req = TestRequest::default()
            .insert_header(("Origin", "https://a.example"))
            .insert_header(("Referer", "https://b.example/x"))
            .insert_header(("X-Forwarded-Host", "c.example"))
            .insert_header(("Host", "d.example"))
            .to_http_request();
        let s = OriginSources::from_request(&req, None, Some("http://localhost:3000"));
        assert_eq!(s.header_origin.as_deref(), Some("https://a.example"));
        assert_eq!(s.header_referer.as_deref(), Some("https://b.example/x"));
        assert_eq!(s.forwarded_host.as_deref(), Some("c.example"));
        assert_eq!(s.request_host.as_deref(), Some("d.example"));
        assert_eq!(resolve_origin(&s).value, "https://a.example");
    }
}
