use actix_web::{web, HttpRequest, HttpResponse};

use crate::error::RelayError;
use crate::proxy;
use crate::state::AppState;

const PROXY_PREFIX: &str = "/pagsmile-proxy";

/// Sub-path after the proxy prefix, still percent-encoded as the client sent it.
fn raw_sub_path(req: &HttpRequest) -> &str {
    let path = req.path();
    let rest = path.strip_prefix(PROXY_PREFIX).unwrap_or(path);
    rest.strip_prefix('/').unwrap_or(rest)
}

/// ANY /pagsmile-proxy/{path:.*} - forward to `{gateway}/{path}` with server-side credentials
pub async fn pagsmile_proxy(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, RelayError> {
    let path = proxy::sanitize_path(raw_sub_path(&req))?;
    proxy::relay(&state, &req, &path, body).await
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource(PROXY_PREFIX).route(web::route().to(pagsmile_proxy)))
        .service(
            web::resource(format!("{}/{{path:.*}}", PROXY_PREFIX))
                .route(web::route().to(pagsmile_proxy)),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_raw_sub_path_keeps_encoding() {
        let req = TestRequest::post()
            .uri("/pagsmile-proxy/api/x%3Finjected=1?a=1")
            .to_http_request();
        assert_eq!(raw_sub_path(&req), "api/x%3Finjected=1");
    }

    #[test]
    fn test_raw_sub_path_empty() {
        let req = TestRequest::get().uri("/pagsmile-proxy").to_http_request();
        assert_eq!(raw_sub_path(&req), "");
        let req = TestRequest::get().uri("/pagsmile-proxy/").to_http_request();
        assert_eq!(raw_sub_path(&req), "");
    }
}
