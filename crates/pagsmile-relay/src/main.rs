use actix_web::{middleware::Logger, web, App, HttpServer};

use pagsmile_relay::{
    config::RelayConfig, error::json_error_handler, logging, metrics::register_metrics, routes,
    state::AppState,
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    logging::init_tracing();
    logging::log_environment();

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    let port = config.port;
    let allowed_origins = config.allowed_origins.clone();
    let static_dir = config.static_dir.clone();

    tracing::info!("Starting pagsmile-relay on port {}", port);
    tracing::info!(config = ?config, "configuration loaded");
    tracing::info!(
        "Webhook signature check: {}",
        if config.webhook_secret.is_some() {
            "enabled"
        } else {
            "disabled"
        }
    );

    register_metrics();

    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(
        production = state.config.is_production(),
        "Gateway: {}",
        state.gateway.base_url()
    );
    let state_data = web::Data::new(state);

    if let Some(ref dir) = static_dir {
        tracing::info!("Serving checkout files from: {}", dir);
    }

    HttpServer::new(move || {
        let cors = pagsmile_relay::cors::build_cors(&allowed_origins);

        let mut app = App::new()
            .app_data(state_data.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::PayloadConfig::new(10 * 1024 * 1024)) // 10MB body limit
            .wrap(routes::no_cache_headers())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(routes::configure);

        // Static checkout files last so API routes win
        if let Some(ref dir) = static_dir {
            app = app.service(actix_files::Files::new("/", dir).index_file("checkout.html"));
        }

        app
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
