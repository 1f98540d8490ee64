//! # Pulse Server
//!
//! Actix-web entry point. Hosts one optimistic feed store and exposes it over
//! JSON routes plus a server-sent event stream of snapshots.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod config;
mod handlers;
mod middleware;
mod state;
mod telemetry;

use config::AppConfig;
use state::AppState;
use telemetry::{TelemetryConfig, init_telemetry};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!(
        "Starting Pulse server on {}:{}",
        config.host,
        config.port
    );

    let state = AppState::new(&config);

    // The server still starts on a failed first load; clients can refresh.
    match state.store.load_all().await {
        Ok(count) => tracing::info!(count, "Initial feed loaded"),
        Err(e) => tracing::error!("Initial feed load failed: {}", e),
    }

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
