use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger, web};
use dotenv::dotenv;
use std::net::TcpListener;
use std::time::Duration;

mod config;
mod error;
mod handlers;
mod models;
mod routes;
mod services;

use crate::config::AppSettings;
use crate::routes::configure_routes;
use crate::services::countdown::spawn_countdown;
use crate::services::dispatcher::ActionDispatcher;
use crate::services::feed_client::{ChannelSession, FeedClient};
use crate::services::intake_store::IntakeStore;
use crate::services::reconciliation::ReconciliationService;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Load application settings
    let app_settings = match AppSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Failed to load application settings: {}", e);
            log::error!("Cannot start console without valid settings");
            std::process::exit(1);
        }
    };

    // Single-writer store for the live intake collection
    let (store, _reducer_handle) = IntakeStore::spawn();

    // Outbound channel carrying operator events to the feed connection
    let (outbound_tx, outbound_rx) = tokio::sync::mpsc::unbounded_channel();
    let dispatcher = ActionDispatcher::new(store.clone(), outbound_tx);

    // Channel credentials are passed in explicitly, never read from ambient
    // global state
    let session = ChannelSession::new(app_settings.feed.token.clone());

    let ticker_handle = spawn_countdown(store.clone());

    let feed_client = FeedClient::new(
        app_settings.feed.ws_url.clone(),
        session.clone(),
        store.clone(),
        Duration::from_secs(app_settings.feed.reconnect_delay_secs),
    );
    let feed_handle = tokio::spawn(feed_client.run(outbound_rx));
    log::info!("Feed client started for {}", app_settings.feed.ws_url);

    let reconciliation_handle = if app_settings.reconciliation.enabled {
        let service = ReconciliationService::new(
            app_settings.backend.base_url.clone(),
            session,
            store.clone(),
            Duration::from_secs(app_settings.reconciliation.interval_secs),
        );
        log::info!(
            "Reconciliation refetch every {}s against {}",
            app_settings.reconciliation.interval_secs,
            app_settings.backend.base_url
        );
        Some(service.spawn())
    } else {
        log::info!("Reconciliation refetch disabled");
        None
    };

    // Get server host and port from settings
    let host = &app_settings.server.host;
    let port = app_settings.server.port;

    log::info!("Starting console at http://{}:{}", host, port);

    let server_addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(server_addr)?;

    let settings_for_app = app_settings.clone();
    HttpServer::new(move || {
        let app_settings = settings_for_app.clone();
        let store = store.clone();
        let dispatcher = dispatcher.clone();

        // Configure CORS using actix-cors
        let mut cors = Cors::default().supports_credentials();

        if app_settings.server.cors_origins.contains(&"*".to_string()) {
            cors = cors.allow_any_origin();
        } else {
            for origin in &app_settings.server.cors_origins {
                cors = cors.allowed_origin(origin);
            }
        }

        cors = cors.allow_any_method().allow_any_header();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(app_settings))
            .app_data(web::Data::new(store))
            .app_data(web::Data::new(dispatcher))
            // Health check endpoint
            .service(web::resource("/health").route(web::get().to(handlers::health::health_check)))
            // Operator API
            .service(web::scope("/api").configure(configure_routes))
    })
    .listen(listener)?
    .run()
    .await?;

    // Release the feed connection and timers with the server
    ticker_handle.abort();
    feed_handle.abort();
    if let Some(handle) = reconciliation_handle {
        handle.abort();
    }

    Ok(())
}
