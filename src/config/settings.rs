use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppSettings {
    pub app: AppConfig,
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub feed: FeedConfig,
    pub reconciliation: ReconciliationConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub environment: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

/// REST side of the backend, used by the reconciliation refetch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
}

/// Push channel the intake feed arrives on.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedConfig {
    pub ws_url: String,
    pub token: String,
    pub reconnect_delay_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReconciliationConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl AppSettings {
    pub fn from_env() -> Result<Self, AppError> {
        // App config
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "intake-console".to_string());
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        // Server config
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|_| AppError::Configuration("SERVER_PORT must be a valid port number".to_string()))?;

        // CORS origins
        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        // Backend REST API
        let backend_base_url = env::var("BACKEND_API_URL")
            .map_err(|_| AppError::Configuration("BACKEND_API_URL must be set".to_string()))?;

        // Push channel
        let feed_ws_url = env::var("FEED_WS_URL")
            .map_err(|_| AppError::Configuration("FEED_WS_URL must be set".to_string()))?;

        let feed_token = env::var("FEED_TOKEN")
            .map_err(|_| AppError::Configuration("FEED_TOKEN must be set".to_string()))?;

        let reconnect_delay_secs = env::var("FEED_RECONNECT_DELAY_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u64>()
            .map_err(|_| AppError::Configuration("FEED_RECONNECT_DELAY_SECS must be a number".to_string()))?;

        // Reconciliation refetch
        let reconciliation_enabled = env::var("RECONCILIATION_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .map_err(|_| AppError::Configuration("RECONCILIATION_ENABLED must be true or false".to_string()))?;

        let reconciliation_interval_secs = env::var("RECONCILIATION_INTERVAL_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .map_err(|_| AppError::Configuration("RECONCILIATION_INTERVAL_SECS must be a number".to_string()))?;

        Ok(AppSettings {
            app: AppConfig {
                name: app_name,
                environment,
            },
            server: ServerConfig {
                host: server_host,
                port: server_port,
                cors_origins,
            },
            backend: BackendConfig {
                base_url: backend_base_url,
            },
            feed: FeedConfig {
                ws_url: feed_ws_url,
                token: feed_token,
                reconnect_delay_secs,
            },
            reconciliation: ReconciliationConfig {
                enabled: reconciliation_enabled,
                interval_secs: reconciliation_interval_secs,
            },
        })
    }
}
