//! Shared application state and server configuration.

use std::sync::Arc;

use docflow_core::{defaults, DocumentService, Result};
use docflow_docspace::{PollerConfig, ResolverConfig};
use docflow_store::FlowStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FlowStore>,
    pub service: Arc<dyn DocumentService>,
    pub resolver_config: ResolverConfig,
    pub poller_config: PollerConfig,
    /// Shared secret for inbound webhook signatures. `None` disables
    /// verification entirely (permissive mode, warned about at startup).
    pub webhook_secret: Option<String>,
}

/// Server configuration read from the environment.
///
/// | Variable                     | Default                | Purpose                          |
/// |------------------------------|------------------------|----------------------------------|
/// | `HOST`                       | `0.0.0.0`              | Bind address                     |
/// | `PORT`                       | `8080`                 | Bind port                        |
/// | `DOCFLOW_SNAPSHOT_PATH`      | `docflow-state.json`   | Snapshot file location           |
/// | `DOCFLOW_WEBHOOK_SECRET`     | (unset)                | HMAC secret for inbound webhooks |
/// | `DOCFLOW_ROOM_TITLES`        | built-in candidates    | Comma-separated room title list  |
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub snapshot_path: String,
    pub webhook_secret: Option<String>,
    pub room_title_candidates: Vec<String>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(8080);
        let snapshot_path = std::env::var("DOCFLOW_SNAPSHOT_PATH")
            .unwrap_or_else(|_| defaults::SNAPSHOT_PATH.to_string());
        let webhook_secret = std::env::var("DOCFLOW_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty());
        let room_title_candidates = std::env::var("DOCFLOW_ROOM_TITLES")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            host,
            port,
            snapshot_path,
            webhook_secret,
            room_title_candidates,
        })
    }
}
