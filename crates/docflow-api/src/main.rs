//! docflow-api - HTTP API server for docflow

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use docflow_api::{build_router, ApiConfig, AppState};
use docflow_core::DocumentService;
use docflow_docspace::{DocSpaceClient, DocSpaceConfig, PollerConfig, ResolverConfig};
use docflow_store::{spawn_persister, FileSnapshotStorage, FlowStore, PersisterConfig};

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation ids, so ids sort
/// chronologically in logs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // LOG_FORMAT - "json" or "text" (default: "text")
    // RUST_LOG   - standard env filter
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "docflow_api=debug,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);
    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let config = ApiConfig::from_env()?;
    if config.webhook_secret.is_none() {
        warn!(
            "DOCFLOW_WEBHOOK_SECRET is not set; inbound webhooks will be accepted \
             without signature verification"
        );
    }

    // State store with debounced snapshot persistence
    let storage = Arc::new(FileSnapshotStorage::new(&config.snapshot_path));
    let store = Arc::new(FlowStore::load(storage).await?);
    let persister = spawn_persister(store.clone(), PersisterConfig::from_env());

    // External document service
    let docspace_config = DocSpaceConfig::from_env()?;
    let resolver_config = ResolverConfig {
        room_id: docspace_config.room_id.clone(),
        title_candidates: config.room_title_candidates.clone(),
    };
    let service: Arc<dyn DocumentService> = Arc::new(DocSpaceClient::new(docspace_config)?);

    let state = AppState {
        store: store.clone(),
        service,
        resolver_config,
        poller_config: PollerConfig::default(),
        webhook_secret: config.webhook_secret.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, flushing state");
    persister.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
