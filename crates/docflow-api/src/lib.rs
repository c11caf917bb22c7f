//! # docflow-api
//!
//! HTTP server for docflow: webhook ingestion, flow operations, and
//! project/contact CRUD, on top of the flow store and the external
//! document-service layer.

pub mod handlers;
pub mod services;
pub mod state;

pub use state::{ApiConfig, AppState};

use axum::routing::{get, head, post, put};
use axum::Router;

/// Build the application router. Middleware layers (tracing, request ids,
/// CORS) are applied by the binary.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/webhooks/docspace",
            head(handlers::webhooks::probe).post(handlers::webhooks::receive),
        )
        .route(
            "/api/flows",
            post(handlers::flows::create_flow).get(handlers::flows::list_flows),
        )
        .route("/api/flows/bulk", post(handlers::flows::bulk_create))
        .route("/api/flows/:id", get(handlers::flows::get_flow))
        .route("/api/flows/:id/events", get(handlers::flows::get_flow_events))
        .route("/api/flows/:id/cancel", post(handlers::flows::cancel_flow))
        .route("/api/flows/:id/reopen", post(handlers::flows::reopen_flow))
        .route("/api/flows/:id/complete", post(handlers::flows::complete_flow))
        .route("/api/flows/:id/archive", post(handlers::flows::archive_flow))
        .route(
            "/api/flows/:id/unarchive",
            post(handlers::flows::unarchive_flow),
        )
        .route(
            "/api/projects",
            post(handlers::projects::create_project).get(handlers::projects::list_projects),
        )
        .route(
            "/api/projects/:id",
            get(handlers::projects::get_project).delete(handlers::projects::delete_project),
        )
        .route(
            "/api/projects/:id/archive",
            post(handlers::projects::archive_project),
        )
        .route(
            "/api/projects/:id/unarchive",
            post(handlers::projects::unarchive_project),
        )
        .route(
            "/api/contacts",
            get(handlers::contacts::list_contacts).post(handlers::contacts::create_contact),
        )
        .route(
            "/api/contacts/:id",
            put(handlers::contacts::update_contact).delete(handlers::contacts::delete_contact),
        )
        .with_state(state)
}
