pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod ipfs;
pub mod ledger;
pub mod middleware;
pub mod ports;
pub mod services;
pub mod startup;
pub mod utils;
pub mod validation;

use std::sync::Arc;

use axum::{routing::get, Router};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::ports::BatchRepository;
use crate::services::listings::ListingCache;
use crate::services::registration::RegistrationService;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub repository: Arc<dyn BatchRepository>,
    pub registration: Arc<RegistrationService>,
    pub listings: Arc<ListingCache>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::batches::register_batch,
        handlers::batches::list_batches,
        handlers::batches::get_batch,
    ),
    components(schemas(
        db::models::Batch,
        db::models::BatchStatus,
        handlers::HealthStatus,
        handlers::DbPoolStats,
    ))
)]
pub struct ApiDoc;

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/farmer/batches",
            get(handlers::batches::list_batches).post(handlers::batches::register_batch),
        )
        .route("/farmer/batches/:batch_id", get(handlers::batches::get_batch))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}
