use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use pairly_shared::clients::rabbitmq::RabbitMQClient;

pub mod config;
pub mod embedding;
pub mod events;
pub mod matching;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;

#[cfg(test)]
mod testing;

use config::AppConfig;
use services::MatchService;

pub struct AppState {
    pub config: AppConfig,
    pub matching: MatchService,
    /// `None` when event publishing is off.
    pub rabbitmq: Option<RabbitMQClient>,
    pub metrics_handle: Option<PrometheusHandle>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        // Profiles
        .route(
            "/profiles/:id",
            get(routes::profile::get_profile).put(routes::profile::upsert_profile),
        )
        // Matching
        .route(
            "/profiles/:id/next-candidate",
            get(routes::candidates::next_candidate),
        )
        .route("/profiles/:id/decisions", post(routes::decisions::decide))
        // Admirers
        .route(
            "/profiles/:id/admirers/count",
            get(routes::admirers::pending_count),
        )
        .route(
            "/profiles/:id/admirers/next",
            get(routes::admirers::next_admirer),
        )
        .route(
            "/profiles/:id/admirers/:admirer_id",
            post(routes::admirers::respond),
        )
        .layer(axum::middleware::from_fn(
            pairly_shared::middleware::metrics_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
