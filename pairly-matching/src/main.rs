use std::sync::Arc;
use std::time::Duration;

use pairly_matching::config::{AppConfig, StorageBackend};
use pairly_matching::embedding::{DisabledEmbeddings, EmbeddingProvider, OpenAiEmbeddingClient};
use pairly_matching::matching::EligibilityFilter;
use pairly_matching::services::MatchService;
use pairly_matching::store::{InMemoryStore, PgStore, Store};
use pairly_matching::AppState;
use pairly_shared::clients::db::create_pool;
use pairly_shared::clients::rabbitmq::RabbitMQClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pairly_shared::middleware::init_tracing("pairly-matching");

    let config = AppConfig::load()?;
    let port = config.port;

    let metrics_handle = match pairly_shared::middleware::init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "prometheus recorder not installed");
            None
        }
    };

    // Storage
    let store: Arc<dyn Store> = match config.storage {
        StorageBackend::Postgres => {
            let pool = create_pool(&config.database_url, 10)?;
            tracing::info!("using postgres store");
            Arc::new(PgStore::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory store, data is lost on restart");
            Arc::new(InMemoryStore::new())
        }
    };

    // Embeddings
    let provider: Arc<dyn EmbeddingProvider> = if config.embeddings_enabled() {
        Arc::new(OpenAiEmbeddingClient::new(
            &config.embedding_api_url,
            &config.embedding_api_key,
            &config.embedding_model,
            Duration::from_secs(config.embedding_timeout_secs),
        )?)
    } else {
        tracing::warn!("no embedding api key, candidates keep filter order");
        Arc::new(DisabledEmbeddings)
    };

    // Events
    let rabbitmq = if config.events_enabled() {
        match RabbitMQClient::connect(&config.rabbitmq_url).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "rabbitmq unavailable, events disabled");
                None
            }
        }
    } else {
        None
    };

    let matching = MatchService::new(
        store,
        provider,
        EligibilityFilter::new(config.age_tolerance),
        config.candidate_pool_limit,
    );

    let state = Arc::new(AppState {
        config,
        matching,
        rabbitmq,
        metrics_handle,
    });

    let app = pairly_matching::router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "pairly-matching starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
