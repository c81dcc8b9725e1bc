mod config;
mod db;
mod dictionary;
mod error;
mod game;
mod models;
mod routes;
mod utils;
mod websocket;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use config::Config;
use dashmap::DashMap;
use db::ProgressStore;
use dictionary::{DefinitionService, HttpDefinitionService, OfflineDefinitionService, WordCatalog};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Bookkeeping for a live websocket session
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub connected_at: DateTime<Utc>,
}

impl SessionInfo {
    pub fn new() -> Self {
        Self {
            connected_at: Utc::now(),
        }
    }
}

/// Application state shared across all handlers
pub struct AppState {
    pub config: Config,
    pub catalog: Arc<WordCatalog>,
    pub definitions: Arc<dyn DefinitionService>,
    pub progress: ProgressStore,
    pub sessions: DashMap<Uuid, SessionInfo>,
}

impl AppState {
    pub fn new(
        config: Config,
        catalog: WordCatalog,
        definitions: Arc<dyn DefinitionService>,
    ) -> Self {
        let progress = ProgressStore::new(&config.storage.progress_path);
        Self {
            config,
            catalog: Arc::new(catalog),
            definitions,
            progress,
            sessions: DashMap::new(),
        }
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(websocket::handle_websocket))
        .merge(routes::create_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn load_catalog(config: &Config) -> WordCatalog {
    let Some(path) = &config.dictionary.word_list_path else {
        tracing::info!("No word list configured, using built-in catalog");
        return WordCatalog::builtin();
    };

    match WordCatalog::load(path).await {
        Ok(catalog) if !catalog.is_empty() => catalog,
        Ok(_) => {
            tracing::warn!("Word list {} is empty. Using built-in catalog.", path);
            WordCatalog::builtin()
        }
        Err(e) => {
            tracing::warn!("Failed to load word list: {:#}. Using built-in catalog.", e);
            WordCatalog::builtin()
        }
    }
}

fn definition_service(config: &Config) -> Result<Arc<dyn DefinitionService>> {
    let Some(url) = &config.dictionary.definition_api_url else {
        tracing::info!("No definition API configured, definitions will use fallbacks");
        return Ok(Arc::new(OfflineDefinitionService));
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.dictionary.request_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;
    tracing::info!("Definition lookups via {}", url);
    Ok(Arc::new(HttpDefinitionService::new(url.clone(), client)))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "word_tiles_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting word tiles backend server...");

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let catalog = load_catalog(&config).await;
    tracing::info!("Word catalog ready with {} words", catalog.len());

    let definitions = definition_service(&config)?;
    let state = Arc::new(AppState::new(config.clone(), catalog, definitions));
    tracing::info!("Progress stored at {}", state.progress.path().display());

    let app = create_app(state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("WebSocket endpoint: ws://{}/ws", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Shared state with a throwaway progress file and offline definitions
#[cfg(test)]
pub(crate) fn test_state(game: config::GameConfig) -> Arc<AppState> {
    use config::{DictionaryConfig, ServerConfig, StorageConfig};

    let progress_path = std::env::temp_dir()
        .join(format!("word-tiles-state-{}", Uuid::new_v4()))
        .join("progress.json");

    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        game,
        dictionary: DictionaryConfig {
            word_list_path: None,
            definition_api_url: None,
            request_timeout_secs: 1,
        },
        storage: StorageConfig {
            progress_path: progress_path.to_string_lossy().into_owned(),
        },
    };

    Arc::new(AppState::new(
        config,
        WordCatalog::builtin(),
        Arc::new(OfflineDefinitionService),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::GameConfig;

    #[tokio::test]
    async fn test_missing_word_list_falls_back_to_builtin() {
        let state = test_state(GameConfig::default());
        let mut config = state.config.clone();
        config.dictionary.word_list_path = Some("/nonexistent/words.txt".to_string());

        let catalog = load_catalog(&config).await;
        assert_eq!(catalog.len(), WordCatalog::builtin().len());
    }

    #[test]
    fn test_definition_service_without_url_is_offline() {
        let state = test_state(GameConfig::default());
        let service = definition_service(&state.config).unwrap();
        assert!(tokio_test::block_on(service.lookup("cat")).is_err());
    }
}
