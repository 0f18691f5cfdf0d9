//! HTTP server for web2050.
//!
//! This crate provides the axum server in front of the generation pipeline:
//! - `GET /{*path}` serves a stored page or streams a freshly generated one
//! - `GET /?q=` lists and searches stored pages
//! - `POST /reset` deletes a stored page so it is generated again
//!
//! # Quick Start
//!
//! ```ignore
//! use web2050_config::Config;
//! use web2050_server::{run_server, server_config_from_config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::load(None, None).unwrap();
//!     run_server(server_config_from_config(&config)).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum router (web2050-server)
//!                        │
//!                        ├─► GET /{*path} ──► GenerationPipeline
//!                        │                        ├─► PageStore (hit)
//!                        │                        └─► ContentGenerator (miss, single-flight)
//!                        │
//!                        ├─► GET / ──► PageStore search
//!                        │
//!                        └─► POST /reset ──► GenerationPipeline::delete
//! ```

mod app;
mod error;
mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use state::AppState;
use web2050_config::{Config, GeneratorConfig};
use web2050_pipeline::{GenerationPipeline, OpenAiGenerator};
use web2050_store::{PageStore, SqlitePageStore, StoreAssetProvider};

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// `sqlx` SQLite URL of the page database.
    pub database_url: String,
    /// Page database pool size.
    pub max_connections: u32,
    /// Upstream generator settings.
    pub generator: GeneratorConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 3000,
            database_url: "sqlite://.web2050/pages.db?mode=rwc".to_owned(),
            max_connections: 20,
            generator: GeneratorConfig::default(),
        }
    }
}

/// Run the server.
///
/// # Arguments
///
/// * `config` - Server configuration
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the server fails to start.
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let sqlite = SqlitePageStore::connect(&config.database_url, config.max_connections).await?;
    let store: Arc<dyn PageStore> = Arc::new(sqlite.clone());

    let generator = OpenAiGenerator::from_config(&config.generator)?;
    tracing::info!(
        endpoint = %generator.endpoint(),
        model = %config.generator.model,
        "Generator configured"
    );

    let pipeline = GenerationPipeline::new(
        Arc::clone(&store),
        Arc::new(StoreAssetProvider::new(Arc::clone(&store))),
        Arc::new(generator),
        &config.generator.output_tag,
    );

    let state = Arc::new(AppState { pipeline, store });
    let app = app::create_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(address = %listener.local_addr()?, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sqlite.close().await;
    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from web2050 config.
#[must_use]
pub fn server_config_from_config(config: &Config) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        database_url: config.database_resolved.url(),
        max_connections: config.database_resolved.max_connections,
        generator: config.generator.clone(),
    }
}
