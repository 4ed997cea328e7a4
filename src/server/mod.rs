//! Prediction HTTP server
//!
//! Thin axum layer over [`PredictionService`]: artifacts are loaded once at
//! startup and every request is a read-only lookup.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use handlers::{CompaniesResponse, NamesResponse, PredictionResponse};
pub use state::{AppState, CarCatalog};

use crate::artifacts::FileArtifactStore;
use crate::config::{AppConfig, DEFAULT_REFERENCE_YEAR};
use crate::error::{Stage, StageContext};
use crate::inference::PredictionService;
use crate::ingestion::CsvDatasetProvider;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory with `preprocessor.bin` and `model.bin`
    pub artifacts_dir: PathBuf,
    /// Raw dataset used for the company and name listings
    pub catalog_path: PathBuf,
    pub reference_year: i32,
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let app = AppConfig::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            artifacts_dir: std::env::var("CARPRICE_ARTIFACTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(app.artifacts.dir),
            catalog_path: std::env::var("CARPRICE_CATALOG_PATH")
                .map(PathBuf::from)
                .unwrap_or(app.data.source_path),
            reference_year: DEFAULT_REFERENCE_YEAR,
            cors_origin: std::env::var("CORS_ORIGIN").ok(),
        }
    }
}

impl ServerConfig {
    /// Take artifact location, catalog and reference year from `app`
    pub fn from_app_config(app: &AppConfig) -> Self {
        Self {
            artifacts_dir: app.artifacts.dir.clone(),
            catalog_path: app.data.source_path.clone(),
            reference_year: app.features.reference_year,
            ..Self::default()
        }
    }

    pub fn with_address(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }
}

/// Load artifacts and the catalog
pub fn build_state(config: &ServerConfig) -> crate::error::Result<AppState> {
    let store = FileArtifactStore::new(&config.artifacts_dir);
    let service = PredictionService::load(&store, config.reference_year)?;
    let catalog = CarCatalog::from_provider(&CsvDatasetProvider::new(&config.catalog_path))
        .stage(Stage::Ingestion, "loading car catalog")?;
    info!(
        companies = catalog.companies().len(),
        catalog = %config.catalog_path.display(),
        "Car catalog loaded"
    );
    Ok(AppState::new(service, catalog))
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    info!(
        artifacts_dir = %config.artifacts_dir.display(),
        started_at = %start_time.to_rfc3339(),
        "Loading prediction artifacts"
    );

    let state = Arc::new(build_state(&config)?);
    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(url = %format!("http://{}/api/health", addr), "Health endpoint available");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening and ready to accept connections");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Could not listen for ctrl+c");
            std::future::pending::<()>().await;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_app_config() {
        let app = AppConfig::default()
            .with_artifacts_dir("/tmp/carprice-artifacts")
            .with_reference_year(2030);
        let config = ServerConfig::from_app_config(&app).with_address("127.0.0.1", 9000);

        assert_eq!(config.artifacts_dir, PathBuf::from("/tmp/carprice-artifacts"));
        assert_eq!(config.reference_year, 2030);
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_missing_artifacts_fail_startup() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            artifacts_dir: dir.path().to_path_buf(),
            ..ServerConfig::default()
        };
        assert!(build_state(&config).is_err());
    }
}
