//! matlib-server library interface
//!
//! Material repository, staging area, upload pipeline and preset store,
//! exposed over HTTP. The binary in `main.rs` only resolves configuration
//! and serves [`build_router`].

pub mod api;
pub mod config;
pub mod error;
pub mod pbr;
pub mod presets;
pub mod repository;
pub mod staging;
pub mod upload;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use config::ServerConfig;
use pbr::{PbrGenerator, ScriptPbrGenerator};
use presets::PresetStore;
use repository::MaterialRepository;
use staging::StagingArea;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use upload::UploadPipeline;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<MaterialRepository>,
    pub staging: Arc<StagingArea>,
    pub uploads: Arc<UploadPipeline>,
    pub presets: Arc<PresetStore>,
    pub config: Arc<ServerConfig>,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// State with the script generator when PBR is enabled in `config`
    pub fn new(config: ServerConfig) -> Self {
        let generator: Option<Arc<dyn PbrGenerator>> = if config.pbr_enabled {
            Some(Arc::new(ScriptPbrGenerator::new(
                config.pbr_interpreter.clone(),
                config.pbr_script.clone(),
            )))
        } else {
            None
        };
        Self::with_generator(config, generator)
    }

    /// State with an explicit generator (`None` disables generation)
    pub fn with_generator(config: ServerConfig, generator: Option<Arc<dyn PbrGenerator>>) -> Self {
        let repository = Arc::new(MaterialRepository::from_config(&config));
        Self::with_parts(config, repository, generator)
    }

    /// State around an existing repository
    pub fn with_parts(
        config: ServerConfig,
        repository: Arc<MaterialRepository>,
        generator: Option<Arc<dyn PbrGenerator>>,
    ) -> Self {
        let staging = Arc::new(StagingArea::new(config.staging_dir(), repository.clone()));
        let uploads = Arc::new(UploadPipeline::new(
            staging.clone(),
            generator,
            config.pbr_resolution,
        ));
        let presets = Arc::new(PresetStore::new(config.presets_dir()));

        Self {
            repository,
            staging,
            uploads,
            presets,
            config: Arc::new(config),
            startup_time: Utc::now(),
        }
    }
}

/// Route prefix committed asset files are served under
pub const ASSET_ROUTE: &str = "/assets/materials";

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    let assets = ServeDir::new(state.config.materials_dir());

    Router::new()
        .merge(api::health_routes())
        .merge(api::upload_routes())
        .merge(api::material_routes())
        .merge(api::preset_routes())
        .nest_service(ASSET_ROUTE, assets)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
