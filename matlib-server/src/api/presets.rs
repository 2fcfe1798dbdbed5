//! GET/PUT /presets/:project

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use matlib_common::PresetBook;

use crate::{error::ApiResult, AppState};

/// GET /presets/:project
///
/// Always answers in the flat format, whatever is on disk.
pub async fn get_presets(
    State(state): State<AppState>,
    Path(project): Path<String>,
) -> ApiResult<Json<PresetBook>> {
    Ok(Json(state.presets.load(&project).await?))
}

/// PUT /presets/:project
pub async fn put_presets(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Json(book): Json<PresetBook>,
) -> ApiResult<Json<PresetBook>> {
    Ok(Json(state.presets.save(&project, &book).await?))
}

/// Build preset routes
pub fn preset_routes() -> Router<AppState> {
    Router::new().route("/presets/:project", get(get_presets).put(put_presets))
}
