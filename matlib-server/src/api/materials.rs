//! Material repository endpoints
//!
//! GET/PUT/DELETE /materials/:sku, batch confirm, batch delete, staging
//! cleanup, file listing and PBR settings.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use matlib_common::{ChannelRole, MaterialPatch, MaterialRecord, PbrSettings, PbrSettingsPatch};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    error::{ApiError, ApiResult},
    repository::DeleteReport,
    staging::{ConfirmEntry, ConfirmReport, StagingEntry},
    AppState,
};

/// GET /materials response
#[derive(Debug, Serialize)]
pub struct MaterialListResponse {
    pub materials: BTreeMap<String, MaterialRecord>,
}

/// POST /materials/confirm request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub materials: Option<Vec<ConfirmEntry>>,
    #[serde(default)]
    pub pbr_configs: BTreeMap<String, PbrSettingsPatch>,
}

/// POST /materials/save request
#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    #[serde(default)]
    pub sku: String,
    #[serde(default, alias = "properties")]
    pub metadata: MaterialPatch,
}

/// DELETE /materials request
#[derive(Debug, Deserialize)]
pub struct BatchDeleteRequest {
    pub skus: Option<Vec<String>>,
}

/// DELETE /materials/cleanup-temp response
#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub cleaned: usize,
}

/// GET /materials/check/:sku response
#[derive(Debug, Serialize)]
pub struct ExistsResponse {
    pub sku: String,
    pub exists: bool,
}

/// DELETE /materials/:sku response
#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: String,
}

/// GET /materials
pub async fn list_materials(State(state): State<AppState>) -> Json<MaterialListResponse> {
    Json(MaterialListResponse {
        materials: state.repository.get_all().await,
    })
}

/// GET /materials/:sku
pub async fn get_material(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> ApiResult<Json<MaterialRecord>> {
    Ok(Json(state.repository.get(&sku).await?))
}

/// PUT /materials/:sku
///
/// Partial update of an existing record; `id` and `createdAt` never change.
pub async fn update_material(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Json(patch): Json<MaterialPatch>,
) -> ApiResult<Json<MaterialRecord>> {
    let record = state.repository.update(&sku, &patch).await?;
    tracing::info!(sku = %sku, "Material updated");
    Ok(Json(record))
}

/// POST /materials/save
///
/// Create or merge a record directly, bypassing staging.
pub async fn save_material(
    State(state): State<AppState>,
    Json(request): Json<SaveRequest>,
) -> ApiResult<Json<MaterialRecord>> {
    let record = state
        .repository
        .upsert(request.sku.trim(), &request.metadata)
        .await?;
    Ok(Json(record))
}

/// GET /materials/check/:sku
pub async fn check_material(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> Json<ExistsResponse> {
    let exists = state.repository.contains(&sku).await;
    Json(ExistsResponse { sku, exists })
}

/// DELETE /materials/:sku
pub async fn delete_material(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> ApiResult<Json<DeletedResponse>> {
    state.repository.delete(&sku).await?;
    Ok(Json(DeletedResponse { deleted: sku }))
}

/// DELETE /materials
pub async fn delete_materials(
    State(state): State<AppState>,
    Json(request): Json<BatchDeleteRequest>,
) -> ApiResult<Json<DeleteReport>> {
    let skus = request
        .skus
        .ok_or_else(|| ApiError::BadRequest("An array of SKUs is required".to_string()))?;
    Ok(Json(state.repository.delete_many(&skus).await))
}

/// POST /materials/confirm
///
/// Always 200 with per-item results once the request is well formed.
pub async fn confirm_materials(
    State(state): State<AppState>,
    Json(request): Json<ConfirmRequest>,
) -> ApiResult<Json<ConfirmReport>> {
    let entries = request
        .materials
        .ok_or_else(|| ApiError::BadRequest("An array of materials is required".to_string()))?;
    Ok(Json(
        state
            .staging
            .confirm_batch(&entries, &request.pbr_configs)
            .await,
    ))
}

/// GET /materials/staging
pub async fn list_staging(State(state): State<AppState>) -> ApiResult<Json<Vec<StagingEntry>>> {
    Ok(Json(state.staging.entries().await?))
}

/// DELETE /materials/cleanup-temp
pub async fn cleanup_staging(State(state): State<AppState>) -> ApiResult<Json<CleanupResponse>> {
    let cleaned = state.staging.cleanup().await?;
    Ok(Json(CleanupResponse { cleaned }))
}

/// GET /materials/:sku/files
pub async fn material_files(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> ApiResult<Json<BTreeMap<ChannelRole, String>>> {
    Ok(Json(state.repository.list_files(&sku).await?))
}

/// GET /materials/:sku/pbr-settings
pub async fn get_pbr_settings(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> ApiResult<Json<PbrSettings>> {
    Ok(Json(state.repository.pbr_settings(&sku).await?))
}

/// PUT /materials/:sku/pbr-settings
pub async fn update_pbr_settings(
    State(state): State<AppState>,
    Path(sku): Path<String>,
    Json(patch): Json<PbrSettingsPatch>,
) -> ApiResult<Json<PbrSettings>> {
    if patch.is_empty() {
        return Err(ApiError::BadRequest("PBR settings are required".to_string()));
    }
    Ok(Json(state.repository.update_pbr_settings(&sku, &patch).await?))
}

/// Build material routes
pub fn material_routes() -> Router<AppState> {
    Router::new()
        .route("/materials", get(list_materials).delete(delete_materials))
        .route("/materials/confirm", post(confirm_materials))
        .route("/materials/save", post(save_material))
        .route("/materials/staging", get(list_staging))
        .route("/materials/cleanup-temp", delete(cleanup_staging))
        .route("/materials/check/:sku", get(check_material))
        .route(
            "/materials/:sku",
            get(get_material).put(update_material).delete(delete_material),
        )
        .route("/materials/:sku/files", get(material_files))
        .route(
            "/materials/:sku/pbr-settings",
            get(get_pbr_settings).put(update_pbr_settings),
        )
}
