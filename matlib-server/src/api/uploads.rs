//! POST /materials/upload (multipart, field `files`) and
//! POST /materials/generate-pbr

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    upload::{UploadReport, UploadResult, UploadedFile},
    AppState,
};

/// Field carrying uploaded files
const FILES_FIELD: &str = "files";

/// POST /materials/upload
///
/// Stages every file and runs PBR generation; per-file outcomes are in the
/// response body.
pub async fn upload_materials(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadReport>> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Could not read {}: {}", file_name, e)))?;
        files.push(UploadedFile {
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    Ok(Json(state.uploads.process(files).await?))
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub sku: String,
}

/// POST /materials/generate-pbr
///
/// Retries channel generation for an already staged colour map.
pub async fn generate_pbr(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<Json<UploadResult>> {
    if request.sku.trim().is_empty() {
        return Err(ApiError::BadRequest("SKU is required".to_string()));
    }
    Ok(Json(state.uploads.regenerate(&request.sku).await?))
}

/// Build upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/materials/upload", post(upload_materials))
        .route("/materials/generate-pbr", post(generate_pbr))
}
