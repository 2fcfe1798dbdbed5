//! HTTP surface tests, driven through `build_router` with `oneshot`

mod helpers;

use axum::http::StatusCode;
use helpers::{empty_request, extract_json, json_request, multipart_request, FakeGenerator, TestRoot};
use matlib_common::Channel;
use matlib_server::{build_router, AppState};
use serde_json::json;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

fn setup_app(root: &TestRoot) -> axum::Router {
    build_router(AppState::with_generator(root.config.clone(), None))
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let root = TestRoot::new();
    let response = setup_app(&root)
        .oneshot(empty_request("GET", "/health"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "matlib-server");
    assert!(body["version"].is_string());
}

// =============================================================================
// Stage → confirm → fetch
// =============================================================================

#[tokio::test]
async fn test_staged_color_file_confirms_into_record() {
    let root = TestRoot::new();
    let state = AppState::with_generator(root.config.clone(), None);
    state.staging.stage("SKU001", "SKU001_Color.png", b"c").await.unwrap();
    let app = build_router(state);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/materials/confirm",
            json!({ "materials": [{ "sku": "SKU001", "properties": { "name": "Oak" } }] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["confirmed"], json!(["SKU001"]));
    assert_eq!(body["errors"], json!([]));

    let response = app
        .oneshot(empty_request("GET", "/materials/SKU001"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let record = extract_json(response.into_body()).await;
    assert_eq!(record["id"], "SKU001");
    assert_eq!(record["name"], "Oak");
    assert_eq!(record["channelFiles"], json!({ "color": "SKU001_Color.png" }));
    assert!(record["createdAt"].is_string());
}

#[tokio::test]
async fn test_confirm_without_materials_array_is_bad_request() {
    let root = TestRoot::new();
    let response = setup_app(&root)
        .oneshot(json_request("POST", "/materials/confirm", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_upload_endpoint_reports_pbr_status() {
    let root = TestRoot::new();
    let generator = Arc::new(FakeGenerator::producing(&[Channel::Normal]));
    let app = build_router(AppState::with_generator(
        root.config.clone(),
        Some(generator),
    ));

    let response = app
        .oneshot(multipart_request(
            "/materials/upload",
            &[("Slate_Color.png", &b"png"[..]), ("notes.txt", &b"txt"[..])],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["uploaded"][0]["sku"], "Slate");
    assert_eq!(body["uploaded"][0]["pbrStatus"], "ready");
    assert_eq!(body["uploaded"][0]["channels"], json!(["normal"]));
    assert_eq!(body["rejected"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_generate_pbr_endpoint_retries_staged_color() {
    let root = TestRoot::new();
    root.stage_raw("Slate", "Slate_Color.png");
    let generator = Arc::new(FakeGenerator::producing(&[Channel::Normal]));
    let app = build_router(AppState::with_generator(
        root.config.clone(),
        Some(generator),
    ));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/materials/generate-pbr",
            json!({ "sku": "Slate" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["pbrStatus"], "ready");
    assert_eq!(body["channels"], json!(["normal"]));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/materials/generate-pbr",
            json!({ "sku": "Granite" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(json_request("POST", "/materials/generate-pbr", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_route_name_cannot_be_saved_as_sku() {
    let root = TestRoot::new();
    let app = setup_app(&root);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/materials/save",
            json!({ "sku": "staging", "metadata": { "name": "Shadow" } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(empty_request("GET", "/materials/staging"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(extract_json(response.into_body()).await.is_array());
}

#[tokio::test]
async fn test_cleanup_temp_returns_count() {
    let root = TestRoot::new();
    root.stage_raw("A", "A_Color.png");
    root.stage_raw("B", "B_Color.png");
    let app = setup_app(&root);

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/materials/cleanup-temp"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await, json!({ "cleaned": 2 }));

    let response = app
        .oneshot(empty_request("DELETE", "/materials/cleanup-temp"))
        .await
        .unwrap();
    assert_eq!(extract_json(response.into_body()).await, json!({ "cleaned": 0 }));
}

// =============================================================================
// Record endpoints
// =============================================================================

#[tokio::test]
async fn test_unknown_sku_is_404() {
    let root = TestRoot::new();
    let response = setup_app(&root)
        .oneshot(empty_request("GET", "/materials/NOPE"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_corrupt_store_gives_404_not_500() {
    let root = TestRoot::new();
    std::fs::write(root.config.store_path(), "{{{{").unwrap();
    let response = setup_app(&root)
        .oneshot(empty_request("GET", "/materials/ANY"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_put_merges_and_keeps_id() {
    let root = TestRoot::new();
    let app = setup_app(&root);
    app.clone()
        .oneshot(json_request(
            "POST",
            "/materials/save",
            json!({ "sku": "S1", "properties": { "name": "Oak", "format": "60x60" } }),
        ))
        .await
        .unwrap();

    let response = app
        .oneshot(json_request(
            "PUT",
            "/materials/S1",
            json!({ "id": "HIJACK", "colorLabel": "Honey", "tags": ["wood"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let record = extract_json(response.into_body()).await;
    assert_eq!(record["id"], "S1");
    assert_eq!(record["name"], "Oak");
    assert_eq!(record["format"], "60x60");
    assert_eq!(record["colorLabel"], "Honey");
    assert_eq!(record["tags"], json!(["wood"]));
}

#[tokio::test]
async fn test_put_unknown_sku_is_404() {
    let root = TestRoot::new();
    let response = setup_app(&root)
        .oneshot(json_request("PUT", "/materials/NOPE", json!({ "name": "x" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pbr_settings_round_trip_over_http() {
    let root = TestRoot::new();
    let app = setup_app(&root);
    app.clone()
        .oneshot(json_request(
            "POST",
            "/materials/save",
            json!({ "sku": "S1", "properties": { "name": "Oak" } }),
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/materials/S1/pbr-settings",
            json!({ "roughness": 0.7, "enableAO": false }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/materials/S1/pbr-settings"))
        .await
        .unwrap();
    let settings = extract_json(response.into_body()).await;
    let roughness = settings["roughness"].as_f64().unwrap();
    assert!((roughness - 0.7).abs() < 1e-6);
    assert_eq!(settings["enableAO"], false);
    assert_eq!(settings["enableNormal"], true);

    let response = app
        .oneshot(json_request(
            "PUT",
            "/materials/S1/pbr-settings",
            json!({ "metalness": 3.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_and_batch_delete() {
    let root = TestRoot::new();
    let app = setup_app(&root);
    for sku in ["A", "B", "C"] {
        app.clone()
            .oneshot(json_request(
                "POST",
                "/materials/save",
                json!({ "sku": sku, "properties": { "name": sku } }),
            ))
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/materials/A"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request("DELETE", "/materials", json!({ "skus": ["B", "A"] })))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["deleted"], json!(["B"]));
    assert_eq!(body["errors"].as_array().unwrap().len(), 1);

    let response = app
        .oneshot(empty_request("GET", "/materials"))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(
        body["materials"].as_object().unwrap().keys().collect::<Vec<_>>(),
        vec!["C"]
    );
}

#[tokio::test]
async fn test_material_files_listing() {
    let root = TestRoot::new();
    let assets = root.config.materials_dir().join("S1");
    std::fs::create_dir_all(&assets).unwrap();
    for name in ["S1_Color.png", "S1_Roughness.jpg", "S1.glb", "readme.txt"] {
        std::fs::write(assets.join(name), b"x").unwrap();
    }

    let response = setup_app(&root)
        .oneshot(empty_request("GET", "/materials/S1/files"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        extract_json(response.into_body()).await,
        json!({ "color": "S1_Color.png", "roughness": "S1_Roughness.jpg", "model": "S1.glb" })
    );
}

#[tokio::test]
async fn test_committed_assets_are_served() {
    let root = TestRoot::new();
    let assets = root.config.materials_dir().join("S1");
    std::fs::create_dir_all(&assets).unwrap();
    std::fs::write(assets.join("S1_Color.png"), b"pixels").unwrap();
    let app = setup_app(&root);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/assets/materials/S1/S1_Color.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"pixels");

    let response = app
        .oneshot(empty_request("GET", "/assets/materials/S1/S1_Normal.jpg"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Presets
// =============================================================================

#[tokio::test]
async fn test_presets_accept_legacy_and_serve_flat() {
    let root = TestRoot::new();
    let app = setup_app(&root);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/presets/house",
            json!({
                "Presets": {
                    "1": [{ "targetTxt": "OAK", "objects": [{ "uuid": "m1" }] }]
                }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/presets/house"))
        .await
        .unwrap();
    assert_eq!(
        extract_json(response.into_body()).await,
        json!({ "presets": [[{ "uuid": "m1", "sku": "OAK" }]] })
    );

    let response = app
        .oneshot(empty_request("GET", "/presets/unknown"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
