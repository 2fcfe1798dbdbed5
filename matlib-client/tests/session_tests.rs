//! Binding table, undo history, PBR toggle and pending selection

mod helpers;

use helpers::{record, scene_with_meshes, session, MemorySource};
use matlib_client::{ClientError, MaterialKind, Scene, HISTORY_CAPACITY};
use matlib_common::{Preset, PresetBinding};
use std::sync::Arc;

// =============================================================================
// Bind
// =============================================================================

#[tokio::test]
async fn test_bind_applies_and_records_binding() {
    let (scene, meshes) = scene_with_meshes(1);
    let source = Arc::new(MemorySource::with_skus(&["OAK"]));
    let mut session = session(scene, source.clone());

    let instance = session.bind(&meshes[0], "OAK").await.unwrap();

    assert_eq!(session.binding(&meshes[0]), Some("OAK"));
    let on_mesh = session.scene().material(&meshes[0]).unwrap();
    assert!(Arc::ptr_eq(&on_mesh, &instance));
    assert_eq!(instance.sku(), "OAK");
    assert_eq!(session.undo_info().history_size, 1);
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn test_rebind_overwrites_in_place() {
    let (scene, meshes) = scene_with_meshes(1);
    let source = Arc::new(MemorySource::with_skus(&["A", "B"]));
    let mut session = session(scene, source);

    session.bind(&meshes[0], "A").await.unwrap();
    session.bind(&meshes[0], "B").await.unwrap();

    assert_eq!(session.bindings().len(), 1);
    assert_eq!(session.binding(&meshes[0]), Some("B"));
}

#[tokio::test]
async fn test_bind_unknown_mesh_fetches_nothing() {
    let (scene, _) = scene_with_meshes(1);
    let source = Arc::new(MemorySource::with_skus(&["A"]));
    let mut session = session(scene, source.clone());

    assert!(matches!(
        session.bind("ghost", "A").await,
        Err(ClientError::UnknownMesh(_))
    ));
    assert_eq!(source.fetch_count(), 0);
    assert!(!session.undo_info().can_undo);
}

#[tokio::test]
async fn test_failed_fetch_leaves_state_untouched() {
    let (scene, meshes) = scene_with_meshes(1);
    let source = Arc::new(MemorySource::new());
    let mut session = session(scene, source);
    let before = session.scene().material(&meshes[0]).unwrap();

    assert!(matches!(
        session.bind(&meshes[0], "NOPE").await,
        Err(ClientError::NotFound(_))
    ));
    assert!(Arc::ptr_eq(&session.scene().material(&meshes[0]).unwrap(), &before));
    assert!(session.bindings().is_empty());
    assert!(session.history().is_empty());
}

#[tokio::test]
async fn test_glass_record_builds_glass_instance() {
    let (scene, meshes) = scene_with_meshes(1);
    let source = Arc::new(MemorySource::new());
    let mut glass = record("WIN1");
    glass.tags = vec!["vidrio".to_string()];
    source.insert(glass);
    let mut session = session(scene, source);

    let instance = session.bind(&meshes[0], "WIN1").await.unwrap();
    assert_eq!(instance.kind, MaterialKind::Glass);
    assert!(instance.color_map.is_none());
}

// =============================================================================
// Undo
// =============================================================================

#[tokio::test]
async fn test_undo_restores_exact_previous_instance() {
    let (scene, meshes) = scene_with_meshes(1);
    let source = Arc::new(MemorySource::with_skus(&["A", "B"]));
    let mut session = session(scene, source.clone());

    let a = session.bind(&meshes[0], "A").await.unwrap();

    // The record changes after A was applied; undo must not re-derive A
    let mut changed = record("A");
    changed.pbr_settings.roughness = Some(0.9);
    source.insert(changed);

    session.bind(&meshes[0], "B").await.unwrap();
    let report = session.undo().unwrap();

    assert_eq!(report.sku, "B");
    assert_eq!(report.restored, vec![meshes[0].clone()]);
    assert!(report.skipped.is_empty());
    let restored = session.scene().material(&meshes[0]).unwrap();
    assert!(Arc::ptr_eq(&restored, &a));
    assert_eq!(session.binding(&meshes[0]), Some("A"));
}

#[tokio::test]
async fn test_undo_first_bind_restores_scene_material_and_unbinds() {
    let (scene, meshes) = scene_with_meshes(1);
    let original = scene.material(&meshes[0]).unwrap();
    let source = Arc::new(MemorySource::with_skus(&["A"]));
    let mut session = session(scene, source);

    session.bind(&meshes[0], "A").await.unwrap();
    session.undo().unwrap();

    assert!(Arc::ptr_eq(&session.scene().material(&meshes[0]).unwrap(), &original));
    assert_eq!(session.binding(&meshes[0]), None);
}

#[tokio::test]
async fn test_undo_skips_mesh_without_previous_material() {
    let (mut scene, _) = scene_with_meshes(0);
    scene.add_mesh("bare", None);
    let source = Arc::new(MemorySource::with_skus(&["A"]));
    let mut session = session(scene, source);

    session.bind("bare", "A").await.unwrap();
    let report = session.undo().unwrap();

    assert!(report.restored.is_empty());
    assert_eq!(report.skipped, vec!["bare".to_string()]);
    assert!(session.scene().material("bare").is_some());
}

#[tokio::test]
async fn test_history_is_bounded_to_twenty() {
    let count = HISTORY_CAPACITY + 1;
    let (scene, meshes) = scene_with_meshes(count);
    let skus: Vec<String> = (0..count).map(|i| format!("SKU{}", i)).collect();
    let sku_refs: Vec<&str> = skus.iter().map(String::as_str).collect();
    let source = Arc::new(MemorySource::with_skus(&sku_refs));
    let mut session = session(scene, source);

    for (mesh, sku) in meshes.iter().zip(&skus) {
        session.bind(mesh, sku).await.unwrap();
    }
    assert_eq!(session.undo_info().history_size, HISTORY_CAPACITY);

    let successes = (0..count).filter(|_| session.undo().is_some()).count();
    assert_eq!(successes, HISTORY_CAPACITY);
    assert!(!session.undo_info().can_undo);

    // The evicted first bind can no longer be reverted
    assert_eq!(session.binding(&meshes[0]), Some("SKU0"));
    assert_eq!(session.bindings().len(), 1);
}

// =============================================================================
// Clear / PBR toggle
// =============================================================================

#[tokio::test]
async fn test_clear_all_detaches_every_mesh_and_forgets_history() {
    let (scene, meshes) = scene_with_meshes(3);
    let source = Arc::new(MemorySource::with_skus(&["A"]));
    let mut session = session(scene, source);
    session.bind(&meshes[0], "A").await.unwrap();
    session.bind(&meshes[1], "A").await.unwrap();
    session.begin_selection("A");

    session.clear_all();

    assert!(session.scene().material(&meshes[0]).is_none());
    assert!(session.scene().material(&meshes[1]).is_none());
    // Never-bound meshes are detached too
    assert!(session.scene().material(&meshes[2]).is_none());
    assert_eq!(session.scene().mesh_ids().len(), 3);
    assert!(session.bindings().is_empty());
    assert!(session.undo().is_none());
    assert_eq!(session.pending_selection(), None);
}

#[tokio::test]
async fn test_pbr_toggle_rebinds_every_mesh() {
    let (scene, meshes) = scene_with_meshes(2);
    let source = Arc::new(MemorySource::with_skus(&["A", "B"]));
    let mut session = session(scene, source.clone());
    session.bind(&meshes[0], "A").await.unwrap();
    session.bind(&meshes[1], "B").await.unwrap();
    assert!(!session
        .scene()
        .material(&meshes[0])
        .unwrap()
        .maps
        .is_empty());

    let report = session.toggle_pbr().await;

    assert!(!session.pbr_enabled());
    assert_eq!(report.rebound.len(), 2);
    assert!(report.errors.is_empty());
    assert_eq!(source.fetch_count(), 4);
    for mesh in &meshes {
        let instance = session.scene().material(mesh).unwrap();
        assert!(instance.maps.is_empty());
        assert!(!instance.metadata.pbr_maps_loaded);
    }

    // Setting the same value again is a no-op
    assert!(session.set_pbr(false).await.rebound.is_empty());
    assert_eq!(source.fetch_count(), 4);
}

// =============================================================================
// Pending selection
// =============================================================================

#[tokio::test]
async fn test_new_selection_cancels_previous() {
    let (scene, meshes) = scene_with_meshes(1);
    let source = Arc::new(MemorySource::with_skus(&["A", "B"]));
    let mut session = session(scene, source);

    assert_eq!(session.begin_selection("A"), None);
    assert_eq!(session.begin_selection("B"), Some("A".to_string()));

    let instance = session.complete_selection(&meshes[0]).await.unwrap().unwrap();
    assert_eq!(instance.sku(), "B");
    // One-shot: a second click does nothing
    assert!(session.complete_selection(&meshes[0]).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cancel_selection() {
    let (scene, meshes) = scene_with_meshes(1);
    let source = Arc::new(MemorySource::with_skus(&["A"]));
    let mut session = session(scene, source.clone());

    session.begin_selection("A");
    assert_eq!(session.cancel_selection(), Some("A".to_string()));
    assert!(session.complete_selection(&meshes[0]).await.unwrap().is_none());
    assert_eq!(source.fetch_count(), 0);
}

// =============================================================================
// Export
// =============================================================================

#[tokio::test]
async fn test_bindings_export_as_flat_preset() {
    let (mut scene, _) = scene_with_meshes(0);
    scene.add_mesh("m1", None);
    scene.add_mesh("m2", None);
    let source = Arc::new(MemorySource::with_skus(&["A", "B"]));
    let mut session = session(scene, source);
    session.bind("m2", "B").await.unwrap();
    session.bind("m1", "A").await.unwrap();

    assert_eq!(
        session.to_preset(),
        Preset::Flat(vec![
            PresetBinding::new("m1", "A"),
            PresetBinding::new("m2", "B")
        ])
    );
}
