//! Integration tests for payload inclusion

use super::test_utils::*;
use laminate::index::{ArcType, PayloadState};
use laminate::layer::{MemoryLayer, Reference};
use laminate::ScenePath;
use std::sync::Arc;

fn payload_scene() -> Scene {
    let scene = Scene::new();
    let mut shot = MemoryLayer::new("shot.layer");
    set_payload(
        shot.define_prim("/World/Set").unwrap(),
        Reference::new("model.layer", p("/Model")),
    );
    shot.define_prim("/World/Plain").unwrap();
    scene.add(shot);
    scene.add(model_layer("model.layer"));
    scene
}

/// Test that an unloaded payload leaves an inert stub and no opinions
#[test]
fn test_excluded_payload_is_a_stub() {
    let scene = payload_scene();
    let cache = scene.cache("shot.layer");

    let index = cache.compute_prim_index(&p("/World/Set")).unwrap();
    assert_eq!(index.payload_state(), PayloadState::Excluded);
    assert!(index.is_valid());
    let stub = index.root_node().children().next().unwrap();
    assert_eq!(stub.arc_type(), ArcType::Payload);
    assert!(stub.is_inert());
    assert_eq!(index.prim_stack().len(), 1);
    assert!(index.dump(false).contains("[payload not included]"));

    let (children, _) = cache.compute_prim_child_names(&p("/World/Set")).unwrap();
    assert!(children.is_empty());

    let plain = cache.compute_prim_index(&p("/World/Plain")).unwrap();
    assert_eq!(plain.payload_state(), PayloadState::NoPayload);
}

/// Test that requesting payloads reports changes without touching the cache
#[test]
fn test_request_does_not_invalidate() {
    let scene = payload_scene();
    let cache = scene.cache("shot.layer");
    let excluded = cache.compute_prim_index(&p("/World/Set")).unwrap();

    let changed = cache.request_payloads(&[p("/World/Set")], &[]);
    assert_eq!(changed, vec![p("/World/Set")]);
    assert!(cache.request_payloads(&[p("/World/Set")], &[]).is_empty());
    assert_eq!(cache.included_payloads(), vec![p("/World/Set")]);

    // The stale index is still cached until the caller invalidates it
    let cached = cache.compute_prim_index(&p("/World/Set")).unwrap();
    assert!(Arc::ptr_eq(&excluded, &cached));

    assert_eq!(cache.invalidate_subtree(&p("/World/Set")), 1);
    let included = cache.compute_prim_index(&p("/World/Set")).unwrap();
    assert_eq!(included.payload_state(), PayloadState::Included);
    let payload = included.root_node().children().next().unwrap();
    assert!(!payload.is_inert());
    assert_eq!(payload.path(), &p("/Model"));

    let (children, _) = cache.compute_prim_child_names(&p("/World/Set")).unwrap();
    assert_eq!(children, names(&["Geom"]));
}

/// Test that including an ancestor loads payloads below it
#[test]
fn test_ancestor_inclusion() {
    let scene = payload_scene();
    let cache = scene.cache("shot.layer");
    cache.request_payloads(&[p("/World")], &[]);

    let index = cache.compute_prim_index(&p("/World/Set")).unwrap();
    assert_eq!(index.payload_state(), PayloadState::Included);

    // Descendants of a loaded payload see its contents
    let geom = cache.compute_prim_index(&p("/World/Set/Geom")).unwrap();
    assert!(geom.has_specs());
    assert_eq!(
        cache.compute_prim_property_names(&p("/World/Set/Geom")).unwrap(),
        names(&["points"])
    );
}

/// Test that excluding a path unloads it on the next computation
#[test]
fn test_exclude_after_include() {
    let scene = payload_scene();
    let cache = scene.cache("shot.layer");
    cache.request_payloads(&[p("/World/Set")], &[]);
    cache.compute_prim_index(&p("/World/Set")).unwrap();

    let changed = cache.request_payloads(&[], &[p("/World/Set")]);
    assert_eq!(changed, vec![p("/World/Set")]);
    assert!(cache.invalidate_prim_index(&p("/World/Set")));
    let index = cache.compute_prim_index(&p("/World/Set")).unwrap();
    assert_eq!(index.payload_state(), PayloadState::Excluded);
    assert_eq!(cache.included_payloads(), Vec::<ScenePath>::new());
}

/// Test that invalidating a prim drops the descendant indexes projected from it
#[test]
fn test_invalidate_drops_descendants() {
    let scene = payload_scene();
    let cache = scene.cache("shot.layer");

    let unloaded = cache.compute_prim_index(&p("/World/Set/Geom")).unwrap();
    assert!(!unloaded.has_specs());
    cache.compute_property_index(&p("/World/Set/Geom.points")).unwrap();

    cache.request_payloads(&[p("/World/Set")], &[]);
    assert!(cache.invalidate_prim_index(&p("/World/Set")));
    assert!(cache.find_prim_index(&p("/World/Set/Geom")).is_none());
    assert!(cache.find_property_index(&p("/World/Set/Geom.points")).is_none());
    // Ancestors are kept
    assert!(cache.find_prim_index(&p("/World")).is_some());

    let (children, _) = cache.compute_prim_child_names(&p("/World/Set")).unwrap();
    assert_eq!(children, names(&["Geom"]));
    let geom = cache.compute_prim_index(&p("/World/Set/Geom")).unwrap();
    assert!(geom.has_specs());
    assert_eq!(
        cache.compute_prim_property_names(&p("/World/Set/Geom")).unwrap(),
        names(&["points"])
    );
    let points = cache.compute_property_index(&p("/World/Set/Geom.points")).unwrap();
    assert_eq!(points.property_stack().len(), 1);
}
