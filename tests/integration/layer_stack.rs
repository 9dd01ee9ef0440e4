//! Integration tests for layer stacks as seen through the cache

use super::test_utils::*;
use laminate::cache::Cache;
use laminate::error::LayerStackError;
use laminate::layer::{MemoryLayer, Reference, Value};
use laminate::layer_stack::LayerStackIdentifier;
use laminate::map::TimeOffset;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn kind(value: &str) -> Value {
    Value::Token(value.to_string())
}

/// Test that the session layer overrides the root layer stack
#[test]
fn test_session_layer_opinions_are_strongest() {
    let scene = Scene::new();
    let mut root = MemoryLayer::new("shot.layer");
    root.define_prim("/A").unwrap().set("kind", kind("root"));
    let mut session = MemoryLayer::new("session.layer");
    session.define_prim("/A").unwrap().set("kind", kind("session"));
    scene.add(root);
    scene.add(session);

    let identifier = LayerStackIdentifier::new("shot.layer").with_session("session.layer");
    let cache = Cache::with_defaults(identifier, scene.resolver.clone());

    assert_eq!(
        cache.layer_stack().layer_identifiers(),
        vec!["session.layer", "shot.layer"]
    );
    let index = cache.compute_prim_index(&p("/A")).unwrap();
    assert_eq!(index.resolve_field("kind"), Some(kind("session")));
}

/// Test that relative sublayer paths resolve against their parent layer
#[test]
fn test_relative_sublayers_are_anchored() {
    let scene = Scene::new();
    let mut root = MemoryLayer::new("shots/s01/shot.layer");
    root.add_sublayer("./anim.layer", TimeOffset::new(24.0, 1.0));
    root.add_sublayer("../common.layer", TimeOffset::identity());
    scene.add(root);
    scene.add(MemoryLayer::new("shots/s01/anim.layer"));
    scene.add(MemoryLayer::new("shots/common.layer"));

    let cache = scene.cache("shots/s01/shot.layer");
    let stack = cache.layer_stack();
    assert!(stack.local_errors().is_empty());
    assert_eq!(
        stack.layer_identifiers(),
        vec![
            "shots/s01/shot.layer",
            "shots/s01/anim.layer",
            "shots/common.layer"
        ]
    );
    assert_eq!(stack.layer_offset(1), TimeOffset::new(24.0, 1.0));
}

/// Test that layer stack errors stay on the stack, not on prims
#[test]
fn test_layer_stack_errors_are_local() {
    let scene = Scene::new();
    let mut root = MemoryLayer::new("shot.layer");
    root.add_sublayer("missing.layer", TimeOffset::identity());
    root.define_prim("/A").unwrap();
    scene.add(root);

    let cache = scene.cache("shot.layer");
    assert!(matches!(
        cache.layer_stack().local_errors(),
        [LayerStackError::InvalidSublayerPath { sublayer, .. }] if sublayer == "missing.layer"
    ));
    let index = cache.compute_prim_index(&p("/A")).unwrap();
    assert!(index.is_valid());
    assert!(index.has_specs());
}

/// Test that referenced layer stacks are computed once and shared
#[test]
fn test_referenced_stacks_are_shared() {
    let scene = Scene::new();
    let mut shot = MemoryLayer::new("shot.layer");
    for name in ["/A", "/B"] {
        set_references(
            shot.define_prim(name).unwrap(),
            vec![Reference::to_default_prim("model.layer")],
        );
    }
    scene.add(shot);
    scene.add(model_layer("model.layer"));
    let cache = scene.cache("shot.layer");

    let a = cache.compute_prim_index(&p("/A")).unwrap();
    let b = cache.compute_prim_index(&p("/B")).unwrap();
    let stack_a = a.root_node().children().next().unwrap().layer_stack().clone();
    let stack_b = b.root_node().children().next().unwrap().layer_stack().clone();
    assert!(Arc::ptr_eq(&stack_a, &stack_b));
    assert!(cache
        .find_layer_stack(&LayerStackIdentifier::new("model.layer"))
        .is_some());
}

/// Test composing layers that were stored as JSON on disk
#[test]
fn test_layers_loaded_from_json_files() {
    let dir = TempDir::new().unwrap();
    let mut model = model_layer("model.layer");
    model.define_prim("/Model").unwrap().set("kind", kind("component"));
    let file = dir.path().join("model.json");
    fs::write(&file, model.to_json().unwrap()).unwrap();

    let loaded = MemoryLayer::from_json(&fs::read_to_string(&file).unwrap()).unwrap();
    let scene = Scene::new();
    scene.add(loaded);
    let mut shot = MemoryLayer::new("shot.layer");
    set_references(
        shot.define_prim("/A").unwrap(),
        vec![Reference::to_default_prim("model.layer")],
    );
    scene.add(shot);

    let cache = scene.cache("shot.layer");
    let index = cache.compute_prim_index(&p("/A")).unwrap();
    assert_eq!(index.resolve_field("kind"), Some(kind("component")));
    assert_eq!(
        cache.compute_prim_property_names(&p("/A/Geom")).unwrap(),
        names(&["points"])
    );
}
