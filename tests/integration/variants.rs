//! Integration tests for variant selection

use super::test_utils::*;
use laminate::error::CompositionError;
use laminate::index::{ArcType, VariantFallbackMap};
use laminate::layer::{MemoryLayer, Reference, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

fn kind(value: &str) -> Value {
    Value::Token(value.to_string())
}

/// `/Chair` with a `standin` set offering `render` and `anim`
fn chair_layer(identifier: &str, prim: &str) -> MemoryLayer {
    let mut layer = MemoryLayer::new(identifier);
    set_variant_sets(layer.define_prim(prim).unwrap(), &["standin"]);
    layer
        .define_variant(prim, "standin", "render")
        .unwrap()
        .set("kind", kind("render"));
    layer
        .define_variant(prim, "standin", "anim")
        .unwrap()
        .set("kind", kind("anim"));
    layer
        .define_prim(&format!("{}{{standin=render}}Geom", prim))
        .unwrap();
    layer.set_default_prim(prim.trim_start_matches('/'));
    layer
}

fn fallbacks(set: &str, candidates: &[&str]) -> VariantFallbackMap {
    let mut map = BTreeMap::new();
    map.insert(set.to_string(), names(candidates));
    map
}

/// Test that the fallback table picks the first authored candidate
#[test]
fn test_fallback_selection() {
    let scene = Scene::new();
    scene.add(chair_layer("chair.layer", "/Chair"));
    let cache = scene.cache("chair.layer");
    assert!(cache.variant_fallbacks().is_empty());

    // Nothing selected yet
    let index = cache.compute_prim_index(&p("/Chair")).unwrap();
    assert_eq!(index.nodes().len(), 1);
    assert_eq!(index.resolve_field("kind"), None);

    cache.set_variant_fallbacks(fallbacks("standin", &["proxy", "render"]));
    let index = cache.compute_prim_index(&p("/Chair")).unwrap();
    let variant = index.root_node().children().next().unwrap();
    assert_eq!(variant.arc_type(), ArcType::Variant);
    assert_eq!(variant.path(), &p("/Chair{standin=render}"));
    assert_eq!(index.resolve_field("kind"), Some(kind("render")));
    assert_eq!(
        index.variant_selections().get("standin").map(String::as_str),
        Some("render")
    );

    // Children authored inside the variant compose into the prim
    let (children, _) = cache.compute_prim_child_names(&p("/Chair")).unwrap();
    assert_eq!(children, names(&["Geom"]));
}

/// Test that no variant is chosen when no candidate is authored
#[test]
fn test_fallback_without_matching_candidate() {
    let scene = Scene::new();
    scene.add(chair_layer("chair.layer", "/Chair"));
    let cache = scene.cache("chair.layer");
    cache.set_variant_fallbacks(fallbacks("standin", &["proxy"]));

    let index = cache.compute_prim_index(&p("/Chair")).unwrap();
    assert!(index.is_valid());
    assert!(index.variant_selections().is_empty());
}

/// Test that an authored selection beats the fallback table
#[test]
fn test_explicit_selection_wins() {
    let scene = Scene::new();
    let mut layer = chair_layer("chair.layer", "/Chair");
    set_variant_selection(layer.define_prim("/Chair").unwrap(), "standin", "anim");
    scene.add(layer);
    let cache = scene.cache("chair.layer");
    cache.set_variant_fallbacks(fallbacks("standin", &["render"]));

    let index = cache.compute_prim_index(&p("/Chair")).unwrap();
    assert_eq!(index.resolve_field("kind"), Some(kind("anim")));
}

/// Test that an empty authored selection falls through to the fallbacks
#[test]
fn test_empty_selection_uses_fallback() {
    let scene = Scene::new();
    let mut layer = chair_layer("chair.layer", "/Chair");
    set_variant_selection(layer.define_prim("/Chair").unwrap(), "standin", "");
    scene.add(layer);
    let cache = scene.cache("chair.layer");
    cache.set_variant_fallbacks(fallbacks("standin", &["render"]));

    let index = cache.compute_prim_index(&p("/Chair")).unwrap();
    assert_eq!(index.resolve_field("kind"), Some(kind("render")));
}

/// Test that a selection authored on the referencing prim drives the
/// variant set of the referenced asset
#[test]
fn test_selection_across_reference() {
    let scene = Scene::new();
    let mut shot = MemoryLayer::new("shot.layer");
    {
        let spec = shot.define_prim("/Set/Chair_1").unwrap();
        set_references(spec, vec![Reference::to_default_prim("chair.layer")]);
        set_variant_selection(spec, "standin", "anim");
    }
    scene.add(shot);
    scene.add(chair_layer("chair.layer", "/Chair"));
    let cache = scene.cache("shot.layer");
    cache.set_variant_fallbacks(fallbacks("standin", &["render"]));

    let index = cache.compute_prim_index(&p("/Set/Chair_1")).unwrap();
    assert!(index.is_valid(), "{:?}", index.errors());
    let paths: Vec<String> = index.nodes().iter().map(|n| n.path().to_string()).collect();
    assert_eq!(
        paths,
        vec!["/Set/Chair_1", "/Chair", "/Chair{standin=anim}"]
    );
    assert_eq!(index.resolve_field("kind"), Some(kind("anim")));
}

/// Test that changing the fallback table drops cached indexes
#[test]
fn test_changing_fallbacks_invalidates() {
    let scene = Scene::new();
    scene.add(chair_layer("chair.layer", "/Chair"));
    let cache = scene.cache("chair.layer");
    cache.set_variant_fallbacks(fallbacks("standin", &["render"]));

    let before = cache.compute_prim_index(&p("/Chair")).unwrap();
    // Setting the same table is a no-op
    cache.set_variant_fallbacks(fallbacks("standin", &["render"]));
    assert!(cache.find_prim_index(&p("/Chair")).is_some());

    cache.set_variant_fallbacks(fallbacks("standin", &["anim"]));
    assert!(cache.find_prim_index(&p("/Chair")).is_none());
    let after = cache.compute_prim_index(&p("/Chair")).unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.resolve_field("kind"), Some(kind("anim")));
}

/// Test that a malformed selection is reported
#[test]
fn test_invalid_selection_is_recorded() {
    let scene = Scene::new();
    let mut layer = chair_layer("chair.layer", "/Chair");
    set_variant_selection(layer.define_prim("/Chair").unwrap(), "standin", "not a name");
    scene.add(layer);

    let index = scene
        .cache("chair.layer")
        .compute_prim_index(&p("/Chair"))
        .unwrap();
    assert_eq!(index.nodes().len(), 1);
    assert!(matches!(
        index.errors(),
        [CompositionError::InvalidVariantSelection { set, selection, .. }]
            if set == "standin" && selection == "not a name"
    ));
}

/// Test that the initial fallback table comes from configuration
#[test]
fn test_configured_fallbacks() {
    let scene = Scene::new();
    scene.add(chair_layer("chair.layer", "/Chair"));
    let config = laminate::config::CacheConfig {
        variant_fallbacks: fallbacks("standin", &["anim"]),
        ..Default::default()
    };
    let cache = scene.cache_with("chair.layer", config);

    let index = cache.compute_prim_index(&p("/Chair")).unwrap();
    assert_eq!(index.resolve_field("kind"), Some(kind("anim")));
}
