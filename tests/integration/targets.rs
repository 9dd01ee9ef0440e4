//! Integration tests for relationship targets and attribute connections

use super::test_utils::*;
use laminate::error::{CacheError, CompositionError};
use laminate::layer::{fields, ListOp, MemoryLayer, Reference, SpecType, Value};
use laminate::map::TimeOffset;
use laminate::ScenePath;

fn targets(op: ListOp<ScenePath>) -> Value {
    Value::PathListOp(op)
}

/// Test list editing of targets across sublayers
#[test]
fn test_targets_compose_across_layers() {
    let scene = Scene::new();
    let mut strong = MemoryLayer::new("strong.layer");
    strong.add_sublayer("weak.layer", TimeOffset::identity());
    strong
        .define_property("/Rig.bind", SpecType::Relationship)
        .unwrap()
        .set(
            fields::TARGET_PATHS,
            targets(ListOp::prepended(paths(&["/T3"])).with_deleted(paths(&["/T1"]))),
        );
    let mut weak = MemoryLayer::new("weak.layer");
    weak.define_property("/Rig.bind", SpecType::Relationship)
        .unwrap()
        .set(
            fields::TARGET_PATHS,
            targets(ListOp::appended(paths(&["/T1", "/T2"]))),
        );
    scene.add(strong);
    scene.add(weak);

    let result = scene
        .cache("strong.layer")
        .compute_relationship_target_paths(&p("/Rig.bind"))
        .unwrap();
    assert_eq!(result.paths, paths(&["/T3", "/T2"]));
    assert_eq!(result.deleted_paths, paths(&["/T1"]));
    assert!(result.errors.is_empty());
}

/// Test that targets authored in a referenced asset map into the
/// referencing namespace and lose their variant selections
#[test]
fn test_targets_map_through_references() {
    let scene = Scene::new();
    let mut shot = MemoryLayer::new("shot.layer");
    set_references(
        shot.define_prim("/A").unwrap(),
        vec![Reference::new("model.layer", p("/Model"))],
    );
    scene.add(shot);
    let mut model = model_layer("model.layer");
    model
        .define_property("/Model.look", SpecType::Relationship)
        .unwrap()
        .set(
            fields::TARGET_PATHS,
            targets(ListOp::appended(paths(&[
                "/Model{standin=render}Geom",
                "/Model/Geom.points",
                "/Elsewhere",
                "/",
            ]))),
        );
    scene.add(model);

    let result = scene
        .cache("shot.layer")
        .compute_relationship_target_paths(&p("/A.look"))
        .unwrap();
    assert_eq!(result.paths, paths(&["/A/Geom", "/A/Geom.points"]));
    assert!(result.paths.iter().all(|t| !t.contains_variant_selection()));
    assert!(matches!(
        result.errors.as_slice(),
        [
            CompositionError::InvalidExternalTargetPath { target: external, .. },
            CompositionError::InvalidTargetPath { target: root, .. },
        ] if *external == p("/Elsewhere") && root.is_absolute_root()
    ));
}

/// Test connection resolution and the property type checks on both queries
#[test]
fn test_attribute_connections() {
    let scene = Scene::new();
    let mut layer = MemoryLayer::new("shade.layer");
    layer
        .define_property("/Shader.inputs:color", SpecType::Attribute)
        .unwrap()
        .set(
            fields::CONNECTION_PATHS,
            targets(ListOp::explicit(paths(&["/Texture.outputs:rgb"]))),
        );
    scene.add(layer);
    let cache = scene.cache("shade.layer");

    let connections = cache
        .compute_attribute_connection_paths(&p("/Shader.inputs:color"))
        .unwrap();
    assert_eq!(connections.paths, paths(&["/Texture.outputs:rgb"]));

    // The same property is not a relationship
    let targets = cache
        .compute_relationship_target_paths(&p("/Shader.inputs:color"))
        .unwrap();
    assert!(targets.paths.is_empty());

    // Missing properties have no targets
    let missing = cache
        .compute_relationship_target_paths(&p("/Shader.nothing"))
        .unwrap();
    assert_eq!(missing.paths, Vec::<ScenePath>::new());

    assert_eq!(
        cache.compute_attribute_connection_paths(&p("/Shader")).unwrap_err(),
        CacheError::NotAPropertyPath(p("/Shader"))
    );
}
