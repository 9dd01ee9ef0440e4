//! Integration tests for child and property name composition

use super::test_utils::*;
use laminate::error::CompositionError;
use laminate::layer::{fields, ListOp, MemoryLayer, SpecType, Value};
use laminate::map::TimeOffset;
use proptest::prelude::*;

fn child_edits(deleted: &[&str]) -> Value {
    Value::TokenListOp(ListOp::deleted(names(deleted)))
}

/// `strong` with `weak.layer` as its only sublayer
fn stacked_scene(mut strong: MemoryLayer, weak: MemoryLayer) -> Scene {
    strong.add_sublayer("weak.layer", TimeOffset::identity());
    let scene = Scene::new();
    scene.add(strong);
    scene.add(weak);
    scene
}

/// Test that a strong deletion prohibits a weaker definition but not the
/// other way around
#[test]
fn test_prohibited_children() {
    let mut strong = MemoryLayer::new("strong.layer");
    strong
        .define_prim("/P")
        .unwrap()
        .set(fields::PRIM_CHILD_EDITS, child_edits(&["B"]));
    strong.define_prim("/P/D").unwrap();
    let mut weak = MemoryLayer::new("weak.layer");
    weak.define_prim("/P/B").unwrap();
    weak.define_prim("/P/C").unwrap();
    weak.define_prim("/P")
        .unwrap()
        .set(fields::PRIM_CHILD_EDITS, child_edits(&["D"]));
    let scene = stacked_scene(strong, weak);
    let cache = scene.cache("strong.layer");

    let (children, prohibited) = cache.compute_prim_child_names(&p("/P")).unwrap();
    assert_eq!(children, names(&["C", "D"]));
    assert_eq!(prohibited, names(&["B"]));
    assert!(cache.compute_prim_index(&p("/P")).unwrap().is_valid());
}

/// Test that defining and deleting a name in one layer is reported
#[test]
fn test_name_collision_in_one_layer() {
    let mut layer = MemoryLayer::new("root.layer");
    layer.define_prim("/P/E").unwrap();
    layer.define_prim("/P/F").unwrap();
    layer
        .define_prim("/P")
        .unwrap()
        .set(fields::PRIM_CHILD_EDITS, child_edits(&["E"]));
    let scene = Scene::new();
    scene.add(layer);
    let cache = scene.cache("root.layer");

    let index = cache.compute_prim_index(&p("/P")).unwrap();
    assert!(matches!(
        index.errors(),
        [CompositionError::ProhibitedNameCollision { name, layer, .. }]
            if name == "E" && layer == "root.layer"
    ));
    let (children, prohibited) = index.compute_prim_child_names();
    assert_eq!(children, names(&["F"]));
    assert_eq!(prohibited, names(&["E"]));
}

/// Test that the strongest prim ordering is applied
#[test]
fn test_prim_order() {
    let mut strong = MemoryLayer::new("strong.layer");
    strong
        .define_prim("/P")
        .unwrap()
        .set(fields::PRIM_ORDER, Value::TokenList(names(&["D", "B"])));
    let mut weak = MemoryLayer::new("weak.layer");
    for child in ["/P/B", "/P/C", "/P/D"] {
        weak.define_prim(child).unwrap();
    }
    let scene = stacked_scene(strong, weak);

    let (children, _) = scene
        .cache("strong.layer")
        .compute_prim_child_names(&p("/P"))
        .unwrap();
    assert_eq!(children, names(&["D", "B", "C"]));
}

/// Test that deleted properties disappear from the composed names
#[test]
fn test_property_deletions_and_order() {
    let mut strong = MemoryLayer::new("strong.layer");
    strong
        .define_prim("/P")
        .unwrap()
        .set(fields::PROPERTY_EDITS, child_edits(&["y"]))
        .set(fields::PROPERTY_ORDER, Value::TokenList(names(&["z", "x"])));
    strong.define_property("/P.z", SpecType::Attribute).unwrap();
    let mut weak = MemoryLayer::new("weak.layer");
    weak.define_property("/P.x", SpecType::Attribute).unwrap();
    weak.define_property("/P.y", SpecType::Relationship).unwrap();
    let scene = stacked_scene(strong, weak);

    assert_eq!(
        scene
            .cache("strong.layer")
            .compute_prim_property_names(&p("/P"))
            .unwrap(),
        names(&["z", "x"])
    );
}

/// Test that independent caches over the same layers agree
#[test]
fn test_composition_is_deterministic() {
    let build = || {
        let mut strong = MemoryLayer::new("strong.layer");
        strong
            .define_prim("/P")
            .unwrap()
            .set(fields::PRIM_CHILD_EDITS, child_edits(&["B"]));
        let mut weak = MemoryLayer::new("weak.layer");
        weak.define_prim("/P/B").unwrap();
        weak.define_prim("/P/C").unwrap();
        stacked_scene(strong, weak)
    };
    let first = build().cache("strong.layer");
    let second = build().cache("strong.layer");

    let a = first.compute_prim_index(&p("/P")).unwrap();
    let b = second.compute_prim_index(&p("/P")).unwrap();
    assert_eq!(a.dump(true), b.dump(true));
    assert_eq!(a.compute_prim_child_names(), b.compute_prim_child_names());
}

const NAMES: [&str; 5] = ["A", "B", "C", "D", "E"];

proptest! {
    /// Test that names deleted by a stronger layer never survive and
    /// everything else authored does
    #[test]
    fn test_stronger_deletions_prohibit(
        defined in proptest::collection::btree_set(0usize..5, 0..5),
        deleted in proptest::collection::btree_set(0usize..5, 0..5),
    ) {
        let mut strong = MemoryLayer::new("strong.layer");
        let deleted_names: Vec<&str> = deleted.iter().map(|i| NAMES[*i]).collect();
        strong
            .define_prim("/P")
            .unwrap()
            .set(fields::PRIM_CHILD_EDITS, child_edits(&deleted_names));
        let mut weak = MemoryLayer::new("weak.layer");
        weak.define_prim("/P").unwrap();
        for i in &defined {
            weak.define_prim(&format!("/P/{}", NAMES[*i])).unwrap();
        }
        let scene = stacked_scene(strong, weak);

        let (children, prohibited) = scene
            .cache("strong.layer")
            .compute_prim_child_names(&p("/P"))
            .unwrap();

        let expected: Vec<String> = defined
            .iter()
            .filter(|i| !deleted.contains(i))
            .map(|i| NAMES[*i].to_string())
            .collect();
        prop_assert_eq!(children.clone(), expected);
        prop_assert_eq!(prohibited.len(), deleted.len());
        prop_assert!(children.iter().all(|name| !prohibited.contains(name)));
    }
}
