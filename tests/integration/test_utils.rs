//! Shared builders for composition scenes

use laminate::cache::Cache;
use laminate::config::CacheConfig;
use laminate::layer::{fields, ListOp, MemoryLayer, MemoryResolver, MemorySpec, Reference, Value};
use laminate::layer_stack::LayerStackIdentifier;
use laminate::path::ScenePath;
use std::sync::Arc;

pub fn p(path: &str) -> ScenePath {
    ScenePath::parse(path).unwrap()
}

pub fn paths(items: &[&str]) -> Vec<ScenePath> {
    items.iter().map(|s| p(s)).collect()
}

pub fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// A set of in-memory layers behind one resolver
pub struct Scene {
    pub resolver: Arc<MemoryResolver>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            resolver: Arc::new(MemoryResolver::new()),
        }
    }

    pub fn add(&self, layer: MemoryLayer) -> &Self {
        self.resolver.insert(layer);
        self
    }

    pub fn cache(&self, root: &str) -> Cache {
        self.cache_with(root, CacheConfig::default())
    }

    pub fn cache_with(&self, root: &str, config: CacheConfig) -> Cache {
        Cache::new(LayerStackIdentifier::new(root), self.resolver.clone(), config)
    }
}

pub fn set_references(spec: &mut MemorySpec, references: Vec<Reference>) {
    spec.set(
        fields::REFERENCES,
        Value::ReferenceListOp(ListOp::prepended(references)),
    );
}

pub fn set_payload(spec: &mut MemorySpec, payload: Reference) {
    spec.set(
        fields::PAYLOAD,
        Value::ReferenceListOp(ListOp::prepended(vec![payload])),
    );
}

pub fn set_inherits(spec: &mut MemorySpec, targets: &[&str]) {
    spec.set(
        fields::INHERIT_PATHS,
        Value::PathListOp(ListOp::prepended(paths(targets))),
    );
}

pub fn set_variant_sets(spec: &mut MemorySpec, sets: &[&str]) {
    spec.set(
        fields::VARIANT_SET_NAMES,
        Value::TokenListOp(ListOp::prepended(names(sets))),
    );
}

pub fn set_variant_selection(spec: &mut MemorySpec, set: &str, selection: &str) {
    let mut selections = std::collections::BTreeMap::new();
    selections.insert(set.to_string(), selection.to_string());
    spec.set(fields::VARIANT_SELECTION, Value::Dictionary(selections));
}

/// Model asset: `/Model` with a `Geom` child carrying a `points` attribute
pub fn model_layer(identifier: &str) -> MemoryLayer {
    let mut model = MemoryLayer::new(identifier);
    model.define_prim("/Model").unwrap();
    model
        .define_property("/Model/Geom.points", laminate::layer::SpecType::Attribute)
        .unwrap();
    model.set_default_prim("Model");
    model
}
