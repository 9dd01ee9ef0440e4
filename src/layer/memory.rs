//! In-memory layers and resolver

use crate::error::{LayerError, PathError};
use crate::layer::{anchor_asset_path, Layer, LayerResolver, SpecType, SublayerEntry, Value};
use crate::map::TimeOffset;
use crate::path::{PathElement, ScenePath};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// One spec stored in a [`MemoryLayer`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySpec {
    pub spec_type: SpecType,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub prim_children: Vec<String>,
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub variant_sets: BTreeMap<String, Vec<String>>,
}

impl MemorySpec {
    fn new(spec_type: SpecType) -> Self {
        Self {
            spec_type,
            ..Self::default()
        }
    }

    /// Set a field, returning the spec for chaining
    pub fn set(&mut self, key: &str, value: Value) -> &mut Self {
        self.fields.insert(key.to_string(), value);
        self
    }
}

/// A layer held entirely in memory.
///
/// Defining a spec implicitly defines its missing ancestors, the way an
/// authoring API creates `over` prims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryLayer {
    identifier: String,
    #[serde(default)]
    sublayers: Vec<SublayerEntry>,
    specs: BTreeMap<ScenePath, MemorySpec>,
}

impl MemoryLayer {
    pub fn new(identifier: impl Into<String>) -> Self {
        let mut specs = BTreeMap::new();
        specs.insert(
            ScenePath::absolute_root(),
            MemorySpec::new(SpecType::PseudoRoot),
        );
        Self {
            identifier: identifier.into(),
            sublayers: Vec::new(),
            specs,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn spec(&self, path: &ScenePath) -> Option<&MemorySpec> {
        self.specs.get(path)
    }

    pub fn pseudo_root(&mut self) -> &mut MemorySpec {
        self.specs
            .entry(ScenePath::absolute_root())
            .or_insert_with(|| MemorySpec::new(SpecType::PseudoRoot))
    }

    pub fn add_sublayer(&mut self, asset_path: impl Into<String>, offset: TimeOffset) -> &mut Self {
        self.sublayers.push(SublayerEntry {
            asset_path: asset_path.into(),
            offset,
        });
        self
    }

    pub fn set_default_prim(&mut self, name: &str) -> &mut Self {
        self.pseudo_root().set(
            crate::layer::fields::DEFAULT_PRIM,
            Value::Token(name.to_string()),
        );
        self
    }

    /// Define a prim spec (and any missing ancestors) at `path`
    pub fn define_prim(&mut self, path: &str) -> Result<&mut MemorySpec, PathError> {
        let path = ScenePath::parse(path)?;
        if !path.is_prim_path() || path.is_absolute_root() {
            return Err(PathError::InvalidAppend(path, "a prim spec".to_string()));
        }
        Ok(self.ensure_spec(&path))
    }

    /// Define variant `selection` of `set` on the prim at `prim_path`
    pub fn define_variant(
        &mut self,
        prim_path: &str,
        set: &str,
        selection: &str,
    ) -> Result<&mut MemorySpec, PathError> {
        let path = ScenePath::parse(prim_path)?.append_variant_selection(set, selection)?;
        Ok(self.ensure_spec(&path))
    }

    /// Define a property spec; `path` must be a property path
    pub fn define_property(
        &mut self,
        path: &str,
        spec_type: SpecType,
    ) -> Result<&mut MemorySpec, PathError> {
        let path = ScenePath::parse(path)?;
        if !path.is_property_path() || !spec_type.is_property() {
            return Err(PathError::InvalidAppend(path, format!("a {} spec", spec_type)));
        }
        let spec = self.ensure_spec(&path);
        spec.spec_type = spec_type;
        Ok(spec)
    }

    fn ensure_spec(&mut self, path: &ScenePath) -> &mut MemorySpec {
        if !self.specs.contains_key(path) {
            let parent = path.parent().unwrap_or_else(ScenePath::absolute_root);
            self.ensure_spec(&parent);
            let spec_type = match path.elements().last() {
                Some(PathElement::Prim(name)) => {
                    if let Some(owner) = self.specs.get_mut(&parent) {
                        owner.prim_children.push(name.clone());
                    }
                    SpecType::Prim
                }
                Some(PathElement::VariantSelection { set, selection }) => {
                    if let Some(owner) = self.specs.get_mut(&parent) {
                        owner
                            .variant_sets
                            .entry(set.clone())
                            .or_default()
                            .push(selection.clone());
                    }
                    SpecType::Variant
                }
                Some(PathElement::Property(name)) => {
                    if let Some(owner) = self.specs.get_mut(&parent) {
                        owner.properties.push(name.clone());
                    }
                    SpecType::Attribute
                }
                None => SpecType::PseudoRoot,
            };
            self.specs.insert(path.clone(), MemorySpec::new(spec_type));
        }
        self.specs
            .entry(path.clone())
            .or_insert_with(|| MemorySpec::new(SpecType::Prim))
    }
}

impl Layer for MemoryLayer {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn spec_type(&self, path: &ScenePath) -> Option<SpecType> {
        self.specs.get(path).map(|s| s.spec_type)
    }

    fn field(&self, path: &ScenePath, key: &str) -> Option<Value> {
        self.specs.get(path)?.fields.get(key).cloned()
    }

    fn prim_child_names(&self, path: &ScenePath) -> Vec<String> {
        self.specs
            .get(path)
            .map(|s| s.prim_children.clone())
            .unwrap_or_default()
    }

    fn property_names(&self, path: &ScenePath) -> Vec<String> {
        self.specs
            .get(path)
            .map(|s| s.properties.clone())
            .unwrap_or_default()
    }

    fn variant_names(&self, path: &ScenePath, set: &str) -> Vec<String> {
        self.specs
            .get(path)
            .and_then(|s| s.variant_sets.get(set).cloned())
            .unwrap_or_default()
    }

    fn sublayers(&self) -> Vec<SublayerEntry> {
        self.sublayers.clone()
    }
}

/// Resolver over a fixed set of registered layers
#[derive(Default)]
pub struct MemoryResolver {
    layers: RwLock<HashMap<String, Arc<dyn Layer>>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layer under its identifier, replacing any previous one
    pub fn insert(&self, layer: MemoryLayer) -> Arc<dyn Layer> {
        let layer: Arc<dyn Layer> = Arc::new(layer);
        self.insert_layer(layer.clone());
        layer
    }

    pub fn insert_layer(&self, layer: Arc<dyn Layer>) {
        self.layers
            .write()
            .insert(layer.identifier().to_string(), layer);
    }

    pub fn len(&self) -> usize {
        self.layers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.read().is_empty()
    }
}

impl LayerResolver for MemoryResolver {
    fn open(&self, asset_path: &str, anchor: Option<&str>) -> Result<Arc<dyn Layer>, LayerError> {
        if asset_path.trim().is_empty() {
            return Err(LayerError::InvalidIdentifier(asset_path.to_string()));
        }
        let identifier = anchor_asset_path(asset_path, anchor);
        self.layers
            .read()
            .get(&identifier)
            .cloned()
            .ok_or(LayerError::NotFound(identifier))
    }
}
