//! Layers: the read-only documents composition consumes
//!
//! Layer parsing and storage live outside this crate. Composition only needs
//! the narrow capability described by [`Layer`] and a [`LayerResolver`] to
//! open layers by asset path. [`MemoryLayer`] and [`MemoryResolver`] provide
//! in-memory implementations used by tests and embedders.

pub mod list_op;
pub mod memory;
pub mod value;

pub use list_op::ListOp;
pub use memory::{MemoryLayer, MemoryResolver, MemorySpec};
pub use value::{fields, Payload, Reference, SpecType, Value};

use crate::error::LayerError;
use crate::map::TimeOffset;
use crate::path::ScenePath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A sublayer declaration with its time offset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SublayerEntry {
    pub asset_path: String,
    #[serde(default)]
    pub offset: TimeOffset,
}

/// Read-only view of one layer's specs
pub trait Layer: Send + Sync + fmt::Debug {
    /// Stable identifier, unique per resolver
    fn identifier(&self) -> &str;

    fn spec_type(&self, path: &ScenePath) -> Option<SpecType>;

    fn has_spec(&self, path: &ScenePath) -> bool {
        self.spec_type(path).is_some()
    }

    fn field(&self, path: &ScenePath, key: &str) -> Option<Value>;

    /// Prim children of the prim or variant spec at `path`, in authored order
    fn prim_child_names(&self, path: &ScenePath) -> Vec<String>;

    /// Properties of the prim or variant spec at `path`, in authored order
    fn property_names(&self, path: &ScenePath) -> Vec<String>;

    /// Variants authored for `set` on the prim or variant spec at `path`
    fn variant_names(&self, path: &ScenePath, set: &str) -> Vec<String>;

    /// Declared sublayers, strongest first
    fn sublayers(&self) -> Vec<SublayerEntry>;
}

impl dyn Layer {
    pub fn token(&self, path: &ScenePath, key: &str) -> Option<String> {
        self.field(path, key)
            .and_then(|v| v.as_token().map(str::to_string))
    }

    pub fn token_list(&self, path: &ScenePath, key: &str) -> Option<Vec<String>> {
        self.field(path, key)
            .and_then(|v| v.as_token_list().map(<[String]>::to_vec))
    }

    pub fn dictionary(&self, path: &ScenePath, key: &str) -> Option<BTreeMap<String, String>> {
        self.field(path, key)
            .and_then(|v| v.as_dictionary().cloned())
    }

    pub fn token_list_op(&self, path: &ScenePath, key: &str) -> Option<ListOp<String>> {
        self.field(path, key)
            .and_then(|v| v.as_token_list_op().cloned())
    }

    pub fn path_list_op(&self, path: &ScenePath, key: &str) -> Option<ListOp<ScenePath>> {
        self.field(path, key)
            .and_then(|v| v.as_path_list_op().cloned())
    }

    pub fn reference_list_op(&self, path: &ScenePath, key: &str) -> Option<ListOp<Reference>> {
        self.field(path, key)
            .and_then(|v| v.as_reference_list_op().cloned())
    }
}

/// Opens layers by asset path
pub trait LayerResolver: Send + Sync {
    /// Open `asset_path`, resolving relative paths against `anchor` (the
    /// identifier of the layer that authored the asset path).
    fn open(&self, asset_path: &str, anchor: Option<&str>) -> Result<Arc<dyn Layer>, LayerError>;
}

/// Resolve `./` and `../` asset paths against the directory of `anchor`.
pub fn anchor_asset_path(asset_path: &str, anchor: Option<&str>) -> String {
    let relative = asset_path.starts_with("./") || asset_path.starts_with("../");
    let anchor_dir = match anchor.and_then(|a| a.rfind('/').map(|i| &a[..i])) {
        Some(dir) if relative => dir,
        _ => return asset_path.to_string(),
    };

    let mut parts: Vec<&str> = anchor_dir.split('/').collect();
    for segment in asset_path.split('/') {
        match segment {
            "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}
