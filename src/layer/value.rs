//! Field values stored in layer specs

use crate::layer::list_op::ListOp;
use crate::map::TimeOffset;
use crate::path::ScenePath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Well-known field keys read by composition
pub mod fields {
    /// `ListOp<String>` of variant set names declared on a prim
    pub const VARIANT_SET_NAMES: &str = "variantSetNames";
    /// Dictionary of variant set name to selected variant
    pub const VARIANT_SELECTION: &str = "variantSelection";
    /// `ListOp<ScenePath>` of inherited class paths
    pub const INHERIT_PATHS: &str = "inheritPaths";
    /// `ListOp<ScenePath>` of specialized prim paths
    pub const SPECIALIZES: &str = "specializes";
    /// `ListOp<Reference>`
    pub const REFERENCES: &str = "references";
    /// `ListOp<Reference>` of payload arcs
    pub const PAYLOAD: &str = "payload";
    /// `ListOp<ScenePath>` on relationships
    pub const TARGET_PATHS: &str = "targetPaths";
    /// `ListOp<ScenePath>` on attributes
    pub const CONNECTION_PATHS: &str = "connectionPaths";
    /// Token on the pseudo-root naming the prim targeted by arcs without a prim path
    pub const DEFAULT_PRIM: &str = "defaultPrim";
    /// Token list reordering prim children
    pub const PRIM_ORDER: &str = "primOrder";
    /// Token list reordering properties
    pub const PROPERTY_ORDER: &str = "propertyOrder";
    /// `ListOp<String>` whose deleted items prohibit child prim names
    pub const PRIM_CHILD_EDITS: &str = "primChildEdits";
    /// `ListOp<String>` whose deleted items remove property names
    pub const PROPERTY_EDITS: &str = "propertyEdits";
}

/// Kind of spec stored at a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecType {
    PseudoRoot,
    #[default]
    Prim,
    Variant,
    Attribute,
    Relationship,
}

impl SpecType {
    pub fn is_property(&self) -> bool {
        matches!(self, SpecType::Attribute | SpecType::Relationship)
    }
}

impl fmt::Display for SpecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpecType::PseudoRoot => "pseudo-root",
            SpecType::Prim => "prim",
            SpecType::Variant => "variant",
            SpecType::Attribute => "attribute",
            SpecType::Relationship => "relationship",
        };
        f.write_str(name)
    }
}

/// Target of a reference or payload arc.
///
/// An empty `asset_path` targets the referencing layer stack; a missing
/// `prim_path` targets the layer's default prim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default)]
    pub asset_path: String,
    #[serde(default)]
    pub prim_path: Option<ScenePath>,
    #[serde(default)]
    pub layer_offset: TimeOffset,
}

pub type Payload = Reference;

impl Reference {
    pub fn new(asset_path: impl Into<String>, prim_path: ScenePath) -> Self {
        Self {
            asset_path: asset_path.into(),
            prim_path: Some(prim_path),
            layer_offset: TimeOffset::identity(),
        }
    }

    /// Reference into the referencing layer stack
    pub fn internal(prim_path: ScenePath) -> Self {
        Self::new(String::new(), prim_path)
    }

    /// Reference to the default prim of an asset
    pub fn to_default_prim(asset_path: impl Into<String>) -> Self {
        Self {
            asset_path: asset_path.into(),
            prim_path: None,
            layer_offset: TimeOffset::identity(),
        }
    }

    pub fn with_offset(mut self, offset: TimeOffset) -> Self {
        self.layer_offset = offset;
        self
    }

    pub fn is_internal(&self) -> bool {
        self.asset_path.is_empty()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}@", self.asset_path)?;
        if let Some(prim_path) = &self.prim_path {
            write!(f, "<{}>", prim_path)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Token(String),
    TokenList(Vec<String>),
    Path(ScenePath),
    Dictionary(BTreeMap<String, String>),
    TokenListOp(ListOp<String>),
    PathListOp(ListOp<ScenePath>),
    ReferenceListOp(ListOp<Reference>),
    TimeOffset(TimeOffset),
}

impl Value {
    pub fn as_token(&self) -> Option<&str> {
        match self {
            Value::Token(s) | Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_token_list(&self) -> Option<&[String]> {
        match self {
            Value::TokenList(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Value::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_token_list_op(&self) -> Option<&ListOp<String>> {
        match self {
            Value::TokenListOp(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_path_list_op(&self) -> Option<&ListOp<ScenePath>> {
        match self {
            Value::PathListOp(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_reference_list_op(&self) -> Option<&ListOp<Reference>> {
        match self {
            Value::ReferenceListOp(op) => Some(op),
            _ => None,
        }
    }
}
