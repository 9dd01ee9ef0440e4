//! Error types for the layered composition engine.
//!
//! Composition never aborts on bad input: [`LayerStackError`] and
//! [`CompositionError`] values are accumulated next to partial results.
//! [`CacheError`] is reserved for callers breaking the API contract.

use crate::index::ArcType;
use crate::map::TimeOffset;
use crate::path::ScenePath;
use thiserror::Error;

/// Scene path parsing errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("Invalid scene path '{input}': {reason}")]
    Parse { input: String, reason: String },

    #[error("Invalid identifier '{0}'")]
    InvalidIdentifier(String),

    #[error("Path {0} cannot have {1}")]
    InvalidAppend(ScenePath, String),
}

/// Failures reported by a [`crate::layer::LayerResolver`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LayerError {
    #[error("Layer not found: @{0}@")]
    NotFound(String),

    #[error("Invalid layer identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("Failed to load layer @{identifier}@: {reason}")]
    Load { identifier: String, reason: String },
}

/// Errors local to a layer stack (sublayer resolution)
///
/// These attach to the [`crate::layer_stack::LayerStack`], never to a prim.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LayerStackError {
    #[error("Could not open root layer @{asset_path}@: {source}")]
    InvalidRootLayer {
        asset_path: String,
        source: LayerError,
    },

    #[error("Could not open session layer @{asset_path}@: {source}")]
    InvalidSessionLayer {
        asset_path: String,
        source: LayerError,
    },

    #[error("Could not open sublayer @{sublayer}@ of layer @{layer}@: {source}")]
    InvalidSublayerPath {
        layer: String,
        sublayer: String,
        source: LayerError,
    },

    #[error("Invalid sublayer offset {offset} for sublayer @{sublayer}@ of layer @{layer}@; using identity")]
    InvalidSublayerOffset {
        layer: String,
        sublayer: String,
        offset: TimeOffset,
    },

    #[error("Sublayer hierarchy with root layer @{layer}@ has cycles; sublayer @{sublayer}@ was skipped")]
    SublayerCycle { layer: String, sublayer: String },
}

/// Errors recorded while composing a prim or property index
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompositionError {
    #[error("Cycle detected: {arc} arc from <{path}> to <{target}> in layer stack @{layer_stack}@")]
    ArcCycle {
        path: ScenePath,
        target: ScenePath,
        arc: ArcType,
        layer_stack: String,
    },

    #[error("Could not open asset @{asset_path}@ for {arc} on prim <{path}>: {source}")]
    InvalidAssetPath {
        path: ScenePath,
        asset_path: String,
        arc: ArcType,
        source: LayerError,
    },

    #[error("Unresolved {arc} prim path <{target}> in @{layer}@ on prim <{path}>")]
    UnresolvedPrimPath {
        path: ScenePath,
        target: ScenePath,
        layer: String,
        arc: ArcType,
    },

    #[error("Invalid {arc} offset {offset} on prim <{path}> to @{asset_path}@; using identity")]
    InvalidReferenceOffset {
        path: ScenePath,
        asset_path: String,
        arc: ArcType,
        offset: TimeOffset,
    },

    #[error("Invalid variant selection {{{set} = {selection}}} at <{path}> in layer stack @{layer_stack}@")]
    InvalidVariantSelection {
        path: ScenePath,
        set: String,
        selection: String,
        layer_stack: String,
    },

    #[error("Invalid target path <{target}> authored on <{owner}> in @{layer}@")]
    InvalidTargetPath {
        owner: ScenePath,
        target: ScenePath,
        layer: String,
    },

    #[error("Target path <{target}> authored on <{owner}> in @{layer}@ points outside the scope of its arc")]
    InvalidExternalTargetPath {
        owner: ScenePath,
        target: ScenePath,
        layer: String,
    },

    #[error("Property <{path}> in @{layer}@ has inconsistent spec type; the strongest spec defines it as {expected}")]
    InconsistentPropertyType {
        path: ScenePath,
        layer: String,
        expected: String,
    },

    #[error("Child name '{name}' of <{path}> is both added and deleted in @{layer}@; treating it as prohibited")]
    ProhibitedNameCollision {
        path: ScenePath,
        name: String,
        layer: String,
    },

    #[error("Prim index for <{path}> exceeded its node capacity of {capacity}")]
    IndexCapacityExceeded { path: ScenePath, capacity: usize },
}

/// Contract violations by callers of [`crate::cache::Cache`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Path <{0}> is not a prim path")]
    NotAPrimPath(ScenePath),

    #[error("Path <{0}> is not a property path")]
    NotAPropertyPath(ScenePath),

    #[error("Property <{property}> does not belong to the prim index for <{prim}>")]
    PrimIndexMismatch {
        property: ScenePath,
        prim: ScenePath,
    },
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}
