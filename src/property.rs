//! Property indexing
//!
//! A property index projects a composed prim index onto one property: every
//! contributing prim spec is asked for a property spec of the same name, in
//! prim stack order.

use crate::error::{CacheError, CompositionError};
use crate::index::{NodeId, PrimIndex};
use crate::layer::{Layer, SpecType};
use crate::map::{MapFunction, TimeOffset};
use crate::path::ScenePath;
use std::sync::Arc;
use tracing::debug;

/// One property spec contributing to a composed property
#[derive(Debug, Clone)]
pub struct PropertySpec {
    pub layer: Arc<dyn Layer>,
    pub path: ScenePath,
    pub spec_type: SpecType,
    pub node: NodeId,
    /// Maps paths authored in this spec into the root namespace
    pub map_to_root: MapFunction,
    pub time_offset: TimeOffset,
}

#[derive(Debug)]
pub struct PropertyIndex {
    path: ScenePath,
    property_stack: Vec<PropertySpec>,
    errors: Vec<CompositionError>,
    fallback_generation: u64,
}

impl PropertyIndex {
    pub fn path(&self) -> &ScenePath {
        &self.path
    }

    /// Contributing property specs, strongest first
    pub fn property_stack(&self) -> &[PropertySpec] {
        &self.property_stack
    }

    pub fn errors(&self) -> &[CompositionError] {
        &self.errors
    }

    /// An empty stack means the property does not exist
    pub fn is_empty(&self) -> bool {
        self.property_stack.is_empty()
    }

    /// Type of the strongest spec
    pub fn spec_type(&self) -> Option<SpecType> {
        self.property_stack.first().map(|spec| spec.spec_type)
    }

    /// Fallback generation of the prim index this was projected from
    pub fn fallback_generation(&self) -> u64 {
        self.fallback_generation
    }
}

/// Build the property index for `property_path` from its owning prim index.
///
/// Fails when `property_path` is not a property path or does not belong to
/// `prim_index`. Specs whose type disagrees with the strongest spec are
/// dropped with [`CompositionError::InconsistentPropertyType`].
pub fn build_prim_property_index(
    property_path: &ScenePath,
    prim_index: &PrimIndex,
) -> Result<PropertyIndex, CacheError> {
    if !property_path.is_property_path() {
        return Err(CacheError::NotAPropertyPath(property_path.clone()));
    }
    if property_path.prim_path() != *prim_index.path() {
        return Err(CacheError::PrimIndexMismatch {
            property: property_path.clone(),
            prim: prim_index.path().clone(),
        });
    }
    Ok(project_property_index(property_path, prim_index))
}

/// Project `prim_index` onto the property `property_path`, which the caller
/// has already checked belongs to it
pub(crate) fn project_property_index(
    property_path: &ScenePath,
    prim_index: &PrimIndex,
) -> PropertyIndex {
    let name = property_path.name();
    let mut property_stack: Vec<PropertySpec> = Vec::new();
    let mut errors = Vec::new();

    for site in prim_index.prim_stack() {
        let path = site.path.property(name);
        let spec_type = match site.layer.spec_type(&path) {
            Some(spec_type) if spec_type.is_property() => spec_type,
            _ => continue,
        };
        if let Some(strongest) = property_stack.first() {
            if strongest.spec_type != spec_type {
                errors.push(CompositionError::InconsistentPropertyType {
                    path: property_path.clone(),
                    layer: site.layer.identifier().to_string(),
                    expected: strongest.spec_type.to_string(),
                });
                continue;
            }
        }
        property_stack.push(PropertySpec {
            layer: site.layer.clone(),
            path,
            spec_type,
            node: site.node,
            map_to_root: prim_index.node(site.node).map_to_root().clone(),
            time_offset: site.time_offset,
        });
    }

    debug!(
        path = %property_path,
        spec_count = property_stack.len(),
        error_count = errors.len(),
        "Property index computed"
    );

    PropertyIndex {
        path: property_path.clone(),
        property_stack,
        errors,
        fallback_generation: prim_index.fallback_generation(),
    }
}
