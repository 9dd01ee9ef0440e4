//! Relationship target and attribute connection resolution

use crate::error::CompositionError;
use crate::layer::{fields, ListOp, SpecType};
use crate::path::ScenePath;
use crate::property::PropertyIndex;
use tracing::debug;

/// Composed target (or connection) paths of one property
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetPaths {
    /// Final list, ordered and deduplicated, in the root namespace
    pub paths: Vec<ScenePath>,
    /// Paths some layer deleted that are absent from `paths`
    pub deleted_paths: Vec<ScenePath>,
    pub errors: Vec<CompositionError>,
}

/// Targets authored on relationship specs of `index`
pub fn compute_relationship_target_paths(index: &PropertyIndex) -> TargetPaths {
    compute_paths(index, SpecType::Relationship, fields::TARGET_PATHS)
}

/// Connections authored on attribute specs of `index`
pub fn compute_attribute_connection_paths(index: &PropertyIndex) -> TargetPaths {
    compute_paths(index, SpecType::Attribute, fields::CONNECTION_PATHS)
}

fn compute_paths(index: &PropertyIndex, spec_type: SpecType, field: &str) -> TargetPaths {
    let mut result = TargetPaths::default();
    if index.spec_type() != Some(spec_type) {
        return result;
    }

    let mut paths: Vec<ScenePath> = Vec::new();
    let mut deleted: Vec<ScenePath> = Vec::new();

    // Weakest to strongest, each op mapped into the root namespace first
    for spec in index.property_stack().iter().rev() {
        let Some(op) = spec.layer.path_list_op(&spec.path, field) else {
            continue;
        };
        let mapped: ListOp<ScenePath> = op.filter_map(|target| {
            if !(target.is_prim_path() || target.is_property_path()) || target.is_absolute_root() {
                result.errors.push(CompositionError::InvalidTargetPath {
                    owner: index.path().clone(),
                    target: target.clone(),
                    layer: spec.layer.identifier().to_string(),
                });
                return None;
            }
            let stripped = target.strip_all_variant_selections();
            match spec.map_to_root.map_source_to_target(&stripped) {
                Some(mapped) => Some(mapped),
                None => {
                    result.errors.push(CompositionError::InvalidExternalTargetPath {
                        owner: index.path().clone(),
                        target: target.clone(),
                        layer: spec.layer.identifier().to_string(),
                    });
                    None
                }
            }
        });
        mapped.apply(&mut paths);
        for path in mapped.deleted {
            if !deleted.contains(&path) {
                deleted.push(path);
            }
        }
    }

    debug_assert!(
        paths.iter().all(|p| !p.contains_variant_selection()),
        "composed targets must not contain variant selections"
    );

    result.deleted_paths = deleted.into_iter().filter(|p| !paths.contains(p)).collect();
    result.paths = paths;
    debug!(
        path = %index.path(),
        count = result.paths.len(),
        deleted = result.deleted_paths.len(),
        "Target paths computed"
    );
    result
}
