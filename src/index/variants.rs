//! Variant selection: explicit opinions first, then the fallback table

use crate::index::node::{ArcType, NodeGraph, NodeId};
use crate::layer::fields;
use crate::path::ScenePath;
use std::collections::BTreeMap;

/// Variant set name to ordered candidate selections
pub type VariantFallbackMap = BTreeMap<String, Vec<String>>;

/// Search the graph for an explicit selection of `set` authored at the site
/// of `node`.
///
/// Every node addressing the same site (after mapping through the root
/// namespace) is consulted in strength order; within a node the layer stack
/// is walked strongest first. The first opinion found wins.
pub(crate) fn find_explicit_selection(
    graph: &NodeGraph,
    node: NodeId,
    set: &str,
) -> Option<(String, String)> {
    let origin = graph.node(node);
    let site = origin.path().strip_all_variant_selections();
    let root_site = origin.map_to_root().map_source_to_target(&site);

    let candidates: Vec<NodeId> = match &root_site {
        Some(root_site) => graph
            .strength_order()
            .into_iter()
            .filter(|id| {
                let candidate = graph.node(*id);
                if candidate.is_inert() {
                    return false;
                }
                let local = candidate.map_to_root().map_target_to_source(root_site);
                local.as_ref() == Some(&candidate.path().strip_all_variant_selections())
            })
            .collect(),
        None => vec![node],
    };

    for id in candidates {
        let candidate = graph.node(id);
        for layer in candidate.layer_stack().layers() {
            let selections = layer.dictionary(candidate.path(), fields::VARIANT_SELECTION);
            if let Some(selection) = selections.and_then(|d| d.get(set).cloned()) {
                return Some((layer.identifier().to_string(), selection));
            }
        }
    }
    None
}

/// First fallback candidate for `set` that names an authored variant
pub(crate) fn choose_fallback(
    fallbacks: &VariantFallbackMap,
    set: &str,
    available: &[String],
) -> Option<String> {
    fallbacks
        .get(set)?
        .iter()
        .find(|candidate| available.contains(candidate))
        .cloned()
}

/// Selections made by the variant nodes of `graph`, strongest first wins
pub(crate) fn composed_selections(graph: &NodeGraph) -> BTreeMap<String, String> {
    let mut selections = BTreeMap::new();
    for id in graph.strength_order() {
        let node = graph.node(id);
        if node.arc_type() != ArcType::Variant {
            continue;
        }
        if let Some((set, selection)) = variant_of(node.path()) {
            selections.entry(set).or_insert(selection);
        }
    }
    selections
}

fn variant_of(path: &ScenePath) -> Option<(String, String)> {
    path.elements().iter().rev().find_map(|element| match element {
        crate::path::PathElement::VariantSelection { set, selection } => {
            Some((set.clone(), selection.clone()))
        }
        _ => None,
    })
}
