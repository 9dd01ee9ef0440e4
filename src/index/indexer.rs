//! Prim indexing: ancestral projection plus depth-first arc expansion

use crate::error::CompositionError;
use crate::index::node::{ArcType, NodeData, NodeGraph, NodeId};
use crate::index::payload::{PayloadSet, PayloadState};
use crate::index::prim_index::PrimIndex;
use crate::index::variants::VariantFallbackMap;
use crate::layer::fields;
use crate::layer_stack::{LayerStack, LayerStackRegistry};
use crate::map::MapFunction;
use crate::path::ScenePath;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

/// Inputs shared by every prim index computed under one cache state
#[derive(Clone, Copy)]
pub struct IndexInputs<'a> {
    pub registry: &'a LayerStackRegistry,
    pub variant_fallbacks: &'a VariantFallbackMap,
    pub payloads: &'a PayloadSet,
    pub max_nodes: usize,
    /// Generation of `variant_fallbacks`; recorded on every index built
    pub fallback_generation: u64,
}

/// Builds one [`PrimIndex`]
pub struct PrimIndexer<'a> {
    pub(super) inputs: IndexInputs<'a>,
    pub(super) path: ScenePath,
    pub(super) graph: NodeGraph,
    pub(super) errors: Vec<CompositionError>,
    pub(super) payload_state: PayloadState,
    capacity_reported: bool,
}

impl<'a> PrimIndexer<'a> {
    /// Compute the index for `path` in `root_stack`.
    ///
    /// `parent` must be the index of `path`'s parent prim when `path` is
    /// not the pseudo-root; its nodes are projected onto `path` so arcs
    /// authored on ancestors keep contributing. Without a parent index the
    /// computation starts from a lone root node.
    #[instrument(skip(inputs, root_stack, parent), fields(stack = %root_stack.identifier()))]
    pub fn compute(
        inputs: IndexInputs<'a>,
        root_stack: Arc<LayerStack>,
        path: &ScenePath,
        parent: Option<&PrimIndex>,
    ) -> PrimIndex {
        let start = Instant::now();

        // Step 1: Seed the graph, projecting the parent index when there is one
        let (graph, payload_state, seeded) = match parent {
            Some(parent) if !path.is_absolute_root() => {
                let (graph, seeded) = project_onto_child(parent.graph(), path.name());
                (graph, parent.payload_state(), seeded)
            }
            _ => {
                let root = NodeData {
                    arc: ArcType::Root,
                    has_specs: root_stack.has_spec(path),
                    layer_stack: root_stack,
                    path: path.clone(),
                    parent: None,
                    children: Vec::new(),
                    map_to_parent: MapFunction::identity(),
                    map_to_root: MapFunction::identity(),
                    namespace_depth: path.namespace_depth(),
                    sibling_number: 0,
                    inert: false,
                };
                (NodeGraph::new(root), PayloadState::NoPayload, vec![NodeId(0)])
            }
        };

        let mut indexer = PrimIndexer {
            inputs,
            path: path.clone(),
            graph,
            errors: Vec::new(),
            payload_state,
            capacity_reported: false,
        };

        // Step 2: Expand arcs authored at this path on every seeded node.
        // The pseudo-root carries no arcs.
        if !path.is_absolute_root() {
            for id in seeded {
                indexer.expand_node(id);
            }
        }

        // Step 3: Diagnostics that need the finished graph
        indexer.detect_name_collisions();

        for error in &indexer.errors {
            debug!(error = %error, "Composition error");
        }
        debug!(
            path = %path,
            node_count = indexer.graph.len(),
            error_count = indexer.errors.len(),
            duration_us = start.elapsed().as_micros(),
            "Prim index computed"
        );

        // A child projected from an index built under an older fallback
        // table inherits that staleness
        let fallback_generation = parent.map_or(inputs.fallback_generation, |parent| {
            parent.fallback_generation().min(inputs.fallback_generation)
        });

        PrimIndex::new(
            indexer.path,
            indexer.graph,
            indexer.errors,
            indexer.payload_state,
            fallback_generation,
        )
    }

    /// Add `data` under `parent` and expand its arcs depth-first.
    ///
    /// Returns `None` when the node would exceed capacity, close a cycle, or
    /// repeat a site that `parent` already has as a child.
    pub(super) fn add_child_node(
        &mut self,
        parent: NodeId,
        data: NodeData,
        check_cycle: bool,
    ) -> Option<NodeId> {
        if self.has_child_site(parent, &data) {
            debug!(path = %data.path, arc = ?data.arc, "Skipping duplicate site");
            return None;
        }
        if !self.has_capacity() {
            return None;
        }
        if check_cycle && self.closes_cycle(parent, &data) {
            self.errors.push(CompositionError::ArcCycle {
                path: self.graph.data(parent).path.clone(),
                target: data.path.clone(),
                arc: data.arc,
                layer_stack: data.layer_stack.identifier().to_string(),
            });
            return None;
        }
        let inert = data.inert;
        let child = self.graph.add_child(parent, data);
        if !inert {
            self.expand_node(child);
        }
        Some(child)
    }

    /// True when `parent` already has a child on the same layer stack and path
    fn has_child_site(&self, parent: NodeId, data: &NodeData) -> bool {
        self.graph.data(parent).children.iter().any(|&sibling| {
            let existing = self.graph.data(sibling);
            existing.path == data.path
                && existing.layer_stack.identifier() == data.layer_stack.identifier()
        })
    }

    fn has_capacity(&mut self) -> bool {
        if self.graph.len() < self.inputs.max_nodes {
            return true;
        }
        if !self.capacity_reported {
            self.capacity_reported = true;
            self.errors.push(CompositionError::IndexCapacityExceeded {
                path: self.path.clone(),
                capacity: self.inputs.max_nodes,
            });
        }
        false
    }

    /// A new node closes a cycle when an ancestor (inclusive) in the same
    /// layer stack addresses the same namespace or one nested with it.
    fn closes_cycle(&self, parent: NodeId, data: &NodeData) -> bool {
        let target = data.path.strip_all_variant_selections();
        self.graph.ancestors(parent).into_iter().any(|id| {
            let ancestor = self.graph.data(id);
            if ancestor.inert || ancestor.layer_stack.identifier() != data.layer_stack.identifier() {
                return false;
            }
            let site = ancestor.path.strip_all_variant_selections();
            site.has_prefix(&target) || target.has_prefix(&site)
        })
    }

    fn detect_name_collisions(&mut self) {
        for id in self.graph.strength_order() {
            let node = self.graph.data(id);
            if node.inert || !node.has_specs {
                continue;
            }
            for layer in node.layer_stack.layers() {
                let Some(edits) = layer.token_list_op(&node.path, fields::PRIM_CHILD_EDITS) else {
                    continue;
                };
                let defined = layer.prim_child_names(&node.path);
                for name in edits.deleted.iter().filter(|n| defined.contains(n)) {
                    self.errors.push(CompositionError::ProhibitedNameCollision {
                        path: self.path.clone(),
                        name: name.clone(),
                        layer: layer.identifier().to_string(),
                    });
                }
            }
        }
    }
}

/// Copy `parent`'s graph with `name` appended to every node path.
///
/// Returns the new graph and the nodes whose arcs still need expanding at
/// the child path (every non-inert node, in strength order).
fn project_onto_child(parent: &NodeGraph, name: &str) -> (NodeGraph, Vec<NodeId>) {
    let nodes: Vec<NodeData> = parent
        .nodes_data()
        .iter()
        .map(|node| {
            let path = node.path.child(name);
            NodeData {
                has_specs: !node.inert && node.layer_stack.has_spec(&path),
                path,
                ..node.clone()
            }
        })
        .collect();
    let graph = NodeGraph::from_nodes(nodes);
    let seeded = graph
        .strength_order()
        .into_iter()
        .filter(|id| !graph.data(*id).inert)
        .collect();
    (graph, seeded)
}
