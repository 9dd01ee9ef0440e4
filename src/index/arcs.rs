//! Arc expansion
//!
//! For one node, arcs are discovered in a fixed scan order: variant sets,
//! inherits, specializes, references, payloads. List-edited arc fields are
//! composed across the node's layer stack from weakest to strongest layer,
//! remembering which layer authored each surviving item.

use crate::error::CompositionError;
use crate::index::indexer::PrimIndexer;
use crate::index::node::{ArcType, NodeData, NodeId};
use crate::index::payload::PayloadState;
use crate::index::variants::{choose_fallback, find_explicit_selection};
use crate::layer::{fields, Layer, ListOp, Reference};
use crate::layer_stack::{LayerStack, LayerStackIdentifier};
use crate::map::{MapFunction, TimeOffset};
use crate::path::ScenePath;
use std::sync::Arc;
use tracing::trace;

/// A composed list item and the index of the layer that authored it
struct Sourced<T> {
    item: T,
    layer: usize,
}

impl<T> AsRef<T> for Sourced<T> {
    fn as_ref(&self) -> &T {
        &self.item
    }
}

fn compose_list<T: Clone + PartialEq>(
    stack: &LayerStack,
    path: &ScenePath,
    read: impl Fn(&Arc<dyn Layer>, &ScenePath) -> Option<ListOp<T>>,
) -> Vec<Sourced<T>> {
    let mut items: Vec<Sourced<T>> = Vec::new();
    for (layer_index, layer) in stack.layers().iter().enumerate().rev() {
        if let Some(op) = read(layer, path) {
            op.apply_with_source(&mut items, &mut |_: &T| {}, |item: &T| Sourced {
                item: item.clone(),
                layer: layer_index,
            });
        }
    }
    items
}

impl PrimIndexer<'_> {
    pub(super) fn expand_node(&mut self, id: NodeId) {
        if self.graph.data(id).inert {
            return;
        }
        trace!(node = ?self.graph.node(id), "Expanding arcs");
        self.add_variant_arcs(id);
        self.add_class_arcs(id, ArcType::Inherit, fields::INHERIT_PATHS);
        self.add_class_arcs(id, ArcType::Specialize, fields::SPECIALIZES);
        self.add_reference_arcs(id, ArcType::Reference, fields::REFERENCES);
        self.add_reference_arcs(id, ArcType::Payload, fields::PAYLOAD);
    }

    fn new_node(
        &self,
        parent: NodeId,
        arc: ArcType,
        layer_stack: Arc<LayerStack>,
        path: ScenePath,
        map_to_parent: MapFunction,
    ) -> NodeData {
        let map_to_root = self.graph.data(parent).map_to_root.compose(&map_to_parent);
        NodeData {
            arc,
            has_specs: layer_stack.has_spec(&path),
            layer_stack,
            path,
            parent: Some(parent),
            children: Vec::new(),
            map_to_parent,
            map_to_root,
            namespace_depth: self.path.namespace_depth(),
            sibling_number: 0,
            inert: false,
        }
    }

    fn add_variant_arcs(&mut self, id: NodeId) {
        let (stack, path) = {
            let node = self.graph.data(id);
            (node.layer_stack.clone(), node.path.clone())
        };
        let set_names = compose_list(&stack, &path, |layer, path| {
            layer.token_list_op(path, fields::VARIANT_SET_NAMES)
        });

        for set in set_names.into_iter().map(|s| s.item) {
            let explicit = find_explicit_selection(&self.graph, id, &set)
                .map(|(_, selection)| selection)
                .filter(|selection| !selection.is_empty());

            let selection = match explicit {
                Some(selection) => selection,
                None => {
                    let mut available: Vec<String> = Vec::new();
                    for layer in stack.layers() {
                        for name in layer.variant_names(&path, &set) {
                            if !available.contains(&name) {
                                available.push(name);
                            }
                        }
                    }
                    match choose_fallback(self.inputs.variant_fallbacks, &set, &available) {
                        Some(selection) => selection,
                        None => {
                            trace!(set = %set, path = %path, "No variant selection");
                            continue;
                        }
                    }
                }
            };

            let variant_path = match path.append_variant_selection(&set, &selection) {
                Ok(variant_path) => variant_path,
                Err(_) => {
                    self.errors.push(CompositionError::InvalidVariantSelection {
                        path: path.clone(),
                        set,
                        selection,
                        layer_stack: stack.identifier().to_string(),
                    });
                    continue;
                }
            };

            let child = self.new_node(
                id,
                ArcType::Variant,
                stack.clone(),
                variant_path,
                MapFunction::identity(),
            );
            self.add_child_node(id, child, false);
        }
    }

    /// Inherits and specializes: arcs to another prim of the same layer stack
    fn add_class_arcs(&mut self, id: NodeId, arc: ArcType, field: &str) {
        let (stack, path) = {
            let node = self.graph.data(id);
            (node.layer_stack.clone(), node.path.clone())
        };
        let targets = compose_list(&stack, &path, |layer, path| layer.path_list_op(path, field));

        for Sourced { item: target, layer } in targets {
            if !is_arc_target(&target) {
                self.errors.push(CompositionError::UnresolvedPrimPath {
                    path: path.clone(),
                    target,
                    layer: stack.layers()[layer].identifier().to_string(),
                    arc,
                });
                continue;
            }
            let map = MapFunction::new(
                [
                    (target.clone(), path.clone()),
                    (ScenePath::absolute_root(), ScenePath::absolute_root()),
                ],
                TimeOffset::identity(),
            );
            let child = self.new_node(id, arc, stack.clone(), target, map);
            self.add_child_node(id, child, true);
        }
    }

    /// References and payloads: arcs that may open another layer stack
    fn add_reference_arcs(&mut self, id: NodeId, arc: ArcType, field: &str) {
        let (stack, path) = {
            let node = self.graph.data(id);
            (node.layer_stack.clone(), node.path.clone())
        };
        let references = compose_list(&stack, &path, |layer, path| {
            layer.reference_list_op(path, field)
        });

        for Sourced { item: reference, layer } in references {
            if arc == ArcType::Payload && !self.inputs.payloads.includes(&self.path) {
                if self.payload_state != PayloadState::Included {
                    self.payload_state = PayloadState::Excluded;
                }
                let mut stub = self.new_node(
                    id,
                    arc,
                    stack.clone(),
                    path.clone(),
                    MapFunction::identity(),
                );
                stub.inert = true;
                stub.has_specs = false;
                self.add_child_node(id, stub, false);
                continue;
            }
            if arc == ArcType::Payload {
                self.payload_state = PayloadState::Included;
            }

            if let Some(child) = self.reference_node(id, arc, &stack, &path, &reference, layer) {
                self.add_child_node(id, child, true);
            }
        }
    }

    fn reference_node(
        &mut self,
        id: NodeId,
        arc: ArcType,
        stack: &Arc<LayerStack>,
        path: &ScenePath,
        reference: &Reference,
        layer_index: usize,
    ) -> Option<NodeData> {
        let authoring = stack.layers()[layer_index].clone();

        // Step 1: Target layer stack
        let target_stack = if reference.is_internal() {
            stack.clone()
        } else {
            let resolver = self.inputs.registry.resolver();
            match resolver.open(&reference.asset_path, Some(authoring.identifier())) {
                Ok(layer) => self
                    .inputs
                    .registry
                    .get_or_compute(&LayerStackIdentifier::new(layer.identifier())),
                Err(source) => {
                    self.errors.push(CompositionError::InvalidAssetPath {
                        path: path.clone(),
                        asset_path: reference.asset_path.clone(),
                        arc,
                        source,
                    });
                    return None;
                }
            }
        };
        let target_layer = target_stack.identifier().root_layer.clone();

        // Step 2: Target prim, falling back to the default prim
        let target = match &reference.prim_path {
            Some(prim_path) => Some(prim_path.clone()),
            None => default_prim(&target_stack),
        };
        let target = match target {
            Some(target) if is_arc_target(&target) && target_stack.has_spec(&target) => target,
            other => {
                self.errors.push(CompositionError::UnresolvedPrimPath {
                    path: path.clone(),
                    target: other.unwrap_or_else(ScenePath::absolute_root),
                    layer: target_layer,
                    arc,
                });
                return None;
            }
        };

        // Step 3: Time mapping from the authoring layer through the arc
        let arc_offset = if reference.layer_offset.is_valid() {
            reference.layer_offset
        } else {
            self.errors.push(CompositionError::InvalidReferenceOffset {
                path: path.clone(),
                asset_path: reference.asset_path.clone(),
                arc,
                offset: reference.layer_offset,
            });
            TimeOffset::identity()
        };
        let time_offset = stack.layer_offset(layer_index).compose(&arc_offset);

        let map = MapFunction::new([(target.clone(), path.clone())], time_offset);
        Some(self.new_node(id, arc, target_stack, target, map))
    }
}

fn is_arc_target(path: &ScenePath) -> bool {
    path.is_prim_path() && !path.is_absolute_root() && !path.contains_variant_selection()
}

fn default_prim(stack: &LayerStack) -> Option<ScenePath> {
    let name = stack
        .root_layer()?
        .token(&ScenePath::absolute_root(), fields::DEFAULT_PRIM)?;
    if name.starts_with('/') {
        ScenePath::parse(&name).ok()
    } else {
        ScenePath::absolute_root().append_child(&name).ok()
    }
}
