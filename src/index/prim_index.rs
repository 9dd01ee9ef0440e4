//! The composed result for one prim path

use crate::error::CompositionError;
use crate::index::node::{ArcType, NodeGraph, NodeId, NodeRef};
use crate::index::payload::PayloadState;
use crate::index::variants;
use crate::layer::{fields, Layer, ListOp, Value};
use crate::map::TimeOffset;
use crate::path::ScenePath;
use once_cell::sync::OnceCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::sync::Arc;

/// One spec contributing to a prim, with the node that contributed it
#[derive(Debug, Clone)]
pub struct SpecSite {
    pub layer: Arc<dyn Layer>,
    /// Position of `layer` in the node's layer stack
    pub layer_index: usize,
    pub path: ScenePath,
    pub node: NodeId,
    /// Time offset from this layer into the root namespace
    pub time_offset: TimeOffset,
}

/// A prim's composition tree plus its lazily computed prim stack.
///
/// Immutable once built; the cache replaces whole indexes rather than
/// mutating them.
#[derive(Debug)]
pub struct PrimIndex {
    path: ScenePath,
    graph: NodeGraph,
    errors: Vec<CompositionError>,
    payload_state: PayloadState,
    fallback_generation: u64,
    prim_stack: OnceCell<Vec<SpecSite>>,
}

impl PrimIndex {
    pub(crate) fn new(
        path: ScenePath,
        graph: NodeGraph,
        errors: Vec<CompositionError>,
        payload_state: PayloadState,
        fallback_generation: u64,
    ) -> Self {
        Self {
            path,
            graph,
            errors,
            payload_state,
            fallback_generation,
            prim_stack: OnceCell::new(),
        }
    }

    /// Generation of the variant fallback table this index reflects
    pub fn fallback_generation(&self) -> u64 {
        self.fallback_generation
    }

    pub fn path(&self) -> &ScenePath {
        &self.path
    }

    pub fn graph(&self) -> &NodeGraph {
        &self.graph
    }

    pub fn root_node(&self) -> NodeRef<'_> {
        self.graph.node(self.graph.root())
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        self.graph.node(id)
    }

    /// Every node in strength order
    pub fn nodes(&self) -> Vec<NodeRef<'_>> {
        self.graph
            .strength_order()
            .into_iter()
            .map(|id| self.graph.node(id))
            .collect()
    }

    pub fn errors(&self) -> &[CompositionError] {
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn payload_state(&self) -> PayloadState {
        self.payload_state
    }

    /// Contributing specs, strongest first
    pub fn prim_stack(&self) -> &[SpecSite] {
        self.prim_stack.get_or_init(|| self.build_prim_stack())
    }

    /// Whether any layer contributes an opinion to this prim
    pub fn has_specs(&self) -> bool {
        !self.prim_stack().is_empty()
    }

    fn build_prim_stack(&self) -> Vec<SpecSite> {
        let mut sites = Vec::new();
        for id in self.graph.strength_order() {
            let node = self.graph.node(id);
            if node.is_inert() || !node.has_specs() {
                continue;
            }
            let stack = node.layer_stack();
            for (layer_index, layer) in stack.layers().iter().enumerate() {
                if layer.has_spec(node.path()) {
                    sites.push(SpecSite {
                        layer: layer.clone(),
                        layer_index,
                        path: node.path().clone(),
                        node: id,
                        time_offset: node
                            .map_to_root()
                            .time_offset()
                            .compose(&stack.layer_offset(layer_index)),
                    });
                }
            }
        }
        sites
    }

    /// Strongest opinion for the field `key`
    pub fn resolve_field(&self, key: &str) -> Option<Value> {
        self.prim_stack()
            .iter()
            .find_map(|site| site.layer.field(&site.path, key))
    }

    /// Composed child prim names and the names prohibited by deletions.
    ///
    /// Names are gathered weakest to strongest. A deleted name is prohibited
    /// when the deletion is at least as strong as the strongest spec that
    /// defines it; prohibited names never appear in the first list.
    pub fn compute_prim_child_names(&self) -> (Vec<String>, Vec<String>) {
        self.compose_names(
            |layer, path| layer.prim_child_names(path),
            fields::PRIM_ORDER,
            fields::PRIM_CHILD_EDITS,
        )
    }

    /// Composed property names, with deleted names removed
    pub fn compute_prim_property_names(&self) -> Vec<String> {
        let (names, _) = self.compose_names(
            |layer, path| layer.property_names(path),
            fields::PROPERTY_ORDER,
            fields::PROPERTY_EDITS,
        );
        names
    }

    fn compose_names(
        &self,
        read: impl Fn(&Arc<dyn Layer>, &ScenePath) -> Vec<String>,
        order_field: &str,
        edits_field: &str,
    ) -> (Vec<String>, Vec<String>) {
        let sites = self.prim_stack();
        let mut names: Vec<String> = Vec::new();
        let mut strongest_definition: HashMap<String, usize> = HashMap::new();
        let mut strongest_deletion: HashMap<String, usize> = HashMap::new();
        let mut deleted: Vec<String> = Vec::new();

        for (strength, site) in sites.iter().enumerate().rev() {
            for name in read(&site.layer, &site.path) {
                if !names.contains(&name) {
                    names.push(name.clone());
                }
                strongest_definition.insert(name, strength);
            }
            if let Some(edits) = site.layer.token_list_op(&site.path, edits_field) {
                for name in edits.deleted {
                    if !deleted.contains(&name) {
                        deleted.push(name.clone());
                    }
                    strongest_deletion.insert(name, strength);
                }
            }
            if let Some(order) = site.layer.token_list(&site.path, order_field) {
                ListOp::<String>::default()
                    .with_ordered(order)
                    .apply(&mut names);
            }
        }

        let prohibited: Vec<String> = deleted
            .into_iter()
            .filter(|name| match strongest_definition.get(name) {
                None => true,
                Some(defined) => strongest_deletion
                    .get(name)
                    .map_or(false, |deletion| deletion <= defined),
            })
            .collect();
        names.retain(|name| !prohibited.contains(name));
        (names, prohibited)
    }

    /// Variant selections applied while composing this prim
    pub fn variant_selections(&self) -> BTreeMap<String, String> {
        variants::composed_selections(&self.graph)
    }

    /// Human-readable description of the node tree
    pub fn dump(&self, include_maps: bool) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Prim index for <{}>", self.path);
        self.dump_node(&mut out, self.graph.root(), 1, include_maps);
        if !self.errors.is_empty() {
            let _ = writeln!(out, "Errors:");
            for error in &self.errors {
                let _ = writeln!(out, "    {}", error);
            }
        }
        out
    }

    fn dump_node(&self, out: &mut String, id: NodeId, depth: usize, include_maps: bool) {
        let node = self.graph.node(id);
        let indent = "    ".repeat(depth);
        let mut flags = String::new();
        if node.is_inert() && node.arc_type() == ArcType::Payload {
            flags.push_str(" [payload not included]");
        } else if node.is_inert() {
            flags.push_str(" [inert]");
        } else if !node.has_specs() {
            flags.push_str(" [no specs]");
        }
        let _ = writeln!(
            out,
            "{}{} <{}> @{}@ depth={}{}",
            indent,
            node.arc_type(),
            node.path(),
            node.layer_stack().identifier(),
            node.namespace_depth(),
            flags
        );
        if include_maps && !node.is_root() {
            let _ = writeln!(out, "{}  mapToParent: {}", indent, node.map_to_parent());
            let _ = writeln!(out, "{}  mapToRoot: {}", indent, node.map_to_root());
        }
        for child in node.children() {
            self.dump_node(out, child.id(), depth + 1, include_maps);
        }
    }
}
