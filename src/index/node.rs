//! Composition nodes stored in a per-index arena

use crate::layer_stack::LayerStack;
use crate::map::MapFunction;
use crate::path::ScenePath;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;

/// Kind of composition arc that introduced a node.
///
/// Variants are a closed set with a fixed strength table; lower
/// [`ArcType::strength`] values are stronger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcType {
    Root,
    Variant,
    Inherit,
    Reference,
    Payload,
    Specialize,
}

impl ArcType {
    pub fn strength(&self) -> u8 {
        match self {
            ArcType::Root => 0,
            ArcType::Variant => 1,
            ArcType::Inherit => 2,
            ArcType::Reference => 3,
            ArcType::Payload => 4,
            ArcType::Specialize => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArcType::Root => "root",
            ArcType::Variant => "variant",
            ArcType::Inherit => "inherit",
            ArcType::Reference => "reference",
            ArcType::Payload => "payload",
            ArcType::Specialize => "specialize",
        }
    }
}

impl fmt::Display for ArcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of a node inside its [`NodeGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub arc: ArcType,
    pub layer_stack: Arc<LayerStack>,
    pub path: ScenePath,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub map_to_parent: MapFunction,
    pub map_to_root: MapFunction,
    /// Namespace depth of the prim where the arc was authored
    pub namespace_depth: usize,
    pub sibling_number: usize,
    pub has_specs: bool,
    /// Inert nodes stay in the graph but contribute no opinions or arcs
    pub inert: bool,
}

impl NodeData {
    fn ordering_key(&self) -> (u8, Reverse<usize>, usize) {
        (
            self.arc.strength(),
            Reverse(self.namespace_depth),
            self.sibling_number,
        )
    }
}

/// Arena holding one prim index's node tree. Node 0 is the root.
#[derive(Debug, Clone)]
pub struct NodeGraph {
    nodes: Vec<NodeData>,
}

impl NodeGraph {
    pub(crate) fn new(root: NodeData) -> Self {
        Self { nodes: vec![root] }
    }

    pub(crate) fn from_nodes(nodes: Vec<NodeData>) -> Self {
        Self { nodes }
    }

    pub(crate) fn nodes_data(&self) -> &[NodeData] {
        &self.nodes
    }

    pub(crate) fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { graph: self, id }
    }

    /// Insert `data` as a child of `parent`, keeping siblings sorted by
    /// arc strength, then deeper namespace first, then insertion order.
    pub(crate) fn add_child(&mut self, parent: NodeId, mut data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        data.parent = Some(parent);
        data.sibling_number = self.nodes[parent.0].children.len();
        let key = data.ordering_key();
        self.nodes.push(data);

        let position = self.nodes[parent.0]
            .children
            .iter()
            .position(|sibling| self.nodes[sibling.0].ordering_key() > key)
            .unwrap_or(self.nodes[parent.0].children.len());
        self.nodes[parent.0].children.insert(position, id);
        id
    }

    /// Node ids in strength order: each node before its children, children
    /// in sibling order
    pub fn strength_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        order
    }

    /// `id` followed by its ancestors up to the root
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = self.nodes[id.0].parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.nodes[parent.0].parent;
        }
        chain
    }
}

/// Read-only handle to one node
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    graph: &'a NodeGraph,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    fn data(&self) -> &'a NodeData {
        &self.graph.nodes[self.id.0]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn arc_type(&self) -> ArcType {
        self.data().arc
    }

    pub fn path(&self) -> &'a ScenePath {
        &self.data().path
    }

    pub fn layer_stack(&self) -> &'a Arc<LayerStack> {
        &self.data().layer_stack
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.data().parent.map(|id| self.graph.node(id))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let graph = self.graph;
        self.data().children.iter().map(move |id| graph.node(*id))
    }

    pub fn map_to_parent(&self) -> &'a MapFunction {
        &self.data().map_to_parent
    }

    pub fn map_to_root(&self) -> &'a MapFunction {
        &self.data().map_to_root
    }

    pub fn namespace_depth(&self) -> usize {
        self.data().namespace_depth
    }

    pub fn has_specs(&self) -> bool {
        self.data().has_specs
    }

    pub fn is_inert(&self) -> bool {
        self.data().inert
    }

    pub fn is_root(&self) -> bool {
        self.data().parent.is_none()
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} @{}@",
            self.arc_type(),
            self.path(),
            self.layer_stack().identifier()
        )
    }
}
