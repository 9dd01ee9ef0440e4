//! Prim indexing
//!
//! A [`PrimIndex`] is the composition tree for one prim path. The root node
//! addresses the prim in the cache's root layer stack; every other node was
//! introduced by an arc ([`ArcType`]) and carries the map function that
//! translates its namespace and time into its parent's.
//!
//! Indexes are built top-down: the index of `/A/B` starts as a projection
//! of the index of `/A`, then arcs authored at `/A/B` are expanded
//! depth-first on each projected node.

mod arcs;
pub mod indexer;
pub mod node;
pub mod payload;
pub mod prim_index;
pub mod variants;

pub use indexer::{IndexInputs, PrimIndexer};
pub use node::{ArcType, NodeGraph, NodeId, NodeRef};
pub use payload::{PayloadSet, PayloadState};
pub use prim_index::{PrimIndex, SpecSite};
pub use variants::VariantFallbackMap;
