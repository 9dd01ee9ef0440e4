//! Laminate: layered scene-description composition
//!
//! Given an ordered collection of layers, each contributing opinions on a
//! tree of prims and properties, laminate computes for any namespace path the
//! strength-ordered set of opinions that compose it. Composition follows
//! sublayers, variants, inherits, references, payloads and specializes, with
//! namespace and time remapping across every arc.
//!
//! Layer parsing is outside this crate: layers are consumed through the
//! [`layer::Layer`] and [`layer::LayerResolver`] traits.
//! [`layer::MemoryLayer`] provides an in-memory implementation.
//!
//! ```no_run
//! use laminate::cache::Cache;
//! use laminate::layer::{MemoryLayer, MemoryResolver};
//! use laminate::layer_stack::LayerStackIdentifier;
//! use laminate::path::ScenePath;
//! use std::sync::Arc;
//!
//! let resolver = Arc::new(MemoryResolver::new());
//! let mut root = MemoryLayer::new("shot.layer");
//! root.define_prim("/World").unwrap();
//! resolver.insert(root);
//!
//! let cache = Cache::with_defaults(LayerStackIdentifier::new("shot.layer"), resolver);
//! let index = cache.compute_prim_index(&ScenePath::parse("/World").unwrap()).unwrap();
//! assert!(index.has_specs());
//! ```

pub mod cache;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod index;
pub mod layer;
pub mod layer_stack;
pub mod logging;
pub mod map;
pub mod path;
pub mod property;
pub mod targets;

pub use cache::Cache;
pub use error::{CacheError, CompositionError, LayerError, LayerStackError, PathError};
pub use path::ScenePath;
