//! Composition cache
//!
//! [`Cache`] is the entry point for every query. It owns the layer stack
//! registry, the prim and property index tables, the variant fallback table
//! and the payload inclusion set.
//!
//! Each table computes at most one value per key; concurrent requests for
//! the same uncached path share one computation. Cached indexes are never
//! mutated: invalidation drops them and the next request recomputes.
//!
//! Every index records the generation of the variant fallback table it was
//! built under. An index from an older generation is never returned, even
//! when a table change races with its computation.

use crate::concurrency::{build_pool, KeyedOnceMap};
use crate::config::CacheConfig;
use crate::error::CacheError;
use crate::index::{IndexInputs, PayloadSet, PrimIndex, PrimIndexer, VariantFallbackMap};
use crate::layer::LayerResolver;
use crate::layer_stack::{LayerStack, LayerStackIdentifier, LayerStackRegistry};
use crate::path::ScenePath;
use crate::property::{project_property_index, PropertyIndex};
use crate::targets::{self, TargetPaths};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// The fallback table and a counter bumped each time it changes
struct FallbackTable {
    table: VariantFallbackMap,
    generation: u64,
}

pub struct Cache {
    root_identifier: LayerStackIdentifier,
    config: CacheConfig,
    layer_stacks: LayerStackRegistry,
    prim_indexes: KeyedOnceMap<ScenePath, Arc<PrimIndex>>,
    property_indexes: KeyedOnceMap<ScenePath, Arc<PropertyIndex>>,
    variant_fallbacks: RwLock<FallbackTable>,
    payloads: RwLock<PayloadSet>,
    pool: OnceCell<Option<rayon::ThreadPool>>,
}

impl Cache {
    /// Create a cache composing against the layer stack `root`.
    ///
    /// The fallback table starts as `config.variant_fallbacks`.
    pub fn new(
        root: LayerStackIdentifier,
        resolver: Arc<dyn LayerResolver>,
        config: CacheConfig,
    ) -> Self {
        info!(
            stack = %root,
            max_parallelism = config.max_parallelism,
            cache_property_indexes = config.cache_property_indexes,
            "Creating composition cache"
        );
        Self {
            variant_fallbacks: RwLock::new(FallbackTable {
                table: config.variant_fallbacks.clone(),
                generation: 0,
            }),
            root_identifier: root,
            config,
            layer_stacks: LayerStackRegistry::new(resolver),
            prim_indexes: KeyedOnceMap::new(),
            property_indexes: KeyedOnceMap::new(),
            payloads: RwLock::new(PayloadSet::new()),
            pool: OnceCell::new(),
        }
    }

    pub fn with_defaults(root: LayerStackIdentifier, resolver: Arc<dyn LayerResolver>) -> Self {
        Self::new(root, resolver, CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn root_identifier(&self) -> &LayerStackIdentifier {
        &self.root_identifier
    }

    /// The root layer stack every prim index starts from
    pub fn layer_stack(&self) -> Arc<LayerStack> {
        self.layer_stacks.get_or_compute(&self.root_identifier)
    }

    /// Compute (or fetch) the layer stack for `identifier`; its local errors
    /// are available from [`LayerStack::local_errors`]
    pub fn compute_layer_stack(&self, identifier: &LayerStackIdentifier) -> Arc<LayerStack> {
        self.layer_stacks.get_or_compute(identifier)
    }

    pub fn find_layer_stack(&self, identifier: &LayerStackIdentifier) -> Option<Arc<LayerStack>> {
        self.layer_stacks.find(identifier)
    }

    /// Compute the prim index for `path`, reusing the cached one if present.
    ///
    /// Ancestor indexes are computed (and cached) first. An index finished
    /// after the fallback table changed is discarded and recomputed.
    #[instrument(skip(self), fields(path = %path))]
    pub fn compute_prim_index(&self, path: &ScenePath) -> Result<Arc<PrimIndex>, CacheError> {
        if !path.is_prim_path() || path.contains_variant_selection() {
            return Err(CacheError::NotAPrimPath(path.clone()));
        }

        loop {
            if let Some(index) = self.prim_indexes.find(path) {
                if index.fallback_generation() == self.fallback_generation() {
                    return Ok(index);
                }
                self.prim_indexes
                    .invalidate_if(path, |cached| Arc::ptr_eq(cached, &index));
            }

            let parent = match path.parent() {
                Some(parent) => Some(self.compute_prim_index(&parent)?),
                None => None,
            };

            let index = self.prim_indexes.get_or_compute(path, || {
                // Table and generation are read under one lock
                let (fallbacks, fallback_generation) = {
                    let current = self.variant_fallbacks.read();
                    (current.table.clone(), current.generation)
                };
                let payloads = self.payloads.read().clone();
                let inputs = IndexInputs {
                    registry: &self.layer_stacks,
                    variant_fallbacks: &fallbacks,
                    payloads: &payloads,
                    max_nodes: self.config.max_index_nodes,
                    fallback_generation,
                };
                Arc::new(PrimIndexer::compute(
                    inputs,
                    self.layer_stack(),
                    path,
                    parent.as_deref(),
                ))
            });

            if index.fallback_generation() == self.fallback_generation() {
                return Ok(index);
            }
            self.prim_indexes
                .invalidate_if(path, |cached| Arc::ptr_eq(cached, &index));
            debug!(
                built = index.fallback_generation(),
                "Variant fallbacks changed during indexing; recomputing"
            );
        }
    }

    /// Cached prim index for `path`; never computes
    pub fn find_prim_index(&self, path: &ScenePath) -> Option<Arc<PrimIndex>> {
        self.prim_indexes
            .find(path)
            .filter(|index| index.fallback_generation() == self.fallback_generation())
    }

    /// Compute prim indexes for many paths on the bounded worker pool.
    ///
    /// Results are returned in input order.
    #[instrument(skip(self, paths), fields(count = paths.len()))]
    pub fn compute_prim_indexes(
        &self,
        paths: &[ScenePath],
    ) -> Vec<Result<Arc<PrimIndex>, CacheError>> {
        let pool = self.pool.get_or_init(|| match build_pool(self.config.max_parallelism) {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!(error = %e, "Failed to build worker pool; indexing sequentially");
                None
            }
        });
        match pool {
            Some(pool) => pool.install(|| {
                paths
                    .par_iter()
                    .map(|path| self.compute_prim_index(path))
                    .collect()
            }),
            None => paths.iter().map(|path| self.compute_prim_index(path)).collect(),
        }
    }

    /// Update the payload inclusion set. Returns the paths whose inclusion
    /// changed; indexes already cached are left untouched, so callers
    /// invalidate those paths before recomputing.
    pub fn request_payloads(&self, include: &[ScenePath], exclude: &[ScenePath]) -> Vec<ScenePath> {
        let changed = self.payloads.write().request(include, exclude);
        debug!(changed = changed.len(), "Payload inclusion updated");
        changed
    }

    pub fn included_payloads(&self) -> Vec<ScenePath> {
        self.payloads.read().paths()
    }

    /// Compute the property index for `path`.
    ///
    /// Cached unless `cache_property_indexes` is disabled, in which case
    /// every call builds a fresh index.
    #[instrument(skip(self), fields(path = %path))]
    pub fn compute_property_index(&self, path: &ScenePath) -> Result<Arc<PropertyIndex>, CacheError> {
        if !path.is_property_path() || path.contains_variant_selection() {
            return Err(CacheError::NotAPropertyPath(path.clone()));
        }

        loop {
            if let Some(index) = self.property_indexes.find(path) {
                if index.fallback_generation() == self.fallback_generation() {
                    return Ok(index);
                }
                self.property_indexes
                    .invalidate_if(path, |cached| Arc::ptr_eq(cached, &index));
            }

            let prim_index = self.compute_prim_index(&path.prim_path())?;
            if !self.config.cache_property_indexes {
                return Ok(Arc::new(project_property_index(path, &prim_index)));
            }

            let index = self
                .property_indexes
                .get_or_compute(path, || Arc::new(project_property_index(path, &prim_index)));
            if index.fallback_generation() == self.fallback_generation() {
                return Ok(index);
            }
            self.property_indexes
                .invalidate_if(path, |cached| Arc::ptr_eq(cached, &index));
        }
    }

    pub fn find_property_index(&self, path: &ScenePath) -> Option<Arc<PropertyIndex>> {
        self.property_indexes
            .find(path)
            .filter(|index| index.fallback_generation() == self.fallback_generation())
    }

    pub fn compute_relationship_target_paths(
        &self,
        path: &ScenePath,
    ) -> Result<TargetPaths, CacheError> {
        let index = self.compute_property_index(path)?;
        Ok(targets::compute_relationship_target_paths(&index))
    }

    pub fn compute_attribute_connection_paths(
        &self,
        path: &ScenePath,
    ) -> Result<TargetPaths, CacheError> {
        let index = self.compute_property_index(path)?;
        Ok(targets::compute_attribute_connection_paths(&index))
    }

    /// Replace the fallback table, dropping every index computed under the
    /// previous one
    pub fn set_variant_fallbacks(&self, fallbacks: VariantFallbackMap) {
        let mut current = self.variant_fallbacks.write();
        if current.table == fallbacks {
            return;
        }
        current.table = fallbacks;
        current.generation += 1;
        self.prim_indexes.clear();
        self.property_indexes.clear();
        info!(
            generation = current.generation,
            "Variant fallbacks changed; prim and property indexes invalidated"
        );
    }

    pub fn variant_fallbacks(&self) -> VariantFallbackMap {
        self.variant_fallbacks.read().table.clone()
    }

    fn fallback_generation(&self) -> u64 {
        self.variant_fallbacks.read().generation
    }

    /// Child prim names of `path` and the names prohibited below it
    pub fn compute_prim_child_names(
        &self,
        path: &ScenePath,
    ) -> Result<(Vec<String>, Vec<String>), CacheError> {
        Ok(self.compute_prim_index(path)?.compute_prim_child_names())
    }

    pub fn compute_prim_property_names(&self, path: &ScenePath) -> Result<Vec<String>, CacheError> {
        Ok(self.compute_prim_index(path)?.compute_prim_property_names())
    }

    /// Drop the prim index for `path` along with every index projected from
    /// it: descendant prim indexes and the property indexes they own.
    /// Returns whether `path` itself had a cached index.
    pub fn invalidate_prim_index(&self, path: &ScenePath) -> bool {
        let removed = self.prim_indexes.invalidate_where(|p| p.has_prefix(path));
        self.property_indexes.invalidate_where(|p| p.has_prefix(path));
        removed.contains(path)
    }

    /// Drop every index at or below `path`; returns the number of prim
    /// indexes removed
    pub fn invalidate_subtree(&self, path: &ScenePath) -> usize {
        let removed = self.prim_indexes.invalidate_where(|p| p.has_prefix(path));
        self.property_indexes.invalidate_where(|p| p.has_prefix(path));
        debug!(path = %path, removed = removed.len(), "Invalidated subtree");
        removed.len()
    }

    /// Drop every index and layer stack
    pub fn invalidate_all(&self) {
        self.prim_indexes.clear();
        self.property_indexes.clear();
        self.layer_stacks.clear();
        info!("Composition cache cleared");
    }

    /// Paths of every cached prim index, sorted
    pub fn cached_prim_paths(&self) -> Vec<ScenePath> {
        let mut paths = self.prim_indexes.keys();
        paths.sort();
        paths
    }
}
