//! Layer stacks: ordered, deduplicated layers that form one composition context
//!
//! A layer stack is built from a root layer, an optional session layer and
//! optional session-owned override layers. Sublayers are discovered
//! recursively; each layer carries the time offset accumulated from the root
//! of its sublayer chain. Problems found along the way are recorded as
//! [`LayerStackError`]s on the stack itself and never abort the walk.

use crate::concurrency::KeyedOnceMap;
use crate::error::LayerStackError;
use crate::layer::{Layer, LayerResolver};
use crate::map::TimeOffset;
use crate::path::ScenePath;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Identity of a layer stack
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerStackIdentifier {
    pub root_layer: String,
    #[serde(default)]
    pub session_layer: Option<String>,
    /// Session-owned layers placed between the session and root layers
    #[serde(default)]
    pub overrides: Vec<String>,
}

impl LayerStackIdentifier {
    pub fn new(root_layer: impl Into<String>) -> Self {
        Self {
            root_layer: root_layer.into(),
            session_layer: None,
            overrides: Vec::new(),
        }
    }

    pub fn with_session(mut self, session_layer: impl Into<String>) -> Self {
        self.session_layer = Some(session_layer.into());
        self
    }

    pub fn with_overrides(mut self, overrides: Vec<String>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Short blake3 digest of the identity, used as a tracing field
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        // Each field is tagged and length-prefixed so adjacent fields cannot alias
        let mut field = |tag: u8, value: &str| {
            hasher.update(&[tag]);
            hasher.update(&(value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        };
        field(b'r', &self.root_layer);
        match &self.session_layer {
            Some(session) => field(b's', session),
            None => field(b'n', ""),
        }
        for layer in &self.overrides {
            field(b'o', layer);
        }
        hex::encode(&hasher.finalize().as_bytes()[..8])
    }
}

impl fmt::Display for LayerStackIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root_layer)?;
        if let Some(session) = &self.session_layer {
            write!(f, " (session: {})", session)?;
        }
        if !self.overrides.is_empty() {
            write!(f, " (overrides: {})", self.overrides.join(", "))?;
        }
        Ok(())
    }
}

/// An immutable, computed layer stack
#[derive(Debug)]
pub struct LayerStack {
    identifier: LayerStackIdentifier,
    layers: Vec<Arc<dyn Layer>>,
    offsets: Vec<TimeOffset>,
    local_errors: Vec<LayerStackError>,
}

impl LayerStack {
    pub fn identifier(&self) -> &LayerStackIdentifier {
        &self.identifier
    }

    /// Layers, strongest first
    pub fn layers(&self) -> &[Arc<dyn Layer>] {
        &self.layers
    }

    /// Accumulated time offset of each layer, parallel to [`Self::layers`]
    pub fn offsets(&self) -> &[TimeOffset] {
        &self.offsets
    }

    pub fn layer_offset(&self, index: usize) -> TimeOffset {
        self.offsets.get(index).copied().unwrap_or_default()
    }

    pub fn local_errors(&self) -> &[LayerStackError] {
        &self.local_errors
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// The layer the stack was opened for (not the session layer)
    pub fn root_layer(&self) -> Option<&Arc<dyn Layer>> {
        self.layers
            .iter()
            .find(|layer| layer.identifier() == self.identifier.root_layer)
            .or_else(|| self.layers.last())
    }

    pub fn layer_index(&self, identifier: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.identifier() == identifier)
    }

    /// Whether any layer holds a spec at `path`
    pub fn has_spec(&self, path: &ScenePath) -> bool {
        self.layers.iter().any(|layer| layer.has_spec(path))
    }

    pub fn layer_identifiers(&self) -> Vec<String> {
        self.layers
            .iter()
            .map(|layer| layer.identifier().to_string())
            .collect()
    }
}

/// Compute a layer stack by resolving every layer of `identifier`.
///
/// Order: session layer and its sublayers, override layers, then the root
/// layer and its sublayers. A layer reached twice keeps its first (strongest)
/// position.
#[instrument(skip(resolver), fields(stack = %identifier, fingerprint = %identifier.fingerprint()))]
pub fn compute_layer_stack(
    identifier: &LayerStackIdentifier,
    resolver: &dyn LayerResolver,
) -> LayerStack {
    let start = Instant::now();
    let mut builder = StackBuilder {
        resolver,
        layers: Vec::new(),
        offsets: Vec::new(),
        errors: Vec::new(),
        seen: HashSet::new(),
    };

    // Step 1: Session layer (strongest)
    if let Some(session) = &identifier.session_layer {
        match resolver.open(session, None) {
            Ok(layer) => builder.add_tree(layer, TimeOffset::identity(), &mut Vec::new()),
            Err(source) => builder.errors.push(LayerStackError::InvalidSessionLayer {
                asset_path: session.clone(),
                source,
            }),
        }
    }

    // Step 2: Session-owned overrides
    let owner = identifier
        .session_layer
        .clone()
        .unwrap_or_else(|| identifier.root_layer.clone());
    for asset_path in &identifier.overrides {
        match resolver.open(asset_path, None) {
            Ok(layer) => builder.add_tree(layer, TimeOffset::identity(), &mut Vec::new()),
            Err(source) => builder.errors.push(LayerStackError::InvalidSublayerPath {
                layer: owner.clone(),
                sublayer: asset_path.clone(),
                source,
            }),
        }
    }

    // Step 3: Root layer and its sublayer hierarchy
    match resolver.open(&identifier.root_layer, None) {
        Ok(layer) => builder.add_tree(layer, TimeOffset::identity(), &mut Vec::new()),
        Err(source) => builder.errors.push(LayerStackError::InvalidRootLayer {
            asset_path: identifier.root_layer.clone(),
            source,
        }),
    }

    for error in &builder.errors {
        warn!(error = %error, "Layer stack error");
    }
    info!(
        layer_count = builder.layers.len(),
        error_count = builder.errors.len(),
        duration_ms = start.elapsed().as_millis(),
        "Layer stack computed"
    );

    LayerStack {
        identifier: identifier.clone(),
        layers: builder.layers,
        offsets: builder.offsets,
        local_errors: builder.errors,
    }
}

struct StackBuilder<'a> {
    resolver: &'a dyn LayerResolver,
    layers: Vec<Arc<dyn Layer>>,
    offsets: Vec<TimeOffset>,
    errors: Vec<LayerStackError>,
    seen: HashSet<String>,
}

impl StackBuilder<'_> {
    /// Add `layer` then its sublayers depth-first. `ancestors` holds the
    /// identifiers of the sublayer chain currently being walked.
    fn add_tree(&mut self, layer: Arc<dyn Layer>, offset: TimeOffset, ancestors: &mut Vec<String>) {
        let identifier = layer.identifier().to_string();
        if !self.seen.insert(identifier.clone()) {
            debug!(layer = %identifier, "Layer already in stack; keeping stronger position");
            return;
        }
        self.layers.push(layer.clone());
        self.offsets.push(offset);

        ancestors.push(identifier.clone());
        for entry in layer.sublayers() {
            let sublayer = match self.resolver.open(&entry.asset_path, Some(&identifier)) {
                Ok(sublayer) => sublayer,
                Err(source) => {
                    self.errors.push(LayerStackError::InvalidSublayerPath {
                        layer: identifier.clone(),
                        sublayer: entry.asset_path.clone(),
                        source,
                    });
                    continue;
                }
            };

            if ancestors.iter().any(|a| a == sublayer.identifier()) {
                self.errors.push(LayerStackError::SublayerCycle {
                    layer: identifier.clone(),
                    sublayer: sublayer.identifier().to_string(),
                });
                continue;
            }

            let declared = if entry.offset.is_valid() {
                entry.offset
            } else {
                self.errors.push(LayerStackError::InvalidSublayerOffset {
                    layer: identifier.clone(),
                    sublayer: entry.asset_path.clone(),
                    offset: entry.offset,
                });
                TimeOffset::identity()
            };

            self.add_tree(sublayer, offset.compose(&declared), ancestors);
        }
        ancestors.pop();
    }
}

/// Layer stacks computed once per identity
pub struct LayerStackRegistry {
    resolver: Arc<dyn LayerResolver>,
    stacks: KeyedOnceMap<LayerStackIdentifier, Arc<LayerStack>>,
}

impl LayerStackRegistry {
    pub fn new(resolver: Arc<dyn LayerResolver>) -> Self {
        Self {
            resolver,
            stacks: KeyedOnceMap::new(),
        }
    }

    pub fn resolver(&self) -> &Arc<dyn LayerResolver> {
        &self.resolver
    }

    /// Return the cached stack for `identifier`, computing it on first use
    pub fn get_or_compute(&self, identifier: &LayerStackIdentifier) -> Arc<LayerStack> {
        self.stacks.get_or_compute(identifier, || {
            Arc::new(compute_layer_stack(identifier, self.resolver.as_ref()))
        })
    }

    pub fn find(&self, identifier: &LayerStackIdentifier) -> Option<Arc<LayerStack>> {
        self.stacks.find(identifier)
    }

    pub fn len(&self) -> usize {
        self.stacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn clear(&self) {
        self.stacks.clear();
    }
}
