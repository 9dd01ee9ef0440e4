//! Payload inclusion set

use crate::path::ScenePath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Whether a prim index expanded the payloads it found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadState {
    NoPayload,
    Included,
    Excluded,
}

/// Prim paths whose payloads (and descendants' payloads) are loaded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadSet {
    included: BTreeSet<ScenePath>,
}

impl PayloadSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `include` then remove `exclude`; returns every path whose
    /// membership changed, sorted
    pub fn request(&mut self, include: &[ScenePath], exclude: &[ScenePath]) -> Vec<ScenePath> {
        let before = self.included.clone();
        for path in include {
            self.included.insert(path.strip_all_variant_selections());
        }
        for path in exclude {
            self.included.remove(&path.strip_all_variant_selections());
        }
        before
            .symmetric_difference(&self.included)
            .cloned()
            .collect()
    }

    /// `path` or one of its ancestors was requested
    pub fn includes(&self, path: &ScenePath) -> bool {
        let path = path.strip_all_variant_selections();
        self.included.contains(&path) || path.prefixes().iter().any(|p| self.included.contains(p))
    }

    pub fn paths(&self) -> Vec<ScenePath> {
        self.included.iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.included.is_empty()
    }
}
