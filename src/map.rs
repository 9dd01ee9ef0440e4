//! Namespace and time mapping between composition nodes
//!
//! A [`MapFunction`] translates paths and times from a node's local
//! namespace ("source") into its parent's namespace ("target"). Map functions
//! are immutable values; composing two of them yields a third.

use crate::path::ScenePath;
use serde::{Deserialize, Serialize};
use std::fmt;

const TIME_EPSILON: f64 = 1e-9;

/// Affine time transform `t' = t * scale + offset`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeOffset {
    pub offset: f64,
    pub scale: f64,
}

impl Default for TimeOffset {
    fn default() -> Self {
        Self::identity()
    }
}

impl TimeOffset {
    pub fn new(offset: f64, scale: f64) -> Self {
        Self { offset, scale }
    }

    pub fn identity() -> Self {
        Self {
            offset: 0.0,
            scale: 1.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.offset.abs() < TIME_EPSILON && (self.scale - 1.0).abs() < TIME_EPSILON
    }

    /// Finite offset and a finite, strictly positive scale
    pub fn is_valid(&self) -> bool {
        self.offset.is_finite() && self.scale.is_finite() && self.scale > 0.0
    }

    /// `self ∘ inner`: apply `inner` first, then `self`
    pub fn compose(&self, inner: &TimeOffset) -> TimeOffset {
        TimeOffset {
            offset: self.scale * inner.offset + self.offset,
            scale: self.scale * inner.scale,
        }
    }

    pub fn apply(&self, time: f64) -> f64 {
        time * self.scale + self.offset
    }

    pub fn inverse(&self) -> TimeOffset {
        TimeOffset {
            offset: -self.offset / self.scale,
            scale: 1.0 / self.scale,
        }
    }
}

impl fmt::Display for TimeOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(offset={:.2}, scale={:.2})", self.offset, self.scale)
    }
}

/// Namespace prefix pairs plus a time offset.
///
/// Paths are mapped through the pair with the longest matching source
/// prefix. A mapping is rejected when its result falls under a longer target
/// prefix owned by another pair, which keeps the function one-to-one.
#[derive(Clone, PartialEq)]
pub struct MapFunction {
    pairs: Vec<(ScenePath, ScenePath)>,
    time_offset: TimeOffset,
}

impl MapFunction {
    /// Build a map function from (source, target) prefix pairs.
    ///
    /// Variant selections are stripped from both sides, duplicates and
    /// pairs implied by shorter ones are dropped.
    pub fn new(
        pairs: impl IntoIterator<Item = (ScenePath, ScenePath)>,
        time_offset: TimeOffset,
    ) -> Self {
        let mut pairs: Vec<(ScenePath, ScenePath)> = pairs
            .into_iter()
            .map(|(s, t)| {
                (
                    s.strip_all_variant_selections(),
                    t.strip_all_variant_selections(),
                )
            })
            .collect();
        pairs.sort();
        pairs.dedup_by(|a, b| a.0 == b.0);

        let mut map = Self { pairs, time_offset };
        map.drop_redundant_pairs();
        map
    }

    pub fn identity() -> Self {
        Self {
            pairs: vec![(ScenePath::absolute_root(), ScenePath::absolute_root())],
            time_offset: TimeOffset::identity(),
        }
    }

    /// Identity namespace mapping with a time offset
    pub fn identity_with_offset(time_offset: TimeOffset) -> Self {
        Self {
            time_offset,
            ..Self::identity()
        }
    }

    pub fn is_identity(&self) -> bool {
        self.has_root_identity() && self.pairs.len() == 1 && self.time_offset.is_identity()
    }

    pub fn has_root_identity(&self) -> bool {
        let root = ScenePath::absolute_root();
        self.pairs.iter().any(|(s, t)| *s == root && *t == root)
    }

    pub fn pairs(&self) -> &[(ScenePath, ScenePath)] {
        &self.pairs
    }

    pub fn time_offset(&self) -> TimeOffset {
        self.time_offset
    }

    /// Map a path from this function's source namespace to its target
    pub fn map_source_to_target(&self, path: &ScenePath) -> Option<ScenePath> {
        Self::map_through(&self.pairs, path, false)
    }

    /// Map a path from this function's target namespace back to its source
    pub fn map_target_to_source(&self, path: &ScenePath) -> Option<ScenePath> {
        Self::map_through(&self.pairs, path, true)
    }

    /// `self ∘ inner`: map through `inner` first, then through `self`
    pub fn compose(&self, inner: &MapFunction) -> MapFunction {
        if inner.is_identity() {
            return self.clone();
        }
        if self.is_identity() {
            return inner.clone();
        }
        let mut pairs = Vec::new();
        for (source, target) in &inner.pairs {
            if let Some(mapped) = self.map_source_to_target(target) {
                pairs.push((source.clone(), mapped));
            }
        }
        for (source, target) in &self.pairs {
            if let Some(mapped) = inner.map_target_to_source(source) {
                pairs.push((mapped, target.clone()));
            }
        }
        MapFunction::new(pairs, self.time_offset.compose(&inner.time_offset))
    }

    fn map_through(
        pairs: &[(ScenePath, ScenePath)],
        path: &ScenePath,
        inverse: bool,
    ) -> Option<ScenePath> {
        let path = path.strip_all_variant_selections();
        let side = |pair: &(ScenePath, ScenePath)| -> (ScenePath, ScenePath) {
            if inverse {
                (pair.1.clone(), pair.0.clone())
            } else {
                pair.clone()
            }
        };

        let (from, to) = pairs
            .iter()
            .map(side)
            .filter(|(from, _)| path.has_prefix(from))
            .max_by_key(|(from, _)| from.elements().len())?;
        let result = path.replace_prefix(&from, &to)?;

        let blocked = pairs.iter().map(side).any(|(_, other_to)| {
            other_to.elements().len() > to.elements().len() && result.has_prefix(&other_to)
        });
        if blocked {
            None
        } else {
            Some(result)
        }
    }

    fn drop_redundant_pairs(&mut self) {
        let mut i = self.pairs.len();
        while i > 0 {
            i -= 1;
            if self.pairs.len() == 1 {
                break;
            }
            let candidate = self.pairs[i].clone();
            let rest: Vec<_> = self
                .pairs
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, p)| p.clone())
                .collect();
            let forward = Self::map_through(&rest, &candidate.0, false);
            let backward = Self::map_through(&rest, &candidate.1, true);
            if forward.as_ref() == Some(&candidate.1) && backward.as_ref() == Some(&candidate.0) {
                self.pairs.remove(i);
            }
        }
    }
}

impl fmt::Debug for MapFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for MapFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identity() {
            return f.write_str("Identity");
        }
        f.write_str("{")?;
        for (i, (source, target)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} -> {}", source, target)?;
        }
        f.write_str("}")?;
        if !self.time_offset.is_identity() {
            write!(f, " {}", self.time_offset)?;
        }
        Ok(())
    }
}
