//! Scene namespace paths
//!
//! A [`ScenePath`] is an absolute path made of prim names, variant selections
//! and (at most one trailing) property name:
//!
//! ```text
//! /World/Chair{standin=render}Geom.points
//! ```
//!
//! Variant selections address opinion storage inside a layer; they are never
//! part of composed namespace, so most composition code works on
//! [`ScenePath::strip_all_variant_selections`] results.

use crate::error::PathError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;

/// One element of a scene path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathElement {
    Prim(String),
    VariantSelection { set: String, selection: String },
    Property(String),
}

/// Absolute scene namespace path; the empty element list is the root `/`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScenePath {
    elements: Vec<PathElement>,
}

impl ScenePath {
    /// The absolute root path `/`
    pub fn absolute_root() -> Self {
        Self {
            elements: Vec::new(),
        }
    }

    /// Parse a path string, normalizing identifiers to NFC
    pub fn parse(input: &str) -> Result<Self, PathError> {
        Parser::new(input).parse()
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn is_absolute_root(&self) -> bool {
        self.elements.is_empty()
    }

    /// True for the root and for paths ending in a prim name
    pub fn is_prim_path(&self) -> bool {
        matches!(self.elements.last(), None | Some(PathElement::Prim(_)))
    }

    /// True for paths ending in a variant selection, e.g. `/A{v=x}`
    pub fn is_prim_variant_selection_path(&self) -> bool {
        matches!(
            self.elements.last(),
            Some(PathElement::VariantSelection { .. })
        )
    }

    /// True for prim paths and variant selection paths
    pub fn is_prim_or_variant_selection_path(&self) -> bool {
        self.is_prim_path() || self.is_prim_variant_selection_path()
    }

    pub fn is_property_path(&self) -> bool {
        matches!(self.elements.last(), Some(PathElement::Property(_)))
    }

    pub fn contains_variant_selection(&self) -> bool {
        self.elements
            .iter()
            .any(|e| matches!(e, PathElement::VariantSelection { .. }))
    }

    /// The trailing variant selection, if this is a variant selection path
    pub fn variant_selection(&self) -> Option<(&str, &str)> {
        match self.elements.last() {
            Some(PathElement::VariantSelection { set, selection }) => {
                Some((set.as_str(), selection.as_str()))
            }
            _ => None,
        }
    }

    /// Remove every variant selection element: `/A{v=x}B` becomes `/A/B`
    pub fn strip_all_variant_selections(&self) -> ScenePath {
        if !self.contains_variant_selection() {
            return self.clone();
        }
        ScenePath {
            elements: self
                .elements
                .iter()
                .filter(|e| !matches!(e, PathElement::VariantSelection { .. }))
                .cloned()
                .collect(),
        }
    }

    /// Name of the last element (the selection for variant selection paths);
    /// empty for the root.
    pub fn name(&self) -> &str {
        match self.elements.last() {
            None => "",
            Some(PathElement::Prim(name)) | Some(PathElement::Property(name)) => name,
            Some(PathElement::VariantSelection { selection, .. }) => selection,
        }
    }

    pub fn parent(&self) -> Option<ScenePath> {
        if self.elements.is_empty() {
            return None;
        }
        Some(ScenePath {
            elements: self.elements[..self.elements.len() - 1].to_vec(),
        })
    }

    /// The owning prim (or variant) path of a property path; other paths
    /// are returned unchanged.
    pub fn prim_path(&self) -> ScenePath {
        if self.is_property_path() {
            self.parent().unwrap_or_else(ScenePath::absolute_root)
        } else {
            self.clone()
        }
    }

    /// Number of prim name elements
    pub fn namespace_depth(&self) -> usize {
        self.elements
            .iter()
            .filter(|e| matches!(e, PathElement::Prim(_)))
            .count()
    }

    /// Append a prim child, validating the name
    pub fn append_child(&self, name: &str) -> Result<ScenePath, PathError> {
        if self.is_property_path() {
            return Err(PathError::InvalidAppend(
                self.clone(),
                format!("child prim '{}'", name),
            ));
        }
        let name = normalize_identifier(name, false)?;
        Ok(self.child(&name))
    }

    /// Append a prim child without validation; the name is expected to come
    /// from a layer that already validated it.
    pub fn child(&self, name: &str) -> ScenePath {
        let mut elements = self.elements.clone();
        elements.push(PathElement::Prim(name.to_string()));
        ScenePath { elements }
    }

    pub fn append_variant_selection(
        &self,
        set: &str,
        selection: &str,
    ) -> Result<ScenePath, PathError> {
        if !self.is_prim_or_variant_selection_path() || self.is_absolute_root() {
            return Err(PathError::InvalidAppend(
                self.clone(),
                format!("variant selection {{{}={}}}", set, selection),
            ));
        }
        let set = normalize_identifier(set, false)?;
        let selection = if selection.is_empty() {
            String::new()
        } else {
            normalize_variant_name(selection)?
        };
        let mut elements = self.elements.clone();
        elements.push(PathElement::VariantSelection { set, selection });
        Ok(ScenePath { elements })
    }

    pub fn append_property(&self, name: &str) -> Result<ScenePath, PathError> {
        if self.is_property_path() || self.is_absolute_root() {
            return Err(PathError::InvalidAppend(
                self.clone(),
                format!("property '{}'", name),
            ));
        }
        let name = normalize_identifier(name, true)?;
        Ok(self.property(&name))
    }

    /// Append a property without validation
    pub fn property(&self, name: &str) -> ScenePath {
        let mut elements = self.elements.clone();
        elements.push(PathElement::Property(name.to_string()));
        ScenePath { elements }
    }

    pub fn has_prefix(&self, prefix: &ScenePath) -> bool {
        self.elements.starts_with(&prefix.elements)
    }

    /// Replace `old` with `new` when `old` is a prefix of this path
    pub fn replace_prefix(&self, old: &ScenePath, new: &ScenePath) -> Option<ScenePath> {
        if !self.has_prefix(old) {
            return None;
        }
        let mut elements = new.elements.clone();
        elements.extend_from_slice(&self.elements[old.elements.len()..]);
        Some(ScenePath { elements })
    }

    /// All non-root prefixes, shortest first, ending with this path
    pub fn prefixes(&self) -> Vec<ScenePath> {
        (1..=self.elements.len())
            .map(|n| ScenePath {
                elements: self.elements[..n].to_vec(),
            })
            .collect()
    }
}

impl fmt::Display for ScenePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elements.is_empty() {
            return f.write_str("/");
        }
        let mut after_variant = false;
        for element in &self.elements {
            match element {
                PathElement::Prim(name) => {
                    if !after_variant {
                        f.write_str("/")?;
                    }
                    f.write_str(name)?;
                    after_variant = false;
                }
                PathElement::VariantSelection { set, selection } => {
                    write!(f, "{{{}={}}}", set, selection)?;
                    after_variant = true;
                }
                PathElement::Property(name) => {
                    write!(f, ".{}", name)?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ScenePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self)
    }
}

impl FromStr for ScenePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScenePath::parse(s)
    }
}

impl TryFrom<String> for ScenePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ScenePath::parse(&value)
    }
}

impl From<ScenePath> for String {
    fn from(path: ScenePath) -> Self {
        path.to_string()
    }
}

/// Validate and NFC-normalize a prim or property identifier.
///
/// Property names may be namespaced with `:`.
pub fn normalize_identifier(name: &str, namespaced: bool) -> Result<String, PathError> {
    let normalized: String = name.nfc().collect();
    let valid_part = |part: &str| {
        let mut chars = part.chars();
        match chars.next() {
            Some(c) if c.is_alphabetic() || c == '_' => {
                chars.all(|c| c.is_alphanumeric() || c == '_')
            }
            _ => false,
        }
    };
    let valid = if namespaced {
        normalized.split(':').all(valid_part)
    } else {
        valid_part(&normalized)
    };
    if valid {
        Ok(normalized)
    } else {
        Err(PathError::InvalidIdentifier(name.to_string()))
    }
}

/// Variant names are more permissive than prim names: they may start with a
/// digit and contain `-` or `|`.
pub fn normalize_variant_name(name: &str) -> Result<String, PathError> {
    let normalized: String = name.nfc().collect();
    let valid = !normalized.is_empty()
        && normalized
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '|'));
    if valid {
        Ok(normalized)
    } else {
        Err(PathError::InvalidIdentifier(name.to_string()))
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn error(&self, reason: impl Into<String>) -> PathError {
        PathError::Parse {
            input: self.input.to_string(),
            reason: reason.into(),
        }
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> &'a str {
        let start = self.chars.peek().map(|(i, _)| *i).unwrap_or(self.input.len());
        let mut end = start;
        while let Some(&(i, c)) = self.chars.peek() {
            if !keep(c) {
                break;
            }
            end = i + c.len_utf8();
            self.chars.next();
        }
        let input = self.input;
        &input[start..end]
    }

    fn prim_name(&mut self) -> Result<PathElement, PathError> {
        let raw = self.take_while(|c| c.is_alphanumeric() || c == '_');
        if raw.is_empty() {
            return Err(self.error("expected a prim name"));
        }
        let name = normalize_identifier(raw, false).map_err(|_| self.error("invalid prim name"))?;
        Ok(PathElement::Prim(name))
    }

    fn parse(mut self) -> Result<ScenePath, PathError> {
        match self.chars.next() {
            Some((_, '/')) => {}
            _ => return Err(self.error("path must be absolute")),
        }
        let mut elements = Vec::new();
        if self.chars.peek().is_none() {
            return Ok(ScenePath { elements });
        }
        elements.push(self.prim_name()?);

        while let Some((_, c)) = self.chars.next() {
            match c {
                '/' => {
                    if matches!(elements.last(), Some(PathElement::VariantSelection { .. })) {
                        return Err(self.error("'/' may not follow a variant selection"));
                    }
                    elements.push(self.prim_name()?);
                }
                '{' => {
                    let set = self.take_while(|c| c != '=' && c != '}').trim().to_string();
                    if !matches!(self.chars.next(), Some((_, '='))) {
                        return Err(self.error("expected '=' in variant selection"));
                    }
                    let selection = self.take_while(|c| c != '}').trim().to_string();
                    if !matches!(self.chars.next(), Some((_, '}'))) {
                        return Err(self.error("unterminated variant selection"));
                    }
                    let set = normalize_identifier(&set, false)
                        .map_err(|_| self.error("invalid variant set name"))?;
                    let selection = if selection.is_empty() {
                        selection
                    } else {
                        normalize_variant_name(&selection)
                            .map_err(|_| self.error("invalid variant name"))?
                    };
                    elements.push(PathElement::VariantSelection { set, selection });
                    // A prim name may directly follow a selection: /A{v=x}B
                    if matches!(self.chars.peek(), Some((_, c)) if c.is_alphabetic() || *c == '_')
                    {
                        elements.push(self.prim_name()?);
                    }
                }
                '.' => {
                    let raw = self.take_while(|c| c.is_alphanumeric() || c == '_' || c == ':');
                    let name = normalize_identifier(raw, true)
                        .map_err(|_| self.error("invalid property name"))?;
                    elements.push(PathElement::Property(name));
                    if self.chars.peek().is_some() {
                        return Err(self.error("unexpected characters after property name"));
                    }
                }
                other => {
                    return Err(self.error(format!("unexpected character '{}'", other)));
                }
            }
        }
        Ok(ScenePath { elements })
    }
}
