//! List-editing operations
//!
//! A [`ListOp`] is one layer's opinion about a list: either an explicit
//! replacement, or a set of edits (delete, prepend, append, reorder) applied
//! on top of weaker opinions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ListOp<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit: Option<Vec<T>>,
    #[serde(default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub prepended: Vec<T>,
    #[serde(default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub appended: Vec<T>,
    #[serde(default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub deleted: Vec<T>,
    #[serde(default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub ordered: Vec<T>,
}

impl<T> Default for ListOp<T> {
    fn default() -> Self {
        Self {
            explicit: None,
            prepended: Vec::new(),
            appended: Vec::new(),
            deleted: Vec::new(),
            ordered: Vec::new(),
        }
    }
}

impl<T: Clone + PartialEq> ListOp<T> {
    pub fn explicit(items: Vec<T>) -> Self {
        Self {
            explicit: Some(items),
            ..Self::default()
        }
    }

    pub fn prepended(items: Vec<T>) -> Self {
        Self {
            prepended: items,
            ..Self::default()
        }
    }

    pub fn appended(items: Vec<T>) -> Self {
        Self {
            appended: items,
            ..Self::default()
        }
    }

    pub fn deleted(items: Vec<T>) -> Self {
        Self {
            deleted: items,
            ..Self::default()
        }
    }

    pub fn with_deleted(mut self, items: Vec<T>) -> Self {
        self.deleted = items;
        self
    }

    pub fn with_ordered(mut self, items: Vec<T>) -> Self {
        self.ordered = items;
        self
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit.is_some()
    }

    /// Every item this op adds, in authored order
    pub fn added_items(&self) -> Vec<T> {
        match &self.explicit {
            Some(items) => items.clone(),
            None => self
                .prepended
                .iter()
                .chain(self.appended.iter())
                .cloned()
                .collect(),
        }
    }

    /// Transform every item; items for which `f` returns `None` are dropped
    pub fn filter_map<U: Clone + PartialEq>(&self, mut f: impl FnMut(&T) -> Option<U>) -> ListOp<U> {
        let explicit = self
            .explicit
            .as_ref()
            .map(|items| items.iter().filter_map(&mut f).collect());
        ListOp {
            explicit,
            prepended: self.prepended.iter().filter_map(&mut f).collect(),
            appended: self.appended.iter().filter_map(&mut f).collect(),
            deleted: self.deleted.iter().filter_map(&mut f).collect(),
            ordered: self.ordered.iter().filter_map(&mut f).collect(),
        }
    }

    /// Apply this op on top of `items` (the composed result of weaker opinions)
    pub fn apply(&self, items: &mut Vec<T>) {
        let mut wrapped: Vec<Plain<T>> = items.drain(..).map(Plain).collect();
        self.apply_with_source(&mut wrapped, &mut |_: &T| {}, |item: &T| Plain(item.clone()));
        items.extend(wrapped.into_iter().map(|entry| entry.0));
    }

    /// Apply this op to a list whose entries carry extra data next to the item.
    ///
    /// `on_delete` is called for every item this op deletes (including items
    /// dropped by an explicit replacement); `make` builds entries for items
    /// this op introduces.
    pub fn apply_with_source<E>(
        &self,
        items: &mut Vec<E>,
        on_delete: &mut impl FnMut(&T),
        make: impl Fn(&T) -> E,
    ) where
        E: AsRef<T>,
    {
        if let Some(explicit) = &self.explicit {
            for existing in items.iter() {
                if !explicit.contains(existing.as_ref()) {
                    on_delete(existing.as_ref());
                }
            }
            items.clear();
            for item in explicit {
                if !items.iter().any(|e| e.as_ref() == item) {
                    items.push(make(item));
                }
            }
            return;
        }

        for item in &self.deleted {
            on_delete(item);
            items.retain(|e| e.as_ref() != item);
        }

        if !self.prepended.is_empty() {
            let mut front = Vec::new();
            for item in &self.prepended {
                if front.iter().any(|e: &E| e.as_ref() == item) {
                    continue;
                }
                items.retain(|e| e.as_ref() != item);
                front.push(make(item));
            }
            front.append(items);
            *items = front;
        }

        for item in &self.appended {
            items.retain(|e| e.as_ref() != item);
            items.push(make(item));
        }

        if !self.ordered.is_empty() {
            reorder(items, &self.ordered);
        }
    }
}

/// Reorder `items` so entries named in `order` appear in that order.
///
/// Unnamed entries stay attached to the nearest named entry before them
/// (or lead the list when no named entry precedes them).
pub fn reorder<T: PartialEq, E: AsRef<T>>(items: &mut Vec<E>, order: &[T]) {
    let mut order_unique: Vec<&T> = Vec::new();
    for key in order {
        if !order_unique.contains(&key) {
            order_unique.push(key);
        }
    }

    let mut leading: Vec<E> = Vec::new();
    let mut groups: Vec<(usize, Vec<E>)> = Vec::new();
    for entry in items.drain(..) {
        match order_unique.iter().position(|k| *k == entry.as_ref()) {
            Some(rank) => groups.push((rank, vec![entry])),
            None => match groups.last_mut() {
                Some((_, group)) => group.push(entry),
                None => leading.push(entry),
            },
        }
    }
    groups.sort_by_key(|(rank, _)| *rank);

    items.extend(leading);
    for (_, group) in groups {
        items.extend(group);
    }
}

/// Newtype so plain values can flow through [`ListOp::apply_with_source`]
#[derive(Debug, Clone, PartialEq)]
pub struct Plain<T>(pub T);

impl<T> AsRef<T> for Plain<T> {
    fn as_ref(&self) -> &T {
        &self.0
    }
}
