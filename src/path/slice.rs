/*!
# Slices

The multi-root variant of [`PathSystem`](crate::path::PathSystem): a slice
is rooted at a *set* of slicing-criterion elements, and every (element,
state) key maps to a *list* of entries, because backward analyses must keep
every distinct derivation of a visit, not just the best one.

Where a path system freezes once via `finish()`, a slice tracks a dirty
flag: mutation marks the structure dirty, and the deferred parent repair
([`Slice::resolve`]) is idempotently re-run before every query. The slice is
single-threaded by design, so the lazy repair uses plain interior
mutability.
*/
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

use crate::graph::{Element, Incidence};
use crate::path::{ParentLink, PathSystemEntry, PathSystemError, PathSystemKey};

/// Multi-root, multi-parent traversal history.
#[derive(Debug, Default)]
pub struct Slice {
    criteria: Vec<Element>,
    inner: RefCell<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    key_to_entries: HashMap<PathSystemKey, Vec<PathSystemEntry>>,
    pending: Vec<(PathSystemKey, PathSystemEntry)>,
    dirty: bool,
}

impl Slice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares one element of the slicing criterion, visited in
    /// `state_number` at distance zero. Criteria are independent roots; the
    /// same element may be declared once per automaton state.
    pub fn add_slicing_criterion_element(
        &mut self,
        element: Element,
        state_number: usize,
        state_is_final: bool,
    ) {
        if !self.criteria.contains(&element) {
            self.criteria.push(element);
        }
        let inner = self.inner.get_mut();
        inner.push_entry(
            PathSystemKey {
                element,
                state_number,
            },
            PathSystemEntry {
                parent: None,
                distance_to_root: 0,
                state_is_final,
            },
        );
        inner.dirty = true;
    }

    /// Records one derivation of `key`. Unlike a path system, an existing
    /// entry is never replaced: every distinct parent link is kept.
    /// Duplicate links are dropped, visits whose parent key is unknown are
    /// queued for [`Slice::resolve`], and a parentless visit of a
    /// non-criterion element is rejected as detached.
    pub fn add_element(
        &mut self,
        key: PathSystemKey,
        parent: Option<ParentLink>,
        distance: usize,
        state_is_final: bool,
    ) -> Result<bool, PathSystemError> {
        if parent.is_none() && !self.criteria.contains(&key.element) {
            return Err(PathSystemError::Detached(key));
        }
        let inner = self.inner.get_mut();
        let parent_missing = parent
            .as_ref()
            .is_some_and(|link| !inner.key_to_entries.contains_key(&link.key()));
        let entry = PathSystemEntry {
            parent,
            distance_to_root: distance,
            state_is_final,
        };
        let stored = if parent_missing {
            inner.pending.push((key, entry));
            false
        } else {
            inner.push_entry(key, entry)
        };
        inner.dirty = true;
        Ok(stored)
    }

    /// Drains the deferred-parent worklist to a fixed point and clears the
    /// dirty flag. Queries run this automatically; calling it again on a
    /// clean slice is a no-op.
    pub fn resolve(&self) -> Result<(), PathSystemError> {
        let mut inner = self.inner.borrow_mut();
        if !inner.dirty {
            return Ok(());
        }
        let mut pending = std::mem::take(&mut inner.pending);
        while !pending.is_empty() {
            let before = pending.len();
            let mut unresolved = Vec::new();
            for (key, mut entry) in pending {
                let resolved = entry.parent.as_ref().and_then(|link| {
                    let parents = inner.key_to_entries.get(&link.key())?;
                    let closest = parents.iter().map(|p| p.distance_to_root).min()?;
                    Some(closest + usize::from(link.incidence.is_some()))
                });
                match resolved {
                    Some(distance) => {
                        entry.distance_to_root = distance;
                        inner.push_entry(key, entry);
                    }
                    None => unresolved.push((key, entry)),
                }
            }
            if unresolved.len() == before {
                let key = unresolved[0]
                    .1
                    .parent
                    .as_ref()
                    .map_or(unresolved[0].0, ParentLink::key);
                inner.pending = unresolved;
                return Err(PathSystemError::UnresolvedParent(key));
            }
            pending = unresolved;
        }
        inner.dirty = false;
        Ok(())
    }

    /// The declared criterion elements, in declaration order.
    #[must_use]
    pub fn criterion_elements(&self) -> &[Element] {
        &self.criteria
    }

    /// Whether `element` was visited at all.
    pub fn contains(&self, element: Element) -> Result<bool, PathSystemError> {
        self.resolve()?;
        Ok(self
            .inner
            .borrow()
            .key_to_entries
            .keys()
            .any(|key| key.element == element))
    }

    /// All elements recorded as a parent of `element`, across every state
    /// and every derivation.
    pub fn parents(&self, element: Element) -> Result<BTreeSet<Element>, PathSystemError> {
        self.resolve()?;
        let inner = self.inner.borrow();
        Ok(inner
            .key_to_entries
            .iter()
            .filter(|(key, _)| key.element == element)
            .flat_map(|(_, entries)| entries.iter())
            .filter_map(|entry| entry.parent.as_ref())
            .filter(|link| link.incidence.is_some())
            .map(|link| link.element)
            .collect())
    }

    /// All elements recorded with `element` as a parent.
    pub fn children(&self, element: Element) -> Result<BTreeSet<Element>, PathSystemError> {
        self.resolve()?;
        let inner = self.inner.borrow();
        Ok(inner
            .key_to_entries
            .iter()
            .filter(|(_, entries)| {
                entries.iter().any(|entry| {
                    entry
                        .parent
                        .as_ref()
                        .is_some_and(|link| link.incidence.is_some() && link.element == element)
                })
            })
            .map(|(key, _)| key.element)
            .collect())
    }

    /// Elements visited in a final automaton state.
    pub fn leaves(&self) -> Result<BTreeSet<Element>, PathSystemError> {
        self.resolve()?;
        let inner = self.inner.borrow();
        Ok(inner
            .key_to_entries
            .iter()
            .filter(|(_, entries)| entries.iter().any(|entry| entry.state_is_final))
            .map(|(key, _)| key.element)
            .collect())
    }

    /// The incidences of the slice attached to `element`, ordered by id.
    pub fn edges_connected(&self, element: Element) -> Result<BTreeSet<Incidence>, PathSystemError> {
        self.resolve()?;
        let inner = self.inner.borrow();
        Ok(inner
            .key_to_entries
            .iter()
            .flat_map(|(key, entries)| entries.iter().map(move |entry| (key, entry)))
            .filter_map(|(key, entry)| {
                let link = entry.parent.as_ref()?;
                let incidence = link.incidence.as_ref()?;
                (key.element == element || link.element == element).then(|| incidence.clone())
            })
            .collect())
    }

    /// Total number of recorded derivations.
    pub fn weight(&self) -> Result<usize, PathSystemError> {
        self.resolve()?;
        Ok(self
            .inner
            .borrow()
            .key_to_entries
            .values()
            .map(Vec::len)
            .sum())
    }

    /// The smallest recorded distance of `element`, or `None` when unknown.
    pub fn distance(&self, element: Element) -> Result<Option<usize>, PathSystemError> {
        self.resolve()?;
        let inner = self.inner.borrow();
        Ok(inner
            .key_to_entries
            .iter()
            .filter(|(key, _)| key.element == element)
            .flat_map(|(_, entries)| entries.iter())
            .map(|entry| entry.distance_to_root)
            .min())
    }
}

impl Inner {
    /// Appends an entry unless the same derivation (same parent link) is
    /// already recorded for the key; returns whether it was stored.
    fn push_entry(&mut self, key: PathSystemKey, entry: PathSystemEntry) -> bool {
        let entries = self.key_to_entries.entry(key).or_default();
        if entries.iter().any(|existing| existing.parent == entry.parent) {
            return false;
        }
        entries.push(entry);
        true
    }
}
