/*!
# Path Systems

The single-root traversal history: while the automaton walks the graph,
every (element, state) visit is recorded together with how it was reached,
and the store keeps the best entry per key — the shortest distance, with
finality breaking ties. A path system is a two-phase structure: an open
phase accumulating entries (orphans whose parent is not yet known are
queued), then [`PathSystem::finish`] resolves the queue to a fixed point and
freezes the store. All queries require the frozen state; element lookups
that miss simply yield empty results.
*/
use std::collections::HashMap;
use std::collections::hash_map::Entry as MapEntry;

use crate::graph::{Element, Incidence};
use crate::path::{HyperPath, ParentLink, PathSystemEntry, PathSystemError, PathSystemKey};

/// Single-root store of traversal history, queryable once finished.
#[derive(Debug, Default)]
pub struct PathSystem {
    root: Option<Element>,
    key_to_entry: HashMap<PathSystemKey, PathSystemEntry>,
    pending: Vec<(PathSystemKey, PathSystemEntry)>,
    element_to_first_key: HashMap<Element, PathSystemKey>,
    leaf_keys: Vec<PathSystemKey>,
    leaf_element_to_leaf_key: HashMap<Element, PathSystemKey>,
    finished: bool,
}

impl PathSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares the unique root element, visited in `state_number` at
    /// distance zero.
    pub fn set_root_element(
        &mut self,
        element: Element,
        state_number: usize,
        state_is_final: bool,
    ) -> Result<(), PathSystemError> {
        if self.finished {
            return Err(PathSystemError::Finished);
        }
        if self.root.is_some() {
            return Err(PathSystemError::RootAlreadySet);
        }
        self.root = Some(element);
        self.insert(
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
        Ok(())
    }

    /// Records a visit of `key` reached through `parent`.
    ///
    /// Replacement rule: an existing entry for the key is replaced iff the
    /// new distance is strictly smaller, or equal while upgrading a
    /// non-final entry to a final one. Returns whether the entry was
    /// stored. A visit whose parent key is not recorded yet is queued and
    /// patched during [`PathSystem::finish`]; a parentless visit of
    /// anything but the root element is rejected as detached.
    pub fn add_element(
        &mut self,
        key: PathSystemKey,
        parent: Option<ParentLink>,
        distance: usize,
        state_is_final: bool,
    ) -> Result<bool, PathSystemError> {
        if self.finished {
            return Err(PathSystemError::Finished);
        }
        let parent_missing = match parent.as_ref() {
            None => {
                if self.root != Some(key.element) {
                    return Err(PathSystemError::Detached(key));
                }
                false
            }
            Some(link) => !self.key_to_entry.contains_key(&link.key()),
        };
        let entry = PathSystemEntry {
            parent,
            distance_to_root: distance,
            state_is_final,
        };
        if parent_missing {
            self.pending.push((key, entry));
            return Ok(false);
        }
        Ok(self.insert(key, entry))
    }

    /// Resolves all queued orphans transitively and freezes the store.
    ///
    /// An orphan's distance is recomputed from its resolved parent (plus
    /// one per consumed incidence) — a caller inserting ahead of the parent
    /// cannot have known the true distance. Orphans whose parent never
    /// materializes make the whole evaluation fail.
    pub fn finish(&mut self) -> Result<(), PathSystemError> {
        if self.finished {
            return Err(PathSystemError::Finished);
        }
        let mut pending = std::mem::take(&mut self.pending);
        while !pending.is_empty() {
            let before = pending.len();
            let mut unresolved = Vec::new();
            for (key, mut entry) in pending {
                let resolved = entry.parent.as_ref().and_then(|link| {
                    self.key_to_entry
                        .get(&link.key())
                        .map(|p| (p.distance_to_root, link.incidence.is_some()))
                });
                match resolved {
                    Some((parent_distance, consumed)) => {
                        entry.distance_to_root = parent_distance + usize::from(consumed);
                        self.insert(key, entry);
                    }
                    None => unresolved.push((key, entry)),
                }
            }
            if unresolved.len() == before {
                // No progress; report the first dangling parent key.
                let key = unresolved[0]
                    .1
                    .parent
                    .as_ref()
                    .map_or(unresolved[0].0, ParentLink::key);
                self.pending = unresolved;
                return Err(PathSystemError::UnresolvedParent(key));
            }
            pending = unresolved;
        }

        let mut leaf_keys: Vec<PathSystemKey> = self
            .key_to_entry
            .iter()
            .filter(|(_, entry)| entry.state_is_final)
            .map(|(key, _)| *key)
            .collect();
        leaf_keys.sort_unstable();
        for &key in &leaf_keys {
            self.leaf_element_to_leaf_key
                .entry(key.element)
                .or_insert(key);
        }
        self.leaf_keys = leaf_keys;
        self.finished = true;
        Ok(())
    }

    /// The declared root element, if any.
    #[must_use]
    pub const fn root_element(&self) -> Option<Element> {
        self.root
    }

    /// Raw entry lookup by key; available in both phases.
    #[must_use]
    pub fn entry(&self, key: PathSystemKey) -> Option<&PathSystemEntry> {
        self.key_to_entry.get(&key)
    }

    /// Elements reached directly from `element` in the history tree.
    pub fn children(&self, element: Element) -> Result<Vec<Element>, PathSystemError> {
        self.ensure_finished()?;
        let mut out: Vec<Element> = self
            .key_to_entry
            .iter()
            .filter(|(_, entry)| {
                entry
                    .parent
                    .as_ref()
                    .is_some_and(|link| link.element == element)
            })
            .map(|(key, _)| key.element)
            .collect();
        out.sort_unstable();
        out.dedup();
        Ok(out)
    }

    /// The parent element of `element` (via its first recorded key), or
    /// `None` for the root and for unknown elements.
    pub fn parent(&self, element: Element) -> Result<Option<Element>, PathSystemError> {
        self.ensure_finished()?;
        Ok(self
            .element_to_first_key
            .get(&element)
            .and_then(|key| self.key_to_entry.get(key))
            .and_then(|entry| entry.parent.as_ref())
            .map(|link| link.element))
    }

    /// Elements sharing `element`'s parent, excluding `element` itself.
    pub fn siblings(&self, element: Element) -> Result<Vec<Element>, PathSystemError> {
        let Some(parent) = self.parent(element)? else {
            return Ok(Vec::new());
        };
        let mut out = self.children(parent)?;
        out.retain(|&e| e != element);
        Ok(out)
    }

    /// Number of distinct incidences of the history tree attached to
    /// `element`.
    pub fn degree(&self, element: Element) -> Result<usize, PathSystemError> {
        Ok(self.edges_connected(element)?.len())
    }

    /// The incidences of the history tree attached to `element`, ordered by
    /// id.
    pub fn edges_connected(&self, element: Element) -> Result<Vec<Incidence>, PathSystemError> {
        self.ensure_finished()?;
        let mut out: Vec<Incidence> = self
            .key_to_entry
            .iter()
            .filter_map(|(key, entry)| {
                let link = entry.parent.as_ref()?;
                let incidence = link.incidence.as_ref()?;
                (key.element == element || link.element == element).then(|| incidence.clone())
            })
            .collect();
        out.sort_unstable_by_key(|inc| inc.id);
        out.dedup_by_key(|inc| inc.id);
        Ok(out)
    }

    /// Elements visited in a final automaton state.
    pub fn leaves(&self) -> Result<Vec<Element>, PathSystemError> {
        self.ensure_finished()?;
        let mut out: Vec<Element> = self.leaf_keys.iter().map(|key| key.element).collect();
        out.dedup();
        Ok(out)
    }

    /// The root-to-leaf path ending at `element`, or `None` when `element`
    /// is not a leaf.
    pub fn extract_path(&self, element: Element) -> Result<Option<HyperPath>, PathSystemError> {
        self.ensure_finished()?;
        match self.leaf_element_to_leaf_key.get(&element) {
            Some(&key) => self.extract_path_from_key(key),
            None => Ok(None),
        }
    }

    /// The root-to-target path ending at `key`, built by walking parent
    /// links back to the root and reversing.
    pub fn extract_path_from_key(
        &self,
        key: PathSystemKey,
    ) -> Result<Option<HyperPath>, PathSystemError> {
        self.ensure_finished()?;
        let Some(mut entry) = self.key_to_entry.get(&key) else {
            return Ok(None);
        };
        let mut rev_elements = vec![key.element];
        let mut rev_incidences: Vec<Incidence> = Vec::new();
        let mut at = key.element;
        while let Some(link) = &entry.parent {
            if rev_incidences.len() > self.key_to_entry.len() {
                return Err(PathSystemError::InvalidParentChain(key));
            }
            match &link.incidence {
                Some(incidence) => {
                    rev_incidences.push(incidence.clone());
                    rev_elements.push(link.element);
                    at = link.element;
                }
                None => {
                    if link.element != at {
                        return Err(PathSystemError::InvalidParentChain(key));
                    }
                }
            }
            entry = self
                .key_to_entry
                .get(&link.key())
                .ok_or(PathSystemError::UnresolvedParent(link.key()))?;
        }
        rev_elements.reverse();
        rev_incidences.reverse();
        let path = HyperPath::from_parts(rev_elements, rev_incidences)
            .map_err(|_| PathSystemError::InvalidParentChain(key))?;
        Ok(Some(path))
    }

    /// One path per leaf key, in key order.
    pub fn extract_paths(&self) -> Result<Vec<HyperPath>, PathSystemError> {
        self.ensure_finished()?;
        let mut out = Vec::with_capacity(self.leaf_keys.len());
        for &key in &self.leaf_keys {
            if let Some(path) = self.extract_path_from_key(key)? {
                out.push(path);
            }
        }
        Ok(out)
    }

    /// Leaf paths of exactly `length` incidences.
    pub fn extract_paths_with_length(
        &self,
        length: usize,
    ) -> Result<Vec<HyperPath>, PathSystemError> {
        let mut out = self.extract_paths()?;
        out.retain(|path| path.length() == length);
        Ok(out)
    }

    /// Number of recorded entries.
    pub fn weight(&self) -> Result<usize, PathSystemError> {
        self.ensure_finished()?;
        Ok(self.key_to_entry.len())
    }

    /// The largest distance of any entry.
    pub fn depth(&self) -> Result<usize, PathSystemError> {
        self.ensure_finished()?;
        Ok(self
            .key_to_entry
            .values()
            .map(|entry| entry.distance_to_root)
            .max()
            .unwrap_or(0))
    }

    /// Distance of `element`'s first recorded key, or `None` when unknown.
    pub fn distance(&self, element: Element) -> Result<Option<usize>, PathSystemError> {
        self.ensure_finished()?;
        Ok(self
            .element_to_first_key
            .get(&element)
            .and_then(|key| self.key_to_entry.get(key))
            .map(|entry| entry.distance_to_root))
    }

    /// The smallest leaf distance, or `None` without leaves.
    pub fn min_path_length(&self) -> Result<Option<usize>, PathSystemError> {
        self.leaf_distances(Iterator::min)
    }

    /// The largest leaf distance, or `None` without leaves.
    pub fn max_path_length(&self) -> Result<Option<usize>, PathSystemError> {
        self.leaf_distances(Iterator::max)
    }

    /// Whether the two elements are parent and child (either way) in the
    /// history tree.
    pub fn is_neighbour(&self, a: Element, b: Element) -> Result<bool, PathSystemError> {
        self.ensure_finished()?;
        Ok(self.key_to_entry.iter().any(|(key, entry)| {
            entry.parent.as_ref().is_some_and(|link| {
                (key.element == a && link.element == b) || (key.element == b && link.element == a)
            })
        }))
    }

    /// Whether the two distinct elements share a parent element.
    pub fn is_sibling(&self, a: Element, b: Element) -> Result<bool, PathSystemError> {
        if a == b {
            return self.ensure_finished().map(|()| false);
        }
        let parents_of = |element: Element| -> Vec<Element> {
            self.key_to_entry
                .iter()
                .filter(|(key, _)| key.element == element)
                .filter_map(|(_, entry)| entry.parent.as_ref().map(|link| link.element))
                .collect()
        };
        self.ensure_finished()?;
        let of_a = parents_of(a);
        Ok(parents_of(b).iter().any(|p| of_a.contains(p)))
    }

    /// Whether `element` was visited at all.
    pub fn contains(&self, element: Element) -> Result<bool, PathSystemError> {
        self.ensure_finished()?;
        Ok(self.element_to_first_key.contains_key(&element))
    }

    fn leaf_distances<F>(&self, pick: F) -> Result<Option<usize>, PathSystemError>
    where
        F: FnOnce(std::vec::IntoIter<usize>) -> Option<usize>,
    {
        self.ensure_finished()?;
        let distances: Vec<usize> = self
            .leaf_keys
            .iter()
            .filter_map(|key| self.key_to_entry.get(key))
            .map(|entry| entry.distance_to_root)
            .collect();
        Ok(pick(distances.into_iter()))
    }

    const fn ensure_finished(&self) -> Result<(), PathSystemError> {
        if self.finished {
            Ok(())
        } else {
            Err(PathSystemError::Unfinished)
        }
    }

    /// Insert under the replacement rule; returns whether the entry was
    /// stored.
    fn insert(&mut self, key: PathSystemKey, entry: PathSystemEntry) -> bool {
        match self.key_to_entry.entry(key) {
            MapEntry::Vacant(slot) => {
                slot.insert(entry);
                self.element_to_first_key.entry(key.element).or_insert(key);
                true
            }
            MapEntry::Occupied(mut slot) => {
                let current = slot.get();
                let better = entry.distance_to_root < current.distance_to_root
                    || (entry.distance_to_root == current.distance_to_root
                        && entry.state_is_final
                        && !current.state_is_final);
                if better {
                    slot.insert(entry);
                }
                better
            }
        }
    }
}
