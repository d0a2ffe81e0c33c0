//! State snapshots and the pieces that describe changes to them.
//!
//! A [`State`] is never mutated in place: applying a [`Patch`] produces a
//! fresh snapshot plus the [`Changed`] set of keys whose values actually
//! differ. Render passes diff the current snapshot against the last
//! rendered one, so behaviors can skip work for keys that did not move.

use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;

use crate::Value;

/// Key of a state entry. Behaviors name their keys statically.
pub type Key = &'static str;

/// An ordered list of key/value writes. Later writes to the same key win.
#[derive(Clone, Debug, Default)]
pub struct Patch {
    entries: SmallVec<[(Key, Value); 8]>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Patch::set`].
    pub fn with(mut self, key: Key, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: Key, value: impl Into<Value>) {
        self.entries.push((key, value.into()));
    }

    /// Appends all of `other`, so its writes override ours on conflict.
    pub fn merge(&mut self, other: Patch) {
        self.entries.extend(other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key, &Value)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }
}

/// Builds a [`Patch`] from struct-like syntax:
///
/// ```
/// use weft_core::patch;
///
/// let p = patch! { opened: true, selected_index: 2 };
/// assert_eq!(p.len(), 2);
/// ```
#[macro_export]
macro_rules! patch {
    () => { $crate::Patch::new() };
    ($($key:ident : $value:expr),+ $(,)?) => {{
        let mut patch = $crate::Patch::new();
        $( patch.set(stringify!($key), $crate::Value::from($value)); )+
        patch
    }};
}

/// Set of top-level keys that differ between two snapshots. Recreated for
/// every render pass; behaviors read it to skip unchanged aspects.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Changed {
    keys: HashSet<Key>,
}

impl Changed {
    pub fn contains(&self, key: Key) -> bool {
        self.keys.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.keys.iter().copied()
    }

    pub(crate) fn insert(&mut self, key: Key) {
        self.keys.insert(key);
    }

    pub(crate) fn extend(&mut self, other: &Changed) {
        self.keys.extend(other.keys.iter().copied());
    }
}

/// One component's state: a snapshot mapping keys to [`Value`]s.
#[derive(Clone, Default)]
pub struct State {
    entries: HashMap<Key, Value>,
}

impl State {
    pub fn get(&self, key: Key) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: Key) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get_bool(&self, key: Key) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_int(&self, key: Key) -> Option<i64> {
        self.get(key).and_then(Value::as_int)
    }

    pub fn get_float(&self, key: Key) -> Option<f64> {
        self.get(key).and_then(Value::as_float)
    }

    pub fn get_str(&self, key: Key) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_list(&self, key: Key) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_list)
    }

    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies `patch` to a copy of this snapshot. Returns the new snapshot
    /// and the keys whose values actually changed (strict equality, see
    /// [`Value::same`]). Pure: `self` is untouched and the call is safe to
    /// repeat.
    pub fn apply(&self, patch: &Patch) -> (State, Changed) {
        let mut next = self.clone();
        let mut changed = Changed::default();
        for (key, value) in patch.iter() {
            next.entries.insert(key, value.clone());
            // diff against the original, so a later write in the same
            // patch can revert an earlier one back to "unchanged"
            if self.entries.get(key).is_some_and(|old| old.same(value)) {
                changed.keys.remove(key);
            } else {
                changed.insert(key);
            }
        }
        (next, changed)
    }

    /// Shallow diff against an earlier snapshot. `None` means "never
    /// rendered": every key counts as changed.
    pub fn diff(&self, baseline: Option<&State>) -> Changed {
        let mut changed = Changed::default();
        match baseline {
            None => {
                for &key in self.entries.keys() {
                    changed.insert(key);
                }
            }
            Some(base) => {
                for (&key, value) in &self.entries {
                    let same = base.entries.get(key).is_some_and(|old| old.same(value));
                    if !same {
                        changed.insert(key);
                    }
                }
                for &key in base.entries.keys() {
                    if !self.entries.contains_key(key) {
                        changed.insert(key);
                    }
                }
            }
        }
        changed
    }
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by_key(|(k, _)| *k);
        f.debug_map().entries(entries.into_iter()).finish()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for State {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by_key(|(k, _)| *k);
        serializer.collect_map(entries.into_iter())
    }
}
