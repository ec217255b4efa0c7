//! Insertion-ordered hash map backing Map and Set.
//!
//! Entries live in a vector in insertion order. Deleting an entry leaves a
//! tombstone so that positions held by live cursors stay meaningful; once
//! tombstones outnumber live entries (and exceed the compaction threshold) the
//! vector is compacted and every live cursor is remapped to the same logical
//! position. A cursor therefore never revisits an entry, skips entries deleted
//! before it reaches them, and sees entries appended while it is running.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use num_bigint::BigInt;
use rustc_hash::FxHashMap;

use crate::types::{JsString, JsValue};

/// Default number of tombstones tolerated before compaction is considered.
pub const DEFAULT_COMPACTION_THRESHOLD: usize = 32;

/// Key identity for Map and Set (SameValueZero).
///
/// Integral numbers collapse to `Int` so `-0`, `0` and `0.0` are one key;
/// strings compare by their flattened code units.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CanonicalKey {
    Undefined,
    Null,
    Boolean(bool),
    Int(i64),
    Float(u64),
    NaN,
    String(JsString),
    Symbol(u64),
    BigInt(BigInt),
    Object(u64),
}

const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Returns the lookup key for `value` and the value as it should be stored
/// (`-0` is stored as `+0`, ropes are flattened).
pub fn canonicalize(value: &JsValue) -> (CanonicalKey, JsValue) {
    match value {
        JsValue::Undefined => (CanonicalKey::Undefined, JsValue::Undefined),
        JsValue::Null => (CanonicalKey::Null, JsValue::Null),
        JsValue::Boolean(b) => (CanonicalKey::Boolean(*b), value.clone()),
        JsValue::Number(n) => {
            if n.is_nan() {
                (CanonicalKey::NaN, value.clone())
            } else if n.fract() == 0.0 && n.abs() <= MAX_EXACT_INT {
                let normalized = if *n == 0.0 { 0.0 } else { *n };
                (CanonicalKey::Int(*n as i64), JsValue::Number(normalized))
            } else {
                (CanonicalKey::Float(n.to_bits()), value.clone())
            }
        }
        JsValue::String(s) => {
            let flat = s.flatten();
            (CanonicalKey::String(flat.clone()), JsValue::String(flat))
        }
        JsValue::Symbol(sym) => (CanonicalKey::Symbol(sym.id), value.clone()),
        JsValue::BigInt(b) => (CanonicalKey::BigInt(b.value.clone()), value.clone()),
        JsValue::Object(o) => (CanonicalKey::Object(o.id), value.clone()),
    }
}

#[derive(Debug, Clone)]
struct Entry {
    canonical: CanonicalKey,
    key: JsValue,
    value: JsValue,
}

/// A position in a [`LinkedMap`]. Cursors stay valid across insertions,
/// deletions, compaction and `clear`.
#[derive(Debug, Clone)]
pub struct Cursor(Rc<Cell<usize>>);

impl Cursor {
    pub fn position(&self) -> usize {
        self.0.get()
    }
}

#[derive(Debug)]
pub struct LinkedMap {
    entries: Vec<Option<Entry>>,
    index: FxHashMap<CanonicalKey, usize>,
    live: usize,
    cursors: Vec<Weak<Cell<usize>>>,
    compaction_threshold: usize,
}

impl Default for LinkedMap {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkedMap {
    pub fn new() -> Self {
        Self::with_compaction_threshold(DEFAULT_COMPACTION_THRESHOLD)
    }

    pub fn with_compaction_threshold(threshold: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: FxHashMap::default(),
            live: 0,
            cursors: Vec::new(),
            compaction_threshold: threshold,
        }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn get(&self, key: &JsValue) -> Option<JsValue> {
        let (canonical, _) = canonicalize(key);
        let &slot = self.index.get(&canonical)?;
        self.entries[slot].as_ref().map(|e| e.value.clone())
    }

    pub fn has(&self, key: &JsValue) -> bool {
        self.index.contains_key(&canonicalize(key).0)
    }

    /// Inserts or updates. An update keeps the entry's original position.
    pub fn set(&mut self, key: JsValue, value: JsValue) {
        let (canonical, key) = canonicalize(&key);
        if let Some(&slot) = self.index.get(&canonical)
            && let Some(entry) = self.entries[slot].as_mut()
        {
            entry.value = value;
            return;
        }
        self.index.insert(canonical.clone(), self.entries.len());
        self.entries.push(Some(Entry {
            canonical,
            key,
            value,
        }));
        self.live += 1;
    }

    pub fn delete(&mut self, key: &JsValue) -> bool {
        let (canonical, _) = canonicalize(key);
        let Some(slot) = self.index.remove(&canonical) else {
            return false;
        };
        self.entries[slot] = None;
        self.live -= 1;
        self.maybe_compact();
        true
    }

    /// Removes every entry. Live cursors continue from the (now empty) start
    /// and will see entries added afterwards.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.live = 0;
        self.cursors.retain(|c| match c.upgrade() {
            Some(cell) => {
                cell.set(0);
                true
            }
            None => false,
        });
    }

    fn maybe_compact(&mut self) {
        let tombstones = self.entries.len() - self.live;
        if tombstones < self.compaction_threshold || tombstones <= self.live {
            return;
        }
        // new_position[i] = number of live entries before old slot i.
        let mut new_position = Vec::with_capacity(self.entries.len() + 1);
        let mut seen = 0;
        for entry in &self.entries {
            new_position.push(seen);
            if entry.is_some() {
                seen += 1;
            }
        }
        new_position.push(seen);
        self.cursors.retain(|c| match c.upgrade() {
            Some(cell) => {
                let old = cell.get().min(new_position.len() - 1);
                cell.set(new_position[old]);
                true
            }
            None => false,
        });
        self.entries.retain(Option::is_some);
        self.index = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (e.canonical.clone(), i)))
            .collect();
    }

    /// A cursor positioned before the first entry.
    pub fn cursor(&mut self) -> Cursor {
        self.cursors.retain(|c| c.strong_count() > 0);
        let cell = Rc::new(Cell::new(0));
        self.cursors.push(Rc::downgrade(&cell));
        Cursor(cell)
    }

    /// Advances `cursor` past the next live entry and returns its key and
    /// value, or `None` once the end is reached.
    pub fn next_entry(&self, cursor: &Cursor) -> Option<(JsValue, JsValue)> {
        let mut pos = cursor.0.get();
        while pos < self.entries.len() {
            let entry = &self.entries[pos];
            pos += 1;
            if let Some(entry) = entry {
                cursor.0.set(pos);
                return Some((entry.key.clone(), entry.value.clone()));
            }
        }
        cursor.0.set(pos);
        None
    }

    /// Snapshot of the live entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&JsValue, &JsValue)> {
        self.entries
            .iter()
            .flatten()
            .map(|e| (&e.key, &e.value))
    }

    /// Drops entries for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(&JsValue, &JsValue) -> bool) {
        let doomed: Vec<JsValue> = self
            .iter()
            .filter(|&(k, v)| !keep(k, v))
            .map(|(k, _)| k.clone())
            .collect();
        for key in doomed {
            self.delete(&key);
        }
    }
}
