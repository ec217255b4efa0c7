//! Backing stores for integer-indexed elements.
//!
//! Elements live in the narrowest representation that can hold them:
//!
//! ```text
//! Empty -> Int -> Double -> Object -> Sparse
//! ```
//!
//! Transitions only move right. `Int` and `Double` are packed (no holes inside
//! the vector); a hole in the middle forces `Object`, which marks holes with
//! `None`. A write far past the end, or an object store that has become mostly
//! holes, switches to `Sparse`. Indices in `dense_len..length` are always holes.

use std::collections::BTreeMap;

use tracing::trace;

use crate::types::JsValue;

/// Default distance past the end a write may land before the store goes sparse.
pub const DEFAULT_SPARSE_GAP: u32 = 1024;

// Object stores shorter than this never go sparse because of holes alone.
const MIN_SPARSE_DEMOTION_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementKind {
    Empty,
    Int,
    Double,
    Object,
    Sparse,
}

impl ElementKind {
    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Empty => "empty",
            ElementKind::Int => "packed-int",
            ElementKind::Double => "packed-double",
            ElementKind::Object => "packed-object",
            ElementKind::Sparse => "sparse",
        }
    }
}

fn fits_int(n: f64) -> bool {
    n.fract() == 0.0
        && n >= f64::from(i32::MIN)
        && n <= f64::from(i32::MAX)
        && !(n == 0.0 && n.is_sign_negative())
}

fn kind_for(value: &JsValue) -> ElementKind {
    match value {
        JsValue::Number(n) if fits_int(*n) => ElementKind::Int,
        JsValue::Number(_) => ElementKind::Double,
        _ => ElementKind::Object,
    }
}

#[derive(Debug, Clone)]
enum Repr {
    Empty,
    Int(Vec<i32>),
    Double(Vec<f64>),
    Object {
        values: Vec<Option<JsValue>>,
        holes: usize,
    },
    Sparse(BTreeMap<u32, JsValue>),
}

impl Repr {
    fn object(mut values: Vec<Option<JsValue>>) -> Repr {
        while matches!(values.last(), Some(None)) {
            values.pop();
        }
        let holes = values.iter().filter(|v| v.is_none()).count();
        Repr::Object { values, holes }
    }

    fn into_options(self) -> Vec<Option<JsValue>> {
        match self {
            Repr::Empty => Vec::new(),
            Repr::Int(v) => v
                .into_iter()
                .map(|n| Some(JsValue::Number(f64::from(n))))
                .collect(),
            Repr::Double(v) => v.into_iter().map(|n| Some(JsValue::Number(n))).collect(),
            Repr::Object { values, .. } => values,
            Repr::Sparse(map) => {
                let len = map.keys().next_back().map_or(0, |&k| k as usize + 1);
                let mut values = vec![None; len];
                for (k, v) in map {
                    values[k as usize] = Some(v);
                }
                values
            }
        }
    }

    fn into_map(self) -> BTreeMap<u32, JsValue> {
        match self {
            Repr::Sparse(map) => map,
            other => other
                .into_options()
                .into_iter()
                .enumerate()
                .filter_map(|(i, v)| v.map(|v| (i as u32, v)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArrayStorage {
    length: u32,
    repr: Repr,
    gap_limit: u32,
}

impl Default for ArrayStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrayStorage {
    pub fn new() -> Self {
        Self {
            length: 0,
            repr: Repr::Empty,
            gap_limit: DEFAULT_SPARSE_GAP,
        }
    }

    /// An array of `length` holes.
    pub fn with_length(length: u32) -> Self {
        Self {
            length,
            ..Self::new()
        }
    }

    /// Builds storage in the narrowest representation that holds every value.
    pub fn from_values(values: Vec<JsValue>) -> Self {
        let kind = values
            .iter()
            .map(kind_for)
            .max()
            .unwrap_or(ElementKind::Empty);
        let length = values.len() as u32;
        let repr = match kind {
            ElementKind::Empty => Repr::Empty,
            ElementKind::Int => Repr::Int(
                values
                    .iter()
                    .filter_map(JsValue::as_number)
                    .map(|n| n as i32)
                    .collect(),
            ),
            ElementKind::Double => {
                Repr::Double(values.iter().filter_map(JsValue::as_number).collect())
            }
            ElementKind::Object | ElementKind::Sparse => {
                Repr::object(values.into_iter().map(Some).collect())
            }
        };
        Self {
            length,
            repr,
            gap_limit: DEFAULT_SPARSE_GAP,
        }
    }

    pub fn with_gap_limit(mut self, gap_limit: u32) -> Self {
        self.gap_limit = gap_limit;
        self
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn kind(&self) -> ElementKind {
        match self.repr {
            Repr::Empty => ElementKind::Empty,
            Repr::Int(_) => ElementKind::Int,
            Repr::Double(_) => ElementKind::Double,
            Repr::Object { .. } => ElementKind::Object,
            Repr::Sparse(_) => ElementKind::Sparse,
        }
    }

    fn dense_len(&self) -> usize {
        match &self.repr {
            Repr::Empty | Repr::Sparse(_) => 0,
            Repr::Int(v) => v.len(),
            Repr::Double(v) => v.len(),
            Repr::Object { values, .. } => values.len(),
        }
    }

    fn widen(&mut self, target: ElementKind) {
        let current = self.kind();
        if target <= current {
            return;
        }
        trace!(from = current.name(), to = target.name(), "array storage widened");
        let old = std::mem::replace(&mut self.repr, Repr::Empty);
        self.repr = match target {
            ElementKind::Empty => old,
            ElementKind::Int => Repr::Int(Vec::new()),
            ElementKind::Double => match old {
                Repr::Int(v) => Repr::Double(v.into_iter().map(f64::from).collect()),
                _ => Repr::Double(Vec::new()),
            },
            ElementKind::Object => Repr::object(old.into_options()),
            ElementKind::Sparse => Repr::Sparse(old.into_map()),
        };
    }

    /// Returns the element at `index`, or `None` for a hole.
    pub fn get(&self, index: u32) -> Option<JsValue> {
        if index >= self.length {
            return None;
        }
        let i = index as usize;
        match &self.repr {
            Repr::Empty => None,
            Repr::Int(v) => v.get(i).map(|&n| JsValue::Number(f64::from(n))),
            Repr::Double(v) => v.get(i).map(|&n| JsValue::Number(n)),
            Repr::Object { values, .. } => values.get(i).cloned().flatten(),
            Repr::Sparse(map) => map.get(&index).cloned(),
        }
    }

    pub fn has(&self, index: u32) -> bool {
        if index >= self.length {
            return false;
        }
        let i = index as usize;
        match &self.repr {
            Repr::Empty => false,
            Repr::Int(v) => i < v.len(),
            Repr::Double(v) => i < v.len(),
            Repr::Object { values, .. } => matches!(values.get(i), Some(Some(_))),
            Repr::Sparse(map) => map.contains_key(&index),
        }
    }

    /// Stores `value` at `index`, widening the representation as needed and
    /// growing `length` past `index`.
    pub fn set(&mut self, index: u32, value: JsValue) {
        if let Repr::Sparse(map) = &mut self.repr {
            map.insert(index, value);
            self.length = self.length.max(index.saturating_add(1));
            return;
        }
        let dense_len = self.dense_len();
        let i = index as usize;
        if i > dense_len && index - dense_len as u32 > self.gap_limit {
            self.widen(ElementKind::Sparse);
            self.set(index, value);
            return;
        }
        let mut needed = kind_for(&value);
        if i > dense_len {
            needed = needed.max(ElementKind::Object);
        }
        self.widen(needed);
        match &mut self.repr {
            Repr::Int(v) => {
                if let JsValue::Number(n) = value {
                    if i < v.len() {
                        v[i] = n as i32;
                    } else {
                        v.push(n as i32);
                    }
                }
            }
            Repr::Double(v) => {
                if let JsValue::Number(n) = value {
                    if i < v.len() {
                        v[i] = n;
                    } else {
                        v.push(n);
                    }
                }
            }
            Repr::Object { values, holes } => {
                if i < values.len() {
                    if values[i].is_none() {
                        *holes -= 1;
                    }
                    values[i] = Some(value);
                } else {
                    *holes += i - values.len();
                    values.resize(i, None);
                    values.push(Some(value));
                }
            }
            // widen() above always leaves a dense representation here.
            Repr::Empty | Repr::Sparse(_) => {}
        }
        self.length = self.length.max(index.saturating_add(1));
    }

    pub fn ensure_capacity(&mut self, index: u32) {
        let wanted = index as usize + 1;
        let dense_len = self.dense_len();
        if wanted <= dense_len || index - dense_len as u32 > self.gap_limit {
            return;
        }
        let extra = wanted - dense_len;
        match &mut self.repr {
            Repr::Int(v) => v.reserve(extra),
            Repr::Double(v) => v.reserve(extra),
            Repr::Object { values, .. } => values.reserve(extra),
            Repr::Empty | Repr::Sparse(_) => {}
        }
    }

    /// Removes the element at `index`, leaving a hole. `length` is unchanged.
    /// Returns whether an element was present.
    pub fn delete(&mut self, index: u32) -> bool {
        if !self.has(index) {
            return false;
        }
        let i = index as usize;
        if let Repr::Sparse(map) = &mut self.repr {
            map.remove(&index);
            return true;
        }
        if i + 1 == self.dense_len() {
            match &mut self.repr {
                Repr::Int(v) => {
                    v.pop();
                }
                Repr::Double(v) => {
                    v.pop();
                }
                Repr::Object { values, holes } => {
                    values.pop();
                    while matches!(values.last(), Some(None)) {
                        values.pop();
                        *holes -= 1;
                    }
                }
                Repr::Empty | Repr::Sparse(_) => {}
            }
            return true;
        }
        self.widen(ElementKind::Object);
        if let Repr::Object { values, holes } = &mut self.repr {
            values[i] = None;
            *holes += 1;
            if values.len() >= MIN_SPARSE_DEMOTION_LEN && *holes * 2 > values.len() {
                self.widen(ElementKind::Sparse);
            }
        }
        true
    }

    /// Appends `value` and returns the new length.
    pub fn push(&mut self, value: JsValue) -> u32 {
        if self.length == u32::MAX {
            return self.length;
        }
        self.set(self.length, value);
        self.length
    }

    /// Removes the last element. Returns `None` when empty; a trailing hole
    /// pops as `undefined`.
    pub fn pop(&mut self) -> Option<JsValue> {
        if self.length == 0 {
            return None;
        }
        let last = self.length - 1;
        let value = self.get(last).unwrap_or(JsValue::Undefined);
        self.delete(last);
        self.length = last;
        Some(value)
    }

    /// Truncates or extends `length`. Growing adds holes only.
    pub fn set_length(&mut self, new_length: u32) {
        if new_length < self.length {
            let n = new_length as usize;
            match &mut self.repr {
                Repr::Empty => {}
                Repr::Int(v) => v.truncate(n),
                Repr::Double(v) => v.truncate(n),
                Repr::Object { values, holes } => {
                    values.truncate(n);
                    while matches!(values.last(), Some(None)) {
                        values.pop();
                    }
                    *holes = values.iter().filter(|v| v.is_none()).count();
                }
                Repr::Sparse(map) => {
                    map.split_off(&new_length);
                }
            }
        }
        self.length = new_length;
    }

    /// Copies `begin..end` (clamped to `length`) into new storage of the same
    /// representation.
    pub fn slice(&self, begin: u32, end: u32) -> ArrayStorage {
        let end = end.min(self.length);
        let begin = begin.min(end);
        let (b, e) = (begin as usize, end as usize);
        let repr = match &self.repr {
            Repr::Empty => Repr::Empty,
            Repr::Int(v) => Repr::Int(v[b.min(v.len())..e.min(v.len())].to_vec()),
            Repr::Double(v) => Repr::Double(v[b.min(v.len())..e.min(v.len())].to_vec()),
            Repr::Object { values, .. } => {
                Repr::object(values[b.min(values.len())..e.min(values.len())].to_vec())
            }
            Repr::Sparse(map) => Repr::Sparse(
                map.range(begin..end)
                    .map(|(&k, v)| (k - begin, v.clone()))
                    .collect(),
            ),
        };
        ArrayStorage {
            length: end - begin,
            repr,
            gap_limit: self.gap_limit,
        }
    }

    /// Removes `delete_count` elements at `start`, inserts `items` in their
    /// place, and returns the removed elements.
    pub fn splice(&mut self, start: u32, delete_count: u32, items: Vec<JsValue>) -> ArrayStorage {
        let start = start.min(self.length);
        let delete_count = delete_count.min(self.length - start);
        let end = start + delete_count;
        let removed = self.slice(start, end);
        let inserted = items.len() as u32;
        let new_length = (self.length - delete_count).saturating_add(inserted);

        if let Repr::Sparse(map) = &mut self.repr {
            let tail = map.split_off(&start);
            for (k, v) in tail {
                if k >= end {
                    map.insert(k - delete_count + inserted, v);
                }
            }
            for (offset, item) in items.into_iter().enumerate() {
                map.insert(start + offset as u32, item);
            }
            self.length = new_length;
            return removed;
        }

        let s = start as usize;
        let e = end as usize;
        if !items.is_empty() && s > self.dense_len() {
            self.widen(ElementKind::Object);
        }
        self.widen(items.iter().map(kind_for).max().unwrap_or(ElementKind::Empty));
        match &mut self.repr {
            Repr::Int(v) => {
                let range = s.min(v.len())..e.min(v.len());
                v.splice(
                    range,
                    items.iter().filter_map(JsValue::as_number).map(|n| n as i32),
                );
            }
            Repr::Double(v) => {
                let range = s.min(v.len())..e.min(v.len());
                v.splice(range, items.iter().filter_map(JsValue::as_number));
            }
            Repr::Object { values, holes } => {
                if s > values.len() {
                    values.resize(s, None);
                }
                let range = s..e.min(values.len());
                values.splice(range, items.into_iter().map(Some));
                while matches!(values.last(), Some(None)) {
                    values.pop();
                }
                *holes = values.iter().filter(|v| v.is_none()).count();
            }
            Repr::Empty | Repr::Sparse(_) => {}
        }
        self.length = new_length;
        removed
    }

    /// Drops the first `count` elements, moving the rest down.
    pub fn shift_left(&mut self, count: u32) {
        self.splice(0, count, Vec::new());
    }

    /// Moves every element up by `count`, leaving holes at `0..count`.
    pub fn shift_right(&mut self, count: u32) {
        if count == 0 {
            return;
        }
        if count > self.gap_limit {
            self.widen(ElementKind::Sparse);
        }
        let new_length = self.length.saturating_add(count);
        let dense_len = self.dense_len();
        if let Repr::Sparse(map) = &mut self.repr {
            let old = std::mem::take(map);
            *map = old
                .into_iter()
                .filter_map(|(k, v)| k.checked_add(count).map(|k| (k, v)))
                .collect();
        } else if dense_len > 0 {
            self.widen(ElementKind::Object);
            if let Repr::Object { values, holes } = &mut self.repr {
                values.splice(0..0, std::iter::repeat_n(None, count as usize));
                *holes += count as usize;
            }
        }
        self.length = new_length;
    }

    /// Returns `self` followed by `other`. Same-kind operands keep their kind;
    /// otherwise the result takes the wider of the two.
    pub fn concat(&self, other: &ArrayStorage) -> ArrayStorage {
        let mut result = self.clone();
        result.widen(other.kind());
        let offset = self.length;
        for (i, value) in other.entries() {
            if let Some(index) = offset.checked_add(i) {
                result.set(index, value);
            }
        }
        result.length = offset.saturating_add(other.length);
        result
    }

    /// Indices of present elements, ascending.
    pub fn present_indices(&self) -> Vec<u32> {
        match &self.repr {
            Repr::Empty => Vec::new(),
            Repr::Int(v) => (0..v.len() as u32).collect(),
            Repr::Double(v) => (0..v.len() as u32).collect(),
            Repr::Object { values, .. } => values
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_some())
                .map(|(i, _)| i as u32)
                .collect(),
            Repr::Sparse(map) => map.keys().copied().collect(),
        }
    }

    /// Present elements with their indices, ascending.
    pub fn entries(&self) -> Vec<(u32, JsValue)> {
        match &self.repr {
            Repr::Sparse(map) => map.iter().map(|(&k, v)| (k, v.clone())).collect(),
            _ => self
                .present_indices()
                .into_iter()
                .filter_map(|i| self.get(i).map(|v| (i, v)))
                .collect(),
        }
    }

    /// The smallest present index at or after `from`.
    pub fn next_present(&self, from: u32) -> Option<u32> {
        match &self.repr {
            Repr::Sparse(map) => map.range(from..).next().map(|(&k, _)| k),
            _ => (from as usize..self.dense_len())
                .map(|i| i as u32)
                .find(|&i| self.has(i)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> JsValue {
        JsValue::Number(n)
    }

    fn values(s: &ArrayStorage) -> Vec<Option<f64>> {
        (0..s.length())
            .map(|i| s.get(i).and_then(|v| v.as_number()))
            .collect()
    }

    #[test]
    fn picks_narrowest_representation() {
        assert_eq!(ArrayStorage::from_values(vec![]).kind(), ElementKind::Empty);
        assert_eq!(
            ArrayStorage::from_values(vec![num(1.0), num(2.0)]).kind(),
            ElementKind::Int
        );
        assert_eq!(
            ArrayStorage::from_values(vec![num(1.0), num(2.5)]).kind(),
            ElementKind::Double
        );
        assert_eq!(
            ArrayStorage::from_values(vec![num(-0.0)]).kind(),
            ElementKind::Double
        );
        assert_eq!(
            ArrayStorage::from_values(vec![num(1.0), JsValue::str("a")]).kind(),
            ElementKind::Object
        );
    }

    #[test]
    fn widening_is_monotonic() {
        let mut s = ArrayStorage::from_values(vec![num(1.0), num(2.0), num(3.0)]);
        s.set(1, num(0.5));
        assert_eq!(s.kind(), ElementKind::Double);
        s.set(1, num(2.0));
        assert_eq!(s.kind(), ElementKind::Double);
        s.set(0, JsValue::Null);
        assert_eq!(s.kind(), ElementKind::Object);
        s.set(0, num(1.0));
        assert_eq!(s.kind(), ElementKind::Object);
        assert_eq!(values(&s), vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn middle_delete_leaves_hole() {
        let mut s = ArrayStorage::from_values(vec![num(1.0), num(2.0), num(3.0)]);
        assert!(s.delete(1));
        assert_eq!(s.kind(), ElementKind::Object);
        assert_eq!(s.length(), 3);
        assert!(!s.has(1));
        assert_eq!(values(&s), vec![Some(1.0), None, Some(3.0)]);
        assert!(!s.delete(1));
    }

    #[test]
    fn trailing_delete_keeps_kind() {
        let mut s = ArrayStorage::from_values(vec![num(1.0), num(2.0)]);
        assert!(s.delete(1));
        assert_eq!(s.kind(), ElementKind::Int);
        assert_eq!(s.length(), 2);
        assert!(!s.has(1));
    }

    #[test]
    fn far_write_goes_sparse() {
        let mut s = ArrayStorage::from_values(vec![num(1.0)]);
        s.set(1_000_000, num(2.0));
        assert_eq!(s.kind(), ElementKind::Sparse);
        assert_eq!(s.length(), 1_000_001);
        assert_eq!(s.present_indices(), vec![0, 1_000_000]);

        let mut near = ArrayStorage::from_values(vec![num(1.0)]);
        near.set(5, num(2.0));
        assert_eq!(near.kind(), ElementKind::Object);
        assert_eq!(near.length(), 6);
    }

    #[test]
    fn mostly_holes_goes_sparse() {
        let mut s = ArrayStorage::from_values((0..100).map(f64::from).map(num).collect());
        for i in 0..60 {
            s.delete(i);
        }
        assert_eq!(s.kind(), ElementKind::Sparse);
        assert_eq!(s.present_indices().len(), 40);
        assert_eq!(s.length(), 100);
    }

    #[test]
    fn push_pop_and_length() {
        let mut s = ArrayStorage::new();
        assert_eq!(s.push(num(1.0)), 1);
        assert_eq!(s.push(num(2.0)), 2);
        assert_eq!(s.kind(), ElementKind::Int);
        assert!(matches!(s.pop(), Some(JsValue::Number(n)) if n == 2.0));
        assert_eq!(s.length(), 1);

        s.set_length(4);
        assert_eq!(s.length(), 4);
        assert!(!s.has(3));
        assert!(matches!(s.pop(), Some(JsValue::Undefined)));
        s.set_length(0);
        assert!(s.pop().is_none());
    }

    #[test]
    fn shrinking_length_truncates() {
        let mut s = ArrayStorage::from_values(vec![num(1.0), JsValue::str("x"), num(3.0)]);
        s.set_length(1);
        assert_eq!(s.length(), 1);
        s.set_length(3);
        assert!(!s.has(1));
        assert!(!s.has(2));

        let mut sparse = ArrayStorage::new();
        sparse.set(10_000, num(1.0));
        sparse.set(5, num(2.0));
        sparse.set_length(6);
        assert_eq!(sparse.present_indices(), vec![5]);
    }

    #[test]
    fn slice_keeps_representation() {
        let cases = vec![
            ArrayStorage::from_values(vec![]),
            ArrayStorage::from_values(vec![num(1.0), num(2.0), num(3.0)]),
            ArrayStorage::from_values(vec![num(1.5), num(2.0)]),
            ArrayStorage::from_values(vec![JsValue::str("a"), JsValue::Null]),
            {
                let mut s = ArrayStorage::new();
                s.set(5000, num(1.0));
                s.set(2, num(7.0));
                s
            },
        ];
        for s in cases {
            let copy = s.slice(0, s.length());
            assert_eq!(copy.kind(), s.kind());
            assert_eq!(copy.length(), s.length());
            assert_eq!(copy.present_indices(), s.present_indices());
        }
    }

    #[test]
    fn slice_of_sparse_rebases_indices() {
        let mut s = ArrayStorage::new();
        s.set(3000, num(1.0));
        s.set(3005, num(2.0));
        let part = s.slice(3001, 3010);
        assert_eq!(part.length(), 9);
        assert_eq!(part.present_indices(), vec![4]);
    }

    #[test]
    fn splice_replaces_range() {
        let mut s = ArrayStorage::from_values((1..=5).map(f64::from).map(num).collect());
        let removed = s.splice(1, 2, vec![num(9.0)]);
        assert_eq!(values(&removed), vec![Some(2.0), Some(3.0)]);
        assert_eq!(
            values(&s),
            vec![Some(1.0), Some(9.0), Some(4.0), Some(5.0)]
        );
        assert_eq!(s.kind(), ElementKind::Int);

        s.splice(4, 0, vec![JsValue::str("end")]);
        assert_eq!(s.length(), 5);
        assert_eq!(s.kind(), ElementKind::Object);
    }

    #[test]
    fn splice_sparse_shifts_keys() {
        let mut s = ArrayStorage::new();
        s.set(2000, num(1.0));
        s.set(3000, num(2.0));
        s.splice(0, 1000, vec![]);
        assert_eq!(s.present_indices(), vec![1000, 2000]);
        assert_eq!(s.length(), 2001);
    }

    #[test]
    fn shifting() {
        let mut s = ArrayStorage::from_values(vec![num(1.0), num(2.0), num(3.0)]);
        s.shift_left(1);
        assert_eq!(values(&s), vec![Some(2.0), Some(3.0)]);
        s.shift_right(2);
        assert_eq!(s.length(), 4);
        assert_eq!(values(&s), vec![None, None, Some(2.0), Some(3.0)]);
    }

    #[test]
    fn concat_same_kind_preserves_it() {
        let a = ArrayStorage::from_values(vec![num(1.0), num(2.0)]);
        let b = ArrayStorage::from_values(vec![num(3.0)]);
        let c = a.concat(&b);
        assert_eq!(c.kind(), ElementKind::Int);
        assert_eq!(values(&c), vec![Some(1.0), Some(2.0), Some(3.0)]);

        let d = ArrayStorage::from_values(vec![num(0.5)]);
        let e = a.concat(&d);
        assert_eq!(e.kind(), ElementKind::Double);
        assert_eq!(values(&e), vec![Some(1.0), Some(2.0), Some(0.5)]);

        let f = d.concat(&ArrayStorage::from_values(vec![JsValue::Null]));
        assert_eq!(f.kind(), ElementKind::Object);
    }

    #[test]
    fn concat_keeps_holes() {
        let mut a = ArrayStorage::from_values(vec![num(1.0)]);
        a.set_length(3);
        let c = a.concat(&ArrayStorage::from_values(vec![num(4.0)]));
        assert_eq!(c.length(), 4);
        assert_eq!(values(&c), vec![Some(1.0), None, None, Some(4.0)]);
    }

    #[test]
    fn next_present_skips_holes() {
        let mut s = ArrayStorage::from_values(vec![num(1.0), num(2.0), num(3.0)]);
        s.delete(1);
        assert_eq!(s.next_present(1), Some(2));
        assert_eq!(s.next_present(3), None);
    }
}
