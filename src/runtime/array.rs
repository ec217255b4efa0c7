//! Generic Array algorithms (§23.1.3).
//!
//! Every operation works on any array-like object through `get`/`set`/
//! `has_property`/`delete`. Plain arrays (extensible, no integrity level,
//! no index properties in their property map or on their prototype chain)
//! take a fast path that works on the element storage directly; the result
//! is the same because such arrays have no observable element hooks.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use super::Realm;
use super::array_storage::ArrayStorage;
use super::helpers::{relative_to, same_value_zero, strict_equality, to_boolean, to_integer_or_infinity};
use super::types::{IntegrityLevel, JsObjectData, ObjectKind};
use crate::error::{JsError, JsResult};
use crate::types::{JsObject, JsString, JsValue, PropertyKey, number_ops};

fn index_key(index: u64) -> PropertyKey {
    match u32::try_from(index) {
        Ok(i) => PropertyKey::from(i),
        Err(_) => PropertyKey::from(JsString::from_str(&index.to_string())),
    }
}

fn index_value(index: u64) -> JsValue {
    JsValue::Number(index as f64)
}

/// Bottom-up stable merge sort. `less(a, b)` reports whether `a` must come
/// before `b`; a comparator that is not a consistent order still terminates
/// with some permutation of the input.
fn merge_sort<T: Clone>(
    mut items: Vec<T>,
    mut less: impl FnMut(&T, &T) -> JsResult<bool>,
) -> JsResult<Vec<T>> {
    let n = items.len();
    let mut buffer = Vec::with_capacity(n);
    let mut width = 1;
    while width < n {
        buffer.clear();
        let mut start = 0;
        while start < n {
            let mid = (start + width).min(n);
            let end = (start + 2 * width).min(n);
            let (mut i, mut j) = (start, mid);
            while i < mid && j < end {
                if less(&items[j], &items[i])? {
                    buffer.push(items[j].clone());
                    j += 1;
                } else {
                    buffer.push(items[i].clone());
                    i += 1;
                }
            }
            buffer.extend_from_slice(&items[i..mid]);
            buffer.extend_from_slice(&items[j..end]);
            start = end;
        }
        std::mem::swap(&mut items, &mut buffer);
        width *= 2;
    }
    Ok(items)
}

impl Realm {
    pub fn is_array(&self, value: &JsValue) -> bool {
        value
            .as_object()
            .and_then(|o| self.get_object(o.id))
            .is_some_and(|data| data.borrow().is_array())
    }

    fn chain_has_indexed(&self, mut proto: Option<JsObject>) -> bool {
        let mut depth = 0;
        while let Some(p) = proto {
            let Some(data) = self.get_object(p.id) else {
                return true;
            };
            let data = data.borrow();
            let exotic = matches!(
                data.kind,
                ObjectKind::TypedArray { .. } | ObjectKind::Primitive(JsValue::String(_))
            );
            if exotic
                || data.elements.as_ref().is_some_and(|e| e.length() > 0)
                || data.map.properties().iter().any(|p| p.key.array_index().is_some())
            {
                return true;
            }
            depth += 1;
            if depth > self.config.max_prototype_depth {
                return true;
            }
            proto = data.prototype;
        }
        false
    }

    /// The object's data when it is a plain array eligible for the storage
    /// fast paths.
    fn fast_array(&self, obj: JsObject) -> Option<Rc<RefCell<JsObjectData>>> {
        let rc = self.get_object(obj.id)?;
        let proto = {
            let data = rc.borrow();
            let plain = data.is_array()
                && data.extensible
                && data.length_writable
                && data.elements_integrity == IntegrityLevel::None
                && !data.map.properties().iter().any(|p| p.key.array_index().is_some());
            if !plain {
                return None;
            }
            data.prototype
        };
        (!self.chain_has_indexed(proto)).then_some(rc)
    }

    fn require_callable(&self, callback: &JsValue) -> JsResult<()> {
        if self.is_callable(callback) {
            Ok(())
        } else {
            Err(JsError::type_error(format!(
                "{} is not a function",
                self.describe(callback)
            )))
        }
    }

    fn length_u64(&mut self, obj: JsObject) -> JsResult<u64> {
        Ok(self.length_of_array_like(obj)? as u64)
    }

    fn set_length(&mut self, obj: JsObject, length: u64) -> JsResult<()> {
        self.set(obj, &PropertyKey::from("length"), index_value(length), true)?;
        Ok(())
    }

    fn array_with_length(&mut self, length: u64) -> JsResult<JsObject> {
        let length = u32::try_from(length)
            .ok()
            .filter(|&l| l <= self.config.max_array_length)
            .ok_or_else(|| JsError::range_error("Invalid array length"))?;
        self.create_array_from_storage(ArrayStorage::with_length(length))
    }

    /// The elements of an array-like as a vector; holes read as `undefined`
    /// (or whatever the prototype chain supplies).
    pub fn array_to_vec(&mut self, obj: JsObject) -> JsResult<Vec<JsValue>> {
        if let Some(data) = self.fast_array(obj) {
            let data = data.borrow();
            if let Some(elements) = &data.elements {
                return Ok((0..elements.length())
                    .map(|i| elements.get(i).unwrap_or(JsValue::Undefined))
                    .collect());
            }
        }
        let len = self.length_u64(obj)?;
        (0..len).map(|k| self.get(obj, &index_key(k))).collect()
    }

    // §23.1.3.23 Array.prototype.push
    pub fn array_push(&mut self, obj: JsObject, items: Vec<JsValue>) -> JsResult<f64> {
        if let Some(data) = self.fast_array(obj) {
            let mut data = data.borrow_mut();
            if let Some(elements) = data.elements.as_mut()
                && elements.length() as usize + items.len() <= self.config.max_array_length as usize
            {
                for item in items {
                    elements.push(item);
                }
                return Ok(f64::from(elements.length()));
            }
        }
        let len = self.length_u64(obj)?;
        if len as f64 + items.len() as f64 > number_ops::MAX_SAFE_INTEGER {
            return Err(JsError::type_error("Pushing elements past 2^53-1 length"));
        }
        let count = items.len() as u64;
        for (i, item) in items.into_iter().enumerate() {
            self.set(obj, &index_key(len + i as u64), item, true)?;
        }
        self.set_length(obj, len + count)?;
        Ok((len + count) as f64)
    }

    // §23.1.3.22 Array.prototype.pop
    pub fn array_pop(&mut self, obj: JsObject) -> JsResult<JsValue> {
        if let Some(data) = self.fast_array(obj) {
            let mut data = data.borrow_mut();
            if let Some(elements) = data.elements.as_mut() {
                return Ok(elements.pop().unwrap_or(JsValue::Undefined));
            }
        }
        let len = self.length_u64(obj)?;
        if len == 0 {
            self.set_length(obj, 0)?;
            return Ok(JsValue::Undefined);
        }
        let key = index_key(len - 1);
        let value = self.get(obj, &key)?;
        self.delete(obj, &key, true)?;
        self.set_length(obj, len - 1)?;
        Ok(value)
    }

    // §23.1.3.27 Array.prototype.shift
    pub fn array_shift(&mut self, obj: JsObject) -> JsResult<JsValue> {
        if let Some(data) = self.fast_array(obj) {
            let mut data = data.borrow_mut();
            if let Some(elements) = data.elements.as_mut() {
                if elements.length() == 0 {
                    return Ok(JsValue::Undefined);
                }
                let first = elements.get(0).unwrap_or(JsValue::Undefined);
                elements.shift_left(1);
                return Ok(first);
            }
        }
        let len = self.length_u64(obj)?;
        if len == 0 {
            self.set_length(obj, 0)?;
            return Ok(JsValue::Undefined);
        }
        let first = self.get(obj, &index_key(0))?;
        for k in 1..len {
            self.move_element(obj, k, k - 1)?;
        }
        self.delete(obj, &index_key(len - 1), true)?;
        self.set_length(obj, len - 1)?;
        Ok(first)
    }

    // Copies `from` to `to`, or deletes `to` when `from` is a hole.
    fn move_element(&mut self, obj: JsObject, from: u64, to: u64) -> JsResult<()> {
        let from = index_key(from);
        let to = index_key(to);
        if self.has_property(obj, &from)? {
            let value = self.get(obj, &from)?;
            self.set(obj, &to, value, true)?;
        } else {
            self.delete(obj, &to, true)?;
        }
        Ok(())
    }

    // §23.1.3.34 Array.prototype.unshift
    pub fn array_unshift(&mut self, obj: JsObject, items: Vec<JsValue>) -> JsResult<f64> {
        let count = items.len() as u64;
        if let Some(data) = self.fast_array(obj) {
            let mut data = data.borrow_mut();
            if let Some(elements) = data.elements.as_mut()
                && u64::from(elements.length()) + count <= u64::from(self.config.max_array_length)
            {
                elements.shift_right(count as u32);
                for (i, item) in items.into_iter().enumerate() {
                    elements.set(i as u32, item);
                }
                return Ok(f64::from(elements.length()));
            }
        }
        let len = self.length_u64(obj)?;
        if count > 0 {
            if (len + count) as f64 > number_ops::MAX_SAFE_INTEGER {
                return Err(JsError::type_error("Unshift past 2^53-1 length"));
            }
            for k in (0..len).rev() {
                self.move_element(obj, k, k + count)?;
            }
            for (i, item) in items.into_iter().enumerate() {
                self.set(obj, &index_key(i as u64), item, true)?;
            }
        }
        self.set_length(obj, len + count)?;
        Ok((len + count) as f64)
    }

    // §23.1.3.28 Array.prototype.slice
    pub fn array_slice(&mut self, obj: JsObject, start: &JsValue, end: &JsValue) -> JsResult<JsObject> {
        let len = self.length_of_array_like(obj)?;
        let first = relative_to(self.to_number(start)?, len);
        let last = if end.is_undefined() {
            len
        } else {
            relative_to(self.to_number(end)?, len)
        };
        if let Some(data) = self.fast_array(obj) {
            let sliced = data
                .borrow()
                .elements
                .as_ref()
                .map(|e| e.slice(first as u32, last as u32));
            if let Some(sliced) = sliced {
                return self.create_array_from_storage(sliced);
            }
        }
        let count = (last - first).max(0.0) as u64;
        let result = self.array_with_length(0)?;
        let first = first as u64;
        for n in 0..count {
            let from = index_key(first + n);
            if self.has_property(obj, &from)? {
                let value = self.get(obj, &from)?;
                self.create_data_property_or_throw(result, &index_key(n), value)?;
            }
        }
        self.set_length(result, count)?;
        Ok(result)
    }

    // §23.1.3.31 Array.prototype.splice
    /// `start` is `None` when splice was called without arguments and
    /// `delete_count` is `None` when only a start was given.
    pub fn array_splice(
        &mut self,
        obj: JsObject,
        start: Option<&JsValue>,
        delete_count: Option<&JsValue>,
        items: Vec<JsValue>,
    ) -> JsResult<JsObject> {
        let len = self.length_of_array_like(obj)?;
        let actual_start = match start {
            Some(start) => relative_to(self.to_number(start)?, len),
            None => 0.0,
        };
        let actual_delete = match (start, delete_count) {
            (None, _) => 0.0,
            (Some(_), None) => len - actual_start,
            (Some(_), Some(dc)) => {
                to_integer_or_infinity(self.to_number(dc)?).clamp(0.0, len - actual_start)
            }
        };
        let item_count = items.len() as f64;
        if len + item_count - actual_delete > number_ops::MAX_SAFE_INTEGER {
            return Err(JsError::type_error("Splice past 2^53-1 length"));
        }

        if let Some(data) = self.fast_array(obj) {
            let mut data = data.borrow_mut();
            if let Some(elements) = data.elements.as_mut()
                && len - actual_delete + item_count <= f64::from(self.config.max_array_length)
            {
                let removed = elements.splice(actual_start as u32, actual_delete as u32, items);
                drop(data);
                return self.create_array_from_storage(removed);
            }
        }

        let (len, start, deleted, inserted) = (
            len as u64,
            actual_start as u64,
            actual_delete as u64,
            items.len() as u64,
        );
        let removed = self.array_with_length(0)?;
        for k in 0..deleted {
            let from = index_key(start + k);
            if self.has_property(obj, &from)? {
                let value = self.get(obj, &from)?;
                self.create_data_property_or_throw(removed, &index_key(k), value)?;
            }
        }
        self.set_length(removed, deleted)?;

        if inserted < deleted {
            for k in start..(len - deleted) {
                self.move_element(obj, k + deleted, k + inserted)?;
            }
            for k in ((len - deleted + inserted)..len).rev() {
                self.delete(obj, &index_key(k), true)?;
            }
        } else if inserted > deleted {
            for k in (start..(len - deleted)).rev() {
                self.move_element(obj, k + deleted, k + inserted)?;
            }
        }
        for (i, item) in items.into_iter().enumerate() {
            self.set(obj, &index_key(start + i as u64), item, true)?;
        }
        self.set_length(obj, len - deleted + inserted)?;
        Ok(removed)
    }

    // §23.1.3.1 Array.prototype.concat
    /// Arrays among `this` and `others` are spread; anything else is
    /// appended as a single element.
    pub fn array_concat(&mut self, this: &JsValue, others: &[JsValue]) -> JsResult<JsObject> {
        let this_obj = self.to_object(this)?;
        let mut parts = Vec::with_capacity(others.len() + 1);
        parts.push(JsValue::Object(this_obj));
        parts.extend_from_slice(others);

        let mut combined = Some(ArrayStorage::new());
        for part in &parts {
            let Some(storage) = combined.as_mut() else {
                break;
            };
            if let Some(obj) = part.as_object()
                && self.is_array(part)
            {
                match self.fast_array(obj) {
                    Some(data) => {
                        if let Some(elements) = &data.borrow().elements {
                            *storage = storage.concat(elements);
                        }
                    }
                    None => combined = None,
                }
            } else {
                let index = storage.length();
                storage.set(index, part.clone());
            }
        }
        if let Some(storage) = combined {
            return self.create_array_from_storage(storage);
        }

        let result = self.array_with_length(0)?;
        let mut n: u64 = 0;
        for part in &parts {
            match part.as_object() {
                Some(obj) if self.is_array(part) => {
                    let len = self.length_u64(obj)?;
                    for k in 0..len {
                        let from = index_key(k);
                        if self.has_property(obj, &from)? {
                            let value = self.get(obj, &from)?;
                            self.create_data_property_or_throw(result, &index_key(n), value)?;
                        }
                        n += 1;
                    }
                }
                _ => {
                    self.create_data_property_or_throw(result, &index_key(n), part.clone())?;
                    n += 1;
                }
            }
        }
        self.set_length(result, n)?;
        Ok(result)
    }

    // §23.1.3.30.2 SortCompare
    fn sort_compare(&mut self, comparator: &JsValue, x: &JsValue, y: &JsValue) -> JsResult<Ordering> {
        let v = self.call(comparator, &JsValue::Undefined, &[x.clone(), y.clone()])?;
        let v = self.to_number(&v)?;
        Ok(if v < 0.0 {
            Ordering::Less
        } else if v > 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        })
    }

    fn sort_values(&mut self, values: Vec<JsValue>, comparator: &JsValue) -> JsResult<Vec<JsValue>> {
        if comparator.is_undefined() {
            let mut keyed = Vec::with_capacity(values.len());
            for value in values {
                keyed.push((self.to_js_string(&value)?, value));
            }
            let sorted = merge_sort(keyed, |a, b| Ok(a.0 < b.0))?;
            return Ok(sorted.into_iter().map(|(_, v)| v).collect());
        }
        merge_sort(values, |a, b| {
            Ok(self.sort_compare(comparator, a, b)? == Ordering::Less)
        })
    }

    // §23.1.3.30 Array.prototype.sort
    /// Sorts in place: defined values in comparator order, then
    /// `undefined`s, then holes.
    pub fn array_sort(&mut self, obj: JsObject, comparator: &JsValue) -> JsResult<()> {
        if !comparator.is_undefined() && !self.is_callable(comparator) {
            return Err(JsError::type_error(
                "The comparison function must be either a function or undefined",
            ));
        }
        let (defined, undefined_count, len) = match self.fast_array(obj) {
            Some(data) => {
                let data = data.borrow();
                match &data.elements {
                    Some(elements) => {
                        let (undefined, defined): (Vec<JsValue>, Vec<JsValue>) = elements
                            .entries()
                            .into_iter()
                            .map(|(_, v)| v)
                            .partition(JsValue::is_undefined);
                        (defined, undefined.len() as u64, u64::from(elements.length()))
                    }
                    None => (Vec::new(), 0, 0),
                }
            }
            None => {
                let len = self.length_u64(obj)?;
                let mut defined = Vec::new();
                let mut undefined_count = 0u64;
                for k in 0..len {
                    let key = index_key(k);
                    if self.has_property(obj, &key)? {
                        let value = self.get(obj, &key)?;
                        if value.is_undefined() {
                            undefined_count += 1;
                        } else {
                            defined.push(value);
                        }
                    }
                }
                (defined, undefined_count, len)
            }
        };
        let sorted = self.sort_values(defined, comparator)?;

        // The comparator may have frozen or resized the array; only an
        // untouched plain array can have its storage swapped in one go.
        if let Some(data) = self.fast_array(obj) {
            let unchanged = data
                .borrow()
                .elements
                .as_ref()
                .map_or(len == 0, |elements| u64::from(elements.length()) == len);
            if unchanged {
                let mut values = sorted;
                values.extend((0..undefined_count).map(|_| JsValue::Undefined));
                let mut storage = ArrayStorage::from_values(values);
                storage.set_length(len as u32);
                let gap = self.config.sparse_gap_threshold;
                data.borrow_mut().elements = Some(storage.with_gap_limit(gap));
                return Ok(());
            }
        }

        let mut k = 0u64;
        for value in sorted {
            self.set(obj, &index_key(k), value, true)?;
            k += 1;
        }
        for _ in 0..undefined_count {
            self.set(obj, &index_key(k), JsValue::Undefined, true)?;
            k += 1;
        }
        while k < len {
            self.delete(obj, &index_key(k), true)?;
            k += 1;
        }
        Ok(())
    }

    // Visits present elements in order, stopping when `visit` returns false.
    fn for_each_present(
        &mut self,
        obj: JsObject,
        callback: &JsValue,
        this_arg: &JsValue,
        mut visit: impl FnMut(&mut Realm, u64, JsValue, JsValue) -> JsResult<bool>,
    ) -> JsResult<()> {
        self.require_callable(callback)?;
        let len = self.length_u64(obj)?;
        for k in 0..len {
            let key = index_key(k);
            if !self.has_property(obj, &key)? {
                continue;
            }
            let value = self.get(obj, &key)?;
            let result = self.call(
                callback,
                this_arg,
                &[value.clone(), index_value(k), JsValue::Object(obj)],
            )?;
            if !visit(self, k, value, result)? {
                break;
            }
        }
        Ok(())
    }

    // §23.1.3.15 Array.prototype.forEach
    pub fn array_for_each(&mut self, obj: JsObject, callback: &JsValue, this_arg: &JsValue) -> JsResult<()> {
        self.for_each_present(obj, callback, this_arg, |_, _, _, _| Ok(true))
    }

    // §23.1.3.21 Array.prototype.map
    pub fn array_map(&mut self, obj: JsObject, callback: &JsValue, this_arg: &JsValue) -> JsResult<JsObject> {
        self.require_callable(callback)?;
        let len = self.length_u64(obj)?;
        let result = self.array_with_length(len)?;
        self.for_each_present(obj, callback, this_arg, |realm, k, _, mapped| {
            realm.create_data_property_or_throw(result, &index_key(k), mapped)?;
            Ok(true)
        })?;
        Ok(result)
    }

    // §23.1.3.8 Array.prototype.filter
    pub fn array_filter(&mut self, obj: JsObject, callback: &JsValue, this_arg: &JsValue) -> JsResult<JsObject> {
        let result = self.array_with_length(0)?;
        let mut to = 0u64;
        self.for_each_present(obj, callback, this_arg, |realm, _, value, selected| {
            if to_boolean(&selected) {
                realm.create_data_property_or_throw(result, &index_key(to), value)?;
                to += 1;
            }
            Ok(true)
        })?;
        Ok(result)
    }

    // §23.1.3.6 Array.prototype.every
    pub fn array_every(&mut self, obj: JsObject, callback: &JsValue, this_arg: &JsValue) -> JsResult<bool> {
        let mut all = true;
        self.for_each_present(obj, callback, this_arg, |_, _, _, result| {
            all = to_boolean(&result);
            Ok(all)
        })?;
        Ok(all)
    }

    // §23.1.3.29 Array.prototype.some
    pub fn array_some(&mut self, obj: JsObject, callback: &JsValue, this_arg: &JsValue) -> JsResult<bool> {
        let mut any = false;
        self.for_each_present(obj, callback, this_arg, |_, _, _, result| {
            any = to_boolean(&result);
            Ok(!any)
        })?;
        Ok(any)
    }

    // §23.1.3.24 Array.prototype.reduce
    pub fn array_reduce(
        &mut self,
        obj: JsObject,
        callback: &JsValue,
        initial: Option<JsValue>,
    ) -> JsResult<JsValue> {
        self.require_callable(callback)?;
        let len = self.length_u64(obj)?;
        self.reduce_over(obj, callback, initial, Box::new(0..len))
    }

    // §23.1.3.25 Array.prototype.reduceRight
    pub fn array_reduce_right(
        &mut self,
        obj: JsObject,
        callback: &JsValue,
        initial: Option<JsValue>,
    ) -> JsResult<JsValue> {
        self.require_callable(callback)?;
        let len = self.length_u64(obj)?;
        self.reduce_over(obj, callback, initial, Box::new((0..len).rev()))
    }

    fn reduce_over(
        &mut self,
        obj: JsObject,
        callback: &JsValue,
        initial: Option<JsValue>,
        mut indices: Box<dyn Iterator<Item = u64>>,
    ) -> JsResult<JsValue> {
        let mut accumulator = match initial {
            Some(value) => value,
            None => loop {
                let Some(k) = indices.next() else {
                    return Err(JsError::type_error("Reduce of empty array with no initial value"));
                };
                let key = index_key(k);
                if self.has_property(obj, &key)? {
                    break self.get(obj, &key)?;
                }
            },
        };
        for k in indices {
            let key = index_key(k);
            if !self.has_property(obj, &key)? {
                continue;
            }
            let value = self.get(obj, &key)?;
            accumulator = self.call(
                callback,
                &JsValue::Undefined,
                &[accumulator, value, index_value(k), JsValue::Object(obj)],
            )?;
        }
        Ok(accumulator)
    }

    // §23.1.3.17 Array.prototype.indexOf
    pub fn array_index_of(&mut self, obj: JsObject, search: &JsValue, from: &JsValue) -> JsResult<f64> {
        let len = self.length_of_array_like(obj)?;
        if len == 0.0 {
            return Ok(-1.0);
        }
        let n = to_integer_or_infinity(self.to_number(from)?);
        if n == f64::INFINITY {
            return Ok(-1.0);
        }
        let start = if n >= 0.0 { n } else { (len + n).max(0.0) } as u64;
        for k in start..len as u64 {
            let key = index_key(k);
            if self.has_property(obj, &key)? && strict_equality(&self.get(obj, &key)?, search) {
                return Ok(k as f64);
            }
        }
        Ok(-1.0)
    }

    // §23.1.3.20 Array.prototype.lastIndexOf
    pub fn array_last_index_of(
        &mut self,
        obj: JsObject,
        search: &JsValue,
        from: Option<&JsValue>,
    ) -> JsResult<f64> {
        let len = self.length_of_array_like(obj)?;
        if len == 0.0 {
            return Ok(-1.0);
        }
        let n = match from {
            Some(from) => to_integer_or_infinity(self.to_number(from)?),
            None => len - 1.0,
        };
        let start = if n >= 0.0 { n.min(len - 1.0) } else { len + n };
        if start < 0.0 {
            return Ok(-1.0);
        }
        for k in (0..=start as u64).rev() {
            let key = index_key(k);
            if self.has_property(obj, &key)? && strict_equality(&self.get(obj, &key)?, search) {
                return Ok(k as f64);
            }
        }
        Ok(-1.0)
    }

    // §23.1.3.16 Array.prototype.includes
    pub fn array_includes(&mut self, obj: JsObject, search: &JsValue, from: &JsValue) -> JsResult<bool> {
        let len = self.length_of_array_like(obj)?;
        if len == 0.0 {
            return Ok(false);
        }
        let n = to_integer_or_infinity(self.to_number(from)?);
        if n == f64::INFINITY {
            return Ok(false);
        }
        let start = if n >= 0.0 { n } else { (len + n).max(0.0) } as u64;
        for k in start..len as u64 {
            if same_value_zero(&self.get(obj, &index_key(k))?, search) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    // §23.1.3.18 Array.prototype.join
    pub fn array_join(&mut self, obj: JsObject, separator: &JsValue) -> JsResult<JsString> {
        let len = self.length_u64(obj)?;
        let separator = if separator.is_undefined() {
            JsString::from_str(",")
        } else {
            self.to_js_string(separator)?
        };
        let mut units: Vec<u16> = Vec::new();
        for k in 0..len {
            if k > 0 {
                units.extend_from_slice(separator.code_units());
            }
            let element = self.get(obj, &index_key(k))?;
            if !element.is_nullish() {
                units.extend_from_slice(self.to_js_string(&element)?.code_units());
            }
        }
        Ok(JsString::from_code_units(units))
    }

    // §23.1.3.26 Array.prototype.reverse
    pub fn array_reverse(&mut self, obj: JsObject) -> JsResult<()> {
        let len = self.length_u64(obj)?;
        let middle = len / 2;
        for lower in 0..middle {
            let upper = len - lower - 1;
            let (lower_key, upper_key) = (index_key(lower), index_key(upper));
            let lower_value = if self.has_property(obj, &lower_key)? {
                Some(self.get(obj, &lower_key)?)
            } else {
                None
            };
            let upper_value = if self.has_property(obj, &upper_key)? {
                Some(self.get(obj, &upper_key)?)
            } else {
                None
            };
            match upper_value {
                Some(value) => {
                    self.set(obj, &lower_key, value, true)?;
                }
                None => {
                    self.delete(obj, &lower_key, true)?;
                }
            }
            match lower_value {
                Some(value) => {
                    self.set(obj, &upper_key, value, true)?;
                }
                None => {
                    self.delete(obj, &upper_key, true)?;
                }
            }
        }
        Ok(())
    }

    // §23.1.3.7 Array.prototype.fill
    pub fn array_fill(&mut self, obj: JsObject, value: &JsValue, start: &JsValue, end: &JsValue) -> JsResult<()> {
        let len = self.length_of_array_like(obj)?;
        let first = relative_to(self.to_number(start)?, len) as u64;
        let last = if end.is_undefined() {
            len
        } else {
            relative_to(self.to_number(end)?, len)
        } as u64;
        for k in first..last {
            self.set(obj, &index_key(k), value.clone(), true)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::array_storage::ElementKind;

    fn num(n: f64) -> JsValue {
        JsValue::Number(n)
    }

    fn nums(values: &[f64]) -> Vec<JsValue> {
        values.iter().map(|&n| num(n)).collect()
    }

    fn contents(realm: &mut Realm, arr: JsObject) -> Vec<Option<f64>> {
        realm
            .array_to_vec(arr)
            .unwrap()
            .into_iter()
            .map(|v| v.as_number())
            .collect()
    }

    #[test]
    fn merge_sort_is_stable_and_total() {
        let pairs = vec![(1, 'a'), (0, 'b'), (1, 'c'), (0, 'd')];
        let sorted = merge_sort(pairs, |a, b| Ok(a.0 < b.0)).unwrap();
        assert_eq!(sorted, vec![(0, 'b'), (0, 'd'), (1, 'a'), (1, 'c')]);
        // A comparator that always says "less" still yields a permutation.
        let noisy = merge_sort(vec![3, 1, 2], |_, _| Ok(true)).unwrap();
        let mut check = noisy.clone();
        check.sort();
        assert_eq!(check, vec![1, 2, 3]);
    }

    #[test]
    fn push_pop_shift_unshift() {
        let mut realm = Realm::new();
        let arr = realm.create_array(nums(&[1.0, 2.0])).unwrap();
        assert_eq!(realm.array_push(arr, nums(&[3.0])).unwrap(), 3.0);
        assert_eq!(realm.array_pop(arr).unwrap().as_number(), Some(3.0));
        assert_eq!(realm.array_shift(arr).unwrap().as_number(), Some(1.0));
        assert_eq!(realm.array_unshift(arr, nums(&[7.0, 8.0])).unwrap(), 3.0);
        assert_eq!(contents(&mut realm, arr), vec![Some(7.0), Some(8.0), Some(2.0)]);
        let empty = realm.create_array(Vec::new()).unwrap();
        assert!(realm.array_pop(empty).unwrap().is_undefined());
    }

    #[test]
    fn generic_push_works_on_array_likes() {
        let mut realm = Realm::new();
        let obj = realm.create_object();
        realm.array_push(obj, nums(&[5.0])).unwrap();
        assert_eq!(
            realm.get(obj, &PropertyKey::from("length")).unwrap().as_number(),
            Some(1.0)
        );
        assert_eq!(
            realm.get(obj, &PropertyKey::from(0u32)).unwrap().as_number(),
            Some(5.0)
        );
    }

    #[test]
    fn slice_keeps_the_representation() {
        let mut realm = Realm::new();
        for values in [nums(&[1.0, 2.0, 3.0]), nums(&[1.5, 2.5, 3.5])] {
            let arr = realm.create_array(values).unwrap();
            let sliced = realm.array_slice(arr, &num(1.0), &JsValue::Undefined).unwrap();
            assert_eq!(realm.element_kind(arr).unwrap(), realm.element_kind(sliced).unwrap());
            assert_eq!(contents(&mut realm, sliced).len(), 2);
        }
        let mixed = realm
            .create_array(vec![JsValue::str("a"), num(1.0), JsValue::Null])
            .unwrap();
        let sliced = realm.array_slice(mixed, &num(-2.0), &JsValue::Undefined).unwrap();
        assert_eq!(realm.element_kind(sliced).unwrap(), Some(ElementKind::Object));
        assert_eq!(contents(&mut realm, sliced), vec![Some(1.0), None]);
    }

    #[test]
    fn splice_removes_and_inserts() {
        let mut realm = Realm::new();
        let arr = realm.create_array(nums(&[1.0, 2.0, 3.0, 4.0])).unwrap();
        let removed = realm
            .array_splice(arr, Some(&num(1.0)), Some(&num(2.0)), nums(&[9.0]))
            .unwrap();
        assert_eq!(contents(&mut realm, removed), vec![Some(2.0), Some(3.0)]);
        assert_eq!(contents(&mut realm, arr), vec![Some(1.0), Some(9.0), Some(4.0)]);
    }

    #[test]
    fn concat_spreads_arrays_only() {
        let mut realm = Realm::new();
        let a = realm.create_array(nums(&[1.0])).unwrap();
        let b = realm.create_array(nums(&[2.0, 3.0])).unwrap();
        let result = realm
            .array_concat(&a.into(), &[b.into(), num(4.0)])
            .unwrap();
        assert_eq!(
            contents(&mut realm, result),
            vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]
        );
        assert_eq!(realm.element_kind(result).unwrap(), Some(ElementKind::Int));
    }

    #[test]
    fn default_sort_is_by_string() {
        let mut realm = Realm::new();
        let arr = realm
            .create_array(vec![num(10.0), JsValue::Undefined, num(9.0), num(1.0)])
            .unwrap();
        realm.array_sort(arr, &JsValue::Undefined).unwrap();
        let sorted = realm.array_to_vec(arr).unwrap();
        let numbers: Vec<Option<f64>> = sorted.iter().map(JsValue::as_number).collect();
        assert_eq!(numbers, vec![Some(1.0), Some(10.0), Some(9.0), None]);
        assert!(sorted[3].is_undefined());
    }

    #[test]
    fn comparator_errors_propagate() {
        let mut realm = Realm::new();
        let arr = realm.create_array(nums(&[2.0, 1.0])).unwrap();
        let cmp = realm.create_native_function("cmp", 2, |_, _, _| {
            Err(JsError::Throw(JsValue::str("nope")))
        });
        assert!(matches!(
            realm.array_sort(arr, &cmp.into()),
            Err(JsError::Throw(_))
        ));
        assert!(matches!(
            realm.array_sort(arr, &num(1.0)),
            Err(JsError::TypeError(_))
        ));
    }

    fn numeric_order(realm: &mut Realm, args: &[JsValue]) -> JsResult<JsValue> {
        let a = realm.to_number(&args[0])?;
        let b = realm.to_number(&args[1])?;
        Ok(num(a - b))
    }

    #[test]
    fn sort_respects_a_freeze_from_the_comparator() {
        let mut realm = Realm::new();
        let arr = realm.create_array(nums(&[3.0, 1.0, 2.0])).unwrap();
        let cmp = realm.create_native_function("cmp", 2, move |realm, _, args| {
            realm.freeze(arr)?;
            numeric_order(realm, args)
        });
        assert!(matches!(
            realm.array_sort(arr, &cmp.into()),
            Err(JsError::TypeError(_))
        ));
        assert!(realm.is_frozen(arr).unwrap());
        assert_eq!(contents(&mut realm, arr), vec![Some(3.0), Some(1.0), Some(2.0)]);
    }

    #[test]
    fn sort_keeps_elements_pushed_by_the_comparator() {
        let mut realm = Realm::new();
        let arr = realm.create_array(nums(&[3.0, 1.0, 2.0])).unwrap();
        let cmp = realm.create_native_function("cmp", 2, move |realm, _, args| {
            if realm.length_u64(arr)? == 3 {
                realm.array_push(arr, vec![num(99.0)])?;
            }
            numeric_order(realm, args)
        });
        realm.array_sort(arr, &cmp.into()).unwrap();
        assert_eq!(
            contents(&mut realm, arr),
            vec![Some(1.0), Some(2.0), Some(3.0), Some(99.0)]
        );
    }

    #[test]
    fn reduce_right_walks_backwards_over_present_elements() {
        let mut realm = Realm::new();
        let arr = realm
            .create_array(["a", "b", "c", "d"].into_iter().map(JsValue::str).collect())
            .unwrap();
        realm.delete(arr, &PropertyKey::from(2u32), true).unwrap();
        let join = realm.create_native_function("join", 2, |realm, _, args| {
            let acc = realm.to_js_string(&args[0])?;
            let value = realm.to_js_string(&args[1])?;
            Ok(JsValue::String(JsString::concat(&acc, &value)))
        });
        let joined = realm.array_reduce_right(arr, &join.into(), None).unwrap();
        assert_eq!(joined.to_string(), "dba");
        let seeded = realm
            .array_reduce_right(arr, &join.into(), Some(JsValue::str(">")))
            .unwrap();
        assert_eq!(seeded.to_string(), ">dba");

        let empty = realm.create_array(Vec::new()).unwrap();
        assert!(matches!(
            realm.array_reduce_right(empty, &join.into(), None),
            Err(JsError::TypeError(_))
        ));
    }

    #[test]
    fn callbacks_skip_holes() {
        let mut realm = Realm::new();
        let arr = realm.create_array(nums(&[1.0, 2.0, 3.0])).unwrap();
        realm.delete(arr, &PropertyKey::from(1u32), true).unwrap();
        let double = realm.create_native_function("double", 1, |_, _, args| {
            Ok(num(args[0].as_number().unwrap_or(0.0) * 2.0))
        });
        let mapped = realm.array_map(arr, &double.into(), &JsValue::Undefined).unwrap();
        assert_eq!(contents(&mut realm, mapped), vec![Some(2.0), None, Some(6.0)]);
        assert!(!realm.has_property(mapped, &PropertyKey::from(1u32)).unwrap());

        let add = realm.create_native_function("add", 2, |_, _, args| {
            Ok(num(args[0].as_number().unwrap() + args[1].as_number().unwrap()))
        });
        let sum = realm.array_reduce(arr, &add.into(), None).unwrap();
        assert_eq!(sum.as_number(), Some(4.0));

        let empty = realm.create_array(Vec::new()).unwrap();
        assert!(matches!(
            realm.array_reduce(empty, &add.into(), None),
            Err(JsError::TypeError(_))
        ));
    }

    #[test]
    fn search_functions() {
        let mut realm = Realm::new();
        let arr = realm
            .create_array(vec![num(1.0), num(f64::NAN), num(1.0)])
            .unwrap();
        assert_eq!(realm.array_index_of(arr, &num(1.0), &JsValue::Undefined).unwrap(), 0.0);
        assert_eq!(realm.array_last_index_of(arr, &num(1.0), None).unwrap(), 2.0);
        assert_eq!(realm.array_index_of(arr, &num(f64::NAN), &JsValue::Undefined).unwrap(), -1.0);
        assert!(realm.array_includes(arr, &num(f64::NAN), &JsValue::Undefined).unwrap());
    }

    #[test]
    fn join_reverse_fill() {
        let mut realm = Realm::new();
        let arr = realm
            .create_array(vec![num(1.0), JsValue::Null, JsValue::str("x")])
            .unwrap();
        let joined = realm.array_join(arr, &JsValue::Undefined).unwrap();
        assert_eq!(joined.to_rust_string(), "1,,x");
        realm.array_reverse(arr).unwrap();
        let joined = realm.array_join(arr, &JsValue::str("-")).unwrap();
        assert_eq!(joined.to_rust_string(), "x--1");
        realm.array_fill(arr, &num(0.0), &num(1.0), &JsValue::Undefined).unwrap();
        assert_eq!(realm.array_join(arr, &JsValue::Undefined).unwrap().to_rust_string(), "x,0,0");
    }
}
