//! Object internal methods (§10.1) and the Array (§10.4.2), String
//! (§10.4.3) and integer-indexed (§10.4.5) exotic overrides.
//!
//! Named properties live in the object's property map and slot vector.
//! Array elements live in `ArrayStorage` as long as they carry the default
//! element attributes; an index defined with anything else moves into the
//! property map and leaves a hole behind.

use tracing::debug;

use super::Realm;
use super::array_storage::ElementKind;
use super::helpers::{same_value, to_big_int};
use super::property_map::PropertyAttributes;
use super::typed_array::TypedArrayView;
use super::types::{IntegrityLevel, ObjectKind, PropertyDescriptor, PropertyValue};
use super::PreferredType;
use crate::error::{JsError, JsResult};
use crate::types::{JsBigInt, JsObject, JsString, JsValue, PropertyKey, number_ops};

fn key_is(key: &PropertyKey, name: &str) -> bool {
    matches!(key, PropertyKey::String(s) if s.code_units().iter().copied().eq(name.encode_utf16()))
}

// §10.4.5.14 IsValidIntegerIndex, for an already canonical numeric key.
fn typed_index(n: f64, length: usize) -> Option<usize> {
    if n.fract() != 0.0 || (n == 0.0 && n.is_sign_negative()) || n < 0.0 || n >= length as f64 {
        return None;
    }
    Some(n as usize)
}

fn reject(throw: bool, message: impl FnOnce() -> String) -> JsResult<bool> {
    if throw {
        Err(JsError::type_error(message()))
    } else {
        Ok(false)
    }
}

// §10.1.6.3 ValidateAndApplyPropertyDescriptor, validation half.
fn is_compatible(current: &PropertyDescriptor, desc: &PropertyDescriptor) -> bool {
    if current.configurable == Some(true) {
        return true;
    }
    if desc.configurable == Some(true) {
        return false;
    }
    if desc.enumerable.is_some_and(|e| Some(e) != current.enumerable) {
        return false;
    }
    if desc.is_generic() {
        return true;
    }
    if desc.is_accessor_descriptor() != current.is_accessor_descriptor() {
        return false;
    }
    let unchanged = |new: &Option<JsValue>, old: &Option<JsValue>| {
        new.as_ref()
            .is_none_or(|new| same_value(new, old.as_ref().unwrap_or(&JsValue::Undefined)))
    };
    if current.is_accessor_descriptor() {
        unchanged(&desc.get, &current.get) && unchanged(&desc.set, &current.set)
    } else if current.writable == Some(false) {
        desc.writable != Some(true) && unchanged(&desc.value, &current.value)
    } else {
        true
    }
}

// The apply half: fields absent from `desc` keep their current value, or
// default to false/undefined for a new property.
fn merge_descriptor(
    current: &PropertyDescriptor,
    desc: &PropertyDescriptor,
) -> (PropertyAttributes, PropertyValue) {
    let enumerable = desc.enumerable.or(current.enumerable).unwrap_or(false);
    let configurable = desc.configurable.or(current.configurable).unwrap_or(false);
    let accessor = if desc.is_generic() {
        current.is_accessor_descriptor()
    } else {
        desc.is_accessor_descriptor()
    };
    if accessor {
        let keep = current.is_accessor_descriptor();
        let pick = |new: &Option<JsValue>, old: &Option<JsValue>| {
            new.clone()
                .or_else(|| if keep { old.clone() } else { None })
                .unwrap_or(JsValue::Undefined)
        };
        (
            PropertyAttributes::accessor(enumerable, configurable),
            PropertyValue::Accessor {
                get: pick(&desc.get, &current.get),
                set: pick(&desc.set, &current.set),
            },
        )
    } else {
        let keep = current.is_data_descriptor();
        let writable = desc
            .writable
            .or(if keep { current.writable } else { None })
            .unwrap_or(false);
        let value = desc
            .value
            .clone()
            .or_else(|| if keep { current.value.clone() } else { None })
            .unwrap_or(JsValue::Undefined);
        (
            PropertyAttributes::data(writable, enumerable, configurable),
            PropertyValue::Data(value),
        )
    }
}

/// What kind of exotic behaviour an object has, detached from its borrow.
enum Exotic {
    Ordinary,
    Array,
    TypedArray(TypedArrayView),
    StringWrapper(JsString),
}

impl Realm {
    fn exotic(&self, obj: JsObject) -> JsResult<Exotic> {
        let data = self.obj_data(obj)?;
        let data = data.borrow();
        Ok(match &data.kind {
            ObjectKind::Array => Exotic::Array,
            ObjectKind::TypedArray { view, .. } => Exotic::TypedArray(view.clone()),
            ObjectKind::Primitive(JsValue::String(s)) => Exotic::StringWrapper(s.clone()),
            _ => Exotic::Ordinary,
        })
    }

    fn next_in_chain(&self, current: JsObject, depth: &mut usize) -> JsResult<Option<JsObject>> {
        *depth += 1;
        if *depth > self.config.max_prototype_depth {
            debug!(object = current.id, depth = *depth, "prototype chain too deep");
            return Err(JsError::range_error("Maximum prototype chain length exceeded"));
        }
        Ok(self.obj_data(current)?.borrow().prototype)
    }

    /// The raw own property: attributes and slot contents, without resolving
    /// lazy builtin bindings.
    pub(crate) fn peek_own(
        &self,
        obj: JsObject,
        key: &PropertyKey,
    ) -> JsResult<Option<(PropertyAttributes, PropertyValue)>> {
        let data = self.obj_data(obj)?;
        let data = data.borrow();
        match &data.kind {
            ObjectKind::TypedArray { view, .. } => {
                if let Some(n) = key.canonical_numeric_index() {
                    return Ok(typed_index(n, view.length())
                        .and_then(|i| view.get(i))
                        .map(|v| (PropertyAttributes::DEFAULT, PropertyValue::Data(v))));
                }
            }
            ObjectKind::Primitive(JsValue::String(s)) => {
                if key_is(key, "length") {
                    return Ok(Some((
                        PropertyAttributes::data(false, false, false),
                        PropertyValue::Data(JsValue::Number(s.len() as f64)),
                    )));
                }
                if let Some(i) = key.array_index()
                    && (i as usize) < s.len()
                {
                    let i = i as usize;
                    return Ok(Some((
                        PropertyAttributes::data(false, true, false),
                        PropertyValue::Data(JsValue::String(s.slice_utf16(i, i + 1))),
                    )));
                }
            }
            _ => {}
        }
        if let Some(elements) = &data.elements {
            if let Some(index) = key.array_index()
                && let Some(value) = elements.get(index)
            {
                return Ok(Some((data.element_attributes(), PropertyValue::Data(value))));
            }
            if key_is(key, "length") {
                return Ok(Some((
                    PropertyAttributes::data(data.length_writable, false, false),
                    PropertyValue::Data(JsValue::Number(f64::from(elements.length()))),
                )));
            }
        }
        Ok(data.own_named(key).map(|(attrs, value)| (attrs, value.clone())))
    }

    // §10.1.5 [[GetOwnProperty]]
    pub fn get_own_property(
        &mut self,
        obj: JsObject,
        key: &PropertyKey,
    ) -> JsResult<Option<PropertyDescriptor>> {
        let Some((attrs, value)) = self.peek_own(obj, key)? else {
            return Ok(None);
        };
        let value = match value {
            PropertyValue::LazyBuiltin => PropertyValue::Data(self.resolve_lazy_binding(obj, key)?),
            other => other,
        };
        Ok(Some(PropertyDescriptor::from_slot(attrs, &value)))
    }

    fn resolve_lazy_binding(&mut self, obj: JsObject, key: &PropertyKey) -> JsResult<JsValue> {
        let PropertyKey::String(name) = key else {
            return Ok(JsValue::Undefined);
        };
        let objects = self.builtin_objects(&name.to_rust_string())?;
        let value = objects
            .constructor
            .or(objects.prototype)
            .map_or(JsValue::Undefined, JsValue::from);
        let data = self.obj_data(obj)?;
        let mut data = data.borrow_mut();
        if matches!(data.own_named(key), Some((_, PropertyValue::LazyBuiltin))) {
            data.set_slot(key, PropertyValue::Data(value.clone()))?;
        }
        Ok(value)
    }

    // §10.1.8 [[Get]]
    pub fn get(&mut self, obj: JsObject, key: &PropertyKey) -> JsResult<JsValue> {
        self.get_with_receiver(obj, key, &JsValue::Object(obj))
    }

    /// `[[Get]]` with an explicit receiver; getters run with `receiver` as
    /// `this`.
    pub fn get_with_receiver(
        &mut self,
        obj: JsObject,
        key: &PropertyKey,
        receiver: &JsValue,
    ) -> JsResult<JsValue> {
        let mut current = obj;
        let mut depth = 0;
        loop {
            if let Some(desc) = self.get_own_property(current, key)? {
                if desc.is_accessor_descriptor() {
                    return match desc.get {
                        Some(getter) if !getter.is_undefined() => self.call(&getter, receiver, &[]),
                        _ => Ok(JsValue::Undefined),
                    };
                }
                return Ok(desc.value.unwrap_or(JsValue::Undefined));
            }
            if let Exotic::TypedArray(_) = self.exotic(current)?
                && key.canonical_numeric_index().is_some()
            {
                return Ok(JsValue::Undefined);
            }
            match self.next_in_chain(current, &mut depth)? {
                Some(proto) => current = proto,
                None => return Ok(JsValue::Undefined),
            }
        }
    }

    /// Property lookup on any value. Primitives other than null and
    /// undefined look through their wrapper's prototype.
    pub fn get_value(&mut self, base: &JsValue, key: &PropertyKey) -> JsResult<JsValue> {
        let proto = match base {
            JsValue::Object(obj) => return self.get(*obj, key),
            JsValue::Undefined | JsValue::Null => {
                return Err(JsError::type_error(format!(
                    "Cannot read properties of {base} (reading '{key}')"
                )));
            }
            JsValue::String(s) => {
                if key_is(key, "length") {
                    return Ok(JsValue::Number(s.len() as f64));
                }
                if let Some(i) = key.array_index()
                    && (i as usize) < s.len()
                {
                    let i = i as usize;
                    return Ok(JsValue::String(s.slice_utf16(i, i + 1)));
                }
                self.builtin_prototype("String")?
            }
            JsValue::Symbol(_) => self.builtin_prototype("Symbol")?,
            _ => self.object_prototype,
        };
        self.get_with_receiver(proto, key, base)
    }

    /// `GetMethod`: `None` for undefined/null, TypeError when not callable.
    pub fn get_method(&mut self, base: &JsValue, key: &PropertyKey) -> JsResult<Option<JsValue>> {
        let func = self.get_value(base, key)?;
        if func.is_nullish() {
            return Ok(None);
        }
        if !self.is_callable(&func) {
            return Err(JsError::type_error(format!("{key} is not a function")));
        }
        Ok(Some(func))
    }

    pub fn invoke(&mut self, base: &JsValue, key: &PropertyKey, args: &[JsValue]) -> JsResult<JsValue> {
        let func = self.get_value(base, key)?;
        self.call(&func, base, args)
    }

    // §10.1.9 [[Set]]
    pub fn set(
        &mut self,
        obj: JsObject,
        key: &PropertyKey,
        value: JsValue,
        strict: bool,
    ) -> JsResult<bool> {
        self.set_with_receiver(obj, key, value, &JsValue::Object(obj), strict)
    }

    /// `[[Set]]` with an explicit receiver. A failed assignment is a
    /// TypeError in strict mode and `Ok(false)` otherwise.
    pub fn set_with_receiver(
        &mut self,
        obj: JsObject,
        key: &PropertyKey,
        value: JsValue,
        receiver: &JsValue,
        strict: bool,
    ) -> JsResult<bool> {
        let same_receiver = receiver.as_object() == Some(obj);
        if same_receiver && let Some(index) = key.array_index() {
            let data = self.obj_data(obj)?;
            let mut guard = data.borrow_mut();
            let data = &mut *guard;
            if data.elements_integrity == IntegrityLevel::None
                && let Some(elements) = data.elements.as_mut()
                && elements.has(index)
            {
                elements.set(index, value);
                return Ok(true);
            }
        }

        let mut current = obj;
        let mut depth = 0;
        let own_desc = loop {
            if let Exotic::TypedArray(view) = self.exotic(current)?
                && let Some(n) = key.canonical_numeric_index()
            {
                if receiver.as_object() == Some(current) {
                    self.typed_array_set_element(&view, n, &value)?;
                    return Ok(true);
                }
                if typed_index(n, view.length()).is_none() {
                    return Ok(true);
                }
            }
            if let Some(desc) = self.get_own_property(current, key)? {
                break Some(desc);
            }
            match self.next_in_chain(current, &mut depth)? {
                Some(proto) => current = proto,
                None => break None,
            }
        };

        if let Some(desc) = &own_desc {
            if desc.is_accessor_descriptor() {
                let setter = desc.set.clone().unwrap_or(JsValue::Undefined);
                if setter.is_undefined() {
                    return reject(strict, || {
                        format!("Cannot set property {key} which has only a getter")
                    });
                }
                self.call(&setter, receiver, &[value])?;
                return Ok(true);
            }
            if desc.writable == Some(false) {
                return reject(strict, || {
                    format!("Cannot assign to read only property '{key}'")
                });
            }
        }

        let Some(target) = receiver.as_object() else {
            return reject(strict, || {
                format!("Cannot create property '{key}' on {receiver}")
            });
        };
        match self.get_own_property(target, key)? {
            Some(existing) => {
                if existing.is_accessor_descriptor() || existing.writable == Some(false) {
                    return reject(strict, || {
                        format!("Cannot assign to read only property '{key}'")
                    });
                }
                self.define_own_property(target, key, PropertyDescriptor::value_only(value), strict)
            }
            None => self.define_own_property(
                target,
                key,
                PropertyDescriptor::data_default(value),
                strict,
            ),
        }
    }

    // §10.4.5.16 TypedArraySetElement
    fn typed_array_set_element(&mut self, view: &TypedArrayView, n: f64, value: &JsValue) -> JsResult<()> {
        let converted = if view.kind().is_bigint() {
            let primitive = self.to_primitive(value, PreferredType::Number)?;
            JsValue::BigInt(JsBigInt {
                value: to_big_int(&primitive)?,
            })
        } else {
            JsValue::Number(self.to_number(value)?)
        };
        if let Some(index) = typed_index(n, view.length()) {
            view.set(index, &converted)?;
        }
        Ok(())
    }

    // §10.1.7 [[HasProperty]]
    pub fn has_property(&mut self, obj: JsObject, key: &PropertyKey) -> JsResult<bool> {
        let mut current = obj;
        let mut depth = 0;
        loop {
            if self.peek_own(current, key)?.is_some() {
                return Ok(true);
            }
            if let Exotic::TypedArray(_) = self.exotic(current)?
                && key.canonical_numeric_index().is_some()
            {
                return Ok(false);
            }
            match self.next_in_chain(current, &mut depth)? {
                Some(proto) => current = proto,
                None => return Ok(false),
            }
        }
    }

    pub fn has_own_property(&mut self, obj: JsObject, key: &PropertyKey) -> JsResult<bool> {
        Ok(self.peek_own(obj, key)?.is_some())
    }

    // §10.1.10 [[Delete]]
    pub fn delete(&mut self, obj: JsObject, key: &PropertyKey, strict: bool) -> JsResult<bool> {
        match self.exotic(obj)? {
            Exotic::TypedArray(view) => {
                if let Some(n) = key.canonical_numeric_index() {
                    return if typed_index(n, view.length()).is_some() {
                        self.reject_delete(obj, key, strict)
                    } else {
                        Ok(true)
                    };
                }
            }
            Exotic::StringWrapper(s) => {
                if key_is(key, "length") || key.array_index().is_some_and(|i| (i as usize) < s.len()) {
                    return self.reject_delete(obj, key, strict);
                }
            }
            Exotic::Array => {
                if key_is(key, "length") {
                    return self.reject_delete(obj, key, strict);
                }
                if let Some(index) = key.array_index() {
                    let data = self.obj_data(obj)?;
                    let mut guard = data.borrow_mut();
                    let data = &mut *guard;
                    if let Some(elements) = data.elements.as_mut()
                        && elements.has(index)
                    {
                        if data.elements_integrity != IntegrityLevel::None {
                            drop(guard);
                            return self.reject_delete(obj, key, strict);
                        }
                        elements.delete(index);
                        return Ok(true);
                    }
                }
            }
            Exotic::Ordinary => {}
        }

        let data = self.obj_data(obj)?;
        let mut data = data.borrow_mut();
        let Some((attrs, _)) = data.own_named(key) else {
            return Ok(true);
        };
        if !attrs.configurable {
            drop(data);
            return self.reject_delete(obj, key, strict);
        }
        if attrs.builtin {
            self.invalidate(&self.switchpoint_name(obj, key));
        }
        data.remove_named(key);
        Ok(true)
    }

    fn reject_delete(&self, obj: JsObject, key: &PropertyKey, strict: bool) -> JsResult<bool> {
        reject(strict, || {
            format!(
                "Cannot delete property '{key}' of {}",
                self.describe(&JsValue::Object(obj))
            )
        })
    }

    // §10.1.6 [[DefineOwnProperty]]
    pub fn define_own_property(
        &mut self,
        obj: JsObject,
        key: &PropertyKey,
        desc: PropertyDescriptor,
        throw: bool,
    ) -> JsResult<bool> {
        match self.exotic(obj)? {
            Exotic::Array => {
                if key_is(key, "length") {
                    return self.array_set_length(obj, desc, throw);
                }
                if let Some(index) = key.array_index() {
                    return self.define_array_index(obj, index, key, desc, throw);
                }
            }
            Exotic::TypedArray(view) => {
                if let Some(n) = key.canonical_numeric_index() {
                    return self.define_typed_element(&view, n, key, desc, throw);
                }
            }
            Exotic::StringWrapper(_) | Exotic::Ordinary => {}
        }
        self.ordinary_define(obj, key, desc, throw)
    }

    pub fn define_property_or_throw(
        &mut self,
        obj: JsObject,
        key: &PropertyKey,
        desc: PropertyDescriptor,
    ) -> JsResult<()> {
        self.define_own_property(obj, key, desc, true).map(|_| ())
    }

    // §7.3.5 CreateDataProperty
    pub fn create_data_property(
        &mut self,
        obj: JsObject,
        key: &PropertyKey,
        value: JsValue,
    ) -> JsResult<bool> {
        self.define_own_property(obj, key, PropertyDescriptor::data_default(value), false)
    }

    pub fn create_data_property_or_throw(
        &mut self,
        obj: JsObject,
        key: &PropertyKey,
        value: JsValue,
    ) -> JsResult<()> {
        self.define_own_property(obj, key, PropertyDescriptor::data_default(value), true)
            .map(|_| ())
    }

    // §10.1.6.1 OrdinaryDefineOwnProperty
    fn ordinary_define(
        &mut self,
        obj: JsObject,
        key: &PropertyKey,
        desc: PropertyDescriptor,
        throw: bool,
    ) -> JsResult<bool> {
        let current = self.get_own_property(obj, key)?;
        let Some(current) = current else {
            if !self.obj_data(obj)?.borrow().extensible {
                return reject(throw, || {
                    format!("Cannot define property {key}, object is not extensible")
                });
            }
            let (attrs, value) = merge_descriptor(&PropertyDescriptor::default(), &desc);
            self.obj_data(obj)?
                .borrow_mut()
                .add_named(key.clone(), attrs, value);
            return Ok(true);
        };
        if !is_compatible(&current, &desc) {
            return reject(throw, || format!("Cannot redefine property: {key}"));
        }
        let (attrs, value) = merge_descriptor(&current, &desc);
        self.write_named(obj, key, attrs, value)?;
        Ok(true)
    }

    fn write_named(
        &mut self,
        obj: JsObject,
        key: &PropertyKey,
        mut attrs: PropertyAttributes,
        value: PropertyValue,
    ) -> JsResult<()> {
        let data = self.obj_data(obj)?;
        let mut data = data.borrow_mut();
        match data.own_named(key).map(|(old, _)| old) {
            Some(old) => {
                if old.builtin {
                    self.invalidate(&self.switchpoint_name(obj, key));
                }
                attrs.builtin = false;
                data.set_attributes(key, attrs)?;
                data.set_slot(key, value)?;
            }
            None => data.add_named(key.clone(), attrs, value),
        }
        Ok(())
    }

    // §10.4.2.1 [[DefineOwnProperty]] for an array index.
    fn define_array_index(
        &mut self,
        obj: JsObject,
        index: u32,
        key: &PropertyKey,
        desc: PropertyDescriptor,
        throw: bool,
    ) -> JsResult<bool> {
        let data = self.obj_data(obj)?;
        let (length, length_writable, in_storage, element_attrs, extensible, in_map) = {
            let data = data.borrow();
            (
                data.array_length(),
                data.length_writable,
                data.elements.as_ref().is_some_and(|e| e.has(index)),
                data.element_attributes(),
                data.extensible,
                data.own_named(key).is_some(),
            )
        };
        if index >= length && !length_writable {
            return reject(throw, || {
                format!("Cannot define index {index} past the read-only array length")
            });
        }

        if in_map {
            if !self.ordinary_define(obj, key, desc, throw)? {
                return Ok(false);
            }
        } else {
            let current = if in_storage {
                let value = data
                    .borrow()
                    .elements
                    .as_ref()
                    .and_then(|e| e.get(index))
                    .unwrap_or(JsValue::Undefined);
                PropertyDescriptor::from_slot(element_attrs, &PropertyValue::Data(value))
            } else {
                if !extensible {
                    return reject(throw, || {
                        format!("Cannot add property {index}, object is not extensible")
                    });
                }
                PropertyDescriptor::default()
            };
            if in_storage && !is_compatible(&current, &desc) {
                return reject(throw, || format!("Cannot redefine property: {index}"));
            }
            let (attrs, value) = merge_descriptor(&current, &desc);
            let mut guard = data.borrow_mut();
            let data = &mut *guard;
            let fits_storage = !attrs.accessor
                && attrs.writable == element_attrs.writable
                && attrs.enumerable == element_attrs.enumerable
                && attrs.configurable == element_attrs.configurable;
            match value {
                PropertyValue::Data(v) if fits_storage && data.elements.is_some() => {
                    if let Some(elements) = data.elements.as_mut() {
                        elements.set(index, v);
                    }
                }
                value => {
                    if in_storage && let Some(elements) = data.elements.as_mut() {
                        elements.delete(index);
                    }
                    data.add_named(key.clone(), attrs, value);
                }
            }
        }

        let mut data = data.borrow_mut();
        if let Some(elements) = data.elements.as_mut()
            && index >= elements.length()
        {
            elements.set_length(index + 1);
        }
        Ok(true)
    }

    // §10.4.2.4 ArraySetLength
    fn array_set_length(
        &mut self,
        obj: JsObject,
        desc: PropertyDescriptor,
        throw: bool,
    ) -> JsResult<bool> {
        let data = self.obj_data(obj)?;
        let (old_len, length_writable) = {
            let data = data.borrow();
            (data.array_length(), data.length_writable)
        };
        let current = PropertyDescriptor::data(
            JsValue::Number(f64::from(old_len)),
            length_writable,
            false,
            false,
        );

        let Some(value) = desc.value.clone() else {
            if !is_compatible(&current, &desc) {
                return reject(throw, || "Cannot redefine property: length".to_string());
            }
            if desc.writable == Some(false) {
                data.borrow_mut().length_writable = false;
            }
            return Ok(true);
        };

        let number = self.to_number(&value)?;
        let new_len = number_ops::to_uint32(number);
        if f64::from(new_len) != number || new_len > self.config.max_array_length {
            return Err(JsError::range_error("Invalid array length"));
        }
        let desc = PropertyDescriptor {
            value: Some(JsValue::Number(f64::from(new_len))),
            ..desc
        };
        if !is_compatible(&current, &desc) {
            return reject(throw, || "Cannot assign to read only property 'length'".to_string());
        }
        let make_read_only = desc.writable == Some(false);

        if new_len >= old_len {
            let mut data = data.borrow_mut();
            if let Some(elements) = data.elements.as_mut() {
                elements.set_length(new_len);
            }
            if make_read_only {
                data.length_writable = false;
            }
            return Ok(true);
        }

        // Elements are removed from the top down; the first one that cannot
        // be deleted stops the truncation just above it.
        let mut guard = data.borrow_mut();
        let data = &mut *guard;
        let mut blocker: Option<u32> = None;
        if data.elements_integrity >= IntegrityLevel::Sealed
            && let Some(elements) = &data.elements
        {
            blocker = elements
                .present_indices()
                .into_iter()
                .filter(|&i| i >= new_len)
                .max();
        }
        let mut named_indices = Vec::new();
        for prop in data.map.properties() {
            if let Some(i) = prop.key.array_index()
                && i >= new_len
            {
                if !prop.attributes.configurable {
                    blocker = blocker.max(Some(i));
                }
                named_indices.push((i, prop.key.clone()));
            }
        }
        let final_len = blocker.map_or(new_len, |b| b + 1);
        for (i, key) in named_indices {
            if i >= final_len {
                data.remove_named(&key);
            }
        }
        if let Some(elements) = data.elements.as_mut() {
            elements.set_length(final_len);
        }
        if make_read_only {
            data.length_writable = false;
        }
        match blocker {
            Some(index) => {
                drop(guard);
                reject(throw, || format!("Cannot delete array element {index}"))
            }
            None => Ok(true),
        }
    }

    // §10.4.5.3 [[DefineOwnProperty]] for integer-indexed keys.
    fn define_typed_element(
        &mut self,
        view: &TypedArrayView,
        n: f64,
        key: &PropertyKey,
        desc: PropertyDescriptor,
        throw: bool,
    ) -> JsResult<bool> {
        if typed_index(n, view.length()).is_none() {
            return reject(throw, || format!("Invalid typed array index {key}"));
        }
        if desc.configurable == Some(false)
            || desc.enumerable == Some(false)
            || desc.is_accessor_descriptor()
            || desc.writable == Some(false)
        {
            return reject(throw, || format!("Cannot redefine property: {key}"));
        }
        if let Some(value) = &desc.value {
            self.typed_array_set_element(view, n, value)?;
        }
        Ok(true)
    }

    // §10.1.11 [[OwnPropertyKeys]]
    /// Own keys in the language's order: integer indices ascending, then
    /// strings in insertion order, then symbols in insertion order.
    pub fn own_keys(
        &self,
        obj: JsObject,
        include_non_enumerable: bool,
    ) -> JsResult<Vec<PropertyKey>> {
        let data = self.obj_data(obj)?;
        let data = data.borrow();
        let mut indices: Vec<u32> = Vec::new();
        let mut length_key = false;
        match &data.kind {
            ObjectKind::TypedArray { view, .. } => {
                indices.extend((0..view.length()).map(|i| i as u32));
            }
            ObjectKind::Primitive(JsValue::String(s)) => {
                indices.extend((0..s.len()).map(|i| i as u32));
                length_key = true;
            }
            ObjectKind::Array => length_key = true,
            _ => {}
        }
        if let Some(elements) = &data.elements {
            indices.extend(elements.present_indices());
        }
        let mut strings = Vec::new();
        let mut symbols = Vec::new();
        for prop in data.map.properties() {
            if !include_non_enumerable && !prop.attributes.enumerable {
                continue;
            }
            match prop.key.array_index() {
                Some(i) => indices.push(i),
                None if prop.key.is_symbol() => symbols.push(prop.key.clone()),
                None => strings.push(prop.key.clone()),
            }
        }
        indices.sort_unstable();
        indices.dedup();

        let mut keys: Vec<PropertyKey> = indices.into_iter().map(PropertyKey::from).collect();
        if length_key && include_non_enumerable {
            keys.push(PropertyKey::from("length"));
        }
        keys.extend(strings);
        keys.extend(symbols);
        Ok(keys)
    }

    // §10.1.1 [[GetPrototypeOf]]
    pub fn get_prototype_of(&self, obj: JsObject) -> JsResult<Option<JsObject>> {
        Ok(self.obj_data(obj)?.borrow().prototype)
    }

    // §10.1.2 [[SetPrototypeOf]]
    /// Returns `Ok(false)` when the object is not extensible; a prototype
    /// that would close a cycle is a TypeError.
    pub fn set_prototype_of(&mut self, obj: JsObject, proto: Option<JsObject>) -> JsResult<bool> {
        let data = self.obj_data(obj)?;
        {
            let data = data.borrow();
            if data.prototype == proto {
                return Ok(true);
            }
            if !data.extensible {
                return Ok(false);
            }
        }
        let mut walk = proto;
        let mut depth = 0;
        while let Some(p) = walk {
            if p == obj {
                return Err(JsError::type_error("Cyclic __proto__ value"));
            }
            walk = self.next_in_chain(p, &mut depth)?;
        }
        data.borrow_mut().prototype = proto;
        Ok(true)
    }

    pub fn is_extensible(&self, obj: JsObject) -> JsResult<bool> {
        Ok(self.obj_data(obj)?.borrow().extensible)
    }

    pub fn prevent_extensions(&mut self, obj: JsObject) -> JsResult<bool> {
        self.obj_data(obj)?.borrow_mut().extensible = false;
        Ok(true)
    }

    pub fn seal(&mut self, obj: JsObject) -> JsResult<()> {
        self.set_integrity_level(obj, IntegrityLevel::Sealed)
    }

    /// Freezes `obj`. Freezing an already frozen object is a no-op.
    pub fn freeze(&mut self, obj: JsObject) -> JsResult<()> {
        self.set_integrity_level(obj, IntegrityLevel::Frozen)
    }

    // §7.3.15 SetIntegrityLevel
    fn set_integrity_level(&mut self, obj: JsObject, level: IntegrityLevel) -> JsResult<()> {
        if let Exotic::TypedArray(view) = self.exotic(obj)?
            && view.length() > 0
        {
            return Err(JsError::type_error(
                "Cannot freeze array buffer views with elements",
            ));
        }
        let data = self.obj_data(obj)?;
        let mut data = data.borrow_mut();
        data.extensible = false;
        data.elements_integrity = data.elements_integrity.max(level);
        if level == IntegrityLevel::Frozen && data.is_array() {
            data.length_writable = false;
        }
        let updates: Vec<(PropertyKey, PropertyAttributes)> = data
            .map
            .properties()
            .iter()
            .map(|prop| {
                let mut attrs = prop.attributes;
                attrs.configurable = false;
                if level == IntegrityLevel::Frozen && !attrs.accessor {
                    attrs.writable = false;
                }
                (prop.key.clone(), attrs)
            })
            .collect();
        for (key, attrs) in updates {
            data.set_attributes(&key, attrs)?;
        }
        Ok(())
    }

    pub fn is_sealed(&self, obj: JsObject) -> JsResult<bool> {
        self.test_integrity_level(obj, IntegrityLevel::Sealed)
    }

    pub fn is_frozen(&self, obj: JsObject) -> JsResult<bool> {
        self.test_integrity_level(obj, IntegrityLevel::Frozen)
    }

    // §7.3.16 TestIntegrityLevel
    fn test_integrity_level(&self, obj: JsObject, level: IntegrityLevel) -> JsResult<bool> {
        if self.is_extensible(obj)? {
            return Ok(false);
        }
        for key in self.own_keys(obj, true)? {
            let Some((attrs, _)) = self.peek_own(obj, &key)? else {
                continue;
            };
            if attrs.configurable {
                return Ok(false);
            }
            if level == IntegrityLevel::Frozen && !attrs.accessor && attrs.writable {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Current element representation of an array, `None` for other objects.
    pub fn element_kind(&self, obj: JsObject) -> JsResult<Option<ElementKind>> {
        Ok(self
            .obj_data(obj)?
            .borrow()
            .elements
            .as_ref()
            .map(|e| e.kind()))
    }

    /// Whether two objects currently share one property map.
    pub fn same_shape(&self, a: JsObject, b: JsObject) -> JsResult<bool> {
        let a = self.obj_data(a)?;
        let b = self.obj_data(b)?;
        Ok(std::rc::Rc::ptr_eq(&a.borrow().map, &b.borrow().map))
    }
}
