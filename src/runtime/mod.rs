//! The runtime core: a [`Realm`] owns the object arena, the root property
//! map, the builtin registry and the well-known symbols. Every object
//! operation is a method on the realm taking a [`JsObject`] handle.

pub mod array;
pub mod array_buffer;
pub mod array_storage;
pub mod builtins;
pub mod collections;
pub mod data_view;
pub mod gc;
pub(crate) mod helpers;
pub mod host;
pub mod iterators;
pub mod linked_map;
pub mod object;
pub mod property_map;
pub mod registry;
pub mod typed_array;
pub mod types;

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{JsError, JsResult};
use crate::types::{JsObject, JsString, JsSymbol, JsValue, PropertyKey, number_ops};
use array_storage::{ArrayStorage, DEFAULT_SPARSE_GAP};
use linked_map::DEFAULT_COMPACTION_THRESHOLD;
use property_map::{PropertyAttributes, PropertyMap};
use registry::BuiltinRegistry;
use types::{JsFunction, JsObjectData, NativeFn, ObjectKind, PropertyValue};

/// Tunables for a realm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealmConfig {
    /// Longest prototype chain a lookup will walk before giving up with a
    /// RangeError.
    pub max_prototype_depth: usize,
    /// How far past the end of an array a write may land before the element
    /// store switches to the sparse representation.
    pub sparse_gap_threshold: u32,
    /// Tombstones a Map/Set tolerates before compaction is considered.
    pub linked_map_compaction_threshold: usize,
    /// Upper bound on array `length`.
    pub max_array_length: u32,
}

impl Default for RealmConfig {
    fn default() -> Self {
        Self {
            max_prototype_depth: 10_000,
            sparse_gap_threshold: DEFAULT_SPARSE_GAP,
            linked_map_compaction_threshold: DEFAULT_COMPACTION_THRESHOLD,
            max_array_length: u32::MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredType {
    Number,
    String,
}

pub struct Realm {
    pub(crate) config: RealmConfig,
    pub(crate) objects: Vec<Option<Rc<RefCell<JsObjectData>>>>,
    pub(crate) free_list: Vec<usize>,
    pub(crate) root_map: Rc<PropertyMap>,
    pub(crate) global: JsObject,
    pub(crate) object_prototype: JsObject,
    pub(crate) function_prototype: JsObject,
    pub(crate) registry: BuiltinRegistry,
    next_symbol_id: u64,
    pub(crate) symbol_iterator: JsSymbol,
    pub(crate) symbol_to_string_tag: JsSymbol,
    /// The `next` functions of the built-in iterator prototypes.
    pub(crate) intrinsic_next: Vec<JsObject>,
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

impl Realm {
    pub fn new() -> Self {
        Self::with_config(RealmConfig::default())
    }

    pub fn with_config(config: RealmConfig) -> Self {
        let placeholder = JsObject { id: 0 };
        let well_known = |id: u64, name: &str| JsSymbol {
            id,
            description: Some(JsString::from_str(name)),
        };
        let mut realm = Realm {
            config,
            objects: Vec::new(),
            free_list: Vec::new(),
            root_map: PropertyMap::root(),
            global: placeholder,
            object_prototype: placeholder,
            function_prototype: placeholder,
            registry: BuiltinRegistry::default(),
            next_symbol_id: 3,
            symbol_iterator: well_known(1, "Symbol.iterator"),
            symbol_to_string_tag: well_known(2, "Symbol.toStringTag"),
            intrinsic_next: Vec::new(),
        };
        realm.object_prototype = realm.allocate(None, ObjectKind::Ordinary);
        let noop = JsFunction::native("", 0, |_, _, _| Ok(JsValue::Undefined));
        realm.function_prototype =
            realm.allocate(Some(realm.object_prototype), ObjectKind::Function(noop));
        realm.global = realm.allocate(Some(realm.object_prototype), ObjectKind::Global);
        builtins::setup_globals(&mut realm);
        realm
    }

    pub fn config(&self) -> &RealmConfig {
        &self.config
    }

    pub fn global(&self) -> JsObject {
        self.global
    }

    pub fn object_prototype(&self) -> JsObject {
        self.object_prototype
    }

    pub fn function_prototype(&self) -> JsObject {
        self.function_prototype
    }

    pub fn symbol_iterator(&self) -> JsSymbol {
        self.symbol_iterator.clone()
    }

    pub fn symbol_to_string_tag(&self) -> JsSymbol {
        self.symbol_to_string_tag.clone()
    }

    pub fn new_symbol(&mut self, description: Option<JsString>) -> JsSymbol {
        let id = self.next_symbol_id;
        self.next_symbol_id += 1;
        JsSymbol { id, description }
    }

    pub fn get_object(&self, id: u64) -> Option<Rc<RefCell<JsObjectData>>> {
        self.objects.get(id as usize).and_then(|slot| slot.clone())
    }

    pub(crate) fn obj_data(&self, obj: JsObject) -> JsResult<Rc<RefCell<JsObjectData>>> {
        self.get_object(obj.id)
            .ok_or_else(|| JsError::reference_error(format!("object #{} was collected", obj.id)))
    }

    pub(crate) fn allocate_object_slot(&mut self, mut data: JsObjectData) -> JsObject {
        let id = if let Some(idx) = self.free_list.pop() {
            idx as u64
        } else {
            self.objects.push(None);
            (self.objects.len() - 1) as u64
        };
        data.id = id;
        self.objects[id as usize] = Some(Rc::new(RefCell::new(data)));
        JsObject { id }
    }

    pub(crate) fn allocate(&mut self, prototype: Option<JsObject>, kind: ObjectKind) -> JsObject {
        let mut data = JsObjectData::new(0, Rc::clone(&self.root_map), prototype, kind);
        if let Some(elements) = data.elements.take() {
            data.elements = Some(elements.with_gap_limit(self.config.sparse_gap_threshold));
        }
        self.allocate_object_slot(data)
    }

    /// A plain object inheriting from `Object.prototype`.
    pub fn create_object(&mut self) -> JsObject {
        self.allocate(Some(self.object_prototype), ObjectKind::Ordinary)
    }

    pub fn create_object_with_proto(&mut self, prototype: Option<JsObject>) -> JsObject {
        self.allocate(prototype, ObjectKind::Ordinary)
    }

    /// An Array holding `values`, stored in the narrowest representation.
    pub fn create_array(&mut self, values: Vec<JsValue>) -> JsResult<JsObject> {
        self.create_array_from_storage(ArrayStorage::from_values(values))
    }

    pub(crate) fn create_array_from_storage(&mut self, storage: ArrayStorage) -> JsResult<JsObject> {
        let proto = self.builtin_prototype("Array")?;
        let obj = self.allocate(Some(proto), ObjectKind::Array);
        let gap = self.config.sparse_gap_threshold;
        self.obj_data(obj)?.borrow_mut().elements = Some(storage.with_gap_limit(gap));
        Ok(obj)
    }

    pub fn create_function(&mut self, func: JsFunction) -> JsObject {
        let name = JsValue::str(func.name());
        let arity = func.arity();
        let obj = self.allocate(Some(self.function_prototype), ObjectKind::Function(func));
        let attrs = PropertyAttributes::data(false, false, true);
        self.insert_property(obj, "length", JsValue::Number(arity as f64), attrs);
        self.insert_property(obj, "name", name, attrs);
        obj
    }

    pub fn create_native_function(
        &mut self,
        name: &str,
        arity: usize,
        f: impl Fn(&mut Realm, &JsValue, &[JsValue]) -> JsResult<JsValue> + 'static,
    ) -> JsObject {
        self.create_function(JsFunction::native(name, arity, f))
    }

    /// A constructor function wired to `prototype` in both directions.
    pub(crate) fn create_constructor(
        &mut self,
        name: &str,
        arity: usize,
        call: NativeFn,
        construct: NativeFn,
        prototype: JsObject,
    ) -> JsObject {
        let ctor = self.create_function(JsFunction::Constructor {
            name: name.to_string(),
            arity,
            call,
            construct,
        });
        self.insert_property(
            ctor,
            "prototype",
            prototype.into(),
            PropertyAttributes::data(false, false, false),
        );
        self.insert_builtin(prototype, "constructor", ctor.into());
        ctor
    }

    /// Installs a property without any checks. Used while building builtins.
    pub(crate) fn insert_property(
        &mut self,
        obj: JsObject,
        key: impl Into<PropertyKey>,
        value: JsValue,
        attributes: PropertyAttributes,
    ) {
        if let Some(data) = self.get_object(obj.id) {
            data.borrow_mut()
                .add_named(key.into(), attributes, PropertyValue::Data(value));
        }
    }

    /// Installs a builtin: writable, non-enumerable, configurable, and marked
    /// so that overwriting it invalidates its switchpoint.
    pub(crate) fn insert_builtin(&mut self, obj: JsObject, key: impl Into<PropertyKey>, value: JsValue) {
        self.insert_property(obj, key, value, PropertyAttributes::BUILTIN_METHOD);
    }

    pub(crate) fn insert_builtin_fn(
        &mut self,
        obj: JsObject,
        name: &str,
        arity: usize,
        f: impl Fn(&mut Realm, &JsValue, &[JsValue]) -> JsResult<JsValue> + 'static,
    ) -> JsObject {
        let func = self.create_native_function(name, arity, f);
        self.insert_builtin(obj, name, func.into());
        func
    }

    pub(crate) fn insert_builtin_getter(
        &mut self,
        obj: JsObject,
        key: impl Into<PropertyKey>,
        name: &str,
        f: impl Fn(&mut Realm, &JsValue, &[JsValue]) -> JsResult<JsValue> + 'static,
    ) {
        let getter = self.create_native_function(&format!("get {name}"), 0, f);
        if let Some(data) = self.get_object(obj.id) {
            data.borrow_mut().add_named(
                key.into(),
                PropertyAttributes::accessor(false, true),
                PropertyValue::Accessor {
                    get: getter.into(),
                    set: JsValue::Undefined,
                },
            );
        }
    }

    pub fn is_callable(&self, value: &JsValue) -> bool {
        value
            .as_object()
            .and_then(|o| self.get_object(o.id))
            .is_some_and(|data| data.borrow().is_callable())
    }

    pub fn is_constructor(&self, value: &JsValue) -> bool {
        value
            .as_object()
            .and_then(|o| self.get_object(o.id))
            .is_some_and(|data| {
                matches!(
                    data.borrow().kind,
                    ObjectKind::Function(JsFunction::Constructor { .. })
                )
            })
    }

    fn function_of(&self, value: &JsValue) -> Option<JsFunction> {
        let data = self.get_object(value.as_object()?.id)?;
        let data = data.borrow();
        match &data.kind {
            ObjectKind::Function(f) => Some(f.clone()),
            _ => None,
        }
    }

    /// Invokes `func` with `this` and `args`. Errors thrown by the callee
    /// propagate unchanged.
    pub fn call(&mut self, func: &JsValue, this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        match self.function_of(func) {
            Some(JsFunction::Native(_, _, f)) => f(self, this, args),
            Some(JsFunction::Constructor { call, .. }) => call(self, this, args),
            None => Err(JsError::type_error(format!(
                "{} is not a function",
                self.describe(func)
            ))),
        }
    }

    pub fn construct(&mut self, func: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        match self.function_of(func) {
            Some(JsFunction::Constructor { construct, .. }) => {
                construct(self, &JsValue::Undefined, args)
            }
            _ => Err(JsError::type_error(format!(
                "{} is not a constructor",
                self.describe(func)
            ))),
        }
    }

    /// Short description of a value for error messages.
    pub(crate) fn describe(&self, value: &JsValue) -> String {
        match value {
            JsValue::String(s) => format!("\"{s}\""),
            JsValue::Object(o) => match self.get_object(o.id) {
                Some(data) => match &data.borrow().kind {
                    ObjectKind::Function(f) => format!("function {}", f.name()),
                    _ => format!("#<{}>", data.borrow().class_name),
                },
                None => "#<collected>".to_string(),
            },
            other => format!("{other}"),
        }
    }

    // §7.1.1 ToPrimitive
    pub fn to_primitive(&mut self, value: &JsValue, hint: PreferredType) -> JsResult<JsValue> {
        let Some(obj) = value.as_object() else {
            return Ok(value.clone());
        };
        if let ObjectKind::Primitive(inner) = &self.obj_data(obj)?.borrow().kind {
            return Ok(inner.clone());
        }
        let order = match hint {
            PreferredType::String => ["toString", "valueOf"],
            PreferredType::Number => ["valueOf", "toString"],
        };
        for name in order {
            let method = self.get(obj, &PropertyKey::from(name))?;
            if self.is_callable(&method) {
                let result = self.call(&method, value, &[])?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
        Err(JsError::type_error("Cannot convert object to primitive value"))
    }

    pub fn to_number(&mut self, value: &JsValue) -> JsResult<f64> {
        let primitive = self.to_primitive(value, PreferredType::Number)?;
        helpers::to_number(&primitive)
    }

    pub fn to_js_string(&mut self, value: &JsValue) -> JsResult<JsString> {
        let primitive = self.to_primitive(value, PreferredType::String)?;
        helpers::to_js_string(&primitive)
    }

    pub fn to_property_key(&mut self, value: &JsValue) -> JsResult<PropertyKey> {
        let primitive = self.to_primitive(value, PreferredType::String)?;
        helpers::to_property_key(&primitive)
    }

    // §7.1.18 ToObject
    pub fn to_object(&mut self, value: &JsValue) -> JsResult<JsObject> {
        match value {
            JsValue::Object(o) => Ok(*o),
            JsValue::Undefined | JsValue::Null => Err(JsError::type_error(format!(
                "Cannot convert {value} to object"
            ))),
            primitive => {
                let proto = match primitive {
                    JsValue::String(_) => self.builtin_prototype("String")?,
                    JsValue::Symbol(_) => self.builtin_prototype("Symbol")?,
                    _ => self.object_prototype,
                };
                Ok(self.allocate(Some(proto), ObjectKind::Primitive(primitive.clone())))
            }
        }
    }

    // §7.3.18 LengthOfArrayLike
    pub fn length_of_array_like(&mut self, obj: JsObject) -> JsResult<f64> {
        let len = self.get(obj, &PropertyKey::from("length"))?;
        let len = helpers::to_integer_or_infinity(self.to_number(&len)?);
        Ok(len.clamp(0.0, number_ops::MAX_SAFE_INTEGER))
    }

    /// Number of live objects in the arena.
    pub fn object_count(&self) -> usize {
        self.objects.iter().filter(|slot| slot.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_links_prototypes() {
        let mut realm = Realm::new();
        let f = realm.create_native_function("f", 2, |_, _, _| Ok(JsValue::Null));
        assert_eq!(realm.get_prototype_of(f).unwrap(), Some(realm.function_prototype()));
        assert_eq!(
            realm.get_prototype_of(realm.function_prototype()).unwrap(),
            Some(realm.object_prototype())
        );
        assert_eq!(realm.get_prototype_of(realm.object_prototype()).unwrap(), None);
        assert!(matches!(
            realm.get(f, &PropertyKey::from("length")).unwrap(),
            JsValue::Number(n) if n == 2.0
        ));
    }

    #[test]
    fn call_propagates_errors() {
        let mut realm = Realm::new();
        let f = realm.create_native_function("boom", 0, |_, _, _| {
            Err(JsError::Throw(JsValue::str("boom")))
        });
        let err = realm.call(&f.into(), &JsValue::Undefined, &[]).unwrap_err();
        assert!(matches!(err, JsError::Throw(JsValue::String(_))));

        let not_fn = realm.create_object();
        let err = realm
            .call(&not_fn.into(), &JsValue::Undefined, &[])
            .unwrap_err();
        assert!(matches!(err, JsError::TypeError(_)));
    }

    #[test]
    fn call_passes_this_and_args() {
        let mut realm = Realm::new();
        let f = realm.create_native_function("pick", 2, |_, this, args| {
            Ok(if this.is_undefined() {
                args.get(1).cloned().unwrap_or(JsValue::Undefined)
            } else {
                this.clone()
            })
        });
        let result = realm
            .call(
                &f.into(),
                &JsValue::Undefined,
                &[JsValue::Number(1.0), JsValue::Number(2.0)],
            )
            .unwrap();
        assert!(matches!(result, JsValue::Number(n) if n == 2.0));
    }

    #[test]
    fn primitive_conversion_uses_value_of() {
        let mut realm = Realm::new();
        let obj = realm.create_object();
        let value_of = realm.create_native_function("valueOf", 0, |_, _, _| Ok(JsValue::Number(7.0)));
        realm
            .set(obj, &PropertyKey::from("valueOf"), value_of.into(), true)
            .unwrap();
        assert_eq!(realm.to_number(&obj.into()).unwrap(), 7.0);
    }

    #[test]
    fn with_config_applies_gap_threshold() {
        let config = RealmConfig {
            sparse_gap_threshold: 4,
            ..RealmConfig::default()
        };
        let mut realm = Realm::with_config(config);
        let arr = realm.create_array(vec![JsValue::Number(1.0)]).unwrap();
        realm
            .set(arr, &PropertyKey::from(10u32), JsValue::Number(2.0), true)
            .unwrap();
        assert_eq!(
            realm.element_kind(arr).unwrap(),
            Some(array_storage::ElementKind::Sparse)
        );
    }
}
