use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::Realm;
use super::array_buffer::ArrayBuffer;
use super::array_storage::ArrayStorage;
use super::data_view::DataView;
use super::linked_map::{Cursor, LinkedMap};
use super::property_map::{PropertyAttributes, PropertyMap};
use super::typed_array::TypedArrayView;
use crate::error::{JsError, JsResult};
use crate::types::{JsObject, JsString, JsValue, PropertyKey};

pub type NativeFn = Rc<dyn Fn(&mut Realm, &JsValue, &[JsValue]) -> JsResult<JsValue>>;

#[derive(Clone)]
pub enum JsFunction {
    Native(String, usize, NativeFn),
    /// A native that also answers `new`. The construct half receives the
    /// arguments and returns the freshly built object.
    Constructor {
        name: String,
        arity: usize,
        call: NativeFn,
        construct: NativeFn,
    },
}

impl JsFunction {
    pub fn native(
        name: impl Into<String>,
        arity: usize,
        f: impl Fn(&mut Realm, &JsValue, &[JsValue]) -> JsResult<JsValue> + 'static,
    ) -> Self {
        JsFunction::Native(name.into(), arity, Rc::new(f))
    }

    pub fn name(&self) -> &str {
        match self {
            JsFunction::Native(name, ..) | JsFunction::Constructor { name, .. } => name,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            JsFunction::Native(_, arity, _) | JsFunction::Constructor { arity, .. } => *arity,
        }
    }
}

impl std::fmt::Debug for JsFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsFunction::Native(name, arity, _) => {
                write!(f, "JsFunction::Native({name:?}, {arity})")
            }
            JsFunction::Constructor { name, arity, .. } => {
                write!(f, "JsFunction::Constructor({name:?}, {arity})")
            }
        }
    }
}

/// A (possibly partial) property descriptor, as passed to `defineProperty`.
/// Absent fields are `None`.
#[derive(Debug, Clone, Default)]
pub struct PropertyDescriptor {
    pub value: Option<JsValue>,
    pub writable: Option<bool>,
    pub get: Option<JsValue>,
    pub set: Option<JsValue>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            value: Some(value),
            writable: Some(writable),
            get: None,
            set: None,
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    pub fn data_default(value: JsValue) -> Self {
        Self::data(value, true, true, true)
    }

    pub fn accessor(get: JsValue, set: JsValue, enumerable: bool, configurable: bool) -> Self {
        Self {
            value: None,
            writable: None,
            get: Some(get),
            set: Some(set),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    /// Only `value`; the other fields keep whatever the property had.
    pub fn value_only(value: JsValue) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    pub fn is_generic(&self) -> bool {
        !self.is_data_descriptor() && !self.is_accessor_descriptor()
    }

    pub fn is_empty(&self) -> bool {
        self.is_generic() && self.enumerable.is_none() && self.configurable.is_none()
    }

    pub(crate) fn from_slot(attrs: PropertyAttributes, value: &PropertyValue) -> Self {
        match value {
            PropertyValue::Accessor { get, set } => {
                Self::accessor(get.clone(), set.clone(), attrs.enumerable, attrs.configurable)
            }
            PropertyValue::Data(v) => {
                Self::data(v.clone(), attrs.writable, attrs.enumerable, attrs.configurable)
            }
            PropertyValue::LazyBuiltin => Self::data(
                JsValue::Undefined,
                attrs.writable,
                attrs.enumerable,
                attrs.configurable,
            ),
        }
    }
}

/// What a property slot holds.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    Data(JsValue),
    Accessor { get: JsValue, set: JsValue },
    /// A global builtin binding whose constructor has not been created yet.
    LazyBuiltin,
}

/// Integrity applied uniformly to the elements held in an [`ArrayStorage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IntegrityLevel {
    None,
    Sealed,
    Frozen,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IteratorKind {
    Key,
    Value,
    KeyValue,
}

/// Weak-keyed table for WeakMap/WeakSet, keyed by object id. The collector
/// drops entries whose key did not survive.
pub type WeakTable = Rc<RefCell<FxHashMap<u64, JsValue>>>;

/// Source of a built-in iterator. The source is dropped once the iterator
/// reports `done`.
#[derive(Debug, Clone)]
pub enum IteratorState {
    Array {
        source: Option<JsObject>,
        index: u32,
        kind: IteratorKind,
    },
    String {
        string: Option<JsString>,
        position: usize,
    },
    Map {
        source: Option<(Rc<RefCell<LinkedMap>>, Cursor)>,
        kind: IteratorKind,
    },
    Set {
        source: Option<(Rc<RefCell<LinkedMap>>, Cursor)>,
        kind: IteratorKind,
    },
}

impl IteratorState {
    pub fn is_done(&self) -> bool {
        match self {
            IteratorState::Array { source, .. } => source.is_none(),
            IteratorState::String { string, .. } => string.is_none(),
            IteratorState::Map { source, .. } | IteratorState::Set { source, .. } => {
                source.is_none()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum ObjectKind {
    Ordinary,
    Array,
    Function(JsFunction),
    /// Boolean, Number, String, Symbol and BigInt wrapper objects.
    Primitive(JsValue),
    ArrayBuffer(ArrayBuffer),
    TypedArray {
        view: TypedArrayView,
        buffer: JsObject,
    },
    DataView {
        view: DataView,
        buffer: JsObject,
    },
    Map(Rc<RefCell<LinkedMap>>),
    Set(Rc<RefCell<LinkedMap>>),
    WeakMap(WeakTable),
    WeakSet(WeakTable),
    Iterator(IteratorState),
    Global,
}

pub struct JsObjectData {
    pub id: u64,
    pub map: Rc<PropertyMap>,
    /// One value per property of `map`, indexed by slot.
    pub slots: Vec<PropertyValue>,
    pub prototype: Option<JsObject>,
    pub elements: Option<ArrayStorage>,
    pub elements_integrity: IntegrityLevel,
    pub length_writable: bool,
    pub extensible: bool,
    pub class_name: String,
    pub kind: ObjectKind,
}

impl JsObjectData {
    pub(crate) fn new(
        id: u64,
        map: Rc<PropertyMap>,
        prototype: Option<JsObject>,
        kind: ObjectKind,
    ) -> Self {
        let class_name = match &kind {
            ObjectKind::Ordinary | ObjectKind::Iterator(_) => "Object",
            ObjectKind::Array => "Array",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Primitive(JsValue::Boolean(_)) => "Boolean",
            ObjectKind::Primitive(JsValue::Number(_)) => "Number",
            ObjectKind::Primitive(JsValue::String(_)) => "String",
            ObjectKind::Primitive(JsValue::Symbol(_)) => "Symbol",
            ObjectKind::Primitive(_) => "BigInt",
            ObjectKind::ArrayBuffer(_) => "ArrayBuffer",
            ObjectKind::TypedArray { view, .. } => view.kind().name(),
            ObjectKind::DataView { .. } => "DataView",
            ObjectKind::Map(_) => "Map",
            ObjectKind::Set(_) => "Set",
            ObjectKind::WeakMap(_) => "WeakMap",
            ObjectKind::WeakSet(_) => "WeakSet",
            ObjectKind::Global => "global",
        };
        let elements = matches!(kind, ObjectKind::Array).then(ArrayStorage::new);
        Self {
            id,
            map,
            slots: Vec::new(),
            prototype,
            elements,
            elements_integrity: IntegrityLevel::None,
            length_writable: true,
            extensible: true,
            class_name: class_name.to_string(),
            kind,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.kind, ObjectKind::Function(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, ObjectKind::Array)
    }

    pub fn own_named(&self, key: &PropertyKey) -> Option<(PropertyAttributes, &PropertyValue)> {
        let prop = self.map.find_property(key)?;
        self.slots.get(prop.slot).map(|v| (prop.attributes, v))
    }

    /// Adds a named property, or replaces an existing one in its slot. The
    /// replacement is unchecked: builtin setup and validated definitions only.
    pub(crate) fn add_named(
        &mut self,
        key: PropertyKey,
        attributes: PropertyAttributes,
        value: PropertyValue,
    ) {
        match self.map.find_property(&key).map(|p| p.slot) {
            Some(slot) => {
                self.map = self.map.replace_attributes(key, attributes);
                self.slots[slot] = value;
            }
            None => {
                self.map = self.map.add_property(key, attributes);
                self.slots.push(value);
            }
        }
    }

    pub(crate) fn remove_named(&mut self, key: &PropertyKey) -> Option<PropertyValue> {
        let slot = self.map.find_property(key)?.slot;
        self.map = self.map.delete_property(key);
        Some(self.slots.remove(slot))
    }

    pub(crate) fn set_attributes(
        &mut self,
        key: &PropertyKey,
        attributes: PropertyAttributes,
    ) -> JsResult<()> {
        self.map = self.map.modify_property(key, attributes)?;
        Ok(())
    }

    pub(crate) fn set_slot(&mut self, key: &PropertyKey, value: PropertyValue) -> JsResult<()> {
        let slot = self
            .map
            .find_property(key)
            .ok_or_else(|| JsError::type_error(format!("missing property: {key}")))?
            .slot;
        self.slots[slot] = value;
        Ok(())
    }

    /// Effective attributes of every element in `elements`.
    pub fn element_attributes(&self) -> PropertyAttributes {
        PropertyAttributes::data(
            self.elements_integrity < IntegrityLevel::Frozen,
            true,
            self.elements_integrity == IntegrityLevel::None,
        )
    }

    pub fn array_length(&self) -> u32 {
        self.elements.as_ref().map_or(0, ArrayStorage::length)
    }
}

impl std::fmt::Debug for JsObjectData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsObjectData")
            .field("id", &self.id)
            .field("class_name", &self.class_name)
            .field("map", &self.map.id())
            .field("prototype", &self.prototype)
            .finish()
    }
}
