//! Native constructors and prototype methods.
//!
//! `setup_globals` registers every builtin with the realm's registry and
//! installs lazy global bindings for the exposed ones. `Object` and
//! `Function` are built eagerly because every other object links to their
//! prototypes; everything else is materialised on first use.

mod array;
mod collections;
mod iterators;
mod typedarray;

use std::rc::Rc;

use super::Realm;
use super::helpers::{same_value, to_boolean, to_integer_or_infinity};
use super::property_map::PropertyAttributes;
use super::registry::BuiltinObjects;
use super::typed_array::TypedArrayKind;
use super::types::{JsFunction, NativeFn, ObjectKind, PropertyDescriptor, PropertyValue};
use crate::error::{JsError, JsResult};
use crate::types::{JsObject, JsString, JsValue, PropertyKey};

/// The `i`th argument, or `undefined`.
pub(crate) fn arg(args: &[JsValue], i: usize) -> JsValue {
    args.get(i).cloned().unwrap_or(JsValue::Undefined)
}

pub(crate) fn native(
    f: impl Fn(&mut Realm, &JsValue, &[JsValue]) -> JsResult<JsValue> + 'static,
) -> NativeFn {
    Rc::new(f)
}

/// A native that rejects being called without `new`.
pub(crate) fn requires_new(name: &'static str) -> NativeFn {
    native(move |_, _, _| {
        Err(JsError::type_error(format!(
            "Constructor {name} requires 'new'"
        )))
    })
}

pub(crate) fn this_object(this: &JsValue, method: &str) -> JsResult<JsObject> {
    this.as_object().ok_or_else(|| {
        JsError::type_error(format!(
            "{method} called on non-object receiver {this}"
        ))
    })
}

/// Attributes of `@@toStringTag` and similar constant properties.
const READ_ONLY_HIDDEN: PropertyAttributes = PropertyAttributes {
    writable: false,
    enumerable: false,
    configurable: true,
    accessor: false,
    builtin: false,
};

const FROZEN_HIDDEN: PropertyAttributes = PropertyAttributes {
    writable: false,
    enumerable: false,
    configurable: false,
    accessor: false,
    builtin: false,
};

pub(crate) fn setup_globals(realm: &mut Realm) {
    let registry = &mut realm.registry;
    registry.register("Object", true, |realm| Ok(realm.setup_object()));
    registry.register("Function", true, |realm| Ok(realm.setup_function()));
    registry.register("Array", true, Realm::setup_array);
    registry.register("String", true, Realm::setup_string);
    registry.register("Symbol", true, Realm::setup_symbol);
    registry.register("ArrayBuffer", true, Realm::setup_array_buffer);
    registry.register("%TypedArray%", false, Realm::setup_typed_array_intrinsic);
    registry.register("Int8Array", true, |r| r.setup_typed_array(TypedArrayKind::Int8));
    registry.register("Uint8Array", true, |r| r.setup_typed_array(TypedArrayKind::Uint8));
    registry.register("Uint8ClampedArray", true, |r| {
        r.setup_typed_array(TypedArrayKind::Uint8Clamped)
    });
    registry.register("Int16Array", true, |r| r.setup_typed_array(TypedArrayKind::Int16));
    registry.register("Uint16Array", true, |r| r.setup_typed_array(TypedArrayKind::Uint16));
    registry.register("Int32Array", true, |r| r.setup_typed_array(TypedArrayKind::Int32));
    registry.register("Uint32Array", true, |r| r.setup_typed_array(TypedArrayKind::Uint32));
    registry.register("Float32Array", true, |r| r.setup_typed_array(TypedArrayKind::Float32));
    registry.register("Float64Array", true, |r| r.setup_typed_array(TypedArrayKind::Float64));
    registry.register("BigInt64Array", true, |r| r.setup_typed_array(TypedArrayKind::BigInt64));
    registry.register("BigUint64Array", true, |r| {
        r.setup_typed_array(TypedArrayKind::BigUint64)
    });
    registry.register("DataView", true, Realm::setup_data_view);
    registry.register("Map", true, Realm::setup_map);
    registry.register("Set", true, Realm::setup_set);
    registry.register("WeakMap", true, Realm::setup_weak_map);
    registry.register("WeakSet", true, Realm::setup_weak_set);
    registry.register("%IteratorPrototype%", false, Realm::setup_iterator_prototype);
    registry.register("%ArrayIteratorPrototype%", false, |r| {
        r.setup_builtin_iterator_prototype("Array Iterator")
    });
    registry.register("%StringIteratorPrototype%", false, |r| {
        r.setup_builtin_iterator_prototype("String Iterator")
    });
    registry.register("%MapIteratorPrototype%", false, |r| {
        r.setup_builtin_iterator_prototype("Map Iterator")
    });
    registry.register("%SetIteratorPrototype%", false, |r| {
        r.setup_builtin_iterator_prototype("Set Iterator")
    });

    let global = realm.global;
    if let Some(data) = realm.get_object(global.id) {
        let mut data = data.borrow_mut();
        for name in realm.registry.names() {
            data.add_named(
                PropertyKey::from(name),
                PropertyAttributes::BUILTIN_METHOD,
                PropertyValue::LazyBuiltin,
            );
        }
    }

    for (name, objects) in [
        ("Object", realm.setup_object()),
        ("Function", realm.setup_function()),
    ] {
        realm.registry.mark_ready(name, objects);
        if let Some(ctor) = objects.constructor {
            realm.insert_builtin(global, name, ctor.into());
        }
    }
    realm.insert_property(
        global,
        "globalThis",
        global.into(),
        PropertyAttributes::data(true, false, true),
    );
}

impl Realm {
    pub(crate) fn insert_to_string_tag(&mut self, obj: JsObject, tag: &str) {
        let key = PropertyKey::from(self.symbol_to_string_tag());
        self.insert_property(obj, key, JsValue::str(tag), READ_ONLY_HIDDEN);
    }

    pub(crate) fn insert_symbol_method(&mut self, obj: JsObject, func: JsObject) {
        let key = PropertyKey::from(self.symbol_iterator());
        self.insert_builtin(obj, key, func.into());
    }

    // §6.2.6.5 ToPropertyDescriptor
    pub fn to_property_descriptor(&mut self, value: &JsValue) -> JsResult<PropertyDescriptor> {
        let Some(obj) = value.as_object() else {
            return Err(JsError::type_error(format!(
                "Property description must be an object: {}",
                self.describe(value)
            )));
        };
        let mut desc = PropertyDescriptor::default();
        let field = |realm: &mut Realm, name: &str| -> JsResult<Option<JsValue>> {
            let key = PropertyKey::from(name);
            if realm.has_property(obj, &key)? {
                realm.get(obj, &key).map(Some)
            } else {
                Ok(None)
            }
        };
        desc.enumerable = field(self, "enumerable")?.map(|v| to_boolean(&v));
        desc.configurable = field(self, "configurable")?.map(|v| to_boolean(&v));
        desc.value = field(self, "value")?;
        desc.writable = field(self, "writable")?.map(|v| to_boolean(&v));
        for (name, slot) in [("get", &mut desc.get), ("set", &mut desc.set)] {
            if let Some(accessor) = field(self, name)? {
                if !accessor.is_undefined() && !self.is_callable(&accessor) {
                    return Err(JsError::type_error(format!(
                        "{} must be a function: {}",
                        if name == "get" { "Getter" } else { "Setter" },
                        self.describe(&accessor)
                    )));
                }
                *slot = Some(accessor);
            }
        }
        if desc.is_accessor_descriptor() && desc.is_data_descriptor() {
            return Err(JsError::type_error(
                "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
            ));
        }
        Ok(desc)
    }

    // §6.2.6.4 FromPropertyDescriptor
    pub fn from_property_descriptor(&mut self, desc: Option<PropertyDescriptor>) -> JsValue {
        let Some(desc) = desc else {
            return JsValue::Undefined;
        };
        let obj = self.create_object();
        let fields = [
            ("value", desc.value),
            ("writable", desc.writable.map(JsValue::Boolean)),
            ("get", desc.get),
            ("set", desc.set),
            ("enumerable", desc.enumerable.map(JsValue::Boolean)),
            ("configurable", desc.configurable.map(JsValue::Boolean)),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                self.insert_property(obj, name, value, PropertyAttributes::DEFAULT);
            }
        }
        obj.into()
    }

    // §20.1.2.3.1 ObjectDefineProperties
    fn define_properties(&mut self, obj: JsObject, properties: &JsValue) -> JsResult<()> {
        let props = self.to_object(properties)?;
        let mut descriptors = Vec::new();
        for key in self.own_keys(props, false)? {
            let desc = self.get(props, &key)?;
            descriptors.push((key, self.to_property_descriptor(&desc)?));
        }
        for (key, desc) in descriptors {
            self.define_property_or_throw(obj, &key, desc)?;
        }
        Ok(())
    }

    // §20.1.3.6 Object.prototype.toString
    pub(crate) fn object_to_string(&mut self, this: &JsValue) -> JsResult<JsValue> {
        let obj = match this {
            JsValue::Undefined => return Ok(JsValue::str("[object Undefined]")),
            JsValue::Null => return Ok(JsValue::str("[object Null]")),
            other => self.to_object(other)?,
        };
        let builtin_tag = {
            let data = self.obj_data(obj)?;
            let data = data.borrow();
            match &data.kind {
                ObjectKind::Array => "Array",
                ObjectKind::Function(_) => "Function",
                ObjectKind::Primitive(JsValue::Boolean(_)) => "Boolean",
                ObjectKind::Primitive(JsValue::Number(_)) => "Number",
                ObjectKind::Primitive(JsValue::String(_)) => "String",
                _ => "Object",
            }
        };
        let key = PropertyKey::from(self.symbol_to_string_tag());
        let tag = match self.get(obj, &key)? {
            JsValue::String(tag) => tag.to_rust_string(),
            _ => builtin_tag.to_string(),
        };
        Ok(JsValue::str(&format!("[object {tag}]")))
    }

    fn own_key_list(&mut self, value: &JsValue, symbols: bool) -> JsResult<JsValue> {
        let obj = self.to_object(value)?;
        let keys: Vec<JsValue> = self
            .own_keys(obj, true)?
            .into_iter()
            .filter(|k| k.is_symbol() == symbols)
            .map(|k| k.as_js_value())
            .collect();
        Ok(self.create_array(keys)?.into())
    }

    // Object.keys / values / entries share the enumerable own string keys.
    fn enumerable_own(&mut self, value: &JsValue, kind: &str) -> JsResult<JsValue> {
        let obj = self.to_object(value)?;
        let mut out = Vec::new();
        for key in self.own_keys(obj, false)? {
            if key.is_symbol() {
                continue;
            }
            match kind {
                "keys" => out.push(key.as_js_value()),
                "values" => out.push(self.get(obj, &key)?),
                _ => {
                    let value = self.get(obj, &key)?;
                    let pair = self.create_array(vec![key.as_js_value(), value])?;
                    out.push(pair.into());
                }
            }
        }
        Ok(self.create_array(out)?.into())
    }

    fn setup_object(&mut self) -> BuiltinObjects {
        let proto = self.object_prototype;

        self.insert_builtin_fn(proto, "hasOwnProperty", 1, |realm, this, args| {
            let key = realm.to_property_key(&arg(args, 0))?;
            let obj = realm.to_object(this)?;
            Ok(JsValue::Boolean(realm.has_own_property(obj, &key)?))
        });
        self.insert_builtin_fn(proto, "isPrototypeOf", 1, |realm, this, args| {
            let Some(mut current) = arg(args, 0).as_object() else {
                return Ok(JsValue::Boolean(false));
            };
            let obj = realm.to_object(this)?;
            let mut depth = 0;
            while let Some(proto) = realm.get_prototype_of(current)? {
                if proto == obj {
                    return Ok(JsValue::Boolean(true));
                }
                depth += 1;
                if depth > realm.config.max_prototype_depth {
                    return Err(JsError::range_error("Maximum prototype chain depth exceeded"));
                }
                current = proto;
            }
            Ok(JsValue::Boolean(false))
        });
        self.insert_builtin_fn(proto, "propertyIsEnumerable", 1, |realm, this, args| {
            let key = realm.to_property_key(&arg(args, 0))?;
            let obj = realm.to_object(this)?;
            let desc = realm.get_own_property(obj, &key)?;
            Ok(JsValue::Boolean(
                desc.is_some_and(|d| d.enumerable == Some(true)),
            ))
        });
        self.insert_builtin_fn(proto, "toString", 0, |realm, this, _| {
            realm.object_to_string(this)
        });
        self.insert_builtin_fn(proto, "toLocaleString", 0, |realm, this, _| {
            realm.invoke(this, &PropertyKey::from("toString"), &[])
        });
        self.insert_builtin_fn(proto, "valueOf", 0, |realm, this, _| {
            Ok(realm.to_object(this)?.into())
        });

        let construct: NativeFn = native(|realm, _, args| {
            let value = arg(args, 0);
            if value.is_nullish() {
                return Ok(realm.create_object().into());
            }
            Ok(realm.to_object(&value)?.into())
        });
        let ctor = self.create_constructor("Object", 1, Rc::clone(&construct), construct, proto);

        self.insert_builtin_fn(ctor, "keys", 1, |realm, _, args| {
            realm.enumerable_own(&arg(args, 0), "keys")
        });
        self.insert_builtin_fn(ctor, "values", 1, |realm, _, args| {
            realm.enumerable_own(&arg(args, 0), "values")
        });
        self.insert_builtin_fn(ctor, "entries", 1, |realm, _, args| {
            realm.enumerable_own(&arg(args, 0), "entries")
        });
        self.insert_builtin_fn(ctor, "getOwnPropertyNames", 1, |realm, _, args| {
            realm.own_key_list(&arg(args, 0), false)
        });
        self.insert_builtin_fn(ctor, "getOwnPropertySymbols", 1, |realm, _, args| {
            realm.own_key_list(&arg(args, 0), true)
        });
        self.insert_builtin_fn(ctor, "getPrototypeOf", 1, |realm, _, args| {
            let obj = realm.to_object(&arg(args, 0))?;
            Ok(realm
                .get_prototype_of(obj)?
                .map_or(JsValue::Null, JsValue::from))
        });
        self.insert_builtin_fn(ctor, "setPrototypeOf", 2, |realm, _, args| {
            let target = arg(args, 0);
            if target.is_nullish() {
                return Err(JsError::type_error("Object.setPrototypeOf called on null or undefined"));
            }
            let proto = match arg(args, 1) {
                JsValue::Object(p) => Some(p),
                JsValue::Null => None,
                other => {
                    return Err(JsError::type_error(format!(
                        "Object prototype may only be an Object or null: {other}"
                    )));
                }
            };
            let Some(obj) = target.as_object() else {
                return Ok(target);
            };
            if !realm.set_prototype_of(obj, proto)? {
                return Err(JsError::type_error(format!(
                    "{} is not extensible",
                    realm.describe(&target)
                )));
            }
            Ok(target)
        });
        self.insert_builtin_fn(ctor, "create", 2, |realm, _, args| {
            let proto = match arg(args, 0) {
                JsValue::Object(p) => Some(p),
                JsValue::Null => None,
                other => {
                    return Err(JsError::type_error(format!(
                        "Object prototype may only be an Object or null: {other}"
                    )));
                }
            };
            let obj = realm.create_object_with_proto(proto);
            let properties = arg(args, 1);
            if !properties.is_undefined() {
                realm.define_properties(obj, &properties)?;
            }
            Ok(obj.into())
        });
        self.insert_builtin_fn(ctor, "defineProperty", 3, |realm, _, args| {
            let target = arg(args, 0);
            let Some(obj) = target.as_object() else {
                return Err(JsError::type_error("Object.defineProperty called on non-object"));
            };
            let key = realm.to_property_key(&arg(args, 1))?;
            let desc = realm.to_property_descriptor(&arg(args, 2))?;
            realm.define_property_or_throw(obj, &key, desc)?;
            Ok(target)
        });
        self.insert_builtin_fn(ctor, "defineProperties", 2, |realm, _, args| {
            let target = arg(args, 0);
            let Some(obj) = target.as_object() else {
                return Err(JsError::type_error("Object.defineProperties called on non-object"));
            };
            realm.define_properties(obj, &arg(args, 1))?;
            Ok(target)
        });
        self.insert_builtin_fn(ctor, "getOwnPropertyDescriptor", 2, |realm, _, args| {
            let obj = realm.to_object(&arg(args, 0))?;
            let key = realm.to_property_key(&arg(args, 1))?;
            let desc = realm.get_own_property(obj, &key)?;
            Ok(realm.from_property_descriptor(desc))
        });
        self.insert_builtin_fn(ctor, "preventExtensions", 1, |realm, _, args| {
            let target = arg(args, 0);
            if let Some(obj) = target.as_object() {
                realm.prevent_extensions(obj)?;
            }
            Ok(target)
        });
        self.insert_builtin_fn(ctor, "seal", 1, |realm, _, args| {
            let target = arg(args, 0);
            if let Some(obj) = target.as_object() {
                realm.seal(obj)?;
            }
            Ok(target)
        });
        self.insert_builtin_fn(ctor, "freeze", 1, |realm, _, args| {
            let target = arg(args, 0);
            if let Some(obj) = target.as_object() {
                realm.freeze(obj)?;
            }
            Ok(target)
        });
        self.insert_builtin_fn(ctor, "isExtensible", 1, |realm, _, args| {
            Ok(JsValue::Boolean(match arg(args, 0).as_object() {
                Some(obj) => realm.is_extensible(obj)?,
                None => false,
            }))
        });
        self.insert_builtin_fn(ctor, "isSealed", 1, |realm, _, args| {
            Ok(JsValue::Boolean(match arg(args, 0).as_object() {
                Some(obj) => realm.is_sealed(obj)?,
                None => true,
            }))
        });
        self.insert_builtin_fn(ctor, "isFrozen", 1, |realm, _, args| {
            Ok(JsValue::Boolean(match arg(args, 0).as_object() {
                Some(obj) => realm.is_frozen(obj)?,
                None => true,
            }))
        });
        self.insert_builtin_fn(ctor, "is", 2, |_, _, args| {
            Ok(JsValue::Boolean(same_value(&arg(args, 0), &arg(args, 1))))
        });
        self.insert_builtin_fn(ctor, "assign", 2, |realm, _, args| {
            let target = realm.to_object(&arg(args, 0))?;
            for source in args.iter().skip(1) {
                if source.is_nullish() {
                    continue;
                }
                let from = realm.to_object(source)?;
                for key in realm.own_keys(from, false)? {
                    let value = realm.get(from, &key)?;
                    realm.set(target, &key, value, true)?;
                }
            }
            Ok(target.into())
        });

        BuiltinObjects {
            constructor: Some(ctor),
            prototype: Some(proto),
        }
    }

    fn setup_function(&mut self) -> BuiltinObjects {
        let proto = self.function_prototype;

        self.insert_builtin_fn(proto, "call", 1, |realm, this, args| {
            let this_arg = arg(args, 0);
            let rest = args.get(1..).unwrap_or(&[]);
            realm.call(this, &this_arg, rest)
        });
        self.insert_builtin_fn(proto, "apply", 2, |realm, this, args| {
            let this_arg = arg(args, 0);
            let list = match arg(args, 1) {
                JsValue::Undefined | JsValue::Null => Vec::new(),
                JsValue::Object(list) => realm.array_to_vec(list)?,
                other => {
                    return Err(JsError::type_error(format!(
                        "CreateListFromArrayLike called on non-object {other}"
                    )));
                }
            };
            realm.call(this, &this_arg, &list)
        });
        self.insert_builtin_fn(proto, "toString", 0, |realm, this, _| {
            let name = this
                .as_object()
                .and_then(|o| realm.get_object(o.id))
                .and_then(|data| {
                    let data = data.borrow();
                    match &data.kind {
                        ObjectKind::Function(f) => Some(f.name().to_string()),
                        _ => None,
                    }
                })
                .ok_or_else(|| {
                    JsError::type_error("Function.prototype.toString requires that 'this' be a Function")
                })?;
            Ok(JsValue::str(&format!("function {name}() {{ [native code] }}")))
        });

        let unsupported: NativeFn = native(|_, _, _| {
            Err(JsError::type_error("Function constructor requires a source compiler"))
        });
        let ctor = self.create_constructor("Function", 1, Rc::clone(&unsupported), unsupported, proto);
        BuiltinObjects {
            constructor: Some(ctor),
            prototype: Some(proto),
        }
    }

    fn setup_string(&mut self) -> JsResult<BuiltinObjects> {
        let proto = self.create_object();

        fn this_string_value(realm: &Realm, this: &JsValue) -> JsResult<JsString> {
            if let JsValue::String(s) = this {
                return Ok(s.clone());
            }
            if let Some(obj) = this.as_object()
                && let Some(data) = realm.get_object(obj.id)
            {
                let data = data.borrow();
                if let ObjectKind::Primitive(JsValue::String(s)) = &data.kind {
                    return Ok(s.clone());
                }
            }
            Err(JsError::type_error(
                "String.prototype.valueOf requires that 'this' be a String",
            ))
        }

        self.insert_builtin_fn(proto, "toString", 0, |realm, this, _| {
            Ok(this_string_value(realm, this)?.into())
        });
        self.insert_builtin_fn(proto, "valueOf", 0, |realm, this, _| {
            Ok(this_string_value(realm, this)?.into())
        });
        // §22.1.3.9 String.prototype.indexOf
        self.insert_builtin_fn(proto, "indexOf", 1, |realm, this, args| {
            if this.is_nullish() {
                return Err(JsError::type_error(
                    "String.prototype.indexOf called on null or undefined",
                ));
            }
            let string = realm.to_js_string(this)?;
            let search = realm.to_js_string(&arg(args, 0))?;
            let position = to_integer_or_infinity(realm.to_number(&arg(args, 1))?);
            let start = position.clamp(0.0, string.len() as f64) as usize;
            Ok(JsValue::Number(
                string.index_of(&search, start).map_or(-1.0, |i| i as f64),
            ))
        });
        let iterator = self.create_native_function("[Symbol.iterator]", 0, |realm, this, _| {
            if this.is_nullish() {
                return Err(JsError::type_error(
                    "String.prototype[Symbol.iterator] called on null or undefined",
                ));
            }
            let string = realm.to_js_string(this)?;
            Ok(realm.create_string_iterator(string)?.into())
        });
        self.insert_symbol_method(proto, iterator);

        let call: NativeFn = native(|realm, _, args| {
            Ok(match args.first() {
                None => JsValue::str(""),
                Some(JsValue::Symbol(sym)) => JsValue::str(&JsValue::Symbol(sym.clone()).to_string()),
                Some(value) => realm.to_js_string(value)?.into(),
            })
        });
        let construct: NativeFn = native(|realm, _, args| {
            let string = match args.first() {
                None => JsString::from_str(""),
                Some(value) => realm.to_js_string(value)?,
            };
            Ok(realm.to_object(&JsValue::String(string))?.into())
        });
        let ctor = self.create_constructor("String", 1, call, construct, proto);
        Ok(BuiltinObjects {
            constructor: Some(ctor),
            prototype: Some(proto),
        })
    }

    fn setup_symbol(&mut self) -> JsResult<BuiltinObjects> {
        let proto = self.create_object();

        fn this_symbol_value(realm: &Realm, this: &JsValue) -> JsResult<JsValue> {
            if let JsValue::Symbol(_) = this {
                return Ok(this.clone());
            }
            if let Some(obj) = this.as_object()
                && let Some(data) = realm.get_object(obj.id)
            {
                let data = data.borrow();
                if let ObjectKind::Primitive(value @ JsValue::Symbol(_)) = &data.kind {
                    return Ok(value.clone());
                }
            }
            Err(JsError::type_error(
                "Symbol.prototype.valueOf requires that 'this' be a Symbol",
            ))
        }

        self.insert_builtin_fn(proto, "toString", 0, |realm, this, _| {
            Ok(JsValue::str(&this_symbol_value(realm, this)?.to_string()))
        });
        self.insert_builtin_fn(proto, "valueOf", 0, |realm, this, _| {
            this_symbol_value(realm, this)
        });
        self.insert_builtin_getter(proto, "description", "description", |realm, this, _| {
            Ok(match this_symbol_value(realm, this)? {
                JsValue::Symbol(sym) => sym.description.map_or(JsValue::Undefined, JsValue::from),
                _ => JsValue::Undefined,
            })
        });
        self.insert_to_string_tag(proto, "Symbol");

        // Symbol is callable but not a constructor.
        let ctor = self.create_function(JsFunction::native("Symbol", 0, |realm, _, args| {
            let description = match args.first() {
                None | Some(JsValue::Undefined) => None,
                Some(value) => Some(realm.to_js_string(value)?),
            };
            Ok(JsValue::Symbol(realm.new_symbol(description)))
        }));
        self.insert_property(ctor, "prototype", proto.into(), FROZEN_HIDDEN);
        self.insert_builtin(proto, "constructor", ctor.into());
        let iterator = JsValue::Symbol(self.symbol_iterator());
        let to_string_tag = JsValue::Symbol(self.symbol_to_string_tag());
        self.insert_property(ctor, "iterator", iterator, FROZEN_HIDDEN);
        self.insert_property(ctor, "toStringTag", to_string_tag, FROZEN_HIDDEN);

        Ok(BuiltinObjects {
            constructor: Some(ctor),
            prototype: Some(proto),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global_get(realm: &mut Realm, name: &str) -> JsValue {
        let global = realm.global();
        realm.get(global, &PropertyKey::from(name)).unwrap()
    }

    fn call_static(realm: &mut Realm, ctor: &str, method: &str, args: &[JsValue]) -> JsValue {
        let ctor = global_get(realm, ctor);
        realm.invoke(&ctor, &PropertyKey::from(method), args).unwrap()
    }

    #[test]
    fn globals_are_lazy_until_read() {
        let mut realm = Realm::new();
        assert!(realm.is_materialized("Object"));
        assert!(!realm.is_materialized("Map"));
        let map = global_get(&mut realm, "Map");
        assert!(realm.is_constructor(&map));
        assert!(realm.is_materialized("Map"));
        assert!(!realm.is_overridden("Map"));
    }

    #[test]
    fn overwriting_a_global_flips_its_switchpoint() {
        let mut realm = Realm::new();
        let sp = realm.switchpoint("Set");
        let global = realm.global();
        realm
            .set(global, &PropertyKey::from("Set"), JsValue::Null, true)
            .unwrap();
        assert!(sp.has_been_invalidated());
        assert!(realm.is_overridden("Set"));
        // The builtin itself is still reachable through the registry.
        assert!(realm.get_builtin("Set").is_ok());
        assert!(global_get(&mut realm, "Set").is_null());
    }

    #[test]
    fn to_string_tags() {
        let mut realm = Realm::new();
        let arr = realm.create_array(Vec::new()).unwrap();
        let map = realm.create_map().unwrap();
        for (value, expected) in [
            (JsValue::from(arr), "[object Array]"),
            (JsValue::from(map), "[object Map]"),
            (JsValue::Null, "[object Null]"),
        ] {
            let s = realm.object_to_string(&value).unwrap();
            assert_eq!(s.to_string(), expected);
        }
    }

    #[test]
    fn define_property_through_the_object_constructor() {
        let mut realm = Realm::new();
        let obj = realm.create_object();
        let desc = realm.create_object();
        realm
            .set(desc, &PropertyKey::from("value"), JsValue::Number(1.0), true)
            .unwrap();
        call_static(
            &mut realm,
            "Object",
            "defineProperty",
            &[obj.into(), JsValue::str("x"), desc.into()],
        );
        let keys = call_static(&mut realm, "Object", "keys", &[obj.into()]);
        let keys = realm.array_to_vec(keys.as_object().unwrap()).unwrap();
        assert!(keys.is_empty());
        assert!(!realm.set(obj, &PropertyKey::from("x"), JsValue::Null, false).unwrap());

        let bad = realm.create_object();
        let getter = realm.create_native_function("g", 0, |_, _, _| Ok(JsValue::Null));
        realm
            .set(bad, &PropertyKey::from("get"), getter.into(), true)
            .unwrap();
        realm
            .set(bad, &PropertyKey::from("value"), JsValue::Number(1.0), true)
            .unwrap();
        assert!(matches!(
            realm.to_property_descriptor(&bad.into()),
            Err(JsError::TypeError(_))
        ));
    }

    #[test]
    fn symbols_and_strings() {
        let mut realm = Realm::new();
        let sym = call_static(&mut realm, "Object", "is", &[JsValue::Null, JsValue::Null]);
        assert!(matches!(sym, JsValue::Boolean(true)));
        let symbol_ctor = global_get(&mut realm, "Symbol");
        let sym = realm
            .call(&symbol_ctor, &JsValue::Undefined, &[JsValue::str("tag")])
            .unwrap();
        let text = realm
            .invoke(&sym, &PropertyKey::from("toString"), &[])
            .unwrap();
        assert_eq!(text.to_string(), "Symbol(tag)");
        assert!(realm.construct(&symbol_ctor, &[]).is_err());

        let chars = realm.iterable_to_list(&JsValue::str("hi")).unwrap();
        assert_eq!(chars.len(), 2);

        let found = realm
            .invoke(
                &JsValue::str("banana"),
                &PropertyKey::from("indexOf"),
                &[JsValue::str("an"), JsValue::Number(2.0)],
            )
            .unwrap();
        assert_eq!(found.as_number(), Some(3.0));
        let missing = realm
            .invoke(&JsValue::str("banana"), &PropertyKey::from("indexOf"), &[JsValue::str("x")])
            .unwrap();
        assert_eq!(missing.as_number(), Some(-1.0));
    }
}
