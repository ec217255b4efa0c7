use super::{FROZEN_HIDDEN, arg, native, requires_new, this_object};
use crate::error::{JsError, JsResult};
use crate::runtime::array_buffer::ArrayBuffer;
use crate::runtime::data_view::DataView;
use crate::runtime::helpers::{same_value_zero, to_boolean, to_index};
use crate::runtime::registry::BuiltinObjects;
use crate::runtime::typed_array::{Endian, TypedArrayKind, TypedArrayView};
use crate::runtime::types::{IteratorKind, NativeFn, ObjectKind};
use crate::runtime::{PreferredType, Realm};
use crate::types::{JsObject, JsValue, PropertyKey};

impl Realm {
    pub fn create_array_buffer(&mut self, buffer: ArrayBuffer) -> JsResult<JsObject> {
        let proto = self.builtin_prototype("ArrayBuffer")?;
        Ok(self.allocate(Some(proto), ObjectKind::ArrayBuffer(buffer)))
    }

    /// Wraps `view` in a typed array object. `buffer` is the ArrayBuffer
    /// object the view was made over; a fresh one is created when absent.
    pub fn create_typed_array(
        &mut self,
        view: TypedArrayView,
        buffer: Option<JsObject>,
    ) -> JsResult<JsObject> {
        let buffer = match buffer {
            Some(buffer) => buffer,
            None => self.create_array_buffer(view.buffer().clone())?,
        };
        let proto = self.builtin_prototype(view.kind().name())?;
        Ok(self.allocate(Some(proto), ObjectKind::TypedArray { view, buffer }))
    }

    pub fn create_data_view(&mut self, view: DataView, buffer: JsObject) -> JsResult<JsObject> {
        let proto = self.builtin_prototype("DataView")?;
        Ok(self.allocate(Some(proto), ObjectKind::DataView { view, buffer }))
    }

    pub(crate) fn array_buffer_of(&self, value: &JsValue) -> Option<ArrayBuffer> {
        let data = self.get_object(value.as_object()?.id)?;
        let data = data.borrow();
        match &data.kind {
            ObjectKind::ArrayBuffer(buffer) => Some(buffer.clone()),
            _ => None,
        }
    }

    /// The view and buffer object behind a typed array, or a TypeError
    /// naming `method`.
    pub(crate) fn typed_array_view(
        &self,
        value: &JsValue,
        method: &str,
    ) -> JsResult<(TypedArrayView, JsObject)> {
        let found = value.as_object().and_then(|o| self.get_object(o.id)).and_then(|data| {
            let data = data.borrow();
            match &data.kind {
                ObjectKind::TypedArray { view, buffer } => Some((view.clone(), *buffer)),
                _ => None,
            }
        });
        found.ok_or_else(|| {
            JsError::type_error(format!(
                "{method} called on incompatible receiver {}",
                self.describe(value)
            ))
        })
    }

    fn data_view_of(&self, value: &JsValue, method: &str) -> JsResult<(DataView, JsObject)> {
        let found = value.as_object().and_then(|o| self.get_object(o.id)).and_then(|data| {
            let data = data.borrow();
            match &data.kind {
                ObjectKind::DataView { view, buffer } => Some((view.clone(), *buffer)),
                _ => None,
            }
        });
        found.ok_or_else(|| {
            JsError::type_error(format!(
                "{method} called on incompatible receiver {}",
                self.describe(value)
            ))
        })
    }

    // Relative index arguments: `undefined` means "use the default".
    fn relative_arg(&mut self, value: &JsValue) -> JsResult<Option<f64>> {
        if value.is_undefined() {
            return Ok(None);
        }
        Ok(Some(self.to_number(value)?))
    }

    // §25.1 ArrayBuffer Objects
    pub(super) fn setup_array_buffer(&mut self) -> JsResult<BuiltinObjects> {
        let proto = self.create_object();

        self.insert_builtin_getter(proto, "byteLength", "byteLength", |realm, this, _| {
            let buffer = realm.array_buffer_of(this).ok_or_else(|| {
                JsError::type_error("ArrayBuffer.prototype.byteLength called on incompatible receiver")
            })?;
            Ok(JsValue::Number(buffer.byte_length() as f64))
        });
        self.insert_builtin_fn(proto, "slice", 2, |realm, this, args| {
            let buffer = realm.array_buffer_of(this).ok_or_else(|| {
                JsError::type_error("ArrayBuffer.prototype.slice called on incompatible receiver")
            })?;
            let begin = realm.relative_arg(&arg(args, 0))?.unwrap_or(0.0);
            let end = realm.relative_arg(&arg(args, 1))?;
            Ok(realm.create_array_buffer(buffer.slice(begin, end))?.into())
        });
        self.insert_to_string_tag(proto, "ArrayBuffer");

        let construct: NativeFn = native(|realm, _, args| {
            let length = arg(args, 0);
            let length = if length.is_undefined() {
                0.0
            } else {
                realm.to_number(&length)?
            };
            let buffer = ArrayBuffer::allocate(length)?;
            Ok(realm.create_array_buffer(buffer)?.into())
        });
        let ctor = self.create_constructor("ArrayBuffer", 1, requires_new("ArrayBuffer"), construct, proto);
        self.insert_builtin_fn(ctor, "isView", 1, |realm, _, args| {
            let value = arg(args, 0);
            let is_view = value
                .as_object()
                .and_then(|o| realm.get_object(o.id))
                .is_some_and(|data| {
                    matches!(
                        data.borrow().kind,
                        ObjectKind::TypedArray { .. } | ObjectKind::DataView { .. }
                    )
                });
            Ok(JsValue::Boolean(is_view))
        });

        Ok(BuiltinObjects {
            constructor: Some(ctor),
            prototype: Some(proto),
        })
    }

    // §23.2.1 %TypedArray%
    pub(super) fn setup_typed_array_intrinsic(&mut self) -> JsResult<BuiltinObjects> {
        let proto = self.create_object();

        self.insert_builtin_getter(proto, "buffer", "buffer", |realm, this, _| {
            let (_, buffer) = realm.typed_array_view(this, "get TypedArray.prototype.buffer")?;
            Ok(buffer.into())
        });
        self.insert_builtin_getter(proto, "byteLength", "byteLength", |realm, this, _| {
            let (view, _) = realm.typed_array_view(this, "get TypedArray.prototype.byteLength")?;
            Ok(JsValue::Number(view.byte_length() as f64))
        });
        self.insert_builtin_getter(proto, "byteOffset", "byteOffset", |realm, this, _| {
            let (view, _) = realm.typed_array_view(this, "get TypedArray.prototype.byteOffset")?;
            Ok(JsValue::Number(view.byte_offset() as f64))
        });
        self.insert_builtin_getter(proto, "length", "length", |realm, this, _| {
            let (view, _) = realm.typed_array_view(this, "get TypedArray.prototype.length")?;
            Ok(JsValue::Number(view.length() as f64))
        });
        // Unlike the other getters this one answers undefined for foreign
        // receivers instead of throwing.
        let tag_key = PropertyKey::from(self.symbol_to_string_tag());
        self.insert_builtin_getter(proto, tag_key, "[Symbol.toStringTag]", |realm, this, _| {
            Ok(match realm.typed_array_view(this, "") {
                Ok((view, _)) => JsValue::str(view.kind().name()),
                Err(_) => JsValue::Undefined,
            })
        });

        // §23.2.3.26 %TypedArray%.prototype.set
        self.insert_builtin_fn(proto, "set", 1, |realm, this, args| {
            let (view, _) = realm.typed_array_view(this, "TypedArray.prototype.set")?;
            let offset = realm.to_number(&arg(args, 1))?;
            let offset = if offset.is_nan() { 0.0 } else { offset.trunc() };
            if offset < 0.0 {
                return Err(JsError::range_error("offset is out of bounds"));
            }
            let source = arg(args, 0);
            if let Ok((source, _)) = realm.typed_array_view(&source, "") {
                view.set_from_view(&source, offset as usize)?;
            } else {
                let obj = realm.to_object(&source)?;
                let values = realm.array_to_vec(obj)?;
                view.set_from_values(&values, offset as usize)?;
            }
            Ok(JsValue::Undefined)
        });
        self.insert_builtin_fn(proto, "subarray", 2, |realm, this, args| {
            let (view, buffer) = realm.typed_array_view(this, "TypedArray.prototype.subarray")?;
            let begin = realm.relative_arg(&arg(args, 0))?.unwrap_or(0.0);
            let end = realm.relative_arg(&arg(args, 1))?;
            Ok(realm
                .create_typed_array(view.subarray(begin, end), Some(buffer))?
                .into())
        });
        self.insert_builtin_fn(proto, "slice", 2, |realm, this, args| {
            let (view, _) = realm.typed_array_view(this, "TypedArray.prototype.slice")?;
            let begin = realm.relative_arg(&arg(args, 0))?.unwrap_or(0.0);
            let end = realm.relative_arg(&arg(args, 1))?;
            Ok(realm.create_typed_array(view.slice(begin, end), None)?.into())
        });
        self.insert_builtin_fn(proto, "fill", 1, |realm, this, args| {
            let (view, _) = realm.typed_array_view(this, "TypedArray.prototype.fill")?;
            let value = realm.to_primitive(&arg(args, 0), PreferredType::Number)?;
            let value = if view.kind().is_bigint() {
                value
            } else {
                JsValue::Number(realm.to_number(&value)?)
            };
            let start = realm.relative_arg(&arg(args, 1))?.unwrap_or(0.0);
            let end = realm.relative_arg(&arg(args, 2))?;
            view.fill(&value, start, end)?;
            Ok(this.clone())
        });
        self.insert_builtin_fn(proto, "copyWithin", 2, |realm, this, args| {
            let (view, _) = realm.typed_array_view(this, "TypedArray.prototype.copyWithin")?;
            let target = realm.relative_arg(&arg(args, 0))?.unwrap_or(0.0);
            let start = realm.relative_arg(&arg(args, 1))?.unwrap_or(0.0);
            let end = realm.relative_arg(&arg(args, 2))?;
            view.copy_within(target, start, end);
            Ok(this.clone())
        });
        self.insert_builtin_fn(proto, "indexOf", 1, |realm, this, args| {
            let (view, _) = realm.typed_array_view(this, "TypedArray.prototype.indexOf")?;
            let from = realm.relative_arg(&arg(args, 1))?.unwrap_or(0.0);
            Ok(JsValue::Number(
                view.index_of(&arg(args, 0), from).map_or(-1.0, |i| i as f64),
            ))
        });
        self.insert_builtin_fn(proto, "includes", 1, |realm, this, args| {
            let (view, _) = realm.typed_array_view(this, "TypedArray.prototype.includes")?;
            let search = arg(args, 0);
            Ok(JsValue::Boolean(
                view.to_values().iter().any(|v| same_value_zero(v, &search)),
            ))
        });
        self.insert_builtin_fn(proto, "join", 1, |realm, this, args| {
            realm.typed_array_view(this, "TypedArray.prototype.join")?;
            let obj = realm.to_object(this)?;
            Ok(realm.array_join(obj, &arg(args, 0))?.into())
        });
        self.insert_builtin_fn(proto, "forEach", 1, |realm, this, args| {
            realm.typed_array_view(this, "TypedArray.prototype.forEach")?;
            let obj = realm.to_object(this)?;
            realm.array_for_each(obj, &arg(args, 0), &arg(args, 1))?;
            Ok(JsValue::Undefined)
        });
        self.insert_builtin_fn(proto, "keys", 0, |realm, this, _| {
            realm.typed_array_view(this, "TypedArray.prototype.keys")?;
            let obj = realm.to_object(this)?;
            Ok(realm.create_array_iterator(obj, IteratorKind::Key)?.into())
        });
        self.insert_builtin_fn(proto, "entries", 0, |realm, this, _| {
            realm.typed_array_view(this, "TypedArray.prototype.entries")?;
            let obj = realm.to_object(this)?;
            Ok(realm.create_array_iterator(obj, IteratorKind::KeyValue)?.into())
        });
        let values = self.insert_builtin_fn(proto, "values", 0, |realm, this, _| {
            realm.typed_array_view(this, "TypedArray.prototype.values")?;
            let obj = realm.to_object(this)?;
            Ok(realm.create_array_iterator(obj, IteratorKind::Value)?.into())
        });
        self.insert_symbol_method(proto, values);

        let abstract_ctor: NativeFn = native(|_, _, _| {
            Err(JsError::type_error(
                "Abstract class TypedArray not directly constructable",
            ))
        });
        let ctor = self.create_constructor("TypedArray", 0, abstract_ctor.clone(), abstract_ctor, proto);
        Ok(BuiltinObjects {
            constructor: Some(ctor),
            prototype: Some(proto),
        })
    }

    // §23.2.5.1 TypedArray ( ...args )
    fn construct_typed_array(&mut self, kind: TypedArrayKind, args: &[JsValue]) -> JsResult<JsObject> {
        let first = arg(args, 0);
        if !first.is_object() {
            let length = to_index(&self.to_primitive(&first, PreferredType::Number)?)?;
            return self.create_typed_array(TypedArrayView::with_length(kind, length)?, None);
        }
        if let Some(buffer) = self.array_buffer_of(&first) {
            let offset = to_index(&self.to_primitive(&arg(args, 1), PreferredType::Number)?)?;
            let length = arg(args, 2);
            let length = if length.is_undefined() {
                None
            } else {
                Some(to_index(&self.to_primitive(&length, PreferredType::Number)?)?)
            };
            let view = TypedArrayView::new(buffer, offset, length, kind)?;
            return self.create_typed_array(view, first.as_object());
        }
        if let Ok((source, _)) = self.typed_array_view(&first, "") {
            return self.create_typed_array(TypedArrayView::from_view(kind, &source)?, None);
        }
        let iterator_key = PropertyKey::from(self.symbol_iterator());
        let values = if self.get_method(&first, &iterator_key)?.is_some() {
            self.iterable_to_list(&first)?
        } else {
            let obj = self.to_object(&first)?;
            self.array_to_vec(obj)?
        };
        let mut primitives = Vec::with_capacity(values.len());
        for value in &values {
            primitives.push(self.to_primitive(value, PreferredType::Number)?);
        }
        self.create_typed_array(TypedArrayView::from_values(kind, &primitives)?, None)
    }

    pub(super) fn setup_typed_array(&mut self, kind: TypedArrayKind) -> JsResult<BuiltinObjects> {
        let parent = self.builtin_objects("%TypedArray%")?;
        let proto = self.create_object_with_proto(parent.prototype);
        let bytes = JsValue::Number(kind.bytes_per_element() as f64);
        self.insert_property(proto, "BYTES_PER_ELEMENT", bytes.clone(), FROZEN_HIDDEN);

        let construct: NativeFn = native(move |realm, _, args| {
            Ok(realm.construct_typed_array(kind, args)?.into())
        });
        let ctor = self.create_constructor(kind.name(), 3, requires_new(kind.name()), construct, proto);
        self.insert_property(ctor, "BYTES_PER_ELEMENT", bytes, FROZEN_HIDDEN);
        self.obj_data(ctor)?.borrow_mut().prototype = parent.constructor;

        Ok(BuiltinObjects {
            constructor: Some(ctor),
            prototype: Some(proto),
        })
    }

    // §25.3 DataView Objects
    pub(super) fn setup_data_view(&mut self) -> JsResult<BuiltinObjects> {
        let proto = self.create_object();

        self.insert_builtin_getter(proto, "buffer", "buffer", |realm, this, _| {
            let (_, buffer) = realm.data_view_of(this, "get DataView.prototype.buffer")?;
            Ok(buffer.into())
        });
        self.insert_builtin_getter(proto, "byteLength", "byteLength", |realm, this, _| {
            let (view, _) = realm.data_view_of(this, "get DataView.prototype.byteLength")?;
            Ok(JsValue::Number(view.byte_length() as f64))
        });
        self.insert_builtin_getter(proto, "byteOffset", "byteOffset", |realm, this, _| {
            let (view, _) = realm.data_view_of(this, "get DataView.prototype.byteOffset")?;
            Ok(JsValue::Number(view.byte_offset() as f64))
        });

        for kind in TypedArrayKind::ALL {
            if kind == TypedArrayKind::Uint8Clamped {
                continue;
            }
            let element = kind.name().trim_end_matches("Array");
            self.insert_builtin_fn(proto, &format!("get{element}"), 1, move |realm, this, args| {
                let (view, _) = realm.data_view_of(this, "DataView.prototype.get")?;
                let offset = to_index(&realm.to_primitive(&arg(args, 0), PreferredType::Number)?)?;
                view.get(offset, kind, endian_arg(&arg(args, 1)))
            });
            self.insert_builtin_fn(proto, &format!("set{element}"), 2, move |realm, this, args| {
                let (view, _) = realm.data_view_of(this, "DataView.prototype.set")?;
                let offset = to_index(&realm.to_primitive(&arg(args, 0), PreferredType::Number)?)?;
                let value = realm.to_primitive(&arg(args, 1), PreferredType::Number)?;
                view.set(offset, kind, &value, endian_arg(&arg(args, 2)))?;
                Ok(JsValue::Undefined)
            });
        }
        self.insert_to_string_tag(proto, "DataView");

        let construct: NativeFn = native(|realm, _, args| {
            let target = arg(args, 0);
            let Some(buffer) = realm.array_buffer_of(&target) else {
                return Err(JsError::type_error(
                    "First argument to DataView constructor must be an ArrayBuffer",
                ));
            };
            let offset = to_index(&realm.to_primitive(&arg(args, 1), PreferredType::Number)?)?;
            let length = arg(args, 2);
            let length = if length.is_undefined() {
                None
            } else {
                Some(to_index(&realm.to_primitive(&length, PreferredType::Number)?)?)
            };
            let view = DataView::new(buffer, offset, length)?;
            let buffer_obj = this_object(&target, "DataView")?;
            Ok(realm.create_data_view(view, buffer_obj)?.into())
        });
        let ctor = self.create_constructor("DataView", 1, requires_new("DataView"), construct, proto);
        Ok(BuiltinObjects {
            constructor: Some(ctor),
            prototype: Some(proto),
        })
    }
}

/// DataView accessors default to big-endian.
fn endian_arg(little_endian: &JsValue) -> Endian {
    if to_boolean(little_endian) {
        Endian::Little
    } else {
        Endian::Big
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn construct(realm: &mut Realm, name: &str, args: &[JsValue]) -> JsResult<JsObject> {
        let ctor: JsValue = realm.get_builtin(name)?.into();
        let obj = realm.construct(&ctor, args)?;
        Ok(obj.as_object().unwrap())
    }

    fn prop(realm: &mut Realm, obj: JsObject, name: &str) -> JsValue {
        realm.get(obj, &PropertyKey::from(name)).unwrap()
    }

    #[test]
    fn views_share_their_buffer_object() {
        let mut realm = Realm::new();
        let buffer = construct(&mut realm, "ArrayBuffer", &[JsValue::Number(8.0)]).unwrap();
        let bytes = construct(&mut realm, "Uint8Array", &[buffer.into()]).unwrap();
        let words = construct(
            &mut realm,
            "Uint16Array",
            &[buffer.into(), JsValue::Number(2.0), JsValue::Number(2.0)],
        )
        .unwrap();
        assert_eq!(prop(&mut realm, words, "buffer").as_object(), Some(buffer));
        assert_eq!(prop(&mut realm, words, "byteOffset").as_number(), Some(2.0));
        assert_eq!(prop(&mut realm, words, "byteLength").as_number(), Some(4.0));

        realm
            .set(bytes, &PropertyKey::from(2u32), JsValue::Number(7.0), true)
            .unwrap();
        realm
            .set(bytes, &PropertyKey::from(3u32), JsValue::Number(7.0), true)
            .unwrap();
        let word = realm.get(words, &PropertyKey::from(0u32)).unwrap();
        assert_eq!(word.as_number(), Some(f64::from(0x0707)));
    }

    #[test]
    fn misaligned_offsets_are_range_errors() {
        let mut realm = Realm::new();
        let buffer = construct(&mut realm, "ArrayBuffer", &[JsValue::Number(8.0)]).unwrap();
        assert!(matches!(
            construct(&mut realm, "Int32Array", &[buffer.into(), JsValue::Number(1.0)]),
            Err(JsError::RangeError(_))
        ));
        assert!(matches!(
            construct(&mut realm, "ArrayBuffer", &[JsValue::Number(-1.0)]),
            Err(JsError::RangeError(_))
        ));
    }

    #[test]
    fn typed_array_constructor_hierarchy() {
        let mut realm = Realm::new();
        let abstract_ctor = realm.get_builtin("%TypedArray%").unwrap();
        let int8 = realm.get_builtin("Int8Array").unwrap();
        assert_eq!(realm.get_prototype_of(int8).unwrap(), Some(abstract_ctor));
        assert!(matches!(
            realm.construct(&abstract_ctor.into(), &[]),
            Err(JsError::TypeError(_))
        ));
        let per_element = prop(&mut realm, int8, "BYTES_PER_ELEMENT");
        assert_eq!(per_element.as_number(), Some(1.0));
        assert!(matches!(
            realm.call(&int8.into(), &JsValue::Undefined, &[]),
            Err(JsError::TypeError(_))
        ));
    }

    #[test]
    fn values_are_converted_on_store() {
        let mut realm = Realm::new();
        let source = realm
            .create_array(vec![JsValue::Number(300.0), JsValue::Number(-1.0), JsValue::str("2")])
            .unwrap();
        let clamped = construct(&mut realm, "Uint8ClampedArray", &[source.into()]).unwrap();
        let wrapped = construct(&mut realm, "Uint8Array", &[source.into()]).unwrap();
        let read = |realm: &mut Realm, obj: JsObject, i: u32| {
            realm.get(obj, &PropertyKey::from(i)).unwrap().as_number().unwrap()
        };
        assert_eq!(read(&mut realm, clamped, 0), 255.0);
        assert_eq!(read(&mut realm, clamped, 1), 0.0);
        assert_eq!(read(&mut realm, wrapped, 0), 44.0);
        assert_eq!(read(&mut realm, wrapped, 1), 255.0);
        assert_eq!(read(&mut realm, wrapped, 2), 2.0);
    }

    #[test]
    fn subarray_aliases_and_slice_copies() {
        let mut realm = Realm::new();
        let arr = construct(&mut realm, "Int16Array", &[JsValue::Number(4.0)]).unwrap();
        let sub = realm
            .invoke(&arr.into(), &PropertyKey::from("subarray"), &[JsValue::Number(1.0)])
            .unwrap()
            .as_object()
            .unwrap();
        let copy = realm
            .invoke(&arr.into(), &PropertyKey::from("slice"), &[JsValue::Number(1.0)])
            .unwrap()
            .as_object()
            .unwrap();
        realm
            .invoke(&arr.into(), &PropertyKey::from("fill"), &[JsValue::Number(9.0)])
            .unwrap();
        assert_eq!(realm.get(sub, &PropertyKey::from(0u32)).unwrap().as_number(), Some(9.0));
        assert_eq!(realm.get(copy, &PropertyKey::from(0u32)).unwrap().as_number(), Some(0.0));
        assert_eq!(prop(&mut realm, sub, "length").as_number(), Some(3.0));
    }

    #[test]
    fn set_rejects_sources_that_overflow() {
        let mut realm = Realm::new();
        let arr = construct(&mut realm, "Float64Array", &[JsValue::Number(2.0)]).unwrap();
        let source = realm
            .create_array(vec![JsValue::Number(1.0), JsValue::Number(2.0)])
            .unwrap();
        let result = realm.invoke(
            &arr.into(),
            &PropertyKey::from("set"),
            &[source.into(), JsValue::Number(1.0)],
        );
        assert!(matches!(result, Err(JsError::RangeError(_))));
        realm
            .invoke(&arr.into(), &PropertyKey::from("set"), &[source.into()])
            .unwrap();
        let joined = realm
            .invoke(&arr.into(), &PropertyKey::from("join"), &[JsValue::str("-")])
            .unwrap();
        assert_eq!(joined.to_string(), "1-2");
    }

    #[test]
    fn data_view_defaults_to_big_endian() {
        let mut realm = Realm::new();
        let buffer = construct(&mut realm, "ArrayBuffer", &[JsValue::Number(4.0)]).unwrap();
        let view = construct(&mut realm, "DataView", &[buffer.into()]).unwrap();
        realm
            .invoke(
                &view.into(),
                &PropertyKey::from("setUint16"),
                &[JsValue::Number(0.0), JsValue::Number(f64::from(0x0102))],
            )
            .unwrap();
        let little = realm
            .invoke(
                &view.into(),
                &PropertyKey::from("getUint16"),
                &[JsValue::Number(0.0), JsValue::Boolean(true)],
            )
            .unwrap();
        assert_eq!(little.as_number(), Some(f64::from(0x0201)));
        let out_of_range = realm.invoke(
            &view.into(),
            &PropertyKey::from("getUint32"),
            &[JsValue::Number(1.0)],
        );
        assert!(matches!(out_of_range, Err(JsError::RangeError(_))));

        let plain = realm.create_object();
        assert!(matches!(
            construct(&mut realm, "DataView", &[plain.into()]),
            Err(JsError::TypeError(_))
        ));
    }

    #[test]
    fn to_string_tag_is_a_getter() {
        let mut realm = Realm::new();
        let arr = construct(&mut realm, "Float32Array", &[]).unwrap();
        let text = realm.object_to_string(&arr.into()).unwrap();
        assert_eq!(text.to_string(), "[object Float32Array]");
        let ctor: JsValue = realm.get_builtin("ArrayBuffer").unwrap().into();
        let is_view = realm
            .invoke(&ctor, &PropertyKey::from("isView"), &[arr.into()])
            .unwrap();
        assert!(matches!(is_view, JsValue::Boolean(true)));
    }
}
