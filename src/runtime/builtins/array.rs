use std::rc::Rc;

use super::{arg, native};
use crate::error::{JsError, JsResult};
use crate::runtime::Realm;
use crate::runtime::array_storage::ArrayStorage;
use crate::runtime::registry::BuiltinObjects;
use crate::runtime::types::{IteratorKind, NativeFn};
use crate::types::{JsValue, PropertyKey};

// §23.1.1.1 Array ( ...values )
fn construct_array(realm: &mut Realm, _this: &JsValue, args: &[JsValue]) -> JsResult<JsValue> {
    if let [JsValue::Number(n)] = args {
        let len = *n as u32;
        if f64::from(len) != *n || len > realm.config.max_array_length {
            return Err(JsError::range_error("Invalid array length"));
        }
        return Ok(realm
            .create_array_from_storage(ArrayStorage::with_length(len))?
            .into());
    }
    Ok(realm.create_array(args.to_vec())?.into())
}

impl Realm {
    pub(super) fn setup_array(&mut self) -> JsResult<BuiltinObjects> {
        let proto = self.create_object();

        self.insert_builtin_fn(proto, "push", 1, |realm, this, args| {
            let obj = realm.to_object(this)?;
            Ok(JsValue::Number(realm.array_push(obj, args.to_vec())?))
        });
        self.insert_builtin_fn(proto, "pop", 0, |realm, this, _| {
            let obj = realm.to_object(this)?;
            realm.array_pop(obj)
        });
        self.insert_builtin_fn(proto, "shift", 0, |realm, this, _| {
            let obj = realm.to_object(this)?;
            realm.array_shift(obj)
        });
        self.insert_builtin_fn(proto, "unshift", 1, |realm, this, args| {
            let obj = realm.to_object(this)?;
            Ok(JsValue::Number(realm.array_unshift(obj, args.to_vec())?))
        });
        self.insert_builtin_fn(proto, "slice", 2, |realm, this, args| {
            let obj = realm.to_object(this)?;
            Ok(realm.array_slice(obj, &arg(args, 0), &arg(args, 1))?.into())
        });
        self.insert_builtin_fn(proto, "splice", 2, |realm, this, args| {
            let obj = realm.to_object(this)?;
            let items = args.get(2..).map(<[JsValue]>::to_vec).unwrap_or_default();
            Ok(realm
                .array_splice(obj, args.first(), args.get(1), items)?
                .into())
        });
        self.insert_builtin_fn(proto, "concat", 1, |realm, this, args| {
            Ok(realm.array_concat(this, args)?.into())
        });
        self.insert_builtin_fn(proto, "sort", 1, |realm, this, args| {
            let obj = realm.to_object(this)?;
            realm.array_sort(obj, &arg(args, 0))?;
            Ok(obj.into())
        });
        self.insert_builtin_fn(proto, "map", 1, |realm, this, args| {
            let obj = realm.to_object(this)?;
            Ok(realm.array_map(obj, &arg(args, 0), &arg(args, 1))?.into())
        });
        self.insert_builtin_fn(proto, "filter", 1, |realm, this, args| {
            let obj = realm.to_object(this)?;
            Ok(realm.array_filter(obj, &arg(args, 0), &arg(args, 1))?.into())
        });
        self.insert_builtin_fn(proto, "every", 1, |realm, this, args| {
            let obj = realm.to_object(this)?;
            Ok(JsValue::Boolean(realm.array_every(obj, &arg(args, 0), &arg(args, 1))?))
        });
        self.insert_builtin_fn(proto, "some", 1, |realm, this, args| {
            let obj = realm.to_object(this)?;
            Ok(JsValue::Boolean(realm.array_some(obj, &arg(args, 0), &arg(args, 1))?))
        });
        self.insert_builtin_fn(proto, "forEach", 1, |realm, this, args| {
            let obj = realm.to_object(this)?;
            realm.array_for_each(obj, &arg(args, 0), &arg(args, 1))?;
            Ok(JsValue::Undefined)
        });
        self.insert_builtin_fn(proto, "reduce", 1, |realm, this, args| {
            let obj = realm.to_object(this)?;
            realm.array_reduce(obj, &arg(args, 0), args.get(1).cloned())
        });
        self.insert_builtin_fn(proto, "reduceRight", 1, |realm, this, args| {
            let obj = realm.to_object(this)?;
            realm.array_reduce_right(obj, &arg(args, 0), args.get(1).cloned())
        });
        self.insert_builtin_fn(proto, "indexOf", 1, |realm, this, args| {
            let obj = realm.to_object(this)?;
            Ok(JsValue::Number(realm.array_index_of(obj, &arg(args, 0), &arg(args, 1))?))
        });
        self.insert_builtin_fn(proto, "lastIndexOf", 1, |realm, this, args| {
            let obj = realm.to_object(this)?;
            Ok(JsValue::Number(realm.array_last_index_of(obj, &arg(args, 0), args.get(1))?))
        });
        self.insert_builtin_fn(proto, "includes", 1, |realm, this, args| {
            let obj = realm.to_object(this)?;
            Ok(JsValue::Boolean(realm.array_includes(obj, &arg(args, 0), &arg(args, 1))?))
        });
        self.insert_builtin_fn(proto, "join", 1, |realm, this, args| {
            let obj = realm.to_object(this)?;
            Ok(realm.array_join(obj, &arg(args, 0))?.into())
        });
        self.insert_builtin_fn(proto, "reverse", 0, |realm, this, _| {
            let obj = realm.to_object(this)?;
            realm.array_reverse(obj)?;
            Ok(obj.into())
        });
        self.insert_builtin_fn(proto, "fill", 1, |realm, this, args| {
            let obj = realm.to_object(this)?;
            realm.array_fill(obj, &arg(args, 0), &arg(args, 1), &arg(args, 2))?;
            Ok(obj.into())
        });
        // §23.1.3.36 Array.prototype.toString
        self.insert_builtin_fn(proto, "toString", 0, |realm, this, _| {
            let obj = realm.to_object(this)?;
            let join = realm.get(obj, &PropertyKey::from("join"))?;
            if realm.is_callable(&join) {
                realm.call(&join, &obj.into(), &[])
            } else {
                realm.object_to_string(&obj.into())
            }
        });
        self.insert_builtin_fn(proto, "keys", 0, |realm, this, _| {
            let obj = realm.to_object(this)?;
            Ok(realm.create_array_iterator(obj, IteratorKind::Key)?.into())
        });
        self.insert_builtin_fn(proto, "entries", 0, |realm, this, _| {
            let obj = realm.to_object(this)?;
            Ok(realm.create_array_iterator(obj, IteratorKind::KeyValue)?.into())
        });
        let values = self.insert_builtin_fn(proto, "values", 0, |realm, this, _| {
            let obj = realm.to_object(this)?;
            Ok(realm.create_array_iterator(obj, IteratorKind::Value)?.into())
        });
        self.insert_symbol_method(proto, values);

        let construct: NativeFn = native(construct_array);
        let ctor = self.create_constructor("Array", 1, Rc::clone(&construct), construct, proto);

        self.insert_builtin_fn(ctor, "isArray", 1, |realm, _, args| {
            Ok(JsValue::Boolean(realm.is_array(&arg(args, 0))))
        });
        self.insert_builtin_fn(ctor, "of", 0, |realm, _, args| {
            Ok(realm.create_array(args.to_vec())?.into())
        });
        // §23.1.2.1 Array.from ( items [ , mapfn [ , thisArg ] ] )
        self.insert_builtin_fn(ctor, "from", 1, |realm, _, args| {
            let items = arg(args, 0);
            let map_fn = arg(args, 1);
            let this_arg = arg(args, 2);
            if !map_fn.is_undefined() && !realm.is_callable(&map_fn) {
                return Err(JsError::type_error(format!(
                    "{} is not a function",
                    realm.describe(&map_fn)
                )));
            }
            let iterator_key = PropertyKey::from(realm.symbol_iterator());
            let values = if realm.get_method(&items, &iterator_key)?.is_some() {
                realm.iterable_to_list(&items)?
            } else {
                let obj = realm.to_object(&items)?;
                realm.array_to_vec(obj)?
            };
            let values = if map_fn.is_undefined() {
                values
            } else {
                let mut mapped = Vec::with_capacity(values.len());
                for (k, value) in values.into_iter().enumerate() {
                    mapped.push(realm.call(&map_fn, &this_arg, &[value, JsValue::Number(k as f64)])?);
                }
                mapped
            };
            Ok(realm.create_array(values)?.into())
        });

        Ok(BuiltinObjects {
            constructor: Some(ctor),
            prototype: Some(proto),
        })
    }
}
