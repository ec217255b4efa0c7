use super::{arg, native, requires_new, this_object};
use crate::error::JsResult;
use crate::runtime::Realm;
use crate::runtime::collections::CollectionType;
use crate::runtime::registry::BuiltinObjects;
use crate::runtime::types::{IteratorKind, NativeFn};
use crate::types::{JsObject, JsValue};

impl Realm {
    fn finish_collection(
        &mut self,
        collection: CollectionType,
        proto: JsObject,
        construct: NativeFn,
    ) -> BuiltinObjects {
        let name = collection.name();
        self.insert_to_string_tag(proto, name);
        let ctor = self.create_constructor(name, 0, requires_new(name), construct, proto);
        BuiltinObjects {
            constructor: Some(ctor),
            prototype: Some(proto),
        }
    }

    // §24.1 Map Objects
    pub(super) fn setup_map(&mut self) -> JsResult<BuiltinObjects> {
        let proto = self.create_object();

        self.insert_builtin_fn(proto, "get", 1, |realm, this, args| {
            let map = this_object(this, "Map.prototype.get")?;
            realm.map_get(map, &arg(args, 0))
        });
        self.insert_builtin_fn(proto, "set", 2, |realm, this, args| {
            let map = this_object(this, "Map.prototype.set")?;
            realm.map_set(map, arg(args, 0), arg(args, 1))?;
            Ok(this.clone())
        });
        self.insert_builtin_fn(proto, "has", 1, |realm, this, args| {
            let map = this_object(this, "Map.prototype.has")?;
            Ok(JsValue::Boolean(realm.map_has(map, &arg(args, 0))?))
        });
        self.insert_builtin_fn(proto, "delete", 1, |realm, this, args| {
            let map = this_object(this, "Map.prototype.delete")?;
            Ok(JsValue::Boolean(realm.map_delete(map, &arg(args, 0))?))
        });
        self.insert_builtin_fn(proto, "clear", 0, |realm, this, _| {
            let map = this_object(this, "Map.prototype.clear")?;
            realm.collection_clear(map, CollectionType::Map)?;
            Ok(JsValue::Undefined)
        });
        self.insert_builtin_fn(proto, "forEach", 1, |realm, this, args| {
            let map = this_object(this, "Map.prototype.forEach")?;
            realm.collection_for_each(map, CollectionType::Map, &arg(args, 0), &arg(args, 1))?;
            Ok(JsValue::Undefined)
        });
        self.insert_builtin_getter(proto, "size", "size", |realm, this, _| {
            let map = this_object(this, "get Map.prototype.size")?;
            Ok(JsValue::Number(realm.collection_size(map, CollectionType::Map)? as f64))
        });
        self.insert_builtin_fn(proto, "keys", 0, |realm, this, _| {
            let map = this_object(this, "Map.prototype.keys")?;
            Ok(realm.create_map_iterator(map, IteratorKind::Key)?.into())
        });
        self.insert_builtin_fn(proto, "values", 0, |realm, this, _| {
            let map = this_object(this, "Map.prototype.values")?;
            Ok(realm.create_map_iterator(map, IteratorKind::Value)?.into())
        });
        let entries = self.insert_builtin_fn(proto, "entries", 0, |realm, this, _| {
            let map = this_object(this, "Map.prototype.entries")?;
            Ok(realm.create_map_iterator(map, IteratorKind::KeyValue)?.into())
        });
        self.insert_symbol_method(proto, entries);

        let construct: NativeFn = native(|realm, _, args| {
            let map = realm.create_map()?;
            let iterable = arg(args, 0);
            if !iterable.is_nullish() {
                realm.add_entries_from_iterable(map, &iterable)?;
            }
            Ok(map.into())
        });
        Ok(self.finish_collection(CollectionType::Map, proto, construct))
    }

    // §24.2 Set Objects
    pub(super) fn setup_set(&mut self) -> JsResult<BuiltinObjects> {
        let proto = self.create_object();

        self.insert_builtin_fn(proto, "add", 1, |realm, this, args| {
            let set = this_object(this, "Set.prototype.add")?;
            realm.set_add(set, arg(args, 0))?;
            Ok(this.clone())
        });
        self.insert_builtin_fn(proto, "has", 1, |realm, this, args| {
            let set = this_object(this, "Set.prototype.has")?;
            Ok(JsValue::Boolean(realm.set_has(set, &arg(args, 0))?))
        });
        self.insert_builtin_fn(proto, "delete", 1, |realm, this, args| {
            let set = this_object(this, "Set.prototype.delete")?;
            Ok(JsValue::Boolean(realm.set_delete(set, &arg(args, 0))?))
        });
        self.insert_builtin_fn(proto, "clear", 0, |realm, this, _| {
            let set = this_object(this, "Set.prototype.clear")?;
            realm.collection_clear(set, CollectionType::Set)?;
            Ok(JsValue::Undefined)
        });
        self.insert_builtin_fn(proto, "forEach", 1, |realm, this, args| {
            let set = this_object(this, "Set.prototype.forEach")?;
            realm.collection_for_each(set, CollectionType::Set, &arg(args, 0), &arg(args, 1))?;
            Ok(JsValue::Undefined)
        });
        self.insert_builtin_getter(proto, "size", "size", |realm, this, _| {
            let set = this_object(this, "get Set.prototype.size")?;
            Ok(JsValue::Number(realm.collection_size(set, CollectionType::Set)? as f64))
        });
        self.insert_builtin_fn(proto, "entries", 0, |realm, this, _| {
            let set = this_object(this, "Set.prototype.entries")?;
            Ok(realm.create_set_iterator(set, IteratorKind::KeyValue)?.into())
        });
        // keys and @@iterator are the same function object as values.
        let values = self.insert_builtin_fn(proto, "values", 0, |realm, this, _| {
            let set = this_object(this, "Set.prototype.values")?;
            Ok(realm.create_set_iterator(set, IteratorKind::Value)?.into())
        });
        self.insert_builtin(proto, "keys", values.into());
        self.insert_symbol_method(proto, values);

        let construct: NativeFn = native(|realm, _, args| {
            let set = realm.create_set()?;
            let iterable = arg(args, 0);
            if !iterable.is_nullish() {
                realm.add_values_from_iterable(set, &iterable)?;
            }
            Ok(set.into())
        });
        Ok(self.finish_collection(CollectionType::Set, proto, construct))
    }

    // §24.3 WeakMap Objects
    pub(super) fn setup_weak_map(&mut self) -> JsResult<BuiltinObjects> {
        let proto = self.create_object();

        self.insert_builtin_fn(proto, "get", 1, |realm, this, args| {
            let map = this_object(this, "WeakMap.prototype.get")?;
            realm.weak_map_get(map, &arg(args, 0))
        });
        self.insert_builtin_fn(proto, "set", 2, |realm, this, args| {
            let map = this_object(this, "WeakMap.prototype.set")?;
            realm.weak_map_set(map, &arg(args, 0), arg(args, 1))?;
            Ok(this.clone())
        });
        self.insert_builtin_fn(proto, "has", 1, |realm, this, args| {
            let map = this_object(this, "WeakMap.prototype.has")?;
            Ok(JsValue::Boolean(realm.weak_map_has(map, &arg(args, 0))?))
        });
        self.insert_builtin_fn(proto, "delete", 1, |realm, this, args| {
            let map = this_object(this, "WeakMap.prototype.delete")?;
            Ok(JsValue::Boolean(realm.weak_map_delete(map, &arg(args, 0))?))
        });

        let construct: NativeFn = native(|realm, _, args| {
            let map = realm.create_weak_map()?;
            let iterable = arg(args, 0);
            if !iterable.is_nullish() {
                realm.add_entries_from_iterable(map, &iterable)?;
            }
            Ok(map.into())
        });
        Ok(self.finish_collection(CollectionType::WeakMap, proto, construct))
    }

    // §24.4 WeakSet Objects
    pub(super) fn setup_weak_set(&mut self) -> JsResult<BuiltinObjects> {
        let proto = self.create_object();

        self.insert_builtin_fn(proto, "add", 1, |realm, this, args| {
            let set = this_object(this, "WeakSet.prototype.add")?;
            realm.weak_set_add(set, &arg(args, 0))?;
            Ok(this.clone())
        });
        self.insert_builtin_fn(proto, "has", 1, |realm, this, args| {
            let set = this_object(this, "WeakSet.prototype.has")?;
            Ok(JsValue::Boolean(realm.weak_set_has(set, &arg(args, 0))?))
        });
        self.insert_builtin_fn(proto, "delete", 1, |realm, this, args| {
            let set = this_object(this, "WeakSet.prototype.delete")?;
            Ok(JsValue::Boolean(realm.weak_set_delete(set, &arg(args, 0))?))
        });

        let construct: NativeFn = native(|realm, _, args| {
            let set = realm.create_weak_set()?;
            let iterable = arg(args, 0);
            if !iterable.is_nullish() {
                realm.add_values_from_iterable(set, &iterable)?;
            }
            Ok(set.into())
        });
        Ok(self.finish_collection(CollectionType::WeakSet, proto, construct))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JsError;
    use crate::types::PropertyKey;

    #[test]
    fn constructors_require_new() {
        let mut realm = Realm::new();
        let ctor: JsValue = realm.get_builtin("Map").unwrap().into();
        assert!(matches!(
            realm.call(&ctor, &JsValue::Undefined, &[]),
            Err(JsError::TypeError(_))
        ));
        let map = realm.construct(&ctor, &[]).unwrap();
        let size = realm.get_value(&map, &PropertyKey::from("size")).unwrap();
        assert_eq!(size.as_number(), Some(0.0));
    }

    #[test]
    fn set_constructor_consumes_iterables() {
        let mut realm = Realm::new();
        let source = realm
            .create_array(vec![JsValue::Number(1.0), JsValue::Number(1.0), JsValue::Number(2.0)])
            .unwrap();
        let ctor: JsValue = realm.get_builtin("Set").unwrap().into();
        let set = realm.construct(&ctor, &[source.into()]).unwrap();
        let size = realm.get_value(&set, &PropertyKey::from("size")).unwrap();
        assert_eq!(size.as_number(), Some(2.0));
        let keys = realm.get_value(&set, &PropertyKey::from("keys")).unwrap();
        let values = realm.get_value(&set, &PropertyKey::from("values")).unwrap();
        assert_eq!(keys.as_object(), values.as_object());
    }

    #[test]
    fn set_returns_the_receiver_for_chaining() {
        let mut realm = Realm::new();
        let map = realm.create_map().unwrap();
        let returned = realm
            .invoke(
                &map.into(),
                &PropertyKey::from("set"),
                &[JsValue::str("k"), JsValue::Number(1.0)],
            )
            .unwrap();
        assert_eq!(returned.as_object(), Some(map));
        let text = realm.object_to_string(&map.into()).unwrap();
        assert_eq!(text.to_string(), "[object Map]");
    }
}
