//! Map, Set, WeakMap and WeakSet (§24).

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::Realm;
use super::linked_map::LinkedMap;
use super::types::{ObjectKind, WeakTable};
use crate::error::{JsError, JsResult};
use crate::types::{JsObject, JsValue, PropertyKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionType {
    Map,
    Set,
    WeakMap,
    WeakSet,
}

impl CollectionType {
    pub fn name(self) -> &'static str {
        match self {
            CollectionType::Map => "Map",
            CollectionType::Set => "Set",
            CollectionType::WeakMap => "WeakMap",
            CollectionType::WeakSet => "WeakSet",
        }
    }
}

fn weak_key(value: &JsValue, collection: CollectionType) -> JsResult<u64> {
    match value {
        JsValue::Object(obj) => Ok(obj.id),
        _ => Err(JsError::type_error(format!(
            "Invalid value used {} {}",
            if collection == CollectionType::WeakSet {
                "in weak set"
            } else {
                "as weak map key"
            },
            value
        ))),
    }
}

impl Realm {
    /// Creates an empty collection of the given type.
    pub fn create_collection(&mut self, collection: CollectionType) -> JsResult<JsObject> {
        let proto = self.builtin_prototype(collection.name())?;
        let threshold = self.config.linked_map_compaction_threshold;
        let kind = match collection {
            CollectionType::Map => ObjectKind::Map(Rc::new(RefCell::new(
                LinkedMap::with_compaction_threshold(threshold),
            ))),
            CollectionType::Set => ObjectKind::Set(Rc::new(RefCell::new(
                LinkedMap::with_compaction_threshold(threshold),
            ))),
            CollectionType::WeakMap => ObjectKind::WeakMap(Rc::new(RefCell::new(FxHashMap::default()))),
            CollectionType::WeakSet => ObjectKind::WeakSet(Rc::new(RefCell::new(FxHashMap::default()))),
        };
        Ok(self.allocate(Some(proto), kind))
    }

    pub fn create_map(&mut self) -> JsResult<JsObject> {
        self.create_collection(CollectionType::Map)
    }

    pub fn create_set(&mut self) -> JsResult<JsObject> {
        self.create_collection(CollectionType::Set)
    }

    pub fn create_weak_map(&mut self) -> JsResult<JsObject> {
        self.create_collection(CollectionType::WeakMap)
    }

    pub fn create_weak_set(&mut self) -> JsResult<JsObject> {
        self.create_collection(CollectionType::WeakSet)
    }

    pub(crate) fn entries_of(&self, obj: JsObject, collection: CollectionType) -> JsResult<Rc<RefCell<LinkedMap>>> {
        let data = self.obj_data(obj)?;
        let data = data.borrow();
        match (&data.kind, collection) {
            (ObjectKind::Map(entries), CollectionType::Map)
            | (ObjectKind::Set(entries), CollectionType::Set) => Ok(Rc::clone(entries)),
            _ => Err(self.incompatible(obj, collection)),
        }
    }

    fn weak_table_of(&self, obj: JsObject, collection: CollectionType) -> JsResult<WeakTable> {
        let data = self.obj_data(obj)?;
        let data = data.borrow();
        match (&data.kind, collection) {
            (ObjectKind::WeakMap(table), CollectionType::WeakMap)
            | (ObjectKind::WeakSet(table), CollectionType::WeakSet) => Ok(Rc::clone(table)),
            _ => Err(self.incompatible(obj, collection)),
        }
    }

    fn incompatible(&self, obj: JsObject, collection: CollectionType) -> JsError {
        JsError::type_error(format!(
            "Method {} called on incompatible receiver {}",
            collection.name(),
            self.describe(&JsValue::Object(obj))
        ))
    }

    pub fn map_set(&mut self, map: JsObject, key: JsValue, value: JsValue) -> JsResult<()> {
        self.entries_of(map, CollectionType::Map)?
            .borrow_mut()
            .set(key, value);
        Ok(())
    }

    pub fn map_get(&self, map: JsObject, key: &JsValue) -> JsResult<JsValue> {
        Ok(self
            .entries_of(map, CollectionType::Map)?
            .borrow()
            .get(key)
            .unwrap_or(JsValue::Undefined))
    }

    pub fn map_has(&self, map: JsObject, key: &JsValue) -> JsResult<bool> {
        Ok(self.entries_of(map, CollectionType::Map)?.borrow().has(key))
    }

    pub fn map_delete(&mut self, map: JsObject, key: &JsValue) -> JsResult<bool> {
        Ok(self
            .entries_of(map, CollectionType::Map)?
            .borrow_mut()
            .delete(key))
    }

    pub fn set_add(&mut self, set: JsObject, value: JsValue) -> JsResult<()> {
        self.entries_of(set, CollectionType::Set)?
            .borrow_mut()
            .set(value, JsValue::Undefined);
        Ok(())
    }

    pub fn set_has(&self, set: JsObject, value: &JsValue) -> JsResult<bool> {
        Ok(self.entries_of(set, CollectionType::Set)?.borrow().has(value))
    }

    pub fn set_delete(&mut self, set: JsObject, value: &JsValue) -> JsResult<bool> {
        Ok(self
            .entries_of(set, CollectionType::Set)?
            .borrow_mut()
            .delete(value))
    }

    /// `clear` for a Map or Set. Running iterators continue from the start.
    pub fn collection_clear(&mut self, obj: JsObject, collection: CollectionType) -> JsResult<()> {
        self.entries_of(obj, collection)?.borrow_mut().clear();
        Ok(())
    }

    pub fn collection_size(&self, obj: JsObject, collection: CollectionType) -> JsResult<usize> {
        Ok(self.entries_of(obj, collection)?.borrow().len())
    }

    /// `forEach` over a Map or Set. The walk is live: entries added by the
    /// callback are visited, entries it deletes before they are reached are
    /// not.
    pub fn collection_for_each(
        &mut self,
        obj: JsObject,
        collection: CollectionType,
        callback: &JsValue,
        this_arg: &JsValue,
    ) -> JsResult<()> {
        let entries = self.entries_of(obj, collection)?;
        if !self.is_callable(callback) {
            return Err(JsError::type_error(format!(
                "{} is not a function",
                self.describe(callback)
            )));
        }
        let cursor = entries.borrow_mut().cursor();
        loop {
            let next = entries.borrow().next_entry(&cursor);
            let Some((key, value)) = next else {
                return Ok(());
            };
            let args = match collection {
                CollectionType::Set => [key.clone(), key, JsValue::Object(obj)],
                _ => [value, key, JsValue::Object(obj)],
            };
            self.call(callback, this_arg, &args)?;
        }
    }

    pub fn weak_map_set(&mut self, map: JsObject, key: &JsValue, value: JsValue) -> JsResult<()> {
        let table = self.weak_table_of(map, CollectionType::WeakMap)?;
        let id = weak_key(key, CollectionType::WeakMap)?;
        table.borrow_mut().insert(id, value);
        Ok(())
    }

    pub fn weak_map_get(&self, map: JsObject, key: &JsValue) -> JsResult<JsValue> {
        let table = self.weak_table_of(map, CollectionType::WeakMap)?;
        let Some(obj) = key.as_object() else {
            return Ok(JsValue::Undefined);
        };
        let value = table.borrow().get(&obj.id).cloned();
        Ok(value.unwrap_or(JsValue::Undefined))
    }

    pub fn weak_map_has(&self, map: JsObject, key: &JsValue) -> JsResult<bool> {
        let table = self.weak_table_of(map, CollectionType::WeakMap)?;
        Ok(key
            .as_object()
            .is_some_and(|obj| table.borrow().contains_key(&obj.id)))
    }

    pub fn weak_map_delete(&mut self, map: JsObject, key: &JsValue) -> JsResult<bool> {
        let table = self.weak_table_of(map, CollectionType::WeakMap)?;
        Ok(key
            .as_object()
            .is_some_and(|obj| table.borrow_mut().remove(&obj.id).is_some()))
    }

    pub fn weak_set_add(&mut self, set: JsObject, value: &JsValue) -> JsResult<()> {
        let table = self.weak_table_of(set, CollectionType::WeakSet)?;
        let id = weak_key(value, CollectionType::WeakSet)?;
        table.borrow_mut().insert(id, JsValue::Boolean(true));
        Ok(())
    }

    pub fn weak_set_has(&self, set: JsObject, value: &JsValue) -> JsResult<bool> {
        let table = self.weak_table_of(set, CollectionType::WeakSet)?;
        Ok(value
            .as_object()
            .is_some_and(|obj| table.borrow().contains_key(&obj.id)))
    }

    pub fn weak_set_delete(&mut self, set: JsObject, value: &JsValue) -> JsResult<bool> {
        let table = self.weak_table_of(set, CollectionType::WeakSet)?;
        Ok(value
            .as_object()
            .is_some_and(|obj| table.borrow_mut().remove(&obj.id).is_some()))
    }

    // §24.1.1.2 AddEntriesFromIterable
    /// Fills a freshly constructed Map or WeakMap from an iterable of
    /// `[key, value]` objects through the target's own `set` method.
    pub fn add_entries_from_iterable(&mut self, target: JsObject, iterable: &JsValue) -> JsResult<()> {
        let adder = self.get(target, &PropertyKey::from("set"))?;
        if !self.is_callable(&adder) {
            return Err(JsError::type_error("'set' returned for property 'set' is not callable"));
        }
        let receiver = JsValue::Object(target);
        self.iterate(iterable, |realm, item| {
            let Some(entry) = item.as_object() else {
                return Err(JsError::type_error(format!(
                    "Iterator value {item} is not an entry object"
                )));
            };
            let key = realm.get(entry, &PropertyKey::from(0u32))?;
            let value = realm.get(entry, &PropertyKey::from(1u32))?;
            realm.call(&adder, &receiver, &[key, value])?;
            Ok(())
        })
    }

    /// Fills a freshly constructed Set or WeakSet through its `add` method.
    pub fn add_values_from_iterable(&mut self, target: JsObject, iterable: &JsValue) -> JsResult<()> {
        let adder = self.get(target, &PropertyKey::from("add"))?;
        if !self.is_callable(&adder) {
            return Err(JsError::type_error("'add' returned for property 'add' is not callable"));
        }
        let receiver = JsValue::Object(target);
        self.iterate(iterable, |realm, value| {
            realm.call(&adder, &receiver, &[value])?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JsString;

    fn num(n: f64) -> JsValue {
        JsValue::Number(n)
    }

    #[test]
    fn map_keys_use_same_value_zero() {
        let mut realm = Realm::new();
        let map = realm.create_map().unwrap();
        realm.map_set(map, num(-0.0), JsValue::str("zero")).unwrap();
        realm.map_set(map, num(f64::NAN), JsValue::str("nan")).unwrap();
        assert!(realm.map_has(map, &num(0.0)).unwrap());
        assert!(realm.map_has(map, &num(f64::NAN)).unwrap());
        let rope = JsString::concat(&JsString::from_str("a"), &JsString::from_str("b"));
        realm.map_set(map, JsValue::String(rope), num(1.0)).unwrap();
        assert_eq!(realm.map_get(map, &JsValue::str("ab")).unwrap().as_number(), Some(1.0));
        assert_eq!(realm.collection_size(map, CollectionType::Map).unwrap(), 3);
        assert!(realm.map_delete(map, &JsValue::str("ab")).unwrap());
        assert!(!realm.map_delete(map, &JsValue::str("ab")).unwrap());
    }

    #[test]
    fn for_each_is_live() {
        let mut realm = Realm::new();
        let set = realm.create_set().unwrap();
        for n in 1..=3 {
            realm.set_add(set, num(f64::from(n))).unwrap();
        }
        let seen = realm.create_array(Vec::new()).unwrap();
        let callback = realm.create_native_function("cb", 3, move |realm, _, args| {
            let set = args[2].as_object().unwrap();
            let n = args[0].as_number().unwrap();
            if n == 1.0 {
                realm.set_delete(set, &num(2.0))?;
                realm.set_add(set, num(4.0))?;
            }
            realm.array_push(seen, vec![args[0].clone()])?;
            Ok(JsValue::Undefined)
        });
        realm
            .collection_for_each(set, CollectionType::Set, &callback.into(), &JsValue::Undefined)
            .unwrap();
        let values = realm.array_to_vec(seen).unwrap();
        let numbers: Vec<f64> = values.iter().filter_map(JsValue::as_number).collect();
        assert_eq!(numbers, vec![1.0, 3.0, 4.0]);
    }

    #[test]
    fn weak_collections_reject_primitive_keys() {
        let mut realm = Realm::new();
        let wm = realm.create_weak_map().unwrap();
        assert!(matches!(
            realm.weak_map_set(wm, &num(1.0), JsValue::Null),
            Err(JsError::TypeError(_))
        ));
        let key = realm.create_object();
        realm.weak_map_set(wm, &key.into(), num(7.0)).unwrap();
        assert_eq!(realm.weak_map_get(wm, &key.into()).unwrap().as_number(), Some(7.0));
        assert!(!realm.weak_map_has(wm, &num(1.0)).unwrap());

        let ws = realm.create_weak_set().unwrap();
        assert!(matches!(
            realm.weak_set_add(ws, &JsValue::str("x")),
            Err(JsError::TypeError(_))
        ));
        realm.weak_set_add(ws, &key.into()).unwrap();
        assert!(realm.weak_set_has(ws, &key.into()).unwrap());
        assert!(realm.weak_set_delete(ws, &key.into()).unwrap());
    }

    #[test]
    fn map_from_iterable_requires_entry_objects() {
        let mut realm = Realm::new();
        let pair = realm
            .create_array(vec![JsValue::str("k"), num(1.0)])
            .unwrap();
        let source = realm.create_array(vec![pair.into()]).unwrap();
        let map = realm.create_map().unwrap();
        realm.add_entries_from_iterable(map, &source.into()).unwrap();
        assert_eq!(realm.map_get(map, &JsValue::str("k")).unwrap().as_number(), Some(1.0));

        let bad = realm.create_array(vec![num(1.0)]).unwrap();
        let map = realm.create_map().unwrap();
        assert!(matches!(
            realm.add_entries_from_iterable(map, &bad.into()),
            Err(JsError::TypeError(_))
        ));
    }

    #[test]
    fn methods_check_their_receiver() {
        let mut realm = Realm::new();
        let set = realm.create_set().unwrap();
        assert!(matches!(
            realm.map_set(set, num(1.0), num(1.0)),
            Err(JsError::TypeError(_))
        ));
    }
}
