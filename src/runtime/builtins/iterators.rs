use crate::error::{JsError, JsResult};
use crate::runtime::Realm;
use crate::runtime::registry::BuiltinObjects;

impl Realm {
    // §27.1.2 %IteratorPrototype%
    pub(super) fn setup_iterator_prototype(&mut self) -> JsResult<BuiltinObjects> {
        let proto = self.create_object();
        let iterator = self.create_native_function("[Symbol.iterator]", 0, |_, this, _| Ok(this.clone()));
        self.insert_symbol_method(proto, iterator);
        Ok(BuiltinObjects {
            constructor: None,
            prototype: Some(proto),
        })
    }

    /// Prototype shared by one family of built-in iterators. Its `next` is
    /// recorded so `iterate` can step such iterators without a call.
    pub(super) fn setup_builtin_iterator_prototype(&mut self, tag: &'static str) -> JsResult<BuiltinObjects> {
        let parent = self.builtin_prototype("%IteratorPrototype%")?;
        let proto = self.create_object_with_proto(Some(parent));
        let next = self.insert_builtin_fn(proto, "next", 0, move |realm, this, _| {
            let Some(iterator) = this.as_object().filter(|o| realm.is_builtin_iterator(*o)) else {
                return Err(JsError::type_error(format!(
                    "{tag}.prototype.next called on incompatible receiver {}",
                    realm.describe(this)
                )));
            };
            let step = realm.builtin_iterator_next(iterator)?;
            Ok(realm.create_iter_result_object(step.value, step.done).into())
        });
        self.intrinsic_next.push(next);
        self.insert_to_string_tag(proto, tag);
        Ok(BuiltinObjects {
            constructor: None,
            prototype: Some(proto),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::types::IteratorKind;
    use crate::types::{JsValue, PropertyKey};

    #[test]
    fn next_produces_result_objects() {
        let mut realm = Realm::new();
        let arr = realm.create_array(vec![JsValue::Number(5.0)]).unwrap();
        let it = realm.create_array_iterator(arr, IteratorKind::Value).unwrap();
        let step = realm.invoke(&it.into(), &PropertyKey::from("next"), &[]).unwrap();
        let step = step.as_object().unwrap();
        assert_eq!(realm.get(step, &PropertyKey::from("value")).unwrap().as_number(), Some(5.0));
        assert!(matches!(
            realm.get(step, &PropertyKey::from("done")).unwrap(),
            JsValue::Boolean(false)
        ));
    }

    #[test]
    fn iterators_are_iterable() {
        let mut realm = Realm::new();
        let map = realm.create_map().unwrap();
        let it = realm.create_map_iterator(map, IteratorKind::Key).unwrap();
        let key = PropertyKey::from(realm.symbol_iterator());
        let method = realm.get(it, &key).unwrap();
        let same = realm.call(&method, &it.into(), &[]).unwrap();
        assert_eq!(same.as_object(), Some(it));
    }

    #[test]
    fn next_rejects_foreign_receivers() {
        let mut realm = Realm::new();
        let proto = realm.builtin_prototype("%SetIteratorPrototype%").unwrap();
        let next = realm.get(proto, &PropertyKey::from("next")).unwrap();
        let plain = realm.create_object();
        assert!(matches!(
            realm.call(&next, &plain.into(), &[]),
            Err(JsError::TypeError(_))
        ));
    }

    #[test]
    fn overridden_next_is_honoured_by_iterate() {
        let mut realm = Realm::new();
        let proto = realm.builtin_prototype("%ArrayIteratorPrototype%").unwrap();
        let replacement = realm.create_native_function("next", 0, |realm, _, _| {
            Ok(realm.create_iter_result_object(JsValue::str("patched"), false).into())
        });
        realm
            .set(proto, &PropertyKey::from("next"), replacement.into(), true)
            .unwrap();
        assert!(realm.is_overridden("%ArrayIteratorPrototype%.next"));
        assert!(!realm.is_overridden("%SetIteratorPrototype%.next"));

        let arr = realm.create_array(vec![JsValue::Number(1.0)]).unwrap();
        let mut seen = Vec::new();
        realm
            .iterate(&arr.into(), |_, value| {
                seen.push(value);
                if seen.len() == 2 {
                    return Err(JsError::range_error("enough"));
                }
                Ok(())
            })
            .unwrap_err();
        assert!(seen.iter().all(JsValue::is_string));
    }
}
