//! The iterator protocol (§7.4) and the built-in Array, String, Map and Set
//! iterators.
//!
//! Built-in iterators keep their source in an [`IteratorState`]. The first
//! `done` result drops the source, so an exhausted iterator keeps nothing
//! alive and stays done even if the source grows afterwards.

use super::Realm;
use super::collections::CollectionType;
use super::helpers::to_boolean;
use super::types::{IteratorKind, IteratorState, ObjectKind};
use crate::error::{JsError, JsResult};
use crate::types::{JsObject, JsString, JsValue, PropertyKey};

/// One step of an iterator.
#[derive(Debug, Clone)]
pub struct IterResult {
    pub value: JsValue,
    pub done: bool,
}

impl IterResult {
    pub fn value(value: JsValue) -> Self {
        Self { value, done: false }
    }

    pub fn done() -> Self {
        Self {
            value: JsValue::Undefined,
            done: true,
        }
    }

    fn into_option(self) -> Option<JsValue> {
        (!self.done).then_some(self.value)
    }
}

/// §7.4.1 Iterator Records
#[derive(Debug, Clone)]
pub struct IteratorRecord {
    pub iterator: JsObject,
    pub next_method: JsValue,
    pub done: bool,
}

fn is_high_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

fn is_low_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

impl Realm {
    // §7.4.14 CreateIterResultObject
    pub fn create_iter_result_object(&mut self, value: JsValue, done: bool) -> JsObject {
        let obj = self.create_object();
        self.insert_property(obj, "value", value, Default::default());
        self.insert_property(obj, "done", JsValue::Boolean(done), Default::default());
        obj
    }

    fn create_builtin_iterator(&mut self, prototype: &str, state: IteratorState) -> JsResult<JsObject> {
        let proto = self.builtin_prototype(prototype)?;
        Ok(self.allocate(Some(proto), ObjectKind::Iterator(state)))
    }

    // §23.1.5.1 CreateArrayIterator
    pub fn create_array_iterator(&mut self, source: JsObject, kind: IteratorKind) -> JsResult<JsObject> {
        self.create_builtin_iterator(
            "%ArrayIteratorPrototype%",
            IteratorState::Array {
                source: Some(source),
                index: 0,
                kind,
            },
        )
    }

    pub fn create_string_iterator(&mut self, string: JsString) -> JsResult<JsObject> {
        self.create_builtin_iterator(
            "%StringIteratorPrototype%",
            IteratorState::String {
                string: Some(string),
                position: 0,
            },
        )
    }

    // §24.1.5.1 CreateMapIterator
    pub fn create_map_iterator(&mut self, map: JsObject, kind: IteratorKind) -> JsResult<JsObject> {
        let entries = self.entries_of(map, CollectionType::Map)?;
        let cursor = entries.borrow_mut().cursor();
        self.create_builtin_iterator(
            "%MapIteratorPrototype%",
            IteratorState::Map {
                source: Some((entries, cursor)),
                kind,
            },
        )
    }

    // §24.2.6.1 CreateSetIterator
    pub fn create_set_iterator(&mut self, set: JsObject, kind: IteratorKind) -> JsResult<JsObject> {
        let entries = self.entries_of(set, CollectionType::Set)?;
        let cursor = entries.borrow_mut().cursor();
        self.create_builtin_iterator(
            "%SetIteratorPrototype%",
            IteratorState::Set {
                source: Some((entries, cursor)),
                kind,
            },
        )
    }

    pub fn is_builtin_iterator(&self, obj: JsObject) -> bool {
        self.get_object(obj.id)
            .is_some_and(|data| matches!(data.borrow().kind, ObjectKind::Iterator(_)))
    }

    // Length seen by an array iterator on every step, so growth and
    // shrinkage of the source during iteration are observed.
    fn iterated_length(&mut self, source: JsObject) -> JsResult<f64> {
        {
            let data = self.obj_data(source)?;
            let data = data.borrow();
            match &data.kind {
                ObjectKind::TypedArray { view, .. } => return Ok(view.length() as f64),
                ObjectKind::Array => return Ok(f64::from(data.array_length())),
                _ => {}
            }
        }
        self.length_of_array_like(source)
    }

    fn entry_value(&mut self, key: JsValue, value: JsValue, kind: IteratorKind) -> JsResult<JsValue> {
        Ok(match kind {
            IteratorKind::Key => key,
            IteratorKind::Value => value,
            IteratorKind::KeyValue => self.create_array(vec![key, value])?.into(),
        })
    }

    /// Advances a built-in iterator object.
    pub fn builtin_iterator_next(&mut self, iterator: JsObject) -> JsResult<IterResult> {
        let state = match &self.obj_data(iterator)?.borrow().kind {
            ObjectKind::Iterator(state) => state.clone(),
            _ => {
                return Err(JsError::type_error(
                    "next method called on incompatible receiver",
                ));
            }
        };
        let (result, state) = match state {
            IteratorState::Array {
                source: Some(source),
                index,
                kind,
            } => {
                if f64::from(index) >= self.iterated_length(source)? {
                    (
                        IterResult::done(),
                        IteratorState::Array {
                            source: None,
                            index,
                            kind,
                        },
                    )
                } else {
                    let key = JsValue::Number(f64::from(index));
                    let value = match kind {
                        IteratorKind::Key => key,
                        _ => {
                            let element = self.get(source, &PropertyKey::from(index))?;
                            self.entry_value(key, element, kind)?
                        }
                    };
                    (
                        IterResult::value(value),
                        IteratorState::Array {
                            source: Some(source),
                            index: index + 1,
                            kind,
                        },
                    )
                }
            }
            IteratorState::String {
                string: Some(string),
                position,
            } => {
                let units = string.code_units();
                if position >= units.len() {
                    (
                        IterResult::done(),
                        IteratorState::String {
                            string: None,
                            position,
                        },
                    )
                } else {
                    let width = if is_high_surrogate(units[position])
                        && units.get(position + 1).is_some_and(|&u| is_low_surrogate(u))
                    {
                        2
                    } else {
                        1
                    };
                    let value = JsValue::String(string.slice_utf16(position, position + width));
                    (
                        IterResult::value(value),
                        IteratorState::String {
                            string: Some(string),
                            position: position + width,
                        },
                    )
                }
            }
            IteratorState::Map {
                source: Some((entries, cursor)),
                kind,
            } => {
                let next = entries.borrow().next_entry(&cursor);
                match next {
                    Some((key, value)) => (
                        IterResult::value(self.entry_value(key, value, kind)?),
                        IteratorState::Map {
                            source: Some((entries, cursor)),
                            kind,
                        },
                    ),
                    None => (IterResult::done(), IteratorState::Map { source: None, kind }),
                }
            }
            IteratorState::Set {
                source: Some((entries, cursor)),
                kind,
            } => {
                let next = entries.borrow().next_entry(&cursor);
                match next {
                    Some((key, _)) => (
                        IterResult::value(self.entry_value(key.clone(), key, kind)?),
                        IteratorState::Set {
                            source: Some((entries, cursor)),
                            kind,
                        },
                    ),
                    None => (IterResult::done(), IteratorState::Set { source: None, kind }),
                }
            }
            finished => (IterResult::done(), finished),
        };
        self.obj_data(iterator)?.borrow_mut().kind = ObjectKind::Iterator(state);
        Ok(result)
    }

    // §7.4.2 GetIterator
    pub fn get_iterator(&mut self, value: &JsValue) -> JsResult<IteratorRecord> {
        let key = PropertyKey::from(self.symbol_iterator());
        let Some(method) = self.get_method(value, &key)? else {
            return Err(JsError::type_error(format!(
                "{} is not iterable",
                self.describe(value)
            )));
        };
        let iterator = self.call(&method, value, &[])?;
        let Some(iterator) = iterator.as_object() else {
            return Err(JsError::type_error(
                "Result of the Symbol.iterator method is not an object",
            ));
        };
        let next_method = self.get(iterator, &PropertyKey::from("next"))?;
        Ok(IteratorRecord {
            iterator,
            next_method,
            done: false,
        })
    }

    // §7.4.4 IteratorNext
    pub fn iterator_next(&mut self, record: &IteratorRecord, arg: Option<JsValue>) -> JsResult<JsObject> {
        let args: Vec<JsValue> = arg.into_iter().collect();
        let result = self.call(&record.next_method, &JsValue::Object(record.iterator), &args)?;
        result.as_object().ok_or_else(|| {
            JsError::type_error(format!("Iterator result {result} is not an object"))
        })
    }

    // §7.4.8 IteratorStepValue
    /// The next value, or `None` once the iterator reports done.
    pub fn iterator_step(&mut self, record: &mut IteratorRecord) -> JsResult<Option<JsValue>> {
        if record.done {
            return Ok(None);
        }
        let result = match self.iterator_next(record, None) {
            Ok(result) => result,
            Err(err) => {
                record.done = true;
                return Err(err);
            }
        };
        let done = self.get(result, &PropertyKey::from("done"))?;
        if to_boolean(&done) {
            record.done = true;
            return Ok(None);
        }
        self.get(result, &PropertyKey::from("value")).map(Some)
    }

    // §7.4.10 IteratorClose
    /// Calls the iterator's `return` method. When `completion` is an error
    /// that error wins over anything `return` does.
    pub fn iterator_close(&mut self, record: &IteratorRecord, completion: JsResult<()>) -> JsResult<()> {
        let iterator = JsValue::Object(record.iterator);
        let method = self.get_method(&iterator, &PropertyKey::from("return"));
        match completion {
            Err(err) => {
                if let Ok(Some(method)) = method {
                    let _ = self.call(&method, &iterator, &[]);
                }
                Err(err)
            }
            Ok(()) => {
                let Some(method) = method? else {
                    return Ok(());
                };
                let result = self.call(&method, &iterator, &[])?;
                if !result.is_object() {
                    return Err(JsError::type_error("iterator.return() did not return an object"));
                }
                Ok(())
            }
        }
    }

    fn uses_intrinsic_next(&self, record: &IteratorRecord) -> bool {
        let Some(data) = self.get_object(record.iterator.id) else {
            return false;
        };
        let proto = {
            let data = data.borrow();
            if !matches!(data.kind, ObjectKind::Iterator(_)) {
                return false;
            }
            data.prototype
        };
        proto.is_some_and(|proto| {
            !self.is_overridden(&self.switchpoint_name(proto, &PropertyKey::from("next")))
        }) && record
                .next_method
                .as_object()
                .is_some_and(|f| self.intrinsic_next.contains(&f))
    }

    /// Drives `iterable` to completion, handing each value to `on_each`. If
    /// `on_each` fails the iterator is closed and the callback's error is
    /// returned.
    pub fn iterate(
        &mut self,
        iterable: &JsValue,
        mut on_each: impl FnMut(&mut Realm, JsValue) -> JsResult<()>,
    ) -> JsResult<()> {
        let mut record = self.get_iterator(iterable)?;
        let fast = self.uses_intrinsic_next(&record);
        loop {
            let next = if fast {
                self.builtin_iterator_next(record.iterator)?.into_option()
            } else {
                self.iterator_step(&mut record)?
            };
            let Some(value) = next else {
                return Ok(());
            };
            if let Err(err) = on_each(self, value) {
                return self.iterator_close(&record, Err(err));
            }
        }
    }

    /// Collects every value of `iterable`.
    pub fn iterable_to_list(&mut self, iterable: &JsValue) -> JsResult<Vec<JsValue>> {
        let mut values = Vec::new();
        self.iterate(iterable, |_, value| {
            values.push(value);
            Ok(())
        })?;
        Ok(values)
    }
}
