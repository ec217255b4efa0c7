//! Lazily materialised builtins and their invalidation switchpoints.
//!
//! Every builtin (constructor plus prototype, or an internal prototype such as
//! `%ArrayIteratorPrototype%`) is registered with a materialiser that runs the
//! first time the builtin is requested. Exposed builtins start out as lazy
//! bindings on the global object.
//!
//! A [`SwitchPoint`] is a one-way flag. Global bindings use the bare name
//! (`"Map"`); methods use their owner's path (`"Map.prototype.set"`,
//! `"%ArrayIteratorPrototype%.next"`). It flips the first time the binding or
//! builtin-marked method is overwritten or deleted, and never resets. Fast
//! paths check it to know whether the original builtin behaviour can still be
//! assumed.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::debug;

use super::Realm;
use super::types::PropertyValue;
use crate::error::{JsError, JsResult};
use crate::types::{JsObject, PropertyKey};

#[derive(Debug, Default)]
pub struct SwitchPoint {
    invalidated: Cell<bool>,
}

impl SwitchPoint {
    pub fn is_valid(&self) -> bool {
        !self.invalidated.get()
    }

    pub fn has_been_invalidated(&self) -> bool {
        self.invalidated.get()
    }

    fn invalidate(&self) -> bool {
        !self.invalidated.replace(true)
    }
}

/// The objects a materialiser produces.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinObjects {
    pub constructor: Option<JsObject>,
    pub prototype: Option<JsObject>,
}

pub(crate) type Materializer = fn(&mut Realm) -> JsResult<BuiltinObjects>;

#[derive(Debug, Clone, Copy)]
enum EntryState {
    Lazy,
    InProgress,
    Ready(BuiltinObjects),
}

struct BuiltinEntry {
    name: &'static str,
    exposed: bool,
    materialize: Materializer,
    state: EntryState,
}

#[derive(Default)]
pub struct BuiltinRegistry {
    entries: Vec<BuiltinEntry>,
    by_name: FxHashMap<&'static str, usize>,
    // Object id -> path used to qualify switchpoint names.
    owners: FxHashMap<u64, String>,
    switchpoints: RefCell<FxHashMap<String, Rc<SwitchPoint>>>,
}

impl BuiltinRegistry {
    pub(crate) fn register(&mut self, name: &'static str, exposed: bool, materialize: Materializer) {
        self.by_name.insert(name, self.entries.len());
        self.entries.push(BuiltinEntry {
            name,
            exposed,
            materialize,
            state: EntryState::Lazy,
        });
    }

    pub(crate) fn mark_ready(&mut self, name: &str, objects: BuiltinObjects) {
        if let Some(&i) = self.by_name.get(name) {
            self.entries[i].state = EntryState::Ready(objects);
            let name = self.entries[i].name;
            self.record_owners(name, objects);
        }
    }

    fn record_owners(&mut self, name: &str, objects: BuiltinObjects) {
        if let Some(ctor) = objects.constructor {
            self.owners.insert(ctor.id, name.to_string());
        }
        if let Some(proto) = objects.prototype {
            let path = match objects.constructor {
                Some(_) => format!("{name}.prototype"),
                None => name.to_string(),
            };
            self.owners.insert(proto.id, path);
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|e| e.exposed)
            .map(|e| e.name)
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn is_exposed(&self, name: &str) -> bool {
        self.by_name
            .get(name)
            .is_some_and(|&i| self.entries[i].exposed)
    }

    pub fn is_materialized(&self, name: &str) -> bool {
        self.by_name
            .get(name)
            .is_some_and(|&i| matches!(self.entries[i].state, EntryState::Ready(_)))
    }

    pub fn switchpoint(&self, name: &str) -> Rc<SwitchPoint> {
        Rc::clone(
            self.switchpoints
                .borrow_mut()
                .entry(name.to_string())
                .or_default(),
        )
    }

    pub(crate) fn materialized_objects(&self) -> Vec<JsObject> {
        self.entries
            .iter()
            .filter_map(|e| match e.state {
                EntryState::Ready(objects) => Some(objects),
                _ => None,
            })
            .flat_map(|o| o.constructor.into_iter().chain(o.prototype))
            .collect()
    }
}

impl Realm {
    /// Returns the constructor (or, for internal entries, the prototype) of
    /// the named builtin, creating it on first request.
    pub fn get_builtin(&mut self, name: &str) -> JsResult<JsObject> {
        let objects = self.builtin_objects(name)?;
        objects
            .constructor
            .or(objects.prototype)
            .ok_or_else(|| JsError::reference_error(format!("{name} has no object")))
    }

    /// The `prototype` object of the named builtin.
    pub fn builtin_prototype(&mut self, name: &str) -> JsResult<JsObject> {
        self.builtin_objects(name)?
            .prototype
            .ok_or_else(|| JsError::reference_error(format!("{name} has no prototype")))
    }

    pub fn builtin_objects(&mut self, name: &str) -> JsResult<BuiltinObjects> {
        let Some(&index) = self.registry.by_name.get(name) else {
            return Err(JsError::reference_error(format!("{name} is not defined")));
        };
        let entry = &mut self.registry.entries[index];
        let materialize = match entry.state {
            EntryState::Ready(objects) => return Ok(objects),
            EntryState::InProgress => {
                return Err(JsError::type_error(format!(
                    "{name} is being initialized"
                )));
            }
            EntryState::Lazy => entry.materialize,
        };
        entry.state = EntryState::InProgress;
        let name = entry.name;
        let exposed = entry.exposed;
        debug!(builtin = name, "materializing builtin");
        let objects = match materialize(self) {
            Ok(objects) => objects,
            Err(err) => {
                self.registry.entries[index].state = EntryState::Lazy;
                return Err(err);
            }
        };
        self.registry.entries[index].state = EntryState::Ready(objects);
        self.registry.record_owners(name, objects);
        if exposed {
            self.resolve_lazy_global(name, objects)?;
        }
        Ok(objects)
    }

    // Replaces the lazy global binding, unless script already overwrote it.
    fn resolve_lazy_global(&mut self, name: &str, objects: BuiltinObjects) -> JsResult<()> {
        let Some(value) = objects.constructor.or(objects.prototype) else {
            return Ok(());
        };
        let global = self.obj_data(self.global)?;
        let mut global = global.borrow_mut();
        let key = PropertyKey::from(name);
        if matches!(global.own_named(&key), Some((_, PropertyValue::LazyBuiltin))) {
            global.set_slot(&key, PropertyValue::Data(value.into()))?;
        }
        Ok(())
    }

    /// Whether the builtin behaviour registered under `name` may have been
    /// replaced by script.
    pub fn is_overridden(&self, name: &str) -> bool {
        self.registry
            .switchpoints
            .borrow()
            .get(name)
            .is_some_and(|sp| sp.has_been_invalidated())
    }

    pub fn builtin_names(&self) -> Vec<&'static str> {
        self.registry.names()
    }

    pub fn is_materialized(&self, name: &str) -> bool {
        self.registry.is_materialized(name)
    }

    pub fn switchpoint(&self, name: &str) -> Rc<SwitchPoint> {
        self.registry.switchpoint(name)
    }

    /// Switchpoint name for `key` on `obj`: qualified by the builtin that
    /// owns `obj`, or the bare key for the global object and plain objects.
    pub(crate) fn switchpoint_name(&self, obj: JsObject, key: &PropertyKey) -> String {
        match self.registry.owners.get(&obj.id) {
            Some(owner) => format!("{owner}.{key}"),
            None => key.to_string(),
        }
    }

    pub(crate) fn invalidate(&self, name: &str) {
        if self.registry.switchpoint(name).invalidate() {
            debug!(name, "builtin switchpoint invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switchpoints_are_one_way() {
        let sp = SwitchPoint::default();
        assert!(sp.is_valid());
        assert!(sp.invalidate());
        assert!(!sp.invalidate());
        assert!(sp.has_been_invalidated());
    }

    #[test]
    fn switchpoints_are_shared_per_name() {
        let registry = BuiltinRegistry::default();
        let a = registry.switchpoint("Array.prototype.push");
        let b = registry.switchpoint("Array.prototype.push");
        assert!(Rc::ptr_eq(&a, &b));
        a.invalidate();
        assert!(b.has_been_invalidated());
        assert!(registry.switchpoint("Array.prototype.pop").is_valid());
    }

    #[test]
    fn method_switchpoints_are_qualified_by_owner() {
        let mut realm = Realm::new();
        let map_proto = realm.builtin_prototype("Map").unwrap();
        let weak_proto = realm.builtin_prototype("WeakMap").unwrap();
        let key = PropertyKey::from("set");
        assert_eq!(realm.switchpoint_name(map_proto, &key), "Map.prototype.set");
        realm.set(map_proto, &key, crate::types::JsValue::Null, true).unwrap();
        assert!(realm.is_overridden("Map.prototype.set"));
        assert!(!realm.is_overridden("WeakMap.prototype.set"));
        assert!(!realm.is_overridden("set"));
        assert!(realm.get(weak_proto, &key).unwrap().is_object());

        let global = realm.global();
        assert_eq!(realm.switchpoint_name(global, &PropertyKey::from("Map")), "Map");
    }
}
