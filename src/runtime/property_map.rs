//! Property maps ("shapes") with a transition cache.
//!
//! A `PropertyMap` is an immutable, ordered list of (key, attributes, slot)
//! triples. Objects that were built by the same sequence of additions,
//! deletions and attribute changes from the same root share one map
//! instance, so shape equality is `Rc::ptr_eq`.
//!
//! Slots are dense: slot `i` is the `i`-th property in insertion order. A
//! deletion therefore shifts every later slot down by one, and the owning
//! object removes the matching value from its slot vector.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::{JsError, JsResult};
use crate::types::PropertyKey;

static NEXT_MAP_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyAttributes {
    pub writable: bool,
    pub enumerable: bool,
    pub configurable: bool,
    /// Slot holds a getter/setter pair rather than a value.
    pub accessor: bool,
    /// Overwriting or deleting this property invalidates the realm switchpoint
    /// registered under the property's name.
    pub builtin: bool,
}

impl PropertyAttributes {
    /// Attributes of a property created by plain assignment.
    pub const DEFAULT: PropertyAttributes = PropertyAttributes {
        writable: true,
        enumerable: true,
        configurable: true,
        accessor: false,
        builtin: false,
    };

    /// Attributes used for builtin methods: writable, non-enumerable, configurable.
    pub const BUILTIN_METHOD: PropertyAttributes = PropertyAttributes {
        writable: true,
        enumerable: false,
        configurable: true,
        accessor: false,
        builtin: true,
    };

    pub fn data(writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            writable,
            enumerable,
            configurable,
            accessor: false,
            builtin: false,
        }
    }

    pub fn accessor(enumerable: bool, configurable: bool) -> Self {
        Self {
            writable: false,
            enumerable,
            configurable,
            accessor: true,
            builtin: false,
        }
    }

    pub fn is_default_data(&self) -> bool {
        self.writable && self.enumerable && self.configurable && !self.accessor
    }

    fn without_builtin(self) -> Self {
        Self {
            builtin: false,
            ..self
        }
    }
}

impl Default for PropertyAttributes {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: PropertyKey,
    pub attributes: PropertyAttributes,
    pub slot: usize,
}

#[derive(Clone, PartialEq, Eq, Hash)]
enum Transition {
    Add(PropertyKey, PropertyAttributes),
    Delete(PropertyKey),
    Modify(PropertyKey, PropertyAttributes),
}

pub struct PropertyMap {
    id: u64,
    properties: Vec<Property>,
    index: FxHashMap<PropertyKey, usize>,
    // Keeps the chain back to the root alive so memoised children stay
    // reachable from it for as long as any descendant is in use.
    _parent: Option<Rc<PropertyMap>>,
    transitions: RefCell<FxHashMap<Transition, Weak<PropertyMap>>>,
}

impl PropertyMap {
    pub fn root() -> Rc<PropertyMap> {
        Rc::new(PropertyMap {
            id: NEXT_MAP_ID.fetch_add(1, Ordering::Relaxed),
            properties: Vec::new(),
            index: FxHashMap::default(),
            _parent: None,
            transitions: RefCell::new(FxHashMap::default()),
        })
    }

    /// Identity token; two maps have the same id only if they are the same map.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn slot_count(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn find_property(&self, key: &PropertyKey) -> Option<&Property> {
        self.index.get(key).map(|&i| &self.properties[i])
    }

    /// Returns the map extended with `key`, which must not be present yet.
    /// Existing properties change through [`PropertyMap::modify_property`].
    pub fn add_property(
        self: &Rc<Self>,
        key: PropertyKey,
        attributes: PropertyAttributes,
    ) -> Rc<PropertyMap> {
        debug_assert!(!self.index.contains_key(&key), "property {key} already exists");
        self.transition(Transition::Add(key.clone(), attributes), |map| {
            let slot = map.properties.len();
            map.index.insert(key.clone(), slot);
            map.properties.push(Property {
                key: key.clone(),
                attributes,
                slot,
            });
        })
    }

    /// Returns the map without `key`; later slots shift down by one. Deleting
    /// an absent key returns the same map.
    pub fn delete_property(self: &Rc<Self>, key: &PropertyKey) -> Rc<PropertyMap> {
        let Some(&removed) = self.index.get(key) else {
            return Rc::clone(self);
        };
        self.transition(Transition::Delete(key.clone()), |map| {
            map.properties.remove(removed);
            for (i, prop) in map.properties.iter_mut().enumerate() {
                prop.slot = i;
            }
            map.index = map
                .properties
                .iter()
                .map(|p| (p.key.clone(), p.slot))
                .collect();
        })
    }

    /// Changes the attributes of an existing property, keeping its slot.
    ///
    /// A non-configurable property may only go from writable to read-only;
    /// any other change is a TypeError.
    pub fn modify_property(
        self: &Rc<Self>,
        key: &PropertyKey,
        attributes: PropertyAttributes,
    ) -> JsResult<Rc<PropertyMap>> {
        let Some(existing) = self.find_property(key) else {
            return Err(JsError::type_error(format!(
                "Cannot modify missing property: {key}"
            )));
        };
        let old = existing.attributes.without_builtin();
        let new = attributes.without_builtin();
        if !old.configurable && old != new {
            let allowed = !new.configurable
                && old.enumerable == new.enumerable
                && !old.accessor
                && !new.accessor
                && old.writable
                && !new.writable;
            if !allowed {
                return Err(JsError::type_error(format!(
                    "Cannot redefine property: {key}"
                )));
            }
        }
        Ok(self.replace_attributes(key.clone(), attributes))
    }

    // Unchecked attribute change for callers that validated it already.
    pub(crate) fn replace_attributes(
        self: &Rc<Self>,
        key: PropertyKey,
        attributes: PropertyAttributes,
    ) -> Rc<PropertyMap> {
        match self.find_property(&key) {
            Some(p) if p.attributes == attributes => return Rc::clone(self),
            None => return Rc::clone(self),
            Some(_) => {}
        }
        self.transition(Transition::Modify(key.clone(), attributes), |map| {
            if let Some(&i) = map.index.get(&key) {
                map.properties[i].attributes = attributes;
            }
        })
    }

    fn transition(
        self: &Rc<Self>,
        transition: Transition,
        apply: impl FnOnce(&mut PropertyMap),
    ) -> Rc<PropertyMap> {
        if let Some(cached) = self
            .transitions
            .borrow()
            .get(&transition)
            .and_then(Weak::upgrade)
        {
            return cached;
        }
        trace!(map = self.id, "property map transition miss");
        let mut next = PropertyMap {
            id: NEXT_MAP_ID.fetch_add(1, Ordering::Relaxed),
            properties: self.properties.clone(),
            index: self.index.clone(),
            _parent: Some(Rc::clone(self)),
            transitions: RefCell::new(FxHashMap::default()),
        };
        apply(&mut next);
        let next = Rc::new(next);
        self.transitions
            .borrow_mut()
            .insert(transition, Rc::downgrade(&next));
        next
    }
}

impl fmt::Debug for PropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyMap")
            .field("id", &self.id)
            .field("properties", &self.properties)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> PropertyKey {
        PropertyKey::from(s)
    }

    #[test]
    fn same_additions_share_a_map() {
        let root = PropertyMap::root();
        let a = root
            .add_property(key("x"), PropertyAttributes::DEFAULT)
            .add_property(key("y"), PropertyAttributes::DEFAULT);
        let b = root
            .add_property(key("x"), PropertyAttributes::DEFAULT)
            .add_property(key("y"), PropertyAttributes::DEFAULT);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(a.id(), b.id());

        let c = root
            .add_property(key("y"), PropertyAttributes::DEFAULT)
            .add_property(key("x"), PropertyAttributes::DEFAULT);
        assert!(!Rc::ptr_eq(&a, &c));
    }

    #[test]
    fn attributes_are_part_of_the_shape() {
        let root = PropertyMap::root();
        let a = root.add_property(key("x"), PropertyAttributes::DEFAULT);
        let b = root.add_property(key("x"), PropertyAttributes::data(false, true, true));
        assert!(!Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn delete_renumbers_slots() {
        let root = PropertyMap::root();
        let map = root
            .add_property(key("a"), PropertyAttributes::DEFAULT)
            .add_property(key("b"), PropertyAttributes::DEFAULT)
            .add_property(key("c"), PropertyAttributes::DEFAULT);
        let deleted = map.delete_property(&key("a"));
        assert_eq!(deleted.slot_count(), 2);
        assert_eq!(deleted.find_property(&key("b")).map(|p| p.slot), Some(0));
        assert_eq!(deleted.find_property(&key("c")).map(|p| p.slot), Some(1));
        assert!(deleted.find_property(&key("a")).is_none());

        let again = map.delete_property(&key("a"));
        assert!(Rc::ptr_eq(&deleted, &again));
        assert!(Rc::ptr_eq(&map.delete_property(&key("zz")), &map));
    }

    #[test]
    fn modify_keeps_slot() {
        let root = PropertyMap::root();
        let map = root
            .add_property(key("a"), PropertyAttributes::DEFAULT)
            .add_property(key("b"), PropertyAttributes::DEFAULT);
        let modified = map
            .modify_property(&key("a"), PropertyAttributes::data(false, false, false))
            .unwrap();
        let prop = modified.find_property(&key("a")).unwrap();
        assert_eq!(prop.slot, 0);
        assert!(!prop.attributes.writable);
        assert_eq!(
            modified.properties().iter().map(|p| p.key.clone()).collect::<Vec<_>>(),
            vec![key("a"), key("b")]
        );
    }

    #[test]
    fn non_configurable_conflict_is_rejected() {
        let root = PropertyMap::root();
        let map = root.add_property(key("a"), PropertyAttributes::data(true, true, false));
        let err = map
            .modify_property(&key("a"), PropertyAttributes::DEFAULT)
            .unwrap_err();
        assert!(matches!(err, JsError::TypeError(_)));

        // Dropping writability is the one change a non-configurable data
        // property accepts.
        let frozen = map
            .modify_property(&key("a"), PropertyAttributes::data(false, true, false))
            .unwrap();
        assert!(!frozen.find_property(&key("a")).unwrap().attributes.writable);
        assert!(frozen
            .modify_property(&key("a"), PropertyAttributes::data(true, true, false))
            .is_err());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "already exists")]
    fn adding_a_present_key_is_a_bug() {
        let map = PropertyMap::root().add_property(key("a"), PropertyAttributes::data(true, true, false));
        map.add_property(key("a"), PropertyAttributes::DEFAULT);
    }

    #[test]
    fn shapes_stay_shared_while_descendants_live() {
        let root = PropertyMap::root();
        let leaf = root
            .add_property(key("a"), PropertyAttributes::DEFAULT)
            .add_property(key("b"), PropertyAttributes::DEFAULT);
        // The intermediate map is only held through `leaf`'s parent link.
        let again = root
            .add_property(key("a"), PropertyAttributes::DEFAULT)
            .add_property(key("b"), PropertyAttributes::DEFAULT);
        assert!(Rc::ptr_eq(&leaf, &again));
    }
}
