//! Stop-the-world mark and sweep over the realm's object arena.
//!
//! Roots are the realm's own intrinsics plus whatever the host passes in.
//! Native closures are opaque to the marker: a host that captures object
//! handles inside a closure must pass those handles as roots.
//!
//! WeakMap entries are ephemerons. A value is kept alive only while both the
//! map and its key are reachable through something other than the entry
//! itself. WeakMap and WeakSet entries whose key dies are removed during the
//! sweep.

use tracing::debug;

use super::Realm;
use super::types::{IteratorState, ObjectKind, PropertyValue, WeakTable};
use crate::types::{JsObject, JsValue};

struct Marker {
    marked: Vec<bool>,
    stack: Vec<u64>,
    weak_maps: Vec<WeakTable>,
}

impl Marker {
    fn push(&mut self, id: u64) {
        if let Some(mark) = self.marked.get_mut(id as usize)
            && !*mark
        {
            *mark = true;
            self.stack.push(id);
        }
    }

    fn push_value(&mut self, value: &JsValue) {
        if let JsValue::Object(obj) = value {
            self.push(obj.id);
        }
    }

    fn is_marked(&self, id: u64) -> bool {
        self.marked.get(id as usize).copied().unwrap_or(false)
    }
}

impl Realm {
    fn intrinsic_roots(&self) -> Vec<JsObject> {
        let mut roots = vec![self.global, self.object_prototype, self.function_prototype];
        roots.extend(self.registry.materialized_objects());
        roots.extend(self.intrinsic_next.iter().copied());
        roots
    }

    fn trace_object(&self, id: u64, marker: &mut Marker) {
        let Some(data) = self.get_object(id) else {
            return;
        };
        let data = data.borrow();
        if let Some(proto) = data.prototype {
            marker.push(proto.id);
        }
        for slot in &data.slots {
            match slot {
                PropertyValue::Data(value) => marker.push_value(value),
                PropertyValue::Accessor { get, set } => {
                    marker.push_value(get);
                    marker.push_value(set);
                }
                PropertyValue::LazyBuiltin => {}
            }
        }
        if let Some(elements) = &data.elements {
            for (_, value) in elements.entries() {
                marker.push_value(&value);
            }
        }
        match &data.kind {
            ObjectKind::TypedArray { buffer, .. } | ObjectKind::DataView { buffer, .. } => {
                marker.push(buffer.id);
            }
            ObjectKind::Map(entries) | ObjectKind::Set(entries) => {
                for (key, value) in entries.borrow().iter() {
                    marker.push_value(key);
                    marker.push_value(value);
                }
            }
            ObjectKind::WeakMap(table) => marker.weak_maps.push(table.clone()),
            ObjectKind::Iterator(state) => match state {
                IteratorState::Array {
                    source: Some(source),
                    ..
                } => marker.push(source.id),
                IteratorState::Map {
                    source: Some((entries, _)),
                    ..
                }
                | IteratorState::Set {
                    source: Some((entries, _)),
                    ..
                } => {
                    for (key, value) in entries.borrow().iter() {
                        marker.push_value(key);
                        marker.push_value(value);
                    }
                }
                _ => {}
            },
            ObjectKind::Primitive(value) => marker.push_value(value),
            _ => {}
        }
    }

    /// Frees every object not reachable from the realm's intrinsics or from
    /// `roots`, and returns how many were freed. Handles to freed objects
    /// must not be used again; their ids are recycled.
    pub fn collect_garbage(&mut self, roots: &[JsValue]) -> usize {
        let mut marker = Marker {
            marked: vec![false; self.objects.len()],
            stack: Vec::new(),
            weak_maps: Vec::new(),
        };
        for root in self.intrinsic_roots() {
            marker.push(root.id);
        }
        for root in roots {
            marker.push_value(root);
        }

        // Ephemeron fixpoint: drain the stack, then release values whose keys
        // turned out reachable, until nothing new is found.
        let mut scanned = 0;
        loop {
            while let Some(id) = marker.stack.pop() {
                self.trace_object(id, &mut marker);
            }
            let mut found = Vec::new();
            for table in &marker.weak_maps {
                for (key, value) in table.borrow().iter() {
                    if marker.is_marked(*key)
                        && let JsValue::Object(obj) = value
                        && !marker.is_marked(obj.id)
                    {
                        found.push(obj.id);
                    }
                }
            }
            scanned += 1;
            if found.is_empty() {
                break;
            }
            for id in found {
                marker.push(id);
            }
        }

        let mut freed = 0;
        for (index, slot) in self.objects.iter_mut().enumerate() {
            if slot.is_some() && !marker.marked[index] {
                *slot = None;
                self.free_list.push(index);
                freed += 1;
            }
        }
        for slot in self.objects.iter().flatten() {
            let data = slot.borrow();
            if let ObjectKind::WeakMap(table) | ObjectKind::WeakSet(table) = &data.kind {
                table.borrow_mut().retain(|key, _| marker.is_marked(*key));
            }
        }
        debug!(
            freed,
            live = self.object_count(),
            ephemeron_passes = scanned,
            "garbage collection finished"
        );
        freed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PropertyKey;

    #[test]
    fn unreachable_objects_are_freed() {
        let mut realm = Realm::new();
        let kept = realm.create_object();
        let dropped = realm.create_object();
        let before = realm.object_count();
        let freed = realm.collect_garbage(&[kept.into()]);
        assert!(freed >= 1);
        assert_eq!(realm.object_count(), before - freed);
        assert!(realm.get_object(kept.id).is_some());
        assert!(realm.get_object(dropped.id).is_none());
        assert!(realm.get(dropped, &PropertyKey::from("x")).is_err());
    }

    #[test]
    fn objects_reachable_from_globals_survive() {
        let mut realm = Realm::new();
        let child = realm.create_object();
        let arr = realm.create_array(vec![child.into()]).unwrap();
        let global = realm.global();
        realm
            .set(global, &PropertyKey::from("keep"), arr.into(), true)
            .unwrap();
        realm.collect_garbage(&[]);
        assert!(realm.get_object(arr.id).is_some());
        assert!(realm.get_object(child.id).is_some());
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut realm = Realm::new();
        let dropped = realm.create_object();
        realm.collect_garbage(&[]);
        let fresh = realm.create_object();
        assert_eq!(fresh.id, dropped.id);
    }

    #[test]
    fn weak_map_values_follow_their_keys() {
        let mut realm = Realm::new();
        let map = realm.create_weak_map().unwrap();
        let live_key = realm.create_object();
        let live_value = realm.create_object();
        let dead_key = realm.create_object();
        let dead_value = realm.create_object();
        realm.weak_map_set(map, &live_key.into(), live_value.into()).unwrap();
        realm.weak_map_set(map, &dead_key.into(), dead_value.into()).unwrap();

        realm.collect_garbage(&[map.into(), live_key.into()]);
        assert!(realm.get_object(live_value.id).is_some());
        assert!(realm.get_object(dead_key.id).is_none());
        assert!(realm.get_object(dead_value.id).is_none());
        assert!(realm.weak_map_has(map, &live_key.into()).unwrap());
    }

    #[test]
    fn ephemeron_chains_reach_a_fixpoint() {
        let mut realm = Realm::new();
        let map = realm.create_weak_map().unwrap();
        let first = realm.create_object();
        let second = realm.create_object();
        let third = realm.create_object();
        realm.weak_map_set(map, &second.into(), third.into()).unwrap();
        realm.weak_map_set(map, &first.into(), second.into()).unwrap();

        realm.collect_garbage(&[map.into(), first.into()]);
        assert!(realm.get_object(second.id).is_some());
        assert!(realm.get_object(third.id).is_some());
    }

    #[test]
    fn weak_set_entries_are_pruned() {
        let mut realm = Realm::new();
        let set = realm.create_weak_set().unwrap();
        let member = realm.create_object();
        realm.weak_set_add(set, &member.into()).unwrap();
        realm.collect_garbage(&[set.into()]);
        let reused = realm.create_object();
        assert_eq!(reused.id, member.id);
        assert!(!realm.weak_set_has(set, &reused.into()).unwrap());
    }

    #[test]
    fn map_iterators_keep_entries_alive() {
        let mut realm = Realm::new();
        let map = realm.create_map().unwrap();
        let value = realm.create_object();
        realm.map_set(map, JsValue::str("k"), value.into()).unwrap();
        let it = realm
            .create_map_iterator(map, crate::runtime::types::IteratorKind::Value)
            .unwrap();
        realm.collect_garbage(&[it.into()]);
        assert!(realm.get_object(value.id).is_some());
        let step = realm.builtin_iterator_next(it).unwrap();
        assert_eq!(step.value.as_object(), Some(value));
    }
}
