//! Object slot registry with pin counts and a mark/sweep collector.

use super::object::{Callable, JsObject, VarLink};
use crate::types::{JsValue, ObjectId};

struct Slot {
    object: JsObject,
    pins: u32,
}

#[derive(Default)]
pub struct Heap {
    slots: Vec<Option<Slot>>,
    free_list: Vec<u32>,
    allocated_since_gc: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GcStats {
    pub live: usize,
    pub freed: usize,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, object: JsObject) -> ObjectId {
        self.allocated_since_gc += 1;
        let slot = Some(Slot { object, pins: 0 });
        match self.free_list.pop() {
            Some(idx) => {
                self.slots[idx as usize] = slot;
                ObjectId(idx)
            }
            None => {
                let idx = self.slots.len() as u32;
                self.slots.push(slot);
                ObjectId(idx)
            }
        }
    }

    pub fn get(&self, id: ObjectId) -> Option<&JsObject> {
        self.slots.get(id.index())?.as_ref().map(|s| &s.object)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut JsObject> {
        self.slots.get_mut(id.index())?.as_mut().map(|s| &mut s.object)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    pub fn pin(&mut self, id: ObjectId) {
        if let Some(Some(slot)) = self.slots.get_mut(id.index()) {
            slot.pins += 1;
        }
    }

    pub fn unpin(&mut self, id: ObjectId) {
        if let Some(Some(slot)) = self.slots.get_mut(id.index()) {
            slot.pins = slot.pins.saturating_sub(1);
        }
    }

    pub fn allocated_since_gc(&self) -> usize {
        self.allocated_since_gc
    }

    pub fn live(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Frees every object not reachable from `roots` or from a pinned object.
    pub fn collect(&mut self, roots: impl IntoIterator<Item = ObjectId>) -> GcStats {
        self.allocated_since_gc = 0;
        let mut marks = vec![false; self.slots.len()];
        let mut worklist: Vec<ObjectId> = roots.into_iter().collect();
        for (idx, slot) in self.slots.iter().enumerate() {
            if slot.as_ref().is_some_and(|s| s.pins > 0) {
                worklist.push(ObjectId(idx as u32));
            }
        }

        while let Some(id) = worklist.pop() {
            let idx = id.index();
            if idx >= marks.len() || marks[idx] {
                continue;
            }
            let Some(obj) = self.get(id) else { continue };
            marks[idx] = true;
            trace_object(obj, &mut worklist);
        }

        let mut stats = GcStats::default();
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_none() {
                continue;
            }
            if marks[idx] {
                stats.live += 1;
            } else {
                *slot = None;
                self.free_list.push(idx as u32);
                stats.freed += 1;
            }
        }
        stats
    }
}

pub(crate) fn trace_value(value: &JsValue, worklist: &mut Vec<ObjectId>) {
    if let JsValue::Object(r) = value {
        worklist.extend(r.id);
        worklist.extend(r.this);
    }
}

fn trace_object(obj: &JsObject, worklist: &mut Vec<ObjectId>) {
    for var in &obj.properties {
        trace_value(&var.value, worklist);
        match &var.link {
            VarLink::None => {}
            VarLink::Hook(hook) => worklist.push(hook.owner),
            VarLink::Synonym(target) => worklist.push(target.object),
        }
    }
    if let Some(Callable::Script { scope, .. }) = &obj.callable {
        worklist.push(*scope);
    }
    worklist.extend(obj.constructor);
    worklist.extend(obj.prototype);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linked(heap: &mut Heap, target: ObjectId) -> ObjectId {
        let mut obj = JsObject::default();
        obj.put("next", JsValue::object(target));
        heap.alloc(obj)
    }

    #[test]
    fn unreachable_objects_are_freed() {
        let mut heap = Heap::new();
        let leaf = heap.alloc(JsObject::default());
        let root = linked(&mut heap, leaf);
        let garbage = heap.alloc(JsObject::default());
        let stats = heap.collect([root]);
        assert_eq!(stats, GcStats { live: 2, freed: 1 });
        assert!(heap.contains(leaf));
        assert!(!heap.contains(garbage));
    }

    #[test]
    fn pinned_objects_survive() {
        let mut heap = Heap::new();
        let leaf = heap.alloc(JsObject::default());
        let pinned = linked(&mut heap, leaf);
        heap.pin(pinned);
        heap.collect([]);
        assert!(heap.contains(pinned));
        assert!(heap.contains(leaf));
        heap.unpin(pinned);
        heap.collect([]);
        assert!(!heap.contains(pinned));
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut heap = Heap::new();
        let a = heap.alloc(JsObject::default());
        heap.collect([]);
        let b = heap.alloc(JsObject::default());
        assert_eq!(a, b);
        assert_eq!(heap.live(), 1);
    }

    #[test]
    fn prototype_links_are_traced() {
        let mut heap = Heap::new();
        let proto = heap.alloc(JsObject::default());
        let obj = heap.alloc(JsObject::with_prototype(Some(proto)));
        heap.collect([obj]);
        assert!(heap.contains(proto));
    }
}
