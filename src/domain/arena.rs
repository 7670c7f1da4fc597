/// Slot arena with generation-checked handles.
///
/// Per-level entity collections live here. Removal is O(1) (the slot goes
/// on a free list), handles to removed entities stop resolving instead of
/// dangling, and iteration walks slots in index order so the collision
/// pass is deterministic.

use std::marker::PhantomData;

pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

// Manual impls: derives would require `T: Clone` etc.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Handle<T> {}
impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}
impl<T> Eq for Handle<T> {}
impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Arena { slots: Vec::new(), free: Vec::new() }
    }

    pub fn insert(&mut self, value: T) -> Handle<T> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Handle { index, generation: slot.generation, _marker: PhantomData };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, value: Some(value) });
        Handle { index, generation: 0, _marker: PhantomData }
    }

    pub fn get(&self, h: Handle<T>) -> Option<&T> {
        self.slots
            .get(h.index as usize)
            .filter(|s| s.generation == h.generation)
            .and_then(|s| s.value.as_ref())
    }

    pub fn get_mut(&mut self, h: Handle<T>) -> Option<&mut T> {
        self.slots
            .get_mut(h.index as usize)
            .filter(|s| s.generation == h.generation)
            .and_then(|s| s.value.as_mut())
    }

    /// Remove and return the value. Bumps the slot generation so old
    /// handles no longer resolve, even after the slot is reused.
    pub fn remove(&mut self, h: Handle<T>) -> Option<T> {
        let slot = self.slots.get_mut(h.index as usize)?;
        if slot.generation != h.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(h.index);
        Some(value)
    }

    /// Two-pass retain: collect the handles to drop, then remove them.
    /// Returns the removed handles in slot order.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) -> Vec<Handle<T>> {
        let doomed: Vec<Handle<T>> = self
            .iter()
            .filter(|(_, v)| !keep(*v))
            .map(|(h, _)| h)
            .collect();
        for &h in &doomed {
            self.remove(h);
        }
        doomed
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.value.as_ref().map(|v| {
                (Handle { index: i as u32, generation: s.generation, _marker: PhantomData }, v)
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> + '_ {
        self.slots.iter_mut().enumerate().filter_map(|(i, s)| {
            let generation = s.generation;
            s.value.as_mut().map(move |v| {
                (Handle { index: i as u32, generation, _marker: PhantomData }, v)
            })
        })
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.slots.iter().filter_map(|s| s.value.as_ref())
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.slots.iter_mut().filter_map(|s| s.value.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut a = Arena::new();
        let h1 = a.insert("one");
        let h2 = a.insert("two");
        assert_eq!(a.values().count(), 2);
        assert_eq!(a.get(h1), Some(&"one"));
        assert_eq!(a.remove(h1), Some("one"));
        assert_eq!(a.get(h1), None);
        assert_eq!(a.remove(h1), None);
        assert_eq!(a.get(h2), Some(&"two"));
        assert_eq!(a.values().count(), 1);
    }

    #[test]
    fn stale_handle_does_not_see_reused_slot() {
        let mut a = Arena::new();
        let old = a.insert(1);
        a.remove(old);
        let new = a.insert(2);
        assert_ne!(old, new);
        assert_eq!(a.get(old), None);
        assert_eq!(a.get(new), Some(&2));
    }

    #[test]
    fn retain_is_two_pass_and_ordered() {
        let mut a = Arena::new();
        for i in 0..6 {
            a.insert(i);
        }
        let removed = a.retain(|v| v % 2 == 0);
        assert_eq!(removed.len(), 3);
        let left: Vec<i32> = a.values().copied().collect();
        assert_eq!(left, vec![0, 2, 4]);
        for h in removed {
            assert_eq!(a.get(h), None);
        }
    }

    #[test]
    fn iteration_follows_slot_order() {
        let mut a = Arena::new();
        let h0 = a.insert('a');
        a.insert('b');
        a.insert('c');
        a.remove(h0);
        a.insert('d'); // reuses slot 0
        let order: Vec<char> = a.values().copied().collect();
        assert_eq!(order, vec!['d', 'b', 'c']);
    }
}
