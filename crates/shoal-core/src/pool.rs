//! Slot arena with a free list, used for high-churn entities (food).
//!
//! Removed slots are recycled by later inserts. Keys carry a generation so
//! a key to a removed entry never resolves to the slot's next occupant.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Stable handle into a [`Pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Reusable-instance allocator.
#[derive(Debug, Clone)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Pool<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn insert(&mut self, value: T) -> SlotKey {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return SlotKey {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        SlotKey {
            index,
            generation: 0,
        }
    }

    /// Remove and return the entry. A second call with the same key is a no-op.
    pub fn remove(&mut self, key: SlotKey) -> Option<T> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, key: SlotKey) -> Option<&T> {
        let slot = self.slots.get(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, key: SlotKey) -> Option<&mut T> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        slot.value.as_mut()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots ever allocated (live + free).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Iterate live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotKey, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.value.as_ref().map(|v| {
                (
                    SlotKey {
                        index: i as u32,
                        generation: slot.generation,
                    },
                    v,
                )
            })
        })
    }

    pub fn clear(&mut self) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(i as u32);
            }
        }
        self.len = 0;
    }
}

/// A food pellet. Food never moves and has no TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: String,
}

/// Food collection keyed by id, backed by a [`Pool`].
#[derive(Debug, Clone, Default)]
pub struct FoodField {
    pool: Pool<Food>,
    index: HashMap<String, SlotKey>,
}

impl FoodField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pellet. Returns false if the id is already present.
    pub fn insert(&mut self, food: Food) -> bool {
        if self.index.contains_key(&food.id) {
            return false;
        }
        let id = food.id.clone();
        let key = self.pool.insert(food);
        self.index.insert(id, key);
        true
    }

    /// Remove a pellet by id; `None` if it was already gone.
    pub fn remove(&mut self, id: &str) -> Option<Food> {
        let key = self.index.remove(id)?;
        self.pool.remove(key)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Food> {
        self.index.get(id).and_then(|k| self.pool.get(*k))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Food> {
        self.pool.iter().map(|(_, f)| f)
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn snapshot(&self) -> Vec<Food> {
        self.iter().cloned().collect()
    }

    /// Replace the whole collection (bootstrap from a full snapshot).
    pub fn replace_all(&mut self, foods: impl IntoIterator<Item = Food>) {
        self.pool.clear();
        self.index.clear();
        for food in foods {
            self.insert(food);
        }
    }

    /// Slots allocated so far, including recycled ones.
    pub fn allocated(&self) -> usize {
        self.pool.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pellet(id: &str) -> Food {
        Food {
            id: id.to_string(),
            x: 10.0,
            y: 20.0,
            radius: 5.0,
            color: "#ffcc00".to_string(),
        }
    }

    #[test]
    fn removed_slots_are_reused() {
        let mut pool = Pool::new();
        let a = pool.insert(1);
        let _b = pool.insert(2);
        assert_eq!(pool.remove(a), Some(1));
        let c = pool.insert(3);
        assert_eq!(pool.capacity(), 2);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(c), Some(&3));
    }

    #[test]
    fn stale_key_does_not_alias_new_occupant() {
        let mut pool = Pool::new();
        let a = pool.insert("old");
        pool.remove(a);
        let b = pool.insert("new");
        assert_eq!(pool.get(a), None);
        assert_eq!(pool.remove(a), None);
        assert_eq!(pool.get(b), Some(&"new"));
    }

    #[test]
    fn double_remove_is_noop() {
        let mut pool = Pool::new();
        let a = pool.insert(7);
        assert_eq!(pool.remove(a), Some(7));
        assert_eq!(pool.remove(a), None);
        assert!(pool.is_empty());
    }

    #[test]
    fn clear_recycles_everything() {
        let mut pool = Pool::with_capacity(4);
        let keys: Vec<_> = (0..4).map(|i| pool.insert(i)).collect();
        pool.clear();
        assert!(pool.is_empty());
        assert!(keys.iter().all(|k| pool.get(*k).is_none()));
        pool.insert(9);
        assert_eq!(pool.capacity(), 4);
    }

    #[test]
    fn food_field_removal_is_idempotent() {
        let mut field = FoodField::new();
        assert!(field.insert(pellet("food-1")));
        assert!(field.insert(pellet("food-2")));
        assert!(!field.insert(pellet("food-1")));
        assert_eq!(field.len(), 2);

        assert!(field.remove("food-1").is_some());
        assert!(field.remove("food-1").is_none());
        assert_eq!(field.len(), 1);
        assert!(!field.contains("food-1"));
        assert!(field.get("food-2").is_some());
    }

    #[test]
    fn food_field_replace_all() {
        let mut field = FoodField::new();
        field.insert(pellet("a"));
        field.replace_all(vec![pellet("b"), pellet("c")]);
        assert!(!field.contains("a"));
        assert_eq!(field.len(), 2);
        assert_eq!(field.allocated(), 2);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn len_tracks_live_entries(ops in proptest::collection::vec(proptest::bool::ANY, 1..200)) {
                let mut pool = Pool::new();
                let mut live = Vec::new();
                for (i, insert) in ops.into_iter().enumerate() {
                    if insert || live.is_empty() {
                        live.push(pool.insert(i));
                    } else {
                        let key = live.swap_remove(i % live.len());
                        prop_assert!(pool.remove(key).is_some());
                    }
                    prop_assert_eq!(pool.len(), live.len());
                    prop_assert!(pool.capacity() >= pool.len());
                }
            }
        }
    }
}
