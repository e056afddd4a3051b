//! Dense entity arena addressed by stable id.

use std::collections::HashMap;
use std::hash::Hash;

/// Records stored in an [`EntityStore`] expose their own id.
pub trait Keyed {
    type Id: Copy + Eq + Hash;

    fn key(&self) -> Self::Id;
}

/// A `Vec` of records plus an id -> index table.
///
/// Iteration order is insertion order, except that removal moves the last
/// record into the freed slot. The tick sweeps walk the store by index so
/// no per-tick id list is allocated.
#[derive(Debug, Clone)]
pub struct EntityStore<T: Keyed> {
    items: Vec<T>,
    index: HashMap<T::Id, usize>,
}

impl<T: Keyed> Default for EntityStore<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Keyed> EntityStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record with the same id, returning the old one.
    pub fn insert(&mut self, item: T) -> Option<T> {
        let id = item.key();
        match self.index.get(&id) {
            Some(&i) => Some(std::mem::replace(&mut self.items[i], item)),
            None => {
                self.index.insert(id, self.items.len());
                self.items.push(item);
                None
            }
        }
    }

    pub fn remove(&mut self, id: T::Id) -> Option<T> {
        let i = self.index.remove(&id)?;
        let removed = self.items.swap_remove(i);
        if let Some(moved) = self.items.get(i) {
            self.index.insert(moved.key(), i);
        }
        Some(removed)
    }

    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.index.get(&id).map(|&i| &self.items[i])
    }

    pub fn get_mut(&mut self, id: T::Id) -> Option<&mut T> {
        match self.index.get(&id) {
            Some(&i) => Some(&mut self.items[i]),
            None => None,
        }
    }

    pub fn contains(&self, id: T::Id) -> bool {
        self.index.contains_key(&id)
    }

    pub fn at(&self, i: usize) -> Option<&T> {
        self.items.get(i)
    }

    pub fn at_mut(&mut self, i: usize) -> Option<&mut T> {
        self.items.get_mut(i)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    pub fn ids(&self) -> Vec<T::Id> {
        self.items.iter().map(|t| t.key()).collect()
    }
}
