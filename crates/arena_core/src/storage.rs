//! ID-keyed entity storage.
//!
//! IDs increase monotonically and are never reused, so iterating in key
//! order is iterating in creation order. Removing an entry frees its slot;
//! a stale ID simply stops resolving.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::EntityId;

/// Entities that know their own ID.
pub trait Identified {
    /// Overwrite the entity's ID (called once on insert).
    fn set_id(&mut self, id: EntityId);
}

/// Storage for one entity kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityStorage<T> {
    entities: BTreeMap<EntityId, T>,
    next_id: EntityId,
}

impl<T> Default for EntityStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EntityStorage<T> {
    /// Create empty storage. The first ID handed out is 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Create empty storage whose IDs start at `first_id`.
    ///
    /// Used to keep ID ranges of different kinds disjoint in logs.
    #[must_use]
    pub fn starting_at(first_id: EntityId) -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: first_id.max(1),
        }
    }

    /// Remove an entity by ID.
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        self.entities.remove(&id)
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.entities.get_mut(&id)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// IDs in creation order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Iterate in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &T)> {
        self.entities.iter()
    }

    /// Iterate mutably in creation order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&EntityId, &mut T)> {
        self.entities.iter_mut()
    }

    /// Iterate values in creation order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entities.values()
    }

    /// Iterate values mutably in creation order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entities.values_mut()
    }

    /// Keep only entities matching the predicate, returning the removed ones.
    pub fn drain_where(&mut self, mut remove: impl FnMut(&T) -> bool) -> Vec<T> {
        let doomed: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, e)| remove(e))
            .map(|(id, _)| *id)
            .collect();
        doomed
            .into_iter()
            .filter_map(|id| self.entities.remove(&id))
            .collect()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.entities.clear();
    }
}

impl<T: Identified> EntityStorage<T> {
    /// Insert a new entity and return its ID.
    pub fn insert(&mut self, mut entity: T) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        entity.set_id(id);
        self.entities.insert(id, entity);
        id
    }
}
