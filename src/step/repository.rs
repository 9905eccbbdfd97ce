//! Id-indexed entity store.

use std::collections::BTreeMap;

use super::entity::{Entity, Kind, Ref, Solid};
use super::error::{StepError, StepResult};

/// An append-only store of entities keyed by integer id.
///
/// One repository backs one conversion. Entities are never shared between
/// repositories; moving them across requires remapping their ids (see
/// [`crate::merge`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Repository {
    entities: BTreeMap<u64, Entity>,
}

impl Repository {
    /// Creates an empty repository.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
        }
    }

    /// Appends a typed entity under the next unused id.
    pub fn add<T: Kind>(&mut self, value: T) -> Ref<T> {
        Ref::new(self.add_entity(value.into_entity()))
    }

    /// Appends an entity under the next unused id and returns that id.
    pub fn add_entity(&mut self, entity: Entity) -> u64 {
        let id = self.max_id() + 1;
        self.entities.insert(id, entity);
        id
    }

    /// Inserts an entity under a caller-chosen id.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is zero or already occupied.
    pub fn place_at(&mut self, id: u64, entity: Entity) -> StepResult<()> {
        if id == 0 {
            return Err(StepError::InvalidId(id));
        }
        if self.entities.contains_key(&id) {
            return Err(StepError::OccupiedId(id));
        }
        self.entities.insert(id, entity);
        Ok(())
    }

    /// Resolves a typed reference.
    ///
    /// Returns `None` if the id is absent or holds a different kind.
    #[must_use]
    pub fn get<T: Kind>(&self, r: Ref<T>) -> Option<&T> {
        self.entities.get(&r.id()).and_then(T::from_entity)
    }

    /// Resolves a typed reference, failing on a dangling or mistyped id.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::MissingEntity`] if the reference does not
    /// resolve to an entity of kind `T`.
    pub fn require<T: Kind>(&self, r: Ref<T>) -> StepResult<&T> {
        self.get(r).ok_or(StepError::MissingEntity(r.id()))
    }

    /// Returns the entity stored under `id`.
    #[must_use]
    pub fn entity(&self, id: u64) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Returns the entity stored under `id` for in-place edits.
    pub fn entity_mut(&mut self, id: u64) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Whether an entity is stored under `id`.
    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        self.entities.contains_key(&id)
    }

    /// Removes and returns the entity stored under `id`.
    pub fn remove(&mut self, id: u64) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Largest id in use, or zero when empty.
    #[must_use]
    pub fn max_id(&self) -> u64 {
        self.entities.keys().next_back().copied().unwrap_or(0)
    }

    /// Number of stored entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterates entities in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &Entity)> {
        self.entities.iter().map(|(id, e)| (*id, e))
    }

    /// Iterates entities mutably in ascending id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u64, &mut Entity)> {
        self.entities.iter_mut().map(|(id, e)| (*id, e))
    }

    /// Collects ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<u64> {
        self.entities.keys().copied().collect()
    }

    /// Returns every solid in ascending id order.
    #[must_use]
    pub fn solids(&self) -> Vec<Ref<Solid>> {
        self.entities
            .iter()
            .filter(|(_, e)| matches!(e, Entity::Solid(_)))
            .map(|(id, _)| Ref::new(*id))
            .collect()
    }

    /// Consumes the repository, yielding entities in ascending id order.
    pub fn into_entities(self) -> impl Iterator<Item = (u64, Entity)> {
        self.entities.into_iter()
    }
}
