//! # Tags
//!
//! Free-form string labels on entities, indexed both ways so "all enemies"
//! and "is this an enemy" are both cheap.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{trace, warn};

use crate::ecs::{ComponentProcessor, Entity};

/// Bidirectional entity/tag index.
///
/// Entities under one tag are kept ordered, so [`TagProcessor::first`] is
/// deterministic.
#[derive(Debug, Default)]
pub struct TagProcessor {
    by_entity: HashMap<Entity, HashSet<String>>,
    by_tag: HashMap<String, BTreeSet<Entity>>,
}

impl TagProcessor {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels `entity` with `tag`. Adding a tag twice is a no-op.
    ///
    /// Liveness is not checked here: a dead handle's entry is never swept.
    /// Go through [`World::add_tag`](crate::World::add_tag) unless the
    /// entity is known to be alive.
    pub fn add_tag(&mut self, entity: Entity, tag: &str) {
        let tags = self.by_entity.entry(entity).or_default();
        if !tags.insert(tag.to_owned()) {
            return;
        }
        self.by_tag.entry(tag.to_owned()).or_default().insert(entity);
    }

    /// Removes `tag` from `entity`.
    pub fn remove_tag(&mut self, entity: Entity, tag: &str) {
        let removed = self
            .by_entity
            .get_mut(&entity)
            .is_some_and(|tags| tags.remove(tag));
        if !removed {
            warn!(%entity, tag, "can not remove tag: entity does not have it");
            return;
        }
        if let Some(entities) = self.by_tag.get_mut(tag) {
            entities.remove(&entity);
            if entities.is_empty() {
                self.by_tag.remove(tag);
            }
        }
    }

    /// Checks if `entity` carries `tag`.
    #[must_use]
    pub fn has_tag(&self, entity: Entity, tag: &str) -> bool {
        self.by_entity
            .get(&entity)
            .is_some_and(|tags| tags.contains(tag))
    }

    /// Tags of `entity`, in no particular order.
    pub fn tags(&self, entity: Entity) -> impl Iterator<Item = &str> + '_ {
        self.by_entity
            .get(&entity)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Entities labelled `tag`, in handle order.
    pub fn entities(&self, tag: &str) -> impl Iterator<Item = Entity> + '_ {
        self.by_tag.get(tag).into_iter().flatten().copied()
    }

    /// Number of entities labelled `tag`.
    #[must_use]
    pub fn count_by_tag(&self, tag: &str) -> usize {
        self.by_tag.get(tag).map_or(0, BTreeSet::len)
    }

    /// Lowest-handle entity labelled `tag`.
    #[must_use]
    pub fn first(&self, tag: &str) -> Option<Entity> {
        self.by_tag.get(tag).and_then(|entities| entities.first().copied())
    }
}

impl ComponentProcessor for TagProcessor {
    fn has(&self, entity: Entity) -> bool {
        self.by_entity.contains_key(&entity)
    }

    fn add(&mut self, entity: Entity) {
        if self.by_entity.contains_key(&entity) {
            warn!(%entity, "entity already has a tag component");
            return;
        }
        self.by_entity.insert(entity, HashSet::new());
    }

    fn remove(&mut self, entity: Entity) {
        let Some(tags) = self.by_entity.remove(&entity) else {
            warn!(%entity, "remove: entity has no tag component");
            return;
        };
        for tag in tags {
            if let Some(entities) = self.by_tag.get_mut(&tag) {
                entities.remove(&entity);
                if entities.is_empty() {
                    self.by_tag.remove(&tag);
                }
            }
        }
        trace!(%entity, "tags cleared");
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
