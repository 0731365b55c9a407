//! Ordered set of active entities matching a filter.

use crate::bitset::BitSet;
use crate::ecs::{EntityEvent, EntityEventKind, EntityId, EntityListener, ListenerContext};

/// Listener that tracks which matching entities are currently active.
///
/// Systems register one of these with the filter they care about and
/// iterate it every frame; iteration is in ascending id order.
#[derive(Debug, Default)]
pub struct EntityIndex {
    members: BitSet,
    count: usize,
}

impl EntityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.members.contains(entity.index())
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.members.ones().map(EntityId::from)
    }

    /// Snapshot of the members, for loops that mutate the registry.
    pub fn to_vec(&self) -> Vec<EntityId> {
        self.ids().collect()
    }

    fn insert(&mut self, entity: EntityId) {
        if !self.members.contains(entity.index()) {
            self.members.set(entity.index());
            self.count += 1;
        }
    }

    fn remove(&mut self, entity: EntityId) {
        if self.members.contains(entity.index()) {
            self.members.reset(entity.index());
            self.count -= 1;
        }
    }
}

impl EntityListener for EntityIndex {
    fn on_entity_event(&mut self, event: &EntityEvent<'_>, _ctx: &mut ListenerContext<'_>) {
        match event.kind {
            EntityEventKind::Activated => self.insert(event.entity),
            EntityEventKind::Deactivated => self.remove(event.entity),
        }
    }
}
