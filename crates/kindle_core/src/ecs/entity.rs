//! Entity identifiers and lifecycle states.

use std::fmt;

/// Entity handle: the entity's index in the registry arena.
///
/// Ids are reused after `delete`. Listeners learn about the end of an id's
/// life through the deactivation event, which is always delivered before
/// the id can be handed out again.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for EntityId {
    fn from(index: usize) -> Self {
        debug_assert!(index <= u32::MAX as usize, "entity index overflow");
        Self(index as u32)
    }
}

/// Lifecycle of a committed entity. Deleted entities have no state; their
/// id simply no longer resolves.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntityState {
    /// Committed with components attached, not visible to systems.
    Inactive,
    /// In the active set; listeners have been notified.
    Active,
}
