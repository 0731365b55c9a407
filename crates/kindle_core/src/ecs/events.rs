//! Activation notifications and the deferred command queue.
//!
//! Listeners are invoked synchronously while the registry is in the middle
//! of an activation or deactivation. They cannot touch the registry
//! directly; structural requests go through [`EntityCommands`] and are
//! executed once the current notification round has finished.

use crate::aspect::Aspect;
use crate::ecs::component::ComponentColumn;
use crate::ecs::{EntityComponent, EntityId};
use crate::types::{SpaceId, TypeKey, TypeRegistry};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntityEventKind {
    Activated,
    Deactivated,
}

/// Payload delivered to listeners whose filter matches the entity.
#[derive(Copy, Clone, Debug)]
pub struct EntityEvent<'a> {
    pub entity: EntityId,
    pub aspect: &'a Aspect,
    pub kind: EntityEventKind,
}

/// Receiver of entity lifecycle events.
pub trait EntityListener {
    fn on_entity_event(&mut self, event: &EntityEvent<'_>, ctx: &mut ListenerContext<'_>);
}

/// Shared handle to a registered listener. The registry keeps one clone;
/// the owning system keeps another to read the listener's state.
pub type ListenerHandle = Rc<RefCell<dyn EntityListener>>;

/// Token returned on registration, used to unregister.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    Activate(EntityId),
    Deactivate(EntityId),
    Delete(EntityId),
}

impl Command {
    pub(crate) fn entity(self) -> EntityId {
        match self {
            Command::Activate(id) | Command::Deactivate(id) | Command::Delete(id) => id,
        }
    }
}

/// Queue of lifecycle requests executed after the current notification.
#[derive(Debug, Default)]
pub struct EntityCommands {
    queue: VecDeque<Command>,
}

impl EntityCommands {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    pub fn activate(&mut self, entity: EntityId) {
        self.queue.push_back(Command::Activate(entity));
    }

    pub fn deactivate(&mut self, entity: EntityId) {
        self.queue.push_back(Command::Deactivate(entity));
    }

    pub fn delete(&mut self, entity: EntityId) {
        self.queue.push_back(Command::Delete(entity));
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn pop(&mut self) -> Option<Command> {
        self.queue.pop_front()
    }

    pub(crate) fn forget(&mut self, entity: EntityId) {
        self.queue.retain(|c| c.entity() != entity);
    }
}

/// Read-only component access handed to listeners.
pub struct ComponentView<'a> {
    pub(crate) types: &'a TypeRegistry,
    pub(crate) space: SpaceId,
    pub(crate) columns: &'a [Option<Box<dyn ComponentColumn>>],
}

impl<'a> ComponentView<'a> {
    pub fn get<C: EntityComponent>(&self, entity: EntityId) -> Option<&'a C> {
        let key = self.types.lookup::<C>(self.space)?;
        self.columns
            .get(key.index())?
            .as_ref()?
            .get_any(entity.index())?
            .downcast_ref::<C>()
    }

    pub fn has(&self, entity: EntityId, key: TypeKey) -> bool {
        self.columns
            .get(key.index())
            .and_then(Option::as_ref)
            .map_or(false, |column| column.contains(entity.index()))
    }
}

/// Everything a listener may use during a callback.
pub struct ListenerContext<'a> {
    pub components: ComponentView<'a>,
    pub commands: &'a mut EntityCommands,
}
