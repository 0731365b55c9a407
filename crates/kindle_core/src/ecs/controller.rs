//! Controllers: per-entity logic driven once per tick.
//!
//! An entity opts in by carrying an [`EntityControllers`] component naming
//! the controllers that drive it. The [`ControllerSystem`] keeps, per
//! controller, the set of active entities that name it and calls
//! [`Controller::update`] for each of them every tick.

use crate::aspect::AspectFilter;
use crate::bitset::BitSet;
use crate::ecs::{
    EntityComponent, EntityEvent, EntityEventKind, EntityId, EntityListener, EntityRegistry,
    ListenerContext, ListenerId,
};
use crate::pool::Arena;
use crate::time::FrameClock;
use crate::types::{TypeError, TypeKey};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Handle of a controller registered with a [`ControllerSystem`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerId(u32);

impl ControllerId {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Controllers that drive an entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityControllers {
    ids: Vec<ControllerId>,
}

impl EntityControllers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, controller: ControllerId) -> Self {
        self.add(controller);
        self
    }

    pub fn add(&mut self, controller: ControllerId) {
        if !self.ids.contains(&controller) {
            self.ids.push(controller);
        }
    }

    pub fn remove(&mut self, controller: ControllerId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|&id| id != controller);
        before != self.ids.len()
    }

    pub fn controlled_by(&self, controller: ControllerId) -> bool {
        self.ids.contains(&controller)
    }

    pub fn ids(&self) -> &[ControllerId] {
        &self.ids
    }
}

impl EntityComponent for EntityControllers {
    const NAME: &'static str = "Controllers";
}

/// Logic applied to one entity per tick.
///
/// The registry is handed over mutably, so a controller may edit
/// components or change lifecycle state of the entity it drives.
pub trait Controller {
    fn name(&self) -> &str {
        "controller"
    }

    fn update(&mut self, clock: &FrameClock, entity: EntityId, registry: &mut EntityRegistry);
}

/// Per-controller entity sets, kept current by activation events.
#[derive(Debug, Default)]
struct ControlledEntities {
    bags: Vec<Option<BitSet>>,
}

impl ControlledEntities {
    fn open(&mut self, controller: ControllerId) {
        let index = controller.index();
        if self.bags.len() <= index {
            self.bags.resize_with(index + 1, || None);
        }
        self.bags[index] = Some(BitSet::new());
    }

    fn close(&mut self, controller: ControllerId) {
        if let Some(slot) = self.bags.get_mut(controller.index()) {
            *slot = None;
        }
    }

    fn add(&mut self, controller: ControllerId, entity: EntityId) {
        if let Some(Some(bag)) = self.bags.get_mut(controller.index()) {
            bag.set(entity.index());
        }
    }

    fn contains(&self, controller: ControllerId, entity: EntityId) -> bool {
        matches!(self.bags.get(controller.index()), Some(Some(bag)) if bag.contains(entity.index()))
    }

    fn members(&self, controller: ControllerId) -> Vec<EntityId> {
        match self.bags.get(controller.index()) {
            Some(Some(bag)) => bag.ones().map(EntityId::from).collect(),
            _ => Vec::new(),
        }
    }

    fn forget(&mut self, entity: EntityId) {
        for bag in self.bags.iter_mut().flatten() {
            bag.reset(entity.index());
        }
    }
}

impl EntityListener for ControlledEntities {
    fn on_entity_event(&mut self, event: &EntityEvent<'_>, ctx: &mut ListenerContext<'_>) {
        match event.kind {
            EntityEventKind::Activated => {
                if let Some(controllers) = ctx.components.get::<EntityControllers>(event.entity) {
                    for &controller in controllers.ids() {
                        self.add(controller, event.entity);
                    }
                }
            }
            EntityEventKind::Deactivated => self.forget(event.entity),
        }
    }
}

/// Runs every registered controller over the active entities naming it.
///
/// Entities are visited in ascending id order per controller, controllers
/// in ascending id order. An entity deactivated during the pass is skipped
/// by every controller that has not reached it yet.
pub struct ControllerSystem {
    controllers: Arena<Box<dyn Controller>>,
    controlled: Rc<RefCell<ControlledEntities>>,
    key: TypeKey,
    listener: ListenerId,
}

impl ControllerSystem {
    pub fn register(registry: &mut EntityRegistry) -> Result<Self, TypeError> {
        let key = registry.component_key::<EntityControllers>()?;
        let filter = AspectFilter::requiring(registry.aspect_of([key]));
        let controlled = Rc::new(RefCell::new(ControlledEntities::default()));
        let listener = registry.register_listener(filter, controlled.clone());
        Ok(Self {
            controllers: Arena::new(),
            controlled,
            key,
            listener,
        })
    }

    /// Register `controller`. Entities already active that name the new
    /// id are picked up immediately.
    pub fn add_controller(
        &mut self,
        registry: &EntityRegistry,
        controller: Box<dyn Controller>,
    ) -> ControllerId {
        let name = controller.name().to_owned();
        let id = ControllerId(self.controllers.insert(controller) as u32);
        let mut controlled = self.controlled.borrow_mut();
        controlled.open(id);
        for entity in registry.active_ids() {
            let named = registry
                .component_at::<EntityControllers>(entity, self.key)
                .map_or(false, |c| c.controlled_by(id));
            if named {
                controlled.add(id, entity);
            }
        }
        tracing::debug!(controller = %id, name = %name, "controller added");
        id
    }

    /// Unregister and return the controller; its entities stop being driven.
    pub fn remove_controller(&mut self, id: ControllerId) -> Option<Box<dyn Controller>> {
        let controller = self.controllers.remove(id.index())?;
        self.controlled.borrow_mut().close(id);
        tracing::debug!(controller = %id, "controller removed");
        Some(controller)
    }

    pub fn contains(&self, id: ControllerId) -> bool {
        self.controllers.contains(id.index())
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Whether `entity` is currently driven by `controller`.
    pub fn controls(&self, controller: ControllerId, entity: EntityId) -> bool {
        self.controlled.borrow().contains(controller, entity)
    }

    /// Run one pass. Returns the number of per-entity updates made.
    pub fn update(&mut self, registry: &mut EntityRegistry, clock: &FrameClock) -> usize {
        let ids: Vec<usize> = self.controllers.indices().collect();
        let mut updates = 0;
        for index in ids {
            let id = ControllerId(index as u32);
            let members = self.controlled.borrow().members(id);
            let Some(controller) = self.controllers.get_mut(index) else {
                continue;
            };
            for entity in members {
                if !self.controlled.borrow().contains(id, entity) {
                    continue;
                }
                controller.update(clock, entity, registry);
                updates += 1;
            }
        }
        tracing::trace!(updates, "controllers ran");
        updates
    }

    pub fn listener(&self) -> ListenerId {
        self.listener
    }
}
