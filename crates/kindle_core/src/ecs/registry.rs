// registry.rs - Entity lifecycle, component storage and listener fan-out

use crate::aspect::{Aspect, AspectFilter};
use crate::bitset::BitSet;
use crate::config::EntityConfig;
use crate::ecs::component::{Column, ComponentColumn};
use crate::ecs::events::Command;
use crate::ecs::{
    ActivationError, AttributeMap, ComponentView, EntityBuilder, EntityCommands, EntityComponent,
    EntityError, EntityEvent, EntityEventKind, EntityId, EntityState, ListenerContext,
    ListenerHandle, ListenerId,
};
use crate::pool::Arena;
use crate::types::{SpaceId, TypeError, TypeKey, TypeRegistry};

/// Name of the type space holding entity component kinds.
pub const ENTITY_COMPONENT_SPACE: &str = "entity component";

struct EntityRecord {
    aspect: Aspect,
    state: EntityState,
}

struct ListenerEntry {
    id: ListenerId,
    filter: AspectFilter,
    handle: ListenerHandle,
}

/// Owns entity ids, their components and the active set, and notifies
/// listeners when entities enter or leave it.
///
/// Lifecycle: `build` commits an inactive entity, `activate` makes it
/// visible, `deactivate` hides it again with its components intact and
/// `delete` frees the id.
pub struct EntityRegistry {
    types: TypeRegistry,
    space: SpaceId,
    columns: Vec<Option<Box<dyn ComponentColumn>>>,
    column_capacity: usize,
    max_entities: usize,
    entities: Arena<EntityRecord>,
    active: BitSet,
    active_count: usize,
    mandatory: Aspect,
    listeners: Vec<ListenerEntry>,
    next_listener: u32,
    commands: EntityCommands,
}

impl EntityRegistry {
    pub fn new(config: &EntityConfig) -> Self {
        let mut types = TypeRegistry::new();
        let space = types.define_space(ENTITY_COMPONENT_SPACE, config.component_capacity);
        Self {
            types,
            space,
            columns: Vec::new(),
            column_capacity: config.initial_capacity,
            max_entities: config.max_entities,
            entities: Arena::with_capacity(config.initial_capacity),
            active: BitSet::with_capacity(config.initial_capacity),
            active_count: 0,
            mandatory: Aspect::new(space),
            listeners: Vec::new(),
            next_listener: 0,
            commands: EntityCommands::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Component kinds
    // ---------------------------------------------------------------------

    /// Key of component kind `C`, registering it (and its column) on first use.
    pub fn component_key<C: EntityComponent>(&mut self) -> Result<TypeKey, TypeError> {
        let key = self.types.key_of::<C>(self.space)?;
        if self.columns.len() <= key.index() {
            self.columns.resize_with(key.index() + 1, || None);
        }
        if self.columns[key.index()].is_none() {
            tracing::debug!(component = C::NAME, index = key.index(), "component kind registered");
            self.columns[key.index()] = Some(Box::new(Column::<C>::with_capacity(
                self.column_capacity,
            )));
        }
        Ok(key)
    }

    /// Key of `C` if it has been registered.
    pub fn lookup_key<C: EntityComponent>(&self) -> Option<TypeKey> {
        self.types.lookup::<C>(self.space)
    }

    /// Require `C` on every entity before it may be activated.
    pub fn require<C: EntityComponent>(&mut self) -> Result<TypeKey, TypeError> {
        let key = self.component_key::<C>()?;
        self.mandatory.set(key);
        Ok(key)
    }

    pub fn component_space(&self) -> SpaceId {
        self.space
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// The registry's type spaces, for systems that define their own
    /// (contact categories, materials).
    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    /// Aspect with the given component kinds set.
    pub fn aspect_of(&self, keys: impl IntoIterator<Item = TypeKey>) -> Aspect {
        Aspect::of(self.space, keys)
    }

    // ---------------------------------------------------------------------
    // Building
    // ---------------------------------------------------------------------

    /// Commit the builder's contents as a new inactive entity.
    pub fn build(&mut self, builder: EntityBuilder) -> Result<EntityId, EntityError> {
        self.check_id(EntityId::from(self.entities.next_index()))?;
        let id = EntityId::from(self.entities.insert(EntityRecord {
            aspect: Aspect::new(self.space),
            state: EntityState::Inactive,
        }));
        self.commit(id, builder)
    }

    /// Commit under a caller-chosen id; fails if the id is taken.
    pub fn build_with_id(
        &mut self,
        id: EntityId,
        builder: EntityBuilder,
    ) -> Result<EntityId, EntityError> {
        self.check_id(id)?;
        if self.entities.contains(id.index()) {
            return Err(EntityError::DuplicateId { id });
        }
        self.entities.set(
            id.index(),
            EntityRecord {
                aspect: Aspect::new(self.space),
                state: EntityState::Inactive,
            },
        );
        self.commit(id, builder)
    }

    /// Build and activate in one step. If activation fails the entity is
    /// rolled back entirely.
    pub fn spawn(&mut self, builder: EntityBuilder) -> Result<EntityId, EntityError> {
        let id = self.build(builder)?;
        if let Err(err) = self.activate(id) {
            self.discard(id);
            return Err(err);
        }
        Ok(id)
    }

    fn check_id(&self, id: EntityId) -> Result<(), EntityError> {
        if id.index() >= self.max_entities {
            return Err(EntityError::IdOutOfRange {
                id,
                max: self.max_entities,
            });
        }
        Ok(())
    }

    fn commit(&mut self, id: EntityId, builder: EntityBuilder) -> Result<EntityId, EntityError> {
        match self.attach_all(id, builder) {
            Ok(()) => {
                self.refresh_aspect(id);
                tracing::debug!(entity = %id, "entity built");
                Ok(id)
            }
            Err(err) => {
                self.discard(id);
                tracing::debug!(entity = %id, error = %err, "entity build rolled back");
                Err(err)
            }
        }
    }

    fn attach_all(&mut self, id: EntityId, builder: EntityBuilder) -> Result<(), EntityError> {
        for part in builder.parts {
            let key = (part.register)(self)?;
            let column = self.column_mut(key);
            if let Some(value) = part.value {
                column.insert_boxed(id.index(), value);
            }
            if !part.attributes.is_empty() {
                column
                    .apply_attributes(id.index(), &part.attributes)
                    .map_err(|source| EntityError::Attribute {
                        component: part.name,
                        source,
                    })?;
            }
        }
        Ok(())
    }

    /// Drop every component of `id` and free the id, without notification.
    fn discard(&mut self, id: EntityId) {
        for column in self.columns.iter_mut().flatten() {
            column.remove(id.index());
        }
        self.entities.remove(id.index());
    }

    // ---------------------------------------------------------------------
    // Components
    // ---------------------------------------------------------------------

    /// Attach or replace component `C`. Not allowed while active.
    pub fn set_component<C: EntityComponent>(
        &mut self,
        id: EntityId,
        value: C,
    ) -> Result<Option<C>, EntityError> {
        self.ensure_inactive(id)?;
        let key = self.component_key::<C>()?;
        let previous = self.typed_column_mut::<C>(key).set(id.index(), value);
        self.refresh_aspect(id);
        Ok(previous)
    }

    /// Apply builder contents to an existing inactive entity, editing
    /// components in place. On failure, components the edit newly attached
    /// are removed again.
    pub fn set_attributes(&mut self, id: EntityId, builder: EntityBuilder) -> Result<(), EntityError> {
        self.ensure_inactive(id)?;
        let mut saved = Vec::with_capacity(builder.parts.len());
        for part in &builder.parts {
            let key = (part.register)(self)?;
            saved.push((key, self.column_mut(key).snapshot(id.index())));
        }
        let result = self.attach_all(id, builder);
        if result.is_err() {
            // restore in reverse so the first snapshot of a repeated kind wins
            for (key, previous) in saved.into_iter().rev() {
                let column = self.column_mut(key);
                match previous {
                    Some(value) => column.insert_boxed(id.index(), value),
                    None => {
                        column.remove(id.index());
                    }
                }
            }
        }
        self.refresh_aspect(id);
        result
    }

    /// Detach component `C`. Not allowed while active.
    pub fn remove_component<C: EntityComponent>(
        &mut self,
        id: EntityId,
    ) -> Result<Option<C>, EntityError> {
        self.ensure_inactive(id)?;
        let Some(key) = self.lookup_key::<C>() else {
            return Ok(None);
        };
        let previous = self.typed_column_mut::<C>(key).take(id.index());
        self.refresh_aspect(id);
        Ok(previous)
    }

    /// Component `C` of `id`; `None` if either is missing.
    pub fn component<C: EntityComponent>(&self, id: EntityId) -> Option<&C> {
        self.component_at(id, self.lookup_key::<C>()?)
    }

    /// Mutable runtime access; allowed in any state.
    pub fn component_mut<C: EntityComponent>(&mut self, id: EntityId) -> Option<&mut C> {
        let key = self.lookup_key::<C>()?;
        self.component_at_mut(id, key)
    }

    /// Component `C` of `id` through a key the caller already resolved,
    /// skipping the type lookup. `None` if `key` does not name `C`.
    #[inline]
    pub fn component_at<C: EntityComponent>(&self, id: EntityId, key: TypeKey) -> Option<&C> {
        self.columns
            .get(key.index())?
            .as_ref()?
            .as_any()
            .downcast_ref::<Column<C>>()?
            .get(id.index())
    }

    #[inline]
    pub fn component_at_mut<C: EntityComponent>(
        &mut self,
        id: EntityId,
        key: TypeKey,
    ) -> Option<&mut C> {
        self.columns
            .get_mut(key.index())?
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<Column<C>>()?
            .get_mut(id.index())
    }

    /// Untyped access by key, for callers that only hold a `TypeKey`.
    pub fn component_by_key(&self, id: EntityId, key: TypeKey) -> Option<&dyn std::any::Any> {
        self.columns
            .get(key.index())?
            .as_ref()?
            .get_any(id.index())
    }

    pub fn has_component(&self, id: EntityId, key: TypeKey) -> bool {
        self.columns
            .get(key.index())
            .and_then(Option::as_ref)
            .map_or(false, |column| column.contains(id.index()))
    }

    /// Attribute export of every component of `id`, in kind index order.
    pub fn to_attributes(&self, id: EntityId) -> Vec<(&'static str, AttributeMap)> {
        self.columns
            .iter()
            .flatten()
            .filter_map(|column| column.export(id.index()).map(|a| (column.name(), a)))
            .collect()
    }

    /// Read-only view for code that only needs component access.
    pub fn view(&self) -> ComponentView<'_> {
        ComponentView {
            types: &self.types,
            space: self.space,
            columns: &self.columns,
        }
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Move `id` into the active set and notify matching listeners in
    /// registration order.
    pub fn activate(&mut self, id: EntityId) -> Result<(), EntityError> {
        self.activate_now(id)?;
        self.drain_commands();
        Ok(())
    }

    /// Notify matching listeners in reverse registration order, then move
    /// `id` out of the active set. Components stay attached.
    pub fn deactivate(&mut self, id: EntityId) -> Result<(), EntityError> {
        self.deactivate_now(id)?;
        self.drain_commands();
        Ok(())
    }

    /// Deactivate if needed, then detach everything and free the id.
    pub fn delete(&mut self, id: EntityId) -> Result<(), EntityError> {
        self.delete_now(id)?;
        self.drain_commands();
        Ok(())
    }

    /// Queue an activation for the next `flush`.
    pub fn request_activation(&mut self, id: EntityId) {
        self.commands.activate(id);
    }

    pub fn request_deactivation(&mut self, id: EntityId) {
        self.commands.deactivate(id);
    }

    pub fn request_delete(&mut self, id: EntityId) {
        self.commands.delete(id);
    }

    /// Execute all queued lifecycle requests. Called once per frame.
    pub fn flush(&mut self) -> usize {
        self.drain_commands()
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    fn activate_now(&mut self, id: EntityId) -> Result<(), EntityError> {
        let record = self
            .entities
            .get(id.index())
            .ok_or(EntityError::UnknownEntity { id })?;
        if record.state == EntityState::Active {
            return Err(ActivationError::AlreadyActive { id }.into());
        }

        let aspect = self.compute_aspect(id);
        if !aspect.includes(&self.mandatory) {
            let missing = self
                .mandatory
                .indices()
                .find(|&index| !aspect.contains_index(index))
                .unwrap_or_default();
            let component = TypeKey::new(self.space, missing);
            return Err(ActivationError::MissingComponent {
                id,
                component,
                name: self.types.name_of(component).unwrap_or("?").to_owned(),
            }
            .into());
        }

        if let Some(record) = self.entities.get_mut(id.index()) {
            record.aspect = aspect;
            record.state = EntityState::Active;
        }
        self.active.set(id.index());
        self.active_count += 1;
        tracing::debug!(entity = %id, "entity activated");

        self.notify(id, EntityEventKind::Activated);
        Ok(())
    }

    fn deactivate_now(&mut self, id: EntityId) -> Result<(), EntityError> {
        let record = self
            .entities
            .get(id.index())
            .ok_or(EntityError::UnknownEntity { id })?;
        if record.state != EntityState::Active {
            return Err(ActivationError::NotActive { id }.into());
        }

        self.notify(id, EntityEventKind::Deactivated);

        if let Some(record) = self.entities.get_mut(id.index()) {
            record.state = EntityState::Inactive;
        }
        self.active.reset(id.index());
        self.active_count -= 1;
        tracing::debug!(entity = %id, "entity deactivated");
        Ok(())
    }

    fn delete_now(&mut self, id: EntityId) -> Result<(), EntityError> {
        let state = self
            .state(id)
            .ok_or(EntityError::UnknownEntity { id })?;
        if state == EntityState::Active {
            self.deactivate_now(id)?;
        }
        self.discard(id);
        self.commands.forget(id);
        tracing::debug!(entity = %id, "entity deleted");
        Ok(())
    }

    fn drain_commands(&mut self) -> usize {
        let mut executed = 0;
        while let Some(command) = self.commands.pop() {
            let result = match command {
                Command::Activate(id) => self.activate_now(id),
                Command::Deactivate(id) => self.deactivate_now(id),
                Command::Delete(id) => self.delete_now(id),
            };
            match result {
                Ok(()) => executed += 1,
                Err(err) => tracing::warn!(?command, error = %err, "deferred entity command failed"),
            }
        }
        executed
    }

    fn notify(&mut self, id: EntityId, kind: EntityEventKind) {
        let Some(record) = self.entities.get(id.index()) else {
            return;
        };
        let event = EntityEvent {
            entity: id,
            aspect: &record.aspect,
            kind,
        };
        let mut ctx = ListenerContext {
            components: ComponentView {
                types: &self.types,
                space: self.space,
                columns: &self.columns,
            },
            commands: &mut self.commands,
        };

        let mut deliver = |entry: &ListenerEntry| {
            if entry.filter.matches(event.aspect) {
                entry.handle.borrow_mut().on_entity_event(&event, &mut ctx);
            }
        };
        match kind {
            EntityEventKind::Activated => self.listeners.iter().for_each(&mut deliver),
            EntityEventKind::Deactivated => self.listeners.iter().rev().for_each(&mut deliver),
        }
    }

    // ---------------------------------------------------------------------
    // Listeners
    // ---------------------------------------------------------------------

    /// Register a listener for entities matching `filter`. Entities that are
    /// already active are not replayed.
    pub fn register_listener(&mut self, filter: AspectFilter, handle: ListenerHandle) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push(ListenerEntry { id, filter, handle });
        tracing::debug!(listener = id.0, "entity listener registered");
        id
    }

    pub fn unregister_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|entry| entry.id != id);
        before != self.listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn exists(&self, id: EntityId) -> bool {
        self.entities.contains(id.index())
    }

    pub fn state(&self, id: EntityId) -> Option<EntityState> {
        self.entities.get(id.index()).map(|r| r.state)
    }

    #[inline]
    pub fn is_active(&self, id: EntityId) -> bool {
        self.active.contains(id.index())
    }

    /// Current aspect of `id`, kept in step with attached components.
    pub fn aspect(&self, id: EntityId) -> Option<&Aspect> {
        self.entities.get(id.index()).map(|r| &r.aspect)
    }

    /// Number of committed entities (active or not).
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active_count
    }

    /// Active ids in ascending order.
    pub fn active_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.active.ones().map(EntityId::from)
    }

    /// Active ids whose aspect matches `filter`, ascending.
    pub fn active_matching<'a>(
        &'a self,
        filter: &'a AspectFilter,
    ) -> impl Iterator<Item = EntityId> + 'a {
        self.active_ids().filter(move |id| {
            self.aspect(*id)
                .map_or(false, |aspect| filter.matches(aspect))
        })
    }

    /// Id the next `build` will use.
    pub fn next_id(&self) -> EntityId {
        EntityId::from(self.entities.next_index())
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn ensure_inactive(&self, id: EntityId) -> Result<(), EntityError> {
        match self.state(id) {
            None => Err(EntityError::UnknownEntity { id }),
            Some(EntityState::Active) => Err(EntityError::Active { id }),
            Some(EntityState::Inactive) => Ok(()),
        }
    }

    fn compute_aspect(&self, id: EntityId) -> Aspect {
        let mut aspect = Aspect::with_capacity(self.space, self.columns.len());
        for (index, column) in self.columns.iter().enumerate() {
            if column.as_ref().map_or(false, |c| c.contains(id.index())) {
                aspect.set_index(index);
            }
        }
        aspect
    }

    fn refresh_aspect(&mut self, id: EntityId) {
        let aspect = self.compute_aspect(id);
        if let Some(record) = self.entities.get_mut(id.index()) {
            record.aspect = aspect;
        }
    }

    fn column_mut(&mut self, key: TypeKey) -> &mut dyn ComponentColumn {
        self.columns[key.index()]
            .as_deref_mut()
            .expect("component column exists once its key is registered")
    }

    fn typed_column_mut<C: EntityComponent>(&mut self, key: TypeKey) -> &mut Column<C> {
        self.column_mut(key)
            .as_any_mut()
            .downcast_mut::<Column<C>>()
            .expect("component column holds its own kind")
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new(&EntityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_component;
    use crate::ecs::{AttributeError, AttributeKey, EntityIndex, EntityListener};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Debug, Clone, PartialEq)]
    struct Position {
        x: i32,
        y: i32,
    }

    const X: AttributeKey<Position, i32> = AttributeKey::new("x");
    const Y: AttributeKey<Position, i32> = AttributeKey::new("y");

    impl EntityComponent for Position {
        const NAME: &'static str = "Position";

        fn from_attributes(&mut self, attributes: &AttributeMap) -> Result<(), AttributeError> {
            attributes.read_into(X, &mut self.x)?;
            attributes.read_into(Y, &mut self.y)
        }

        fn to_attributes(&self, attributes: &mut AttributeMap) {
            attributes.put(X, self.x);
            attributes.put(Y, self.y);
        }
    }

    #[derive(Default, Debug, Clone, PartialEq)]
    struct Sprite;
    define_component!(Sprite, "Sprite");

    /// Records every event it sees under its own name.
    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl EntityListener for Recorder {
        fn on_entity_event(&mut self, event: &EntityEvent<'_>, _ctx: &mut ListenerContext<'_>) {
            self.log
                .borrow_mut()
                .push(format!("{}:{:?}:{}", self.name, event.kind, event.entity));
        }
    }

    fn position(x: i32, y: i32) -> EntityBuilder {
        EntityBuilder::new().set(X, x).set(Y, y)
    }

    fn any(registry: &EntityRegistry) -> AspectFilter {
        AspectFilter::any(registry.component_space())
    }

    #[test]
    fn lifecycle_round_trip() {
        let mut registry = EntityRegistry::default();
        let id = registry.build(position(1, 2)).unwrap();

        assert_eq!(registry.state(id), Some(EntityState::Inactive));
        assert!(!registry.is_active(id));

        registry.activate(id).unwrap();
        assert_eq!(registry.state(id), Some(EntityState::Active));
        assert_eq!(registry.active_ids().collect::<Vec<_>>(), vec![id]);

        registry.deactivate(id).unwrap();
        assert!(!registry.is_active(id));
        assert_eq!(registry.component::<Position>(id), Some(&Position { x: 1, y: 2 }));

        registry.delete(id).unwrap();
        assert!(!registry.exists(id));
        assert!(registry.component::<Position>(id).is_none());
        assert_eq!(registry.deactivate(id), Err(EntityError::UnknownEntity { id }));
    }

    #[test]
    fn listeners_fire_in_order_then_reverse() {
        let mut registry = EntityRegistry::default();
        let log = Rc::new(RefCell::new(Vec::new()));
        for name in ["L1", "L2", "L3"] {
            let filter = any(&registry);
            registry.register_listener(
                filter,
                Rc::new(RefCell::new(Recorder {
                    name,
                    log: log.clone(),
                })),
            );
        }

        let id = registry.spawn(position(0, 0)).unwrap();
        registry.deactivate(id).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                "L1:Activated:0",
                "L2:Activated:0",
                "L3:Activated:0",
                "L3:Deactivated:0",
                "L2:Deactivated:0",
                "L1:Deactivated:0",
            ]
        );
    }

    #[test]
    fn listener_filter_and_unregister() {
        let mut registry = EntityRegistry::default();
        let sprite = registry.component_key::<Sprite>().unwrap();
        let index = Rc::new(RefCell::new(EntityIndex::new()));
        let filter = AspectFilter::requiring(registry.aspect_of([sprite]));
        let listener = registry.register_listener(filter, index.clone());

        let plain = registry.spawn(position(0, 0)).unwrap();
        let drawn = registry.spawn(position(0, 0).with(Sprite)).unwrap();
        assert!(!index.borrow().contains(plain));
        assert!(index.borrow().contains(drawn));

        assert!(registry.unregister_listener(listener));
        assert!(!registry.unregister_listener(listener));
        registry.deactivate(drawn).unwrap();
        assert!(index.borrow().contains(drawn));
    }

    #[test]
    fn ids_reused_only_after_delete() {
        let mut registry = EntityRegistry::default();
        let a = registry.build(position(0, 0)).unwrap();
        let b = registry.build(position(0, 0)).unwrap();
        assert_ne!(a, b);

        registry.activate(a).unwrap();
        registry.deactivate(a).unwrap();
        let c = registry.build(position(0, 0)).unwrap();
        assert_ne!(c, a);

        registry.delete(a).unwrap();
        let d = registry.build(position(0, 0)).unwrap();
        assert_eq!(d, a);
    }

    #[test]
    fn explicit_id_conflicts_leave_no_trace() {
        let mut registry = EntityRegistry::default();
        let id = registry
            .build_with_id(EntityId::new(5), position(3, 4))
            .unwrap();
        assert_eq!(id.index(), 5);

        let err = registry
            .build_with_id(EntityId::new(5), position(9, 9).with(Sprite))
            .unwrap_err();
        assert_eq!(err, EntityError::DuplicateId { id });
        assert_eq!(registry.component::<Position>(id), Some(&Position { x: 3, y: 4 }));
        assert!(registry.component::<Sprite>(id).is_none());
        assert_eq!(registry.len(), 1);

        // Holes below an explicit id are handed out first.
        assert!(registry.next_id().index() < 5);
    }

    #[test]
    fn bad_attribute_rolls_back_build() {
        let mut registry = EntityRegistry::default();
        let mut attrs = AttributeMap::new();
        attrs.put_value("x", crate::ecs::AttributeValue::Bool(true));
        let next = registry.next_id();

        let err = registry
            .build(EntityBuilder::new().with(Sprite).set_all::<Position>(&attrs))
            .unwrap_err();
        assert!(matches!(err, EntityError::Attribute { component: "Position", .. }));
        assert!(!registry.exists(next));
        assert!(registry.component::<Sprite>(next).is_none());
        assert_eq!(registry.next_id(), next);
    }

    #[test]
    fn failed_edit_restores_components() {
        let mut registry = EntityRegistry::default();
        let id = registry.build(position(1, 2)).unwrap();
        let mut attrs = AttributeMap::new();
        attrs.put_value("x", crate::ecs::AttributeValue::Int(50));
        attrs.put_value("y", crate::ecs::AttributeValue::Bool(true));

        let err = registry
            .set_attributes(id, EntityBuilder::new().with(Sprite).set_all::<Position>(&attrs))
            .unwrap_err();
        assert!(matches!(err, EntityError::Attribute { component: "Position", .. }));
        assert_eq!(registry.component::<Position>(id), Some(&Position { x: 1, y: 2 }));
        assert!(registry.component::<Sprite>(id).is_none());

        // a replacement value is undone as well
        let replaced = EntityBuilder::new()
            .with(Position { x: 7, y: 7 })
            .set_all::<Position>(&attrs);
        assert!(registry.set_attributes(id, replaced).is_err());
        assert_eq!(registry.component::<Position>(id), Some(&Position { x: 1, y: 2 }));
        assert_eq!(registry.to_attributes(id).len(), 1);
    }

    #[test]
    fn ids_beyond_the_limit_are_rejected() {
        let mut registry = EntityRegistry::new(&EntityConfig {
            max_entities: 2,
            ..EntityConfig::default()
        });
        let huge = EntityId::new(u32::MAX);
        assert_eq!(
            registry.build_with_id(huge, position(0, 0)),
            Err(EntityError::IdOutOfRange { id: huge, max: 2 })
        );
        assert!(registry.is_empty());

        registry.build(position(0, 0)).unwrap();
        registry.build(position(0, 0)).unwrap();
        assert!(matches!(
            registry.build(position(0, 0)),
            Err(EntityError::IdOutOfRange { max: 2, .. })
        ));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn mandatory_components_gate_activation() {
        let mut registry = EntityRegistry::default();
        let sprite = registry.require::<Sprite>().unwrap();
        let id = registry.build(position(0, 0)).unwrap();

        match registry.activate(id) {
            Err(EntityError::Activation(ActivationError::MissingComponent {
                component, name, ..
            })) => {
                assert_eq!(component, sprite);
                assert_eq!(name, "Sprite");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!registry.is_active(id));

        registry.set_component(id, Sprite).unwrap();
        registry.activate(id).unwrap();
        assert!(registry.is_active(id));
    }

    #[test]
    fn failed_spawn_discards_entity() {
        let mut registry = EntityRegistry::default();
        registry.require::<Sprite>().unwrap();
        let next = registry.next_id();
        assert!(registry.spawn(position(0, 0)).is_err());
        assert!(!registry.exists(next));
        assert!(registry.is_empty());
    }

    #[test]
    fn double_transitions_are_errors() {
        let mut registry = EntityRegistry::default();
        let id = registry.build(position(0, 0)).unwrap();
        assert_eq!(
            registry.deactivate(id),
            Err(ActivationError::NotActive { id }.into())
        );
        registry.activate(id).unwrap();
        assert_eq!(
            registry.activate(id),
            Err(ActivationError::AlreadyActive { id }.into())
        );
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn active_entities_are_frozen_structurally() {
        let mut registry = EntityRegistry::default();
        let id = registry.spawn(position(1, 1)).unwrap();

        assert_eq!(
            registry.set_component(id, Sprite),
            Err(EntityError::Active { id })
        );
        assert_eq!(
            registry.set_attributes(id, position(5, 5)),
            Err(EntityError::Active { id })
        );
        assert_eq!(
            registry.remove_component::<Position>(id),
            Err(EntityError::Active { id })
        );

        // Runtime state may still change.
        registry.component_mut::<Position>(id).unwrap().x = 7;
        assert_eq!(registry.component::<Position>(id).unwrap().x, 7);
    }

    #[test]
    fn reactivation_delivers_same_payload() {
        let mut registry = EntityRegistry::default();
        let sprite = registry.component_key::<Sprite>().unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));

        struct AspectLog(Rc<RefCell<Vec<Aspect>>>);
        impl EntityListener for AspectLog {
            fn on_entity_event(&mut self, event: &EntityEvent<'_>, _: &mut ListenerContext<'_>) {
                if event.kind == EntityEventKind::Activated {
                    self.0.borrow_mut().push(event.aspect.clone());
                }
            }
        }

        let filter = any(&registry);
        registry.register_listener(filter, Rc::new(RefCell::new(AspectLog(seen.clone()))));
        let id = registry.spawn(position(0, 0).with(Sprite)).unwrap();
        registry.deactivate(id).unwrap();
        registry.activate(id).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], seen[1]);
        assert!(seen[0].contains(sprite));
    }

    #[test]
    fn set_attributes_edits_in_place() {
        let mut registry = EntityRegistry::default();
        let id = registry.build(position(1, 2)).unwrap();
        registry
            .set_attributes(id, EntityBuilder::new().set(Y, 9))
            .unwrap();
        assert_eq!(registry.component::<Position>(id), Some(&Position { x: 1, y: 9 }));

        let exported = registry.to_attributes(id);
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].0, "Position");
        assert_eq!(exported[0].1.to_string(), "x=1, y=9");
    }

    #[test]
    fn keyed_access_matches_lookup() {
        let mut registry = EntityRegistry::default();
        let id = registry.build(position(4, 5).with(Sprite)).unwrap();
        let pos = registry.lookup_key::<Position>().unwrap();
        let sprite = registry.lookup_key::<Sprite>().unwrap();

        assert_eq!(registry.component_at::<Position>(id, pos), registry.component::<Position>(id));
        registry.component_at_mut::<Position>(id, pos).unwrap().y = 6;
        assert_eq!(registry.component::<Position>(id), Some(&Position { x: 4, y: 6 }));

        // a key for another kind finds nothing
        assert!(registry.component_at::<Position>(id, sprite).is_none());
        assert!(registry.component_at::<Position>(EntityId::new(40), pos).is_none());
    }

    #[test]
    fn aspect_tracks_components() {
        let mut registry = EntityRegistry::default();
        let id = registry.build(position(0, 0)).unwrap();
        let pos = registry.lookup_key::<Position>().unwrap();
        let sprite = registry.component_key::<Sprite>().unwrap();

        assert!(registry.aspect(id).unwrap().contains(pos));
        assert!(!registry.has_component(id, sprite));

        registry.set_component(id, Sprite).unwrap();
        assert!(registry.aspect(id).unwrap().contains(sprite));

        registry.remove_component::<Position>(id).unwrap();
        assert!(!registry.aspect(id).unwrap().contains(pos));
        assert!(registry.component_by_key(id, sprite).is_some());
    }

    #[test]
    fn listeners_defer_structural_changes() {
        /// Deletes every entity that gets activated.
        struct Reaper {
            seen_position: bool,
        }
        impl EntityListener for Reaper {
            fn on_entity_event(&mut self, event: &EntityEvent<'_>, ctx: &mut ListenerContext<'_>) {
                if event.kind == EntityEventKind::Activated {
                    self.seen_position = ctx.components.get::<Position>(event.entity).is_some();
                    ctx.commands.delete(event.entity);
                }
            }
        }

        let mut registry = EntityRegistry::default();
        let reaper = Rc::new(RefCell::new(Reaper {
            seen_position: false,
        }));
        let filter = any(&registry);
        registry.register_listener(filter, reaper.clone());

        let id = registry.build(position(0, 0)).unwrap();
        registry.activate(id).unwrap();

        assert!(reaper.borrow().seen_position);
        assert!(!registry.exists(id));
        assert_eq!(registry.pending_commands(), 0);
    }

    #[test]
    fn requests_run_on_flush() {
        let mut registry = EntityRegistry::default();
        let a = registry.build(position(0, 0)).unwrap();
        let b = registry.build(position(0, 0)).unwrap();

        registry.request_activation(a);
        registry.request_activation(b);
        registry.request_delete(b);
        assert!(!registry.is_active(a));

        assert_eq!(registry.flush(), 3);
        assert!(registry.is_active(a));
        assert!(!registry.exists(b));
    }

    #[test]
    fn active_matching_filters_by_aspect() {
        let mut registry = EntityRegistry::default();
        let sprite = registry.component_key::<Sprite>().unwrap();
        let a = registry.spawn(position(0, 0)).unwrap();
        let b = registry.spawn(position(0, 0).with(Sprite)).unwrap();

        let without = any(&registry).excluding(sprite);
        assert_eq!(registry.active_matching(&without).collect::<Vec<_>>(), vec![a]);
        let with = AspectFilter::requiring(registry.aspect_of([sprite]));
        assert_eq!(registry.active_matching(&with).collect::<Vec<_>>(), vec![b]);
    }
}
