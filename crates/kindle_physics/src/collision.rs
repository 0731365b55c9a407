//! Per-tick contact scanning.

use crate::components::{Collision, ContactScan, Movement, Transform};
use crate::contact::ContactSpaces;
use crate::spatial::{BruteForce, NeighborQuery, SpatialHashGrid};
use glam::{IVec2, Vec2};
use kindle_core::aspect::AspectFilter;
use kindle_core::config::CollisionConfig;
use kindle_core::ecs::{EntityId, EntityIndex, EntityRegistry};
use kindle_core::geom::{BitMask, Rect};
use kindle_core::types::{TypeError, TypeKey};
use std::cell::RefCell;
use std::rc::Rc;

/// One contact found during the last pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEvent {
    /// Entity whose constraint found the contact.
    pub moved: EntityId,
    /// Entity it ran into.
    pub colliding: EntityId,
    /// Overlap in the constraint's local cells.
    pub bounds: Rect,
    /// Cells actually touched, for masked shapes.
    pub mask: Option<BitMask>,
}

/// Rebuilds every [`ContactScan`] constraint against the collidable
/// entities once per tick.
///
/// Scanning entities carry `Transform + ContactScan`; collidable ones carry
/// `Transform + Collision`. Candidates are positioned at their floored
/// position; scanners snap toward their direction of travel.
pub struct CollisionSystem {
    spaces: ContactSpaces,
    keys: Keys,
    scanners: Rc<RefCell<EntityIndex>>,
    colliders: Rc<RefCell<EntityIndex>>,
    query: Box<dyn NeighborQuery>,
    contact_capacity: usize,
    events: Vec<CollisionEvent>,
    entries: Vec<(EntityId, Rect)>,
    candidates: Vec<EntityId>,
}

/// Component keys resolved once at registration.
#[derive(Debug, Clone, Copy)]
struct Keys {
    transform: TypeKey,
    movement: TypeKey,
    scan: TypeKey,
    collision: TypeKey,
}

impl CollisionSystem {
    /// Register with `registry`, defining the contact and material type
    /// spaces with `space_capacity` kinds each.
    pub fn register(
        registry: &mut EntityRegistry,
        config: &CollisionConfig,
        space_capacity: usize,
    ) -> Result<Self, TypeError> {
        let query: Box<dyn NeighborQuery> = if config.use_spatial_hash {
            Box::new(SpatialHashGrid::new(config.cell_size))
        } else {
            Box::new(BruteForce::new())
        };
        Self::with_query(registry, query, config.max_contacts_hint, space_capacity)
    }

    pub fn with_query(
        registry: &mut EntityRegistry,
        query: Box<dyn NeighborQuery>,
        contact_capacity: usize,
        space_capacity: usize,
    ) -> Result<Self, TypeError> {
        let spaces = ContactSpaces::define(registry.types_mut(), space_capacity);
        let transform = registry.component_key::<Transform>()?;
        let scan = registry.component_key::<ContactScan>()?;
        let collision = registry.component_key::<Collision>()?;
        let movement = registry.component_key::<Movement>()?;
        let scanners = Rc::new(RefCell::new(EntityIndex::new()));
        let colliders = Rc::new(RefCell::new(EntityIndex::new()));
        let filter = AspectFilter::requiring(registry.aspect_of([transform, scan]));
        registry.register_listener(filter, scanners.clone());
        let filter = AspectFilter::requiring(registry.aspect_of([transform, collision]));
        registry.register_listener(filter, colliders.clone());

        tracing::debug!(query = query.name(), "collision system registered");
        Ok(Self {
            spaces,
            keys: Keys {
                transform,
                movement,
                scan,
                collision,
            },
            scanners,
            colliders,
            query,
            contact_capacity,
            events: Vec::new(),
            entries: Vec::new(),
            candidates: Vec::new(),
        })
    }

    pub fn spaces(&self) -> ContactSpaces {
        self.spaces
    }

    /// Key of a named contact category such as "solid".
    pub fn contact_type(
        &self,
        registry: &mut EntityRegistry,
        name: &'static str,
    ) -> Result<TypeKey, TypeError> {
        self.spaces.contact_type(registry.types_mut(), name)
    }

    /// Key of a named material such as "water".
    pub fn material(
        &self,
        registry: &mut EntityRegistry,
        name: &'static str,
    ) -> Result<TypeKey, TypeError> {
        self.spaces.material(registry.types_mut(), name)
    }

    /// Contacts reserved per constraint, from configuration.
    pub fn contact_capacity(&self) -> usize {
        self.contact_capacity
    }

    /// Rescan every scanning entity. Returns the number of contacts found.
    pub fn update(&mut self, registry: &mut EntityRegistry) -> usize {
        self.events.clear();
        self.index_colliders(registry);

        let scanners = self.scanners.borrow().to_vec();
        let mut found = 0;
        for id in scanners {
            found += self.scan_entity(registry, id);
        }

        if found > 0 {
            tracing::debug!(
                scanners = self.scanners.borrow().len(),
                contacts = found,
                "collision pass"
            );
        }
        found
    }

    /// Events from the last `update`, in scan order.
    pub fn events(&self) -> &[CollisionEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<CollisionEvent> {
        std::mem::take(&mut self.events)
    }

    fn index_colliders(&mut self, registry: &EntityRegistry) {
        self.entries.clear();
        let keys = self.keys;
        for id in self.colliders.borrow().ids() {
            let (Some(transform), Some(collision)) = (
                registry.component_at::<Transform>(id, keys.transform),
                registry.component_at::<Collision>(id, keys.collision),
            ) else {
                continue;
            };
            self.entries
                .push((id, collision.world_bounds(floor(transform.position))));
        }
        self.query.rebuild(&self.entries);
    }

    fn scan_entity(&mut self, registry: &mut EntityRegistry, id: EntityId) -> usize {
        let keys = self.keys;
        let Some(position) = registry
            .component_at::<Transform>(id, keys.transform)
            .map(|t| t.position)
        else {
            return 0;
        };
        let velocity = registry
            .component_at::<Movement>(id, keys.movement)
            .filter(|m| m.active)
            .map_or(Vec2::ZERO, |m| m.velocity);
        let Some(mut scan) = registry
            .component_at_mut::<ContactScan>(id, keys.scan)
            .map(std::mem::take)
        else {
            return 0;
        };

        let mut found = 0;
        for constraint in scan.constraints_mut() {
            constraint.clear();
            constraint.update(position, velocity);

            self.candidates.clear();
            self.query.query(constraint.world_bounds(), &mut self.candidates);

            for &other in &self.candidates {
                if other == id {
                    continue;
                }
                let (Some(transform), Some(collision)) = (
                    registry.component_at::<Transform>(other, keys.transform),
                    registry.component_at::<Collision>(other, keys.collision),
                ) else {
                    continue;
                };
                if !constraint.accepts_layer(transform.layer_id)
                    || !constraint.matches(collision.material)
                {
                    continue;
                }

                let bounds = collision.world_bounds(floor(transform.position));
                let Some(contact) = constraint.contact_with(
                    other,
                    bounds,
                    collision.mask.as_ref(),
                    collision.material,
                    collision.contact_type,
                ) else {
                    continue;
                };
                let event = CollisionEvent {
                    moved: id,
                    colliding: other,
                    bounds: contact.bounds(),
                    mask: contact.mask().cloned(),
                };
                if constraint.add_contact(contact) {
                    tracing::trace!(
                        entity = %id,
                        other = %other,
                        constraint = constraint.name(),
                        bounds = %event.bounds,
                        "contact"
                    );
                    self.events.push(event);
                    found += 1;
                }
            }
        }

        if let Some(slot) = registry.component_at_mut::<ContactScan>(id, keys.scan) {
            *slot = scan;
        }
        found
    }
}

#[inline]
fn floor(position: Vec2) -> IVec2 {
    position.floor().as_ivec2()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::ContactConstraint;
    use kindle_core::ecs::EntityBuilder;

    struct World {
        registry: EntityRegistry,
        system: CollisionSystem,
    }

    fn world(use_spatial_hash: bool) -> World {
        let mut registry = EntityRegistry::default();
        let config = CollisionConfig {
            use_spatial_hash,
            cell_size: 16,
            ..CollisionConfig::default()
        };
        let system = CollisionSystem::register(&mut registry, &config, 16).unwrap();
        World { registry, system }
    }

    impl World {
        fn scanner(&mut self, x: f32, y: f32, constraint: ContactConstraint) -> EntityId {
            self.registry
                .spawn(
                    EntityBuilder::new()
                        .with(Transform::at(x, y))
                        .with(ContactScan::new().with(constraint)),
                )
                .unwrap()
        }

        fn body(&mut self, transform: Transform, collision: Collision) -> EntityId {
            self.registry
                .spawn(EntityBuilder::new().with(transform).with(collision))
                .unwrap()
        }

        fn constraint(&self) -> ContactConstraint {
            ContactConstraint::new("body", Rect::new(0, 0, 10, 10), self.system.spaces())
        }

        fn scan(&self, id: EntityId) -> &ContactConstraint {
            self.registry
                .component::<ContactScan>(id)
                .and_then(|s| s.constraint("body"))
                .unwrap()
        }
    }

    #[test]
    fn overlapping_bodies_produce_contacts() {
        for use_spatial_hash in [true, false] {
            let mut w = world(use_spatial_hash);
            let solid = w.system.contact_type(&mut w.registry, "solid").unwrap();
            let constraint = w.constraint();
            let scanner = w.scanner(0.0, 0.0, constraint);
            let near = w.body(
                Transform::at(5.0, 5.0),
                Collision::new(Rect::new(0, 0, 10, 10)).with_contact_type(solid),
            );
            w.body(Transform::at(40.0, 0.0), Collision::new(Rect::new(0, 0, 10, 10)));

            assert_eq!(w.system.update(&mut w.registry), 1);
            let event = &w.system.events()[0];
            assert_eq!((event.moved, event.colliding), (scanner, near));
            assert_eq!(event.bounds, Rect::new(5, 5, 5, 5));

            let scan = w.scan(scanner);
            assert!(scan.has_contact_type(solid));
            assert!(scan.has_contact(9, 9));
            assert!(!scan.has_contact(4, 4));
        }
    }

    #[test]
    fn scanner_never_contacts_itself() {
        let mut w = world(true);
        let constraint = w.constraint();
        let id = w.scanner(0.0, 0.0, constraint);
        w.registry.deactivate(id).unwrap();
        w.registry
            .set_component(id, Collision::new(Rect::new(0, 0, 10, 10)))
            .unwrap();
        w.registry.activate(id).unwrap();

        assert_eq!(w.system.update(&mut w.registry), 0);
        assert!(!w.scan(id).has_any_contact());
    }

    #[test]
    fn material_filter_excludes_overlapping_candidates() {
        let mut w = world(true);
        let ground = w.system.material(&mut w.registry, "ground").unwrap();
        let water = w.system.material(&mut w.registry, "water").unwrap();
        let mut constraint = w.constraint();
        constraint.add_to_material_filter(ground);
        let scanner = w.scanner(0.0, 0.0, constraint);
        w.body(
            Transform::at(0.0, 0.0),
            Collision::new(Rect::new(0, 0, 10, 10)).with_material(water),
        );

        w.system.update(&mut w.registry);
        assert!(!w.scan(scanner).has_any_contact());
        assert!(w.scan(scanner).intersection_mask().is_empty());

        w.body(
            Transform::at(8.0, 0.0),
            Collision::new(Rect::new(0, 0, 10, 10)).with_material(ground),
        );
        w.system.update(&mut w.registry);
        assert!(w.scan(scanner).has_material_contact(ground));
        assert!(!w.scan(scanner).has_material_contact(water));
        assert_eq!(w.scan(scanner).all_contacts().len(), 1);
    }

    #[test]
    fn layered_constraint_ignores_other_layers() {
        let mut w = world(false);
        let constraint = w.constraint().on_layer(1);
        let scanner = w.scanner(0.0, 0.0, constraint);
        w.body(Transform::at(0.0, 0.0).on_layer(2), Collision::new(Rect::new(0, 0, 4, 4)));
        assert_eq!(w.system.update(&mut w.registry), 0);

        w.body(Transform::at(0.0, 0.0).on_layer(1), Collision::new(Rect::new(0, 0, 4, 4)));
        assert_eq!(w.system.update(&mut w.registry), 1);
        assert!(w.scan(scanner).has_any_contact());
    }

    #[test]
    fn masked_shapes_contribute_their_cells() {
        let mut w = world(true);
        let constraint = w.constraint();
        let scanner = w.scanner(0.0, 0.0, constraint);
        let shape = BitMask::from_rows(0, 0, &["##", ".."]);
        w.body(
            Transform::at(4.0, 4.0),
            Collision::new(Rect::new(0, 0, 2, 2)).with_mask(shape),
        );

        w.system.update(&mut w.registry);
        let scan = w.scan(scanner);
        assert_eq!(scan.intersection_mask().cardinality(), 2);
        assert!(scan.has_contact(4, 4) && scan.has_contact(5, 4));
        assert!(!scan.has_contact(4, 5));
        assert!(w.system.events()[0].mask.is_some());
    }

    #[test]
    fn contacts_are_rebuilt_every_tick() {
        let mut w = world(true);
        let constraint = w.constraint();
        let scanner = w.scanner(0.0, 0.0, constraint);
        let body = w.body(Transform::at(5.0, 0.0), Collision::new(Rect::new(0, 0, 4, 4)));
        assert_eq!(w.system.update(&mut w.registry), 1);

        w.registry.component_mut::<Transform>(body).unwrap().position = Vec2::new(50.0, 0.0);
        assert_eq!(w.system.update(&mut w.registry), 0);
        assert!(!w.scan(scanner).has_any_contact());
        assert!(w.system.events().is_empty());
    }
}
