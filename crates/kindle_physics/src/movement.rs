//! Per-tick movement integration.

use crate::components::{Movement, Transform};
use glam::Vec2;
use kindle_core::aspect::AspectFilter;
use kindle_core::ecs::{EntityId, EntityIndex, EntityRegistry, ListenerId};
use kindle_core::types::{TypeError, TypeKey};
use std::cell::RefCell;
use std::rc::Rc;

/// Advances one entity by one tick.
pub trait Integrator {
    /// Update `movement` and `transform` in place; returns whether the
    /// position changed.
    fn integrate(&self, transform: &mut Transform, movement: &mut Movement) -> bool;
}

/// Semi-implicit Euler: velocity first, then position.
#[derive(Debug, Default, Clone, Copy)]
pub struct EulerIntegrator;

impl Integrator for EulerIntegrator {
    fn integrate(&self, transform: &mut Transform, movement: &mut Movement) -> bool {
        movement.velocity += movement.acceleration;
        if movement.velocity == Vec2::ZERO {
            return false;
        }
        transform.position += movement.velocity;
        true
    }
}

/// Moves every active entity carrying both a [`Transform`] and a
/// [`Movement`].
pub struct MovementSystem {
    index: Rc<RefCell<EntityIndex>>,
    listener: ListenerId,
    integrator: Box<dyn Integrator>,
    transform: TypeKey,
    movement: TypeKey,
    moved: Vec<EntityId>,
}

impl MovementSystem {
    pub fn register(registry: &mut EntityRegistry) -> Result<Self, TypeError> {
        Self::with_integrator(registry, Box::new(EulerIntegrator))
    }

    pub fn with_integrator(
        registry: &mut EntityRegistry,
        integrator: Box<dyn Integrator>,
    ) -> Result<Self, TypeError> {
        let transform = registry.component_key::<Transform>()?;
        let movement = registry.component_key::<Movement>()?;
        let filter = AspectFilter::requiring(registry.aspect_of([transform, movement]));
        let index = Rc::new(RefCell::new(EntityIndex::new()));
        let listener = registry.register_listener(filter, index.clone());
        Ok(Self {
            index,
            listener,
            integrator,
            transform,
            movement,
            moved: Vec::new(),
        })
    }

    /// Integrate every tracked entity once. Returns the ids whose position
    /// changed, ascending.
    pub fn update(&mut self, registry: &mut EntityRegistry) -> &[EntityId] {
        self.moved.clear();
        let members = self.index.borrow().to_vec();
        for id in members {
            let Some(mut movement) = registry.component_at::<Movement>(id, self.movement).copied()
            else {
                continue;
            };
            if !movement.active {
                continue;
            }
            let Some(transform) = registry.component_at_mut::<Transform>(id, self.transform) else {
                continue;
            };
            let mut next = *transform;
            let moved = self.integrator.integrate(&mut next, &mut movement);
            *transform = next;
            if let Some(stored) = registry.component_at_mut::<Movement>(id, self.movement) {
                *stored = movement;
            }
            if moved {
                self.moved.push(id);
            }
        }
        tracing::trace!(moved = self.moved.len(), "movement integrated");
        &self.moved
    }

    /// Entities moved by the last `update`.
    pub fn moved(&self) -> &[EntityId] {
        &self.moved
    }

    /// Number of entities currently tracked.
    pub fn tracked(&self) -> usize {
        self.index.borrow().len()
    }

    pub fn listener(&self) -> ListenerId {
        self.listener
    }
}
