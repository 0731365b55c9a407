//! Fixed-step driver tying the registry and physics systems together.

use crate::collision::{CollisionEvent, CollisionSystem};
use crate::components::Transform;
use crate::movement::MovementSystem;
use kindle_core::config::EngineConfig;
use kindle_core::ecs::{
    Controller, ControllerId, ControllerSystem, EntityBuilder, EntityError, EntityId,
    EntityRegistry,
};
use kindle_core::time::FrameClock;
use kindle_core::types::TypeError;
use kindle_metrics::{FrameCounters, FrameTimer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Entity(#[from] EntityError),
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    /// Deferred lifecycle requests executed at the start of the tick.
    pub commands: usize,
    /// Per-entity controller updates.
    pub controlled: usize,
    pub moved: usize,
    pub contacts: usize,
}

/// Owns the entity registry and runs the per-tick pipeline:
/// pending lifecycle requests, controllers, movement, then contact
/// scanning.
pub struct Simulation {
    registry: EntityRegistry,
    controllers: ControllerSystem,
    movement: MovementSystem,
    collision: CollisionSystem,
    clock: FrameClock,
    counters: FrameCounters,
    timer: FrameTimer,
}

impl Simulation {
    pub fn new(config: &EngineConfig) -> Result<Self, PhysicsError> {
        let mut registry = EntityRegistry::new(&config.entities);
        registry.require::<Transform>()?;
        let controllers = ControllerSystem::register(&mut registry)?;
        let movement = MovementSystem::register(&mut registry)?;
        let collision = CollisionSystem::register(
            &mut registry,
            &config.collision,
            config.types.default_space_capacity,
        )?;
        tracing::info!(
            tick_rate_hz = config.timing.tick_rate_hz,
            spatial_hash = config.collision.use_spatial_hash,
            "simulation ready"
        );
        Ok(Self {
            registry,
            controllers,
            movement,
            collision,
            clock: FrameClock::new(config.timing.tick_rate_hz),
            counters: FrameCounters::new(),
            timer: FrameTimer::new(config.timing.tick_rate_hz as usize),
        })
    }

    /// Build and activate an entity.
    pub fn spawn(&mut self, builder: EntityBuilder) -> Result<EntityId, PhysicsError> {
        Ok(self.registry.spawn(builder)?)
    }

    /// Register a controller; entities name it through
    /// [`EntityControllers`](kindle_core::ecs::EntityControllers).
    pub fn add_controller(&mut self, controller: impl Controller + 'static) -> ControllerId {
        self.controllers.add_controller(&self.registry, Box::new(controller))
    }

    pub fn remove_controller(&mut self, id: ControllerId) -> Option<Box<dyn Controller>> {
        self.controllers.remove_controller(id)
    }

    pub fn tick(&mut self) -> TickReport {
        self.timer.begin();

        let commands = self.registry.flush();
        let controlled = self.controllers.update(&mut self.registry, &self.clock);
        let moved = self.movement.update(&mut self.registry).len();
        let contacts = self.collision.update(&mut self.registry);
        self.clock.advance_tick();

        self.counters.add("commands", commands as u64);
        self.counters.add("controlled", controlled as u64);
        self.counters.add("moved", moved as u64);
        self.counters.add("contacts", contacts as u64);
        self.timer.end();
        self.counters.end_frame();

        kindle_metrics::metrics! {
            tracing::trace!(
                tick = self.clock.tick_count(),
                average_ms = self.timer.average_ms(),
                "tick timing"
            );
        }

        TickReport {
            tick: self.clock.tick_count(),
            commands,
            controlled,
            moved,
            contacts,
        }
    }

    /// Run `ticks` ticks, returning the last report.
    pub fn run(&mut self, ticks: u64) -> TickReport {
        let mut report = TickReport::default();
        for _ in 0..ticks {
            report = self.tick();
        }
        report
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    pub fn collision(&self) -> &CollisionSystem {
        &self.collision
    }

    /// Collision system together with the registry, for defining contact
    /// categories and materials.
    pub fn collision_mut(&mut self) -> (&mut CollisionSystem, &mut EntityRegistry) {
        (&mut self.collision, &mut self.registry)
    }

    pub fn controllers(&self) -> &ControllerSystem {
        &self.controllers
    }

    pub fn movement(&self) -> &MovementSystem {
        &self.movement
    }

    pub fn events(&self) -> &[CollisionEvent] {
        self.collision.events()
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn counters(&self) -> &FrameCounters {
        &self.counters
    }

    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }
}
