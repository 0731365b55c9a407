//! Kindle Engine Runtime
//!
//! Loads the engine config, builds a small demo scene and steps it,
//! logging every contact.
//!
//! Usage: `kindle [config.json] [ticks]`

use anyhow::{Context, Result};
use kindle_core::config::EngineConfig;
use kindle_core::ecs::{Controller, EntityBuilder, EntityControllers, EntityId, EntityRegistry};
use kindle_core::geom::{BitMask, Rect};
use kindle_core::time::FrameClock;
use kindle_physics::{Collision, ContactConstraint, ContactScan, Movement, Simulation, Transform};
use std::path::Path;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "config/engine.json";
const DEFAULT_TICKS: u64 = 12;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Kindle Engine v{}", kindle_core::VERSION);

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| DEFAULT_CONFIG.to_owned());
    let ticks = match args.next() {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("tick count '{raw}' is not a number"))?,
        None => DEFAULT_TICKS,
    };

    let config = if Path::new(&config_path).exists() {
        EngineConfig::load(&config_path)?
    } else {
        tracing::warn!(path = %config_path, "config not found, using defaults");
        EngineConfig::default()
    };

    let mut sim = Simulation::new(&config)?;
    build_scene(&mut sim)?;

    for _ in 0..ticks {
        let report = sim.tick();
        for event in sim.events() {
            tracing::info!(
                tick = report.tick,
                entity = %event.moved,
                other = %event.colliding,
                bounds = %event.bounds,
                masked = event.mask.is_some(),
                "contact"
            );
        }
    }

    let counters = sim.counters();
    for (name, _) in counters.iter() {
        tracing::info!(counter = name, total = counters.total(name), "metrics");
    }
    tracing::info!(
        ticks = sim.clock().tick_count(),
        frame_ms = sim.timer().average_ms(),
        active = sim.registry().active_count(),
        "simulation finished"
    );
    Ok(())
}

/// Stops an entity once any of its constraints touched something on the
/// previous tick.
struct StopOnContact;

impl Controller for StopOnContact {
    fn name(&self) -> &str {
        "stop-on-contact"
    }

    fn update(&mut self, clock: &FrameClock, entity: EntityId, registry: &mut EntityRegistry) {
        let touching = registry
            .component::<ContactScan>(entity)
            .map_or(false, ContactScan::has_any_contact);
        if !touching {
            return;
        }
        if let Some(movement) = registry.component_mut::<Movement>(entity) {
            if movement.velocity != kindle_core::glam::Vec2::ZERO {
                tracing::info!(tick = clock.tick_count(), entity = %entity, "stopped on contact");
            }
            movement.velocity = kindle_core::glam::Vec2::ZERO;
            movement.acceleration = kindle_core::glam::Vec2::ZERO;
        }
    }
}

/// A box sliding right into a wall, and a falling box with a ground-only
/// sensor over a slope and a pool of water. Both stop on first contact.
fn build_scene(sim: &mut Simulation) -> Result<()> {
    let stop = sim.add_controller(StopOnContact);

    let (collision, registry) = sim.collision_mut();
    let solid = collision.contact_type(registry, "solid")?;
    let ground = collision.material(registry, "ground")?;
    let water = collision.material(registry, "water")?;
    let spaces = collision.spaces();
    let capacity = collision.contact_capacity();

    sim.spawn(
        EntityBuilder::new()
            .with(Transform::at(10.0, 10.0))
            .with(Movement::with_velocity(3.0, 0.0))
            .with(EntityControllers::new().with(stop))
            .with(ContactScan::new().with(
                ContactConstraint::new("body", Rect::new(0, 0, 10, 10), spaces)
                    .with_contact_capacity(capacity),
            )),
    )?;
    sim.spawn(
        EntityBuilder::new()
            .with(Transform::at(30.0, 10.0))
            .with(Collision::new(Rect::new(0, 0, 10, 10)).with_contact_type(solid)),
    )?;

    let mut feet = ContactConstraint::new("feet", Rect::new(0, 8, 8, 2), spaces)
        .with_contact_capacity(capacity);
    feet.add_to_material_filter(ground);
    sim.spawn(
        EntityBuilder::new()
            .with(Transform::at(100.0, 0.0))
            .with(Movement {
                acceleration: kindle_core::glam::Vec2::new(0.0, 0.5),
                ..Movement::default()
            })
            .with(EntityControllers::new().with(stop))
            .with(ContactScan::new().with(feet)),
    )?;
    let slope = BitMask::from_rows(
        0,
        0,
        &[
            ".......#",
            "......##",
            ".....###",
            "....####",
        ],
    );
    sim.spawn(
        EntityBuilder::new()
            .with(Transform::at(100.0, 24.0))
            .with(
                Collision::new(Rect::new(0, 0, 8, 4))
                    .with_mask(slope)
                    .with_material(ground)
                    .with_contact_type(solid),
            ),
    )?;
    sim.spawn(
        EntityBuilder::new()
            .with(Transform::at(96.0, 20.0))
            .with(Collision::new(Rect::new(0, 0, 16, 4)).with_material(water)),
    )?;

    tracing::info!(entities = sim.registry().len(), "scene built");
    Ok(())
}
