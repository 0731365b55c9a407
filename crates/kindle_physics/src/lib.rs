//! Kindle Physics
//!
//! Movement integration and per-tick contact scanning on top of the
//! entity registry in `kindle_core`.

pub mod collision;
pub mod components;
pub mod contact;
pub mod movement;
pub mod simulation;
pub mod spatial;

pub use collision::{CollisionEvent, CollisionSystem};
pub use components::{Collision, ContactScan, Movement, Transform};
pub use contact::{Contact, ContactConstraint, ContactSpaces};
pub use movement::{EulerIntegrator, Integrator, MovementSystem};
pub use simulation::{PhysicsError, Simulation, TickReport};
pub use spatial::{BruteForce, NeighborQuery, SpatialHashGrid};
