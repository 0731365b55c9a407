//! Entity registry: ids, component storage, lifecycle and listeners.
//!
//! Entities are assembled in an [`EntityBuilder`], committed with
//! [`EntityRegistry::build`] and then moved between the inactive and active
//! states. Systems learn about active entities through [`EntityListener`]s
//! registered with an [`AspectFilter`](crate::aspect::AspectFilter).
//! Per-entity logic hangs off [`ControllerSystem`].

mod attributes;
mod builder;
pub(crate) mod component;
mod controller;
mod entity;
mod error;
mod events;
mod index;
mod registry;

pub use attributes::{AttributeError, AttributeKey, AttributeMap, AttributeValue, FromAttribute};
pub use builder::EntityBuilder;
pub use component::EntityComponent;
pub use controller::{Controller, ControllerId, ControllerSystem, EntityControllers};
pub use entity::{EntityId, EntityState};
pub use error::{ActivationError, EntityError};
pub use events::{
    ComponentView, EntityCommands, EntityEvent, EntityEventKind, EntityListener, ListenerContext,
    ListenerHandle, ListenerId,
};
pub use index::EntityIndex;
pub use registry::{EntityRegistry, ENTITY_COMPONENT_SPACE};
