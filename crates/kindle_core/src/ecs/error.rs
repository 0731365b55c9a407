use crate::ecs::{AttributeError, EntityId};
use crate::types::{TypeError, TypeKey};
use thiserror::Error;

/// Reasons an entity could not enter or leave the active set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActivationError {
    #[error("entity {id} lacks mandatory component {component} ({name})")]
    MissingComponent {
        id: EntityId,
        component: TypeKey,
        name: String,
    },

    #[error("entity {id} is already active")]
    AlreadyActive { id: EntityId },

    #[error("entity {id} is not active")]
    NotActive { id: EntityId },
}

/// Errors raised by the entity registry. None of them leave a partially
/// built entity behind.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EntityError {
    #[error("entity id {id} is already in use")]
    DuplicateId { id: EntityId },

    #[error("entity id {id} is beyond the limit of {max} entities")]
    IdOutOfRange { id: EntityId, max: usize },

    #[error("entity {id} does not exist")]
    UnknownEntity { id: EntityId },

    #[error("entity {id} is active; deactivate it before changing its components")]
    Active { id: EntityId },

    #[error(transparent)]
    Activation(#[from] ActivationError),

    #[error("component {component}: {source}")]
    Attribute {
        component: &'static str,
        #[source]
        source: AttributeError,
    },

    #[error(transparent)]
    Type(#[from] TypeError),
}
