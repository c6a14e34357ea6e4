use super::entities::EntityId;
use super::types::NodeId;

/// Misuse of a one-shot event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error("event has already fired")]
    AlreadyFired,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("entity {0} is not registered in this run")]
    UnknownEntity(EntityId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("storage queue '{0}' already exists")]
    DuplicateQueue(String),
    #[error("storage queue '{0}' not found")]
    UnknownQueue(String),
    #[error("storage coordinator is not bound to a scheduler")]
    EnvironmentNotBound,
    #[error("release strategy for '{queue}' selected index {index} of {len} entries")]
    InvalidSelection {
        queue: String,
        index: usize,
        len: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VehicleError {
    #[error("vehicle group '{0}' already exists")]
    DuplicateGroup(String),
    #[error("vehicle group '{0}' not found")]
    UnknownGroup(String),
    #[error("vehicle must be provided")]
    MissingVehicle,
    #[error("vehicle '{vehicle}' is already part of group '{group}'")]
    DuplicateVehicle { group: String, vehicle: NodeId },
    #[error("vehicle '{vehicle}' not found in group '{group}'")]
    UnknownVehicle { group: String, vehicle: NodeId },
    #[error("strategy for group '{group}' selected vehicle {index} of {len}")]
    InvalidSelection { group: String, index: usize, len: usize },
    #[error("vehicle '{0}' has no trip in progress")]
    NoActiveTrip(NodeId),
    #[error("vehicle coordinator is not bound to a scheduler")]
    EnvironmentNotBound,
}

/// Crate-level error. Any error returned from a scheduled action aborts the run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Event(#[from] EventError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Vehicle(#[from] VehicleError),
    #[error("node '{0}' is not registered")]
    UnknownNode(NodeId),
    #[error("node '{0}' is already registered")]
    DuplicateNode(NodeId),
    #[error("entity payload was already handed off")]
    PayloadTaken,
}
