pub mod core;

// Re-export commonly used types
pub use crate::core::entities::{AttributeValue, Entity, EntityId, EntityRegistry, EntityStats, EntityTypeStats};
pub use crate::core::errors::{EventError, RegistryError, SimError, StorageError, VehicleError};
pub use crate::core::event_scheduler::{Scheduler, SchedulerHandle};
pub use crate::core::events::{Event, Gate, Outcome, StorageEvent, TransportRequestEvent};
pub use crate::core::execution::SimulationConfig;
pub use crate::core::node::{Node, Sink};
pub use crate::core::simulation_engine::{Simulation, SimulationObserver};
pub use crate::core::storage::{QueueStats, Release, ReleaseParams, ReleaseStrategy, StorageCoordinator};
pub use crate::core::types::{Location, NodeId, NodeKind, Position, SimTime};
pub use crate::core::vehicles::{
    GroupStats, TransportContext, TravelTime, Vehicle, VehicleCoordinator, VehicleStats, VehicleStrategy,
};
