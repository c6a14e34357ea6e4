pub mod entity;
pub mod registry;
pub mod stats;

pub use entity::{AttributeValue, Entity, EntityId};
pub use registry::EntityRegistry;
pub use stats::{EntityStats, EntityTypeStats};
