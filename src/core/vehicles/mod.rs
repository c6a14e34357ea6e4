pub mod coordinator;
pub mod strategy;
pub(crate) mod transport;
pub mod vehicle;

pub use coordinator::{GroupStats, VehicleCoordinator};
pub use strategy::{TransportContext, VehicleStrategy};
pub use vehicle::{TravelTime, Vehicle, VehicleStats};
