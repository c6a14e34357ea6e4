pub mod coordinator;
pub mod stats;
pub mod strategy;

pub use coordinator::{Release, StorageCoordinator};
pub use stats::QueueStats;
pub use strategy::{ReleaseParams, ReleaseStrategy};
