pub mod entities;
pub mod errors;
pub mod event_scheduler;
pub mod events;
pub mod execution;
pub mod node;
pub mod simulation_engine;
pub mod storage;
pub mod types;
pub mod vehicles;

#[cfg(test)]
mod tests;
