use crate::core::types::SimTime;
use serde::Serialize;

/// Running time-in-system accumulator
#[derive(Debug, Clone, Default)]
pub(crate) struct TimeInSystem {
    pub count: u64,
    pub total: SimTime,
    pub min: Option<SimTime>,
    pub max: Option<SimTime>,
}

impl TimeInSystem {
    pub fn record(&mut self, duration: SimTime) {
        self.count += 1;
        self.total += duration;
        self.min = Some(self.min.map_or(duration, |m| m.min(duration)));
        self.max = Some(self.max.map_or(duration, |m| m.max(duration)));
    }

    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.total as f64 / self.count as f64)
        }
    }
}

/// Per-type counters kept by the registry
#[derive(Debug, Clone, Default)]
pub(crate) struct TypeCounters {
    pub created: u64,
    pub destroyed: u64,
    pub time_in_system: TimeInSystem,
}

/// Registry-wide snapshot, polled at run end
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityStats {
    /// Entities created at or after warm-up
    pub created: u64,
    /// Entities created at or after warm-up and since destroyed
    pub destroyed: u64,
    /// Entities currently live, warm-up or not
    pub in_system: usize,
    pub min_time_in_system: Option<SimTime>,
    pub max_time_in_system: Option<SimTime>,
    pub avg_time_in_system: Option<f64>,
    /// Time-weighted average number of live entities since warm-up
    pub avg_number_in_system: f64,
}

/// Breakdown for one entity type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityTypeStats {
    pub entity_type: String,
    pub created: u64,
    pub destroyed: u64,
    pub remaining: u64,
    pub total_time_in_system: SimTime,
    pub min_time_in_system: Option<SimTime>,
    pub max_time_in_system: Option<SimTime>,
    pub avg_time_in_system: Option<f64>,
}

impl EntityTypeStats {
    pub(crate) fn from_counters(entity_type: &str, counters: &TypeCounters) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            created: counters.created,
            destroyed: counters.destroyed,
            remaining: counters.created.saturating_sub(counters.destroyed),
            total_time_in_system: counters.time_in_system.total,
            min_time_in_system: counters.time_in_system.min,
            max_time_in_system: counters.time_in_system.max,
            avg_time_in_system: counters.time_in_system.average(),
        }
    }
}
