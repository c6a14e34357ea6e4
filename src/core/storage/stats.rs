use crate::core::types::SimTime;
use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub(crate) struct QueueCounters {
    pub total_enqueued: u64,
    pub total_released: u64,
    pub max_length: usize,
    pub length_samples: Vec<(SimTime, usize)>,
    pub wait_times: Vec<SimTime>,
}

impl QueueCounters {
    pub fn sample_length(&mut self, now: SimTime, length: usize) {
        self.max_length = self.max_length.max(length);
        self.length_samples.push((now, length));
    }

    pub fn record_enqueue(&mut self, now: SimTime, length: usize) {
        self.total_enqueued += 1;
        self.sample_length(now, length);
    }

    pub fn record_release(&mut self, now: SimTime, length: usize, waited: SimTime) {
        self.total_released += 1;
        self.wait_times.push(waited);
        self.sample_length(now, length);
    }
}

/// Snapshot of one storage queue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueStats {
    pub name: String,
    pub length: usize,
    pub waiting_consumers: usize,
    pub total_enqueued: u64,
    pub total_released: u64,
    pub max_length: usize,
    pub avg_wait_time: Option<f64>,
    pub max_wait_time: Option<SimTime>,
    /// `(time, length)` after every change
    pub length_samples: Vec<(SimTime, usize)>,
    /// Enqueue-to-release time of every released entry
    pub wait_times: Vec<SimTime>,
}

impl QueueStats {
    pub(crate) fn new(name: &str, length: usize, waiting: usize, counters: &QueueCounters) -> Self {
        let avg_wait_time = if counters.wait_times.is_empty() {
            None
        } else {
            let total: SimTime = counters.wait_times.iter().sum();
            Some(total as f64 / counters.wait_times.len() as f64)
        };

        Self {
            name: name.to_string(),
            length,
            waiting_consumers: waiting,
            total_enqueued: counters.total_enqueued,
            total_released: counters.total_released,
            max_length: counters.max_length,
            avg_wait_time,
            max_wait_time: counters.wait_times.iter().copied().max(),
            length_samples: counters.length_samples.clone(),
            wait_times: counters.wait_times.clone(),
        }
    }

    /// Time-weighted average length over `[0, until]`
    pub fn time_weighted_length(&self, until: SimTime) -> f64 {
        if until == 0 {
            return self.length as f64;
        }
        let mut area = 0.0;
        let mut last = (0, 0usize);
        for &(time, length) in &self.length_samples {
            let time = time.min(until);
            area += last.1 as f64 * time.saturating_sub(last.0) as f64;
            last = (time, length);
        }
        area += last.1 as f64 * until.saturating_sub(last.0) as f64;
        area / until as f64
    }
}
