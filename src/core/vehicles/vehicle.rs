use crate::core::entities::Entity;
use crate::core::events::TransportRequestEvent;
use crate::core::types::{NodeId, NodeKind, Position, SimTime};
use rand::Rng;
use rand_distr::{Distribution, Exp, Normal, Triangular, Uniform};
use serde::Serialize;
use std::collections::VecDeque;

/// How long a vehicle takes to cover a leg of a trip.
///
/// Samples are rounded to whole ticks and clamped at zero.
#[derive(Debug, Clone)]
pub enum TravelTime {
    /// Every leg takes the same time
    Constant(SimTime),
    /// Distance divided by speed
    PerDistance { speed: f64 },
    Uniform(Uniform<f64>),
    Exponential(Exp<f64>),
    Normal(Normal<f64>),
    Triangular(Triangular<f64>),
}

impl Default for TravelTime {
    fn default() -> Self {
        TravelTime::Constant(0)
    }
}

impl TravelTime {
    /// Draw the time for a leg of `distance` units
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, distance: f64) -> SimTime {
        let raw = match self {
            TravelTime::Constant(ticks) => return *ticks,
            TravelTime::PerDistance { speed } => {
                if *speed > 0.0 {
                    distance.abs() / speed
                } else {
                    0.0
                }
            }
            TravelTime::Uniform(dist) => dist.sample(rng),
            TravelTime::Exponential(dist) => dist.sample(rng),
            TravelTime::Normal(dist) => dist.sample(rng),
            TravelTime::Triangular(dist) => dist.sample(rng),
        };

        to_ticks(raw)
    }
}

/// Round a sampled duration to whole ticks; negative or non-finite draws become zero.
pub(crate) fn to_ticks(raw: f64) -> SimTime {
    if raw.is_finite() && raw > 0.0 {
        raw.round() as SimTime
    } else {
        0
    }
}

#[derive(Debug)]
pub(crate) struct Assignment {
    pub request: TransportRequestEvent,
    pub assigned_at: SimTime,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct VehicleCounters {
    pub trips: u64,
    pub entities_transported: u64,
    pub total_travel_time: SimTime,
    pub busy_time: SimTime,
    pub queue_length_samples: Vec<(SimTime, usize)>,
    pub queue_wait_times: Vec<SimTime>,
}

/// Snapshot of one vehicle's counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleStats {
    pub vehicle: String,
    pub trips: u64,
    pub entities_transported: u64,
    pub total_travel_time: SimTime,
    pub busy_time: SimTime,
    pub avg_queue_wait: Option<f64>,
    /// `(time, queue length)` whenever the assignment queue changes
    pub queue_length_samples: Vec<(SimTime, usize)>,
    /// Assignment-to-start time of every queued trip
    pub queue_wait_times: Vec<SimTime>,
}

/// A transport resource in a vehicle group.
///
/// A vehicle is idle exactly when it has no trip in progress. Requests
/// assigned while it is busy wait in its own queue and start back to back.
#[derive(Debug)]
pub struct Vehicle {
    id: NodeId,
    position: Position,
    home: Option<Position>,
    travel_time: TravelTime,
    pub(crate) idle: bool,
    pub(crate) current: Option<TransportRequestEvent>,
    pub(crate) cargo: Option<Entity>,
    pub(crate) assignments: VecDeque<Assignment>,
    pub(crate) bounds: Option<(Position, Position)>,
    pub(crate) busy_since: Option<SimTime>,
    // Bumped on every dispatch; a pending return home checks it
    pub(crate) generation: u64,
    pub(crate) stats: VehicleCounters,
}

impl Vehicle {
    /// Create a new idle Vehicle at `position`
    pub fn new(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: NodeId::new(id, NodeKind::Vehicle),
            position,
            home: None,
            travel_time: TravelTime::default(),
            idle: true,
            current: None,
            cargo: None,
            assignments: VecDeque::new(),
            bounds: None,
            busy_since: None,
            generation: 0,
            stats: VehicleCounters::default(),
        }
    }

    /// Position the vehicle returns to when nothing is left to do
    pub fn with_home(mut self, home: Position) -> Self {
        self.home = Some(home);
        self
    }

    pub fn with_travel_time(mut self, travel_time: TravelTime) -> Self {
        self.travel_time = travel_time;
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn home(&self) -> Option<Position> {
        self.home
    }

    pub fn travel_time(&self) -> &TravelTime {
        &self.travel_time
    }

    /// Entities committed to this vehicle and not yet delivered: the trip in
    /// progress plus every queued assignment.
    pub fn queue_length(&self) -> usize {
        self.assignments.len() + usize::from(self.current.is_some())
    }

    /// Assignments waiting behind the current trip
    pub fn queued_assignments(&self) -> usize {
        self.assignments.len()
    }

    /// Bounds of the path the vehicle is committed to, while busy
    pub fn bounds(&self) -> Option<(Position, Position)> {
        self.bounds
    }

    /// The request being served right now
    pub fn current_request(&self) -> Option<&TransportRequestEvent> {
        self.current.as_ref()
    }

    /// Whether the vehicle is carrying an entity
    pub fn is_loaded(&self) -> bool {
        self.cargo.is_some()
    }

    pub fn stats(&self) -> VehicleStats {
        let counters = &self.stats;
        let avg_queue_wait = if counters.queue_wait_times.is_empty() {
            None
        } else {
            let total: SimTime = counters.queue_wait_times.iter().sum();
            Some(total as f64 / counters.queue_wait_times.len() as f64)
        };

        VehicleStats {
            vehicle: self.id.id().to_string(),
            trips: counters.trips,
            entities_transported: counters.entities_transported,
            total_travel_time: counters.total_travel_time,
            busy_time: counters.busy_time,
            avg_queue_wait,
            queue_length_samples: counters.queue_length_samples.clone(),
            queue_wait_times: counters.queue_wait_times.clone(),
        }
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub(crate) fn sample_queue(&mut self, now: SimTime) {
        let length = self.queue_length();
        self.stats.queue_length_samples.push((now, length));
    }
}
