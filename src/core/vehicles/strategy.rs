use super::vehicle::Vehicle;
use crate::core::types::{Location, Position};
use std::fmt;
use std::rc::Rc;

/// What a strategy sees of one transport request
#[derive(Debug, Clone, Copy)]
pub struct TransportContext<'a> {
    pub requester: &'a Location,
    pub destination: &'a Location,
    pub entity_type: &'a str,
}

/// Custom vehicle selection: index into the group's vehicles, or `None`.
pub type SelectFn = dyn Fn(&[Vehicle], &TransportContext<'_>) -> Option<usize>;

/// Picks the vehicle that serves a transport request
#[derive(Clone, Default)]
pub enum VehicleStrategy {
    /// Fewest committed entities, registration order on ties
    #[default]
    LowestQueueLength,
    /// Idle vehicles whose path stays clear of every other vehicle
    NoCollision,
    Custom(Rc<SelectFn>),
}

impl VehicleStrategy {
    pub fn custom<F>(select: F) -> Self
    where
        F: Fn(&[Vehicle], &TransportContext<'_>) -> Option<usize> + 'static,
    {
        VehicleStrategy::Custom(Rc::new(select))
    }

    /// Choose a vehicle for a new request
    pub fn select(&self, vehicles: &[Vehicle], ctx: &TransportContext<'_>) -> Option<usize> {
        match self {
            VehicleStrategy::LowestQueueLength => lowest_queue_length(vehicles, ctx),
            VehicleStrategy::NoCollision => no_collision(vehicles, ctx),
            VehicleStrategy::Custom(select) => select(vehicles, ctx),
        }
    }

    /// Whether the vehicle at `index` may take a queued request once it is idle
    pub fn accepts(&self, vehicles: &[Vehicle], index: usize, ctx: &TransportContext<'_>) -> bool {
        let Some(vehicle) = vehicles.get(index) else {
            return false;
        };
        match self {
            VehicleStrategy::LowestQueueLength => {
                let min = vehicles.iter().map(Vehicle::queue_length).min();
                min == Some(vehicle.queue_length())
            }
            VehicleStrategy::NoCollision => vehicle.is_idle() && is_clear(vehicles, index, ctx),
            VehicleStrategy::Custom(select) => select(vehicles, ctx) == Some(index),
        }
    }
}

impl fmt::Debug for VehicleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleStrategy::LowestQueueLength => f.write_str("LowestQueueLength"),
            VehicleStrategy::NoCollision => f.write_str("NoCollision"),
            VehicleStrategy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

pub fn lowest_queue_length(vehicles: &[Vehicle], _ctx: &TransportContext<'_>) -> Option<usize> {
    vehicles
        .iter()
        .enumerate()
        .min_by_key(|(index, vehicle)| (vehicle.queue_length(), *index))
        .map(|(index, _)| index)
}

/// Idle vehicle closest to the destination among those whose projected path
/// overlaps no other vehicle's interval. `None` when every candidate collides.
pub fn no_collision(vehicles: &[Vehicle], ctx: &TransportContext<'_>) -> Option<usize> {
    let toward_upper = ctx.destination.position >= ctx.requester.position;

    vehicles
        .iter()
        .enumerate()
        .filter(|(index, vehicle)| vehicle.is_idle() && is_clear(vehicles, *index, ctx))
        .map(|(index, vehicle)| {
            let (lower, upper) = projected_bounds(vehicle, ctx);
            let endpoint = if toward_upper { upper } else { lower };
            (index, (endpoint - ctx.destination.position).abs())
        })
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(index, _)| index)
}

/// Interval a vehicle would sweep serving this request: its position, the
/// requester and the destination.
pub fn projected_bounds(vehicle: &Vehicle, ctx: &TransportContext<'_>) -> (Position, Position) {
    let points = [
        vehicle.position(),
        ctx.requester.position,
        ctx.destination.position,
    ];
    let lower = points.iter().copied().fold(f64::INFINITY, f64::min);
    let upper = points.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (lower, upper)
}

/// Interval a vehicle occupies right now. A busy vehicle keeps the bounds it
/// was dispatched with; an idle one occupies only its position.
pub fn occupied_bounds(vehicle: &Vehicle) -> (Position, Position) {
    match (vehicle.is_idle(), vehicle.bounds()) {
        (false, Some(bounds)) => bounds,
        _ => (vehicle.position(), vehicle.position()),
    }
}

/// Closed intervals sharing at least one point
pub fn overlaps(a: (Position, Position), b: (Position, Position)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

fn is_clear(vehicles: &[Vehicle], index: usize, ctx: &TransportContext<'_>) -> bool {
    let candidate = projected_bounds(&vehicles[index], ctx);
    vehicles
        .iter()
        .enumerate()
        .filter(|(other, _)| *other != index)
        .all(|(_, vehicle)| !overlaps(candidate, occupied_bounds(vehicle)))
}
