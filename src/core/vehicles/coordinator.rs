use super::strategy::{projected_bounds, TransportContext, VehicleStrategy};
use super::transport;
use super::vehicle::{Assignment, Vehicle, VehicleStats};
use crate::core::errors::VehicleError;
use crate::core::event_scheduler::{Scheduler, SchedulerHandle};
use crate::core::events::TransportRequestEvent;
use crate::core::simulation_engine::Simulation;
use crate::core::types::{NodeId, Position, SimTime};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Default)]
struct VehicleGroup {
    vehicles: Vec<Vehicle>,
    requests: VecDeque<TransportRequestEvent>,
    strategy: VehicleStrategy,
    request_waits: Vec<SimTime>,
}

/// Snapshot of one vehicle group
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GroupStats {
    pub name: String,
    pub pending_requests: usize,
    /// Request-to-dispatch time of every dispatched request
    pub request_waits: Vec<SimTime>,
    pub vehicles: Vec<VehicleStats>,
}

/// Matches transport requests to vehicles across named groups.
///
/// Unmet requests wait in a per-group FIFO queue. A vehicle finishing its
/// work takes the oldest queued request its group's strategy lets it serve.
#[derive(Debug, Default)]
pub struct VehicleCoordinator {
    groups: HashMap<String, VehicleGroup>,
    env: Option<SchedulerHandle>,
}

impl VehicleCoordinator {
    /// Create a new, unbound VehicleCoordinator
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, env: SchedulerHandle) {
        self.env = Some(env);
    }

    pub fn is_bound(&self) -> bool {
        self.env.is_some()
    }

    /// Register a group with no vehicles and no pending requests
    pub fn add_group(&mut self, name: &str, strategy: VehicleStrategy) -> Result<(), VehicleError> {
        if self.groups.contains_key(name) {
            return Err(VehicleError::DuplicateGroup(name.to_string()));
        }
        self.groups.insert(
            name.to_string(),
            VehicleGroup {
                strategy,
                ..VehicleGroup::default()
            },
        );
        log::debug!("added vehicle group '{}'", name);
        Ok(())
    }

    /// Add a vehicle to a group. If the group has pending requests and the
    /// coordinator is bound, the vehicle is offered the queue right away.
    pub fn add_vehicle(&mut self, group: &str, vehicle: Option<Vehicle>) -> Result<(), VehicleError> {
        let vehicle = vehicle.ok_or(VehicleError::MissingVehicle)?;
        let entry = self.group_mut(group)?;
        if entry.vehicles.iter().any(|v| v.id() == vehicle.id()) {
            return Err(VehicleError::DuplicateVehicle {
                group: group.to_string(),
                vehicle: vehicle.id().clone(),
            });
        }

        let id = vehicle.id().clone();
        let has_requests = !entry.requests.is_empty();
        entry.vehicles.push(vehicle);
        log::debug!("added vehicle {} to group '{}'", id, group);

        if has_requests && self.env.is_some() {
            self.on_vehicle_idle(group, &id)?;
        }
        Ok(())
    }

    /// Serve a request now if the strategy finds a vehicle, otherwise queue it.
    ///
    /// Returns the vehicle the request was assigned to. While older requests
    /// are still queued a new one always joins the tail.
    pub fn request_transport(
        &mut self,
        group: &str,
        request: TransportRequestEvent,
    ) -> Result<Option<NodeId>, VehicleError> {
        let env = self.env.clone().ok_or(VehicleError::EnvironmentNotBound)?;
        let entry = self.group_mut(group)?;

        if entry.vehicles.is_empty() {
            log::warn!("group '{}' has no vehicles; request for entity {} waits", group, request.entity_id());
        }

        if entry.requests.is_empty() {
            let requester = request.requester();
            let destination = request.destination();
            let entity_type = request.entity_type();
            let ctx = TransportContext {
                requester: &requester,
                destination: &destination,
                entity_type: &entity_type,
            };

            if let Some(index) = entry.strategy.select(&entry.vehicles, &ctx) {
                if index >= entry.vehicles.len() {
                    return Err(VehicleError::InvalidSelection {
                        group: group.to_string(),
                        index,
                        len: entry.vehicles.len(),
                    });
                }
                let vehicle = assign(group, entry, index, request, &env);
                return Ok(Some(vehicle));
            }

            log::trace!("group '{}': no vehicle selected, queuing entity {}", group, request.entity_id());
            entry.requests.push_back(request);
            return Ok(None);
        }

        log::trace!(
            "group '{}': {} requests ahead, queuing entity {}",
            group,
            entry.requests.len(),
            request.entity_id()
        );
        entry.requests.push_back(request);
        self.offer_queue(group)?;
        Ok(None)
    }

    /// A vehicle has finished its work. Give it the oldest queued request it
    /// may serve, or send it home.
    pub fn on_vehicle_idle(&mut self, group: &str, vehicle: &NodeId) -> Result<(), VehicleError> {
        let env = self.env.clone().ok_or(VehicleError::EnvironmentNotBound)?;
        if self.dispatch_queued(group, vehicle, &env)? {
            return Ok(());
        }

        // A finished trip shrinks this vehicle's interval, which may clear
        // the path for other idle vehicles.
        self.offer_queue(group)?;

        let entry = self.group_mut(group)?;
        let index = vehicle_index(group, entry, vehicle)?;
        let vehicle = &entry.vehicles[index];
        if !vehicle.is_idle() {
            return Ok(());
        }

        if let Some(home) = vehicle.home() {
            if vehicle.position() != home {
                transport::schedule_return_home(&env, group, vehicle, home);
            }
        }
        Ok(())
    }

    /// Withdraw a queued request. Returns whether it was still queued.
    pub fn cancel_request(&mut self, group: &str, request: &TransportRequestEvent) -> Result<bool, VehicleError> {
        let entry = self.group_mut(group)?;
        let before = entry.requests.len();
        entry.requests.retain(|queued| !queued.same_as(request));
        Ok(entry.requests.len() != before)
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Registered group names, sorted
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.keys().cloned().collect();
        names.sort();
        names
    }

    /// Vehicles of a group in registration order
    pub fn vehicles(&self, group: &str) -> Result<&[Vehicle], VehicleError> {
        Ok(&self.group(group)?.vehicles)
    }

    pub fn vehicle(&self, group: &str, vehicle: &NodeId) -> Result<&Vehicle, VehicleError> {
        let entry = self.group(group)?;
        let index = vehicle_index(group, entry, vehicle)?;
        Ok(&entry.vehicles[index])
    }

    pub(crate) fn vehicle_mut(&mut self, group: &str, vehicle: &NodeId) -> Result<&mut Vehicle, VehicleError> {
        let entry = self.group_mut(group)?;
        let index = vehicle_index(group, entry, vehicle)?;
        Ok(&mut entry.vehicles[index])
    }

    pub fn pending_requests(&self, group: &str) -> Result<usize, VehicleError> {
        Ok(self.group(group)?.requests.len())
    }

    /// Queued requests, oldest first
    pub fn queued_requests(&self, group: &str) -> Result<Vec<TransportRequestEvent>, VehicleError> {
        Ok(self.group(group)?.requests.iter().cloned().collect())
    }

    pub fn stats(&self, group: &str) -> Result<GroupStats, VehicleError> {
        let entry = self.group(group)?;
        Ok(GroupStats {
            name: group.to_string(),
            pending_requests: entry.requests.len(),
            request_waits: entry.request_waits.clone(),
            vehicles: entry.vehicles.iter().map(Vehicle::stats).collect(),
        })
    }

    /// Drop every group and detach the scheduler
    pub fn reset(&mut self) {
        self.groups.clear();
        self.env = None;
    }

    /// Pop the next assignment of a vehicle that just finished a trip and
    /// start it, or mark the vehicle idle. Returns whether a trip started.
    pub(crate) fn continue_or_idle(&mut self, group: &str, vehicle: &NodeId) -> Result<bool, VehicleError> {
        let env = self.env.clone().ok_or(VehicleError::EnvironmentNotBound)?;
        let now = env.now();
        let vehicle = self.vehicle_mut(group, vehicle)?;
        vehicle.current = None;

        match vehicle.assignments.pop_front() {
            Some(Assignment { request, assigned_at }) => {
                vehicle.stats.queue_wait_times.push(now.saturating_sub(assigned_at));
                start(group, vehicle, request, &env);
                vehicle.sample_queue(now);
                Ok(true)
            }
            None => {
                vehicle.idle = true;
                vehicle.bounds = None;
                if let Some(since) = vehicle.busy_since.take() {
                    vehicle.stats.busy_time += now.saturating_sub(since);
                }
                vehicle.sample_queue(now);
                log::trace!("vehicle {} idle at {}", vehicle.id(), vehicle.position());
                Ok(false)
            }
        }
    }

    /// Offer the queued requests to every idle vehicle of the group, in
    /// registration order. Vehicles that take nothing stay where they are.
    pub(crate) fn offer_queue(&mut self, group: &str) -> Result<(), VehicleError> {
        let env = self.env.clone().ok_or(VehicleError::EnvironmentNotBound)?;
        let entry = self.group(group)?;
        if entry.requests.is_empty() {
            return Ok(());
        }

        let idle: Vec<NodeId> = entry
            .vehicles
            .iter()
            .filter(|v| v.is_idle())
            .map(|v| v.id().clone())
            .collect();
        for vehicle in idle {
            self.dispatch_queued(group, &vehicle, &env)?;
        }
        Ok(())
    }

    // Offer the queue to one idle vehicle, oldest request first. Requests
    // the strategy rejects keep their order.
    fn dispatch_queued(&mut self, group: &str, vehicle: &NodeId, env: &SchedulerHandle) -> Result<bool, VehicleError> {
        let entry = self.group_mut(group)?;
        let index = vehicle_index(group, entry, vehicle)?;
        if !entry.vehicles[index].is_idle() {
            return Ok(false);
        }

        let position = entry.requests.iter().position(|request| {
            let requester = request.requester();
            let destination = request.destination();
            let entity_type = request.entity_type();
            let ctx = TransportContext {
                requester: &requester,
                destination: &destination,
                entity_type: &entity_type,
            };
            entry.strategy.accepts(&entry.vehicles, index, &ctx)
        });

        let Some(position) = position else {
            return Ok(false);
        };
        let Some(request) = entry.requests.remove(position) else {
            return Ok(false);
        };
        assign(group, entry, index, request, env);
        Ok(true)
    }

    fn group(&self, name: &str) -> Result<&VehicleGroup, VehicleError> {
        self.groups
            .get(name)
            .ok_or_else(|| VehicleError::UnknownGroup(name.to_string()))
    }

    fn group_mut(&mut self, name: &str) -> Result<&mut VehicleGroup, VehicleError> {
        self.groups
            .get_mut(name)
            .ok_or_else(|| VehicleError::UnknownGroup(name.to_string()))
    }
}

fn vehicle_index(group: &str, entry: &VehicleGroup, vehicle: &NodeId) -> Result<usize, VehicleError> {
    entry
        .vehicles
        .iter()
        .position(|v| v.id() == vehicle)
        .ok_or_else(|| VehicleError::UnknownVehicle {
            group: group.to_string(),
            vehicle: vehicle.clone(),
        })
}

// Commit a request to a vehicle. An idle vehicle starts the trip at once; a
// busy one queues it behind its current work.
fn assign(
    group: &str,
    entry: &mut VehicleGroup,
    index: usize,
    request: TransportRequestEvent,
    env: &SchedulerHandle,
) -> NodeId {
    let now = env.now();
    entry
        .request_waits
        .push(now.saturating_sub(request.requested_at()));

    let vehicle = &mut entry.vehicles[index];
    request.assign_vehicle(vehicle.id().clone());

    if vehicle.idle {
        vehicle.idle = false;
        vehicle.busy_since = Some(now);
        start(group, vehicle, request, env);
    } else {
        let path = request_path(&request);
        vehicle.bounds = Some(widen(vehicle.bounds, path));
        log::trace!(
            "vehicle {} busy, queuing entity {} ({} ahead)",
            vehicle.id(),
            request.entity_id(),
            vehicle.queue_length()
        );
        vehicle.assignments.push_back(Assignment {
            request,
            assigned_at: now,
        });
    }
    vehicle.sample_queue(now);
    vehicle.id().clone()
}

// Requester-to-destination span of a request
fn request_path(request: &TransportRequestEvent) -> (Position, Position) {
    let from = request.requester().position;
    let to = request.destination().position;
    (from.min(to), from.max(to))
}

fn widen(bounds: Option<(Position, Position)>, path: (Position, Position)) -> (Position, Position) {
    match bounds {
        Some((lower, upper)) => (lower.min(path.0), upper.max(path.1)),
        None => path,
    }
}

// Schedule the trip. A vehicle leaving idle gets fresh bounds; one working
// through its assignment queue keeps its bounds, widened to the new path,
// until it goes idle.
fn start(group: &str, vehicle: &mut Vehicle, request: TransportRequestEvent, env: &SchedulerHandle) {
    let requester = request.requester();
    let destination = request.destination();
    let entity_type = request.entity_type();
    let ctx = TransportContext {
        requester: &requester,
        destination: &destination,
        entity_type: &entity_type,
    };
    let path = projected_bounds(vehicle, &ctx);
    vehicle.bounds = Some(widen(vehicle.bounds, path));
    vehicle.generation += 1;
    vehicle.current = Some(request);

    log::trace!(
        "vehicle {} dispatched from {} to {} via {}",
        vehicle.id(),
        vehicle.position(),
        destination.node,
        requester.node
    );

    let group = group.to_string();
    let id = vehicle.id().clone();
    env.process(Box::new(move |sim: &mut Simulation| {
        transport::start_trip(sim, &group, &id)
    }));
}
