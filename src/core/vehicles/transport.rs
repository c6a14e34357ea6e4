//! Trip lifecycle: travel to the requester, pick up, travel to the
//! destination, deliver, then take the next job or go idle.

use super::vehicle::Vehicle;
use crate::core::errors::{SimError, VehicleError};
use crate::core::event_scheduler::{Scheduler, SchedulerHandle};
use crate::core::events::TransportRequestEvent;
use crate::core::simulation_engine::Simulation;
use crate::core::types::{NodeId, Position, SimTime};

fn current_request(sim: &Simulation, group: &str, id: &NodeId) -> Result<(Position, TransportRequestEvent), SimError> {
    let vehicle = sim.vehicles().vehicle(group, id)?;
    let request = vehicle
        .current_request()
        .cloned()
        .ok_or_else(|| VehicleError::NoActiveTrip(id.clone()))?;
    Ok((vehicle.position(), request))
}

// Sample a leg, charge it to the vehicle and return its duration.
fn travel_leg(sim: &mut Simulation, group: &str, id: &NodeId, from: Position, to: Position) -> Result<SimTime, SimError> {
    let travel_time = sim.vehicles().vehicle(group, id)?.travel_time().clone();
    let ticks = sim.sample_travel(&travel_time, to - from);
    sim.vehicles_mut().vehicle_mut(group, id)?.stats.total_travel_time += ticks;
    Ok(ticks)
}

pub(crate) fn start_trip(sim: &mut Simulation, group: &str, id: &NodeId) -> Result<(), SimError> {
    let (position, request) = current_request(sim, group, id)?;
    let requester = request.requester();
    let ticks = travel_leg(sim, group, id, position, requester.position)?;

    let group = group.to_string();
    let id = id.clone();
    sim.env().schedule(
        ticks,
        Box::new(move |sim: &mut Simulation| pick_up(sim, &group, &id)),
    );
    Ok(())
}

fn pick_up(sim: &mut Simulation, group: &str, id: &NodeId) -> Result<(), SimError> {
    let (_, request) = current_request(sim, group, id)?;
    let requester = request.requester();
    let destination = request.destination();
    let entity = request.take_entity().ok_or(SimError::PayloadTaken)?;

    {
        let vehicle = sim.vehicles_mut().vehicle_mut(group, id)?;
        vehicle.set_position(requester.position);
        vehicle.cargo = Some(entity);
    }
    log::trace!("vehicle {} picked up entity {} at {}", id, request.entity_id(), requester.node);

    let env = sim.env().clone();
    request.gate().succeed(&env)?;

    let ticks = travel_leg(sim, group, id, requester.position, destination.position)?;
    let group = group.to_string();
    let id = id.clone();
    env.schedule(
        ticks,
        Box::new(move |sim: &mut Simulation| drop_off(sim, &group, &id)),
    );
    Ok(())
}

fn drop_off(sim: &mut Simulation, group: &str, id: &NodeId) -> Result<(), SimError> {
    let (_, request) = current_request(sim, group, id)?;
    let destination = request.destination();

    let entity = {
        let vehicle = sim.vehicles_mut().vehicle_mut(group, id)?;
        vehicle.set_position(destination.position);
        vehicle.stats.trips += 1;
        vehicle.stats.entities_transported += 1;
        vehicle.cargo.take().ok_or(SimError::PayloadTaken)?
    };
    log::trace!("vehicle {} delivered entity {} to {}", id, entity.id(), destination.node);

    sim.deliver(&destination.node, entity)?;
    let env = sim.env().clone();
    request.event().succeed(&env)?;

    if !sim.vehicles_mut().continue_or_idle(group, id)? {
        sim.vehicles_mut().on_vehicle_idle(group, id)?;
    }
    Ok(())
}

/// Send an idle vehicle home. The move is dropped if the vehicle is
/// dispatched again before it starts or lands.
pub(crate) fn schedule_return_home(env: &SchedulerHandle, group: &str, vehicle: &Vehicle, home: Position) {
    let generation = vehicle.generation;
    let group = group.to_string();
    let id = vehicle.id().clone();
    env.process(Box::new(move |sim: &mut Simulation| {
        return_home(sim, &group, &id, generation, home)
    }));
}

fn still_idle(sim: &Simulation, group: &str, id: &NodeId, generation: u64) -> Result<bool, SimError> {
    let vehicle = sim.vehicles().vehicle(group, id)?;
    Ok(vehicle.is_idle() && vehicle.generation == generation)
}

fn return_home(sim: &mut Simulation, group: &str, id: &NodeId, generation: u64, home: Position) -> Result<(), SimError> {
    if !still_idle(sim, group, id, generation)? {
        return Ok(());
    }

    let position = sim.vehicles().vehicle(group, id)?.position();
    let travel_time = sim.vehicles().vehicle(group, id)?.travel_time().clone();
    let ticks = sim.sample_travel(&travel_time, home - position);
    log::trace!("vehicle {} returning home to {} ({} ticks)", id, home, ticks);

    let group = group.to_string();
    let id = id.clone();
    sim.env().schedule(
        ticks,
        Box::new(move |sim: &mut Simulation| {
            if !still_idle(sim, &group, &id, generation)? {
                return Ok(());
            }
            {
                let vehicle = sim.vehicles_mut().vehicle_mut(&group, &id)?;
                vehicle.set_position(home);
                vehicle.stats.total_travel_time += ticks;
            }
            // The vehicle no longer blocks the path it left behind.
            sim.vehicles_mut().offer_queue(&group)?;
            Ok(())
        }),
    );
    Ok(())
}
