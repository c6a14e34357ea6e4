//! Gravel yard: trucks tip loads on a stockpile, a crusher takes the most
//! urgent load, and wheel loaders carry crushed gravel to the dispatch bay.
//!
//! Run with `RUST_LOG=flowsim=debug` to follow the kernel step by step.

use flowsim::core::storage::strategy::by_priority_attribute;
use flowsim::{
    Entity, Node, NodeId, NodeKind, Position, ReleaseParams, ReleaseStrategy, SimError, SimTime,
    Simulation, SimulationConfig, Sink, TravelTime, Vehicle, VehicleStrategy,
};
use rand::Rng;
use rand_distr::Triangular;
use std::rc::Rc;

const STOCKPILE: &str = "stockpile";
const LOADERS: &str = "wheel-loaders";

/// Configuration for the gravel yard model
#[derive(Debug, Clone)]
pub struct GravelYardConfig {
    // Truck arrivals
    pub truckloads: u32,
    pub min_arrival_gap: SimTime,
    pub max_arrival_gap: SimTime,
    pub fine_share: f64,

    // Crusher cycle (triangular)
    pub crush_min: f64,
    pub crush_mode: f64,
    pub crush_max: f64,

    // Loaders
    pub loader_count: usize,
    pub loader_speed: f64,

    // Layout
    pub crusher_position: Position,
    pub dispatch_position: Position,

    pub time_limit: SimTime,
    pub random_seed: u64,
}

impl Default for GravelYardConfig {
    fn default() -> Self {
        Self {
            truckloads: 30,
            min_arrival_gap: 2,
            max_arrival_gap: 9,
            fine_share: 0.3,

            crush_min: 3.0,
            crush_mode: 5.0,
            crush_max: 9.0,

            loader_count: 2,
            loader_speed: 4.0,

            crusher_position: 20.0,
            dispatch_position: 60.0,

            time_limit: 480,
            random_seed: 42,
        }
    }
}

/// Crushes one load at a time and waits for a loader to clear it before
/// pulling the next.
struct Crusher {
    id: NodeId,
    position: Position,
    dispatch: NodeId,
    cycle: Triangular<f64>,
}

impl Crusher {
    fn pull(sim: &mut Simulation, id: &NodeId) -> Result<(), SimError> {
        let params = ReleaseParams::new();
        sim.storage_mut().try_release(STOCKPILE, id, &params)?;
        Ok(())
    }
}

impl Node for Crusher {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn position(&self) -> Position {
        self.position
    }

    fn on_arrival(&self, sim: &mut Simulation, entity: Entity) -> Result<(), SimError> {
        let crush = sim.sample(&self.cycle).max(1);
        log::debug!("crusher takes {} {} for {} ticks", entity.entity_type(), entity.id(), crush);

        let id = self.id.clone();
        let dispatch = self.dispatch.clone();
        sim.schedule(crush, move |sim| {
            let request = sim.request_transport(LOADERS, entity, &dispatch, &id, None)?;
            request.gate().on_fire(move |sim, _| Crusher::pull(sim, &id))?;
            Ok(())
        });
        Ok(())
    }

    fn on_resume(&self, sim: &mut Simulation, _queue: &str) -> Result<(), SimError> {
        Crusher::pull(sim, &self.id)
    }
}

fn tip_truck(sim: &mut Simulation, config: Rc<GravelYardConfig>, weighbridge: NodeId, remaining: u32) -> Result<(), SimError> {
    let fine = sim.rng_mut().gen_bool(config.fine_share);
    let (kind, priority) = if fine { ("fine", 2) } else { ("coarse", 1) };
    let load = sim.create_entity(kind).with_attribute("priority", priority);
    sim.store(STOCKPILE, load, &weighbridge)?;

    if remaining > 1 {
        let gap = sim
            .rng_mut()
            .gen_range(config.min_arrival_gap..=config.max_arrival_gap);
        sim.schedule(gap, move |sim| tip_truck(sim, config, weighbridge, remaining - 1));
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .init();

    let config = Rc::new(GravelYardConfig::default());

    println!("Gravel yard simulation");
    println!("Configuration:");
    println!(
        "  Truckloads: {} (gap {}..={}, {:.0}% fine)",
        config.truckloads,
        config.min_arrival_gap,
        config.max_arrival_gap,
        config.fine_share * 100.0
    );
    println!(
        "  Crusher cycle: triangular({}, {}, {})",
        config.crush_min, config.crush_mode, config.crush_max
    );
    println!("  Loaders: {} at speed {}", config.loader_count, config.loader_speed);

    let sim_config = SimulationConfig::new()
        .with_seed(config.random_seed)
        .with_time_limit(config.time_limit);
    let mut sim = Simulation::new(sim_config);

    sim.storage_mut()
        .add_queue(STOCKPILE, ReleaseStrategy::custom(by_priority_attribute))?;
    sim.vehicles_mut()
        .add_group(LOADERS, VehicleStrategy::LowestQueueLength)?;
    for i in 0..config.loader_count {
        let loader = Vehicle::new(format!("loader-{}", i + 1), config.crusher_position)
            .with_travel_time(TravelTime::PerDistance { speed: config.loader_speed });
        sim.vehicles_mut().add_vehicle(LOADERS, Some(loader))?;
    }

    let dispatch = Rc::new(Sink::new("dispatch", config.dispatch_position));
    let crusher = Rc::new(Crusher {
        id: NodeId::new("crusher", NodeKind::Server),
        position: config.crusher_position,
        dispatch: dispatch.id().clone(),
        cycle: Triangular::new(config.crush_min, config.crush_max, config.crush_mode)?,
    });
    let crusher_id = crusher.id().clone();
    sim.add_node(dispatch.clone())?;
    sim.add_node(crusher)?;

    let weighbridge = NodeId::new("weighbridge", NodeKind::Source);
    let truckloads = config.truckloads;
    let arrivals = config.clone();
    sim.schedule(0, move |sim| Crusher::pull(sim, &crusher_id));
    sim.schedule(0, move |sim| tip_truck(sim, arrivals, weighbridge, truckloads));

    let end = sim.run()?;

    let entities = sim.entities().stats(end);
    let stockpile = sim.storage().stats(STOCKPILE)?;
    let loaders = sim.vehicles().stats(LOADERS)?;

    println!("\nResults at t={}:", end);
    println!(
        "  Loads: {} tipped, {} dispatched, {} still in the yard",
        entities.created, entities.destroyed, entities.in_system
    );
    if let Some(avg) = entities.avg_time_in_system {
        println!("  Time in yard: avg {:.1}", avg);
    }
    println!(
        "  Stockpile: max {} loads, avg {:.2} over time",
        stockpile.max_length,
        stockpile.time_weighted_length(end)
    );
    if let Some(wait) = stockpile.avg_wait_time {
        println!("  Stockpile wait: avg {:.1}", wait);
    }
    for loader in &loaders.vehicles {
        println!("  {:?}", loader);
    }
    for stats in sim.entities().all_type_stats() {
        println!("  {:?}", stats);
    }
    println!("  Dispatch bay received {}", dispatch.received());

    Ok(())
}
