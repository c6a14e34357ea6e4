use super::entities::{Entity, EntityRegistry};
use super::errors::SimError;
use super::event_scheduler::{Scheduler, SchedulerHandle};
use super::events::{Gate, StorageEvent, TransportRequestEvent};
use super::execution::SimulationConfig;
use super::node::Node;
use super::storage::StorageCoordinator;
use super::types::{Location, NodeId, SimTime};
use super::vehicles::vehicle::to_ticks;
use super::vehicles::{TravelTime, VehicleCoordinator};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Distribution;
use std::collections::HashMap;
use std::rc::Rc;
use uuid::Uuid;

/// Observer trait for simulation events
pub trait SimulationObserver {
    /// Called when the simulation clock advances
    fn on_time_advance(&mut self, old_time: SimTime, new_time: SimTime);

    /// Called when a simulation step completes
    fn on_step_complete(&mut self, time: SimTime, actions_processed: usize);
}

/// Everything one simulation run owns.
///
/// The registry, both coordinators and the node directory live here rather
/// than in process-wide state, so independent runs never share anything and
/// `reset` is an ordinary reinitialisation.
pub struct Simulation {
    run_id: Uuid,
    config: SimulationConfig,
    env: SchedulerHandle,
    entities: EntityRegistry,
    storage: StorageCoordinator,
    vehicles: VehicleCoordinator,
    nodes: HashMap<NodeId, Rc<dyn Node>>,
    rng: StdRng,
    observers: Vec<Box<dyn SimulationObserver>>,
}

impl Simulation {
    /// Create a new Simulation with both coordinators bound to its scheduler
    pub fn new(config: SimulationConfig) -> Self {
        let env = SchedulerHandle::new();
        let mut storage = StorageCoordinator::new();
        storage.bind(env.clone());
        let mut vehicles = VehicleCoordinator::new();
        vehicles.bind(env.clone());

        Self {
            run_id: Uuid::new_v4(),
            entities: EntityRegistry::with_warm_up(config.warm_up),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            env,
            storage,
            vehicles,
            nodes: HashMap::new(),
            observers: Vec::new(),
        }
    }

    /// Identity of the current run; changes on `reset`
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn env(&self) -> &SchedulerHandle {
        &self.env
    }

    /// Get current simulation time
    pub fn now(&self) -> SimTime {
        self.env.now()
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntityRegistry {
        &mut self.entities
    }

    pub fn storage(&self) -> &StorageCoordinator {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut StorageCoordinator {
        &mut self.storage
    }

    pub fn vehicles(&self) -> &VehicleCoordinator {
        &self.vehicles
    }

    pub fn vehicles_mut(&mut self) -> &mut VehicleCoordinator {
        &mut self.vehicles
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Draw a duration from `dist` using the run's RNG, rounded to whole ticks
    pub fn sample<D: Distribution<f64>>(&mut self, dist: &D) -> SimTime {
        to_ticks(dist.sample(&mut self.rng))
    }

    /// Draw a travel time for a leg of `distance` from the run's RNG
    pub fn sample_travel(&mut self, travel_time: &TravelTime, distance: f64) -> SimTime {
        travel_time.sample(&mut self.rng, distance)
    }

    /// Create an entity at the current time
    pub fn create_entity(&mut self, entity_type: &str) -> Entity {
        let now = self.now();
        self.entities.create(entity_type, now)
    }

    /// Add an observer to the simulation
    pub fn add_observer(&mut self, observer: Box<dyn SimulationObserver>) {
        self.observers.push(observer);
    }

    /// Schedule a closure to run after `delay` ticks
    pub fn schedule<F>(&self, delay: SimTime, action: F)
    where
        F: FnOnce(&mut Simulation) -> Result<(), SimError> + 'static,
    {
        self.env.schedule(delay, Box::new(action));
    }

    /// Register a node in the directory
    pub fn add_node(&mut self, node: Rc<dyn Node>) -> Result<(), SimError> {
        let id = node.id().clone();
        if self.nodes.contains_key(&id) {
            return Err(SimError::DuplicateNode(id));
        }
        debug!("registered {} node {}", id.kind(), id);
        self.nodes.insert(id, node);
        Ok(())
    }

    pub fn node(&self, id: &NodeId) -> Result<Rc<dyn Node>, SimError> {
        self.nodes
            .get(id)
            .cloned()
            .ok_or_else(|| SimError::UnknownNode(id.clone()))
    }

    pub fn location(&self, id: &NodeId) -> Result<Location, SimError> {
        Ok(self.node(id)?.location())
    }

    /// Hand an entity to a node
    pub fn deliver(&mut self, id: &NodeId, entity: Entity) -> Result<(), SimError> {
        let node = self.node(id)?;
        node.on_arrival(self, entity)
    }

    /// Wake a consumer that was waiting on `queue`
    pub fn resume(&mut self, id: &NodeId, queue: &str) -> Result<(), SimError> {
        let node = self.node(id)?;
        node.on_resume(self, queue)
    }

    /// Park an entity in a storage queue on behalf of `origin`
    pub fn store(&mut self, queue: &str, entity: Entity, origin: &NodeId) -> Result<StorageEvent, SimError> {
        let event = StorageEvent::new(entity, origin.clone());
        self.storage.enqueue(queue, event.clone())?;
        Ok(event)
    }

    /// Ask a vehicle group to carry `entity` from `requester` to
    /// `destination`, both resolved through the node directory. A gate is
    /// created when none is given; it fires at pickup.
    pub fn request_transport(
        &mut self,
        group: &str,
        entity: Entity,
        destination: &NodeId,
        requester: &NodeId,
        gate: Option<Gate>,
    ) -> Result<TransportRequestEvent, SimError> {
        let destination = self.location(destination)?;
        let requester = self.location(requester)?;
        let request = TransportRequestEvent::new(
            entity,
            destination,
            requester,
            gate.unwrap_or_default(),
            self.now(),
        );
        self.vehicles.request_transport(group, request.clone())?;
        Ok(request)
    }

    /// Process every action scheduled for the next instant. Returns false
    /// when nothing is left or the time limit stops the run.
    pub fn step(&mut self) -> Result<bool, SimError> {
        let Some(next_time) = self.env.peek_next_time() else {
            return Ok(false);
        };
        if let Some(limit) = self.config.time_limit {
            if next_time > limit {
                return Ok(false);
            }
        }

        let old_time = self.now();
        if next_time != old_time {
            self.notify_time_advance(old_time, next_time);
        }

        debug!("=== Simulation Time {} ===", next_time);

        let mut processed = 0;
        while self.env.peek_next_time() == Some(next_time) {
            let Some((_, action)) = self.env.pop_next() else {
                break;
            };
            action(self)?;
            processed += 1;
        }

        self.notify_step_complete(next_time, processed);
        Ok(true)
    }

    /// Run the complete simulation, returns final time
    pub fn run(&mut self) -> Result<SimTime, SimError> {
        info!("run {} started (seed {})", self.run_id, self.config.seed);
        while self.step()? {}
        if let Some(limit) = self.config.time_limit {
            self.env.advance_to(limit);
        }
        info!(
            "run {} finished at {} ({} entities in system)",
            self.run_id,
            self.now(),
            self.entities.in_system()
        );
        Ok(self.now())
    }

    /// Process everything scheduled up to and including `until`, then move
    /// the clock there.
    pub fn run_until(&mut self, until: SimTime) -> Result<SimTime, SimError> {
        while self.env.peek_next_time().is_some_and(|next| next <= until) {
            if !self.step()? {
                break;
            }
        }
        if self.config.time_limit.map_or(true, |limit| until <= limit) {
            self.env.advance_to(until);
        }
        Ok(self.now())
    }

    /// Check if there are pending actions in the scheduler
    pub fn has_pending_events(&self) -> bool {
        self.env.has_events()
    }

    /// Tear down all run state: new run id, empty scheduler, registry,
    /// coordinators and node directory, RNG reseeded. Observers stay.
    pub fn reset(&mut self) {
        self.env.clear();
        self.run_id = Uuid::new_v4();
        self.entities.reset();
        self.storage.reset();
        self.storage.bind(self.env.clone());
        self.vehicles.reset();
        self.vehicles.bind(self.env.clone());
        self.nodes.clear();
        self.rng = StdRng::seed_from_u64(self.config.seed);
        info!("simulation reset, run {}", self.run_id);
    }

    /// Notify all observers of a time advance
    fn notify_time_advance(&mut self, old_time: SimTime, new_time: SimTime) {
        for observer in &mut self.observers {
            observer.on_time_advance(old_time, new_time);
        }
    }

    /// Notify all observers of step completion
    fn notify_step_complete(&mut self, time: SimTime, actions_processed: usize) {
        for observer in &mut self.observers {
            observer.on_step_complete(time, actions_processed);
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}
