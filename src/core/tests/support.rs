// Shared test nodes
use crate::core::entities::{Entity, EntityId};
use crate::core::errors::SimError;
use crate::core::node::Node;
use crate::core::simulation_engine::Simulation;
use crate::core::storage::{Release, ReleaseParams};
use crate::core::types::{NodeId, NodeKind, Position, SimTime};
use std::cell::RefCell;
use std::rc::Rc;

/// Records arrivals and wake-ups. When `retry_on` names a queue, a wake-up
/// from that queue re-issues the release request.
pub(crate) struct Probe {
    id: NodeId,
    position: Position,
    retry_on: Option<String>,
    params: ReleaseParams,
    pub held: RefCell<Vec<Entity>>,
    pub arrivals: RefCell<Vec<(EntityId, SimTime)>>,
    pub resumes: RefCell<Vec<(String, SimTime)>>,
}

impl Probe {
    pub fn new(id: &str, kind: NodeKind, position: Position) -> Rc<Self> {
        Rc::new(Self {
            id: NodeId::new(id, kind),
            position,
            retry_on: None,
            params: ReleaseParams::new(),
            held: RefCell::new(Vec::new()),
            arrivals: RefCell::new(Vec::new()),
            resumes: RefCell::new(Vec::new()),
        })
    }

    pub fn consumer(id: &str, queue: &str) -> Rc<Self> {
        Self::consumer_with(id, queue, ReleaseParams::new())
    }

    pub fn consumer_with(id: &str, queue: &str, params: ReleaseParams) -> Rc<Self> {
        Rc::new(Self {
            id: NodeId::new(id, NodeKind::Server),
            position: 0.0,
            retry_on: Some(queue.to_string()),
            params,
            held: RefCell::new(Vec::new()),
            arrivals: RefCell::new(Vec::new()),
            resumes: RefCell::new(Vec::new()),
        })
    }

    pub fn arrival_ids(&self) -> Vec<EntityId> {
        self.arrivals.borrow().iter().map(|(id, _)| *id).collect()
    }

    pub fn arrival_times(&self) -> Vec<SimTime> {
        self.arrivals.borrow().iter().map(|(_, time)| *time).collect()
    }

    /// Issue a release request for this probe
    pub fn request(&self, sim: &mut Simulation, queue: &str) -> Result<Release, SimError> {
        Ok(sim.storage_mut().try_release(queue, &self.id, &self.params)?)
    }
}

impl Node for Probe {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn position(&self) -> Position {
        self.position
    }

    fn on_arrival(&self, sim: &mut Simulation, entity: Entity) -> Result<(), SimError> {
        self.arrivals.borrow_mut().push((entity.id(), sim.now()));
        self.held.borrow_mut().push(entity);
        Ok(())
    }

    fn on_resume(&self, sim: &mut Simulation, queue: &str) -> Result<(), SimError> {
        self.resumes.borrow_mut().push((queue.to_string(), sim.now()));
        if self.retry_on.as_deref() == Some(queue) {
            self.request(sim, queue)?;
        }
        Ok(())
    }
}

/// Register a probe and hand back a clone of it
pub(crate) fn register(sim: &mut Simulation, probe: Rc<Probe>) -> Rc<Probe> {
    sim.add_node(probe.clone()).unwrap();
    probe
}
