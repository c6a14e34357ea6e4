use super::entities::{Entity, EntityId};
use super::errors::SimError;
use super::simulation_engine::Simulation;
use super::types::{Location, NodeId, NodeKind, Position, SimTime};
use std::cell::RefCell;

/// A processing stage entities flow through.
///
/// Nodes live in the simulation's directory behind `Rc`, so they keep their
/// own mutable state in cells. The kernel reaches them only through
/// [`Simulation::deliver`] and [`Simulation::resume`].
pub trait Node {
    fn id(&self) -> &NodeId;

    /// Where the node sits on the travel axis
    fn position(&self) -> Position;

    /// Take ownership of an arriving entity
    fn on_arrival(&self, sim: &mut Simulation, entity: Entity) -> Result<(), SimError>;

    /// Called when a storage queue this node waits on receives an arrival.
    /// The node should retry its release request.
    fn on_resume(&self, _sim: &mut Simulation, _queue: &str) -> Result<(), SimError> {
        Ok(())
    }

    fn location(&self) -> Location {
        self.id().at(self.position())
    }
}

/// Terminal node: destroys every arriving entity.
#[derive(Debug)]
pub struct Sink {
    id: NodeId,
    position: Position,
    arrivals: RefCell<Vec<(EntityId, SimTime)>>,
}

impl Sink {
    /// Create a new Sink at the given position
    pub fn new(id: impl Into<String>, position: Position) -> Self {
        Self {
            id: NodeId::new(id, NodeKind::Sink),
            position,
            arrivals: RefCell::new(Vec::new()),
        }
    }

    /// Number of entities destroyed here
    pub fn received(&self) -> usize {
        self.arrivals.borrow().len()
    }

    /// Destroyed entities in arrival order, with arrival times
    pub fn arrivals(&self) -> Vec<(EntityId, SimTime)> {
        self.arrivals.borrow().clone()
    }
}

impl Node for Sink {
    fn id(&self) -> &NodeId {
        &self.id
    }

    fn position(&self) -> Position {
        self.position
    }

    fn on_arrival(&self, sim: &mut Simulation, entity: Entity) -> Result<(), SimError> {
        let now = sim.now();
        let destroyed = sim.entities_mut().destroy(entity, now)?;
        log::trace!("{} destroyed entity {} at {}", self.id, destroyed.id(), now);
        self.arrivals.borrow_mut().push((destroyed.id(), now));
        Ok(())
    }
}
