//! Nodes shared by the integration tests.
#![allow(dead_code)]

use flowsim::{Entity, EntityId, Node, NodeId, NodeKind, Position, ReleaseParams, SimError, SimTime, Simulation};
use std::cell::RefCell;
use std::rc::Rc;

/// A node that keeps whatever arrives and, when woken by `retry_on`,
/// asks that queue again.
pub struct Station {
    id: NodeId,
    position: Position,
    retry_on: Option<String>,
    pub arrivals: RefCell<Vec<(EntityId, SimTime)>>,
    pub held: RefCell<Vec<Entity>>,
}

impl Station {
    pub fn new(id: &str, kind: NodeKind, position: Position) -> Rc<Self> {
        Rc::new(Self {
            id: NodeId::new(id, kind),
            position,
            retry_on: None,
            arrivals: RefCell::new(Vec::new()),
            held: RefCell::new(Vec::new()),
        })
    }

    pub fn consumer(id: &str, queue: &str) -> Rc<Self> {
        Rc::new(Self {
            id: NodeId::new(id, NodeKind::Server),
            position: 0.0,
            retry_on: Some(queue.to_string()),
            arrivals: RefCell::new(Vec::new()),
            held: RefCell::new(Vec::new()),
        })
    }

    pub fn arrival_ids(&self) -> Vec<EntityId> {
        self.arrivals.borrow().iter().map(|(id, _)| *id).collect()
    }

    pub fn arrival_times(&self) -> Vec<SimTime> {
        self.arrivals.borrow().iter().map(|(_, time)| *time).collect()
    }
}

impl Node for Station {
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
        if self.retry_on.as_deref() == Some(queue) {
            sim.storage_mut().try_release(queue, &self.id, &ReleaseParams::new())?;
        }
        Ok(())
    }
}

/// Register a node and hand it back
pub fn add<N: Node + 'static>(sim: &mut Simulation, node: Rc<N>) -> Rc<N> {
    sim.add_node(node.clone()).unwrap();
    node
}
