use super::completion::{Event, Gate};
use crate::core::entities::{Entity, EntityId};
use crate::core::types::{Location, NodeId, SimTime};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

struct TransportRecord {
    entity: Option<Entity>,
    entity_id: EntityId,
    entity_type: String,
    destination: Location,
    requester: Location,
    vehicle: Option<NodeId>,
    requested_at: SimTime,
}

/// A request to carry an entity from a requester to a destination.
///
/// Two signals hang off a request: the requester's [`Gate`], fired when a
/// vehicle reaches the requester and picks the entity up, and the request
/// event itself, fired on delivery. The serving vehicle is recorded at
/// dispatch.
#[derive(Clone)]
pub struct TransportRequestEvent {
    event: Event,
    gate: Gate,
    record: Rc<RefCell<TransportRecord>>,
}

impl TransportRequestEvent {
    pub fn new(
        entity: Entity,
        destination: Location,
        requester: Location,
        gate: Gate,
        requested_at: SimTime,
    ) -> Self {
        let record = TransportRecord {
            entity_id: entity.id(),
            entity_type: entity.entity_type().to_string(),
            entity: Some(entity),
            destination,
            requester,
            vehicle: None,
            requested_at,
        };
        Self {
            event: Event::new(),
            gate,
            record: Rc::new(RefCell::new(record)),
        }
    }

    /// Fires on delivery
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Fires on pickup
    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    pub fn entity_id(&self) -> EntityId {
        self.record.borrow().entity_id
    }

    pub fn entity_type(&self) -> String {
        self.record.borrow().entity_type.clone()
    }

    pub fn destination(&self) -> Location {
        self.record.borrow().destination.clone()
    }

    pub fn requester(&self) -> Location {
        self.record.borrow().requester.clone()
    }

    /// The vehicle serving this request, once dispatched
    pub fn vehicle(&self) -> Option<NodeId> {
        self.record.borrow().vehicle.clone()
    }

    pub fn requested_at(&self) -> SimTime {
        self.record.borrow().requested_at
    }

    pub fn same_as(&self, other: &TransportRequestEvent) -> bool {
        Rc::ptr_eq(&self.record, &other.record)
    }

    pub(crate) fn assign_vehicle(&self, vehicle: NodeId) {
        self.record.borrow_mut().vehicle = Some(vehicle);
    }

    pub(crate) fn take_entity(&self) -> Option<Entity> {
        self.record.borrow_mut().entity.take()
    }
}

impl fmt::Debug for TransportRequestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.record.borrow();
        f.debug_struct("TransportRequestEvent")
            .field("entity", &record.entity_id)
            .field("requester", &record.requester.node)
            .field("destination", &record.destination.node)
            .field("vehicle", &record.vehicle)
            .field("requested_at", &record.requested_at)
            .finish()
    }
}
