use super::completion::Event;
use crate::core::entities::{AttributeValue, Entity, EntityId};
use crate::core::types::{NodeId, SimTime};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

struct StorageRecord {
    entity: Option<Entity>,
    entity_id: EntityId,
    entity_type: String,
    origin: NodeId,
    stored_at: Option<SimTime>,
    destination: Option<NodeId>,
}

/// An entity parked in a named storage queue.
///
/// The event fires when the coordinator hands the entity to a consumer; by
/// then [`StorageEvent::destination`] names that consumer. The storing node
/// typically registers a callback to free its slot.
#[derive(Clone)]
pub struct StorageEvent {
    event: Event,
    record: Rc<RefCell<StorageRecord>>,
}

impl StorageEvent {
    pub fn new(entity: Entity, origin: NodeId) -> Self {
        let record = StorageRecord {
            entity_id: entity.id(),
            entity_type: entity.entity_type().to_string(),
            entity: Some(entity),
            origin,
            stored_at: None,
            destination: None,
        };
        Self {
            event: Event::new(),
            record: Rc::new(RefCell::new(record)),
        }
    }

    /// The underlying one-shot event
    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn entity_id(&self) -> EntityId {
        self.record.borrow().entity_id
    }

    pub fn entity_type(&self) -> String {
        self.record.borrow().entity_type.clone()
    }

    /// Read an attribute of the stored entity. `None` once handed off.
    pub fn attribute(&self, key: &str) -> Option<AttributeValue> {
        self.record
            .borrow()
            .entity
            .as_ref()
            .and_then(|entity| entity.attribute(key).cloned())
    }

    /// The node that stored the entity
    pub fn origin(&self) -> NodeId {
        self.record.borrow().origin.clone()
    }

    /// The consumer the entry was matched to
    pub fn destination(&self) -> Option<NodeId> {
        self.record.borrow().destination.clone()
    }

    pub fn stored_at(&self) -> Option<SimTime> {
        self.record.borrow().stored_at
    }

    /// Whether the entity is still held by this event
    pub fn holds_entity(&self) -> bool {
        self.record.borrow().entity.is_some()
    }

    pub fn same_as(&self, other: &StorageEvent) -> bool {
        Rc::ptr_eq(&self.record, &other.record)
    }

    pub(crate) fn mark_stored(&self, now: SimTime) {
        self.record.borrow_mut().stored_at = Some(now);
    }

    pub(crate) fn resolve(&self, consumer: NodeId) {
        self.record.borrow_mut().destination = Some(consumer);
    }

    pub(crate) fn take_entity(&self) -> Option<Entity> {
        self.record.borrow_mut().entity.take()
    }
}

impl fmt::Debug for StorageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.record.borrow();
        f.debug_struct("StorageEvent")
            .field("entity", &record.entity_id)
            .field("origin", &record.origin)
            .field("destination", &record.destination)
            .field("event", &self.event)
            .finish()
    }
}
