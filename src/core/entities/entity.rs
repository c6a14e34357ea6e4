use crate::core::types::SimTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Typed value stored in an entity's attribute bag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl AttributeValue {
    /// Numeric view used by priority-style strategies
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Int(v) => Some(*v as f64),
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            AttributeValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Int(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Int(i64::from(value))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

/// Entity identifier, scoped to the registry run that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    run: Uuid,
    seq: u64,
}

impl EntityId {
    pub(crate) fn new(run: Uuid, seq: u64) -> Self {
        Self { run, seq }
    }

    /// Position in the issuing run's creation order
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn run(&self) -> Uuid {
        self.run
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.seq, self.run.simple())
    }
}

/// A unit flowing through the network.
///
/// Entities are moved, never cloned: whichever node holds the value owns it.
#[derive(Debug, PartialEq)]
pub struct Entity {
    id: EntityId,
    entity_type: String,
    creation_time: SimTime,
    destruction_time: Option<SimTime>,
    attributes: BTreeMap<String, AttributeValue>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, entity_type: impl Into<String>, creation_time: SimTime) -> Self {
        Self {
            id,
            entity_type: entity_type.into(),
            creation_time,
            destruction_time: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn creation_time(&self) -> SimTime {
        self.creation_time
    }

    /// Set once the registry destroys the entity
    pub fn destruction_time(&self) -> Option<SimTime> {
        self.destruction_time
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Builder-style variant of [`Entity::set_attribute`]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set_attribute(key, value);
        self
    }

    pub(crate) fn mark_destroyed(&mut self, now: SimTime) {
        self.destruction_time = Some(now);
    }
}
