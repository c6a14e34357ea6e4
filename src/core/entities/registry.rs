use super::entity::{Entity, EntityId};
use super::stats::{EntityStats, EntityTypeStats, TimeInSystem, TypeCounters};
use crate::core::errors::RegistryError;
use crate::core::types::SimTime;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct LiveEntry {
    entity_type: String,
    creation_time: SimTime,
}

/// Tracks every live entity of one simulation run.
///
/// Ids are scoped to the registry's run identity, which `reset` regenerates,
/// so entities left over from an earlier replication are rejected.
#[derive(Debug)]
pub struct EntityRegistry {
    run: Uuid,
    next_seq: u64,
    warm_up: SimTime,
    live: HashMap<EntityId, LiveEntry>,
    created: u64,
    destroyed: u64,
    time_in_system: TimeInSystem,
    by_type: BTreeMap<String, TypeCounters>,
    // Integral of live count over time since warm-up
    area: f64,
    last_change: SimTime,
}

impl EntityRegistry {
    /// Create a new EntityRegistry with no warm-up period
    pub fn new() -> Self {
        Self::with_warm_up(0)
    }

    /// Create a new EntityRegistry ignoring entities created before `warm_up`
    pub fn with_warm_up(warm_up: SimTime) -> Self {
        Self {
            run: Uuid::new_v4(),
            next_seq: 0,
            warm_up,
            live: HashMap::new(),
            created: 0,
            destroyed: 0,
            time_in_system: TimeInSystem::default(),
            by_type: BTreeMap::new(),
            area: 0.0,
            last_change: 0,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run
    }

    pub fn warm_up(&self) -> SimTime {
        self.warm_up
    }

    /// Register a new entity
    pub fn create(&mut self, entity_type: impl Into<String>, now: SimTime) -> Entity {
        let entity_type = entity_type.into();
        let id = EntityId::new(self.run, self.next_seq);
        self.next_seq += 1;

        self.advance_area(now);
        self.live.insert(
            id,
            LiveEntry {
                entity_type: entity_type.clone(),
                creation_time: now,
            },
        );

        if now >= self.warm_up {
            self.created += 1;
            self.by_type.entry(entity_type.clone()).or_default().created += 1;
        }

        log::trace!("created entity {} of type '{}' at {}", id, entity_type, now);
        Entity::new(id, entity_type, now)
    }

    /// Remove an entity from the system, returning it with its destruction
    /// time set.
    pub fn destroy(&mut self, mut entity: Entity, now: SimTime) -> Result<Entity, RegistryError> {
        let id = entity.id();
        if !self.live.contains_key(&id) {
            return Err(RegistryError::UnknownEntity(id));
        }

        self.advance_area(now);
        if let Some(entry) = self.live.remove(&id) {
            if entry.creation_time >= self.warm_up {
                let duration = now.saturating_sub(entry.creation_time);
                self.destroyed += 1;
                self.time_in_system.record(duration);

                let counters = self.by_type.entry(entry.entity_type).or_default();
                counters.destroyed += 1;
                counters.time_in_system.record(duration);
            }
        }

        entity.mark_destroyed(now);
        log::trace!("destroyed entity {} at {}", id, now);
        Ok(entity)
    }

    /// Whether the entity is live in this run
    pub fn contains(&self, id: &EntityId) -> bool {
        self.live.contains_key(id)
    }

    /// Number of live entities
    pub fn in_system(&self) -> usize {
        self.live.len()
    }

    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn destroyed(&self) -> u64 {
        self.destroyed
    }

    pub fn min_time_in_system(&self) -> Option<SimTime> {
        self.time_in_system.min
    }

    pub fn max_time_in_system(&self) -> Option<SimTime> {
        self.time_in_system.max
    }

    pub fn avg_time_in_system(&self) -> Option<f64> {
        self.time_in_system.average()
    }

    /// Time-weighted average number of live entities between warm-up and `now`
    pub fn average_in_system(&self, now: SimTime) -> f64 {
        if now <= self.warm_up {
            return self.live.len() as f64;
        }
        let from = self.last_change.max(self.warm_up);
        let area = self.area + self.live.len() as f64 * now.saturating_sub(from) as f64;
        area / (now - self.warm_up) as f64
    }

    /// Stats for one entity type, if any were counted
    pub fn type_stats(&self, entity_type: &str) -> Option<EntityTypeStats> {
        self.by_type
            .get(entity_type)
            .map(|counters| EntityTypeStats::from_counters(entity_type, counters))
    }

    /// Stats for every counted type, ordered by type name
    pub fn all_type_stats(&self) -> Vec<EntityTypeStats> {
        self.by_type
            .iter()
            .map(|(name, counters)| EntityTypeStats::from_counters(name, counters))
            .collect()
    }

    /// Snapshot of the registry-wide counters
    pub fn stats(&self, now: SimTime) -> EntityStats {
        EntityStats {
            created: self.created,
            destroyed: self.destroyed,
            in_system: self.live.len(),
            min_time_in_system: self.time_in_system.min,
            max_time_in_system: self.time_in_system.max,
            avg_time_in_system: self.time_in_system.average(),
            avg_number_in_system: self.average_in_system(now),
        }
    }

    /// Clear all state and start a new run identity. The warm-up setting is kept.
    pub fn reset(&mut self) {
        *self = Self::with_warm_up(self.warm_up);
    }

    fn advance_area(&mut self, now: SimTime) {
        let from = self.last_change.max(self.warm_up);
        if now > from {
            self.area += self.live.len() as f64 * (now - from) as f64;
        }
        self.last_change = now;
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
