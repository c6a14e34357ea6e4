use super::stats::{QueueCounters, QueueStats};
use super::strategy::{ReleaseParams, ReleaseStrategy};
use crate::core::errors::{SimError, StorageError};
use crate::core::event_scheduler::{Scheduler, SchedulerHandle};
use crate::core::events::StorageEvent;
use crate::core::simulation_engine::Simulation;
use crate::core::types::NodeId;
use std::collections::{HashMap, VecDeque};

/// Result of a release request
#[derive(Debug, Clone)]
pub enum Release {
    /// An entry was matched to the consumer; its handoff is scheduled.
    Matched(StorageEvent),
    /// Nothing to release. The consumer waits in the pool until an arrival
    /// wakes it through [`crate::Node::on_resume`].
    Pending,
}

impl Release {
    pub fn is_pending(&self) -> bool {
        matches!(self, Release::Pending)
    }
}

#[derive(Debug, Default)]
struct StorageQueue {
    entries: Vec<StorageEvent>,
    waiting: VecDeque<NodeId>,
    strategy: ReleaseStrategy,
    stats: QueueCounters,
}

/// Matches buffered entities to consumers across named storage queues.
///
/// Each queue has a pool of consumers that asked for a release while it was
/// empty. An arrival wakes every pooled consumer, oldest first; a woken
/// consumer leaves every pool it was in and retries its release.
#[derive(Debug, Default)]
pub struct StorageCoordinator {
    queues: HashMap<String, StorageQueue>,
    env: Option<SchedulerHandle>,
}

impl StorageCoordinator {
    /// Create a new, unbound StorageCoordinator
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the scheduler that handoffs and wake-ups are scheduled on
    pub fn bind(&mut self, env: SchedulerHandle) {
        self.env = Some(env);
    }

    pub fn is_bound(&self) -> bool {
        self.env.is_some()
    }

    /// Register a named queue with an empty waiting pool
    pub fn add_queue(&mut self, name: &str, strategy: ReleaseStrategy) -> Result<(), StorageError> {
        if self.queues.contains_key(name) {
            return Err(StorageError::DuplicateQueue(name.to_string()));
        }
        self.queues.insert(
            name.to_string(),
            StorageQueue {
                strategy,
                ..StorageQueue::default()
            },
        );
        log::debug!("added storage queue '{}'", name);
        Ok(())
    }

    /// Append an arrival and wake every waiting consumer.
    ///
    /// Woken consumers are scheduled at the current instant in pool order;
    /// none is called before this returns.
    pub fn enqueue(&mut self, name: &str, event: StorageEvent) -> Result<(), StorageError> {
        let env = self.env.clone().ok_or(StorageError::EnvironmentNotBound)?;
        let now = env.now();

        let queue = self
            .queues
            .get_mut(name)
            .ok_or_else(|| StorageError::UnknownQueue(name.to_string()))?;

        event.mark_stored(now);
        log::trace!("queue '{}': stored entity {} at {}", name, event.entity_id(), now);
        queue.entries.push(event);
        let length = queue.entries.len();
        queue.stats.record_enqueue(now, length);

        let woken: Vec<NodeId> = queue.waiting.drain(..).collect();
        for consumer in &woken {
            self.remove_everywhere(consumer);
        }

        for consumer in woken {
            log::trace!("queue '{}': waking {}", name, consumer);
            let queue_name = name.to_string();
            env.process(Box::new(move |sim: &mut Simulation| {
                sim.resume(&consumer, &queue_name)
            }));
        }
        Ok(())
    }

    /// Release one entry to `consumer`, or park the consumer in the pool.
    pub fn try_release(
        &mut self,
        name: &str,
        consumer: &NodeId,
        params: &ReleaseParams,
    ) -> Result<Release, StorageError> {
        let env = self.env.clone().ok_or(StorageError::EnvironmentNotBound)?;
        let now = env.now();

        let queue = self
            .queues
            .get_mut(name)
            .ok_or_else(|| StorageError::UnknownQueue(name.to_string()))?;

        let selected = queue.strategy.select(&queue.entries, params);
        let index = match selected {
            Some(index) if index < queue.entries.len() => index,
            Some(index) => {
                return Err(StorageError::InvalidSelection {
                    queue: name.to_string(),
                    index,
                    len: queue.entries.len(),
                })
            }
            None => {
                if !queue.waiting.contains(consumer) {
                    queue.waiting.push_back(consumer.clone());
                }
                log::trace!("queue '{}': {} waits ({} in pool)", name, consumer, queue.waiting.len());
                return Ok(Release::Pending);
            }
        };

        let entry = queue.entries.remove(index);
        entry.resolve(consumer.clone());
        let waited = now.saturating_sub(entry.stored_at().unwrap_or(now));
        let length = queue.entries.len();
        queue.stats.record_release(now, length, waited);
        self.remove_everywhere(consumer);

        log::trace!(
            "queue '{}': released entity {} to {} after {}",
            name,
            entry.entity_id(),
            consumer,
            waited
        );

        let handoff = entry.clone();
        let target = consumer.clone();
        env.process(Box::new(move |sim: &mut Simulation| {
            let entity = handoff.take_entity().ok_or(SimError::PayloadTaken)?;
            let env = sim.env().clone();
            handoff.event().succeed(&env)?;
            sim.deliver(&target, entity)
        }));

        Ok(Release::Matched(entry))
    }

    /// Withdraw a waiting consumer. Returns whether it was in the pool.
    pub fn remove_from_pool(&mut self, name: &str, consumer: &NodeId) -> Result<bool, StorageError> {
        let queue = self
            .queues
            .get_mut(name)
            .ok_or_else(|| StorageError::UnknownQueue(name.to_string()))?;

        let before = queue.waiting.len();
        queue.waiting.retain(|waiting| waiting != consumer);
        Ok(queue.waiting.len() != before)
    }

    pub fn is_empty(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.queue(name)?.entries.is_empty())
    }

    pub fn queue_len(&self, name: &str) -> Result<usize, StorageError> {
        Ok(self.queue(name)?.entries.len())
    }

    pub fn waiting_len(&self, name: &str) -> Result<usize, StorageError> {
        Ok(self.queue(name)?.waiting.len())
    }

    /// Pooled consumers, oldest first
    pub fn waiting(&self, name: &str) -> Result<Vec<NodeId>, StorageError> {
        Ok(self.queue(name)?.waiting.iter().cloned().collect())
    }

    /// Queued entries in storage order
    pub fn entries(&self, name: &str) -> Result<Vec<StorageEvent>, StorageError> {
        Ok(self.queue(name)?.entries.clone())
    }

    pub fn has_queue(&self, name: &str) -> bool {
        self.queues.contains_key(name)
    }

    /// Registered queue names, sorted
    pub fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.queues.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn stats(&self, name: &str) -> Result<QueueStats, StorageError> {
        let queue = self.queue(name)?;
        Ok(QueueStats::new(
            name,
            queue.entries.len(),
            queue.waiting.len(),
            &queue.stats,
        ))
    }

    /// Drop every queue and pool and detach the scheduler
    pub fn reset(&mut self) {
        self.queues.clear();
        self.env = None;
    }

    fn queue(&self, name: &str) -> Result<&StorageQueue, StorageError> {
        self.queues
            .get(name)
            .ok_or_else(|| StorageError::UnknownQueue(name.to_string()))
    }

    fn remove_everywhere(&mut self, consumer: &NodeId) {
        for queue in self.queues.values_mut() {
            queue.waiting.retain(|waiting| waiting != consumer);
        }
    }
}
