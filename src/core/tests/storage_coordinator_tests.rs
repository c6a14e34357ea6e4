// Tests for StorageCoordinator matching
#[cfg(test)]
mod tests {
    use crate::core::entities::AttributeValue;
    use crate::core::errors::StorageError;
    use crate::core::events::StorageEvent;
    use crate::core::node::{Node, Sink};
    use crate::core::simulation_engine::Simulation;
    use crate::core::storage::strategy::{by_entity_type, by_priority_attribute, ENTITY_TYPE_PARAM};
    use crate::core::storage::{Release, ReleaseParams, ReleaseStrategy, StorageCoordinator};
    use crate::core::tests::support::{register, Probe};
    use crate::core::types::{NodeId, NodeKind};
    use std::rc::Rc;

    fn origin() -> NodeId {
        NodeId::new("buffer", NodeKind::Storage)
    }

    fn sim_with_queue(name: &str, strategy: ReleaseStrategy) -> Simulation {
        let mut sim = Simulation::default();
        sim.storage_mut().add_queue(name, strategy).unwrap();
        sim
    }

    #[test]
    fn test_duplicate_queue_rejected() {
        let mut sim = sim_with_queue("Q", ReleaseStrategy::Fifo);
        let result = sim.storage_mut().add_queue("Q", ReleaseStrategy::Lifo);
        assert_eq!(result, Err(StorageError::DuplicateQueue("Q".to_string())));
    }

    #[test]
    fn test_unbound_coordinator() {
        let mut sim = Simulation::default();
        let mut storage = StorageCoordinator::new();
        storage.add_queue("Q", ReleaseStrategy::Fifo).unwrap();
        let consumer = NodeId::new("c", NodeKind::Server);

        let release = storage.try_release("Q", &consumer, &ReleaseParams::new());
        assert!(matches!(release, Err(StorageError::EnvironmentNotBound)));

        let entity = sim.create_entity("part");
        let enqueue = storage.enqueue("Q", StorageEvent::new(entity, origin()));
        assert_eq!(enqueue, Err(StorageError::EnvironmentNotBound));
        assert!(storage.is_empty("Q").unwrap());
        assert_eq!(storage.waiting_len("Q").unwrap(), 0);
    }

    #[test]
    fn test_unknown_queue() {
        let mut sim = Simulation::default();
        let consumer = NodeId::new("c", NodeKind::Server);
        let result = sim
            .storage_mut()
            .try_release("nowhere", &consumer, &ReleaseParams::new());
        assert!(matches!(result, Err(StorageError::UnknownQueue(name)) if name == "nowhere"));
        assert!(sim.storage().is_empty("nowhere").is_err());
    }

    #[test]
    fn test_waiting_consumer_matched_on_arrival() {
        let mut sim = sim_with_queue("Q", ReleaseStrategy::Fifo);
        let consumer = register(&mut sim, Probe::consumer("C", "Q"));

        let first = consumer.request(&mut sim, "Q").unwrap();
        assert!(first.is_pending());
        assert_eq!(sim.storage().waiting("Q").unwrap(), vec![consumer.id().clone()]);

        let entity = sim.create_entity("part");
        let id = entity.id();
        let stored = sim.store("Q", entity, &origin()).unwrap();

        // The pool empties as soon as the arrival is recorded
        assert_eq!(sim.storage().waiting_len("Q").unwrap(), 0);

        sim.run().unwrap();
        assert_eq!(consumer.arrival_ids(), vec![id]);
        assert!(sim.storage().is_empty("Q").unwrap());
        assert_eq!(sim.storage().waiting_len("Q").unwrap(), 0);
        assert_eq!(stored.destination(), Some(consumer.id().clone()));
        assert!(stored.event().is_processed());
        assert!(stored.event().is_ok());
    }

    #[test]
    fn test_release_from_stocked_queue() {
        let mut sim = sim_with_queue("Q", ReleaseStrategy::Fifo);
        let consumer = register(&mut sim, Probe::consumer("C", "Q"));
        let entity = sim.create_entity("part");
        let id = entity.id();
        sim.store("Q", entity, &origin()).unwrap();

        let release = consumer.request(&mut sim, "Q").unwrap();
        let Release::Matched(entry) = release else {
            panic!("expected a match");
        };
        assert_eq!(entry.entity_id(), id);
        assert_eq!(entry.destination(), Some(consumer.id().clone()));
        assert!(sim.storage().is_empty("Q").unwrap());

        // Handoff happens when the scheduler runs
        assert!(consumer.arrival_ids().is_empty());
        sim.run().unwrap();
        assert_eq!(consumer.arrival_ids(), vec![id]);
    }

    #[test]
    fn test_fifo_and_lifo_order() {
        for (strategy, reversed) in [(ReleaseStrategy::Fifo, false), (ReleaseStrategy::Lifo, true)] {
            let mut sim = sim_with_queue("Q", strategy);
            let consumer = register(&mut sim, Probe::consumer("C", "Q"));

            let mut ids = Vec::new();
            for _ in 0..4 {
                let entity = sim.create_entity("part");
                ids.push(entity.id());
                sim.store("Q", entity, &origin()).unwrap();
            }
            for _ in 0..4 {
                consumer.request(&mut sim, "Q").unwrap();
            }
            sim.run().unwrap();

            if reversed {
                ids.reverse();
            }
            assert_eq!(consumer.arrival_ids(), ids);
        }
    }

    #[test]
    fn test_consumer_in_two_pools_woken_once() {
        let mut sim = Simulation::default();
        sim.storage_mut().add_queue("Q1", ReleaseStrategy::Fifo).unwrap();
        sim.storage_mut().add_queue("Q2", ReleaseStrategy::Fifo).unwrap();
        let consumer = register(&mut sim, Probe::consumer("C", "Q1"));

        consumer.request(&mut sim, "Q1").unwrap();
        consumer.request(&mut sim, "Q2").unwrap();
        assert_eq!(sim.storage().waiting_len("Q1").unwrap(), 1);
        assert_eq!(sim.storage().waiting_len("Q2").unwrap(), 1);

        let entity = sim.create_entity("part");
        sim.store("Q1", entity, &origin()).unwrap();
        assert_eq!(sim.storage().waiting_len("Q1").unwrap(), 0);
        assert_eq!(sim.storage().waiting_len("Q2").unwrap(), 0);

        // A later arrival on Q2 must not wake it again
        let other = sim.create_entity("part");
        sim.store("Q2", other, &origin()).unwrap();

        sim.run().unwrap();
        assert_eq!(consumer.resumes.borrow().len(), 1);
        assert_eq!(consumer.arrival_ids().len(), 1);
        assert_eq!(sim.storage().queue_len("Q2").unwrap(), 1);
    }

    #[test]
    fn test_all_waiters_woken_oldest_first() {
        let mut sim = sim_with_queue("Q", ReleaseStrategy::Fifo);
        let first = register(&mut sim, Probe::consumer("C1", "Q"));
        let second = register(&mut sim, Probe::consumer("C2", "Q"));

        first.request(&mut sim, "Q").unwrap();
        second.request(&mut sim, "Q").unwrap();

        let entity = sim.create_entity("part");
        sim.store("Q", entity, &origin()).unwrap();
        sim.run().unwrap();

        // Both retried; only the oldest got the single entry
        assert_eq!(first.resumes.borrow().len(), 1);
        assert_eq!(second.resumes.borrow().len(), 1);
        assert_eq!(first.arrival_ids().len(), 1);
        assert!(second.arrival_ids().is_empty());
        assert_eq!(sim.storage().waiting("Q").unwrap(), vec![second.id().clone()]);
    }

    #[test]
    fn test_remove_from_pool_idempotent() {
        let mut sim = sim_with_queue("Q", ReleaseStrategy::Fifo);
        let consumer = register(&mut sim, Probe::consumer("C", "Q"));
        let absent = NodeId::new("ghost", NodeKind::Server);

        consumer.request(&mut sim, "Q").unwrap();
        // Asking again while pooled does not add a second entry
        consumer.request(&mut sim, "Q").unwrap();
        assert_eq!(sim.storage().waiting_len("Q").unwrap(), 1);

        assert_eq!(sim.storage_mut().remove_from_pool("Q", consumer.id()), Ok(true));
        assert_eq!(sim.storage_mut().remove_from_pool("Q", consumer.id()), Ok(false));
        assert_eq!(sim.storage_mut().remove_from_pool("Q", &absent), Ok(false));
        assert_eq!(sim.storage_mut().remove_from_pool("Q", &absent), Ok(false));

        // A withdrawn consumer is not woken
        let entity = sim.create_entity("part");
        sim.store("Q", entity, &origin()).unwrap();
        sim.run().unwrap();
        assert!(consumer.resumes.borrow().is_empty());
        assert_eq!(sim.storage().queue_len("Q").unwrap(), 1);
    }

    #[test]
    fn test_release_by_entity_type() {
        let mut sim = sim_with_queue("Q", ReleaseStrategy::custom(by_entity_type));
        let mut params = ReleaseParams::new();
        params.insert(ENTITY_TYPE_PARAM.to_string(), AttributeValue::from("lid"));
        let consumer = register(&mut sim, Probe::consumer_with("C", "Q", params));

        let jar = sim.create_entity("jar");
        sim.store("Q", jar, &origin()).unwrap();
        let lid = sim.create_entity("lid");
        let lid_id = lid.id();
        sim.store("Q", lid, &origin()).unwrap();

        consumer.request(&mut sim, "Q").unwrap();
        sim.run().unwrap();
        assert_eq!(consumer.arrival_ids(), vec![lid_id]);
        assert_eq!(sim.storage().queue_len("Q").unwrap(), 1);
    }

    #[test]
    fn test_no_matching_type_leaves_consumer_pending() {
        let mut sim = sim_with_queue("Q", ReleaseStrategy::custom(by_entity_type));
        let mut params = ReleaseParams::new();
        params.insert(ENTITY_TYPE_PARAM.to_string(), AttributeValue::from("lid"));
        let consumer = register(&mut sim, Probe::consumer_with("C", "Q", params));

        let jar = sim.create_entity("jar");
        sim.store("Q", jar, &origin()).unwrap();

        assert!(consumer.request(&mut sim, "Q").unwrap().is_pending());
        assert_eq!(sim.storage().waiting_len("Q").unwrap(), 1);

        let lid = sim.create_entity("lid");
        let lid_id = lid.id();
        sim.store("Q", lid, &origin()).unwrap();
        sim.run().unwrap();
        assert_eq!(consumer.arrival_ids(), vec![lid_id]);
    }

    #[test]
    fn test_release_by_priority() {
        let mut sim = sim_with_queue("Q", ReleaseStrategy::custom(by_priority_attribute));
        let consumer = register(&mut sim, Probe::consumer("C", "Q"));

        let mut ids = Vec::new();
        for priority in [1, 5, 5, 2] {
            let entity = sim.create_entity("order").with_attribute("priority", priority);
            ids.push(entity.id());
            sim.store("Q", entity, &origin()).unwrap();
        }
        let plain = sim.create_entity("order");
        let plain_id = plain.id();
        sim.store("Q", plain, &origin()).unwrap();

        for _ in 0..5 {
            consumer.request(&mut sim, "Q").unwrap();
        }
        sim.run().unwrap();

        assert_eq!(
            consumer.arrival_ids(),
            vec![ids[1], ids[2], ids[3], ids[0], plain_id]
        );
    }

    #[test]
    fn test_out_of_range_selection_rejected_before_mutation() {
        let mut sim = sim_with_queue("Q", ReleaseStrategy::custom(|entries, _| Some(entries.len() + 3)));
        let consumer = register(&mut sim, Probe::consumer("C", "Q"));
        let entity = sim.create_entity("part");
        sim.store("Q", entity, &origin()).unwrap();

        let result = consumer.request(&mut sim, "Q");
        assert!(result.is_err());
        assert_eq!(sim.storage().queue_len("Q").unwrap(), 1);
        assert_eq!(sim.storage().waiting_len("Q").unwrap(), 0);
        assert_eq!(sim.storage().stats("Q").unwrap().total_released, 0);
    }

    #[test]
    fn test_queue_stats() {
        let mut sim = sim_with_queue("Q", ReleaseStrategy::Fifo);
        let consumer = register(&mut sim, Probe::consumer("C", "Q"));

        for _ in 0..2 {
            let entity = sim.create_entity("part");
            sim.store("Q", entity, &origin()).unwrap();
        }
        sim.run_until(6).unwrap();
        consumer.request(&mut sim, "Q").unwrap();

        let stats = sim.storage().stats("Q").unwrap();
        assert_eq!(stats.total_enqueued, 2);
        assert_eq!(stats.total_released, 1);
        assert_eq!(stats.length, 1);
        assert_eq!(stats.max_length, 2);
        assert_eq!(stats.wait_times, vec![6]);
        assert_eq!(stats.avg_wait_time, Some(6.0));
        assert_eq!(stats.length_samples, vec![(0, 1), (0, 2), (6, 1)]);
        assert!((stats.time_weighted_length(12) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_reset_round_trip() {
        let mut sim = sim_with_queue("Q", ReleaseStrategy::Lifo);
        let consumer = register(&mut sim, Probe::consumer("C", "Q"));
        consumer.request(&mut sim, "Q").unwrap();

        let mut storage = StorageCoordinator::new();
        storage.add_queue("Q", ReleaseStrategy::Fifo).unwrap();
        sim.storage_mut().reset();
        assert!(!sim.storage().is_bound());
        assert!(!sim.storage().has_queue("Q"));

        sim.storage_mut().add_queue("Q", ReleaseStrategy::Fifo).unwrap();
        assert_eq!(sim.storage().is_empty("Q"), storage.is_empty("Q"));
        assert_eq!(sim.storage().waiting_len("Q"), storage.waiting_len("Q"));
        assert_eq!(sim.storage().stats("Q"), storage.stats("Q"));
        assert_eq!(sim.storage().queue_names(), vec!["Q".to_string()]);
    }

    #[test]
    fn test_woken_node_without_resume_hook_leaves_entry() {
        let mut sim = sim_with_queue("Q", ReleaseStrategy::Fifo);
        let sink = Rc::new(Sink::new("exit", 0.0));
        sim.add_node(sink.clone()).unwrap();

        let pending = sim.storage_mut().try_release("Q", sink.id(), &ReleaseParams::new()).unwrap();
        assert!(pending.is_pending());

        let entity = sim.create_entity("part");
        sim.store("Q", entity, &origin()).unwrap();
        sim.run().unwrap();

        assert_eq!(sim.storage().queue_len("Q"), Ok(1));
        assert_eq!(sim.storage().waiting_len("Q"), Ok(0));
        assert_eq!(sink.received(), 0);
    }
}
