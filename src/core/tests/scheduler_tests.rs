// Tests for EventScheduler and the Simulation run loop
#[cfg(test)]
mod tests {
    use crate::core::errors::SimError;
    use crate::core::event_scheduler::{EventScheduler, Scheduler};
    use crate::core::execution::SimulationConfig;
    use crate::core::simulation_engine::{Simulation, SimulationObserver};
    use crate::core::types::SimTime;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder() -> Rc<RefCell<Vec<(u32, SimTime)>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn test_same_instant_runs_in_insertion_order() {
        let mut sim = Simulation::default();
        let log = recorder();

        for tag in 1..=3 {
            let log = log.clone();
            sim.schedule(5, move |sim| {
                log.borrow_mut().push((tag, sim.now()));
                Ok(())
            });
        }

        sim.run().unwrap();
        assert_eq!(*log.borrow(), vec![(1, 5), (2, 5), (3, 5)]);
        assert_eq!(sim.now(), 5);
    }

    #[test]
    fn test_earlier_time_runs_first() {
        let mut sim = Simulation::default();
        let log = recorder();

        for (tag, delay) in [(1, 9), (2, 3), (3, 6)] {
            let log = log.clone();
            sim.schedule(delay, move |sim| {
                log.borrow_mut().push((tag, sim.now()));
                Ok(())
            });
        }

        sim.run().unwrap();
        assert_eq!(*log.borrow(), vec![(2, 3), (3, 6), (1, 9)]);
    }

    #[test]
    fn test_bare_scheduler_pop_order() {
        let mut scheduler = EventScheduler::new();
        scheduler.schedule_action(Box::new(|_| Ok(())), 4);
        scheduler.schedule_action(Box::new(|_| Ok(())), 2);

        assert_eq!(scheduler.pending(), 2);
        assert_eq!(scheduler.peek_next_time(), Some(2));

        let (time, _) = scheduler.pop_next().unwrap();
        assert_eq!(time, 2);
        assert_eq!(scheduler.now(), 2);

        let (time, _) = scheduler.pop_next().unwrap();
        assert_eq!(time, 4);
        assert!(!scheduler.has_events());
        assert!(scheduler.pop_next().is_none());
    }

    #[test]
    fn test_step_includes_zero_delay_followups() {
        let mut sim = Simulation::default();
        let log = recorder();

        let outer = log.clone();
        sim.schedule(3, move |sim| {
            outer.borrow_mut().push((1, sim.now()));
            let inner = outer.clone();
            sim.schedule(0, move |sim| {
                inner.borrow_mut().push((2, sim.now()));
                Ok(())
            });
            Ok(())
        });

        assert!(sim.step().unwrap());
        assert_eq!(*log.borrow(), vec![(1, 3), (2, 3)]);
        assert!(!sim.has_pending_events());
        assert!(!sim.step().unwrap());
    }

    #[test]
    fn test_timeout_fires_after_delay() {
        let mut sim = Simulation::default();
        let fired_at = Rc::new(RefCell::new(None));

        let timeout = sim.env().timeout(10);
        let slot = fired_at.clone();
        timeout
            .on_fire(move |sim, _| {
                *slot.borrow_mut() = Some(sim.now());
                Ok(())
            })
            .unwrap();

        sim.run().unwrap();
        assert_eq!(*fired_at.borrow(), Some(10));
        assert!(timeout.is_processed());
        assert!(timeout.is_ok());
    }

    #[test]
    fn test_time_limit_stops_run() {
        let mut sim = Simulation::new(SimulationConfig::new().with_time_limit(5));
        let log = recorder();

        for (tag, delay) in [(1, 3), (2, 8)] {
            let log = log.clone();
            sim.schedule(delay, move |sim| {
                log.borrow_mut().push((tag, sim.now()));
                Ok(())
            });
        }

        let end = sim.run().unwrap();
        assert_eq!(end, 5);
        assert_eq!(*log.borrow(), vec![(1, 3)]);
        assert!(sim.has_pending_events());
    }

    #[test]
    fn test_run_until_advances_clock() {
        let mut sim = Simulation::default();
        let log = recorder();

        for (tag, delay) in [(1, 2), (2, 20)] {
            let log = log.clone();
            sim.schedule(delay, move |sim| {
                log.borrow_mut().push((tag, sim.now()));
                Ok(())
            });
        }

        assert_eq!(sim.run_until(10).unwrap(), 10);
        assert_eq!(log.borrow().len(), 1);

        sim.run().unwrap();
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(sim.now(), 20);
    }

    #[test]
    fn test_action_error_aborts_run() {
        let mut sim = Simulation::default();
        let log = recorder();

        sim.schedule(1, |_| Err(SimError::PayloadTaken));
        let after = log.clone();
        sim.schedule(2, move |sim| {
            after.borrow_mut().push((1, sim.now()));
            Ok(())
        });

        assert_eq!(sim.run(), Err(SimError::PayloadTaken));
        assert!(log.borrow().is_empty());
    }

    struct CountingObserver {
        advances: Rc<RefCell<Vec<(SimTime, SimTime)>>>,
        steps: Rc<RefCell<Vec<(SimTime, usize)>>>,
    }

    impl SimulationObserver for CountingObserver {
        fn on_time_advance(&mut self, old_time: SimTime, new_time: SimTime) {
            self.advances.borrow_mut().push((old_time, new_time));
        }

        fn on_step_complete(&mut self, time: SimTime, actions_processed: usize) {
            self.steps.borrow_mut().push((time, actions_processed));
        }
    }

    #[test]
    fn test_observers_see_steps() {
        let mut sim = Simulation::default();
        let advances = Rc::new(RefCell::new(Vec::new()));
        let steps = Rc::new(RefCell::new(Vec::new()));
        sim.add_observer(Box::new(CountingObserver {
            advances: advances.clone(),
            steps: steps.clone(),
        }));

        sim.schedule(0, |_| Ok(()));
        sim.schedule(4, |_| Ok(()));
        sim.schedule(4, |_| Ok(()));
        sim.run().unwrap();

        assert_eq!(*advances.borrow(), vec![(0, 4)]);
        assert_eq!(*steps.borrow(), vec![(0, 1), (4, 2)]);
    }

    #[test]
    fn test_reset_clears_pending_work() {
        let mut sim = Simulation::default();
        let first_run = sim.run_id();
        sim.schedule(7, |_| Ok(()));
        sim.run_until(3).unwrap();

        sim.reset();
        assert_ne!(sim.run_id(), first_run);
        assert_eq!(sim.now(), 0);
        assert!(!sim.has_pending_events());
        assert!(sim.storage().is_bound());
        assert!(sim.vehicles().is_bound());
    }

    #[test]
    fn test_samples_repeat_after_reset() {
        let dist = rand_distr::Uniform::new(0.0, 100.0);
        let mut sim = Simulation::new(SimulationConfig::new().with_seed(11));
        let first: Vec<SimTime> = (0..5).map(|_| sim.sample(&dist)).collect();

        sim.reset();
        let second: Vec<SimTime> = (0..5).map(|_| sim.sample(&dist)).collect();
        assert_eq!(first, second);

        let negative = rand_distr::Uniform::new(-10.0, -1.0);
        assert_eq!(sim.sample(&negative), 0);
    }
}
