use crate::core::errors::{EventError, SimError};
use crate::core::event_scheduler::Scheduler;
use crate::core::simulation_engine::Simulation;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// How a one-shot event was fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Continuation run when an event is processed.
pub type Callback = Box<dyn FnOnce(&mut Simulation, Outcome) -> Result<(), SimError>>;

#[derive(Default)]
struct EventInner {
    outcome: Option<Outcome>,
    processed: bool,
    callbacks: Vec<Callback>,
}

/// One-shot completion event.
///
/// An event starts pending and collects callbacks. `succeed` or `fail`
/// triggers it exactly once; the scheduler then processes it at the current
/// instant, running the callbacks in registration order. Callbacks may still
/// be added between triggering and processing. Firing twice, or registering
/// on a processed event, returns [`EventError::AlreadyFired`].
///
/// Handles are cheap clones sharing the same state.
#[derive(Clone, Default)]
pub struct Event {
    inner: Rc<RefCell<EventInner>>,
}

/// A payload-free rendezvous: a flow yields on it and continues once the
/// coordinator fires it.
pub type Gate = Event;

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a continuation
    pub fn on_fire<F>(&self, callback: F) -> Result<(), EventError>
    where
        F: FnOnce(&mut Simulation, Outcome) -> Result<(), SimError> + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        if inner.processed {
            return Err(EventError::AlreadyFired);
        }
        inner.callbacks.push(Box::new(callback));
        Ok(())
    }

    /// Fire the event successfully
    pub fn succeed(&self, env: &dyn Scheduler) -> Result<(), EventError> {
        self.trigger(env, Outcome::Success)
    }

    /// Fire the event as failed
    pub fn fail(&self, env: &dyn Scheduler) -> Result<(), EventError> {
        self.trigger(env, Outcome::Failure)
    }

    fn trigger(&self, env: &dyn Scheduler, outcome: Outcome) -> Result<(), EventError> {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.outcome.is_some() {
                return Err(EventError::AlreadyFired);
            }
            inner.outcome = Some(outcome);
        }

        let event = self.clone();
        env.process(Box::new(move |sim: &mut Simulation| event.dispatch(sim, outcome)));
        Ok(())
    }

    fn dispatch(&self, sim: &mut Simulation, outcome: Outcome) -> Result<(), SimError> {
        let callbacks = {
            let mut inner = self.inner.borrow_mut();
            inner.processed = true;
            std::mem::take(&mut inner.callbacks)
        };

        for callback in callbacks {
            callback(sim, outcome)?;
        }
        Ok(())
    }

    /// The outcome, once triggered
    pub fn outcome(&self) -> Option<Outcome> {
        self.inner.borrow().outcome
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.borrow().outcome.is_some()
    }

    pub fn is_processed(&self) -> bool {
        self.inner.borrow().processed
    }

    pub fn is_ok(&self) -> bool {
        self.outcome() == Some(Outcome::Success)
    }

    /// Number of callbacks still waiting to run
    pub fn pending_callbacks(&self) -> usize {
        self.inner.borrow().callbacks.len()
    }

    /// Whether both handles refer to the same event
    pub fn same_as(&self, other: &Event) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Event")
            .field("outcome", &inner.outcome)
            .field("processed", &inner.processed)
            .field("callbacks", &inner.callbacks.len())
            .finish()
    }
}
