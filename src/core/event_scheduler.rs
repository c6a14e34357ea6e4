use super::errors::SimError;
use super::events::Event;
use super::simulation_engine::Simulation;
use super::types::SimTime;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::rc::Rc;

/// A unit of work the scheduler runs at a simulated instant.
pub type Action = Box<dyn FnOnce(&mut Simulation) -> Result<(), SimError>>;

pub struct ScheduledAction {
    pub time: SimTime,
    pub sequence_num: u64,
    pub action: Action,
}

impl fmt::Debug for ScheduledAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledAction")
            .field("time", &self.time)
            .field("sequence_num", &self.sequence_num)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ScheduledAction {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.sequence_num == other.sequence_num
    }
}

impl Eq for ScheduledAction {}

impl PartialOrd for ScheduledAction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledAction {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (BinaryHeap is max-heap by default)
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.sequence_num.cmp(&self.sequence_num))
    }
}

/// Time-ordered action queue. Actions at the same instant run in the order
/// they were scheduled.
#[derive(Debug, Default)]
pub struct EventScheduler {
    event_queue: BinaryHeap<ScheduledAction>,
    sequence_counter: u64,
    now: SimTime,
}

impl EventScheduler {
    /// Create a new EventScheduler at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Schedule an action to execute after the specified delay
    pub fn schedule_action(&mut self, action: Action, delay: SimTime) {
        let scheduled = ScheduledAction {
            time: self.now.saturating_add(delay),
            sequence_num: self.sequence_counter,
            action,
        };

        self.event_queue.push(scheduled);
        self.sequence_counter += 1;
    }

    /// Pop the next action, advancing the clock to its time
    pub fn pop_next(&mut self) -> Option<(SimTime, Action)> {
        let scheduled = self.event_queue.pop()?;
        self.now = scheduled.time;
        Some((scheduled.time, scheduled.action))
    }

    /// Check if there are any actions remaining in the queue
    pub fn has_events(&self) -> bool {
        !self.event_queue.is_empty()
    }

    /// Number of pending actions
    pub fn pending(&self) -> usize {
        self.event_queue.len()
    }

    /// Get the time of the next action without removing it
    pub fn peek_next_time(&self) -> Option<SimTime> {
        self.event_queue.peek().map(|scheduled| scheduled.time)
    }

    /// Move the clock forward to `time` without running anything
    pub fn advance_to(&mut self, time: SimTime) {
        if time > self.now {
            self.now = time;
        }
    }

    /// Drop every pending action and rewind the clock
    pub fn clear(&mut self) {
        self.event_queue.clear();
        self.sequence_counter = 0;
        self.now = 0;
    }
}

/// The operations the kernel needs from a scheduler.
pub trait Scheduler {
    fn now(&self) -> SimTime;

    /// Run `action` after `delay` ticks.
    fn schedule(&self, delay: SimTime, action: Action);

    /// Start a task at the current instant.
    fn process(&self, task: Action) {
        self.schedule(0, task);
    }
}

/// Shared handle to a run's [`EventScheduler`]. Coordinators bind to a clone
/// of it.
#[derive(Clone, Default)]
pub struct SchedulerHandle {
    inner: Rc<RefCell<EventScheduler>>,
}

impl SchedulerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// An event that succeeds after `delay` ticks.
    pub fn timeout(&self, delay: SimTime) -> Event {
        let event = Event::new();
        let pending = event.clone();
        self.schedule(
            delay,
            Box::new(move |sim: &mut Simulation| {
                let env = sim.env().clone();
                pending.succeed(&env)?;
                Ok(())
            }),
        );
        event
    }

    pub fn has_events(&self) -> bool {
        self.inner.borrow().has_events()
    }

    pub fn pending(&self) -> usize {
        self.inner.borrow().pending()
    }

    pub fn peek_next_time(&self) -> Option<SimTime> {
        self.inner.borrow().peek_next_time()
    }

    pub(crate) fn pop_next(&self) -> Option<(SimTime, Action)> {
        self.inner.borrow_mut().pop_next()
    }

    pub(crate) fn advance_to(&self, time: SimTime) {
        self.inner.borrow_mut().advance_to(time);
    }

    pub(crate) fn clear(&self) {
        self.inner.borrow_mut().clear();
    }

    /// Whether two handles drive the same scheduler
    pub fn same_scheduler(&self, other: &SchedulerHandle) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Scheduler for SchedulerHandle {
    fn now(&self) -> SimTime {
        self.inner.borrow().now()
    }

    fn schedule(&self, delay: SimTime, action: Action) {
        self.inner.borrow_mut().schedule_action(action, delay);
    }
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheduler = self.inner.borrow();
        f.debug_struct("SchedulerHandle")
            .field("now", &scheduler.now())
            .field("pending", &scheduler.pending())
            .finish()
    }
}
