// Beat clock - monotonic tick counter, pending triggers and dispatch
// Pumped by the external periodic timer: dispatch everything due at the
// current tick, then advance the counter by one

use crate::clock::handle::ScheduleHandle;
use crate::clock::meter::{Measures, Meter, Tick, measures_to_ticks};
use crate::clock::tempo::Tempo;
use crate::timer::{StepTimer, Timer};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

/// Identifier of a pending trigger, usable for cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TriggerId(u64);

/// A clock action, shared between the clock and the handle that installed it
pub(crate) type Action = Rc<RefCell<dyn FnMut()>>;

/// One pending tick-threshold binding
struct Trigger {
    id: TriggerId,
    /// Absolute tick at which the action fires next
    due: Tick,
    /// Repeat interval in ticks; 0 = one-shot
    every: Tick,
    action: Action,
}

struct ClockState {
    ticks: Cell<Tick>,
    tempo: RefCell<Tempo>,
    meters: RefCell<Vec<Meter>>,
    /// Registration-ordered; same-tick triggers fire in this order
    triggers: RefCell<Vec<Trigger>>,
    next_id: Cell<u64>,
    running: Cell<bool>,
    timer: RefCell<Box<dyn Timer>>,
    tempo_observers: RefCell<Vec<Box<dyn FnMut()>>>,
}

/// The tick-granular scheduler
///
/// The clock owns a monotonically increasing tick counter, the active
/// [`Tempo`], an ordered meter list (the first meter is the default), and
/// the set of pending triggers installed by [`ScheduleHandle`]s. It is
/// single-threaded and externally pumped: the periodic timer calls
/// [`Clock::run_until_current`] followed by [`Clock::tick`] once per tick.
///
/// `Clock` is a cheap handle over shared state; clones refer to the same
/// clock. Closures installed as triggers should capture a [`WeakClock`]
/// (via [`Clock::downgrade`]) rather than a clone, so the pending-trigger
/// set never keeps its own clock alive.
#[derive(Clone)]
pub struct Clock {
    state: Rc<ClockState>,
}

impl Clock {
    /// Creates a clock with a 4/4 default meter and a [`StepTimer`]
    pub fn new(tempo: Tempo) -> Self {
        Self::with_meters(tempo, vec![Meter::standard()])
    }

    /// Creates a clock with an explicit meter list (first = default)
    pub fn with_meters(tempo: Tempo, meters: Vec<Meter>) -> Self {
        Self::with_timer(tempo, meters, Box::new(StepTimer::new()))
    }

    /// Creates a clock over a caller-supplied periodic timer
    pub fn with_timer(tempo: Tempo, mut meters: Vec<Meter>, timer: Box<dyn Timer>) -> Self {
        if meters.is_empty() {
            meters.push(Meter::standard());
        }

        Self {
            state: Rc::new(ClockState {
                ticks: Cell::new(0),
                tempo: RefCell::new(tempo),
                meters: RefCell::new(meters),
                triggers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                running: Cell::new(false),
                timer: RefCell::new(timer),
                tempo_observers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Current tick
    pub fn ticks(&self) -> Tick {
        self.state.ticks.get()
    }

    /// Current tempo
    pub fn tempo(&self) -> Tempo {
        *self.state.tempo.borrow()
    }

    /// The clock's default meter (first of the meter list)
    pub fn default_meter(&self) -> Meter {
        self.state.meters.borrow()[0]
    }

    /// All configured meters, default first
    pub fn meters(&self) -> Vec<Meter> {
        self.state.meters.borrow().clone()
    }

    /// Whether the external timer is armed
    pub fn is_running(&self) -> bool {
        self.state.running.get()
    }

    /// Wall-clock interval between ticks at the current tempo
    pub fn tick_interval(&self) -> Duration {
        self.tempo().tick_interval()
    }

    /// Converts a duration against the clock's default meter and tempo
    pub fn measures_to_ticks(&self, duration: impl Into<Measures>) -> Tick {
        measures_to_ticks(duration, &self.default_meter(), &self.tempo())
    }

    /// A non-owning handle for use inside trigger closures
    pub fn downgrade(&self) -> WeakClock {
        WeakClock {
            state: Rc::downgrade(&self.state),
        }
    }

    /// Advances the tick counter by one
    ///
    /// Called by the external timer after [`Clock::run_until_current`]. The
    /// counter only ever moves forward.
    pub fn tick(&self) {
        self.state.ticks.set(self.state.ticks.get() + 1);
    }

    /// Dispatches every pending trigger due at or before the current tick
    ///
    /// Triggers fire in registration order (stable FIFO among triggers due
    /// at the same tick). Each trigger is removed (one-shot) or rescheduled
    /// (`due += every`) *before* its action runs, so cancelling a trigger
    /// that has already been dispatched this tick has no retroactive
    /// effect, and a repeat can never fire twice for one threshold.
    /// Triggers installed by an action for the current tick are picked up
    /// in the same pass.
    pub fn run_until_current(&self) {
        let now = self.state.ticks.get();

        loop {
            let due = {
                let mut triggers = self.state.triggers.borrow_mut();
                match triggers.iter().position(|t| t.due <= now) {
                    Some(index) => {
                        let action = Rc::clone(&triggers[index].action);
                        let id = triggers[index].id;
                        if triggers[index].every > 0 {
                            triggers[index].due += triggers[index].every;
                        } else {
                            triggers.remove(index);
                        }
                        Some((id, action))
                    }
                    None => None,
                }
            };

            match due {
                Some((id, action)) => {
                    log::trace!("tick {now}: firing trigger {id:?}");
                    (&mut *action.borrow_mut())();
                }
                None => break,
            }
        }
    }

    /// Pumps the clock `count` times, then settles the tick it arrived at
    ///
    /// Equivalent to `count` timer callbacks plus one final dispatch, so
    /// after `run_ticks(96)` everything due at tick 96 has fired. Useful
    /// for tests and offline rendering.
    pub fn run_ticks(&self, count: Tick) {
        for _ in 0..count {
            self.run_until_current();
            self.tick();
        }
        self.run_until_current();
    }

    /// Registers an action and returns its chainable schedule handle
    ///
    /// The handle captures the current tick as its registration point `t0`;
    /// all of its offsets resolve against that tick.
    pub fn schedule(&self, action: impl FnMut() + 'static) -> ScheduleHandle {
        ScheduleHandle::new(self.clone(), action)
    }

    /// Installs a one-shot action `delay` ticks from now
    pub fn call_later(&self, delay: Tick, action: impl FnMut() + 'static) -> TriggerId {
        let action: Action = Rc::new(RefCell::new(action));
        self.install(self.ticks() + delay, 0, action)
    }

    /// Installs a trigger at an absolute tick; `every == 0` means one-shot
    pub(crate) fn install(&self, due: Tick, every: Tick, action: Action) -> TriggerId {
        let id = TriggerId(self.state.next_id.get());
        self.state.next_id.set(id.0 + 1);
        self.state.triggers.borrow_mut().push(Trigger {
            id,
            due,
            every,
            action,
        });
        log::trace!("installed trigger {id:?} due {due} every {every}");
        id
    }

    /// Removes a pending trigger; returns whether it was still pending
    pub fn cancel(&self, id: TriggerId) -> bool {
        let mut triggers = self.state.triggers.borrow_mut();
        match triggers.iter().position(|t| t.id == id) {
            Some(index) => {
                triggers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of pending triggers
    pub fn pending(&self) -> usize {
        self.state.triggers.borrow().len()
    }

    /// Replaces the tempo, preserving the tick position
    ///
    /// On a running clock every tempo observer is notified exactly once and
    /// the timer is re-armed at the new interval; only wall-clock pacing
    /// changes, never `ticks`. On a stopped clock the tempo is swapped
    /// silently.
    pub fn set_tempo(&self, tempo: Tempo) {
        *self.state.tempo.borrow_mut() = tempo;

        if !self.state.running.get() {
            return;
        }

        log::debug!("tempo changed to {tempo} while ticking; re-arming timer");

        // Invoke observers outside the cell so one may subscribe another.
        let mut observers = self.state.tempo_observers.take();
        for observer in observers.iter_mut() {
            observer();
        }
        let mut slot = self.state.tempo_observers.borrow_mut();
        let added = std::mem::take(&mut *slot);
        *slot = observers;
        slot.extend(added);
        drop(slot);

        self.state.timer.borrow_mut().start(tempo.tick_interval());
    }

    /// Subscribes an observer invoked on every `set_tempo` while ticking
    pub fn on_tempo_change(&self, observer: impl FnMut() + 'static) {
        self.state
            .tempo_observers
            .borrow_mut()
            .push(Box::new(observer));
    }

    /// Arms the periodic timer at the current tempo's tick interval
    pub fn start_ticking(&self) {
        self.state.running.set(true);
        let interval = self.tick_interval();
        log::debug!("start ticking at {:?} per tick", interval);
        self.state.timer.borrow_mut().start(interval);
    }

    /// Disarms the periodic timer; the tick counter is left untouched
    pub fn stop_ticking(&self) {
        self.state.running.set(false);
        self.state.timer.borrow_mut().stop();
    }

    /// Shifts the tick phase by `pause` without touching ticks or tempo
    ///
    /// Stops the timer and schedules a restart after `pause` at the current
    /// tempo's interval. From a stopped clock this still arms the deferred
    /// restart, so the clock reports running afterwards.
    pub fn nudge(&self, pause: Duration) {
        let interval = self.tick_interval();
        let mut timer = self.state.timer.borrow_mut();
        timer.stop();
        timer.start_after(pause, interval);
        drop(timer);
        self.state.running.set(true);
        log::debug!("nudged by {:?}", pause);
    }
}

/// Non-owning reference to a [`Clock`]
///
/// Trigger closures hold this instead of a `Clock` clone so the pending
/// trigger set never forms an ownership cycle with the clock itself.
#[derive(Clone)]
pub struct WeakClock {
    state: Weak<ClockState>,
}

impl WeakClock {
    /// Upgrades back to a usable clock, if it is still alive
    pub fn upgrade(&self) -> Option<Clock> {
        self.state.upgrade().map(|state| Clock { state })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn collecting(clock: WeakClock, log: Rc<RefCell<Vec<Tick>>>) -> impl FnMut() {
        move || {
            if let Some(clock) = clock.upgrade() {
                log.borrow_mut().push(clock.ticks());
            }
        }
    }

    #[test]
    fn test_default_meter_is_standard() {
        let clock = Clock::new(Tempo::default());
        assert_eq!(clock.meters().len(), 1);
        assert_eq!(clock.default_meter(), Meter::standard());
    }

    #[test]
    fn test_tick_advances_monotonically() {
        let clock = Clock::new(Tempo::default());
        assert_eq!(clock.ticks(), 0);
        clock.tick();
        clock.tick();
        assert_eq!(clock.ticks(), 2);
    }

    #[test]
    fn test_call_later_fires_once() {
        let clock = Clock::new(Tempo::default());
        let fired = Rc::new(RefCell::new(Vec::new()));
        clock.call_later(10, collecting(clock.downgrade(), Rc::clone(&fired)));

        clock.run_ticks(30);
        assert_eq!(*fired.borrow(), vec![10]);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn test_cancel_before_due() {
        let clock = Clock::new(Tempo::default());
        let fired = Rc::new(RefCell::new(Vec::new()));
        let id = clock.call_later(10, collecting(clock.downgrade(), Rc::clone(&fired)));

        clock.run_ticks(5);
        assert!(clock.cancel(id));
        clock.run_ticks(20);
        assert!(fired.borrow().is_empty());
        assert!(!clock.cancel(id));
    }

    #[test]
    fn test_same_tick_triggers_fire_in_registration_order() {
        let clock = Clock::new(Tempo::default());
        let order = Rc::new(RefCell::new(Vec::new()));
        for name in ["a", "b", "c"] {
            let order = Rc::clone(&order);
            clock.call_later(5, move || order.borrow_mut().push(name));
        }

        clock.run_ticks(5);
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_action_can_cancel_another_pending_trigger() {
        // a dispatched action may cancel a trigger that has not fired yet
        let clock = Clock::new(Tempo::default());
        let fired = Rc::new(RefCell::new(Vec::new()));
        let victim = clock.call_later(5, collecting(clock.downgrade(), Rc::clone(&fired)));
        let weak = clock.downgrade();
        // registered after `victim` was installed, but due one tick earlier
        clock.call_later(4, move || {
            if let Some(clock) = weak.upgrade() {
                clock.cancel(victim);
            }
        });

        clock.run_ticks(10);
        assert!(fired.borrow().is_empty());
    }

    #[test]
    fn test_same_tick_cancel_suppresses_the_later_registration() {
        // both triggers share tick 5; the earlier-registered one cancels the
        // other before the dispatch loop reaches it
        let clock = Clock::new(Tempo::default());
        let fired = Rc::new(RefCell::new(Vec::new()));
        let victim_slot = Rc::new(Cell::new(None::<TriggerId>));

        let slot = Rc::clone(&victim_slot);
        let weak = clock.downgrade();
        clock.call_later(5, move || {
            if let (Some(id), Some(clock)) = (slot.get(), weak.upgrade()) {
                clock.cancel(id);
            }
        });
        let victim = clock.call_later(5, collecting(clock.downgrade(), Rc::clone(&fired)));
        victim_slot.set(Some(victim));

        clock.run_ticks(10);
        assert!(fired.borrow().is_empty());
    }

    #[test]
    fn test_trigger_installed_during_dispatch_for_current_tick() {
        let clock = Clock::new(Tempo::default());
        let fired = Rc::new(RefCell::new(Vec::new()));
        let weak = clock.downgrade();
        let inner_log = Rc::clone(&fired);
        clock.call_later(3, move || {
            if let Some(clock) = weak.upgrade() {
                let log = Rc::clone(&inner_log);
                let inner = clock.downgrade();
                clock.call_later(0, move || {
                    if let Some(clock) = inner.upgrade() {
                        log.borrow_mut().push(clock.ticks());
                    }
                });
            }
        });

        clock.run_ticks(3);
        // the nested trigger was due at the same tick and fired in the same pass
        assert_eq!(*fired.borrow(), vec![3]);
    }

    #[test]
    fn test_set_tempo_notifies_only_while_ticking() {
        let clock = Clock::new(Tempo::new(135.0));
        let notified = Rc::new(Cell::new(0u32));
        let seen = Rc::clone(&notified);
        clock.on_tempo_change(move || seen.set(seen.get() + 1));

        clock.set_tempo(Tempo::new(60.0));
        assert_eq!(notified.get(), 0);

        clock.start_ticking();
        clock.set_tempo(Tempo::new(120.0));
        assert_eq!(notified.get(), 1);
        clock.set_tempo(Tempo::new(90.0));
        assert_eq!(notified.get(), 2);

        clock.stop_ticking();
        clock.set_tempo(Tempo::new(100.0));
        assert_eq!(notified.get(), 2);
    }

    #[test]
    fn test_set_tempo_preserves_ticks() {
        let clock = Clock::new(Tempo::new(135.0));
        clock.run_ticks(42);
        clock.start_ticking();
        clock.set_tempo(Tempo::new(60.0));
        assert_eq!(clock.ticks(), 42);
    }

    #[test]
    fn test_repeat_catches_up_when_behind() {
        // a repeat whose threshold fell behind fires once per missed interval
        let clock = Clock::new(Tempo::default());
        let fired = Rc::new(RefCell::new(Vec::new()));
        let action: Action = Rc::new(RefCell::new(collecting(clock.downgrade(), Rc::clone(&fired))));
        clock.install(0, 10, action);

        for _ in 0..5 {
            clock.tick();
        }
        clock.run_until_current();
        // only the threshold at 0 had elapsed; next is 10
        assert_eq!(*fired.borrow(), vec![5]);

        for _ in 0..20 {
            clock.tick();
        }
        clock.run_until_current();
        // thresholds 10 and 20 had both elapsed by tick 25
        assert_eq!(*fired.borrow(), vec![5, 25, 25]);
    }
}
