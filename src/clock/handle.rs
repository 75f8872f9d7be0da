// Schedule handle - chainable controller for one registered action
// All tick thresholds are computed eagerly against the registration tick

use crate::clock::meter::{Measures, Meter, Tick, measures_to_ticks};
use crate::clock::scheduler::{Action, Clock, TriggerId};
use std::cell::RefCell;
use std::rc::Rc;

type Child = Rc<RefCell<dyn FnMut()>>;

struct HandleState {
    /// Clock tick at the moment the action was registered
    t0: Tick,
    /// Meter bound via `bind_meter`; falls back to the clock default
    meter: Option<Meter>,
    /// Repeat interval of the installed trigger, kept for resume
    interval: Tick,
    repeat: Option<TriggerId>,
    stop: Option<TriggerId>,
    /// Primary action composed with the children, shared with the clock
    action: Action,
    children: Rc<RefCell<Vec<Child>>>,
}

/// Chainable controller returned by [`Clock::schedule`]
///
/// Configuration methods consume and return the handle so registrations
/// read as one chain:
///
/// ```ignore
/// let playing = clock
///     .schedule(move || kick.next_value())
///     .bind_meter(Meter::new(3, 4))
///     .start_later(1.0, 0.25)
///     .stop_later(9.0);
/// ```
///
/// Thresholds are resolved at call time from the tick captured at
/// registration (`t0`), never deferred. The handle is a cheap clone over
/// shared state, which is how a pending stop trigger reaches back to cancel
/// the repeat trigger it belongs to.
#[derive(Clone)]
pub struct ScheduleHandle {
    clock: Clock,
    state: Rc<RefCell<HandleState>>,
}

impl ScheduleHandle {
    pub(crate) fn new(clock: Clock, action: impl FnMut() + 'static) -> Self {
        let children: Rc<RefCell<Vec<Child>>> = Rc::new(RefCell::new(Vec::new()));
        let primary: Rc<RefCell<dyn FnMut()>> = Rc::new(RefCell::new(action));

        let kids = Rc::clone(&children);
        let composed: Action = Rc::new(RefCell::new(move || {
            (&mut *primary.borrow_mut())();
            // count is snapshotted so a child adding children stays sane
            let count = kids.borrow().len();
            for index in 0..count {
                let child = Rc::clone(&kids.borrow()[index]);
                (&mut *child.borrow_mut())();
            }
        }));

        Self {
            state: Rc::new(RefCell::new(HandleState {
                t0: clock.ticks(),
                meter: None,
                interval: 0,
                repeat: None,
                stop: None,
                action: composed,
                children,
            })),
            clock,
        }
    }

    /// Sets the meter context for subsequent `start_later`/`stop_later`
    ///
    /// Must precede them in the chain to take effect.
    pub fn bind_meter(self, meter: Meter) -> Self {
        self.state.borrow_mut().meter = Some(meter);
        self
    }

    /// Arms the action to fire `start` after registration, repeating `every`
    ///
    /// Both offsets are converted with the handle's meter (bound meter, or
    /// the clock default). An `every` of zero makes the start a one-shot.
    pub fn start_later(self, start: impl Into<Measures>, every: impl Into<Measures>) -> Self {
        let meter = self.resolve_meter();
        self.install_start(start.into(), every.into(), meter);
        self
    }

    /// `start_later` with an explicit meter, overriding any bound meter
    pub fn start_later_with(
        self,
        start: impl Into<Measures>,
        every: impl Into<Measures>,
        meter: Meter,
    ) -> Self {
        self.install_start(start.into(), every.into(), meter);
        self
    }

    /// Arms a one-shot cancellation of the repeat, one tick early
    ///
    /// The threshold is `t0 + measures_to_ticks(stop) - 1`: stops derived
    /// from measure-granular offsets land one tick before their nominal
    /// boundary, so a stop always takes effect strictly before anything
    /// starting at that same boundary. Against an *unrelated* trigger that
    /// happens to be due at the adjusted tick, plain registration order
    /// decides.
    pub fn stop_later(self, stop: impl Into<Measures>) -> Self {
        let meter = self.resolve_meter();
        self.install_stop(stop.into(), meter);
        self
    }

    /// `stop_later` with an explicit meter, overriding any bound meter
    pub fn stop_later_with(self, stop: impl Into<Measures>, meter: Meter) -> Self {
        self.install_stop(stop.into(), meter);
        self
    }

    /// Attaches a dependent action fired once per primary invocation
    ///
    /// Children run right after the primary action returns, in attachment
    /// order; by then the primary's memoized value (if it stores one) is
    /// fresh, so a child holding a `MemoReader` observes the exact value
    /// this invocation produced.
    pub fn add_child(self, child: impl FnMut() + 'static) -> Self {
        let child: Child = Rc::new(RefCell::new(child));
        self.state.borrow().children.borrow_mut().push(child);
        self
    }

    /// Suspends the repeat trigger, keeping its interval configuration
    pub fn pause_playing(&self) {
        let repeat = self.state.borrow_mut().repeat.take();
        if let Some(id) = repeat {
            self.clock.cancel(id);
            log::debug!("paused schedule at tick {}", self.clock.ticks());
        }
    }

    /// Re-arms a paused repeat from the current tick forward
    ///
    /// The first fire lands on the current tick (next pump), then every
    /// stored interval; the pre-pause phase is not reconstructed. Does
    /// nothing while the repeat is still armed or was never configured.
    pub fn resume_playing(&self) {
        let mut state = self.state.borrow_mut();
        if state.repeat.is_some() || state.interval == 0 {
            return;
        }
        let id = self
            .clock
            .install(self.clock.ticks(), state.interval, Rc::clone(&state.action));
        state.repeat = Some(id);
        log::debug!("resumed schedule at tick {}", self.clock.ticks());
    }

    /// Cancels everything this handle still has pending
    pub fn cancel(&self) {
        let (repeat, stop) = {
            let mut state = self.state.borrow_mut();
            (state.repeat.take(), state.stop.take())
        };
        if let Some(id) = repeat {
            self.clock.cancel(id);
        }
        if let Some(id) = stop {
            self.clock.cancel(id);
        }
    }

    /// The tick captured when the action was registered
    pub fn registered_at(&self) -> Tick {
        self.state.borrow().t0
    }

    /// Whether the repeat trigger is currently armed
    pub fn is_armed(&self) -> bool {
        self.state.borrow().repeat.is_some()
    }

    fn resolve_meter(&self) -> Meter {
        self.state
            .borrow()
            .meter
            .unwrap_or_else(|| self.clock.default_meter())
    }

    fn install_start(&self, start: Measures, every: Measures, meter: Meter) {
        let tempo = self.clock.tempo();
        let start_ticks = measures_to_ticks(start, &meter, &tempo);
        let every_ticks = measures_to_ticks(every, &meter, &tempo);

        let mut state = self.state.borrow_mut();
        if let Some(previous) = state.repeat.take() {
            self.clock.cancel(previous);
        }
        let due = state.t0 + start_ticks;
        let id = self
            .clock
            .install(due, every_ticks, Rc::clone(&state.action));
        state.repeat = Some(id);
        state.interval = every_ticks;
        log::debug!("armed schedule: first at {due}, every {every_ticks} ticks");
    }

    fn install_stop(&self, stop: Measures, meter: Meter) {
        let tempo = self.clock.tempo();
        let stop_tick =
            (self.state.borrow().t0 + measures_to_ticks(stop, &meter, &tempo)).saturating_sub(1);

        let weak = self.clock.downgrade();
        let state = Rc::clone(&self.state);
        let id = self.clock.install(
            stop_tick,
            0,
            Rc::new(RefCell::new(move || {
                let repeat = {
                    let mut state = state.borrow_mut();
                    state.stop = None;
                    state.repeat.take()
                };
                if let (Some(id), Some(clock)) = (repeat, weak.upgrade()) {
                    log::debug!("stop threshold reached at tick {}", clock.ticks());
                    clock.cancel(id);
                }
            })),
        );

        let mut state = self.state.borrow_mut();
        if let Some(previous) = state.stop.replace(id) {
            self.clock.cancel(previous);
        }
    }
}
