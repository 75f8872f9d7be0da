// Timer - control surface of the external periodic timer
// The clock arms and disarms it; a host loop supplies the actual pump

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// The periodic-timer collaborator the clock drives
///
/// Implementations repeatedly invoke the clock's tick-advance entry point
/// (`run_until_current` then `tick`) while armed. The clock re-arms the
/// timer with a fresh interval on tempo changes and uses `start_after` for
/// phase nudges; the tick counter is never touched by any of these.
pub trait Timer {
    /// Start (or restart) repeating at the given interval
    fn start(&mut self, interval: Duration);

    /// Stop repeating
    fn stop(&mut self);

    /// Schedule a deferred restart: after `pause`, repeat at `interval`
    fn start_after(&mut self, pause: Duration, interval: Duration);
}

/// A timer that records its cadence instead of spinning a thread
///
/// The default timer behind [`crate::clock::Clock`]. It keeps the armed
/// interval and any deferred restarts behind a shared handle, so a host
/// loop (see [`crate::runtime::Looper`]) or a test can observe what the
/// clock asked for and drive the pump itself. Clones share state.
#[derive(Clone, Default)]
pub struct StepTimer {
    state: Rc<RefCell<TimerState>>,
}

#[derive(Default)]
struct TimerState {
    armed: Option<Duration>,
    deferred: Vec<(Duration, Duration)>,
}

impl StepTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently armed repeat interval, if any
    pub fn armed(&self) -> Option<Duration> {
        self.state.borrow().armed
    }

    /// Deferred restarts recorded by `start_after`, oldest first
    pub fn deferred(&self) -> Vec<(Duration, Duration)> {
        self.state.borrow().deferred.clone()
    }

    /// Removes and returns the oldest deferred restart
    pub fn pop_deferred(&self) -> Option<(Duration, Duration)> {
        let mut state = self.state.borrow_mut();
        if state.deferred.is_empty() {
            None
        } else {
            Some(state.deferred.remove(0))
        }
    }

    /// Arms the timer directly (what a host loop does after honoring a
    /// deferred restart)
    pub fn arm(&self, interval: Duration) {
        self.state.borrow_mut().armed = Some(interval);
    }
}

impl Timer for StepTimer {
    fn start(&mut self, interval: Duration) {
        self.state.borrow_mut().armed = Some(interval);
    }

    fn stop(&mut self) {
        self.state.borrow_mut().armed = None;
    }

    fn start_after(&mut self, pause: Duration, interval: Duration) {
        self.state.borrow_mut().deferred.push((pause, interval));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_and_stop() {
        let timer = StepTimer::new();
        assert_eq!(timer.armed(), None);

        let mut driver = timer.clone();
        driver.start(Duration::from_millis(20));
        assert_eq!(timer.armed(), Some(Duration::from_millis(20)));

        driver.stop();
        assert_eq!(timer.armed(), None);
    }

    #[test]
    fn test_deferred_restarts_accumulate() {
        let timer = StepTimer::new();
        let mut driver = timer.clone();
        let interval = Duration::from_millis(20);

        driver.start_after(Duration::from_millis(100), interval);
        driver.start_after(Duration::from_millis(500), interval);
        assert_eq!(
            timer.deferred(),
            vec![
                (Duration::from_millis(100), interval),
                (Duration::from_millis(500), interval)
            ]
        );

        assert_eq!(
            timer.pop_deferred(),
            Some((Duration::from_millis(100), interval))
        );
        assert_eq!(timer.deferred().len(), 1);
    }
}
