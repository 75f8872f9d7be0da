// Run loop - pumps a clock at the cadence its timer was armed with
// The wiring layer for live use; tests and offline rendering pump directly

use crate::clock::Clock;
use crate::timer::StepTimer;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Poll interval while the clock is disarmed
const IDLE_POLL: Duration = Duration::from_millis(1);

/// Cooperative pump for a clock built over a [`StepTimer`]
///
/// The looper runs on the calling thread: it honors deferred restarts
/// (sleeping their pause, then arming), and while the timer is armed it
/// dispatches one tick per interval. Everything stays single-threaded; the
/// only cross-thread value is the shutdown flag, which another thread may
/// set to end the loop.
///
/// This is the process-wide wiring layer. Core scheduling never reaches for
/// a global clock; the application constructs one clock, hands clones to
/// its players, and parks the looper on a dedicated thread it builds
/// everything on.
pub struct Looper {
    clock: Clock,
    timer: StepTimer,
    shutdown: Arc<AtomicBool>,
}

impl Looper {
    /// Pairs a clock with the timer it was constructed over
    pub fn new(clock: Clock, timer: StepTimer) -> Self {
        Self {
            clock,
            timer,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The flag that ends [`Looper::run`] when set
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// The clock being pumped
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Pumps until the shutdown flag is set
    pub fn run(&self) {
        log::debug!("looper running");
        while !self.shutdown.load(Ordering::Relaxed) {
            self.step();
        }
        log::debug!("looper shut down at tick {}", self.clock.ticks());
    }

    /// Pumps at most `count` ticks, or until shutdown
    pub fn run_ticks(&self, count: u64) {
        for _ in 0..count {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }
            self.step();
        }
    }

    /// One scheduling decision: honor a deferred restart, dispatch a tick,
    /// or idle
    fn step(&self) {
        if let Some((pause, interval)) = self.timer.pop_deferred() {
            log::debug!("deferred restart: pausing {:?}", pause);
            thread::sleep(pause);
            self.timer.arm(interval);
            return;
        }

        match self.timer.armed() {
            Some(interval) => {
                self.clock.run_until_current();
                self.clock.tick();
                thread::sleep(interval);
            }
            None => thread::sleep(IDLE_POLL),
        }
    }
}
