// Player module - measure-aligned performers over the clock

pub mod generators;
pub mod note;
pub mod step;

pub use generators::{
    Choice, Cycle, PatternError, Phrases, RandomWalk, Weighted, explode, sequence,
};
pub use note::{ChordPlayer, NotePlayer};
pub use step::StepSequencer;

use crate::clock::{Clock, Measures, Meter, ScheduleHandle};
use std::cell::RefCell;

/// Start/stop plumbing shared by the players
///
/// Holds the player's schedule handle and delegates pause/resume to it:
/// plain composition around [`ScheduleHandle`]. Starting aligns the first
/// play to the next measure boundary; stopping cancels one tick before the
/// following boundary, so a schedule started at that boundary wins the
/// same-tick race.
pub(crate) struct Playback {
    clock: Clock,
    handle: RefCell<Option<ScheduleHandle>>,
}

impl Playback {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            clock,
            handle: RefCell::new(None),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.handle.borrow().is_some()
    }

    pub(crate) fn start(&self, action: impl FnMut() + 'static, interval: Measures, meter: Meter) {
        if self.is_active() {
            return;
        }
        let handle = self
            .clock
            .schedule(action)
            .bind_meter(meter)
            .start_later(1.0, interval);
        *self.handle.borrow_mut() = Some(handle);
    }

    pub(crate) fn stop(&self, meter: Meter) {
        let Some(handle) = self.handle.borrow_mut().take() else {
            return;
        };
        let ticks = meter
            .ticks_per_measure(&self.clock.tempo())
            .saturating_sub(1);
        self.clock.call_later(ticks, move || handle.cancel());
    }

    pub(crate) fn pause(&self) {
        if let Some(handle) = self.handle.borrow().as_ref() {
            handle.pause_playing();
        }
    }

    /// Returns false when there is nothing to resume
    pub(crate) fn resume(&self) -> bool {
        match self.handle.borrow().as_ref() {
            Some(handle) => {
                handle.resume_playing();
                true
            }
            None => false,
        }
    }
}
