// Step sequencer - an on/off grid drummed through one step per subdivision
// Rows are notes (typically a drum kit), columns are steps of a measure

use crate::clock::{Clock, Measures, Meter};
use crate::instrument::Instrument;
use crate::player::Playback;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

const DEFAULT_STEPS: usize = 16;
const DEFAULT_VELOCITY: u8 = 60;

/// A step sequencer over a note-per-row grid
///
/// The grid is `steps` columns wide (one measure split evenly) and one row
/// per note. Every `1/steps` of a measure the sequencer plays the enabled
/// rows of the current column at that column's velocity, then advances and
/// wraps. The grid and velocities can be edited live while the sequencer
/// runs.
pub struct StepSequencer {
    clock: Clock,
    instrument: Rc<RefCell<dyn Instrument>>,
    rows: Vec<u8>,
    steps: Cell<usize>,
    meter: Cell<Meter>,
    /// Per-step velocity
    velocity: Rc<RefCell<Vec<u8>>>,
    /// `grid[step][row]`: whether the row fires on that step
    grid: Rc<RefCell<Vec<Vec<bool>>>>,
    cursor: Rc<Cell<usize>>,
    playback: Playback,
}

impl StepSequencer {
    /// Creates a 16-step sequencer with one row per note
    pub fn new(clock: &Clock, instrument: impl Instrument + 'static, rows: Vec<u8>) -> Self {
        assert!(!rows.is_empty(), "Step sequencer needs at least one row");

        let sequencer = Self {
            clock: clock.clone(),
            instrument: Rc::new(RefCell::new(instrument)),
            rows,
            steps: Cell::new(0),
            meter: Cell::new(clock.default_meter()),
            velocity: Rc::new(RefCell::new(Vec::new())),
            grid: Rc::new(RefCell::new(Vec::new())),
            cursor: Rc::new(Cell::new(0)),
            playback: Playback::new(clock.clone()),
        };
        sequencer.resize(DEFAULT_STEPS);
        sequencer
    }

    /// Reconfigures the grid width; clears the grid and velocities
    ///
    /// Call before `start_playing`: a running schedule keeps the width it
    /// was started with.
    pub fn with_steps(self, steps: usize) -> Self {
        self.resize(steps);
        self
    }

    /// Binds the sequencer to a meter other than the clock default
    pub fn with_meter(self, meter: Meter) -> Self {
        self.meter.set(meter);
        self
    }

    /// Number of steps in one cycle
    pub fn steps(&self) -> usize {
        self.steps.get()
    }

    /// The step the next play will voice
    pub fn cursor(&self) -> usize {
        self.cursor.get()
    }

    /// Enables or disables a row at a step
    pub fn set_step(&self, step: usize, row: usize, on: bool) {
        assert!(step < self.steps.get(), "step out of range");
        assert!(row < self.rows.len(), "row out of range");
        log::debug!("step {step} x row {row} = {on}");
        self.grid.borrow_mut()[step][row] = on;
    }

    /// Sets the velocity used for every row of a step
    pub fn set_velocity(&self, step: usize, velocity: u8) {
        assert!(step < self.steps.get(), "step out of range");
        self.velocity.borrow_mut()[step] = velocity;
    }

    /// One cycle step as a musical duration
    pub fn step_interval(&self) -> Measures {
        Measures::Whole(1.0 / self.steps.get() as f64)
    }

    /// Registers the step action starting at the next measure boundary
    pub fn start_playing(&self) {
        let instrument = Rc::clone(&self.instrument);
        let grid = Rc::clone(&self.grid);
        let velocity = Rc::clone(&self.velocity);
        let cursor = Rc::clone(&self.cursor);
        let rows = self.rows.clone();
        let steps = self.steps.get();

        let action = move || {
            let step = cursor.get();
            let step_velocity = velocity.borrow()[step];
            {
                let grid = grid.borrow();
                let mut instrument = instrument.borrow_mut();
                for (row, &note) in rows.iter().enumerate() {
                    if grid[step][row] {
                        instrument.play_note(note, step_velocity);
                    }
                }
            }
            cursor.set((step + 1) % steps);
        };

        self.playback
            .start(action, self.step_interval(), self.meter.get());
    }

    /// Cancels the schedule one tick before the next measure boundary
    pub fn stop_playing(&self) {
        self.playback.stop(self.meter.get());
    }

    /// Suspends the schedule, keeping the cursor where it is
    pub fn pause_playing(&self) {
        self.playback.pause();
    }

    /// Re-arms a paused schedule, or starts playing if never started
    pub fn resume_playing(&self) {
        if !self.playback.resume() {
            self.start_playing();
        }
    }

    /// Whether the sequencer currently holds a schedule
    pub fn is_playing(&self) -> bool {
        self.playback.is_active()
    }

    fn resize(&self, steps: usize) {
        assert!(steps > 0, "Step sequencer needs at least one step");
        self.steps.set(steps);
        *self.velocity.borrow_mut() = vec![DEFAULT_VELOCITY; steps];
        *self.grid.borrow_mut() = vec![vec![false; self.rows.len()]; steps];
        self.cursor.set(0);
    }
}
