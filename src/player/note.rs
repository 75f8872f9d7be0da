// Note and chord players - pull a value, voice it, schedule its release
// A None from the note source is a rest

use crate::clock::{Clock, Generate, Measures, Meter, Tick, WeakClock};
use crate::instrument::Instrument;
use crate::player::Playback;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

const DEFAULT_VELOCITY: u8 = 127;

struct NoteCore {
    instrument: Rc<RefCell<dyn Instrument>>,
    notes: Box<dyn FnMut() -> Option<u8>>,
    velocity: Box<dyn FnMut() -> u8>,
    release: Option<Box<dyn FnMut() -> Option<Tick>>>,
}

/// Plays single notes from a value source on a repeating schedule
///
/// Every interval the player pulls the next note (a `None` is a rest),
/// pulls a velocity, and voices the note on its instrument. When a release
/// source is configured, each voiced note gets a `stop_note` scheduled that
/// many ticks later via [`Clock::call_later`].
///
/// ```ignore
/// let player = NotePlayer::new(&clock, synth, Choice::new(vec![60, 63, 67])?)
///     .with_interval(0.125)
///     .with_release(|| Some(12));
/// player.start_playing();
/// ```
pub struct NotePlayer {
    clock: Clock,
    core: Rc<RefCell<NoteCore>>,
    meter: Cell<Meter>,
    interval: Cell<Measures>,
    playback: Playback,
}

impl NotePlayer {
    /// Creates a player over the clock's default meter, one note per quarter
    /// of a measure, at full velocity
    pub fn new(
        clock: &Clock,
        instrument: impl Instrument + 'static,
        mut notes: impl Generate<Option<u8>> + 'static,
    ) -> Self {
        let core = NoteCore {
            instrument: Rc::new(RefCell::new(instrument)),
            notes: Box::new(move || notes.next_value()),
            velocity: Box::new(|| DEFAULT_VELOCITY),
            release: None,
        };

        Self {
            clock: clock.clone(),
            core: Rc::new(RefCell::new(core)),
            meter: Cell::new(clock.default_meter()),
            interval: Cell::new(Measures::Whole(0.25)),
            playback: Playback::new(clock.clone()),
        }
    }

    /// Sets the velocity source
    pub fn with_velocity(self, mut velocity: impl Generate<u8> + 'static) -> Self {
        self.core.borrow_mut().velocity = Box::new(move || velocity.next_value());
        self
    }

    /// Sets the release source; `None` from it leaves the note ringing
    pub fn with_release(self, mut release: impl Generate<Option<Tick>> + 'static) -> Self {
        self.core.borrow_mut().release = Some(Box::new(move || release.next_value()));
        self
    }

    /// Sets the repeat interval (default: a quarter of a measure)
    pub fn with_interval(self, interval: impl Into<Measures>) -> Self {
        self.interval.set(interval.into());
        self
    }

    /// Binds the player to a meter other than the clock default
    pub fn with_meter(self, meter: Meter) -> Self {
        self.meter.set(meter);
        self
    }

    /// Voices the next value immediately, outside any schedule
    pub fn play_once(&self) {
        play_note_step(&self.clock.downgrade(), &self.core);
    }

    /// Registers the play action starting at the next measure boundary
    pub fn start_playing(&self) {
        let weak = self.clock.downgrade();
        let core = Rc::clone(&self.core);
        self.playback.start(
            move || play_note_step(&weak, &core),
            self.interval.get(),
            self.meter.get(),
        );
    }

    /// Cancels the schedule one tick before the next measure boundary
    pub fn stop_playing(&self) {
        self.playback.stop(self.meter.get());
    }

    /// Suspends the schedule, keeping its configuration
    pub fn pause_playing(&self) {
        self.playback.pause();
    }

    /// Re-arms a paused schedule, or starts playing if never started
    pub fn resume_playing(&self) {
        if !self.playback.resume() {
            self.start_playing();
        }
    }

    /// Whether the player currently holds a schedule
    pub fn is_playing(&self) -> bool {
        self.playback.is_active()
    }
}

fn play_note_step(clock: &WeakClock, core: &Rc<RefCell<NoteCore>>) {
    let Some(clock) = clock.upgrade() else {
        return;
    };
    let mut core_ref = core.borrow_mut();
    let core_mut = &mut *core_ref;

    let Some(note) = (core_mut.notes)() else {
        return; // rest
    };
    let velocity = (core_mut.velocity)();
    core_mut.instrument.borrow_mut().play_note(note, velocity);
    log::debug!(
        "note {note} vel {velocity} at {}",
        clock
            .default_meter()
            .position(clock.ticks(), &clock.tempo())
    );

    if let Some(release) = core_mut.release.as_mut() {
        if let Some(after) = release() {
            let instrument = Rc::clone(&core_mut.instrument);
            clock.call_later(after, move || instrument.borrow_mut().stop_note(note));
        }
    }
}

struct ChordCore {
    instrument: Rc<RefCell<dyn Instrument>>,
    chords: Box<dyn FnMut() -> Option<Vec<u8>>>,
    velocity: Box<dyn FnMut() -> u8>,
    release: Option<Box<dyn FnMut() -> Option<Tick>>>,
}

/// The chord-voicing variant of [`NotePlayer`]
pub struct ChordPlayer {
    clock: Clock,
    core: Rc<RefCell<ChordCore>>,
    meter: Cell<Meter>,
    interval: Cell<Measures>,
    playback: Playback,
}

impl ChordPlayer {
    pub fn new(
        clock: &Clock,
        instrument: impl Instrument + 'static,
        mut chords: impl Generate<Option<Vec<u8>>> + 'static,
    ) -> Self {
        let core = ChordCore {
            instrument: Rc::new(RefCell::new(instrument)),
            chords: Box::new(move || chords.next_value()),
            velocity: Box::new(|| DEFAULT_VELOCITY),
            release: None,
        };

        Self {
            clock: clock.clone(),
            core: Rc::new(RefCell::new(core)),
            meter: Cell::new(clock.default_meter()),
            interval: Cell::new(Measures::Whole(0.25)),
            playback: Playback::new(clock.clone()),
        }
    }

    /// Sets the velocity source
    pub fn with_velocity(self, mut velocity: impl Generate<u8> + 'static) -> Self {
        self.core.borrow_mut().velocity = Box::new(move || velocity.next_value());
        self
    }

    /// Sets the release source; `None` from it leaves the chord ringing
    pub fn with_release(self, mut release: impl Generate<Option<Tick>> + 'static) -> Self {
        self.core.borrow_mut().release = Some(Box::new(move || release.next_value()));
        self
    }

    /// Sets the repeat interval (default: a quarter of a measure)
    pub fn with_interval(self, interval: impl Into<Measures>) -> Self {
        self.interval.set(interval.into());
        self
    }

    /// Binds the player to a meter other than the clock default
    pub fn with_meter(self, meter: Meter) -> Self {
        self.meter.set(meter);
        self
    }

    /// Voices the next chord immediately, outside any schedule
    pub fn play_once(&self) {
        play_chord_step(&self.clock.downgrade(), &self.core);
    }

    /// Registers the play action starting at the next measure boundary
    pub fn start_playing(&self) {
        let weak = self.clock.downgrade();
        let core = Rc::clone(&self.core);
        self.playback.start(
            move || play_chord_step(&weak, &core),
            self.interval.get(),
            self.meter.get(),
        );
    }

    /// Cancels the schedule one tick before the next measure boundary
    pub fn stop_playing(&self) {
        self.playback.stop(self.meter.get());
    }

    /// Suspends the schedule, keeping its configuration
    pub fn pause_playing(&self) {
        self.playback.pause();
    }

    /// Re-arms a paused schedule, or starts playing if never started
    pub fn resume_playing(&self) {
        if !self.playback.resume() {
            self.start_playing();
        }
    }

    /// Whether the player currently holds a schedule
    pub fn is_playing(&self) -> bool {
        self.playback.is_active()
    }
}

fn play_chord_step(clock: &WeakClock, core: &Rc<RefCell<ChordCore>>) {
    let Some(clock) = clock.upgrade() else {
        return;
    };
    let mut core_ref = core.borrow_mut();
    let core_mut = &mut *core_ref;

    let Some(chord) = (core_mut.chords)() else {
        return; // rest
    };
    let velocity = (core_mut.velocity)();
    core_mut
        .instrument
        .borrow_mut()
        .play_chord(&chord, velocity);
    log::debug!("chord {chord:?} vel {velocity} at tick {}", clock.ticks());

    if let Some(release) = core_mut.release.as_mut() {
        if let Some(after) = release() {
            let instrument = Rc::clone(&core_mut.instrument);
            clock.call_later(after, move || instrument.borrow_mut().stop_chord(&chord));
        }
    }
}
