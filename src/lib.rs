// tickline - tick-granular musical event scheduling
// Tempo/meter arithmetic, a pumped beat clock, chainable schedules and players

pub mod clock;
pub mod instrument;
pub mod player;
pub mod runtime;
pub mod timer;

// Re-export commonly used types for convenience
pub use clock::{
    BeatPosition, Clock, DEFAULT_TICKS_PER_BEAT, Generate, Measures, MemoCell, MemoReader, Meter,
    ScheduleHandle, Tempo, TempoChange, Tick, TriggerId, WeakClock, measures_to_ticks,
};
pub use instrument::{Instrument, NoteEvent, RecordingInstrument};
pub use player::{
    Choice, ChordPlayer, Cycle, NotePlayer, PatternError, Phrases, RandomWalk, StepSequencer,
    Weighted,
};
pub use runtime::Looper;
pub use timer::{StepTimer, Timer};
