// Meter - time signature and measure-relative duration arithmetic
// Converts musical durations (measures, beats, whole-note fractions) to ticks

use crate::clock::tempo::Tempo;
use std::fmt;

/// Absolute tick count on the clock's timeline
pub type Tick = u64;

/// A time signature: beats per measure over a beat unit
///
/// `Meter::new(3, 4)` is 3/4 time. The meter itself is a pure value; the
/// tick-denominated quantities are derived on demand from a governing
/// [`Tempo`] so they can never go stale when the tempo changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Meter {
    length: u32,
    division: u32,
}

impl Meter {
    /// Creates a new meter
    pub fn new(length: u32, division: u32) -> Self {
        assert!(length > 0, "Meter length must be > 0");
        assert!(
            division > 0 && division.is_power_of_two(),
            "Meter division must be a power of 2"
        );

        Self { length, division }
    }

    /// Common 4/4 meter
    pub fn standard() -> Self {
        Self::new(4, 4)
    }

    /// Beats per measure (numerator)
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Beat unit (denominator: 4 = quarter, 8 = eighth)
    pub fn division(&self) -> u32 {
        self.division
    }

    /// Ticks in one of this meter's beats, under the given tempo
    ///
    /// `tempo.tpb` counts quarter-note ticks, so an eighth-note beat unit
    /// gets half of them.
    pub fn ticks_per_beat(&self, tempo: &Tempo) -> Tick {
        tempo.tpb() as Tick * 4 / self.division as Tick
    }

    /// Ticks in one full measure, under the given tempo
    pub fn ticks_per_measure(&self, tempo: &Tempo) -> Tick {
        self.length as Tick * self.ticks_per_beat(tempo)
    }

    /// Breaks an absolute tick count into a measure/beat/tick position
    ///
    /// Measure and beat are 0-based; the tick component counts from the
    /// start of the beat.
    pub fn position(&self, ticks: Tick, tempo: &Tempo) -> BeatPosition {
        let per_beat = self.ticks_per_beat(tempo);
        let per_measure = self.ticks_per_measure(tempo);
        let in_measure = ticks % per_measure;

        BeatPosition {
            measure: ticks / per_measure,
            beat: (in_measure / per_beat) as u32,
            tick: in_measure % per_beat,
        }
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.length, self.division)
    }
}

/// A measure/beat/tick breakdown of an absolute tick count
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BeatPosition {
    /// Measure number (0-based)
    pub measure: u64,
    /// Beat within the measure (0-based)
    pub beat: u32,
    /// Tick within the beat
    pub tick: u64,
}

impl fmt::Display for BeatPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:03}", self.measure, self.beat, self.tick)
    }
}

/// A musical duration expressed relative to a meter
///
/// Two spellings exist because the remainder of a duration is denominated in
/// two different units:
///
/// - [`Measures::Whole`] is a plain number of measures whose fractional part
///   is a fraction of a *whole note* (so `1.25` is one measure plus a
///   quarter note, in any meter);
/// - [`Measures::WithBeats`] is a whole measure count plus an explicit count
///   of quarter-note beats (which may exceed the measure or be fractional).
///
/// Whole measures scale with the target meter; the remainder scales with the
/// tempo's own quarter-note resolution, independent of the meter's beat
/// unit. This keeps sub-measure timing identical for players running in
/// different meters over the same tempo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Measures {
    /// Measure count; the fractional part is a fraction of a whole note
    Whole(f64),
    /// Whole measures plus an explicit quarter-note beat count
    WithBeats(u32, f64),
}

impl From<f64> for Measures {
    fn from(measures: f64) -> Self {
        Measures::Whole(measures)
    }
}

impl From<(u32, f64)> for Measures {
    fn from((whole, beats): (u32, f64)) -> Self {
        Measures::WithBeats(whole, beats)
    }
}

impl From<(u32, u32)> for Measures {
    fn from((whole, beats): (u32, u32)) -> Self {
        Measures::WithBeats(whole, beats as f64)
    }
}

/// Converts a musical duration into an integer tick count
///
/// The whole-measure part contributes `W * meter.ticks_per_measure`; the
/// remainder contributes `R * 4 * tpb` (whole-note fraction) or `B * tpb`
/// (explicit beats). The result is rounded to the nearest tick.
pub fn measures_to_ticks(duration: impl Into<Measures>, meter: &Meter, tempo: &Tempo) -> Tick {
    let per_measure = meter.ticks_per_measure(tempo);

    match duration.into() {
        Measures::Whole(measures) => {
            assert!(measures >= 0.0, "duration must be non-negative");
            let whole = measures.floor() as Tick;
            let fraction = measures - measures.floor();
            whole * per_measure + (fraction * 4.0 * tempo.tpb() as f64).round() as Tick
        }
        Measures::WithBeats(whole, beats) => {
            assert!(beats >= 0.0, "beat count must be non-negative");
            whole as Tick * per_measure + (beats * tempo.tpb() as f64).round() as Tick
        }
    }
}
