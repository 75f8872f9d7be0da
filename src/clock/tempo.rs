// Tempo - mapping between wall-clock pacing and tick granularity
// Invariant: tpm always equals bpm * tpb

use std::fmt;
use std::time::Duration;

/// Default ticks per beat (24 PPQN, the classic MIDI clock resolution)
pub const DEFAULT_TICKS_PER_BEAT: u32 = 24;

/// Beats-per-minute to ticks-per-minute relationship
///
/// A quarter-note beat is subdivided into `tpb` ticks, so the tick rate is
/// `tpm = bpm * tpb`. The external timer fires once per tick, at
/// `tick_interval()` seconds.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Tempo {
    bpm: f64,
    tpb: u32,
    tpm: f64,
}

impl Tempo {
    /// Creates a tempo at the given BPM with the default tick resolution
    pub fn new(bpm: f64) -> Self {
        Self::with_resolution(bpm, DEFAULT_TICKS_PER_BEAT)
    }

    /// Creates a tempo with an explicit ticks-per-beat resolution
    pub fn with_resolution(bpm: f64, tpb: u32) -> Self {
        assert!(bpm > 0.0, "BPM must be > 0");
        assert!(tpb > 0, "ticks per beat must be > 0");

        Self {
            bpm,
            tpb,
            tpm: bpm * tpb as f64,
        }
    }

    /// Beats per minute
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Ticks per beat
    pub fn tpb(&self) -> u32 {
        self.tpb
    }

    /// Ticks per minute (always `bpm * tpb`)
    pub fn tpm(&self) -> f64 {
        self.tpm
    }

    /// Applies a partial change, keeping unspecified fields at their prior
    /// values and re-deriving the rest
    ///
    /// If `tpm` is given without `tpb`, the tick resolution is held fixed and
    /// `bpm` becomes `tpm / tpb`. Otherwise the given `bpm`/`tpb` are applied
    /// and `tpm` is recomputed as their product.
    pub fn reset(&mut self, change: TempoChange) {
        if let (Some(tpm), None) = (change.tpm, change.tpb) {
            assert!(tpm > 0.0, "ticks per minute must be > 0");
            self.tpm = tpm;
            self.bpm = tpm / self.tpb as f64;
            return;
        }

        if let Some(bpm) = change.bpm {
            assert!(bpm > 0.0, "BPM must be > 0");
            self.bpm = bpm;
        }
        if let Some(tpb) = change.tpb {
            assert!(tpb > 0, "ticks per beat must be > 0");
            self.tpb = tpb;
        }
        self.tpm = self.bpm * self.tpb as f64;
    }

    /// Duration of one beat in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Wall-clock interval between two ticks (`60 / tpm` seconds)
    ///
    /// This is the interval the external periodic timer is armed with.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(60.0 / self.tpm)
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(120.0)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM ({} tpb)", self.bpm, self.tpb)
    }
}

/// Partial tempo change for [`Tempo::reset`]
///
/// Builder-style: `TempoChange::new().bpm(150.0).tpb(48)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TempoChange {
    bpm: Option<f64>,
    tpb: Option<u32>,
    tpm: Option<f64>,
}

impl TempoChange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bpm(mut self, bpm: f64) -> Self {
        self.bpm = Some(bpm);
        self
    }

    pub fn tpb(mut self, tpb: u32) -> Self {
        self.tpb = Some(tpb);
        self
    }

    pub fn tpm(mut self, tpm: f64) -> Self {
        self.tpm = Some(tpm);
        self
    }
}
