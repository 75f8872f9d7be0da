// Instrument - the narrow surface players drive
// Concrete sound generation lives outside this crate

use std::cell::RefCell;
use std::rc::Rc;

/// Something that can voice notes and chords
///
/// Players only ever call these four methods; synthesis, MIDI transport and
/// routing belong to the implementor. The chord methods default to looping
/// the note methods, which is what most monophonic-minded backends want.
pub trait Instrument {
    fn play_note(&mut self, note: u8, velocity: u8);

    fn stop_note(&mut self, note: u8);

    fn play_chord(&mut self, notes: &[u8], velocity: u8) {
        for &note in notes {
            self.play_note(note, velocity);
        }
    }

    fn stop_chord(&mut self, notes: &[u8]) {
        for &note in notes {
            self.stop_note(note);
        }
    }
}

/// A note-on or note-off as seen by an instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEvent {
    On { note: u8, velocity: u8 },
    Off { note: u8 },
}

/// An instrument that records every event it receives
///
/// Useful as a test double and for dry runs: clones share the same event
/// list, so one clone can be handed to a player while another stays behind
/// to inspect what was played.
#[derive(Clone, Default)]
pub struct RecordingInstrument {
    events: Rc<RefCell<Vec<NoteEvent>>>,
}

impl RecordingInstrument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far, in order
    pub fn events(&self) -> Vec<NoteEvent> {
        self.events.borrow().clone()
    }

    /// Notes from the note-on events, in order
    pub fn notes_played(&self) -> Vec<u8> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                NoteEvent::On { note, .. } => Some(*note),
                NoteEvent::Off { .. } => None,
            })
            .collect()
    }

    /// Clears the recorded events
    pub fn reset(&self) {
        self.events.borrow_mut().clear();
    }
}

impl Instrument for RecordingInstrument {
    fn play_note(&mut self, note: u8, velocity: u8) {
        self.events
            .borrow_mut()
            .push(NoteEvent::On { note, velocity });
    }

    fn stop_note(&mut self, note: u8) {
        self.events.borrow_mut().push(NoteEvent::Off { note });
    }
}
