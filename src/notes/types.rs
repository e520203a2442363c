// Note event types
// Raw pitch-detection note candidates and the cleaned sequence derived from them

use serde::{Deserialize, Serialize};

/// A single note candidate with timing, pitch, and amplitude
///
/// This is the record produced by pitch detection. Values are taken as-is:
/// out-of-range pitch or amplitude is handled by the cleanup filters, not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Onset in seconds from the start of the audio
    pub start_time_seconds: f64,

    /// How long the note sounds, in seconds
    pub duration_seconds: f64,

    /// MIDI note number, nominally 0-127. Detectors may report values outside
    /// that range; the pitch filter drops them.
    pub pitch_midi: i32,

    /// Detection confidence [0.0, 1.0], used as a velocity proxy
    pub amplitude: f64,
}

impl NoteEvent {
    /// Create a new note event
    pub fn new(start_time_seconds: f64, duration_seconds: f64, pitch_midi: i32, amplitude: f64) -> Self {
        NoteEvent {
            start_time_seconds,
            duration_seconds,
            pitch_midi,
            amplitude,
        }
    }

    /// Time at which the note stops sounding
    pub fn end_time_seconds(&self) -> f64 {
        self.start_time_seconds + self.duration_seconds
    }
}

/// Note sequence produced by the cleaner
///
/// Only `notes::cleanup` can build one, so holding a `CleanedNotes` means every note
/// passed the filters and the sequence is sorted ascending by start time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanedNotes {
    notes: Vec<NoteEvent>,
}

impl CleanedNotes {
    pub(crate) fn from_sorted(notes: Vec<NoteEvent>) -> Self {
        CleanedNotes { notes }
    }

    pub fn as_slice(&self) -> &[NoteEvent] {
        &self.notes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NoteEvent> {
        self.notes.iter()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// End time of the latest-ending note, 0.0 for an empty sequence
    pub fn total_duration_seconds(&self) -> f64 {
        self.notes
            .iter()
            .fold(0.0, |max, n| max.max(n.end_time_seconds()))
    }

    pub fn into_vec(self) -> Vec<NoteEvent> {
        self.notes
    }
}

impl<'a> IntoIterator for &'a CleanedNotes {
    type Item = &'a NoteEvent;
    type IntoIter = std::slice::Iter<'a, NoteEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.notes.iter()
    }
}
