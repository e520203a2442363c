// Melody summary
// Display-ready facts about an exported melody

use serde::{Deserialize, Serialize};
use crate::notes::CleanedNotes;

/// Summary of a cleaned melody for display alongside the MIDI file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MelodyInfo {
    /// Number of notes written to the file
    pub note_count: usize,

    /// End of the last-ending note, in seconds
    pub total_duration_seconds: f64,

    /// Total duration as "m:ss"
    pub duration: String,

    /// Tempo the file was written at
    pub estimated_tempo: f64,
}

impl MelodyInfo {
    pub fn from_notes(notes: &CleanedNotes, tempo_bpm: f64) -> Self {
        let total_duration_seconds = notes.total_duration_seconds();

        MelodyInfo {
            note_count: notes.len(),
            total_duration_seconds,
            duration: format_duration(total_duration_seconds),
            estimated_tempo: tempo_bpm,
        }
    }
}

/// Format seconds as "m:ss", truncating fractional seconds
pub fn format_duration(seconds: f64) -> String {
    let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
    let mins = (seconds / 60.0).floor() as u64;
    let secs = (seconds % 60.0).floor() as u64;
    format!("{}:{:02}", mins, secs)
}
