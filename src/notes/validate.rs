// Strict input validation
// Optional guard that rejects malformed detector output before cleanup

use thiserror::Error;
use super::types::NoteEvent;

/// Errors raised by strict note validation
#[derive(Debug, Error, PartialEq)]
pub enum NoteError {
    #[error("Malformed note at index {index}: {reason}")]
    Malformed { index: usize, reason: String },
}

/// Check that every note has finite, non-negative timing and a finite amplitude
///
/// Cleanup never calls this itself: out-of-range values are normally filtered,
/// not rejected. Use it when NaN or negative timing should stop the pipeline
/// instead of being dropped silently.
pub fn validate_notes(notes: &[NoteEvent]) -> Result<(), NoteError> {
    for (index, note) in notes.iter().enumerate() {
        if let Some(reason) = malformed_reason(note) {
            return Err(NoteError::Malformed { index, reason });
        }
    }

    Ok(())
}

fn malformed_reason(note: &NoteEvent) -> Option<String> {
    if !note.start_time_seconds.is_finite() || note.start_time_seconds < 0.0 {
        return Some(format!("invalid start time {}", note.start_time_seconds));
    }

    if !note.duration_seconds.is_finite() || note.duration_seconds < 0.0 {
        return Some(format!("invalid duration {}", note.duration_seconds));
    }

    if !note.amplitude.is_finite() {
        return Some(format!("invalid amplitude {}", note.amplitude));
    }

    None
}
