// Note processing module
// Note event types, cleanup pipeline, and strict input validation

pub mod cleanup;
pub mod types;
pub mod validate;

pub use cleanup::{clean_notes, clean_notes_with_report, CleanupConfig, CleanupReport};
pub use types::{CleanedNotes, NoteEvent};
pub use validate::{validate_notes, NoteError};
