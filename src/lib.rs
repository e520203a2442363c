// Melodist - Pitch-detection note cleanup and MIDI melody export
// Module declarations

pub mod export;
pub mod notes;
pub mod pipeline;

pub use export::{export_midi, store_midi, ExportError, MelodyInfo, MidiExportOptions};
pub use notes::{clean_notes, clean_notes_with_report, CleanedNotes, CleanupConfig, CleanupReport, NoteEvent};
pub use pipeline::{transcribe, transcribe_traced, PipelineConfig, PipelineError, Transcription};
