// Export - Sequence encoding and delivery
// Converts cleaned notes into MIDI bytes, a display summary, and files on disk

pub mod midi;
pub mod storage;
pub mod summary;

// Re-export main types
pub use midi::{export_midi, ExportError, MidiExportOptions};
pub use storage::{calculate_sha256, store_midi, StorageError, StoredMidi, DEFAULT_MIDI_FILENAME};
pub use summary::{format_duration, MelodyInfo};
