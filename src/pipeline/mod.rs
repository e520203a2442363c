// Pipeline execution and monitoring module
// Runs raw notes through cleanup and MIDI export, with optional progress tracing

pub mod config;
pub mod run;
pub mod trace;

pub use config::{ConfigError, PipelineConfig};
pub use run::{transcribe, transcribe_traced, PipelineError, Transcription};
pub use trace::{read_trace_file, TraceBuilder, TraceEntry, TraceError, TraceStage, TraceStatus, TraceWriter};
