// Transcription pipeline
// raw detector notes -> cleanup -> MIDI bytes + summary

use serde::Serialize;
use thiserror::Error;

use crate::export::{export_midi, ExportError, MelodyInfo};
use crate::notes::{clean_notes_with_report, validate_notes, CleanedNotes, CleanupReport, NoteError, NoteEvent};
use super::config::{ConfigError, PipelineConfig};
use super::trace::{TraceBuilder, TraceEntry, TraceError, TraceStage, TraceWriter};

/// Errors that can stop a transcription run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Input(#[from] NoteError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),
}

/// Everything a run produces
#[derive(Debug, Clone, Serialize)]
pub struct Transcription {
    /// Cleaned notes, sorted by start time
    pub notes: CleanedNotes,

    /// Per-stage cleanup counts
    pub report: CleanupReport,

    /// Display summary
    pub info: MelodyInfo,

    /// Standard MIDI File bytes
    #[serde(skip)]
    pub midi: Vec<u8>,
}

/// Clean raw notes and encode them as MIDI
///
/// The input slice is left untouched; each call is independent of any other.
pub fn transcribe(raw: &[NoteEvent], config: &PipelineConfig) -> Result<Transcription, PipelineError> {
    run(raw, config, None)
}

/// Same as [`transcribe`], appending a progress entry per stage to `trace`
pub fn transcribe_traced(
    raw: &[NoteEvent],
    config: &PipelineConfig,
    trace: &TraceWriter,
) -> Result<Transcription, PipelineError> {
    run(raw, config, Some(trace))
}

fn run(
    raw: &[NoteEvent],
    config: &PipelineConfig,
    trace: Option<&TraceWriter>,
) -> Result<Transcription, PipelineError> {
    config.validate()?;

    if config.strict_input {
        record(trace, || TraceBuilder::stage(TraceStage::Validate).start("Validating input notes"))?;
        if let Err(e) = validate_notes(raw) {
            log::warn!("Rejected input: {}", e);
            record(trace, || TraceBuilder::stage(TraceStage::Validate).failed(e.to_string()))?;
            return Err(e.into());
        }
        record(trace, || TraceBuilder::stage(TraceStage::Validate).complete("Input notes valid"))?;
    }

    record(trace, || {
        TraceBuilder::stage(TraceStage::Cleanup).start(format!("Cleaning {} notes", raw.len()))
    })?;
    let (notes, report) = clean_notes_with_report(raw, &config.cleanup);
    if let Some(writer) = trace {
        let entry = TraceBuilder::stage(TraceStage::Cleanup)
            .complete(format!("Post-processing: {} → {} notes", report.input_count, report.output_count))
            .with_data(serde_json::to_value(&report).map_err(TraceError::from)?);
        writer.write(&entry)?;
    }

    record(trace, || TraceBuilder::stage(TraceStage::Encode).start("Building MIDI file"))?;
    let midi = match export_midi(notes.as_slice(), &config.export) {
        Ok(bytes) => bytes,
        Err(e) => {
            record(trace, || TraceBuilder::stage(TraceStage::Encode).failed(e.to_string()))?;
            return Err(e.into());
        }
    };
    record(trace, || {
        TraceBuilder::stage(TraceStage::Encode)
            .complete("MIDI file ready")
            .with_data(serde_json::json!({ "bytes": midi.len() }))
    })?;

    let info = MelodyInfo::from_notes(&notes, config.export.tempo_bpm);
    log::info!("Transcribed {} notes, duration {}", info.note_count, info.duration);

    Ok(Transcription {
        notes,
        report,
        info,
        midi,
    })
}

/// Write an entry when tracing is enabled; the entry is only built if needed
fn record<F>(trace: Option<&TraceWriter>, entry: F) -> Result<(), TraceError>
where
    F: FnOnce() -> TraceEntry,
{
    match trace {
        Some(writer) => writer.write(&entry()),
        None => Ok(()),
    }
}
