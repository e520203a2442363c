// Note cleanup - Turns dense pitch-detection output into a playable melody
// Filters noise, bounds the pitch range, and merges fragmented same-pitch notes

use serde::{Deserialize, Serialize};
use super::types::{CleanedNotes, NoteEvent};

/// Shortest note kept from detector output (roughly a 64th note at 120 BPM)
pub const DEFAULT_MIN_DURATION_SECONDS: f64 = 0.08;

/// Lowest detection confidence kept
pub const DEFAULT_MIN_AMPLITUDE: f64 = 0.15;

/// Lowest MIDI pitch kept (E2)
pub const DEFAULT_MIN_PITCH: u8 = 40;

/// Highest MIDI pitch kept (C7)
pub const DEFAULT_MAX_PITCH: u8 = 96;

/// Same-pitch notes closer than this are joined into one
pub const DEFAULT_MERGE_GAP_SECONDS: f64 = 0.05;

/// Shortest note kept after merging
pub const DEFAULT_POST_MERGE_MIN_DURATION_SECONDS: f64 = 0.05;

/// Thresholds for the cleanup stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Notes shorter than this are dropped before merging
    pub min_duration_seconds: f64,

    /// Notes with lower amplitude are dropped
    pub min_amplitude: f64,

    /// Inclusive lower bound of the kept pitch range
    pub min_pitch: u8,

    /// Inclusive upper bound of the kept pitch range
    pub max_pitch: u8,

    /// Gap (end of one note to start of the next) below which same-pitch notes merge
    pub merge_gap_seconds: f64,

    /// Merged or surviving notes shorter than this are dropped
    pub post_merge_min_duration_seconds: f64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        CleanupConfig {
            min_duration_seconds: DEFAULT_MIN_DURATION_SECONDS,
            min_amplitude: DEFAULT_MIN_AMPLITUDE,
            min_pitch: DEFAULT_MIN_PITCH,
            max_pitch: DEFAULT_MAX_PITCH,
            merge_gap_seconds: DEFAULT_MERGE_GAP_SECONDS,
            post_merge_min_duration_seconds: DEFAULT_POST_MERGE_MIN_DURATION_SECONDS,
        }
    }
}

/// What each cleanup stage did to the sequence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub input_count: usize,
    /// Notes whose start time is NaN or infinite
    pub dropped_malformed: usize,
    pub dropped_short: usize,
    pub dropped_quiet: usize,
    pub dropped_out_of_range: usize,
    /// Number of pairwise merges across all passes
    pub merges: usize,
    /// Merge passes run, including the final pass that found nothing to merge
    pub merge_passes: usize,
    pub dropped_after_merge: usize,
    pub output_count: usize,
}

/// Clean a raw note sequence with the given thresholds
///
/// Stages, in order:
/// 0. Drop notes whose start time is NaN or infinite
/// 1. Drop notes shorter than `min_duration_seconds`
/// 2. Drop notes quieter than `min_amplitude`
/// 3. Drop notes outside `[min_pitch, max_pitch]`
/// 4. Sort by start time and merge adjacent same-pitch notes until nothing changes
/// 5. Drop notes shorter than `post_merge_min_duration_seconds`
///
/// The input is never modified. The result is sorted ascending by start time.
pub fn clean_notes(notes: &[NoteEvent], config: &CleanupConfig) -> CleanedNotes {
    clean_notes_with_report(notes, config).0
}

/// Clean a raw note sequence and report per-stage counts
pub fn clean_notes_with_report(
    notes: &[NoteEvent],
    config: &CleanupConfig,
) -> (CleanedNotes, CleanupReport) {
    let mut report = CleanupReport {
        input_count: notes.len(),
        ..Default::default()
    };

    // Comparisons are written as "keep" predicates so NaN values never survive a filter
    let mut working: Vec<NoteEvent> = notes
        .iter()
        .filter(|n| n.start_time_seconds.is_finite())
        .copied()
        .collect();
    report.dropped_malformed = notes.len() - working.len();

    report.dropped_short = retain_counting(&mut working, |n| {
        n.duration_seconds >= config.min_duration_seconds
    });

    report.dropped_quiet = retain_counting(&mut working, |n| n.amplitude >= config.min_amplitude);

    report.dropped_out_of_range = retain_counting(&mut working, |n| {
        n.pitch_midi >= i32::from(config.min_pitch) && n.pitch_midi <= i32::from(config.max_pitch)
    });

    // Stable sort keeps equal-onset notes in input order
    working.sort_by(|a, b| a.start_time_seconds.total_cmp(&b.start_time_seconds));

    let (merges, passes) = merge_adjacent(&mut working, config.merge_gap_seconds);
    report.merges = merges;
    report.merge_passes = passes;

    report.dropped_after_merge = retain_counting(&mut working, |n| {
        n.duration_seconds >= config.post_merge_min_duration_seconds
    });

    report.output_count = working.len();

    log::debug!(
        "Cleanup stages: -{} malformed, -{} short, -{} quiet, -{} out of range, {} merges in {} passes, -{} after merge",
        report.dropped_malformed,
        report.dropped_short,
        report.dropped_quiet,
        report.dropped_out_of_range,
        report.merges,
        report.merge_passes,
        report.dropped_after_merge
    );
    log::info!("Post-processing: {} → {} notes", report.input_count, report.output_count);

    (CleanedNotes::from_sorted(working), report)
}

/// Retain matching notes, returning how many were removed
fn retain_counting<F>(notes: &mut Vec<NoteEvent>, keep: F) -> usize
where
    F: Fn(&NoteEvent) -> bool,
{
    let before = notes.len();
    notes.retain(|n| keep(n));
    before - notes.len()
}

/// Whether `next` continues `current` closely enough to be the same performed note
fn should_merge(current: &NoteEvent, next: &NoteEvent, gap_seconds: f64) -> bool {
    current.pitch_midi == next.pitch_midi
        && next.start_time_seconds - current.end_time_seconds() < gap_seconds
}

/// Join two notes: earlier start, later note's end, averaged amplitude
fn merge_pair(current: &NoteEvent, next: &NoteEvent) -> NoteEvent {
    NoteEvent {
        start_time_seconds: current.start_time_seconds,
        duration_seconds: next.end_time_seconds() - current.start_time_seconds,
        pitch_midi: current.pitch_midi,
        amplitude: (current.amplitude + next.amplitude) / 2.0,
    }
}

/// Merge adjacent same-pitch notes in place until a pass finds nothing to merge
///
/// Each pass walks the sorted buffer once, pairing a note with its successor.
/// A merged note is not compared again within the same pass; the next pass picks
/// up any chain it now forms. Merged notes are compacted toward the front, so the
/// buffer is reused across passes. `notes` must already be sorted by start time.
///
/// Returns (merge count, pass count).
fn merge_adjacent(notes: &mut Vec<NoteEvent>, gap_seconds: f64) -> (usize, usize) {
    let mut merges = 0;
    let mut passes = 0;
    let mut changed = true;

    while changed {
        changed = false;
        passes += 1;

        let len = notes.len();
        let mut read = 0;
        let mut write = 0;

        while read < len {
            if read + 1 < len && should_merge(&notes[read], &notes[read + 1], gap_seconds) {
                notes[write] = merge_pair(&notes[read], &notes[read + 1]);
                read += 2;
                merges += 1;
                changed = true;
            } else {
                notes[write] = notes[read];
                read += 1;
            }
            write += 1;
        }

        notes.truncate(write);
    }

    (merges, passes)
}
