// MIDI Export - Encode cleaned notes as a single-track Standard MIDI File using midly
// One tempo, one track, channel 0, note-off delays measured from the previous note's end

use serde::{Deserialize, Serialize};
use midly::{Smf, Header, Track, TrackEvent, TrackEventKind, MetaMessage, MidiMessage, Timing};
use thiserror::Error;
use crate::notes::NoteEvent;

/// Default pulses per quarter note
pub const DEFAULT_TICKS_PER_BEAT: u16 = 128;

/// Fixed playback tempo for exported melodies
pub const DEFAULT_TEMPO_BPM: f64 = 120.0;

/// MIDI channel used for every note
const MELODY_CHANNEL: u8 = 0;

/// Largest value a variable-length delta can hold
const MAX_DELTA_TICKS: u32 = 0x0FFF_FFFF;

/// Largest tempo value the 24-bit tempo meta event can hold
const MAX_TEMPO_MICROS: u32 = 0xFF_FFFF;

/// Errors that can occur while encoding notes
///
/// None of these fire for notes produced by the cleaner with valid options.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Invalid export options: {0}")]
    InvalidOptions(String),

    #[error("Note {index} has pitch {pitch}, outside the MIDI range 0-127")]
    PitchOutOfRange { index: usize, pitch: i32 },

    #[error("Note {index} is malformed: {reason}")]
    InvalidNote { index: usize, reason: String },

    #[error("Failed to write MIDI: {0}")]
    Write(String),
}

/// MIDI export options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiExportOptions {
    /// Pulses per quarter note (PPQ)
    pub ticks_per_beat: u16,

    /// Tempo written to the file and used to convert seconds to ticks
    pub tempo_bpm: f64,
}

impl Default for MidiExportOptions {
    fn default() -> Self {
        MidiExportOptions {
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            tempo_bpm: DEFAULT_TEMPO_BPM,
        }
    }
}

impl MidiExportOptions {
    /// Ticks elapsed per second of real time (256 at the defaults)
    pub fn ticks_per_second(&self) -> f64 {
        self.ticks_per_beat as f64 * self.tempo_bpm / 60.0
    }

    /// Check that the options can be represented in a MIDI file
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.ticks_per_beat == 0 || self.ticks_per_beat > 0x7FFF {
            return Err(ExportError::InvalidOptions(format!(
                "ticks_per_beat must be in 1..=32767, got {}",
                self.ticks_per_beat
            )));
        }

        if !self.tempo_bpm.is_finite() || self.tempo_bpm <= 0.0 {
            return Err(ExportError::InvalidOptions(format!(
                "tempo_bpm must be a positive number, got {}",
                self.tempo_bpm
            )));
        }

        let micros = 60_000_000.0 / self.tempo_bpm;
        if micros < 1.0 || micros > MAX_TEMPO_MICROS as f64 {
            return Err(ExportError::InvalidOptions(format!(
                "tempo_bpm {} is outside the range a MIDI tempo event can hold",
                self.tempo_bpm
            )));
        }

        Ok(())
    }
}

/// Export notes to MIDI file bytes
///
/// Notes are re-sorted by start time, so callers need not preserve cleanup order.
/// Each note is written as a note-on delayed from the end of the previous note,
/// then a note-off `duration_ticks` later carrying the same velocity.
///
/// # Returns
/// MIDI file bytes (format 0, one track) ready to be written to disk
pub fn export_midi(notes: &[NoteEvent], options: &MidiExportOptions) -> Result<Vec<u8>, ExportError> {
    options.validate()?;

    for (index, note) in notes.iter().enumerate() {
        check_note(index, note)?;
    }

    let header = Header {
        format: midly::Format::SingleTrack,
        timing: Timing::Metrical(options.ticks_per_beat.into()),
    };

    let mut track = Track::new();
    add_tempo(&mut track, 0, options.tempo_bpm);
    add_notes(&mut track, notes, options.ticks_per_second())?;
    add_end_of_track(&mut track, 0);

    let smf = Smf {
        header,
        tracks: vec![track],
    };

    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| ExportError::Write(e.to_string()))?;

    log::debug!("Encoded {} notes into {} MIDI bytes", notes.len(), bytes.len());

    Ok(bytes)
}

/// Reject notes that cannot be encoded at all
fn check_note(index: usize, note: &NoteEvent) -> Result<(), ExportError> {
    if !(0..=127).contains(&note.pitch_midi) {
        return Err(ExportError::PitchOutOfRange {
            index,
            pitch: note.pitch_midi,
        });
    }

    if !note.start_time_seconds.is_finite() || !note.duration_seconds.is_finite() {
        return Err(ExportError::InvalidNote {
            index,
            reason: "timing is not finite".to_string(),
        });
    }

    if !note.amplitude.is_finite() {
        return Err(ExportError::InvalidNote {
            index,
            reason: "amplitude is not finite".to_string(),
        });
    }

    Ok(())
}

/// Append note-on/note-off pairs for every note in start-time order
fn add_notes(track: &mut Track<'_>, notes: &[NoteEvent], ticks_per_second: f64) -> Result<(), ExportError> {
    let mut sorted: Vec<&NoteEvent> = notes.iter().collect();
    sorted.sort_by(|a, b| a.start_time_seconds.total_cmp(&b.start_time_seconds));

    let mut last_event_end_time = 0.0;

    for (index, note) in sorted.into_iter().enumerate() {
        // Range checked by check_note
        let key = note.pitch_midi as u8;
        let delay = delay_ticks(note.start_time_seconds, last_event_end_time, ticks_per_second);
        let duration = duration_ticks(note.duration_seconds, ticks_per_second);
        let velocity = note_velocity(note.amplitude);

        if delay > MAX_DELTA_TICKS || duration > MAX_DELTA_TICKS {
            return Err(ExportError::InvalidNote {
                index,
                reason: format!("delay {} or duration {} exceeds the MIDI delta range", delay, duration),
            });
        }

        // Note On
        track.push(TrackEvent {
            delta: delay.into(),
            kind: TrackEventKind::Midi {
                channel: MELODY_CHANNEL.into(),
                message: MidiMessage::NoteOn {
                    key: key.into(),
                    vel: velocity.into(),
                },
            },
        });

        // Note Off
        track.push(TrackEvent {
            delta: duration.into(),
            kind: TrackEventKind::Midi {
                channel: MELODY_CHANNEL.into(),
                message: MidiMessage::NoteOff {
                    key: key.into(),
                    vel: velocity.into(),
                },
            },
        });

        last_event_end_time = note.end_time_seconds();
    }

    Ok(())
}

/// Ticks between the previous note's end and this note's start
///
/// Overlapping notes produce a negative gap, which is written as 0.
pub fn delay_ticks(start_time_seconds: f64, last_event_end_time: f64, ticks_per_second: f64) -> u32 {
    let ticks = ((start_time_seconds - last_event_end_time) * ticks_per_second).round();
    if ticks < 0.0 {
        log::debug!(
            "Note at {:.3}s starts before previous note ends ({:.3}s), clamping delay to 0",
            start_time_seconds,
            last_event_end_time
        );
        return 0;
    }
    ticks as u32
}

/// Note length in ticks, never shorter than one tick
pub fn duration_ticks(duration_seconds: f64, ticks_per_second: f64) -> u32 {
    let ticks = (duration_seconds * ticks_per_second).round();
    ticks.max(1.0) as u32
}

/// MIDI velocity for an amplitude, kept in 1..=127
///
/// Velocity 0 means note-off on the wire, so a sounding note never gets it.
/// A NaN or infinite amplitude gives the quietest velocity.
pub fn note_velocity(amplitude: f64) -> u8 {
    if !amplitude.is_finite() {
        return 1;
    }
    (amplitude * 127.0).round().clamp(1.0, 127.0) as u8
}

/// Microseconds per quarter note for a tempo
pub fn tempo_micros_per_beat(bpm: f64) -> u32 {
    (60_000_000.0 / bpm) as u32
}

/// Add tempo meta message
fn add_tempo(track: &mut Track<'_>, delta: u32, bpm: f64) {
    track.push(TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(tempo_micros_per_beat(bpm).into())),
    });
}

/// Add end of track message
fn add_end_of_track(track: &mut Track<'_>, delta: u32) {
    track.push(TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: [u8; 14] = [
        b'M', b'T', b'h', b'd', 0x00, 0x00, 0x00, 0x06, // chunk type + length
        0x00, 0x00, // format 0
        0x00, 0x01, // one track
        0x00, 0x80, // 128 ticks per beat
    ];

    const TEMPO_120: [u8; 7] = [0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20];

    const END_OF_TRACK: [u8; 4] = [0x00, 0xFF, 0x2F, 0x00];

    fn expected_file(events: &[u8]) -> Vec<u8> {
        let mut body = TEMPO_120.to_vec();
        body.extend_from_slice(events);
        body.extend_from_slice(&END_OF_TRACK);

        let mut bytes = HEADER.to_vec();
        bytes.extend_from_slice(b"MTrk");
        bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&body);
        bytes
    }

    #[test]
    fn test_ticks_per_second() {
        let options = MidiExportOptions::default();
        assert!((options.ticks_per_second() - 256.0).abs() < 1e-9);
    }

    #[test]
    fn test_tempo_calculation() {
        assert_eq!(tempo_micros_per_beat(120.0), 500_000);
        assert_eq!(tempo_micros_per_beat(90.0), 666_666);
    }

    #[test]
    fn test_export_empty_notes() {
        let bytes = export_midi(&[], &MidiExportOptions::default()).unwrap();

        assert_eq!(&bytes[0..4], b"MThd");
        assert_eq!(bytes, expected_file(&[]));
        assert_eq!(bytes.len(), 33);
    }

    #[test]
    fn test_export_single_note_bytes() {
        let notes = vec![NoteEvent::new(0.0, 1.0, 60, 1.0)];

        let bytes = export_midi(&notes, &MidiExportOptions::default()).unwrap();

        let events = [
            0x00, 0x90, 0x3C, 0x7F, // note on, no delay
            0x82, 0x00, 0x80, 0x3C, 0x7F, // note off after 256 ticks
        ];
        assert_eq!(bytes, expected_file(&events));
    }

    #[test]
    fn test_export_delays_from_previous_end() {
        let notes = vec![
            NoteEvent::new(0.5, 0.25, 64, 0.5),
            NoteEvent::new(1.0, 0.5, 67, 0.8),
        ];

        let bytes = export_midi(&notes, &MidiExportOptions::default()).unwrap();

        let events = [
            0x81, 0x00, 0x90, 0x40, 0x40, // 128 ticks in, velocity 64
            0x40, 0x80, 0x40, 0x40, // held 64 ticks
            0x40, 0x90, 0x43, 0x66, // 64 ticks after the first note ends, velocity 102
            0x81, 0x00, 0x80, 0x43, 0x66, // held 128 ticks
        ];
        assert_eq!(bytes, expected_file(&events));
    }

    #[test]
    fn test_export_resorts_input() {
        let sorted = vec![
            NoteEvent::new(0.5, 0.25, 64, 0.5),
            NoteEvent::new(1.0, 0.5, 67, 0.8),
        ];
        let reversed: Vec<NoteEvent> = sorted.iter().rev().copied().collect();

        let options = MidiExportOptions::default();
        assert_eq!(
            export_midi(&sorted, &options).unwrap(),
            export_midi(&reversed, &options).unwrap()
        );
    }

    #[test]
    fn test_overlapping_notes_clamp_delay() {
        let notes = vec![
            NoteEvent::new(0.0, 0.5, 60, 0.5),
            NoteEvent::new(0.4, 0.2, 64, 0.5),
        ];

        let bytes = export_midi(&notes, &MidiExportOptions::default()).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        let track = &smf.tracks[0];

        // tempo, on, off, on, off, end
        assert_eq!(track.len(), 6);
        assert_eq!(track[3].delta.as_int(), 0);
        assert!(matches!(
            track[3].kind,
            TrackEventKind::Midi { message: MidiMessage::NoteOn { .. }, .. }
        ));
    }

    #[test]
    fn test_delay_ticks_clamps_negative() {
        assert_eq!(delay_ticks(0.4, 0.5, 256.0), 0);
        assert_eq!(delay_ticks(0.5, 0.5, 256.0), 0);
        assert_eq!(delay_ticks(1.5, 0.5, 256.0), 256);
    }

    #[test]
    fn test_duration_ticks_bounds() {
        assert_eq!(duration_ticks(1.0, 256.0), 256);
        assert_eq!(duration_ticks(0.001, 256.0), 1);
        assert_eq!(duration_ticks(0.0, 256.0), 1);
    }

    #[test]
    fn test_ticks_round_not_truncate() {
        // 0.099 * 256 = 25.344, 0.1 * 256 = 25.6
        assert_eq!(duration_ticks(0.099, 256.0), 25);
        assert_eq!(duration_ticks(0.1, 256.0), 26);
    }

    #[test]
    fn test_velocity_bounds() {
        assert_eq!(note_velocity(0.0), 1);
        assert_eq!(note_velocity(1.0), 127);
        assert_eq!(note_velocity(1.5), 127);
        assert_eq!(note_velocity(-0.3), 1);
        assert_eq!(note_velocity(0.5), 64);
    }

    #[test]
    fn test_velocity_never_zero_for_non_finite() {
        assert_eq!(note_velocity(f64::NAN), 1);
        assert_eq!(note_velocity(f64::INFINITY), 1);
        assert_eq!(note_velocity(f64::NEG_INFINITY), 1);
    }

    #[test]
    fn test_export_parses_back() {
        let notes = vec![
            NoteEvent::new(0.0, 0.3, 60, 0.6),
            NoteEvent::new(0.4, 0.3, 62, 0.6),
            NoteEvent::new(0.8, 0.6, 64, 0.9),
        ];
        let options = MidiExportOptions {
            ticks_per_beat: 480,
            tempo_bpm: 90.0,
        };

        let bytes = export_midi(&notes, &options).unwrap();
        let smf = Smf::parse(&bytes).unwrap();

        assert_eq!(smf.header.format, midly::Format::SingleTrack);
        assert_eq!(smf.header.timing, Timing::Metrical(480.into()));
        assert_eq!(smf.tracks.len(), 1);

        let track = &smf.tracks[0];
        assert_eq!(track.len(), 2 + notes.len() * 2);

        if let TrackEventKind::Meta(MetaMessage::Tempo(tempo)) = &track[0].kind {
            assert_eq!(tempo.as_int(), 666_666);
        } else {
            panic!("Expected Tempo event");
        }

        let keys: Vec<u8> = track
            .iter()
            .filter_map(|event| match &event.kind {
                TrackEventKind::Midi { channel, message: MidiMessage::NoteOn { key, .. } } => {
                    assert_eq!(channel.as_int(), 0);
                    Some(key.as_int())
                }
                _ => None,
            })
            .collect();
        assert_eq!(keys, vec![60, 62, 64]);

        assert!(matches!(track[track.len() - 1].kind, TrackEventKind::Meta(MetaMessage::EndOfTrack)));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let zero_ticks = MidiExportOptions {
            ticks_per_beat: 0,
            ..Default::default()
        };
        assert!(matches!(export_midi(&[], &zero_ticks), Err(ExportError::InvalidOptions(_))));

        let zero_tempo = MidiExportOptions {
            tempo_bpm: 0.0,
            ..Default::default()
        };
        assert!(matches!(export_midi(&[], &zero_tempo), Err(ExportError::InvalidOptions(_))));

        let too_slow = MidiExportOptions {
            tempo_bpm: 1.0,
            ..Default::default()
        };
        assert!(too_slow.validate().is_err());
    }

    #[test]
    fn test_pitch_out_of_range_rejected() {
        let notes = vec![NoteEvent::new(0.0, 0.5, 128, 0.5)];

        match export_midi(&notes, &MidiExportOptions::default()) {
            Err(ExportError::PitchOutOfRange { index, pitch }) => {
                assert_eq!(index, 0);
                assert_eq!(pitch, 128);
            }
            other => panic!("Expected PitchOutOfRange, got {:?}", other),
        }

        let negative = vec![NoteEvent::new(0.0, 0.5, -1, 0.5)];
        assert!(matches!(
            export_midi(&negative, &MidiExportOptions::default()),
            Err(ExportError::PitchOutOfRange { pitch: -1, .. })
        ));
    }

    #[test]
    fn test_non_finite_note_rejected() {
        let notes = vec![NoteEvent::new(f64::NAN, 0.5, 60, 0.5)];
        assert!(matches!(
            export_midi(&notes, &MidiExportOptions::default()),
            Err(ExportError::InvalidNote { .. })
        ));
    }
}
