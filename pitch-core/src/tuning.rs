//! # Musical Tuning Module
//!
//! Conversions between frequencies and equal-tempered note names, based on
//! A4 = 440 Hz.
//!
//! ## Features
//! - Nearest-note mapping with a cents offset from the note's reference pitch
//! - Parsing of caller-supplied reference input, either a note name
//!   ("A4", "c#3", "Bb-1") or a plain frequency in Hz ("440")
//! - Cent deviation calculations for tuning accuracy

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Sharp-preferring note spellings, indexed by semitone within the octave.
const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Flat-preferring spellings of the same twelve semitones.
const FLAT_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// Name placeholder for input no note can be derived from.
pub const UNKNOWN_NOTE: &str = "unknown";

/// Static map from spelled note name (either table) to its semitone index.
///
/// Built once; both spellings of a semitone resolve to the same index, so
/// "C#3" and "Db3" parse to the same pitch.
static SEMITONE_MAP: Lazy<BTreeMap<&'static str, u8>> = Lazy::new(|| {
    let mut map = BTreeMap::new();
    for (i, name) in SHARP_NAMES.iter().enumerate() {
        map.insert(*name, i as u8);
    }
    for (i, name) in FLAT_NAMES.iter().enumerate() {
        map.insert(*name, i as u8);
    }
    map
});

/// The nearest equal-tempered note for a frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteInfo {
    /// Spelled note name with octave (e.g. "A4", "C#3").
    pub name: String,
    /// The note's own equal-temperament frequency in Hz.
    pub reference_frequency: f32,
    /// Rounded offset of the input from the note's reference, in cents.
    pub cents_offset: i32,
}

/// Caller-supplied reference pitch: either a literal frequency or a note
/// name still to be parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedNote {
    /// A numeric frequency in Hz.
    Hz(f32),
    /// A textual note name such as "A4" or "Eb2".
    Name(String),
}

impl ExpectedNote {
    /// Resolves this reference to a frequency, or `None` if it cannot be
    /// interpreted.
    pub fn resolve(&self) -> Option<f32> {
        match self {
            ExpectedNote::Hz(hz) => (hz.is_finite() && *hz > 0.0).then_some(*hz),
            ExpectedNote::Name(text) => parse_expected_note(text),
        }
    }

    /// The caller's raw input, echoed back for diagnostics.
    pub fn label(&self) -> String {
        match self {
            ExpectedNote::Hz(hz) => format!("{hz}"),
            ExpectedNote::Name(text) => text.clone(),
        }
    }
}

/// Maps a frequency to the nearest equal-tempered note.
///
/// The note number is `12 * log2(freq / 440) + 69` (the MIDI convention),
/// rounded to the nearest semitone; the remainder becomes the cents offset.
/// The spelling is taken from the sharp and flat tables, preferring the
/// shorter name and breaking ties toward sharps.
///
/// # Arguments
/// * `frequency` - Input frequency in Hz
///
/// # Returns
/// * `NoteInfo` for the nearest note, or the [`UNKNOWN_NOTE`] sentinel with
///   zero frequency and cents when the input is non-positive or non-finite
pub fn frequency_to_note(frequency: f32) -> NoteInfo {
    if !frequency.is_finite() || frequency <= 0.0 {
        return NoteInfo {
            name: UNKNOWN_NOTE.to_string(),
            reference_frequency: 0.0,
            cents_offset: 0,
        };
    }

    let note_number = 12.0 * (frequency / 440.0).log2() + 69.0;
    let rounded = note_number.round();
    let cents_offset = ((note_number - rounded) * 100.0).round() as i32;
    let midi = rounded as i32;

    let semitone = midi.rem_euclid(12) as usize;
    let octave = midi.div_euclid(12) - 1;
    let sharp = SHARP_NAMES[semitone];
    let flat = FLAT_NAMES[semitone];
    let spelling = if flat.len() < sharp.len() { flat } else { sharp };

    NoteInfo {
        name: format!("{spelling}{octave}"),
        reference_frequency: 440.0 * 2.0_f32.powf((midi - 69) as f32 / 12.0),
        cents_offset,
    }
}

/// Parses a reference pitch from text.
///
/// Accepts either a plain (optionally decimal) number, interpreted directly
/// as Hz, or a note name: one letter A–G in any case, an optional `#` or `b`
/// accidental, and an optional signed single-digit octave. A missing octave
/// defaults to 4. Anything else yields `None`, which callers must treat as
/// "unparseable", distinct from silence or zero.
pub fn parse_expected_note(text: &str) -> Option<f32> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Plain number: interpret directly as Hz.
    if trimmed.chars().all(|c| c.is_ascii_digit() || c == '.')
        && trimmed.chars().any(|c| c.is_ascii_digit())
    {
        return match trimmed.parse::<f32>() {
            Ok(hz) if hz > 0.0 => Some(hz),
            _ => None,
        };
    }

    let chars: Vec<char> = trimmed.chars().collect();
    let letter = chars[0].to_ascii_uppercase();
    if !('A'..='G').contains(&letter) {
        return None;
    }

    let mut index = 1;
    let mut name = String::from(letter);
    if index < chars.len() && (chars[index] == '#' || chars[index] == 'b') {
        name.push(chars[index]);
        index += 1;
    }

    let octave: i32 = if index == chars.len() {
        4
    } else {
        let negative = match chars[index] {
            '-' => {
                index += 1;
                true
            }
            '+' => {
                index += 1;
                false
            }
            _ => false,
        };
        // Exactly one digit may remain.
        if index + 1 != chars.len() {
            return None;
        }
        let digit = chars[index].to_digit(10)? as i32;
        if negative { -digit } else { digit }
    };

    let semitone = *SEMITONE_MAP.get(name.as_str())? as i32;
    let midi = semitone + (octave + 1) * 12;
    Some(440.0 * 2.0_f32.powf((midi - 69) as f32 / 12.0))
}

/// Calculates the deviation from a reference frequency in cents.
///
/// Cents are a logarithmic unit of pitch measurement where:
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values indicate sharpness, negative values indicate flatness
///
/// No rounding happens here; presentation rounding belongs at the boundary.
///
/// # Arguments
/// * `freq` - Measured frequency in Hz
/// * `target_freq` - Reference frequency in Hz
///
/// # Returns
/// * Cent deviation (positive = sharp, negative = flat)
pub fn calculate_cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}
