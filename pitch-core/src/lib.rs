// pitch-core/src/lib.rs

//! The core signal-processing logic for the pitch detector.
//! This crate is responsible for filtering, noise control, YIN pitch
//! estimation, temporal smoothing, and note mapping. It is completely
//! headless and contains no audio I/O or GUI code: collaborators hand it
//! frames of mono float samples plus a sample rate, and receive an
//! [`AnalysisResult`] per frame.
//!
//! The usual entry point is [`engine::PitchEngine`], which wires the stages
//! into a single per-frame call. Each stage is also usable standalone:
//! RMS metering, biquad filtering, and note/frequency conversions are plain
//! functions for tooling that does not need the full engine.

pub mod config;
pub mod engine;
pub mod filter;
pub mod noise;
pub mod pitch;
pub mod smoothing;
pub mod tuning;

pub use config::{Config, ConfigError, ConfigOverrides};
pub use engine::{FrameOptions, PitchEngine};
pub use pitch::{PitchResult, YinEstimator};
pub use tuning::{ExpectedNote, NoteInfo};

/// Represents the result of a single audio analysis frame.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// The detected frequency in Hz, after smoothing if it was enabled.
    /// `None` means no lag passed the threshold test for this frame.
    pub detected_frequency: Option<f32>,
    /// The confidence of the raw detection (0.0 to 1.0); never smoothed.
    pub confidence: f32,
    /// RMS level of the filtered frame, measured before noise control.
    pub frame_rms: f32,
    /// The name of the nearest note, when a frequency was detected.
    pub note_name: Option<String>,
    /// The caller's reference input, echoed back verbatim when supplied.
    pub expected_note: Option<String>,
    /// Human-readable deviation from the reference, e.g. "+3.5 cents sharp",
    /// when both the reference resolved and a frequency was detected.
    pub deviation: Option<String>,
}
