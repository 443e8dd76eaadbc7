//! Analysis configuration.
//!
//! All tunable parameters of the per-frame pipeline live in [`Config`].
//! A config is merged with defaults and validated once, up front; the
//! processing stages never mutate it. Partial updates (engine construction,
//! runtime reconfiguration, per-call overrides) are expressed as a
//! [`ConfigOverrides`] value and resolved through a single shallow merge.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors detected eagerly at configuration or engine-construction time.
///
/// Per-frame conditions (no detection, silence, unparseable reference input)
/// are never errors; they are reported as data in the analysis result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("sample rate must be positive")]
    InvalidSampleRate,
    #[error("frame size must be a nonzero power of two, got {0}")]
    InvalidFrameSize(usize),
    #[error("{filter} cutoff {cutoff_hz} Hz must lie below the Nyquist frequency {nyquist_hz} Hz (0 disables)")]
    CutoffAboveNyquist {
        filter: &'static str,
        cutoff_hz: f32,
        nyquist_hz: f32,
    },
    #[error("{filter} Q must be positive, got {q}")]
    InvalidQ { filter: &'static str, q: f32 },
    #[error("{name} must lie in [0, 1], got {value}")]
    RmsOutOfRange { name: &'static str, value: f32 },
    #[error("median window size must be at least 1")]
    InvalidMedianWindow,
    #[error("moving average alpha must lie in (0, 1], got {0}")]
    InvalidAlpha(f32),
    #[error("detection threshold must lie in (0, 1), got {0}")]
    InvalidThreshold(f32),
}

/// Pipeline configuration, immutable for the duration of a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// High-pass cutoff frequency in Hz (default: 80.0). 0 disables the filter.
    pub high_pass_cutoff_hz: f32,
    /// Low-pass cutoff frequency in Hz (default: 0.0, disabled). 0 disables the filter.
    pub low_pass_cutoff_hz: f32,
    /// High-pass filter Q (default: 0.707, Butterworth).
    pub high_pass_q: f32,
    /// Low-pass filter Q (default: 0.707, Butterworth).
    pub low_pass_q: f32,

    /// Enable the soft noise gate (default: true).
    pub noise_gate_enabled: bool,
    /// RMS level below which the gate attenuates, in [0, 1] (default: 0.01).
    pub noise_gate_threshold_rms: f32,
    /// Enable amplitude normalization (default: true).
    pub normalization_enabled: bool,
    /// RMS level normalization scales toward, in [0, 1] (default: 0.1).
    pub normalization_target_rms: f32,

    /// Enable the sliding-window median smoother (default: true).
    pub median_smoothing_enabled: bool,
    /// Number of recent detections in the median window, at least 1 (default: 5).
    pub median_window_size: usize,
    /// Enable the exponential moving average (default: true).
    pub moving_average_enabled: bool,
    /// EMA weight of the newest value, in (0, 1] (default: 0.25).
    /// Lower alpha adapts more slowly.
    pub moving_average_alpha: f32,

    /// Expected samples per frame, a power of two (default: 2048).
    pub frame_size: usize,
    /// Absolute threshold for the normalized difference curve, in (0, 1)
    /// (default: 0.10). Lower values demand a cleaner periodicity.
    pub yin_threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            high_pass_cutoff_hz: 80.0,
            low_pass_cutoff_hz: 0.0,
            high_pass_q: 0.707,
            low_pass_q: 0.707,
            noise_gate_enabled: true,
            noise_gate_threshold_rms: 0.01,
            normalization_enabled: true,
            normalization_target_rms: 0.1,
            median_smoothing_enabled: true,
            median_window_size: 5,
            moving_average_enabled: true,
            moving_average_alpha: 0.25,
            frame_size: 2048,
            yin_threshold: 0.10,
        }
    }
}

impl Config {
    /// Resolves a partial override against this config.
    ///
    /// The merge is shallow: every supplied field fully replaces the stored
    /// value, every absent field is preserved. This is the only merge
    /// operation in the crate; engine construction, runtime updates and
    /// per-call overrides all go through it.
    pub fn merged(&self, overrides: &ConfigOverrides) -> Config {
        Config {
            high_pass_cutoff_hz: overrides.high_pass_cutoff_hz.unwrap_or(self.high_pass_cutoff_hz),
            low_pass_cutoff_hz: overrides.low_pass_cutoff_hz.unwrap_or(self.low_pass_cutoff_hz),
            high_pass_q: overrides.high_pass_q.unwrap_or(self.high_pass_q),
            low_pass_q: overrides.low_pass_q.unwrap_or(self.low_pass_q),
            noise_gate_enabled: overrides.noise_gate_enabled.unwrap_or(self.noise_gate_enabled),
            noise_gate_threshold_rms: overrides
                .noise_gate_threshold_rms
                .unwrap_or(self.noise_gate_threshold_rms),
            normalization_enabled: overrides
                .normalization_enabled
                .unwrap_or(self.normalization_enabled),
            normalization_target_rms: overrides
                .normalization_target_rms
                .unwrap_or(self.normalization_target_rms),
            median_smoothing_enabled: overrides
                .median_smoothing_enabled
                .unwrap_or(self.median_smoothing_enabled),
            median_window_size: overrides.median_window_size.unwrap_or(self.median_window_size),
            moving_average_enabled: overrides
                .moving_average_enabled
                .unwrap_or(self.moving_average_enabled),
            moving_average_alpha: overrides
                .moving_average_alpha
                .unwrap_or(self.moving_average_alpha),
            frame_size: overrides.frame_size.unwrap_or(self.frame_size),
            yin_threshold: overrides.yin_threshold.unwrap_or(self.yin_threshold),
        }
    }

    /// Checks the config against a sample rate before it enters the
    /// per-frame hot path.
    pub fn validate(&self, sample_rate: u32) -> Result<(), ConfigError> {
        if sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate);
        }
        if self.frame_size == 0 || !self.frame_size.is_power_of_two() {
            return Err(ConfigError::InvalidFrameSize(self.frame_size));
        }

        let nyquist_hz = sample_rate as f32 / 2.0;
        for (filter, cutoff_hz, q) in [
            ("high-pass", self.high_pass_cutoff_hz, self.high_pass_q),
            ("low-pass", self.low_pass_cutoff_hz, self.low_pass_q),
        ] {
            // 0 disables the filter and is always valid.
            if cutoff_hz != 0.0
                && (!cutoff_hz.is_finite() || cutoff_hz < 0.0 || cutoff_hz >= nyquist_hz)
            {
                return Err(ConfigError::CutoffAboveNyquist {
                    filter,
                    cutoff_hz,
                    nyquist_hz,
                });
            }
            if !(q > 0.0) {
                return Err(ConfigError::InvalidQ { filter, q });
            }
        }

        for (name, value) in [
            ("noise gate threshold", self.noise_gate_threshold_rms),
            ("normalization target", self.normalization_target_rms),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::RmsOutOfRange { name, value });
            }
        }

        if self.median_window_size == 0 {
            return Err(ConfigError::InvalidMedianWindow);
        }
        if !(self.moving_average_alpha > 0.0 && self.moving_average_alpha <= 1.0) {
            return Err(ConfigError::InvalidAlpha(self.moving_average_alpha));
        }
        if !(self.yin_threshold > 0.0 && self.yin_threshold < 1.0) {
            return Err(ConfigError::InvalidThreshold(self.yin_threshold));
        }
        Ok(())
    }
}

/// A partial config: every field optional, absent fields fall through to the
/// value being overridden. See [`Config::merged`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigOverrides {
    pub high_pass_cutoff_hz: Option<f32>,
    pub low_pass_cutoff_hz: Option<f32>,
    pub high_pass_q: Option<f32>,
    pub low_pass_q: Option<f32>,
    pub noise_gate_enabled: Option<bool>,
    pub noise_gate_threshold_rms: Option<f32>,
    pub normalization_enabled: Option<bool>,
    pub normalization_target_rms: Option<f32>,
    pub median_smoothing_enabled: Option<bool>,
    pub median_window_size: Option<usize>,
    pub moving_average_enabled: Option<bool>,
    pub moving_average_alpha: Option<f32>,
    pub frame_size: Option<usize>,
    pub yin_threshold: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate(44100).is_ok());
    }

    #[test]
    fn merge_replaces_only_supplied_fields() {
        let base = Config::default();
        let merged = base.merged(&ConfigOverrides {
            low_pass_cutoff_hz: Some(5000.0),
            median_window_size: Some(7),
            ..Default::default()
        });
        assert_eq!(merged.low_pass_cutoff_hz, 5000.0);
        assert_eq!(merged.median_window_size, 7);
        assert_eq!(merged.high_pass_cutoff_hz, base.high_pass_cutoff_hz);
        assert_eq!(merged.moving_average_alpha, base.moving_average_alpha);
    }

    #[test]
    fn rejects_cutoff_at_nyquist() {
        let config = Config {
            high_pass_cutoff_hz: 22050.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(44100),
            Err(ConfigError::CutoffAboveNyquist { filter: "high-pass", .. })
        ));
    }

    #[test]
    fn rejects_bad_frame_size_and_sample_rate() {
        let config = Config {
            frame_size: 1000,
            ..Default::default()
        };
        assert_eq!(config.validate(44100), Err(ConfigError::InvalidFrameSize(1000)));
        assert_eq!(
            Config::default().validate(0),
            Err(ConfigError::InvalidSampleRate)
        );
    }

    #[test]
    fn rejects_out_of_range_stage_parameters() {
        let gate = Config {
            noise_gate_threshold_rms: 1.5,
            ..Default::default()
        };
        assert!(matches!(gate.validate(48000), Err(ConfigError::RmsOutOfRange { .. })));

        let alpha = Config {
            moving_average_alpha: 0.0,
            ..Default::default()
        };
        assert_eq!(alpha.validate(48000), Err(ConfigError::InvalidAlpha(0.0)));

        let threshold = Config {
            yin_threshold: 1.0,
            ..Default::default()
        };
        assert_eq!(threshold.validate(48000), Err(ConfigError::InvalidThreshold(1.0)));
    }
}
