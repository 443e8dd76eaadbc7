//! # Pitch Engine
//!
//! The per-frame orchestrator. One engine owns the whole processing chain
//! for one audio stream: filters, noise control, the YIN estimator, and the
//! frequency smoothers. Each call to [`PitchEngine::process_frame`] runs the
//! stages in a fixed order: filtering, RMS metering, noise control, pitch
//! detection, smoothing, note mapping, and deviation from the caller's
//! reference pitch.
//!
//! Only the filters and smoothers carry memory across frames, so an engine
//! must see its frames in temporal order and is not safe to share between
//! threads without external locking. Independent streams get independent
//! engines.

use log::{debug, trace};

use crate::config::{Config, ConfigError, ConfigOverrides};
use crate::filter::{BiquadFilter, FilterKind};
use crate::noise;
use crate::pitch::YinEstimator;
use crate::smoothing::{ExponentialSmoother, MedianSmoother};
use crate::tuning::{self, ExpectedNote};
use crate::AnalysisResult;

/// Per-call options for [`PitchEngine::process_frame`].
#[derive(Debug, Clone)]
pub struct FrameOptions {
    /// Reference pitch to compare the detection against.
    pub expected_note: Option<ExpectedNote>,
    /// Whether the smoothing stage runs for this frame.
    pub smoothing: bool,
    /// Per-call config override, merged shallowly over the engine's stored
    /// configuration for this frame only.
    pub advanced_config: Option<ConfigOverrides>,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            expected_note: None,
            smoothing: true,
            advanced_config: None,
        }
    }
}

/// A streaming pitch analyzer for a single mono audio stream.
pub struct PitchEngine {
    sample_rate: u32,
    config: Config,
    high_pass: Option<BiquadFilter>,
    low_pass: Option<BiquadFilter>,
    estimator: YinEstimator,
    median: MedianSmoother,
    average: ExponentialSmoother,
}

impl PitchEngine {
    /// Creates an engine for the given sample rate.
    ///
    /// `overrides` are merged over the built-in defaults; the merged config
    /// is validated eagerly so configuration mistakes surface here rather
    /// than in the per-frame hot path.
    pub fn new(sample_rate: u32, overrides: Option<ConfigOverrides>) -> Result<Self, ConfigError> {
        let config = match overrides {
            Some(ref partial) => Config::default().merged(partial),
            None => Config::default(),
        };
        config.validate(sample_rate)?;
        debug!(
            "pitch engine: sample rate {sample_rate} Hz, frame size {}",
            config.frame_size
        );
        Ok(Self {
            sample_rate,
            estimator: YinEstimator::new(config.frame_size),
            median: MedianSmoother::new(config.median_window_size),
            average: ExponentialSmoother::new(config.moving_average_alpha),
            high_pass: None,
            low_pass: None,
            config,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyzes one frame of mono samples.
    ///
    /// Every per-frame condition is reported as data in the result record;
    /// a silent frame, an undetectable pitch, or an unparseable reference
    /// never interrupt a streaming caller.
    pub fn process_frame(&mut self, frame: &[f32], options: &FrameOptions) -> AnalysisResult {
        let effective = match options.advanced_config {
            Some(ref partial) => self.config.merged(partial),
            None => self.config.clone(),
        };

        let mut samples = frame.to_vec();

        // 1. Band-limit. A filter is rebuilt only when its parameters
        // changed; rebuilding clears its delay state on purpose.
        Self::ensure_filter(
            &mut self.high_pass,
            FilterKind::HighPass,
            effective.high_pass_cutoff_hz,
            effective.high_pass_q,
            self.sample_rate,
        );
        Self::ensure_filter(
            &mut self.low_pass,
            FilterKind::LowPass,
            effective.low_pass_cutoff_hz,
            effective.low_pass_q,
            self.sample_rate,
        );
        if let Some(filter) = self.high_pass.as_mut() {
            filter.process(&mut samples);
        }
        if let Some(filter) = self.low_pass.as_mut() {
            filter.process(&mut samples);
        }

        // 2. Signal level after filtering but before noise control, so the
        // caller sees the level normalization is about to act on.
        let frame_rms = noise::calculate_rms(&samples);

        // 3. Normalization, then gating.
        noise::apply_noise_control(&mut samples, &effective);

        // 4. Pitch estimation.
        let detection = self
            .estimator
            .detect(&samples, self.sample_rate, effective.yin_threshold);

        // 5. Smoothing, on detections only. A no-detection frame leaves the
        // smoother state untouched (carry-through across gaps).
        let frequency = match detection.frequency {
            Some(detected) if options.smoothing => {
                let mut value = detected;
                if effective.median_smoothing_enabled {
                    value = self.median.push(value);
                }
                if effective.moving_average_enabled {
                    value = self.average.push(value);
                }
                Some(value)
            }
            other => other,
        };
        trace!(
            "frame: rms {frame_rms:.4}, raw {:?} Hz, smoothed {frequency:?} Hz",
            detection.frequency
        );

        // 6. Note mapping.
        let note_name = frequency.map(|f| tuning::frequency_to_note(f).name);

        // 7. Deviation from the caller's reference, when both resolve.
        let (expected_note, deviation) = match options.expected_note {
            Some(ref expected) => {
                let deviation = match (expected.resolve(), frequency) {
                    (Some(reference), Some(detected)) => {
                        let cents = tuning::calculate_cents_deviation(detected, reference);
                        Some(format_deviation(cents))
                    }
                    _ => None,
                };
                (Some(expected.label()), deviation)
            }
            None => (None, None),
        };

        AnalysisResult {
            detected_frequency: frequency,
            confidence: detection.confidence,
            frame_rms,
            note_name,
            expected_note,
            deviation,
        }
    }

    /// Shallow-merges new fields into the stored configuration.
    ///
    /// Changing `median_window_size` or `moving_average_alpha` reconstructs
    /// the corresponding smoother with fresh, empty state, a deliberate
    /// discontinuity in the smoothed signal at the moment of
    /// reconfiguration. Filters pick up parameter changes on the next frame.
    pub fn update_config(&mut self, overrides: ConfigOverrides) -> Result<(), ConfigError> {
        let merged = self.config.merged(&overrides);
        merged.validate(self.sample_rate)?;

        if merged.median_window_size != self.config.median_window_size {
            debug!(
                "median window {} -> {}, resetting smoother",
                self.config.median_window_size, merged.median_window_size
            );
            self.median = MedianSmoother::new(merged.median_window_size);
        }
        if merged.moving_average_alpha != self.config.moving_average_alpha {
            debug!(
                "moving average alpha {} -> {}, resetting smoother",
                self.config.moving_average_alpha, merged.moving_average_alpha
            );
            self.average = ExponentialSmoother::new(merged.moving_average_alpha);
        }
        if merged.frame_size != self.config.frame_size {
            self.estimator = YinEstimator::new(merged.frame_size);
        }

        self.config = merged;
        Ok(())
    }

    /// Keeps a filter slot in sync with the effective config: absent while
    /// its cutoff is 0, rebuilt when parameters change, otherwise reused so
    /// its delay state persists across frames.
    ///
    /// A per-call override can still ask for an unbuildable filter (cutoff
    /// at or past Nyquist); that frame is processed with the filter bypassed
    /// rather than faulting mid-stream.
    fn ensure_filter(
        slot: &mut Option<BiquadFilter>,
        kind: FilterKind,
        cutoff_hz: f32,
        q: f32,
        sample_rate: u32,
    ) {
        if cutoff_hz <= 0.0 {
            *slot = None;
            return;
        }
        if let Some(existing) = slot {
            if existing.cutoff_hz() == cutoff_hz && existing.q() == q {
                return;
            }
        }
        match BiquadFilter::new(kind, cutoff_hz, sample_rate, q) {
            Ok(filter) => {
                debug!("{} filter at {cutoff_hz} Hz (Q {q})", kind.label());
                *slot = Some(filter);
            }
            Err(err) => {
                debug!("{} filter bypassed: {err}", kind.label());
                *slot = None;
            }
        }
    }
}

/// Renders a signed cents deviation as "<sign><magnitude> cents sharp|flat"
/// with the magnitude to one decimal place.
fn format_deviation(cents: f32) -> String {
    if cents >= 0.0 {
        format!("+{cents:.1} cents sharp")
    } else {
        format!("-{:.1} cents flat", cents.abs())
    }
}
