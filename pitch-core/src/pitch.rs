//! # Pitch Detection Module
//!
//! This module implements the YIN pitch detection algorithm for monophonic
//! audio frames.
//!
//! ## Features
//! - Difference function and cumulative mean normalized difference (CMND)
//! - Absolute-threshold candidate search biased against octave errors
//! - Parabolic interpolation for sub-sample accuracy
//! - Confidence estimate derived from the CMND value at the chosen lag
//!
//! The estimator is a pure function of its inputs; the only state it keeps
//! is a scratch buffer reused across calls to avoid per-frame allocation.

/// The outcome of analyzing one frame.
///
/// A missing frequency is not an error: it means no candidate period passed
/// the threshold test, which is the expected result for silence and noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchResult {
    /// Detected fundamental frequency in Hz, if any.
    pub frequency: Option<f32>,
    /// How clearly periodic the frame was at the chosen lag, 0.0 to 1.0.
    /// This is `1 - d'(tau)`, an inverse of the normalized dissimilarity,
    /// not a calibrated probability.
    pub confidence: f32,
}

impl PitchResult {
    /// The no-detection result: missing frequency, zero confidence.
    pub fn none() -> Self {
        Self {
            frequency: None,
            confidence: 0.0,
        }
    }
}

/// A YIN pitch estimator with a reusable per-lag working buffer.
///
/// One estimator belongs to one stream; concurrent streams each get their
/// own instance so the scratch buffer is never shared.
#[derive(Debug)]
pub struct YinEstimator {
    buffer: Vec<f32>,
}

impl YinEstimator {
    /// Creates an estimator sized for frames of `frame_size` samples.
    /// Longer frames are still accepted; the buffer grows to fit.
    pub fn new(frame_size: usize) -> Self {
        Self {
            buffer: vec![0.0; frame_size / 2],
        }
    }

    /// Runs YIN over one frame.
    ///
    /// # Arguments
    /// * `signal` - Mono audio frame, roughly in [-1, 1]
    /// * `sample_rate` - Sample rate in Hz
    /// * `threshold` - Absolute CMND threshold, typically 0.10
    ///
    /// # Returns
    /// * `PitchResult` with the detected frequency and confidence, or the
    ///   no-detection result if no lag's CMND value fell under the threshold
    pub fn detect(&mut self, signal: &[f32], sample_rate: u32, threshold: f32) -> PitchResult {
        let half_length = signal.len() / 2;
        // Fewer than 4 samples leaves no lag to test.
        if half_length < 2 {
            return PitchResult::none();
        }
        if self.buffer.len() < half_length {
            self.buffer.resize(half_length, 0.0);
        }
        let yin_buffer = &mut self.buffer[..half_length];

        // --- Step 1: Difference function ---
        // d(tau) over the first half of the frame, so i + tau stays in bounds.
        for tau in 1..half_length {
            let mut diff = 0.0;
            for i in 0..half_length {
                let delta = signal[i] - signal[i + tau];
                diff += delta * delta;
            }
            yin_buffer[tau] = diff;
        }

        // --- Step 2: Cumulative mean normalized difference ---
        // Rescales each d(tau) by its own running average, producing a curve
        // that dips toward 0 near the true period. The tau = 0 sentinel
        // avoids a divide-by-zero and never matches the threshold.
        yin_buffer[0] = 1.0;
        let mut running_sum = 0.0;
        for tau in 1..half_length {
            running_sum += yin_buffer[tau];
            if running_sum != 0.0 {
                yin_buffer[tau] *= tau as f32 / running_sum;
            } else {
                // All-zero frame: the running sum never grows. Pin the curve
                // above any threshold so silence reports no detection.
                yin_buffer[tau] = 1.0;
            }
        }

        // --- Step 3: Absolute threshold search ---
        // Take the first lag under the threshold, then walk forward to the
        // local minimum just past the crossing. Favoring the first, shortest
        // period under threshold resists detecting a harmonic instead of
        // the fundamental.
        let mut period = 0;
        let mut tau = 2;
        while tau < half_length {
            if yin_buffer[tau] < threshold {
                while tau + 1 < half_length && yin_buffer[tau + 1] < yin_buffer[tau] {
                    tau += 1;
                }
                period = tau;
                break;
            }
            tau += 1;
        }
        if period == 0 {
            return PitchResult::none();
        }

        // --- Step 4: Parabolic interpolation for sub-sample accuracy ---
        let s1 = yin_buffer[period];
        let s0 = yin_buffer[period - 1];
        let s2 = if period + 1 < half_length {
            yin_buffer[period + 1]
        } else {
            s1
        };
        let denominator = 2.0 * (2.0 * s1 - s2 - s0);
        let refined_period = if denominator.abs() > f32::EPSILON {
            period as f32 + (s2 - s0) / denominator
        } else {
            period as f32
        };

        // --- Step 5: Convert to frequency and confidence ---
        // Confidence uses the un-refined integer lag.
        let frequency = sample_rate as f32 / refined_period;
        if !frequency.is_finite() || frequency <= 0.0 {
            return PitchResult::none();
        }
        PitchResult {
            frequency: Some(frequency),
            confidence: (1.0 - s1).clamp(0.0, 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 44100;
    const THRESHOLD: f32 = 0.10;

    fn generate_sine(frequency: f32, sample_count: usize) -> Vec<f32> {
        (0..sample_count)
            .map(|i| {
                (2.0 * core::f32::consts::PI * frequency * i as f32 / SAMPLE_RATE as f32).sin()
            })
            .collect()
    }

    #[test]
    fn detects_sine_within_one_percent() {
        for frequency in [110.0, 220.0, 440.0, 880.0] {
            let signal = generate_sine(frequency, 2048);
            let mut estimator = YinEstimator::new(signal.len());
            let result = estimator.detect(&signal, SAMPLE_RATE, THRESHOLD);
            let detected = result.frequency.expect("sine should be detected");
            assert!(
                (detected - frequency).abs() / frequency < 0.01,
                "detected {detected} Hz for a {frequency} Hz sine"
            );
            assert!(
                result.confidence > 0.8,
                "low confidence {} for a pure sine",
                result.confidence
            );
        }
    }

    #[test]
    fn silent_frame_reports_no_detection() {
        let signal = vec![0.0; 2048];
        let mut estimator = YinEstimator::new(signal.len());
        let result = estimator.detect(&signal, SAMPLE_RATE, THRESHOLD);
        assert_eq!(result, PitchResult::none());
    }

    #[test]
    fn short_frame_reports_no_detection() {
        let mut estimator = YinEstimator::new(2048);
        for samples in [0, 1, 2, 3] {
            let signal = vec![0.3; samples];
            assert_eq!(
                estimator.detect(&signal, SAMPLE_RATE, THRESHOLD),
                PitchResult::none()
            );
        }
    }

    #[test]
    fn noise_reports_no_detection() {
        // A deterministic pseudo-random signal with no periodic structure.
        let mut state: u32 = 0x1234_5678;
        let signal: Vec<f32> = (0..2048)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 8) as f32 / (1 << 24) as f32 * 2.0 - 1.0
            })
            .collect();
        let mut estimator = YinEstimator::new(signal.len());
        let result = estimator.detect(&signal, SAMPLE_RATE, 0.05);
        assert!(result.frequency.is_none());
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn estimator_buffer_is_reusable_across_frames() {
        let mut estimator = YinEstimator::new(2048);
        let first = generate_sine(440.0, 2048);
        let second = generate_sine(523.25, 2048);
        let a = estimator.detect(&first, SAMPLE_RATE, THRESHOLD);
        let b = estimator.detect(&second, SAMPLE_RATE, THRESHOLD);
        let a = a.frequency.expect("440 Hz sine detected");
        let b = b.frequency.expect("523 Hz sine detected");
        assert!((a - 440.0).abs() / 440.0 < 0.01);
        assert!((b - 523.25).abs() / 523.25 < 0.01);
    }
}
