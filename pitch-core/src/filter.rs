//! # Filter Stage
//!
//! Second-order (biquad) IIR filters used to band-limit a frame before
//! pitch analysis. Coefficients follow the RBJ cookbook designs for
//! high-pass and low-pass responses; processing uses a transposed
//! direct-form-II realization, which needs only two state variables and
//! behaves well numerically in 32-bit float.
//!
//! Each filter owns its delay state (`z1`, `z2`) and carries it across
//! frames. Recreating a filter with new parameters starts from cleared
//! state; the resulting discontinuity in the output is intentional.

use std::f32::consts::PI;

use crate::config::ConfigError;

/// Which frequency band a filter keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    HighPass,
    LowPass,
}

impl FilterKind {
    pub fn label(self) -> &'static str {
        match self {
            FilterKind::HighPass => "high-pass",
            FilterKind::LowPass => "low-pass",
        }
    }
}

/// A single biquad section with persistent delay state.
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    kind: FilterKind,
    cutoff_hz: f32,
    q: f32,
    // Coefficients, normalized by a0.
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    // Delay state.
    z1: f32,
    z2: f32,
}

impl BiquadFilter {
    /// Designs a filter for the given cutoff.
    ///
    /// A cutoff at or above the Nyquist frequency (`sample_rate / 2`) has no
    /// stable coefficient solution and is rejected, as are non-positive
    /// cutoff, Q, or sample rate.
    pub fn new(
        kind: FilterKind,
        cutoff_hz: f32,
        sample_rate: u32,
        q: f32,
    ) -> Result<Self, ConfigError> {
        if sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate);
        }
        let nyquist_hz = sample_rate as f32 / 2.0;
        if !cutoff_hz.is_finite() || cutoff_hz <= 0.0 || cutoff_hz >= nyquist_hz {
            return Err(ConfigError::CutoffAboveNyquist {
                filter: kind.label(),
                cutoff_hz,
                nyquist_hz,
            });
        }
        if !(q > 0.0) {
            return Err(ConfigError::InvalidQ {
                filter: kind.label(),
                q,
            });
        }

        let w0 = 2.0 * PI * cutoff_hz / sample_rate as f32;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);

        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;
        let (b0, b1, b2) = match kind {
            FilterKind::HighPass => {
                let b0 = (1.0 + cos_w0) / 2.0;
                (b0, -(1.0 + cos_w0), b0)
            }
            FilterKind::LowPass => {
                let b0 = (1.0 - cos_w0) / 2.0;
                (b0, 1.0 - cos_w0, b0)
            }
        };

        Ok(Self {
            kind,
            cutoff_hz,
            q,
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            z1: 0.0,
            z2: 0.0,
        })
    }

    /// Filters a frame in place, one sample at a time, advancing the delay
    /// state. Output length always equals input length.
    pub fn process(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            let x = *sample;
            let y = x * self.b0 + self.z1;
            self.z1 = x * self.b1 + self.z2 - self.a1 * y;
            self.z2 = x * self.b2 - self.a2 * y;
            *sample = y;
        }
    }

    /// Clears the delay state without touching the coefficients.
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn q(&self) -> f32 {
        self.q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: u32 = 44100;

    fn generate_sine(frequency: f32, sample_count: usize) -> Vec<f32> {
        (0..sample_count)
            .map(|i| (2.0 * PI * frequency * i as f32 / SAMPLE_RATE as f32).sin())
            .collect()
    }

    /// RMS of the second half of the signal, past the filter's settling.
    fn settled_rms(samples: &[f32]) -> f32 {
        let tail = &samples[samples.len() / 2..];
        (tail.iter().map(|&s| s * s).sum::<f32>() / tail.len() as f32).sqrt()
    }

    #[test]
    fn high_pass_passes_signal_above_cutoff() {
        let mut signal = generate_sine(440.0, 8192);
        let reference = settled_rms(&signal);
        let mut filter = BiquadFilter::new(FilterKind::HighPass, 80.0, SAMPLE_RATE, 0.707)
            .expect("valid filter");
        filter.process(&mut signal);
        let filtered = settled_rms(&signal);
        assert!(
            (filtered - reference).abs() / reference < 0.05,
            "passband amplitude changed by more than 5%: {filtered} vs {reference}"
        );
    }

    #[test]
    fn high_pass_attenuates_signal_below_cutoff() {
        let mut signal = generate_sine(440.0, 8192);
        let reference = settled_rms(&signal);
        let mut filter = BiquadFilter::new(FilterKind::HighPass, 8000.0, SAMPLE_RATE, 0.707)
            .expect("valid filter");
        filter.process(&mut signal);
        let filtered = settled_rms(&signal);
        assert!(
            filtered < reference * 0.1,
            "stopband amplitude not attenuated: {filtered} vs {reference}"
        );
    }

    #[test]
    fn low_pass_attenuates_signal_above_cutoff() {
        let mut signal = generate_sine(8000.0, 8192);
        let reference = settled_rms(&signal);
        let mut filter = BiquadFilter::new(FilterKind::LowPass, 440.0, SAMPLE_RATE, 0.707)
            .expect("valid filter");
        filter.process(&mut signal);
        assert!(settled_rms(&signal) < reference * 0.1);
    }

    #[test]
    fn state_persists_across_frames() {
        // Filtering one long frame and two half frames must agree exactly,
        // since the delay state carries over the frame boundary.
        let signal = generate_sine(440.0, 2048);
        let mut whole = signal.clone();
        let mut filter = BiquadFilter::new(FilterKind::HighPass, 200.0, SAMPLE_RATE, 0.707)
            .expect("valid filter");
        filter.process(&mut whole);

        let mut split = signal;
        let mut filter = BiquadFilter::new(FilterKind::HighPass, 200.0, SAMPLE_RATE, 0.707)
            .expect("valid filter");
        let (first, second) = split.split_at_mut(1024);
        filter.process(first);
        filter.process(second);

        assert_eq!(whole, split);
    }

    #[test]
    fn rejects_cutoff_at_or_above_nyquist() {
        assert!(BiquadFilter::new(FilterKind::LowPass, 22050.0, SAMPLE_RATE, 0.707).is_err());
        assert!(BiquadFilter::new(FilterKind::HighPass, 30000.0, SAMPLE_RATE, 0.707).is_err());
        assert!(BiquadFilter::new(FilterKind::HighPass, 0.0, SAMPLE_RATE, 0.707).is_err());
    }
}
