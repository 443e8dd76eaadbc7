//! Temporal smoothing of the detected frequency stream.
//!
//! Two stages compose in a fixed order: a sliding-window median rejects
//! single-frame spikes, then an exponential moving average removes the
//! residual jitter. Both operate on frequency values only; confidence is
//! never smoothed.

use std::collections::VecDeque;

/// Sliding-window median over the most recent values.
///
/// The window is a bounded FIFO: each push appends the newest value and
/// evicts the oldest once the window is full.
#[derive(Debug, Clone)]
pub struct MedianSmoother {
    window: VecDeque<f32>,
    capacity: usize,
}

impl MedianSmoother {
    pub fn new(window_size: usize) -> Self {
        let capacity = window_size.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Pushes a value and returns the median of the current window.
    ///
    /// The median is the middle element of a sorted copy; for even window
    /// lengths the element at index `len / 2` is used.
    pub fn push(&mut self, value: f32) -> f32 {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(value);

        let mut sorted: Vec<f32> = self.window.iter().copied().collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        sorted[sorted.len() / 2]
    }

    pub fn window_size(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}

/// Exponential moving average with a single running value.
///
/// The first push initializes the state to the input unchanged; later pushes
/// compute `alpha * value + (1 - alpha) * state`. Lower alpha adapts more
/// slowly.
#[derive(Debug, Clone)]
pub struct ExponentialSmoother {
    alpha: f32,
    state: Option<f32>,
}

impl ExponentialSmoother {
    pub fn new(alpha: f32) -> Self {
        Self { alpha, state: None }
    }

    pub fn push(&mut self, value: f32) -> f32 {
        let smoothed = match self.state {
            Some(previous) => self.alpha * value + (1.0 - self.alpha) * previous,
            None => value,
        };
        self.state = Some(smoothed);
        smoothed
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_rejects_single_frame_spike() {
        let mut smoother = MedianSmoother::new(3);
        let outputs: Vec<f32> = [100.0, 100.0, 100.0, 500.0, 100.0]
            .iter()
            .map(|&v| smoother.push(v))
            .collect();
        assert_eq!(outputs, vec![100.0, 100.0, 100.0, 100.0, 100.0]);
    }

    #[test]
    fn median_window_evicts_oldest() {
        let mut smoother = MedianSmoother::new(3);
        smoother.push(100.0);
        smoother.push(200.0);
        smoother.push(300.0);
        // 100 falls out of the window; the median of [200, 300, 400] is 300.
        assert_eq!(smoother.push(400.0), 300.0);
        assert_eq!(smoother.len(), 3);
    }

    #[test]
    fn median_of_single_value_window() {
        let mut smoother = MedianSmoother::new(1);
        assert_eq!(smoother.push(123.0), 123.0);
        assert_eq!(smoother.push(456.0), 456.0);
    }

    #[test]
    fn ema_initializes_then_averages() {
        let mut smoother = ExponentialSmoother::new(0.5);
        assert_eq!(smoother.push(100.0), 100.0);
        assert_eq!(smoother.push(200.0), 150.0);
    }

    #[test]
    fn lower_alpha_adapts_more_slowly() {
        let mut fast = ExponentialSmoother::new(0.9);
        let mut slow = ExponentialSmoother::new(0.1);
        fast.push(100.0);
        slow.push(100.0);
        let fast_out = fast.push(200.0);
        let slow_out = slow.push(200.0);
        assert!(fast_out > slow_out);
    }

    #[test]
    fn reset_forgets_history() {
        let mut smoother = ExponentialSmoother::new(0.5);
        smoother.push(100.0);
        smoother.reset();
        assert_eq!(smoother.push(300.0), 300.0);
    }
}
