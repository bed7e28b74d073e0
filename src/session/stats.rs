use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Per-tick training statistics, also emitted over the session's optional
/// progress channel so callers can drive charts and progress indicators.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TickStats {
    /// 1-based training step number.
    pub step: u64,
    /// Data loss of this step.
    pub loss: f64,
    /// Running average over the recent loss window.
    pub loss_average: f64,
    /// Fraction of gradients clipped in this step's weight update, if any.
    pub ratio_clipped: f64,
}

/// Running average over the most recent losses.
#[derive(Debug, Clone)]
pub(crate) struct LossWindow {
    values: VecDeque<f64>,
    cap: usize,
}

impl LossWindow {
    pub fn new(cap: usize) -> LossWindow {
        assert!(cap > 0);
        LossWindow {
            values: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn push(&mut self, loss: f64) {
        if self.values.len() == self.cap {
            self.values.pop_front();
        }
        self.values.push_back(loss);
    }

    pub fn average(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_slides() {
        let mut w = LossWindow::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            w.push(v);
        }
        assert!((w.average() - 3.0).abs() < 1e-12);
    }
}
