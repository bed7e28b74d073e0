use crate::layers::ParamBlock;
use crate::recurrent::lstm::{bias, weight};
use crate::vol::volume::{Shape, Volume};
use serde::{Deserialize, Serialize};

/// One timestep of an unrolled vanilla RNN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RnnStep {
    pub x: Volume,
    pub h: Volume,
}

/// Time-indexed arena of unrolled RNN steps, owned by the sequence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RnnSequence {
    steps: Vec<RnnStep>,
}

impl RnnSequence {
    pub fn new() -> RnnSequence {
        RnnSequence { steps: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    pub fn step(&self, t: usize) -> &RnnStep {
        &self.steps[t]
    }

    pub fn h(&self, t: usize) -> &Volume {
        &self.steps[t].h
    }

    /// Mutable hidden state at timestep `t`, for seeding loss gradients.
    pub fn h_mut(&mut self, t: usize) -> &mut Volume {
        &mut self.steps[t].h
    }

    pub fn last_h(&self) -> Option<&Volume> {
        self.steps.last().map(|s| &s.h)
    }
}

/// Vanilla recurrent cell: `h_t = tanh(Wxh·x_t + Whh·h_{t-1} + b)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RnnCell {
    input_size: usize,
    hidden_size: usize,
    wxh: Volume,
    whh: Volume,
    b: Volume,
}

impl RnnCell {
    pub fn new(input_size: usize, hidden_size: usize) -> RnnCell {
        assert!(input_size > 0 && hidden_size > 0);
        RnnCell {
            input_size,
            hidden_size,
            wxh: Volume::xavier(Shape::new(input_size, 1, hidden_size)),
            whh: Volume::xavier(Shape::new(hidden_size, 1, hidden_size)),
            b: Volume::zeros(Shape::vector(hidden_size)),
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    /// Advances the sequence by one timestep and returns its index.
    pub fn forward(&self, seq: &mut RnnSequence, input: &[f64]) -> usize {
        assert_eq!(input.len(), self.input_size, "input length mismatch");
        let n = self.hidden_size;
        let h_prev = match seq.steps.last() {
            Some(prev) => prev.h.w.clone(),
            None => vec![0.0; n],
        };

        let mut step = RnnStep {
            x: Volume::vector(input),
            h: Volume::zeros(Shape::vector(n)),
        };
        for c in 0..n {
            let xb = c * self.input_size;
            let hb = c * n;
            let mut pre = self.b.w[c];
            for (xi, &x) in input.iter().enumerate() {
                pre += self.wxh.w[xb + xi] * x;
            }
            for (hi, &h) in h_prev.iter().enumerate() {
                pre += self.whh.w[hb + hi] * h;
            }
            step.h.w[c] = pre.tanh();
        }

        seq.steps.push(step);
        seq.steps.len() - 1
    }

    /// Backpropagation through time over the whole sequence in reverse time
    /// order. Seed loss gradients into `h.dw` of the relevant steps first.
    pub fn backward(&mut self, seq: &mut RnnSequence) {
        let n = self.hidden_size;
        let mut carry_dh = vec![0.0; n];

        for t in (0..seq.steps.len()).rev() {
            let h_prev = if t == 0 {
                vec![0.0; n]
            } else {
                seq.steps[t - 1].h.w.clone()
            };
            let step = &mut seq.steps[t];
            let mut next_dh = vec![0.0; n];

            for c in 0..n {
                let h = step.h.w[c];
                // derivative of tanh at the cached forward output
                let dpre = (step.h.dw[c] + carry_dh[c]) * (1.0 - h * h);

                let xb = c * self.input_size;
                let hb = c * n;
                for xi in 0..self.input_size {
                    self.wxh.dw[xb + xi] += dpre * step.x.w[xi];
                    step.x.dw[xi] += self.wxh.w[xb + xi] * dpre;
                }
                for hi in 0..n {
                    self.whh.dw[hb + hi] += dpre * h_prev[hi];
                    next_dh[hi] += self.whh.w[hb + hi] * dpre;
                }
                self.b.dw[c] += dpre;
            }

            carry_dh = next_dh;
        }
    }

    pub fn params_and_grads(&mut self) -> Vec<ParamBlock<'_>> {
        vec![
            weight(&mut self.wxh),
            weight(&mut self.whh),
            bias(&mut self.b),
        ]
    }
}
