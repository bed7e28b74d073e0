use crate::layers::{ParamBlock, Target};
use crate::net::net::Net;
use crate::vol::volume::Volume;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LEARNING_RATE: f64 = 0.01;
pub const DEFAULT_MOMENTUM: f64 = 0.9;
pub const DEFAULT_BATCH_SIZE: usize = 1;
pub const DEFAULT_RO: f64 = 0.95;
pub const DEFAULT_EPS: f64 = 1e-8;
pub const DEFAULT_BETA1: f64 = 0.9;
pub const DEFAULT_BETA2: f64 = 0.999;
pub const DEFAULT_CLIPVAL: f64 = 5.0;

/// Gradient-descent variant applied by a [`Trainer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainerKind {
    /// Plain SGD, with classical momentum when `momentum > 0`.
    Sgd,
    /// Look-ahead momentum variant of SGD.
    Nesterov,
    /// Per-parameter learning rates from the full sum of squared gradients.
    Adagrad,
    /// Adagrad over an exponential moving-average window instead of the sum.
    Windowgrad,
    /// Paired gradient²/update² EMAs; needs no learning rate.
    Adadelta,
    /// Bias-corrected first and second moment EMAs.
    Adam,
}

/// Per-step bookkeeping returned by [`Trainer::train`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StepStats {
    /// Data loss reported by the net's loss layer.
    pub loss: f64,
    pub l1_decay_loss: f64,
    pub l2_decay_loss: f64,
    /// Fraction of gradients clipped to `[-clipval, clipval]` in the last
    /// weight update; 0 when no update happened this call.
    pub ratio_clipped: f64,
    /// Whether this call crossed a batch boundary and updated the weights.
    pub stepped: bool,
}

/// Stateful optimizer. Gradients accumulate in the net across `batch_size`
/// forward/backward calls; at the batch boundary one `step` consumes them,
/// mutates the weights in place and zeroes the gradients.
///
/// Accumulator arrays (`gsum`, and `xsum` for Adadelta/Adam) are allocated
/// lazily on the first step and stay shape-aligned with their parameter
/// blocks for the trainer's lifetime. Attaching a trainer to a different net
/// requires a [`reset`](Trainer::reset), which drops them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trainer {
    pub kind: TrainerKind,
    pub learning_rate: f64,
    pub momentum: f64,
    pub batch_size: usize,
    pub l1_decay: f64,
    pub l2_decay: f64,
    pub ro: f64,
    pub eps: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub clipval: f64,
    #[serde(skip)]
    k: u64,
    #[serde(skip)]
    pending: usize,
    #[serde(skip)]
    gsum: Vec<Vec<f64>>,
    #[serde(skip)]
    xsum: Vec<Vec<f64>>,
}

impl Trainer {
    pub fn new(kind: TrainerKind) -> Trainer {
        Trainer {
            kind,
            learning_rate: DEFAULT_LEARNING_RATE,
            momentum: DEFAULT_MOMENTUM,
            batch_size: DEFAULT_BATCH_SIZE,
            l1_decay: 0.0,
            l2_decay: 0.0,
            ro: DEFAULT_RO,
            eps: DEFAULT_EPS,
            beta1: DEFAULT_BETA1,
            beta2: DEFAULT_BETA2,
            clipval: DEFAULT_CLIPVAL,
            k: 0,
            pending: 0,
            gsum: Vec::new(),
            xsum: Vec::new(),
        }
    }

    /// Drops all accumulator state and batch progress. Must be called when
    /// re-attaching the trainer to a different net so stale accumulators are
    /// never reused.
    pub fn reset(&mut self) {
        self.k = 0;
        self.pending = 0;
        self.gsum.clear();
        self.xsum.clear();
    }

    /// Completed weight updates so far.
    pub fn steps_taken(&self) -> u64 {
        self.k
    }

    /// One training call: forward, backward, and a weight update if this call
    /// completes a mini-batch.
    pub fn train(&mut self, net: &mut Net, input: &Volume, target: Target<'_>) -> StepStats {
        net.forward(input, true);
        let loss = net.backward(target);
        let mut stats = StepStats {
            loss,
            l1_decay_loss: 0.0,
            l2_decay_loss: 0.0,
            ratio_clipped: 0.0,
            stepped: false,
        };
        self.pending += 1;
        if self.pending >= self.batch_size {
            self.pending = 0;
            self.step(net.params_and_grads(), &mut stats);
            stats.stepped = true;
        }
        stats
    }

    /// Applies one weight update directly to a set of parameter blocks.
    /// Used by the recurrent cells, whose gradient accumulation happens over
    /// an unrolled sequence rather than through a `Net`.
    pub fn step_blocks(&mut self, blocks: Vec<ParamBlock<'_>>) -> StepStats {
        let mut stats = StepStats {
            loss: 0.0,
            l1_decay_loss: 0.0,
            l2_decay_loss: 0.0,
            ratio_clipped: 0.0,
            stepped: true,
        };
        self.step(blocks, &mut stats);
        stats
    }

    fn step(&mut self, mut blocks: Vec<ParamBlock<'_>>, stats: &mut StepStats) {
        self.k += 1;
        self.ensure_accumulators(&blocks);

        let batch = self.batch_size.max(1) as f64;
        let mut clipped = 0usize;
        let mut total = 0usize;

        for (bi, block) in blocks.iter_mut().enumerate() {
            let l1_mul = self.l1_decay * block.l1_decay_mul;
            let l2_mul = self.l2_decay * block.l2_decay_mul;
            for j in 0..block.w.len() {
                let w = block.w[j];
                stats.l1_decay_loss += l1_mul * w.abs();
                stats.l2_decay_loss += 0.5 * l2_mul * w * w;
                let l1_grad = l1_mul * if w > 0.0 { 1.0 } else { -1.0 };
                let l2_grad = l2_mul * w;

                let mut g = (l1_grad + l2_grad + block.dw[j]) / batch;
                total += 1;
                if g > self.clipval {
                    g = self.clipval;
                    clipped += 1;
                } else if g < -self.clipval {
                    g = -self.clipval;
                    clipped += 1;
                }

                block.w[j] += self.update(bi, j, g);
                block.dw[j] = 0.0;
            }
        }

        stats.ratio_clipped = clipped as f64 / total.max(1) as f64;
    }

    /// Trainer-specific weight delta for one clipped gradient value.
    fn update(&mut self, bi: usize, j: usize, g: f64) -> f64 {
        match self.kind {
            TrainerKind::Sgd => {
                if self.momentum > 0.0 {
                    let dx = self.momentum * self.gsum[bi][j] - self.learning_rate * g;
                    self.gsum[bi][j] = dx;
                    dx
                } else {
                    -self.learning_rate * g
                }
            }
            TrainerKind::Nesterov => {
                let prev = self.gsum[bi][j];
                self.gsum[bi][j] = self.momentum * prev + self.learning_rate * g;
                self.momentum * prev - (1.0 + self.momentum) * self.gsum[bi][j]
            }
            TrainerKind::Adagrad => {
                self.gsum[bi][j] += g * g;
                -self.learning_rate / (self.gsum[bi][j] + self.eps).sqrt() * g
            }
            TrainerKind::Windowgrad => {
                self.gsum[bi][j] = self.ro * self.gsum[bi][j] + (1.0 - self.ro) * g * g;
                -self.learning_rate / (self.gsum[bi][j] + self.eps).sqrt() * g
            }
            TrainerKind::Adadelta => {
                self.gsum[bi][j] = self.ro * self.gsum[bi][j] + (1.0 - self.ro) * g * g;
                let dx = -((self.xsum[bi][j] + self.eps) / (self.gsum[bi][j] + self.eps)).sqrt() * g;
                self.xsum[bi][j] = self.ro * self.xsum[bi][j] + (1.0 - self.ro) * dx * dx;
                dx
            }
            TrainerKind::Adam => {
                self.gsum[bi][j] = self.beta1 * self.gsum[bi][j] + (1.0 - self.beta1) * g;
                self.xsum[bi][j] = self.beta2 * self.xsum[bi][j] + (1.0 - self.beta2) * g * g;
                let m_hat = self.gsum[bi][j] / (1.0 - self.beta1.powi(self.k as i32));
                let v_hat = self.xsum[bi][j] / (1.0 - self.beta2.powi(self.k as i32));
                -self.learning_rate * m_hat / (v_hat.sqrt() + self.eps)
            }
        }
    }

    fn ensure_accumulators(&mut self, blocks: &[ParamBlock<'_>]) {
        let needs_xsum = matches!(self.kind, TrainerKind::Adadelta | TrainerKind::Adam);
        if self.gsum.len() != blocks.len() {
            self.gsum = blocks.iter().map(|b| vec![0.0; b.w.len()]).collect();
            self.xsum = if needs_xsum {
                blocks.iter().map(|b| vec![0.0; b.w.len()]).collect()
            } else {
                Vec::new()
            };
            return;
        }
        for (acc, block) in self.gsum.iter().zip(blocks.iter()) {
            assert_eq!(
                acc.len(),
                block.w.len(),
                "trainer accumulators out of shape; call reset() when re-attaching"
            );
        }
    }
}
