use crate::layers::Layer;
use crate::vol::volume::{Shape, Volume};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Inverted dropout. During training a Bernoulli(`drop_prob`) subset of
/// activations is zeroed and the survivors are scaled by `1/(1-drop_prob)`;
/// the recorded mask routes gradients the same way on backward. At inference
/// the layer is a strict identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropoutLayer {
    out: Shape,
    drop_prob: f64,
    #[serde(skip)]
    mask: Vec<bool>,
}

impl DropoutLayer {
    pub fn new(in_shape: Shape, drop_prob: f64) -> DropoutLayer {
        assert!(
            (0.0..1.0).contains(&drop_prob),
            "drop_prob must be in [0, 1)"
        );
        DropoutLayer {
            out: in_shape,
            drop_prob,
            mask: vec![false; in_shape.len()],
        }
    }
}

impl Layer for DropoutLayer {
    fn out_shape(&self) -> Shape {
        self.out
    }

    fn forward(&mut self, input: &Volume, output: &mut Volume, training: bool) {
        if !training {
            output.w.copy_from_slice(&input.w);
            return;
        }
        if self.mask.len() != self.out.len() {
            self.mask = vec![false; self.out.len()];
        }
        let scale = 1.0 / (1.0 - self.drop_prob);
        let mut rng = rand::thread_rng();
        for i in 0..input.w.len() {
            let dropped = rng.gen::<f64>() < self.drop_prob;
            self.mask[i] = dropped;
            output.w[i] = if dropped { 0.0 } else { input.w[i] * scale };
        }
    }

    fn backward(&mut self, input: &mut Volume, output: &Volume) {
        let scale = 1.0 / (1.0 - self.drop_prob);
        for i in 0..input.dw.len() {
            if !self.mask[i] {
                input.dw[i] += output.dw[i] * scale;
            }
        }
    }
}
