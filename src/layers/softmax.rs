use crate::layers::{LossLayer, Target};
use crate::vol::volume::{Shape, Volume};
use serde::{Deserialize, Serialize};

/// Small epsilon added inside log() to prevent log(0) = -inf.
const EPS: f64 = 1e-12;

/// Softmax classification loss layer.
///
/// Forward produces a probability distribution over classes using the
/// max-subtraction trick for numerical stability. Backward takes the target
/// class index and returns the cross-entropy loss `-ln p[target]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxLayer {
    out: Shape,
}

impl SoftmaxLayer {
    pub fn new(class_count: usize) -> SoftmaxLayer {
        assert!(class_count > 0, "softmax needs at least one class");
        SoftmaxLayer {
            out: Shape::vector(class_count),
        }
    }
}

impl LossLayer for SoftmaxLayer {
    fn out_shape(&self) -> Shape {
        self.out
    }

    fn forward(&mut self, input: &Volume, output: &mut Volume, _training: bool) {
        let max = input.w.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mut sum = 0.0;
        for (o, &x) in output.w.iter_mut().zip(input.w.iter()) {
            *o = (x - max).exp();
            sum += *o;
        }
        for o in output.w.iter_mut() {
            *o /= sum;
        }
    }

    fn backward(&mut self, input: &mut Volume, output: &Volume, target: Target<'_>) -> f64 {
        let y = match target {
            Target::Class(y) => y,
            _ => panic!("softmax loss requires a class target"),
        };
        assert!(y < self.out.depth, "target class {y} out of range");
        for i in 0..input.dw.len() {
            let indicator = if i == y { 1.0 } else { 0.0 };
            input.dw[i] += output.w[i] - indicator;
        }
        -(output.w[y] + EPS).ln()
    }

    fn wants_class(&self) -> bool {
        true
    }
}
