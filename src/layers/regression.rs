use crate::layers::{LossLayer, Target};
use crate::vol::volume::{Shape, Volume};
use serde::{Deserialize, Serialize};

/// Squared-error regression loss layer. Forward is the identity; backward
/// takes the target vector and produces `d_in[i] = importance[i] * (out[i] -
/// y[i])`, returning the loss `Σ ½·importance[i]·(out[i] - y[i])²`.
///
/// `importance` optionally weights dimensions that matter more; when absent
/// every dimension weighs 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionLayer {
    out: Shape,
    importance: Option<Vec<f64>>,
}

impl RegressionLayer {
    pub fn new(dim: usize) -> RegressionLayer {
        RegressionLayer {
            out: Shape::vector(dim),
            importance: None,
        }
    }

    pub fn with_importance(dim: usize, importance: Vec<f64>) -> RegressionLayer {
        assert_eq!(
            importance.len(),
            dim,
            "importance weights must match output dimension"
        );
        RegressionLayer {
            out: Shape::vector(dim),
            importance: Some(importance),
        }
    }

    fn weight(&self, i: usize) -> f64 {
        self.importance.as_ref().map_or(1.0, |imp| imp[i])
    }
}

impl LossLayer for RegressionLayer {
    fn out_shape(&self) -> Shape {
        self.out
    }

    fn forward(&mut self, input: &Volume, output: &mut Volume, _training: bool) {
        output.w.copy_from_slice(&input.w);
    }

    fn backward(&mut self, input: &mut Volume, output: &Volume, target: Target<'_>) -> f64 {
        let scalar;
        let ys: &[f64] = match target {
            Target::Values(ys) => ys,
            Target::Scalar(y) => {
                assert_eq!(self.out.depth, 1, "scalar target needs a 1-D regression output");
                scalar = [y];
                &scalar
            }
            Target::Class(_) => panic!("regression loss requires a value target"),
        };
        assert_eq!(ys.len(), self.out.depth, "target vector has wrong length");
        let mut loss = 0.0;
        for i in 0..input.dw.len() {
            let imp = self.weight(i);
            let dy = output.w[i] - ys[i];
            input.dw[i] += imp * dy;
            loss += 0.5 * imp * dy * dy;
        }
        loss
    }

    fn wants_class(&self) -> bool {
        false
    }
}
