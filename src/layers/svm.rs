use crate::layers::{LossLayer, Target};
use crate::vol::volume::{Shape, Volume};
use serde::{Deserialize, Serialize};

/// Multiclass margin (hinge) loss layer. Forward is the identity over raw
/// class scores; backward penalises every class whose score comes within the
/// margin of the target class's score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmLayer {
    out: Shape,
}

const MARGIN: f64 = 1.0;

impl SvmLayer {
    pub fn new(class_count: usize) -> SvmLayer {
        assert!(class_count > 0, "svm needs at least one class");
        SvmLayer {
            out: Shape::vector(class_count),
        }
    }
}

impl LossLayer for SvmLayer {
    fn out_shape(&self) -> Shape {
        self.out
    }

    fn forward(&mut self, input: &Volume, output: &mut Volume, _training: bool) {
        output.w.copy_from_slice(&input.w);
    }

    fn backward(&mut self, input: &mut Volume, output: &Volume, target: Target<'_>) -> f64 {
        let y = match target {
            Target::Class(y) => y,
            _ => panic!("svm loss requires a class target"),
        };
        assert!(y < self.out.depth, "target class {y} out of range");
        let y_score = output.w[y];
        let mut loss = 0.0;
        for i in 0..self.out.depth {
            if i == y {
                continue;
            }
            let violation = output.w[i] - y_score + MARGIN;
            if violation > 0.0 {
                input.dw[i] += 1.0;
                input.dw[y] -= 1.0;
                loss += violation;
            }
        }
        loss
    }

    fn wants_class(&self) -> bool {
        true
    }
}
