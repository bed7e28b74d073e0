use crate::layers::Layer;
use crate::vol::volume::{Shape, Volume};
use serde::{Deserialize, Serialize};

/// Elementwise nonlinearity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActKind {
    Relu,
    Sigmoid,
    Tanh,
}

/// Elementwise activation layer. Backward evaluates the derivative at the
/// cached forward *output*, so each kind's gradient is expressed in terms of
/// the activation value itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationLayer {
    kind: ActKind,
    out: Shape,
}

impl ActivationLayer {
    pub fn new(in_shape: Shape, kind: ActKind) -> ActivationLayer {
        ActivationLayer { kind, out: in_shape }
    }

    pub fn kind(&self) -> ActKind {
        self.kind
    }
}

impl Layer for ActivationLayer {
    fn out_shape(&self) -> Shape {
        self.out
    }

    fn forward(&mut self, input: &Volume, output: &mut Volume, _training: bool) {
        match self.kind {
            ActKind::Relu => {
                for (o, &x) in output.w.iter_mut().zip(input.w.iter()) {
                    *o = if x > 0.0 { x } else { 0.0 };
                }
            }
            ActKind::Sigmoid => {
                for (o, &x) in output.w.iter_mut().zip(input.w.iter()) {
                    *o = 1.0 / (1.0 + (-x).exp());
                }
            }
            ActKind::Tanh => {
                for (o, &x) in output.w.iter_mut().zip(input.w.iter()) {
                    *o = x.tanh();
                }
            }
        }
    }

    fn backward(&mut self, input: &mut Volume, output: &Volume) {
        match self.kind {
            ActKind::Relu => {
                for i in 0..input.dw.len() {
                    if output.w[i] > 0.0 {
                        input.dw[i] += output.dw[i];
                    }
                }
            }
            ActKind::Sigmoid => {
                for i in 0..input.dw.len() {
                    let s = output.w[i];
                    input.dw[i] += s * (1.0 - s) * output.dw[i];
                }
            }
            ActKind::Tanh => {
                for i in 0..input.dw.len() {
                    let t = output.w[i];
                    input.dw[i] += (1.0 - t * t) * output.dw[i];
                }
            }
        }
    }
}
