pub mod input;
pub mod fully_conn;
pub mod conv;
pub mod pool;
pub mod activation;
pub mod dropout;
pub mod softmax;
pub mod regression;
pub mod svm;

pub use activation::{ActKind, ActivationLayer};
pub use conv::ConvLayer;
pub use dropout::DropoutLayer;
pub use fully_conn::FullyConnLayer;
pub use input::InputLayer;
pub use pool::PoolLayer;
pub use regression::RegressionLayer;
pub use softmax::SoftmaxLayer;
pub use svm::SvmLayer;

use crate::vol::volume::{Shape, Volume};
use serde::{Deserialize, Serialize};

/// One trainable parameter tensor: mutable views of its weights and its
/// accumulated gradients, plus the decay multipliers the trainer applies to
/// this block (biases opt out with zero multipliers).
#[derive(Debug)]
pub struct ParamBlock<'a> {
    pub w: &'a mut [f64],
    pub dw: &'a mut [f64],
    pub l1_decay_mul: f64,
    pub l2_decay_mul: f64,
}

/// Training target consumed by the terminal loss layer.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// Class index, for Softmax and Svm loss layers.
    Class(usize),
    /// Full target vector, for Regression loss layers.
    Values(&'a [f64]),
    /// Single target value, shorthand for a 1-D Regression output.
    Scalar(f64),
}

/// A hidden transformation stage of the network.
///
/// `forward` reads the input activation Volume and writes the output Volume
/// the Net allocated for this stage. `backward` reads gradients already
/// accumulated in the output Volume and adds its contribution into the input
/// Volume's gradient buffer (and into its own parameter gradients, if any).
pub trait Layer {
    fn out_shape(&self) -> Shape;
    fn forward(&mut self, input: &Volume, output: &mut Volume, training: bool);
    fn backward(&mut self, input: &mut Volume, output: &Volume);
    fn params_and_grads(&mut self) -> Vec<ParamBlock<'_>> {
        Vec::new()
    }
}

/// The terminal layer of a Net. Its backward pass takes a target instead of
/// an upstream gradient and returns the scalar loss.
pub trait LossLayer {
    fn out_shape(&self) -> Shape;
    fn forward(&mut self, input: &Volume, output: &mut Volume, training: bool);
    fn backward(&mut self, input: &mut Volume, output: &Volume, target: Target<'_>) -> f64;
    /// Whether this loss layer consumes class-index targets.
    fn wants_class(&self) -> bool;
}

/// Closed set of hidden-layer variants; dispatch is by enum, which keeps the
/// whole Net serializable with plain serde derives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HiddenLayer {
    Input(InputLayer),
    FullyConn(FullyConnLayer),
    Conv(ConvLayer),
    Pool(PoolLayer),
    Activation(ActivationLayer),
    Dropout(DropoutLayer),
}

impl Layer for HiddenLayer {
    fn out_shape(&self) -> Shape {
        match self {
            HiddenLayer::Input(l) => l.out_shape(),
            HiddenLayer::FullyConn(l) => l.out_shape(),
            HiddenLayer::Conv(l) => l.out_shape(),
            HiddenLayer::Pool(l) => l.out_shape(),
            HiddenLayer::Activation(l) => l.out_shape(),
            HiddenLayer::Dropout(l) => l.out_shape(),
        }
    }

    fn forward(&mut self, input: &Volume, output: &mut Volume, training: bool) {
        match self {
            HiddenLayer::Input(l) => l.forward(input, output, training),
            HiddenLayer::FullyConn(l) => l.forward(input, output, training),
            HiddenLayer::Conv(l) => l.forward(input, output, training),
            HiddenLayer::Pool(l) => l.forward(input, output, training),
            HiddenLayer::Activation(l) => l.forward(input, output, training),
            HiddenLayer::Dropout(l) => l.forward(input, output, training),
        }
    }

    fn backward(&mut self, input: &mut Volume, output: &Volume) {
        match self {
            HiddenLayer::Input(l) => l.backward(input, output),
            HiddenLayer::FullyConn(l) => l.backward(input, output),
            HiddenLayer::Conv(l) => l.backward(input, output),
            HiddenLayer::Pool(l) => l.backward(input, output),
            HiddenLayer::Activation(l) => l.backward(input, output),
            HiddenLayer::Dropout(l) => l.backward(input, output),
        }
    }

    fn params_and_grads(&mut self) -> Vec<ParamBlock<'_>> {
        match self {
            HiddenLayer::FullyConn(l) => l.params_and_grads(),
            HiddenLayer::Conv(l) => l.params_and_grads(),
            _ => Vec::new(),
        }
    }
}

/// Closed set of loss-layer variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputLayer {
    Softmax(SoftmaxLayer),
    Regression(RegressionLayer),
    Svm(SvmLayer),
}

impl LossLayer for OutputLayer {
    fn out_shape(&self) -> Shape {
        match self {
            OutputLayer::Softmax(l) => l.out_shape(),
            OutputLayer::Regression(l) => l.out_shape(),
            OutputLayer::Svm(l) => l.out_shape(),
        }
    }

    fn forward(&mut self, input: &Volume, output: &mut Volume, training: bool) {
        match self {
            OutputLayer::Softmax(l) => l.forward(input, output, training),
            OutputLayer::Regression(l) => l.forward(input, output, training),
            OutputLayer::Svm(l) => l.forward(input, output, training),
        }
    }

    fn backward(&mut self, input: &mut Volume, output: &Volume, target: Target<'_>) -> f64 {
        match self {
            OutputLayer::Softmax(l) => l.backward(input, output, target),
            OutputLayer::Regression(l) => l.backward(input, output, target),
            OutputLayer::Svm(l) => l.backward(input, output, target),
        }
    }

    fn wants_class(&self) -> bool {
        match self {
            OutputLayer::Softmax(l) => l.wants_class(),
            OutputLayer::Regression(l) => l.wants_class(),
            OutputLayer::Svm(l) => l.wants_class(),
        }
    }
}
