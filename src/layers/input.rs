use crate::layers::Layer;
use crate::vol::volume::{Shape, Volume};
use serde::{Deserialize, Serialize};

/// Entry layer: declares the network's input shape and passes values through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputLayer {
    out: Shape,
}

impl InputLayer {
    pub fn new(shape: Shape) -> InputLayer {
        InputLayer { out: shape }
    }
}

impl Layer for InputLayer {
    fn out_shape(&self) -> Shape {
        self.out
    }

    fn forward(&mut self, input: &Volume, output: &mut Volume, _training: bool) {
        output.w.copy_from_slice(&input.w);
    }

    fn backward(&mut self, input: &mut Volume, output: &Volume) {
        for (g_in, g_out) in input.dw.iter_mut().zip(output.dw.iter()) {
            *g_in += g_out;
        }
    }
}
