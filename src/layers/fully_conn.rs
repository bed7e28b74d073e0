use crate::layers::{Layer, ParamBlock};
use crate::vol::volume::{Shape, Volume};
use serde::{Deserialize, Serialize};

/// Dense layer: `out[j] = bias[j] + Σ_i weight[j][i] * in[i]`.
///
/// Each neuron's weight vector is stored as its own 1×1×n Volume so the
/// trainer sees one parameter block per neuron plus one for the biases,
/// mirroring how the conv layer exposes its filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullyConnLayer {
    in_shape: Shape,
    out: Shape,
    n_inputs: usize,
    filters: Vec<Volume>,
    biases: Volume,
    l1_decay_mul: f64,
    l2_decay_mul: f64,
}

impl FullyConnLayer {
    pub fn new(in_shape: Shape, neuron_count: usize) -> FullyConnLayer {
        FullyConnLayer::with_decay(in_shape, neuron_count, 0.0, 1.0)
    }

    pub fn with_decay(
        in_shape: Shape,
        neuron_count: usize,
        l1_decay_mul: f64,
        l2_decay_mul: f64,
    ) -> FullyConnLayer {
        let n_inputs = in_shape.len();
        let filters = (0..neuron_count)
            .map(|_| Volume::xavier(Shape::vector(n_inputs)))
            .collect();
        FullyConnLayer {
            in_shape,
            out: Shape::vector(neuron_count),
            n_inputs,
            filters,
            biases: Volume::zeros(Shape::vector(neuron_count)),
            l1_decay_mul,
            l2_decay_mul,
        }
    }
}

impl Layer for FullyConnLayer {
    fn out_shape(&self) -> Shape {
        self.out
    }

    fn forward(&mut self, input: &Volume, output: &mut Volume, _training: bool) {
        for (j, filter) in self.filters.iter().enumerate() {
            let mut a = self.biases.w[j];
            for i in 0..self.n_inputs {
                a += filter.w[i] * input.w[i];
            }
            output.w[j] = a;
        }
    }

    fn backward(&mut self, input: &mut Volume, output: &Volume) {
        for (j, filter) in self.filters.iter_mut().enumerate() {
            let chain = output.dw[j];
            for i in 0..self.n_inputs {
                input.dw[i] += filter.w[i] * chain;
                filter.dw[i] += input.w[i] * chain;
            }
            self.biases.dw[j] += chain;
        }
    }

    fn params_and_grads(&mut self) -> Vec<ParamBlock<'_>> {
        let (l1, l2) = (self.l1_decay_mul, self.l2_decay_mul);
        let mut blocks: Vec<ParamBlock<'_>> = self
            .filters
            .iter_mut()
            .map(|f| ParamBlock {
                w: &mut f.w,
                dw: &mut f.dw,
                l1_decay_mul: l1,
                l2_decay_mul: l2,
            })
            .collect();
        blocks.push(ParamBlock {
            w: &mut self.biases.w,
            dw: &mut self.biases.dw,
            l1_decay_mul: 0.0,
            l2_decay_mul: 0.0,
        });
        blocks
    }
}
