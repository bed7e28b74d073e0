use crate::layers::{Layer, ParamBlock};
use crate::vol::volume::{Shape, Volume};
use serde::{Deserialize, Serialize};

/// 2-D convolution with symmetric zero padding.
///
/// Output spatial size along each axis is
/// `floor((in + 2*pad - kernel) / stride) + 1`. Filters span the full input
/// depth; one bias per filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvLayer {
    in_shape: Shape,
    out: Shape,
    kw: usize,
    kh: usize,
    stride: usize,
    pad: usize,
    filters: Vec<Volume>,
    biases: Volume,
    l1_decay_mul: f64,
    l2_decay_mul: f64,
}

pub(crate) fn conv_out_dim(input: usize, kernel: usize, stride: usize, pad: usize) -> usize {
    (input + 2 * pad - kernel) / stride + 1
}

impl ConvLayer {
    pub fn new(
        in_shape: Shape,
        kw: usize,
        kh: usize,
        filter_count: usize,
        stride: usize,
        pad: usize,
    ) -> ConvLayer {
        assert!(stride > 0, "conv stride must be positive");
        assert!(
            in_shape.sx + 2 * pad >= kw && in_shape.sy + 2 * pad >= kh,
            "conv kernel larger than padded input"
        );
        let out = Shape::new(
            conv_out_dim(in_shape.sx, kw, stride, pad),
            conv_out_dim(in_shape.sy, kh, stride, pad),
            filter_count,
        );
        let filters = (0..filter_count)
            .map(|_| Volume::xavier(Shape::new(kw, kh, in_shape.depth)))
            .collect();
        ConvLayer {
            in_shape,
            out,
            kw,
            kh,
            stride,
            pad,
            filters,
            biases: Volume::zeros(Shape::vector(filter_count)),
            l1_decay_mul: 0.0,
            l2_decay_mul: 1.0,
        }
    }
}

impl Layer for ConvLayer {
    fn out_shape(&self) -> Shape {
        self.out
    }

    fn forward(&mut self, input: &Volume, output: &mut Volume, _training: bool) {
        let in_sx = self.in_shape.sx as i64;
        let in_sy = self.in_shape.sy as i64;
        for (f, filter) in self.filters.iter().enumerate() {
            for oy in 0..self.out.sy {
                let y0 = (oy * self.stride) as i64 - self.pad as i64;
                for ox in 0..self.out.sx {
                    let x0 = (ox * self.stride) as i64 - self.pad as i64;
                    let mut a = self.biases.w[f];
                    for fy in 0..self.kh {
                        let iy = y0 + fy as i64;
                        if iy < 0 || iy >= in_sy {
                            continue;
                        }
                        for fx in 0..self.kw {
                            let ix = x0 + fx as i64;
                            if ix < 0 || ix >= in_sx {
                                continue;
                            }
                            for fd in 0..self.in_shape.depth {
                                a += filter.get(fx, fy, fd)
                                    * input.get(ix as usize, iy as usize, fd);
                            }
                        }
                    }
                    output.set(ox, oy, f, a);
                }
            }
        }
    }

    fn backward(&mut self, input: &mut Volume, output: &Volume) {
        let in_sx = self.in_shape.sx as i64;
        let in_sy = self.in_shape.sy as i64;
        for (f, filter) in self.filters.iter_mut().enumerate() {
            for oy in 0..self.out.sy {
                let y0 = (oy * self.stride) as i64 - self.pad as i64;
                for ox in 0..self.out.sx {
                    let x0 = (ox * self.stride) as i64 - self.pad as i64;
                    let chain = output.grad(ox, oy, f);
                    for fy in 0..self.kh {
                        let iy = y0 + fy as i64;
                        if iy < 0 || iy >= in_sy {
                            continue;
                        }
                        for fx in 0..self.kw {
                            let ix = x0 + fx as i64;
                            if ix < 0 || ix >= in_sx {
                                continue;
                            }
                            for fd in 0..self.in_shape.depth {
                                let (ix, iy) = (ix as usize, iy as usize);
                                filter.add_grad(fx, fy, fd, input.get(ix, iy, fd) * chain);
                                input.add_grad(ix, iy, fd, filter.get(fx, fy, fd) * chain);
                            }
                        }
                    }
                    self.biases.dw[f] += chain;
                }
            }
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
