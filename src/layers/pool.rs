use crate::layers::conv::conv_out_dim;
use crate::layers::Layer;
use crate::vol::volume::{Shape, Volume};
use serde::{Deserialize, Serialize};

/// Max pooling. No learned parameters; forward records the flat input index
/// of each window's winner so backward can route the gradient exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolLayer {
    in_shape: Shape,
    out: Shape,
    kw: usize,
    kh: usize,
    stride: usize,
    pad: usize,
    #[serde(skip)]
    switches: Vec<usize>,
}

/// Sentinel for a window that saw no in-bounds input cell.
const NO_WINNER: usize = usize::MAX;

impl PoolLayer {
    pub fn new(in_shape: Shape, kw: usize, kh: usize, stride: usize, pad: usize) -> PoolLayer {
        assert!(stride > 0, "pool stride must be positive");
        assert!(
            in_shape.sx + 2 * pad >= kw && in_shape.sy + 2 * pad >= kh,
            "pool window larger than padded input"
        );
        let out = Shape::new(
            conv_out_dim(in_shape.sx, kw, stride, pad),
            conv_out_dim(in_shape.sy, kh, stride, pad),
            in_shape.depth,
        );
        PoolLayer {
            in_shape,
            out,
            kw,
            kh,
            stride,
            pad,
            switches: vec![NO_WINNER; out.len()],
        }
    }
}

impl Layer for PoolLayer {
    fn out_shape(&self) -> Shape {
        self.out
    }

    fn forward(&mut self, input: &Volume, output: &mut Volume, _training: bool) {
        if self.switches.len() != self.out.len() {
            // switches are runtime state and skipped by serde; rebuild lazily
            self.switches = vec![NO_WINNER; self.out.len()];
        }
        let in_sx = self.in_shape.sx as i64;
        let in_sy = self.in_shape.sy as i64;
        let mut o = 0;
        for d in 0..self.out.depth {
            for oy in 0..self.out.sy {
                let y0 = (oy * self.stride) as i64 - self.pad as i64;
                for ox in 0..self.out.sx {
                    let x0 = (ox * self.stride) as i64 - self.pad as i64;
                    let mut best = f64::NEG_INFINITY;
                    let mut winner = NO_WINNER;
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
                            let v = input.get(ix as usize, iy as usize, d);
                            if v > best || winner == NO_WINNER {
                                best = v;
                                winner =
                                    ((d * self.in_shape.sy) + iy as usize) * self.in_shape.sx
                                        + ix as usize;
                            }
                        }
                    }
                    self.switches[o] = winner;
                    output.w[o] = if winner == NO_WINNER { 0.0 } else { best };
                    o += 1;
                }
            }
        }
    }

    fn backward(&mut self, input: &mut Volume, output: &Volume) {
        for (o, &winner) in self.switches.iter().enumerate() {
            if winner != NO_WINNER {
                input.dw[winner] += output.dw[o];
            }
        }
    }
}
