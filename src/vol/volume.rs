use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Shape of a [`Volume`]: width × height × depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub sx: usize,
    pub sy: usize,
    pub depth: usize,
}

impl Shape {
    pub fn new(sx: usize, sy: usize, depth: usize) -> Shape {
        Shape { sx, sy, depth }
    }

    /// Shape of a flat vector of `n` values (1 × 1 × n).
    pub fn vector(n: usize) -> Shape {
        Shape { sx: 1, sy: 1, depth: n }
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.sx * self.sy * self.depth
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dense 3-D tensor: a flat weight buffer `w` plus a parallel, same-length
/// gradient buffer `dw`.
///
/// Indexing is channel-major: `idx = ((c * sy) + y) * sx + x`. Every layer in
/// this crate addresses Volumes through this one convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    pub shape: Shape,
    pub w: Vec<f64>,
    pub dw: Vec<f64>,
}

impl Volume {
    pub fn zeros(shape: Shape) -> Volume {
        Volume {
            shape,
            w: vec![0.0; shape.len()],
            dw: vec![0.0; shape.len()],
        }
    }

    pub fn filled(shape: Shape, value: f64) -> Volume {
        Volume {
            shape,
            w: vec![value; shape.len()],
            dw: vec![0.0; shape.len()],
        }
    }

    /// Xavier-style init: samples from N(0, sqrt(1 / n)) where `n` is the
    /// element count of this Volume (the fan-in for fc and conv filters).
    pub fn xavier(shape: Shape) -> Volume {
        let mut rng = rand::thread_rng();
        let std_dev = (1.0 / shape.len() as f64).sqrt();
        let mut res = Volume::zeros(shape);
        for v in res.w.iter_mut() {
            *v = sample_standard_normal(&mut rng) * std_dev;
        }
        res
    }

    pub fn from_weights(shape: Shape, w: Vec<f64>) -> Volume {
        assert_eq!(w.len(), shape.len(), "weight buffer does not match shape");
        let dw = vec![0.0; w.len()];
        Volume { shape, w, dw }
    }

    /// 1 × 1 × n Volume holding a copy of `values`.
    pub fn vector(values: &[f64]) -> Volume {
        Volume::from_weights(Shape::vector(values.len()), values.to_vec())
    }

    fn idx(&self, x: usize, y: usize, c: usize) -> usize {
        assert!(
            x < self.shape.sx && y < self.shape.sy && c < self.shape.depth,
            "volume index ({x}, {y}, {c}) out of bounds for {:?}",
            self.shape
        );
        ((c * self.shape.sy) + y) * self.shape.sx + x
    }

    pub fn get(&self, x: usize, y: usize, c: usize) -> f64 {
        self.w[self.idx(x, y, c)]
    }

    pub fn set(&mut self, x: usize, y: usize, c: usize, v: f64) {
        let i = self.idx(x, y, c);
        self.w[i] = v;
    }

    pub fn add(&mut self, x: usize, y: usize, c: usize, v: f64) {
        let i = self.idx(x, y, c);
        self.w[i] += v;
    }

    pub fn grad(&self, x: usize, y: usize, c: usize) -> f64 {
        self.dw[self.idx(x, y, c)]
    }

    /// Accumulates into the gradient buffer. Backward passes rely on this
    /// summing behaviour when a Volume fans out to several consumers.
    pub fn add_grad(&mut self, x: usize, y: usize, c: usize, v: f64) {
        let i = self.idx(x, y, c);
        self.dw[i] += v;
    }

    pub fn zero_grads(&mut self) {
        self.dw.iter_mut().for_each(|g| *g = 0.0);
    }
}

/// Samples a single value from N(0, 1) using the Box-Muller transform.
/// Both u1 and u2 must be uniform on (0, 1].
pub(crate) fn sample_standard_normal(rng: &mut ThreadRng) -> f64 {
    // Draw two independent uniform samples in (0, 1] to avoid log(0).
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = 1.0 - rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradients_parallel_weights() {
        let v = Volume::xavier(Shape::new(3, 4, 5));
        assert_eq!(v.w.len(), v.dw.len());
        assert_eq!(v.w.len(), 60);
    }

    #[test]
    fn channel_major_indexing() {
        let mut v = Volume::zeros(Shape::new(2, 3, 4));
        v.set(1, 2, 3, 7.5);
        // idx = ((c*sy)+y)*sx + x = ((3*3)+2)*2 + 1 = 23
        assert_eq!(v.w[23], 7.5);
        assert_eq!(v.get(1, 2, 3), 7.5);
    }

    #[test]
    fn add_grad_accumulates() {
        let mut v = Volume::zeros(Shape::vector(2));
        v.add_grad(0, 0, 1, 0.25);
        v.add_grad(0, 0, 1, 0.5);
        assert_eq!(v.grad(0, 0, 1), 0.75);
        v.zero_grads();
        assert_eq!(v.grad(0, 0, 1), 0.0);
    }

    #[test]
    #[should_panic]
    fn out_of_bounds_is_fatal() {
        let v = Volume::zeros(Shape::new(2, 2, 2));
        v.get(2, 0, 0);
    }
}
