use serde::{Deserialize, Serialize};

/// Owned training dataset: `count` samples of `input_dim` values each, plus
/// one label per sample. For classifier nets the label is the class index;
/// for 1-D regression nets it is the target value.
///
/// Population follows a begin/fill/end protocol. The session treats the data
/// as single-writer: training must be stopped before repopulating.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionData {
    input_dim: usize,
    label_count: usize,
    inputs: Vec<Vec<f64>>,
    labels: Vec<f64>,
    ready: bool,
}

impl SessionData {
    pub fn new() -> SessionData {
        SessionData::default()
    }

    /// Discards any previous dataset and allocates zeroed storage for
    /// `count` samples.
    pub fn begin_data(&mut self, input_dim: usize, count: usize, label_count: usize) {
        assert!(input_dim > 0, "input_dim must be positive");
        self.input_dim = input_dim;
        self.label_count = label_count;
        self.inputs = vec![vec![0.0; input_dim]; count];
        self.labels = vec![0.0; count];
        self.ready = false;
    }

    pub fn set_data(&mut self, i: usize, dim: usize, val: f64) {
        self.inputs[i][dim] = val;
    }

    pub fn set_label(&mut self, i: usize, val: f64) {
        self.labels[i] = val;
    }

    /// Marks the dataset complete; the training loop only draws samples from
    /// a ready dataset.
    pub fn end_data(&mut self) {
        self.ready = true;
    }

    pub fn is_ready(&self) -> bool {
        self.ready && !self.inputs.is_empty()
    }

    pub fn count(&self) -> usize {
        self.inputs.len()
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn label_count(&self) -> usize {
        self.label_count
    }

    pub fn input(&self, i: usize) -> &[f64] {
        &self.inputs[i]
    }

    pub fn label(&self, i: usize) -> f64 {
        self.labels[i]
    }
}
