use crate::layers::{HiddenLayer, Layer, LossLayer, OutputLayer, ParamBlock, Target};
use crate::vol::volume::{Shape, Volume};
use serde::{Deserialize, Serialize};

/// Ordered composition of hidden layers plus one terminal loss layer.
///
/// Inter-layer activation Volumes live in the `acts` arena owned by the Net:
/// `acts[0]` holds the network input, `acts[i + 1]` the output of layer `i`,
/// and the last entry the loss layer's output. Layers never own the Volumes
/// they exchange; backward writes gradient contributions into the arena and
/// into each layer's parameter Volumes.
#[derive(Serialize, Deserialize)]
pub struct Net {
    layers: Vec<HiddenLayer>,
    loss: OutputLayer,
    #[serde(skip)]
    acts: Vec<Volume>,
}

impl Net {
    pub(crate) fn new(layers: Vec<HiddenLayer>, loss: OutputLayer) -> Net {
        assert!(!layers.is_empty(), "net needs at least an input layer");
        let mut net = Net {
            layers,
            loss,
            acts: Vec::new(),
        };
        net.alloc_acts();
        net
    }

    /// Rebuilds the activation arena from the layers' declared shapes.
    fn alloc_acts(&mut self) {
        let mut acts = Vec::with_capacity(self.layers.len() + 2);
        acts.push(Volume::zeros(self.layers[0].out_shape()));
        for layer in &self.layers {
            acts.push(Volume::zeros(layer.out_shape()));
        }
        acts.push(Volume::zeros(self.loss.out_shape()));
        self.acts = acts;
    }

    pub fn in_shape(&self) -> Shape {
        self.layers[0].out_shape()
    }

    pub fn out_shape(&self) -> Shape {
        self.loss.out_shape()
    }

    /// Whether the terminal loss layer consumes class-index targets.
    pub fn is_classifier(&self) -> bool {
        self.loss.wants_class()
    }

    /// Declared shape of every activation stage, input first, loss output
    /// last. Equal adjacent entries are the identity stages.
    pub fn shape_chain(&self) -> Vec<Shape> {
        self.acts.iter().map(|a| a.shape).collect()
    }

    /// Sequential forward pass; returns the loss layer's output Volume.
    pub fn forward(&mut self, input: &Volume, training: bool) -> &Volume {
        assert_eq!(
            input.shape.len(),
            self.acts[0].shape.len(),
            "input does not match the declared input shape"
        );
        self.acts[0].w.copy_from_slice(&input.w);
        let n = self.layers.len();
        for i in 0..n {
            let (before, after) = self.acts.split_at_mut(i + 1);
            self.layers[i].forward(&before[i], &mut after[0], training);
        }
        let (before, after) = self.acts.split_at_mut(n + 1);
        self.loss.forward(&before[n], &mut after[0], training);
        self.output()
    }

    /// Reverse pass: zeroes the arena's gradients, lets the loss layer seed
    /// them from `target`, then walks the hidden layers in reverse order.
    /// Returns the scalar loss. Parameter gradients accumulate across calls
    /// until a trainer step consumes them.
    pub fn backward(&mut self, target: Target<'_>) -> f64 {
        for act in &mut self.acts {
            act.zero_grads();
        }
        let n = self.layers.len();
        let loss = {
            let (before, after) = self.acts.split_at_mut(n + 1);
            self.loss.backward(&mut before[n], &after[0], target)
        };
        for i in (0..n).rev() {
            let (before, after) = self.acts.split_at_mut(i + 1);
            self.layers[i].backward(&mut before[i], &after[0]);
        }
        loss
    }

    /// Output of the most recent forward pass.
    pub fn output(&self) -> &Volume {
        self.acts.last().expect("acts arena is never empty")
    }

    /// Every trainable parameter block, in a stable enumeration order.
    pub fn params_and_grads(&mut self) -> Vec<ParamBlock<'_>> {
        self.layers
            .iter_mut()
            .flat_map(|l| l.params_and_grads())
            .collect()
    }

    /// Serializes the network (architecture and weights) to pretty JSON.
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    /// Deserializes a network previously written by `save_json`.
    pub fn load_json(path: &str) -> std::io::Result<Net> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let mut net: Net = serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        net.alloc_acts();
        Ok(net)
    }
}
