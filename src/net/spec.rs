use crate::layers::{
    ActKind, ActivationLayer, ConvLayer, DropoutLayer, FullyConnLayer, HiddenLayer, InputLayer,
    Layer, OutputLayer, PoolLayer, RegressionLayer, SoftmaxLayer, SvmLayer,
};
use crate::net::error::SpecError;
use crate::net::net::Net;
use crate::trainer::trainer::{self, Trainer, TrainerKind};
use crate::vol::volume::Shape;
use serde::{Deserialize, Serialize};

/// One entry of the layer-spec document: an ordered JSON array of objects
/// discriminated by `"type"`. The last non-trainer entry must be a loss
/// layer; at most one trailing entry configures the trainer.
///
/// `activation` on `fc`/`conv` and `drop_prob` on `fc` are sugar: they expand
/// into a trailing activation / dropout layer during the build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SpecEntry {
    Input {
        width: usize,
        height: usize,
        depth: usize,
    },
    Fc {
        neuron_count: usize,
        #[serde(default)]
        activation: Option<ActKind>,
        #[serde(default)]
        drop_prob: Option<f64>,
        #[serde(default)]
        l1_decay: Option<f64>,
        #[serde(default)]
        l2_decay: Option<f64>,
    },
    Conv {
        width: usize,
        #[serde(default)]
        height: Option<usize>,
        filter_count: usize,
        #[serde(default)]
        stride: Option<usize>,
        #[serde(default)]
        pad: Option<usize>,
        #[serde(default)]
        activation: Option<ActKind>,
    },
    Pool {
        width: usize,
        #[serde(default)]
        height: Option<usize>,
        #[serde(default)]
        stride: Option<usize>,
        #[serde(default)]
        pad: Option<usize>,
    },
    Relu,
    Sigmoid,
    Tanh,
    Dropout {
        #[serde(default)]
        drop_prob: Option<f64>,
    },
    Softmax {
        #[serde(default)]
        class_count: Option<usize>,
    },
    Regression {
        #[serde(default)]
        importance: Option<Vec<f64>>,
    },
    Svm {
        #[serde(default)]
        class_count: Option<usize>,
    },
    Sgd(TrainerFields),
    Nesterov(TrainerFields),
    Adagrad(TrainerFields),
    Windowgrad(TrainerFields),
    Adadelta(TrainerFields),
    Adam(TrainerFields),
}

/// Hyperparameters shared by every trainer entry; absent fields take the
/// trainer defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerFields {
    #[serde(default = "d_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "d_momentum")]
    pub momentum: f64,
    #[serde(default = "d_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub l1_decay: f64,
    #[serde(default)]
    pub l2_decay: f64,
    #[serde(default = "d_ro")]
    pub ro: f64,
    #[serde(default = "d_eps")]
    pub eps: f64,
    #[serde(default = "d_beta1")]
    pub beta1: f64,
    #[serde(default = "d_beta2")]
    pub beta2: f64,
    #[serde(default = "d_clipval")]
    pub clipval: f64,
}

fn d_learning_rate() -> f64 {
    trainer::DEFAULT_LEARNING_RATE
}
fn d_momentum() -> f64 {
    trainer::DEFAULT_MOMENTUM
}
fn d_batch_size() -> usize {
    trainer::DEFAULT_BATCH_SIZE
}
fn d_ro() -> f64 {
    trainer::DEFAULT_RO
}
fn d_eps() -> f64 {
    trainer::DEFAULT_EPS
}
fn d_beta1() -> f64 {
    trainer::DEFAULT_BETA1
}
fn d_beta2() -> f64 {
    trainer::DEFAULT_BETA2
}
fn d_clipval() -> f64 {
    trainer::DEFAULT_CLIPVAL
}

/// Parses a layer-spec JSON document into its entries.
pub fn parse(json: &str) -> Result<Vec<SpecEntry>, SpecError> {
    Ok(serde_json::from_str(json)?)
}

/// Builds a Net and Trainer from parsed spec entries. Fails without side
/// effects: either the full pair is constructed or an error is returned.
pub fn build(entries: &[SpecEntry]) -> Result<(Net, Trainer), SpecError> {
    if entries.is_empty() {
        return Err(SpecError::EmptySpec);
    }

    // A trainer entry may only appear once, as the very last element.
    let mut trainer = None;
    for (i, entry) in entries.iter().enumerate() {
        if let Some(t) = trainer_of(entry) {
            if i != entries.len() - 1 {
                return Err(SpecError::MisplacedTrainer);
            }
            trainer = Some(t);
        }
    }
    let layer_entries = if trainer.is_some() {
        &entries[..entries.len() - 1]
    } else {
        entries
    };

    let mut iter = layer_entries.iter();
    let in_shape = match iter.next() {
        Some(&SpecEntry::Input { width, height, depth }) => {
            check_positive("input", "width", width)?;
            check_positive("input", "height", height)?;
            check_positive("input", "depth", depth)?;
            Shape::new(width, height, depth)
        }
        _ => return Err(SpecError::MissingInput),
    };

    let mut hidden = vec![HiddenLayer::Input(InputLayer::new(in_shape))];
    let mut cur = in_shape;
    let mut loss: Option<OutputLayer> = None;

    for entry in iter {
        if loss.is_some() {
            return Err(SpecError::LayerAfterLoss {
                found: entry_name(entry),
            });
        }
        match entry {
            SpecEntry::Input { .. } => return Err(SpecError::DuplicateInput),
            SpecEntry::Fc {
                neuron_count,
                activation,
                drop_prob,
                l1_decay,
                l2_decay,
            } => {
                check_positive("fc", "neuron_count", *neuron_count)?;
                hidden.push(HiddenLayer::FullyConn(FullyConnLayer::with_decay(
                    cur,
                    *neuron_count,
                    l1_decay.unwrap_or(0.0),
                    l2_decay.unwrap_or(1.0),
                )));
                cur = Shape::vector(*neuron_count);
                if let Some(kind) = activation {
                    hidden.push(HiddenLayer::Activation(ActivationLayer::new(cur, *kind)));
                }
                if let Some(p) = drop_prob {
                    hidden.push(HiddenLayer::Dropout(make_dropout(cur, *p)?));
                }
            }
            SpecEntry::Conv {
                width,
                height,
                filter_count,
                stride,
                pad,
                activation,
            } => {
                let kw = *width;
                let kh = height.unwrap_or(kw);
                let stride = stride.unwrap_or(1);
                let pad = pad.unwrap_or(0);
                check_positive("conv", "width", kw)?;
                check_positive("conv", "height", kh)?;
                check_positive("conv", "filter_count", *filter_count)?;
                check_positive("conv", "stride", stride)?;
                check_window_fits("conv", cur, kw, kh, pad)?;
                let layer = ConvLayer::new(cur, kw, kh, *filter_count, stride, pad);
                cur = layer.out_shape();
                hidden.push(HiddenLayer::Conv(layer));
                if let Some(kind) = activation {
                    hidden.push(HiddenLayer::Activation(ActivationLayer::new(cur, *kind)));
                }
            }
            SpecEntry::Pool {
                width,
                height,
                stride,
                pad,
            } => {
                let kw = *width;
                let kh = height.unwrap_or(kw);
                let stride = stride.unwrap_or(kw);
                let pad = pad.unwrap_or(0);
                check_positive("pool", "width", kw)?;
                check_positive("pool", "height", kh)?;
                check_positive("pool", "stride", stride)?;
                check_window_fits("pool", cur, kw, kh, pad)?;
                let layer = PoolLayer::new(cur, kw, kh, stride, pad);
                cur = layer.out_shape();
                hidden.push(HiddenLayer::Pool(layer));
            }
            SpecEntry::Relu => {
                hidden.push(HiddenLayer::Activation(ActivationLayer::new(cur, ActKind::Relu)));
            }
            SpecEntry::Sigmoid => {
                hidden.push(HiddenLayer::Activation(ActivationLayer::new(
                    cur,
                    ActKind::Sigmoid,
                )));
            }
            SpecEntry::Tanh => {
                hidden.push(HiddenLayer::Activation(ActivationLayer::new(cur, ActKind::Tanh)));
            }
            SpecEntry::Dropout { drop_prob } => {
                hidden.push(HiddenLayer::Dropout(make_dropout(
                    cur,
                    drop_prob.unwrap_or(0.5),
                )?));
            }
            SpecEntry::Softmax { class_count } => {
                if let Some(c) = class_count {
                    check_positive("softmax", "class_count", *c)?;
                }
                let classes = adapt_class_count(&mut hidden, &mut cur, *class_count);
                loss = Some(OutputLayer::Softmax(SoftmaxLayer::new(classes)));
            }
            SpecEntry::Svm { class_count } => {
                if let Some(c) = class_count {
                    check_positive("svm", "class_count", *c)?;
                }
                let classes = adapt_class_count(&mut hidden, &mut cur, *class_count);
                loss = Some(OutputLayer::Svm(SvmLayer::new(classes)));
            }
            SpecEntry::Regression { importance } => {
                let dim = cur.len();
                let layer = match importance {
                    Some(imp) => {
                        if imp.len() != dim {
                            return Err(SpecError::ImportanceLengthMismatch {
                                got: imp.len(),
                                want: dim,
                            });
                        }
                        RegressionLayer::with_importance(dim, imp.clone())
                    }
                    None => RegressionLayer::new(dim),
                };
                loss = Some(OutputLayer::Regression(layer));
            }
            // Trainer entries were restricted to the last position above.
            SpecEntry::Sgd(_)
            | SpecEntry::Nesterov(_)
            | SpecEntry::Adagrad(_)
            | SpecEntry::Windowgrad(_)
            | SpecEntry::Adadelta(_)
            | SpecEntry::Adam(_) => return Err(SpecError::MisplacedTrainer),
        }
    }

    let loss = loss.ok_or(SpecError::MissingLossLayer)?;
    let trainer = trainer.unwrap_or_else(|| Trainer::new(TrainerKind::Sgd));
    Ok((Net::new(hidden, loss), trainer))
}

fn trainer_of(entry: &SpecEntry) -> Option<Trainer> {
    let (kind, fields) = match entry {
        SpecEntry::Sgd(f) => (TrainerKind::Sgd, f),
        SpecEntry::Nesterov(f) => (TrainerKind::Nesterov, f),
        SpecEntry::Adagrad(f) => (TrainerKind::Adagrad, f),
        SpecEntry::Windowgrad(f) => (TrainerKind::Windowgrad, f),
        SpecEntry::Adadelta(f) => (TrainerKind::Adadelta, f),
        SpecEntry::Adam(f) => (TrainerKind::Adam, f),
        _ => return None,
    };
    let mut t = Trainer::new(kind);
    t.learning_rate = fields.learning_rate;
    t.momentum = fields.momentum;
    t.batch_size = fields.batch_size.max(1);
    t.l1_decay = fields.l1_decay;
    t.l2_decay = fields.l2_decay;
    t.ro = fields.ro;
    t.eps = fields.eps;
    t.beta1 = fields.beta1;
    t.beta2 = fields.beta2;
    t.clipval = fields.clipval;
    Some(t)
}

fn entry_name(entry: &SpecEntry) -> &'static str {
    match entry {
        SpecEntry::Input { .. } => "input",
        SpecEntry::Fc { .. } => "fc",
        SpecEntry::Conv { .. } => "conv",
        SpecEntry::Pool { .. } => "pool",
        SpecEntry::Relu => "relu",
        SpecEntry::Sigmoid => "sigmoid",
        SpecEntry::Tanh => "tanh",
        SpecEntry::Dropout { .. } => "dropout",
        SpecEntry::Softmax { .. } => "softmax",
        SpecEntry::Regression { .. } => "regression",
        SpecEntry::Svm { .. } => "svm",
        SpecEntry::Sgd(_) => "sgd",
        SpecEntry::Nesterov(_) => "nesterov",
        SpecEntry::Adagrad(_) => "adagrad",
        SpecEntry::Windowgrad(_) => "windowgrad",
        SpecEntry::Adadelta(_) => "adadelta",
        SpecEntry::Adam(_) => "adam",
    }
}

fn check_positive(layer: &'static str, field: &'static str, v: usize) -> Result<(), SpecError> {
    if v == 0 {
        Err(SpecError::NonPositiveField { layer, field })
    } else {
        Ok(())
    }
}

fn check_window_fits(
    layer: &'static str,
    input: Shape,
    kw: usize,
    kh: usize,
    pad: usize,
) -> Result<(), SpecError> {
    if input.sx + 2 * pad < kw || input.sy + 2 * pad < kh {
        Err(SpecError::DegenerateShape { layer })
    } else {
        Ok(())
    }
}

/// Resolves the class count of a softmax/svm entry. When the declared count
/// differs from the previous layer's output, a matching fully-connected
/// layer is inserted so the loss layer always sees one score per class.
fn adapt_class_count(
    hidden: &mut Vec<HiddenLayer>,
    cur: &mut Shape,
    declared: Option<usize>,
) -> usize {
    let classes = declared.unwrap_or_else(|| cur.len());
    if classes != cur.len() {
        hidden.push(HiddenLayer::FullyConn(FullyConnLayer::new(*cur, classes)));
        *cur = Shape::vector(classes);
    }
    classes
}

fn make_dropout(shape: Shape, drop_prob: f64) -> Result<DropoutLayer, SpecError> {
    if !(0.0..1.0).contains(&drop_prob) {
        return Err(SpecError::InvalidDropProb(drop_prob));
    }
    Ok(DropoutLayer::new(shape, drop_prob))
}
