use thiserror::Error;

/// Recoverable structural errors: a bad layer spec, or a façade call made
/// before the session was configured. Internal shape violations between
/// adjacent layers are programming bugs and assert instead.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("invalid layer-spec JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("layer spec is empty")]
    EmptySpec,

    #[error("layer spec must start with an input layer")]
    MissingInput,

    #[error("only the first entry may be an input layer")]
    DuplicateInput,

    #[error("layer spec must end with a loss layer (softmax, regression or svm)")]
    MissingLossLayer,

    #[error("loss layer must be the last entry before the trainer, found `{found}` after it")]
    LayerAfterLoss { found: &'static str },

    #[error("at most one trainer entry is allowed, and only at the end of the spec")]
    MisplacedTrainer,

    #[error("`{field}` must be positive in the {layer} entry")]
    NonPositiveField {
        layer: &'static str,
        field: &'static str,
    },

    #[error("regression importance weights ({got}) do not match the output dimension ({want})")]
    ImportanceLengthMismatch { got: usize, want: usize },

    #[error("{layer} entry produces an empty output shape")]
    DegenerateShape { layer: &'static str },

    #[error("`drop_prob` must be in [0, 1), got {0}")]
    InvalidDropProb(f64),

    #[error("network has not been configured; call make_layers first")]
    NotConfigured,

    #[error("input has {got} values but the network expects {want}")]
    InputSizeMismatch { got: usize, want: usize },
}
