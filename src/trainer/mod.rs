pub mod trainer;

pub use trainer::{StepStats, Trainer, TrainerKind};
