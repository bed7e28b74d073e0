pub mod vol;
pub mod layers;
pub mod net;
pub mod trainer;
pub mod recurrent;
pub mod session;

// Convenience re-exports
pub use vol::volume::{Shape, Volume};
pub use layers::{Layer, LossLayer, ParamBlock, Target};
pub use net::error::SpecError;
pub use net::net::Net;
pub use trainer::trainer::{StepStats, Trainer, TrainerKind};
pub use session::data::SessionData;
pub use session::session::Session;
pub use session::stats::TickStats;
