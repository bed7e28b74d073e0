pub mod data;
pub mod session;
pub mod stats;

pub use data::SessionData;
pub use session::Session;
pub use stats::TickStats;
