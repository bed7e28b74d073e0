pub mod volume;

pub use volume::{Shape, Volume};
