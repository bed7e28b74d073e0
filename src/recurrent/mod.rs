pub mod lstm;
pub mod rnn;

pub use lstm::{LstmCell, LstmSequence, LstmStep};
pub use rnn::{RnnCell, RnnSequence, RnnStep};

pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
