pub mod error;
pub mod net;
pub mod spec;

pub use error::SpecError;
pub use net::Net;
pub use spec::{build, parse, SpecEntry};
