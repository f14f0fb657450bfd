//! Errors, parameter sets and scalar auxiliary functions

mod error;
mod functions;
mod params;

pub use error::*;
pub use functions::*;
pub use params::*;
