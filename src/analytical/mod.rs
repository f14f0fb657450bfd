//! Closed-form solutions used for verification

mod column_fluid_pressure;

pub use column_fluid_pressure::*;
