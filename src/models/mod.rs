//! Constitutive models for porous media

mod conductivity;
mod fluid;
mod porous;
pub mod retention;
mod state;
mod stress_strain;

pub use conductivity::*;
pub use fluid::*;
pub use porous::*;
pub use retention::{LiquidRetention, LiquidRetentionTrait, RetentionDerivs};
pub use state::*;
pub use stress_strain::*;
