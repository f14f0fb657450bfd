//! Finite elements for porous media analyses
//!
//! The elements implement the u-p and u-pl-pg formulations of [1] and the
//! seepage face technique of [2]:
//!
//! 1. Pedroso DM (2015) A consistent u-p formulation for porous media with
//!    hysteresis, Int Journal for Numerical Methods in Engineering, 101(8):606-634
//! 2. Pedroso DM (2015) A solution to transient seepage in unsaturated porous media,
//!    Computer Methods in Applied Mechanics and Engineering, 285:791-816

mod element;
mod interp;
mod liquid;
mod liquid_gas;
mod samples;
mod solid;
mod solid_liquid;
mod solid_liquid_gas;
mod solution;
mod sparse;

pub use element::*;
pub use interp::*;
pub use liquid::*;
pub use liquid_gas::*;
pub use solid::*;
pub use solid_liquid::*;
pub use solid_liquid_gas::*;
pub use solution::*;
pub use sparse::*;
