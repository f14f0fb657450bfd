//! Liquid retention models
//!
//! A retention model provides the rate coefficient Cc = dsl/dpc of the
//! saturation-capillary pressure relation, together with the derivatives
//! needed by the consistent linearization of the implicit saturation update:
//!
//! ```text
//! L  = ∂Cc/∂pc      Lx = ∂²Cc/∂pc²
//! J  = ∂Cc/∂sl      Jx = ∂²Cc/(∂pc ∂sl)    Jy = ∂²Cc/∂sl²
//! ```
//!
//! Non-rate models additionally expose the direct relation sl(pc).

mod brooks_corey;
mod linear;
mod pedroso_williams;
mod van_genuchten;

pub use brooks_corey::*;
pub use linear::*;
pub use pedroso_williams::*;
pub use van_genuchten::*;

use crate::base::{Error, ParamLiquidRetention};

/// Holds the full derivative set of the Cc function
#[derive(Clone, Copy, Debug, Default)]
pub struct RetentionDerivs {
    /// L = ∂Cc/∂pc
    pub l: f64,

    /// Lx = ∂²Cc/∂pc²
    pub lx: f64,

    /// J = ∂Cc/∂sl
    pub j: f64,

    /// Jx = ∂²Cc/(∂pc ∂sl)
    pub jx: f64,

    /// Jy = ∂²Cc/∂sl²
    pub jy: f64,
}

/// Defines the behavior of liquid retention models
pub trait LiquidRetentionTrait: Send + Sync {
    /// Returns the minimum saturation
    fn sl_min(&self) -> f64;

    /// Returns the maximum saturation
    fn sl_max(&self) -> f64;

    /// Computes Cc = dsl/dpc
    fn cc(&self, pc: f64, sl: f64, wetting: bool) -> Result<f64, Error>;

    /// Computes L = ∂Cc/∂pc
    fn ll(&self, pc: f64, sl: f64, wetting: bool) -> Result<f64, Error>;

    /// Computes J = ∂Cc/∂sl
    fn jj(&self, pc: f64, sl: f64, wetting: bool) -> Result<f64, Error>;

    /// Computes the full derivative set of Cc
    fn derivs(&self, pc: f64, sl: f64, wetting: bool) -> Result<RetentionDerivs, Error>;

    /// Returns sl(pc) directly for non-rate models; None for rate-type models
    fn sl_direct(&self, pc: f64) -> Option<f64>;
}

/// Implements a dispatcher over the available liquid retention models
pub struct LiquidRetention {
    /// Actual model implementation
    pub base: Box<dyn LiquidRetentionTrait>,

    nonrate: bool,
}

impl LiquidRetention {
    /// Allocates a new liquid retention model
    pub fn new(param: &ParamLiquidRetention) -> Result<Self, Error> {
        let (base, nonrate): (Box<dyn LiquidRetentionTrait>, bool) = match param {
            ParamLiquidRetention::Linear { .. } => (Box::new(RetentionLinear::new(param)?), true),
            ParamLiquidRetention::BrooksCorey { .. } => (Box::new(RetentionBrooksCorey::new(param)?), true),
            ParamLiquidRetention::VanGenuchten { .. } => (Box::new(RetentionVanGenuchten::new(param)?), true),
            ParamLiquidRetention::PedrosoWilliams { .. } => (Box::new(RetentionPedrosoWilliams::new(param)?), false),
        };
        Ok(LiquidRetention { base, nonrate })
    }

    /// Tells whether the model is non-rate (direct sl(pc) available)
    pub fn is_nonrate(&self) -> bool {
        self.nonrate
    }

    /// Returns the minimum saturation
    pub fn sl_min(&self) -> f64 {
        self.base.sl_min()
    }

    /// Returns the maximum saturation
    pub fn sl_max(&self) -> f64 {
        self.base.sl_max()
    }

    /// Computes Cc = dsl/dpc
    pub fn cc(&self, pc: f64, sl: f64, wetting: bool) -> Result<f64, Error> {
        self.base.cc(pc, sl, wetting)
    }

    /// Computes L = ∂Cc/∂pc
    pub fn ll(&self, pc: f64, sl: f64, wetting: bool) -> Result<f64, Error> {
        self.base.ll(pc, sl, wetting)
    }

    /// Computes J = ∂Cc/∂sl
    pub fn jj(&self, pc: f64, sl: f64, wetting: bool) -> Result<f64, Error> {
        self.base.jj(pc, sl, wetting)
    }

    /// Computes the full derivative set of Cc
    pub fn derivs(&self, pc: f64, sl: f64, wetting: bool) -> Result<RetentionDerivs, Error> {
        self.base.derivs(pc, sl, wetting)
    }

    /// Returns sl(pc) directly for non-rate models
    pub fn sl_direct(&self, pc: f64) -> Option<f64> {
        self.base.sl_direct(pc)
    }
}

/// Integrates dsl/dpc = Cc along a capillary pressure increment
///
/// Sub-stepped scheme with a modified-Euler predictor and a backward-Euler
/// Newton correction per sub-step. Used to initialize states of rate-type
/// models for a given capillary pressure reached by monotonic drying or
/// wetting from (pc0, sl0).
pub fn update_path(mdl: &LiquidRetention, pc0: f64, sl0: f64, dpc: f64, nsub: usize) -> Result<f64, Error> {
    if nsub == 0 {
        return Err(Error::Config("retention path update requires at least one sub-step"));
    }
    let wet = dpc < 0.0;
    let h = dpc / (nsub as f64);
    let (sl_min, sl_max) = (mdl.sl_min(), mdl.sl_max());
    let mut pc = pc0;
    let mut sl = sl0;
    for _ in 0..nsub {
        let pc_new = pc + h;
        // modified-Euler trial
        let f0 = mdl.cc(pc, sl, wet)?;
        let f1 = mdl.cc(pc_new, sl + h * f0, wet)?;
        let mut sl_new = sl + 0.5 * h * (f0 + f1);
        sl_new = f64::max(sl_min, f64::min(sl_max, sl_new));
        // backward-Euler correction
        let mut converged = false;
        for _ in 0..20 {
            let r = sl_new - sl - h * mdl.cc(pc_new, sl_new, wet)?;
            if f64::abs(r) < 1e-10 {
                converged = true;
                break;
            }
            let j = mdl.jj(pc_new, sl_new, wet)?;
            sl_new -= r / (1.0 - h * j);
        }
        if !converged {
            return Err(Error::Convergence("retention path update failed to converge"));
        }
        pc = pc_new;
        sl = sl_new;
    }
    Ok(sl)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
