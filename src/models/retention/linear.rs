use super::{LiquidRetentionTrait, RetentionDerivs};
use crate::base::{Error, ParamLiquidRetention};

/// Implements a piecewise-linear retention curve (non-rate)
///
/// ```text
///        ⎧ sl_max                      if pc ≤ pc_ae
/// sl  =  ⎨ sl_max − λ·(pc − pc_ae)     if pc_ae < pc < pc_res
///        ⎩ sl_min                      if pc ≥ pc_res
/// ```
///
/// with pc_res = pc_ae + (sl_max − sl_min)/λ. Cc is −λ on the sloped branch
/// and zero elsewhere; all higher derivatives vanish.
pub struct RetentionLinear {
    lambda: f64,
    pc_ae: f64,
    sl_min: f64,
    sl_max: f64,
    pc_res: f64,
}

impl RetentionLinear {
    /// Allocates a new linear retention model
    pub fn new(param: &ParamLiquidRetention) -> Result<Self, Error> {
        match param {
            &ParamLiquidRetention::Linear {
                lambda,
                pc_ae,
                sl_min,
                sl_max,
            } => {
                if lambda <= 0.0 {
                    return Err(Error::Config("linear retention: lambda must be positive"));
                }
                if pc_ae < 0.0 {
                    return Err(Error::Config("linear retention: pc_ae must be non-negative"));
                }
                if sl_min < 0.0 || sl_min >= sl_max || sl_max > 1.0 {
                    return Err(Error::Config("linear retention: saturation limits must satisfy 0 ≤ sl_min < sl_max ≤ 1"));
                }
                Ok(RetentionLinear {
                    lambda,
                    pc_ae,
                    sl_min,
                    sl_max,
                    pc_res: pc_ae + (sl_max - sl_min) / lambda,
                })
            }
            _ => Err(Error::Config("linear retention: parameters do not match the model")),
        }
    }
}

impl LiquidRetentionTrait for RetentionLinear {
    fn sl_min(&self) -> f64 {
        self.sl_min
    }

    fn sl_max(&self) -> f64 {
        self.sl_max
    }

    fn cc(&self, pc: f64, _sl: f64, _wetting: bool) -> Result<f64, Error> {
        if pc <= self.pc_ae || pc >= self.pc_res {
            return Ok(0.0);
        }
        Ok(-self.lambda)
    }

    fn ll(&self, _pc: f64, _sl: f64, _wetting: bool) -> Result<f64, Error> {
        Ok(0.0)
    }

    fn jj(&self, _pc: f64, _sl: f64, _wetting: bool) -> Result<f64, Error> {
        Ok(0.0)
    }

    fn derivs(&self, _pc: f64, _sl: f64, _wetting: bool) -> Result<RetentionDerivs, Error> {
        Ok(RetentionDerivs::default())
    }

    fn sl_direct(&self, pc: f64) -> Option<f64> {
        if pc <= self.pc_ae {
            return Some(self.sl_max);
        }
        Some(f64::max(self.sl_min, self.sl_max - self.lambda * (pc - self.pc_ae)))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
