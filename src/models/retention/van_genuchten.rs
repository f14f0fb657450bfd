use super::{LiquidRetentionTrait, RetentionDerivs};
use crate::base::{Error, ParamLiquidRetention};

/// Implements the van Genuchten retention curve (non-rate)
///
/// ```text
/// sl(pc) = sl_min + (sl_max − sl_min)·(1 + (α·pc)ⁿ)⁻ᵐ    for pc > pc_min
/// sl(pc) = sl_max                                        for pc ≤ pc_min
/// ```
pub struct RetentionVanGenuchten {
    alpha: f64,
    m: f64,
    n: f64,
    sl_min: f64,
    sl_max: f64,
    pc_min: f64,
}

impl RetentionVanGenuchten {
    /// Allocates a new van Genuchten retention model
    pub fn new(param: &ParamLiquidRetention) -> Result<Self, Error> {
        match param {
            &ParamLiquidRetention::VanGenuchten {
                alpha,
                m,
                n,
                sl_min,
                sl_max,
                pc_min,
            } => {
                if alpha <= 0.0 || m <= 0.0 || n <= 0.0 {
                    return Err(Error::Config("van genuchten: alpha, m and n must be positive"));
                }
                if sl_min < 0.0 || sl_min >= sl_max || sl_max > 1.0 {
                    return Err(Error::Config("van genuchten: saturation limits must satisfy 0 ≤ sl_min < sl_max ≤ 1"));
                }
                if pc_min < 0.0 {
                    return Err(Error::Config("van genuchten: pc_min must be non-negative"));
                }
                Ok(RetentionVanGenuchten {
                    alpha,
                    m,
                    n,
                    sl_min,
                    sl_max,
                    pc_min,
                })
            }
            _ => Err(Error::Config("van genuchten: parameters do not match the model")),
        }
    }

    /// Returns (u, ds) with u = (α·pc)ⁿ
    fn aux(&self, pc: f64) -> (f64, f64) {
        (f64::powf(self.alpha * pc, self.n), self.sl_max - self.sl_min)
    }
}

impl LiquidRetentionTrait for RetentionVanGenuchten {
    fn sl_min(&self) -> f64 {
        self.sl_min
    }

    fn sl_max(&self) -> f64 {
        self.sl_max
    }

    fn cc(&self, pc: f64, _sl: f64, _wetting: bool) -> Result<f64, Error> {
        if pc <= self.pc_min {
            return Ok(0.0);
        }
        let (u, ds) = self.aux(pc);
        let (m, n) = (self.m, self.n);
        Ok(-ds * m * n * u * f64::powf(1.0 + u, -m - 1.0) / pc)
    }

    fn ll(&self, pc: f64, _sl: f64, _wetting: bool) -> Result<f64, Error> {
        if pc <= self.pc_min {
            return Ok(0.0);
        }
        let (u, ds) = self.aux(pc);
        let (m, n) = (self.m, self.n);
        let t1 = n * (1.0 - m * u) - (1.0 + u);
        Ok(-ds * m * n * u * f64::powf(1.0 + u, -m - 2.0) * t1 / (pc * pc))
    }

    fn jj(&self, _pc: f64, _sl: f64, _wetting: bool) -> Result<f64, Error> {
        Ok(0.0)
    }

    fn derivs(&self, pc: f64, sl: f64, wetting: bool) -> Result<RetentionDerivs, Error> {
        let mut res = RetentionDerivs::default();
        if pc <= self.pc_min {
            return Ok(res);
        }
        let (u, ds) = self.aux(pc);
        let (m, n) = (self.m, self.n);
        res.l = self.ll(pc, sl, wetting)?;
        let t1 = n * (1.0 - m * u) - (1.0 + u);
        let t2 = n * ((n - 1.0) * (1.0 - (m + 1.0) * u) - (1.0 + m * n) * u * (2.0 - m * u)) - 2.0 * (1.0 + u) * t1;
        res.lx = -ds * m * n * u * f64::powf(1.0 + u, -m - 3.0) * t2 / (pc * pc * pc);
        Ok(res)
    }

    fn sl_direct(&self, pc: f64) -> Option<f64> {
        if pc <= self.pc_min {
            return Some(self.sl_max);
        }
        let (u, ds) = self.aux(pc);
        Some(self.sl_min + ds * f64::powf(1.0 + u, -self.m))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::RetentionVanGenuchten;
    use crate::base::ParamLiquidRetention;
    use crate::models::retention::LiquidRetentionTrait;
    use russell_lab::{approx_eq, deriv1_central5};

    fn sample() -> RetentionVanGenuchten {
        RetentionVanGenuchten::new(&ParamLiquidRetention::VanGenuchten {
            alpha: 0.08,
            m: 4.0,
            n: 4.0,
            sl_min: 0.01,
            sl_max: 1.0,
            pc_min: 0.001,
        })
        .unwrap()
    }

    #[test]
    fn new_captures_errors() {
        assert!(RetentionVanGenuchten::new(&ParamLiquidRetention::VanGenuchten {
            alpha: 0.0,
            m: 4.0,
            n: 4.0,
            sl_min: 0.01,
            sl_max: 1.0,
            pc_min: 0.0,
        })
        .is_err());
        assert!(RetentionVanGenuchten::new(&ParamLiquidRetention::sample_brooks_corey()).is_err());
    }

    #[test]
    fn direct_relation_works() {
        let mdl = sample();
        assert_eq!(mdl.sl_direct(-1.0), Some(1.0));
        let sl = mdl.sl_direct(12.5).unwrap();
        let u = f64::powf(0.08 * 12.5, 4.0);
        approx_eq(sl, 0.01 + 0.99 * f64::powf(1.0 + u, -4.0), 1e-15);
    }

    #[test]
    fn cc_matches_the_slope_of_the_direct_relation() {
        let mdl = sample();
        for pc in [0.5, 2.0, 5.0, 10.0, 30.0] {
            let ana = mdl.cc(pc, 0.5, false).unwrap();
            let num = deriv1_central5(pc, &mut 0, |x, _: &mut i32| Ok(mdl.sl_direct(x).unwrap())).unwrap();
            approx_eq(ana, num, 1e-8);
        }
    }

    #[test]
    fn derivatives_match_numerical() {
        let mdl = sample();
        for pc in [0.5, 2.0, 5.0, 10.0] {
            let l_ana = mdl.ll(pc, 0.5, false).unwrap();
            let l_num = deriv1_central5(pc, &mut 0, |x, _: &mut i32| mdl.cc(x, 0.5, false).map_err(|e| e.msg())).unwrap();
            approx_eq(l_ana, l_num, 1e-8);
            let d = mdl.derivs(pc, 0.5, false).unwrap();
            let lx_num = deriv1_central5(pc, &mut 0, |x, _: &mut i32| mdl.ll(x, 0.5, false).map_err(|e| e.msg())).unwrap();
            approx_eq(d.lx, lx_num, 1e-8);
        }
    }
}
