use super::{LiquidRetentionTrait, RetentionDerivs};
use crate::base::{Error, ParamLiquidRetention};

/// Implements the Brooks-Corey retention curve (non-rate)
///
/// ```text
/// sl(pc) = sl_min + (sl_max − sl_min)·(pc_ae/pc)^λ    for pc > pc_ae
/// sl(pc) = sl_max                                     for pc ≤ pc_ae
/// ```
pub struct RetentionBrooksCorey {
    lambda: f64,
    pc_ae: f64,
    sl_min: f64,
    sl_max: f64,
}

impl RetentionBrooksCorey {
    /// Allocates a new Brooks-Corey retention model
    pub fn new(param: &ParamLiquidRetention) -> Result<Self, Error> {
        match param {
            &ParamLiquidRetention::BrooksCorey {
                lambda,
                pc_ae,
                sl_min,
                sl_max,
            } => {
                if lambda <= 0.0 {
                    return Err(Error::Config("brooks-corey: lambda must be positive"));
                }
                if pc_ae <= 0.0 {
                    return Err(Error::Config("brooks-corey: pc_ae must be positive"));
                }
                if sl_min < 0.0 || sl_min >= sl_max || sl_max > 1.0 {
                    return Err(Error::Config("brooks-corey: saturation limits must satisfy 0 ≤ sl_min < sl_max ≤ 1"));
                }
                Ok(RetentionBrooksCorey {
                    lambda,
                    pc_ae,
                    sl_min,
                    sl_max,
                })
            }
            _ => Err(Error::Config("brooks-corey: parameters do not match the model")),
        }
    }
}

impl LiquidRetentionTrait for RetentionBrooksCorey {
    fn sl_min(&self) -> f64 {
        self.sl_min
    }

    fn sl_max(&self) -> f64 {
        self.sl_max
    }

    fn cc(&self, pc: f64, _sl: f64, _wetting: bool) -> Result<f64, Error> {
        if pc <= self.pc_ae {
            return Ok(0.0);
        }
        let ds = self.sl_max - self.sl_min;
        Ok(-ds * self.lambda * f64::powf(self.pc_ae / pc, self.lambda) / pc)
    }

    fn ll(&self, pc: f64, _sl: f64, _wetting: bool) -> Result<f64, Error> {
        if pc <= self.pc_ae {
            return Ok(0.0);
        }
        let (ds, la) = (self.sl_max - self.sl_min, self.lambda);
        Ok(ds * la * (la + 1.0) * f64::powf(self.pc_ae / pc, la) / (pc * pc))
    }

    fn jj(&self, _pc: f64, _sl: f64, _wetting: bool) -> Result<f64, Error> {
        Ok(0.0)
    }

    fn derivs(&self, pc: f64, sl: f64, wetting: bool) -> Result<RetentionDerivs, Error> {
        let mut res = RetentionDerivs::default();
        if pc <= self.pc_ae {
            return Ok(res);
        }
        let (ds, la) = (self.sl_max - self.sl_min, self.lambda);
        res.l = self.ll(pc, sl, wetting)?;
        res.lx = -ds * la * (la + 1.0) * (la + 2.0) * f64::powf(self.pc_ae / pc, la) / (pc * pc * pc);
        Ok(res)
    }

    fn sl_direct(&self, pc: f64) -> Option<f64> {
        if pc <= self.pc_ae {
            return Some(self.sl_max);
        }
        Some(self.sl_min + (self.sl_max - self.sl_min) * f64::powf(self.pc_ae / pc, self.lambda))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::RetentionBrooksCorey;
    use crate::base::ParamLiquidRetention;
    use crate::models::retention::LiquidRetentionTrait;
    use russell_lab::{approx_eq, deriv1_central5};

    fn sample() -> RetentionBrooksCorey {
        RetentionBrooksCorey::new(&ParamLiquidRetention::sample_brooks_corey()).unwrap()
    }

    #[test]
    fn direct_relation_works() {
        let mdl = sample();
        assert_eq!(mdl.sl_direct(1.0), Some(1.0));
        assert_eq!(mdl.sl_direct(2.6), Some(1.0));
        let sl = mdl.sl_direct(5.2).unwrap();
        approx_eq(sl, 0.0955 + (1.0 - 0.0955) * f64::powf(0.5, 3.0), 1e-15);
    }

    #[test]
    fn cc_matches_the_slope_of_the_direct_relation() {
        let mdl = sample();
        for pc in [3.0, 5.0, 10.0, 20.0] {
            let ana = mdl.cc(pc, 0.5, false).unwrap();
            let num = deriv1_central5(pc, &mut 0, |x, _: &mut i32| Ok(mdl.sl_direct(x).unwrap())).unwrap();
            approx_eq(ana, num, 1e-9);
        }
    }

    #[test]
    fn derivatives_match_numerical() {
        let mdl = sample();
        for pc in [3.0, 5.0, 10.0] {
            let l_ana = mdl.ll(pc, 0.5, false).unwrap();
            let l_num = deriv1_central5(pc, &mut 0, |x, _: &mut i32| mdl.cc(x, 0.5, false).map_err(|e| e.msg())).unwrap();
            approx_eq(l_ana, l_num, 1e-9);
            let d = mdl.derivs(pc, 0.5, false).unwrap();
            assert_eq!(d.l, l_ana);
            let lx_num = deriv1_central5(pc, &mut 0, |x, _: &mut i32| mdl.ll(x, 0.5, false).map_err(|e| e.msg())).unwrap();
            approx_eq(d.lx, lx_num, 1e-9);
            assert_eq!(d.j, 0.0);
        }
    }
}
