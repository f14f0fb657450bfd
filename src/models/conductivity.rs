use crate::base::{Error, ParamConductivity};

/// Implements relative permeability models for liquid and gas
///
/// Returns the dimensionless multipliers klr(sl) ∈ \[0, 1\] and kgr(sg) ∈
/// \[0, 1\] applied to the saturated conductivity tensors, together with
/// their derivatives with respect to the corresponding saturation.
#[derive(Clone, Copy, Debug)]
pub struct Conductivity {
    param: ParamConductivity,
}

impl Conductivity {
    /// Allocates a new conductivity model
    pub fn new(param: &ParamConductivity) -> Result<Self, Error> {
        match param {
            ParamConductivity::Constant { klr, kgr } => {
                if *klr < 0.0 || *klr > 1.0 || *kgr < 0.0 || *kgr > 1.0 {
                    return Err(Error::Config("conductivity: constant klr and kgr must be in [0,1]"));
                }
            }
            ParamConductivity::Linear { lambda_l, lambda_g } => {
                if *lambda_l < 0.0 || *lambda_g < 0.0 {
                    return Err(Error::Config("conductivity: linear slopes must be non-negative"));
                }
            }
            ParamConductivity::PowerLaw { beta_l, beta_g, sl_r, sg_r } => {
                if *beta_l < 1.0 || *beta_g < 1.0 {
                    return Err(Error::Config("conductivity: power-law exponents must be at least one"));
                }
                if *sl_r < 0.0 || *sl_r >= 1.0 || *sg_r < 0.0 || *sg_r >= 1.0 {
                    return Err(Error::Config("conductivity: residual saturations must be in [0,1)"));
                }
            }
        }
        Ok(Conductivity { param: *param })
    }

    /// Computes the relative liquid permeability klr(sl)
    pub fn klr(&self, sl: f64) -> f64 {
        match self.param {
            ParamConductivity::Constant { klr, .. } => klr,
            ParamConductivity::Linear { lambda_l, .. } => f64::min(1.0, lambda_l * f64::max(sl, 0.0)),
            ParamConductivity::PowerLaw { beta_l, sl_r, .. } => {
                let se = (sl - sl_r) / (1.0 - sl_r);
                if se <= 0.0 {
                    0.0
                } else if se >= 1.0 {
                    1.0
                } else {
                    f64::powf(se, beta_l)
                }
            }
        }
    }

    /// Computes the relative gas permeability kgr(sg)
    pub fn kgr(&self, sg: f64) -> f64 {
        match self.param {
            ParamConductivity::Constant { kgr, .. } => kgr,
            ParamConductivity::Linear { lambda_g, .. } => f64::min(1.0, lambda_g * f64::max(sg, 0.0)),
            ParamConductivity::PowerLaw { beta_g, sg_r, .. } => {
                let se = (sg - sg_r) / (1.0 - sg_r);
                if se <= 0.0 {
                    0.0
                } else if se >= 1.0 {
                    1.0
                } else {
                    f64::powf(se, beta_g)
                }
            }
        }
    }

    /// Computes the derivative dklr/dsl
    pub fn dklr_dsl(&self, sl: f64) -> f64 {
        match self.param {
            ParamConductivity::Constant { .. } => 0.0,
            ParamConductivity::Linear { lambda_l, .. } => {
                if sl <= 0.0 || lambda_l * sl >= 1.0 {
                    0.0
                } else {
                    lambda_l
                }
            }
            ParamConductivity::PowerLaw { beta_l, sl_r, .. } => {
                let se = (sl - sl_r) / (1.0 - sl_r);
                if se <= 0.0 || se >= 1.0 {
                    0.0
                } else {
                    beta_l * f64::powf(se, beta_l - 1.0) / (1.0 - sl_r)
                }
            }
        }
    }

    /// Computes the derivative dkgr/dsg
    pub fn dkgr_dsg(&self, sg: f64) -> f64 {
        match self.param {
            ParamConductivity::Constant { .. } => 0.0,
            ParamConductivity::Linear { lambda_g, .. } => {
                if sg <= 0.0 || lambda_g * sg >= 1.0 {
                    0.0
                } else {
                    lambda_g
                }
            }
            ParamConductivity::PowerLaw { beta_g, sg_r, .. } => {
                let se = (sg - sg_r) / (1.0 - sg_r);
                if se <= 0.0 || se >= 1.0 {
                    0.0
                } else {
                    beta_g * f64::powf(se, beta_g - 1.0) / (1.0 - sg_r)
                }
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::Conductivity;
    use crate::base::ParamConductivity;
    use russell_lab::{approx_eq, deriv1_central5};

    #[test]
    fn new_captures_errors() {
        assert!(Conductivity::new(&ParamConductivity::Constant { klr: 1.5, kgr: 0.5 }).is_err());
        assert!(Conductivity::new(&ParamConductivity::Linear {
            lambda_l: -1.0,
            lambda_g: 0.0
        })
        .is_err());
        assert!(Conductivity::new(&ParamConductivity::PowerLaw {
            beta_l: 0.5,
            beta_g: 3.0,
            sl_r: 0.0,
            sg_r: 0.0
        })
        .is_err());
    }

    #[test]
    fn values_stay_in_unit_interval() {
        let cnd = Conductivity::new(&ParamConductivity::sample_power_law()).unwrap();
        for i in 0..=20 {
            let s = (i as f64) / 20.0;
            let klr = cnd.klr(s);
            let kgr = cnd.kgr(s);
            assert!((0.0..=1.0).contains(&klr));
            assert!((0.0..=1.0).contains(&kgr));
        }
        assert_eq!(cnd.klr(0.005), 0.0); // below residual saturation
        assert_eq!(cnd.klr(1.0), 1.0);
    }

    #[test]
    fn derivatives_match_numerical() {
        let models = [
            Conductivity::new(&ParamConductivity::sample_power_law()).unwrap(),
            Conductivity::new(&ParamConductivity::Linear {
                lambda_l: 1.2,
                lambda_g: 1.2,
            })
            .unwrap(),
            Conductivity::new(&ParamConductivity::Constant { klr: 0.5, kgr: 0.5 }).unwrap(),
        ];
        for cnd in &models {
            for s in [0.2, 0.5, 0.7] {
                let ana = cnd.dklr_dsl(s);
                let num = deriv1_central5(s, &mut 0, |x, _: &mut i32| Ok(cnd.klr(x))).unwrap();
                approx_eq(ana, num, 1e-8);
                let ana = cnd.dkgr_dsg(s);
                let num = deriv1_central5(s, &mut 0, |x, _: &mut i32| Ok(cnd.kgr(x))).unwrap();
                approx_eq(ana, num, 1e-8);
            }
        }
    }
}
