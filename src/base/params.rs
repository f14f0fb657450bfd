use super::Error;
use serde::{Deserialize, Serialize};

/// Holds a list of named scalar parameters
///
/// The porous model reads the following recognized keys (absent keys fall
/// back to documented defaults):
///
/// * `nf0` -- initial porosity (required)
/// * `RhoS0` -- initial real density of solid grains (required)
/// * `kl` or `klx`,`kly`,`klz` -- saturated liquid conductivity (required)
/// * `kg` or `kgx`,`kgy`,`kgz` -- saturated gas conductivity
/// * `NmaxIt` -- maximum local Newton iterations (default 20)
/// * `Itol` -- local Newton residual tolerance (default 1e-9)
/// * `PcZero` -- threshold for the saturated fast path (default 1e-10)
/// * `MEtrial` -- use modified-Euler trial (default 1 = true)
/// * `ShowR` -- print residuals of the local Newton loop (debug only)
/// * `AllBE` -- force backward-Euler even for non-rate models (debug only)
/// * `Ncns` -- use non-consistent Ccb (debug only)
/// * `Ncns2` -- use non-consistent Ccd (debug only)
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Params {
    list: Vec<(String, f64)>,
}

impl Params {
    /// Allocates an empty parameter list
    pub fn new() -> Self {
        Params { list: Vec::new() }
    }

    /// Appends a parameter and returns self (builder style)
    pub fn add(mut self, name: &str, value: f64) -> Self {
        self.list.push((name.to_string(), value));
        self
    }

    /// Finds a parameter by name
    pub fn find(&self, name: &str) -> Option<f64> {
        self.list.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    /// Returns the value of a required parameter
    pub fn get(&self, name: &str, msg_if_missing: &'static str) -> Result<f64, Error> {
        self.find(name).ok_or(Error::Config(msg_if_missing))
    }

    /// Returns the value of an optional parameter or a default
    pub fn get_or(&self, name: &str, default: f64) -> f64 {
        self.find(name).unwrap_or(default)
    }

    /// Returns an optional parameter interpreted as a flag (non-zero = true)
    pub fn flag(&self, name: &str, default: bool) -> bool {
        match self.find(name) {
            Some(v) => v != 0.0,
            None => default,
        }
    }
}

/// Holds parameters for the intrinsic (real) density of a fluid
///
/// The barotropic law is ρ(p) = ρ_ref + C · (p − p_ref)
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct ParamRealDensity {
    /// Compressibility coefficient C = dρ/dp
    pub cc: f64,

    /// Reference pressure
    pub p_ref: f64,

    /// Reference intrinsic density
    pub rho_ref: f64,
}

/// Holds parameters for the fluids occupying the pores
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct ParamFluids {
    /// Parameters for the liquid density
    pub density_liquid: ParamRealDensity,

    /// Parameters for the gas density (if present)
    pub density_gas: Option<ParamRealDensity>,
}

impl ParamFluids {
    /// Returns typical parameters for water and dry air (SI units, kPa-based)
    pub fn sample_water_and_air() -> Self {
        ParamFluids {
            density_liquid: ParamRealDensity {
                cc: 4.53e-7,
                p_ref: 0.0,
                rho_ref: 1.0,
            },
            density_gas: Some(ParamRealDensity {
                cc: 1.17e-5,
                p_ref: 0.0,
                rho_ref: 0.0012,
            }),
        }
    }
}

/// Holds parameters for relative conductivity models
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub enum ParamConductivity {
    /// Constant relative permeabilities
    Constant {
        /// Relative liquid permeability
        klr: f64,

        /// Relative gas permeability
        kgr: f64,
    },

    /// Relative permeabilities linear in saturation, clamped at one
    Linear {
        /// Slope of klr versus sl
        lambda_l: f64,

        /// Slope of kgr versus sg
        lambda_g: f64,
    },

    /// Corey-type power law over effective saturations
    PowerLaw {
        /// Exponent of the liquid relative permeability
        beta_l: f64,

        /// Exponent of the gas relative permeability
        beta_g: f64,

        /// Residual liquid saturation
        sl_r: f64,

        /// Residual gas saturation
        sg_r: f64,
    },
}

impl ParamConductivity {
    /// Returns a sample power-law parameter set
    pub fn sample_power_law() -> Self {
        ParamConductivity::PowerLaw {
            beta_l: 3.0,
            beta_g: 3.0,
            sl_r: 0.01,
            sg_r: 0.01,
        }
    }
}

/// Holds parameters for liquid retention models
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub enum ParamLiquidRetention {
    /// Piecewise-linear retention curve (non-rate)
    Linear {
        /// Slope -dsl/dpc beyond the air-entry pressure
        lambda: f64,

        /// Air-entry capillary pressure
        pc_ae: f64,

        /// Minimum saturation
        sl_min: f64,

        /// Maximum saturation
        sl_max: f64,
    },

    /// Brooks-Corey retention curve (non-rate)
    BrooksCorey {
        /// Pore-size distribution index
        lambda: f64,

        /// Air-entry capillary pressure
        pc_ae: f64,

        /// Residual saturation
        sl_min: f64,

        /// Maximum saturation
        sl_max: f64,
    },

    /// van Genuchten retention curve (non-rate)
    VanGenuchten {
        /// α coefficient
        alpha: f64,

        /// m exponent
        m: f64,

        /// n exponent
        n: f64,

        /// Residual saturation
        sl_min: f64,

        /// Maximum saturation
        sl_max: f64,

        /// Capillary pressure below which the curve is flat
        pc_min: f64,
    },

    /// Pedroso-Williams rate-type hysteretic retention model
    PedrosoWilliams {
        /// Enables the distinct wetting branch
        with_hysteresis: bool,

        /// Slope coefficient of the main drying curve
        lambda_d: f64,

        /// Slope coefficient of the main wetting curve
        lambda_w: f64,

        /// Rate coefficient of the main drying curve
        beta_d: f64,

        /// Rate coefficient of the main wetting curve
        beta_w: f64,

        /// Rate coefficient of the drying scanning curves
        beta_1: f64,

        /// Rate coefficient of the wetting scanning curves
        beta_2: f64,

        /// Reference x(pc) for the drying curve
        x_rd: f64,

        /// Reference x(pc) for the wetting curve
        x_rw: f64,

        /// Maximum saturation
        y_0: f64,

        /// Residual saturation
        y_r: f64,
    },
}

impl ParamLiquidRetention {
    /// Returns a sample Brooks-Corey parameter set
    pub fn sample_brooks_corey() -> Self {
        ParamLiquidRetention::BrooksCorey {
            lambda: 3.0,
            pc_ae: 2.6,
            sl_min: 0.0955,
            sl_max: 1.0,
        }
    }

    /// Returns a sample Pedroso-Williams parameter set (silty sand)
    pub fn sample_pedroso_williams() -> Self {
        ParamLiquidRetention::PedrosoWilliams {
            with_hysteresis: true,
            lambda_d: 3.0,
            lambda_w: 3.0,
            beta_d: 6.0,
            beta_w: 6.0,
            beta_1: 6.0,
            beta_2: 6.0,
            x_rd: 2.0,
            x_rw: 2.0,
            y_0: 1.0,
            y_r: 0.005,
        }
    }
}

/// Holds parameters for stress-strain models of the solid skeleton
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub enum ParamStressStrain {
    /// Linear elasticity
    LinearElastic {
        /// Young's modulus
        young: f64,

        /// Poisson's coefficient
        poisson: f64,
    },
}

/// Holds parameters for solid (skeleton) elements
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct ParamSolid {
    /// Density used for the body force of uncoupled solid elements
    pub density: f64,

    /// Parameters of the stress-strain model
    pub stress_strain: ParamStressStrain,
}

impl ParamSolid {
    /// Returns a sample linear-elastic parameter set
    pub fn sample_linear_elastic() -> Self {
        ParamSolid {
            density: 2.7,
            stress_strain: ParamStressStrain::LinearElastic {
                young: 10_000.0,
                poisson: 0.2,
            },
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{ParamFluids, ParamLiquidRetention, Params};
    use crate::base::Error;

    #[test]
    fn params_find_get_work() {
        let params = Params::new().add("nf0", 0.3).add("RhoS0", 2.7).add("kl", 1e-3);
        assert_eq!(params.find("nf0"), Some(0.3));
        assert_eq!(params.find("kg"), None);
        assert_eq!(params.get("RhoS0", "missing RhoS0"), Ok(2.7));
        assert_eq!(params.get("kg", "missing kg"), Err(Error::Config("missing kg")));
        assert_eq!(params.get_or("Itol", 1e-9), 1e-9);
        assert_eq!(params.get_or("kl", 0.0), 1e-3);
        assert!(params.flag("MEtrial", true));
        assert!(!Params::new().add("MEtrial", 0.0).flag("MEtrial", true));
    }

    #[test]
    fn sample_params_work() {
        let fluids = ParamFluids::sample_water_and_air();
        assert_eq!(fluids.density_liquid.rho_ref, 1.0);
        assert!(fluids.density_gas.is_some());
        let lrm = ParamLiquidRetention::sample_pedroso_williams();
        match lrm {
            ParamLiquidRetention::PedrosoWilliams { y_0, y_r, .. } => {
                assert_eq!(y_0, 1.0);
                assert_eq!(y_r, 0.005);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn serde_works() {
        let params = Params::new().add("nf0", 0.3);
        let json = serde_json::to_string(&params).unwrap();
        let back: Params = serde_json::from_str(&json).unwrap();
        assert_eq!(back.find("nf0"), Some(0.3));
    }
}
