use crate::base::{Error, ParamRealDensity};

/// Implements the barotropic model for the intrinsic (real) density of a fluid
///
/// ```text
/// ρ(p) = ρ_ref + C · (p − p_ref)
/// ```
///
/// The model also provides the closed-form pressure and density along a
/// static fluid column of height H under gravity, used for hydrostatic
/// initialization (see also [`crate::analytical::ColumnFluidPressure`]).
#[derive(Clone, Copy, Debug)]
pub struct Fluid {
    /// Compressibility coefficient C = dρ/dp
    pub cc: f64,

    /// Reference pressure
    pub p_ref: f64,

    /// Reference intrinsic density
    pub rho_ref: f64,

    /// Indicates that this fluid is the gas phase
    pub gas: bool,

    /// Column height for hydrostatic initialization
    pub height: f64,

    /// Gravity intensity (positive constant)
    pub gravity: f64,
}

impl Fluid {
    /// Allocates a new fluid model
    pub fn new(param: &ParamRealDensity, gas: bool, height: f64, gravity: f64) -> Result<Self, Error> {
        if param.cc <= 0.0 {
            return Err(Error::Config("fluid: compressibility coefficient C must be positive"));
        }
        if param.rho_ref < 0.0 {
            return Err(Error::Config("fluid: reference density must be non-negative"));
        }
        Ok(Fluid {
            cc: param.cc,
            p_ref: param.p_ref,
            rho_ref: param.rho_ref,
            gas,
            height,
            gravity,
        })
    }

    /// Computes the intrinsic density for a given pressure
    pub fn density(&self, p: f64) -> f64 {
        self.rho_ref + self.cc * (p - self.p_ref)
    }

    /// Computes pressure and density at elevation z of a static column
    ///
    /// The column top is at z = H with p = p_ref; returns (p, ρ)
    pub fn calc(&self, z: f64) -> (f64, f64) {
        let e = f64::exp(self.cc * self.gravity * (self.height - z));
        let p = self.p_ref + (self.rho_ref / self.cc) * (e - 1.0);
        let rho = self.rho_ref * e;
        (p, rho)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
