use crate::base::Error;

/// Computes the pressure and density along a static column of compressible fluid
///
/// The fluid obeys ρ(p) = R0 + C·(p − p0) and the column of height H is in
/// equilibrium under constant gravity g, with p = p0 at the top (z = H):
///
/// ```text
/// p(z) = p0 + (R0/C)·(exp(C·g·(H − z)) − 1)
/// ρ(z) = R0·exp(C·g·(H − z))
/// ```
pub struct ColumnFluidPressure {
    /// Reference density at the top of the column
    pub rho0: f64,

    /// Reference pressure at the top of the column
    pub p0: f64,

    /// Compressibility coefficient C = dρ/dp
    pub cc: f64,

    /// Column height
    pub height: f64,

    /// Gravity intensity (positive constant)
    pub gravity: f64,
}

impl ColumnFluidPressure {
    /// Allocates a new solution structure
    pub fn new(rho0: f64, p0: f64, cc: f64, height: f64, gravity: f64) -> Result<Self, Error> {
        if cc <= 0.0 {
            return Err(Error::Config("column solution: compressibility coefficient C must be positive"));
        }
        if height <= 0.0 || gravity <= 0.0 {
            return Err(Error::Config("column solution: height and gravity must be positive"));
        }
        Ok(ColumnFluidPressure {
            rho0,
            p0,
            cc,
            height,
            gravity,
        })
    }

    /// Computes pressure and density at elevation z; returns (p, ρ)
    pub fn calc(&self, z: f64) -> (f64, f64) {
        let e = f64::exp(self.cc * self.gravity * (self.height - z));
        let p = self.p0 + (self.rho0 / self.cc) * (e - 1.0);
        let rho = self.rho0 * e;
        (p, rho)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
