use crate::base::Error;
use russell_lab::Vector;
use serde::{Deserialize, Serialize};

/// Holds derived coefficients for transient analyses
///
/// The θ-method handles first-order (pressure) variables whereas the Newmark
/// method handles second-order (displacement) variables.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct DynCoefs {
    /// Derived value β1 for the θ-method
    pub beta1: f64,

    /// Derived value β2 for the θ-method
    pub beta2: f64,

    /// Derived value α1 for the Newmark method
    pub alpha1: f64,

    /// Derived value α2 for the Newmark method
    pub alpha2: f64,

    /// Derived value α3 for the Newmark method
    pub alpha3: f64,

    /// Derived value α4 for the Newmark method
    pub alpha4: f64,

    /// Derived value α5 for the Newmark method
    pub alpha5: f64,

    /// Derived value α6 for the Newmark method
    pub alpha6: f64,
}

impl DynCoefs {
    /// Returns zeroed coefficients corresponding to a steady simulation
    pub fn steady() -> Self {
        DynCoefs {
            beta1: 0.0,
            beta2: 0.0,
            alpha1: 0.0,
            alpha2: 0.0,
            alpha3: 0.0,
            alpha4: 0.0,
            alpha5: 0.0,
            alpha6: 0.0,
        }
    }

    /// Calculates the coefficients for a given time step h = Δt
    ///
    /// # Input
    ///
    /// * `dt` -- time increment
    /// * `theta` -- parameter of the θ-method; 0 < θ ≤ 1
    /// * `theta1` -- Newmark θ1 parameter; 0 ≤ θ1 ≤ 1
    /// * `theta2` -- Newmark θ2 parameter; 0 < θ2 ≤ 1
    pub fn transient(dt: f64, theta: f64, theta1: f64, theta2: f64) -> Result<Self, Error> {
        if dt < 1e-14 {
            return Err(Error::Config("transient coefficients: dt must be positive"));
        }
        if theta <= 0.0 || theta > 1.0 {
            return Err(Error::Config("transient coefficients: theta must be in (0, 1]"));
        }
        if theta1 < 0.0 || theta1 > 1.0 || theta2 <= 0.0 || theta2 > 1.0 {
            return Err(Error::Config("transient coefficients: Newmark parameters are out of range"));
        }
        let h = dt;
        let hh = h * h / 2.0;
        Ok(DynCoefs {
            beta1: 1.0 / (theta * h),
            beta2: (1.0 - theta) / theta,
            alpha1: 1.0 / (theta2 * hh),
            alpha2: h / (theta2 * hh),
            alpha3: (1.0 - theta2) / theta2,
            alpha4: theta1 * h / (theta2 * hh),
            alpha5: 2.0 * theta1 / theta2 - 1.0,
            alpha6: (theta1 / theta2 - 1.0) * h,
        })
    }
}

/// Holds the global solution data shared by all elements
pub struct Solution {
    /// Current time
    pub t: f64,

    /// Current time increment
    pub dt: f64,

    /// Primary variables
    pub y: Vector,

    /// Increment of the primary variables over the current time step
    pub dy: Vector,

    /// Star variables ψ* of first-order equations
    pub psi: Vector,

    /// Star variables ζ* of second-order equations
    pub zet: Vector,

    /// Star variables χ* of second-order equations
    pub chi: Vector,

    /// Indicates a steady simulation (all transient terms vanish)
    pub steady: bool,

    /// Indicates an axisymmetric simulation
    pub axisym: bool,

    /// Coefficients for the time discretization
    pub dyn_cfs: DynCoefs,
}

impl Solution {
    /// Allocates a new solution structure with ny equations
    pub fn new(ny: usize, steady: bool) -> Self {
        Solution {
            t: 0.0,
            dt: 0.0,
            y: Vector::new(ny),
            dy: Vector::new(ny),
            psi: Vector::new(ny),
            zet: Vector::new(ny),
            chi: Vector::new(ny),
            steady,
            axisym: false,
            dyn_cfs: DynCoefs::steady(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
