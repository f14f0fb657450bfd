use crate::base::{Error, ParamStressStrain};
use russell_tensor::{t4_ddot_t2_update, LinElasticity, Tensor2, Tensor4};

/// Implements the stress-strain model of the solid skeleton
///
/// Only linear elasticity is available; the consistent tangent is the
/// (constant) elastic modulus in Mandel basis.
pub struct StressStrain {
    /// Linear elasticity backend
    pub model: LinElasticity,
}

impl StressStrain {
    /// Allocates a new stress-strain model (plane-strain in 2D)
    pub fn new(param: &ParamStressStrain, two_dim: bool) -> Result<Self, Error> {
        match param {
            &ParamStressStrain::LinearElastic { young, poisson } => {
                if young <= 0.0 {
                    return Err(Error::Config("stress-strain model: Young's modulus must be positive"));
                }
                if poisson < 0.0 || poisson >= 0.5 {
                    return Err(Error::Config("stress-strain model: Poisson's coefficient must be in [0, 0.5)"));
                }
                Ok(StressStrain {
                    model: LinElasticity::new(young, poisson, two_dim, false),
                })
            }
        }
    }

    /// Returns the consistent modulus D
    pub fn modulus(&self) -> &Tensor4 {
        self.model.get_modulus()
    }

    /// Updates the stress tensor: σ += D : Δε
    pub fn update_stress(&self, sigma: &mut Tensor2, delta_strain: &Tensor2) {
        t4_ddot_t2_update(sigma, 1.0, self.model.get_modulus(), delta_strain, 1.0);
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
