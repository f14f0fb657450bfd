use russell_tensor::{Mandel, Tensor2};
use serde::{Deserialize, Serialize};

/// Holds the internal variables of the porous medium at an integration point
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct StatePorous {
    /// Initial partial fraction of solids ns0 = (1 − nf0)·exp(−εv)
    pub ns0: f64,

    /// Liquid saturation
    pub sl: f64,

    /// Intrinsic (real) liquid density
    pub rho_ll: f64,

    /// Intrinsic (real) gas density
    pub rho_gg: f64,

    /// Capillary pressure increment of the last update
    pub delta_pc: f64,

    /// Indicates that the last update followed the wetting branch
    pub wetting: bool,
}

impl StatePorous {
    /// Copies all values from another state
    pub fn set(&mut self, other: &StatePorous) {
        self.ns0 = other.ns0;
        self.sl = other.sl;
        self.rho_ll = other.rho_ll;
        self.rho_gg = other.rho_gg;
        self.delta_pc = other.delta_pc;
        self.wetting = other.wetting;
    }
}

/// Holds the stress state of the solid skeleton at an integration point
#[derive(Clone, Debug)]
pub struct StateStress {
    /// Effective (Mandel) stress tensor
    pub sigma: Tensor2,
}

impl StateStress {
    /// Allocates a new zeroed stress state
    pub fn new(two_dim: bool) -> Self {
        let mandel = if two_dim { Mandel::Symmetric2D } else { Mandel::Symmetric };
        StateStress {
            sigma: Tensor2::new(mandel),
        }
    }

    /// Copies all values from another state
    pub fn set(&mut self, other: &StateStress) {
        for i in 0..other.sigma.vector().dim() {
            self.sigma.vector_mut()[i] = other.sigma.vector()[i];
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{StatePorous, StateStress};

    #[test]
    fn state_porous_set_and_serde_work() {
        let state = StatePorous {
            ns0: 0.7,
            sl: 0.95,
            rho_ll: 1.0,
            rho_gg: 0.0012,
            delta_pc: 0.5,
            wetting: false,
        };
        let mut other = StatePorous {
            ns0: 0.0,
            sl: 0.0,
            rho_ll: 0.0,
            rho_gg: 0.0,
            delta_pc: 0.0,
            wetting: true,
        };
        other.set(&state);
        assert_eq!(other, state);
        let json = serde_json::to_string(&state).unwrap();
        let back: StatePorous = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn state_stress_set_works() {
        let mut a = StateStress::new(true);
        a.sigma.sym_set(0, 0, -1.5);
        a.sigma.sym_set(0, 1, 0.25);
        let mut b = StateStress::new(true);
        b.set(&a);
        assert_eq!(b.sigma.get(0, 0), -1.5);
        assert_eq!(b.sigma.get(1, 0), 0.25);
    }
}
