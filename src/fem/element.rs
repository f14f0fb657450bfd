use super::{Solution, SparseTriplet};
use crate::base::Error;
use crate::FnTime;
use russell_lab::Vector;
use std::collections::HashMap;

/// Defines the natural boundary condition types
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BcKey {
    /// Prescribed liquid flux q̄l
    Ql,

    /// Prescribed gas flux q̄g
    Qg,

    /// Seepage face
    Seep,
}

/// Holds a natural boundary condition applied to one face of an element
///
/// For flux conditions, the function returns the prescribed flux at time t.
/// For seepage conditions, the function returns the shift subtracted from plmax.
#[derive(Clone, Copy)]
pub struct NaturalBc {
    /// Condition type
    pub key: BcKey,

    /// Local index of the face
    pub face: usize,

    /// Flux value or plmax shift as a function of time
    pub fcn: FnTime,
}

/// Specifies how initial stresses are given to solid elements
pub enum InitialStresses {
    /// Effective stress components at each integration point
    Components {
        sx: Vec<f64>,
        sy: Vec<f64>,
        sz: Vec<f64>,
    },

    /// Total vertical stresses at each integration point with the coefficient
    /// of earth pressure at rest; horizontal stresses follow from σh' = K0·σv'
    TotalVertical { sv_total: Vec<f64>, kk0: f64 },
}

/// Holds output values at integration points, organized by key
pub struct IpsMap {
    map: HashMap<String, Vec<f64>>,
}

impl IpsMap {
    /// Allocates a new (empty) map
    pub fn new() -> Self {
        IpsMap { map: HashMap::new() }
    }

    /// Sets the value of key at integration point idx (of nip points)
    pub fn set(&mut self, key: &str, idx: usize, nip: usize, value: f64) {
        let slot = self.map.entry(key.to_string()).or_insert_with(|| vec![0.0; nip]);
        slot[idx] = value;
    }

    /// Returns the values of key at all integration points
    pub fn get(&self, key: &str) -> Option<&Vec<f64>> {
        self.map.get(key)
    }
}

/// Returns the liquid flow output keys for the given space dimension
pub fn liq_flow_keys(ndim: usize) -> Vec<String> {
    if ndim == 2 {
        vec!["nwlx".to_string(), "nwly".to_string()]
    } else {
        vec!["nwlx".to_string(), "nwly".to_string(), "nwlz".to_string()]
    }
}

/// Returns the gas flow output keys for the given space dimension
pub fn gas_flow_keys(ndim: usize) -> Vec<String> {
    if ndim == 2 {
        vec!["nwgx".to_string(), "nwgy".to_string()]
    } else {
        vec!["nwgx".to_string(), "nwgy".to_string(), "nwgz".to_string()]
    }
}

/// Defines the interface of finite elements
pub trait Element {
    /// Sets the global equation numbers; eqs[m] lists the equations of vertex m
    fn set_eqs(&mut self, eqs: &[Vec<usize>]) -> Result<(), Error>;

    /// Sets an element condition such as gravity (key = "g")
    fn set_ele_conds(&mut self, key: &str, fcn: FnTime) -> Result<(), Error>;

    /// Interpolates star variables to the integration points
    fn interp_star_vars(&mut self, sol: &Solution) -> Result<(), Error>;

    /// Adds the negative of the residual vector to fb
    fn add_to_rhs(&mut self, fb: &mut Vector, sol: &Solution) -> Result<(), Error>;

    /// Adds the element matrix K to the global Jacobian
    fn add_to_kb(&mut self, kb: &mut SparseTriplet, sol: &Solution, first_it: bool) -> Result<(), Error>;

    /// Updates the internal (state) variables with the current solution
    fn update(&mut self, sol: &Solution) -> Result<(), Error>;

    /// Sets the initial internal variables
    fn set_ini_ivs(&mut self, sol: &Solution, ini: Option<&InitialStresses>) -> Result<(), Error>;

    /// Creates a copy of the internal variables
    fn backup_ivs(&mut self, aux: bool);

    /// Restores the internal variables from copies
    fn restore_ivs(&mut self, aux: bool);

    /// Fixes the internal variables after displacements have been zeroed
    fn ureset(&mut self, sol: &Solution) -> Result<(), Error>;

    /// Encodes the internal variables
    fn encode(&self) -> Result<serde_json::Value, Error>;

    /// Decodes the internal variables
    fn decode(&mut self, value: &serde_json::Value) -> Result<(), Error>;

    /// Returns the real coordinates of the integration points
    fn out_ip_coords(&self) -> Vec<Vec<f64>>;

    /// Returns the available output keys
    fn out_ip_keys(&self) -> Vec<String>;

    /// Writes the output values at the integration points
    fn out_ip_vals(&mut self, map: &mut IpsMap, sol: &Solution) -> Result<(), Error>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{gas_flow_keys, liq_flow_keys, IpsMap};

    #[test]
    fn flow_keys_work() {
        assert_eq!(liq_flow_keys(2), &["nwlx", "nwly"]);
        assert_eq!(liq_flow_keys(3), &["nwlx", "nwly", "nwlz"]);
        assert_eq!(gas_flow_keys(2), &["nwgx", "nwgy"]);
    }

    #[test]
    fn ips_map_works() {
        let mut map = IpsMap::new();
        map.set("pl", 1, 4, -0.5);
        map.set("pl", 3, 4, 2.0);
        assert_eq!(map.get("pl").unwrap(), &[0.0, -0.5, 0.0, 2.0]);
        assert!(map.get("pg").is_none());
    }
}
