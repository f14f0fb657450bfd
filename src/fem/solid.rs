use super::{Element, InitialStresses, Interp, IpsMap, NaturalBc, Solution, SparseTriplet};
use crate::base::Error;
use crate::models::{StateStress, StressStrain};
use crate::FnTime;
use russell_lab::{Matrix, Vector};
use russell_tensor::{Mandel, Tensor2};

/// Implements the element for solid mechanics (u formulation)
pub struct Solid<'a> {
    /// Interpolation operators
    pub interp: Interp,

    /// Space dimension
    pub ndim: usize,

    /// Total number of displacement unknowns = nverts·ndim
    pub nu: usize,

    /// Stress-strain model
    pub mdl: &'a StressStrain,

    /// Mixture density (for body forces and dynamics)
    pub rho: f64,

    /// Assembly map of the displacement unknowns
    pub umap: Vec<usize>,

    /// Internal (state) variables at each integration point
    pub states: Vec<StateStress>,

    /// Backup of the internal variables
    pub states_bkp: Vec<StateStress>,

    /// Auxiliary backup of the internal variables
    pub states_aux: Vec<StateStress>,

    /// Gravity function
    pub gfcn: Option<FnTime>,

    /// Natural boundary conditions (unused by the solid element itself)
    pub nat_bcs: Vec<NaturalBc>,

    /// Starred variables ζ* interpolated at each integration point
    pub zet: Vec<Vec<f64>>,

    /// Divergence of the starred variables χ* at each integration point
    pub div_chi: Vec<f64>,

    /// Displacements at the current integration point
    pub us: Vec<f64>,

    /// Gravity vector at the current time
    pub grav: Vec<f64>,

    /// Local stiffness matrix [nu][nu]
    pub kk: Matrix,

    /// Strain increment (scratch)
    deps: Tensor2,
}

impl<'a> Solid<'a> {
    /// Allocates a new solid element
    pub fn new(mdl: &'a StressStrain, density: f64, interp: Interp) -> Result<Self, Error> {
        if density <= 0.0 {
            return Err(Error::Config("solid element: density must be positive"));
        }
        let ndim = interp.ndim;
        let nverts = interp.nverts;
        let nu = nverts * ndim;
        let nip = interp.nip();
        let two_dim = ndim == 2;
        let mandel = if two_dim { Mandel::Symmetric2D } else { Mandel::Symmetric };
        Ok(Solid {
            interp,
            ndim,
            nu,
            mdl,
            rho: density,
            umap: Vec::new(),
            states: (0..nip).map(|_| StateStress::new(two_dim)).collect(),
            states_bkp: (0..nip).map(|_| StateStress::new(two_dim)).collect(),
            states_aux: (0..nip).map(|_| StateStress::new(two_dim)).collect(),
            gfcn: None,
            nat_bcs: Vec::new(),
            zet: vec![vec![0.0; ndim]; nip],
            div_chi: vec![0.0; nip],
            us: vec![0.0; ndim],
            grav: vec![0.0; ndim],
            kk: Matrix::new(nu, nu),
            deps: Tensor2::new(mandel),
        })
    }

    /// Computes the gravity vector at time t
    pub fn compute_grav(&mut self, t: f64) {
        self.grav[self.ndim - 1] = 0.0;
        if let Some(fcn) = self.gfcn {
            self.grav[self.ndim - 1] = -fcn(t);
        }
    }

    /// Recovers the displacements and their divergence at integration point idx
    pub fn ip_displacements(&mut self, idx: usize, sol: &Solution) -> f64 {
        let ip = &self.interp.ips[idx];
        let nverts = self.interp.nverts;
        let mut divus = 0.0;
        for i in 0..self.ndim {
            self.us[i] = 0.0;
            for m in 0..nverts {
                let r = self.umap[i + m * self.ndim];
                self.us[i] += ip.s[m] * sol.y[r];
                divus += ip.g.get(m, i) * sol.y[r];
            }
        }
        divus
    }
}

impl<'a> Element for Solid<'a> {
    fn set_eqs(&mut self, eqs: &[Vec<usize>]) -> Result<(), Error> {
        let nverts = self.interp.nverts;
        if eqs.len() != nverts {
            return Err(Error::Config("solid element: equation map has the wrong number of vertices"));
        }
        self.umap = vec![0; self.nu];
        for m in 0..nverts {
            if eqs[m].len() < self.ndim {
                return Err(Error::Config("solid element: vertex must have ndim displacement equations"));
            }
            for i in 0..self.ndim {
                self.umap[i + m * self.ndim] = eqs[m][i];
            }
        }
        Ok(())
    }

    fn set_ele_conds(&mut self, key: &str, fcn: FnTime) -> Result<(), Error> {
        if key == "g" {
            self.gfcn = Some(fcn);
        }
        Ok(())
    }

    fn interp_star_vars(&mut self, sol: &Solution) -> Result<(), Error> {
        let nverts = self.interp.nverts;
        for idx in 0..self.interp.nip() {
            let ip = &self.interp.ips[idx];
            self.div_chi[idx] = 0.0;
            for i in 0..self.ndim {
                self.zet[idx][i] = 0.0;
                for m in 0..nverts {
                    let r = self.umap[i + m * self.ndim];
                    self.zet[idx][i] += ip.s[m] * sol.zet[r];
                    self.div_chi[idx] += ip.g.get(m, i) * sol.chi[r];
                }
            }
        }
        Ok(())
    }

    fn add_to_rhs(&mut self, fb: &mut Vector, sol: &Solution) -> Result<(), Error> {
        self.compute_grav(sol.t);
        let nverts = self.interp.nverts;
        let alpha1 = sol.dyn_cfs.alpha1;
        for idx in 0..self.interp.nip() {
            self.ip_displacements(idx, sol);
            let ip = &self.interp.ips[idx];
            let mut coef = ip.coef;
            if sol.axisym {
                coef *= ip.radius;
            }
            let sigma = &self.states[idx].sigma;
            for m in 0..nverts {
                for i in 0..self.ndim {
                    let r = self.umap[i + m * self.ndim];
                    let bs_i = alpha1 * self.us[i] - self.zet[idx][i] - self.grav[i];
                    fb[r] -= coef * ip.s[m] * self.rho * bs_i;
                    for j in 0..self.ndim {
                        fb[r] -= coef * sigma.get(i, j) * ip.g.get(m, j);
                    }
                }
            }
        }
        Ok(())
    }

    fn add_to_kb(&mut self, kb: &mut SparseTriplet, sol: &Solution, _first_it: bool) -> Result<(), Error> {
        self.compute_grav(sol.t);
        self.kk.fill(0.0);
        let nverts = self.interp.nverts;
        let alpha1 = sol.dyn_cfs.alpha1;
        let dd = self.mdl.modulus();
        for idx in 0..self.interp.nip() {
            let ip = &self.interp.ips[idx];
            let mut coef = ip.coef;
            if sol.axisym {
                coef *= ip.radius;
            }
            for m in 0..nverts {
                for i in 0..self.ndim {
                    let r = i + m * self.ndim;
                    for n in 0..nverts {
                        for j in 0..self.ndim {
                            let c = j + n * self.ndim;
                            let mut val = 0.0;
                            if i == j {
                                val += ip.s[m] * ip.s[n] * alpha1 * self.rho;
                            }
                            for k in 0..self.ndim {
                                for l in 0..self.ndim {
                                    val += ip.g.get(m, k) * dd.get(i, k, j, l) * ip.g.get(n, l);
                                }
                            }
                            self.kk.set(r, c, self.kk.get(r, c) + coef * val);
                        }
                    }
                }
            }
        }
        for i in 0..self.nu {
            for j in 0..self.nu {
                kb.put(self.umap[i], self.umap[j], self.kk.get(i, j));
            }
        }
        Ok(())
    }

    fn update(&mut self, sol: &Solution) -> Result<(), Error> {
        let nverts = self.interp.nverts;
        for idx in 0..self.interp.nip() {
            let ip = &self.interp.ips[idx];

            // strain increment from the displacement increments
            let mut eps = [[0.0; 3]; 3];
            for m in 0..nverts {
                for i in 0..self.ndim {
                    let du = sol.dy[self.umap[i + m * self.ndim]];
                    for j in 0..self.ndim {
                        eps[i][j] += 0.5 * du * ip.g.get(m, j);
                        eps[j][i] += 0.5 * du * ip.g.get(m, j);
                    }
                }
            }
            self.deps.clear();
            for i in 0..self.ndim {
                for j in i..self.ndim {
                    self.deps.sym_set(i, j, eps[i][j]);
                }
            }

            // stress update
            self.mdl.update_stress(&mut self.states[idx].sigma, &self.deps);
        }
        Ok(())
    }

    fn set_ini_ivs(&mut self, _sol: &Solution, ini: Option<&InitialStresses>) -> Result<(), Error> {
        let nip = self.interp.nip();
        match ini {
            None => (),
            Some(InitialStresses::Components { sx, sy, sz }) => {
                if sx.len() != nip || sy.len() != nip || sz.len() != nip {
                    return Err(Error::Config("solid element: initial stresses must be given at all ips"));
                }
                for idx in 0..nip {
                    let sigma = &mut self.states[idx].sigma;
                    sigma.clear();
                    sigma.sym_set(0, 0, sx[idx]);
                    sigma.sym_set(1, 1, sy[idx]);
                    sigma.sym_set(2, 2, sz[idx]);
                }
            }
            Some(InitialStresses::TotalVertical { .. }) => {
                return Err(Error::Config(
                    "solid element: total vertical stresses require the pore pressures of a coupled element",
                ));
            }
        }
        for idx in 0..nip {
            let state = self.states[idx].clone();
            self.states_bkp[idx].set(&state);
            self.states_aux[idx].set(&state);
        }
        Ok(())
    }

    fn backup_ivs(&mut self, aux: bool) {
        for idx in 0..self.states.len() {
            let state = self.states[idx].clone();
            if aux {
                self.states_aux[idx].set(&state);
            } else {
                self.states_bkp[idx].set(&state);
            }
        }
    }

    fn restore_ivs(&mut self, aux: bool) {
        for idx in 0..self.states.len() {
            let state = if aux {
                self.states_aux[idx].clone()
            } else {
                self.states_bkp[idx].clone()
            };
            self.states[idx].set(&state);
        }
    }

    fn ureset(&mut self, _sol: &Solution) -> Result<(), Error> {
        Ok(())
    }

    fn encode(&self) -> Result<serde_json::Value, Error> {
        let data: Vec<Vec<f64>> = self
            .states
            .iter()
            .map(|state| state.sigma.vector().as_data().clone())
            .collect();
        serde_json::to_value(&data).map_err(|_| Error::Consistency("solid element: cannot encode states"))
    }

    fn decode(&mut self, value: &serde_json::Value) -> Result<(), Error> {
        let data: Vec<Vec<f64>> = serde_json::from_value(value.clone())
            .map_err(|_| Error::Consistency("solid element: cannot decode states"))?;
        if data.len() != self.states.len() {
            return Err(Error::Consistency("solid element: decoded data has the wrong number of ips"));
        }
        for (idx, comps) in data.iter().enumerate() {
            let sigma = &mut self.states[idx].sigma;
            if comps.len() != sigma.vector().dim() {
                return Err(Error::Consistency("solid element: decoded stress has the wrong dimension"));
            }
            for (i, value) in comps.iter().enumerate() {
                sigma.vector_mut()[i] = *value;
            }
        }
        self.backup_ivs(false);
        Ok(())
    }

    fn out_ip_coords(&self) -> Vec<Vec<f64>> {
        self.interp.ips.iter().map(|ip| ip.coords.clone()).collect()
    }

    fn out_ip_keys(&self) -> Vec<String> {
        let mut keys = vec!["sx".to_string(), "sy".to_string(), "sz".to_string(), "sxy".to_string()];
        if self.ndim == 3 {
            keys.push("syz".to_string());
            keys.push("szx".to_string());
        }
        keys
    }

    fn out_ip_vals(&mut self, map: &mut IpsMap, _sol: &Solution) -> Result<(), Error> {
        let nip = self.interp.nip();
        for idx in 0..nip {
            let sigma = &self.states[idx].sigma;
            map.set("sx", idx, nip, sigma.get(0, 0));
            map.set("sy", idx, nip, sigma.get(1, 1));
            map.set("sz", idx, nip, sigma.get(2, 2));
            map.set("sxy", idx, nip, sigma.get(0, 1));
            if self.ndim == 3 {
                map.set("syz", idx, nip, sigma.get(1, 2));
                map.set("szx", idx, nip, sigma.get(2, 0));
            }
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::super::{Element, Interp, Solution, SparseTriplet};
    use super::Solid;
    use crate::base::ParamStressStrain;
    use crate::models::StressStrain;
    use russell_lab::{approx_eq, Vector};

    fn unit_square() -> [[f64; 2]; 4] {
        [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
    }

    #[test]
    fn stiffness_annihilates_rigid_body_modes() {
        let mdl = StressStrain::new(
            &ParamStressStrain::LinearElastic {
                young: 1000.0,
                poisson: 0.25,
            },
            true,
        )
        .unwrap();
        let mut ele = Solid::new(&mdl, 2.0, Interp::qua4(&unit_square()).unwrap()).unwrap();
        let eqs: Vec<Vec<usize>> = (0..4).map(|m| vec![2 * m, 2 * m + 1]).collect();
        ele.set_eqs(&eqs).unwrap();
        let sol = Solution::new(8, true);
        let mut kb = SparseTriplet::new(8, 8);
        ele.add_to_kb(&mut kb, &sol, true).unwrap();
        let kk = kb.as_dense();

        // symmetry
        for i in 0..8 {
            for j in 0..8 {
                approx_eq(kk.get(i, j), kk.get(j, i), 1e-12);
            }
        }

        // translations produce no force
        for dir in 0..2 {
            for i in 0..8 {
                let mut sum = 0.0;
                for m in 0..4 {
                    sum += kk.get(i, dir + 2 * m);
                }
                approx_eq(sum, 0.0, 1e-12);
            }
        }
    }

    #[test]
    fn residual_equals_minus_k_times_u() {
        // for linear elasticity (no body force), fb = −K·u after one update
        let mdl = StressStrain::new(
            &ParamStressStrain::LinearElastic {
                young: 1500.0,
                poisson: 0.2,
            },
            true,
        )
        .unwrap();
        let mut ele = Solid::new(&mdl, 2.0, Interp::qua4(&unit_square()).unwrap()).unwrap();
        let eqs: Vec<Vec<usize>> = (0..4).map(|m| vec![2 * m, 2 * m + 1]).collect();
        ele.set_eqs(&eqs).unwrap();

        let mut sol = Solution::new(8, true);
        ele.set_ini_ivs(&sol, None).unwrap();
        let u = [0.001, -0.002, 0.003, 0.001, -0.001, 0.002, 0.0005, -0.0015];
        for i in 0..8 {
            sol.y[i] = u[i];
            sol.dy[i] = u[i];
        }
        ele.update(&sol).unwrap();

        let mut fb = Vector::new(8);
        ele.add_to_rhs(&mut fb, &sol).unwrap();

        let mut kb = SparseTriplet::new(8, 8);
        ele.add_to_kb(&mut kb, &sol, false).unwrap();
        let kk = kb.as_dense();
        for i in 0..8 {
            let mut ku_i = 0.0;
            for j in 0..8 {
                ku_i += kk.get(i, j) * u[j];
            }
            approx_eq(fb[i], -ku_i, 1e-11);
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let mdl = StressStrain::new(
            &ParamStressStrain::LinearElastic {
                young: 1000.0,
                poisson: 0.25,
            },
            true,
        )
        .unwrap();
        let mut ele = Solid::new(&mdl, 2.0, Interp::qua4(&unit_square()).unwrap()).unwrap();
        ele.states[2].sigma.sym_set(0, 1, -1.25);
        let value = ele.encode().unwrap();
        let mut other = Solid::new(&mdl, 2.0, Interp::qua4(&unit_square()).unwrap()).unwrap();
        other.decode(&value).unwrap();
        assert_eq!(other.states[2].sigma.get(1, 0), -1.25);
    }
}
