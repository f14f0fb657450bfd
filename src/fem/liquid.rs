use super::{liq_flow_keys, BcKey, Element, InitialStresses, Interp, IpsMap, NaturalBc, Solution, SparseTriplet};
use crate::base::{heaviside, ramp, sramp, sramp_d1, Error};
use crate::models::{LsVars, Porous, StatePorous};
use crate::FnTime;
use russell_lab::{Matrix, Vector};
use std::f64::consts::LN_2;

/// Implements the element for liquid-only flow analyses (pl formulation)
///
/// The gas pressure is kept at the atmospheric (zero) datum, thus pc = −pl.
/// Natural boundary conditions include prescribed liquid fluxes and seepage
/// faces with the ramp technique of [2].
pub struct Liquid<'a> {
    /// Interpolation operators
    pub interp: Interp,

    /// Space dimension
    pub ndim: usize,

    /// Number of pl unknowns == number of vertices
    pub np: usize,

    /// Porous medium model
    pub mdl: &'a Porous,

    /// Assembly map of the pl unknowns
    pub pmap: Vec<usize>,

    /// Internal (state) variables at each integration point
    pub states: Vec<StatePorous>,

    /// Backup of the internal variables
    pub states_bkp: Vec<StatePorous>,

    /// Auxiliary backup of the internal variables
    pub states_aux: Vec<StatePorous>,

    /// Gravity function
    pub gfcn: Option<FnTime>,

    /// Natural boundary conditions
    pub nat_bcs: Vec<NaturalBc>,

    /// ρl extrapolated to the nodes (flux and seepage conditions)
    pub rhol_ex: Vector,

    /// ∂ρl/∂pl extrapolated to the nodes (seepage conditions)
    pub drholdpl_ex: Matrix,

    /// Indicates that extrapolation structures are active
    pub do_extrap: bool,

    /// Number of fl unknowns (seepage faces)
    pub nf: usize,

    /// Indicates that this element has seepage faces
    pub has_seep: bool,

    /// Maps local vertex ids to seepage variable ids
    pub vid2seep: Vec<Option<usize>>,

    /// Maps seepage variable ids to local vertex ids
    pub seep2vid: Vec<usize>,

    /// Assembly map of the fl unknowns
    pub flmap: Vec<usize>,

    /// Uses the discrete (Macaulay) ramp function instead of the smooth one
    pub macaulay: bool,

    /// Coefficient of the smooth ramp function
    pub bet_rmp: f64,

    /// Coefficient κ normalising the seepage face equation
    pub kap: f64,

    /// Reference plmax values at the face ips (before the time shift)
    pub plmax: Vec<Vec<f64>>,

    /// Starred variables ψl* at each integration point
    pub psi_l: Vec<f64>,

    /// Gravity vector at the current time
    pub grav: Vec<f64>,

    /// Liquid pressure at the current integration point
    pub pl: f64,

    /// Gradient of the liquid pressure at the current integration point
    pub grad_pl: Vec<f64>,

    /// Augmented filter velocity ρl·wl (scratch)
    pub rhowl: Vec<f64>,

    /// Derivative ∂(ρl·wl)/∂plⁿ (scratch)
    pub dwlb_dpl_n: Vec<f64>,

    /// Local matrix dRpl/dpl
    pub kpp: Matrix,

    /// Local matrix dRpl/dfl
    pub kpf: Matrix,

    /// Local matrix dRfl/dpl
    pub kfp: Matrix,

    /// Local matrix dRfl/dfl
    pub kff: Matrix,

    /// Coefficient bundle of the liquid-solid formulation
    pub ls_vars: LsVars,
}

impl<'a> Liquid<'a> {
    /// Allocates a new liquid element
    pub fn new(mdl: &'a Porous, interp: Interp, nat_bcs: Vec<NaturalBc>) -> Result<Self, Error> {
        let ndim = interp.ndim;
        let np = interp.nverts;
        let nip = interp.nip();

        // vertices on seepage faces
        let mut seep2vid: Vec<usize> = Vec::new();
        for nbc in &nat_bcs {
            if nbc.key == BcKey::Qg {
                return Err(Error::Config("liquid element: gas flux condition is not available"));
            }
            if nbc.face >= interp.faces.len() {
                return Err(Error::Config("liquid element: face index of natural bc is out of range"));
            }
            if nbc.key == BcKey::Seep {
                for &m in &interp.faces[nbc.face].local_verts {
                    if !seep2vid.contains(&m) {
                        seep2vid.push(m);
                    }
                }
            }
        }
        let nf = seep2vid.len();
        let has_seep = nf > 0;
        let mut vid2seep = vec![None; np];
        for (mu, &m) in seep2vid.iter().enumerate() {
            vid2seep[m] = Some(mu);
        }
        let do_extrap = !nat_bcs.is_empty();

        let zero_state = StatePorous {
            ns0: 1.0 - mdl.nf0,
            sl: 1.0,
            rho_ll: 0.0,
            rho_gg: 0.0,
            delta_pc: 0.0,
            wetting: false,
        };
        Ok(Liquid {
            interp,
            ndim,
            np,
            mdl,
            pmap: Vec::new(),
            states: vec![zero_state.clone(); nip],
            states_bkp: vec![zero_state.clone(); nip],
            states_aux: vec![zero_state; nip],
            gfcn: None,
            nat_bcs,
            rhol_ex: Vector::new(np),
            drholdpl_ex: Matrix::new(np, np),
            do_extrap,
            nf,
            has_seep,
            vid2seep,
            seep2vid,
            flmap: Vec::new(),
            macaulay: false,
            bet_rmp: LN_2 / 0.01,
            kap: 1.0,
            plmax: Vec::new(),
            psi_l: vec![0.0; nip],
            grav: vec![0.0; ndim],
            pl: 0.0,
            grad_pl: vec![0.0; ndim],
            rhowl: vec![0.0; ndim],
            dwlb_dpl_n: vec![0.0; ndim],
            kpp: Matrix::new(np, np),
            kpf: Matrix::new(np, nf),
            kfp: Matrix::new(nf, np),
            kff: Matrix::new(nf, nf),
            ls_vars: LsVars::default(),
        })
    }

    /// Sets the flags of the seepage face technique
    pub fn set_seep_flags(&mut self, macaulay: bool, bet_rmp: f64, kap: f64) {
        self.macaulay = macaulay;
        self.bet_rmp = bet_rmp;
        self.kap = kap;
    }

    /// Evaluates the (smooth) ramp function
    pub fn ramp(&self, x: f64) -> f64 {
        if self.macaulay {
            ramp(x)
        } else {
            sramp(x, self.bet_rmp)
        }
    }

    /// Evaluates the first derivative of the (smooth) ramp function
    pub fn ramp_deriv(&self, x: f64) -> f64 {
        if self.macaulay {
            heaviside(x)
        } else {
            sramp_d1(x, self.bet_rmp)
        }
    }

    /// Computes the gravity vector at time t
    pub fn compute_grav(&mut self, t: f64) {
        self.grav[self.ndim - 1] = 0.0;
        if let Some(fcn) = self.gfcn {
            self.grav[self.ndim - 1] = -fcn(t);
        }
    }

    /// Computes pl and ∇pl at integration point idx
    pub fn calc_ip_vars(&mut self, idx: usize, sol: &Solution) {
        self.compute_grav(sol.t);
        let ip = &self.interp.ips[idx];
        self.pl = 0.0;
        for i in 0..self.ndim {
            self.grad_pl[i] = 0.0;
        }
        for m in 0..self.np {
            let r = self.pmap[m];
            self.pl += ip.s[m] * sol.y[r];
            for i in 0..self.ndim {
                self.grad_pl[i] += ip.g.get(m, i) * sol.y[r];
            }
        }
    }

    /// Computes ρl, pl and fl extrapolated to a face integration point
    pub fn calc_face_ip_vars(&self, face: usize, sf: &Vector, sol: &Solution) -> (f64, f64, f64) {
        let (mut rho_l, mut pl, mut fl) = (0.0, 0.0, 0.0);
        for (i, &m) in self.interp.faces[face].local_verts.iter().enumerate() {
            rho_l += sf[i] * self.rhol_ex[m];
            pl += sf[i] * sol.y[self.pmap[m]];
            if let Some(mu) = self.vid2seep[m] {
                fl += sf[i] * sol.y[self.flmap[mu]];
            }
        }
        (rho_l, pl, fl)
    }

    /// Adds the contribution of the natural boundary conditions to fb
    pub fn add_nat_bcs_to_rhs(&mut self, fb: &mut Vector, sol: &Solution) -> Result<(), Error> {
        for idx in 0..self.nat_bcs.len() {
            let nbc = self.nat_bcs[idx];
            let value = (nbc.fcn)(sol.t);
            for jdx in 0..self.interp.faces[nbc.face].ips.len() {
                let coef = self.interp.faces[nbc.face].ips[jdx].coef;
                match nbc.key {
                    // prescribed liquid flux
                    BcKey::Ql => {
                        let mut rho_l = 0.0;
                        {
                            let face = &self.interp.faces[nbc.face];
                            let sf = &face.ips[jdx].sf;
                            for (i, &m) in face.local_verts.iter().enumerate() {
                                rho_l += sf[i] * self.rhol_ex[m];
                            }
                        }
                        let face = &self.interp.faces[nbc.face];
                        let sf = &face.ips[jdx].sf;
                        for (i, &m) in face.local_verts.iter().enumerate() {
                            fb[self.pmap[m]] -= coef * rho_l * value * sf[i];
                        }
                    }

                    // seepage face; Eqs (26) and (30) of [2]
                    BcKey::Seep => {
                        let (rho_l, pl, fl) = {
                            let sf = &self.interp.faces[nbc.face].ips[jdx].sf;
                            self.calc_face_ip_vars(nbc.face, sf, sol)
                        };
                        let mut plmax = self.plmax[idx][jdx] - value;
                        if plmax < 0.0 {
                            plmax = 0.0;
                        }
                        let g = pl - plmax;
                        let rmp = self.ramp(fl + self.kap * g);
                        let rx = rho_l * rmp;
                        let rf = fl - rmp;
                        let face = &self.interp.faces[nbc.face];
                        let sf = &face.ips[jdx].sf;
                        for (i, &m) in face.local_verts.iter().enumerate() {
                            if let Some(mu) = self.vid2seep[m] {
                                fb[self.pmap[m]] -= coef * sf[i] * rx;
                                fb[self.flmap[mu]] -= coef * sf[i] * rf;
                            }
                        }
                    }

                    BcKey::Qg => (),
                }
            }
        }
        Ok(())
    }

    /// Adds the contribution of the natural boundary conditions to the local Jacobian
    pub fn add_nat_bcs_to_jac(&mut self, sol: &Solution) -> Result<(), Error> {
        if self.has_seep {
            self.kpf.fill(0.0);
            self.kfp.fill(0.0);
            self.kff.fill(0.0);
        }
        for idx in 0..self.nat_bcs.len() {
            let nbc = self.nat_bcs[idx];
            if nbc.key != BcKey::Seep {
                continue;
            }
            let shift = (nbc.fcn)(sol.t);
            for jdx in 0..self.interp.faces[nbc.face].ips.len() {
                let coef = self.interp.faces[nbc.face].ips[jdx].coef;
                let (rho_l, pl, fl) = {
                    let sf = &self.interp.faces[nbc.face].ips[jdx].sf;
                    self.calc_face_ip_vars(nbc.face, sf, sol)
                };
                let mut plmax = self.plmax[idx][jdx] - shift;
                if plmax < 0.0 {
                    plmax = 0.0;
                }
                let g = pl - plmax;
                let rmp = self.ramp(fl + self.kap * g);
                let rmp_d = self.ramp_deriv(fl + self.kap * g);
                let drx_dpl = rho_l * self.kap * rmp_d;
                let drx_dfl = rho_l * rmp_d;
                let drf_dpl = -self.kap * rmp_d;
                let drf_dfl = 1.0 - rmp_d;
                let nverts = self.np;
                let face_verts = self.interp.faces[nbc.face].local_verts.clone();
                let sf = self.interp.faces[nbc.face].ips[jdx].sf.clone();
                for (i, &m) in face_verts.iter().enumerate() {
                    let mu = match self.vid2seep[m] {
                        Some(mu) => mu,
                        None => continue,
                    };
                    for (j, &n) in face_verts.iter().enumerate() {
                        let nu = match self.vid2seep[n] {
                            Some(nu) => nu,
                            None => continue,
                        };
                        self.kpp.set(m, n, self.kpp.get(m, n) + coef * sf[i] * sf[j] * drx_dpl);
                        self.kpf.set(m, nu, self.kpf.get(m, nu) + coef * sf[i] * sf[j] * drx_dfl);
                        self.kfp.set(mu, n, self.kfp.get(mu, n) + coef * sf[i] * sf[j] * drf_dpl);
                        self.kff.set(mu, nu, self.kff.get(mu, nu) + coef * sf[i] * sf[j] * drf_dfl);
                    }
                    // Eqs (18) and (22) of [2]
                    for n in 0..nverts {
                        for (l, &r) in face_verts.iter().enumerate() {
                            let val = coef * sf[i] * sf[l] * self.drholdpl_ex.get(r, n) * rmp;
                            self.kpp.set(m, n, self.kpp.get(m, n) + val);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl<'a> Element for Liquid<'a> {
    fn set_eqs(&mut self, eqs: &[Vec<usize>]) -> Result<(), Error> {
        if eqs.len() != self.np {
            return Err(Error::Config("liquid element: equation map has the wrong number of vertices"));
        }
        self.pmap = vec![0; self.np];
        for m in 0..self.np {
            if eqs[m].is_empty() {
                return Err(Error::Config("liquid element: vertex must have one pl equation"));
            }
            self.pmap[m] = eqs[m][0];
        }
        if self.has_seep {
            self.flmap = vec![0; self.nf];
            for (mu, &m) in self.seep2vid.iter().enumerate() {
                if eqs[m].len() < 2 {
                    return Err(Error::Config("liquid element: seepage vertex must have an fl equation"));
                }
                self.flmap[mu] = eqs[m][1];
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
        for idx in 0..self.interp.nip() {
            let ip = &self.interp.ips[idx];
            self.psi_l[idx] = 0.0;
            for m in 0..self.np {
                self.psi_l[idx] += ip.s[m] * sol.psi[self.pmap[m]];
            }
        }
        Ok(())
    }

    fn add_to_rhs(&mut self, fb: &mut Vector, sol: &Solution) -> Result<(), Error> {
        if self.do_extrap {
            self.rhol_ex.fill(0.0);
        }
        let beta1 = sol.dyn_cfs.beta1;
        for idx in 0..self.interp.nip() {
            self.calc_ip_vars(idx, sol);
            let mut coef = self.interp.ips[idx].coef;
            if sol.axisym {
                coef *= self.interp.ips[idx].radius;
            }

            // tpm variables
            let plt = beta1 * self.pl - self.psi_l[idx];
            let klr = self.mdl.cnd.klr(self.states[idx].sl);
            let rho_ll = self.states[idx].rho_ll;
            self.mdl.calc_ls(&mut self.ls_vars, &self.states[idx], self.pl, 0.0, false)?;

            // compute ρl·wl; Eq (34b) of [1]
            for i in 0..self.ndim {
                self.rhowl[i] = 0.0;
                for j in 0..self.ndim {
                    self.rhowl[i] += klr * self.mdl.klsat[i][j] * (rho_ll * self.grav[j] - self.grad_pl[j]);
                }
            }

            // add negative of residual term to fb; Eq (38a) of [1]
            let ip = &self.interp.ips[idx];
            for m in 0..self.np {
                let r = self.pmap[m];
                fb[r] -= coef * ip.s[m] * self.ls_vars.cpl * plt;
                for i in 0..self.ndim {
                    fb[r] += coef * ip.g.get(m, i) * self.rhowl[i];
                }
                if self.do_extrap {
                    // Eq (19) of [2]
                    self.rhol_ex[m] += self.interp.emat.get(m, idx) * self.ls_vars.rho_l;
                }
            }
        }

        // contribution from natural boundary conditions
        if !self.nat_bcs.is_empty() {
            return self.add_nat_bcs_to_rhs(fb, sol);
        }
        Ok(())
    }

    fn add_to_kb(&mut self, kb: &mut SparseTriplet, sol: &Solution, _first_it: bool) -> Result<(), Error> {
        self.kpp.fill(0.0);
        if self.do_extrap {
            self.rhol_ex.fill(0.0);
            self.drholdpl_ex.fill(0.0);
        }
        let beta1 = sol.dyn_cfs.beta1;
        let cl = self.mdl.liq.cc;
        for idx in 0..self.interp.nip() {
            self.calc_ip_vars(idx, sol);
            let mut coef = self.interp.ips[idx].coef;
            if sol.axisym {
                coef *= self.interp.ips[idx].radius;
            }

            // tpm variables
            let plt = beta1 * self.pl - self.psi_l[idx];
            let klr = self.mdl.cnd.klr(self.states[idx].sl);
            let rho_ll = self.states[idx].rho_ll;
            self.mdl.calc_ls(&mut self.ls_vars, &self.states[idx], self.pl, 0.0, true)?;

            // Kpp; Eqs (A.5) and (A.7) of [1]
            for n in 0..self.np {
                for i in 0..self.ndim {
                    self.dwlb_dpl_n[i] = 0.0;
                }
                {
                    let ip = &self.interp.ips[idx];
                    for j in 0..self.ndim {
                        let hl_j = rho_ll * self.grav[j] - self.grad_pl[j];
                        let dhl_dpl_nj = ip.s[n] * cl * self.grav[j] - ip.g.get(n, j);
                        for i in 0..self.ndim {
                            self.dwlb_dpl_n[i] +=
                                self.mdl.klsat[i][j] * (ip.s[n] * self.ls_vars.dklr_dpl * hl_j + klr * dhl_dpl_nj);
                        }
                    }
                }
                for m in 0..self.np {
                    let ip = &self.interp.ips[idx];
                    let mut val = coef * ip.s[m] * ip.s[n] * (self.ls_vars.dcpl_dpl * plt + beta1 * self.ls_vars.cpl);
                    for i in 0..self.ndim {
                        val -= coef * ip.g.get(m, i) * self.dwlb_dpl_n[i];
                    }
                    self.kpp.set(m, n, self.kpp.get(m, n) + val);
                    if self.do_extrap {
                        // inner summation term in Eq (22) of [2]
                        let ex = self.interp.emat.get(m, idx) * self.ls_vars.cpl * ip.s[n];
                        self.drholdpl_ex.set(m, n, self.drholdpl_ex.get(m, n) + ex);
                    }
                }
                if self.do_extrap {
                    let ex = self.interp.emat.get(n, idx) * self.ls_vars.rho_l;
                    self.rhol_ex[n] += ex;
                }
            }
        }

        // contribution from natural boundary conditions
        if self.has_seep {
            self.add_nat_bcs_to_jac(sol)?;
        }

        // assemble K matrices into Kb
        for i in 0..self.np {
            for j in 0..self.np {
                kb.put(self.pmap[i], self.pmap[j], self.kpp.get(i, j));
            }
            for j in 0..self.nf {
                kb.put(self.pmap[i], self.flmap[j], self.kpf.get(i, j));
                kb.put(self.flmap[j], self.pmap[i], self.kfp.get(j, i));
            }
        }
        for i in 0..self.nf {
            for j in 0..self.nf {
                kb.put(self.flmap[i], self.flmap[j], self.kff.get(i, j));
            }
        }
        Ok(())
    }

    fn update(&mut self, sol: &Solution) -> Result<(), Error> {
        for idx in 0..self.interp.nip() {
            let ip = &self.interp.ips[idx];
            let mut pl = 0.0;
            let mut dpl = 0.0;
            for m in 0..self.np {
                let r = self.pmap[m];
                pl += ip.s[m] * sol.y[r];
                dpl += ip.s[m] * sol.dy[r];
            }
            self.mdl.update(&mut self.states[idx], dpl, 0.0, pl, 0.0)?;
        }
        Ok(())
    }

    fn set_ini_ivs(&mut self, sol: &Solution, _ini: Option<&InitialStresses>) -> Result<(), Error> {
        self.compute_grav(sol.t);
        for idx in 0..self.interp.nip() {
            self.calc_ip_vars(idx, sol);

            // density from the hydrostatic condition => enforce initial ρl·wl = 0
            let mut rho_ll = self.mdl.liq.rho_ref;
            if f64::abs(self.grav[self.ndim - 1]) > 0.0 {
                rho_ll = self.grad_pl[self.ndim - 1] / self.grav[self.ndim - 1];
            }
            let state = self.mdl.new_state(rho_ll, self.mdl.gas.rho_ref, self.pl, 0.0)?;
            self.states[idx].set(&state);
            self.states_bkp[idx].set(&state);
            self.states_aux[idx].set(&state);
        }

        // seepage face structures
        if self.has_seep {
            self.plmax = Vec::with_capacity(self.nat_bcs.len());
            for nbc in &self.nat_bcs {
                let face = &self.interp.faces[nbc.face];
                let mut values = Vec::with_capacity(face.ips.len());
                for fip in &face.ips {
                    let mut pl = 0.0;
                    if nbc.key == BcKey::Seep {
                        for (i, &m) in face.local_verts.iter().enumerate() {
                            pl += fip.sf[i] * sol.y[self.pmap[m]];
                        }
                    }
                    values.push(pl);
                }
                self.plmax.push(values);
            }
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
        serde_json::to_value(&self.states).map_err(|_| Error::Consistency("liquid element: cannot encode states"))
    }

    fn decode(&mut self, value: &serde_json::Value) -> Result<(), Error> {
        let states: Vec<StatePorous> = serde_json::from_value(value.clone())
            .map_err(|_| Error::Consistency("liquid element: cannot decode states"))?;
        if states.len() != self.states.len() {
            return Err(Error::Consistency("liquid element: decoded data has the wrong number of ips"));
        }
        self.states = states;
        self.backup_ivs(false);
        Ok(())
    }

    fn out_ip_coords(&self) -> Vec<Vec<f64>> {
        self.interp.ips.iter().map(|ip| ip.coords.clone()).collect()
    }

    fn out_ip_keys(&self) -> Vec<String> {
        let mut keys = vec!["pl".to_string(), "sl".to_string()];
        keys.extend(liq_flow_keys(self.ndim));
        keys
    }

    fn out_ip_vals(&mut self, map: &mut IpsMap, sol: &Solution) -> Result<(), Error> {
        let flow = liq_flow_keys(self.ndim);
        let nip = self.interp.nip();
        for idx in 0..nip {
            self.calc_ip_vars(idx, sol);
            let sl = self.states[idx].sl;
            let rho_ll = self.states[idx].rho_ll;
            let klr = self.mdl.cnd.klr(sl);
            map.set("pl", idx, nip, self.pl);
            map.set("sl", idx, nip, sl);
            for i in 0..self.ndim {
                let mut nwl_i = 0.0;
                for j in 0..self.ndim {
                    nwl_i += klr * self.mdl.klsat[i][j] * (self.grav[j] - self.grad_pl[j] / rho_ll);
                }
                map.set(&flow[i], idx, nip, nwl_i);
            }
        }
        Ok(())
    }
}
