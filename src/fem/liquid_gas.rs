use super::{
    gas_flow_keys, liq_flow_keys, BcKey, Element, InitialStresses, Interp, IpsMap, NaturalBc, Solution, SparseTriplet,
};
use crate::base::{heaviside, ramp, sramp, sramp_d1, Error};
use crate::models::{LgsVars, Porous, StatePorous};
use crate::FnTime;
use russell_lab::{Matrix, Vector};
use std::f64::consts::LN_2;

/// Implements the element for liquid-gas flow analyses (pl-pg formulation)
pub struct LiquidGas<'a> {
    /// Interpolation operators
    pub interp: Interp,

    /// Space dimension
    pub ndim: usize,

    /// Number of pl (or pg) unknowns == number of vertices
    pub np: usize,

    /// Porous medium model
    pub mdl: &'a Porous,

    /// Assembly map of the pl unknowns
    pub plmap: Vec<usize>,

    /// Assembly map of the pg unknowns
    pub pgmap: Vec<usize>,

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

    /// ρl extrapolated to the nodes
    pub rhol_ex: Vector,

    /// ρg extrapolated to the nodes
    pub rhog_ex: Vector,

    /// ∂ρl/∂pl extrapolated to the nodes
    pub drholdpl_ex: Matrix,

    /// ∂ρg/∂pg extrapolated to the nodes
    pub drhogdpg_ex: Matrix,

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

    /// Starred variables ψg* at each integration point
    pub psi_g: Vec<f64>,

    /// Gravity vector at the current time
    pub grav: Vec<f64>,

    /// Liquid pressure at the current integration point
    pub pl: f64,

    /// Gas pressure at the current integration point
    pub pg: f64,

    /// Gradient of the liquid pressure at the current integration point
    pub grad_pl: Vec<f64>,

    /// Gradient of the gas pressure at the current integration point
    pub grad_pg: Vec<f64>,

    /// Augmented liquid filter velocity ρl·wl (scratch)
    pub wlb: Vec<f64>,

    /// Augmented gas filter velocity ρg·wg (scratch)
    pub wgb: Vec<f64>,

    /// Derivative ∂(ρl·wl)/∂plⁿ (scratch)
    pub dwlb_dpl_n: Vec<f64>,

    /// Derivative ∂(ρl·wl)/∂pgⁿ (scratch)
    pub dwlb_dpg_n: Vec<f64>,

    /// Derivative ∂(ρg·wg)/∂plⁿ (scratch)
    pub dwgb_dpl_n: Vec<f64>,

    /// Derivative ∂(ρg·wg)/∂pgⁿ (scratch)
    pub dwgb_dpg_n: Vec<f64>,

    /// Local matrix dRpl/dpl
    pub kll: Matrix,

    /// Local matrix dRpl/dpg
    pub klg: Matrix,

    /// Local matrix dRpg/dpl
    pub kgl: Matrix,

    /// Local matrix dRpg/dpg
    pub kgg: Matrix,

    /// Local matrix dRpl/dfl
    pub klf: Matrix,

    /// Local matrix dRfl/dpl
    pub kfl: Matrix,

    /// Local matrix dRfl/dfl
    pub kff: Matrix,

    /// Coefficient bundle of the liquid-gas-solid formulation
    pub lgs_vars: LgsVars,
}

impl<'a> LiquidGas<'a> {
    /// Allocates a new liquid-gas element
    pub fn new(mdl: &'a Porous, interp: Interp, nat_bcs: Vec<NaturalBc>) -> Result<Self, Error> {
        let ndim = interp.ndim;
        let np = interp.nverts;
        let nip = interp.nip();

        // vertices on seepage faces
        let mut seep2vid: Vec<usize> = Vec::new();
        for nbc in &nat_bcs {
            if nbc.face >= interp.faces.len() {
                return Err(Error::Config("liquid-gas element: face index of natural bc is out of range"));
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
        Ok(LiquidGas {
            interp,
            ndim,
            np,
            mdl,
            plmap: Vec::new(),
            pgmap: Vec::new(),
            states: vec![zero_state.clone(); nip],
            states_bkp: vec![zero_state.clone(); nip],
            states_aux: vec![zero_state; nip],
            gfcn: None,
            nat_bcs,
            rhol_ex: Vector::new(np),
            rhog_ex: Vector::new(np),
            drholdpl_ex: Matrix::new(np, np),
            drhogdpg_ex: Matrix::new(np, np),
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
            psi_g: vec![0.0; nip],
            grav: vec![0.0; ndim],
            pl: 0.0,
            pg: 0.0,
            grad_pl: vec![0.0; ndim],
            grad_pg: vec![0.0; ndim],
            wlb: vec![0.0; ndim],
            wgb: vec![0.0; ndim],
            dwlb_dpl_n: vec![0.0; ndim],
            dwlb_dpg_n: vec![0.0; ndim],
            dwgb_dpl_n: vec![0.0; ndim],
            dwgb_dpg_n: vec![0.0; ndim],
            kll: Matrix::new(np, np),
            klg: Matrix::new(np, np),
            kgl: Matrix::new(np, np),
            kgg: Matrix::new(np, np),
            klf: Matrix::new(np, nf),
            kfl: Matrix::new(nf, np),
            kff: Matrix::new(nf, nf),
            lgs_vars: LgsVars::default(),
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

    /// Computes pl, pg and their gradients at integration point idx
    pub fn calc_ip_vars(&mut self, idx: usize, sol: &Solution) {
        self.compute_grav(sol.t);
        let ip = &self.interp.ips[idx];
        self.pl = 0.0;
        self.pg = 0.0;
        for i in 0..self.ndim {
            self.grad_pl[i] = 0.0;
            self.grad_pg[i] = 0.0;
        }
        for m in 0..self.np {
            let rl = self.plmap[m];
            let rg = self.pgmap[m];
            self.pl += ip.s[m] * sol.y[rl];
            self.pg += ip.s[m] * sol.y[rg];
            for i in 0..self.ndim {
                self.grad_pl[i] += ip.g.get(m, i) * sol.y[rl];
                self.grad_pg[i] += ip.g.get(m, i) * sol.y[rg];
            }
        }
    }

    /// Computes ρl, pl and fl extrapolated to a face integration point
    pub fn calc_face_ip_vars(&self, face: usize, sf: &Vector, sol: &Solution) -> (f64, f64, f64) {
        let (mut rho_l, mut pl, mut fl) = (0.0, 0.0, 0.0);
        for (i, &m) in self.interp.faces[face].local_verts.iter().enumerate() {
            rho_l += sf[i] * self.rhol_ex[m];
            pl += sf[i] * sol.y[self.plmap[m]];
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
                        let face = &self.interp.faces[nbc.face];
                        let sf = &face.ips[jdx].sf;
                        let mut rho_l = 0.0;
                        for (i, &m) in face.local_verts.iter().enumerate() {
                            rho_l += sf[i] * self.rhol_ex[m];
                        }
                        for (i, &m) in face.local_verts.iter().enumerate() {
                            fb[self.plmap[m]] -= coef * rho_l * value * sf[i];
                        }
                    }

                    // prescribed gas flux
                    BcKey::Qg => {
                        let face = &self.interp.faces[nbc.face];
                        let sf = &face.ips[jdx].sf;
                        let mut rho_g = 0.0;
                        for (i, &m) in face.local_verts.iter().enumerate() {
                            rho_g += sf[i] * self.rhog_ex[m];
                        }
                        for (i, &m) in face.local_verts.iter().enumerate() {
                            fb[self.pgmap[m]] -= coef * rho_g * value * sf[i];
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
                                fb[self.plmap[m]] -= coef * sf[i] * rx;
                                fb[self.flmap[mu]] -= coef * sf[i] * rf;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Adds the contribution of the natural boundary conditions to the local Jacobian
    pub fn add_nat_bcs_to_jac(&mut self, sol: &Solution) -> Result<(), Error> {
        if self.has_seep {
            self.klf.fill(0.0);
            self.kfl.fill(0.0);
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
                        self.kll.set(m, n, self.kll.get(m, n) + coef * sf[i] * sf[j] * drx_dpl);
                        self.klf.set(m, nu, self.klf.get(m, nu) + coef * sf[i] * sf[j] * drx_dfl);
                        self.kfl.set(mu, n, self.kfl.get(mu, n) + coef * sf[i] * sf[j] * drf_dpl);
                        self.kff.set(mu, nu, self.kff.get(mu, nu) + coef * sf[i] * sf[j] * drf_dfl);
                    }
                    // Eqs (18) and (22) of [2]
                    for n in 0..nverts {
                        for (l, &r) in face_verts.iter().enumerate() {
                            let val = coef * sf[i] * sf[l] * self.drholdpl_ex.get(r, n) * rmp;
                            self.kll.set(m, n, self.kll.get(m, n) + val);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Assembles the local matrices into the global Jacobian
    pub fn assemble_kks(&self, kb: &mut SparseTriplet) {
        for i in 0..self.np {
            for j in 0..self.np {
                kb.put(self.plmap[i], self.plmap[j], self.kll.get(i, j));
                kb.put(self.plmap[i], self.pgmap[j], self.klg.get(i, j));
                kb.put(self.pgmap[i], self.plmap[j], self.kgl.get(i, j));
                kb.put(self.pgmap[i], self.pgmap[j], self.kgg.get(i, j));
            }
            for j in 0..self.nf {
                kb.put(self.plmap[i], self.flmap[j], self.klf.get(i, j));
                kb.put(self.flmap[j], self.plmap[i], self.kfl.get(j, i));
            }
        }
        for i in 0..self.nf {
            for j in 0..self.nf {
                kb.put(self.flmap[i], self.flmap[j], self.kff.get(i, j));
            }
        }
    }
}

impl<'a> Element for LiquidGas<'a> {
    fn set_eqs(&mut self, eqs: &[Vec<usize>]) -> Result<(), Error> {
        if eqs.len() != self.np {
            return Err(Error::Config("liquid-gas element: equation map has the wrong number of vertices"));
        }
        self.plmap = vec![0; self.np];
        self.pgmap = vec![0; self.np];
        for m in 0..self.np {
            if eqs[m].len() < 2 {
                return Err(Error::Config("liquid-gas element: vertex must have pl and pg equations"));
            }
            self.plmap[m] = eqs[m][0];
            self.pgmap[m] = eqs[m][1];
        }
        if self.has_seep {
            self.flmap = vec![0; self.nf];
            for (mu, &m) in self.seep2vid.iter().enumerate() {
                if eqs[m].len() < 3 {
                    return Err(Error::Config("liquid-gas element: seepage vertex must have an fl equation"));
                }
                self.flmap[mu] = eqs[m][2];
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
            self.psi_g[idx] = 0.0;
            for m in 0..self.np {
                self.psi_l[idx] += ip.s[m] * sol.psi[self.plmap[m]];
                self.psi_g[idx] += ip.s[m] * sol.psi[self.pgmap[m]];
            }
        }
        Ok(())
    }

    fn add_to_rhs(&mut self, fb: &mut Vector, sol: &Solution) -> Result<(), Error> {
        if self.do_extrap {
            self.rhol_ex.fill(0.0);
            self.rhog_ex.fill(0.0);
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
            let pgt = beta1 * self.pg - self.psi_g[idx];
            let klr = self.mdl.cnd.klr(self.states[idx].sl);
            let kgr = self.mdl.cnd.kgr(1.0 - self.states[idx].sl);
            let rho_ll = self.states[idx].rho_ll;
            let rho_gg = self.states[idx].rho_gg;
            self.mdl
                .calc_lgs(&mut self.lgs_vars, &self.states[idx], self.pl, self.pg, 0.0, false)?;

            // compute augmented filter velocities
            for i in 0..self.ndim {
                self.wlb[i] = 0.0;
                self.wgb[i] = 0.0;
                for j in 0..self.ndim {
                    self.wlb[i] += klr * self.mdl.klsat[i][j] * (rho_ll * self.grav[j] - self.grad_pl[j]);
                    self.wgb[i] += kgr * self.mdl.kgsat[i][j] * (rho_gg * self.grav[j] - self.grad_pg[j]);
                }
            }

            // add negative of residual terms to fb
            let ip = &self.interp.ips[idx];
            for m in 0..self.np {
                let rl = self.plmap[m];
                let rg = self.pgmap[m];
                fb[rl] -= coef * ip.s[m] * (self.lgs_vars.cpl * plt + self.lgs_vars.cpg * pgt);
                fb[rg] -= coef * ip.s[m] * (self.lgs_vars.dpl * plt + self.lgs_vars.dpg * pgt);
                for i in 0..self.ndim {
                    fb[rl] += coef * ip.g.get(m, i) * self.wlb[i];
                    fb[rg] += coef * ip.g.get(m, i) * self.wgb[i];
                }
                if self.do_extrap {
                    self.rhol_ex[m] += self.interp.emat.get(m, idx) * self.lgs_vars.rho_l;
                    self.rhog_ex[m] += self.interp.emat.get(m, idx) * self.lgs_vars.rho_g;
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
        self.kll.fill(0.0);
        self.klg.fill(0.0);
        self.kgl.fill(0.0);
        self.kgg.fill(0.0);
        if self.do_extrap {
            self.rhol_ex.fill(0.0);
            self.rhog_ex.fill(0.0);
            self.drholdpl_ex.fill(0.0);
            self.drhogdpg_ex.fill(0.0);
        }
        let beta1 = sol.dyn_cfs.beta1;
        let cl = self.mdl.liq.cc;
        let cg = self.mdl.gas.cc;
        for idx in 0..self.interp.nip() {
            self.calc_ip_vars(idx, sol);
            let mut coef = self.interp.ips[idx].coef;
            if sol.axisym {
                coef *= self.interp.ips[idx].radius;
            }

            // tpm variables
            let plt = beta1 * self.pl - self.psi_l[idx];
            let pgt = beta1 * self.pg - self.psi_g[idx];
            let klr = self.mdl.cnd.klr(self.states[idx].sl);
            let kgr = self.mdl.cnd.kgr(1.0 - self.states[idx].sl);
            let rho_ll = self.states[idx].rho_ll;
            let rho_gg = self.states[idx].rho_gg;
            self.mdl
                .calc_lgs(&mut self.lgs_vars, &self.states[idx], self.pl, self.pg, 0.0, true)?;

            // Jacobian
            for n in 0..self.np {
                for i in 0..self.ndim {
                    self.dwlb_dpl_n[i] = 0.0;
                    self.dwlb_dpg_n[i] = 0.0;
                    self.dwgb_dpl_n[i] = 0.0;
                    self.dwgb_dpg_n[i] = 0.0;
                }
                {
                    let ip = &self.interp.ips[idx];
                    for j in 0..self.ndim {
                        let hl_j = rho_ll * self.grav[j] - self.grad_pl[j];
                        let hg_j = rho_gg * self.grav[j] - self.grad_pg[j];
                        let dhl_dpl_nj = ip.s[n] * cl * self.grav[j] - ip.g.get(n, j);
                        let dhg_dpg_nj = ip.s[n] * cg * self.grav[j] - ip.g.get(n, j);
                        for i in 0..self.ndim {
                            self.dwlb_dpl_n[i] +=
                                self.mdl.klsat[i][j] * (ip.s[n] * self.lgs_vars.dklr_dpl * hl_j + klr * dhl_dpl_nj);
                            self.dwlb_dpg_n[i] += self.mdl.klsat[i][j] * ip.s[n] * self.lgs_vars.dklr_dpg * hl_j;
                            self.dwgb_dpl_n[i] += self.mdl.kgsat[i][j] * ip.s[n] * self.lgs_vars.dkgr_dpl * hg_j;
                            self.dwgb_dpg_n[i] +=
                                self.mdl.kgsat[i][j] * (ip.s[n] * self.lgs_vars.dkgr_dpg * hg_j + kgr * dhg_dpg_nj);
                        }
                    }
                }
                for m in 0..self.np {
                    let ip = &self.interp.ips[idx];
                    let ss = coef * ip.s[m] * ip.s[n];
                    let mut kll = ss * (self.lgs_vars.dcpl_dpl * plt + self.lgs_vars.dcpg_dpl * pgt + beta1 * self.lgs_vars.cpl);
                    let mut klg = ss * (self.lgs_vars.dcpl_dpg * plt + self.lgs_vars.dcpg_dpg * pgt + beta1 * self.lgs_vars.cpg);
                    let mut kgl = ss * (self.lgs_vars.ddpl_dpl * plt + self.lgs_vars.ddpg_dpl * pgt + beta1 * self.lgs_vars.dpl);
                    let mut kgg = ss * (self.lgs_vars.ddpl_dpg * plt + self.lgs_vars.ddpg_dpg * pgt + beta1 * self.lgs_vars.dpg);
                    for i in 0..self.ndim {
                        kll -= coef * ip.g.get(m, i) * self.dwlb_dpl_n[i];
                        klg -= coef * ip.g.get(m, i) * self.dwlb_dpg_n[i];
                        kgl -= coef * ip.g.get(m, i) * self.dwgb_dpl_n[i];
                        kgg -= coef * ip.g.get(m, i) * self.dwgb_dpg_n[i];
                    }
                    self.kll.set(m, n, self.kll.get(m, n) + kll);
                    self.klg.set(m, n, self.klg.get(m, n) + klg);
                    self.kgl.set(m, n, self.kgl.get(m, n) + kgl);
                    self.kgg.set(m, n, self.kgg.get(m, n) + kgg);
                    if self.do_extrap {
                        let exl = self.interp.emat.get(m, idx) * self.lgs_vars.cpl * ip.s[n];
                        let exg = self.interp.emat.get(m, idx) * self.lgs_vars.dpg * ip.s[n];
                        self.drholdpl_ex.set(m, n, self.drholdpl_ex.get(m, n) + exl);
                        self.drhogdpg_ex.set(m, n, self.drhogdpg_ex.get(m, n) + exg);
                    }
                }
                if self.do_extrap {
                    self.rhol_ex[n] += self.interp.emat.get(n, idx) * self.lgs_vars.rho_l;
                    self.rhog_ex[n] += self.interp.emat.get(n, idx) * self.lgs_vars.rho_g;
                }
            }
        }

        // contribution from natural boundary conditions
        if self.has_seep {
            self.add_nat_bcs_to_jac(sol)?;
        }

        // assemble K matrices into Kb
        self.assemble_kks(kb);
        Ok(())
    }

    fn update(&mut self, sol: &Solution) -> Result<(), Error> {
        for idx in 0..self.interp.nip() {
            let ip = &self.interp.ips[idx];
            let (mut pl, mut pg, mut dpl, mut dpg) = (0.0, 0.0, 0.0, 0.0);
            for m in 0..self.np {
                let rl = self.plmap[m];
                let rg = self.pgmap[m];
                pl += ip.s[m] * sol.y[rl];
                pg += ip.s[m] * sol.y[rg];
                dpl += ip.s[m] * sol.dy[rl];
                dpg += ip.s[m] * sol.dy[rg];
            }
            self.mdl.update(&mut self.states[idx], dpl, dpg, pl, pg)?;
        }
        Ok(())
    }

    fn set_ini_ivs(&mut self, sol: &Solution, _ini: Option<&InitialStresses>) -> Result<(), Error> {
        self.compute_grav(sol.t);
        for idx in 0..self.interp.nip() {
            self.calc_ip_vars(idx, sol);

            // densities from the hydrostatic condition => enforce initial filter velocities = 0
            let mut rho_ll = self.mdl.liq.rho_ref;
            let mut rho_gg = self.mdl.gas.rho_ref;
            if f64::abs(self.grav[self.ndim - 1]) > 0.0 {
                rho_ll = self.grad_pl[self.ndim - 1] / self.grav[self.ndim - 1];
                rho_gg = self.grad_pg[self.ndim - 1] / self.grav[self.ndim - 1];
            }
            let state = self.mdl.new_state(rho_ll, rho_gg, self.pl, self.pg)?;
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
                            pl += fip.sf[i] * sol.y[self.plmap[m]];
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
        serde_json::to_value(&self.states).map_err(|_| Error::Consistency("liquid-gas element: cannot encode states"))
    }

    fn decode(&mut self, value: &serde_json::Value) -> Result<(), Error> {
        let states: Vec<StatePorous> = serde_json::from_value(value.clone())
            .map_err(|_| Error::Consistency("liquid-gas element: cannot decode states"))?;
        if states.len() != self.states.len() {
            return Err(Error::Consistency("liquid-gas element: decoded data has the wrong number of ips"));
        }
        self.states = states;
        self.backup_ivs(false);
        Ok(())
    }

    fn out_ip_coords(&self) -> Vec<Vec<f64>> {
        self.interp.ips.iter().map(|ip| ip.coords.clone()).collect()
    }

    fn out_ip_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for key in ["pl", "pg", "pc", "sl", "RhoG"] {
            keys.push(key.to_string());
        }
        keys.extend(liq_flow_keys(self.ndim));
        keys.extend(gas_flow_keys(self.ndim));
        keys
    }

    fn out_ip_vals(&mut self, map: &mut IpsMap, sol: &Solution) -> Result<(), Error> {
        let flow_l = liq_flow_keys(self.ndim);
        let flow_g = gas_flow_keys(self.ndim);
        let nip = self.interp.nip();
        for idx in 0..nip {
            self.calc_ip_vars(idx, sol);
            let sl = self.states[idx].sl;
            let sg = 1.0 - sl;
            let rho_ll = self.states[idx].rho_ll;
            let rho_gg = self.states[idx].rho_gg;
            let klr = self.mdl.cnd.klr(sl);
            let kgr = self.mdl.cnd.kgr(sg);
            map.set("pl", idx, nip, self.pl);
            map.set("pg", idx, nip, self.pg);
            map.set("pc", idx, nip, self.pg - self.pl);
            map.set("sl", idx, nip, sl);
            map.set("RhoG", idx, nip, rho_gg);
            for i in 0..self.ndim {
                let mut nwl_i = 0.0;
                let mut nwg_i = 0.0;
                for j in 0..self.ndim {
                    nwl_i += klr * self.mdl.klsat[i][j] * (self.grav[j] - self.grad_pl[j] / rho_ll);
                    nwg_i += kgr * self.mdl.kgsat[i][j] * (self.grav[j] - self.grad_pg[j] / rho_gg);
                }
                map.set(&flow_l[i], idx, nip, nwl_i);
                map.set(&flow_g[i], idx, nip, nwg_i);
            }
        }
        Ok(())
    }
}
