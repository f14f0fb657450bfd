use super::{gas_flow_keys, liq_flow_keys, BcKey, Element, InitialStresses, IpsMap, LiquidGas, Solid, Solution, SparseTriplet};
use crate::base::Error;
use crate::FnTime;
use russell_lab::{Matrix, Vector};

/// Implements the element for porous media based on the u-pl-pg formulation [1]
///
/// The element couples a solid phase (displacements u) with a liquid phase
/// (pressure pl) and a gas phase (pressure pg).
pub struct SolidLiquidGas<'a> {
    /// Underlying u-element
    pub u: Solid<'a>,

    /// Underlying p-element (pl and pg)
    pub p: LiquidGas<'a>,

    /// Space dimension
    pub ndim: usize,

    /// Divergence of the displacements at the current integration point
    pub divus: f64,

    /// b = α1·u − ζ* − g at the current integration point; Eq (A.1) of [1]
    pub bs: Vec<f64>,

    /// hl = −ρL·b − ∇pl at the current integration point; Eq (A.1) of [1]
    pub hl: Vec<f64>,

    /// hg = −ρG·b − ∇pg at the current integration point
    pub hg: Vec<f64>,

    /// Local matrix dRus/dpl [nu][np]
    pub kul: Matrix,

    /// Local matrix dRus/dpg [nu][np]
    pub kug: Matrix,

    /// Local matrix dRpl/dus [np][nu]
    pub klu: Matrix,

    /// Local matrix dRpg/dus [np][nu]
    pub kgu: Matrix,

    /// ∂ρl/∂us extrapolated to the nodes (seepage faces) [np][nu]
    pub drhol_dus_ex: Matrix,

    /// ∂ρg/∂us extrapolated to the nodes [np][nu]
    pub drhog_dus_ex: Matrix,
}

impl<'a> SolidLiquidGas<'a> {
    /// Allocates a new coupled element from the underlying u and p elements
    ///
    /// Both elements must share the same integration points.
    pub fn new(u: Solid<'a>, p: LiquidGas<'a>) -> Result<Self, Error> {
        if u.interp.nip() != p.interp.nip() || u.ndim != p.ndim {
            return Err(Error::Config(
                "solid-liquid-gas element: u and p elements must share the integration points",
            ));
        }
        let ndim = u.ndim;
        let (nu, np) = (u.nu, p.np);
        Ok(SolidLiquidGas {
            u,
            p,
            ndim,
            divus: 0.0,
            bs: vec![0.0; ndim],
            hl: vec![0.0; ndim],
            hg: vec![0.0; ndim],
            kul: Matrix::new(nu, np),
            kug: Matrix::new(nu, np),
            klu: Matrix::new(np, nu),
            kgu: Matrix::new(np, nu),
            drhol_dus_ex: Matrix::new(np, nu),
            drhog_dus_ex: Matrix::new(np, nu),
        })
    }

    /// Computes the current values at integration point idx
    pub fn ipvars(&mut self, idx: usize, sol: &Solution) {
        self.p.compute_grav(sol.t);

        // recover u-variables
        self.divus = self.u.ip_displacements(idx, sol);

        // recover p-variables
        let ip = &self.p.interp.ips[idx];
        self.p.pl = 0.0;
        self.p.pg = 0.0;
        for i in 0..self.ndim {
            self.p.grad_pl[i] = 0.0;
            self.p.grad_pg[i] = 0.0;
        }
        for m in 0..self.p.np {
            let rl = self.p.plmap[m];
            let rg = self.p.pgmap[m];
            self.p.pl += ip.s[m] * sol.y[rl];
            self.p.pg += ip.s[m] * sol.y[rg];
            for i in 0..self.ndim {
                self.p.grad_pl[i] += ip.g.get(m, i) * sol.y[rl];
                self.p.grad_pg[i] += ip.g.get(m, i) * sol.y[rg];
            }
        }

        // compute b, hl and hg; Eq (A.1) of [1]
        let rho_ll = self.p.states[idx].rho_ll;
        let rho_gg = self.p.states[idx].rho_gg;
        let alpha1 = sol.dyn_cfs.alpha1;
        for i in 0..self.ndim {
            self.bs[i] = alpha1 * self.u.us[i] - self.u.zet[idx][i] - self.p.grav[i];
            self.hl[i] = -rho_ll * self.bs[i] - self.p.grad_pl[i];
            self.hg[i] = -rho_gg * self.bs[i] - self.p.grad_pg[i];
        }
    }

    /// Adds the seepage face terms involving the displacements to the local Jacobian
    pub fn add_nat_bcs_to_jac(&mut self, sol: &Solution) -> Result<(), Error> {
        let nu = self.u.nu;
        for idx in 0..self.p.nat_bcs.len() {
            let nbc = self.p.nat_bcs[idx];
            if nbc.key != BcKey::Seep {
                continue;
            }
            let shift = (nbc.fcn)(sol.t);
            for jdx in 0..self.p.interp.faces[nbc.face].ips.len() {
                let coef = self.p.interp.faces[nbc.face].ips[jdx].coef;
                let (_, pl, fl) = {
                    let sf = &self.p.interp.faces[nbc.face].ips[jdx].sf;
                    self.p.calc_face_ip_vars(nbc.face, sf, sol)
                };
                let mut plmax = self.p.plmax[idx][jdx] - shift;
                if plmax < 0.0 {
                    plmax = 0.0;
                }
                let g = pl - plmax;
                let rmp = self.p.ramp(fl + self.p.kap * g);
                let face_verts = self.p.interp.faces[nbc.face].local_verts.clone();
                let sf = self.p.interp.faces[nbc.face].ips[jdx].sf.clone();
                for (i, &m) in face_verts.iter().enumerate() {
                    for c in 0..nu {
                        for (l, &r) in face_verts.iter().enumerate() {
                            let val = coef * sf[i] * sf[l] * self.drhol_dus_ex.get(r, c) * rmp;
                            self.klu.set(m, c, self.klu.get(m, c) + val);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl<'a> Element for SolidLiquidGas<'a> {
    fn set_eqs(&mut self, eqs: &[Vec<usize>]) -> Result<(), Error> {
        // vertex equations are ordered as [ux, uy, (uz), pl, pg, (fl)]
        let ndim = self.ndim;
        let mut u_eqs = Vec::with_capacity(eqs.len());
        let mut p_eqs = Vec::with_capacity(eqs.len());
        for vertex_eqs in eqs {
            if vertex_eqs.len() < ndim + 2 {
                return Err(Error::Config(
                    "solid-liquid-gas element: vertex must have ndim+2 equations at least",
                ));
            }
            u_eqs.push(vertex_eqs[..ndim].to_vec());
            p_eqs.push(vertex_eqs[ndim..].to_vec());
        }
        self.u.set_eqs(&u_eqs)?;
        self.p.set_eqs(&p_eqs)
    }

    fn set_ele_conds(&mut self, key: &str, fcn: FnTime) -> Result<(), Error> {
        self.u.set_ele_conds(key, fcn)?;
        self.p.set_ele_conds(key, fcn)
    }

    fn interp_star_vars(&mut self, sol: &Solution) -> Result<(), Error> {
        self.u.interp_star_vars(sol)?;
        self.p.interp_star_vars(sol)
    }

    fn add_to_rhs(&mut self, fb: &mut Vector, sol: &Solution) -> Result<(), Error> {
        if self.p.do_extrap {
            self.p.rhol_ex.fill(0.0);
            self.p.rhog_ex.fill(0.0);
        }
        let alpha4 = sol.dyn_cfs.alpha4;
        let beta1 = sol.dyn_cfs.beta1;
        for idx in 0..self.u.interp.nip() {
            self.ipvars(idx, sol);
            let mut coef = self.u.interp.ips[idx].coef;
            if sol.axisym {
                coef *= self.u.interp.ips[idx].radius;
            }

            // tpm variables
            let divvs = alpha4 * self.divus - self.u.div_chi[idx];
            let plt = beta1 * self.p.pl - self.p.psi_l[idx];
            let pgt = beta1 * self.p.pg - self.p.psi_g[idx];
            let klr = self.p.mdl.cnd.klr(self.p.states[idx].sl);
            let kgr = self.p.mdl.cnd.kgr(1.0 - self.p.states[idx].sl);
            self.p.mdl.calc_lgs(
                &mut self.p.lgs_vars,
                &self.p.states[idx],
                self.p.pl,
                self.p.pg,
                self.divus,
                false,
            )?;

            // compute augmented filter velocities ρl·wl and ρg·wg
            for i in 0..self.ndim {
                self.p.wlb[i] = 0.0;
                self.p.wgb[i] = 0.0;
                for j in 0..self.ndim {
                    self.p.wlb[i] += klr * self.p.mdl.klsat[i][j] * self.hl[j];
                    self.p.wgb[i] += kgr * self.p.mdl.kgsat[i][j] * self.hg[j];
                }
            }

            // p: add negative of residual term to fb
            {
                let ip = &self.p.interp.ips[idx];
                let vars = &self.p.lgs_vars;
                for m in 0..self.p.np {
                    let rl = self.p.plmap[m];
                    let rg = self.p.pgmap[m];
                    fb[rl] -= coef * ip.s[m] * (vars.cpl * plt + vars.cpg * pgt + vars.cvs * divvs);
                    fb[rg] -= coef * ip.s[m] * (vars.dpl * plt + vars.dpg * pgt + vars.dvs * divvs);
                    for i in 0..self.ndim {
                        fb[rl] += coef * ip.g.get(m, i) * self.p.wlb[i];
                        fb[rg] += coef * ip.g.get(m, i) * self.p.wgb[i];
                    }
                    if self.p.do_extrap {
                        self.p.rhol_ex[m] += self.p.interp.emat.get(m, idx) * vars.rho_l;
                        self.p.rhog_ex[m] += self.p.interp.emat.get(m, idx) * vars.rho_g;
                    }
                }
            }

            // u: add negative of residual term to fb
            {
                let ip = &self.u.interp.ips[idx];
                let sigma = &self.u.states[idx].sigma;
                let nverts = self.u.interp.nverts;
                for m in 0..nverts {
                    for i in 0..self.ndim {
                        let r = self.u.umap[i + m * self.ndim];
                        fb[r] -= coef * ip.s[m] * self.p.lgs_vars.rho * self.bs[i];
                        for j in 0..self.ndim {
                            fb[r] -= coef * sigma.get(i, j) * ip.g.get(m, j);
                        }
                        fb[r] += coef * self.p.lgs_vars.pp * ip.g.get(m, i);
                    }
                }
            }
        }

        // contribution from natural boundary conditions
        if !self.p.nat_bcs.is_empty() {
            return self.p.add_nat_bcs_to_rhs(fb, sol);
        }
        Ok(())
    }

    fn add_to_kb(&mut self, kb: &mut SparseTriplet, sol: &Solution, _first_it: bool) -> Result<(), Error> {
        // clear matrices
        self.p.kll.fill(0.0);
        self.p.klg.fill(0.0);
        self.p.kgl.fill(0.0);
        self.p.kgg.fill(0.0);
        self.kul.fill(0.0);
        self.kug.fill(0.0);
        self.klu.fill(0.0);
        self.kgu.fill(0.0);
        self.u.kk.fill(0.0);
        if self.p.do_extrap {
            self.p.rhol_ex.fill(0.0);
            self.p.rhog_ex.fill(0.0);
            self.p.drholdpl_ex.fill(0.0);
            self.p.drhogdpg_ex.fill(0.0);
            self.drhol_dus_ex.fill(0.0);
            self.drhog_dus_ex.fill(0.0);
        }

        let alpha1 = sol.dyn_cfs.alpha1;
        let alpha4 = sol.dyn_cfs.alpha4;
        let beta1 = sol.dyn_cfs.beta1;
        let cl = self.p.mdl.liq.cc;
        let cg = self.p.mdl.gas.cc;
        let u_nverts = self.u.interp.nverts;
        let p_nverts = self.p.np;
        let dd = self.u.mdl.modulus();

        for idx in 0..self.u.interp.nip() {
            self.ipvars(idx, sol);
            let mut coef = self.u.interp.ips[idx].coef;
            if sol.axisym {
                coef *= self.u.interp.ips[idx].radius;
            }

            // tpm variables
            let divvs = alpha4 * self.divus - self.u.div_chi[idx];
            let plt = beta1 * self.p.pl - self.p.psi_l[idx];
            let pgt = beta1 * self.p.pg - self.p.psi_g[idx];
            let klr = self.p.mdl.cnd.klr(self.p.states[idx].sl);
            let kgr = self.p.mdl.cnd.kgr(1.0 - self.p.states[idx].sl);
            let rho_ll = self.p.states[idx].rho_ll;
            let rho_gg = self.p.states[idx].rho_gg;
            self.p.mdl.calc_lgs(
                &mut self.p.lgs_vars,
                &self.p.states[idx],
                self.p.pl,
                self.p.pg,
                self.divus,
                true,
            )?;

            // Klu, Kgu, Kul, Kug, Kll, Klg, Kgl and Kgg
            for n in 0..p_nverts {
                for i in 0..self.ndim {
                    self.p.dwlb_dpl_n[i] = 0.0;
                    self.p.dwlb_dpg_n[i] = 0.0;
                    self.p.dwgb_dpl_n[i] = 0.0;
                    self.p.dwgb_dpg_n[i] = 0.0;
                }
                {
                    let ipu = &self.u.interp.ips[idx];
                    let ipp = &self.p.interp.ips[idx];
                    let vars = &self.p.lgs_vars;
                    for j in 0..self.ndim {
                        for m in 0..u_nverts {
                            let c = j + m * self.ndim;

                            // ∂rβ/∂usᵐ
                            let mut klu_val = coef
                                * ipp.s[n]
                                * (vars.dcpl_dus_m * plt + vars.dcpg_dus_m * pgt + alpha4 * vars.cvs)
                                * ipu.g.get(m, j);
                            let mut kgu_val = coef
                                * ipp.s[n]
                                * (vars.ddpl_dus_m * plt + vars.ddpg_dus_m * pgt + alpha4 * vars.dvs)
                                * ipu.g.get(m, j);

                            // ∂(ρβ·wβ)/∂usᵐ
                            for i in 0..self.ndim {
                                klu_val +=
                                    coef * ipp.g.get(n, i) * ipu.s[m] * alpha1 * rho_ll * klr * self.p.mdl.klsat[i][j];
                                kgu_val +=
                                    coef * ipp.g.get(n, i) * ipu.s[m] * alpha1 * rho_gg * kgr * self.p.mdl.kgsat[i][j];
                            }
                            self.klu.set(n, c, self.klu.get(n, c) + klu_val);
                            self.kgu.set(n, c, self.kgu.get(n, c) + kgu_val);

                            // ∂ru/∂pβⁿ and ∂p/∂pβⁿ
                            let kul_val = coef
                                * (ipu.s[m] * ipp.s[n] * vars.drho_dpl * self.bs[j]
                                    - ipu.g.get(m, j) * ipp.s[n] * vars.dp_dpl);
                            let kug_val = coef
                                * (ipu.s[m] * ipp.s[n] * vars.drho_dpg * self.bs[j]
                                    - ipu.g.get(m, j) * ipp.s[n] * vars.dp_dpg);
                            self.kul.set(c, n, self.kul.get(c, n) + kul_val);
                            self.kug.set(c, n, self.kug.get(c, n) + kug_val);

                            // for seepage faces
                            if self.p.do_extrap {
                                let exl = self.p.interp.emat.get(n, idx) * vars.drhol_dus_m * ipu.g.get(m, j);
                                let exg = self.p.interp.emat.get(n, idx) * vars.drhog_dus_m * ipu.g.get(m, j);
                                self.drhol_dus_ex.set(n, c, self.drhol_dus_ex.get(n, c) + exl);
                                self.drhog_dus_ex.set(n, c, self.drhog_dus_ex.get(n, c) + exg);
                            }
                        }

                        // auxiliary derivatives of the augmented filter velocities
                        let dhl_dpl_nj = ipp.s[n] * cl * self.p.grav[j] - ipp.g.get(n, j);
                        let dhg_dpg_nj = ipp.s[n] * cg * self.p.grav[j] - ipp.g.get(n, j);
                        for i in 0..self.ndim {
                            self.p.dwlb_dpl_n[i] += self.p.mdl.klsat[i][j]
                                * (ipp.s[n] * vars.dklr_dpl * self.hl[j] + klr * dhl_dpl_nj);
                            self.p.dwlb_dpg_n[i] +=
                                self.p.mdl.klsat[i][j] * (ipp.s[n] * vars.dklr_dpg * self.hl[j]);
                            self.p.dwgb_dpl_n[i] +=
                                self.p.mdl.kgsat[i][j] * (ipp.s[n] * vars.dkgr_dpl * self.hg[j]);
                            self.p.dwgb_dpg_n[i] += self.p.mdl.kgsat[i][j]
                                * (ipp.s[n] * vars.dkgr_dpg * self.hg[j] + kgr * dhg_dpg_nj);
                        }
                    }
                }

                // {pl,pg} versus {pl,pg}
                {
                    let ipp = &self.p.interp.ips[idx];
                    let vars = &self.p.lgs_vars;
                    for m in 0..p_nverts {
                        let ss = coef * ipp.s[m] * ipp.s[n];
                        let mut kll_val =
                            ss * (vars.dcpl_dpl * plt + vars.dcpg_dpl * pgt + vars.dcvs_dpl * divvs + beta1 * vars.cpl);
                        let mut klg_val =
                            ss * (vars.dcpl_dpg * plt + vars.dcpg_dpg * pgt + vars.dcvs_dpg * divvs + beta1 * vars.cpg);
                        let mut kgl_val =
                            ss * (vars.ddpl_dpl * plt + vars.ddpg_dpl * pgt + vars.ddvs_dpl * divvs + beta1 * vars.dpl);
                        let mut kgg_val =
                            ss * (vars.ddpl_dpg * plt + vars.ddpg_dpg * pgt + vars.ddvs_dpg * divvs + beta1 * vars.dpg);
                        for i in 0..self.ndim {
                            kll_val -= coef * ipp.g.get(m, i) * self.p.dwlb_dpl_n[i];
                            klg_val -= coef * ipp.g.get(m, i) * self.p.dwlb_dpg_n[i];
                            kgl_val -= coef * ipp.g.get(m, i) * self.p.dwgb_dpl_n[i];
                            kgg_val -= coef * ipp.g.get(m, i) * self.p.dwgb_dpg_n[i];
                        }
                        self.p.kll.set(m, n, self.p.kll.get(m, n) + kll_val);
                        self.p.klg.set(m, n, self.p.klg.get(m, n) + klg_val);
                        self.p.kgl.set(m, n, self.p.kgl.get(m, n) + kgl_val);
                        self.p.kgg.set(m, n, self.p.kgg.get(m, n) + kgg_val);

                        if self.p.do_extrap {
                            let exl = self.p.interp.emat.get(m, idx) * vars.cpl * ipp.s[n];
                            let exg = self.p.interp.emat.get(m, idx) * vars.dpg * ipp.s[n];
                            self.p.drholdpl_ex.set(m, n, self.p.drholdpl_ex.get(m, n) + exl);
                            self.p.drhogdpg_ex.set(m, n, self.p.drhogdpg_ex.get(m, n) + exg);
                        }
                    }

                    if self.p.do_extrap {
                        self.p.rhol_ex[n] += self.p.interp.emat.get(n, idx) * vars.rho_l;
                        self.p.rhog_ex[n] += self.p.interp.emat.get(n, idx) * vars.rho_g;
                    }
                }
            }

            // Kuu: inertia, body force and stiffness terms
            {
                let ip = &self.u.interp.ips[idx];
                for m in 0..u_nverts {
                    for i in 0..self.ndim {
                        let r = i + m * self.ndim;
                        for n in 0..u_nverts {
                            for j in 0..self.ndim {
                                let c = j + n * self.ndim;
                                let mut val = 0.0;
                                if i == j {
                                    val += ip.s[m] * ip.s[n] * alpha1 * self.p.lgs_vars.rho;
                                }
                                val += ip.s[m] * self.p.lgs_vars.drho_dus_m * self.bs[i] * ip.g.get(n, j);
                                for k in 0..self.ndim {
                                    for l in 0..self.ndim {
                                        val += ip.g.get(m, k) * dd.get(i, k, j, l) * ip.g.get(n, l);
                                    }
                                }
                                self.u.kk.set(r, c, self.u.kk.get(r, c) + coef * val);
                            }
                        }
                    }
                }
            }
        }

        // contribution from natural boundary conditions
        if self.p.has_seep {
            self.p.add_nat_bcs_to_jac(sol)?;
            self.add_nat_bcs_to_jac(sol)?;
        }

        // add K to the global Jacobian
        self.p.assemble_kks(kb);
        for i in 0..self.p.np {
            for j in 0..self.u.nu {
                kb.put(self.p.plmap[i], self.u.umap[j], self.klu.get(i, j));
                kb.put(self.u.umap[j], self.p.plmap[i], self.kul.get(j, i));
                kb.put(self.p.pgmap[i], self.u.umap[j], self.kgu.get(i, j));
                kb.put(self.u.umap[j], self.p.pgmap[i], self.kug.get(j, i));
            }
        }
        for i in 0..self.u.nu {
            for j in 0..self.u.nu {
                kb.put(self.u.umap[i], self.u.umap[j], self.u.kk.get(i, j));
            }
        }
        Ok(())
    }

    fn update(&mut self, sol: &Solution) -> Result<(), Error> {
        self.u.update(sol)?;
        self.p.update(sol)
    }

    fn set_ini_ivs(&mut self, sol: &Solution, ini: Option<&InitialStresses>) -> Result<(), Error> {
        // set p-element first (saturations are needed below)
        self.p.set_ini_ivs(sol, None)?;

        // convert total vertical stresses to effective components
        if let Some(InitialStresses::TotalVertical { sv_total, kk0 }) = ini {
            let nip = self.u.interp.nip();
            if sv_total.len() != nip {
                return Err(Error::Config(
                    "solid-liquid-gas element: total stresses must be given at all ips",
                ));
            }
            let mut sx = vec![0.0; nip];
            let mut sy = vec![0.0; nip];
            let mut sz = vec![0.0; nip];
            for idx in 0..nip {
                // pore pressure p = sl·pl + sg·pg at the ip
                let ip = &self.p.interp.ips[idx];
                let mut pl = 0.0;
                let mut pg = 0.0;
                for m in 0..self.p.np {
                    pl += ip.s[m] * sol.y[self.p.plmap[m]];
                    pg += ip.s[m] * sol.y[self.p.pgmap[m]];
                }
                let sl = self.p.states[idx].sl;
                let p = pl * sl + pg * (1.0 - sl);
                let sv_eff = sv_total[idx] + p;
                let sh_eff = kk0 * sv_eff;
                if self.ndim == 3 {
                    sx[idx] = sh_eff;
                    sy[idx] = sh_eff;
                    sz[idx] = sv_eff;
                } else {
                    sx[idx] = sh_eff;
                    sy[idx] = sv_eff;
                    sz[idx] = sh_eff;
                }
            }
            let components = InitialStresses::Components { sx, sy, sz };
            return self.u.set_ini_ivs(sol, Some(&components));
        }
        self.u.set_ini_ivs(sol, ini)
    }

    fn backup_ivs(&mut self, aux: bool) {
        self.u.backup_ivs(aux);
        self.p.backup_ivs(aux);
    }

    fn restore_ivs(&mut self, aux: bool) {
        self.u.restore_ivs(aux);
        self.p.restore_ivs(aux);
    }

    fn ureset(&mut self, sol: &Solution) -> Result<(), Error> {
        // fix ns0 after displacements have been zeroed
        for idx in 0..self.u.interp.nip() {
            let ip = &self.u.interp.ips[idx];
            let mut divus = 0.0;
            for m in 0..self.u.interp.nverts {
                for i in 0..self.ndim {
                    let r = self.u.umap[i + m * self.ndim];
                    divus += ip.g.get(m, i) * sol.y[r];
                }
            }
            self.p.states[idx].ns0 = (1.0 - divus) * (1.0 - self.p.mdl.nf0);
            self.p.states_bkp[idx].ns0 = self.p.states[idx].ns0;
        }
        self.u.ureset(sol)?;
        self.p.ureset(sol)
    }

    fn encode(&self) -> Result<serde_json::Value, Error> {
        let u = self.u.encode()?;
        let p = self.p.encode()?;
        Ok(serde_json::json!({ "u": u, "p": p }))
    }

    fn decode(&mut self, value: &serde_json::Value) -> Result<(), Error> {
        let u = value
            .get("u")
            .ok_or(Error::Consistency("solid-liquid-gas element: missing u states"))?;
        let p = value
            .get("p")
            .ok_or(Error::Consistency("solid-liquid-gas element: missing p states"))?;
        self.u.decode(u)?;
        self.p.decode(p)
    }

    fn out_ip_coords(&self) -> Vec<Vec<f64>> {
        self.u.out_ip_coords()
    }

    fn out_ip_keys(&self) -> Vec<String> {
        let mut keys = self.u.out_ip_keys();
        for key in ["nf", "pl", "pg", "pc", "sl", "RhoL", "RhoG"] {
            keys.push(key.to_string());
        }
        keys.extend(liq_flow_keys(self.ndim));
        keys.extend(gas_flow_keys(self.ndim));
        keys
    }

    fn out_ip_vals(&mut self, map: &mut IpsMap, sol: &Solution) -> Result<(), Error> {
        self.u.out_ip_vals(map, sol)?;
        let flow_l = liq_flow_keys(self.ndim);
        let flow_g = gas_flow_keys(self.ndim);
        let nip = self.u.interp.nip();
        for idx in 0..nip {
            self.ipvars(idx, sol);
            let ns = (1.0 - self.divus) * self.p.states[idx].ns0;
            let sl = self.p.states[idx].sl;
            let rho_ll = self.p.states[idx].rho_ll;
            let rho_gg = self.p.states[idx].rho_gg;
            let klr = self.p.mdl.cnd.klr(sl);
            let kgr = self.p.mdl.cnd.kgr(1.0 - sl);
            map.set("nf", idx, nip, 1.0 - ns);
            map.set("pl", idx, nip, self.p.pl);
            map.set("pg", idx, nip, self.p.pg);
            map.set("pc", idx, nip, self.p.pg - self.p.pl);
            map.set("sl", idx, nip, sl);
            map.set("RhoL", idx, nip, rho_ll);
            map.set("RhoG", idx, nip, rho_gg);
            for i in 0..self.ndim {
                let mut nwl_i = 0.0;
                let mut nwg_i = 0.0;
                for j in 0..self.ndim {
                    nwl_i += klr * self.p.mdl.klsat[i][j] * (self.p.grav[j] - self.p.grad_pl[j] / rho_ll);
                    nwg_i += kgr * self.p.mdl.kgsat[i][j] * (self.p.grav[j] - self.p.grad_pg[j] / rho_gg);
                }
                map.set(&flow_l[i], idx, nip, nwl_i);
                map.set(&flow_g[i], idx, nip, nwg_i);
            }
        }
        Ok(())
    }
}
