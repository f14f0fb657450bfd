use super::{liq_flow_keys, BcKey, Element, InitialStresses, IpsMap, Liquid, Solid, Solution, SparseTriplet};
use crate::base::Error;
use crate::FnTime;
use russell_lab::{Matrix, Vector};

/// Implements the element for porous media based on the u-p formulation [1]
///
/// The element couples a solid phase (displacements u) with a liquid phase
/// (pressure pl); the gas pressure is kept at the atmospheric (zero) datum.
pub struct SolidLiquid<'a> {
    /// Underlying u-element
    pub u: Solid<'a>,

    /// Underlying p-element
    pub p: Liquid<'a>,

    /// Space dimension
    pub ndim: usize,

    /// Divergence of the displacements at the current integration point
    pub divus: f64,

    /// bs = α1·u − ζ* − g at the current integration point; Eq (A.1) of [1]
    pub bs: Vec<f64>,

    /// hl = −ρL·bs − ∇pl at the current integration point; Eq (A.1) of [1]
    pub hl: Vec<f64>,

    /// Local matrix dRus/dpl [nu][np]
    pub kup: Matrix,

    /// Local matrix dRpl/dus [np][nu]
    pub kpu: Matrix,

    /// ∂ρl/∂us extrapolated to the nodes (seepage faces) [np][nu]
    pub drhol_dus_ex: Matrix,
}

impl<'a> SolidLiquid<'a> {
    /// Allocates a new coupled element from the underlying u and p elements
    ///
    /// Both elements must share the same integration points.
    pub fn new(u: Solid<'a>, p: Liquid<'a>) -> Result<Self, Error> {
        if u.interp.nip() != p.interp.nip() || u.ndim != p.ndim {
            return Err(Error::Config("solid-liquid element: u and p elements must share the integration points"));
        }
        let ndim = u.ndim;
        let (nu, np) = (u.nu, p.np);
        Ok(SolidLiquid {
            u,
            p,
            ndim,
            divus: 0.0,
            bs: vec![0.0; ndim],
            hl: vec![0.0; ndim],
            kup: Matrix::new(nu, np),
            kpu: Matrix::new(np, nu),
            drhol_dus_ex: Matrix::new(np, nu),
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
        for i in 0..self.ndim {
            self.p.grad_pl[i] = 0.0;
        }
        for m in 0..self.p.np {
            let r = self.p.pmap[m];
            self.p.pl += ip.s[m] * sol.y[r];
            for i in 0..self.ndim {
                self.p.grad_pl[i] += ip.g.get(m, i) * sol.y[r];
            }
        }

        // compute bs and hl; Eq (A.1) of [1]
        let rho_ll = self.p.states[idx].rho_ll;
        let alpha1 = sol.dyn_cfs.alpha1;
        for i in 0..self.ndim {
            self.bs[i] = alpha1 * self.u.us[i] - self.u.zet[idx][i] - self.p.grav[i];
            self.hl[i] = -rho_ll * self.bs[i] - self.p.grad_pl[i];
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
                            self.kpu.set(m, c, self.kpu.get(m, c) + val);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl<'a> Element for SolidLiquid<'a> {
    fn set_eqs(&mut self, eqs: &[Vec<usize>]) -> Result<(), Error> {
        // vertex equations are ordered as [ux, uy, (uz), pl, (fl)]
        let ndim = self.ndim;
        let mut u_eqs = Vec::with_capacity(eqs.len());
        let mut p_eqs = Vec::with_capacity(eqs.len());
        for vertex_eqs in eqs {
            if vertex_eqs.len() < ndim + 1 {
                return Err(Error::Config("solid-liquid element: vertex must have ndim+1 equations at least"));
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
            let divvs = alpha4 * self.divus - self.u.div_chi[idx]; // divergence of Eq (35a) of [1]
            let plt = beta1 * self.p.pl - self.p.psi_l[idx]; // Eq (35c) of [1]
            let klr = self.p.mdl.cnd.klr(self.p.states[idx].sl);
            self.p
                .mdl
                .calc_ls(&mut self.p.ls_vars, &self.p.states[idx], self.p.pl, self.divus, false)?;

            // compute ρl·wl; Eqs (34b) and (35) of [1]
            for i in 0..self.ndim {
                self.p.rhowl[i] = 0.0;
                for j in 0..self.ndim {
                    self.p.rhowl[i] += klr * self.p.mdl.klsat[i][j] * self.hl[j];
                }
            }

            // p: add negative of residual term to fb; Eqs (38a) and (45a) of [1]
            {
                let ip = &self.p.interp.ips[idx];
                for m in 0..self.p.np {
                    let r = self.p.pmap[m];
                    fb[r] -= coef * ip.s[m] * (self.p.ls_vars.cpl * plt + self.p.ls_vars.cvs * divvs);
                    for i in 0..self.ndim {
                        fb[r] += coef * ip.g.get(m, i) * self.p.rhowl[i];
                    }
                    if self.p.do_extrap {
                        // Eq (19) of [2]
                        self.p.rhol_ex[m] += self.p.interp.emat.get(m, idx) * self.p.ls_vars.rho_l;
                    }
                }
            }

            // u: add negative of residual term to fb; Eqs (38b) and (45b) of [1]
            {
                let ip = &self.u.interp.ips[idx];
                let sigma = &self.u.states[idx].sigma;
                let nverts = self.u.interp.nverts;
                for m in 0..nverts {
                    for i in 0..self.ndim {
                        let r = self.u.umap[i + m * self.ndim];
                        fb[r] -= coef * ip.s[m] * self.p.ls_vars.rho * self.bs[i];
                        for j in 0..self.ndim {
                            fb[r] -= coef * sigma.get(i, j) * ip.g.get(m, j);
                        }
                        fb[r] += coef * self.p.ls_vars.pp * ip.g.get(m, i);
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
        self.p.kpp.fill(0.0);
        self.kup.fill(0.0);
        self.kpu.fill(0.0);
        self.u.kk.fill(0.0);
        if self.p.do_extrap {
            self.p.rhol_ex.fill(0.0);
            self.p.drholdpl_ex.fill(0.0);
            self.drhol_dus_ex.fill(0.0);
        }

        let alpha1 = sol.dyn_cfs.alpha1;
        let alpha4 = sol.dyn_cfs.alpha4;
        let beta1 = sol.dyn_cfs.beta1;
        let cl = self.p.mdl.liq.cc;
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
            let klr = self.p.mdl.cnd.klr(self.p.states[idx].sl);
            let rho_ll = self.p.states[idx].rho_ll;
            self.p
                .mdl
                .calc_ls(&mut self.p.ls_vars, &self.p.states[idx], self.p.pl, self.divus, true)?;

            // Kpu, Kup and Kpp; Eq (47) of [1]
            for n in 0..p_nverts {
                {
                    let ipu = &self.u.interp.ips[idx];
                    let ipp = &self.p.interp.ips[idx];
                    for j in 0..self.ndim {
                        for m in 0..u_nverts {
                            let c = j + m * self.ndim;

                            // ∂rlb/∂usᵐ; Eqs (A.3) and (A.6) of [1]
                            let mut kpu_val = coef
                                * ipp.s[n]
                                * (self.p.ls_vars.dcpl_dus_m * plt + alpha4 * self.p.ls_vars.cvs)
                                * ipu.g.get(m, j);

                            // ∂(ρl·wl)/∂usᵐ; Eq (A.8) of [1]
                            for i in 0..self.ndim {
                                kpu_val +=
                                    coef * ipp.g.get(n, i) * ipu.s[m] * alpha1 * rho_ll * klr * self.p.mdl.klsat[i][j];
                            }
                            self.kpu.set(n, c, self.kpu.get(n, c) + kpu_val);

                            // ∂ru/∂plⁿ and ∂p/∂plⁿ; Eqs (A.9) and (A.11) of [1]
                            let kup_val = coef
                                * (ipu.s[m] * ipp.s[n] * self.p.ls_vars.drho_dpl * self.bs[j]
                                    - ipu.g.get(m, j) * ipp.s[n] * self.p.ls_vars.dp_dpl);
                            self.kup.set(c, n, self.kup.get(c, n) + kup_val);

                            // for seepage faces
                            if self.p.do_extrap {
                                let ex = self.p.interp.emat.get(n, idx) * self.p.ls_vars.drhol_dus_m * ipu.g.get(m, j);
                                self.drhol_dus_ex.set(n, c, self.drhol_dus_ex.get(n, c) + ex);
                            }
                        }

                        // term in brackets in Eq (A.7) of [1]
                        self.p.dwlb_dpl_n[j] = ipp.s[n] * self.p.ls_vars.dklr_dpl * self.hl[j]
                            - klr * (ipp.s[n] * cl * self.bs[j] + ipp.g.get(n, j));
                    }
                }

                // Kpp; Eq (47) of [1]
                {
                    let ipp = &self.p.interp.ips[idx];
                    for m in 0..p_nverts {
                        // ∂rlb/∂plⁿ; Eq (A.5) of [1]
                        let mut val = coef
                            * ipp.s[m]
                            * ipp.s[n]
                            * (self.p.ls_vars.dcpl_dpl * plt
                                + self.p.ls_vars.dcvs_dpl * divvs
                                + beta1 * self.p.ls_vars.cpl);

                        // ∂(ρl·wl)/∂plⁿ; Eq (A.7) of [1]
                        for i in 0..self.ndim {
                            for j in 0..self.ndim {
                                val -= coef * ipp.g.get(m, i) * self.p.mdl.klsat[i][j] * self.p.dwlb_dpl_n[j];
                            }
                        }
                        self.p.kpp.set(m, n, self.p.kpp.get(m, n) + val);

                        // inner summation term in Eq (22) of [2]
                        if self.p.do_extrap {
                            let ex = self.p.interp.emat.get(m, idx) * self.p.ls_vars.cpl * ipp.s[n];
                            self.p.drholdpl_ex.set(m, n, self.p.drholdpl_ex.get(m, n) + ex);
                        }
                    }

                    // Eq (19) of [2]
                    if self.p.do_extrap {
                        self.p.rhol_ex[n] += self.p.interp.emat.get(n, idx) * self.p.ls_vars.rho_l;
                    }
                }
            }

            // Kuu; Eqs (47) and (A.10) of [1] plus the stiffness term
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
                                    val += ip.s[m] * ip.s[n] * alpha1 * self.p.ls_vars.rho;
                                }
                                val += ip.s[m] * self.p.ls_vars.drho_dus_m * self.bs[i] * ip.g.get(n, j);
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
        //    _              _
        //   |  Kuu Kup  0    |
        //   |  Kpu Kpp Kpf   |
        //   |_  0  Kfp Kff  _|
        //
        for i in 0..self.p.np {
            let ii = self.p.pmap[i];
            for j in 0..self.p.np {
                kb.put(ii, self.p.pmap[j], self.p.kpp.get(i, j));
            }
            for j in 0..self.p.nf {
                kb.put(ii, self.p.flmap[j], self.p.kpf.get(i, j));
                kb.put(self.p.flmap[j], ii, self.p.kfp.get(j, i));
            }
            for j in 0..self.u.nu {
                kb.put(ii, self.u.umap[j], self.kpu.get(i, j));
                kb.put(self.u.umap[j], ii, self.kup.get(j, i));
            }
        }
        for i in 0..self.p.nf {
            for j in 0..self.p.nf {
                kb.put(self.p.flmap[i], self.p.flmap[j], self.p.kff.get(i, j));
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
                return Err(Error::Config("solid-liquid element: total stresses must be given at all ips"));
            }
            let mut sx = vec![0.0; nip];
            let mut sy = vec![0.0; nip];
            let mut sz = vec![0.0; nip];
            for idx in 0..nip {
                // pore pressure p = sl·pl at the ip
                let ip = &self.p.interp.ips[idx];
                let mut pl = 0.0;
                for m in 0..self.p.np {
                    pl += ip.s[m] * sol.y[self.p.pmap[m]];
                }
                let p = pl * self.p.states[idx].sl;
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
            .ok_or(Error::Consistency("solid-liquid element: missing u states"))?;
        let p = value
            .get("p")
            .ok_or(Error::Consistency("solid-liquid element: missing p states"))?;
        self.u.decode(u)?;
        self.p.decode(p)
    }

    fn out_ip_coords(&self) -> Vec<Vec<f64>> {
        self.u.out_ip_coords()
    }

    fn out_ip_keys(&self) -> Vec<String> {
        let mut keys = self.u.out_ip_keys();
        keys.push("nf".to_string());
        keys.push("pl".to_string());
        keys.push("sl".to_string());
        keys.push("pc".to_string());
        keys.push("RhoL".to_string());
        keys.extend(liq_flow_keys(self.ndim));
        keys
    }

    fn out_ip_vals(&mut self, map: &mut IpsMap, sol: &Solution) -> Result<(), Error> {
        self.u.out_ip_vals(map, sol)?;
        let flow = liq_flow_keys(self.ndim);
        let nip = self.u.interp.nip();
        for idx in 0..nip {
            self.ipvars(idx, sol);
            let ns = (1.0 - self.divus) * self.p.states[idx].ns0;
            let sl = self.p.states[idx].sl;
            let rho_ll = self.p.states[idx].rho_ll;
            let klr = self.p.mdl.cnd.klr(sl);
            map.set("nf", idx, nip, 1.0 - ns);
            map.set("pl", idx, nip, self.p.pl);
            map.set("sl", idx, nip, sl);
            map.set("pc", idx, nip, -self.p.pl);
            map.set("RhoL", idx, nip, rho_ll);
            for i in 0..self.ndim {
                let mut nwl_i = 0.0;
                for j in 0..self.ndim {
                    nwl_i += klr * self.p.mdl.klsat[i][j] * (self.p.grav[j] - self.p.grad_pl[j] / rho_ll);
                }
                map.set(&flow[i], idx, nip, nwl_i);
            }
        }
        Ok(())
    }
}
