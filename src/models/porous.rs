use super::{retention, Conductivity, Fluid, LiquidRetention, StatePorous};
use crate::base::{Error, Params};

/// Minimum saturated conductivity
const K_MIN: f64 = 1e-14;

/// Holds variables for liquid-solid (u-pl) computations at an integration point
///
/// Densities, pore-fluid pressure, the storage moduli Cpl and Cvs, and their
/// derivatives with respect to pl and to the volumetric-strain multiplier.
/// See Eqs (32) and (A.1-A.11) of reference \[1\] in the crate documentation.
#[derive(Clone, Copy, Debug, Default)]
pub struct LsVars {
    /// Partial density of the liquid ρl = nf·sl·ρL
    pub rho_l: f64,

    /// Mixture density ρ = ρl + ns·ρS
    pub rho: f64,

    /// Pore-fluid pressure p = pl·sl
    pub pp: f64,

    /// Storage modulus multiplying dpl/dt
    pub cpl: f64,

    /// Storage modulus multiplying div(dus/dt)
    pub cvs: f64,

    /// dρ/dpl
    pub drho_dpl: f64,

    /// dp/dpl
    pub dp_dpl: f64,

    /// dCpl/dpl
    pub dcpl_dpl: f64,

    /// dCvs/dpl
    pub dcvs_dpl: f64,

    /// dklr/dpl
    pub dklr_dpl: f64,

    /// dρl/dus multiplier
    pub drhol_dus_m: f64,

    /// dρ/dus multiplier
    pub drho_dus_m: f64,

    /// dCpl/dus multiplier
    pub dcpl_dus_m: f64,
}

/// Holds variables for liquid-gas-solid (u-pl-pg) computations at an integration point
#[derive(Clone, Copy, Debug, Default)]
pub struct LgsVars {
    /// Partial density of the liquid ρl = nf·sl·ρL
    pub rho_l: f64,

    /// Partial density of the gas ρg = nf·sg·ρG
    pub rho_g: f64,

    /// Mixture density ρ = ρl + ρg + ns·ρS
    pub rho: f64,

    /// Pore-fluid pressure p = pl·sl + pg·sg
    pub pp: f64,

    /// Liquid storage modulus multiplying dpl/dt
    pub cpl: f64,

    /// Liquid storage modulus multiplying dpg/dt
    pub cpg: f64,

    /// Liquid storage modulus multiplying div(dus/dt)
    pub cvs: f64,

    /// Gas storage modulus multiplying dpl/dt
    pub dpl: f64,

    /// Gas storage modulus multiplying dpg/dt
    pub dpg: f64,

    /// Gas storage modulus multiplying div(dus/dt)
    pub dvs: f64,

    /// dklr/dpl
    pub dklr_dpl: f64,

    /// dklr/dpg
    pub dklr_dpg: f64,

    /// dkgr/dpl
    pub dkgr_dpl: f64,

    /// dkgr/dpg
    pub dkgr_dpg: f64,

    /// dρl/dus multiplier
    pub drhol_dus_m: f64,

    /// dρg/dus multiplier
    pub drhog_dus_m: f64,

    /// dρ/dpl
    pub drho_dpl: f64,

    /// dρ/dpg
    pub drho_dpg: f64,

    /// dρ/dus multiplier
    pub drho_dus_m: f64,

    /// dp/dpl
    pub dp_dpl: f64,

    /// dp/dpg
    pub dp_dpg: f64,

    /// dCpl/dpl
    pub dcpl_dpl: f64,

    /// dCpl/dpg
    pub dcpl_dpg: f64,

    /// dCpg/dpl
    pub dcpg_dpl: f64,

    /// dCpg/dpg
    pub dcpg_dpg: f64,

    /// dCvs/dpl
    pub dcvs_dpl: f64,

    /// dCvs/dpg
    pub dcvs_dpg: f64,

    /// dDpl/dpl
    pub ddpl_dpl: f64,

    /// dDpl/dpg
    pub ddpl_dpg: f64,

    /// dDpg/dpl
    pub ddpg_dpl: f64,

    /// dDpg/dpg
    pub ddpg_dpg: f64,

    /// dDvs/dpl
    pub ddvs_dpl: f64,

    /// dDvs/dpg
    pub ddvs_dpg: f64,

    /// dCpl/dus multiplier
    pub dcpl_dus_m: f64,

    /// dCpg/dus multiplier
    pub dcpg_dus_m: f64,

    /// dDpl/dus multiplier
    pub ddpl_dus_m: f64,

    /// dDpg/dus multiplier
    pub ddpg_dus_m: f64,
}

/// Implements the porous medium model based on the Theory of Porous Media
///
/// Combines the conductivity, retention and fluid sub-models and performs
/// the implicit (backward-Euler) saturation update together with the
/// derivatives consistent with that update. See references \[1\] and \[2\]
/// in the crate documentation.
pub struct Porous {
    /// Maximum number of iterations of the local Newton update
    pub nmax_it: usize,

    /// Residual tolerance of the local Newton update
    pub itol: f64,

    /// Threshold below which the capillary pressure is considered ineffective
    pub pc_zero: f64,

    /// Performs a modified-Euler trial before the Newton loop
    pub me_trial: bool,

    /// Prints the residuals of the local Newton loop (debug only)
    pub show_r: bool,

    /// Forces backward-Euler even for non-rate retention models (debug only)
    pub all_be: bool,

    /// Uses non-consistent first derivatives (debug only)
    pub ncns: bool,

    /// Uses non-consistent second derivatives (debug only)
    pub ncns2: bool,

    /// Initial porosity nf0
    pub nf0: f64,

    /// Intrinsic density of solid grains
    pub rho_ss: f64,

    /// Saturated liquid conductivity divided by the reference gravity
    pub klsat: [[f64; 3]; 3],

    /// Saturated gas conductivity divided by the reference gravity
    pub kgsat: [[f64; 3]; 3],

    /// Relative conductivity model
    pub cnd: Conductivity,

    /// Liquid retention model
    pub lrm: LiquidRetention,

    /// Liquid properties
    pub liq: Fluid,

    /// Gas properties
    pub gas: Fluid,
}

impl Porous {
    /// Allocates a new porous medium model
    pub fn new(
        params: &Params,
        cnd: Conductivity,
        lrm: LiquidRetention,
        liq: Fluid,
        gas: Fluid,
        gravity: f64,
    ) -> Result<Self, Error> {
        // liquid conductivity
        let (klx, kly, klz) = match (params.find("klx"), params.find("kly"), params.find("klz")) {
            (Some(x), Some(y), Some(z)) => (x, y, z),
            _ => {
                let kl = params.get("kl", "porous model: either kl (isotropic) or klx,kly,klz must be given")?;
                (kl, kl, kl)
            }
        };

        // gas conductivity
        let (kgx, kgy, kgz) = match (params.find("kgx"), params.find("kgy"), params.find("kgz")) {
            (Some(x), Some(y), Some(z)) => (x, y, z),
            _ => {
                let kg = params.get("kg", "porous model: either kg (isotropic) or kgx,kgy,kgz must be given")?;
                (kg, kg, kg)
            }
        };
        if klx < K_MIN || kly < K_MIN || klz < K_MIN {
            return Err(Error::Config("porous model: liquid conductivities are too small"));
        }
        if kgx < K_MIN || kgy < K_MIN || kgz < K_MIN {
            return Err(Error::Config("porous model: gas conductivities are too small"));
        }

        // other parameters
        let nf0 = params.get("nf0", "porous model: porosity nf0 is missing")?;
        let rho_ss = params.get("RhoS0", "porous model: intrinsic density of solids RhoS0 is missing")?;
        if nf0 < 1e-3 || nf0 >= 1.0 {
            return Err(Error::Config("porous model: porosity nf0 is invalid"));
        }
        if rho_ss < 1e-3 {
            return Err(Error::Config("porous model: intrinsic density of solids RhoS0 is invalid"));
        }
        if gravity < 1e-3 {
            return Err(Error::Config("porous model: reference gravity constant is invalid"));
        }

        let mut klsat = [[0.0; 3]; 3];
        let mut kgsat = [[0.0; 3]; 3];
        klsat[0][0] = klx / gravity;
        klsat[1][1] = kly / gravity;
        klsat[2][2] = klz / gravity;
        kgsat[0][0] = kgx / gravity;
        kgsat[1][1] = kgy / gravity;
        kgsat[2][2] = kgz / gravity;

        Ok(Porous {
            nmax_it: params.get_or("NmaxIt", 20.0) as usize,
            itol: params.get_or("Itol", 1e-9),
            pc_zero: params.get_or("PcZero", 1e-10),
            me_trial: params.flag("MEtrial", true),
            show_r: params.flag("ShowR", false),
            all_be: params.flag("AllBE", false),
            ncns: params.flag("Ncns", false),
            ncns2: params.flag("Ncns2", false),
            nf0,
            rho_ss,
            klsat,
            kgsat,
            cnd,
            lrm,
            liq,
            gas,
        })
    }

    /// Returns a sample parameter list
    pub fn sample_params() -> Params {
        Params::new()
            .add("nf0", 0.3) // [-]
            .add("RhoS0", 2.7) // [Mg/m³]
            .add("kl", 1e-3) // [m/s]
            .add("kg", 1e-2) // [m/s]
    }

    /// Creates and initializes a new state for given pressures
    ///
    /// For pc = pg − pl > 0, non-rate models evaluate sl(pc) directly while
    /// rate-type models integrate the retention equation along a monotonic
    /// drying path from pc = 0.
    pub fn new_state(&self, rho_ll0: f64, rho_gg0: f64, pl0: f64, pg0: f64) -> Result<StatePorous, Error> {
        let sl0 = self.lrm.sl_max();
        let mut sl = sl0;
        let pc = pg0 - pl0;
        if pc > 0.0 {
            sl = match self.lrm.sl_direct(pc) {
                Some(value) => value,
                None => retention::update_path(&self.lrm, 0.0, sl0, pc, 100)?,
            };
        }
        Ok(StatePorous {
            ns0: 1.0 - self.nf0,
            sl,
            rho_ll: rho_ll0,
            rho_gg: rho_gg0,
            delta_pc: 0.0,
            wetting: false,
        })
    }

    /// Updates the state for given pressure increments
    ///
    /// pl and pg are the updated (new) values; the increments Δpl and Δpg
    /// lead from the previous equilibrium to them. The liquid saturation is
    /// updated implicitly and the invariants sl_min ≤ sl ≤ sl_max and
    /// pc ≤ 0 ⇒ sl = sl_max are enforced afterwards.
    pub fn update(&self, state: &mut StatePorous, dpl: f64, dpg: f64, pl: f64, pg: f64) -> Result<(), Error> {
        // auxiliary variables
        let sl_max = self.lrm.sl_max();
        let sl_min = self.lrm.sl_min();
        let dpc = dpg - dpl;
        let wet = dpc < 0.0;
        let pc0 = (pg - dpg) - (pl - dpl);
        let sl0 = state.sl;
        let pc = pc0 + dpc;
        let mut sl = sl0;

        // update liquid saturation
        if pc <= self.pc_zero {
            sl = sl_max; // saturated: capillary pressure is ineffective

        } else if self.lrm.is_nonrate() && !self.all_be {
            match self.lrm.sl_direct(pc) {
                Some(value) => sl = value,
                None => return Err(Error::Consistency("porous model: non-rate retention model must implement sl(pc)")),
            }
        } else {
            // trial saturation
            let fa = self.lrm.cc(pc0, sl0, wet)?;
            if self.me_trial {
                let sl_fe = sl0 + dpc * fa;
                let fb = self.lrm.cc(pc, sl_fe, wet)?;
                sl += 0.5 * dpc * (fa + fb);
            } else {
                sl += dpc * fa;
            }

            // fix trial out-of-range values
            sl = f64::max(sl_min, f64::min(sl_max, sl));

            // backward-Euler update
            let mut it = 0;
            while it < self.nmax_it {
                let f = self.lrm.cc(pc, sl, wet)?;
                let r = sl - sl0 - dpc * f;
                if self.show_r {
                    println!("it={:3} Cc={:18.14} sl={:18.14} r={:18.10e}", it, f, sl, r);
                }
                if f64::abs(r) < self.itol {
                    break;
                }
                let j = self.lrm.jj(pc, sl, wet)?;
                sl -= r / (1.0 - dpc * j);
                if f64::is_nan(sl) {
                    return Err(Error::Convergence("porous model: NaN detected in saturation update"));
                }
                it += 1;
            }
            if it == self.nmax_it {
                return Err(Error::Convergence("porous model: saturation update failed to converge"));
            }
        }

        // check results
        if pc < 0.0 && sl < sl_max {
            return Err(Error::Consistency(
                "porous model: saturation must equal sl_max when the capillary pressure is ineffective",
            ));
        }
        if sl < sl_min {
            return Err(Error::Consistency("porous model: saturation dropped below sl_min"));
        }
        if sl > sl_max {
            return Err(Error::Consistency("porous model: saturation exceeded sl_max"));
        }

        // set state
        state.sl = sl;
        state.rho_ll += self.liq.cc * dpl;
        state.rho_gg += self.gas.cc * dpg;
        state.delta_pc = dpc;
        state.wetting = wet;
        Ok(())
    }

    /// Computes Ccb = dsl/dpc consistent with the update method
    ///
    /// For states produced by the backward-Euler branch this is Eq (54) on
    /// page 618 of \[1\]; for states produced by the direct non-rate branch
    /// the exact slope is the raw Cc itself.
    pub fn ccb(&self, state: &StatePorous, pc: f64) -> Result<f64, Error> {
        let (sl, wet, dpc) = (state.sl, state.wetting, state.delta_pc);
        let f = self.lrm.cc(pc, sl, wet)?;
        if self.ncns {
            return Ok(f); // non-consistent
        }
        if self.lrm.is_nonrate() && !self.all_be {
            return Ok(f); // the update was sl = f(pc): the raw slope is exact
        }
        let l = self.lrm.ll(pc, sl, wet)?;
        let j = self.lrm.jj(pc, sl, wet)?;
        Ok((f + dpc * l) / (1.0 - dpc * j))
    }

    /// Computes Ccd = dCcb/dpc consistent with the update method
    ///
    /// See Eqs (55) and (56) on page 618 of \[1\]
    pub fn ccd(&self, state: &StatePorous, pc: f64) -> Result<f64, Error> {
        let (sl, wet, dpc) = (state.sl, state.wetting, state.delta_pc);
        if self.ncns || self.ncns2 {
            return self.lrm.ll(pc, sl, wet); // non-consistent
        }
        if self.lrm.is_nonrate() && !self.all_be {
            return self.lrm.ll(pc, sl, wet); // exact for the direct branch
        }
        let f = self.lrm.cc(pc, sl, wet)?;
        let d = self.lrm.derivs(pc, sl, wet)?;
        let ccb = (f + dpc * d.l) / (1.0 - dpc * d.j);
        let ly = d.jx; // mixed partials coincide
        let ll = d.lx + ly * ccb;
        let jj = d.jx + d.jy * ccb;
        Ok((2.0 * d.l + dpc * ll + (2.0 * d.j + dpc * jj) * ccb) / (1.0 - dpc * d.j))
    }

    /// Calculates the coefficient bundle for liquid-solid (u-pl) simulations
    ///
    /// The capillary pressure is pc = −pl (gas at atmospheric pressure)
    pub fn calc_ls(&self, res: &mut LsVars, state: &StatePorous, pl: f64, divus: f64, derivs: bool) -> Result<(), Error> {
        // auxiliary
        let ns0 = state.ns0;
        let sl = state.sl;
        let rho_ll = state.rho_ll;
        let cl = self.liq.cc;
        let rho_ss = self.rho_ss;

        // volume fractions; Eqs (13) and (28) of [1]
        let ns = (1.0 - divus) * ns0;
        let nf = 1.0 - ns;
        let nl = nf * sl;

        // densities; Eq (13) of [1]
        let rho_s = ns * rho_ss;
        res.rho_l = nl * rho_ll;
        res.rho = res.rho_l + rho_s;

        // capillary pressure and pore-fluid pressure; Eq (16) of [1]
        let pc = -pl;
        res.pp = pl * sl;

        // moduli; Eqs (32a,b) of [1]
        let ccb = self.ccb(state, pc)?;
        res.cpl = nf * (sl * cl - rho_ll * ccb);
        res.cvs = sl * rho_ll;

        // derivatives
        if derivs {
            let ccd = self.ccd(state, pc)?;

            // w.r.t. pl; Eqs (A.2), (A.4), (A.7), (A.9) and (A.11) of [1]
            res.drho_dpl = nf * (sl * cl - rho_ll * ccb);
            res.dp_dpl = sl + pc * ccb;
            res.dcpl_dpl = nf * (rho_ll * ccd - 2.0 * ccb * cl);
            res.dcvs_dpl = sl * cl - ccb * rho_ll;
            res.dklr_dpl = -self.cnd.dklr_dsl(sl) * ccb;

            // w.r.t. us (multipliers only); Eqs (A.3) and (A.10) of [1]
            res.drhol_dus_m = sl * rho_ll * ns0;
            res.drho_dus_m = (sl * rho_ll - rho_ss) * ns0;
            res.dcpl_dus_m = (sl * cl - rho_ll * ccb) * ns0;
        }
        Ok(())
    }

    /// Calculates the coefficient bundle for liquid-gas-solid (u-pl-pg) simulations
    pub fn calc_lgs(
        &self,
        res: &mut LgsVars,
        state: &StatePorous,
        pl: f64,
        pg: f64,
        divus: f64,
        derivs: bool,
    ) -> Result<(), Error> {
        // auxiliary
        let ns0 = state.ns0;
        let sl = state.sl;
        let sg = 1.0 - sl;
        let rho_ll = state.rho_ll;
        let rho_gg = state.rho_gg;
        let cl = self.liq.cc;
        let cg = self.gas.cc;
        let rho_ss = self.rho_ss;

        // volume fractions
        let ns = (1.0 - divus) * ns0;
        let nf = 1.0 - ns;
        let nl = nf * sl;
        let ng = nf * sg;

        // densities
        let rho_s = ns * rho_ss;
        res.rho_l = nl * rho_ll;
        res.rho_g = ng * rho_gg;
        res.rho = res.rho_l + res.rho_g + rho_s;

        // capillary pressure and pore-fluid pressure
        let pc = pg - pl;
        res.pp = pl * sl + pg * sg;

        // moduli
        let cc = self.ccb(state, pc)?;
        res.cpl = nf * (sl * cl - rho_ll * cc);
        res.cpg = nf * rho_ll * cc;
        res.cvs = sl * rho_ll;
        res.dpl = nf * rho_gg * cc;
        res.dpg = nf * (sg * cg - rho_gg * cc);
        res.dvs = sg * rho_gg;

        // derivatives
        if derivs {
            let ccd = self.ccd(state, pc)?;

            // conductivity multipliers
            let dklr_dsl = self.cnd.dklr_dsl(sl);
            let dkgr_dsg = self.cnd.dkgr_dsg(sg);
            res.dklr_dpl = -dklr_dsl * cc;
            res.dklr_dpg = dklr_dsl * cc;
            res.dkgr_dpl = dkgr_dsg * cc;
            res.dkgr_dpg = -dkgr_dsg * cc;

            // partial densities
            res.drhol_dus_m = sl * rho_ll * ns0;
            res.drhog_dus_m = sg * rho_gg * ns0;

            // mixture density
            res.drho_dpl = nf * (sl * cl - rho_ll * cc + rho_gg * cc);
            res.drho_dpg = nf * (sg * cg - rho_gg * cc + rho_ll * cc);
            res.drho_dus_m = (sl * rho_ll + sg * rho_gg - rho_ss) * ns0;

            // pressure in pores
            res.dp_dpl = sl + pc * cc;
            res.dp_dpg = sg - pc * cc;

            // derivatives of the C coefficients
            res.dcpl_dpl = nf * (rho_ll * ccd - 2.0 * cc * cl);
            res.dcpl_dpg = nf * (cc * cl - rho_ll * ccd);
            res.dcpg_dpl = nf * (cl * cc - rho_ll * ccd);
            res.dcpg_dpg = nf * rho_ll * ccd;
            res.dcvs_dpl = sl * cl - cc * rho_ll;
            res.dcvs_dpg = cc * rho_ll;

            // derivatives of the D coefficients
            res.ddpl_dpl = -nf * rho_gg * ccd;
            res.ddpl_dpg = nf * (rho_gg * ccd + cg * cc);
            res.ddpg_dpl = nf * (cc * cg + rho_gg * ccd);
            res.ddpg_dpg = -nf * (rho_gg * ccd + 2.0 * cg * cc);
            res.ddvs_dpl = cc * rho_gg;
            res.ddvs_dpg = sg * cg - cc * rho_gg;

            // w.r.t. us (multipliers only)
            res.dcpl_dus_m = (sl * cl - rho_ll * cc) * ns0;
            res.dcpg_dus_m = rho_ll * cc * ns0;
            res.ddpl_dus_m = rho_gg * cc * ns0;
            res.ddpg_dus_m = (sg * cg - rho_gg * cc) * ns0;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
