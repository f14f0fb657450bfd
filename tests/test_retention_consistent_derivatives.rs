use russell_lab::approx_eq;
use tpmfem::base::{Error, ParamConductivity, ParamFluids, ParamLiquidRetention, Params};
use tpmfem::models::{Conductivity, Fluid, LiquidRetention, Porous, StatePorous};

fn porous_model(lrm: &ParamLiquidRetention, params: &Params) -> Result<Porous, Error> {
    let gravity = 10.0;
    let fluids = ParamFluids::sample_water_and_air();
    let gas_param = fluids.density_gas.unwrap();
    let liq = Fluid::new(&fluids.density_liquid, false, 10.0, gravity)?;
    let gas = Fluid::new(&gas_param, true, 10.0, gravity)?;
    Porous::new(
        params,
        Conductivity::new(&ParamConductivity::sample_power_law())?,
        LiquidRetention::new(lrm)?,
        liq,
        gas,
        gravity,
    )
}

/// Checks ccb and ccd at the end of a single step pc0 -> pc0 + dpc, by
/// re-running the update from the same pre-step state with a perturbed
/// target pressure (central differences).
fn check_level(mdl: &Porous, state0: &StatePorous, pc0: f64, dpc: f64) -> Result<(), Error> {
    let pc = pc0 + dpc;
    let mut state = state0.clone();
    mdl.update(&mut state, -dpc, 0.0, -pc, 0.0)?;

    let sl_after = |pc_new: f64| -> Result<f64, Error> {
        let mut s = state0.clone();
        mdl.update(&mut s, -(pc_new - pc0), 0.0, -pc_new, 0.0)?;
        Ok(s.sl)
    };
    let ccb_after = |pc_new: f64| -> Result<f64, Error> {
        let mut s = state0.clone();
        mdl.update(&mut s, -(pc_new - pc0), 0.0, -pc_new, 0.0)?;
        mdl.ccb(&s, pc_new)
    };

    // first derivative
    let h = 1e-4;
    let ccb = mdl.ccb(&state, pc)?;
    let fd1 = (sl_after(pc + h)? - sl_after(pc - h)?) / (2.0 * h);
    approx_eq(ccb, fd1, 1e-6);

    // second derivative
    let ccd = mdl.ccd(&state, pc)?;
    let fd2 = (ccb_after(pc + h)? - ccb_after(pc - h)?) / (2.0 * h);
    approx_eq(ccd, fd2, 1e-5);
    Ok(())
}

#[test]
fn ccb_and_ccd_match_finite_differences() -> Result<(), Error> {
    // Verifies the consistency of ccb and ccd with the backward-Euler
    // saturation update at three pressure levels: saturated (pc < 0),
    // moderately unsaturated and deep into the unsaturated range.

    // rate-type hysteretic retention model with a tight local tolerance
    let params = Porous::sample_params().add("Itol", 1e-12);
    let mdl = porous_model(&ParamLiquidRetention::sample_pedroso_williams(), &params)?;

    // saturated level: the capillary pressure is ineffective and all
    // derivatives vanish identically
    let state_sat = mdl.new_state(1.0, 0.0012, 1.0, 0.0)?;
    let mut state = state_sat.clone();
    mdl.update(&mut state, -0.5, 0.0, 0.5, 0.0)?; // pc: -1 -> -0.5
    assert_eq!(state.sl, mdl.lrm.sl_max());
    assert_eq!(mdl.ccb(&state, -0.5)?, 0.0);
    assert_eq!(mdl.ccd(&state, -0.5)?, 0.0);

    // drive the state along a drying path (pg stays at zero), checking the
    // consistent derivatives at two checkpoints
    let mut state0 = mdl.new_state(1.0, 0.0012, 0.0, 0.0)?;
    let nsteps = 80;
    let dpl = -8.0 / (nsteps as f64);
    let mut pl = 0.0;
    for i in 0..nsteps {
        pl += dpl;
        mdl.update(&mut state0, dpl, 0.0, pl, 0.0)?;
        if i + 1 == 30 || i + 1 == nsteps {
            // pc approximately 3 and 8
            assert!(state0.sl < 1.0);
            check_level(&mdl, &state0, -pl, 0.5)?;
        }
    }
    Ok(())
}

#[test]
fn ccb_is_exact_for_nonrate_models() -> Result<(), Error> {
    // For non-rate models the update is sl = f(pc) and ccb must equal the
    // slope of the retention curve itself.
    let params = Porous::sample_params();
    let mdl = porous_model(&ParamLiquidRetention::sample_brooks_corey(), &params)?;

    let mut state = mdl.new_state(1.0, 0.0012, -5.0, 0.0)?;
    mdl.update(&mut state, -1.0, 0.0, -6.0, 0.0)?;
    let pc = 6.0;

    let sl_direct = |pc_new: f64| mdl.lrm.sl_direct(pc_new).unwrap();
    assert_eq!(state.sl, sl_direct(pc));

    let h = 1e-6;
    let ccb = mdl.ccb(&state, pc)?;
    let fd = (sl_direct(pc + h) - sl_direct(pc - h)) / (2.0 * h);
    approx_eq(ccb, fd, 1e-9);
    Ok(())
}
