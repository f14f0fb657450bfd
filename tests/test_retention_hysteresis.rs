use tpmfem::base::{Error, ParamConductivity, ParamFluids, ParamLiquidRetention};
use tpmfem::models::{Conductivity, Fluid, LiquidRetention, Porous};

fn porous_model(lrm: &ParamLiquidRetention) -> Result<Porous, Error> {
    let gravity = 10.0;
    let fluids = ParamFluids::sample_water_and_air();
    let gas_param = fluids.density_gas.unwrap();
    let liq = Fluid::new(&fluids.density_liquid, false, 10.0, gravity)?;
    let gas = Fluid::new(&gas_param, true, 10.0, gravity)?;
    Porous::new(
        &Porous::sample_params(),
        Conductivity::new(&ParamConductivity::sample_power_law())?,
        LiquidRetention::new(lrm)?,
        liq,
        gas,
        gravity,
    )
}

#[test]
fn drying_wetting_loop_shows_hysteresis() -> Result<(), Error> {
    let mdl = porous_model(&ParamLiquidRetention::sample_pedroso_williams())?;
    let sl_max = mdl.lrm.sl_max();
    let sl_min = mdl.lrm.sl_min();

    // drying path: pc from 0 to 10 (pl from 0 to -10, pg at zero)
    let mut state = mdl.new_state(1.0, 0.0012, 0.0, 0.0)?;
    assert_eq!(state.sl, sl_max);
    let n = 100;
    let dpl = -10.0 / (n as f64);
    let mut pl = 0.0;
    let mut sl_prev = state.sl;
    let mut sl_drying_at_5 = 0.0;
    for i in 0..n {
        pl += dpl;
        mdl.update(&mut state, dpl, 0.0, pl, 0.0)?;
        assert!(!state.wetting);
        assert!(state.sl <= sl_prev);
        assert!(state.sl >= sl_min);
        sl_prev = state.sl;
        if 2 * (i + 1) == n {
            sl_drying_at_5 = state.sl; // sl on the drying curve at pc = 5
        }
    }
    let sl_at_10 = state.sl;
    assert!(sl_at_10 < sl_drying_at_5);

    // wetting path: pc back from 10 to 5
    let m = 50;
    let dpl_w = 5.0 / (m as f64);
    for _ in 0..m {
        pl += dpl_w;
        mdl.update(&mut state, dpl_w, 0.0, pl, 0.0)?;
        assert!(state.wetting);
        assert!(state.sl >= sl_prev);
        sl_prev = state.sl;
    }

    // the wetting curve lies below the drying curve at the same pc
    assert!(state.sl > sl_at_10);
    assert!(state.sl < sl_drying_at_5);

    // wetting all the way back to pc = 0 recovers full saturation
    for _ in 0..m {
        pl += dpl_w;
        mdl.update(&mut state, dpl_w, 0.0, pl, 0.0)?;
    }
    assert_eq!(state.sl, sl_max);
    Ok(())
}

#[test]
fn nonrate_update_is_path_independent() -> Result<(), Error> {
    // Brooks-Corey has no hysteresis: any sequence of increments lands on
    // the primary curve sl(pc).
    let mdl = porous_model(&ParamLiquidRetention::sample_brooks_corey())?;
    let mut state = mdl.new_state(1.0, 0.0012, -5.0, 0.0)?;
    assert_eq!(state.sl, mdl.lrm.sl_direct(5.0).unwrap());

    mdl.update(&mut state, -2.0, 0.0, -7.0, 0.0)?;
    assert_eq!(state.sl, mdl.lrm.sl_direct(7.0).unwrap());

    mdl.update(&mut state, 3.0, 0.0, -4.0, 0.0)?;
    assert_eq!(state.sl, mdl.lrm.sl_direct(4.0).unwrap());
    Ok(())
}
