use russell_lab::{approx_eq, Vector};
use tpmfem::base::{Error, ParamConductivity, ParamFluids, ParamLiquidRetention};
use tpmfem::fem::{BcKey, DynCoefs, Element, Interp, IpsMap, LiquidGas, NaturalBc, Solution, SparseTriplet};
use tpmfem::models::{Conductivity, Fluid, LiquidRetention, Porous};

fn porous_model() -> Result<Porous, Error> {
    let gravity = 10.0;
    let fluids = ParamFluids::sample_water_and_air();
    let gas_param = fluids.density_gas.unwrap();
    let liq = Fluid::new(&fluids.density_liquid, false, 10.0, gravity)?;
    let gas = Fluid::new(&gas_param, true, 10.0, gravity)?;
    Porous::new(
        &Porous::sample_params(),
        Conductivity::new(&ParamConductivity::sample_power_law())?,
        LiquidRetention::new(&ParamLiquidRetention::sample_brooks_corey())?,
        liq,
        gas,
        gravity,
    )
}

#[test]
fn jacobian_matches_finite_differences() -> Result<(), Error> {
    // Compares the four consistent Jacobian blocks (ll, lg, gl, gg) of a
    // transient liquid-gas element with central finite differences of the
    // residual. Both pressure fields are nonzero so the cross blocks do not
    // vanish, and pc = pg - pl stays in the smooth unsaturated range.
    let mdl = porous_model()?;
    let xx = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
    let mut ele = LiquidGas::new(&mdl, Interp::qua4(&xx)?, Vec::new())?;
    let eqs: Vec<Vec<usize>> = (0..4).map(|m| vec![2 * m, 2 * m + 1]).collect();
    ele.set_eqs(&eqs)?;
    ele.set_ele_conds("g", |_| 10.0)?;

    let ny = 8;
    let mut sol = Solution::new(ny, false);
    sol.dt = 0.1;
    sol.dyn_cfs = DynCoefs::transient(sol.dt, 0.5, 0.5, 0.5)?;
    let mut y0 = [0.0; 8];
    for m in 0..4 {
        y0[2 * m] = -5.0 - (m as f64); // pl
        y0[2 * m + 1] = 1.0 - 0.2 * (m as f64); // pg; pc in (6, 8.4)
    }
    for i in 0..ny {
        sol.y[i] = y0[i];
    }
    ele.set_ini_ivs(&sol, None)?;
    ele.interp_star_vars(&sol)?;

    // consistent Jacobian at the base point
    ele.update(&sol)?;
    let mut kb = SparseTriplet::new(ny, ny);
    ele.add_to_kb(&mut kb, &sol, false)?;
    let kk = kb.as_dense();

    // K = dR/dy = -dfb/dy
    let h = 1e-6;
    let mut fb_p = Vector::new(ny);
    let mut fb_m = Vector::new(ny);
    for j in 0..ny {
        for (sign, fb) in [(1.0, &mut fb_p), (-1.0, &mut fb_m)] {
            ele.restore_ivs(false);
            sol.y[j] = y0[j] + sign * h;
            sol.dy[j] = sign * h;
            ele.update(&sol)?;
            fb.fill(0.0);
            ele.add_to_rhs(fb, &sol)?;
            sol.y[j] = y0[j];
            sol.dy[j] = 0.0;
        }
        for i in 0..ny {
            let fd = -(fb_p[i] - fb_m[i]) / (2.0 * h);
            let diff = f64::abs(kk.get(i, j) - fd);
            assert!(
                diff < 1e-6 * (1.0 + f64::abs(fd)),
                "K[{}][{}] = {:e} does not match fd = {:e}",
                i,
                j,
                kk.get(i, j),
                fd
            );
        }
    }
    Ok(())
}

#[test]
fn seepage_jacobian_matches_finite_differences() -> Result<(), Error> {
    // Checks the Jacobian blocks involving the seepage unknowns fl (klf, kfl,
    // kff) and the extrapolated-density term added to kll. The top edge of a
    // qua4 element carries the seepage condition; the liquid pressures are
    // positive (saturated) so that the ramp function operates in its active,
    // smooth range.
    let mdl = porous_model()?;
    let xx = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
    let nat_bcs = vec![NaturalBc {
        key: BcKey::Seep,
        face: 2, // top edge, vertices 2 and 3
        fcn: |_| 0.0,
    }];
    let mut ele = LiquidGas::new(&mdl, Interp::qua4(&xx)?, nat_bcs)?;
    assert!(ele.has_seep);
    assert_eq!(ele.nf, 2);

    // pl and pg equations per vertex; vertices 2 and 3 get an fl equation
    let eqs = vec![vec![0, 1], vec![2, 3], vec![4, 5, 8], vec![6, 7, 9]];
    ele.set_eqs(&eqs)?;
    ele.set_ele_conds("g", |_| 10.0)?;

    let ny = 10;
    let mut sol = Solution::new(ny, false);
    sol.dt = 0.1;
    sol.dyn_cfs = DynCoefs::transient(sol.dt, 0.5, 0.5, 0.5)?;
    let y0 = [2.0, 0.2, 3.0, 0.2, 1.0, 0.1, 0.5, 0.1, 0.3, 0.2]; // pl,pg pairs, then fl
    for i in 0..ny {
        sol.y[i] = y0[i];
    }
    ele.set_ini_ivs(&sol, None)?;
    ele.interp_star_vars(&sol)?;

    // consistent Jacobian at the base point
    ele.update(&sol)?;
    let mut kb = SparseTriplet::new(ny, ny);
    ele.add_to_kb(&mut kb, &sol, false)?;
    let kk = kb.as_dense();

    // K = dR/dy = -dfb/dy
    let h = 1e-6;
    let mut fb_p = Vector::new(ny);
    let mut fb_m = Vector::new(ny);
    for j in 0..ny {
        for (sign, fb) in [(1.0, &mut fb_p), (-1.0, &mut fb_m)] {
            ele.restore_ivs(false);
            sol.y[j] = y0[j] + sign * h;
            sol.dy[j] = sign * h;
            ele.update(&sol)?;
            fb.fill(0.0);
            ele.add_to_rhs(fb, &sol)?;
            sol.y[j] = y0[j];
            sol.dy[j] = 0.0;
        }
        for i in 0..ny {
            let fd = -(fb_p[i] - fb_m[i]) / (2.0 * h);
            let diff = f64::abs(kk.get(i, j) - fd);
            assert!(
                diff < 1e-6 * (1.0 + f64::abs(fd)),
                "K[{}][{}] = {:e} does not match fd = {:e}",
                i,
                j,
                kk.get(i, j),
                fd
            );
        }
    }
    Ok(())
}

#[test]
fn ip_output_includes_capillary_pressure_and_gas_density() -> Result<(), Error> {
    // uniform pressure fields: pc = pg - pl at every ip and RhoG equals the
    // reference gas density set by the initialization (no gravity)
    let mdl = porous_model()?;
    let xx = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
    let mut ele = LiquidGas::new(&mdl, Interp::qua4(&xx)?, Vec::new())?;
    let eqs: Vec<Vec<usize>> = (0..4).map(|m| vec![2 * m, 2 * m + 1]).collect();
    ele.set_eqs(&eqs)?;

    let mut sol = Solution::new(8, true);
    for m in 0..4 {
        sol.y[2 * m] = -5.0; // pl
        sol.y[2 * m + 1] = 1.0; // pg
    }
    ele.set_ini_ivs(&sol, None)?;

    let keys = ele.out_ip_keys();
    assert!(keys.contains(&"pc".to_string()));
    assert!(keys.contains(&"RhoG".to_string()));

    let mut map = IpsMap::new();
    ele.out_ip_vals(&mut map, &sol)?;
    for value in map.get("pc").unwrap() {
        approx_eq(*value, 6.0, 1e-14);
    }
    for value in map.get("RhoG").unwrap() {
        approx_eq(*value, mdl.gas.rho_ref, 1e-15);
    }
    Ok(())
}
