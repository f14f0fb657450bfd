use russell_lab::Vector;
use tpmfem::base::{Error, ParamConductivity, ParamFluids, ParamLiquidRetention};
use tpmfem::fem::{BcKey, DynCoefs, Element, Interp, Liquid, NaturalBc, Solution, SparseTriplet};
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
fn seepage_jacobian_matches_finite_differences() -> Result<(), Error> {
    // Checks the Jacobian blocks involving the seepage unknowns fl (kpf, kfp,
    // kff) and the extrapolated-density term added to kpp. The top edge of a
    // qua4 element carries the seepage condition; the pressures are positive
    // so that the ramp function operates in its active, smooth range.
    let mdl = porous_model()?;
    let xx = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
    let nat_bcs = vec![NaturalBc {
        key: BcKey::Seep,
        face: 2, // top edge, vertices 2 and 3
        fcn: |_| 0.0,
    }];
    let mut ele = Liquid::new(&mdl, Interp::qua4(&xx)?, nat_bcs)?;
    assert!(ele.has_seep);
    assert_eq!(ele.nf, 2);

    // one pl equation per vertex; vertices 2 and 3 get an fl equation
    let eqs = vec![vec![0], vec![1], vec![2, 4], vec![3, 5]];
    ele.set_eqs(&eqs)?;
    ele.set_ele_conds("g", |_| 10.0)?;

    let ny = 6;
    let mut sol = Solution::new(ny, false);
    sol.dt = 0.1;
    sol.dyn_cfs = DynCoefs::transient(sol.dt, 0.5, 0.5, 0.5)?;
    let y0 = [2.0, 3.0, 1.0, 0.5, 0.3, 0.2]; // pl at vertices, then fl
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
