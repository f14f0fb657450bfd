use super::{LiquidRetentionTrait, RetentionDerivs};
use crate::base::{Error, ParamLiquidRetention};

/// Tolerance for saturation values slightly outside \[y_r, y_0\]
const SL_OUT_TOL: f64 = 1e-8;

/// Implements the Pedroso-Williams rate-type hysteretic retention model
///
/// The rate coefficient reads
///
/// ```text
/// Cc(pc, sl, wetting) = −λ̄(x, y) / (1 + pc)
/// ```
///
/// with x = ln(1 + pc), y = sl, and λ̄ the distance-scaled slope
///
/// ```text
/// drying:   λ̄ = λd·(1 − exp(−βd·(y − y_r)))·exp(−β̄2·Dd)
/// wetting:  λ̄ = λw·(1 − exp(−βw·(y_0 − y)))·exp(−β1·Dw)
/// ```
///
/// where Dd and Dw measure the distance of (x, y) to the main drying and
/// wetting curves yd(x) and yw(x), and β̄2 = β2·√y. The model also provides
/// the full second-derivative set of Cc required by the consistent
/// linearization of the implicit saturation update. See reference \[1\] in
/// the crate documentation.
pub struct RetentionPedrosoWilliams {
    with_hysteresis: bool,
    lambda_d: f64,
    lambda_w: f64,
    beta_d: f64,
    beta_w: f64,
    beta_1: f64,
    beta_2: f64,
    y_0: f64,
    y_r: f64,
    c1_d: f64,
    c2_d: f64,
    c3_d: f64,
    c1_w: f64,
    c2_w: f64,
    c3_w: f64,
}

/// Holds λ̄ and its partial derivatives with respect to x and y
#[derive(Clone, Copy, Debug, Default)]
struct BarLambda {
    f: f64,
    fx: f64,
    fy: f64,
    fxx: f64,
    fxy: f64,
    fyy: f64,
}

impl RetentionPedrosoWilliams {
    /// Allocates a new Pedroso-Williams retention model
    pub fn new(param: &ParamLiquidRetention) -> Result<Self, Error> {
        match param {
            &ParamLiquidRetention::PedrosoWilliams {
                with_hysteresis,
                lambda_d,
                lambda_w,
                beta_d,
                beta_w,
                beta_1,
                beta_2,
                x_rd,
                x_rw,
                y_0,
                y_r,
            } => {
                if lambda_d <= 0.0 || lambda_w <= 0.0 {
                    return Err(Error::Config("pedroso-williams: lambda_d and lambda_w must be positive"));
                }
                if beta_d <= 0.0 || beta_w <= 0.0 || beta_1 <= 0.0 || beta_2 <= 0.0 {
                    return Err(Error::Config("pedroso-williams: all beta coefficients must be positive"));
                }
                if y_r <= 0.0 || y_r >= y_0 || y_0 > 1.0 {
                    return Err(Error::Config("pedroso-williams: limits must satisfy 0 < y_r < y_0 ≤ 1"));
                }
                let c1_d = beta_d * lambda_d;
                let c2_d = f64::exp(beta_d * y_r);
                let c3_d = f64::exp(beta_d * (y_0 + lambda_d * x_rd)) - c2_d * f64::exp(c1_d * x_rd);
                let c1_w = -beta_w * lambda_w;
                let c2_w = f64::exp(-beta_w * y_0);
                let c3_w = f64::exp(-beta_w * lambda_w * x_rw) - c2_w * f64::exp(c1_w * x_rw);
                Ok(RetentionPedrosoWilliams {
                    with_hysteresis,
                    lambda_d,
                    lambda_w,
                    beta_d,
                    beta_w,
                    beta_1,
                    beta_2,
                    y_0,
                    y_r,
                    c1_d,
                    c2_d,
                    c3_d,
                    c1_w,
                    c2_w,
                    c3_w,
                })
            }
            _ => Err(Error::Config("pedroso-williams: parameters do not match the model")),
        }
    }

    /// Computes λ̄ and its partial derivatives at (x, y)
    ///
    /// The distance terms are `max(⋅, 0)`; on the clamped side the one-sided
    /// derivatives of the distances vanish.
    fn bar_lambda(&self, x: f64, y: f64, wetting: bool) -> Result<BarLambda, Error> {
        if y < self.y_r - SL_OUT_TOL {
            return Err(Error::Convergence("pedroso-williams: saturation is below the residual value"));
        }
        if y > self.y_0 + SL_OUT_TOL {
            return Err(Error::Convergence("pedroso-williams: saturation is above the maximum value"));
        }
        let (a, ay, ayy, dd, dx, dxx, dy, b, by, byy);
        if wetting && self.with_hysteresis {
            // amplitude from the distance to sl_max
            let dw = f64::max(self.y_0 - y, 0.0);
            let sa = if dw > 0.0 { 1.0 } else { 0.0 };
            a = (1.0 - f64::exp(-self.beta_w * dw)) * self.lambda_w;
            ay = -self.beta_w * (self.lambda_w - a) * sa;
            ayy = self.beta_w * ay;
            // main wetting curve yw(x) and distance to it
            let w = self.c3_w + self.c2_w * f64::exp(self.c1_w * x);
            let wp = self.c1_w * self.c2_w * f64::exp(self.c1_w * x);
            let ywp = -self.lambda_w - wp / (self.beta_w * w);
            let ywpp = -wp * (self.c1_w * w - wp) / (self.beta_w * w * w);
            let yw = -self.lambda_w * x - f64::ln(w) / self.beta_w;
            dd = f64::max(y - yw, 0.0);
            let s = if dd > 0.0 { 1.0 } else { 0.0 };
            dx = -s * ywp;
            dxx = -s * ywpp;
            dy = s;
            b = self.beta_1;
            by = 0.0;
            byy = 0.0;
        } else {
            // amplitude from the distance to sl_min
            let dr = f64::max(y - self.y_r, 0.0);
            let sa = if dr > 0.0 { 1.0 } else { 0.0 };
            a = (1.0 - f64::exp(-self.beta_d * dr)) * self.lambda_d;
            ay = self.beta_d * (self.lambda_d - a) * sa;
            ayy = -self.beta_d * ay;
            // main drying curve yd(x) and distance to it
            let w = self.c3_d + self.c2_d * f64::exp(self.c1_d * x);
            let wp = self.c1_d * self.c2_d * f64::exp(self.c1_d * x);
            let ydp = -self.lambda_d + wp / (self.beta_d * w);
            let ydpp = wp * (self.c1_d * w - wp) / (self.beta_d * w * w);
            let yd = -self.lambda_d * x + f64::ln(w) / self.beta_d;
            dd = f64::max(yd - y, 0.0);
            let s = if dd > 0.0 { 1.0 } else { 0.0 };
            dx = s * ydp;
            dxx = s * ydpp;
            dy = -s;
            if y > 0.0 {
                let sq = f64::sqrt(y);
                b = self.beta_2 * sq;
                by = 0.5 * self.beta_2 / sq;
                byy = -0.25 * self.beta_2 / (y * sq);
            } else {
                b = 0.0;
                by = 0.0;
                byy = 0.0;
            }
        }
        let e = f64::exp(-b * dd);
        let f = a * e;
        let p = ay - a * (by * dd + b * dy);
        let py = ayy - ay * (by * dd + b * dy) - a * (byy * dd + 2.0 * by * dy);
        Ok(BarLambda {
            f,
            fx: -f * b * dx,
            fy: e * p,
            fxx: f * b * (b * dx * dx - dxx),
            fxy: -dx * (e * p * b + f * by),
            fyy: e * (-(by * dd + b * dy) * p + py),
        })
    }
}

impl LiquidRetentionTrait for RetentionPedrosoWilliams {
    fn sl_min(&self) -> f64 {
        self.y_r
    }

    fn sl_max(&self) -> f64 {
        self.y_0
    }

    fn cc(&self, pc: f64, sl: f64, wetting: bool) -> Result<f64, Error> {
        if pc <= 0.0 {
            return Ok(0.0);
        }
        let bar = self.bar_lambda(f64::ln(1.0 + pc), sl, wetting)?;
        Ok(-bar.f / (1.0 + pc))
    }

    fn ll(&self, pc: f64, sl: f64, wetting: bool) -> Result<f64, Error> {
        if pc <= 0.0 {
            return Ok(0.0);
        }
        let e = 1.0 / (1.0 + pc);
        let bar = self.bar_lambda(f64::ln(1.0 + pc), sl, wetting)?;
        Ok(e * e * (bar.f - bar.fx))
    }

    fn jj(&self, pc: f64, sl: f64, wetting: bool) -> Result<f64, Error> {
        if pc <= 0.0 {
            return Ok(0.0);
        }
        let e = 1.0 / (1.0 + pc);
        let bar = self.bar_lambda(f64::ln(1.0 + pc), sl, wetting)?;
        Ok(-bar.fy * e)
    }

    fn derivs(&self, pc: f64, sl: f64, wetting: bool) -> Result<RetentionDerivs, Error> {
        if pc <= 0.0 {
            return Ok(RetentionDerivs::default());
        }
        let e = 1.0 / (1.0 + pc);
        let bar = self.bar_lambda(f64::ln(1.0 + pc), sl, wetting)?;
        Ok(RetentionDerivs {
            l: e * e * (bar.f - bar.fx),
            lx: e * e * e * (3.0 * bar.fx - bar.fxx - 2.0 * bar.f),
            j: -bar.fy * e,
            jx: e * e * (bar.fy - bar.fxy),
            jy: -bar.fyy * e,
        })
    }

    fn sl_direct(&self, _pc: f64) -> Option<f64> {
        None
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::RetentionPedrosoWilliams;
    use crate::base::ParamLiquidRetention;
    use crate::models::retention::LiquidRetentionTrait;
    use russell_lab::{approx_eq, deriv1_central5};

    fn sample() -> RetentionPedrosoWilliams {
        RetentionPedrosoWilliams::new(&ParamLiquidRetention::sample_pedroso_williams()).unwrap()
    }

    #[test]
    fn new_captures_errors() {
        let mut param = ParamLiquidRetention::sample_pedroso_williams();
        if let ParamLiquidRetention::PedrosoWilliams { ref mut y_r, .. } = param {
            *y_r = 0.0;
        }
        assert!(RetentionPedrosoWilliams::new(&param).is_err());
        assert!(RetentionPedrosoWilliams::new(&ParamLiquidRetention::sample_brooks_corey()).is_err());
    }

    #[test]
    fn cc_is_zero_for_negative_pc_and_negative_otherwise() {
        let mdl = sample();
        assert_eq!(mdl.cc(-1.0, 0.8, false).unwrap(), 0.0);
        assert_eq!(mdl.cc(0.0, 0.8, false).unwrap(), 0.0);
        assert!(mdl.cc(5.0, 0.5, false).unwrap() < 0.0);
        assert!(mdl.cc(5.0, 0.5, true).unwrap() < 0.0);
    }

    #[test]
    fn saturation_out_of_range_is_an_error() {
        let mdl = sample();
        assert!(mdl.cc(5.0, 0.001, false).is_err());
        assert!(mdl.cc(5.0, 1.1, false).is_err());
    }

    #[test]
    fn first_derivatives_match_numerical() {
        let mdl = sample();
        let cases = [(2.0, 0.8, false), (5.0, 0.5, false), (10.0, 0.3, false), (2.0, 0.5, true), (8.0, 0.2, true)];
        for &(pc, sl, wet) in &cases {
            let l_ana = mdl.ll(pc, sl, wet).unwrap();
            let l_num = deriv1_central5(pc, &mut 0, |x, _: &mut i32| mdl.cc(x, sl, wet).map_err(|e| e.msg())).unwrap();
            approx_eq(l_ana, l_num, 1e-8);
            let j_ana = mdl.jj(pc, sl, wet).unwrap();
            let j_num = deriv1_central5(sl, &mut 0, |y, _: &mut i32| mdl.cc(pc, y, wet).map_err(|e| e.msg())).unwrap();
            approx_eq(j_ana, j_num, 1e-8);
        }
    }

    #[test]
    fn second_derivatives_match_numerical() {
        let mdl = sample();
        let cases = [(2.0, 0.8, false), (5.0, 0.5, false), (3.0, 0.7, true), (6.0, 0.4, true)];
        for &(pc, sl, wet) in &cases {
            let d = mdl.derivs(pc, sl, wet).unwrap();
            let lx_num = deriv1_central5(pc, &mut 0, |x, _: &mut i32| mdl.ll(x, sl, wet).map_err(|e| e.msg())).unwrap();
            approx_eq(d.lx, lx_num, 1e-6);
            let jx_num = deriv1_central5(pc, &mut 0, |x, _: &mut i32| mdl.jj(x, sl, wet).map_err(|e| e.msg())).unwrap();
            approx_eq(d.jx, jx_num, 1e-6);
            // mixed partials must agree: ∂L/∂sl = ∂J/∂pc
            let jx_num2 = deriv1_central5(sl, &mut 0, |y, _: &mut i32| mdl.ll(pc, y, wet).map_err(|e| e.msg())).unwrap();
            approx_eq(d.jx, jx_num2, 1e-6);
            let jy_num = deriv1_central5(sl, &mut 0, |y, _: &mut i32| mdl.jj(pc, y, wet).map_err(|e| e.msg())).unwrap();
            approx_eq(d.jy, jy_num, 1e-6);
        }
    }
}
