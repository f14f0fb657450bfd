//! Scalar auxiliary functions for seepage-face residuals

/// Returns the Macaulay brackets (ramp) of x
pub fn ramp(x: f64) -> f64 {
    if x < 0.0 {
        0.0
    } else {
        x
    }
}

/// Returns the Heaviside step function (derivative of ramp)
pub fn heaviside(x: f64) -> f64 {
    if x < 0.0 {
        0.0
    } else {
        1.0
    }
}

/// Returns the smooth ramp function
///
/// ```text
/// sramp(x) = x + ln(1 + exp(-β x)) / β
/// ```
///
/// For large β, sramp approaches the Macaulay brackets while keeping a
/// continuous derivative at the origin. The exponential is guarded against
/// overflow for very negative β·x.
pub fn sramp(x: f64, beta: f64) -> f64 {
    if -beta * x > 500.0 {
        return 0.0;
    }
    x + f64::ln(1.0 + f64::exp(-beta * x)) / beta
}

/// Returns the first derivative of the smooth ramp function
pub fn sramp_d1(x: f64, beta: f64) -> f64 {
    if -beta * x > 500.0 {
        return 0.0;
    }
    1.0 / (1.0 + f64::exp(-beta * x))
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{heaviside, ramp, sramp, sramp_d1};
    use russell_lab::{approx_eq, deriv1_central5};

    #[test]
    fn ramp_and_heaviside_work() {
        assert_eq!(ramp(-1.5), 0.0);
        assert_eq!(ramp(0.0), 0.0);
        assert_eq!(ramp(2.5), 2.5);
        assert_eq!(heaviside(-1.5), 0.0);
        assert_eq!(heaviside(2.5), 1.0);
    }

    #[test]
    fn sramp_approaches_ramp_for_large_beta() {
        let beta = f64::ln(2.0) / 0.01;
        approx_eq(sramp(-2.0, beta), 0.0, 1e-14);
        approx_eq(sramp(2.0, beta), 2.0, 1e-10);
        approx_eq(sramp(0.0, beta), f64::ln(2.0) / beta, 1e-15);
        // overflow guard
        assert_eq!(sramp(-100.0, 100.0), 0.0);
        assert_eq!(sramp_d1(-100.0, 100.0), 0.0);
    }

    #[test]
    fn sramp_d1_matches_numerical_derivative() {
        let beta = 2.0;
        for x in [-1.5, -0.1, 0.0, 0.1, 1.5] {
            let ana = sramp_d1(x, beta);
            let num = deriv1_central5(x, &mut 0, |y, _: &mut i32| Ok(sramp(y, beta))).unwrap();
            approx_eq(ana, num, 1e-9);
        }
    }
}
