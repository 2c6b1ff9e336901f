use approx::assert_relative_eq;
use real_expressions::{Bindings, Decimal, Real, evaluate};

pub const FD_STEP: f64 = 1e-6;
pub const FD_TOL: f64 = 1e-4;

#[allow(dead_code)]
pub fn param() -> Real {
    Real::parameter(Real::zero())
}

#[allow(dead_code)]
pub fn dec(v: f64) -> Decimal {
    Decimal::from_f64(v).expect("finite test value")
}

#[allow(dead_code)]
pub fn bind_all(vars: &[Real], values: &[f64]) -> Bindings {
    assert_eq!(vars.len(), values.len());
    let mut bindings = Bindings::new();
    for (v, &x) in vars.iter().zip(values) {
        bindings.bind(v, dec(x));
    }
    bindings
}

#[allow(dead_code)]
pub fn eval_f64(expr: &Real, vars: &[Real], values: &[f64]) -> f64 {
    evaluate(expr, &bind_all(vars, values)).expect("evaluation").to_f64()
}

/// Central difference of `expr` along `vars[dir]`.
#[allow(dead_code)]
pub fn finite_diff(expr: &Real, vars: &[Real], values: &[f64], dir: usize) -> f64 {
    let mut plus = values.to_vec();
    let mut minus = values.to_vec();
    plus[dir] += FD_STEP;
    minus[dir] -= FD_STEP;
    (eval_f64(expr, vars, &plus) - eval_f64(expr, vars, &minus)) / (2.0 * FD_STEP)
}

/// Checks every symbolic partial of `expr` against a central difference at `values`.
#[allow(dead_code)]
pub fn grad_matches_diffs(expr: &Real, vars: &[Real], values: &[f64]) {
    let grads = real_expressions::derive(vars, expr);
    assert_eq!(grads.len(), vars.len());
    for (dir, g) in grads.iter().enumerate() {
        let analytic = eval_f64(g, vars, values);
        let numeric = finite_diff(expr, vars, values, dir);
        assert_relative_eq!(analytic, numeric, epsilon = FD_TOL, max_relative = FD_TOL);
    }
}
