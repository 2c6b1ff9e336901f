mod common;

use common::*;
use real_expressions::{
    Bindings, Decimal, Gradient, Real, UnaryOp, derive, evaluate, integer, rational,
};
use rstest::rstest;

#[test]
fn line_gradient_is_its_coefficients() {
    let x = param();
    let y = param();
    let line = Real::line_node([(x.clone(), integer(2)), (y.clone(), integer(3))], integer(1));
    let grads = derive(&[x, y], &line);
    assert_eq!(grads[0].as_constant(), Some(&integer(2)));
    assert_eq!(grads[1].as_constant(), Some(&integer(3)));
}

#[test]
fn derivatives_come_back_in_request_order() {
    let x = param();
    let y = param();
    let z = param();
    let e = &x * Real::constant(7) + &z;
    let grads = derive(&[z.clone(), y.clone(), x.clone()], &e);
    assert_eq!(grads.len(), 3);
    assert_eq!(grads[0].as_constant(), Some(&integer(1)));
    assert_eq!(grads[1].as_constant(), Some(&integer(0)));
    assert_eq!(grads[2].as_constant(), Some(&integer(7)));
}

#[rstest]
#[case::exp(UnaryOp::Exp, 0.3)]
#[case::log(UnaryOp::Log, 1.7)]
#[case::abs_positive(UnaryOp::Abs, 0.8)]
#[case::abs_negative(UnaryOp::Abs, -0.8)]
#[case::sin(UnaryOp::Sin, 0.4)]
#[case::cos(UnaryOp::Cos, 0.4)]
#[case::tan(UnaryOp::Tan, 0.4)]
#[case::asin(UnaryOp::Asin, 0.25)]
#[case::acos(UnaryOp::Acos, 0.25)]
#[case::atan(UnaryOp::Atan, 1.5)]
#[case::sinh(UnaryOp::Sinh, 0.6)]
#[case::cosh(UnaryOp::Cosh, 0.6)]
#[case::tanh(UnaryOp::Tanh, 0.6)]
fn unary_derivatives_match_finite_differences(#[case] op: UnaryOp, #[case] at: f64) {
    let x = param();
    let e = x.unary(op);
    grad_matches_diffs(&e, &[x], &[at]);
}

#[test]
fn every_unary_op_has_a_derivative_rule() {
    for &op in UnaryOp::ALL {
        let x = param();
        let node = x.unary(op);
        let d = op.derivative(&x, &node);
        let bindings = Bindings::new().with(&x, Decimal::ratio(1, 4));
        assert!(evaluate(&d, &bindings).is_ok(), "derivative of {} failed to evaluate", op.name());
    }
}

#[rstest]
#[case::whole_negative_base(-2, -1.3)]
#[case::whole_positive_base(3, 0.9)]
#[case::inverse(-1, 2.5)]
fn whole_log_line_exponents_match_finite_differences(#[case] exponent: i64, #[case] at: f64) {
    let x = param();
    let y = param();
    let e = Real::log_line_node([(x.clone(), integer(exponent)), (y.clone(), integer(2))]);
    grad_matches_diffs(&e, &[x, y], &[at, -0.7]);
}

#[test]
fn fractional_log_line_exponents_match_finite_differences() {
    let x = param();
    let y = param();
    let e = Real::log_line_node([(x.clone(), rational(3, 2)), (y.clone(), rational(-1, 3))]);
    grad_matches_diffs(&e, &[x, y], &[1.3, 0.6]);
}

#[test]
fn pow_with_variable_exponent_matches_finite_differences() {
    let b = param();
    let e = param();
    let p = Real::pow_node(b.clone(), e.clone());
    grad_matches_diffs(&p, &[b, e], &[1.7, 0.8]);
}

#[test]
fn if_routes_the_adjoint_to_the_taken_branch() {
    let t = param();
    let a = param();
    let b = param();
    let e = Real::if_(&t, &a.powi(2), &(&b * Real::constant(3)));
    let grads = derive(&[t.clone(), a.clone(), b.clone()], &e);

    let taken = Bindings::new().with(&t, 1).with(&a, 5).with(&b, 7);
    assert_eq!(evaluate(&grads[0], &taken).unwrap(), Decimal::zero());
    assert_eq!(evaluate(&grads[1], &taken).unwrap(), Decimal::from(10));
    assert_eq!(evaluate(&grads[2], &taken).unwrap(), Decimal::zero());

    let skipped = Bindings::new().with(&t, 0).with(&a, 5).with(&b, 7);
    assert_eq!(evaluate(&grads[1], &skipped).unwrap(), Decimal::zero());
    assert_eq!(evaluate(&grads[2], &skipped).unwrap(), Decimal::from(3));
}

#[test]
fn lookup_routes_the_adjoint_to_the_selected_entry() {
    let i = param();
    let a = param();
    let b = param();
    let e = Real::lookup(&i, vec![a.powi(2), b.clone(), a.clone()]);
    let grads = derive(&[i.clone(), a.clone(), b.clone()], &e);

    let bindings = |index: i64| Bindings::new().with(&i, index).with(&a, 3).with(&b, 4);
    assert_eq!(grads[0].as_constant(), Some(&integer(0)));
    assert_eq!(evaluate(&grads[1], &bindings(0)).unwrap(), Decimal::from(6));
    assert_eq!(evaluate(&grads[2], &bindings(0)).unwrap(), Decimal::zero());
    assert_eq!(evaluate(&grads[1], &bindings(1)).unwrap(), Decimal::zero());
    assert_eq!(evaluate(&grads[2], &bindings(1)).unwrap(), Decimal::one());
    assert_eq!(evaluate(&grads[1], &bindings(2)).unwrap(), Decimal::one());
}

#[test]
fn compare_contributes_nothing_but_its_if_still_routes() {
    let x = param();
    let e = x.max(&Real::zero());
    let d = derive(&[x.clone()], &e).remove(0);
    assert_eq!(evaluate(&d, &Bindings::new().with(&x, 2)).unwrap(), Decimal::one());
    assert_eq!(evaluate(&d, &Bindings::new().with(&x, -2)).unwrap(), Decimal::zero());
}

#[test]
fn shared_nodes_accumulate_from_every_parent() {
    let x = param();
    let s = x.powi(2);
    // s feeds three parents.
    let e = s.exp() + s.sin() + &s * Real::constant(4);
    let g = Gradient::new(&e);
    let values = [0.7];
    grad_matches_diffs(&e, &[x.clone()], &values);
    // line, exp(s), sin(s), s
    assert_eq!(g.expanded_nodes(), 4);
}

#[test]
fn derivatives_can_be_differentiated_again() {
    let x = param();
    let e = x.powi(3) + x.sin();
    let first = derive(&[x.clone()], &e).remove(0);
    let second = derive(&[x.clone()], &first).remove(0);
    // 6x - sin(x)
    let at = 0.5f64;
    let value = eval_f64(&second, &[x], &[at]);
    approx::assert_relative_eq!(value, 6.0 * at - at.sin(), epsilon = 1e-12);
}

#[test]
fn log_sum_exp_gradient_is_softmax() {
    let x = param();
    let y = param();
    let e = Real::log_sum_exp(&[x.clone(), y.clone()]);
    grad_matches_diffs(&e, &[x, y], &[0.2, 1.1]);
}
