mod common;

use common::*;
use proptest::prelude::*;
use proptest::sample::Index;
use real_expressions::{Gradient, Real, count_nodes, rational};

#[derive(Clone, Copy, Debug)]
enum Step {
    Add,
    Sub,
    Mul,
    Scale,
    Square,
    Sin,
    Cos,
    Tanh,
    Atan,
    Sqrt,
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Add),
        Just(Step::Sub),
        Just(Step::Mul),
        Just(Step::Scale),
        Just(Step::Square),
        Just(Step::Sin),
        Just(Step::Cos),
        Just(Step::Tanh),
        Just(Step::Atan),
        Just(Step::Sqrt),
    ]
}

/// A random graph over `vars`, built by repeatedly combining earlier nodes so sub-expressions
/// end up shared between parents.
fn build(vars: &[Real], recipe: &[(Step, Index, Index)]) -> Real {
    let mut nodes: Vec<Real> = vars.to_vec();
    for (step, i, j) in recipe {
        let a = nodes[i.index(nodes.len())].clone();
        let b = nodes[j.index(nodes.len())].clone();
        let next = match step {
            Step::Add => &a + &b,
            Step::Sub => &a - &b,
            Step::Mul => &a * &b,
            Step::Scale => a.scale(&rational(-3, 2)),
            Step::Square => a.powi(2),
            Step::Sin => a.sin(),
            Step::Cos => a.cos(),
            Step::Tanh => a.tanh(),
            Step::Atan => a.atan(),
            // Fractional power of a strictly positive value.
            Step::Sqrt => (a.powi(2) + Real::one()).pow_const(rational(1, 2)),
        };
        nodes.push(next);
    }
    nodes.pop().unwrap_or_else(Real::zero)
}

fn arb_recipe() -> impl Strategy<Value = Vec<(Step, Index, Index)>> {
    prop::collection::vec((arb_step(), any::<Index>(), any::<Index>()), 1..8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn symbolic_gradient_matches_finite_differences(
        recipe in arb_recipe(),
        x in 0.5f64..1.5,
        y in -1.5f64..-0.5,
    ) {
        let vars = [param(), param()];
        let e = build(&vars, &recipe);
        grad_matches_diffs(&e, &vars, &[x, y]);
    }

    #[test]
    fn every_node_is_expanded_at_most_once(recipe in arb_recipe()) {
        let vars = [param(), param()];
        let e = build(&vars, &recipe);
        let g = Gradient::new(&e);
        prop_assert!(g.expanded_nodes() <= count_nodes(&e));
    }
}
