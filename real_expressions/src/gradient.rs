//! Reverse-mode differentiation producing derivative graphs.
//!
//! The pass walks the nodes reachable from the output in decreasing id order. Since a parent's id
//! is always greater than its children's, every node has received the contributions of all its
//! parents by the time it is reached, so each node is expanded once with its complete adjoint.

use num_rational::BigRational;
use num_traits::One;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::real::{NodeId, Real, RealKind};
use crate::traversal::reachable;

/// Adjoints of every node reachable from one output.
#[derive(Debug, Clone)]
pub struct Gradient {
    adjoints: FxHashMap<NodeId, Real>,
    expanded: usize,
}

impl Gradient {
    pub fn new(output: &Real) -> Self {
        let mut nodes = reachable(output);
        nodes.sort_by_key(|n| core::cmp::Reverse(n.id()));

        let mut pending: FxHashMap<NodeId, Vec<Real>> = FxHashMap::default();
        pending.insert(output.id(), vec![Real::one()]);
        let mut adjoints = FxHashMap::default();
        let mut expanded = 0;

        for node in &nodes {
            let Some(contributions) = pending.remove(&node.id()) else {
                continue;
            };
            let adjoint = Real::sum(&contributions);
            if adjoint.is_zero_constant() {
                continue;
            }
            if !node.children().is_empty() {
                expanded += 1;
                propagate(node, &adjoint, |child, d| {
                    if !d.is_zero_constant() {
                        pending.entry(child.id()).or_default().push(d);
                    }
                });
            }
            adjoints.insert(node.id(), adjoint);
        }

        debug!(nodes = nodes.len(), expanded, "gradient pass");
        Gradient { adjoints, expanded }
    }

    /// `d output / d node`, the constant `0` if the output does not depend on `node`.
    pub fn derivative(&self, node: &Real) -> Real {
        self.adjoints.get(&node.id()).cloned().unwrap_or_else(Real::zero)
    }

    /// Number of nodes whose children received contributions.
    pub fn expanded_nodes(&self) -> usize {
        self.expanded
    }
}

/// One derivative graph per entry of `targets`, in order.
pub fn derive(targets: &[Real], output: &Real) -> Vec<Real> {
    let gradient = Gradient::new(output);
    targets.iter().map(|t| gradient.derivative(t)).collect()
}

fn propagate(node: &Real, adjoint: &Real, mut push: impl FnMut(&Real, Real)) {
    match node.kind() {
        RealKind::Constant(_)
        | RealKind::Infinity
        | RealKind::NegInfinity
        | RealKind::Parameter(_)
        | RealKind::Column => {}
        RealKind::Unary(u) => push(&u.original, adjoint * u.op.derivative(&u.original, node)),
        RealKind::Line(line) => {
            for (term, coefficient) in &line.terms {
                push(term, adjoint.scale(coefficient));
            }
        }
        RealKind::LogLine(log_line) => {
            for (term, exponent) in &log_line.terms {
                let partial = if exponent.is_integer() {
                    // Polynomial rule; stays defined for non-positive terms.
                    log_line
                        .terms
                        .iter()
                        .map(|(t, e)| {
                            if t == term {
                                t.pow_const(e - BigRational::one())
                            } else {
                                t.pow_const(e.clone())
                            }
                        })
                        .fold(Real::one(), |acc, factor| acc * factor)
                } else {
                    node * term.recip()
                };
                push(term, (adjoint * partial).scale(exponent));
            }
        }
        RealKind::Pow(p) => {
            let base_partial = &p.exponent * p.base.pow(&(&p.exponent - Real::one()));
            push(&p.base, adjoint * base_partial);
            if !p.exponent.is_constant() {
                push(&p.exponent, adjoint * node * p.base.log());
            }
        }
        RealKind::Compare(_) => {}
        RealKind::If(i) => {
            let zero = Real::zero();
            push(&i.when_non_zero, Real::if_(&i.test, adjoint, &zero));
            push(&i.when_zero, Real::if_(&i.test, &zero, adjoint));
        }
        RealKind::Lookup(l) => {
            // `selected` evaluates to the ordinal of the chosen entry among the distinct ones.
            let mut ordinals: FxHashMap<NodeId, i64> = FxHashMap::default();
            let mut distinct: Vec<&Real> = Vec::new();
            let mut positions = Vec::with_capacity(l.table.len());
            for entry in &l.table {
                let ordinal = *ordinals.entry(entry.id()).or_insert_with(|| {
                    distinct.push(entry);
                    distinct.len() as i64 - 1
                });
                positions.push(Real::constant(ordinal));
            }
            let selected = Real::lookup(&l.index, positions);
            let zero = Real::zero();
            for (ordinal, entry) in distinct.into_iter().enumerate() {
                let offset = &selected - ordinal as i64;
                push(entry, Real::if_(&offset, &zero, adjoint));
            }
        }
    }
}
