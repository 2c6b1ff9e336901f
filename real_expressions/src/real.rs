//! The immutable expression graph.
//!
//! A [`Real`] is a shared handle to an immutable node. Nodes reference their children by handle,
//! so sub-expressions are shared rather than copied, and the same node may have many parents.
//!
//! Every node carries a [`NodeId`] drawn from a process-wide increasing counter. A node can only
//! reference nodes that already exist, so its id is always greater than the ids of its children
//! and of its density (for parameters). Graphs are therefore acyclic by construction and sorting
//! nodes by id yields a topological order.
//!
//! Equality and hashing of `Real` are by identity. Two nodes computing the same value are still
//! distinct unless they are the same node. `Real` has no `Ord`; sort by [`Real::id`] instead.

use core::fmt;
use core::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use num_rational::BigRational;
use num_traits::{One, Zero};

use crate::decimal::Decimal;
use crate::unary::UnaryOp;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn fresh() -> Self {
        NodeId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn index(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered `sub-expression -> coefficient` map used by [`Line`] and [`LogLine`].
pub type Terms = IndexMap<Real, BigRational>;

#[derive(Clone, Debug)]
pub struct Parameter {
    /// Log-prior density of the parameter.
    pub density: Real,
}

#[derive(Clone, Debug)]
pub struct Unary {
    pub original: Real,
    pub op: UnaryOp,
}

/// `sum(coefficient * term) + bias`
#[derive(Clone, Debug)]
pub struct Line {
    pub terms: Terms,
    pub bias: BigRational,
}

/// `product(term ^ exponent)`
#[derive(Clone, Debug)]
pub struct LogLine {
    pub terms: Terms,
}

/// `base ^ exponent` for a non-constant exponent.
#[derive(Clone, Debug)]
pub struct Pow {
    pub base: Real,
    pub exponent: Real,
}

/// Three-way comparison: `-1`, `0` or `1` as `left` is below, equal to or above `right`.
#[derive(Clone, Debug)]
pub struct Compare {
    pub left: Real,
    pub right: Real,
}

/// `table[round(index)]`
#[derive(Clone, Debug)]
pub struct Lookup {
    pub index: Real,
    pub table: Vec<Real>,
}

#[derive(Clone, Debug)]
pub struct If {
    pub test: Real,
    pub when_non_zero: Real,
    pub when_zero: Real,
}

/// The closed set of node kinds.
#[derive(Clone, Debug)]
pub enum RealKind {
    Constant(BigRational),
    Infinity,
    NegInfinity,
    Parameter(Parameter),
    /// Bound at evaluation time to one row of external placeholder data.
    Column,
    Unary(Unary),
    Line(Line),
    LogLine(LogLine),
    Pow(Pow),
    Compare(Compare),
    Lookup(Lookup),
    If(If),
}

impl RealKind {
    pub fn name(&self) -> &'static str {
        match self {
            RealKind::Constant(_) => "constant",
            RealKind::Infinity => "infinity",
            RealKind::NegInfinity => "neg_infinity",
            RealKind::Parameter(_) => "parameter",
            RealKind::Column => "column",
            RealKind::Unary(_) => "unary",
            RealKind::Line(_) => "line",
            RealKind::LogLine(_) => "log_line",
            RealKind::Pow(_) => "pow",
            RealKind::Compare(_) => "compare",
            RealKind::Lookup(_) => "lookup",
            RealKind::If(_) => "if",
        }
    }
}

#[derive(Debug)]
struct Node {
    id: NodeId,
    kind: RealKind,
}

// Teardown is iterative: the last owner of a node unlinks its children onto a worklist.
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        take_children(&mut self.kind, &mut pending);
        while let Some(real) = pending.pop() {
            if let Some(mut node) = Arc::into_inner(real.0) {
                take_children(&mut node.kind, &mut pending);
            }
        }
    }
}

fn take_children(kind: &mut RealKind, out: &mut Vec<Real>) {
    match core::mem::replace(kind, RealKind::Column) {
        RealKind::Constant(_)
        | RealKind::Infinity
        | RealKind::NegInfinity
        | RealKind::Column => {}
        RealKind::Parameter(p) => out.push(p.density),
        RealKind::Unary(u) => out.push(u.original),
        RealKind::Line(l) => out.extend(l.terms.into_keys()),
        RealKind::LogLine(l) => out.extend(l.terms.into_keys()),
        RealKind::Pow(p) => out.extend([p.base, p.exponent]),
        RealKind::Compare(c) => out.extend([c.left, c.right]),
        RealKind::Lookup(l) => {
            out.push(l.index);
            out.extend(l.table);
        }
        RealKind::If(i) => out.extend([i.test, i.when_non_zero, i.when_zero]),
    }
}

#[derive(Clone)]
pub struct Real(Arc<Node>);

impl Real {
    fn new(kind: RealKind) -> Self {
        Real(Arc::new(Node {
            id: NodeId::fresh(),
            kind,
        }))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn kind(&self) -> &RealKind {
        &self.0.kind
    }

    pub fn ptr_eq(&self, other: &Real) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// A constant leaf. Infinite values become [`RealKind::Infinity`]/[`RealKind::NegInfinity`].
    pub fn constant(value: impl Into<Decimal>) -> Self {
        match value.into() {
            Decimal::Finite(r) => Real::new(RealKind::Constant(r)),
            Decimal::Infinity => Real::infinity(),
            Decimal::NegInfinity => Real::neg_infinity(),
        }
    }

    pub fn zero() -> Self {
        Real::new(RealKind::Constant(BigRational::zero()))
    }

    pub fn one() -> Self {
        Real::new(RealKind::Constant(BigRational::one()))
    }

    pub fn infinity() -> Self {
        Real::new(RealKind::Infinity)
    }

    pub fn neg_infinity() -> Self {
        Real::new(RealKind::NegInfinity)
    }

    /// A free parameter whose log-prior is `density`.
    ///
    /// The density must already exist, so it can never refer back to the new parameter.
    pub fn parameter(density: Real) -> Self {
        Real::new(RealKind::Parameter(Parameter { density }))
    }

    /// A data column, bound per row through placeholder data.
    pub fn column() -> Self {
        Real::new(RealKind::Column)
    }

    pub fn unary_node(original: Real, op: UnaryOp) -> Self {
        Real::new(RealKind::Unary(Unary { original, op }))
    }

    /// A [`Line`] exactly as given. Repeated terms have their coefficients summed.
    pub fn line_node(terms: impl IntoIterator<Item = (Real, BigRational)>, bias: BigRational) -> Self {
        Real::new(RealKind::Line(Line {
            terms: collect_terms(terms),
            bias,
        }))
    }

    /// A [`LogLine`] exactly as given. Repeated terms have their exponents summed.
    pub fn log_line_node(terms: impl IntoIterator<Item = (Real, BigRational)>) -> Self {
        Real::new(RealKind::LogLine(LogLine {
            terms: collect_terms(terms),
        }))
    }

    pub fn pow_node(base: Real, exponent: Real) -> Self {
        Real::new(RealKind::Pow(Pow { base, exponent }))
    }

    pub fn compare(left: &Real, right: &Real) -> Self {
        Real::new(RealKind::Compare(Compare {
            left: left.clone(),
            right: right.clone(),
        }))
    }

    /// Panics if `table` is empty.
    pub fn lookup(index: &Real, table: Vec<Real>) -> Self {
        assert!(!table.is_empty(), "lookup table must not be empty");
        Real::new(RealKind::Lookup(Lookup {
            index: index.clone(),
            table,
        }))
    }

    pub fn if_(test: &Real, when_non_zero: &Real, when_zero: &Real) -> Self {
        Real::new(RealKind::If(If {
            test: test.clone(),
            when_non_zero: when_non_zero.clone(),
            when_zero: when_zero.clone(),
        }))
    }

    pub fn as_constant(&self) -> Option<&BigRational> {
        match self.kind() {
            RealKind::Constant(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool {
        self.as_constant().is_some()
    }

    pub(crate) fn is_zero_constant(&self) -> bool {
        self.as_constant().is_some_and(Zero::is_zero)
    }

    /// Parameters and columns.
    pub fn is_variable(&self) -> bool {
        matches!(self.kind(), RealKind::Parameter(_) | RealKind::Column)
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self.kind(), RealKind::Parameter(_))
    }

    pub fn is_column(&self) -> bool {
        matches!(self.kind(), RealKind::Column)
    }

    pub fn density(&self) -> Option<&Real> {
        match self.kind() {
            RealKind::Parameter(p) => Some(&p.density),
            _ => None,
        }
    }

    /// Direct sub-expressions, in a fixed order. A parameter's density is not a child.
    pub fn children(&self) -> Vec<&Real> {
        match self.kind() {
            RealKind::Constant(_)
            | RealKind::Infinity
            | RealKind::NegInfinity
            | RealKind::Parameter(_)
            | RealKind::Column => Vec::new(),
            RealKind::Unary(u) => vec![&u.original],
            RealKind::Line(l) => l.terms.keys().collect(),
            RealKind::LogLine(l) => l.terms.keys().collect(),
            RealKind::Pow(p) => vec![&p.base, &p.exponent],
            RealKind::Compare(c) => vec![&c.left, &c.right],
            RealKind::Lookup(l) => core::iter::once(&l.index).chain(l.table.iter()).collect(),
            RealKind::If(i) => vec![&i.test, &i.when_non_zero, &i.when_zero],
        }
    }

    /// Children plus, for parameters, the density.
    pub fn dependencies(&self) -> Vec<&Real> {
        match self.kind() {
            RealKind::Parameter(p) => vec![&p.density],
            _ => self.children(),
        }
    }
}

fn collect_terms(terms: impl IntoIterator<Item = (Real, BigRational)>) -> Terms {
    let mut out = Terms::default();
    for (term, coefficient) in terms {
        *out.entry(term).or_insert_with(BigRational::zero) += coefficient;
    }
    out
}

impl PartialEq for Real {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Real {}

impl Hash for Real {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Real {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Real")
            .field("id", &self.id())
            .field("kind", &self.kind().name())
            .finish()
    }
}
