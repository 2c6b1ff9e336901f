//! Reference evaluator.
//!
//! [`Evaluator`] maps a fully bound graph to an exact [`Decimal`]. Values are memoized per node
//! identity for the lifetime of the evaluator, so a sub-expression shared by many parents is
//! computed once. The walk uses an explicit work stack and evaluates `If` lazily: only the
//! selected branch is ever touched.

use indexmap::IndexMap;
use num_traits::ToPrimitive;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::decimal::Decimal;
use crate::error::{EvalError, GraphError};
use crate::real::{NodeId, Real, RealKind};
use crate::traversal::collect_columns;

#[derive(Copy, Clone, Debug, Default)]
pub struct EvalOptions {
    /// Report any infinite intermediate value as a domain error.
    pub check_finite: bool,
}

/// Per-column data, all columns sharing one length.
#[derive(Clone, Debug, Default)]
pub struct Placeholders {
    columns: IndexMap<NodeId, Vec<Decimal>>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach data to a column. Panics if `column` is not a column node.
    pub fn insert(&mut self, column: &Real, values: Vec<Decimal>) -> Result<(), EvalError> {
        assert!(column.is_column(), "placeholder data can only be bound to a column");
        if let Some(expected) = self.width() {
            if values.len() != expected {
                return Err(EvalError::ColumnLength {
                    column: column.id(),
                    expected,
                    found: values.len(),
                });
            }
        }
        self.columns.insert(column.id(), values);
        Ok(())
    }

    pub fn with(mut self, column: &Real, values: Vec<Decimal>) -> Result<Self, EvalError> {
        self.insert(column, values)?;
        Ok(self)
    }

    /// Number of rows, if any column is bound.
    pub fn width(&self) -> Option<usize> {
        self.columns.values().next().map(Vec::len)
    }

    pub fn get(&self, column: NodeId) -> Option<&[Decimal]> {
        self.columns.get(&column).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &[Decimal])> {
        self.columns.iter().map(|(id, v)| (*id, v.as_slice()))
    }
}

/// Values for variables plus placeholder data for columns.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    values: FxHashMap<NodeId, Decimal>,
    placeholders: Placeholders,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a parameter or column to a single value. Panics if `variable` is not a variable.
    pub fn bind(&mut self, variable: &Real, value: impl Into<Decimal>) -> &mut Self {
        assert!(variable.is_variable(), "only parameters and columns can be bound");
        self.values.insert(variable.id(), value.into());
        self
    }

    pub fn with(mut self, variable: &Real, value: impl Into<Decimal>) -> Self {
        self.bind(variable, value);
        self
    }

    pub fn with_placeholders(mut self, placeholders: Placeholders) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn value(&self, variable: NodeId) -> Option<&Decimal> {
        self.values.get(&variable)
    }

    pub fn placeholders(&self) -> &Placeholders {
        &self.placeholders
    }
}

enum Task {
    Visit(Real),
    /// All children have values.
    Combine(Real),
    /// The test has a value; pick a branch.
    Branch(Real),
    /// Copy the chosen branch's value to the `If` node.
    Forward { node: Real, branch: Real },
}

/// Memoizing evaluator. Use one instance per thread and per set of bindings.
#[derive(Debug)]
pub struct Evaluator<'a> {
    bindings: &'a Bindings,
    row: Option<usize>,
    opts: EvalOptions,
    cache: FxHashMap<NodeId, Decimal>,
    evaluations: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(bindings: &'a Bindings) -> Self {
        Self::with_options(bindings, EvalOptions::default())
    }

    pub fn with_options(bindings: &'a Bindings, opts: EvalOptions) -> Self {
        Self {
            bindings,
            row: None,
            opts,
            cache: FxHashMap::default(),
            evaluations: 0,
        }
    }

    /// Resolve unbound columns from row `row` of the placeholder data.
    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    /// Number of memoized nodes.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Number of node values computed so far (cache hits excluded).
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn evaluate(&mut self, root: &Real) -> Result<Decimal, EvalError> {
        let mut in_progress: FxHashSet<NodeId> = FxHashSet::default();
        let mut stack = vec![Task::Visit(root.clone())];

        while let Some(task) = stack.pop() {
            match task {
                Task::Visit(node) => {
                    if self.cache.contains_key(&node.id()) {
                        continue;
                    }
                    if !in_progress.insert(node.id()) {
                        return Err(GraphError::MalformedGraph { node: node.id() }.into());
                    }
                    match node.kind() {
                        RealKind::If(i) => {
                            let test = i.test.clone();
                            stack.push(Task::Branch(node));
                            stack.push(Task::Visit(test));
                        }
                        _ => {
                            let children: Vec<Real> = node.children().into_iter().cloned().collect();
                            stack.push(Task::Combine(node));
                            stack.extend(children.into_iter().rev().map(Task::Visit));
                        }
                    }
                }
                Task::Combine(node) => {
                    let value = self.combine(&node)?;
                    in_progress.remove(&node.id());
                    self.store(&node, value)?;
                }
                Task::Branch(node) => {
                    let RealKind::If(i) = node.kind() else {
                        unreachable!("branch task on a non-if node");
                    };
                    let branch = if self.cached(&i.test).is_zero() {
                        i.when_zero.clone()
                    } else {
                        i.when_non_zero.clone()
                    };
                    stack.push(Task::Forward {
                        node,
                        branch: branch.clone(),
                    });
                    stack.push(Task::Visit(branch));
                }
                Task::Forward { node, branch } => {
                    let value = self.cached(&branch).clone();
                    in_progress.remove(&node.id());
                    self.store(&node, value)?;
                }
            }
        }

        Ok(self.cached(root).clone())
    }

    fn cached(&self, node: &Real) -> &Decimal {
        self.cache
            .get(&node.id())
            .expect("child evaluated before its parent")
    }

    fn store(&mut self, node: &Real, value: Decimal) -> Result<(), EvalError> {
        if self.opts.check_finite && !value.is_finite() {
            return Err(EvalError::Domain {
                op: "check_finite",
                operands: vec![value],
            });
        }
        self.evaluations += 1;
        self.cache.insert(node.id(), value);
        Ok(())
    }

    fn variable(&self, node: &Real) -> Result<Decimal, EvalError> {
        if let Some(v) = self.bindings.value(node.id()) {
            return Ok(v.clone());
        }
        if node.is_column() {
            if let (Some(row), Some(data)) = (self.row, self.bindings.placeholders().get(node.id())) {
                return data.get(row).cloned().ok_or(EvalError::ColumnLength {
                    column: node.id(),
                    expected: row + 1,
                    found: data.len(),
                });
            }
        }
        Err(EvalError::UnboundVariable {
            variable: node.id(),
            kind: node.kind().name(),
        })
    }

    fn combine(&self, node: &Real) -> Result<Decimal, EvalError> {
        match node.kind() {
            RealKind::Constant(c) => Ok(Decimal::from(c)),
            RealKind::Infinity => Ok(Decimal::Infinity),
            RealKind::NegInfinity => Ok(Decimal::NegInfinity),
            RealKind::Parameter(_) | RealKind::Column => self.variable(node),
            RealKind::Unary(u) => u.op.eval(self.cached(&u.original)),
            RealKind::Line(line) => {
                let mut acc = Decimal::from(&line.bias);
                for (term, coefficient) in &line.terms {
                    let weighted = Decimal::from(coefficient).checked_mul(self.cached(term))?;
                    acc = acc.checked_add(&weighted)?;
                }
                Ok(acc)
            }
            RealKind::LogLine(log_line) => {
                let mut acc = Decimal::one();
                for (term, exponent) in &log_line.terms {
                    let factor = self.cached(term).powf(&Decimal::from(exponent))?;
                    acc = acc.checked_mul(&factor)?;
                }
                Ok(acc)
            }
            RealKind::Pow(p) => self.cached(&p.base).powf(self.cached(&p.exponent)),
            RealKind::Compare(c) => {
                let ordering = self.cached(&c.left).cmp(self.cached(&c.right));
                Ok(Decimal::from(ordering as i32))
            }
            RealKind::Lookup(l) => {
                let index = self.cached(&l.index);
                let rounded = index.round()?;
                let entry = rounded
                    .to_usize()
                    .and_then(|i| l.table.get(i))
                    .ok_or_else(|| EvalError::domain("lookup", &[index, &Decimal::from(l.table.len() as i64)]))?;
                Ok(self.cached(entry).clone())
            }
            RealKind::If(_) => unreachable!("if nodes are resolved through branch tasks"),
        }
    }
}

/// Evaluate `root` with a fresh evaluator.
pub fn evaluate(root: &Real, bindings: &Bindings) -> Result<Decimal, EvalError> {
    Evaluator::new(bindings).evaluate(root)
}

/// One value per placeholder row if `root` reads placeholder columns, otherwise a single value.
pub fn evaluate_rows(root: &Real, bindings: &Bindings, opts: EvalOptions) -> Result<Vec<Decimal>, EvalError> {
    let placeholders = bindings.placeholders();
    let reads_placeholders = collect_columns(root)
        .iter()
        .any(|c| bindings.value(c.id()).is_none() && placeholders.get(c.id()).is_some());

    match placeholders.width() {
        Some(width) if reads_placeholders => {
            trace!(rows = width, "evaluating over placeholder rows");
            (0..width)
                .map(|row| Evaluator::with_options(bindings, opts).at_row(row).evaluate(root))
                .collect()
        }
        _ => Ok(vec![Evaluator::with_options(bindings, opts).evaluate(root)?]),
    }
}

/// Sum of [`evaluate_rows`].
pub fn evaluate_sum(root: &Real, bindings: &Bindings, opts: EvalOptions) -> Result<Decimal, EvalError> {
    evaluate_rows(root, bindings, opts)?
        .iter()
        .try_fold(Decimal::zero(), |acc, v| acc.checked_add(v))
}
