//! Error types for evaluating and traversing real expression graphs.

use thiserror::Error;

use crate::decimal::Decimal;
use crate::real::NodeId;

/// Errors raised while evaluating a graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A parameter or column had no bound value (and no placeholder data for the current row).
    #[error("unbound {kind} {variable}")]
    UnboundVariable { variable: NodeId, kind: &'static str },

    /// The operation is undefined for these operands.
    #[error("domain error in {op}({})", join_operands(.operands))]
    Domain { op: &'static str, operands: Vec<Decimal> },

    /// Placeholder data for a column does not match the width of the other columns.
    #[error("column {column} has {found} rows, expected {expected}")]
    ColumnLength { column: NodeId, expected: usize, found: usize },

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl EvalError {
    pub(crate) fn domain(op: &'static str, operands: &[&Decimal]) -> Self {
        EvalError::Domain {
            op,
            operands: operands.iter().map(|d| (*d).clone()).collect(),
        }
    }
}

/// Structural errors in a graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A node was reached again while its own sub-graph was still being visited.
    #[error("malformed graph: cycle through node {node}")]
    MalformedGraph { node: NodeId },
}

fn join_operands(operands: &[Decimal]) -> String {
    operands
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
