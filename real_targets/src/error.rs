use real_expressions::{EvalError, GraphError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TargetError {
    /// The parameter vector does not line up with [`TargetGroup::parameters`](crate::TargetGroup::parameters).
    #[error("expected {expected} parameter values, found {found}")]
    ParameterCount { expected: usize, found: usize },

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}
