#![forbid(unsafe_code)]

pub mod algebra;
pub mod decimal;
pub mod error;
pub mod evaluate;
pub mod gradient;
pub mod real;
pub mod strings;
pub mod traversal;
pub mod unary;

pub use num_bigint::BigInt;
pub use num_rational::BigRational;

pub use crate::decimal::{Decimal, ParseDecimalError, integer, rational};
pub use crate::error::{EvalError, GraphError};
pub use crate::evaluate::{Bindings, EvalOptions, Evaluator, Placeholders, evaluate, evaluate_rows, evaluate_sum};
pub use crate::gradient::{Gradient, derive};
pub use crate::real::{NodeId, Real, RealKind, Terms};
pub use crate::strings::{StringTreeOptions, string_tree};
pub use crate::traversal::{
    collect_columns, collect_parameters, count_depth, count_kinds, count_nodes, depth_first, has_kind,
    post_order_with_densities, reachable,
};
pub use crate::unary::UnaryOp;
