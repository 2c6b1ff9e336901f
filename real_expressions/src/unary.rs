//! Elementary functions usable in [`RealKind::Unary`](crate::real::RealKind::Unary) nodes.
//!
//! Each function is declared once, with its floating-point evaluation and its derivative as a
//! graph. The derivative receives the operand `x` and the node `f(x)` itself so rules like
//! `d exp(x) = exp(x)` can reuse the existing node.

use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::decimal::{Decimal, rational};
use crate::error::EvalError;
use crate::real::Real;

macro_rules! unary_ops {
    (
        $(
            $(#[$meta:meta])*
            $Op:ident {
                eval($v:ident) $eval:block,
                derivative($x:ident, $node:ident) $derivative:block $(,)?
            }
        )*
    ) => {
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum UnaryOp {
            $(
                $(#[$meta])*
                $Op,
            )*
        }

        impl UnaryOp {
            pub const ALL: &'static [UnaryOp] = &[$(UnaryOp::$Op,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(UnaryOp::$Op => paste::paste! { stringify!([<$Op:snake>]) },)*
                }
            }

            pub fn eval_f64(self, v: f64) -> f64 {
                match self {
                    $(UnaryOp::$Op => {
                        let $v = v;
                        $eval
                    })*
                }
            }

            /// `d f(x) / dx` as a new graph, where `node` is `f(x)`.
            pub fn derivative(self, x: &Real, node: &Real) -> Real {
                match self {
                    $(UnaryOp::$Op => {
                        let $x = x;
                        let $node = node;
                        $derivative
                    })*
                }
            }
        }
    };
}

unary_ops! {
    Exp {
        eval(v) { v.exp() },
        derivative(_x, node) { node.clone() },
    }
    Log {
        eval(v) { v.ln() },
        derivative(x, _node) { x.recip() },
    }
    /// The derivative is the sign of the operand, `0` at the origin.
    Abs {
        eval(v) { v.abs() },
        derivative(x, _node) { Real::compare(x, &Real::zero()) },
    }
    Sin {
        eval(v) { v.sin() },
        derivative(x, _node) { x.cos() },
    }
    Cos {
        eval(v) { v.cos() },
        derivative(x, _node) { -x.sin() },
    }
    Tan {
        eval(v) { v.tan() },
        derivative(_x, node) { node.powi(2) + Real::one() },
    }
    Asin {
        eval(v) { v.asin() },
        derivative(x, _node) { (Real::one() - x.powi(2)).pow_const(rational(-1, 2)) },
    }
    Acos {
        eval(v) { v.acos() },
        derivative(x, _node) { -(Real::one() - x.powi(2)).pow_const(rational(-1, 2)) },
    }
    Atan {
        eval(v) { v.atan() },
        derivative(x, _node) { (x.powi(2) + Real::one()).recip() },
    }
    Sinh {
        eval(v) { v.sinh() },
        derivative(x, _node) { x.cosh() },
    }
    Cosh {
        eval(v) { v.cosh() },
        derivative(x, _node) { x.sinh() },
    }
    Tanh {
        eval(v) { v.tanh() },
        derivative(_x, node) { Real::one() - node.powi(2) },
    }
}

impl UnaryOp {
    /// The exact result for the few inputs where one exists without going through a float.
    pub fn eval_exact(self, x: &BigRational) -> Option<BigRational> {
        match self {
            UnaryOp::Abs => Some(x.abs()),
            UnaryOp::Exp if x.is_zero() => Some(BigRational::one()),
            UnaryOp::Log if x.is_one() => Some(BigRational::zero()),
            UnaryOp::Sin | UnaryOp::Tan | UnaryOp::Sinh | UnaryOp::Tanh | UnaryOp::Asin | UnaryOp::Atan
                if x.is_zero() =>
            {
                Some(BigRational::zero())
            }
            UnaryOp::Cos | UnaryOp::Cosh if x.is_zero() => Some(BigRational::one()),
            _ => None,
        }
    }

    /// Evaluate on a decimal, staying exact where [`UnaryOp::eval_exact`] applies.
    pub fn eval(self, x: &Decimal) -> Result<Decimal, EvalError> {
        match x {
            Decimal::Finite(r) => match self.eval_exact(r) {
                Some(v) => Ok(Decimal::Finite(v)),
                None => x.map_f64(self.name(), |v| self.eval_f64(v)),
            },
            _ if self == UnaryOp::Abs => Ok(x.abs()),
            _ => x.map_f64(self.name(), |v| self.eval_f64(v)),
        }
    }
}
