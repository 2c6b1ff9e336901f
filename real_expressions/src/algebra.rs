//! Canonicalizing arithmetic on [`Real`].
//!
//! Sums collapse into a single [`Line`](crate::real::Line), products and constant powers into a
//! single [`LogLine`](crate::real::LogLine), so repeated sub-expressions merge their coefficients
//! instead of nesting. Constants fold only when the result is exact and defined; anything else is
//! left as a node and reported by the evaluator.

use num_rational::BigRational;
use num_traits::{One, Zero};

use crate::decimal::{Decimal, integer};
use crate::real::{Real, RealKind, Terms};
use crate::unary::UnaryOp;

#[derive(Default)]
struct LineBuilder {
    terms: Terms,
    bias: BigRational,
}

impl LineBuilder {
    fn push(&mut self, x: &Real, scale: &BigRational) {
        match x.kind() {
            RealKind::Constant(c) => self.bias += c * scale,
            RealKind::Line(line) => {
                for (term, coefficient) in &line.terms {
                    self.push_term(term, coefficient * scale);
                }
                self.bias += &line.bias * scale;
            }
            _ => self.push_term(x, scale.clone()),
        }
    }

    fn push_term(&mut self, term: &Real, coefficient: BigRational) {
        *self.terms.entry(term.clone()).or_insert_with(BigRational::zero) += coefficient;
    }

    fn build(mut self) -> Real {
        self.terms.retain(|_, c| !c.is_zero());
        if self.terms.is_empty() {
            return Real::constant(self.bias);
        }
        if self.bias.is_zero() && self.terms.len() == 1 && self.terms[0].is_one() {
            let (term, _) = self.terms.swap_remove_index(0).expect("one term");
            return term;
        }
        Real::line_node(self.terms, self.bias)
    }
}

#[derive(Default)]
struct LogLineBuilder {
    terms: Terms,
}

impl LogLineBuilder {
    fn push(&mut self, x: &Real, exponent: &BigRational) {
        match x.kind() {
            // (a^e)^k = a^(e*k) only holds for whole k.
            RealKind::LogLine(log_line) if exponent.is_integer() => {
                for (term, e) in &log_line.terms {
                    self.push_term(term, e * exponent);
                }
            }
            _ => self.push_term(x, exponent.clone()),
        }
    }

    fn push_term(&mut self, term: &Real, exponent: BigRational) {
        *self.terms.entry(term.clone()).or_insert_with(BigRational::zero) += exponent;
    }

    fn build(mut self) -> Real {
        self.terms.retain(|_, e| !e.is_zero());
        if self.terms.is_empty() {
            return Real::one();
        }
        if self.terms.len() == 1 && self.terms[0].is_one() {
            let (term, _) = self.terms.swap_remove_index(0).expect("one term");
            return term;
        }
        Real::log_line_node(self.terms)
    }
}

/// Split `k * t` into `(t, k)`.
fn split_scale(x: &Real) -> (Real, BigRational) {
    if let RealKind::Line(line) = x.kind() {
        if line.bias.is_zero() && line.terms.len() == 1 {
            let (term, k) = line.terms.get_index(0).expect("one term");
            return (term.clone(), k.clone());
        }
    }
    (x.clone(), BigRational::one())
}

pub(crate) fn add(a: &Real, b: &Real) -> Real {
    if let (Some(x), Some(y)) = (a.as_constant(), b.as_constant()) {
        return Real::constant(x + y);
    }
    let one = BigRational::one();
    let mut builder = LineBuilder::default();
    builder.push(a, &one);
    builder.push(b, &one);
    builder.build()
}

pub(crate) fn sub(a: &Real, b: &Real) -> Real {
    add(a, &b.scale(&-BigRational::one()))
}

pub(crate) fn mul(a: &Real, b: &Real) -> Real {
    match (a.as_constant(), b.as_constant()) {
        (Some(x), Some(y)) => Real::constant(x * y),
        (Some(k), None) => b.scale(k),
        (None, Some(k)) => a.scale(k),
        (None, None) => {
            let (ta, ka) = split_scale(a);
            let (tb, kb) = split_scale(b);
            let one = BigRational::one();
            let mut builder = LogLineBuilder::default();
            builder.push(&ta, &one);
            builder.push(&tb, &one);
            builder.build().scale(&(ka * kb))
        }
    }
}

pub(crate) fn div(a: &Real, b: &Real) -> Real {
    mul(a, &b.recip())
}

impl Real {
    /// `k * self`
    pub fn scale(&self, k: &BigRational) -> Real {
        if k.is_zero() {
            // `0 * inf` is undefined, so it stays a node for the evaluator to reject.
            if matches!(self.kind(), RealKind::Infinity | RealKind::NegInfinity) {
                return Real::line_node([(self.clone(), k.clone())], BigRational::zero());
            }
            return Real::zero();
        }
        if k.is_one() {
            return self.clone();
        }
        if let Some(c) = self.as_constant() {
            return Real::constant(c * k);
        }
        let mut builder = LineBuilder::default();
        builder.push(self, k);
        builder.build()
    }

    /// `self ^ exponent` for a constant exponent.
    pub fn pow_const(&self, exponent: BigRational) -> Real {
        if exponent.is_zero() {
            return Real::one();
        }
        if exponent.is_one() {
            return self.clone();
        }
        if let Some(c) = self.as_constant() {
            if let Some(e) = Decimal::from(&exponent).as_small_integer() {
                if let Ok(v) = Decimal::from(c).powi(e) {
                    return Real::constant(v);
                }
            }
            return Real::log_line_node([(self.clone(), exponent)]);
        }
        if exponent.is_integer() {
            let (term, k) = split_scale(self);
            if !k.is_one() {
                if let Some(e) = Decimal::from(&exponent).as_small_integer() {
                    if let Ok(Decimal::Finite(ke)) = Decimal::from(k).powi(e) {
                        return term.pow_const(exponent).scale(&ke);
                    }
                }
            }
        }
        let mut builder = LogLineBuilder::default();
        builder.push(self, &exponent);
        builder.build()
    }

    pub fn powi(&self, exponent: i64) -> Real {
        self.pow_const(integer(exponent))
    }

    /// `self ^ exponent`; constant exponents canonicalize into a log-line.
    pub fn pow(&self, exponent: &Real) -> Real {
        match exponent.as_constant() {
            Some(e) => self.pow_const(e.clone()),
            None => Real::pow_node(self.clone(), exponent.clone()),
        }
    }

    pub fn recip(&self) -> Real {
        self.pow_const(-BigRational::one())
    }

    pub fn unary(&self, op: UnaryOp) -> Real {
        if let Some(v) = self.as_constant().and_then(|c| op.eval_exact(c)) {
            return Real::constant(v);
        }
        Real::unary_node(self.clone(), op)
    }

    /// Sum of any number of expressions, as one canonical line.
    pub fn sum<'a>(items: impl IntoIterator<Item = &'a Real>) -> Real {
        let one = BigRational::one();
        let mut builder = LineBuilder::default();
        for x in items {
            builder.push(x, &one);
        }
        builder.build()
    }

    /// `max(a, b)`, selecting `a` when the comparison is `1`.
    pub fn max(&self, other: &Real) -> Real {
        let c = Real::compare(self, other);
        Real::if_(&(c - Real::one()), other, self)
    }

    /// `min(a, b)`, selecting `a` when the comparison is `-1`.
    pub fn min(&self, other: &Real) -> Real {
        let c = Real::compare(self, other);
        Real::if_(&(c + Real::one()), other, self)
    }

    /// Numerically stable `log(sum(exp(x)))`.
    ///
    /// Panics if `items` is empty.
    pub fn log_sum_exp(items: &[Real]) -> Real {
        let (first, rest) = items.split_first().expect("log_sum_exp of no terms");
        if rest.is_empty() {
            return first.clone();
        }
        let m = rest.iter().fold(first.clone(), |acc, x| acc.max(x));
        let shifted: Vec<Real> = items.iter().map(|x| (x - &m).exp()).collect();
        &m + &Real::sum(&shifted).log()
    }

    /// `1` if `self > other`, else `0`.
    pub fn gt(&self, other: &Real) -> Real {
        let c = Real::compare(self, other);
        Real::if_(&(c - Real::one()), &Real::zero(), &Real::one())
    }

    /// `1` if `self < other`, else `0`.
    pub fn lt(&self, other: &Real) -> Real {
        other.gt(self)
    }

    /// `1` if `self == other`, else `0`.
    pub fn eq_test(&self, other: &Real) -> Real {
        let c = Real::compare(self, other);
        Real::if_(&c, &Real::zero(), &Real::one())
    }
}

macro_rules! unary_wrappers {
    ($( $fname:ident => $Op:ident ),* $(,)?) => {
        impl Real {
            $(
                #[inline]
                #[must_use]
                pub fn $fname(&self) -> Real {
                    self.unary(UnaryOp::$Op)
                }
            )*
        }
    };
}

unary_wrappers! {
    exp => Exp,
    log => Log,
    abs => Abs,
    sin => Sin,
    cos => Cos,
    tan => Tan,
    asin => Asin,
    acos => Acos,
    atan => Atan,
    sinh => Sinh,
    cosh => Cosh,
    tanh => Tanh,
}

macro_rules! impl_real_binop {
    ($Trait:ident, $method:ident, $build:ident) => {
        impl core::ops::$Trait<Real> for Real {
            type Output = Real;

            fn $method(self, rhs: Real) -> Real {
                $build(&self, &rhs)
            }
        }

        impl core::ops::$Trait<&Real> for Real {
            type Output = Real;

            fn $method(self, rhs: &Real) -> Real {
                $build(&self, rhs)
            }
        }

        impl core::ops::$Trait<Real> for &Real {
            type Output = Real;

            fn $method(self, rhs: Real) -> Real {
                $build(self, &rhs)
            }
        }

        impl core::ops::$Trait<&Real> for &Real {
            type Output = Real;

            fn $method(self, rhs: &Real) -> Real {
                $build(self, rhs)
            }
        }
    };
}

impl_real_binop!(Add, add, add);
impl_real_binop!(Sub, sub, sub);
impl_real_binop!(Mul, mul, mul);
impl_real_binop!(Div, div, div);

macro_rules! impl_scalar_binop {
    ($Trait:ident, $method:ident, $build:ident, $($Scalar:ty),*) => {
        $(
            impl core::ops::$Trait<$Scalar> for Real {
                type Output = Real;

                fn $method(self, rhs: $Scalar) -> Real {
                    $build(&self, &Real::constant(rhs))
                }
            }

            impl core::ops::$Trait<$Scalar> for &Real {
                type Output = Real;

                fn $method(self, rhs: $Scalar) -> Real {
                    $build(self, &Real::constant(rhs))
                }
            }
        )*
    };
}

impl_scalar_binop!(Add, add, add, i64, Decimal);
impl_scalar_binop!(Sub, sub, sub, i64, Decimal);
impl_scalar_binop!(Mul, mul, mul, i64, Decimal);
impl_scalar_binop!(Div, div, div, i64, Decimal);

impl core::ops::Neg for Real {
    type Output = Real;

    fn neg(self) -> Real {
        self.scale(&-BigRational::one())
    }
}

impl core::ops::Neg for &Real {
    type Output = Real;

    fn neg(self) -> Real {
        self.scale(&-BigRational::one())
    }
}
