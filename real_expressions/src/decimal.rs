//! Exact numeric values.
//!
//! A [`Decimal`] is either an arbitrary-precision rational or one of the two signed infinities.
//! Arithmetic that stays inside the rationals is exact; elementary functions and fractional
//! powers go through `f64` and come back as the exact rational value of the float result.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::error::EvalError;

/// Build an exact integer coefficient.
pub fn integer(n: i64) -> BigRational {
    BigRational::from_integer(BigInt::from(n))
}

/// Build an exact `numer / denom` coefficient.
///
/// Panics if `denom` is zero.
pub fn rational(numer: i64, denom: i64) -> BigRational {
    assert!(denom != 0, "rational with zero denominator");
    BigRational::new(BigInt::from(numer), BigInt::from(denom))
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Decimal {
    Finite(BigRational),
    Infinity,
    NegInfinity,
}

impl Decimal {
    pub fn zero() -> Self {
        Decimal::Finite(BigRational::zero())
    }

    pub fn one() -> Self {
        Decimal::Finite(BigRational::one())
    }

    pub fn ratio(numer: i64, denom: i64) -> Self {
        Decimal::Finite(rational(numer, denom))
    }

    /// The exact value of a float. NaN has no decimal value.
    pub fn from_f64(v: f64) -> Option<Self> {
        if v.is_nan() {
            None
        } else if v == f64::INFINITY {
            Some(Decimal::Infinity)
        } else if v == f64::NEG_INFINITY {
            Some(Decimal::NegInfinity)
        } else {
            BigRational::from_float(v).map(Decimal::Finite)
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Decimal::Finite(r) => r.to_f64().unwrap_or_else(|| {
                // Magnitude beyond f64 range.
                if r.is_negative() {
                    f64::NEG_INFINITY
                } else {
                    f64::INFINITY
                }
            }),
            Decimal::Infinity => f64::INFINITY,
            Decimal::NegInfinity => f64::NEG_INFINITY,
        }
    }

    pub fn as_rational(&self) -> Option<&BigRational> {
        match self {
            Decimal::Finite(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, Decimal::Finite(_))
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Decimal::Finite(r) if r.is_zero())
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Decimal::Finite(r) if r.is_integer())
    }

    pub fn is_negative(&self) -> bool {
        match self {
            Decimal::Finite(r) => r.is_negative(),
            Decimal::Infinity => false,
            Decimal::NegInfinity => true,
        }
    }

    /// `-1`, `0` or `1`.
    pub fn signum(&self) -> Decimal {
        match self {
            Decimal::Finite(r) => Decimal::Finite(r.signum()),
            Decimal::Infinity => Decimal::one(),
            Decimal::NegInfinity => -Decimal::one(),
        }
    }

    pub fn abs(&self) -> Decimal {
        match self {
            Decimal::Finite(r) => Decimal::Finite(r.abs()),
            Decimal::Infinity | Decimal::NegInfinity => Decimal::Infinity,
        }
    }

    /// Round half away from zero. Infinities have no nearest integer.
    pub fn round(&self) -> Result<BigInt, EvalError> {
        match self {
            Decimal::Finite(r) => Ok(r.round().to_integer()),
            _ => Err(EvalError::domain("round", &[self])),
        }
    }

    pub fn checked_add(&self, rhs: &Decimal) -> Result<Decimal, EvalError> {
        match (self, rhs) {
            (Decimal::Finite(a), Decimal::Finite(b)) => Ok(Decimal::Finite(a + b)),
            (Decimal::Infinity, Decimal::NegInfinity) | (Decimal::NegInfinity, Decimal::Infinity) => {
                Err(EvalError::domain("add", &[self, rhs]))
            }
            (Decimal::Infinity, _) | (_, Decimal::Infinity) => Ok(Decimal::Infinity),
            (Decimal::NegInfinity, _) | (_, Decimal::NegInfinity) => Ok(Decimal::NegInfinity),
        }
    }

    pub fn checked_sub(&self, rhs: &Decimal) -> Result<Decimal, EvalError> {
        self.checked_add(&-rhs)
    }

    pub fn checked_mul(&self, rhs: &Decimal) -> Result<Decimal, EvalError> {
        match (self, rhs) {
            (Decimal::Finite(a), Decimal::Finite(b)) => Ok(Decimal::Finite(a * b)),
            _ if self.is_zero() || rhs.is_zero() => Err(EvalError::domain("mul", &[self, rhs])),
            _ => Ok(signed_infinity(self.is_negative() != rhs.is_negative())),
        }
    }

    pub fn checked_div(&self, rhs: &Decimal) -> Result<Decimal, EvalError> {
        match (self, rhs) {
            _ if rhs.is_zero() => Err(EvalError::domain("div", &[self, rhs])),
            (Decimal::Finite(a), Decimal::Finite(b)) => Ok(Decimal::Finite(a / b)),
            (Decimal::Finite(_), _) => Ok(Decimal::zero()),
            (_, Decimal::Finite(_)) => Ok(signed_infinity(self.is_negative() != rhs.is_negative())),
            _ => Err(EvalError::domain("div", &[self, rhs])),
        }
    }

    /// Exact integer power by repeated multiplication. Valid for negative bases.
    pub fn powi(&self, exponent: i32) -> Result<Decimal, EvalError> {
        match self {
            Decimal::Finite(r) => {
                let magnitude = num_traits::pow(r.clone(), exponent.unsigned_abs() as usize);
                if exponent >= 0 {
                    Ok(Decimal::Finite(magnitude))
                } else if magnitude.is_zero() {
                    Err(EvalError::domain("pow", &[self, &Decimal::from(exponent)]))
                } else {
                    Ok(Decimal::Finite(magnitude.recip()))
                }
            }
            _ if exponent == 0 => Ok(Decimal::one()),
            _ if exponent < 0 => Ok(Decimal::zero()),
            Decimal::Infinity => Ok(Decimal::Infinity),
            Decimal::NegInfinity => Ok(signed_infinity(exponent.is_odd())),
        }
    }

    /// General power. Whole exponents are valid for negative bases: small ones are exact, larger
    /// ones take their magnitude from `f64` and their sign from the exponent's parity. Fractional
    /// exponents need a non-negative base.
    pub fn powf(&self, exponent: &Decimal) -> Result<Decimal, EvalError> {
        if let Some(e) = exponent.as_small_integer() {
            return self.powi(e);
        }
        match exponent {
            Decimal::Finite(r) if r.is_integer() => {
                let e = r.to_integer();
                if self.is_zero() && e.is_negative() {
                    return Err(EvalError::domain("pow", &[self, exponent]));
                }
                let magnitude = self.to_f64().abs().powf(e.to_f64().unwrap_or(f64::NAN));
                let v = if self.is_negative() && e.is_odd() { -magnitude } else { magnitude };
                Decimal::from_f64(v).ok_or_else(|| EvalError::domain("pow", &[self, exponent]))
            }
            _ => {
                if self.is_negative() {
                    return Err(EvalError::domain("pow", &[self, exponent]));
                }
                let v = self.to_f64().powf(exponent.to_f64());
                Decimal::from_f64(v).ok_or_else(|| EvalError::domain("pow", &[self, exponent]))
            }
        }
    }

    /// Apply a floating-point function, rejecting NaN results.
    pub fn map_f64(&self, op: &'static str, f: impl FnOnce(f64) -> f64) -> Result<Decimal, EvalError> {
        Decimal::from_f64(f(self.to_f64())).ok_or_else(|| EvalError::domain(op, &[self]))
    }

    /// A whole exponent small enough for [`Decimal::powi`] to compute exactly.
    pub(crate) fn as_small_integer(&self) -> Option<i32> {
        match self {
            Decimal::Finite(r) if r.is_integer() => r
                .to_integer()
                .to_i32()
                .filter(|e| e.unsigned_abs() <= EXACT_POW_LIMIT),
            _ => None,
        }
    }
}

/// Largest exponent magnitude raised exactly.
pub(crate) const EXACT_POW_LIMIT: u32 = 4096;

fn signed_infinity(negative: bool) -> Decimal {
    if negative {
        Decimal::NegInfinity
    } else {
        Decimal::Infinity
    }
}

impl core::ops::Neg for Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        -&self
    }
}

impl core::ops::Neg for &Decimal {
    type Output = Decimal;

    fn neg(self) -> Decimal {
        match self {
            Decimal::Finite(r) => Decimal::Finite(-r),
            Decimal::Infinity => Decimal::NegInfinity,
            Decimal::NegInfinity => Decimal::Infinity,
        }
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Decimal::Finite(a), Decimal::Finite(b)) => a.cmp(b),
            (Decimal::Infinity, Decimal::Infinity) | (Decimal::NegInfinity, Decimal::NegInfinity) => {
                Ordering::Equal
            }
            (Decimal::NegInfinity, _) | (_, Decimal::Infinity) => Ordering::Less,
            (Decimal::Infinity, _) | (_, Decimal::NegInfinity) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i32> for Decimal {
    fn from(v: i32) -> Self {
        Decimal::Finite(integer(i64::from(v)))
    }
}

impl From<i64> for Decimal {
    fn from(v: i64) -> Self {
        Decimal::Finite(integer(v))
    }
}

impl From<BigInt> for Decimal {
    fn from(v: BigInt) -> Self {
        Decimal::Finite(BigRational::from_integer(v))
    }
}

impl From<BigRational> for Decimal {
    fn from(v: BigRational) -> Self {
        Decimal::Finite(v)
    }
}

impl From<&BigRational> for Decimal {
    fn from(v: &BigRational) -> Self {
        Decimal::Finite(v.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseDecimalError(String);

impl fmt::Display for ParseDecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid decimal literal {:?}", self.0)
    }
}

impl std::error::Error for ParseDecimalError {}

/// Accepts `"-3"`, `"2.5"`, `"1/3"`, `"inf"` and `"-inf"`. Decimal notation is exact.
impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDecimalError(s.to_string());
        let t = s.trim();
        match t {
            "inf" | "+inf" => return Ok(Decimal::Infinity),
            "-inf" => return Ok(Decimal::NegInfinity),
            _ => {}
        }

        if let Some((n, d)) = t.split_once('/') {
            let n: BigInt = n.trim().parse().map_err(|_| err())?;
            let d: BigInt = d.trim().parse().map_err(|_| err())?;
            if d.is_zero() {
                return Err(err());
            }
            return Ok(Decimal::Finite(BigRational::new(n, d)));
        }

        let (negative, body) = match t.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, t.strip_prefix('+').unwrap_or(t)),
        };
        let (whole, frac) = body.split_once('.').unwrap_or((body, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(err());
        }
        if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return Err(err());
        }

        let digits = format!("{whole}{frac}");
        let numer: BigInt = digits.parse().map_err(|_| err())?;
        let denom = num_traits::pow(BigInt::from(10), frac.len());
        let value = BigRational::new(numer, denom);
        Ok(Decimal::Finite(if negative { -value } else { value }))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decimal::Finite(r) if r.is_integer() => write!(f, "{}", r.numer()),
            Decimal::Finite(r) => match terminating_digits(r) {
                Some(s) => f.write_str(&s),
                None => write!(f, "{}/{}", r.numer(), r.denom()),
            },
            Decimal::Infinity => f.write_str("inf"),
            Decimal::NegInfinity => f.write_str("-inf"),
        }
    }
}

/// Decimal expansion of `r` if its denominator only has factors 2 and 5.
fn terminating_digits(r: &BigRational) -> Option<String> {
    let two = BigInt::from(2);
    let five = BigInt::from(5);
    let mut d = r.denom().clone();
    let (mut twos, mut fives) = (0usize, 0usize);
    while d.is_multiple_of(&two) {
        d /= &two;
        twos += 1;
    }
    while d.is_multiple_of(&five) {
        d /= &five;
        fives += 1;
    }
    if !d.is_one() {
        return None;
    }

    let scale = twos.max(fives);
    let scaled = (r.abs() * BigRational::from_integer(num_traits::pow(BigInt::from(10), scale))).to_integer();
    let mut digits = scaled.to_string();
    if digits.len() <= scale {
        digits = format!("{}{digits}", "0".repeat(scale + 1 - digits.len()));
    }
    let split = digits.len() - scale;
    let sign = if r.is_negative() { "-" } else { "" };
    Some(format!("{sign}{}.{}", &digits[..split], &digits[split..]))
}
