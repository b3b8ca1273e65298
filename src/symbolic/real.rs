//! Numeric scalars that symbolic expressions evaluate into.
//!
//! Evaluation is generic over [`Real`], so the same expression can be
//! computed with plain `f64` or, with the `autodiff` feature, with
//! `num_dual::Dual64` to carry first derivatives along.

use std::ops::{Add, Div, Mul, Neg, Sub};

/// Scalar type an expression can be evaluated into.
///
/// | Method | Description |
/// |--------|-------------|
/// | `re(&self)` | Real part, used for comparisons |
/// | `exp(self)` | Exponential function |
/// | `pow(self, e)` | Power with a (possibly varying) exponent |
/// | `fmin(self, o)` | Minimum, ignoring a NaN operand |
/// | `fmax(self, o)` | Maximum, ignoring a NaN operand |
pub trait Real:
    nalgebra::Scalar
    + Copy
    + From<f64>
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    /// Real (non-derivative) part.
    fn re(&self) -> f64;

    /// Exponential function.
    fn exp(self) -> Self;

    /// Raises `self` to the power `exponent`.
    fn pow(self, exponent: Self) -> Self;

    /// Minimum of two values; a NaN operand is ignored.
    fn fmin(self, other: Self) -> Self {
        if other.re().is_nan() || self.re() <= other.re() {
            self
        } else {
            other
        }
    }

    /// Maximum of two values; a NaN operand is ignored.
    fn fmax(self, other: Self) -> Self {
        if other.re().is_nan() || self.re() >= other.re() {
            self
        } else {
            other
        }
    }
}

impl Real for f64 {
    fn re(&self) -> f64 {
        *self
    }

    fn exp(self) -> Self {
        f64::exp(self)
    }

    fn pow(self, exponent: Self) -> Self {
        self.powf(exponent)
    }
}

#[cfg(feature = "autodiff")]
impl Real for num_dual::Dual64 {
    fn re(&self) -> f64 {
        self.re
    }

    fn exp(self) -> Self {
        num_dual::DualNum::<f64>::exp(&self)
    }

    fn pow(self, exponent: Self) -> Self {
        if exponent.eps == 0.0 {
            let n = exponent.re;
            let value = self.re.powf(n);
            // at a zero base, d(x^n) is finite only for n >= 1
            let eps = if self.eps == 0.0 || n == 0.0 {
                0.0
            } else if self.re == 0.0 && n == 1.0 {
                self.eps
            } else if self.re == 0.0 && n > 1.0 {
                0.0
            } else {
                n * self.re.powf(n - 1.0) * self.eps
            };
            num_dual::Dual64::new(value, eps)
        } else {
            // d(a^b) needs ln(a); only reached when the exponent is itself seeded
            num_dual::DualNum::<f64>::exp(&(exponent * num_dual::DualNum::<f64>::ln(&self)))
        }
    }
}
