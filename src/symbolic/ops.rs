//! Operator tags shared by both expression backends.

use std::fmt;

use super::Real;

/// Element-wise unary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Exp,
}

impl UnaryOp {
    /// Applies the operation to a numeric value.
    pub fn apply<R: Real>(self, x: R) -> R {
        match self {
            UnaryOp::Neg => -x,
            UnaryOp::Exp => x.exp(),
        }
    }

    pub(crate) fn fmt_with(
        self,
        f: &mut fmt::Formatter<'_>,
        arg: &dyn fmt::Display,
    ) -> fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "(-{})", arg),
            UnaryOp::Exp => write!(f, "exp({})", arg),
        }
    }
}

/// Element-wise binary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Fmin,
    Fmax,
}

impl BinaryOp {
    /// Applies the operation to two numeric values.
    pub fn apply<R: Real>(self, a: R, b: R) -> R {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Pow => a.pow(b),
            BinaryOp::Fmin => a.fmin(b),
            BinaryOp::Fmax => a.fmax(b),
        }
    }

    pub(crate) fn fmt_with(
        self,
        f: &mut fmt::Formatter<'_>,
        a: &dyn fmt::Display,
        b: &dyn fmt::Display,
    ) -> fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "({}+{})", a, b),
            BinaryOp::Sub => write!(f, "({}-{})", a, b),
            BinaryOp::Mul => write!(f, "({}*{})", a, b),
            BinaryOp::Div => write!(f, "({}/{})", a, b),
            BinaryOp::Pow => write!(f, "pow({},{})", a, b),
            BinaryOp::Fmin => write!(f, "fmin({},{})", a, b),
            BinaryOp::Fmax => write!(f, "fmax({},{})", a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_apply() {
        assert_eq!(BinaryOp::Sub.apply(5.0, 2.0), 3.0);
        assert_eq!(BinaryOp::Fmin.apply(5.0, 2.0), 2.0);
        assert_eq!(BinaryOp::Fmax.apply(5.0, 2.0), 5.0);
        assert!((BinaryOp::Pow.apply(9.0, 0.5) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_unary_apply() {
        assert_eq!(UnaryOp::Neg.apply(4.0), -4.0);
        assert!((UnaryOp::Exp.apply(1.0) - std::f64::consts::E).abs() < 1e-12);
    }
}
