//! Symbolic values the METANET equations are written against.
//!
//! Two interchangeable representations implement [`SymbolicValue`]:
//!
//! - [`Sx`]: every matrix element is its own scalar expression tree, so
//!   operations are expanded eagerly element by element.
//! - [`Mx`]: every operation is a single matrix-valued node of a computation
//!   graph.
//!
//! The two cannot be mixed: equations are generic over one `S:
//! SymbolicValue`, so every operand of a call has the same representation.
//!
//! # Example
//!
//! ```
//! use sym_metanet::symbolic::{var, Env, Sx, SymbolicValue};
//!
//! let rho: Sx = var("rho", &[2]).unwrap();
//! let doubled = rho.clone() + rho;
//!
//! let mut env = Env::new();
//! env.bind_vector("rho", &[10.0, 20.0]);
//! let value = doubled.eval(&env).unwrap();
//! assert_eq!(value[(1, 0)], 40.0);
//! ```

mod mx;
pub mod ops;
mod real;
mod sx;

use std::collections::HashMap;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

use nalgebra::DMatrix;

use crate::error::{MetanetError, MetanetResult};

pub use mx::Mx;
pub use real::Real;
pub use sx::Sx;

/// Two-dimensional shape of a symbolic value (vectors are columns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    pub nrows: usize,
    pub ncols: usize,
}

impl Shape {
    /// Scalar (1x1) shape.
    pub const SCALAR: Shape = Shape { nrows: 1, ncols: 1 };

    pub const fn new(nrows: usize, ncols: usize) -> Self {
        Shape { nrows, ncols }
    }

    /// Builds a shape from at most two dimensions.
    ///
    /// `[]` is a scalar, `[n]` a column vector and `[n, m]` a matrix.
    /// Returns `None` for three or more dimensions.
    pub fn from_dims(dims: &[usize]) -> Option<Self> {
        match *dims {
            [] => Some(Shape::SCALAR),
            [n] => Some(Shape::new(n, 1)),
            [n, m] => Some(Shape::new(n, m)),
            _ => None,
        }
    }

    /// Number of elements.
    pub fn numel(&self) -> usize {
        self.nrows * self.ncols
    }

    pub fn is_scalar(&self) -> bool {
        self.nrows == 1 && self.ncols == 1
    }

    /// Shape of an element-wise result, where a 1x1 operand broadcasts.
    pub fn broadcast(self, other: Shape) -> Option<Shape> {
        if self == other || other.is_scalar() {
            Some(self)
        } else if self.is_scalar() {
            Some(other)
        } else {
            None
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.nrows, self.ncols)
    }
}

/// The symbolic representations an engine can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymKind {
    /// Element-wise scalar expressions ([`Sx`])
    Sx,
    /// Matrix-valued computation graph ([`Mx`])
    Mx,
}

impl SymKind {
    /// Every supported kind, in the order they are reported to users.
    pub const ALL: [SymKind; 2] = [SymKind::Sx, SymKind::Mx];

    pub fn as_str(self) -> &'static str {
        match self {
            SymKind::Sx => "SX",
            SymKind::Mx => "MX",
        }
    }
}

impl fmt::Display for SymKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SymKind {
    type Err = MetanetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SymKind::ALL.into_iter().find(|kind| kind.as_str() == s).ok_or_else(|| {
            MetanetError::UnknownSymType {
                got: s.to_string(),
                valid: SymKind::ALL.map(SymKind::as_str).join(", "),
            }
        })
    }
}

/// Capability interface every symbolic representation provides.
///
/// Arithmetic operators work element-wise; a 1x1 operand broadcasts against
/// any shape. Combining two non-scalar operands of different shapes is a
/// programming error and panics, as dimension mismatches do in `nalgebra`.
/// Indices are linear and column-major.
pub trait SymbolicValue:
    Clone
    + fmt::Debug
    + fmt::Display
    + From<f64>
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    /// Representation implemented by this type.
    const KIND: SymKind;

    /// Creates a free symbol of the given shape.
    fn sym(name: &str, shape: Shape) -> Self;

    fn shape(&self) -> Shape;

    fn numel(&self) -> usize {
        self.shape().numel()
    }

    /// Element-wise exponential.
    fn exp(&self) -> Self;

    /// Element-wise power.
    fn pow(&self, exponent: &Self) -> Self;

    /// Element-wise minimum.
    fn fmin(&self, other: &Self) -> Self;

    /// Element-wise maximum.
    fn fmax(&self, other: &Self) -> Self;

    /// Column sums, as a `1 x ncols` row.
    fn sum1(&self) -> Self;

    /// Transpose.
    fn t(&self) -> Self;

    /// Matrix product.
    ///
    /// # Panics
    ///
    /// Panics if the inner dimensions differ.
    fn mtimes(&self, rhs: &Self) -> Self;

    /// Element `index` as a 1x1 value.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.numel()`.
    fn at(&self, index: usize) -> Self;

    /// Copy of `self` with element `index` replaced by the 1x1 `value`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range or `value` is not 1x1.
    fn with_at(&self, index: usize, value: &Self) -> Self;

    /// Substitutes the values bound in `env` and evaluates numerically.
    fn eval<R: Real>(&self, env: &Env<R>) -> MetanetResult<DMatrix<R>>;
}

/// Creates a named symbolic variable with at most two dimensions.
///
/// # Errors
///
/// Returns [`MetanetError::InvalidShape`] if `shape` has more than two entries.
///
/// # Examples
///
/// ```
/// use sym_metanet::symbolic::{var, Mx, SymbolicValue};
///
/// let v: Mx = var("v", &[2, 3]).unwrap();
/// assert_eq!(v.numel(), 6);
/// assert!(var::<Mx>("too_deep", &[2, 3, 4]).is_err());
/// ```
pub fn var<S: SymbolicValue>(name: &str, shape: &[usize]) -> MetanetResult<S> {
    let dims = Shape::from_dims(shape)
        .ok_or_else(|| MetanetError::InvalidShape { name: name.to_string(), ndim: shape.len() })?;
    log::trace!("creating {} variable `{}` of shape {}", S::KIND, name, dims);
    Ok(S::sym(name, dims))
}

/// Numeric values bound to variable names, used by [`SymbolicValue::eval`].
#[derive(Debug, Clone)]
pub struct Env<R: Real> {
    values: HashMap<String, DMatrix<R>>,
}

impl<R: Real> Env<R> {
    pub fn new() -> Self {
        Env { values: HashMap::new() }
    }

    /// Binds a full matrix value to `name`, replacing any previous binding.
    pub fn bind(&mut self, name: &str, value: DMatrix<R>) -> &mut Self {
        self.values.insert(name.to_string(), value);
        self
    }

    /// Binds a 1x1 value.
    pub fn bind_scalar(&mut self, name: &str, value: R) -> &mut Self {
        self.bind(name, DMatrix::from_element(1, 1, value))
    }

    /// Binds a column vector.
    pub fn bind_vector(&mut self, name: &str, values: &[R]) -> &mut Self {
        self.bind(name, DMatrix::from_column_slice(values.len(), 1, values))
    }

    pub fn get(&self, name: &str) -> Option<&DMatrix<R>> {
        self.values.get(name)
    }

    /// Iterates over bound names in arbitrary order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Looks up `name` and checks it against the variable's shape.
    pub(crate) fn lookup(&self, name: &str, shape: Shape) -> MetanetResult<&DMatrix<R>> {
        let value = self.get(name).ok_or_else(|| MetanetError::UnboundSymbol(name.to_string()))?;
        let found = Shape::new(value.nrows(), value.ncols());
        if found != shape {
            return Err(MetanetError::BindingShape {
                name: name.to_string(),
                expected: shape,
                found,
            });
        }
        Ok(value)
    }

    /// Converts every bound value into another scalar type.
    pub fn map<T: Real>(&self, mut f: impl FnMut(&str, usize, R) -> T) -> Env<T> {
        let values = self
            .values
            .iter()
            .map(|(name, value)| {
                let mapped = DMatrix::from_iterator(
                    value.nrows(),
                    value.ncols(),
                    value.iter().enumerate().map(|(k, &x)| f(name.as_str(), k, x)),
                );
                (name.clone(), mapped)
            })
            .collect();
        Env { values }
    }
}

impl<R: Real> Default for Env<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Combines two matrices element-wise, broadcasting a 1x1 operand.
///
/// # Panics
///
/// Panics if neither operand is 1x1 and the shapes differ.
pub(crate) fn broadcast_zip<T, U>(
    a: &DMatrix<T>,
    b: &DMatrix<T>,
    mut f: impl FnMut(&T, &T) -> U,
) -> DMatrix<U>
where
    T: nalgebra::Scalar,
    U: nalgebra::Scalar,
{
    let sa = Shape::new(a.nrows(), a.ncols());
    let sb = Shape::new(b.nrows(), b.ncols());
    let out = match sa.broadcast(sb) {
        Some(shape) => shape,
        None => panic!("shape mismatch in element-wise operation: {} vs {}", sa, sb),
    };
    DMatrix::from_fn(out.nrows, out.ncols, |i, j| {
        let x = if sa.is_scalar() { &a[(0, 0)] } else { &a[(i, j)] };
        let y = if sb.is_scalar() { &b[(0, 0)] } else { &b[(i, j)] };
        f(x, y)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_from_dims() {
        assert_eq!(Shape::from_dims(&[]), Some(Shape::SCALAR));
        assert_eq!(Shape::from_dims(&[3]), Some(Shape::new(3, 1)));
        assert_eq!(Shape::from_dims(&[2, 3]), Some(Shape::new(2, 3)));
        assert_eq!(Shape::from_dims(&[2, 3, 4]), None);
    }

    #[test]
    fn test_shape_broadcast() {
        let v = Shape::new(3, 1);
        assert_eq!(v.broadcast(Shape::SCALAR), Some(v));
        assert_eq!(Shape::SCALAR.broadcast(v), Some(v));
        assert_eq!(v.broadcast(Shape::new(1, 3)), None);
    }

    #[test]
    fn test_sym_kind_parse() {
        assert_eq!("SX".parse::<SymKind>().unwrap(), SymKind::Sx);
        assert_eq!("MX".parse::<SymKind>().unwrap(), SymKind::Mx);

        let err = "DX".parse::<SymKind>().unwrap_err();
        assert!(matches!(err, MetanetError::UnknownSymType { .. }));
        assert_eq!(err.to_string(), "symbolic type must be in {SX, MX}; got DX instead");
    }

    #[test]
    fn test_var_shapes() {
        let v: Sx = var("v", &[3]).unwrap();
        assert_eq!(v.shape(), Shape::new(3, 1));
        let m: Mx = var("m", &[2, 3]).unwrap();
        assert_eq!(m.shape(), Shape::new(2, 3));
        let s: Sx = var("s", &[]).unwrap();
        assert!(s.shape().is_scalar());
    }

    #[test]
    fn test_var_too_many_dims() {
        let err = var::<Sx>("x", &[2, 3, 4]).unwrap_err();
        assert_eq!(err, MetanetError::InvalidShape { name: "x".to_string(), ndim: 3 });
        assert!(var::<Mx>("x", &[1, 1, 1, 1]).is_err());
    }

    #[test]
    fn test_env_lookup_checks_shape() {
        let mut env = Env::new();
        env.bind_vector("rho", &[1.0, 2.0]);

        assert!(env.lookup("rho", Shape::new(2, 1)).is_ok());
        assert!(matches!(
            env.lookup("rho", Shape::new(3, 1)),
            Err(MetanetError::BindingShape { .. })
        ));
        assert_eq!(
            env.lookup("v", Shape::SCALAR),
            Err(MetanetError::UnboundSymbol("v".to_string()))
        );
    }

    #[test]
    fn test_env_names() {
        let mut env = Env::new();
        env.bind_scalar("w", 0.0).bind_vector("rho", &[1.0, 2.0]).bind_scalar("w", 5.0);

        let mut names: Vec<&str> = env.names().collect();
        names.sort_unstable();
        assert_eq!(names, ["rho", "w"]);
        assert_eq!(env.get("w").unwrap()[0], 5.0);
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_expressions_are_thread_safe() {
        assert_send_sync::<Sx>();
        assert_send_sync::<Mx>();
        assert_send_sync::<Env<f64>>();
    }

    #[test]
    fn test_expression_evaluated_on_another_thread() {
        let v: Sx = var("v", &[2]).unwrap();
        let doubled = v * Sx::from(2.0);
        let handle = std::thread::spawn(move || {
            let mut env = Env::new();
            env.bind_vector("v", &[1.0, 2.0]);
            doubled.eval(&env).unwrap()
        });
        assert_eq!(handle.join().unwrap().as_slice(), &[2.0, 4.0]);
    }

    #[test]
    fn test_shared_graph_read_concurrently() {
        let q: Mx = var("q", &[3]).unwrap();
        let total = q.sum1();
        let results: Vec<f64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (1..=4)
                .map(|k| {
                    let total = &total;
                    scope.spawn(move || {
                        let x = k as f64;
                        let mut env = Env::new();
                        env.bind_vector("q", &[x, x, x]);
                        total.eval(&env).unwrap()[0]
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(results, [3.0, 6.0, 9.0, 12.0]);
    }

    #[test]
    fn test_broadcast_zip() {
        let a = DMatrix::from_column_slice(3, 1, &[1.0, 2.0, 3.0]);
        let b = DMatrix::from_element(1, 1, 10.0);
        let sum = broadcast_zip(&a, &b, |x, y| x + y);
        assert_eq!(sum.as_slice(), &[11.0, 12.0, 13.0]);
    }

    #[test]
    #[should_panic(expected = "shape mismatch")]
    fn test_broadcast_zip_mismatch() {
        let a = DMatrix::from_column_slice(3, 1, &[1.0, 2.0, 3.0]);
        let b = DMatrix::from_column_slice(2, 1, &[1.0, 2.0]);
        let _ = broadcast_zip(&a, &b, |x, y| x + y);
    }
}
