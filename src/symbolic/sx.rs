//! Eager, element-wise scalar expressions.
//!
//! An [`Sx`] is a dense matrix whose every element is its own scalar
//! expression tree. Operations are expanded element by element when they are
//! built, and operations whose operands are all constants are folded.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::sync::Arc;

use nalgebra::DMatrix;

use super::ops::{BinaryOp, UnaryOp};
use super::{broadcast_zip, Env, Real, Shape, SymKind, SymbolicValue};
use crate::error::MetanetResult;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Const(f64),
    /// Element `index` of variable `var`
    Sym { var: Arc<str>, shape: Shape, index: usize, label: Arc<str> },
    Unary(UnaryOp, Elem),
    Binary(BinaryOp, Elem, Elem),
}

/// One scalar expression tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Elem(Arc<Node>);

impl Elem {
    fn constant(value: f64) -> Self {
        Elem(Arc::new(Node::Const(value)))
    }

    fn unary(op: UnaryOp, a: &Elem) -> Self {
        match *a.0 {
            Node::Const(x) => Elem::constant(op.apply(x)),
            _ => Elem(Arc::new(Node::Unary(op, a.clone()))),
        }
    }

    fn binary(op: BinaryOp, a: &Elem, b: &Elem) -> Self {
        match (&*a.0, &*b.0) {
            (Node::Const(x), Node::Const(y)) => Elem::constant(op.apply(*x, *y)),
            _ => Elem(Arc::new(Node::Binary(op, a.clone(), b.clone()))),
        }
    }

    fn eval<R: Real>(&self, env: &Env<R>, cache: &mut HashMap<*const Node, R>) -> MetanetResult<R> {
        let key = Arc::as_ptr(&self.0);
        if let Some(&value) = cache.get(&key) {
            return Ok(value);
        }
        let value = match &*self.0 {
            Node::Const(x) => R::from(*x),
            Node::Sym { var, shape, index, .. } => env.lookup(var, *shape)?[*index],
            Node::Unary(op, a) => op.apply(a.eval(env, cache)?),
            Node::Binary(op, a, b) => {
                let x = a.eval(env, cache)?;
                let y = b.eval(env, cache)?;
                op.apply(x, y)
            }
        };
        cache.insert(key, value);
        Ok(value)
    }
}

impl fmt::Display for Elem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            Node::Const(x) => write!(f, "{}", x),
            Node::Sym { label, .. } => f.write_str(label),
            Node::Unary(op, a) => op.fmt_with(f, a),
            Node::Binary(op, a, b) => op.fmt_with(f, a, b),
        }
    }
}

/// Matrix of scalar expressions.
///
/// # Examples
///
/// ```
/// use sym_metanet::symbolic::{var, Sx};
///
/// let q: Sx = var("q", &[2]).unwrap();
/// assert_eq!(q.to_string(), "[q_0, q_1]");
/// assert_eq!((Sx::from(2.0) * Sx::from(3.0)).to_string(), "6");
/// ```
#[derive(Clone, PartialEq)]
pub struct Sx {
    elems: DMatrix<Elem>,
}

impl Sx {
    fn from_elems(elems: DMatrix<Elem>) -> Self {
        Sx { elems }
    }

    fn map(&self, f: impl FnMut(&Elem) -> Elem) -> Self {
        let values = self.elems.iter().map(f).collect();
        Sx::from_elems(DMatrix::from_vec(self.elems.nrows(), self.elems.ncols(), values))
    }

    fn zip(&self, other: &Sx, op: BinaryOp) -> Self {
        Sx::from_elems(broadcast_zip(&self.elems, &other.elems, |a, b| Elem::binary(op, a, b)))
    }

    /// Returns the constant value if this is a folded 1x1 constant.
    pub fn as_constant(&self) -> Option<f64> {
        if !self.shape().is_scalar() {
            return None;
        }
        match *self.elems[0].0 {
            Node::Const(x) => Some(x),
            _ => None,
        }
    }
}

impl SymbolicValue for Sx {
    const KIND: SymKind = SymKind::Sx;

    fn sym(name: &str, shape: Shape) -> Self {
        let var: Arc<str> = Arc::from(name);
        let elems = DMatrix::from_fn(shape.nrows, shape.ncols, |i, j| {
            let index = i + j * shape.nrows;
            let label: Arc<str> = if shape.is_scalar() {
                var.clone()
            } else {
                Arc::from(format!("{}_{}", name, index))
            };
            Elem(Arc::new(Node::Sym { var: var.clone(), shape, index, label }))
        });
        Sx::from_elems(elems)
    }

    fn shape(&self) -> Shape {
        Shape::new(self.elems.nrows(), self.elems.ncols())
    }

    fn exp(&self) -> Self {
        self.map(|e| Elem::unary(UnaryOp::Exp, e))
    }

    fn pow(&self, exponent: &Self) -> Self {
        self.zip(exponent, BinaryOp::Pow)
    }

    fn fmin(&self, other: &Self) -> Self {
        self.zip(other, BinaryOp::Fmin)
    }

    fn fmax(&self, other: &Self) -> Self {
        self.zip(other, BinaryOp::Fmax)
    }

    fn sum1(&self) -> Self {
        let nrows = self.elems.nrows();
        let elems = DMatrix::from_fn(1, self.elems.ncols(), |_, j| {
            (0..nrows)
                .map(|i| self.elems[(i, j)].clone())
                .reduce(|acc, e| Elem::binary(BinaryOp::Add, &acc, &e))
                .unwrap_or_else(|| Elem::constant(0.0))
        });
        Sx::from_elems(elems)
    }

    fn t(&self) -> Self {
        Sx::from_elems(self.elems.transpose())
    }

    fn mtimes(&self, rhs: &Self) -> Self {
        let (n, k) = self.elems.shape();
        let (k2, m) = rhs.elems.shape();
        assert_eq!(k, k2, "mtimes dimension mismatch: {} vs {}", self.shape(), rhs.shape());
        let elems = DMatrix::from_fn(n, m, |i, j| {
            (0..k)
                .map(|p| Elem::binary(BinaryOp::Mul, &self.elems[(i, p)], &rhs.elems[(p, j)]))
                .reduce(|acc, e| Elem::binary(BinaryOp::Add, &acc, &e))
                .unwrap_or_else(|| Elem::constant(0.0))
        });
        Sx::from_elems(elems)
    }

    fn at(&self, index: usize) -> Self {
        assert!(index < self.numel(), "index {} out of range for shape {}", index, self.shape());
        Sx::from_elems(DMatrix::from_element(1, 1, self.elems[index].clone()))
    }

    fn with_at(&self, index: usize, value: &Self) -> Self {
        assert!(index < self.numel(), "index {} out of range for shape {}", index, self.shape());
        assert!(value.shape().is_scalar(), "assigned value must be 1x1, got {}", value.shape());
        let mut elems = self.elems.clone();
        elems[index] = value.elems[0].clone();
        Sx::from_elems(elems)
    }

    fn eval<R: Real>(&self, env: &Env<R>) -> MetanetResult<DMatrix<R>> {
        let mut cache = HashMap::new();
        let values =
            self.elems.iter().map(|e| e.eval(env, &mut cache)).collect::<MetanetResult<Vec<R>>>()?;
        Ok(DMatrix::from_vec(self.elems.nrows(), self.elems.ncols(), values))
    }
}

impl From<f64> for Sx {
    fn from(value: f64) -> Self {
        Sx::from_elems(DMatrix::from_element(1, 1, Elem::constant(value)))
    }
}

macro_rules! impl_sx_binary {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait for Sx {
            type Output = Sx;

            fn $method(self, rhs: Sx) -> Sx {
                self.zip(&rhs, $op)
            }
        }
    };
}

impl_sx_binary!(Add, add, BinaryOp::Add);
impl_sx_binary!(Sub, sub, BinaryOp::Sub);
impl_sx_binary!(Mul, mul, BinaryOp::Mul);
impl_sx_binary!(Div, div, BinaryOp::Div);

impl Neg for Sx {
    type Output = Sx;

    fn neg(self) -> Sx {
        self.map(|e| Elem::unary(UnaryOp::Neg, e))
    }
}

impl fmt::Display for Sx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (nrows, ncols) = self.elems.shape();
        if nrows == 1 && ncols == 1 {
            return write!(f, "{}", self.elems[0]);
        }
        let join = |items: Vec<String>| format!("[{}]", items.join(", "));
        let text = if ncols == 1 {
            join(self.elems.iter().map(ToString::to_string).collect())
        } else {
            join(
                (0..nrows)
                    .map(|i| join((0..ncols).map(|j| self.elems[(i, j)].to_string()).collect()))
                    .collect(),
            )
        };
        f.write_str(&text)
    }
}

impl fmt::Debug for Sx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SX({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::var;

    fn eval_scalar(x: &Sx, env: &Env<f64>) -> f64 {
        x.eval(env).unwrap()[0]
    }

    #[test]
    fn test_symbol_labels() {
        let rho: Sx = var("rho", &[]).unwrap();
        assert_eq!(rho.to_string(), "rho");

        let m: Sx = var("m", &[2, 2]).unwrap();
        assert_eq!(m.to_string(), "[[m_0, m_2], [m_1, m_3]]");
        assert_eq!(format!("{:?}", rho), "SX(rho)");
    }

    #[test]
    fn test_constant_folding() {
        let x = Sx::from(3.0) * Sx::from(4.0) - Sx::from(2.0);
        assert_eq!(x.as_constant(), Some(10.0));
        assert_eq!(Sx::from(0.0).exp().as_constant(), Some(1.0));
    }

    #[test]
    fn test_scalar_broadcast() {
        let v: Sx = var("v", &[3]).unwrap();
        let scaled = v * Sx::from(2.0);
        assert_eq!(scaled.shape(), Shape::new(3, 1));
        assert_eq!(scaled.to_string(), "[(v_0*2), (v_1*2), (v_2*2)]");
    }

    #[test]
    #[should_panic(expected = "shape mismatch")]
    fn test_mismatched_shapes_panic() {
        let a: Sx = var("a", &[3]).unwrap();
        let b: Sx = var("b", &[2]).unwrap();
        let _ = a + b;
    }

    #[test]
    fn test_eval_with_bindings() {
        let x: Sx = var("x", &[]).unwrap();
        let y: Sx = var("y", &[]).unwrap();
        let expr = (x.clone() * y.clone()).fmax(&x);

        let mut env = Env::new();
        env.bind_scalar("x", 3.0).bind_scalar("y", 0.5);
        assert_eq!(eval_scalar(&expr, &env), 3.0);

        env.bind_scalar("y", 2.0);
        assert_eq!(eval_scalar(&expr, &env), 6.0);
    }

    #[test]
    fn test_eval_unbound_symbol() {
        let x: Sx = var("x", &[]).unwrap();
        let env = Env::<f64>::new();
        assert!(x.eval(&env).is_err());
    }

    #[test]
    fn test_sum1_and_mtimes() {
        let q: Sx = var("q", &[3]).unwrap();
        let mut env = Env::new();
        env.bind_vector("q", &[1.0, 2.0, 3.0]);

        assert_eq!(q.sum1().shape(), Shape::SCALAR);
        assert_eq!(eval_scalar(&q.sum1(), &env), 6.0);
        assert_eq!(eval_scalar(&q.t().mtimes(&q), &env), 14.0);
    }

    #[test]
    fn test_with_at_replaces_single_element() {
        let v: Sx = var("v", &[3]).unwrap();
        let last = v.numel() - 1;
        let w = v.with_at(last, &(v.at(last) - Sx::from(1.0)));

        let mut env = Env::new();
        env.bind_vector("v", &[5.0, 6.0, 7.0]);
        assert_eq!(w.eval(&env).unwrap().as_slice(), &[5.0, 6.0, 6.0]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_at_out_of_range() {
        let v: Sx = var("v", &[2]).unwrap();
        let _ = v.at(2);
    }
}
