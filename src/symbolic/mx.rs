//! Matrix-valued computation graphs.
//!
//! An [`Mx`] is one node of a directed acyclic graph in which every operation
//! works on whole matrices. Shapes are fixed when a node is created, so shape
//! errors surface where the expression is built rather than when it runs.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::sync::Arc;

use nalgebra::DMatrix;

use super::ops::{BinaryOp, UnaryOp};
use super::{broadcast_zip, Env, Real, Shape, SymKind, SymbolicValue};
use crate::error::MetanetResult;

#[derive(Debug)]
enum Op {
    Sym(Arc<str>),
    Const(DMatrix<f64>),
    Unary(UnaryOp, Mx),
    Binary(BinaryOp, Mx, Mx),
    Sum1(Mx),
    Transpose(Mx),
    MTimes(Mx, Mx),
    GetNz(Mx, usize),
    SetNz { base: Mx, index: usize, value: Mx },
}

#[derive(Debug)]
struct Node {
    shape: Shape,
    op: Op,
}

/// Node of a matrix expression graph.
///
/// Cloning is cheap and shares the underlying subgraph.
///
/// # Examples
///
/// ```
/// use sym_metanet::symbolic::{var, Env, Mx, SymbolicValue};
///
/// let v: Mx = var("v", &[3]).unwrap();
/// let total = v.sum1();
/// assert_eq!(total.to_string(), "sum1(v)");
///
/// let mut env = Env::new();
/// env.bind_vector("v", &[1.0, 2.0, 3.0]);
/// assert_eq!(total.eval(&env).unwrap()[0], 6.0);
/// ```
#[derive(Clone)]
pub struct Mx(Arc<Node>);

impl Mx {
    fn node(shape: Shape, op: Op) -> Self {
        Mx(Arc::new(Node { shape, op }))
    }

    fn binary(op: BinaryOp, a: &Mx, b: &Mx) -> Self {
        let shape = match a.shape().broadcast(b.shape()) {
            Some(shape) => shape,
            None => panic!(
                "shape mismatch in element-wise operation: {} vs {}",
                a.shape(),
                b.shape()
            ),
        };
        Mx::node(shape, Op::Binary(op, a.clone(), b.clone()))
    }

    fn check_index(&self, index: usize) {
        assert!(index < self.numel(), "index {} out of range for shape {}", index, self.shape());
    }

    /// Whether this node is a free symbol.
    pub fn is_symbolic(&self) -> bool {
        matches!(self.0.op, Op::Sym(_))
    }

    fn eval_node<R: Real>(
        &self,
        env: &Env<R>,
        cache: &mut HashMap<*const Node, DMatrix<R>>,
    ) -> MetanetResult<DMatrix<R>> {
        let key = Arc::as_ptr(&self.0);
        if let Some(value) = cache.get(&key) {
            return Ok(value.clone());
        }
        let value = match &self.0.op {
            Op::Sym(name) => env.lookup(name, self.shape())?.clone(),
            Op::Const(m) => m.map(R::from),
            Op::Unary(op, a) => a.eval_node(env, cache)?.map(|x| op.apply(x)),
            Op::Binary(op, a, b) => {
                let x = a.eval_node(env, cache)?;
                let y = b.eval_node(env, cache)?;
                broadcast_zip(&x, &y, |p, q| op.apply(*p, *q))
            }
            Op::Sum1(a) => {
                let x = a.eval_node(env, cache)?;
                DMatrix::from_fn(1, x.ncols(), |_, j| {
                    x.column(j).iter().fold(R::from(0.0), |acc, &e| acc + e)
                })
            }
            Op::Transpose(a) => a.eval_node(env, cache)?.transpose(),
            Op::MTimes(a, b) => {
                let x = a.eval_node(env, cache)?;
                let y = b.eval_node(env, cache)?;
                DMatrix::from_fn(x.nrows(), y.ncols(), |i, j| {
                    (0..x.ncols()).fold(R::from(0.0), |acc, p| acc + x[(i, p)] * y[(p, j)])
                })
            }
            Op::GetNz(a, index) => DMatrix::from_element(1, 1, a.eval_node(env, cache)?[*index]),
            Op::SetNz { base, index, value } => {
                let mut x = base.eval_node(env, cache)?;
                x[*index] = value.eval_node(env, cache)?[0];
                x
            }
        };
        cache.insert(key, value.clone());
        Ok(value)
    }
}

impl SymbolicValue for Mx {
    const KIND: SymKind = SymKind::Mx;

    fn sym(name: &str, shape: Shape) -> Self {
        Mx::node(shape, Op::Sym(Arc::from(name)))
    }

    fn shape(&self) -> Shape {
        self.0.shape
    }

    fn exp(&self) -> Self {
        Mx::node(self.shape(), Op::Unary(UnaryOp::Exp, self.clone()))
    }

    fn pow(&self, exponent: &Self) -> Self {
        Mx::binary(BinaryOp::Pow, self, exponent)
    }

    fn fmin(&self, other: &Self) -> Self {
        Mx::binary(BinaryOp::Fmin, self, other)
    }

    fn fmax(&self, other: &Self) -> Self {
        Mx::binary(BinaryOp::Fmax, self, other)
    }

    fn sum1(&self) -> Self {
        Mx::node(Shape::new(1, self.shape().ncols), Op::Sum1(self.clone()))
    }

    fn t(&self) -> Self {
        let Shape { nrows, ncols } = self.shape();
        Mx::node(Shape::new(ncols, nrows), Op::Transpose(self.clone()))
    }

    fn mtimes(&self, rhs: &Self) -> Self {
        let (a, b) = (self.shape(), rhs.shape());
        assert_eq!(a.ncols, b.nrows, "mtimes dimension mismatch: {} vs {}", a, b);
        Mx::node(Shape::new(a.nrows, b.ncols), Op::MTimes(self.clone(), rhs.clone()))
    }

    fn at(&self, index: usize) -> Self {
        self.check_index(index);
        Mx::node(Shape::SCALAR, Op::GetNz(self.clone(), index))
    }

    fn with_at(&self, index: usize, value: &Self) -> Self {
        self.check_index(index);
        assert!(value.shape().is_scalar(), "assigned value must be 1x1, got {}", value.shape());
        Mx::node(self.shape(), Op::SetNz { base: self.clone(), index, value: value.clone() })
    }

    fn eval<R: Real>(&self, env: &Env<R>) -> MetanetResult<DMatrix<R>> {
        self.eval_node(env, &mut HashMap::new())
    }
}

impl From<f64> for Mx {
    fn from(value: f64) -> Self {
        Mx::node(Shape::SCALAR, Op::Const(DMatrix::from_element(1, 1, value)))
    }
}

macro_rules! impl_mx_binary {
    ($trait:ident, $method:ident, $op:expr) => {
        impl $trait for Mx {
            type Output = Mx;

            fn $method(self, rhs: Mx) -> Mx {
                Mx::binary($op, &self, &rhs)
            }
        }
    };
}

impl_mx_binary!(Add, add, BinaryOp::Add);
impl_mx_binary!(Sub, sub, BinaryOp::Sub);
impl_mx_binary!(Mul, mul, BinaryOp::Mul);
impl_mx_binary!(Div, div, BinaryOp::Div);

impl Neg for Mx {
    type Output = Mx;

    fn neg(self) -> Mx {
        Mx::node(self.shape(), Op::Unary(UnaryOp::Neg, self))
    }
}

impl fmt::Display for Mx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.op {
            Op::Sym(name) => f.write_str(name),
            Op::Const(m) if m.len() == 1 => write!(f, "{}", m[0]),
            Op::Const(m) => {
                let items: Vec<String> = m.iter().map(ToString::to_string).collect();
                write!(f, "const({})", items.join(", "))
            }
            Op::Unary(op, a) => op.fmt_with(f, a),
            Op::Binary(op, a, b) => op.fmt_with(f, a, b),
            Op::Sum1(a) => write!(f, "sum1({})", a),
            Op::Transpose(a) => write!(f, "{}'", a),
            Op::MTimes(a, b) => write!(f, "mtimes({},{})", a, b),
            Op::GetNz(a, index) => write!(f, "{}[{}]", a, index),
            Op::SetNz { base, index, value } => write!(f, "({}[{}]={})", base, index, value),
        }
    }
}

impl fmt::Debug for Mx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MX({})", self)
    }
}
