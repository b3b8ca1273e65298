//! Automatic differentiation of built expressions using `num-dual`.
//!
//! Expressions are evaluated with `Dual64` values, one pass per input
//! element, seeding that element's derivative. This gives exact first
//! derivatives of the METANET equations, e.g. for linearizing a step around
//! an operating point.
//!
//! # Example
//!
//! ```
//! use sym_metanet::autodiff::jacobian;
//! use sym_metanet::prelude::*;
//!
//! let engine = Engine::<Sx>::new();
//! let rho: Sx = engine.var("rho", &[]).unwrap();
//! let v: Sx = engine.var("v", &[]).unwrap();
//! let q = engine.links().get_flow(&rho, &v, &Sx::from(2.0));
//!
//! let mut env = Env::new();
//! env.bind_scalar("rho", 20.0).bind_scalar("v", 80.0);
//! let jac = jacobian(&q, &["rho", "v"], &env).unwrap();
//!
//! // dq/drho = 2v, dq/dv = 2rho
//! assert!((jac.get(0, 0) - 160.0).abs() < 1e-10);
//! assert!((jac.get(0, 1) - 40.0).abs() < 1e-10);
//! ```

use nalgebra::DMatrix;
use num_dual::Dual64;

use crate::error::{MetanetError, MetanetResult};
use crate::symbolic::{Env, SymbolicValue};

/// Jacobian matrix of a flattened expression.
///
/// Rows follow the column-major elements of the expression, columns the
/// column-major elements of the differentiation variables in the order given.
#[derive(Debug, Clone, PartialEq)]
pub struct Jacobian {
    /// Number of expression elements (rows)
    pub n_outputs: usize,
    /// Number of input elements (columns)
    pub n_inputs: usize,
    /// Jacobian entries in row-major order
    pub entries: Vec<f64>,
}

impl Jacobian {
    /// All-zero Jacobian with `n_outputs` rows and `n_inputs` columns.
    pub fn zeros(n_outputs: usize, n_inputs: usize) -> Self {
        Jacobian { n_outputs, n_inputs, entries: vec![0.0; n_outputs * n_inputs] }
    }

    /// Derivative of output element `i` with respect to input element `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.entries[i * self.n_inputs + j]
    }

    /// Stores the derivative of output `i` with respect to input `j`.
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.entries[i * self.n_inputs + j] = value;
    }

    pub fn is_square(&self) -> bool {
        self.n_outputs == self.n_inputs
    }

    /// Copies the entries into a dense `nalgebra` matrix.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.n_outputs, self.n_inputs, &self.entries)
    }
}

/// Differentiates `expr` with respect to the variables in `wrt` at the point
/// given by `env`.
///
/// # Errors
///
/// Returns [`MetanetError::UnboundSymbol`] if a name in `wrt` or a symbol of
/// `expr` has no value in `env`, and [`MetanetError::BindingShape`] if a
/// bound value has the wrong shape.
pub fn jacobian<S: SymbolicValue>(
    expr: &S,
    wrt: &[&str],
    env: &Env<f64>,
) -> MetanetResult<Jacobian> {
    let sizes = wrt
        .iter()
        .map(|name| {
            env.get(name)
                .map(|value| value.len())
                .ok_or_else(|| MetanetError::UnboundSymbol(name.to_string()))
        })
        .collect::<MetanetResult<Vec<usize>>>()?;
    let n_inputs = sizes.iter().sum();
    let n_outputs = expr.eval(env)?.len();
    log::debug!("computing {}x{} jacobian of {} expression", n_outputs, n_inputs, S::KIND);

    let mut jac = Jacobian::zeros(n_outputs, n_inputs);
    let mut column = 0;
    for (&name, &size) in wrt.iter().zip(&sizes) {
        for k in 0..size {
            let seeded = env.map(|var, index, x| {
                let value = Dual64::from(x);
                if var == name && index == k {
                    value.derivative()
                } else {
                    value
                }
            });
            let out = expr.eval(&seeded)?;
            for (i, value) in out.iter().enumerate() {
                jac.set(i, column, value.eps);
            }
            column += 1;
        }
    }
    Ok(jac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::{LinkEquations, Links, OriginEquations, Origins, RampMetering};
    use crate::symbolic::{var, Mx, Sx};

    #[test]
    fn test_jacobian_creation() {
        let jac = Jacobian::zeros(3, 2);
        assert_eq!(jac.n_outputs, 3);
        assert_eq!(jac.n_inputs, 2);
        assert_eq!(jac.entries.len(), 6);
        assert!(!jac.is_square());
    }

    #[test]
    fn test_step_density_jacobian() {
        let rho: Mx = var("rho", &[2]).unwrap();
        let q: Mx = var("q", &[2]).unwrap();
        let q_up: Mx = var("q_up", &[2]).unwrap();
        let t = 10.0 / 3600.0;
        let rho_next = Links::<Mx>::new().step_density(
            &rho,
            &q,
            &q_up,
            &Mx::from(2.0),
            &Mx::from(1.0),
            &Mx::from(t),
        );

        let mut env = Env::new();
        env.bind_vector("rho", &[20.0, 30.0])
            .bind_vector("q", &[3000.0, 3200.0])
            .bind_vector("q_up", &[3100.0, 3000.0]);
        let jac = jacobian(&rho_next, &["rho", "q_up"], &env).unwrap();

        assert_eq!((jac.n_outputs, jac.n_inputs), (2, 4));
        let expected = DMatrix::from_row_slice(
            2,
            4,
            &[1.0, 0.0, t / 2.0, 0.0, 0.0, 1.0, 0.0, t / 2.0],
        );
        assert!((jac.to_matrix() - expected).abs().max() < 1e-12);
    }

    #[test]
    fn test_veq_derivative() {
        let (v_free, rho_crit, a) = (102.0, 33.5, 1.867);
        let rho: Sx = var("rho", &[]).unwrap();
        let veq =
            Links::<Sx>::new().veq(&rho, &Sx::from(v_free), &Sx::from(rho_crit), &Sx::from(a));

        let mut env = Env::new();
        env.bind_scalar("rho", 25.0);
        let jac = jacobian(&veq, &["rho"], &env).unwrap();

        let value = veq.eval(&env).unwrap()[0];
        let expected = -value * (25.0_f64 / rho_crit).powf(a - 1.0) / rho_crit;
        assert!((jac.get(0, 0) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_veq_flat_at_zero_density() {
        let rho: Mx = var("rho", &[2]).unwrap();
        let veq = Links::<Mx>::new().veq(
            &rho,
            &Mx::from(102.0),
            &Mx::from(33.5),
            &Mx::from(1.867),
        );

        let mut env = Env::new();
        env.bind_vector("rho", &[0.0, 0.0]);
        assert_eq!(veq.eval(&env).unwrap().as_slice(), &[102.0, 102.0]);

        let jac = jacobian(&veq, &["rho"], &env).unwrap();
        assert!(jac.entries.iter().all(|d| *d == 0.0));
    }

    #[test]
    fn test_lane_drop_jacobian_at_standstill() {
        // v^2 term of the lane-drop correction
        let v: Sx = var("v", &[]).unwrap();
        let squared = v.pow(&Sx::from(2.0));

        let mut env = Env::new();
        env.bind_scalar("v", 0.0);
        let jac = jacobian(&squared, &["v"], &env).unwrap();
        assert_eq!(jac.get(0, 0), 0.0);
    }

    #[test]
    fn test_ramp_flow_derivative_wrt_rate() {
        let r: Sx = var("r", &[]).unwrap();
        let q = Origins::<Sx>::new().get_ramp_flow(
            &Sx::from(100.0),
            &Sx::from(0.0),
            &Sx::from(2000.0),
            &r,
            &Sx::from(180.0),
            &Sx::from(50.0),
            &Sx::from(30.0),
            &Sx::from(10.0),
            RampMetering::Out,
        );

        let mut env = Env::new();
        env.bind_scalar("r", 0.5);
        let jac = jacobian(&q, &["r"], &env).unwrap();
        assert!((jac.get(0, 0) - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_unbound_wrt() {
        let x: Sx = var("x", &[]).unwrap();
        let mut env = Env::new();
        env.bind_scalar("x", 1.0);
        assert_eq!(
            jacobian(&x, &["y"], &env),
            Err(MetanetError::UnboundSymbol("y".to_string()))
        );
    }
}
