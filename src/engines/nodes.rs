//! Junction equations: merging flows and speeds into a node and splitting them
//! towards the leaving links.
//!
//! # Example
//!
//! ```
//! use sym_metanet::prelude::*;
//!
//! let engine = Engine::<Sx>::new();
//! let q_lasts = Sx::from(1000.0);
//! let beta = Sx::from(0.25);
//!
//! let q_up = engine.nodes().get_upstream_flow(&q_lasts, &beta);
//! assert_eq!(q_up.as_constant(), Some(250.0));
//! ```

use std::marker::PhantomData;

use crate::symbolic::SymbolicValue;

/// Equations describing a node of the network.
pub trait NodeEquations<S: SymbolicValue> {
    /// Flow entering a leaving link: `beta * sum(q_lasts)`.
    ///
    /// `q_lasts` holds the flows of the last segments of all links entering
    /// the node; `beta` is the turn rate towards the leaving link.
    fn get_upstream_flow(&self, q_lasts: &S, beta: &S) -> S;

    /// Flow-weighted mean speed of the entering links:
    /// `(v_lasts' * q_lasts) / sum(q_lasts)`.
    ///
    /// Evaluates to `NaN` when the entering flows sum to zero.
    fn get_upstream_speed(&self, q_lasts: &S, v_lasts: &S) -> S;

    /// Virtual downstream density seen by the entering links:
    /// `(rho_firsts' * rho_firsts) / sum(rho_firsts)`.
    ///
    /// Evaluates to `NaN` when the leaving densities sum to zero.
    fn get_downstream_density(&self, rho_firsts: &S) -> S;
}

/// Node equations, shared by every symbolic representation.
pub struct Nodes<S>(PhantomData<fn() -> S>);

impl<S> Nodes<S> {
    pub const fn new() -> Self {
        Nodes(PhantomData)
    }
}

impl<S: SymbolicValue> NodeEquations<S> for Nodes<S> {
    fn get_upstream_flow(&self, q_lasts: &S, beta: &S) -> S {
        beta.clone() * q_lasts.sum1()
    }

    fn get_upstream_speed(&self, q_lasts: &S, v_lasts: &S) -> S {
        v_lasts.t().mtimes(q_lasts) / q_lasts.sum1()
    }

    fn get_downstream_density(&self, rho_firsts: &S) -> S {
        rho_firsts.t().mtimes(rho_firsts) / rho_firsts.sum1()
    }
}

super::equation_group_impls!(Nodes);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::{var, Env, Mx, Sx};

    fn upstream_speed<S: SymbolicValue>() -> f64 {
        let q_lasts: S = var("q_lasts", &[3]).unwrap();
        let v_lasts: S = var("v_lasts", &[3]).unwrap();
        let v_up = Nodes::<S>::new().get_upstream_speed(&q_lasts, &v_lasts);

        let mut env = Env::new();
        env.bind_vector("q_lasts", &[1000.0, 2000.0, 1000.0])
            .bind_vector("v_lasts", &[100.0, 80.0, 60.0]);
        v_up.eval(&env).unwrap()[0]
    }

    fn downstream_density<S: SymbolicValue>() -> f64 {
        let rho_firsts: S = var("rho_firsts", &[2]).unwrap();
        let rho_down = Nodes::<S>::new().get_downstream_density(&rho_firsts);

        let mut env = Env::new();
        env.bind_vector("rho_firsts", &[20.0, 60.0]);
        rho_down.eval(&env).unwrap()[0]
    }

    #[test]
    fn test_upstream_flow_splits_total() {
        let q_lasts: Mx = var("q_lasts", &[2]).unwrap();
        let beta: Mx = var("beta", &[]).unwrap();
        let q_up = Nodes::<Mx>::new().get_upstream_flow(&q_lasts, &beta);

        let mut env = Env::new();
        env.bind_vector("q_lasts", &[1500.0, 500.0]).bind_scalar("beta", 0.3);
        assert!((q_up.eval(&env).unwrap()[0] - 600.0).abs() < 1e-10);
    }

    #[test]
    fn test_upstream_speed_is_flow_weighted() {
        // (100*1000 + 80*2000 + 60*1000) / 4000
        assert!((upstream_speed::<Sx>() - 80.0).abs() < 1e-10);
        assert!((upstream_speed::<Mx>() - 80.0).abs() < 1e-10);
    }

    #[test]
    fn test_downstream_density_is_self_weighted() {
        // (20^2 + 60^2) / 80
        assert!((downstream_density::<Sx>() - 50.0).abs() < 1e-10);
        assert!((downstream_density::<Mx>() - 50.0).abs() < 1e-10);
    }

    #[test]
    fn test_upstream_speed_zero_flow_is_nan() {
        let q_lasts = Sx::from(0.0);
        let v_lasts = Sx::from(90.0);
        let v_up = Nodes::<Sx>::new().get_upstream_speed(&q_lasts, &v_lasts);
        assert!(v_up.eval(&Env::<f64>::new()).unwrap()[0].is_nan());
    }
}
