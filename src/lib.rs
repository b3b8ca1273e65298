//! # sym-metanet: Symbolic METANET Traffic Flow Equations
//!
//! The METANET macroscopic freeway model written once, generically over a
//! symbolic representation. Each equation builds an expression out of
//! whatever values it is given (variables, constants or earlier results),
//! so a full network step can be composed, printed and evaluated later.
//!
//! Two representations are provided:
//!
//! - [`Sx`](symbolic::Sx): matrices of scalar expression trees, folding
//!   constants as they are built
//! - [`Mx`](symbolic::Mx): whole-matrix expression graphs
//!
//! An [`Engine`](engines::Engine) pairs a representation with the four
//! equation groups (nodes, links, origins, destinations). Engines are
//! created directly, or from a type name with [`make_engine`](engines::make_engine).
//!
//! ## Example
//!
//! ```
//! use sym_metanet::prelude::*;
//!
//! let engine = Engine::<Sx>::new();
//! let rho: Sx = engine.var("rho", &[2]).unwrap();
//! let v: Sx = engine.var("v", &[2]).unwrap();
//!
//! // q = rho * v * lanes
//! let q = engine.links().get_flow(&rho, &v, &Sx::from(2.0));
//! assert_eq!(q.to_string(), "[((rho_0*v_0)*2), ((rho_1*v_1)*2)]");
//!
//! let mut env = Env::new();
//! env.bind_vector("rho", &[20.0, 30.0]).bind_vector("v", &[90.0, 80.0]);
//! let values = q.eval(&env).unwrap();
//! assert_eq!(values.as_slice(), &[3600.0, 4800.0]);
//! ```
//!
//! Unknown representations are rejected with the list of valid ones:
//!
//! ```
//! use sym_metanet::prelude::*;
//!
//! let err = make_engine("FOO").unwrap_err();
//! assert_eq!(err.to_string(), "symbolic type must be in {SX, MX}; got FOO instead");
//! ```
//!
//! ## Optional Features
//!
//! - **`autodiff`**: Jacobians of built expressions using `num-dual`
//!
//! ```toml
//! [dependencies]
//! sym-metanet = { version = "0.1", features = ["autodiff"] }
//! ```

pub mod engines;
pub mod error;
pub mod symbolic;

#[cfg(feature = "autodiff")]
pub mod autodiff;

pub use engines::{make_engine, AnyEngine, Engine, SymbolicEngine};
pub use error::{MetanetError, MetanetResult};
pub use symbolic::{var, Env, Mx, Shape, Sx, SymKind, SymbolicValue};

/// Everything needed to build and evaluate METANET equations.
pub mod prelude {
    pub use crate::engines::{
        make_engine, AnyEngine, DestinationEquations, Destinations, Engine, LaneDropCorrection,
        LinkEquations, Links, NodeEquations, Nodes, OnRampCorrection, OriginEquations, Origins,
        RampMetering, SpeedStep, SymbolicEngine,
    };
    pub use crate::error::{MetanetError, MetanetResult};
    pub use crate::symbolic::{var, Env, Mx, Real, Shape, Sx, SymKind, SymbolicValue};
}
