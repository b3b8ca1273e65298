//! Engines binding the METANET equations to a symbolic representation.
//!
//! An engine does two things: it creates variables of its representation and
//! hands out the four equation groups of the model.
//!
//! | Group | Entity | Equations |
//! |-------|--------|-----------|
//! | [`Nodes`] | junction | upstream flow and speed, downstream density |
//! | [`Links`] | freeway stretch | flow, density and speed steps, equilibrium speed |
//! | [`Origins`] | entry point | queue step, metered ramp flow |
//! | [`Destinations`] | exit point | congested boundary density |
//!
//! The groups are written once, generically over [`SymbolicValue`]; only the
//! variable constructor depends on the representation. No group calls
//! another, so composing one simulation step is up to the caller.
//!
//! # Example
//!
//! ```
//! use sym_metanet::prelude::*;
//!
//! let engine = make_engine("MX").unwrap();
//! assert_eq!(engine.to_string(), "Engine(symbolic)");
//! assert_eq!(format!("{:?}", engine), "Engine(symbolic, type=MX)");
//!
//! // The representation is chosen once; equations then work on that type.
//! let AnyEngine::Mx(engine) = engine else { unreachable!() };
//! let rho = engine.var("rho", &[3]).unwrap();
//! let q = engine.var("q", &[3]).unwrap();
//! let q_up = engine.var("q_up", &[3]).unwrap();
//! let one = Mx::from(1.0);
//! let rho_next = engine.links().step_density(&rho, &q, &q_up, &Mx::from(2.0), &one, &one);
//! assert_eq!(rho_next.numel(), 3);
//! ```

/// Implements the handle traits shared by the zero-sized equation groups.
macro_rules! equation_group_impls {
    ($group:ident) => {
        impl<S> Clone for $group<S> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<S> Copy for $group<S> {}

        impl<S> Default for $group<S> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<S> std::fmt::Debug for $group<S> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(stringify!($group))
            }
        }
    };
}

pub(crate) use equation_group_impls;

mod destinations;
mod links;
mod nodes;
mod origins;

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use crate::error::{MetanetError, MetanetResult};
use crate::symbolic::{self, Mx, Sx, SymKind, SymbolicValue};

pub use destinations::{DestinationEquations, Destinations};
pub use links::{LaneDropCorrection, LinkEquations, Links, OnRampCorrection, SpeedStep};
pub use nodes::{NodeEquations, Nodes};
pub use origins::{OriginEquations, Origins, RampMetering};

/// Interface of a symbolic engine.
///
/// A new backend plugs in by providing its value type and the four equation
/// groups over it.
pub trait SymbolicEngine {
    /// Symbolic value type the engine builds expressions from.
    type Value: SymbolicValue;
    type Nodes: NodeEquations<Self::Value>;
    type Links: LinkEquations<Self::Value>;
    type Origins: OriginEquations<Self::Value>;
    type Destinations: DestinationEquations<Self::Value>;

    fn nodes(&self) -> Self::Nodes;

    fn links(&self) -> Self::Links;

    fn origins(&self) -> Self::Origins;

    fn destinations(&self) -> Self::Destinations;

    /// Creates a variable with at most two dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`MetanetError::InvalidShape`] for three or more dimensions.
    fn var(&self, name: &str, shape: &[usize]) -> MetanetResult<Self::Value>;
}

/// Engine over one of the built-in representations.
pub struct Engine<S> {
    _sym: PhantomData<fn() -> S>,
}

impl<S: SymbolicValue> Engine<S> {
    pub fn new() -> Self {
        log::debug!("creating symbolic engine with {} variables", S::KIND);
        Engine { _sym: PhantomData }
    }

    /// Creates the engine if `kind` is the representation of `S`.
    pub fn from_kind(kind: SymKind) -> MetanetResult<Self> {
        if kind != S::KIND {
            return Err(MetanetError::UnknownSymType {
                got: kind.to_string(),
                valid: S::KIND.to_string(),
            });
        }
        Ok(Self::new())
    }

    /// Representation this engine is bound to.
    pub fn kind(&self) -> SymKind {
        S::KIND
    }
}

impl<S: SymbolicValue> SymbolicEngine for Engine<S> {
    type Value = S;
    type Nodes = Nodes<S>;
    type Links = Links<S>;
    type Origins = Origins<S>;
    type Destinations = Destinations<S>;

    fn nodes(&self) -> Nodes<S> {
        Nodes::new()
    }

    fn links(&self) -> Links<S> {
        Links::new()
    }

    fn origins(&self) -> Origins<S> {
        Origins::new()
    }

    fn destinations(&self) -> Destinations<S> {
        Destinations::new()
    }

    fn var(&self, name: &str, shape: &[usize]) -> MetanetResult<S> {
        symbolic::var(name, shape)
    }
}

impl<S: SymbolicValue> Clone for Engine<S> {
    fn clone(&self) -> Self {
        Engine { _sym: PhantomData }
    }
}

impl<S: SymbolicValue> Default for Engine<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SymbolicValue> fmt::Display for Engine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Engine(symbolic)")
    }
}

impl<S: SymbolicValue> fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Engine(symbolic, type={})", S::KIND)
    }
}

/// Engine selected at run time.
#[derive(Clone)]
pub enum AnyEngine {
    Sx(Engine<Sx>),
    Mx(Engine<Mx>),
}

impl AnyEngine {
    pub fn new(kind: SymKind) -> Self {
        match kind {
            SymKind::Sx => AnyEngine::Sx(Engine::new()),
            SymKind::Mx => AnyEngine::Mx(Engine::new()),
        }
    }

    pub fn kind(&self) -> SymKind {
        match self {
            AnyEngine::Sx(engine) => engine.kind(),
            AnyEngine::Mx(engine) => engine.kind(),
        }
    }
}

impl FromStr for AnyEngine {
    type Err = MetanetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        make_engine(s)
    }
}

impl fmt::Display for AnyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyEngine::Sx(engine) => fmt::Display::fmt(engine, f),
            AnyEngine::Mx(engine) => fmt::Display::fmt(engine, f),
        }
    }
}

impl fmt::Debug for AnyEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyEngine::Sx(engine) => fmt::Debug::fmt(engine, f),
            AnyEngine::Mx(engine) => fmt::Debug::fmt(engine, f),
        }
    }
}

/// Creates an engine from the name of a symbolic representation.
///
/// # Errors
///
/// Returns [`MetanetError::UnknownSymType`], listing the valid names, if
/// `kind` is not one of them.
pub fn make_engine(kind: &str) -> MetanetResult<AnyEngine> {
    let kind = kind.parse::<SymKind>().inspect_err(|err| log::warn!("{}", err))?;
    Ok(AnyEngine::new(kind))
}
