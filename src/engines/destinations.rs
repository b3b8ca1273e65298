//! Destination equations: the downstream boundary condition of a network exit.

use std::marker::PhantomData;

use crate::symbolic::SymbolicValue;

/// Equations describing a destination of the network.
pub trait DestinationEquations<S: SymbolicValue> {
    /// Virtual density downstream of the last segment entering a congested
    /// destination: `max(min(rho_last, rho_crit), rho_destination)`.
    fn get_congested_downstream_density(
        &self,
        rho_last: &S,
        rho_destination: &S,
        rho_crit: &S,
    ) -> S;
}

/// Destination equations, shared by every symbolic representation.
pub struct Destinations<S>(PhantomData<fn() -> S>);

impl<S> Destinations<S> {
    pub const fn new() -> Self {
        Destinations(PhantomData)
    }
}

impl<S: SymbolicValue> DestinationEquations<S> for Destinations<S> {
    fn get_congested_downstream_density(
        &self,
        rho_last: &S,
        rho_destination: &S,
        rho_crit: &S,
    ) -> S {
        rho_last.fmin(rho_crit).fmax(rho_destination)
    }
}

super::equation_group_impls!(Destinations);
