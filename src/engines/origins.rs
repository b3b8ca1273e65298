//! Origin equations: on-ramp queues and metered ramp outflow.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use crate::error::MetanetError;
use crate::symbolic::SymbolicValue;

/// Where the metering rate acts in [`OriginEquations::get_ramp_flow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RampMetering {
    /// The rate competes with the congestion limit inside the capacity term:
    /// `min(d + w/T, C * min(r, (rho_max - rho_first) / (rho_max - rho_crit)))`
    In,
    /// The rate scales the already limited flow:
    /// `r * min(d + w/T, C * min(1, (rho_max - rho_first) / (rho_max - rho_crit)))`
    #[default]
    Out,
}

impl RampMetering {
    pub fn as_str(self) -> &'static str {
        match self {
            RampMetering::In => "in",
            RampMetering::Out => "out",
        }
    }
}

impl fmt::Display for RampMetering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RampMetering {
    type Err = MetanetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(RampMetering::In),
            "out" => Ok(RampMetering::Out),
            _ => Err(MetanetError::UnknownRampMetering(s.to_string())),
        }
    }
}

/// Equations describing an origin of the network.
pub trait OriginEquations<S: SymbolicValue> {
    /// Queue length at the next step: `w + T * (d - q)`.
    ///
    /// The result is not clamped; a queue can go negative if `q > d + w/T`.
    fn step_queue(&self, w: &S, d: &S, q: &S, t: &S) -> S;

    /// Flow leaving the origin, limited by demand plus queue (`d + w/T`), by
    /// capacity `C` and by congestion in the first downstream segment.
    #[allow(clippy::too_many_arguments)]
    fn get_ramp_flow(
        &self,
        d: &S,
        w: &S,
        c: &S,
        r: &S,
        rho_max: &S,
        rho_first: &S,
        rho_crit: &S,
        t: &S,
        metering: RampMetering,
    ) -> S;
}

/// Origin equations, shared by every symbolic representation.
pub struct Origins<S>(PhantomData<fn() -> S>);

impl<S> Origins<S> {
    pub const fn new() -> Self {
        Origins(PhantomData)
    }
}

impl<S: SymbolicValue> OriginEquations<S> for Origins<S> {
    fn step_queue(&self, w: &S, d: &S, q: &S, t: &S) -> S {
        w.clone() + t.clone() * (d.clone() - q.clone())
    }

    fn get_ramp_flow(
        &self,
        d: &S,
        w: &S,
        c: &S,
        r: &S,
        rho_max: &S,
        rho_first: &S,
        rho_crit: &S,
        t: &S,
        metering: RampMetering,
    ) -> S {
        let demand = d.clone() + w.clone() / t.clone();
        let congestion =
            (rho_max.clone() - rho_first.clone()) / (rho_max.clone() - rho_crit.clone());
        match metering {
            RampMetering::In => demand.fmin(&(c.clone() * r.fmin(&congestion))),
            RampMetering::Out => {
                r.clone() * demand.fmin(&(c.clone() * S::from(1.0).fmin(&congestion)))
            }
        }
    }
}

super::equation_group_impls!(Origins);
