//! Link equations: the discretized conservation and momentum laws.
//!
//! A link is split into segments of length `L` with `lanes` lanes each.
//! Densities, speeds and flows of a link are column vectors with one entry
//! per segment; geometry and calibration parameters are scalars. All updates
//! are explicit Euler steps of size `T`.
//!
//! # Example
//!
//! ```
//! use sym_metanet::prelude::*;
//!
//! let links = Engine::<Mx>::new().links();
//! let rho = Mx::from(20.0);
//! let v = Mx::from(80.0);
//! let q = links.get_flow(&rho, &v, &Mx::from(2.0));
//!
//! let value = q.eval(&Env::<f64>::new()).unwrap();
//! assert_eq!(value[0], 3200.0);
//! ```

use std::marker::PhantomData;

use crate::symbolic::SymbolicValue;

/// Speed drop in the first segment caused by traffic merging from an on-ramp.
#[derive(Debug)]
pub struct OnRampCorrection<'a, S> {
    /// Flow entering from the ramp
    pub q_ramp: &'a S,
    /// Merging model parameter
    pub delta: &'a S,
}

impl<'a, S> OnRampCorrection<'a, S> {
    /// Builds the correction only when every part is present.
    pub fn from_parts(q_ramp: Option<&'a S>, delta: Option<&'a S>) -> Option<Self> {
        Some(OnRampCorrection { q_ramp: q_ramp?, delta: delta? })
    }
}

/// Speed drop in the last segment caused by a lane reduction downstream.
#[derive(Debug)]
pub struct LaneDropCorrection<'a, S> {
    /// Number of lanes dropped at the end of the link
    pub lanes_drop: &'a S,
    /// Lane-drop model parameter
    pub phi: &'a S,
    /// Critical density of the link
    pub rho_crit: &'a S,
}

impl<'a, S> LaneDropCorrection<'a, S> {
    /// Builds the correction only when every part is present.
    pub fn from_parts(
        lanes_drop: Option<&'a S>,
        phi: Option<&'a S>,
        rho_crit: Option<&'a S>,
    ) -> Option<Self> {
        Some(LaneDropCorrection { lanes_drop: lanes_drop?, phi: phi?, rho_crit: rho_crit? })
    }
}

/// Operands of one speed update of a link.
#[derive(Debug)]
pub struct SpeedStep<'a, S> {
    /// Segment speeds
    pub v: &'a S,
    /// Speeds upstream of each segment
    pub v_up: &'a S,
    /// Segment densities
    pub rho: &'a S,
    /// Densities downstream of each segment
    pub rho_down: &'a S,
    /// Equilibrium speeds, usually from [`LinkEquations::veq`]
    pub veq: &'a S,
    pub lanes: &'a S,
    /// Segment length `L`
    pub length: &'a S,
    /// Relaxation time
    pub tau: &'a S,
    /// Anticipation constant
    pub eta: &'a S,
    /// Anticipation smoothing constant
    pub kappa: &'a S,
    /// Sampling time `T`
    pub t: &'a S,
    pub on_ramp: Option<OnRampCorrection<'a, S>>,
    pub lane_drop: Option<LaneDropCorrection<'a, S>>,
}

/// Equations describing a link of the network.
pub trait LinkEquations<S: SymbolicValue> {
    /// Flow of each segment: `rho * v * lanes`.
    fn get_flow(&self, rho: &S, v: &S, lanes: &S) -> S;

    /// Density at the next step: `rho + T / (lanes * L) * (q_up - q)`.
    fn step_density(&self, rho: &S, q: &S, q_up: &S, lanes: &S, length: &S, t: &S) -> S;

    /// Speed at the next step, one entry per segment.
    ///
    /// Relaxation towards `veq`, convection from `v_up` and anticipation of
    /// `rho_down` always apply. The on-ramp correction is subtracted from the
    /// first segment and the lane-drop correction from the last one, each
    /// only when present in `step`.
    ///
    /// # Panics
    ///
    /// Panics if `step.v` is empty or if a correction does not reduce to 1x1.
    fn step_speed(&self, step: &SpeedStep<'_, S>) -> S;

    /// Equilibrium speed: `v_free * exp(-1/a * (rho / rho_crit)^a)`.
    fn veq(&self, rho: &S, v_free: &S, rho_crit: &S, a: &S) -> S;
}

/// Link equations, shared by every symbolic representation.
pub struct Links<S>(PhantomData<fn() -> S>);

impl<S> Links<S> {
    pub const fn new() -> Self {
        Links(PhantomData)
    }
}

impl<S: SymbolicValue> LinkEquations<S> for Links<S> {
    fn get_flow(&self, rho: &S, v: &S, lanes: &S) -> S {
        rho.clone() * v.clone() * lanes.clone()
    }

    fn step_density(&self, rho: &S, q: &S, q_up: &S, lanes: &S, length: &S, t: &S) -> S {
        rho.clone() + (t.clone() / lanes.clone() / length.clone()) * (q_up.clone() - q.clone())
    }

    fn step_speed(&self, step: &SpeedStep<'_, S>) -> S {
        let (v, rho, t, length, kappa) = (step.v, step.rho, step.t, step.length, step.kappa);

        let relaxation = (t.clone() / step.tau.clone()) * (step.veq.clone() - v.clone());
        let convection = t.clone() * v.clone() / length.clone() * (step.v_up.clone() - v.clone());
        let anticipation = (step.eta.clone() * t.clone() / step.tau.clone())
            * (step.rho_down.clone() - rho.clone())
            / (length.clone() * (rho.clone() + kappa.clone()));
        let mut v_next = v.clone() + relaxation + convection - anticipation;

        if let Some(ramp) = &step.on_ramp {
            let merging = (ramp.delta.clone() * t.clone() * ramp.q_ramp.clone() * v.at(0))
                / (length.clone() * step.lanes.clone() * (rho.at(0) + kappa.clone()));
            v_next = v_next.with_at(0, &(v_next.at(0) - merging));
        }

        if let Some(drop) = &step.lane_drop {
            let last = v.numel() - 1;
            let reduction = (drop.phi.clone()
                * t.clone()
                * drop.lanes_drop.clone()
                * rho.at(last)
                * v.at(last).pow(&S::from(2.0)))
                / (length.clone() * step.lanes.clone() * drop.rho_crit.clone());
            v_next = v_next.with_at(last, &(v_next.at(last) - reduction));
        }

        v_next
    }

    fn veq(&self, rho: &S, v_free: &S, rho_crit: &S, a: &S) -> S {
        let exponent = (S::from(-1.0) / a.clone()) * (rho.clone() / rho_crit.clone()).pow(a);
        v_free.clone() * exponent.exp()
    }
}

super::equation_group_impls!(Links);
