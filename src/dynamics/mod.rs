//! Force terms (§4.C). Each term produces an acceleration and a 3x6 position+velocity
//! Jacobian from the *same* analytic expression, evaluated once over plain `f64`s and once
//! over `Hyperdual` dual numbers — the same technique the teacher's `PointMasses::dual_eom`
//! uses for a single third body, generalised here to every term. Differentiating and
//! evaluating the identical expression is what keeps the Jacobian mechanically consistent
//! with the acceleration it differentiates (§3 invariant, §8 property I3).

mod direct_gravity;
mod earth_harmonics;
mod nongrav;
mod relativity;
mod sun_harmonics;

pub use direct_gravity::DirectGravity;
pub use earth_harmonics::EarthHarmonics;
pub use nongrav::NonGravitational;
pub use relativity::{DamourDeruelle, EinsteinInfeldHoffmann};
pub use sun_harmonics::SunHarmonics;

use nalgebra::{Matrix3x6, Vector3};

use crate::config::SimConfig;
use crate::ephemeris::PerturberState;
use crate::errors::EphemerisError;
use crate::particles::ParticleState;

/// Everything a force term needs to evaluate itself at one Radau sub-node: the time, the
/// active configuration, and a way to ask the façade for a perturber's state already
/// shifted into the active reference frame (barycentric, or geocentric when `config.frame`
/// says so — the shift itself is applied by the aggregator before a term ever sees it).
pub struct StepContext<'a> {
    pub t_tdb_days: f64,
    pub config: &'a SimConfig,
    perturbers: &'a dyn PerturberSource,
    origin: PerturberState,
}

impl<'a> StepContext<'a> {
    pub fn new(
        t_tdb_days: f64,
        config: &'a SimConfig,
        perturbers: &'a dyn PerturberSource,
        origin: PerturberState,
    ) -> Self {
        StepContext {
            t_tdb_days,
            config,
            perturbers,
            origin,
        }
    }

    /// The state of perturber `i`, shifted so its position/velocity/acceleration are
    /// expressed relative to the active reference origin (zero for barycentric runs, Earth's
    /// barycentric state for geocentric runs).
    pub fn perturber(&self, i: usize) -> Result<PerturberState, EphemerisError> {
        let raw = self.perturbers.query(i, self.t_tdb_days)?;
        Ok(PerturberState {
            gm: raw.gm,
            r: raw.r - self.origin.r,
            v: raw.v - self.origin.v,
            a: raw.a - self.origin.a,
        })
    }

    pub fn sun(&self) -> Result<PerturberState, EphemerisError> {
        self.perturber(crate::constants::SUN)
    }
}

/// Object-safe view over the ephemeris façade, implemented for `EphemerisFacade<P, A>` so
/// `StepContext` does not need to be generic over the planetary/small-body reader types.
pub trait PerturberSource: Send + Sync {
    fn query(&self, i: usize, t_tdb_days: f64) -> Result<PerturberState, EphemerisError>;

    /// Drops any per-step memoisation the source is keeping, called by the integrator once per
    /// accepted/attempted step (§4.A Memoisation). A no-op default so a source with nothing to
    /// forget doesn't need to implement it.
    fn begin_step(&self) {}
}

impl<P, A> PerturberSource for crate::ephemeris::EphemerisFacade<P, A>
where
    P: crate::ephemeris::PlanetaryEphemeris,
    A: crate::ephemeris::SmallBodyEphemeris,
{
    fn query(&self, i: usize, t_tdb_days: f64) -> Result<PerturberState, EphemerisError> {
        self.query(i, t_tdb_days)
    }

    fn begin_step(&self) {
        self.begin_step();
    }
}

/// One acceleration contributor (§4.C, C1-C6). `jacobian` must be the partial derivative of
/// the exact same formula `acceleration` evaluates — implementations get this for free by
/// writing the formula once over `Hyperdual` and reading `.real()` / the dual slots back out.
pub trait ForceTerm: Send + Sync {
    /// Stable name used in `NumericalFailure` diagnostics and log messages.
    fn name(&self) -> &'static str;

    /// Acceleration on one real particle, in the active reference frame.
    fn acceleration(
        &self,
        state: &ParticleState,
        ctx: &StepContext,
    ) -> Result<Vector3<f64>, EphemerisError>;

    /// 3x6 Jacobian `[∂a/∂r | ∂a/∂v]` of `acceleration` at the same state.
    fn jacobian(
        &self,
        state: &ParticleState,
        ctx: &StepContext,
    ) -> Result<Matrix3x6<f64>, EphemerisError>;
}
