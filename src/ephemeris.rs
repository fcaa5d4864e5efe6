//! The ephemeris façade (§4.A). Planetary and small-body readers are external collaborators:
//! this module only defines the traits the core depends on and the memoising façade that
//! sits in front of whatever implementation a caller plugs in.

use std::collections::HashMap;
use std::sync::Mutex;

use nalgebra::Vector3;

use crate::constants;
use crate::errors::EphemerisError;

/// One of the eleven bodies carried directly by the planetary ephemeris.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlanetaryBody(pub usize);

impl PlanetaryBody {
    pub const SUN: PlanetaryBody = PlanetaryBody(constants::SUN);
    pub const EARTH: PlanetaryBody = PlanetaryBody(constants::EARTH);

    pub fn name(self) -> Option<&'static str> {
        constants::perturber_name(self.0)
    }
}

/// Position, velocity and acceleration of a planetary body at one TDB epoch, already in
/// AU / AU-per-day / AU-per-day^2 and already barycentric: unit conversion and frame
/// handling are the `PlanetaryEphemeris` implementor's responsibility (out of scope here).
#[derive(Clone, Copy, Debug)]
pub struct BodyState {
    pub r: Vector3<f64>,
    pub v: Vector3<f64>,
    pub a: Vector3<f64>,
}

/// Uniform access to any of the eleven planetary-ephemeris bodies at a given TDB time,
/// expressed in days (fractional Julian TDB day count, caller's choice of epoch origin as
/// long as it is used consistently for the whole run).
pub trait PlanetaryEphemeris: Send + Sync {
    fn state(&self, body: PlanetaryBody, t_tdb_days: f64) -> Result<BodyState, EphemerisError>;
}

/// Uniform access to the heliocentric position of one of the `N_AST` massive asteroids.
/// Velocity and acceleration are undefined for asteroids (§3): the façade fills them with
/// `NaN` after calling this trait.
pub trait SmallBodyEphemeris: Send + Sync {
    fn heliocentric_position(
        &self,
        index: usize,
        t_tdb_days: f64,
    ) -> Result<Vector3<f64>, EphemerisError>;
}

/// `(GM, r, v, a)` of one perturber, already translated to the active barycentric/geocentric
/// origin by the caller of `query` (the façade itself only ever returns barycentric states).
#[derive(Clone, Copy, Debug)]
pub struct PerturberState {
    pub gm: f64,
    pub r: Vector3<f64>,
    pub v: Vector3<f64>,
    pub a: Vector3<f64>,
}

impl PerturberState {
    /// The barycentric-origin reference state used for barycentric runs (§4.D step 1): zero
    /// displacement, so `StepContext::perturber` leaves every queried state untouched.
    pub fn zero() -> Self {
        PerturberState {
            gm: 0.0,
            r: Vector3::zeros(),
            v: Vector3::zeros(),
            a: Vector3::zeros(),
        }
    }
}

/// Converts this crate's native time unit (a bare TDB-day count) to a `hifitime::Epoch`, for
/// log messages and for callers that want a human-readable timestamp rather than a raw `f64`.
/// Not used for anything numerical inside the façade itself — every internal computation stays
/// in TDB days, matching the `PlanetaryEphemeris`/`SmallBodyEphemeris` trait contract.
pub fn epoch_from_tdb_days(t_tdb_days: f64) -> hifitime::Epoch {
    hifitime::Epoch::from_tdb_seconds(t_tdb_days * constants::SECONDS_PER_DAY)
}

/// Bitwise key for a `(body, t)` memoisation cache entry. `t`'s bit pattern is used directly
/// rather than rounding, since within one Radau step the same few node times recur exactly.
type CacheKey = (usize, u64);

/// Component A: uniform `query(i, t)` access across planets and asteroids, with per-step
/// memoisation of the Sun's barycentric state (needed to translate heliocentric asteroid
/// positions) and of every other perturber queried during the step.
pub struct EphemerisFacade<P: PlanetaryEphemeris, A: SmallBodyEphemeris> {
    planets: P,
    asteroids: A,
    // A `Mutex` rather than a `RefCell`: the `parallel-forces` feature evaluates force terms
    // for independent particles from multiple rayon worker threads, and every one of them
    // shares this one cache.
    cache: Mutex<HashMap<CacheKey, PerturberState>>,
}

impl<P: PlanetaryEphemeris, A: SmallBodyEphemeris> EphemerisFacade<P, A> {
    pub fn new(planets: P, asteroids: A) -> Self {
        EphemerisFacade {
            planets,
            asteroids,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Clears the memoisation cache. Called by the integrator driver at the start of each
    /// new step so the cache never grows past one step's worth of distinct evaluation times
    /// (§4.A Memoisation).
    pub fn begin_step(&self) {
        self.cache.lock().expect("ephemeris cache mutex poisoned").clear();
    }

    pub fn query(&self, i: usize, t_tdb_days: f64) -> Result<PerturberState, EphemerisError> {
        let key: CacheKey = (i, t_tdb_days.to_bits());
        if let Some(cached) = self.cache.lock().expect("ephemeris cache mutex poisoned").get(&key) {
            return Ok(*cached);
        }

        log::trace!("ephemeris cache miss for body {i} at t={t_tdb_days}");

        let state = if i < constants::N_EPHEM {
            self.query_planet(i, t_tdb_days)?
        } else if i < constants::N_PERTURBERS {
            self.query_asteroid(i, t_tdb_days)?
        } else {
            return Err(EphemerisError::BodyIndexOutOfRange {
                index: i,
                bound: constants::N_PERTURBERS,
            });
        };

        self.cache
            .lock()
            .expect("ephemeris cache mutex poisoned")
            .insert(key, state);
        Ok(state)
    }

    fn query_planet(&self, i: usize, t: f64) -> Result<PerturberState, EphemerisError> {
        let gm = constants::perturber_gm(i).expect("i already range-checked by caller");
        let body = self.planets.state(PlanetaryBody(i), t)?;
        Ok(PerturberState {
            gm,
            r: body.r,
            v: body.v,
            a: body.a,
        })
    }

    fn query_asteroid(&self, i: usize, t: f64) -> Result<PerturberState, EphemerisError> {
        let gm = constants::perturber_gm(i).expect("i already range-checked by caller");
        let helio = self.asteroids.heliocentric_position(i - constants::N_EPHEM, t)?;
        let sun = self.query(constants::SUN, t)?;
        let nan = f64::NAN;
        Ok(PerturberState {
            gm,
            r: helio + sun.r,
            v: Vector3::new(nan, nan, nan),
            a: Vector3::new(nan, nan, nan),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TwoBodyEphemeris, ZeroAsteroids};

    #[test]
    fn asteroid_translation_uses_sun_state() {
        let facade = EphemerisFacade::new(TwoBodyEphemeris::sun_only(), ZeroAsteroids);
        let sun = facade.query(constants::SUN, 10.0).unwrap();
        // With a stationary Sun at the origin, asteroid barycentric position equals its
        // (zeroed, in this double) heliocentric position.
        let ceres = facade.query(constants::N_EPHEM, 10.0).unwrap();
        assert_eq!(ceres.r, sun.r);
        assert!(ceres.v.x.is_nan());
    }

    #[test]
    fn out_of_range_index_errors() {
        let facade = EphemerisFacade::new(TwoBodyEphemeris::sun_only(), ZeroAsteroids);
        let err = facade.query(constants::N_PERTURBERS, 0.0).unwrap_err();
        assert_eq!(
            err,
            EphemerisError::BodyIndexOutOfRange {
                index: constants::N_PERTURBERS,
                bound: constants::N_PERTURBERS
            }
        );
    }

    #[test]
    fn epoch_conversion_round_trips_through_seconds() {
        let epoch = epoch_from_tdb_days(1.5);
        assert!((epoch.to_tdb_seconds() - 1.5 * constants::SECONDS_PER_DAY).abs() < 1e-6);
    }

    #[test]
    fn repeated_query_hits_cache() {
        let facade = EphemerisFacade::new(TwoBodyEphemeris::sun_only(), ZeroAsteroids);
        let a = facade.query(constants::EARTH, 5.0).unwrap();
        let b = facade.query(constants::EARTH, 5.0).unwrap();
        assert_eq!(a.r, b.r);
    }
}
