//! In-memory ephemeris doubles (§4.A, §9 ambient addition "K"). These let the test suite
//! (and any downstream crate exercising this integrator) drive a deterministic run without
//! linking a real JPL DE/SPK reader. Not wired to any file format; every body not explicitly
//! given a trajectory sits motionless at the origin.

use nalgebra::Vector3;

use crate::constants;
use crate::ephemeris::{BodyState, PlanetaryBody, PlanetaryEphemeris, SmallBodyEphemeris};
use crate::errors::EphemerisError;

/// A planetary ephemeris double that places the Sun at a fixed point (the barycenter origin
/// by default) and, optionally, Earth on a circular orbit about it. Every other planetary
/// body sits motionless at the origin, which is sufficient for the test scenarios in §8: none
/// of them exercise third-body perturbations from bodies other than the Sun and Earth.
#[derive(Clone, Copy, Debug)]
pub struct TwoBodyEphemeris {
    sun_r: Vector3<f64>,
    earth: Option<CircularOrbit>,
}

#[derive(Clone, Copy, Debug)]
struct CircularOrbit {
    radius_au: f64,
    period_days: f64,
}

impl TwoBodyEphemeris {
    /// The Sun motionless at the barycenter origin, every other planetary body motionless too.
    pub fn sun_only() -> Self {
        TwoBodyEphemeris {
            sun_r: Vector3::zeros(),
            earth: None,
        }
    }

    /// The Sun motionless at the origin, Earth on a circular orbit of the given radius and
    /// period, used by the Earth-J2-precession and geocentric-reconciliation scenarios.
    pub fn sun_and_circular_earth(radius_au: f64, period_days: f64) -> Self {
        TwoBodyEphemeris {
            sun_r: Vector3::zeros(),
            earth: Some(CircularOrbit {
                radius_au,
                period_days,
            }),
        }
    }
}

impl PlanetaryEphemeris for TwoBodyEphemeris {
    fn state(&self, body: PlanetaryBody, t: f64) -> Result<BodyState, EphemerisError> {
        if body.0 >= constants::N_EPHEM {
            return Err(EphemerisError::BodyIndexOutOfRange {
                index: body.0,
                bound: constants::N_EPHEM,
            });
        }
        if body == PlanetaryBody::SUN {
            return Ok(BodyState {
                r: self.sun_r,
                v: Vector3::zeros(),
                a: Vector3::zeros(),
            });
        }
        if body == PlanetaryBody::EARTH {
            if let Some(orbit) = self.earth {
                let omega = std::f64::consts::TAU / orbit.period_days;
                let theta = omega * t;
                let r = Vector3::new(orbit.radius_au * theta.cos(), orbit.radius_au * theta.sin(), 0.0);
                let v = Vector3::new(
                    -orbit.radius_au * omega * theta.sin(),
                    orbit.radius_au * omega * theta.cos(),
                    0.0,
                );
                let a = -omega * omega * r;
                return Ok(BodyState { r, v, a });
            }
        }
        Ok(BodyState {
            r: Vector3::zeros(),
            v: Vector3::zeros(),
            a: Vector3::zeros(),
        })
    }
}

/// A small-body ephemeris double with every asteroid motionless at the heliocentric origin,
/// used whenever a scenario is not exercising asteroid perturbations directly.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZeroAsteroids;

impl SmallBodyEphemeris for ZeroAsteroids {
    fn heliocentric_position(&self, index: usize, _t: f64) -> Result<Vector3<f64>, EphemerisError> {
        if index >= constants::N_AST {
            return Err(EphemerisError::BodyIndexOutOfRange {
                index: constants::N_EPHEM + index,
                bound: constants::N_PERTURBERS,
            });
        }
        Ok(Vector3::zeros())
    }
}

/// A small-body ephemeris double that always fails, used by the "missing ephemeris"
/// scenario (§8 scenario 6) to exercise `EphemerisError::Unavailable` without touching the
/// filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableAsteroids;

impl SmallBodyEphemeris for UnavailableAsteroids {
    fn heliocentric_position(&self, _index: usize, _t: f64) -> Result<Vector3<f64>, EphemerisError> {
        Err(EphemerisError::Unavailable {
            reason: "JPL_SB_EPHEM path does not exist".to_string(),
        })
    }
}

/// A small-body ephemeris double that perturbs every asteroid by a fixed offset from the
/// origin, used by the "asteroid perturbation toggle" scenario (§8 scenario 4) to produce a
/// non-trivial but deterministic third-body pull.
#[derive(Clone, Copy, Debug)]
pub struct OffsetAsteroids {
    pub offset_au: f64,
}

impl SmallBodyEphemeris for OffsetAsteroids {
    fn heliocentric_position(&self, index: usize, _t: f64) -> Result<Vector3<f64>, EphemerisError> {
        if index >= constants::N_AST {
            return Err(EphemerisError::BodyIndexOutOfRange {
                index: constants::N_EPHEM + index,
                bound: constants::N_PERTURBERS,
            });
        }
        // Spread the asteroids out slightly so they don't all sit in the same direction.
        let angle = std::f64::consts::TAU * (index as f64) / (constants::N_AST as f64);
        Ok(Vector3::new(
            self.offset_au * angle.cos(),
            self.offset_au * angle.sin(),
            0.0,
        ))
    }
}
