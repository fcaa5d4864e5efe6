//! C4 — non-gravitational acceleration parameterised by the `A1/A2/A3` coefficients (§4.C),
//! short-circuiting to zero whenever every coefficient is zero so disabling the term costs
//! nothing beyond the `is_zero` check.

use hyperdual::{extract_jacobian_and_result, hyperspace_from_vector, Hyperdual};
use nalgebra::{Const, Matrix3x6, OVector, Vector3, Vector6};

use super::{ForceTerm, StepContext};
use crate::errors::EphemerisError;
use crate::particles::ParticleState;

/// `a = A1·g·d̂ + A2·g·τ̂ + A3·g·ĥ`, with `h = d×w`, `τ = h×d`, `g(r) = 1/r²`, evaluated on the
/// heliocentric separation `d` and velocity `w`.
fn nongrav_acceleration(a1: f64, a2: f64, a3: f64, d: Vector3<f64>, w: Vector3<f64>) -> Vector3<f64> {
    let r = d.norm();
    let g = 1.0 / (r * r);
    let d_hat = d / r;
    let h = d.cross(&w);
    let h_hat = h / h.norm();
    let tau = h.cross(&d);
    let tau_hat = tau / tau.norm();
    g * (a1 * d_hat + a2 * tau_hat + a3 * h_hat)
}

fn cross_dual(
    a: Vector3<Hyperdual<f64, Const<7>>>,
    b: Vector3<Hyperdual<f64, Const<7>>>,
) -> Vector3<Hyperdual<f64, Const<7>>> {
    Vector3::new(
        a.y * b.z - a.z * b.y,
        a.z * b.x - a.x * b.z,
        a.x * b.y - a.y * b.x,
    )
}

fn nongrav_acceleration_dual(
    a1: f64,
    a2: f64,
    a3: f64,
    d: Vector3<Hyperdual<f64, Const<7>>>,
    w: Vector3<Hyperdual<f64, Const<7>>>,
) -> Vector3<Hyperdual<f64, Const<7>>> {
    let h_ = |x: f64| Hyperdual::<f64, Const<7>>::from_real(x);
    let r = hyperdual::linalg::norm(&d);
    let g = h_(1.0) / (r * r);
    let d_hat = d / r;
    let h = cross_dual(d, w);
    let h_mag = hyperdual::linalg::norm(&h);
    let h_hat = h / h_mag;
    let tau = cross_dual(h, d);
    let tau_mag = hyperdual::linalg::norm(&tau);
    let tau_hat = tau / tau_mag;
    (d_hat * h_(a1) + tau_hat * h_(a2) + h_hat * h_(a3)) * g
}

pub struct NonGravitational;

impl ForceTerm for NonGravitational {
    fn name(&self) -> &'static str {
        "nongrav"
    }

    fn acceleration(
        &self,
        state: &ParticleState,
        ctx: &StepContext,
    ) -> Result<Vector3<f64>, EphemerisError> {
        if ctx.config.nongrav.is_zero() {
            return Ok(Vector3::zeros());
        }
        let sun = ctx.sun()?;
        let d = state.r - sun.r;
        let w = state.v - sun.v;
        let cfg = &ctx.config.nongrav;
        Ok(nongrav_acceleration(cfg.a1, cfg.a2, cfg.a3, d, w))
    }

    fn jacobian(
        &self,
        state: &ParticleState,
        ctx: &StepContext,
    ) -> Result<Matrix3x6<f64>, EphemerisError> {
        if ctx.config.nongrav.is_zero() {
            return Ok(Matrix3x6::zeros());
        }
        let sun = ctx.sun()?;
        let d0 = state.r - sun.r;
        let w0 = state.v - sun.v;

        let pos_vel = Vector6::new(d0.x, d0.y, d0.z, w0.x, w0.y, w0.z);
        let dual: OVector<Hyperdual<f64, Const<7>>, Const<6>> = hyperspace_from_vector(&pos_vel);
        let d = dual.fixed_rows::<3>(0).into_owned();
        let w = dual.fixed_rows::<3>(3).into_owned();

        let cfg = &ctx.config.nongrav;
        let a_dual = nongrav_acceleration_dual(cfg.a1, cfg.a2, cfg.a3, d, w);
        let (_value, grad): (Vector3<f64>, Matrix3x6<f64>) =
            extract_jacobian_and_result::<_, Const<3>, Const<6>, _>(&a_dual);
        Ok(grad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NonGravConfig, SimConfig};
    use crate::dynamics::PerturberSource;
    use crate::ephemeris::{EphemerisFacade, PerturberState};
    use crate::test_support::{TwoBodyEphemeris, ZeroAsteroids};
    use approx::assert_relative_eq;

    fn zero_origin() -> PerturberState {
        PerturberState {
            gm: 0.0,
            r: Vector3::zeros(),
            v: Vector3::zeros(),
            a: Vector3::zeros(),
        }
    }

    #[test]
    fn zero_coefficients_short_circuit() {
        let facade = EphemerisFacade::new(TwoBodyEphemeris::sun_only(), ZeroAsteroids);
        let cfg = SimConfig::default();
        let ctx = StepContext::new(0.0, &cfg, &facade as &dyn PerturberSource, zero_origin());
        let term = NonGravitational;
        let state = ParticleState {
            r: Vector3::new(1.0, 0.0, 0.0),
            v: Vector3::new(0.0, 1.0, 0.0),
            a: Vector3::zeros(),
        };
        assert_eq!(term.acceleration(&state, &ctx).unwrap(), Vector3::zeros());
        assert_eq!(term.jacobian(&state, &ctx).unwrap(), Matrix3x6::zeros());
    }

    #[test]
    fn radial_only_acceleration_is_colinear_with_heliocentric_radius() {
        let facade = EphemerisFacade::new(TwoBodyEphemeris::sun_only(), ZeroAsteroids);
        let cfg = SimConfig::builder()
            .nongrav(NonGravConfig {
                a1: 1e-8,
                a2: 0.0,
                a3: 0.0,
            })
            .build();
        let ctx = StepContext::new(0.0, &cfg, &facade as &dyn PerturberSource, zero_origin());
        let term = NonGravitational;
        let state = ParticleState {
            r: Vector3::new(2.0, 0.0, 0.0),
            v: Vector3::new(0.0, 0.5, 0.0),
            a: Vector3::zeros(),
        };
        let a = term.acceleration(&state, &ctx).unwrap();
        let r_hat = state.r.normalize();
        let cross = a.cross(&r_hat);
        assert_relative_eq!(cross, Vector3::zeros(), epsilon = 1e-18);
    }

    #[test]
    fn jacobian_matches_finite_difference() {
        let facade = EphemerisFacade::new(TwoBodyEphemeris::sun_only(), ZeroAsteroids);
        let cfg = SimConfig::builder()
            .nongrav(NonGravConfig {
                a1: 2e-9,
                a2: -1e-9,
                a3: 3e-10,
            })
            .build();
        let ctx = StepContext::new(0.0, &cfg, &facade as &dyn PerturberSource, zero_origin());
        let term = NonGravitational;
        let state = ParticleState {
            r: Vector3::new(1.5, 0.3, -0.2),
            v: Vector3::new(-0.1, 0.9, 0.05),
            a: Vector3::zeros(),
        };

        let analytic = term.jacobian(&state, &ctx).unwrap();

        let h = 1e-6;
        let mut fd = Matrix3x6::zeros();
        for k in 0..6 {
            let mut plus = state;
            let mut minus = state;
            if k < 3 {
                plus.r[k] += h;
                minus.r[k] -= h;
            } else {
                plus.v[k - 3] += h;
                minus.v[k - 3] -= h;
            }
            let ap = term.acceleration(&plus, &ctx).unwrap();
            let am = term.acceleration(&minus, &ctx).unwrap();
            let col = (ap - am) / (2.0 * h);
            fd.fixed_view_mut::<3, 1>(0, k).copy_from(&col);
        }

        assert_relative_eq!(analytic, fd, epsilon = 1e-3);
    }
}
