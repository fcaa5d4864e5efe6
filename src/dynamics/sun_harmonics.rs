//! C3 — Sun J2 oblateness (§4.C), same shape as the Earth term (C2) but J2-only and rotated
//! through the Sun's body-equatorial frame instead.

use hyperdual::{extract_jacobian_and_result, hyperspace_from_vector, Hyperdual};
use nalgebra::{Const, Matrix3, Matrix3x6, OVector, Vector3};

use super::{ForceTerm, StepContext};
use crate::constants;
use crate::errors::EphemerisError;
use crate::particles::ParticleState;

fn j2_acceleration(gm: f64, r_eq: f64, j2: f64, p: Vector3<f64>) -> Vector3<f64> {
    let r2 = p.norm_squared();
    let r = r2.sqrt();
    let z2_r2 = (p.z * p.z) / r2;
    let f2 = 1.5 * j2 * gm * r_eq * r_eq / (r2 * r2 * r);
    Vector3::new(
        -f2 * p.x * (1.0 - 5.0 * z2_r2),
        -f2 * p.y * (1.0 - 5.0 * z2_r2),
        -f2 * p.z * (3.0 - 5.0 * z2_r2),
    )
}

fn j2_acceleration_dual(
    gm: f64,
    r_eq: f64,
    j2: f64,
    p: &OVector<Hyperdual<f64, Const<4>>, Const<3>>,
) -> OVector<Hyperdual<f64, Const<4>>, Const<3>> {
    let h = |x: f64| Hyperdual::<f64, Const<4>>::from_real(x);
    let r2 = hyperdual::linalg::norm(p).powi(2);
    let r = r2.sqrt();
    let z2_r2 = (p.z * p.z) / r2;
    let f2 = h(1.5 * j2 * gm * r_eq * r_eq) / (r2 * r2 * r);
    let one = h(1.0);
    let three = h(3.0);
    let five = h(5.0);
    Vector3::new(
        -f2 * p.x * (one - five * z2_r2),
        -f2 * p.y * (one - five * z2_r2),
        -f2 * p.z * (three - five * z2_r2),
    )
}

pub struct SunHarmonics;

impl ForceTerm for SunHarmonics {
    fn name(&self) -> &'static str {
        "sun_harmonics"
    }

    fn acceleration(
        &self,
        state: &ParticleState,
        ctx: &StepContext,
    ) -> Result<Vector3<f64>, EphemerisError> {
        if !ctx.config.sun_harmonics {
            return Ok(Vector3::zeros());
        }
        let sun = ctx.sun()?;
        let d = state.r - sun.r;
        let p = constants::SUN_POLE.rotate(&d);
        let a_body = j2_acceleration(sun.gm, constants::R_SUN_EQ_AU, constants::J2_SUN, p);
        Ok(constants::SUN_POLE.inverse_rotate(&a_body))
    }

    fn jacobian(
        &self,
        state: &ParticleState,
        ctx: &StepContext,
    ) -> Result<Matrix3x6<f64>, EphemerisError> {
        if !ctx.config.sun_harmonics {
            return Ok(Matrix3x6::zeros());
        }
        let sun = ctx.sun()?;
        let d = state.r - sun.r;
        let p = constants::SUN_POLE.rotate(&d);

        let p_dual: OVector<Hyperdual<f64, Const<4>>, Const<3>> = hyperspace_from_vector(&p);
        let a_dual = j2_acceleration_dual(sun.gm, constants::R_SUN_EQ_AU, constants::J2_SUN, &p_dual);
        let (_value, grad): (Vector3<f64>, Matrix3<f64>) =
            extract_jacobian_and_result::<_, Const<3>, Const<3>, _>(&a_dual);

        let mut body_jac = Matrix3x6::zeros();
        body_jac.fixed_view_mut::<3, 3>(0, 0).copy_from(&grad);
        Ok(constants::SUN_POLE.rotate_jacobian3x6(&body_jac))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
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
    fn disabled_flag_zeroes_term() {
        let facade = EphemerisFacade::new(TwoBodyEphemeris::sun_only(), ZeroAsteroids);
        let cfg = SimConfig::builder().sun_harmonics(false).build();
        let ctx = StepContext::new(0.0, &cfg, &facade as &dyn PerturberSource, zero_origin());
        let term = SunHarmonics;
        let state = ParticleState {
            r: Vector3::new(1.0, 0.2, 0.1),
            v: Vector3::zeros(),
            a: Vector3::zeros(),
        };
        assert_eq!(term.acceleration(&state, &ctx).unwrap(), Vector3::zeros());
    }

    #[test]
    fn jacobian_matches_finite_difference() {
        let facade = EphemerisFacade::new(TwoBodyEphemeris::sun_only(), ZeroAsteroids);
        let cfg = SimConfig::builder().build();
        let ctx = StepContext::new(0.0, &cfg, &facade as &dyn PerturberSource, zero_origin());
        let term = SunHarmonics;
        let state = ParticleState {
            r: Vector3::new(1.0, 0.3, 0.2),
            v: Vector3::zeros(),
            a: Vector3::zeros(),
        };

        let analytic = term.jacobian(&state, &ctx).unwrap();

        let h = 1e-7;
        let mut fd = Matrix3::zeros();
        for k in 0..3 {
            let mut plus = state;
            let mut minus = state;
            plus.r[k] += h;
            minus.r[k] -= h;
            let ap = term.acceleration(&plus, &ctx).unwrap();
            let am = term.acceleration(&minus, &ctx).unwrap();
            let col = (ap - am) / (2.0 * h);
            fd.fixed_view_mut::<3, 1>(0, k).copy_from(&col);
        }

        assert_relative_eq!(analytic.fixed_view::<3, 3>(0, 0).into_owned(), fd, epsilon = 1e-6);
    }
}
