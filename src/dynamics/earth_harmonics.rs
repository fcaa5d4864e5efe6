//! C2 — Earth J2/J4 zonal harmonics (§4.C), evaluated in the Earth body-equatorial frame and
//! rotated back into ICRF via `Frame::rotate_jacobian3x6` (§4.B).

use hyperdual::{extract_jacobian_and_result, hyperspace_from_vector, Hyperdual};
use nalgebra::{Const, Matrix3, Matrix3x6, OVector, Vector3};

use super::{ForceTerm, StepContext};
use crate::constants;
use crate::errors::EphemerisError;
use crate::particles::ParticleState;

/// Newtonian zonal-harmonic acceleration for a body with equatorial radius `r_eq` and zonal
/// coefficients `j2`, `j4`, evaluated at body-equatorial position `p`. Written once and reused
/// for both the plain `f64` acceleration and the `Hyperdual` Jacobian evaluation, same as the
/// direct-gravity term (§4.C invariant).
fn zonal_acceleration(gm: f64, r_eq: f64, j2: f64, j4: f64, p: Vector3<f64>) -> Vector3<f64> {
    let r2 = p.norm_squared();
    let r = r2.sqrt();
    let z2_r2 = (p.z * p.z) / r2;

    let f2 = 1.5 * j2 * gm * r_eq * r_eq / (r2 * r2 * r);
    let a2 = Vector3::new(
        -f2 * p.x * (1.0 - 5.0 * z2_r2),
        -f2 * p.y * (1.0 - 5.0 * z2_r2),
        -f2 * p.z * (3.0 - 5.0 * z2_r2),
    );

    let r4 = r_eq.powi(4);
    let f4 = (15.0 / 8.0) * j4 * gm * r4 / (r2.powi(3) * r);
    let a4 = Vector3::new(
        f4 * p.x * (1.0 - 14.0 * z2_r2 + 21.0 * z2_r2 * z2_r2),
        f4 * p.y * (1.0 - 14.0 * z2_r2 + 21.0 * z2_r2 * z2_r2),
        f4 * p.z * (5.0 - (70.0 / 3.0) * z2_r2 + 21.0 * z2_r2 * z2_r2),
    );

    a2 + a4
}

fn zonal_acceleration_dual(
    gm: f64,
    r_eq: f64,
    j2: f64,
    j4: f64,
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
    let a2x = -f2 * p.x * (one - five * z2_r2);
    let a2y = -f2 * p.y * (one - five * z2_r2);
    let a2z = -f2 * p.z * (three - five * z2_r2);

    let f4 = h((15.0 / 8.0) * j4 * gm * r_eq.powi(4)) / (r2 * r2 * r2 * r);
    let fourteen = h(14.0);
    let twentyone = h(21.0);
    let a4x = f4 * p.x * (one - fourteen * z2_r2 + twentyone * z2_r2 * z2_r2);
    let a4y = f4 * p.y * (one - fourteen * z2_r2 + twentyone * z2_r2 * z2_r2);
    let a4z = f4 * p.z * (h(5.0) - h(70.0 / 3.0) * z2_r2 + twentyone * z2_r2 * z2_r2);

    Vector3::new(a2x + a4x, a2y + a4y, a2z + a4z)
}

pub struct EarthHarmonics;

impl ForceTerm for EarthHarmonics {
    fn name(&self) -> &'static str {
        "earth_harmonics"
    }

    fn acceleration(
        &self,
        state: &ParticleState,
        ctx: &StepContext,
    ) -> Result<Vector3<f64>, EphemerisError> {
        if !ctx.config.earth_harmonics {
            return Ok(Vector3::zeros());
        }
        let earth = ctx.perturber(constants::EARTH)?;
        let d = state.r - earth.r;
        let p = constants::EARTH_POLE.rotate(&d);
        let a_body = zonal_acceleration(earth.gm, constants::R_EARTH_EQ_AU, constants::J2_EARTH, constants::J4_EARTH, p);
        Ok(constants::EARTH_POLE.inverse_rotate(&a_body))
    }

    fn jacobian(
        &self,
        state: &ParticleState,
        ctx: &StepContext,
    ) -> Result<Matrix3x6<f64>, EphemerisError> {
        if !ctx.config.earth_harmonics {
            return Ok(Matrix3x6::zeros());
        }
        let earth = ctx.perturber(constants::EARTH)?;
        let d = state.r - earth.r;
        let p = constants::EARTH_POLE.rotate(&d);

        let p_dual: OVector<Hyperdual<f64, Const<4>>, Const<3>> = hyperspace_from_vector(&p);
        let a_dual = zonal_acceleration_dual(
            earth.gm,
            constants::R_EARTH_EQ_AU,
            constants::J2_EARTH,
            constants::J4_EARTH,
            &p_dual,
        );
        let (_value, grad): (Vector3<f64>, Matrix3<f64>) =
            extract_jacobian_and_result::<_, Const<3>, Const<3>, _>(&a_dual);

        let mut body_jac = Matrix3x6::zeros();
        body_jac.fixed_view_mut::<3, 3>(0, 0).copy_from(&grad);
        Ok(constants::EARTH_POLE.rotate_jacobian3x6(&body_jac))
    }
}
