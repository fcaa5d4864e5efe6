//! C1 — direct Newtonian point-mass gravity from every active perturber (§4.C).

use hyperdual::{extract_jacobian_and_result, hyperspace_from_vector, Hyperdual};
use nalgebra::{Const, Matrix3, Matrix3x6, OVector, Vector3};

use super::{ForceTerm, StepContext};
use crate::errors::EphemerisError;
use crate::particles::ParticleState;

/// Sums `a_j -= (GM_i / |d|^3) * d` over every perturber named in `config.active_perturbers`,
/// iterating perturbers outermost (ascending index) so the ephemeris query amortises across
/// particles and summation order is fixed (§5 Ordering).
pub struct DirectGravity;

impl ForceTerm for DirectGravity {
    fn name(&self) -> &'static str {
        "direct_gravity"
    }

    fn acceleration(
        &self,
        state: &ParticleState,
        ctx: &StepContext,
    ) -> Result<Vector3<f64>, EphemerisError> {
        let mut a = Vector3::zeros();
        for &i in &ctx.config.active_perturbers {
            let pert = ctx.perturber(i)?;
            let d = state.r - pert.r;
            let r3 = d.norm().powi(3);
            a -= (pert.gm / r3) * d;
        }
        Ok(a)
    }

    fn jacobian(
        &self,
        state: &ParticleState,
        ctx: &StepContext,
    ) -> Result<Matrix3x6<f64>, EphemerisError> {
        let mut pos_grad = Matrix3::zeros();
        for &i in &ctx.config.active_perturbers {
            let pert = ctx.perturber(i)?;
            let d0 = state.r - pert.r;

            // Promote the separation vector to dual numbers (one dual slot per component) and
            // evaluate the identical `-GM * d / |d|^3` expression; the dual parts come out as
            // the analytic J_ab = 3 d_a d_b / |d|^5 - delta_ab / |d|^3 Jacobian for free.
            let d_dual: OVector<Hyperdual<f64, Const<4>>, Const<3>> = hyperspace_from_vector(&d0);
            let neg_gm = Hyperdual::<f64, Const<4>>::from_real(-pert.gm);
            let r3_dual = hyperdual::linalg::norm(&d_dual).powi(3);
            let a_dual = d_dual * (neg_gm / r3_dual);

            let (_value, grad): (Vector3<f64>, Matrix3<f64>) =
                extract_jacobian_and_result::<_, Const<3>, Const<3>, _>(&a_dual);
            pos_grad += grad;
        }

        let mut jac = Matrix3x6::zeros();
        jac.fixed_view_mut::<3, 3>(0, 0).copy_from(&pos_grad);
        Ok(jac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::constants;
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
    fn jacobian_matches_finite_difference_for_sun_only() {
        let facade = EphemerisFacade::new(TwoBodyEphemeris::sun_only(), ZeroAsteroids);
        let cfg = SimConfig::builder()
            .active_perturbers(vec![constants::SUN])
            .build();
        let ctx = StepContext::new(0.0, &cfg, &facade as &dyn PerturberSource, zero_origin());
        let term = DirectGravity;

        let state = ParticleState {
            r: Vector3::new(1.0, 0.2, -0.1),
            v: Vector3::zeros(),
            a: Vector3::zeros(),
        };

        let analytic = term.jacobian(&state, &ctx).unwrap();

        let h = 1e-6;
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
