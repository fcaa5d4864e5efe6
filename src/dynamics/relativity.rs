//! C5/C6 — relativistic correction terms (§4.C). Both use the same isotropic PPN
//! (`β = γ = 1`) one-body correction against the Sun; `EinsteinInfeldHoffmann` is written as a
//! sum over `eih_active_bodies()`, which currently contains only the Sun (mirroring
//! `DamourDeruelle`'s domain) but ranges over every planetary-ephemeris index so a later
//! revision can widen it without restructuring the term.

use hyperdual::{extract_jacobian_and_result, hyperspace_from_vector, Hyperdual};
use nalgebra::{Const, Matrix3x6, OVector, Vector3, Vector6};

use super::{ForceTerm, StepContext};
use crate::errors::EphemerisError;
use crate::particles::ParticleState;

fn pn_term(gm: f64, c2: f64, r: Vector3<f64>, v: Vector3<f64>) -> Vector3<f64> {
    let r_mag = r.norm();
    let r3 = r_mag.powi(3);
    let v_sq = v.dot(&v);
    let r_dot_v = r.dot(&v);
    (gm / (c2 * r3)) * ((4.0 * gm / r_mag - v_sq) * r + 4.0 * r_dot_v * v)
}

fn pn_term_dual(
    gm: f64,
    c2: f64,
    r: Vector3<Hyperdual<f64, Const<7>>>,
    v: Vector3<Hyperdual<f64, Const<7>>>,
) -> Vector3<Hyperdual<f64, Const<7>>> {
    let h = |x: f64| Hyperdual::<f64, Const<7>>::from_real(x);
    let r_mag = hyperdual::linalg::norm(&r);
    let r3 = r_mag.powi(3);
    let v_sq = v.x * v.x + v.y * v.y + v.z * v.z;
    let r_dot_v = r.x * v.x + r.y * v.y + r.z * v.z;
    let coeff = h(gm) / (h(c2) * r3);
    let scalar = h(4.0 * gm) / r_mag - v_sq;
    (r * scalar + v * (h(4.0) * r_dot_v)) * coeff
}

/// Perturbers the Einstein-Infeld-Hoffmann sum currently runs over. The loop in
/// `eih_active_bodies` ranges over every planetary-ephemeris index so a future revision can
/// widen this list without restructuring the term; for now it mirrors `DamourDeruelle`'s
/// Sun-only domain.
const EIH_ACTIVE_BODIES: &[usize] = &[crate::constants::SUN];

fn eih_active_bodies() -> Vec<usize> {
    (0..crate::constants::N_EPHEM)
        .filter(|i| EIH_ACTIVE_BODIES.contains(i))
        .collect()
}

fn sum_acceleration(
    state: &ParticleState,
    ctx: &StepContext,
    bodies: &[usize],
) -> Result<Vector3<f64>, EphemerisError> {
    let mut a = Vector3::zeros();
    let c2 = ctx.config.c2();
    for &i in bodies {
        let body = ctx.perturber(i)?;
        let r = state.r - body.r;
        let v = state.v - body.v;
        a += pn_term(body.gm, c2, r, v);
    }
    Ok(a)
}

fn sum_jacobian(
    state: &ParticleState,
    ctx: &StepContext,
    bodies: &[usize],
) -> Result<Matrix3x6<f64>, EphemerisError> {
    let c2 = ctx.config.c2();
    let mut jac = Matrix3x6::zeros();
    for &i in bodies {
        let body = ctx.perturber(i)?;
        let r = state.r - body.r;
        let v = state.v - body.v;

        let pos_vel = Vector6::new(r.x, r.y, r.z, v.x, v.y, v.z);
        let dual: OVector<Hyperdual<f64, Const<7>>, Const<6>> = hyperspace_from_vector(&pos_vel);
        let r_d = dual.fixed_rows::<3>(0).into_owned();
        let v_d = dual.fixed_rows::<3>(3).into_owned();

        let a_dual = pn_term_dual(body.gm, c2, r_d, v_d);
        let (_value, grad): (Vector3<f64>, Matrix3x6<f64>) =
            extract_jacobian_and_result::<_, Const<3>, Const<6>, _>(&a_dual);
        jac += grad;
    }
    Ok(jac)
}

/// Single-body PPN correction against the Sun only, the classical Damour-Deruelle form used
/// for main-belt asteroids and comets where the Sun overwhelmingly dominates the relativistic
/// contribution.
pub struct DamourDeruelle;

impl ForceTerm for DamourDeruelle {
    fn name(&self) -> &'static str {
        "relativity_damour_deruelle"
    }

    fn acceleration(
        &self,
        state: &ParticleState,
        ctx: &StepContext,
    ) -> Result<Vector3<f64>, EphemerisError> {
        use crate::config::RelativityModel;
        if ctx.config.relativity != RelativityModel::DamourDeruelle {
            return Ok(Vector3::zeros());
        }
        sum_acceleration(state, ctx, &[crate::constants::SUN])
    }

    fn jacobian(
        &self,
        state: &ParticleState,
        ctx: &StepContext,
    ) -> Result<Matrix3x6<f64>, EphemerisError> {
        use crate::config::RelativityModel;
        if ctx.config.relativity != RelativityModel::DamourDeruelle {
            return Ok(Matrix3x6::zeros());
        }
        sum_jacobian(state, ctx, &[crate::constants::SUN])
    }
}

/// Sums the same one-body PPN term over every active perturber rather than just the Sun.
pub struct EinsteinInfeldHoffmann;

impl ForceTerm for EinsteinInfeldHoffmann {
    fn name(&self) -> &'static str {
        "relativity_eih"
    }

    fn acceleration(
        &self,
        state: &ParticleState,
        ctx: &StepContext,
    ) -> Result<Vector3<f64>, EphemerisError> {
        use crate::config::RelativityModel;
        if ctx.config.relativity != RelativityModel::Eih {
            return Ok(Vector3::zeros());
        }
        sum_acceleration(state, ctx, &eih_active_bodies())
    }

    fn jacobian(
        &self,
        state: &ParticleState,
        ctx: &StepContext,
    ) -> Result<Matrix3x6<f64>, EphemerisError> {
        use crate::config::RelativityModel;
        if ctx.config.relativity != RelativityModel::Eih {
            return Ok(Matrix3x6::zeros());
        }
        sum_jacobian(state, ctx, &eih_active_bodies())
    }
}
