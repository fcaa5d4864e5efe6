//! Force aggregator (§4.D): sums every force term into each real particle's acceleration, and
//! propagates the same terms' Jacobians into its variational partners' accelerations via the
//! linearised equations of motion `δa = (∂a/∂r, ∂a/∂v) · (δr, δv)`, evaluated at the parent's
//! state so the variational block tracks the reference trajectory it is attached to.

use nalgebra::{Vector3, Vector6};
#[cfg(feature = "parallel-forces")]
use rayon::prelude::*;

use crate::config::{ReferenceFrame, SimConfig};
use crate::constants;
use crate::dynamics::{
    DamourDeruelle, DirectGravity, EarthHarmonics, EinsteinInfeldHoffmann, ForceTerm,
    NonGravitational, PerturberSource, StepContext, SunHarmonics,
};
use crate::ephemeris::PerturberState;
use crate::errors::IntegratorError;
use crate::particles::{ParticleSet, ParticleState};

/// Sums every C1-C6 force term in the fixed order direct gravity, Earth harmonics, Sun
/// harmonics, non-gravitational, then relativistic (§4.C); the three relativity/non-grav terms
/// self-disable via `config` rather than being conditionally included, so the evaluation order
/// never changes between runs.
pub struct ForceAggregator {
    terms: Vec<Box<dyn ForceTerm>>,
}

impl ForceAggregator {
    pub fn standard() -> Self {
        ForceAggregator {
            terms: vec![
                Box::new(DirectGravity),
                Box::new(EarthHarmonics),
                Box::new(SunHarmonics),
                Box::new(NonGravitational),
                Box::new(DamourDeruelle),
                Box::new(EinsteinInfeldHoffmann),
            ],
        }
    }

    fn accelerate_real(
        &self,
        state: &ParticleState,
        idx: usize,
        ctx: &StepContext,
    ) -> Result<Vector3<f64>, IntegratorError> {
        let mut a = Vector3::zeros();
        for term in &self.terms {
            let contrib = term.acceleration(state, ctx)?;
            if !contrib.iter().all(|c| c.is_finite()) {
                return Err(IntegratorError::NumericalFailure {
                    term: term.name(),
                    particle_index: idx,
                });
            }
            a += contrib;
        }
        Ok(a)
    }

    fn accelerate_variational(
        &self,
        parent_state: &ParticleState,
        delta: &ParticleState,
        var_index: usize,
        ctx: &StepContext,
    ) -> Result<Vector3<f64>, IntegratorError> {
        let delta_vec = Vector6::new(delta.r.x, delta.r.y, delta.r.z, delta.v.x, delta.v.y, delta.v.z);
        let mut da = Vector3::zeros();
        for term in &self.terms {
            let jac = term.jacobian(parent_state, ctx)?;
            let contrib = jac * delta_vec;
            if !contrib.iter().all(|c| c.is_finite()) {
                return Err(IntegratorError::NumericalFailure {
                    term: term.name(),
                    particle_index: var_index,
                });
            }
            da += contrib;
        }
        Ok(da)
    }

    /// Resolves the active reference origin for this evaluation (§4.D step 1): zero for
    /// barycentric runs, Earth's contemporaneous barycentric state for geocentric runs. Queried
    /// fresh at every evaluation time rather than cached across a step, since Earth moves
    /// between Radau sub-nodes.
    fn origin_state(
        config: &SimConfig,
        perturbers: &dyn PerturberSource,
        t_tdb_days: f64,
    ) -> Result<PerturberState, IntegratorError> {
        match config.frame {
            ReferenceFrame::Barycentric => Ok(PerturberState::zero()),
            ReferenceFrame::Geocentric => Ok(perturbers.query(constants::EARTH, t_tdb_days)?),
        }
    }

    /// Fills in `a` for every real and variational particle in `particles` at time
    /// `t_tdb_days`, resolving the active reference origin itself (zero for barycentric runs,
    /// Earth's barycentric state for geocentric runs) and applying the geocentric indirect
    /// term (§4.D step 4): Earth's own ephemeris acceleration subtracted from every real
    /// particle, since the origin itself is accelerating under the same Newtonian field.
    pub fn accelerate(
        &self,
        particles: &mut ParticleSet,
        config: &SimConfig,
        perturbers: &dyn PerturberSource,
        t_tdb_days: f64,
    ) -> Result<(), IntegratorError> {
        let origin = Self::origin_state(config, perturbers, t_tdb_days)?;
        let ctx = StepContext::new(t_tdb_days, config, perturbers, origin);

        #[cfg(feature = "parallel-forces")]
        let real_accels: Vec<Vector3<f64>> = particles
            .reals
            .par_iter()
            .enumerate()
            .map(|(idx, p)| self.accelerate_real(p, idx, &ctx))
            .collect::<Result<Vec<_>, _>>()?;
        #[cfg(not(feature = "parallel-forces"))]
        let real_accels: Vec<Vector3<f64>> = particles
            .reals
            .iter()
            .enumerate()
            .map(|(idx, p)| self.accelerate_real(p, idx, &ctx))
            .collect::<Result<Vec<_>, _>>()?;

        for (p, a) in particles.reals.iter_mut().zip(real_accels.into_iter()) {
            p.a = a;
        }

        if config.frame == ReferenceFrame::Geocentric {
            for p in particles.reals.iter_mut() {
                p.a -= origin.a;
            }
        }

        let reals = particles.reals.clone();
        let links = particles.links.clone();

        #[cfg(feature = "parallel-forces")]
        let var_accels: Vec<Vector3<f64>> = links
            .par_iter()
            .zip(particles.vars.par_iter())
            .map(|(link, delta)| {
                self.accelerate_variational(&reals[link.parent], delta, link.index, &ctx)
            })
            .collect::<Result<Vec<_>, _>>()?;
        #[cfg(not(feature = "parallel-forces"))]
        let var_accels: Vec<Vector3<f64>> = links
            .iter()
            .zip(particles.vars.iter())
            .map(|(link, delta)| {
                self.accelerate_variational(&reals[link.parent], delta, link.index, &ctx)
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (p, a) in particles.vars.iter_mut().zip(var_accels.into_iter()) {
            p.a = a;
        }

        Ok(())
    }
}

impl Default for ForceAggregator {
    fn default() -> Self {
        Self::standard()
    }
}
