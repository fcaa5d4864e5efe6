//! Component G: the session API. Builds a fresh simulation per call, injects real and
//! variational particles, drives the integrator to a target time, and writes the result into
//! caller-owned output buffers (§4.G, §6 external interface). The core is stateless between
//! calls: nothing here outlives one `integrate` invocation, so a `BufferFull` run can always
//! be resumed by re-invoking `integrate` from the last emitted state.

use crate::aggregator::ForceAggregator;
use crate::config::SimConfig;
use crate::dynamics::PerturberSource;
use crate::ephemeris::{EphemerisFacade, PlanetaryEphemeris, SmallBodyEphemeris};
use crate::errors::{IntegratorStatus, SessionError};
use crate::integrator::RadauIntegrator;
use crate::particles::{ParticleSet, ParticleState};
use crate::recorder::Recorder;

/// Result of one `integrate` call: the exit status and the number of output rows written
/// (§4.G). `n_out` bounds how much of `out_time`/`out_state` the caller should read back;
/// on `BufferFull` it is the count at which the buffer ran out of room for a full step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntegratorOutcome {
    pub status: IntegratorStatus,
    pub n_out: usize,
}

fn particles_from_slices(
    instate: &[f64],
    invar_parent: &[usize],
    invar: &[f64],
) -> Result<ParticleSet, SessionError> {
    if instate.len() % 6 != 0 {
        return Err(SessionError::InvalidConfiguration(format!(
            "instate length {} is not a multiple of 6",
            instate.len()
        )));
    }
    if invar.len() % 6 != 0 {
        return Err(SessionError::InvalidConfiguration(format!(
            "invar length {} is not a multiple of 6",
            invar.len()
        )));
    }
    let n_real = instate.len() / 6;
    let n_var = invar.len() / 6;
    let reals = (0..n_real)
        .map(|i| {
            let s: [f64; 6] = instate[6 * i..6 * i + 6].try_into().expect("chunk is length 6");
            ParticleState::from_slice(&s)
        })
        .collect();
    let vars = (0..n_var)
        .map(|i| {
            let s: [f64; 6] = invar[6 * i..6 * i + 6].try_into().expect("chunk is length 6");
            ParticleState::from_slice(&s)
        })
        .collect();
    ParticleSet::new(reals, vars, invar_parent)
}

/// Drives the integrator from `t_start` to `t_end` under `config`, starting at step size
/// `dt_init`, and writes a densely-sampled trajectory into `out_time`/`out_state` (§3 Output
/// buffer layout, §6 external interface). `ephem` supplies perturber states; `instate` is the
/// flattened `(6*n_real)` real-particle state, `invar`/`invar_parent` the flattened
/// `(6*n_var)` variational state and its parallel parent-index vector.
///
/// Returns `Err(SessionError)` only for failures that prevent the run from starting at all
/// (bad configuration, malformed input slices, output buffers too small for even the initial
/// row); every other outcome — including numerical and ephemeris failures mid-run — is
/// reported through `IntegratorOutcome::status` so the caller can always inspect `n_out`.
pub fn integrate<P, A>(
    t_start: f64,
    t_end: f64,
    dt_init: f64,
    config: &SimConfig,
    instate: &[f64],
    invar_parent: &[usize],
    invar: &[f64],
    ephem: &EphemerisFacade<P, A>,
    out_time: &mut [f64],
    out_state: &mut [f64],
) -> Result<IntegratorOutcome, SessionError>
where
    P: PlanetaryEphemeris,
    A: SmallBodyEphemeris,
{
    config.validate()?;
    let mut particles = particles_from_slices(instate, invar_parent, invar)?;
    let n_total = particles.n_total();

    let mut recorder = Recorder::new(out_time, out_state, n_total);
    if !recorder.record_initial(t_start, &particles) {
        return Err(SessionError::OutputBufferTooSmall {
            needed: 6 * n_total,
            have: out_state.len(),
        });
    }

    let aggregator = ForceAggregator::standard();
    let radau = RadauIntegrator::new(config);
    let perturbers: &dyn PerturberSource = ephem;

    let direction = if t_end >= t_start { 1.0 } else { -1.0 };
    let mut t = t_start;
    let mut dt = dt_init.abs().copysign(direction);

    loop {
        let remaining = t_end - t;
        if remaining.abs() <= 0.0 || remaining.signum() != direction.signum() {
            break;
        }
        // With `exact_finish_time`, the final step is clamped so the run lands exactly on
        // `t_end` rather than one step past it (§4.E `integrate_until(t_target, exact_finish_time)`).
        // Without it, the natural step size is always taken and the run may overshoot slightly.
        let dt_try = if config.exact_finish_time && dt.abs() > remaining.abs() {
            remaining
        } else {
            dt
        };

        match radau.step(&mut particles, config, &aggregator, perturbers, t, dt_try) {
            Ok((record, dt_used)) => {
                t += dt_used;
                dt = radau.suggested_next_dt(&record, dt_used).copysign(direction);
                if recorder.on_step_accepted(&record, config).is_err() {
                    return Ok(IntegratorOutcome {
                        status: IntegratorStatus::BufferFull,
                        n_out: recorder.n_written(),
                    });
                }
            }
            Err(e) => {
                log::error!("{e}");
                return Ok(IntegratorOutcome {
                    status: IntegratorStatus::from(&e),
                    n_out: recorder.n_written(),
                });
            }
        }
    }

    Ok(IntegratorOutcome {
        status: IntegratorStatus::Ok,
        n_out: recorder.n_written(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReferenceFrame;
    use crate::constants;
    use crate::test_support::{TwoBodyEphemeris, UnavailableAsteroids, ZeroAsteroids};

    #[test]
    fn straight_line_motion_with_zero_gravity() {
        let facade = EphemerisFacade::new(TwoBodyEphemeris::sun_only(), ZeroAsteroids);
        let cfg = SimConfig::builder()
            .active_perturbers(vec![])
            .earth_harmonics(false)
            .sun_harmonics(false)
            .relativity(crate::config::RelativityModel::None)
            .build();
        let instate = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let mut out_time = vec![0.0; 32];
        let mut out_state = vec![0.0; 32 * 6];
        let outcome = integrate(
            0.0, 10.0, 1.0, &cfg, &instate, &[], &[], &facade, &mut out_time, &mut out_state,
        )
        .unwrap();
        assert_eq!(outcome.status, IntegratorStatus::Ok);
        let last = (outcome.n_out - 1) * 6;
        assert!((out_state[last] - 1.0).abs() < 1e-9);
        assert!(out_state[last + 1].abs() < 1e-9);
        assert!(out_state[last + 2].abs() < 1e-9);
    }

    #[test]
    fn kepler_circular_orbit_returns_near_starting_position_after_one_period() {
        let facade = EphemerisFacade::new(TwoBodyEphemeris::sun_only(), ZeroAsteroids);
        let cfg = SimConfig::builder()
            .active_perturbers(vec![constants::SUN])
            .earth_harmonics(false)
            .sun_harmonics(false)
            .relativity(crate::config::RelativityModel::None)
            .epsilon(1e-9)
            .build();
        let instate = [1.0, 0.0, 0.0, 0.0, 0.0172, 0.0];
        let mut out_time = vec![0.0; 4096];
        let mut out_state = vec![0.0; 4096 * 6];
        let outcome = integrate(
            0.0, 365.25, 1.0, &cfg, &instate, &[], &[], &facade, &mut out_time, &mut out_state,
        )
        .unwrap();
        assert_eq!(outcome.status, IntegratorStatus::Ok);
        let last = (outcome.n_out - 1) * 6;
        let r = (out_state[last].powi(2) + out_state[last + 1].powi(2) + out_state[last + 2].powi(2)).sqrt();
        assert!((r - 1.0).abs() < 1e-3, "radius drifted to {r}");
    }

    #[test]
    fn buffer_full_status_when_output_capacity_is_exhausted() {
        let facade = EphemerisFacade::new(TwoBodyEphemeris::sun_only(), ZeroAsteroids);
        let cfg = SimConfig::builder()
            .active_perturbers(vec![])
            .earth_harmonics(false)
            .sun_harmonics(false)
            .relativity(crate::config::RelativityModel::None)
            .dense_output_nodes(vec![0.5, 1.0])
            .build();
        let instate = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let mut out_time = vec![0.0; 3];
        let mut out_state = vec![0.0; 3 * 6];
        let outcome = integrate(
            0.0, 1000.0, 1.0, &cfg, &instate, &[], &[], &facade, &mut out_time, &mut out_state,
        )
        .unwrap();
        assert_eq!(outcome.status, IntegratorStatus::BufferFull);
        assert!(outcome.n_out <= 3);
    }

    #[test]
    fn ephemeris_error_status_when_asteroid_reader_fails() {
        let facade = EphemerisFacade::new(TwoBodyEphemeris::sun_only(), UnavailableAsteroids);
        let cfg = SimConfig::builder()
            .active_perturbers((0..constants::N_PERTURBERS).collect())
            .earth_harmonics(false)
            .sun_harmonics(false)
            .relativity(crate::config::RelativityModel::None)
            .build();
        let instate = [1.0, 0.0, 0.0, 0.0, 0.0172, 0.0];
        let mut out_time = vec![0.0; 32];
        let mut out_state = vec![0.0; 32 * 6];
        let outcome = integrate(
            0.0, 10.0, 1.0, &cfg, &instate, &[], &[], &facade, &mut out_time, &mut out_state,
        )
        .unwrap();
        assert_eq!(outcome.status, IntegratorStatus::EphemerisError);
    }

    #[test]
    fn geocentric_leo_particle_stays_near_circular_radius() {
        let facade = EphemerisFacade::new(TwoBodyEphemeris::sun_and_circular_earth(1.0, 365.25), ZeroAsteroids);
        let cfg = SimConfig::builder()
            .frame(ReferenceFrame::Geocentric)
            .active_perturbers(vec![constants::EARTH])
            .sun_harmonics(false)
            .relativity(crate::config::RelativityModel::None)
            .dt_min(1e-2)
            .build();
        let r0 = 6778.1366 / constants::AU_KM;
        let instate = [r0, 0.0, 0.0, 0.0, 0.000464, 0.0];
        let mut out_time = vec![0.0; 4096];
        let mut out_state = vec![0.0; 4096 * 6];
        let outcome = integrate(
            0.0, 100.0, 1e-2, &cfg, &instate, &[], &[], &facade, &mut out_time, &mut out_state,
        )
        .unwrap();
        assert_eq!(outcome.status, IntegratorStatus::Ok);
        let last = (outcome.n_out - 1) * 6;
        let r = (out_state[last].powi(2) + out_state[last + 1].powi(2) + out_state[last + 2].powi(2)).sqrt();
        assert!((r - r0).abs() / r0 < 1e-2, "radius drifted to {r} from {r0}");
    }
}
