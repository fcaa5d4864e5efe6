//! Component E: the adaptive Gauss-Radau ("IAS15-style") step controller.
//!
//! The classical Everhart/IAS15 algorithm fits an acceleration polynomial
//! `a(s) = a0 + b0*s + b1*s^2 + ... + b6*s^7` (`s` the fraction of the step, `0<=s<=1`) through
//! eight evaluations of the force model, then integrates that polynomial twice to predict
//! position and velocity at any `s`. Rather than hard-coding the Everhart `c`/`d` conversion
//! matrices, `b_coefficients_from_samples` derives the monomial coefficients at runtime from
//! the node spacings themselves via Newton's divided-difference method — the same mathematics,
//! computed instead of copied, and the only numbers it depends on are the published `H` nodes.

use nalgebra::Vector3;

use crate::aggregator::ForceAggregator;
use crate::config::SimConfig;
use crate::dynamics::PerturberSource;
use crate::errors::IntegratorError;
use crate::particles::ParticleSet;

/// Normalised Gauss-Radau node spacings, `H[0] = 0` (the step start) through `H[7]`, the last
/// of the seven interior nodes; the step's right endpoint (`s = 1`) is reconstructed from the
/// polynomial rather than separately evaluated.
pub const H: [f64; 8] = [
    0.0,
    0.0562625605369221464656522,
    0.1802406917368923649875799,
    0.3526247171131696373739078,
    0.5471536263305553830014486,
    0.7342101772154105410531523,
    0.8853209468390957680903598,
    0.9775206135612875018911745,
];

/// `b[0..=6]` acceleration-polynomial coefficients for one particle, plus the frozen state the
/// polynomial is expanded about (§3 `StepRecord`).
#[derive(Clone, Copy, Debug)]
pub struct ParticleStepRecord {
    pub x0: Vector3<f64>,
    pub v0: Vector3<f64>,
    pub a0: Vector3<f64>,
    pub b: [Vector3<f64>; 7],
}

impl ParticleStepRecord {
    fn zero(x0: Vector3<f64>, v0: Vector3<f64>, a0: Vector3<f64>) -> Self {
        ParticleStepRecord {
            x0,
            v0,
            a0,
            b: [Vector3::zeros(); 7],
        }
    }
}

/// Everything the dense-output recorder needs once a step has been accepted: every particle's
/// frozen start-of-step state and converged `b`-coefficients, plus the step's time span.
#[derive(Clone, Debug)]
pub struct StepRecord {
    pub t_begin: f64,
    pub dt: f64,
    pub particles: Vec<ParticleStepRecord>,
}

/// Evaluates the position/velocity Taylor-like expansion at fraction `hg` of a step of length
/// `dt`, given the frozen `(x0, v0, a0)` and the converged `b` coefficients. Shared by the
/// integrator's own node predictor and by the dense-output recorder (§4.F): both are the same
/// polynomial, just evaluated at different `hg`.
///
/// The nested Horner form below is in `s = hg` alone — `dt` is factored out once per order
/// (`dt` for velocity, `dt^2` for position) rather than folded into the nesting variable, since
/// the acceleration polynomial lives in the dimensionless `s` domain and only real time `t =
/// dt*s` picks up the extra power.
pub fn dense_state(
    x0: Vector3<f64>,
    v0: Vector3<f64>,
    a0: Vector3<f64>,
    b: &[Vector3<f64>; 7],
    dt: f64,
    hg: f64,
) -> (Vector3<f64>, Vector3<f64>) {
    let s = hg;
    let v_inner = a0
        + s * (b[0] / 2.0
            + s * (b[1] / 3.0
                + s * (b[2] / 4.0
                    + s * (b[3] / 5.0 + s * (b[4] / 6.0 + s * (b[5] / 7.0 + s * (b[6] / 8.0)))))));
    let x_inner = a0 / 2.0
        + s * (b[0] / 6.0
            + s * (b[1] / 12.0
                + s * (b[2] / 20.0
                    + s * (b[3] / 30.0 + s * (b[4] / 42.0 + s * (b[5] / 56.0 + s * (b[6] / 72.0)))))));
    let v = v0 + dt * s * v_inner;
    let x = x0 + dt * s * v0 + dt * dt * s * s * x_inner;
    (x, v)
}

/// Converts eight force-model samples `f[0..=7]` (evaluated at `t_begin + H[n]*dt`, `f[0] = a0`)
/// into the seven monomial coefficients `b[0..=6]` of `a(s) - a0`, via Newton's divided
/// differences followed by expansion from Newton form into the monomial basis. This is the
/// "low-level linear algebra kernel" the driver owns outright rather than delegating.
fn b_coefficients_from_samples(f: &[Vector3<f64>; 8]) -> [Vector3<f64>; 7] {
    // Newton divided-difference table: dd[order][j], order 0..=7, built in place over `f`.
    let mut dd: Vec<Vec<Vector3<f64>>> = vec![f.to_vec()];
    for order in 1..=7 {
        let prev = &dd[order - 1];
        let mut row = Vec::with_capacity(8 - order);
        for j in 0..=(7 - order) {
            row.push((prev[j + 1] - prev[j]) / (H[j + order] - H[j]));
        }
        dd.push(row);
    }
    // g[k] = dd[k][0], k = 0..=7; g[0] is f[0] itself (the order-0 "difference").
    let g: Vec<Vector3<f64>> = (0..=7).map(|k| dd[k][0]).collect();

    // Expand sum_{k=1}^{7} g[k] * s * prod_{i=1}^{k-1}(s - H[i]) into powers of s, incrementally:
    // `prod` holds the coefficients (low-to-high degree) of prod_{i=1}^{m}(s - H[i]).
    let mut b = [Vector3::zeros(); 7];
    let mut prod: Vec<Vector3<f64>> = vec![Vector3::new(1.0, 1.0, 1.0)];
    for k in 1..=7 {
        // term = g[k] * s * prod(s); shifting `prod` up by one degree is multiplying by s.
        for (deg, coeff) in prod.iter().enumerate() {
            b[deg] += Vector3::new(g[k].x * coeff.x, g[k].y * coeff.y, g[k].z * coeff.z);
        }
        if k < 7 {
            // prod *= (s - H[k]): new_prod[d] = prod[d-1] - H[k]*prod[d]
            let hk = H[k];
            let mut next = vec![Vector3::zeros(); prod.len() + 1];
            for (d, coeff) in prod.iter().enumerate() {
                next[d + 1] += *coeff;
                next[d] -= *coeff * hk;
            }
            prod = next;
        }
    }
    b
}

/// Adaptive Gauss-Radau driver (§4.E). Owns the convergence tolerance, step-size floor, and
/// retry budget; does not own the particle state or the force model, both passed in per call.
pub struct RadauIntegrator {
    epsilon: f64,
    dt_min: f64,
    max_iterations: usize,
}

/// Bounded retry budget for a single step, generalised from the teacher's 50-attempt adaptive
/// step-halving cap.
const MAX_STEP_RETRIES: usize = 50;

impl RadauIntegrator {
    pub fn new(config: &SimConfig) -> Self {
        RadauIntegrator {
            epsilon: config.epsilon,
            dt_min: config.dt_min,
            max_iterations: config.max_radau_iterations,
        }
    }

    pub fn set_tolerance(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    pub fn set_min_dt(&mut self, dt_min: f64) {
        if dt_min < 1e-2 {
            log::warn!("dt_min {dt_min} below the 1e-2 day floor; clamping");
            self.dt_min = 1e-2;
        } else {
            self.dt_min = dt_min;
        }
    }

    /// Classic Everhart/IAS15 step-size control: the magnitude of the highest-order
    /// coefficient `b6` relative to the particle's acceleration scale estimates the
    /// truncation error of the just-completed step, and `dt_new = dt * (epsilon/error)^(1/7)`
    /// targets one more order of accuracy than strictly required headroom for the next step.
    /// Growth is capped at 4x and the result is floored at `dt_min`, mirroring the teacher's
    /// `PropOpts` clamp-don't-panic step control.
    pub fn suggested_next_dt(&self, record: &StepRecord, dt_used: f64) -> f64 {
        let error = record
            .particles
            .iter()
            .map(|p| p.b[6].norm() / p.a0.norm().max(1.0))
            .fold(0.0_f64, f64::max);
        if error <= 0.0 {
            return (dt_used * 4.0).max(self.dt_min);
        }
        let growth = (self.epsilon / error).powf(1.0 / 7.0);
        (dt_used * growth.min(4.0).max(0.25)).max(self.dt_min)
    }

    /// Attempts one Gauss-Radau step of (clamped) length `dt` starting at `t_begin`, retrying
    /// at half the step size on non-convergence up to `MAX_STEP_RETRIES` times. On success,
    /// advances `particles` in place to the end of the step and returns the accepted
    /// `StepRecord` and the step length actually used.
    pub fn step(
        &self,
        particles: &mut ParticleSet,
        config: &SimConfig,
        aggregator: &ForceAggregator,
        perturbers: &dyn PerturberSource,
        t_begin: f64,
        dt_requested: f64,
    ) -> Result<(StepRecord, f64), IntegratorError> {
        let mut dt = dt_requested.max(self.dt_min);
        for attempt in 0..MAX_STEP_RETRIES {
            perturbers.begin_step();
            match self.try_step(particles, config, aggregator, perturbers, t_begin, dt) {
                Ok(record) => {
                    log::debug!(
                        "radau step accepted at t={t_begin} ({}), dt={dt}",
                        crate::ephemeris::epoch_from_tdb_days(t_begin)
                    );
                    return Ok((record, dt));
                }
                Err(IntegratorError::NonConvergingStep { attempts, .. }) => {
                    log::warn!(
                        "radau step at t={t_begin} failed to converge after {attempts} iterations (retry {attempt}); halving dt to {}",
                        dt / 2.0
                    );
                    dt = (dt / 2.0).max(self.dt_min);
                }
                Err(e) => return Err(e),
            }
        }
        Err(IntegratorError::NonConvergingStep {
            t_begin,
            attempts: self.max_iterations,
        })
    }

    /// A single attempt at a step of exactly `dt`: iterates the b-coefficients to
    /// self-consistency, or returns `NonConvergingStep` without mutating `particles`.
    fn try_step(
        &self,
        particles: &mut ParticleSet,
        config: &SimConfig,
        aggregator: &ForceAggregator,
        perturbers: &dyn PerturberSource,
        t_begin: f64,
        dt: f64,
    ) -> Result<StepRecord, IntegratorError> {
        let n = particles.n_total();
        let x0: Vec<Vector3<f64>> = particles.reals.iter().chain(particles.vars.iter()).map(|p| p.r).collect();
        let v0: Vec<Vector3<f64>> = particles.reals.iter().chain(particles.vars.iter()).map(|p| p.v).collect();

        aggregator.accelerate(particles, config, perturbers, t_begin)?;
        let a0: Vec<Vector3<f64>> = particles.reals.iter().chain(particles.vars.iter()).map(|p| p.a).collect();

        let mut b = vec![[Vector3::<f64>::zeros(); 7]; n];

        for iteration in 0..self.max_iterations {
            let mut samples: Vec<[Vector3<f64>; 8]> = vec![[Vector3::zeros(); 8]; n];
            for (p, sample) in samples.iter_mut().enumerate() {
                sample[0] = a0[p];
            }

            for node in 1..=7 {
                let hg = H[node];
                for p in 0..n {
                    let (x, v) = dense_state(x0[p], v0[p], a0[p], &b[p], dt, hg);
                    if p < particles.n_real() {
                        particles.reals[p].r = x;
                        particles.reals[p].v = v;
                    } else {
                        particles.vars[p - particles.n_real()].r = x;
                        particles.vars[p - particles.n_real()].v = v;
                    }
                }
                aggregator.accelerate(particles, config, perturbers, t_begin + hg * dt)?;
                for p in 0..n {
                    samples[p][node] = if p < particles.n_real() {
                        particles.reals[p].a
                    } else {
                        particles.vars[p - particles.n_real()].a
                    };
                }
            }

            let mut max_rel_change = 0.0_f64;
            for p in 0..n {
                let new_b = b_coefficients_from_samples(&samples[p]);
                let scale = a0[p].norm().max(1.0);
                max_rel_change = max_rel_change.max((new_b[6] - b[p][6]).norm() / scale);
                b[p] = new_b;
            }

            if iteration > 0 && max_rel_change < self.epsilon {
                break;
            }
            if iteration == self.max_iterations - 1 && max_rel_change >= self.epsilon {
                return Err(IntegratorError::NonConvergingStep {
                    t_begin,
                    attempts: self.max_iterations,
                });
            }
        }

        // Reconstruct the end-of-step state and refresh accelerations there.
        for p in 0..n {
            let (x1, v1) = dense_state(x0[p], v0[p], a0[p], &b[p], dt, 1.0);
            if p < particles.n_real() {
                particles.reals[p].r = x1;
                particles.reals[p].v = v1;
            } else {
                particles.vars[p - particles.n_real()].r = x1;
                particles.vars[p - particles.n_real()].v = v1;
            }
        }
        aggregator.accelerate(particles, config, perturbers, t_begin + dt)?;

        let records = (0..n)
            .map(|p| ParticleStepRecord {
                x0: x0[p],
                v0: v0[p],
                a0: a0[p],
                b: b[p],
            })
            .collect();

        Ok(StepRecord {
            t_begin,
            dt,
            particles: records,
        })
    }
}
