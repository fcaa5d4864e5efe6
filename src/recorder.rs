//! Component F: the dense-output recorder. Runs as a heartbeat after every accepted step
//! (mirroring the teacher's `Propagator::tx_chan` heartbeat, generalised from "send one state"
//! to "sample `n_sub` states from the step's polynomial"), reconstructing state at a
//! caller-chosen set of sub-nodes from the step's `b`-coefficients rather than re-running the
//! force model.

use crate::config::SimConfig;
use crate::integrator::{dense_state, StepRecord};
use crate::particles::ParticleSet;

/// A safe view over the caller-owned `(out_time, out_state)` slices (§9 ambient addition:
/// "dense-output buffers owned by the caller remain raw `&mut [f64]` at the boundary and are
/// wrapped inside a safe view immediately upon entry"). Tracks how many rows have been
/// written so far; `n_written` at the end of a run becomes the `n_out` returned to the caller.
pub struct Recorder<'a> {
    out_time: &'a mut [f64],
    out_state: &'a mut [f64],
    n_total: usize,
    n_written: usize,
}

impl<'a> Recorder<'a> {
    pub fn new(out_time: &'a mut [f64], out_state: &'a mut [f64], n_total: usize) -> Self {
        Recorder {
            out_time,
            out_state,
            n_total,
            n_written: 0,
        }
    }

    /// Maximum number of rows the narrower of the two caller-supplied buffers can hold.
    pub fn capacity(&self) -> usize {
        let state_rows = if self.n_total == 0 {
            self.out_time.len()
        } else {
            self.out_state.len() / (6 * self.n_total)
        };
        self.out_time.len().min(state_rows)
    }

    pub fn n_written(&self) -> usize {
        self.n_written
    }

    fn write_row(&mut self, t: f64, rows: impl Iterator<Item = [f64; 6]>) {
        self.out_time[self.n_written] = t;
        let base = self.n_written * 6 * self.n_total;
        for (i, row) in rows.enumerate() {
            self.out_state[base + 6 * i..base + 6 * i + 6].copy_from_slice(&row);
        }
        self.n_written += 1;
    }

    /// Writes the initial-conditions row (§4.F: "at step 0 it writes `t_begin` and the initial
    /// state"). Returns `false` without writing if the buffer has no room at all.
    pub fn record_initial(&mut self, t0: f64, particles: &ParticleSet) -> bool {
        if self.capacity() == 0 {
            return false;
        }
        let rows = particles.reals.iter().chain(particles.vars.iter()).map(|p| p.to_array());
        self.write_row(t0, rows);
        true
    }

    /// Samples `config.dense_output_nodes` sub-nodes of an accepted step from its
    /// `b`-coefficients and appends them to the output buffer. Returns `Err(())` — leaving the
    /// buffer untouched — if fewer than `n_sub` rows of capacity remain, signalling the caller
    /// to stop with `IntegratorStatus::BufferFull` (§4.F: "when remaining capacity drops below
    /// one step the integrator is signalled to stop").
    pub fn on_step_accepted(&mut self, record: &StepRecord, config: &SimConfig) -> Result<(), ()> {
        let n_sub = config.dense_output_nodes.len();
        if self.n_written + n_sub > self.capacity() {
            return Err(());
        }
        for &hg in &config.dense_output_nodes {
            let t = record.t_begin + hg * record.dt;
            let rows = record.particles.iter().map(|p| {
                let (x, v) = dense_state(p.x0, p.v0, p.a0, &p.b, record.dt, hg);
                [x.x, x.y, x.z, v.x, v.y, v.z]
            });
            self.write_row(t, rows);
        }
        Ok(())
    }
}
