//! The particle data model (§3): real test particles plus their first-order variational
//! partners, sharing one flat array with the invariant ordering
//! `[real_0 .. real_{n-1}, var_0 .. var_{m-1}]`.

use nalgebra::Vector3;

/// Position, velocity and the scratch acceleration slot for one real test particle, AU /
/// AU per day / AU per day^2.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ParticleState {
    pub r: Vector3<f64>,
    pub v: Vector3<f64>,
    pub a: Vector3<f64>,
}

impl ParticleState {
    pub fn from_slice(s: &[f64; 6]) -> Self {
        ParticleState {
            r: Vector3::new(s[0], s[1], s[2]),
            v: Vector3::new(s[3], s[4], s[5]),
            a: Vector3::zeros(),
        }
    }

    pub fn to_array(self) -> [f64; 6] {
        [self.r.x, self.r.y, self.r.z, self.v.x, self.v.y, self.v.z]
    }
}

/// A variational partner carrying `(δr, δv)` plus its scratch `δa`, bound to exactly one
/// parent real particle.
pub type VariationalState = ParticleState;

/// Binds a variational particle at `index` (within the variational block) to its parent
/// real particle at `parent` (within the real block). §3 invariant (i): `parent < index`
/// is enforced by `ParticleSet::new`, since variational indices are offset by `n_real`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VariationalLink {
    pub parent: usize,
    /// Index of this variational particle within the full particle array
    /// (`n_real + position in the variational block`).
    pub index: usize,
}

/// The full particle array for one simulation: `n_real` real particles followed by
/// `n_var` variational particles, each linked to a parent.
#[derive(Clone, Debug)]
pub struct ParticleSet {
    pub reals: Vec<ParticleState>,
    pub vars: Vec<VariationalState>,
    pub links: Vec<VariationalLink>,
}

impl ParticleSet {
    pub fn new(
        reals: Vec<ParticleState>,
        vars: Vec<VariationalState>,
        parents: &[usize],
    ) -> Result<Self, crate::errors::SessionError> {
        if parents.len() != vars.len() {
            return Err(crate::errors::SessionError::InvalidConfiguration(format!(
                "invar_parent has {} entries but invar has {} particles",
                parents.len(),
                vars.len()
            )));
        }
        let n_real = reals.len();
        let mut links = Vec::with_capacity(vars.len());
        for (i, &parent) in parents.iter().enumerate() {
            if parent >= n_real {
                return Err(crate::errors::SessionError::BadVariationalLink {
                    var_index: n_real + i,
                    parent,
                });
            }
            links.push(VariationalLink {
                parent,
                index: n_real + i,
            });
        }
        Ok(ParticleSet { reals, vars, links })
    }

    pub fn n_real(&self) -> usize {
        self.reals.len()
    }

    pub fn n_var(&self) -> usize {
        self.vars.len()
    }

    pub fn n_total(&self) -> usize {
        self.n_real() + self.n_var()
    }

    pub fn zero_accelerations(&mut self) {
        for p in self.reals.iter_mut() {
            p.a = Vector3::zeros();
        }
        for p in self.vars.iter_mut() {
            p.a = Vector3::zeros();
        }
    }

    /// Flattens `(r, v)` of every real particle followed by every variational particle into
    /// one `6*n_total`-long row, matching the output buffer layout (§3).
    pub fn flatten_state(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(6 * self.n_total());
        for p in self.reals.iter().chain(self.vars.iter()) {
            out.extend_from_slice(&p.to_array());
        }
        out
    }

    pub fn unflatten_state(&mut self, flat: &[f64]) {
        debug_assert_eq!(flat.len(), 6 * self.n_total());
        for (i, p) in self.reals.iter_mut().chain(self.vars.iter_mut()).enumerate() {
            let s = &flat[6 * i..6 * i + 6];
            p.r = Vector3::new(s[0], s[1], s[2]);
            p.v = Vector3::new(s[3], s[4], s[5]);
        }
    }

    /// Flattens `(ax, ay, az)` of every real particle then every variational particle, in the
    /// same order as `flatten_state`, for use as the velocity-derivative half of the RHS.
    pub fn flatten_accel(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(3 * self.n_total());
        for p in self.reals.iter().chain(self.vars.iter()) {
            out.extend_from_slice(&[p.a.x, p.a.y, p.a.z]);
        }
        out
    }
}
