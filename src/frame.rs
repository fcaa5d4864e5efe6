//! Body-fixed frame rotations (§4.B).
//!
//! Each body-fixed frame is defined by the right ascension `α` and declination `δ` of its
//! pole. The rotation carries ICRF vectors into the frame whose z-axis is that pole:
//! a z-rotation by `α` followed by an x-rotation by `(90° - δ)`. Trigonometry is computed
//! once at construction time and cached, so force terms never recompute `sin`/`cos` per call.

use nalgebra::{Matrix3, Vector3};

/// A body-fixed equatorial frame with precomputed rotation trigonometry.
#[derive(Clone, Copy, Debug)]
pub struct Frame {
    sin_alpha: f64,
    cos_alpha: f64,
    sin_delta: f64,
    cos_delta: f64,
}

impl Frame {
    /// Builds a frame from the pole's right ascension and declination, both in degrees.
    pub fn from_pole(alpha_deg: f64, delta_deg: f64) -> Self {
        let alpha = alpha_deg.to_radians();
        let delta = delta_deg.to_radians();
        Frame {
            sin_alpha: alpha.sin(),
            cos_alpha: alpha.cos(),
            sin_delta: delta.sin(),
            cos_delta: delta.cos(),
        }
    }

    /// The rotation matrix R such that `rotate(v) = R * v` carries an ICRF vector into this
    /// body-equatorial frame.
    pub fn matrix(&self) -> Matrix3<f64> {
        let (sa, ca, sd, cd) = (self.sin_alpha, self.cos_alpha, self.sin_delta, self.cos_delta);
        Matrix3::new(
            -sa, ca, 0.0, //
            -ca * sd, -sa * sd, cd, //
            ca * cd, sa * cd, sd,
        )
    }

    /// Rotates an ICRF vector into the body-equatorial frame.
    pub fn rotate(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.matrix() * v
    }

    /// Rotates a body-equatorial vector back into the ICRF frame (R is orthonormal, so this
    /// is just the transpose).
    pub fn inverse_rotate(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.matrix().transpose() * v
    }

    /// Sandwiches a 3x6 (position, velocity) Jacobian block back into ICRF. The velocity
    /// columns are rotated the same way as the position columns since the body-fixed frame
    /// used here (§4.B) has no time dependence beyond the frozen J2000 pole.
    pub fn rotate_jacobian3x6(&self, j: &nalgebra::Matrix3x6<f64>) -> nalgebra::Matrix3x6<f64> {
        let r = self.matrix();
        let rt = r.transpose();
        let pos_block = rt * j.fixed_view::<3, 3>(0, 0) * r;
        let vel_block = rt * j.fixed_view::<3, 3>(0, 3) * r;
        let mut out = nalgebra::Matrix3x6::zeros();
        out.fixed_view_mut::<3, 3>(0, 0).copy_from(&pos_block);
        out.fixed_view_mut::<3, 3>(0, 3).copy_from(&vel_block);
        out
    }
}
