//! Small math helpers shared by the integrator and the camera.
//!
//! Everything here is frame-rate aware: per-frame damping factors are
//! expressed as a natural log of the decay per reference frame, then
//! rescaled by the actual timestep so behavior is stable across refresh
//! rates.

use crate::error::MathError;
use glam::{Mat4, Vec3};

/// Frame rate the damping constants were tuned against.
pub const REF_FRAME_RATE: f32 = 60.0;

/// Linear interpolation from `a` to `b`.
pub fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Convert a per-reference-frame log decay to this frame's retention
/// factor. `log` is negative for decay; the result is in (0, 1] and a
/// smaller timestep retains more of the previous value.
pub fn mix_factor(dt: f32, log: f32) -> f32 {
    (dt * REF_FRAME_RATE * log).exp()
}

/// Hermite smoothstep of `x` between `edge0` and `edge1`.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Rotation in the plane spanned by basis axes `c1` and `c2`.
///
/// `plane_rotation(a, 0, 2)` is a yaw around +y, `plane_rotation(a, 1, 2)`
/// a pitch around +x.
pub fn plane_rotation(angle: f32, c1: usize, c2: usize) -> Mat4 {
    let (s, c) = angle.sin_cos();
    let mut m = Mat4::IDENTITY;
    m.col_mut(c1)[c1] = c;
    m.col_mut(c2)[c1] = s;
    m.col_mut(c1)[c2] = -s;
    m.col_mut(c2)[c2] = c;
    m
}

/// Invert a matrix, rejecting near-singular and non-finite inputs.
///
/// The inverse feeds the respawn unprojection in the simulate kernels, so
/// a degenerate matrix must surface as an error rather than NaN particles.
pub fn checked_inverse(m: &Mat4) -> Result<Mat4, MathError> {
    let det = m.determinant();
    if !det.is_finite() || det.abs() < 1e-12 {
        return Err(MathError::DegenerateMatrix { determinant: det });
    }
    Ok(m.inverse())
}

/// Right-handed perspective projection with depth mapped to [0, 1].
pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh(fov_y, aspect, near, far)
}

/// Translation matrix by `pos`.
pub fn translation(pos: Vec3) -> Mat4 {
    Mat4::from_translation(pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_mix_endpoints() {
        assert_eq!(mix(2.0, 8.0, 0.0), 2.0);
        assert_eq!(mix(2.0, 8.0, 1.0), 8.0);
        assert_eq!(mix(2.0, 8.0, 0.5), 5.0);
    }

    #[test]
    fn test_mix_factor_identity_at_reference_rate() {
        // One reference frame of log(-0.16) decay retains exp(-0.16).
        let f = mix_factor(1.0 / REF_FRAME_RATE, -0.16);
        assert!((f - (-0.16f32).exp()).abs() < 1e-6);
    }

    #[test]
    fn test_mix_factor_smaller_dt_retains_more() {
        let slow = mix_factor(1.0 / 30.0, -0.16);
        let fast = mix_factor(1.0 / 120.0, -0.16);
        assert!(fast > slow);
        assert!(slow > 0.0 && fast < 1.0);
    }

    #[test]
    fn test_smoothstep_clamps_and_interpolates() {
        assert_eq!(smoothstep(0.0, 1.0, -5.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 5.0), 1.0);
        assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);
        // Monotone inside the band.
        assert!(smoothstep(0.0, 1.0, 0.3) < smoothstep(0.0, 1.0, 0.7));
    }

    #[test]
    fn test_plane_rotation_yaw_turns_forward_axis() {
        let m = plane_rotation(std::f32::consts::FRAC_PI_2, 0, 2);
        let v = m * Vec4::new(0.0, 0.0, 1.0, 0.0);
        assert!(v.x.abs() > 0.999);
        assert!(v.z.abs() < 1e-6);
        assert_eq!(v.y, 0.0);
    }

    #[test]
    fn test_plane_rotation_is_orthonormal() {
        let m = plane_rotation(0.7, 1, 2);
        let id = m * m.transpose();
        assert!(id.abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn test_checked_inverse_round_trips() {
        let m = perspective(1.3, 1.5, 0.1, 50.0) * translation(Vec3::new(1.0, -2.0, 3.0));
        let inv = checked_inverse(&m).unwrap();
        assert!((m * inv).abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn test_checked_inverse_rejects_singular() {
        let err = checked_inverse(&Mat4::ZERO).unwrap_err();
        match err {
            MathError::DegenerateMatrix { determinant } => assert_eq!(determinant, 0.0),
        }
    }

    #[test]
    fn test_perspective_maps_near_far() {
        let m = perspective(1.3, 1.0, 0.1, 50.0);
        let near = m * Vec4::new(0.0, 0.0, -0.1, 1.0);
        let far = m * Vec4::new(0.0, 0.0, -50.0, 1.0);
        // wgpu clip depth runs from 0 at the near plane to 1 at the far.
        assert!((near.z / near.w).abs() < 1e-5);
        assert!((far.z / far.w - 1.0).abs() < 1e-5);
    }
}
