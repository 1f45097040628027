//! Landmark geometry to bone rotations.
//!
//! Segment directions are turned into per-axis angles with `atan2`. This is a
//! directional approximation: it ignores twist about the limb and does not
//! compare against the rig's rest pose, so the output only indicates where a
//! limb points.

use glam::{Mat3, Mat4, Vec3};

use crate::avatar::Rotation;
use crate::tracking::Joint;

/// Orientation of the segment running from `proximal` to `distal`.
///
/// Each angle pairs two components of the normalized direction:
/// (y, z) for X, (x, z) for Y and (x, y) for Z. Returns `None` when the joints
/// coincide or a coordinate is not finite.
pub fn segment_rotation(proximal: Vec3, distal: Vec3) -> Option<Rotation> {
    let dir = (distal - proximal).try_normalize()?;

    Some(Rotation::new(
        dir.y.atan2(dir.z),
        dir.x.atan2(dir.z),
        dir.x.atan2(dir.y),
    ))
}

/// `segment_rotation` over two tracked joints, ignoring visibility.
pub fn joint_rotation(proximal: &Joint, distal: &Joint) -> Option<Rotation> {
    segment_rotation(proximal.position(), distal.position())
}

/// XYZ Euler angles of the rotation part of a 4x4 transform.
///
/// Scale and translation are stripped first. Near gimbal lock (|m13| ~ 1) the
/// Z angle is folded into X and reported as zero.
pub fn euler_from_matrix(matrix: &Mat4) -> Rotation {
    let (_, quat, _) = matrix.to_scale_rotation_translation();
    let m = Mat3::from_quat(quat);

    let m11 = m.x_axis.x;
    let m12 = m.y_axis.x;
    let m13 = m.z_axis.x;
    let m22 = m.y_axis.y;
    let m23 = m.z_axis.y;
    let m32 = m.y_axis.z;
    let m33 = m.z_axis.z;

    let y = m13.clamp(-1.0, 1.0).asin();

    if m13.abs() < 0.999_999_9 {
        Rotation::new((-m23).atan2(m33), y, (-m12).atan2(m11))
    } else {
        Rotation::new(m32.atan2(m22), y, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{EulerRot, Quat};
    use proptest::prelude::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    const EPS: f32 = 1e-4;

    fn approx(a: Rotation, b: Rotation) -> bool {
        (a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS && (a.z - b.z).abs() < EPS
    }

    #[test]
    fn test_unit_x_direction() {
        let rot = segment_rotation(Vec3::ZERO, Vec3::X).unwrap();
        assert!(approx(rot, Rotation::new(0.0, FRAC_PI_2, FRAC_PI_2)));
    }

    #[test]
    fn test_joint_example() {
        let shoulder = Joint::new(0.0, 0.0, 0.0, 1.0);
        let elbow = Joint::new(1.0, 0.0, 0.0, 1.0);
        let rot = joint_rotation(&shoulder, &elbow).unwrap();
        assert!(approx(rot, Rotation::new(0.0, FRAC_PI_2, FRAC_PI_2)));
    }

    #[test]
    fn test_length_does_not_matter() {
        let a = segment_rotation(Vec3::new(0.2, 0.1, 0.0), Vec3::new(0.4, 0.5, 0.3)).unwrap();
        let b = segment_rotation(Vec3::new(0.2, 0.1, 0.0), Vec3::new(2.2, 4.1, 3.0)).unwrap();
        assert!(approx(a, b));
    }

    #[test]
    fn test_diagonal_direction() {
        let rot = segment_rotation(Vec3::ZERO, Vec3::new(0.0, 1.0, 1.0)).unwrap();
        assert!(approx(rot, Rotation::new(FRAC_PI_4, 0.0, 0.0)));
    }

    #[test]
    fn test_coincident_joints() {
        let p = Vec3::new(0.3, 0.3, 0.3);
        assert!(segment_rotation(p, p).is_none());
    }

    #[test]
    fn test_non_finite_joint() {
        assert!(segment_rotation(Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 1.0)).is_none());
    }

    #[test]
    fn test_euler_identity() {
        assert!(approx(euler_from_matrix(&Mat4::IDENTITY), Rotation::ZERO));
    }

    #[test]
    fn test_euler_matches_composed_rotation() {
        let (x, y, z) = (0.3, -0.2, 0.5);
        let quat = Quat::from_rotation_x(x) * Quat::from_rotation_y(y) * Quat::from_rotation_z(z);
        let matrix = Mat4::from_scale_rotation_translation(
            Vec3::splat(1.8),
            quat,
            Vec3::new(0.0, 2.0, -40.0),
        );

        let rot = euler_from_matrix(&matrix);
        assert!(approx(rot, Rotation::new(x, y, z)), "{:?}", rot);
    }

    #[test]
    fn test_euler_gimbal_lock() {
        let matrix = Mat4::from_quat(Quat::from_euler(EulerRot::XYZ, 0.0, FRAC_PI_2, 0.0));
        let rot = euler_from_matrix(&matrix);
        assert!((rot.y - FRAC_PI_2).abs() < 1e-3);
        assert!(rot.x.is_finite() && rot.z.is_finite());
    }

    proptest! {
        #[test]
        fn prop_deterministic(
            px in -1.0f32..1.0, py in -1.0f32..1.0, pz in -1.0f32..1.0,
            dx in 0.1f32..1.0, dy in 0.1f32..1.0, dz in 0.1f32..1.0,
        ) {
            let p = Vec3::new(px, py, pz);
            let d = p + Vec3::new(dx, dy, dz);
            prop_assert_eq!(segment_rotation(p, d), segment_rotation(p, d));
        }

        #[test]
        fn prop_continuous_away_from_singularity(
            dx in 0.2f32..1.0, dy in 0.2f32..1.0, dz in 0.2f32..1.0,
            ex in -1e-4f32..1e-4, ey in -1e-4f32..1e-4, ez in -1e-4f32..1e-4,
        ) {
            // Positive components keep every atan2 pair away from its branch cut
            let base = segment_rotation(Vec3::ZERO, Vec3::new(dx, dy, dz)).unwrap();
            let nudged = segment_rotation(Vec3::new(ex, ey, ez), Vec3::new(dx, dy, dz)).unwrap();

            prop_assert!((base.x - nudged.x).abs() < 0.01);
            prop_assert!((base.y - nudged.y).abs() < 0.01);
            prop_assert!((base.z - nudged.z).abs() < 0.01);
        }
    }
}
