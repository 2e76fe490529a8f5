//! Vector helpers shared by the lighting, texture generation and clipping code.

pub mod fixed;

use glam::{Vec3, Vec4};

/// Unit vector pointing from `p1` to `p2`, where either point may be a
/// direction (w = 0).
///
/// Two points or two directions subtract normally. A direction `p1` paired
/// with a point yields `-p1`; a point `p1` paired with a direction yields
/// `p2`.
pub fn homogeneous_unit_diff(p1: Vec4, p2: Vec4) -> Vec3 {
    let p1_is_dir = p1.w == 0.0;
    let p2_is_dir = p2.w == 0.0;

    let diff = if p1_is_dir == p2_is_dir {
        p2.truncate() - p1.truncate()
    } else if p1_is_dir {
        -p1.truncate()
    } else {
        p2.truncate()
    };

    diff.normalize_or_zero()
}

/// Dot product clamped to zero from below.
pub fn clamped_dot(a: Vec3, b: Vec3) -> f32 {
    a.dot(b).max(0.0)
}

/// Clamp every channel of a color to 0.0-1.0.
pub fn clamp01(v: Vec4) -> Vec4 {
    v.clamp(Vec4::ZERO, Vec4::ONE)
}
