//! Vector and rotation utilities built on nalgebra
//!
//! All rotation matrices map device coordinates to world coordinates and are
//! applied with `current · delta` composition (body frame).

use nalgebra::{Matrix3, Quaternion, Vector3};

/// Mathematical constants
pub const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;
pub const RAD_TO_DEG: f32 = 180.0 / core::f32::consts::PI;
/// Nanoseconds to seconds
pub const NS_TO_S: f32 = 1.0e-9;

/// Row-major 3×3 rotation matrix
pub type RotationMatrix = Matrix3<f32>;

/// 3×3 matrix product `a · b`
pub fn matrix_multiply(a: &RotationMatrix, b: &RotationMatrix) -> RotationMatrix {
    a * b
}

/// Quaternion `(sin(θ/2)·axis, cos(θ/2))` for a rotation of `angle` radians
///
/// The axis is used as given; pass a unit vector to get a unit quaternion.
/// nalgebra stores the coordinates as `[x, y, z, w]`.
pub fn quaternion_from_axis_angle(axis: &Vector3<f32>, angle: f32) -> Quaternion<f32> {
    let half_angle = angle * 0.5;
    let (sin_half, cos_half) = half_angle.sin_cos();
    Quaternion::from_parts(cos_half, axis * sin_half)
}

/// Rotation matrix of a unit quaternion
#[rustfmt::skip]
pub fn rotation_matrix_from_quaternion(q: &Quaternion<f32>) -> RotationMatrix {
    let (x, y, z, w) = (q.i, q.j, q.k, q.w);

    let sq_x = 2.0 * x * x;
    let sq_y = 2.0 * y * y;
    let sq_z = 2.0 * z * z;
    let xy = 2.0 * x * y;
    let zw = 2.0 * z * w;
    let xz = 2.0 * x * z;
    let yw = 2.0 * y * w;
    let yz = 2.0 * y * z;
    let xw = 2.0 * x * w;

    Matrix3::new(
        1.0 - sq_y - sq_z, xy - zw, xz + yw,
        xy + zw, 1.0 - sq_x - sq_z, yz - xw,
        xz - yw, yz + xw, 1.0 - sq_x - sq_y,
    )
}

/// Rotation matrix of a 3-component rotation vector
///
/// The vector is the `(x, y, z)` part of a unit quaternion; `w` is recovered
/// from the unit-norm constraint and clamped at zero.
pub fn rotation_matrix_from_rotation_vector(v: &Vector3<f32>) -> RotationMatrix {
    let w_squared = 1.0 - v.norm_squared();
    let w = if w_squared > 0.0 { w_squared.sqrt() } else { 0.0 };
    rotation_matrix_from_quaternion(&Quaternion::from_parts(w, *v))
}

/// Extract `(azimuth, pitch, roll)` in radians from a rotation matrix
///
/// - azimuth: `atan2(R01, R11)`, rotation about −Z
/// - pitch: `asin(−R21)`, rotation about X
/// - roll: `atan2(−R20, R22)`, rotation about Y
pub fn euler_angles_from_matrix(r: &RotationMatrix) -> (f32, f32, f32) {
    let azimuth = r[(0, 1)].atan2(r[(1, 1)]);
    // Drift can push the element slightly outside [-1, 1]
    let pitch = (-r[(2, 1)]).clamp(-1.0, 1.0).asin();
    let roll = (-r[(2, 0)]).atan2(r[(2, 2)]);
    (azimuth, pitch, roll)
}

/// Whether `R · Rᵀ` is the identity within `tolerance` element-wise
pub fn is_orthonormal(r: &RotationMatrix, tolerance: f32) -> bool {
    let product = r * r.transpose();
    (product - Matrix3::identity()).iter().all(|e| e.abs() <= tolerance)
}

/// Row-major `[f32; 9]` view of a matrix
#[rustfmt::skip]
pub fn to_row_major(r: &RotationMatrix) -> [f32; 9] {
    [
        r[(0, 0)], r[(0, 1)], r[(0, 2)],
        r[(1, 0)], r[(1, 1)], r[(1, 2)],
        r[(2, 0)], r[(2, 1)], r[(2, 2)],
    ]
}

pub fn from_row_major(values: &[f32; 9]) -> RotationMatrix {
    Matrix3::from_row_slice(values)
}
