//! Absolute orientation from gravity and magnetic field vectors
//!
//! The world basis is East-North-Up. The returned matrix has East, North and
//! Up (expressed in device coordinates) as its rows, so it maps device
//! vectors into the world frame.

use nalgebra::{Matrix3, Vector3};

use crate::error::SampleError;
use crate::math::RotationMatrix;

/// Standard gravity in m/s²
pub const STANDARD_GRAVITY: f32 = 9.80665;

/// Below this `|gravity|²` the device is treated as in free fall
const FREE_FALL_GRAVITY_SQUARED: f32 = (0.1 * STANDARD_GRAVITY) * (0.1 * STANDARD_GRAVITY);

/// Minimum `|magnetic × gravity|` (µT·m/s²) for a usable East vector
const MIN_EAST_MAGNITUDE: f32 = 0.1;

/// Compute the device-to-world rotation matrix
///
/// # Arguments
/// * `gravity` - Smoothed accelerometer reading in m/s² (points up at rest)
/// * `magnetic` - Smoothed magnetometer reading in µT
///
/// # Errors
/// [`SampleError::DegenerateOrientationInput`] when the device is in free
/// fall or the two vectors are near-parallel. Both are transient: retry with
/// the next sample pair.
pub fn estimate(
    gravity: Vector3<f32>,
    magnetic: Vector3<f32>,
) -> Result<RotationMatrix, SampleError> {
    if gravity.norm_squared() < FREE_FALL_GRAVITY_SQUARED {
        return Err(SampleError::DegenerateOrientationInput);
    }

    // East = magnetic × gravity
    let east = magnetic.cross(&gravity);
    let east_magnitude = east.norm();
    if east_magnitude < MIN_EAST_MAGNITUDE {
        return Err(SampleError::DegenerateOrientationInput);
    }
    let east = east / east_magnitude;

    let up = gravity.normalize();

    // North = gravity × East, already unit length since both are unit and orthogonal
    let north = up.cross(&east);

    Ok(Matrix3::from_rows(&[
        east.transpose(),
        north.transpose(),
        up.transpose(),
    ]))
}

/// Like [`estimate`], returning `None` for degenerate input
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use gyro_orientation::estimator::try_estimate;
///
/// let gravity = Vector3::new(0.0, 0.0, 9.8);
/// let magnetic = Vector3::new(0.0, 20.0, -40.0);
/// assert!(try_estimate(gravity, magnetic).is_some());
///
/// // Field parallel to gravity carries no heading information
/// assert!(try_estimate(gravity, Vector3::new(0.0, 0.0, 45.0)).is_none());
/// ```
pub fn try_estimate(gravity: Vector3<f32>, magnetic: Vector3<f32>) -> Option<RotationMatrix> {
    estimate(gravity, magnetic).ok()
}

/// Magnetic dip angle in radians, positive when the field points below the horizon
///
/// Returns `None` under the same conditions as [`estimate`], or for a zero field.
pub fn magnetic_inclination(gravity: Vector3<f32>, magnetic: Vector3<f32>) -> Option<f32> {
    let rotation = try_estimate(gravity, magnetic)?;
    let field = magnetic.try_normalize(0.0)?;

    let north = rotation.row(1).transpose();
    let up = rotation.row(2).transpose();

    let horizontal = field.dot(&north);
    let vertical = field.dot(&up);
    Some((-vertical).atan2(horizontal))
}
