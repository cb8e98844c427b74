//! Gyroscope integration state machine

use nalgebra::Matrix3;
use tracing::trace;

use crate::error::SampleError;
use crate::math::{
    NS_TO_S, RotationMatrix, euler_angles_from_matrix, matrix_multiply, quaternion_from_axis_angle,
    rotation_matrix_from_quaternion,
};
use crate::types::{IntegratorState, Orientation, SensorSample};

/// Default angular speed (rad/s) below which the rotation axis is not normalized
pub const DEFAULT_EPSILON: f32 = 1e-9;

/// Running orientation built by integrating angular velocity
///
/// The integrator waits in [`IntegratorState::Uninitialized`] until it is
/// seeded with an absolute orientation. The first angular-velocity sample
/// after seeding applies the seed and records the timestamp; every later
/// sample integrates one delta rotation:
///
/// ```text
/// θ/2  = |ω| · Δt / 2
/// q    = (sin(θ/2) · ω/|ω|, cos(θ/2))
/// R   ← R · R(q)
/// ```
///
/// The running matrix is never re-orthonormalized, so single-precision
/// drift accumulates over long sessions.
#[derive(Debug, Clone)]
pub struct GyroscopeIntegrator {
    /// Current state
    state: IntegratorState,
    /// Absolute orientation waiting to be applied on the first sample
    initial_rotation: RotationMatrix,
    /// Running device-to-world rotation
    current_rotation: RotationMatrix,
    /// Timestamp of the last accepted sample
    timestamp_old: Option<i64>,
    /// Last orientation handed out
    orientation: Orientation,
    epsilon: f32,
}

impl GyroscopeIntegrator {
    pub fn new() -> Self {
        Self::with_epsilon(DEFAULT_EPSILON)
    }

    pub fn with_epsilon(epsilon: f32) -> Self {
        Self {
            state: IntegratorState::Uninitialized,
            initial_rotation: Matrix3::identity(),
            current_rotation: Matrix3::identity(),
            timestamp_old: None,
            orientation: Orientation::default(),
            epsilon,
        }
    }

    /// Supply the absolute orientation; takes effect on the next sample
    pub fn seed(&mut self, initial_rotation: RotationMatrix) {
        self.initial_rotation = initial_rotation;
        self.state = IntegratorState::Seeding;
    }

    /// Return to `Uninitialized` with an identity running rotation
    pub fn reset(&mut self) {
        self.state = IntegratorState::Uninitialized;
        self.initial_rotation = Matrix3::identity();
        self.current_rotation = Matrix3::identity();
        self.timestamp_old = None;
        self.orientation = Orientation::default();
    }

    /// Process one angular-velocity sample
    ///
    /// # Arguments
    /// * `sample` - Angular velocity in rad/s with a nanosecond timestamp
    ///
    /// # Returns
    /// `Ok(None)` while uninitialized (the sample is dropped), otherwise the
    /// orientation after this sample.
    ///
    /// # Errors
    /// [`SampleError::OutOfOrderTimestamp`] when the timestamp does not advance.
    /// Nothing is integrated and the stored timestamp is kept.
    pub fn integrate(&mut self, sample: &SensorSample) -> Result<Option<Orientation>, SampleError> {
        match self.state {
            IntegratorState::Uninitialized => return Ok(None),
            IntegratorState::Seeding => {
                self.current_rotation =
                    matrix_multiply(&self.current_rotation, &self.initial_rotation);
                self.state = IntegratorState::Integrating;
                self.orientation = self.extract_orientation();
            }
            IntegratorState::Integrating => {}
        }

        let timestamp = sample.timestamp;
        let Some(previous) = self.timestamp_old else {
            self.timestamp_old = Some(timestamp);
            return Ok(Some(self.orientation));
        };

        if timestamp <= previous {
            return Err(SampleError::OutOfOrderTimestamp {
                previous,
                current: timestamp,
            });
        }

        let delta_time = timestamp.abs_diff(previous) as f32 * NS_TO_S;
        let delta_rotation = self.delta_rotation(sample, delta_time);
        self.current_rotation = matrix_multiply(&self.current_rotation, &delta_rotation);
        self.orientation = self.extract_orientation();
        self.timestamp_old = Some(timestamp);

        trace!(
            delta_time,
            azimuth = self.orientation.azimuth,
            pitch = self.orientation.pitch,
            roll = self.orientation.roll,
            "integrated angular velocity"
        );

        Ok(Some(self.orientation))
    }

    pub fn state(&self) -> IntegratorState {
        self.state
    }

    pub fn rotation_matrix(&self) -> RotationMatrix {
        self.current_rotation
    }

    /// Last computed orientation
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp_old
    }

    /// Delta rotation matrix for one sample over `delta_time` seconds
    fn delta_rotation(&self, sample: &SensorSample, delta_time: f32) -> RotationMatrix {
        let omega_magnitude = sample.values.norm();

        // Near-zero rates keep the raw axis; θ ≈ 0 makes the delta ≈ identity anyway
        let axis = if omega_magnitude > self.epsilon {
            sample.values / omega_magnitude
        } else {
            sample.values
        };

        let theta = omega_magnitude * delta_time;
        rotation_matrix_from_quaternion(&quaternion_from_axis_angle(&axis, theta))
    }

    fn extract_orientation(&self) -> Orientation {
        let (azimuth, pitch, roll) = euler_angles_from_matrix(&self.current_rotation);
        Orientation::from_radians(azimuth, pitch, roll)
    }
}

impl Default for GyroscopeIntegrator {
    fn default() -> Self {
        Self::new()
    }
}
