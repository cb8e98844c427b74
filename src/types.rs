//! Core types and settings for the orientation engine

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::math::RAD_TO_DEG;

/// A single sensor reading with its monotonic timestamp
///
/// Units depend on the stream: m/s² for acceleration, µT for the magnetic
/// field and rad/s for angular velocity. The timestamp is in nanoseconds on
/// the sensor clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub values: Vector3<f32>,
    pub timestamp: i64,
}

impl SensorSample {
    pub fn new(x: f32, y: f32, z: f32, timestamp: i64) -> Self {
        Self {
            values: Vector3::new(x, y, z),
            timestamp,
        }
    }
}

/// Pre-fused orientation reading delivered by the platform
///
/// Consumed by [`FusedRotationSource`](crate::FusedRotationSource), which turns
/// consecutive readings into angular velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationSample {
    pub rotation: UnitQuaternion<f32>,
    pub timestamp: i64,
}

/// Input event accepted by [`OrientationSession::handle`](crate::OrientationSession::handle)
///
/// # Example
/// ```
/// use gyro_orientation::SensorEvent;
///
/// let event = SensorEvent::acceleration(0.0, 0.0, 9.81, 1_000_000);
/// assert_eq!(event.sample().timestamp, 1_000_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorEvent {
    /// Accelerometer reading in m/s²
    Acceleration(SensorSample),
    /// Magnetometer reading in µT
    Magnetic(SensorSample),
    /// Angular velocity in rad/s, from a raw gyroscope or a fused source
    AngularVelocity(SensorSample),
}

impl SensorEvent {
    pub fn acceleration(x: f32, y: f32, z: f32, timestamp: i64) -> Self {
        Self::Acceleration(SensorSample::new(x, y, z, timestamp))
    }

    pub fn magnetic(x: f32, y: f32, z: f32, timestamp: i64) -> Self {
        Self::Magnetic(SensorSample::new(x, y, z, timestamp))
    }

    pub fn angular_velocity(x: f32, y: f32, z: f32, timestamp: i64) -> Self {
        Self::AngularVelocity(SensorSample::new(x, y, z, timestamp))
    }

    pub fn sample(&self) -> &SensorSample {
        match self {
            Self::Acceleration(sample) | Self::Magnetic(sample) | Self::AngularVelocity(sample) => {
                sample
            }
        }
    }
}

/// Upstream streams the host can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorStream {
    Accelerometer,
    MagneticField,
    Gyroscope,
    /// Platform rotation vector feeding the fused source
    RotationVector,
}

/// Orientation in degrees, as pushed to the display
///
/// Azimuth follows the compass convention: it grows clockwise about the
/// world up axis, so a counter-clockwise turn about +Z reads as a negative
/// azimuth.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    pub azimuth: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Orientation {
    pub fn from_radians(azimuth: f32, pitch: f32, roll: f32) -> Self {
        Self {
            azimuth: azimuth * RAD_TO_DEG,
            pitch: pitch * RAD_TO_DEG,
            roll: roll * RAD_TO_DEG,
        }
    }
}

/// Gyroscope integrator states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntegratorState {
    /// No initial orientation yet; angular velocity is dropped
    #[default]
    Uninitialized,
    /// Initial orientation known, waiting for the first angular-velocity sample
    Seeding,
    /// Steady state
    Integrating,
}

/// Engine settings
///
/// Every field has a default, so partial TOML documents are accepted.
///
/// # Example
/// ```
/// use gyro_orientation::EngineSettings;
///
/// let settings = EngineSettings::from_toml_str("min_sample_count = 50").unwrap();
/// assert_eq!(settings.min_sample_count, 50);
/// assert_eq!(settings.mean_filter_window, 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Moving-average window for the accelerometer and magnetometer filters
    pub mean_filter_window: usize,
    /// Samples each of accelerometer and magnetometer must exceed before seeding
    pub min_sample_count: u32,
    /// Angular speed (rad/s) below which the rotation axis is left unnormalised
    pub epsilon: f32,
    /// Feed angular velocity from the platform rotation vector instead of the gyroscope
    pub use_fused_source: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            mean_filter_window: 10,
            min_sample_count: 30,
            epsilon: 1e-9,
            use_fused_source: false,
        }
    }
}

impl EngineSettings {
    /// Parse and validate settings from a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mean_filter_window == 0 {
            return Err(ConfigError::InvalidMeanFilterWindow(self.mean_filter_window));
        }
        if self.min_sample_count == 0 {
            return Err(ConfigError::InvalidMinSampleCount(self.min_sample_count));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(ConfigError::InvalidEpsilon(self.epsilon));
        }
        Ok(())
    }
}
