//! Gyro Orientation - real-time device orientation from motion sensors
//!
//! This library estimates the 3D orientation of a device by combining three
//! sensors. Accelerometer and magnetometer samples are smoothed with mean
//! filters until enough have accumulated to compute an absolute starting
//! orientation from gravity and the magnetic field. From then on the
//! orientation is tracked by integrating gyroscope angular velocity into
//! quaternion delta rotations composed with the running rotation matrix.
//!
//! # Features
//!
//! - Fixed-window mean filtering of accelerometer and magnetometer samples
//! - One-time absolute orientation from gravity and magnetic field (East-North-Up)
//! - Quaternion-based gyroscope integration with out-of-order timestamp rejection
//! - Interchangeable angular-velocity sources (raw gyroscope or platform rotation vector)
//! - Lifecycle controller with pause/resume/restart and stream subscription management
//!
//! # Quick Start
//!
//! ```rust
//! use gyro_orientation::{EngineSettings, OrientationSession, SensorEvent};
//!
//! let mut session = OrientationSession::new(&EngineSettings::default()).unwrap();
//!
//! // Warm-up: the device lies flat, facing magnetic north
//! for i in 0..31 {
//!     session.handle(SensorEvent::magnetic(0.0, 20.0, -40.0, i * 10_000_000));
//!     session.handle(SensorEvent::acceleration(0.0, 0.0, 9.81, i * 10_000_000));
//! }
//!
//! // Gyroscope in rad/s, timestamps in nanoseconds
//! session.handle(SensorEvent::angular_velocity(0.0, 0.0, 0.0, 400_000_000));
//! let orientation = session
//!     .handle(SensorEvent::angular_velocity(0.0, 0.0, 0.5, 500_000_000))
//!     .unwrap();
//!
//! println!(
//!     "Azimuth: {:.2}, Pitch: {:.2}, Roll: {:.2}",
//!     orientation.azimuth, orientation.pitch, orientation.roll
//! );
//! ```

mod engine;
mod error;
pub mod estimator;
mod filter;
mod integrator;
pub mod math;
mod session;
mod source;
mod types;

// Re-export all public types and functions
pub use engine::{Engine, OrientationSink, SensorHub, SharedEngine};
pub use error::{ConfigError, SampleError};
pub use estimator::{magnetic_inclination, try_estimate};
pub use filter::MeanFilter;
pub use integrator::{DEFAULT_EPSILON, GyroscopeIntegrator};
pub use math::{DEG_TO_RAD, NS_TO_S, RAD_TO_DEG, RotationMatrix};
pub use session::OrientationSession;
pub use source::{
    AngularVelocitySource, FusedRotationSource, GyroscopeSource, SourceKind, SourceReading,
    source_for,
};
pub use types::*;
