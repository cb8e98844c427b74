//! Interchangeable angular-velocity sources
//!
//! The integrator only ever sees [`SensorSample`]s of angular velocity. A
//! source turns whatever the host delivers (raw gyroscope readings or the
//! platform's pre-fused rotation vector) into those samples.

use tracing::debug;

use crate::math::NS_TO_S;
use crate::types::{EngineSettings, RotationSample, SensorSample, SensorStream};

/// Which upstream feeds angular velocity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Gyroscope,
    Fused,
}

/// Reading delivered by the host to the active source
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceReading {
    /// Raw gyroscope reading in rad/s
    Gyroscope(SensorSample),
    /// Pre-fused device orientation
    RotationVector(RotationSample),
}

/// Provider of angular-velocity samples
pub trait AngularVelocitySource: Send {
    fn kind(&self) -> SourceKind;

    /// Upstream streams this source needs subscribed
    fn streams(&self) -> &'static [SensorStream];

    /// Convert a host reading into an angular-velocity sample, if it yields one
    ///
    /// Readings meant for the other source kind are ignored.
    fn accept(&mut self, reading: &SourceReading) -> Option<SensorSample>;

    /// Drop any history kept between readings
    fn reset(&mut self);
}

/// Build the source selected by `use_fused_source`
pub fn source_for(settings: &EngineSettings) -> Box<dyn AngularVelocitySource> {
    if settings.use_fused_source {
        Box::new(FusedRotationSource::new())
    } else {
        Box::new(GyroscopeSource)
    }
}

/// Raw gyroscope, forwarded unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct GyroscopeSource;

impl AngularVelocitySource for GyroscopeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Gyroscope
    }

    fn streams(&self) -> &'static [SensorStream] {
        &[SensorStream::Gyroscope]
    }

    fn accept(&mut self, reading: &SourceReading) -> Option<SensorSample> {
        match reading {
            SourceReading::Gyroscope(sample) => Some(*sample),
            SourceReading::RotationVector(_) => None,
        }
    }

    fn reset(&mut self) {}
}

/// Angular velocity derived from consecutive platform rotation vectors
///
/// For readings `q₀` at `t₀` and `q₁` at `t₁` the emitted sample is the
/// body-frame rate `scaled_axis(q₀⁻¹ · q₁) / (t₁ − t₀)` stamped `t₁`. The
/// first reading after a reset only primes the source.
#[derive(Debug, Clone, Default)]
pub struct FusedRotationSource {
    previous: Option<RotationSample>,
}

impl FusedRotationSource {
    pub fn new() -> Self {
        Self { previous: None }
    }
}

impl AngularVelocitySource for FusedRotationSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Fused
    }

    fn streams(&self) -> &'static [SensorStream] {
        &[SensorStream::RotationVector]
    }

    fn accept(&mut self, reading: &SourceReading) -> Option<SensorSample> {
        let SourceReading::RotationVector(current) = reading else {
            return None;
        };

        let Some(previous) = self.previous else {
            self.previous = Some(*current);
            return None;
        };

        if current.timestamp <= previous.timestamp {
            debug!(
                previous = previous.timestamp,
                current = current.timestamp,
                "skipping out-of-order rotation vector"
            );
            return None;
        }

        let delta_time = (current.timestamp - previous.timestamp) as f32 * NS_TO_S;
        let delta = previous.rotation.inverse() * current.rotation;
        self.previous = Some(*current);

        Some(SensorSample {
            values: delta.scaled_axis() / delta_time,
            timestamp: current.timestamp,
        })
    }

    fn reset(&mut self) {
        self.previous = None;
    }
}
