//! Orientation session: sample filtering, seeding and integration

use nalgebra::Vector3;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::estimator;
use crate::filter::MeanFilter;
use crate::integrator::GyroscopeIntegrator;
use crate::math::RotationMatrix;
use crate::types::{EngineSettings, IntegratorState, Orientation, SensorEvent, SensorSample};

/// All per-session orientation state
///
/// A session owns its filters and rotation matrices exclusively. Events are
/// fed one at a time through [`handle`](Self::handle); callers delivering
/// from several threads must serialize access, for example through
/// [`SharedEngine`](crate::SharedEngine).
///
/// # Example
/// ```
/// use gyro_orientation::{EngineSettings, OrientationSession, SensorEvent};
///
/// let mut session = OrientationSession::new(&EngineSettings::default()).unwrap();
///
/// for i in 0..31 {
///     session.handle(SensorEvent::magnetic(0.0, 20.0, -40.0, i));
///     session.handle(SensorEvent::acceleration(0.0, 0.0, 9.81, i));
/// }
/// assert!(session.has_initial_orientation());
///
/// session.handle(SensorEvent::angular_velocity(0.0, 0.0, 0.0, 100));
/// let orientation = session.handle(SensorEvent::angular_velocity(0.0, 0.0, 0.1, 200));
/// assert!(orientation.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct OrientationSession {
    min_sample_count: u32,
    acceleration_filter: MeanFilter,
    magnetic_filter: MeanFilter,
    /// Latest filtered accelerometer reading
    acceleration: Vector3<f32>,
    /// Latest filtered magnetometer reading
    magnetic: Vector3<f32>,
    acceleration_sample_count: u32,
    magnetic_sample_count: u32,
    /// Absolute orientation, once estimated
    initial_rotation: Option<RotationMatrix>,
    integrator: GyroscopeIntegrator,
}

impl OrientationSession {
    pub fn new(settings: &EngineSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            min_sample_count: settings.min_sample_count,
            acceleration_filter: MeanFilter::new(settings.mean_filter_window)?,
            magnetic_filter: MeanFilter::new(settings.mean_filter_window)?,
            acceleration: Vector3::zeros(),
            magnetic: Vector3::zeros(),
            acceleration_sample_count: 0,
            magnetic_sample_count: 0,
            initial_rotation: None,
            integrator: GyroscopeIntegrator::with_epsilon(settings.epsilon),
        })
    }

    /// Process one event
    ///
    /// # Returns
    /// The updated orientation after an angular-velocity sample once the
    /// session is seeded, `None` for every other event.
    pub fn handle(&mut self, event: SensorEvent) -> Option<Orientation> {
        match event {
            SensorEvent::Acceleration(sample) => {
                self.on_acceleration(&sample);
                None
            }
            SensorEvent::Magnetic(sample) => {
                self.on_magnetic(&sample);
                None
            }
            SensorEvent::AngularVelocity(sample) => self.on_angular_velocity(&sample),
        }
    }

    /// Clear filters, counters and matrices back to the warm-up state
    pub fn restart(&mut self) {
        self.acceleration_filter.reset();
        self.magnetic_filter.reset();
        self.acceleration = Vector3::zeros();
        self.magnetic = Vector3::zeros();
        self.acceleration_sample_count = 0;
        self.magnetic_sample_count = 0;
        self.initial_rotation = None;
        self.integrator.reset();
    }

    pub fn has_initial_orientation(&self) -> bool {
        self.initial_rotation.is_some()
    }

    /// Whether the seed has been applied to the running rotation
    pub fn is_seeded(&self) -> bool {
        self.integrator.state() == IntegratorState::Integrating
    }

    pub fn state(&self) -> IntegratorState {
        self.integrator.state()
    }

    pub fn acceleration_sample_count(&self) -> u32 {
        self.acceleration_sample_count
    }

    pub fn magnetic_sample_count(&self) -> u32 {
        self.magnetic_sample_count
    }

    pub fn filtered_acceleration(&self) -> Vector3<f32> {
        self.acceleration
    }

    pub fn filtered_magnetic(&self) -> Vector3<f32> {
        self.magnetic
    }

    pub fn initial_rotation_matrix(&self) -> Option<RotationMatrix> {
        self.initial_rotation
    }

    /// Running device-to-world rotation
    pub fn rotation_matrix(&self) -> RotationMatrix {
        self.integrator.rotation_matrix()
    }

    /// Last orientation computed by the integrator
    pub fn orientation(&self) -> Orientation {
        self.integrator.orientation()
    }

    fn on_acceleration(&mut self, sample: &SensorSample) {
        if self.has_initial_orientation() {
            return;
        }

        self.acceleration = self.acceleration_filter.push(sample.values);
        self.acceleration_sample_count = self.acceleration_sample_count.saturating_add(1);

        if self.acceleration_sample_count > self.min_sample_count
            && self.magnetic_sample_count > self.min_sample_count
        {
            self.calculate_initial_orientation();
        }
    }

    fn on_magnetic(&mut self, sample: &SensorSample) {
        if self.has_initial_orientation() {
            return;
        }

        self.magnetic = self.magnetic_filter.push(sample.values);
        self.magnetic_sample_count = self.magnetic_sample_count.saturating_add(1);
    }

    fn on_angular_velocity(&mut self, sample: &SensorSample) -> Option<Orientation> {
        match self.integrator.integrate(sample) {
            Ok(orientation) => orientation,
            Err(error) => {
                debug!(%error, "skipping angular velocity sample");
                None
            }
        }
    }

    fn calculate_initial_orientation(&mut self) {
        match estimator::estimate(self.acceleration, self.magnetic) {
            Ok(rotation) => {
                let inclination = estimator::magnetic_inclination(self.acceleration, self.magnetic)
                    .map(f32::to_degrees);
                info!(
                    acceleration_samples = self.acceleration_sample_count,
                    magnetic_samples = self.magnetic_sample_count,
                    inclination = ?inclination,
                    "initial orientation computed"
                );
                self.initial_rotation = Some(rotation);
                self.integrator.seed(rotation);
            }
            Err(error) => {
                debug!(%error, "initial orientation not available yet");
            }
        }
    }
}
