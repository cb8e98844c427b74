//! Session lifecycle: subscriptions, source selection and output delivery

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::error::ConfigError;
use crate::session::OrientationSession;
use crate::source::{AngularVelocitySource, SourceKind, SourceReading, source_for};
use crate::types::{EngineSettings, Orientation, SensorEvent, SensorStream};

/// Host side of sensor delivery
///
/// The engine asks the host to start and stop streams; the host then feeds
/// readings back through [`Engine::handle`] and [`Engine::on_source_reading`].
pub trait SensorHub {
    /// Start delivering a stream, returning `false` if the device lacks it
    fn subscribe(&mut self, stream: SensorStream) -> bool;

    fn unsubscribe(&mut self, stream: SensorStream);
}

/// Receiver of orientation updates, typically a display
pub trait OrientationSink {
    fn orientation_updated(&mut self, orientation: Orientation);
}

impl<F> OrientationSink for F
where
    F: FnMut(Orientation),
{
    fn orientation_updated(&mut self, orientation: Orientation) {
        self(orientation)
    }
}

/// Orientation engine bound to a host and a display
///
/// The engine starts paused. [`resume`](Self::resume) subscribes the
/// accelerometer, the magnetic field and the streams of the configured
/// angular-velocity source; once the initial orientation is known the
/// accelerometer and magnetic streams are released again. Pausing
/// unsubscribes everything and discards the session, so every resume
/// repeats the full warm-up.
///
/// # Example
/// ```
/// use gyro_orientation::{Engine, EngineSettings, Orientation, SensorHub, SensorStream};
///
/// struct Host;
///
/// impl SensorHub for Host {
///     fn subscribe(&mut self, _stream: SensorStream) -> bool {
///         true
///     }
///     fn unsubscribe(&mut self, _stream: SensorStream) {}
/// }
///
/// let mut updates = Vec::new();
/// let sink = |o: Orientation| updates.push(o);
/// let mut engine = Engine::new(EngineSettings::default(), Host, sink).unwrap();
/// engine.resume();
/// assert!(engine.is_running());
/// ```
pub struct Engine<H, S> {
    settings: EngineSettings,
    session: OrientationSession,
    source: Box<dyn AngularVelocitySource>,
    hub: H,
    sink: S,
    /// Streams currently subscribed through the hub
    subscribed: Vec<SensorStream>,
    running: bool,
}

impl<H, S> Engine<H, S>
where
    H: SensorHub,
    S: OrientationSink,
{
    pub fn new(settings: EngineSettings, hub: H, sink: S) -> Result<Self, ConfigError> {
        let session = OrientationSession::new(&settings)?;
        Ok(Self {
            settings,
            session,
            source: source_for(&settings),
            hub,
            sink,
            subscribed: Vec::new(),
            running: false,
        })
    }

    /// Reattach all streams and start a fresh warm-up
    pub fn resume(&mut self) {
        if self.running {
            return;
        }

        self.session.restart();
        self.source.reset();

        self.subscribe(SensorStream::Accelerometer);
        self.subscribe(SensorStream::MagneticField);
        for &stream in self.source.streams() {
            self.subscribe(stream);
        }

        self.running = true;
        info!(source = ?self.source.kind(), "orientation tracking resumed");
    }

    /// Detach all streams and discard the session state
    pub fn pause(&mut self) {
        if !self.running {
            return;
        }

        for stream in self.subscribed.drain(..) {
            self.hub.unsubscribe(stream);
        }
        self.session.restart();
        self.source.reset();

        self.running = false;
        info!("orientation tracking paused");
    }

    /// Pause and resume, recomputing the initial orientation from scratch
    pub fn restart(&mut self) {
        self.pause();
        self.resume();
    }

    /// Feed one event into the session
    ///
    /// Events arriving while paused, or on a stream that has been released,
    /// are dropped. Angular velocity is only taken directly while the
    /// gyroscope source is active. Orientation updates are pushed to the sink
    /// and returned.
    pub fn handle(&mut self, event: SensorEvent) -> Option<Orientation> {
        if !self.running {
            return None;
        }

        let accepted = match event {
            SensorEvent::Acceleration(_) => self.is_subscribed(SensorStream::Accelerometer),
            SensorEvent::Magnetic(_) => self.is_subscribed(SensorStream::MagneticField),
            SensorEvent::AngularVelocity(_) => {
                self.source.kind() == SourceKind::Gyroscope
                    && self.is_subscribed(SensorStream::Gyroscope)
            }
        };
        if !accepted {
            return None;
        }

        self.dispatch(event)
    }

    /// Feed a reading to the active angular-velocity source
    pub fn on_source_reading(&mut self, reading: SourceReading) -> Option<Orientation> {
        if !self.running {
            return None;
        }
        if !self.source.streams().iter().all(|&stream| self.is_subscribed(stream)) {
            return None;
        }

        let sample = self.source.accept(&reading)?;
        self.dispatch(SensorEvent::AngularVelocity(sample))
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_subscribed(&self, stream: SensorStream) -> bool {
        self.subscribed.contains(&stream)
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn session(&self) -> &OrientationSession {
        &self.session
    }

    pub fn hub(&self) -> &H {
        &self.hub
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn dispatch(&mut self, event: SensorEvent) -> Option<Orientation> {
        let had_initial_orientation = self.session.has_initial_orientation();
        let orientation = self.session.handle(event);

        if !had_initial_orientation && self.session.has_initial_orientation() {
            // Gravity and field are no longer needed until the next warm-up
            self.unsubscribe(SensorStream::Accelerometer);
            self.unsubscribe(SensorStream::MagneticField);
        }

        if let Some(orientation) = orientation {
            self.sink.orientation_updated(orientation);
        }
        orientation
    }

    fn subscribe(&mut self, stream: SensorStream) {
        if self.is_subscribed(stream) {
            return;
        }
        if self.hub.subscribe(stream) {
            self.subscribed.push(stream);
        } else {
            warn!(?stream, "sensor stream unavailable");
        }
    }

    fn unsubscribe(&mut self, stream: SensorStream) {
        if let Some(index) = self.subscribed.iter().position(|&s| s == stream) {
            self.subscribed.swap_remove(index);
            self.hub.unsubscribe(stream);
        }
    }
}

/// Engine shared between delivery threads
///
/// Every call takes the lock for the duration of one event, so session
/// updates never interleave.
pub struct SharedEngine<H, S> {
    inner: Arc<Mutex<Engine<H, S>>>,
}

impl<H, S> Clone for SharedEngine<H, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H, S> SharedEngine<H, S>
where
    H: SensorHub,
    S: OrientationSink,
{
    pub fn new(engine: Engine<H, S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn handle(&self, event: SensorEvent) -> Option<Orientation> {
        self.lock().handle(event)
    }

    pub fn on_source_reading(&self, reading: SourceReading) -> Option<Orientation> {
        self.lock().on_source_reading(reading)
    }

    pub fn resume(&self) {
        self.lock().resume();
    }

    pub fn pause(&self) {
        self.lock().pause();
    }

    pub fn restart(&self) {
        self.lock().restart();
    }

    /// Run `f` with exclusive access to the engine
    pub fn with<R>(&self, f: impl FnOnce(&mut Engine<H, S>) -> R) -> R {
        f(&mut self.lock())
    }

    // A panic inside a sink leaves the session consistent between events
    fn lock(&self) -> MutexGuard<'_, Engine<H, S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IntegratorState, RotationSample, SensorSample};
    use nalgebra::{UnitQuaternion, Vector3};

    const MILLISECOND: i64 = 1_000_000;

    #[derive(Default)]
    struct RecordingHub {
        active: Vec<SensorStream>,
        unavailable: Vec<SensorStream>,
        unsubscribed: Vec<SensorStream>,
    }

    impl SensorHub for RecordingHub {
        fn subscribe(&mut self, stream: SensorStream) -> bool {
            if self.unavailable.contains(&stream) {
                return false;
            }
            self.active.push(stream);
            true
        }

        fn unsubscribe(&mut self, stream: SensorStream) {
            self.active.retain(|&s| s != stream);
            self.unsubscribed.push(stream);
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        updates: Vec<Orientation>,
    }

    impl OrientationSink for RecordingSink {
        fn orientation_updated(&mut self, orientation: Orientation) {
            self.updates.push(orientation);
        }
    }

    fn engine(settings: EngineSettings) -> Engine<RecordingHub, RecordingSink> {
        Engine::new(settings, RecordingHub::default(), RecordingSink::default()).unwrap()
    }

    fn warm_up<H: SensorHub, S: OrientationSink>(engine: &mut Engine<H, S>) {
        for i in 0..31 {
            engine.handle(SensorEvent::magnetic(0.0, 20.0, -40.0, i * MILLISECOND));
            engine.handle(SensorEvent::acceleration(0.0, 0.0, 9.81, i * MILLISECOND));
        }
    }

    #[test]
    fn test_starts_paused() {
        let mut engine = engine(EngineSettings::default());
        assert!(!engine.is_running());
        assert!(engine.hub().active.is_empty());

        engine.handle(SensorEvent::acceleration(0.0, 0.0, 9.81, 0));
        assert_eq!(engine.session().acceleration_sample_count(), 0);
    }

    #[test]
    fn test_resume_subscribes_gyroscope_streams() {
        let mut engine = engine(EngineSettings::default());
        engine.resume();

        assert_eq!(
            engine.hub().active,
            vec![
                SensorStream::Accelerometer,
                SensorStream::MagneticField,
                SensorStream::Gyroscope
            ]
        );
    }

    #[test]
    fn test_fused_source_subscribes_rotation_vector() {
        let mut engine = engine(EngineSettings {
            use_fused_source: true,
            ..Default::default()
        });
        engine.resume();

        assert_eq!(engine.source_kind(), SourceKind::Fused);
        assert!(engine.is_subscribed(SensorStream::RotationVector));
        assert!(!engine.is_subscribed(SensorStream::Gyroscope));
    }

    #[test]
    fn test_unavailable_stream_is_not_tracked() {
        let hub = RecordingHub {
            unavailable: vec![SensorStream::Gyroscope],
            ..Default::default()
        };
        let mut engine =
            Engine::new(EngineSettings::default(), hub, RecordingSink::default()).unwrap();
        engine.resume();

        assert!(!engine.is_subscribed(SensorStream::Gyroscope));
        assert!(engine.is_subscribed(SensorStream::Accelerometer));
    }

    #[test]
    fn test_unavailable_gyroscope_drops_angular_velocity() {
        let hub = RecordingHub {
            unavailable: vec![SensorStream::Gyroscope],
            ..Default::default()
        };
        let mut engine =
            Engine::new(EngineSettings::default(), hub, RecordingSink::default()).unwrap();
        engine.resume();
        warm_up(&mut engine);
        assert!(engine.session().has_initial_orientation());

        let raw = SensorEvent::angular_velocity(0.0, 0.0, 1.0, 1_000 * MILLISECOND);
        assert!(engine.handle(raw).is_none());
        let sample = SensorSample::new(0.0, 0.0, 1.0, 1_100 * MILLISECOND);
        let reading = SourceReading::Gyroscope(sample);
        assert!(engine.on_source_reading(reading).is_none());

        assert!(engine.sink().updates.is_empty());
        assert_eq!(engine.session().state(), IntegratorState::Seeding);
    }

    #[test]
    fn test_fused_mode_ignores_raw_gyroscope() {
        let mut engine = engine(EngineSettings {
            use_fused_source: true,
            ..Default::default()
        });
        engine.resume();
        warm_up(&mut engine);

        // Raw rates are not the configured upstream
        let raw = SensorEvent::angular_velocity(0.0, 0.0, 1.0, 1_000 * MILLISECOND);
        assert!(engine.handle(raw).is_none());
        let sample = SensorSample::new(0.0, 0.0, 1.0, 1_050 * MILLISECOND);
        let reading = SourceReading::Gyroscope(sample);
        assert!(engine.on_source_reading(reading).is_none());
        assert!(engine.sink().updates.is_empty());

        for i in 0..3 {
            let rotation =
                UnitQuaternion::from_scaled_axis(Vector3::new(0.0, 0.0, 0.1 * i as f32));
            engine.on_source_reading(SourceReading::RotationVector(RotationSample {
                rotation,
                timestamp: (1_100 + i) * MILLISECOND,
            }));
        }
        // Interleaved raw samples leave the fused integration untouched
        engine.handle(SensorEvent::angular_velocity(5.0, 0.0, 0.0, 1_103 * MILLISECOND));

        assert_eq!(engine.sink().updates.len(), 2);
        let last = engine.sink().updates.last().unwrap();
        assert!((last.azimuth + 0.1f32.to_degrees()).abs() < 1e-2, "azimuth {}", last.azimuth);
        assert!(last.roll.abs() < 1e-2);
        assert!(last.pitch.abs() < 1e-2);
    }

    #[test]
    fn test_releases_inputs_after_initial_orientation() {
        let mut engine = engine(EngineSettings::default());
        engine.resume();
        warm_up(&mut engine);

        assert!(engine.session().has_initial_orientation());
        assert_eq!(engine.hub().active, vec![SensorStream::Gyroscope]);
        assert_eq!(
            engine.hub().unsubscribed,
            vec![SensorStream::Accelerometer, SensorStream::MagneticField]
        );
    }

    #[test]
    fn test_pushes_orientation_to_sink() {
        let mut engine = engine(EngineSettings::default());
        engine.resume();

        // Dropped during warm-up
        engine.on_source_reading(SourceReading::Gyroscope(SensorSample::new(0.0, 0.0, 1.0, 0)));
        assert!(engine.sink().updates.is_empty());

        warm_up(&mut engine);
        let at_rest = SensorSample::new(0.0, 0.0, 0.0, 100 * MILLISECOND);
        let turning = SensorSample::new(0.0, 0.0, 0.5, 200 * MILLISECOND);
        engine.on_source_reading(SourceReading::Gyroscope(at_rest));
        engine.on_source_reading(SourceReading::Gyroscope(turning));

        assert_eq!(engine.sink().updates.len(), 2);
        assert_eq!(engine.session().state(), IntegratorState::Integrating);
    }

    #[test]
    fn test_fused_readings_drive_integration() {
        let mut engine = engine(EngineSettings {
            use_fused_source: true,
            ..Default::default()
        });
        engine.resume();
        warm_up(&mut engine);

        for i in 0..5 {
            let rotation =
                UnitQuaternion::from_scaled_axis(Vector3::new(0.0, 0.0, 0.1 * i as f32));
            engine.on_source_reading(SourceReading::RotationVector(RotationSample {
                rotation,
                timestamp: (100 + i) * MILLISECOND,
            }));
        }

        // First reading primes the source, second seeds the integrator
        assert_eq!(engine.sink().updates.len(), 4);
        let last = engine.sink().updates.last().unwrap();
        // 0.3 rad about +Z after the seed
        let expected = -0.3f32.to_degrees();
        assert!((last.azimuth - expected).abs() < 1e-2, "azimuth {}", last.azimuth);
    }

    #[test]
    fn test_pause_resume_repeats_warm_up() {
        let mut engine = engine(EngineSettings::default());
        engine.resume();
        warm_up(&mut engine);
        engine.handle(SensorEvent::angular_velocity(0.0, 0.0, 0.0, 100 * MILLISECOND));

        engine.pause();
        assert!(!engine.is_running());
        assert!(engine.hub().active.is_empty());
        assert_eq!(engine.session().state(), IntegratorState::Uninitialized);
        let late = SensorEvent::angular_velocity(0.0, 0.0, 1.0, 200 * MILLISECOND);
        assert!(engine.handle(late).is_none());

        engine.resume();
        assert!(!engine.session().has_initial_orientation());
        assert!(engine.is_subscribed(SensorStream::Accelerometer));
        warm_up(&mut engine);
        assert!(engine.session().has_initial_orientation());
    }

    #[test]
    fn test_restart_from_integrating() {
        let mut engine = engine(EngineSettings::default());
        engine.resume();
        warm_up(&mut engine);
        engine.handle(SensorEvent::angular_velocity(0.0, 0.0, 0.0, 100 * MILLISECOND));
        engine.handle(SensorEvent::angular_velocity(0.2, 0.0, 0.0, 200 * MILLISECOND));

        engine.restart();

        assert!(engine.is_running());
        assert_eq!(engine.session().acceleration_sample_count(), 0);
        assert_eq!(engine.session().state(), IntegratorState::Uninitialized);
        assert_eq!(engine.session().rotation_matrix(), nalgebra::Matrix3::identity());
    }

    #[test]
    fn test_shared_engine_serializes_threads() {
        let shared = SharedEngine::new(engine(EngineSettings::default()));
        shared.resume();

        let handles: Vec<_> = [(0.0f32, 20.0f32, -40.0f32), (0.0, 0.0, 9.81)]
            .into_iter()
            .enumerate()
            .map(|(kind, (x, y, z))| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for i in 0..40 {
                        let event = if kind == 0 {
                            SensorEvent::magnetic(x, y, z, i)
                        } else {
                            SensorEvent::acceleration(x, y, z, i)
                        };
                        shared.handle(event);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Seeding only happens on acceleration events, so either the session
        // seeded or every one of the 80 updates was counted
        shared.with(|engine| {
            let session = engine.session();
            assert!(
                session.has_initial_orientation()
                    || (session.acceleration_sample_count() == 40
                        && session.magnetic_sample_count() == 40)
            );
        });
    }
}
