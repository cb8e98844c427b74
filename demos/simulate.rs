//! Simulated session: warm up flat facing north, then turn at a constant rate
//!
//! Run with `RUST_LOG=debug cargo run --example simulate` to see the engine logs.

use gyro_orientation::{
    Engine, EngineSettings, Orientation, SensorEvent, SensorHub, SensorSample, SensorStream,
    SourceReading,
};
use tracing_subscriber::EnvFilter;

const PERIOD_NS: i64 = 10_000_000; // 100 Hz

struct SimulatedHub;

impl SensorHub for SimulatedHub {
    fn subscribe(&mut self, stream: SensorStream) -> bool {
        println!("subscribe {:?}", stream);
        true
    }

    fn unsubscribe(&mut self, stream: SensorStream) {
        println!("unsubscribe {:?}", stream);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let display = |orientation: Orientation| {
        println!(
            "Azimuth: {:.2}, Pitch: {:.2}, Roll: {:.2}",
            orientation.azimuth, orientation.pitch, orientation.roll
        );
    };

    let mut engine = match Engine::new(EngineSettings::default(), SimulatedHub, display) {
        Ok(engine) => engine,
        Err(error) => {
            eprintln!("invalid settings: {error}");
            return;
        }
    };
    engine.resume();

    for i in 0..200 {
        let timestamp = i * PERIOD_NS;
        // replace these with actual accelerometer (m/s²) and magnetometer (µT) data
        engine.handle(SensorEvent::magnetic(0.0, 22.0, -40.0, timestamp));
        engine.handle(SensorEvent::acceleration(0.0, 0.0, 9.81, timestamp));

        // 45°/s about Z once the warm-up is over
        let rate = if i < 40 { 0.0 } else { core::f32::consts::FRAC_PI_4 };
        let gyroscope = SensorSample::new(0.0, 0.0, rate, timestamp + 1);
        engine.on_source_reading(SourceReading::Gyroscope(gyroscope));
    }
}
