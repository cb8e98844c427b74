//! Fixed-window moving-average filter for vector sensor channels

use std::collections::VecDeque;

use nalgebra::Vector3;

use crate::error::ConfigError;

/// Moving-average smoother over the last `window` samples
///
/// Each axis is averaged independently. One instance filters a single
/// stream; the session keeps separate filters for acceleration and the
/// magnetic field.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use gyro_orientation::MeanFilter;
///
/// let mut filter = MeanFilter::new(2).unwrap();
/// filter.push(Vector3::new(1.0, 0.0, 0.0));
/// filter.push(Vector3::new(3.0, 0.0, 0.0));
/// let mean = filter.push(Vector3::new(5.0, 0.0, 0.0));
/// assert_eq!(mean.x, 4.0);
/// ```
#[derive(Debug, Clone)]
pub struct MeanFilter {
    window: usize,
    samples: VecDeque<Vector3<f32>>,
}

impl MeanFilter {
    pub fn new(window: usize) -> Result<Self, ConfigError> {
        if window == 0 {
            return Err(ConfigError::InvalidMeanFilterWindow(window));
        }
        Ok(Self {
            window,
            samples: VecDeque::with_capacity(window + 1),
        })
    }

    /// Append a sample and return the mean of the buffered samples
    pub fn push(&mut self, sample: Vector3<f32>) -> Vector3<f32> {
        self.samples.push_back(sample);
        if self.samples.len() > self.window {
            self.samples.pop_front();
        }
        self.mean()
    }

    /// Mean of the buffered samples, zero when empty
    pub fn mean(&self) -> Vector3<f32> {
        if self.samples.is_empty() {
            return Vector3::zeros();
        }
        let sum: Vector3<f32> = self.samples.iter().sum();
        sum / self.samples.len() as f32
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }
}
