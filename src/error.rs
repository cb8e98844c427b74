//! Error types for the orientation engine

/// Configuration errors, reported before any session starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("mean filter window must be at least 1, got {0}")]
    InvalidMeanFilterWindow(usize),

    #[error("minimum sample count must be at least 1, got {0}")]
    InvalidMinSampleCount(u32),

    #[error("epsilon must be finite and non-negative, got {0}")]
    InvalidEpsilon(f32),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Recoverable per-sample conditions.
///
/// These never abort a session: the caller skips the sample (or the estimate)
/// and carries on with the next event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SampleError {
    #[error("gravity and magnetic field are degenerate (near-parallel or free fall)")]
    DegenerateOrientationInput,

    #[error("timestamp {current} ns is not after previous timestamp {previous} ns")]
    OutOfOrderTimestamp { previous: i64, current: i64 },
}
