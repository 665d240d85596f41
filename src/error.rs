use thiserror::Error;

use crate::types::SensorKind;

/// Filter error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Filter has not been initialized by a first measurement")]
    NotInitialized,

    #[error("Measurement timestamp {current} precedes filter clock {previous}")]
    NonMonotonicTimestamp { previous: u64, current: u64 },

    #[error("Negative prediction interval: {0} s")]
    NegativeTimeStep(f64),

    #[error("Update requested without a prediction on the current belief")]
    UpdateWithoutPrediction,

    #[error("Invalid {kind} measurement: expected {expected} values, got {actual}")]
    InvalidMeasurement {
        kind: SensorKind,
        expected: usize,
        actual: usize,
    },

    #[error("Non-finite {0} measurement value")]
    NonFiniteMeasurement(SensorKind),

    #[error("Augmented covariance is not positive definite")]
    CovarianceNotPositiveDefinite,

    #[error("Degenerate radar geometry: range {0} too close to sensor origin")]
    DegenerateRadarRange(f64),

    #[error("Innovation covariance is singular for {0} update")]
    SingularInnovation(SensorKind),
}

impl FilterError {
    /// True for numerical faults after which the filter should be reset or discarded
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            FilterError::CovarianceNotPositiveDefinite
                | FilterError::DegenerateRadarRange(_)
                | FilterError::SingularInnovation(_)
        )
    }
}

/// Configuration validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be finite and positive, got {value}")]
    NonPositiveStd { name: &'static str, value: f64 },

    #[error("{name} must be finite and positive, got {value}")]
    NonPositiveVariance { name: &'static str, value: f64 },

    #[error("Spreading parameter {lambda} gives non-positive lambda + n_aug")]
    InvalidSpreading { lambda: f64 },

    #[error("Initial speed must be finite, got {0}")]
    InvalidInitialSpeed(f64),
}

/// Dataset parsing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatasetError {
    #[error("line {line}: unknown sensor tag {tag:?}")]
    UnknownSensor { line: usize, tag: String },

    #[error("line {line}: expected at least {expected} fields, got {actual}")]
    MissingFields {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("line {line}: invalid number {value:?}")]
    InvalidNumber { line: usize, value: String },
}

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;
