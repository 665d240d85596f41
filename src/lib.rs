//! Unscented Kalman filter tracking a single object with lidar and radar
//! under a constant turn rate and velocity (CTRV) motion model.

pub mod config;
pub mod dataset;
pub mod error;
pub mod filters;
pub mod geometry;
pub mod report;
pub mod simulate;
pub mod tools;
pub mod types;

pub use config::UkfConfig;
pub use error::{FilterError, FilterResult};
pub use filters::{NisMonitor, ProcessOutcome, Ukf};
pub use types::{Measurement, MeasurementPackage, SensorKind};
