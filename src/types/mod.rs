pub mod linalg;

pub use linalg::*;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FilterError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Lidar,
    Radar,
}

impl SensorKind {
    /// Number of raw values a measurement from this sensor carries
    pub fn measurement_dim(self) -> usize {
        match self {
            SensorKind::Lidar => MEASURE_DIM_LIDAR,
            SensorKind::Radar => MEASURE_DIM_RADAR,
        }
    }

    /// Single-letter tag used in dataset files
    pub fn tag(self) -> char {
        match self {
            SensorKind::Lidar => 'L',
            SensorKind::Radar => 'R',
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Lidar => write!(f, "lidar"),
            SensorKind::Radar => write!(f, "radar"),
        }
    }
}

/// Raw values of a single observation
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sensor", rename_all = "lowercase")]
pub enum Measurement {
    /// Cartesian position [m]
    Lidar { px: f64, py: f64 },
    /// Range [m], bearing [rad], range rate [m/s]
    Radar { rho: f64, phi: f64, rho_dot: f64 },
}

impl Measurement {
    pub fn kind(&self) -> SensorKind {
        match self {
            Measurement::Lidar { .. } => SensorKind::Lidar,
            Measurement::Radar { .. } => SensorKind::Radar,
        }
    }

    /// Position implied by the measurement in the sensor's Cartesian frame
    pub fn cartesian_position(&self) -> (f64, f64) {
        match *self {
            Measurement::Lidar { px, py } => (px, py),
            Measurement::Radar { rho, phi, .. } => crate::geometry::polar_to_cartesian(rho, phi),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.values().iter().all(|v| v.is_finite())
    }

    pub fn values(&self) -> Vec<f64> {
        match *self {
            Measurement::Lidar { px, py } => vec![px, py],
            Measurement::Radar { rho, phi, rho_dot } => vec![rho, phi, rho_dot],
        }
    }
}

/// One timestamped observation, handed to the filter exactly once
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPackage {
    /// Timestamp in microseconds
    pub timestamp: u64,
    pub measurement: Measurement,
}

impl MeasurementPackage {
    pub fn lidar(timestamp: u64, px: f64, py: f64) -> Self {
        Self {
            timestamp,
            measurement: Measurement::Lidar { px, py },
        }
    }

    pub fn radar(timestamp: u64, rho: f64, phi: f64, rho_dot: f64) -> Self {
        Self {
            timestamp,
            measurement: Measurement::Radar { rho, phi, rho_dot },
        }
    }

    /// Build a package from an untyped value slice, checking its length
    pub fn from_raw(kind: SensorKind, values: &[f64], timestamp: u64) -> Result<Self, FilterError> {
        if values.len() != kind.measurement_dim() {
            return Err(FilterError::InvalidMeasurement {
                kind,
                expected: kind.measurement_dim(),
                actual: values.len(),
            });
        }
        if !values.iter().all(|v| v.is_finite()) {
            return Err(FilterError::NonFiniteMeasurement(kind));
        }
        Ok(match kind {
            SensorKind::Lidar => Self::lidar(timestamp, values[0], values[1]),
            SensorKind::Radar => Self::radar(timestamp, values[0], values[1], values[2]),
        })
    }

    pub fn kind(&self) -> SensorKind {
        self.measurement.kind()
    }
}

/// Cartesian kinematic estimate derived from the CTRV state
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub px: f64,
    pub py: f64,
    pub vx: f64,
    pub vy: f64,
}

impl Estimate {
    pub fn from_state(x: &StateVec) -> Self {
        let (vx, vy) = crate::geometry::heading_velocity(x[2], x[YAW_INDEX]);
        Self {
            px: x[0],
            py: x[1],
            vx,
            vy,
        }
    }

    pub fn to_vector(&self) -> KinematicVec {
        KinematicVec::new(self.px, self.py, self.vx, self.vy)
    }
}

/// Reference state recorded alongside a measurement
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub px: f64,
    pub py: f64,
    pub vx: f64,
    pub vy: f64,
    pub yaw: Option<f64>,
    pub yaw_rate: Option<f64>,
}

impl GroundTruth {
    pub fn to_vector(&self) -> KinematicVec {
        KinematicVec::new(self.px, self.py, self.vx, self.vy)
    }
}
