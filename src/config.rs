use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{LidarNoise, RadarNoise, AUG_DIM};

/// Process noise standard deviations driving the CTRV model
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessNoise {
    /// Longitudinal acceleration [m/s²]
    pub std_a: f64,
    /// Yaw acceleration [rad/s²]
    pub std_yawdd: f64,
}

impl Default for ProcessNoise {
    fn default() -> Self {
        Self {
            std_a: 0.2,
            std_yawdd: 0.2,
        }
    }
}

/// Lidar noise as provided by the sensor manufacturer
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LidarConfig {
    pub enabled: bool,
    /// Position x [m]
    pub std_px: f64,
    /// Position y [m]
    pub std_py: f64,
}

impl Default for LidarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            std_px: 0.15,
            std_py: 0.15,
        }
    }
}

impl LidarConfig {
    pub fn noise_covariance(&self) -> LidarNoise {
        LidarNoise::from_diagonal(&nalgebra::Vector2::new(
            self.std_px * self.std_px,
            self.std_py * self.std_py,
        ))
    }
}

/// Radar noise as provided by the sensor manufacturer
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    pub enabled: bool,
    /// Range [m]
    pub std_rho: f64,
    /// Bearing [rad]
    pub std_phi: f64,
    /// Range rate [m/s]
    pub std_rho_dot: f64,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            std_rho: 0.3,
            std_phi: 0.03,
            std_rho_dot: 0.3,
        }
    }
}

impl RadarConfig {
    pub fn noise_covariance(&self) -> RadarNoise {
        RadarNoise::from_diagonal(&nalgebra::Vector3::new(
            self.std_rho * self.std_rho,
            self.std_phi * self.std_phi,
            self.std_rho_dot * self.std_rho_dot,
        ))
    }
}

/// Initial belief for dimensions no single measurement observes
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialBelief {
    /// Speed assigned on initialization [m/s]
    pub speed: f64,
    pub speed_variance: f64,
    pub yaw_variance: f64,
    pub yaw_rate_variance: f64,
}

impl Default for InitialBelief {
    fn default() -> Self {
        Self {
            speed: 0.0,
            speed_variance: 25.0,
            yaw_variance: 1.0,
            yaw_rate_variance: 1.0,
        }
    }
}

/// Immutable filter configuration, fixed at construction
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UkfConfig {
    pub process_noise: ProcessNoise,
    pub lidar: LidarConfig,
    pub radar: RadarConfig,
    pub initial: InitialBelief,
    /// Sigma point spreading parameter (lambda)
    pub spreading: f64,
}

impl Default for UkfConfig {
    fn default() -> Self {
        Self {
            process_noise: ProcessNoise::default(),
            lidar: LidarConfig::default(),
            radar: RadarConfig::default(),
            initial: InitialBelief::default(),
            spreading: 3.0 - AUG_DIM as f64,
        }
    }
}

impl UkfConfig {
    /// Load a configuration from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: UkfConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let stds = [
            ("process_noise.std_a", self.process_noise.std_a),
            ("process_noise.std_yawdd", self.process_noise.std_yawdd),
            ("lidar.std_px", self.lidar.std_px),
            ("lidar.std_py", self.lidar.std_py),
            ("radar.std_rho", self.radar.std_rho),
            ("radar.std_phi", self.radar.std_phi),
            ("radar.std_rho_dot", self.radar.std_rho_dot),
        ];
        for (name, value) in stds {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositiveStd { name, value });
            }
        }

        let variances = [
            ("initial.speed_variance", self.initial.speed_variance),
            ("initial.yaw_variance", self.initial.yaw_variance),
            ("initial.yaw_rate_variance", self.initial.yaw_rate_variance),
        ];
        for (name, value) in variances {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositiveVariance { name, value });
            }
        }

        if !self.initial.speed.is_finite() {
            return Err(ConfigError::InvalidInitialSpeed(self.initial.speed));
        }

        if !(self.spreading.is_finite() && self.spreading + AUG_DIM as f64 > 0.0) {
            return Err(ConfigError::InvalidSpreading {
                lambda: self.spreading,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = UkfConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.spreading, -4.0);
        assert!(config.lidar.enabled && config.radar.enabled);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: UkfConfig =
            serde_json::from_str(r#"{ "radar": { "enabled": false }, "process_noise": { "std_a": 1.5 } }"#)
                .unwrap();
        assert!(!config.radar.enabled);
        assert_eq!(config.radar.std_phi, 0.03);
        assert_eq!(config.process_noise.std_a, 1.5);
        assert_eq!(config.process_noise.std_yawdd, 0.2);
        assert!(config.lidar.enabled);
    }

    #[test]
    fn test_rejects_zero_std() {
        let mut config = UkfConfig::default();
        config.lidar.std_px = 0.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositiveStd {
                name: "lidar.std_px",
                value: 0.0
            })
        );
    }

    #[test]
    fn test_rejects_bad_spreading() {
        let mut config = UkfConfig::default();
        config.spreading = -(AUG_DIM as f64);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSpreading { .. })
        ));
    }

    #[test]
    fn test_noise_covariances() {
        let config = UkfConfig::default();
        let r = config.radar.noise_covariance();
        assert!((r[(0, 0)] - 0.09).abs() < 1e-12);
        assert!((r[(1, 1)] - 0.0009).abs() < 1e-12);
        assert_eq!(r[(0, 1)], 0.0);
        let l = config.lidar.noise_covariance();
        assert!((l[(1, 1)] - 0.0225).abs() < 1e-12);
    }
}
