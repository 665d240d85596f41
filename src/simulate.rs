//! Synthetic CTRV scenarios with sensor noise
//!
//! Produces alternating lidar/radar records with exact ground truth, for
//! consistency checks and tuning runs.

use rand::prelude::*;
use rand::rngs::SmallRng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::config::UkfConfig;
use crate::dataset::Record;
use crate::filters::ctrv;
use crate::geometry::{heading_velocity, normalize_angle};
use crate::types::{GroundTruth, MeasurementPackage, StateVec};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Initial true state [px, py, v, yaw, yaw_rate]
    pub initial: [f64; 5],
    /// Interval between measurements [us]
    pub step_us: u64,
    pub steps: usize,
    /// First measurement timestamp [us]
    pub start_us: u64,
    /// Random seed; 0 draws from entropy
    pub seed: u64,
    /// Drive the truth with CTRV process noise of the configured strength
    pub process_noise: bool,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            initial: [2.0, 1.0, 4.0, 0.4, 0.1],
            step_us: 50_000,
            steps: 500,
            start_us: 0,
            seed: 42,
            process_noise: false,
        }
    }
}

/// Gaussian noise source with deterministic seeding
struct NoiseGenerator {
    rng: SmallRng,
}

impl NoiseGenerator {
    fn new(seed: u64) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        Self { rng }
    }

    fn gaussian(&mut self, stddev: f64) -> f64 {
        if stddev == 0.0 {
            return 0.0;
        }
        let n: f64 = self.rng.sample(StandardNormal);
        n * stddev
    }
}

/// Generate records, alternating lidar (even steps) and radar (odd steps)
///
/// Sensor noise comes from `config`; the enable flags are ignored.
pub fn generate(scenario: &Scenario, config: &UkfConfig) -> Vec<Record> {
    let mut noise = NoiseGenerator::new(scenario.seed);
    let mut truth = StateVec::from_column_slice(&scenario.initial);
    let dt = scenario.step_us as f64 / 1.0e6;
    let mut records = Vec::with_capacity(scenario.steps);

    for step in 0..scenario.steps {
        if step > 0 {
            let (nu_a, nu_yawdd) = if scenario.process_noise {
                (
                    noise.gaussian(config.process_noise.std_a),
                    noise.gaussian(config.process_noise.std_yawdd),
                )
            } else {
                (0.0, 0.0)
            };
            truth = ctrv::propagate(&ctrv::augmented_point(&truth, nu_a, nu_yawdd), dt);
            truth[3] = normalize_angle(truth[3]);
        }

        let timestamp = scenario.start_us + step as u64 * scenario.step_us;
        let package = if step % 2 == 0 {
            MeasurementPackage::lidar(
                timestamp,
                truth[0] + noise.gaussian(config.lidar.std_px),
                truth[1] + noise.gaussian(config.lidar.std_py),
            )
        } else {
            let (px, py, v, yaw) = (truth[0], truth[1], truth[2], truth[3]);
            let rho = (px * px + py * py).sqrt();
            let (vx, vy) = heading_velocity(v, yaw);
            let rho_dot = if rho > 1e-6 { (px * vx + py * vy) / rho } else { 0.0 };
            MeasurementPackage::radar(
                timestamp,
                rho + noise.gaussian(config.radar.std_rho),
                normalize_angle(py.atan2(px) + noise.gaussian(config.radar.std_phi)),
                rho_dot + noise.gaussian(config.radar.std_rho_dot),
            )
        };

        let (vx, vy) = heading_velocity(truth[2], truth[3]);
        records.push(Record {
            package,
            ground_truth: GroundTruth {
                px: truth[0],
                py: truth[1],
                vx,
                vy,
                yaw: Some(truth[3]),
                yaw_rate: Some(truth[4]),
            },
        });
    }

    records
}
