use serde::{Deserialize, Serialize};

use crate::config::UkfConfig;
use crate::error::{FilterError, FilterResult};
use crate::filters::ctrv;
use crate::filters::measurement::{unscented_update, LidarModel, ObservationModel, RadarModel};
use crate::filters::sigma::{self, SigmaWeights};
use crate::types::{
    Estimate, LidarVec, Measurement, MeasurementPackage, RadarVec, SensorKind, SigmaPoints,
    StateMat, StateVec, SIGMA_COUNT, YAW_INDEX,
};

/// Microseconds per second; measurement timestamps are in microseconds
const US_PER_SECOND: f64 = 1.0e6;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UkfSnapshot {
    /// Position [m]
    pub position: (f64, f64),

    /// Speed along heading [m/s]
    pub speed: f64,

    /// Heading [rad], in (-π, π]
    pub yaw: f64,

    /// Turn rate [rad/s]
    pub yaw_rate: f64,

    /// Covariance trace for uncertainty
    pub covariance_trace: f64,

    /// Latest NIS per sensor
    pub nis_lidar: Option<f64>,
    pub nis_radar: Option<f64>,

    /// Update counters
    pub lidar_updates: u64,
    pub radar_updates: u64,
    pub skipped_updates: u64,
}

/// What a processed measurement did to the filter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// First measurement: belief set directly, no estimate produced
    Initialized,
    /// Prediction followed by a sensor update
    Updated(SensorKind),
    /// Prediction only; the sensor is disabled
    UpdateSkipped(SensorKind),
}

/// Mean, covariance and the sigma points predicted for them
#[derive(Clone, Debug)]
struct Belief {
    x: StateVec,
    p: StateMat,
    /// Present between a prediction and the update that consumes it
    sigma_pred: Option<SigmaPoints>,
}

/// Unscented Kalman filter over the CTRV motion model
pub struct Ukf {
    config: UkfConfig,
    weights: SigmaWeights,
    lidar: LidarModel,
    radar: RadarModel,

    belief: Option<Belief>,

    /// Timestamp of the last processed measurement [us]
    time_us: Option<u64>,

    nis_lidar: Option<f64>,
    nis_radar: Option<f64>,

    lidar_updates: u64,
    radar_updates: u64,
    skipped_updates: u64,
}

impl Ukf {
    /// Create a filter; the configuration is expected to be validated
    pub fn new(config: UkfConfig) -> Self {
        Self {
            weights: SigmaWeights::new(config.spreading),
            lidar: LidarModel::new(&config.lidar),
            radar: RadarModel::new(&config.radar),
            config,
            belief: None,
            time_us: None,
            nis_lidar: None,
            nis_radar: None,
            lidar_updates: 0,
            radar_updates: 0,
            skipped_updates: 0,
        }
    }

    pub fn config(&self) -> &UkfConfig {
        &self.config
    }

    pub fn weights(&self) -> &SigmaWeights {
        &self.weights
    }

    pub fn is_initialized(&self) -> bool {
        self.belief.is_some()
    }

    pub fn state(&self) -> Option<&StateVec> {
        self.belief.as_ref().map(|b| &b.x)
    }

    pub fn covariance(&self) -> Option<&StateMat> {
        self.belief.as_ref().map(|b| &b.p)
    }

    /// Sigma points from the latest prediction not yet consumed by an update
    pub fn predicted_sigma_points(&self) -> Option<&SigmaPoints> {
        self.belief.as_ref().and_then(|b| b.sigma_pred.as_ref())
    }

    pub fn timestamp(&self) -> Option<u64> {
        self.time_us
    }

    pub fn estimate(&self) -> Option<Estimate> {
        self.state().map(Estimate::from_state)
    }

    /// Latest NIS for a sensor kind, if it has been updated at least once
    pub fn nis(&self, kind: SensorKind) -> Option<f64> {
        match kind {
            SensorKind::Lidar => self.nis_lidar,
            SensorKind::Radar => self.nis_radar,
        }
    }

    pub fn get_state(&self) -> Option<UkfSnapshot> {
        let b = self.belief.as_ref()?;
        Some(UkfSnapshot {
            position: (b.x[0], b.x[1]),
            speed: b.x[2],
            yaw: b.x[YAW_INDEX],
            yaw_rate: b.x[4],
            covariance_trace: b.p.trace(),
            nis_lidar: self.nis_lidar,
            nis_radar: self.nis_radar,
            lidar_updates: self.lidar_updates,
            radar_updates: self.radar_updates,
            skipped_updates: self.skipped_updates,
        })
    }

    /// Run one measurement cycle: initialize, or predict to its timestamp then update
    ///
    /// The cycle is all-or-nothing: on error the filter is left exactly as before.
    pub fn process_measurement(&mut self, package: &MeasurementPackage) -> FilterResult<ProcessOutcome> {
        if !package.measurement.is_finite() {
            log::warn!(
                "[UKF] Rejecting non-finite {} measurement at {} us",
                package.kind(),
                package.timestamp
            );
            return Err(FilterError::NonFiniteMeasurement(package.kind()));
        }

        let Some(time_us) = self.time_us else {
            self.initialize(package);
            return Ok(ProcessOutcome::Initialized);
        };

        if package.timestamp < time_us {
            log::warn!(
                "[UKF] Rejecting {} measurement at {} us: filter clock is {} us",
                package.kind(),
                package.timestamp,
                time_us
            );
            return Err(FilterError::NonMonotonicTimestamp {
                previous: time_us,
                current: package.timestamp,
            });
        }
        let dt = (package.timestamp - time_us) as f64 / US_PER_SECOND;

        let mut next = self.belief.clone().ok_or(FilterError::NotInitialized)?;
        self.predict_belief(&mut next, dt)?;

        let kind = package.kind();
        let outcome = if self.sensor_enabled(kind) {
            let nis = match package.measurement {
                Measurement::Lidar { px, py } => {
                    self.update_belief(&self.lidar, &mut next, &LidarVec::new(px, py))?
                }
                Measurement::Radar { rho, phi, rho_dot } => {
                    self.update_belief(&self.radar, &mut next, &RadarVec::new(rho, phi, rho_dot))?
                }
            };
            self.record_update(kind, nis);
            ProcessOutcome::Updated(kind)
        } else {
            log::debug!("[UKF] {} disabled, prediction only (dt={:.4}s)", kind, dt);
            self.skipped_updates += 1;
            ProcessOutcome::UpdateSkipped(kind)
        };

        self.belief = Some(next);
        self.time_us = Some(package.timestamp);
        Ok(outcome)
    }

    /// Advance the belief by `dt` seconds and store the predicted sigma points
    pub fn predict(&mut self, dt: f64) -> FilterResult<()> {
        let mut next = self.belief.clone().ok_or(FilterError::NotInitialized)?;
        self.predict_belief(&mut next, dt)?;
        self.belief = Some(next);
        Ok(())
    }

    /// Correct the predicted belief with a lidar position; returns the NIS
    pub fn update_lidar(&mut self, z: &LidarVec) -> FilterResult<f64> {
        let mut next = self.belief.clone().ok_or(FilterError::NotInitialized)?;
        let nis = self.update_belief(&self.lidar, &mut next, z)?;
        self.belief = Some(next);
        self.record_update(SensorKind::Lidar, nis);
        Ok(nis)
    }

    /// Correct the predicted belief with a radar range/bearing/range-rate; returns the NIS
    pub fn update_radar(&mut self, z: &RadarVec) -> FilterResult<f64> {
        let mut next = self.belief.clone().ok_or(FilterError::NotInitialized)?;
        let nis = self.update_belief(&self.radar, &mut next, z)?;
        self.belief = Some(next);
        self.record_update(SensorKind::Radar, nis);
        Ok(nis)
    }

    fn sensor_enabled(&self, kind: SensorKind) -> bool {
        match kind {
            SensorKind::Lidar => self.config.lidar.enabled,
            SensorKind::Radar => self.config.radar.enabled,
        }
    }

    fn record_update(&mut self, kind: SensorKind, nis: f64) {
        match kind {
            SensorKind::Lidar => {
                self.nis_lidar = Some(nis);
                self.lidar_updates += 1;
            }
            SensorKind::Radar => {
                self.nis_radar = Some(nis);
                self.radar_updates += 1;
            }
        }
    }

    /// Set the belief directly from the first measurement
    fn initialize(&mut self, package: &MeasurementPackage) {
        let init = &self.config.initial;
        let mut p = StateMat::zeros();
        p[(2, 2)] = init.speed_variance;
        p[(3, 3)] = init.yaw_variance;
        p[(4, 4)] = init.yaw_rate_variance;

        let (px, py) = package.measurement.cartesian_position();
        match package.measurement {
            Measurement::Lidar { .. } => {
                let lidar = &self.config.lidar;
                p[(0, 0)] = lidar.std_px * lidar.std_px;
                p[(1, 1)] = lidar.std_py * lidar.std_py;
            }
            Measurement::Radar { rho, phi, .. } => {
                // Polar noise pushed through the polar-to-Cartesian Jacobian
                let radar = &self.config.radar;
                let (c, s) = (phi.cos(), phi.sin());
                let j = nalgebra::Matrix2::new(c, -rho * s, s, rho * c);
                let polar = nalgebra::Matrix2::new(
                    radar.std_rho * radar.std_rho,
                    0.0,
                    0.0,
                    radar.std_phi * radar.std_phi,
                );
                p.fixed_view_mut::<2, 2>(0, 0)
                    .copy_from(&(j * polar * j.transpose()));
            }
        }

        let x = StateVec::new(px, py, init.speed, 0.0, 0.0);
        log::info!(
            "[UKF] Initialized from {} at t={} us: position=({:.3}, {:.3})",
            package.kind(),
            package.timestamp,
            px,
            py
        );

        self.belief = Some(Belief {
            x,
            p,
            sigma_pred: None,
        });
        self.time_us = Some(package.timestamp);
    }

    fn predict_belief(&self, belief: &mut Belief, dt: f64) -> FilterResult<()> {
        if dt < 0.0 {
            return Err(FilterError::NegativeTimeStep(dt));
        }

        // 1. Augmented mean and covariance
        let noise = &self.config.process_noise;
        let (x_aug, p_aug) = sigma::augment(&belief.x, &belief.p, noise.std_a, noise.std_yawdd);

        // 2-3. Augmented sigma points
        let aug_sigmas = sigma::generate_augmented(&x_aug, &p_aug, &self.weights).map_err(|e| {
            log::error!("[UKF] Cholesky decomposition failed, filter has diverged");
            e
        })?;

        // 4. Propagate through the motion model
        let mut sigma_pred = SigmaPoints::zeros();
        for i in 0..SIGMA_COUNT {
            let predicted = ctrv::propagate(&aug_sigmas.column(i).into_owned(), dt);
            sigma_pred.set_column(i, &predicted);
        }

        // 5. Recombine; a zero interval leaves the moments as they are
        if dt > 0.0 {
            let (x_pred, p_pred) = sigma::recombine(&sigma_pred, &self.weights);
            belief.x = x_pred;
            belief.p = p_pred;
        }
        belief.sigma_pred = Some(sigma_pred);

        log::debug!(
            "[UKF] predict dt={:.4}s x={:?} trace(P)={:.4}",
            dt,
            belief.x.as_slice(),
            belief.p.trace()
        );
        Ok(())
    }

    fn update_belief<const M: usize, S: ObservationModel<M>>(
        &self,
        model: &S,
        belief: &mut Belief,
        z: &nalgebra::SVector<f64, M>,
    ) -> FilterResult<f64> {
        let sigmas = belief
            .sigma_pred
            .take()
            .ok_or(FilterError::UpdateWithoutPrediction)?;
        let outcome = unscented_update(model, &belief.x, &belief.p, &sigmas, &self.weights, z)
            .map_err(|e| {
                if e.is_numerical() {
                    log::error!("[UKF] {} update failed: {}", S::KIND, e);
                }
                e
            })?;
        belief.x = outcome.state;
        belief.p = outcome.covariance;
        Ok(outcome.nis)
    }
}

impl Default for Ukf {
    fn default() -> Self {
        Self::new(UkfConfig::default())
    }
}
