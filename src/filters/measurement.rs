//! Sensor observation models and the shared unscented measurement update.

use nalgebra::{SMatrix, SVector};

use crate::config::{LidarConfig, RadarConfig};
use crate::error::FilterError;
use crate::filters::sigma::{state_residual, SigmaWeights};
use crate::geometry::normalize_angle;
use crate::types::{
    LidarNoise, RadarNoise, SensorKind, SigmaPoints, StateMat, StateVec, BEARING_INDEX,
    MEASURE_DIM_LIDAR, MEASURE_DIM_RADAR, SIGMA_COUNT, STATE_DIM, YAW_INDEX,
};

/// Radar ranges below this are treated as coincident with the sensor [m]
pub const MIN_RADAR_RANGE: f64 = 1e-4;

/// Maps a CTRV state into one sensor's measurement space
pub trait ObservationModel<const M: usize> {
    const KIND: SensorKind;

    fn observe(&self, x: &StateVec) -> Result<SVector<f64, M>, FilterError>;

    /// Measurement-space difference; angular components must be normalized
    fn residual(&self, a: &SVector<f64, M>, b: &SVector<f64, M>) -> SVector<f64, M> {
        a - b
    }

    fn noise(&self) -> SMatrix<f64, M, M>;
}

/// Linear lidar model observing position directly
#[derive(Clone, Debug)]
pub struct LidarModel {
    noise: LidarNoise,
}

impl LidarModel {
    pub fn new(config: &LidarConfig) -> Self {
        Self {
            noise: config.noise_covariance(),
        }
    }
}

impl ObservationModel<MEASURE_DIM_LIDAR> for LidarModel {
    const KIND: SensorKind = SensorKind::Lidar;

    fn observe(&self, x: &StateVec) -> Result<SVector<f64, MEASURE_DIM_LIDAR>, FilterError> {
        Ok(SVector::<f64, MEASURE_DIM_LIDAR>::new(x[0], x[1]))
    }

    fn noise(&self) -> LidarNoise {
        self.noise
    }
}

/// Polar radar model: range, bearing, range rate
#[derive(Clone, Debug)]
pub struct RadarModel {
    noise: RadarNoise,
}

impl RadarModel {
    pub fn new(config: &RadarConfig) -> Self {
        Self {
            noise: config.noise_covariance(),
        }
    }
}

impl ObservationModel<MEASURE_DIM_RADAR> for RadarModel {
    const KIND: SensorKind = SensorKind::Radar;

    fn observe(&self, x: &StateVec) -> Result<SVector<f64, MEASURE_DIM_RADAR>, FilterError> {
        let px = x[0];
        let py = x[1];
        let v = x[2];
        let yaw = x[YAW_INDEX];

        let rho = (px * px + py * py).sqrt();
        if rho < MIN_RADAR_RANGE {
            return Err(FilterError::DegenerateRadarRange(rho));
        }
        let phi = py.atan2(px);
        let rho_dot = (px * v * yaw.cos() + py * v * yaw.sin()) / rho;

        Ok(SVector::<f64, MEASURE_DIM_RADAR>::new(rho, phi, rho_dot))
    }

    fn residual(
        &self,
        a: &SVector<f64, MEASURE_DIM_RADAR>,
        b: &SVector<f64, MEASURE_DIM_RADAR>,
    ) -> SVector<f64, MEASURE_DIM_RADAR> {
        let mut r = a - b;
        r[BEARING_INDEX] = normalize_angle(r[BEARING_INDEX]);
        r
    }

    fn noise(&self) -> RadarNoise {
        self.noise
    }
}

/// Corrected belief and diagnostics of one measurement update
#[derive(Clone, Debug)]
pub struct UpdateOutcome {
    pub state: StateVec,
    pub covariance: StateMat,
    pub nis: f64,
}

/// Unscented measurement update against predicted sigma points
///
/// Pure function: the caller decides whether to commit the outcome.
pub fn unscented_update<const M: usize, S: ObservationModel<M>>(
    model: &S,
    x: &StateVec,
    p: &StateMat,
    sigmas: &SigmaPoints,
    weights: &SigmaWeights,
    z: &SVector<f64, M>,
) -> Result<UpdateOutcome, FilterError> {
    // 1. Sigma points in measurement space
    let mut z_sigmas = SMatrix::<f64, M, SIGMA_COUNT>::zeros();
    for i in 0..SIGMA_COUNT {
        let z_i = model.observe(&sigmas.column(i).into_owned())?;
        z_sigmas.set_column(i, &z_i);
    }

    // 2. Predicted measurement mean
    let mut z_pred = SVector::<f64, M>::zeros();
    for i in 0..SIGMA_COUNT {
        z_pred += z_sigmas.column(i) * weights.get(i);
    }

    // 3-4. Innovation covariance and cross-correlation
    let mut s = SMatrix::<f64, M, M>::zeros();
    let mut t = SMatrix::<f64, STATE_DIM, M>::zeros();
    for i in 0..SIGMA_COUNT {
        let w = weights.get(i);
        let z_diff = model.residual(&z_sigmas.column(i).into_owned(), &z_pred);
        let x_diff = state_residual(&sigmas.column(i).into_owned(), x);
        s += z_diff * z_diff.transpose() * w;
        t += x_diff * z_diff.transpose() * w;
    }
    s += model.noise();

    // 5. Kalman gain
    let s_inv = s
        .try_inverse()
        .ok_or(FilterError::SingularInnovation(S::KIND))?;
    let k = t * s_inv;

    // 6. Innovation
    let innovation = model.residual(z, &z_pred);

    // 7. Corrected belief
    let mut state = x + k * innovation;
    state[YAW_INDEX] = normalize_angle(state[YAW_INDEX]);
    let covariance = p - k * s * k.transpose();
    let covariance = (covariance + covariance.transpose()) * 0.5;

    // 8. Normalized innovation squared
    let nis = (innovation.transpose() * s_inv * innovation)[(0, 0)];

    log::debug!(
        "[UKF] {} update: innovation={:?} nis={:.3}",
        S::KIND,
        innovation.as_slice(),
        nis
    );

    Ok(UpdateOutcome {
        state,
        covariance,
        nis,
    })
}
