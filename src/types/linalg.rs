//! Linear algebra type system for the CTRV filter
//!
//! Provides compile-time dimension checking and clean type aliases
//! for the unscented filter and its observation models.

use nalgebra::{SMatrix, SVector};

// ===== State Dimensions =====
pub const STATE_DIM: usize = 5; // [px, py, v, yaw, yaw_rate]
pub const AUG_DIM: usize = 7; // state + (nu_a, nu_yawdd)

/// Index of the heading component inside the state vector
pub const YAW_INDEX: usize = 3;

// ===== Measurement Dimensions =====
pub const MEASURE_DIM_LIDAR: usize = 2; // (px, py)
pub const MEASURE_DIM_RADAR: usize = 3; // (rho, phi, rho_dot)

/// Index of the bearing component inside a radar measurement
pub const BEARING_INDEX: usize = 1;

// ===== State Types =====
pub type StateVec = SVector<f64, STATE_DIM>;
pub type StateMat = SMatrix<f64, STATE_DIM, STATE_DIM>;

pub type AugStateVec = SVector<f64, AUG_DIM>;
pub type AugStateMat = SMatrix<f64, AUG_DIM, AUG_DIM>;

// ===== Sigma Point Types =====
pub const SIGMA_COUNT: usize = 2 * AUG_DIM + 1; // 15
pub type AugSigmaPoints = SMatrix<f64, AUG_DIM, SIGMA_COUNT>; // 7×15
pub type SigmaPoints = SMatrix<f64, STATE_DIM, SIGMA_COUNT>; // 5×15
pub type SigmaWeightVec = SVector<f64, SIGMA_COUNT>;

// ===== Measurement Types =====
pub type LidarVec = SVector<f64, MEASURE_DIM_LIDAR>;
pub type LidarNoise = SMatrix<f64, MEASURE_DIM_LIDAR, MEASURE_DIM_LIDAR>;
pub type RadarVec = SVector<f64, MEASURE_DIM_RADAR>;
pub type RadarNoise = SMatrix<f64, MEASURE_DIM_RADAR, MEASURE_DIM_RADAR>;

/// Cartesian accuracy vector `[px, py, vx, vy]` used for estimates and RMSE
pub type KinematicVec = SVector<f64, 4>;
