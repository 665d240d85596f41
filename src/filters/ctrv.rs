/// Constant Turn Rate and Velocity (CTRV) motion model
///
/// State: [px, py, v, yaw, yaw_rate]
/// Augmented with zero-mean longitudinal acceleration noise (nu_a) and
/// yaw acceleration noise (nu_yawdd) for sigma point propagation.
use crate::types::{AugStateVec, StateVec, STATE_DIM};

/// Below this yaw rate magnitude the straight-line limit is used [rad/s]
pub const YAW_RATE_EPSILON: f64 = 1e-3;

/// Propagate one augmented point over `dt` seconds
pub fn propagate(point: &AugStateVec, dt: f64) -> StateVec {
    let px = point[0];
    let py = point[1];
    let v = point[2];
    let yaw = point[3];
    let yawd = point[4];
    let nu_a = point[5];
    let nu_yawdd = point[6];

    let (mut px_p, mut py_p) = if yawd.abs() > YAW_RATE_EPSILON {
        let yaw_end = yaw + yawd * dt;
        (
            px + v / yawd * (yaw_end.sin() - yaw.sin()),
            py + v / yawd * (yaw.cos() - yaw_end.cos()),
        )
    } else {
        (px + v * dt * yaw.cos(), py + v * dt * yaw.sin())
    };

    let mut v_p = v;
    let mut yaw_p = yaw + yawd * dt;
    let mut yawd_p = yawd;

    // Process noise contribution
    let half_dt2 = 0.5 * dt * dt;
    px_p += half_dt2 * nu_a * yaw.cos();
    py_p += half_dt2 * nu_a * yaw.sin();
    v_p += nu_a * dt;
    yaw_p += half_dt2 * nu_yawdd;
    yawd_p += nu_yawdd * dt;

    StateVec::new(px_p, py_p, v_p, yaw_p, yawd_p)
}

/// State extended with fixed noise samples `(nu_a, nu_yawdd)`
pub fn augmented_point(state: &StateVec, nu_a: f64, nu_yawdd: f64) -> AugStateVec {
    let mut point = AugStateVec::zeros();
    point.fixed_rows_mut::<STATE_DIM>(0).copy_from(state);
    point[STATE_DIM] = nu_a;
    point[STATE_DIM + 1] = nu_yawdd;
    point
}

/// Noise-free propagation of a plain state
pub fn propagate_state(state: &StateVec, dt: f64) -> StateVec {
    propagate(&augmented_point(state, 0.0, 0.0), dt)
}
