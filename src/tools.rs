use ndarray::{Array2, Axis};
use thiserror::Error;

use crate::types::KinematicVec;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RmseError {
    #[error("no estimations provided")]
    Empty,

    #[error("estimation count {estimations} does not match ground truth count {ground_truth}")]
    LengthMismatch {
        estimations: usize,
        ground_truth: usize,
    },
}

/// Root-mean-square error per component of `[px, py, vx, vy]`
pub fn try_calculate_rmse(
    estimations: &[KinematicVec],
    ground_truth: &[KinematicVec],
) -> Result<KinematicVec, RmseError> {
    if estimations.len() != ground_truth.len() {
        return Err(RmseError::LengthMismatch {
            estimations: estimations.len(),
            ground_truth: ground_truth.len(),
        });
    }
    if estimations.is_empty() {
        return Err(RmseError::Empty);
    }

    // One row of residuals per sample
    let residuals = Array2::from_shape_fn((estimations.len(), 4), |(i, j)| {
        estimations[i][j] - ground_truth[i][j]
    });

    let mean_sq = residuals
        .mapv(|e| e * e)
        .mean_axis(Axis(0))
        .ok_or(RmseError::Empty)?;

    Ok(KinematicVec::from_iterator(mean_sq.iter().map(|m| m.sqrt())))
}

/// RMSE that degrades to a zero vector on invalid input
///
/// The failure is logged rather than returned; use `try_calculate_rmse`
/// to inspect it.
pub fn calculate_rmse(estimations: &[KinematicVec], ground_truth: &[KinematicVec]) -> KinematicVec {
    try_calculate_rmse(estimations, ground_truth).unwrap_or_else(|e| {
        log::error!("Invalid RMSE input: {}", e);
        KinematicVec::zeros()
    })
}
