//! Sigma point generation and recombination for the augmented CTRV state.

use crate::error::FilterError;
use crate::geometry::normalize_angle;
use crate::types::{
    AugSigmaPoints, AugStateMat, AugStateVec, SigmaPoints, SigmaWeightVec, StateMat, StateVec,
    AUG_DIM, SIGMA_COUNT, STATE_DIM, YAW_INDEX,
};

/// Unscented transform weights, fixed for the lifetime of a filter
#[derive(Clone, Debug, PartialEq)]
pub struct SigmaWeights {
    /// Spreading parameter (lambda)
    lambda: f64,
    weights: SigmaWeightVec,
}

impl SigmaWeights {
    pub fn new(lambda: f64) -> Self {
        let denom = lambda + AUG_DIM as f64;
        let mut weights = SigmaWeightVec::from_element(0.5 / denom);
        weights[0] = lambda / denom;
        Self { lambda, weights }
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Scale applied to the square-root factor columns
    pub fn spread(&self) -> f64 {
        (self.lambda + AUG_DIM as f64).sqrt()
    }

    pub fn as_vector(&self) -> &SigmaWeightVec {
        &self.weights
    }

    pub fn get(&self, i: usize) -> f64 {
        self.weights[i]
    }
}

/// Build the augmented mean and covariance for one prediction cycle
pub fn augment(x: &StateVec, p: &StateMat, std_a: f64, std_yawdd: f64) -> (AugStateVec, AugStateMat) {
    let mut x_aug = AugStateVec::zeros();
    x_aug.fixed_rows_mut::<STATE_DIM>(0).copy_from(x);

    let mut p_aug = AugStateMat::zeros();
    p_aug
        .fixed_view_mut::<STATE_DIM, STATE_DIM>(0, 0)
        .copy_from(p);
    p_aug[(STATE_DIM, STATE_DIM)] = std_a * std_a;
    p_aug[(STATE_DIM + 1, STATE_DIM + 1)] = std_yawdd * std_yawdd;

    (x_aug, p_aug)
}

/// Generate the 2·n_aug+1 augmented sigma points
///
/// Column 0 is the mean; columns 1..=n and n+1..=2n are the mean plus and minus
/// the scaled columns of the lower Cholesky factor.
pub fn generate_augmented(
    x_aug: &AugStateVec,
    p_aug: &AugStateMat,
    weights: &SigmaWeights,
) -> Result<AugSigmaPoints, FilterError> {
    let l_mat = p_aug
        .cholesky()
        .ok_or(FilterError::CovarianceNotPositiveDefinite)?
        .l();
    let spread = weights.spread();

    let mut sigmas = AugSigmaPoints::zeros();
    sigmas.set_column(0, x_aug);
    for i in 0..AUG_DIM {
        let offset = l_mat.column(i) * spread;
        sigmas.set_column(i + 1, &(x_aug + &offset));
        sigmas.set_column(i + 1 + AUG_DIM, &(x_aug - &offset));
    }

    Ok(sigmas)
}

/// Weighted mean and covariance of propagated sigma points (yaw-wrap safe)
pub fn recombine(sigmas: &SigmaPoints, weights: &SigmaWeights) -> (StateVec, StateMat) {
    let mut x = StateVec::zeros();
    for i in 0..SIGMA_COUNT {
        x += sigmas.column(i) * weights.get(i);
    }
    x[YAW_INDEX] = normalize_angle(x[YAW_INDEX]);

    let mut p = StateMat::zeros();
    for i in 0..SIGMA_COUNT {
        let residual = state_residual(&sigmas.column(i).into_owned(), &x);
        p += residual * residual.transpose() * weights.get(i);
    }

    (x, p)
}

/// Difference between a sigma point and the state mean with yaw normalized
pub fn state_residual(point: &StateVec, mean: &StateVec) -> StateVec {
    let mut residual = point - mean;
    residual[YAW_INDEX] = normalize_angle(residual[YAW_INDEX]);
    residual
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn weights() -> SigmaWeights {
        SigmaWeights::new(3.0 - AUG_DIM as f64)
    }

    #[test]
    fn test_weights_sum_to_one() {
        let w = weights();
        assert_abs_diff_eq!(w.as_vector().sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_weight_values() {
        let w = weights();
        let lambda = w.lambda();
        assert_abs_diff_eq!(w.get(0), lambda / (lambda + AUG_DIM as f64), epsilon = 1e-15);
        for i in 1..SIGMA_COUNT {
            assert_abs_diff_eq!(w.get(i), 0.5 / (lambda + AUG_DIM as f64), epsilon = 1e-15);
        }
    }

    #[test]
    fn test_augment_layout() {
        let x = StateVec::new(1.0, 2.0, 3.0, 0.1, 0.2);
        let p = StateMat::identity() * 2.0;
        let (x_aug, p_aug) = augment(&x, &p, 0.5, 0.3);
        assert_eq!(x_aug[5], 0.0);
        assert_eq!(x_aug[6], 0.0);
        assert_eq!(x_aug[2], 3.0);
        assert_abs_diff_eq!(p_aug[(5, 5)], 0.25, epsilon = 1e-15);
        assert_abs_diff_eq!(p_aug[(6, 6)], 0.09, epsilon = 1e-15);
        assert_eq!(p_aug[(0, 5)], 0.0);
        assert_eq!(p_aug[(4, 4)], 2.0);
    }

    #[test]
    fn test_sigma_points_symmetric_about_mean() {
        let x = StateVec::new(5.7441, 1.3800, 2.2049, 0.5015, 0.3528);
        let mut p = StateMat::identity() * 0.01;
        p[(0, 1)] = -0.0013;
        p[(1, 0)] = -0.0013;
        let (x_aug, p_aug) = augment(&x, &p, 0.2, 0.2);
        let w = weights();
        let sigmas = generate_augmented(&x_aug, &p_aug, &w).unwrap();

        assert_abs_diff_eq!(sigmas.column(0).into_owned(), x_aug, epsilon = 1e-15);
        for i in 0..AUG_DIM {
            let mid = (sigmas.column(i + 1) + sigmas.column(i + 1 + AUG_DIM)) * 0.5;
            assert_abs_diff_eq!(mid, x_aug, epsilon = 1e-12);
        }
        // Noise components spread by sqrt(lambda + n_aug) * std
        assert_abs_diff_eq!(sigmas[(5, 6)], w.spread() * 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_not_positive_definite() {
        let x = StateVec::zeros();
        let mut p = StateMat::identity();
        p[(2, 2)] = -1.0;
        let (x_aug, p_aug) = augment(&x, &p, 0.2, 0.2);
        assert_eq!(
            generate_augmented(&x_aug, &p_aug, &weights()),
            Err(FilterError::CovarianceNotPositiveDefinite)
        );
    }

    #[test]
    fn test_recombine_reproduces_moments() {
        let x = StateVec::new(1.0, 2.0, 3.0, 0.4, 0.05);
        let mut p = StateMat::identity() * 0.2;
        p[(0, 2)] = 0.05;
        p[(2, 0)] = 0.05;
        let (x_aug, p_aug) = augment(&x, &p, 0.2, 0.2);
        let w = weights();
        let aug = generate_augmented(&x_aug, &p_aug, &w).unwrap();
        let sigmas: SigmaPoints = aug.fixed_rows::<STATE_DIM>(0).into_owned();

        let (x_r, p_r) = recombine(&sigmas, &w);
        assert_abs_diff_eq!(x_r, x, epsilon = 1e-10);
        assert_abs_diff_eq!(p_r, p, epsilon = 1e-10);
    }

    #[test]
    fn test_state_residual_wraps_yaw() {
        let a = StateVec::new(0.0, 0.0, 0.0, 3.0, 0.0);
        let b = StateVec::new(0.0, 0.0, 0.0, -3.0, 0.0);
        let r = state_residual(&a, &b);
        assert_abs_diff_eq!(r[YAW_INDEX], 6.0 - 2.0 * std::f64::consts::PI, epsilon = 1e-12);
    }
}
