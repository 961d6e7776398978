//! Ridge regression — the bundled reference outcome learner.
//!
//! Solves the penalized normal equations `(Zᵀ Z + λ I*) β = Zᵀ y` with an
//! intercept column prepended to the design matrix and the intercept left
//! unpenalized (`I*` has a zero in the intercept slot). The Gram matrix is
//! built in `ndarray`, copied into a `nalgebra::DMatrix`, and solved through
//! a Cholesky factorization; no explicit inverse is ever formed.
use crate::learners::errors::{LearnerError, LearnerResult};
use crate::learners::traits::OutcomeLearner;
use nalgebra::{Cholesky, DMatrix, DVector};
use ndarray::{Array1, ArrayView1, ArrayView2};

/// L2-penalized linear regression with an unpenalized intercept.
///
/// `fit` retrains from scratch on every call; the coefficient vector's
/// length follows the training feature count, so the same instance can be
/// reused across nuisance stages with different feature sets.
#[derive(Debug, Clone)]
pub struct RidgeRegressor {
    penalty: f64,
    /// Fitted coefficients, intercept first (populated after `fit`).
    coef: Option<Array1<f64>>,
}

impl RidgeRegressor {
    /// Construct a ridge regressor with penalty `λ ≥ 0`.
    ///
    /// # Errors
    /// [`LearnerError::InvalidPenalty`] when `λ` is negative or non-finite.
    pub fn new(penalty: f64) -> LearnerResult<Self> {
        if !penalty.is_finite() || penalty < 0.0 {
            return Err(LearnerError::InvalidPenalty { value: penalty });
        }
        Ok(Self { penalty, coef: None })
    }

    /// Fitted coefficients (intercept first), if the model has been fitted.
    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coef.as_ref()
    }
}

impl OutcomeLearner for RidgeRegressor {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> LearnerResult<()> {
        let n = x.nrows();
        let p = x.ncols();
        if n == 0 {
            return Err(LearnerError::EmptyTrainingSet);
        }
        if y.len() != n {
            return Err(LearnerError::TargetLengthMismatch { expected: n, actual: y.len() });
        }

        // Gram matrix and right-hand side over the intercept-augmented
        // design Z = [1 | x], accumulated without materializing Z.
        let dim = p + 1;
        let mut gram = DMatrix::<f64>::zeros(dim, dim);
        let mut rhs = DVector::<f64>::zeros(dim);
        for (row, &target) in x.outer_iter().zip(y.iter()) {
            gram[(0, 0)] += 1.0;
            rhs[0] += target;
            for (j, &zj) in row.iter().enumerate() {
                gram[(0, j + 1)] += zj;
                gram[(j + 1, 0)] += zj;
                rhs[j + 1] += zj * target;
                for (k, &zk) in row.iter().enumerate() {
                    gram[(j + 1, k + 1)] += zj * zk;
                }
            }
        }
        // Penalty on the slope block only.
        for j in 1..dim {
            gram[(j, j)] += self.penalty;
        }

        let chol = Cholesky::new(gram).ok_or(LearnerError::SingularSystem {
            detail: "Cholesky factorization failed",
        })?;
        let beta = chol.solve(&rhs);
        let mut coef = Array1::<f64>::zeros(dim);
        for (slot, &value) in coef.iter_mut().zip(beta.iter()) {
            if !value.is_finite() {
                return Err(LearnerError::SingularSystem {
                    detail: "solution contains non-finite coefficients",
                });
            }
            *slot = value;
        }
        self.coef = Some(coef);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> LearnerResult<Array1<f64>> {
        let coef = self.coef.as_ref().ok_or(LearnerError::NotFitted)?;
        if x.ncols() + 1 != coef.len() {
            return Err(LearnerError::FeatureDimMismatch {
                expected: coef.len() - 1,
                actual: x.ncols(),
            });
        }
        let mut preds = Array1::<f64>::zeros(x.nrows());
        for (i, row) in x.outer_iter().enumerate() {
            let mut acc = coef[0];
            for (j, &zj) in row.iter().enumerate() {
                acc += coef[j + 1] * zj;
            }
            if !acc.is_finite() {
                return Err(LearnerError::NonFinitePrediction { index: i, value: acc });
            }
            preds[i] = acc;
        }
        Ok(preds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    // Purpose
    // -------
    // With zero penalty and an exactly linear target, ridge must recover the
    // generating coefficients.
    //
    // Given
    // -----
    // - y = 2 + 3·x₀ − x₁ over a small non-degenerate design.
    //
    // Expect
    // ------
    // - Coefficients ≈ [2, 3, −1] and exact in-sample predictions.
    fn ridge_recovers_exact_linear_relationship() {
        let x = array![
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
            [1.0, 1.0],
            [2.0, -1.0],
            [0.5, 2.0],
        ];
        let y = x.outer_iter().map(|r| 2.0 + 3.0 * r[0] - r[1]).collect::<Array1<f64>>();

        let mut model = RidgeRegressor::new(0.0).unwrap();
        model.fit(x.view(), y.view()).unwrap();

        let coef = model.coefficients().unwrap();
        assert!((coef[0] - 2.0).abs() < 1e-8);
        assert!((coef[1] - 3.0).abs() < 1e-8);
        assert!((coef[2] + 1.0).abs() < 1e-8);

        let preds = model.predict(x.view()).unwrap();
        for (pred, want) in preds.iter().zip(y.iter()) {
            assert!((pred - want).abs() < 1e-8);
        }
    }

    #[test]
    // Purpose
    // -------
    // The penalty must shrink slope coefficients toward zero but leave the
    // intercept unpenalized.
    //
    // Given
    // -----
    // - The same linear data fitted with λ = 0 and λ = 100.
    //
    // Expect
    // ------
    // - |slope(λ=100)| < |slope(λ=0)| for both slopes.
    fn ridge_penalty_shrinks_slopes_only() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0]];
        let y = array![1.0, 3.0, 5.0, 7.0, 9.0];

        let mut flat = RidgeRegressor::new(0.0).unwrap();
        flat.fit(x.view(), y.view()).unwrap();
        let mut shrunk = RidgeRegressor::new(100.0).unwrap();
        shrunk.fit(x.view(), y.view()).unwrap();

        let slope_flat = flat.coefficients().unwrap()[1];
        let slope_shrunk = shrunk.coefficients().unwrap()[1];
        assert!(slope_shrunk.abs() < slope_flat.abs());
    }

    #[test]
    // Purpose
    // -------
    // Contract checks: invalid penalty, empty training set, target length
    // mismatch, predict-before-fit, and feature-dimension mismatch.
    fn ridge_rejects_contract_violations() {
        assert!(matches!(
            RidgeRegressor::new(-1.0).unwrap_err(),
            LearnerError::InvalidPenalty { .. }
        ));

        let mut model = RidgeRegressor::new(1.0).unwrap();
        let empty = Array2::<f64>::zeros((0, 2));
        assert_eq!(
            model.fit(empty.view(), Array1::zeros(0).view()).unwrap_err(),
            LearnerError::EmptyTrainingSet
        );

        let x = array![[1.0], [2.0]];
        let y = array![1.0];
        assert!(matches!(
            model.fit(x.view(), y.view()).unwrap_err(),
            LearnerError::TargetLengthMismatch { expected: 2, actual: 1 }
        ));

        assert_eq!(model.predict(x.view()).unwrap_err(), LearnerError::NotFitted);

        let y_ok = array![1.0, 2.0];
        model.fit(x.view(), y_ok.view()).unwrap();
        let wide = Array2::<f64>::zeros((2, 3));
        assert!(matches!(
            model.predict(wide.view()).unwrap_err(),
            LearnerError::FeatureDimMismatch { expected: 1, actual: 3 }
        ));
    }
}
