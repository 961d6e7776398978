//! Logistic regression — the bundled reference propensity learner.
//!
//! Wires an L2-penalized binomial log-likelihood to the crate's
//! [`LogLikelihood`] trait and fits it through [`maximize`] (L-BFGS with a
//! configurable line search). The intercept is unpenalized. All likelihood
//! terms use the overflow-safe formulation
//! `log(1 + e^η) = max(η, 0) + log1p(e^{-|η|})`, so extreme linear
//! predictors never produce non-finite costs.
use crate::learners::errors::{LearnerError, LearnerResult};
use crate::learners::traits::PropensityLearner;
use crate::optimization::{
    maximize, Cost, Grad, LogLikelihood, MleOptions, OptError, OptResult, Theta,
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Overflow-safe sigmoid `σ(η) = 1 / (1 + e^{-η})`.
///
/// Branches on the sign of `η` so the exponential argument is always
/// non-positive.
fn sigmoid(eta: f64) -> f64 {
    if eta >= 0.0 {
        1.0 / (1.0 + (-eta).exp())
    } else {
        let e = eta.exp();
        e / (1.0 + e)
    }
}

/// Overflow-safe `log(1 + e^η)`.
fn log1p_exp(eta: f64) -> f64 {
    eta.max(0.0) + (-eta.abs()).exp().ln_1p()
}

/// Training data handed to the penalized binomial likelihood: an
/// intercept-augmented design matrix and 0/1 targets as `f64`.
struct LogisticData {
    z: Array2<f64>,
    y: Array1<f64>,
}

/// Penalized binomial log-likelihood over `LogisticData`.
///
/// `ℓ(θ) = Σ_i [y_i η_i − log(1 + e^{η_i})] − (λ/2)·‖θ₁:‖²` with
/// `η = Z θ`; the intercept coordinate `θ₀` is excluded from the penalty.
struct LogisticLikelihood {
    penalty: f64,
}

impl LogLikelihood for LogisticLikelihood {
    type Data = LogisticData;

    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost> {
        let eta = data.z.dot(theta);
        let mut loglik = 0.0;
        for (&e, &y) in eta.iter().zip(data.y.iter()) {
            loglik += y * e - log1p_exp(e);
        }
        let mut penalty_term = 0.0;
        for &t in theta.iter().skip(1) {
            penalty_term += t * t;
        }
        Ok(loglik - 0.5 * self.penalty * penalty_term)
    }

    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()> {
        if theta.len() != data.z.ncols() {
            return Err(OptError::ThetaLengthMismatch {
                expected: data.z.ncols(),
                actual: theta.len(),
            });
        }
        for (index, &value) in theta.iter().enumerate() {
            if !value.is_finite() {
                return Err(OptError::InvalidThetaInput { index, value });
            }
        }
        Ok(())
    }

    /// Analytic gradient `Zᵀ (y − σ(Zθ)) − λ·θ₁:`.
    fn grad(&self, theta: &Theta, data: &Self::Data) -> OptResult<Grad> {
        let eta = data.z.dot(theta);
        let residual = eta.mapv(sigmoid);
        let residual = &data.y - &residual;
        let mut grad = data.z.t().dot(&residual);
        for (j, slot) in grad.iter_mut().enumerate() {
            if j > 0 {
                *slot -= self.penalty * theta[j];
            }
        }
        Ok(grad)
    }
}

/// L2-penalized logistic regression fit by L-BFGS.
///
/// `fit` retrains from scratch (zero-initialized coefficients) on every
/// call; `predict_proba` returns `σ(Zθ̂)`. Deterministic given the data, so
/// cross-fitted pipelines reproduce exactly under a fixed seed.
#[derive(Debug)]
pub struct LogisticRegression {
    penalty: f64,
    options: MleOptions,
    coef: Option<Array1<f64>>,
}

impl LogisticRegression {
    /// Construct with penalty `λ ≥ 0` and default optimizer options.
    ///
    /// # Errors
    /// [`LearnerError::InvalidPenalty`] when `λ` is negative or non-finite.
    pub fn new(penalty: f64) -> LearnerResult<Self> {
        Self::with_options(penalty, MleOptions::default())
    }

    /// Construct with explicit optimizer options (tolerances, line search).
    pub fn with_options(penalty: f64, options: MleOptions) -> LearnerResult<Self> {
        if !penalty.is_finite() || penalty < 0.0 {
            return Err(LearnerError::InvalidPenalty { value: penalty });
        }
        Ok(Self { penalty, options, coef: None })
    }

    /// Fitted coefficients (intercept first), if the model has been fitted.
    pub fn coefficients(&self) -> Option<&Array1<f64>> {
        self.coef.as_ref()
    }

    fn augment(x: ArrayView2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let p = x.ncols();
        let mut z = Array2::<f64>::ones((n, p + 1));
        z.slice_mut(ndarray::s![.., 1..]).assign(&x);
        z
    }
}

impl PropensityLearner for LogisticRegression {
    fn fit(&mut self, x: ArrayView2<f64>, labels: ArrayView1<u8>) -> LearnerResult<()> {
        let n = x.nrows();
        if n == 0 {
            return Err(LearnerError::EmptyTrainingSet);
        }
        if labels.len() != n {
            return Err(LearnerError::TargetLengthMismatch { expected: n, actual: labels.len() });
        }
        let data = LogisticData {
            z: Self::augment(x),
            y: labels.mapv(|l| if l == 0 { 0.0 } else { 1.0 }),
        };
        let likelihood = LogisticLikelihood { penalty: self.penalty };
        let theta0 = Theta::zeros(data.z.ncols());
        let outcome = maximize(&likelihood, theta0, &data, &self.options)?;
        self.coef = Some(outcome.theta_hat);
        Ok(())
    }

    fn predict_proba(&self, x: ArrayView2<f64>) -> LearnerResult<Array1<f64>> {
        let coef = self.coef.as_ref().ok_or(LearnerError::NotFitted)?;
        if x.ncols() + 1 != coef.len() {
            return Err(LearnerError::FeatureDimMismatch {
                expected: coef.len() - 1,
                actual: x.ncols(),
            });
        }
        let eta = Self::augment(x).dot(coef);
        Ok(eta.mapv(sigmoid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use ndarray::Array2;

    #[test]
    // Purpose
    // -------
    // Spot-check the overflow-safe primitives at extreme arguments.
    //
    // Expect
    // ------
    // - σ(0) = 0.5; σ(±40) saturates to {1, 0} without NaN.
    // - log(1 + e^η) stays finite at η = ±750 where a naive exp overflows.
    fn sigmoid_and_log1p_exp_are_overflow_safe() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!((sigmoid(40.0) - 1.0).abs() < 1e-12);
        assert!(sigmoid(-40.0) < 1e-12);
        assert!(log1p_exp(750.0).is_finite());
        assert!((log1p_exp(750.0) - 750.0).abs() < 1e-9);
        assert!(log1p_exp(-750.0).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // On linearly separated data with a ridge penalty the fitted
    // probabilities must order correctly and stay strictly inside (0, 1).
    //
    // Given
    // -----
    // - One feature; labels 1 iff x > 0; λ = 0.1 keeps the separation from
    //   diverging.
    //
    // Expect
    // ------
    // - p(x = 3) > 0.5 > p(x = −3) and all probabilities are in (0, 1).
    fn logistic_orders_probabilities_on_separated_data() {
        let x = array![[-3.0], [-2.0], [-1.0], [1.0], [2.0], [3.0]];
        let labels = array![0u8, 0, 0, 1, 1, 1];
        let mut model = LogisticRegression::new(0.1).unwrap();
        model.fit(x.view(), labels.view()).unwrap();

        let probs = model.predict_proba(x.view()).unwrap();
        assert!(probs.iter().all(|&p| p > 0.0 && p < 1.0));
        assert!(probs[0] < 0.5 && probs[5] > 0.5);
        assert!(probs[0] < probs[1] && probs[4] < probs[5]);
    }

    #[test]
    // Purpose
    // -------
    // With an intercept-only model (all features zero), the fitted
    // probability must approach the empirical label frequency.
    //
    // Given
    // -----
    // - 10 units, 3 of them labeled 1, no informative features.
    //
    // Expect
    // ------
    // - Every predicted probability ≈ 0.3.
    fn logistic_intercept_matches_label_frequency() {
        let x = Array2::<f64>::zeros((10, 1));
        let labels = array![1u8, 1, 1, 0, 0, 0, 0, 0, 0, 0];
        let mut model = LogisticRegression::new(0.0).unwrap();
        model.fit(x.view(), labels.view()).unwrap();
        let probs = model.predict_proba(x.view()).unwrap();
        for &p in probs.iter() {
            assert!((p - 0.3).abs() < 1e-4, "expected ~0.3, got {p}");
        }
    }

    #[test]
    // Purpose
    // -------
    // Contract checks mirroring the ridge learner's.
    fn logistic_rejects_contract_violations() {
        assert!(matches!(
            LogisticRegression::new(f64::INFINITY).unwrap_err(),
            LearnerError::InvalidPenalty { .. }
        ));

        let mut model = LogisticRegression::new(1.0).unwrap();
        let x = array![[1.0], [2.0]];
        assert_eq!(model.predict_proba(x.view()).unwrap_err(), LearnerError::NotFitted);
        assert!(matches!(
            model.fit(x.view(), array![1u8].view()).unwrap_err(),
            LearnerError::TargetLengthMismatch { expected: 2, actual: 1 }
        ));
    }
}
