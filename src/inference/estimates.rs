//! inference::estimates — point estimates, variances, and normal CIs.
//!
//! Purpose
//! -------
//! Aggregate per-unit doubly-robust scores into estimator-level quantities.
//! Scores are influence-function representations of the estimators, so the
//! APO variance is the sample variance of the scores divided by n, and the
//! ATE variance subtracts twice the paired-score covariance:
//!
//! ```text
//! Var(APO)  = s²(ψ) / n
//! Var(ATE)  = [s²(ψ₁) + s²(ψ₂) − 2·cov(ψ₁, ψ₂)] / n
//! ```
//!
//! Ignoring the covariance would overstate the ATE's variance whenever the
//! two sequences were fit on shared folds, which is exactly the situation
//! the shared fold assignment guarantees.
//!
//! Conventions
//! -----------
//! - Sample moments use the n−1 denominator; the estimator variance then
//!   divides by n.
//! - Confidence intervals are symmetric normal intervals at the configured
//!   level, with the quantile taken from `statrs`.
use crate::dml::errors::{DmlError, DmlResult};
use ndarray::ArrayView1;
use statrs::distribution::{ContinuousCDF, Normal};

/// Two-sided standard-normal quantile for a confidence level in (0, 1):
/// `z = Φ⁻¹((1 + level) / 2)`.
pub fn normal_quantile(confidence_level: f64) -> DmlResult<f64> {
    if !confidence_level.is_finite() || confidence_level <= 0.0 || confidence_level >= 1.0 {
        return Err(DmlError::InvalidConfidenceLevel { value: confidence_level });
    }
    let standard_normal = Normal::new(0.0, 1.0)
        .expect("standard normal parameters are fixed and valid");
    Ok(standard_normal.inverse_cdf(0.5 + confidence_level / 2.0))
}

/// Sample mean and (n−1)-denominator variance of a score vector.
fn sample_moments(scores: ArrayView1<f64>) -> (f64, f64) {
    let n = scores.len() as f64;
    let mean = scores.sum() / n;
    if scores.len() < 2 {
        return (mean, 0.0);
    }
    let ss: f64 = scores.iter().map(|&s| (s - mean) * (s - mean)).sum();
    (mean, ss / (n - 1.0))
}

/// Paired-score sample covariance (n−1 denominator).
///
/// Both vectors must be aligned by unit; the caller guarantees this by
/// restricting to the jointly kept units of a shared fold assignment.
pub fn paired_covariance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let n = a.len();
    if n < 2 || b.len() != n {
        return 0.0;
    }
    let n_f = n as f64;
    let mean_a = a.sum() / n_f;
    let mean_b = b.sum() / n_f;
    let cross: f64 =
        a.iter().zip(b.iter()).map(|(&x, &y)| (x - mean_a) * (y - mean_b)).sum();
    cross / (n_f - 1.0)
}

/// `ApoEstimate` — one sequence's average potential outcome with inference.
///
/// Fields
/// ------
/// - `estimate`: sample mean of the per-unit scores.
/// - `variance`: estimator variance `s²(ψ) / n`.
/// - `std_error`: `sqrt(variance)`.
/// - `ci_lower` / `ci_upper`: symmetric normal interval at
///   `confidence_level`.
/// - `n_units`: units entering the estimate (post-trimming sample).
/// - `n_dropped`: units excluded by the drop trimming rule (0 under clip).
#[derive(Debug, Clone, PartialEq)]
pub struct ApoEstimate {
    pub estimate: f64,
    pub variance: f64,
    pub std_error: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub confidence_level: f64,
    pub n_units: usize,
    pub n_dropped: usize,
}

impl ApoEstimate {
    /// Aggregate a score vector (already restricted to kept units).
    ///
    /// # Errors
    /// - [`DmlError::AllUnitsTrimmed`] when no scores remain.
    /// - [`DmlError::InvalidConfidenceLevel`] from the quantile lookup.
    pub fn from_scores(
        scores: ArrayView1<f64>, n_dropped: usize, confidence_level: f64,
    ) -> DmlResult<Self> {
        if scores.is_empty() {
            return Err(DmlError::AllUnitsTrimmed);
        }
        let n = scores.len();
        let (mean, sample_var) = sample_moments(scores);
        let variance = sample_var / n as f64;
        let std_error = variance.max(0.0).sqrt();
        let z = normal_quantile(confidence_level)?;
        Ok(Self {
            estimate: mean,
            variance,
            std_error,
            ci_lower: mean - z * std_error,
            ci_upper: mean + z * std_error,
            confidence_level,
            n_units: n,
            n_dropped,
        })
    }
}

/// `AteEstimate` — contrast of two fitted sequences with a
/// covariance-adjusted variance.
///
/// The point estimate is the exact difference of the stored APO estimates;
/// variance and interval come from the paired per-unit scores over the
/// jointly kept units.
#[derive(Debug, Clone, PartialEq)]
pub struct AteEstimate {
    pub estimate: f64,
    pub variance: f64,
    pub std_error: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub confidence_level: f64,
    /// Estimated covariance between the two sequences' scores.
    pub covariance: f64,
    /// Jointly kept units entering the variance estimate.
    pub n_units: usize,
}

impl AteEstimate {
    /// Build the contrast from the stored point estimates and the paired
    /// score vectors (aligned, jointly kept units only).
    ///
    /// # Errors
    /// - [`DmlError::AllUnitsTrimmed`] when no paired scores remain.
    /// - [`DmlError::InvalidConfidenceLevel`] from the quantile lookup.
    pub fn from_paired_scores(
        apo_treat: f64, apo_control: f64, scores_treat: ArrayView1<f64>,
        scores_control: ArrayView1<f64>, confidence_level: f64,
    ) -> DmlResult<Self> {
        let n = scores_treat.len();
        if n == 0 || scores_control.len() != n {
            return Err(DmlError::AllUnitsTrimmed);
        }
        let (_, var_treat) = sample_moments(scores_treat);
        let (_, var_control) = sample_moments(scores_control);
        let covariance = paired_covariance(scores_treat, scores_control);
        let variance = ((var_treat + var_control - 2.0 * covariance) / n as f64).max(0.0);
        let std_error = variance.sqrt();
        let estimate = apo_treat - apo_control;
        let z = normal_quantile(confidence_level)?;
        Ok(Self {
            estimate,
            variance,
            std_error,
            ci_lower: estimate - z * std_error,
            ci_upper: estimate + z * std_error,
            confidence_level,
            covariance,
            n_units: n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // The two-sided quantile must hit the textbook values and reject
    // degenerate levels.
    //
    // Expect
    // ------
    // - z(0.95) ≈ 1.95996, z(0.99) ≈ 2.57583; levels 0 and 1 are rejected.
    fn normal_quantile_matches_textbook_values() {
        assert!((normal_quantile(0.95).unwrap() - 1.959964).abs() < 1e-4);
        assert!((normal_quantile(0.99).unwrap() - 2.575829).abs() < 1e-4);
        assert!(matches!(
            normal_quantile(0.0).unwrap_err(),
            DmlError::InvalidConfidenceLevel { .. }
        ));
        assert!(matches!(
            normal_quantile(1.0).unwrap_err(),
            DmlError::InvalidConfidenceLevel { .. }
        ));
    }

    #[test]
    // Purpose
    // -------
    // APO aggregation: mean, influence-function variance, and a symmetric
    // interval that widens with the level.
    //
    // Given
    // -----
    // - Scores [1, 2, 3, 4] (mean 2.5, sample variance 5/3, n = 4).
    //
    // Expect
    // ------
    // - estimate 2.5, variance 5/12, CI symmetric around the mean, and the
    //   99% interval strictly wider than the 95% one.
    fn apo_estimate_aggregates_scores() {
        let scores = array![1.0, 2.0, 3.0, 4.0];
        let apo = ApoEstimate::from_scores(scores.view(), 0, 0.95).unwrap();
        assert!((apo.estimate - 2.5).abs() < 1e-12);
        assert!((apo.variance - 5.0 / 12.0).abs() < 1e-12);
        assert!((apo.ci_upper + apo.ci_lower - 2.0 * apo.estimate).abs() < 1e-10);

        let wide = ApoEstimate::from_scores(scores.view(), 0, 0.99).unwrap();
        assert!(wide.ci_upper - wide.ci_lower > apo.ci_upper - apo.ci_lower);
    }

    #[test]
    // Purpose
    // -------
    // The ATE variance must subtract twice the covariance: for perfectly
    // correlated score vectors shifted by a constant, the difference is
    // deterministic and the variance collapses to zero.
    //
    // Given
    // -----
    // - s₁ = s₀ + 2 with identical fluctuations.
    //
    // Expect
    // ------
    // - estimate 2, variance ≈ 0, and covariance equal to Var(s₀).
    fn ate_variance_collapses_for_perfectly_correlated_scores() {
        let base = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let shifted = array![3.0, 4.0, 5.0, 6.0, 7.0];
        let ate = AteEstimate::from_paired_scores(
            shifted.mean().unwrap(),
            base.mean().unwrap(),
            shifted.view(),
            base.view(),
            0.95,
        )
        .unwrap();
        assert!((ate.estimate - 2.0).abs() < 1e-12);
        assert!(ate.variance.abs() < 1e-12);
        assert!((ate.covariance - 2.5).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // With a non-negative covariance the ATE variance is bounded by the
    // naive sum of the APO variances.
    //
    // Given
    // -----
    // - Two positively correlated score vectors.
    //
    // Expect
    // ------
    // - Var(ATE) ≤ Var(APO₁) + Var(APO₂) over n.
    fn ate_variance_never_exceeds_naive_sum_under_positive_covariance() {
        let a = array![1.0, 2.0, 2.5, 4.0, 5.5];
        let b = array![0.5, 1.8, 2.2, 3.5, 5.0];
        let ate = AteEstimate::from_paired_scores(
            a.mean().unwrap(),
            b.mean().unwrap(),
            a.view(),
            b.view(),
            0.95,
        )
        .unwrap();
        assert!(ate.covariance > 0.0);

        let apo_a = ApoEstimate::from_scores(a.view(), 0, 0.95).unwrap();
        let apo_b = ApoEstimate::from_scores(b.view(), 0, 0.95).unwrap();
        assert!(ate.variance <= apo_a.variance + apo_b.variance + 1e-15);
    }

    #[test]
    // Purpose
    // -------
    // Empty score vectors must fail rather than return defaults.
    fn empty_scores_are_rejected() {
        let empty = ndarray::Array1::<f64>::zeros(0);
        assert_eq!(
            ApoEstimate::from_scores(empty.view(), 3, 0.95).unwrap_err(),
            DmlError::AllUnitsTrimmed
        );
    }
}
