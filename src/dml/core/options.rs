//! Run-time configuration for two-period DML estimation.
//!
//! All numeric options are validated at construction, so the estimation
//! pipeline can assume internally consistent settings. Both trimming
//! policies (symmetric clip and drop-with-reweighting) are exposed as
//! configuration rather than hardcoded.
use crate::dml::errors::{DmlError, DmlResult};

/// How propensity predictions outside the trimming band are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimRule {
    /// Clip predictions into `[ε, 1−ε]` before inverse weighting; every
    /// unit stays in the estimation sample.
    Clip,
    /// Exclude units whose held-out propensity falls outside the band; the
    /// APO mean and variance renormalize over the kept units.
    DropUnit,
}

/// Trimming policy: rule plus threshold ε.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trimming {
    pub rule: TrimRule,
    pub threshold: f64,
}

impl Trimming {
    /// Construct a validated trimming policy.
    ///
    /// # Errors
    /// [`DmlError::InvalidTrimmingThreshold`] unless `ε ∈ (0, 0.5)`.
    pub fn new(rule: TrimRule, threshold: f64) -> DmlResult<Self> {
        if !threshold.is_finite() || threshold <= 0.0 || threshold >= 0.5 {
            return Err(DmlError::InvalidTrimmingThreshold { value: threshold });
        }
        Ok(Self { rule, threshold })
    }
}

impl Default for Trimming {
    /// Symmetric clip at ε = 0.01.
    fn default() -> Self {
        Self { rule: TrimRule::Clip, threshold: 0.01 }
    }
}

/// `DmlOptions` — global configuration of a [`Dml2Periods`] model state.
///
/// Fields
/// ------
/// - `dynamic_confounding`: include the intermediate covariates X1 in the
///   period-2 conditioning sets (the dynamic-confounding variant); when
///   `false`, period-2 models condition on `(X0, D1)` only.
/// - `n_folds`: cross-fitting folds K (≥ 2; the `K ≤ n` half of the check
///   happens when the fold assignment is created against a panel).
/// - `trimming`: propensity trimming policy.
/// - `random_state`: single seed driving fold assignment; stochastic
///   learner internals are expected to derive their seeding from it.
/// - `confidence_level`: coverage of the symmetric normal confidence
///   intervals, in (0, 1).
/// - `verbose`: emit trimming diagnostics to stderr during fitting.
///
/// [`Dml2Periods`]: crate::dml::models::two_period::Dml2Periods
#[derive(Debug, Clone, PartialEq)]
pub struct DmlOptions {
    pub dynamic_confounding: bool,
    pub n_folds: usize,
    pub trimming: Trimming,
    pub random_state: u64,
    pub confidence_level: f64,
    pub verbose: bool,
}

impl DmlOptions {
    /// Construct validated options.
    ///
    /// # Errors
    /// - [`DmlError::InvalidFoldCount`] when `n_folds < 2` (the upper bound
    ///   is checked against the panel at fit time).
    /// - [`DmlError::InvalidConfidenceLevel`] unless the level lies in
    ///   (0, 1).
    pub fn new(
        dynamic_confounding: bool, n_folds: usize, trimming: Trimming, random_state: u64,
        confidence_level: f64, verbose: bool,
    ) -> DmlResult<Self> {
        if n_folds < 2 {
            return Err(DmlError::InvalidFoldCount { n_folds, n_units: None });
        }
        if !confidence_level.is_finite() || confidence_level <= 0.0 || confidence_level >= 1.0 {
            return Err(DmlError::InvalidConfidenceLevel { value: confidence_level });
        }
        Ok(Self { dynamic_confounding, n_folds, trimming, random_state, confidence_level, verbose })
    }
}

impl Default for DmlOptions {
    /// Dynamic confounding on, K = 5, clip trimming at 0.01, seed 0, 95%
    /// confidence, quiet.
    fn default() -> Self {
        Self {
            dynamic_confounding: true,
            n_folds: 5,
            trimming: Trimming::default(),
            random_state: 0,
            confidence_level: 0.95,
            verbose: false,
        }
    }
}
