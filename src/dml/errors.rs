//! Errors for dynamic-DML estimation (panel validation, fold/option checks,
//! fit-ordering invariants, and learner failures).
//!
//! This module defines the estimation error type, [`DmlError`], and a policy
//! error type, [`PolicyError`], used across the Python-facing API and the
//! internal Rust core. Both implement `Display`/`Error` and convert to
//! `PyErr` for PyO3.
//!
//! ## Conventions
//! - **Indices are 0-based** (match Rust/NumPy); `fold` and `period` values
//!   reported inside errors identify the cross-fitting stage that failed
//!   (`period` is 1 or 2).
//! - Validation failures are raised **before any learner is trained**;
//!   fitting a sequence is all-or-nothing and never stores partial state.
//! - Degenerate propensities are *not* errors: trimming is recorded in a
//!   [`TrimmingReport`](crate::dml::core::nuisance::TrimmingReport) and
//!   surfaced through summaries.
use crate::learners::errors::LearnerError;

#[cfg(feature = "python-bindings")]
use pyo3::exceptions::PyValueError;
#[cfg(feature = "python-bindings")]
use pyo3::prelude::*;

/// Crate-wide result alias for estimation operations that may produce
/// [`DmlError`].
pub type DmlResult<T> = Result<T, DmlError>;

/// Result alias for policy-construction/validation paths that may produce
/// [`PolicyError`].
pub type PolicyResult<T> = Result<T, PolicyError>;

/// Which nuisance model was being fitted or evaluated when a learner failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NuisanceStage {
    /// Treatment-assignment (propensity) model.
    Assignment,
    /// Outcome (or pseudo-outcome) regression model.
    OutcomeRegression,
}

impl std::fmt::Display for NuisanceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NuisanceStage::Assignment => write!(f, "assignment model"),
            NuisanceStage::OutcomeRegression => write!(f, "outcome regression"),
        }
    }
}

/// Unified error type for dynamic-DML estimation.
///
/// Covers panel/data validation, configuration checks, fold-partition
/// invariants, fit-before-compute ordering, and learner failures (with the
/// fold/period/stage context attached). Implements `Display`/`Error` and
/// converts to a Python `ValueError` at PyO3 boundaries.
#[derive(Debug, Clone, PartialEq)]
pub enum DmlError {
    // ---- Panel validation ----
    /// Panel contains no units.
    EmptyPanel,

    /// A data column's length does not match the number of units.
    LengthMismatch { field: &'static str, expected: usize, actual: usize },

    /// A numeric value is NaN/±inf (missing values are not permitted).
    NonFiniteValue { field: &'static str, index: usize, value: f64 },

    /// Baseline covariates must contain at least one column.
    NoBaselineCovariates,

    /// Dynamic confounding requires non-empty intermediate covariates X1.
    MissingIntermediateCovariates,

    // ---- Configuration ----
    /// Fold count outside [2, n_units]; `n_units` is `None` when the check
    /// runs before any panel is seen.
    InvalidFoldCount { n_folds: usize, n_units: Option<usize> },

    /// Trimming threshold outside (0, 0.5).
    InvalidTrimmingThreshold { value: f64 },

    /// Confidence level outside (0, 1).
    InvalidConfidenceLevel { value: f64 },

    // ---- Cross-fitting invariants ----
    /// A sequence was fit against a panel whose length does not match the
    /// model's shared fold assignment.
    FoldMismatch { expected: usize, actual: usize },

    /// A nuisance training subsample was empty in some fold (no unit in the
    /// complement realized the sequence's treatment level).
    EmptyTrainingSubsample { fold: usize, period: u8 },

    /// No unit survived propensity trimming under the drop rule.
    AllUnitsTrimmed,

    // ---- Ordering ----
    /// `compute_apo`/`compute_ate`/`sequence_summary` called for a sequence
    /// key with no stored fit.
    SequenceNotFitted { key: String },

    // ---- Policy ----
    /// A treatment-sequence or target-rule value failed validation.
    Policy(PolicyError),

    // ---- Learner ----
    /// The supplied learner's fit/predict call failed; fold, period, and
    /// nuisance stage identify where.
    LearnerFailure { fold: usize, period: u8, stage: NuisanceStage, source: LearnerError },
}

impl std::error::Error for DmlError {}

impl std::fmt::Display for DmlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Panel validation ----
            DmlError::EmptyPanel => {
                write!(f, "Panel contains no units.")
            }
            DmlError::LengthMismatch { field, expected, actual } => {
                write!(f, "Length mismatch for {field}: expected {expected}, got {actual}")
            }
            DmlError::NonFiniteValue { field, index, value } => {
                write!(f, "{field} contains a non-finite value at index {index}: {value}")
            }
            DmlError::NoBaselineCovariates => {
                write!(f, "Baseline covariates X0 must contain at least one column.")
            }
            DmlError::MissingIntermediateCovariates => {
                write!(
                    f,
                    "Dynamic confounding is enabled but the intermediate covariates X1 are empty."
                )
            }
            // ---- Configuration ----
            DmlError::InvalidFoldCount { n_folds, n_units } => match n_units {
                Some(n) => write!(
                    f,
                    "Fold count must satisfy 2 <= K <= n_units; got K = {n_folds} with {n} units."
                ),
                None => {
                    write!(f, "Fold count must satisfy K >= 2; got K = {n_folds}.")
                }
            },
            DmlError::InvalidTrimmingThreshold { value } => {
                write!(f, "Trimming threshold must lie in (0, 0.5); got {value}")
            }
            DmlError::InvalidConfidenceLevel { value } => {
                write!(f, "Confidence level must lie in (0, 1); got {value}")
            }
            // ---- Cross-fitting invariants ----
            DmlError::FoldMismatch { expected, actual } => {
                write!(
                    f,
                    "Panel length {actual} does not match the model's shared fold assignment over {expected} units."
                )
            }
            DmlError::EmptyTrainingSubsample { fold, period } => {
                write!(
                    f,
                    "No training unit realized the sequence's period-{period} treatment level outside fold {fold}."
                )
            }
            DmlError::AllUnitsTrimmed => {
                write!(f, "Propensity trimming dropped every unit; no estimation sample remains.")
            }
            // ---- Ordering ----
            DmlError::SequenceNotFitted { key } => {
                write!(f, "Sequence '{key}' has not been fitted yet; call fit_sequence first.")
            }
            // ---- Policy ----
            DmlError::Policy(err) => write!(f, "{err}"),
            // ---- Learner ----
            DmlError::LearnerFailure { fold, period, stage, source } => {
                write!(f, "Learner failed in fold {fold}, period {period} ({stage}): {source}")
            }
        }
    }
}

impl From<PolicyError> for DmlError {
    fn from(err: PolicyError) -> DmlError {
        DmlError::Policy(err)
    }
}

/// Convert a [`DmlError`] into a Python `ValueError` with the error message.
///
/// This is used at the Rust↔Python boundary to surface domain errors cleanly.
#[cfg(feature = "python-bindings")]
impl std::convert::From<DmlError> for PyErr {
    fn from(err: DmlError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

/// Errors specific to treatment-sequence and target-rule construction.
///
/// Typical causes are empty sequence labels, weight vectors of mismatched
/// length, and target-policy weights outside [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyError {
    /// Sequence labels must be non-empty.
    EmptyLabel { which: &'static str },

    /// g1t and g2t must have the same length.
    WeightLengthMismatch { expected: usize, actual: usize },

    /// Target-rule weights must be finite.
    NonFiniteWeight { period: u8, index: usize, value: f64 },

    /// Target-rule weights are probabilities and must lie in [0, 1].
    WeightOutOfRange { period: u8, index: usize, value: f64 },

    /// A target rule must cover at least one unit.
    EmptyRule,
}

impl std::error::Error for PolicyError {}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyError::EmptyLabel { which } => {
                write!(f, "Treatment-sequence label '{which}' must be non-empty.")
            }
            PolicyError::WeightLengthMismatch { expected, actual } => {
                write!(f, "g1t and g2t length mismatch: expected {expected}, got {actual}")
            }
            PolicyError::NonFiniteWeight { period, index, value } => {
                write!(
                    f,
                    "Target weight g{period}t at index {index} must be finite; got {value}"
                )
            }
            PolicyError::WeightOutOfRange { period, index, value } => {
                write!(
                    f,
                    "Target weight g{period}t at index {index} must lie in [0, 1]; got {value}"
                )
            }
            PolicyError::EmptyRule => {
                write!(f, "A target rule must cover at least one unit.")
            }
        }
    }
}

/// Convert a [`PolicyError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<PolicyError> for PyErr {
    fn from(err: PolicyError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
