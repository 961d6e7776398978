//! Errors for the pluggable learner layer.
//!
//! [`LearnerError`] is the failure surface of the fit/predict contract that
//! nuisance models implement. The estimation core never inspects these
//! beyond attaching fold/period context; see
//! [`DmlError::LearnerFailure`](crate::dml::errors::DmlError::LearnerFailure).
use crate::optimization::errors::OptError;

/// Result alias for learner operations that may produce [`LearnerError`].
pub type LearnerResult<T> = Result<T, LearnerError>;

/// Unified error type for learner fit/predict calls.
#[derive(Debug, Clone, PartialEq)]
pub enum LearnerError {
    /// `predict` was called before a successful `fit`.
    NotFitted,

    /// The feature matrix handed to `predict` has a different column count
    /// than the matrix the learner was fitted on.
    FeatureDimMismatch { expected: usize, actual: usize },

    /// The training set contains no rows.
    EmptyTrainingSet,

    /// Target length does not match the number of training rows.
    TargetLengthMismatch { expected: usize, actual: usize },

    /// A prediction came out non-finite.
    NonFinitePrediction { index: usize, value: f64 },

    /// The normal equations could not be factorized.
    SingularSystem { detail: &'static str },

    /// Penalty strength must be finite and non-negative.
    InvalidPenalty { value: f64 },

    /// The inner optimizer failed; includes a human-readable status.
    OptimizationFailed { status: String },

    /// Failure raised by an external learner behind a closure adapter.
    External { detail: String },
}

impl std::error::Error for LearnerError {}

impl std::fmt::Display for LearnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LearnerError::NotFitted => {
                write!(f, "Learner has not been fitted yet.")
            }
            LearnerError::FeatureDimMismatch { expected, actual } => {
                write!(f, "Feature dimension mismatch: fitted on {expected} columns, got {actual}")
            }
            LearnerError::EmptyTrainingSet => {
                write!(f, "Training set is empty.")
            }
            LearnerError::TargetLengthMismatch { expected, actual } => {
                write!(f, "Target length mismatch: expected {expected}, got {actual}")
            }
            LearnerError::NonFinitePrediction { index, value } => {
                write!(f, "Prediction at index {index} is non-finite: {value}")
            }
            LearnerError::SingularSystem { detail } => {
                write!(f, "Normal equations are singular: {detail}")
            }
            LearnerError::InvalidPenalty { value } => {
                write!(f, "Penalty must be finite and non-negative; got {value}")
            }
            LearnerError::OptimizationFailed { status } => {
                write!(f, "Optimizer failed with status: {status}")
            }
            LearnerError::External { detail } => {
                write!(f, "External learner failed: {detail}")
            }
        }
    }
}

impl From<OptError> for LearnerError {
    fn from(err: OptError) -> LearnerError {
        LearnerError::OptimizationFailed { status: err.to_string() }
    }
}
