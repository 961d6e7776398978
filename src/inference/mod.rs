//! inference — estimator-level aggregation of per-unit scores.
//!
//! Turns the cross-fitted doubly-robust scores into [`ApoEstimate`] and
//! [`AteEstimate`] values: influence-function variances, normal confidence
//! intervals, and the paired-score covariance that keeps ATE inference
//! honest when two sequences share folds.

pub mod estimates;

pub use self::estimates::{normal_quantile, paired_covariance, ApoEstimate, AteEstimate};
