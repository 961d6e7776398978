//! dml — dynamic Double Machine Learning for two-period policies.
//!
//! Purpose
//! -------
//! Estimate average potential outcomes (APOs) and treatment effects (ATEs)
//! of sequential, possibly dynamic treatment policies from observational
//! panel data. The estimator cross-fits treatment-assignment and outcome
//! nuisance models over K folds, builds Neyman-orthogonal doubly-robust
//! scores recursively from period 2 back to period 1, and aggregates them
//! with influence-function-based inference.
//!
//! Key behaviors
//! -------------
//! - [`core::data::PanelData`] validates the five aligned inputs
//!   (Y, D1, D2, X0, X1) before anything is fitted.
//! - [`core::folds::FoldAssignment`] partitions units deterministically
//!   from a single seed; one assignment is shared by every sequence a
//!   model state fits.
//! - [`core::nuisance`] resolves period-2 nuisances before period-1 ones
//!   within each fold — the recursion that distinguishes dynamic DML from
//!   two stacked single-period estimators.
//! - [`models::two_period::Dml2Periods`] owns configuration, folds, and
//!   fitted sequences, and enforces fit-before-compute ordering.
//!
//! Invariants & assumptions
//! ------------------------
//! - Units are identified by row position; every per-unit array in the
//!   pipeline is aligned with the panel.
//! - No score computation ever divides by a propensity outside the
//!   trimming band `[ε, 1−ε]`.
//! - Fitting is all-or-nothing per sequence; failures leave the model
//!   state untouched.
//!
//! Downstream usage
//! ----------------
//! - Rust callers work with [`models::two_period::Dml2Periods`] directly,
//!   supplying learners through
//!   [`crate::learners::traits::NuisanceLearners`].
//! - The Python surface (feature `python-bindings`) wraps the same model
//!   state with numpy conversions.

pub mod core;
pub mod errors;
pub mod models;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::core::data::PanelData;
pub use self::core::folds::FoldAssignment;
pub use self::core::nuisance::{NuisancePredictions, TrimmingReport};
pub use self::core::options::{DmlOptions, TrimRule, Trimming};
pub use self::core::policy::{SequenceKey, TargetRule, TreatmentSequence};
pub use self::core::summary::SequenceSummary;
pub use self::errors::{DmlError, DmlResult, NuisanceStage, PolicyError, PolicyResult};
pub use self::models::two_period::{Dml2Periods, FittedSequence};

/// Convenience prelude for downstream crates:
///
/// ```ignore
/// use dynamic_dml::dml::prelude::*;
/// ```
pub mod prelude {
    pub use super::core::data::PanelData;
    pub use super::core::options::{DmlOptions, TrimRule, Trimming};
    pub use super::core::policy::{TargetRule, TreatmentSequence};
    pub use super::errors::{DmlError, DmlResult};
    pub use super::models::two_period::Dml2Periods;
}
