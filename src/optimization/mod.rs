//! optimization — argmin-powered log-likelihood maximization.
//!
//! Purpose
//! -------
//! Provide the high-level optimization layer used by this crate's reference
//! learners (and available to user-supplied ones): implement a single trait,
//! [`LogLikelihood`], and invoke [`maximize`] to run L-BFGS with a
//! configurable line search, tolerances, and a finite-difference gradient
//! fallback.
//!
//! Key behaviors
//! -------------
//! - Convert user log-likelihoods `ℓ(θ)` into argmin-compatible cost
//!   functions `c(θ) = -ℓ(θ)` via [`adapter::MleProblem`].
//! - Validate initial guesses (`LogLikelihood::check`) before any solver
//!   iteration and normalize results into an [`OptimOutcome`].
//! - Fall back to robust finite differences (central, then forward) when no
//!   analytic gradient is implemented.
//!
//! Conventions
//! -----------
//! - Parameters live in an unconstrained space as [`Theta`]
//!   (`ndarray::Array1<f64>`); gradients exposed by user code are for the
//!   log-likelihood (`∇ℓ(θ)`), never the cost.
//! - Errors bubble up as [`OptResult`] / [`OptError`]; argmin's own errors
//!   never leak across module boundaries.
//!
//! Downstream usage
//! ----------------
//! - [`crate::learners::logistic::LogisticRegression`] implements
//!   [`LogLikelihood`] and fits through [`maximize`].
//! - Callers wanting progress output enable the `obs_slog` feature and set
//!   `MleOptions::verbose`.

pub mod adapter;
pub mod api;
pub mod errors;
pub mod traits;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::maximize;
pub use self::errors::{OptError, OptResult};
pub use self::traits::{
    Cost, FnEvalMap, Grad, LineSearcher, LogLikelihood, MleOptions, OptimOutcome, Theta,
    Tolerances, DEFAULT_LBFGS_MEM,
};
