//! dynamic_dml — dynamic Double Machine Learning with Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes the two-period dynamic-DML estimator to Python via the
//! `_dynamic_dml` extension module. When the `python-bindings` feature is
//! enabled, this module defines the Python-facing classes and the
//! `#[pymodule]` initializer used by the `dynamic_dml` package.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules (`dml`, `learners`, `inference`,
//!   `optimization`) as the public crate surface.
//! - Define `#[pyclass]` wrappers around [`dml::Dml2Periods`] and the
//!   estimate types, with numpy conversions handled in [`utils`].
//!
//! Invariants & assumptions
//! ------------------------
//! - All heavy numerical work is implemented in the inner Rust modules;
//!   this file performs only FFI glue, input conversion, and error
//!   mapping.
//! - Python-visible types mirror the invariants of their Rust
//!   counterparts; on successful conversion, the core modules' documented
//!   invariants are assumed to hold.
//!
//! Conventions
//! -----------
//! - Errors from core Rust code are propagated as rich error types
//!   internally and converted to `PyErr` values at the PyO3 boundary.
//! - The Python `fit_sequence` uses the bundled linear learners (ridge
//!   outcome regressions, logistic assignment models); Rust callers can
//!   plug arbitrary learners through
//!   [`learners::traits::NuisanceLearners`].
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend directly on the inner modules and can
//!   ignore the PyO3 items guarded by the `python-bindings` feature.
//! - External users interact with either the safe Rust APIs or the Python
//!   wrappers; the PyO3 plumbing is considered internal.

pub mod dml;
pub mod inference;
pub mod learners;
pub mod optimization;
pub mod utils;

#[cfg(feature = "python-bindings")]
use pyo3::prelude::*;

#[cfg(feature = "python-bindings")]
use crate::{
    dml::{
        core::{data::PanelData, options::DmlOptions, policy::TargetRule},
        models::two_period::Dml2Periods,
    },
    inference::estimates::{ApoEstimate, AteEstimate},
    learners::traits::NuisanceLearners,
    utils::{
        extract_f64_matrix, extract_f64_vector, extract_treatment_array, extract_trimming,
    },
};

/// dml2periods — Python-facing two-period dynamic-DML model.
///
/// Purpose
/// -------
/// Expose the [`Dml2Periods`] API to Python callers while preserving the
/// core Rust invariants and error handling. Nuisance models are the
/// bundled linear learners; `learner_penalty` controls their ridge/L2
/// strength.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `dml2periods(dynamic_confounding=True, n_folds=5, trimming_threshold=0.01,
/// trimming_rule='clip', random_state=0, confidence_level=0.95,
/// verbose=False, learner_penalty=1e-3)`.
///
/// Notes
/// -----
/// - Native Rust callers should use [`Dml2Periods`] directly; this type
///   exists solely for the PyO3 binding surface.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "dynamic_dml", name = "dml2periods", unsendable)]
pub struct PyDml2Periods {
    /// Underlying Rust model state.
    inner: Dml2Periods,
    /// Penalty handed to the bundled linear learners.
    learner_penalty: f64,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl PyDml2Periods {
    #[new]
    #[pyo3(
        signature = (
            dynamic_confounding = true,
            n_folds = 5,
            trimming_threshold = None,
            trimming_rule = None,
            random_state = 0,
            confidence_level = 0.95,
            verbose = false,
            learner_penalty = 1e-3,
        ),
        text_signature = "(dynamic_confounding=True, n_folds=5, trimming_threshold=0.01, \
                          trimming_rule='clip', random_state=0, confidence_level=0.95, \
                          verbose=False, learner_penalty=1e-3)"
    )]
    pub fn new(
        dynamic_confounding: bool, n_folds: usize, trimming_threshold: Option<f64>,
        trimming_rule: Option<&str>, random_state: u64, confidence_level: f64, verbose: bool,
        learner_penalty: f64,
    ) -> PyResult<Self> {
        let trimming = extract_trimming(trimming_rule, trimming_threshold)?;
        let options = DmlOptions::new(
            dynamic_confounding,
            n_folds,
            trimming,
            random_state,
            confidence_level,
            verbose,
        )?;
        Ok(Self { inner: Dml2Periods::new(options), learner_penalty })
    }

    /// Register a treatment sequence ahead of fitting.
    pub fn init_sequence(&mut self, d1treat: &str, d2treat: &str) -> PyResult<()> {
        self.inner.init_sequence(d1treat, d2treat)?;
        Ok(())
    }

    /// Run the full cross-fitting + scoring pipeline for one sequence and
    /// store the fitted result.
    #[pyo3(
        signature = (d1treat, d2treat, y, d1, d2, x0, x1, g1t, g2t),
        text_signature = "(self, d1treat, d2treat, y, d1, d2, x0, x1, g1t, g2t)"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn fit_sequence<'py>(
        &mut self, py: Python<'py>, d1treat: &str, d2treat: &str, y: &Bound<'py, PyAny>,
        d1: &Bound<'py, PyAny>, d2: &Bound<'py, PyAny>, x0: &Bound<'py, PyAny>,
        x1: Option<&Bound<'py, PyAny>>, g1t: &Bound<'py, PyAny>, g2t: &Bound<'py, PyAny>,
    ) -> PyResult<()> {
        let y = extract_f64_vector(py, y, "Y")?;
        let n = y.len();
        let d1 = extract_treatment_array(py, d1, "D1")?;
        let d2 = extract_treatment_array(py, d2, "D2")?;
        let x0 = extract_f64_matrix(Some(x0), n, "X0")?;
        let x1 = extract_f64_matrix(x1, n, "X1")?;
        let data = PanelData::new(y, d1, d2, x0, x1)?;

        let g1t = extract_f64_vector(py, g1t, "g1t")?;
        let g2t = extract_f64_vector(py, g2t, "g2t")?;
        let rule = TargetRule::new(g1t, g2t).map_err(crate::dml::errors::DmlError::from)?;

        let mut learners = NuisanceLearners::linear(self.learner_penalty)
            .map_err(|e| pyo3::exceptions::PyValueError::new_err(e.to_string()))?;
        self.inner.fit_sequence(d1treat, d2treat, &data, &rule, &mut learners)?;
        Ok(())
    }

    /// Stored APO estimate for a fitted sequence.
    pub fn compute_apo(&self, d1treat: &str, d2treat: &str) -> PyResult<PyApoEstimate> {
        let estimate = self.inner.compute_apo(d1treat, d2treat)?;
        Ok(PyApoEstimate { inner: estimate })
    }

    /// Contrast two fitted sequences.
    pub fn compute_ate(
        &self, d1treat: &str, d2treat: &str, d1control: &str, d2control: &str,
    ) -> PyResult<PyAteEstimate> {
        let estimate = self.inner.compute_ate(d1treat, d2treat, d1control, d2control)?;
        Ok(PyAteEstimate { inner: estimate })
    }

    /// Rendered summary of a fitted sequence.
    pub fn sequence_summary(&self, d1treat: &str, d2treat: &str) -> PyResult<String> {
        let summary = self.inner.sequence_summary(d1treat, d2treat)?;
        Ok(summary.to_string())
    }
}

/// Average-potential-outcome estimate exposed to Python (read-only).
#[cfg(feature = "python-bindings")]
#[pyclass(module = "dynamic_dml", name = "apo_estimate")]
pub struct PyApoEstimate {
    inner: ApoEstimate,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl PyApoEstimate {
    #[getter]
    pub fn estimate(&self) -> f64 {
        self.inner.estimate
    }

    #[getter]
    pub fn variance(&self) -> f64 {
        self.inner.variance
    }

    #[getter]
    pub fn std_error(&self) -> f64 {
        self.inner.std_error
    }

    #[getter]
    pub fn confidence_interval(&self) -> (f64, f64) {
        (self.inner.ci_lower, self.inner.ci_upper)
    }

    #[getter]
    pub fn n_units(&self) -> usize {
        self.inner.n_units
    }

    #[getter]
    pub fn n_dropped(&self) -> usize {
        self.inner.n_dropped
    }
}

/// Average-treatment-effect estimate exposed to Python (read-only).
#[cfg(feature = "python-bindings")]
#[pyclass(module = "dynamic_dml", name = "ate_estimate")]
pub struct PyAteEstimate {
    inner: AteEstimate,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl PyAteEstimate {
    #[getter]
    pub fn estimate(&self) -> f64 {
        self.inner.estimate
    }

    #[getter]
    pub fn variance(&self) -> f64 {
        self.inner.variance
    }

    #[getter]
    pub fn std_error(&self) -> f64 {
        self.inner.std_error
    }

    #[getter]
    pub fn confidence_interval(&self) -> (f64, f64) {
        (self.inner.ci_lower, self.inner.ci_upper)
    }

    #[getter]
    pub fn covariance(&self) -> f64 {
        self.inner.covariance
    }

    #[getter]
    pub fn n_units(&self) -> usize {
        self.inner.n_units
    }
}

/// _dynamic_dml — PyO3 module initializer for the Python extension.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _dynamic_dml<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_class::<PyDml2Periods>()?;
    m.add_class::<PyApoEstimate>()?;
    m.add_class::<PyAteEstimate>()?;
    Ok(())
}
