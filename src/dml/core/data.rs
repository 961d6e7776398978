//! Panel data containers for two-period treatment evaluation.
//!
//! Purpose
//! -------
//! Provide a small, validated container for the observational panel a
//! dynamic-DML fit consumes: final outcomes, two categorical treatment
//! columns, baseline covariates, and (optionally empty) intermediate
//! covariates observed after the first treatment. This module centralizes
//! input validation so downstream code can assume clean, aligned, finite
//! data.
//!
//! Key behaviors
//! -------------
//! - [`PanelData`] enforces alignment invariants (every column covers the
//!   same units) and rejects non-finite values — missing data never enters
//!   the estimation sample.
//! - Baseline covariates must be non-empty; intermediate covariates may
//!   have zero columns (static-confounding panels).
//!
//! Invariants & assumptions
//! ------------------------
//! - `y.len() == d1.len() == d2.len() == x0.nrows() == x1.nrows() > 0`.
//! - `x0.ncols() >= 1`; `x1.ncols()` may be 0.
//! - All entries of `y`, `x0`, `x1` are finite. Treatment columns are
//!   small categorical codes (`u8`), so finiteness holds by construction.
//!
//! Conventions
//! -----------
//! - Unit identity is row position; all per-unit arrays produced by the
//!   estimation pipeline (folds, nuisances, scores) are indexed the same
//!   way.
//! - Treatment codes are compared against the levels carried by a
//!   [`TreatmentSequence`](crate::dml::core::policy::TreatmentSequence);
//!   the container itself does not privilege any coding.
//!
//! Downstream usage
//! ----------------
//! - Construct [`PanelData`] at the boundary where raw arrays enter the
//!   crate (Rust callers or the PyO3 layer).
//! - The cross-fitting engine and score builder rely on these invariants
//!   and do not re-validate basic properties.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the happy path plus each rejection: empty panel,
//!   length mismatches, non-finite entries (with first-offender index
//!   reporting), and a column-free X0.
use crate::dml::errors::{DmlError, DmlResult};
use ndarray::{Array1, Array2};

/// `PanelData` — validated two-period observational panel.
///
/// Purpose
/// -------
/// Represent one estimation sample: for every unit, the final outcome `Y`,
/// the realized period-1 and period-2 treatments `D1`/`D2`, baseline
/// covariates `X0`, and intermediate covariates `X1` observed after `D1`.
///
/// Fields
/// ------
/// - `y`: `Array1<f64>` — final outcome, finite.
/// - `d1`: `Array1<u8>` — realized period-1 treatment code per unit.
/// - `d2`: `Array1<u8>` — realized period-2 treatment code per unit.
/// - `x0`: `Array2<f64>` — baseline covariates, `n × p0` with `p0 ≥ 1`.
/// - `x1`: `Array2<f64>` — intermediate covariates, `n × p1` with `p1 ≥ 0`;
///   a zero-column matrix is the static-confounding case.
///
/// Invariants
/// ----------
/// - All five fields cover the same `n > 0` units, aligned by row.
/// - No NaN/±inf anywhere; units with missing values must be excluded by
///   the caller before construction.
///
/// Performance
/// -----------
/// - Validation is a single scan over each array; after construction this
///   is a plain container with no hidden allocations.
///
/// Notes
/// -----
/// - Whether `x1` participates in period-2 conditioning is decided by
///   [`DmlOptions::dynamic_confounding`](crate::dml::core::options::DmlOptions),
///   not by this type; an empty `x1` is only rejected at fit time when
///   dynamic confounding is requested.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelData {
    /// Final outcome per unit (finite).
    pub y: Array1<f64>,
    /// Realized period-1 treatment code per unit.
    pub d1: Array1<u8>,
    /// Realized period-2 treatment code per unit.
    pub d2: Array1<u8>,
    /// Baseline covariates (n × p0, p0 ≥ 1).
    pub x0: Array2<f64>,
    /// Intermediate covariates observed after D1 (n × p1, p1 may be 0).
    pub x1: Array2<f64>,
}

impl PanelData {
    /// Construct a validated [`PanelData`] from raw aligned arrays.
    ///
    /// Parameters
    /// ----------
    /// - `y`: final outcomes; non-empty and finite.
    /// - `d1`, `d2`: realized treatment codes; same length as `y`.
    /// - `x0`: baseline covariates; `y.len()` rows and at least one column.
    /// - `x1`: intermediate covariates; `y.len()` rows, zero columns allowed.
    ///
    /// Returns
    /// -------
    /// `DmlResult<PanelData>` — the validated container, or the first
    /// violated invariant.
    ///
    /// Errors
    /// ------
    /// - [`DmlError::EmptyPanel`] when `y` is empty.
    /// - [`DmlError::LengthMismatch`] for any misaligned column, with the
    ///   offending field named.
    /// - [`DmlError::NoBaselineCovariates`] when `x0` has zero columns.
    /// - [`DmlError::NonFiniteValue`] for the first NaN/±inf entry found in
    ///   `y`, `x0`, or `x1` (row-major order for matrices).
    ///
    /// Panics
    /// ------
    /// - Never panics; all invalid inputs are reported via `DmlError`.
    pub fn new(
        y: Array1<f64>, d1: Array1<u8>, d2: Array1<u8>, x0: Array2<f64>, x1: Array2<f64>,
    ) -> DmlResult<Self> {
        let n = y.len();
        if n == 0 {
            return Err(DmlError::EmptyPanel);
        }
        if d1.len() != n {
            return Err(DmlError::LengthMismatch { field: "D1", expected: n, actual: d1.len() });
        }
        if d2.len() != n {
            return Err(DmlError::LengthMismatch { field: "D2", expected: n, actual: d2.len() });
        }
        if x0.nrows() != n {
            return Err(DmlError::LengthMismatch { field: "X0", expected: n, actual: x0.nrows() });
        }
        if x1.nrows() != n {
            return Err(DmlError::LengthMismatch { field: "X1", expected: n, actual: x1.nrows() });
        }
        if x0.ncols() == 0 {
            return Err(DmlError::NoBaselineCovariates);
        }

        for (index, &value) in y.iter().enumerate() {
            if !value.is_finite() {
                return Err(DmlError::NonFiniteValue { field: "Y", index, value });
            }
        }
        for (index, &value) in x0.iter().enumerate() {
            if !value.is_finite() {
                return Err(DmlError::NonFiniteValue { field: "X0", index, value });
            }
        }
        for (index, &value) in x1.iter().enumerate() {
            if !value.is_finite() {
                return Err(DmlError::NonFiniteValue { field: "X1", index, value });
            }
        }

        Ok(PanelData { y, d1, d2, x0, x1 })
    }

    /// Number of units in the panel.
    pub fn n_units(&self) -> usize {
        self.y.len()
    }

    /// Whether the panel carries intermediate covariates.
    pub fn has_intermediate_covariates(&self) -> bool {
        self.x1.ncols() > 0
    }
}
