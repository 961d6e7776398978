//! Capability contracts for pluggable nuisance learners.
//!
//! Purpose
//! -------
//! Define the narrow fit/predict interface the estimation core consumes.
//! Anything satisfying these traits can serve as a nuisance model: the
//! bundled reference learners, a hand-rolled estimator, or a wrapper around
//! an external AutoML system. The core never inspects learner internals and
//! never calibrates probabilities itself.
//!
//! Key behaviors
//! -------------
//! - [`OutcomeLearner`]: continuous regression (`fit`, `predict`).
//! - [`PropensityLearner`]: treatment-assignment models
//!   (`fit` on 0/1 labels, `predict_proba` returning probability-like
//!   output).
//! - [`FnOutcomeLearner`] / [`FnPropensityLearner`]: thin adapter structs
//!   holding a closure pair, so external estimators plug in by composition
//!   rather than through a wrapper hierarchy.
//!
//! Conventions
//! -----------
//! - `fit` always retrains from scratch; the cross-fitting engine calls it
//!   once per fold with the complementary training rows.
//! - Feature matrices are row-major `n × p` views; learners must accept any
//!   `p ≥ 1` and may be refit with a different `p` later.
//! - Predictions must be finite; the bundled learners check this before
//!   returning.
use crate::learners::errors::{LearnerError, LearnerResult};
use ndarray::{Array1, ArrayView1, ArrayView2};

/// Continuous-outcome regression contract.
///
/// `fit` trains from scratch on `(x, y)`; `predict` maps features to scalar
/// predictions. Implementations must be retrainable any number of times.
pub trait OutcomeLearner {
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> LearnerResult<()>;
    fn predict(&self, x: ArrayView2<f64>) -> LearnerResult<Array1<f64>>;
}

/// Treatment-assignment (propensity) model contract.
///
/// `fit` trains from scratch on `(x, labels)` with 0/1 labels marking the
/// target treatment level; `predict_proba` must return probability-like
/// values. The estimation core trims them but never recalibrates.
pub trait PropensityLearner {
    fn fit(&mut self, x: ArrayView2<f64>, labels: ArrayView1<u8>) -> LearnerResult<()>;
    fn predict_proba(&self, x: ArrayView2<f64>) -> LearnerResult<Array1<f64>>;
}

/// Closure-backed [`OutcomeLearner`].
///
/// Holds a `fit` closure producing an opaque fitted state `M` and a
/// `predict` closure consuming it. This is the composition seam for external
/// regressors: no trait object gymnastics on the caller side, just two
/// functions.
///
/// Invariants
/// ----------
/// - `predict` before a successful `fit` returns [`LearnerError::NotFitted`].
/// - Each `fit` call replaces the previous state wholesale.
pub struct FnOutcomeLearner<M, Fit, Predict>
where
    Fit: FnMut(ArrayView2<f64>, ArrayView1<f64>) -> LearnerResult<M>,
    Predict: Fn(&M, ArrayView2<f64>) -> LearnerResult<Array1<f64>>,
{
    fit_fn: Fit,
    predict_fn: Predict,
    state: Option<M>,
}

impl<M, Fit, Predict> FnOutcomeLearner<M, Fit, Predict>
where
    Fit: FnMut(ArrayView2<f64>, ArrayView1<f64>) -> LearnerResult<M>,
    Predict: Fn(&M, ArrayView2<f64>) -> LearnerResult<Array1<f64>>,
{
    pub fn new(fit_fn: Fit, predict_fn: Predict) -> Self {
        Self { fit_fn, predict_fn, state: None }
    }
}

impl<M, Fit, Predict> OutcomeLearner for FnOutcomeLearner<M, Fit, Predict>
where
    Fit: FnMut(ArrayView2<f64>, ArrayView1<f64>) -> LearnerResult<M>,
    Predict: Fn(&M, ArrayView2<f64>) -> LearnerResult<Array1<f64>>,
{
    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> LearnerResult<()> {
        self.state = Some((self.fit_fn)(x, y)?);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> LearnerResult<Array1<f64>> {
        let state = self.state.as_ref().ok_or(LearnerError::NotFitted)?;
        (self.predict_fn)(state, x)
    }
}

/// Closure-backed [`PropensityLearner`]; see [`FnOutcomeLearner`].
pub struct FnPropensityLearner<M, Fit, Predict>
where
    Fit: FnMut(ArrayView2<f64>, ArrayView1<u8>) -> LearnerResult<M>,
    Predict: Fn(&M, ArrayView2<f64>) -> LearnerResult<Array1<f64>>,
{
    fit_fn: Fit,
    predict_fn: Predict,
    state: Option<M>,
}

impl<M, Fit, Predict> FnPropensityLearner<M, Fit, Predict>
where
    Fit: FnMut(ArrayView2<f64>, ArrayView1<u8>) -> LearnerResult<M>,
    Predict: Fn(&M, ArrayView2<f64>) -> LearnerResult<Array1<f64>>,
{
    pub fn new(fit_fn: Fit, predict_fn: Predict) -> Self {
        Self { fit_fn, predict_fn, state: None }
    }
}

impl<M, Fit, Predict> PropensityLearner for FnPropensityLearner<M, Fit, Predict>
where
    Fit: FnMut(ArrayView2<f64>, ArrayView1<u8>) -> LearnerResult<M>,
    Predict: Fn(&M, ArrayView2<f64>) -> LearnerResult<Array1<f64>>,
{
    fn fit(&mut self, x: ArrayView2<f64>, labels: ArrayView1<u8>) -> LearnerResult<()> {
        self.state = Some((self.fit_fn)(x, labels)?);
        Ok(())
    }

    fn predict_proba(&self, x: ArrayView2<f64>) -> LearnerResult<Array1<f64>> {
        let state = self.state.as_ref().ok_or(LearnerError::NotFitted)?;
        (self.predict_fn)(state, x)
    }
}

/// The four nuisance learners a sequence fit consumes: one assignment model
/// and one outcome regression per period.
///
/// Each is retrained from scratch in every fold, so a single instance per
/// slot is enough for the sequential fold loop.
pub struct NuisanceLearners {
    /// Period-1 treatment-assignment model, P(D1 = level | X0).
    pub d1_assignment: Box<dyn PropensityLearner>,
    /// Period-2 treatment-assignment model, P(D2 = level | X0, D1[, X1]).
    pub d2_assignment: Box<dyn PropensityLearner>,
    /// Period-1 outcome regression over the period-2 pseudo-outcomes.
    pub y1_regression: Box<dyn OutcomeLearner>,
    /// Period-2 outcome regression, E[Y | X0, D1[, X1], D2 = level].
    pub y2_regression: Box<dyn OutcomeLearner>,
}

impl NuisanceLearners {
    pub fn new(
        d1_assignment: Box<dyn PropensityLearner>, d2_assignment: Box<dyn PropensityLearner>,
        y1_regression: Box<dyn OutcomeLearner>, y2_regression: Box<dyn OutcomeLearner>,
    ) -> Self {
        Self { d1_assignment, d2_assignment, y1_regression, y2_regression }
    }

    /// Reference configuration: ridge outcome regressions and logistic
    /// assignment models, the bundled counterparts of the pluggable
    /// contract.
    ///
    /// # Errors
    /// Propagates penalty validation from the underlying constructors.
    pub fn linear(penalty: f64) -> LearnerResult<Self> {
        use crate::learners::linear::RidgeRegressor;
        use crate::learners::logistic::LogisticRegression;
        Ok(Self {
            d1_assignment: Box::new(LogisticRegression::new(penalty)?),
            d2_assignment: Box::new(LogisticRegression::new(penalty)?),
            y1_regression: Box::new(RidgeRegressor::new(penalty)?),
            y2_regression: Box::new(RidgeRegressor::new(penalty)?),
        })
    }
}
