//! Two-period dynamic-DML model state.
//!
//! [`Dml2Periods`] owns the global configuration, the shared fold
//! assignment, and every fitted sequence for one dataset. It enforces the
//! fit-before-compute ordering, keeps the fold assignment immutable after
//! first use (so cross-sequence covariances are computed on paired,
//! same-fold observations), and stores fitted sequences all-or-nothing: a
//! failed fit leaves the state exactly as it was.
//!
//! ## Typical flow
//! 1. `Dml2Periods::new(options)`
//! 2. `init_sequence("treat", "treat")` (optional pre-registration)
//! 3. `fit_sequence("treat", "treat", &data, &rule, &mut learners)`
//! 4. `compute_apo(..)` / `compute_ate(..)` / `sequence_summary(..)`
use crate::dml::core::data::PanelData;
use crate::dml::core::folds::FoldAssignment;
use crate::dml::core::nuisance::{
    cross_fit_sequence, NuisancePredictions, TrimmingReport,
};
use crate::dml::core::options::DmlOptions;
use crate::dml::core::policy::{SequenceKey, TargetRule, TreatmentSequence};
use crate::dml::core::summary::SequenceSummary;
use crate::dml::errors::{DmlError, DmlResult};
use crate::inference::estimates::{ApoEstimate, AteEstimate};
use crate::learners::traits::NuisanceLearners;
use ndarray::Array1;
use std::collections::{BTreeMap, BTreeSet};

/// One fitted sequence: target specification, cross-fitted nuisances,
/// per-unit scores, and the aggregated estimate.
///
/// Immutable once stored; re-fitting the same key replaces the whole value
/// with a freshly constructed one.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedSequence {
    pub sequence: TreatmentSequence,
    pub rule: TargetRule,
    pub nuisances: NuisancePredictions,
    /// Per-unit doubly-robust scores, aligned with the panel.
    pub scores: Array1<f64>,
    /// Units entering the estimation sample (all true under clip trimming).
    pub kept: Vec<bool>,
    pub trimming: TrimmingReport,
    pub estimate: ApoEstimate,
    pub n_folds: usize,
}

/// `Dml2Periods` — the model state orchestrating sequence fits.
///
/// Key behaviors
/// -------------
/// - Creates the shared [`FoldAssignment`] on the first fit (seeded by
///   `options.random_state`) and checks every later panel against it;
///   sequences fitted by one state are therefore always covariance-
///   compatible.
/// - The sequence map is append/replace per key and never partially
///   written.
/// - `compute_apo`, `compute_ate`, and `sequence_summary` fail with
///   [`DmlError::SequenceNotFitted`] rather than returning defaults.
#[derive(Debug)]
pub struct Dml2Periods {
    options: DmlOptions,
    folds: Option<FoldAssignment>,
    registered: BTreeSet<SequenceKey>,
    sequences: BTreeMap<SequenceKey, FittedSequence>,
}

impl Dml2Periods {
    /// Create an empty model state from validated options.
    pub fn new(options: DmlOptions) -> Self {
        Self { options, folds: None, registered: BTreeSet::new(), sequences: BTreeMap::new() }
    }

    /// The configuration this state was created with.
    pub fn options(&self) -> &DmlOptions {
        &self.options
    }

    /// The shared fold assignment, once the first sequence has been fitted.
    pub fn fold_assignment(&self) -> Option<&FoldAssignment> {
        self.folds.as_ref()
    }

    /// Register a sequence key ahead of fitting. Idempotent; fitting an
    /// unregistered key registers it implicitly.
    ///
    /// # Errors
    /// Propagates label validation from [`TreatmentSequence::new`].
    pub fn init_sequence(&mut self, d1treat: &str, d2treat: &str) -> DmlResult<()> {
        let sequence = TreatmentSequence::new(d1treat, d2treat)?;
        self.registered.insert(sequence.key);
        Ok(())
    }

    /// Keys registered so far (fitted or not).
    pub fn registered_sequences(&self) -> impl Iterator<Item = &SequenceKey> {
        self.registered.iter()
    }

    /// Whether a fitted sequence is stored under `(d1treat, d2treat)`.
    pub fn is_fitted(&self, d1treat: &str, d2treat: &str) -> bool {
        self.sequences.contains_key(&SequenceKey::new(d1treat, d2treat))
    }

    /// Borrow a stored fit, if any.
    pub fn fitted_sequence(&self, d1treat: &str, d2treat: &str) -> Option<&FittedSequence> {
        self.sequences.get(&SequenceKey::new(d1treat, d2treat))
    }

    /// Run the full cross-fitting and scoring pipeline for one sequence
    /// under the binary label convention (`"control"` → code 0, anything
    /// else → code 1) and store the result.
    ///
    /// See [`Dml2Periods::fit_sequence_spec`] for custom label-to-code
    /// pairings.
    pub fn fit_sequence(
        &mut self, d1treat: &str, d2treat: &str, data: &PanelData, rule: &TargetRule,
        learners: &mut NuisanceLearners,
    ) -> DmlResult<()> {
        let sequence = TreatmentSequence::new(d1treat, d2treat)?;
        self.fit_sequence_spec(sequence, data, rule, learners)
    }

    /// Run the pipeline for an explicitly specified sequence.
    ///
    /// ## Steps
    /// 1. Validate panel/rule alignment and the dynamic-confounding
    ///    prerequisite.
    /// 2. Create the shared fold assignment on first use, or check the
    ///    panel length against the stored one (`FoldMismatch` otherwise).
    /// 3. Cross-fit nuisances (period 2 before period 1 in every fold) and
    ///    build the per-unit scores.
    /// 4. Aggregate kept scores into an [`ApoEstimate`] and store the
    ///    [`FittedSequence`] under its key.
    ///
    /// Nothing is stored on failure.
    ///
    /// # Errors
    /// - Validation: [`DmlError::LengthMismatch`],
    ///   [`DmlError::MissingIntermediateCovariates`],
    ///   [`DmlError::InvalidFoldCount`], [`DmlError::FoldMismatch`].
    /// - Estimation: [`DmlError::EmptyTrainingSubsample`],
    ///   [`DmlError::AllUnitsTrimmed`], [`DmlError::LearnerFailure`].
    pub fn fit_sequence_spec(
        &mut self, sequence: TreatmentSequence, data: &PanelData, rule: &TargetRule,
        learners: &mut NuisanceLearners,
    ) -> DmlResult<()> {
        let n = data.n_units();
        if rule.n_units() != n {
            return Err(DmlError::LengthMismatch {
                field: "target rule",
                expected: n,
                actual: rule.n_units(),
            });
        }
        if self.options.dynamic_confounding && !data.has_intermediate_covariates() {
            return Err(DmlError::MissingIntermediateCovariates);
        }

        // Shared fold assignment: created once, then enforced.
        let folds = match &self.folds {
            Some(existing) => {
                if existing.n_units() != n {
                    return Err(DmlError::FoldMismatch {
                        expected: existing.n_units(),
                        actual: n,
                    });
                }
                existing.clone()
            }
            None => FoldAssignment::new(n, self.options.n_folds, self.options.random_state)?,
        };

        let output =
            cross_fit_sequence(data, &sequence, rule, &folds, &self.options, learners)?;

        let kept_scores: Array1<f64> = output
            .scores
            .iter()
            .zip(output.kept.iter())
            .filter_map(|(&s, &keep)| keep.then_some(s))
            .collect();
        let n_dropped = n - kept_scores.len();
        let estimate = ApoEstimate::from_scores(
            kept_scores.view(),
            n_dropped,
            self.options.confidence_level,
        )?;

        if self.options.verbose && output.report.any() {
            eprintln!(
                "fit_sequence {}: trimmed {} period-1 and {} period-2 propensities at eps = {}",
                sequence.key,
                output.report.n_trimmed_p1,
                output.report.n_trimmed_p2,
                output.report.threshold
            );
        }

        let key = sequence.key.clone();
        let fitted = FittedSequence {
            sequence,
            rule: rule.clone(),
            nuisances: output.nuisances,
            scores: output.scores,
            kept: output.kept,
            trimming: output.report,
            estimate,
            n_folds: folds.n_folds(),
        };
        if self.folds.is_none() {
            self.folds = Some(folds);
        }
        self.registered.insert(key.clone());
        self.sequences.insert(key, fitted);
        Ok(())
    }

    /// Stored APO estimate for a fitted sequence.
    ///
    /// # Errors
    /// [`DmlError::SequenceNotFitted`] when no fit is stored under the key.
    pub fn compute_apo(&self, d1treat: &str, d2treat: &str) -> DmlResult<ApoEstimate> {
        self.lookup(d1treat, d2treat).map(|fitted| fitted.estimate.clone())
    }

    /// Contrast two fitted sequences: point estimate as the exact
    /// difference of stored APOs, variance from the paired per-unit scores
    /// over the jointly kept units.
    ///
    /// # Errors
    /// - [`DmlError::SequenceNotFitted`] for either key.
    /// - [`DmlError::FoldMismatch`] if the stored score vectors are not
    ///   paired (defensive; cannot happen for fits from one state).
    /// - [`DmlError::AllUnitsTrimmed`] when no unit is kept in both.
    pub fn compute_ate(
        &self, d1treat: &str, d2treat: &str, d1control: &str, d2control: &str,
    ) -> DmlResult<AteEstimate> {
        let treat = self.lookup(d1treat, d2treat)?;
        let control = self.lookup(d1control, d2control)?;
        if treat.scores.len() != control.scores.len() {
            return Err(DmlError::FoldMismatch {
                expected: treat.scores.len(),
                actual: control.scores.len(),
            });
        }

        let mut paired_treat = Vec::with_capacity(treat.scores.len());
        let mut paired_control = Vec::with_capacity(control.scores.len());
        for i in 0..treat.scores.len() {
            if treat.kept[i] && control.kept[i] {
                paired_treat.push(treat.scores[i]);
                paired_control.push(control.scores[i]);
            }
        }
        AteEstimate::from_paired_scores(
            treat.estimate.estimate,
            control.estimate.estimate,
            Array1::from(paired_treat).view(),
            Array1::from(paired_control).view(),
            self.options.confidence_level,
        )
    }

    /// Render the summary of a fitted sequence.
    ///
    /// # Errors
    /// [`DmlError::SequenceNotFitted`] when no fit is stored under the key.
    pub fn sequence_summary(&self, d1treat: &str, d2treat: &str) -> DmlResult<SequenceSummary> {
        let fitted = self.lookup(d1treat, d2treat)?;
        Ok(SequenceSummary {
            key: fitted.sequence.key.clone(),
            estimate: fitted.estimate.clone(),
            trimming: fitted.trimming,
            n_folds: fitted.n_folds,
        })
    }

    fn lookup(&self, d1treat: &str, d2treat: &str) -> DmlResult<&FittedSequence> {
        let key = SequenceKey::new(d1treat, d2treat);
        self.sequences
            .get(&key)
            .ok_or_else(|| DmlError::SequenceNotFitted { key: key.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dml::core::options::Trimming;
    use crate::learners::errors::{LearnerError, LearnerResult};
    use crate::learners::traits::{FnOutcomeLearner, FnPropensityLearner};
    use ndarray::{array, ArrayView1, ArrayView2};

    fn constant_propensity(p: f64) -> Box<dyn crate::learners::traits::PropensityLearner> {
        Box::new(FnPropensityLearner::new(
            move |_x: ArrayView2<f64>, _l: ArrayView1<u8>| -> LearnerResult<f64> { Ok(p) },
            |state: &f64, x: ArrayView2<f64>| Ok(Array1::from_elem(x.nrows(), *state)),
        ))
    }

    fn training_mean_regression() -> Box<dyn crate::learners::traits::OutcomeLearner> {
        Box::new(FnOutcomeLearner::new(
            |_x: ArrayView2<f64>, y: ArrayView1<f64>| -> LearnerResult<f64> {
                Ok(y.mean().unwrap_or(0.0))
            },
            |state: &f64, x: ArrayView2<f64>| Ok(Array1::from_elem(x.nrows(), *state)),
        ))
    }

    fn mean_learners() -> NuisanceLearners {
        NuisanceLearners::new(
            constant_propensity(0.5),
            constant_propensity(0.5),
            training_mean_regression(),
            training_mean_regression(),
        )
    }

    fn mixed_panel() -> PanelData {
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let d1 = array![1u8, 0, 1, 0, 1, 0, 1, 0];
        let d2 = array![1u8, 0, 1, 0, 1, 0, 1, 0];
        let x0 = array![
            [0.0],
            [1.0],
            [2.0],
            [3.0],
            [4.0],
            [5.0],
            [6.0],
            [7.0]
        ];
        let x1 = x0.clone();
        PanelData::new(y, d1, d2, x0, x1).unwrap()
    }

    fn quiet_options() -> DmlOptions {
        DmlOptions::new(true, 2, Trimming::default(), 0, 0.95, false).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // The ordering invariant: every compute entry point must fail with
    // `SequenceNotFitted` before `fit_sequence`, including for registered
    // but unfitted keys.
    //
    // Given
    // -----
    // - A fresh model with "treat"-"treat" registered via `init_sequence`.
    //
    // Expect
    // ------
    // - `compute_apo`, `compute_ate`, and `sequence_summary` all return
    //   `SequenceNotFitted` naming the missing key.
    fn compute_before_fit_always_fails() {
        let mut model = Dml2Periods::new(quiet_options());
        model.init_sequence("treat", "treat").unwrap();

        assert!(matches!(
            model.compute_apo("treat", "treat").unwrap_err(),
            DmlError::SequenceNotFitted { .. }
        ));
        assert!(matches!(
            model.sequence_summary("treat", "treat").unwrap_err(),
            DmlError::SequenceNotFitted { .. }
        ));
        assert!(matches!(
            model.compute_ate("treat", "treat", "control", "control").unwrap_err(),
            DmlError::SequenceNotFitted { .. }
        ));
    }

    #[test]
    // Purpose
    // -------
    // A successful fit stores an immutable sequence; compute_apo returns
    // the stored estimate and the ATE identity holds exactly.
    //
    // Given
    // -----
    // - A mixed panel, treat-treat and control-control fits with mean
    //   learners.
    //
    // Expect
    // ------
    // - `compute_ate` equals the APO difference exactly and its variance
    //   does not exceed the naive sum when the covariance is non-negative.
    fn ate_identity_holds_on_stored_estimates() {
        let data = mixed_panel();
        let mut model = Dml2Periods::new(quiet_options());
        let mut learners = mean_learners();

        model
            .fit_sequence("treat", "treat", &data, &TargetRule::always_treat(8), &mut learners)
            .unwrap();
        model
            .fit_sequence(
                "control",
                "control",
                &data,
                &TargetRule::always_control(8),
                &mut learners,
            )
            .unwrap();

        let apo_tt = model.compute_apo("treat", "treat").unwrap();
        let apo_cc = model.compute_apo("control", "control").unwrap();
        let ate = model.compute_ate("treat", "treat", "control", "control").unwrap();
        assert_eq!(ate.estimate, apo_tt.estimate - apo_cc.estimate);
        if ate.covariance >= 0.0 {
            assert!(ate.variance <= apo_tt.variance + apo_cc.variance + 1e-15);
        }
    }

    #[test]
    // Purpose
    // -------
    // The shared fold assignment is created by the first fit and panels of
    // a different length are rejected afterwards.
    //
    // Given
    // -----
    // - An 8-unit fit followed by a 6-unit fit attempt on the same state.
    //
    // Expect
    // ------
    // - The first fit populates `fold_assignment()`; the second fails with
    //   `FoldMismatch { expected: 8, actual: 6 }` and stores nothing.
    fn shared_folds_reject_mismatched_panels() {
        let data = mixed_panel();
        let mut model = Dml2Periods::new(quiet_options());
        let mut learners = mean_learners();
        model
            .fit_sequence("treat", "treat", &data, &TargetRule::always_treat(8), &mut learners)
            .unwrap();
        assert_eq!(model.fold_assignment().unwrap().n_units(), 8);

        let short = PanelData::new(
            array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            array![1u8, 0, 1, 0, 1, 0],
            array![1u8, 0, 1, 0, 1, 0],
            array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0]],
            array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0]],
        )
        .unwrap();
        let err = model
            .fit_sequence("control", "control", &short, &TargetRule::always_control(6), &mut learners)
            .unwrap_err();
        assert_eq!(err, DmlError::FoldMismatch { expected: 8, actual: 6 });
        assert!(!model.is_fitted("control", "control"));
    }

    #[test]
    // Purpose
    // -------
    // Validation failures surface before any fitting: rule/panel length
    // mismatch, missing X1 under dynamic confounding, and K > n.
    //
    // Expect
    // ------
    // - The matching error for each case, with nothing stored.
    fn fit_sequence_validates_before_fitting() {
        let data = mixed_panel();
        let mut model = Dml2Periods::new(quiet_options());
        let mut learners = mean_learners();

        let err = model
            .fit_sequence("treat", "treat", &data, &TargetRule::always_treat(5), &mut learners)
            .unwrap_err();
        assert!(matches!(err, DmlError::LengthMismatch { field: "target rule", .. }));

        let no_x1 = PanelData::new(
            data.y.clone(),
            data.d1.clone(),
            data.d2.clone(),
            data.x0.clone(),
            ndarray::Array2::zeros((8, 0)),
        )
        .unwrap();
        let err = model
            .fit_sequence("treat", "treat", &no_x1, &TargetRule::always_treat(8), &mut learners)
            .unwrap_err();
        assert_eq!(err, DmlError::MissingIntermediateCovariates);

        let many_folds =
            Dml2Periods::new(DmlOptions::new(true, 20, Trimming::default(), 0, 0.95, false).unwrap());
        let mut model = many_folds;
        let err = model
            .fit_sequence("treat", "treat", &data, &TargetRule::always_treat(8), &mut learners)
            .unwrap_err();
        assert!(matches!(err, DmlError::InvalidFoldCount { n_folds: 20, n_units: Some(8) }));
        assert!(!model.is_fitted("treat", "treat"));
    }

    #[test]
    // Purpose
    // -------
    // Re-fitting a key replaces the stored sequence wholesale rather than
    // patching it.
    //
    // Given
    // -----
    // - Two fits of the same key with different target rules.
    //
    // Expect
    // ------
    // - The stored rule after the second fit is the second rule.
    fn refitting_replaces_the_stored_sequence() {
        let data = mixed_panel();
        let mut model = Dml2Periods::new(quiet_options());
        let mut learners = mean_learners();

        model
            .fit_sequence("treat", "treat", &data, &TargetRule::always_treat(8), &mut learners)
            .unwrap();
        let first_rule = model.fitted_sequence("treat", "treat").unwrap().rule.clone();

        let half = TargetRule::new(Array1::from_elem(8, 0.5), Array1::from_elem(8, 0.5)).unwrap();
        model.fit_sequence("treat", "treat", &data, &half, &mut learners).unwrap();
        let second_rule = model.fitted_sequence("treat", "treat").unwrap().rule.clone();

        assert_ne!(first_rule, second_rule);
        assert_eq!(second_rule, half);
    }

    #[test]
    // Purpose
    // -------
    // Learner failures propagate with fold/period/stage context and leave
    // the state unchanged.
    //
    // Given
    // -----
    // - A period-2 assignment learner that always fails.
    //
    // Expect
    // ------
    // - `LearnerFailure { period: 2, stage: Assignment, .. }` and no stored
    //   fit.
    fn learner_failures_carry_context_and_store_nothing() {
        let data = mixed_panel();
        let mut model = Dml2Periods::new(quiet_options());
        let failing = Box::new(FnPropensityLearner::new(
            |_x: ArrayView2<f64>, _l: ArrayView1<u8>| -> LearnerResult<f64> {
                Err(LearnerError::External { detail: "boom".to_string() })
            },
            |state: &f64, x: ArrayView2<f64>| Ok(Array1::from_elem(x.nrows(), *state)),
        ));
        let mut learners = NuisanceLearners::new(
            constant_propensity(0.5),
            failing,
            training_mean_regression(),
            training_mean_regression(),
        );

        let err = model
            .fit_sequence("treat", "treat", &data, &TargetRule::always_treat(8), &mut learners)
            .unwrap_err();
        assert!(matches!(
            err,
            DmlError::LearnerFailure {
                period: 2,
                stage: crate::dml::errors::NuisanceStage::Assignment,
                ..
            }
        ));
        assert!(!model.is_fitted("treat", "treat"));
    }
}
