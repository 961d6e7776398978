//! Cross-fitted nuisance estimation for two-period sequences.
//!
//! Purpose
//! -------
//! Drive the per-fold, two-phase nuisance pipeline that produces held-out
//! propensities, outcome regressions, pseudo-outcomes, and final scores for
//! one treatment sequence. For every fold k, models train only on the
//! complementary folds and their predictions are written only into the
//! held-out units' slots, so each unit is scored exclusively with nuisances
//! it never influenced.
//!
//! Key behaviors
//! -------------
//! - **Phase A (period 2, always first)**: fit the period-2 assignment
//!   model and outcome regression on the complement, predict over the whole
//!   panel, trim, and form the period-2 pseudo-outcomes ν₂ for every unit.
//!   Training units' ν₂ become phase B's regression targets; held-out
//!   units' ν₂ feed the final score. This ordering is a hard dependency of
//!   the recursive construction, not a performance choice.
//! - **Phase B (period 1)**: fit the period-1 assignment model on the
//!   complement and the period-1 regression on the complement units that
//!   realized the sequence's first-period level (targets: stored ν₂),
//!   then predict both on the held-out fold only.
//! - Every propensity is clipped into `[ε, 1−ε]` before any division;
//!   held-out clips are counted into a [`TrimmingReport`] and, under
//!   [`TrimRule::DropUnit`], flag the unit for exclusion from the
//!   estimation sample.
//! - Learner failures propagate as
//!   [`DmlError::LearnerFailure`] with fold, period, and stage attached.
//!
//! Invariants & assumptions
//! ------------------------
//! - `data`, `rule`, and `folds` cover the same units (checked upstream by
//!   the model state).
//! - The fold loop is written to be data-parallel by structure: iteration k
//!   reads only shared immutable inputs and writes only fold-k slots of the
//!   output arrays, so a parallel executor would need no synchronization
//!   beyond the final merge.
//!
//! Testing notes
//! -------------
//! - Unit tests wire deterministic closure learners (constant propensity,
//!   training-mean regression) to pin down the recursion: period-1 targets
//!   must be pseudo-outcomes, trimming must count and clip, and an empty
//!   treated subsample must fail with fold/period context.
use crate::dml::core::data::PanelData;
use crate::dml::core::folds::FoldAssignment;
use crate::dml::core::options::{DmlOptions, TrimRule};
use crate::dml::core::policy::{TargetRule, TreatmentSequence};
use crate::dml::core::scores::{clip_to_band, period1_score, period2_pseudo_outcome};
use crate::dml::errors::{DmlError, DmlResult, NuisanceStage};
use crate::learners::traits::NuisanceLearners;
use ndarray::{Array1, Array2, Axis};

/// Held-out, cross-fitted nuisance predictions for one sequence, indexed by
/// unit. Propensities are stored post-trimming.
#[derive(Debug, Clone, PartialEq)]
pub struct NuisancePredictions {
    /// Trimmed period-1 propensity of the sequence's first-period level.
    pub p1: Array1<f64>,
    /// Trimmed period-2 propensity of the sequence's second-period level.
    pub p2: Array1<f64>,
    /// Period-1 outcome regression prediction (over pseudo-outcomes).
    pub mu1: Array1<f64>,
    /// Period-2 outcome regression prediction.
    pub mu2: Array1<f64>,
    /// Period-2 pseudo-outcome ν₂.
    pub nu2: Array1<f64>,
}

/// Record of propensity trimming during one sequence fit.
///
/// Counts cover held-out predictions only (the ones entering scores);
/// surfaced through summaries and never silently absorbed. A non-zero
/// count signals potential positivity violations in the data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimmingReport {
    pub rule: TrimRule,
    pub threshold: f64,
    /// Held-out period-1 propensities outside `[ε, 1−ε]`.
    pub n_trimmed_p1: usize,
    /// Held-out period-2 propensities outside `[ε, 1−ε]`.
    pub n_trimmed_p2: usize,
}

impl TrimmingReport {
    /// Whether any held-out propensity required trimming.
    pub fn any(&self) -> bool {
        self.n_trimmed_p1 > 0 || self.n_trimmed_p2 > 0
    }
}

/// Everything one sequence fit produces before aggregation: nuisances,
/// per-unit scores, the kept-mask (all true under [`TrimRule::Clip`]), and
/// the trimming report.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossFitOutput {
    pub nuisances: NuisancePredictions,
    pub scores: Array1<f64>,
    pub kept: Vec<bool>,
    pub report: TrimmingReport,
}

/// Run the full cross-fitting pipeline for one sequence.
///
/// See the module docs for the two-phase structure. The caller (the model
/// state) validates panel/rule/fold alignment and the dynamic-confounding
/// prerequisite before invoking this.
pub(crate) fn cross_fit_sequence(
    data: &PanelData, sequence: &TreatmentSequence, rule: &TargetRule, folds: &FoldAssignment,
    options: &DmlOptions, learners: &mut NuisanceLearners,
) -> DmlResult<CrossFitOutput> {
    let n = data.n_units();
    let threshold = options.trimming.threshold;

    // Period-2 conditioning set: [X0 | D1] plus X1 under dynamic
    // confounding. Built once; per-fold training rows are selected views.
    let features2 = assemble_period2_features(data, options.dynamic_confounding);
    let labels1: Array1<u8> =
        data.d1.mapv(|d| if d == sequence.d1_level { 1u8 } else { 0u8 });
    let labels2: Array1<u8> =
        data.d2.mapv(|d| if d == sequence.d2_level { 1u8 } else { 0u8 });

    let mut p1 = Array1::<f64>::zeros(n);
    let mut p2 = Array1::<f64>::zeros(n);
    let mut mu1 = Array1::<f64>::zeros(n);
    let mut mu2 = Array1::<f64>::zeros(n);
    let mut nu2 = Array1::<f64>::zeros(n);
    let mut outside_band = vec![false; n];
    let mut n_trimmed_p1 = 0usize;
    let mut n_trimmed_p2 = 0usize;

    for fold in 0..folds.n_folds() {
        let train = folds.training_indices(fold);
        let test = folds.held_out_indices(fold);
        let learner_err = |period: u8, stage: NuisanceStage| {
            move |source| DmlError::LearnerFailure { fold, period, stage, source }
        };

        // ---- Phase A: period 2 ----
        let x2_train = features2.select(Axis(0), &train);
        let labels2_train = labels2.select(Axis(0), &train);
        learners
            .d2_assignment
            .fit(x2_train.view(), labels2_train.view())
            .map_err(learner_err(2, NuisanceStage::Assignment))?;
        let p2_fold = learners
            .d2_assignment
            .predict_proba(features2.view())
            .map_err(learner_err(2, NuisanceStage::Assignment))?;

        let treated2: Vec<usize> =
            train.iter().copied().filter(|&i| data.d2[i] == sequence.d2_level).collect();
        if treated2.is_empty() {
            return Err(DmlError::EmptyTrainingSubsample { fold, period: 2 });
        }
        let x2_outcome = features2.select(Axis(0), &treated2);
        let y_outcome = data.y.select(Axis(0), &treated2);
        learners
            .y2_regression
            .fit(x2_outcome.view(), y_outcome.view())
            .map_err(learner_err(2, NuisanceStage::OutcomeRegression))?;
        let mu2_fold = learners
            .y2_regression
            .predict(features2.view())
            .map_err(learner_err(2, NuisanceStage::OutcomeRegression))?;

        // Pseudo-outcomes over the whole panel: training entries become
        // phase B targets, held-out entries feed the final score. Training
        // propensities are clipped for division safety but only held-out
        // clips are counted.
        let mut nu2_fold = Array1::<f64>::zeros(n);
        for i in 0..n {
            let (p2_clipped, _) = clip_to_band(p2_fold[i], threshold);
            nu2_fold[i] = period2_pseudo_outcome(
                data.y[i],
                data.d2[i],
                sequence.d2_level,
                rule.g2t[i],
                p2_clipped,
                mu2_fold[i],
            );
        }

        // ---- Phase B: period 1 ----
        let x1_train = data.x0.select(Axis(0), &train);
        let labels1_train = labels1.select(Axis(0), &train);
        learners
            .d1_assignment
            .fit(x1_train.view(), labels1_train.view())
            .map_err(learner_err(1, NuisanceStage::Assignment))?;

        let treated1: Vec<usize> =
            train.iter().copied().filter(|&i| data.d1[i] == sequence.d1_level).collect();
        if treated1.is_empty() {
            return Err(DmlError::EmptyTrainingSubsample { fold, period: 1 });
        }
        let x1_outcome = data.x0.select(Axis(0), &treated1);
        let nu2_targets = nu2_fold.select(Axis(0), &treated1);
        learners
            .y1_regression
            .fit(x1_outcome.view(), nu2_targets.view())
            .map_err(learner_err(1, NuisanceStage::OutcomeRegression))?;

        let x0_test = data.x0.select(Axis(0), &test);
        let p1_test = learners
            .d1_assignment
            .predict_proba(x0_test.view())
            .map_err(learner_err(1, NuisanceStage::Assignment))?;
        let mu1_test = learners
            .y1_regression
            .predict(x0_test.view())
            .map_err(learner_err(1, NuisanceStage::OutcomeRegression))?;

        // ---- Merge fold-k held-out predictions ----
        for (slot, &unit) in test.iter().enumerate() {
            let (p1_clipped, p1_hit) = clip_to_band(p1_test[slot], threshold);
            let (p2_clipped, p2_hit) = clip_to_band(p2_fold[unit], threshold);
            if p1_hit {
                n_trimmed_p1 += 1;
            }
            if p2_hit {
                n_trimmed_p2 += 1;
            }
            outside_band[unit] = p1_hit || p2_hit;
            p1[unit] = p1_clipped;
            p2[unit] = p2_clipped;
            mu1[unit] = mu1_test[slot];
            mu2[unit] = mu2_fold[unit];
            nu2[unit] = nu2_fold[unit];
        }
    }

    let mut scores = Array1::<f64>::zeros(n);
    for i in 0..n {
        scores[i] = period1_score(
            nu2[i],
            data.d1[i],
            sequence.d1_level,
            rule.g1t[i],
            p1[i],
            mu1[i],
        );
    }

    let kept = match options.trimming.rule {
        TrimRule::Clip => vec![true; n],
        TrimRule::DropUnit => outside_band.iter().map(|&hit| !hit).collect(),
    };

    Ok(CrossFitOutput {
        nuisances: NuisancePredictions { p1, p2, mu1, mu2, nu2 },
        scores,
        kept,
        report: TrimmingReport {
            rule: options.trimming.rule,
            threshold,
            n_trimmed_p1,
            n_trimmed_p2,
        },
    })
}

/// Stack the period-2 conditioning set `[X0 | D1 (| X1)]` into one matrix.
fn assemble_period2_features(data: &PanelData, dynamic_confounding: bool) -> Array2<f64> {
    let n = data.n_units();
    let p0 = data.x0.ncols();
    let p1 = if dynamic_confounding { data.x1.ncols() } else { 0 };
    let mut features = Array2::<f64>::zeros((n, p0 + 1 + p1));
    features.slice_mut(ndarray::s![.., ..p0]).assign(&data.x0);
    for (i, &d) in data.d1.iter().enumerate() {
        features[[i, p0]] = f64::from(d);
    }
    if dynamic_confounding {
        features.slice_mut(ndarray::s![.., p0 + 1..]).assign(&data.x1);
    }
    features
}
