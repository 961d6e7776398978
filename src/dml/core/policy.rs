//! Treatment sequences and counterfactual target rules.
//!
//! A *sequence* names the pair of realized treatment levels whose average
//! potential outcome is being estimated (`treat-treat`, `control-control`,
//! or any custom labeling); a *target rule* carries the per-unit
//! probabilities with which the counterfactual policy assigns treatment in
//! each period. Static "always treat"/"always control" policies are the
//! degenerate 0/1 special case of a dynamic rule.
//!
//! ## Conventions
//! - Labels `"treat"` / `"control"` map to treatment codes 1 / 0 via
//!   [`TreatmentSequence::new`]; any other label-to-code pairing goes
//!   through [`TreatmentSequence::with_levels`].
//! - Rule weights are stated as probabilities of assigning the **treated
//!   level (code 1)**. The score builder converts them into the weight of
//!   the evaluated sequence level (`g` for level 1, `1 − g` for level 0),
//!   which is why an all-control policy is expressed as `g ≡ 0`.
use crate::dml::errors::{PolicyError, PolicyResult};
use ndarray::Array1;

/// Identifier of a fitted sequence inside the model state: the pair of
/// period labels, e.g. `("treat", "control")`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceKey {
    pub d1treat: String,
    pub d2treat: String,
}

impl SequenceKey {
    pub fn new(d1treat: impl Into<String>, d2treat: impl Into<String>) -> Self {
        Self { d1treat: d1treat.into(), d2treat: d2treat.into() }
    }
}

impl std::fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.d1treat, self.d2treat)
    }
}

/// A two-period treatment sequence: labels for bookkeeping plus the
/// realized treatment codes those labels refer to.
///
/// Immutable once constructed; the codes drive every indicator and
/// propensity target in the cross-fitting pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreatmentSequence {
    pub key: SequenceKey,
    /// Treatment code the period-1 label refers to.
    pub d1_level: u8,
    /// Treatment code the period-2 label refers to.
    pub d2_level: u8,
}

impl TreatmentSequence {
    /// Build a sequence using the binary label convention:
    /// `"control"` → code 0, anything else → code 1.
    ///
    /// # Errors
    /// [`PolicyError::EmptyLabel`] when either label is empty.
    pub fn new(d1treat: &str, d2treat: &str) -> PolicyResult<Self> {
        let level = |label: &str| if label == "control" { 0u8 } else { 1u8 };
        Self::with_levels(d1treat, d2treat, level(d1treat), level(d2treat))
    }

    /// Build a sequence with explicit label-to-code pairs, for panels with
    /// non-binary or non-standard treatment codings.
    ///
    /// # Errors
    /// [`PolicyError::EmptyLabel`] when either label is empty.
    pub fn with_levels(
        d1treat: &str, d2treat: &str, d1_level: u8, d2_level: u8,
    ) -> PolicyResult<Self> {
        if d1treat.is_empty() {
            return Err(PolicyError::EmptyLabel { which: "d1treat" });
        }
        if d2treat.is_empty() {
            return Err(PolicyError::EmptyLabel { which: "d2treat" });
        }
        Ok(Self { key: SequenceKey::new(d1treat, d2treat), d1_level, d2_level })
    }
}

/// Per-unit counterfactual assignment probabilities `(g1t, g2t)`.
///
/// Each entry is the probability that the target policy assigns the treated
/// level in that period; degenerate 0/1 vectors express deterministic
/// (static or dynamic) policies.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRule {
    pub g1t: Array1<f64>,
    pub g2t: Array1<f64>,
}

impl TargetRule {
    /// Construct a validated rule.
    ///
    /// # Errors
    /// - [`PolicyError::EmptyRule`] when the vectors are empty.
    /// - [`PolicyError::WeightLengthMismatch`] when lengths differ.
    /// - [`PolicyError::NonFiniteWeight`] / [`PolicyError::WeightOutOfRange`]
    ///   for the first offending entry (weights are probabilities).
    pub fn new(g1t: Array1<f64>, g2t: Array1<f64>) -> PolicyResult<Self> {
        if g1t.is_empty() {
            return Err(PolicyError::EmptyRule);
        }
        if g2t.len() != g1t.len() {
            return Err(PolicyError::WeightLengthMismatch {
                expected: g1t.len(),
                actual: g2t.len(),
            });
        }
        for (period, weights) in [(1u8, &g1t), (2u8, &g2t)] {
            for (index, &value) in weights.iter().enumerate() {
                if !value.is_finite() {
                    return Err(PolicyError::NonFiniteWeight { period, index, value });
                }
                if !(0.0..=1.0).contains(&value) {
                    return Err(PolicyError::WeightOutOfRange { period, index, value });
                }
            }
        }
        Ok(Self { g1t, g2t })
    }

    /// Static policy assigning treatment to every unit in both periods.
    pub fn always_treat(n_units: usize) -> Self {
        Self { g1t: Array1::ones(n_units), g2t: Array1::ones(n_units) }
    }

    /// Static policy withholding treatment from every unit in both periods.
    pub fn always_control(n_units: usize) -> Self {
        Self { g1t: Array1::zeros(n_units), g2t: Array1::zeros(n_units) }
    }

    /// Number of units the rule covers.
    pub fn n_units(&self) -> usize {
        self.g1t.len()
    }
}

/// Weight of the evaluated sequence level under an assignment probability
/// `g` for the treated level: `g` when the level is treated (code ≠ 0),
/// `1 − g` when it is control (code 0).
pub fn level_weight(g: f64, level: u8) -> f64 {
    if level == 0 {
        1.0 - g
    } else {
        g
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // The binary label convention must map "control" to code 0 and any
    // other label to code 1, while keeping the labels as the key.
    //
    // Given
    // -----
    // - Sequences ("treat", "control") and ("control", "treat").
    //
    // Expect
    // ------
    // - Levels (1, 0) and (0, 1); keys display as "treat-control" etc.
    fn treatment_sequence_maps_binary_labels() {
        let seq = TreatmentSequence::new("treat", "control").unwrap();
        assert_eq!((seq.d1_level, seq.d2_level), (1, 0));
        assert_eq!(seq.key.to_string(), "treat-control");

        let seq = TreatmentSequence::new("control", "treat").unwrap();
        assert_eq!((seq.d1_level, seq.d2_level), (0, 1));
    }

    #[test]
    // Purpose
    // -------
    // Empty labels must be rejected with the offending slot named.
    fn treatment_sequence_rejects_empty_labels() {
        assert_eq!(
            TreatmentSequence::new("", "treat").unwrap_err(),
            PolicyError::EmptyLabel { which: "d1treat" }
        );
        assert_eq!(
            TreatmentSequence::with_levels("treat", "", 1, 2).unwrap_err(),
            PolicyError::EmptyLabel { which: "d2treat" }
        );
    }

    #[test]
    // Purpose
    // -------
    // Target rules are probability vectors: reject length mismatches and
    // out-of-range or non-finite weights with period/index context.
    //
    // Given
    // -----
    // - g1t of length 2 against g2t of length 3.
    // - A weight of 1.5 in period 2.
    // - A NaN weight in period 1.
    //
    // Expect
    // ------
    // - The matching `PolicyError` variant for each case.
    fn target_rule_validates_weights() {
        assert_eq!(
            TargetRule::new(array![0.5, 0.5], array![0.5, 0.5, 0.5]).unwrap_err(),
            PolicyError::WeightLengthMismatch { expected: 2, actual: 3 }
        );
        assert!(matches!(
            TargetRule::new(array![0.5, 0.5], array![0.5, 1.5]).unwrap_err(),
            PolicyError::WeightOutOfRange { period: 2, index: 1, .. }
        ));
        assert!(matches!(
            TargetRule::new(array![f64::NAN, 0.5], array![0.5, 0.5]).unwrap_err(),
            PolicyError::NonFiniteWeight { period: 1, index: 0, .. }
        ));
        assert_eq!(TargetRule::new(array![], array![]).unwrap_err(), PolicyError::EmptyRule);
    }

    #[test]
    // Purpose
    // -------
    // The static constructors are the degenerate special case of a dynamic
    // rule, and `level_weight` converts assignment probabilities into
    // sequence-level weights the way the control sequences require.
    //
    // Given
    // -----
    // - `always_treat(3)` / `always_control(3)`.
    //
    // Expect
    // ------
    // - Treat rule weighs the treated level at 1 and the control level at 0;
    //   control rule is the mirror image.
    fn static_rules_and_level_weight_agree() {
        let treat = TargetRule::always_treat(3);
        let control = TargetRule::always_control(3);
        assert_eq!(treat.n_units(), 3);

        assert_eq!(level_weight(treat.g1t[0], 1), 1.0);
        assert_eq!(level_weight(treat.g1t[0], 0), 0.0);
        assert_eq!(level_weight(control.g1t[0], 0), 1.0);
        assert_eq!(level_weight(control.g1t[0], 1), 0.0);
    }
}
