//! Doubly-robust score construction for two-period sequences.
//!
//! Purpose
//! -------
//! Build the per-unit score whose sample mean estimates the APO of a target
//! policy, working backward from period 2 to period 1 (the two-period
//! analogue of augmented inverse-propensity weighting):
//!
//! ```text
//! ν₂ᵢ = μ₂ᵢ + 1{D2ᵢ = d2} · w₂ᵢ / p₂ᵢ · (Yᵢ − μ₂ᵢ)
//! ψᵢ  = μ₁ᵢ + 1{D1ᵢ = d1} · w₁ᵢ / p₁ᵢ · (ν₂ᵢ − μ₁ᵢ)
//! ```
//!
//! where `w` is the target-rule weight of the sequence level
//! ([`level_weight`]), `p` the trimmed propensity of that level, `μ₂` the
//! period-2 outcome regression and `μ₁` the period-1 regression fitted on
//! the ν₂ pseudo-outcomes. Feeding ν₂ (not the raw Y) into the period-1
//! correction is what propagates the downstream counterfactual backward
//! through the causal chain; each correction term has conditional mean zero
//! when at least one nuisance per period is correctly specified, which
//! yields the Neyman-orthogonality and √n behavior of the estimator.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every propensity entering a division has already been clipped into
//!   `[ε, 1−ε]` by [`clip_to_band`]; the score functions never see a raw
//!   propensity.
//! - All inputs are per-unit scalars; array orchestration lives in the
//!   cross-fitting engine.
use crate::dml::core::policy::level_weight;

/// Clip a propensity into the trimming band `[ε, 1−ε]`.
///
/// Returns the clipped value and whether clipping occurred; callers count
/// the flags into the fitted sequence's trimming report.
pub fn clip_to_band(p: f64, threshold: f64) -> (f64, bool) {
    let lo = threshold;
    let hi = 1.0 - threshold;
    if p < lo {
        (lo, true)
    } else if p > hi {
        (hi, true)
    } else {
        (p, false)
    }
}

/// Period-2 pseudo-outcome ν₂ for one unit.
///
/// The inverse-propensity correction is active only when the realized `d2`
/// matches the sequence's period-2 level; `p2` must already be trimmed.
pub fn period2_pseudo_outcome(
    y: f64, d2: u8, level2: u8, g2t: f64, p2: f64, mu2: f64,
) -> f64 {
    let indicator = if d2 == level2 { 1.0 } else { 0.0 };
    mu2 + indicator * level_weight(g2t, level2) / p2 * (y - mu2)
}

/// Final doubly-robust score ψ for one unit: the period-1 pseudo-outcome.
///
/// Applies the period-1 correction to the regression prediction `mu1`,
/// with the period-2 pseudo-outcome `nu2` as the corrected quantity; `p1`
/// must already be trimmed.
pub fn period1_score(nu2: f64, d1: u8, level1: u8, g1t: f64, p1: f64, mu1: f64) -> f64 {
    let indicator = if d1 == level1 { 1.0 } else { 0.0 };
    mu1 + indicator * level_weight(g1t, level1) / p1 * (nu2 - mu1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Clipping must bind exactly at the band edges and report whether it
    // fired.
    //
    // Given
    // -----
    // - ε = 0.05 with probes below, inside, and above the band.
    //
    // Expect
    // ------
    // - 0.001 → (0.05, true); 0.3 → (0.3, false); 0.999 → (0.95, true);
    //   both boundaries pass through unflagged.
    fn clip_to_band_binds_at_the_edges() {
        assert_eq!(clip_to_band(0.001, 0.05), (0.05, true));
        assert_eq!(clip_to_band(0.3, 0.05), (0.3, false));
        assert_eq!(clip_to_band(0.999, 0.05), (0.95, true));
        assert_eq!(clip_to_band(0.05, 0.05), (0.05, false));
        assert_eq!(clip_to_band(0.95, 0.05), (0.95, false));
    }

    #[test]
    // Purpose
    // -------
    // When the realized treatment does not match the sequence level, the
    // correction must vanish and the pseudo-outcome equal the regression
    // prediction.
    //
    // Given
    // -----
    // - d2 = 0 against level 1, and d1 = 0 against level 1.
    //
    // Expect
    // ------
    // - ν₂ = μ₂ and ψ = μ₁ regardless of y, g, p.
    fn corrections_gate_on_realized_treatment() {
        let nu2 = period2_pseudo_outcome(10.0, 0, 1, 1.0, 0.5, 3.0);
        assert!((nu2 - 3.0).abs() < 1e-12);

        let score = period1_score(7.0, 0, 1, 1.0, 0.5, 2.0);
        assert!((score - 2.0).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // With matching treatment, unit policy weight, and a perfect outcome
    // model, the correction term is exactly the weighted residual.
    //
    // Given
    // -----
    // - y = 10, μ₂ = 4, p₂ = 0.5, g = 1, level 1 matched.
    //
    // Expect
    // ------
    // - ν₂ = 4 + (10 − 4)/0.5 = 16.
    fn active_correction_weights_residual_by_inverse_propensity() {
        let nu2 = period2_pseudo_outcome(10.0, 1, 1, 1.0, 0.5, 4.0);
        assert!((nu2 - 16.0).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Control sequences receive weight `1 − g`: an all-control rule
    // (g ≡ 0) must weight a matched control unit fully, and an all-treat
    // rule (g ≡ 1) must zero it out.
    //
    // Given
    // -----
    // - d2 = 0, level 0, μ₂ = 4, y = 10, p₂ = 0.5.
    //
    // Expect
    // ------
    // - g = 0 → ν₂ = 16; g = 1 → ν₂ = μ₂ = 4.
    fn control_level_flips_the_policy_weight() {
        let full = period2_pseudo_outcome(10.0, 0, 0, 0.0, 0.5, 4.0);
        assert!((full - 16.0).abs() < 1e-12);

        let zeroed = period2_pseudo_outcome(10.0, 0, 0, 1.0, 0.5, 4.0);
        assert!((zeroed - 4.0).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // The period-1 score corrects toward the period-2 pseudo-outcome, not
    // the raw outcome: the recursion is what distinguishes dynamic DML from
    // two stacked single-period estimates.
    //
    // Given
    // -----
    // - ν₂ = 16, μ₁ = 10, p₁ = 0.8, matched treatment, g = 1.
    //
    // Expect
    // ------
    // - ψ = 10 + (16 − 10)/0.8 = 17.5.
    fn period1_score_corrects_toward_pseudo_outcome() {
        let score = period1_score(16.0, 1, 1, 1.0, 0.8, 10.0);
        assert!((score - 17.5).abs() < 1e-12);
    }
}
