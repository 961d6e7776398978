//! Tabular rendering of fitted-sequence results.
//!
//! [`SequenceSummary`] is the formatting collaborator the model state hands
//! out: a plain value with a `Display` implementation, so callers can print
//! it, log it, or ship the fields elsewhere.
use crate::dml::core::nuisance::TrimmingReport;
use crate::dml::core::options::TrimRule;
use crate::dml::core::policy::SequenceKey;
use crate::inference::estimates::ApoEstimate;

/// Point estimate, inference, and trimming diagnostics for one fitted
/// sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceSummary {
    pub key: SequenceKey,
    pub estimate: ApoEstimate,
    pub trimming: TrimmingReport,
    pub n_folds: usize,
}

impl std::fmt::Display for SequenceSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level_pct = self.estimate.confidence_level * 100.0;
        writeln!(f, "Sequence {}", self.key)?;
        writeln!(f, "  APO estimate : {:>12.6}", self.estimate.estimate)?;
        writeln!(f, "  Std. error   : {:>12.6}", self.estimate.std_error)?;
        writeln!(
            f,
            "  {level_pct:.0}% CI       : [{:.6}, {:.6}]",
            self.estimate.ci_lower, self.estimate.ci_upper
        )?;
        writeln!(
            f,
            "  Sample       : {} units ({} folds, {} dropped)",
            self.estimate.n_units, self.n_folds, self.estimate.n_dropped
        )?;
        let rule = match self.trimming.rule {
            TrimRule::Clip => "clip",
            TrimRule::DropUnit => "drop",
        };
        write!(
            f,
            "  Trimming     : eps = {} ({rule}); {} period-1, {} period-2 propensities trimmed",
            self.trimming.threshold, self.trimming.n_trimmed_p1, self.trimming.n_trimmed_p2
        )?;
        if self.trimming.any() {
            write!(f, " [check positivity]")?;
        }
        Ok(())
    }
}
