//! Lift Record - derived comparison of a treatment against the control

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decision emitted for a treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Significant improvement beyond the adopt band: roll out.
    Adopt,
    /// Significant degradation beyond the reject band: drop.
    Reject,
    /// Not enough evidence either way.
    ContinueTesting,
}

impl Recommendation {
    /// Get recommendation name as string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Adopt => "adopt",
            Self::Reject => "reject",
            Self::ContinueTesting => "continue_testing",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-variant aggregate that feeds a lift comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmSummary {
    /// Variant ID.
    pub variant_id: String,
    /// Mean observed value (0 with no observations).
    pub mean: f64,
    /// Number of observations.
    pub sample_size: usize,
}

/// Lift Result compares one treatment against the control on one metric.
///
/// Lift results are pure derived views: they are computed on demand and
/// never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftResult {
    /// Experiment ID.
    pub experiment_id: String,
    /// Metric ID.
    pub metric_id: String,
    /// Control arm aggregate.
    pub control: ArmSummary,
    /// Treatment arm aggregate.
    pub treatment: ArmSummary,
    /// `treatment.mean - control.mean`.
    pub absolute_lift: f64,
    /// `absolute_lift / control.mean * 100`, or 0 when the control mean is 0.
    pub relative_lift_pct: f64,
    /// `1 - p`, or 0 when significance was not computed.
    pub confidence_level: f64,
    /// Whether `confidence_level` reached the configured threshold.
    pub is_significant: bool,
    /// Two-tailed p-value, when computed.
    pub p_value: Option<f64>,
    /// Decision for the treatment.
    pub recommendation: Recommendation,
    /// When the result was computed.
    pub calculated_at: DateTime<Utc>,
}

impl LiftResult {
    /// Control variant ID.
    #[must_use]
    pub fn control_variant_id(&self) -> &str {
        &self.control.variant_id
    }

    /// Treatment variant ID.
    #[must_use]
    pub fn treatment_variant_id(&self) -> &str {
        &self.treatment.variant_id
    }
}
