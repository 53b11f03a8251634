//! Dashboard summary - one serializable view of an experiment's state

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::LiftAnalyzer;
use crate::experiment::{ExperimentStatus, LiftResult, Recommendation};
use crate::Result;

/// One lift row of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftEntry {
    /// Metric compared.
    pub metric_id: String,
    /// Control variant ID.
    pub control_variant_id: String,
    /// Treatment variant ID.
    pub treatment_variant_id: String,
    /// Control mean.
    pub control_mean: f64,
    /// Treatment mean.
    pub treatment_mean: f64,
    /// Relative lift in percent.
    pub relative_lift_pct: f64,
    /// Confidence (1 - p), 0 when not computed.
    pub confidence_level: f64,
    /// Whether the lift is significant.
    pub is_significant: bool,
    /// Decision for the treatment.
    pub recommendation: Recommendation,
}

impl From<&LiftResult> for LiftEntry {
    fn from(result: &LiftResult) -> Self {
        Self {
            metric_id: result.metric_id.clone(),
            control_variant_id: result.control.variant_id.clone(),
            treatment_variant_id: result.treatment.variant_id.clone(),
            control_mean: result.control.mean,
            treatment_mean: result.treatment.mean,
            relative_lift_pct: result.relative_lift_pct,
            confidence_level: result.confidence_level,
            is_significant: result.is_significant,
            recommendation: result.recommendation,
        }
    }
}

/// Experiment overview for dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Experiment ID.
    pub experiment_id: String,
    /// Experiment name.
    pub name: String,
    /// Hypothesis under test.
    pub hypothesis: String,
    /// Current status.
    pub status: ExperimentStatus,
    /// Segment tag.
    pub segment: Option<String>,
    /// Primary metric.
    pub primary_metric: String,
    /// Secondary metrics (sorted).
    pub secondary_metrics: Vec<String>,
    /// Start date.
    pub start_date: Option<NaiveDate>,
    /// End date.
    pub end_date: Option<NaiveDate>,
    /// Distinct assigned entities per variant.
    pub sample_sizes: BTreeMap<String, usize>,
    /// Primary metric rows first, then each secondary metric.
    pub lifts: Vec<LiftEntry>,
}

impl LiftAnalyzer {
    /// Summarize an experiment for a dashboard.
    ///
    /// # Errors
    ///
    /// `Error::ExperimentNotFound` or `Error::NoControlVariant`.
    pub fn summarize_for_dashboard(&self, experiment_id: &str) -> Result<DashboardSummary> {
        let experiment = self.registry.require(experiment_id)?;

        let mut lifts = Vec::new();
        let metrics = std::iter::once(experiment.primary_metric())
            .chain(experiment.secondary_metrics().iter().map(String::as_str));
        for metric_id in metrics {
            let results = self.calculate_lift(experiment_id, Some(metric_id))?;
            lifts.extend(results.iter().map(LiftEntry::from));
        }

        Ok(DashboardSummary {
            experiment_id: experiment.experiment_id().to_string(),
            name: experiment.name().to_string(),
            hypothesis: experiment.hypothesis().to_string(),
            status: experiment.status(),
            segment: experiment.segment().map(str::to_string),
            primary_metric: experiment.primary_metric().to_string(),
            secondary_metrics: experiment.secondary_metrics().iter().cloned().collect(),
            start_date: experiment.start_date(),
            end_date: experiment.end_date(),
            sample_sizes: self.assignments.sample_sizes(&experiment),
            lifts,
        })
    }
}
