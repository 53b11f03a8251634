//! Lift Analyzer - per-variant aggregation, significance and recommendation
//!
//! ## Decision Policy
//!
//! Applied in order, per treatment:
//!
//! 1. either arm below `min_sample_size` → `continue_testing`
//! 2. confidence below `confidence_threshold` → `continue_testing`
//! 3. relative lift `>` `adopt_threshold_pct` → `adopt`
//! 4. relative lift `<` `reject_threshold_pct` → `reject`
//! 5. otherwise → `continue_testing`
//!
//! Both band comparisons are strict: a significant +5.0% lift is not adopted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::stats::{mean, two_sample_z_test, ZTest};
use crate::clock::Clock;
use crate::config::{GrowthConfig, LiftConfig};
use crate::experiment::{
    ArmSummary, AssignmentEngine, ExperimentRegistry, LiftResult, ObservationStore, Recommendation,
};
use crate::{Error, Result};

/// Computes lift results, dashboard summaries and growth attribution.
pub struct LiftAnalyzer {
    pub(super) config: LiftConfig,
    pub(super) growth: GrowthConfig,
    pub(super) registry: Arc<ExperimentRegistry>,
    pub(super) observations: Arc<ObservationStore>,
    pub(super) assignments: Arc<AssignmentEngine>,
    pub(super) clock: Arc<dyn Clock>,
}

impl LiftAnalyzer {
    /// Create an analyzer over shared components.
    #[must_use]
    pub fn new(
        config: LiftConfig,
        growth: GrowthConfig,
        registry: Arc<ExperimentRegistry>,
        observations: Arc<ObservationStore>,
        assignments: Arc<AssignmentEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            growth,
            registry,
            observations,
            assignments,
            clock,
        }
    }

    /// Get the lift thresholds.
    #[must_use]
    pub const fn config(&self) -> &LiftConfig {
        &self.config
    }

    /// Compare every treatment against the control on one metric.
    ///
    /// `metric_id` defaults to the experiment's primary metric. One result
    /// is returned per non-control variant, in variant order.
    ///
    /// # Errors
    ///
    /// * `Error::ExperimentNotFound` - unknown experiment
    /// * `Error::NoControlVariant` - no variant is flagged as control
    pub fn calculate_lift(&self, experiment_id: &str, metric_id: Option<&str>) -> Result<Vec<LiftResult>> {
        let experiment = self.registry.require(experiment_id)?;
        let control = experiment
            .control()
            .ok_or_else(|| Error::NoControlVariant(experiment_id.to_string()))?;
        let metric_id = metric_id.unwrap_or_else(|| experiment.primary_metric());
        let calculated_at = self.clock.now();

        let control_values = self
            .observations
            .values(experiment_id, metric_id, control.variant_id());

        let results: Vec<LiftResult> = experiment
            .treatments()
            .map(|treatment| {
                let treatment_values =
                    self.observations
                        .values(experiment_id, metric_id, treatment.variant_id());
                let result = self.compare(
                    experiment_id,
                    metric_id,
                    (control.variant_id(), control_values.as_slice()),
                    (treatment.variant_id(), treatment_values.as_slice()),
                    calculated_at,
                );
                info!(
                    experiment_id,
                    metric_id,
                    treatment = treatment.variant_id(),
                    relative_lift_pct = result.relative_lift_pct,
                    confidence = result.confidence_level,
                    recommendation = %result.recommendation,
                    "calculated lift"
                );
                result
            })
            .collect();
        Ok(results)
    }

    /// Compare two arms given their raw values.
    #[must_use]
    pub fn compare(
        &self,
        experiment_id: &str,
        metric_id: &str,
        control: (&str, &[f64]),
        treatment: (&str, &[f64]),
        calculated_at: DateTime<Utc>,
    ) -> LiftResult {
        let (control_id, control_values) = control;
        let (treatment_id, treatment_values) = treatment;

        let control_mean = mean(control_values);
        let treatment_mean = mean(treatment_values);
        let absolute_lift = treatment_mean - control_mean;
        let relative_lift_pct = if control_mean == 0.0 {
            0.0
        } else {
            absolute_lift / control_mean * 100.0
        };

        let (sufficient, test) = match self.significance(control_values, treatment_values) {
            Ok(test) => (true, test),
            Err(e) => {
                debug!(experiment_id, metric_id, treatment = treatment_id, %e, "significance skipped");
                (false, None)
            }
        };
        let confidence_level = test.map_or(0.0, |t| t.confidence);
        let is_significant = test.is_some() && confidence_level >= self.config.confidence_threshold;

        LiftResult {
            experiment_id: experiment_id.to_string(),
            metric_id: metric_id.to_string(),
            control: ArmSummary {
                variant_id: control_id.to_string(),
                mean: control_mean,
                sample_size: control_values.len(),
            },
            treatment: ArmSummary {
                variant_id: treatment_id.to_string(),
                mean: treatment_mean,
                sample_size: treatment_values.len(),
            },
            absolute_lift,
            relative_lift_pct,
            confidence_level,
            is_significant,
            p_value: test.map(|t| t.p_value),
            recommendation: self.recommend(sufficient, is_significant, relative_lift_pct),
            calculated_at,
        }
    }

    /// Apply the decision policy.
    #[must_use]
    pub fn recommend(&self, sufficient_sample: bool, is_significant: bool, relative_lift_pct: f64) -> Recommendation {
        if !sufficient_sample || !is_significant {
            Recommendation::ContinueTesting
        } else if relative_lift_pct > self.config.adopt_threshold_pct {
            Recommendation::Adopt
        } else if relative_lift_pct < self.config.reject_threshold_pct {
            Recommendation::Reject
        } else {
            Recommendation::ContinueTesting
        }
    }

    /// Run the z-test if both arms pass the sample gate.
    ///
    /// `Ok(None)` means the test ran but the standard error was zero.
    fn significance(&self, control: &[f64], treatment: &[f64]) -> Result<Option<ZTest>> {
        let required = self.config.min_sample_size;
        if control.len() < required || treatment.len() < required {
            return Err(Error::InsufficientData {
                required,
                control: control.len(),
                treatment: treatment.len(),
            });
        }
        Ok(two_sample_z_test(control, treatment))
    }
}
