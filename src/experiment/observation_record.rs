//! Observation Record - metric data points tagged by experiment and variant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Kind of metric an observation measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    /// 0/1 outcome (won, converted, renewed).
    Conversion,
    /// Real-valued measurement (deal size, ARR).
    Continuous,
    /// Event count.
    Count,
    /// Elapsed time (e.g. days to close).
    Duration,
}

impl MetricType {
    /// Get metric type name as string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Conversion => "conversion",
            Self::Continuous => "continuous",
            Self::Count => "count",
            Self::Duration => "duration",
        }
    }
}

/// Metric Observation represents one recorded metric value.
///
/// Observations are write-once: the store appends them and never mutates
/// or deletes them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricObservation {
    observation_id: String,
    experiment_id: String,
    variant_id: String,
    metric_id: String,
    metric_type: MetricType,
    value: f64,
    count: u32,
    account_id: Option<String>,
    opportunity_id: Option<String>,
    observed_at: DateTime<Utc>,
}

impl MetricObservation {
    /// Get the observation ID.
    #[must_use]
    pub fn observation_id(&self) -> &str {
        &self.observation_id
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the variant ID.
    #[must_use]
    pub fn variant_id(&self) -> &str {
        &self.variant_id
    }

    /// Get the metric ID.
    #[must_use]
    pub fn metric_id(&self) -> &str {
        &self.metric_id
    }

    /// Get the metric type.
    #[must_use]
    pub const fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    /// Get the observed value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Get the aggregation count (how many raw events this value summarizes).
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Get the account reference, if any.
    #[must_use]
    pub fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    /// Get the opportunity reference, if any.
    #[must_use]
    pub fn opportunity_id(&self) -> Option<&str> {
        self.opportunity_id.as_deref()
    }

    /// Get the observation timestamp.
    #[must_use]
    pub const fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

/// Input for recording an observation.
///
/// ```rust
/// use lift_db::experiment::{MetricType, NewObservation};
///
/// let input = NewObservation::new("exp-1", "treatment", "win_rate", MetricType::Conversion, 1.0)
///     .account_id("acct-42")
///     .count(3);
/// assert_eq!(input.metric_id(), "win_rate");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NewObservation {
    experiment_id: String,
    variant_id: String,
    metric_id: String,
    metric_type: MetricType,
    value: f64,
    count: u32,
    account_id: Option<String>,
    opportunity_id: Option<String>,
}

impl NewObservation {
    /// Create an observation input with `count = 1`.
    #[must_use]
    pub fn new(
        experiment_id: impl Into<String>,
        variant_id: impl Into<String>,
        metric_id: impl Into<String>,
        metric_type: MetricType,
        value: f64,
    ) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            variant_id: variant_id.into(),
            metric_id: metric_id.into(),
            metric_type,
            value,
            count: 1,
            account_id: None,
            opportunity_id: None,
        }
    }

    /// Set the aggregation count.
    #[must_use]
    pub const fn count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Set the account reference.
    #[must_use]
    pub fn account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Set the opportunity reference.
    #[must_use]
    pub fn opportunity_id(mut self, opportunity_id: impl Into<String>) -> Self {
        self.opportunity_id = Some(opportunity_id.into());
        self
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the variant ID.
    #[must_use]
    pub fn variant_id(&self) -> &str {
        &self.variant_id
    }

    /// Get the metric ID.
    #[must_use]
    pub fn metric_id(&self) -> &str {
        &self.metric_id
    }

    /// Reject non-finite values and zero counts.
    pub(crate) fn validate(&self) -> Result<()> {
        if !self.value.is_finite() {
            return Err(Error::InvalidObservation(format!(
                "value must be finite, got {}",
                self.value
            )));
        }
        if self.count == 0 {
            return Err(Error::InvalidObservation("count must be at least 1".into()));
        }
        Ok(())
    }

    /// Turn the input into a stored record.
    pub(crate) fn into_record(self, observation_id: String, observed_at: DateTime<Utc>) -> MetricObservation {
        MetricObservation {
            observation_id,
            experiment_id: self.experiment_id,
            variant_id: self.variant_id,
            metric_id: self.metric_id,
            metric_type: self.metric_type,
            value: self.value,
            count: self.count,
            account_id: self.account_id,
            opportunity_id: self.opportunity_id,
            observed_at,
        }
    }

    /// Content fields hashed into the observation ID.
    pub(crate) fn id_parts(&self) -> [String; 7] {
        [
            self.experiment_id.clone(),
            self.variant_id.clone(),
            self.metric_id.clone(),
            self.metric_type.as_str().to_string(),
            self.value.to_string(),
            self.account_id.clone().unwrap_or_default(),
            self.opportunity_id.clone().unwrap_or_default(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_observation_defaults() {
        let input = NewObservation::new("e", "v", "m", MetricType::Continuous, 2.5);
        assert!(input.validate().is_ok());
        let record = input.into_record("id-1".into(), Utc::now());
        assert_eq!(record.count(), 1);
        assert!(record.account_id().is_none());
        assert!(record.opportunity_id().is_none());
        assert!((record.value() - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validation_rejects_bad_input() {
        let nan = NewObservation::new("e", "v", "m", MetricType::Continuous, f64::NAN);
        assert!(matches!(nan.validate(), Err(Error::InvalidObservation(_))));

        let zero = NewObservation::new("e", "v", "m", MetricType::Count, 1.0).count(0);
        assert!(matches!(zero.validate(), Err(Error::InvalidObservation(_))));
    }

    #[test]
    fn test_metric_type_serde() {
        assert_eq!(serde_json::to_string(&MetricType::Duration).unwrap(), "\"duration\"");
        let parsed: MetricType = serde_json::from_str("\"conversion\"").unwrap();
        assert_eq!(parsed, MetricType::Conversion);
    }
}
