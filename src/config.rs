//! Engine configuration
//!
//! Every policy constant of the lift analysis (sample gate, confidence
//! threshold, adopt/reject band) and of growth attribution lives here so
//! callers can tune them without touching the algorithms.
//!
//! ## Example
//!
//! ```rust
//! use lift_db::config::{AssignmentPolicy, EngineConfig};
//!
//! let config = EngineConfig::from_json_str(
//!     r#"{ "lift": { "min_sample_size": 50 }, "assignment": "active_only" }"#,
//! )?;
//! assert_eq!(config.lift.min_sample_size, 50);
//! assert!((config.lift.confidence_threshold - 0.95).abs() < f64::EPSILON);
//! assert_eq!(config.assignment, AssignmentPolicy::ActiveOnly);
//! # Ok::<(), lift_db::Error>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Thresholds used by the lift analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiftConfig {
    /// Minimum observations per variant before significance is computed.
    pub min_sample_size: usize,
    /// Confidence (1 - p) at or above which a result is significant.
    pub confidence_threshold: f64,
    /// Relative lift (percent) a significant result must exceed to be adopted.
    pub adopt_threshold_pct: f64,
    /// Relative lift (percent) a significant result must fall below to be rejected.
    pub reject_threshold_pct: f64,
}

impl Default for LiftConfig {
    fn default() -> Self {
        Self {
            min_sample_size: 30,
            confidence_threshold: 0.95,
            adopt_threshold_pct: 5.0,
            reject_threshold_pct: -5.0,
        }
    }
}

/// Inputs of the growth attribution estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    /// Baseline annual recurring revenue.
    pub baseline_arr: f64,
    /// Target growth as a fraction of the baseline (0.15 = 15%).
    pub target_growth_pct: f64,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            baseline_arr: 3_000_000_000.0,
            target_growth_pct: 0.15,
        }
    }
}

/// Whether closed experiments hand out new assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentPolicy {
    /// Assign regardless of status (historical behavior).
    #[default]
    Always,
    /// Completed/cancelled experiments only return memoized assignments.
    ActiveOnly,
}

/// Top-level configuration of an [`ExperimentService`](crate::service::ExperimentService).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lift analysis thresholds.
    pub lift: LiftConfig,
    /// Growth attribution inputs.
    pub growth: GrowthConfig,
    /// Closed-experiment assignment policy.
    pub assignment: AssignmentPolicy,
    /// Per-variant sample size stamped on newly created experiments.
    pub default_min_sample_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lift: LiftConfig::default(),
            growth: GrowthConfig::default(),
            assignment: AssignmentPolicy::default(),
            default_min_sample_size: 100,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the document is malformed or fails
    /// [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the lift thresholds.
    #[must_use]
    pub const fn with_lift(mut self, lift: LiftConfig) -> Self {
        self.lift = lift;
        self
    }

    /// Replace the growth attribution inputs.
    #[must_use]
    pub const fn with_growth(mut self, growth: GrowthConfig) -> Self {
        self.growth = growth;
        self
    }

    /// Replace the closed-experiment assignment policy.
    #[must_use]
    pub const fn with_assignment_policy(mut self, policy: AssignmentPolicy) -> Self {
        self.assignment = policy;
        self
    }

    /// Check that every threshold is in range.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let lift = &self.lift;
        if lift.min_sample_size < 2 {
            return Err(Error::Config(
                "lift.min_sample_size must be at least 2 (sample variance needs n - 1 > 0)".into(),
            ));
        }
        if !(lift.confidence_threshold > 0.0 && lift.confidence_threshold < 1.0) {
            return Err(Error::Config(format!(
                "lift.confidence_threshold must be in (0, 1), got {}",
                lift.confidence_threshold
            )));
        }
        if lift.reject_threshold_pct > lift.adopt_threshold_pct {
            return Err(Error::Config(format!(
                "lift.reject_threshold_pct ({}) exceeds lift.adopt_threshold_pct ({})",
                lift.reject_threshold_pct, lift.adopt_threshold_pct
            )));
        }
        if !self.growth.baseline_arr.is_finite() || self.growth.baseline_arr <= 0.0 {
            return Err(Error::Config(format!(
                "growth.baseline_arr must be positive, got {}",
                self.growth.baseline_arr
            )));
        }
        if !self.growth.target_growth_pct.is_finite() || self.growth.target_growth_pct <= 0.0 {
            return Err(Error::Config(format!(
                "growth.target_growth_pct must be positive, got {}",
                self.growth.target_growth_pct
            )));
        }
        if self.default_min_sample_size == 0 {
            return Err(Error::Config("default_min_sample_size must be positive".into()));
        }
        Ok(())
    }
}
