//! Experiment Record - root entity for lift measurement

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Variant;
use crate::{Error, Result};

/// Lifecycle status of an experiment.
///
/// ```text
/// Draft ──start──> Running ──stop──> Completed
///   │               │  ▲
///   │             pause resume
///   │               ▼  │
///   │              Paused ──stop──> Completed
///   └──cancel (from Draft, Running, Paused)──> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    /// Created, not yet collecting data.
    Draft,
    /// Actively assigning entities and collecting observations.
    Running,
    /// Temporarily halted.
    Paused,
    /// Finished normally.
    Completed,
    /// Abandoned.
    Cancelled,
}

impl ExperimentStatus {
    /// Get status name as string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the experiment reached a terminal status.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether a transition from `self` to `to` is allowed.
    #[must_use]
    pub const fn can_transition_to(&self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Draft, Self::Running)
                | (Self::Running, Self::Paused)
                | (Self::Paused, Self::Running)
                | (Self::Running | Self::Paused, Self::Completed)
                | (Self::Draft | Self::Running | Self::Paused, Self::Cancelled)
        )
    }
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Experiment Record represents a controlled A/B comparison.
///
/// Variants are kept control first; assignment indexes into this order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Experiment {
    experiment_id: String,
    name: String,
    description: String,
    hypothesis: String,
    segment: Option<String>,
    solution_area: Option<String>,
    variants: Vec<Variant>,
    primary_metric: String,
    secondary_metrics: BTreeSet<String>,
    status: ExperimentStatus,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    min_sample_size: usize,
    owner: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Experiment {
    /// Create a builder for an experiment record.
    ///
    /// The builder performs no validation; it is meant for hydrating
    /// records from a repository and for tests. New experiments should go
    /// through [`ExperimentRegistry::create`](super::ExperimentRegistry::create).
    #[must_use]
    pub fn builder(experiment_id: impl Into<String>, name: impl Into<String>) -> ExperimentBuilder {
        ExperimentBuilder::new(experiment_id, name)
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the hypothesis under test.
    #[must_use]
    pub fn hypothesis(&self) -> &str {
        &self.hypothesis
    }

    /// Get the segment tag, if any.
    #[must_use]
    pub fn segment(&self) -> Option<&str> {
        self.segment.as_deref()
    }

    /// Get the solution-area tag, if any.
    #[must_use]
    pub fn solution_area(&self) -> Option<&str> {
        self.solution_area.as_deref()
    }

    /// Get the variants, control first.
    #[must_use]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Look up a variant by ID.
    #[must_use]
    pub fn variant(&self, variant_id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.variant_id() == variant_id)
    }

    /// Get the control variant, if one is flagged.
    #[must_use]
    pub fn control(&self) -> Option<&Variant> {
        self.variants.iter().find(|v| v.is_control())
    }

    /// Iterate over the non-control variants.
    pub fn treatments(&self) -> impl Iterator<Item = &Variant> {
        self.variants.iter().filter(|v| !v.is_control())
    }

    /// Get the primary metric ID.
    #[must_use]
    pub fn primary_metric(&self) -> &str {
        &self.primary_metric
    }

    /// Get the secondary metric IDs (sorted).
    #[must_use]
    pub const fn secondary_metrics(&self) -> &BTreeSet<String> {
        &self.secondary_metrics
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> ExperimentStatus {
        self.status
    }

    /// Get the start date, if started.
    #[must_use]
    pub const fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    /// Get the end date, if stopped.
    #[must_use]
    pub const fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    /// Get the planned sample size per variant.
    #[must_use]
    pub const fn min_sample_size(&self) -> usize {
        self.min_sample_size
    }

    /// Get the owner reference, if any.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the last-modified timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Move to `to`, enforcing the lifecycle table.
    pub(crate) fn transition(&mut self, to: ExperimentStatus, at: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                id: self.experiment_id.clone(),
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        self.updated_at = at;
        Ok(())
    }

    pub(crate) fn set_start_date(&mut self, date: NaiveDate) {
        self.start_date = Some(date);
    }

    pub(crate) fn set_end_date(&mut self, date: NaiveDate) {
        self.end_date = Some(date);
    }
}

/// Check a variant set: at least two arms, exactly one control, unique IDs.
///
/// # Errors
///
/// Returns `Error::InvalidExperiment` describing the first violation.
pub fn validate_variants(variants: &[Variant]) -> Result<()> {
    if variants.len() < 2 {
        return Err(Error::InvalidExperiment(format!(
            "an experiment needs at least 2 variants, got {}",
            variants.len()
        )));
    }
    let controls = variants.iter().filter(|v| v.is_control()).count();
    if controls != 1 {
        return Err(Error::InvalidExperiment(format!(
            "exactly one variant must be the control, found {controls}"
        )));
    }
    let mut seen = HashSet::with_capacity(variants.len());
    for variant in variants {
        if !seen.insert(variant.variant_id()) {
            return Err(Error::InvalidExperiment(format!(
                "duplicate variant id: {}",
                variant.variant_id()
            )));
        }
    }
    Ok(())
}

/// Builder for `Experiment`.
#[derive(Debug)]
pub struct ExperimentBuilder {
    record: Experiment,
}

impl ExperimentBuilder {
    /// Create a new builder with required fields.
    ///
    /// Defaults: status `Draft`, no variants, minimum sample size 100,
    /// timestamps at the Unix epoch (set them with `created_at`).
    #[must_use]
    pub fn new(experiment_id: impl Into<String>, name: impl Into<String>) -> Self {
        let epoch = DateTime::<Utc>::default();
        Self {
            record: Experiment {
                experiment_id: experiment_id.into(),
                name: name.into(),
                description: String::new(),
                hypothesis: String::new(),
                segment: None,
                solution_area: None,
                variants: Vec::new(),
                primary_metric: String::new(),
                secondary_metrics: BTreeSet::new(),
                status: ExperimentStatus::Draft,
                start_date: None,
                end_date: None,
                min_sample_size: 100,
                owner: None,
                created_at: epoch,
                updated_at: epoch,
            },
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.record.description = description.into();
        self
    }

    /// Set the hypothesis.
    #[must_use]
    pub fn hypothesis(mut self, hypothesis: impl Into<String>) -> Self {
        self.record.hypothesis = hypothesis.into();
        self
    }

    /// Set the primary metric.
    #[must_use]
    pub fn primary_metric(mut self, metric_id: impl Into<String>) -> Self {
        self.record.primary_metric = metric_id.into();
        self
    }

    /// Add a secondary metric.
    #[must_use]
    pub fn secondary_metric(mut self, metric_id: impl Into<String>) -> Self {
        self.record.secondary_metrics.insert(metric_id.into());
        self
    }

    /// Set the segment tag.
    #[must_use]
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.record.segment = Some(segment.into());
        self
    }

    /// Set the solution-area tag.
    #[must_use]
    pub fn solution_area(mut self, area: impl Into<String>) -> Self {
        self.record.solution_area = Some(area.into());
        self
    }

    /// Set the owner reference.
    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.record.owner = Some(owner.into());
        self
    }

    /// Append a variant (order is preserved as given).
    #[must_use]
    pub fn variant(mut self, variant: Variant) -> Self {
        self.record.variants.push(variant);
        self
    }

    /// Set the status.
    #[must_use]
    pub const fn status(mut self, status: ExperimentStatus) -> Self {
        self.record.status = status;
        self
    }

    /// Set the planned sample size per variant.
    #[must_use]
    pub const fn min_sample_size(mut self, n: usize) -> Self {
        self.record.min_sample_size = n;
        self
    }

    /// Set creation and update timestamps (useful for deserialization/testing).
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.record.created_at = created_at;
        self.record.updated_at = created_at;
        self
    }

    /// Build the `Experiment`.
    #[must_use]
    pub fn build(self) -> Experiment {
        self.record
    }
}
