//! Experiment Registry - experiment lifecycle (create, start, stop, list)

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use super::{validate_variants, Experiment, ExperimentStatus, FxDashMap, Variant};
use crate::clock::Clock;
use crate::ids::IdGenerator;
use crate::{Error, Result};

/// Request to create an experiment.
///
/// Without explicit variants the experiment gets the default
/// "Control"/"Treatment" pair at 50% each.
#[derive(Debug, Clone, Default)]
pub struct NewExperiment {
    name: String,
    description: String,
    hypothesis: String,
    primary_metric: String,
    segment: Option<String>,
    solution_area: Option<String>,
    secondary_metrics: BTreeSet<String>,
    owner: Option<String>,
    variants: Option<Vec<Variant>>,
    min_sample_size: Option<usize>,
}

impl NewExperiment {
    /// Create a request with the required fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        hypothesis: impl Into<String>,
        primary_metric: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            hypothesis: hypothesis.into(),
            primary_metric: primary_metric.into(),
            ..Self::default()
        }
    }

    /// Tag with a segment.
    #[must_use]
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = Some(segment.into());
        self
    }

    /// Tag with a solution area.
    #[must_use]
    pub fn solution_area(mut self, area: impl Into<String>) -> Self {
        self.solution_area = Some(area.into());
        self
    }

    /// Add a secondary metric.
    #[must_use]
    pub fn secondary_metric(mut self, metric_id: impl Into<String>) -> Self {
        self.secondary_metrics.insert(metric_id.into());
        self
    }

    /// Set the owner reference.
    #[must_use]
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Register an explicit variant set instead of the default pair.
    #[must_use]
    pub fn variants(mut self, variants: Vec<Variant>) -> Self {
        self.variants = Some(variants);
        self
    }

    /// Override the planned sample size per variant.
    #[must_use]
    pub const fn min_sample_size(mut self, n: usize) -> Self {
        self.min_sample_size = Some(n);
        self
    }
}

/// Registry of experiments keyed by ID.
///
/// Reads hand out clones, so callers never hold a shard lock.
pub struct ExperimentRegistry {
    experiments: FxDashMap<String, Experiment>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    default_min_sample_size: usize,
}

impl ExperimentRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>, default_min_sample_size: usize) -> Self {
        Self {
            experiments: FxDashMap::default(),
            clock,
            ids,
            default_min_sample_size,
        }
    }

    /// Number of registered experiments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    /// Create an experiment in `Draft` status and register it.
    ///
    /// # Errors
    ///
    /// Same as [`prepare`](Self::prepare).
    pub fn create(&self, request: NewExperiment) -> Result<Experiment> {
        let experiment = self.prepare(request)?;
        self.insert(experiment.clone());
        Ok(experiment)
    }

    /// Build a `Draft` experiment without registering it.
    ///
    /// The ID is a content hash of the name and creation timestamp.
    /// Variants are reordered control first; the others keep their order.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidExperiment` if an explicit variant set has no
    /// control, several controls, duplicate IDs, or fewer than two arms.
    pub fn prepare(&self, request: NewExperiment) -> Result<Experiment> {
        let mut variants = request
            .variants
            .unwrap_or_else(|| vec![Variant::control(), Variant::treatment()]);
        validate_variants(&variants)?;
        variants.sort_by_key(|v| !v.is_control());

        let created_at = self.clock.now();
        let experiment_id = self
            .ids
            .generate(&[request.name.as_str(), created_at.to_rfc3339().as_str()]);

        let mut builder = Experiment::builder(experiment_id, request.name)
            .description(request.description)
            .hypothesis(request.hypothesis)
            .primary_metric(request.primary_metric)
            .min_sample_size(request.min_sample_size.unwrap_or(self.default_min_sample_size))
            .created_at(created_at);
        if let Some(segment) = request.segment {
            builder = builder.segment(segment);
        }
        if let Some(area) = request.solution_area {
            builder = builder.solution_area(area);
        }
        if let Some(owner) = request.owner {
            builder = builder.owner(owner);
        }
        for metric in request.secondary_metrics {
            builder = builder.secondary_metric(metric);
        }
        for variant in variants {
            builder = builder.variant(variant);
        }
        let experiment = builder.build();

        info!(
            experiment_id = experiment.experiment_id(),
            name = experiment.name(),
            variants = experiment.variants().len(),
            "prepared experiment"
        );
        Ok(experiment)
    }

    /// Insert or replace a record as-is (hydration and write-through).
    pub fn insert(&self, experiment: Experiment) {
        debug!(experiment_id = experiment.experiment_id(), status = %experiment.status(), "registered experiment");
        self.experiments
            .insert(experiment.experiment_id().to_string(), experiment);
    }

    /// Get an experiment by ID.
    #[must_use]
    pub fn get(&self, experiment_id: &str) -> Option<Experiment> {
        self.experiments.get(experiment_id).map(|e| e.value().clone())
    }

    /// Get an experiment by ID or fail.
    ///
    /// # Errors
    ///
    /// Returns `Error::ExperimentNotFound` if the ID is unknown.
    pub fn require(&self, experiment_id: &str) -> Result<Experiment> {
        self.get(experiment_id)
            .ok_or_else(|| Error::ExperimentNotFound(experiment_id.to_string()))
    }

    /// List experiments newest-created first, optionally filtered.
    #[must_use]
    pub fn list(&self, status: Option<ExperimentStatus>, segment: Option<&str>) -> Vec<Experiment> {
        let mut experiments: Vec<Experiment> = self
            .experiments
            .iter()
            .filter(|e| status.map_or(true, |s| e.status() == s))
            .filter(|e| segment.map_or(true, |s| e.segment() == Some(s)))
            .map(|e| e.value().clone())
            .collect();

        experiments.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| a.experiment_id().cmp(b.experiment_id()))
        });
        experiments
    }

    /// Start an experiment (`Draft -> Running`).
    ///
    /// `start_date` defaults to today.
    ///
    /// # Errors
    ///
    /// `Error::ExperimentNotFound` or `Error::InvalidTransition`.
    pub fn start(&self, experiment_id: &str, start_date: Option<NaiveDate>) -> Result<Experiment> {
        self.update(experiment_id, &[ExperimentStatus::Draft], ExperimentStatus::Running, |e, today| {
            e.set_start_date(start_date.unwrap_or(today));
        })
    }

    /// Stop an experiment (`Running | Paused -> Completed`).
    ///
    /// `end_date` defaults to today.
    ///
    /// # Errors
    ///
    /// `Error::ExperimentNotFound` or `Error::InvalidTransition`.
    pub fn stop(&self, experiment_id: &str, end_date: Option<NaiveDate>) -> Result<Experiment> {
        self.update(experiment_id, &[], ExperimentStatus::Completed, |e, today| {
            e.set_end_date(end_date.unwrap_or(today));
        })
    }

    /// Pause a running experiment.
    ///
    /// # Errors
    ///
    /// `Error::ExperimentNotFound` or `Error::InvalidTransition`.
    pub fn pause(&self, experiment_id: &str) -> Result<Experiment> {
        self.update(experiment_id, &[], ExperimentStatus::Paused, |_, _| {})
    }

    /// Resume a paused experiment.
    ///
    /// # Errors
    ///
    /// `Error::ExperimentNotFound` or `Error::InvalidTransition`.
    pub fn resume(&self, experiment_id: &str) -> Result<Experiment> {
        self.update(experiment_id, &[ExperimentStatus::Paused], ExperimentStatus::Running, |_, _| {})
    }

    /// Cancel an experiment that has not finished. Sets the end date to today.
    ///
    /// # Errors
    ///
    /// `Error::ExperimentNotFound` or `Error::InvalidTransition`.
    pub fn cancel(&self, experiment_id: &str) -> Result<Experiment> {
        self.update(experiment_id, &[], ExperimentStatus::Cancelled, |e, today| {
            e.set_end_date(today);
        })
    }

    /// Apply `to` if the lifecycle table allows it. A non-empty `only_from`
    /// narrows the table further (start and resume share a target status).
    fn update(
        &self,
        experiment_id: &str,
        only_from: &[ExperimentStatus],
        to: ExperimentStatus,
        on_success: impl FnOnce(&mut Experiment, NaiveDate),
    ) -> Result<Experiment> {
        let mut entry = self
            .experiments
            .get_mut(experiment_id)
            .ok_or_else(|| Error::ExperimentNotFound(experiment_id.to_string()))?;

        let from = entry.status();
        if !only_from.is_empty() && !only_from.contains(&from) {
            return Err(Error::InvalidTransition {
                id: experiment_id.to_string(),
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        let now = self.clock.now();
        entry.transition(to, now)?;
        on_success(entry.value_mut(), now.date_naive());

        info!(experiment_id, %from, %to, "experiment status changed");
        Ok(entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::ids::HashIdGenerator;
    use chrono::{TimeZone, Utc};

    fn registry() -> (ExperimentRegistry, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()));
        let registry = ExperimentRegistry::new(clock.clone(), Arc::new(HashIdGenerator::new()), 100);
        (registry, clock)
    }

    fn request(name: &str) -> NewExperiment {
        NewExperiment::new(name, "desc", "treatment wins more deals", "win_rate")
    }

    #[test]
    fn test_create_defaults() {
        let (registry, _) = registry();
        let exp = registry.create(request("Pricing page")).unwrap();

        assert_eq!(exp.status(), ExperimentStatus::Draft);
        assert_eq!(exp.variants().len(), 2);
        assert!(exp.variants()[0].is_control());
        assert_eq!(exp.variants()[0].name(), "Control");
        assert_eq!(exp.variants()[1].name(), "Treatment");
        assert_eq!(exp.min_sample_size(), 100);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_name_same_instant_gets_distinct_ids() {
        let (registry, _) = registry();
        let a = registry.create(request("Twin")).unwrap();
        let b = registry.create(request("Twin")).unwrap();
        assert_ne!(a.experiment_id(), b.experiment_id());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_custom_variants_control_moved_first() {
        let (registry, _) = registry();
        let exp = registry
            .create(request("Three arms").variants(vec![
                Variant::new("a", "A", false, 0.3),
                Variant::new("base", "Base", true, 0.4),
                Variant::new("b", "B", false, 0.3),
            ]))
            .unwrap();
        let ids: Vec<&str> = exp.variants().iter().map(Variant::variant_id).collect();
        assert_eq!(ids, ["base", "a", "b"]);
    }

    #[test]
    fn test_start_and_stop_default_dates() {
        let (registry, clock) = registry();
        let exp = registry.create(request("Dates")).unwrap();
        let started = registry.start(exp.experiment_id(), None).unwrap();
        assert_eq!(started.status(), ExperimentStatus::Running);
        assert_eq!(started.start_date(), NaiveDate::from_ymd_opt(2024, 5, 1));

        clock.advance(chrono::Duration::days(14));
        let end = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let stopped = registry.stop(exp.experiment_id(), Some(end)).unwrap();
        assert_eq!(stopped.status(), ExperimentStatus::Completed);
        assert_eq!(stopped.end_date(), Some(end));
        assert!(stopped.updated_at() > stopped.created_at());
    }

    #[test]
    fn test_unknown_experiment() {
        let (registry, _) = registry();
        assert!(matches!(registry.start("nope", None), Err(Error::ExperimentNotFound(_))));
        assert!(matches!(registry.stop("nope", None), Err(Error::ExperimentNotFound(_))));
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_list_newest_first_with_filters() {
        let (registry, clock) = registry();
        let old = registry.create(request("old").segment("enterprise")).unwrap();
        clock.advance(chrono::Duration::hours(1));
        let mid = registry.create(request("mid").segment("smb")).unwrap();
        clock.advance(chrono::Duration::hours(1));
        let new = registry.create(request("new").segment("enterprise")).unwrap();
        registry.start(new.experiment_id(), None).unwrap();

        let all: Vec<String> = registry.list(None, None).iter().map(|e| e.name().to_string()).collect();
        assert_eq!(all, ["new", "mid", "old"]);

        let enterprise = registry.list(None, Some("enterprise"));
        assert_eq!(enterprise.len(), 2);
        assert_eq!(enterprise[0].experiment_id(), new.experiment_id());
        assert_eq!(enterprise[1].experiment_id(), old.experiment_id());

        let drafts = registry.list(Some(ExperimentStatus::Draft), None);
        assert_eq!(drafts.len(), 2);
        assert!(drafts.iter().all(|e| e.experiment_id() != new.experiment_id()));
        assert!(drafts.iter().any(|e| e.experiment_id() == mid.experiment_id()));
    }

    #[test]
    fn test_pause_resume_cancel() {
        let (registry, _) = registry();
        let id = registry.create(request("flow")).unwrap().experiment_id().to_string();

        assert!(matches!(registry.pause(&id), Err(Error::InvalidTransition { .. })));
        registry.start(&id, None).unwrap();
        assert_eq!(registry.pause(&id).unwrap().status(), ExperimentStatus::Paused);
        assert_eq!(registry.resume(&id).unwrap().status(), ExperimentStatus::Running);
        let cancelled = registry.cancel(&id).unwrap();
        assert_eq!(cancelled.status(), ExperimentStatus::Cancelled);
        assert!(cancelled.end_date().is_some());
        assert!(matches!(registry.start(&id, None), Err(Error::InvalidTransition { .. })));
    }

    #[test]
    fn test_prepare_does_not_register() {
        let (registry, _) = registry();
        let exp = registry.prepare(request("unsaved")).unwrap();
        assert!(registry.get(exp.experiment_id()).is_none());
        assert!(registry.is_empty());

        registry.insert(exp.clone());
        assert_eq!(registry.get(exp.experiment_id()), Some(exp));
    }

    #[test]
    fn test_start_and_resume_are_not_interchangeable() {
        let (registry, _) = registry();
        let id = registry.create(request("strict")).unwrap().experiment_id().to_string();

        assert!(matches!(registry.resume(&id), Err(Error::InvalidTransition { .. })));
        registry.start(&id, None).unwrap();
        registry.pause(&id).unwrap();
        assert!(matches!(registry.start(&id, None), Err(Error::InvalidTransition { .. })));
        assert_eq!(registry.get(&id).unwrap().status(), ExperimentStatus::Paused);
    }
}
