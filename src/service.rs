//! Experiment Service - the library boundary
//!
//! Composes the registry, assignment engine, observation store and lift
//! analyzer over a [`Repository`]. The in-memory components act as a cache:
//! every mutation is written through to the repository, and
//! [`ExperimentService::open`] rebuilds the cache from it.
//!
//! Mutations of one experiment (lifecycle transitions) hold that
//! experiment's write lock from the cache update through the repository
//! save, so the cache and the repository always agree on the last
//! transition. A new experiment is persisted before it becomes visible.
//!
//! There is no global instance; construct one and share it (it is `Sync`).
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use lift_db::clock::SystemClock;
//! use lift_db::config::EngineConfig;
//! use lift_db::experiment::{MetricType, NewExperiment, NewObservation};
//! use lift_db::ids::HashIdGenerator;
//! use lift_db::repository::MemoryRepository;
//! use lift_db::service::ExperimentService;
//!
//! # async fn example() -> lift_db::Result<()> {
//! let service = ExperimentService::new(
//!     EngineConfig::default(),
//!     MemoryRepository::new(),
//!     Arc::new(SystemClock),
//!     Arc::new(HashIdGenerator::new()),
//! )?;
//!
//! let exp = service
//!     .create_experiment(NewExperiment::new("Demo", "", "treatment closes bigger deals", "deal_size"))
//!     .await?;
//! service.start_experiment(exp.experiment_id(), None).await?;
//!
//! let variant = service.assign_entity(exp.experiment_id(), "acct-1").await?;
//! service
//!     .record_observation(NewObservation::new(
//!         exp.experiment_id(),
//!         variant,
//!         "deal_size",
//!         MetricType::Continuous,
//!         42_000.0,
//!     ))
//!     .await?;
//!
//! let lifts = service.calculate_lift(exp.experiment_id(), None)?;
//! assert_eq!(lifts.len(), 1);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::analysis::{DashboardSummary, GrowthContribution, LiftAnalyzer};
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::experiment::{
    Assignment, AssignmentEngine, Experiment, ExperimentRegistry, ExperimentStatus, FxDashMap,
    LiftResult, MetricObservation, NewExperiment, NewObservation, ObservationStore,
};
use crate::ids::IdGenerator;
use crate::repository::Repository;
use crate::{Error, Result};

/// Experiment tracking and lift measurement service.
pub struct ExperimentService<R: Repository> {
    config: EngineConfig,
    repository: R,
    registry: Arc<ExperimentRegistry>,
    assignments: Arc<AssignmentEngine>,
    observations: Arc<ObservationStore>,
    analyzer: LiftAnalyzer,
    write_locks: FxDashMap<String, Arc<Mutex<()>>>,
}

impl<R: Repository> ExperimentService<R> {
    /// Create a service with an empty cache.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `config` fails validation.
    pub fn new(
        config: EngineConfig,
        repository: R,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(ExperimentRegistry::new(
            Arc::clone(&clock),
            Arc::clone(&ids),
            config.default_min_sample_size,
        ));
        let assignments = Arc::new(AssignmentEngine::new(config.assignment));
        let observations = Arc::new(ObservationStore::new(Arc::clone(&clock), ids));
        let analyzer = LiftAnalyzer::new(
            config.lift,
            config.growth,
            Arc::clone(&registry),
            Arc::clone(&observations),
            Arc::clone(&assignments),
            clock,
        );
        Ok(Self {
            config,
            repository,
            registry,
            assignments,
            observations,
            analyzer,
            write_locks: FxDashMap::default(),
        })
    }

    /// Create a service and hydrate its cache from `repository`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an invalid configuration, or whatever
    /// the repository reports while loading.
    pub async fn open(
        config: EngineConfig,
        repository: R,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        let service = Self::new(config, repository, clock, ids)?;

        let experiments = service.repository.load_experiments().await?;
        let observations = service.repository.load_observations().await?;
        let assignments = service.repository.load_assignments().await?;
        info!(
            experiments = experiments.len(),
            observations = observations.len(),
            assignments = assignments.len(),
            "hydrating from repository"
        );

        for experiment in experiments {
            service.registry.insert(experiment);
        }
        for observation in observations {
            service.observations.append(observation);
        }
        for assignment in assignments {
            service.assignments.restore(assignment);
        }
        Ok(service)
    }

    /// Get the active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the backing repository.
    #[must_use]
    pub const fn repository(&self) -> &R {
        &self.repository
    }

    /// Drop the cache and hand back the repository.
    #[must_use]
    pub fn into_repository(self) -> R {
        self.repository
    }

    /// Get the lift analyzer.
    #[must_use]
    pub const fn analyzer(&self) -> &LiftAnalyzer {
        &self.analyzer
    }

    // ---------------------------------------------------------------
    // Experiment lifecycle
    // ---------------------------------------------------------------

    /// Create an experiment (status `draft`).
    ///
    /// The record is persisted before it becomes visible to other calls.
    ///
    /// # Errors
    ///
    /// `Error::InvalidExperiment` for a bad variant set, or a repository error.
    #[instrument(skip(self, request))]
    pub async fn create_experiment(&self, request: NewExperiment) -> Result<Experiment> {
        let experiment = self.registry.prepare(request)?;
        if let Err(e) = self.repository.save_experiment(&experiment).await {
            warn!(experiment_id = experiment.experiment_id(), %e, "persist failed, experiment not created");
            return Err(e);
        }
        self.registry.insert(experiment.clone());
        info!(experiment_id = experiment.experiment_id(), name = experiment.name(), "created experiment");
        Ok(experiment)
    }

    /// Start an experiment. `start_date` defaults to today.
    ///
    /// # Errors
    ///
    /// `Error::ExperimentNotFound`, `Error::InvalidTransition`, or a repository error.
    #[instrument(skip(self))]
    pub async fn start_experiment(&self, experiment_id: &str, start_date: Option<NaiveDate>) -> Result<Experiment> {
        self.transition(experiment_id, |registry| registry.start(experiment_id, start_date))
            .await
    }

    /// Stop an experiment (status `completed`). `end_date` defaults to today.
    ///
    /// # Errors
    ///
    /// `Error::ExperimentNotFound`, `Error::InvalidTransition`, or a repository error.
    #[instrument(skip(self))]
    pub async fn stop_experiment(&self, experiment_id: &str, end_date: Option<NaiveDate>) -> Result<Experiment> {
        self.transition(experiment_id, |registry| registry.stop(experiment_id, end_date))
            .await
    }

    /// Pause a running experiment.
    ///
    /// # Errors
    ///
    /// `Error::ExperimentNotFound`, `Error::InvalidTransition`, or a repository error.
    #[instrument(skip(self))]
    pub async fn pause_experiment(&self, experiment_id: &str) -> Result<Experiment> {
        self.transition(experiment_id, |registry| registry.pause(experiment_id))
            .await
    }

    /// Resume a paused experiment.
    ///
    /// # Errors
    ///
    /// `Error::ExperimentNotFound`, `Error::InvalidTransition`, or a repository error.
    #[instrument(skip(self))]
    pub async fn resume_experiment(&self, experiment_id: &str) -> Result<Experiment> {
        self.transition(experiment_id, |registry| registry.resume(experiment_id))
            .await
    }

    /// Cancel an experiment that has not finished.
    ///
    /// # Errors
    ///
    /// `Error::ExperimentNotFound`, `Error::InvalidTransition`, or a repository error.
    #[instrument(skip(self))]
    pub async fn cancel_experiment(&self, experiment_id: &str) -> Result<Experiment> {
        self.transition(experiment_id, |registry| registry.cancel(experiment_id))
            .await
    }

    /// Get an experiment by ID.
    #[must_use]
    pub fn get_experiment(&self, experiment_id: &str) -> Option<Experiment> {
        self.registry.get(experiment_id)
    }

    /// List experiments newest-created first.
    #[must_use]
    pub fn list_experiments(&self, status: Option<ExperimentStatus>, segment: Option<&str>) -> Vec<Experiment> {
        self.registry.list(status, segment)
    }

    /// Apply one lifecycle transition and persist it under the
    /// experiment's write lock.
    ///
    /// The lock spans the cache update, the save and any rollback, so no
    /// other transition of this experiment lands in between.
    async fn transition(
        &self,
        experiment_id: &str,
        apply: impl FnOnce(&ExperimentRegistry) -> Result<Experiment> + Send,
    ) -> Result<Experiment> {
        let lock = self.write_lock(experiment_id);
        let _guard = lock.lock().await;

        let previous = self.registry.require(experiment_id)?;
        let updated = apply(&self.registry)?;
        if let Err(e) = self.repository.save_experiment(&updated).await {
            warn!(experiment_id, %e, "persist failed, rolling back transition");
            self.registry.insert(previous);
            return Err(e);
        }
        debug!(experiment_id, status = %updated.status(), "transition persisted");
        Ok(updated)
    }

    fn write_lock(&self, experiment_id: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.write_locks
                .entry(experiment_id.to_string())
                .or_default()
                .value(),
        )
    }

    // ---------------------------------------------------------------
    // Assignment
    // ---------------------------------------------------------------

    /// Assign an entity to a variant, deterministically and idempotently.
    ///
    /// # Errors
    ///
    /// `Error::ExperimentNotFound`, `Error::ExperimentClosed` (under the
    /// `ActiveOnly` policy), or a repository error.
    #[instrument(skip(self))]
    pub async fn assign_entity(&self, experiment_id: &str, entity_id: &str) -> Result<String> {
        let experiment = self.registry.require(experiment_id)?;
        let (variant_id, created) = self.assignments.assign_tracked(&experiment, entity_id)?;
        if created {
            let assignment = Assignment {
                experiment_id: experiment_id.to_string(),
                entity_id: entity_id.to_string(),
                variant_id: variant_id.clone(),
            };
            if let Err(e) = self.repository.save_assignment(&assignment).await {
                warn!(experiment_id, entity_id, %e, "persist failed, dropping assignment");
                self.assignments.forget(experiment_id, entity_id);
                return Err(e);
            }
        }
        Ok(variant_id)
    }

    /// Distinct assigned entities per variant.
    ///
    /// # Errors
    ///
    /// `Error::ExperimentNotFound` if the ID is unknown.
    pub fn sample_sizes(&self, experiment_id: &str) -> Result<BTreeMap<String, usize>> {
        let experiment = self.registry.require(experiment_id)?;
        Ok(self.assignments.sample_sizes(&experiment))
    }

    /// Every memoized assignment of an experiment, sorted by entity.
    #[must_use]
    pub fn assignments(&self, experiment_id: &str) -> Vec<Assignment> {
        self.assignments.assignments(experiment_id)
    }

    // ---------------------------------------------------------------
    // Observations
    // ---------------------------------------------------------------

    /// Record a metric observation.
    ///
    /// The record is persisted before it becomes visible to queries.
    ///
    /// # Errors
    ///
    /// * `Error::ExperimentNotFound` - unknown experiment
    /// * `Error::UnknownVariant` - the variant is not part of the experiment
    /// * `Error::InvalidObservation` - non-finite value or zero count
    /// * repository errors
    #[instrument(skip(self, input), fields(experiment_id = input.experiment_id(), metric_id = input.metric_id()))]
    pub async fn record_observation(&self, input: NewObservation) -> Result<MetricObservation> {
        let experiment = self.registry.require(input.experiment_id())?;
        if experiment.variant(input.variant_id()).is_none() {
            return Err(Error::UnknownVariant {
                experiment_id: input.experiment_id().to_string(),
                variant_id: input.variant_id().to_string(),
            });
        }

        let observation = self.observations.prepare(input)?;
        self.repository.append_observation(&observation).await?;
        self.observations.append(observation.clone());
        Ok(observation)
    }

    /// Query observations by experiment and optional metric/variant.
    #[must_use]
    pub fn query_observations(
        &self,
        experiment_id: &str,
        metric_id: Option<&str>,
        variant_id: Option<&str>,
    ) -> Vec<MetricObservation> {
        self.observations.query(experiment_id, metric_id, variant_id)
    }

    // ---------------------------------------------------------------
    // Analysis
    // ---------------------------------------------------------------

    /// Lift of every treatment against the control.
    ///
    /// # Errors
    ///
    /// `Error::ExperimentNotFound` or `Error::NoControlVariant`.
    pub fn calculate_lift(&self, experiment_id: &str, metric_id: Option<&str>) -> Result<Vec<LiftResult>> {
        self.analyzer.calculate_lift(experiment_id, metric_id)
    }

    /// Dashboard summary.
    ///
    /// # Errors
    ///
    /// `Error::ExperimentNotFound` or `Error::NoControlVariant`.
    pub fn summarize_for_dashboard(&self, experiment_id: &str) -> Result<DashboardSummary> {
        self.analyzer.summarize_for_dashboard(experiment_id)
    }

    /// Growth attribution; `None` for an unknown experiment.
    #[must_use]
    pub fn calculate_growth_contribution(&self, experiment_id: &str, arr_impact: f64) -> Option<GrowthContribution> {
        self.analyzer
            .calculate_growth_contribution(experiment_id, arr_impact)
    }
}
