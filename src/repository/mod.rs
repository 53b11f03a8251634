//! Repository interface for durable experiment state
//!
//! The engine keeps experiments, observations and assignments in memory as
//! a cache; a [`Repository`] is the durable backing it writes through to
//! and hydrates from on startup.
//!
//! # Example
//!
//! ```rust,no_run
//! use lift_db::experiment::Experiment;
//! use lift_db::repository::{MemoryRepository, Repository};
//!
//! # async fn example() -> lift_db::Result<()> {
//! let repository = MemoryRepository::new();
//! let experiment = Experiment::builder("exp-1", "Pricing page").build();
//!
//! repository.save_experiment(&experiment).await?;
//! let loaded = repository.load_experiments().await?;
//! assert_eq!(loaded, vec![experiment]);
//! # Ok(())
//! # }
//! ```

mod memory;

pub use memory::MemoryRepository;

use crate::experiment::{Assignment, Experiment, MetricObservation};
use crate::Result;
use std::future::Future;

/// Durable storage for experiment state.
///
/// Implementations must be safe to share between tasks. Saving an
/// experiment with an existing ID replaces it; observations and
/// assignments are append/upsert only.
pub trait Repository: Send + Sync {
    /// Insert or replace an experiment.
    fn save_experiment(&self, experiment: &Experiment) -> impl Future<Output = Result<()>> + Send;

    /// Load every experiment.
    fn load_experiments(&self) -> impl Future<Output = Result<Vec<Experiment>>> + Send;

    /// Append an observation.
    fn append_observation(&self, observation: &MetricObservation) -> impl Future<Output = Result<()>> + Send;

    /// Load every observation (order unspecified).
    fn load_observations(&self) -> impl Future<Output = Result<Vec<MetricObservation>>> + Send;

    /// Persist an assignment. Re-saving the same pair is a no-op.
    fn save_assignment(&self, assignment: &Assignment) -> impl Future<Output = Result<()>> + Send;

    /// Load every assignment.
    fn load_assignments(&self) -> impl Future<Output = Result<Vec<Assignment>>> + Send;
}
