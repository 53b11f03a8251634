//! In-memory repository using `DashMap`.
//!
//! Records are stored JSON-encoded under namespaced keys, the same shape a
//! key-value backend would hold. Data is lost on process restart.

use super::Repository;
use crate::experiment::{Assignment, Experiment, MetricObservation};
use crate::Result;
use dashmap::DashMap;
use serde::de::DeserializeOwned;

const EXPERIMENT_PREFIX: &str = "experiment/";
const OBSERVATION_PREFIX: &str = "observation/";
const ASSIGNMENT_PREFIX: &str = "assignment/";

/// In-memory repository backed by a concurrent hashmap.
///
/// Thread-safe; meant for tests, demos and embedding where durability is
/// not required.
pub struct MemoryRepository {
    store: DashMap<String, Vec<u8>>,
}

impl MemoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    /// Number of stored records of every kind.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Check if the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Clear all records.
    pub fn clear(&self) {
        self.store.clear();
    }

    fn put<T: serde::Serialize>(&self, key: String, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.store.insert(key, bytes);
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>> {
        self.store
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| serde_json::from_slice(entry.value()).map_err(Into::into))
            .collect()
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MemoryRepository {
    async fn save_experiment(&self, experiment: &Experiment) -> Result<()> {
        self.put(
            format!("{EXPERIMENT_PREFIX}{}", experiment.experiment_id()),
            experiment,
        )
    }

    async fn load_experiments(&self) -> Result<Vec<Experiment>> {
        self.scan(EXPERIMENT_PREFIX)
    }

    async fn append_observation(&self, observation: &MetricObservation) -> Result<()> {
        self.put(
            format!("{OBSERVATION_PREFIX}{}", observation.observation_id()),
            observation,
        )
    }

    async fn load_observations(&self) -> Result<Vec<MetricObservation>> {
        self.scan(OBSERVATION_PREFIX)
    }

    async fn save_assignment(&self, assignment: &Assignment) -> Result<()> {
        // Length-prefixed so ("a/b", "c") and ("a", "b/c") stay distinct
        let key = format!(
            "{ASSIGNMENT_PREFIX}{}:{}/{}",
            assignment.experiment_id.len(),
            assignment.experiment_id,
            assignment.entity_id
        );
        self.put(key, assignment)
    }

    async fn load_assignments(&self) -> Result<Vec<Assignment>> {
        self.scan(ASSIGNMENT_PREFIX)
    }
}
