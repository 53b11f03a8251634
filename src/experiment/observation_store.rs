//! Observation Store - append-only log of metric observations
//!
//! This module provides the ingestion layer for lift measurement. The log
//! never mutates or deletes a record; readers get cloned snapshots, so an
//! analysis never sees a half-finished append.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use super::{MetricObservation, NewObservation};
use crate::clock::Clock;
use crate::ids::IdGenerator;
use crate::Result;

/// Append-only, thread-safe store of metric observations.
pub struct ObservationStore {
    observations: RwLock<Vec<MetricObservation>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl ObservationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            observations: RwLock::new(Vec::new()),
            clock,
            ids,
        }
    }

    /// Number of stored observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Record an observation.
    ///
    /// The ID hashes every input field plus the timestamp. Variant
    /// membership is not checked here; see
    /// [`ExperimentService::record_observation`](crate::service::ExperimentService::record_observation).
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidObservation` for a non-finite value or a zero count.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use lift_db::clock::SystemClock;
    /// use lift_db::experiment::{MetricType, NewObservation, ObservationStore};
    /// use lift_db::ids::HashIdGenerator;
    ///
    /// let store = ObservationStore::new(Arc::new(SystemClock), Arc::new(HashIdGenerator::new()));
    /// for deal in 0..10 {
    ///     let won = if deal % 3 == 0 { 1.0 } else { 0.0 };
    ///     store.record(NewObservation::new("exp-1", "control", "win_rate", MetricType::Conversion, won))?;
    /// }
    /// assert_eq!(store.query("exp-1", Some("win_rate"), None).len(), 10);
    /// # Ok::<(), lift_db::Error>(())
    /// ```
    pub fn record(&self, input: NewObservation) -> Result<MetricObservation> {
        let observation = self.prepare(input)?;
        self.append(observation.clone());
        Ok(observation)
    }

    /// Validate an input and build its record without storing it.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidObservation` for a non-finite value or a zero count.
    pub fn prepare(&self, input: NewObservation) -> Result<MetricObservation> {
        input.validate()?;
        let observed_at = self.clock.now();
        let timestamp = observed_at.to_rfc3339();

        let parts = input.id_parts();
        let mut id_parts: Vec<&str> = parts.iter().map(String::as_str).collect();
        id_parts.push(timestamp.as_str());
        let observation_id = self.ids.generate(&id_parts);

        Ok(input.into_record(observation_id, observed_at))
    }

    /// Append a built record as-is (write-through and repository hydration).
    pub fn append(&self, observation: MetricObservation) {
        debug!(
            experiment_id = observation.experiment_id(),
            variant_id = observation.variant_id(),
            metric_id = observation.metric_id(),
            value = observation.value(),
            "appended observation"
        );
        self.write().push(observation);
    }

    /// Observations for an experiment, optionally narrowed by metric and variant.
    ///
    /// Order is not guaranteed; sort if it matters.
    #[must_use]
    pub fn query(
        &self,
        experiment_id: &str,
        metric_id: Option<&str>,
        variant_id: Option<&str>,
    ) -> Vec<MetricObservation> {
        self.read()
            .iter()
            .filter(|o| o.experiment_id() == experiment_id)
            .filter(|o| metric_id.map_or(true, |m| o.metric_id() == m))
            .filter(|o| variant_id.map_or(true, |v| o.variant_id() == v))
            .cloned()
            .collect()
    }

    /// Values only, for one (experiment, metric, variant) cell.
    #[must_use]
    pub fn values(&self, experiment_id: &str, metric_id: &str, variant_id: &str) -> Vec<f64> {
        self.read()
            .iter()
            .filter(|o| {
                o.experiment_id() == experiment_id
                    && o.metric_id() == metric_id
                    && o.variant_id() == variant_id
            })
            .map(MetricObservation::value)
            .collect()
    }

    // Appends are all-or-nothing pushes, so a poisoned lock still guards
    // a consistent Vec.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<MetricObservation>> {
        self.observations.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<MetricObservation>> {
        self.observations.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::experiment::MetricType;
    use crate::ids::HashIdGenerator;
    use crate::Error;
    use std::collections::HashSet;

    fn store() -> ObservationStore {
        ObservationStore::new(Arc::new(SystemClock), Arc::new(HashIdGenerator::new()))
    }

    fn obs(variant: &str, metric: &str, value: f64) -> NewObservation {
        NewObservation::new("exp-1", variant, metric, MetricType::Continuous, value)
    }

    #[test]
    fn test_store_default() {
        let store = store();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert!(store.query("exp-1", None, None).is_empty());
    }

    #[test]
    fn test_record_returns_created_record() {
        let store = store();
        let created = store
            .record(obs("control", "arr", 1200.0).account_id("acct-7").opportunity_id("opp-3"))
            .unwrap();
        assert_eq!(created.experiment_id(), "exp-1");
        assert_eq!(created.account_id(), Some("acct-7"));
        assert_eq!(created.opportunity_id(), Some("opp-3"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.query("exp-1", None, None)[0], created);
    }

    #[test]
    fn test_identical_inputs_get_distinct_ids() {
        let store = store();
        let ids: HashSet<String> = (0..50)
            .map(|_| store.record(obs("control", "arr", 1.0)).unwrap().observation_id().to_string())
            .collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_query_filters() {
        let store = store();
        store.record(obs("control", "arr", 1.0)).unwrap();
        store.record(obs("control", "win_rate", 1.0)).unwrap();
        store.record(obs("treatment", "arr", 2.0)).unwrap();
        store
            .record(NewObservation::new("exp-2", "control", "arr", MetricType::Continuous, 9.0))
            .unwrap();

        assert_eq!(store.query("exp-1", None, None).len(), 3);
        assert_eq!(store.query("exp-1", Some("arr"), None).len(), 2);
        assert_eq!(store.query("exp-1", Some("arr"), Some("treatment")).len(), 1);
        assert_eq!(store.query("exp-1", None, Some("control")).len(), 2);
        assert_eq!(store.query("exp-2", None, None).len(), 1);
        assert!(store.query("exp-3", None, None).is_empty());

        let mut values = store.values("exp-1", "arr", "control");
        values.sort_by(f64::total_cmp);
        assert_eq!(values, vec![1.0]);
    }

    #[test]
    fn test_invalid_observation_not_stored() {
        let store = store();
        let err = store.record(obs("control", "arr", f64::INFINITY)).unwrap_err();
        assert!(matches!(err, Error::InvalidObservation(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_appends() {
        let store = Arc::new(store());
        let handles: Vec<_> = (0..8_i32)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        store.record(obs("control", "arr", f64::from(t * 100 + i))).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 800);
    }
}
