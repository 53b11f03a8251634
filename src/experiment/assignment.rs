//! Assignment Engine - deterministic (experiment, entity) -> variant mapping
//!
//! ## Algorithm
//!
//! ```text
//! index = siphash13(experiment_id ‖ entity_id) mod variants.len()
//! variant = variants[index]          // control first
//! ```
//!
//! The hash has fixed keys, so the mapping is identical across processes.
//! `target_allocation_pct` is not consulted: every variant receives an
//! approximately equal share.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Experiment, FxDashMap};
use crate::config::AssignmentPolicy;
use crate::ids::stable_hash;
use crate::{Error, Result};

/// A memoized assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    /// Experiment ID.
    pub experiment_id: String,
    /// Assigned entity (account, opportunity, rep...).
    pub entity_id: String,
    /// Variant the entity landed in.
    pub variant_id: String,
}

/// Pick the variant index for an entity without touching any cache.
///
/// Returns `None` if the experiment has no variants.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn variant_index(experiment_id: &str, entity_id: &str, variant_count: usize) -> Option<usize> {
    if variant_count == 0 {
        return None;
    }
    let hash = stable_hash(&[experiment_id, entity_id]);
    // Remainder is < variant_count, which came from a usize
    Some((hash % variant_count as u64) as usize)
}

/// Memoizing assignment engine.
///
/// The cache is keyed by experiment, then by entity, so per-experiment
/// reads never scan other experiments. Concurrent first-time requests for
/// the same pair race on one inner `DashMap` entry; the hash is
/// deterministic so every racer computes the same variant and the first
/// insert wins.
#[derive(Default)]
pub struct AssignmentEngine {
    assignments: FxDashMap<String, FxDashMap<String, String>>,
    policy: AssignmentPolicy,
}

impl AssignmentEngine {
    /// Create an engine with the given closed-experiment policy.
    #[must_use]
    pub fn new(policy: AssignmentPolicy) -> Self {
        Self {
            assignments: FxDashMap::default(),
            policy,
        }
    }

    /// Total memoized assignments across experiments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assignments.iter().map(|e| e.value().len()).sum()
    }

    /// Check if nothing has been assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.iter().all(|e| e.value().is_empty())
    }

    /// Assign an entity to a variant of `experiment`.
    ///
    /// Repeated calls with the same pair return the same variant.
    ///
    /// # Errors
    ///
    /// * `Error::ExperimentClosed` - policy is `ActiveOnly`, the experiment
    ///   is completed or cancelled, and the entity was never assigned
    /// * `Error::InvalidExperiment` - the experiment has no variants
    pub fn assign(&self, experiment: &Experiment, entity_id: &str) -> Result<String> {
        self.assign_tracked(experiment, entity_id)
            .map(|(variant_id, _)| variant_id)
    }

    /// Like [`assign`](Self::assign), also reporting whether this call
    /// created the assignment.
    pub(crate) fn assign_tracked(&self, experiment: &Experiment, entity_id: &str) -> Result<(String, bool)> {
        let experiment_id = experiment.experiment_id();
        if let Some(existing) = self.lookup(experiment_id, entity_id) {
            return Ok((existing, false));
        }

        if self.policy == AssignmentPolicy::ActiveOnly && experiment.status().is_closed() {
            return Err(Error::ExperimentClosed(experiment_id.to_string()));
        }

        let variants = experiment.variants();
        let index = variant_index(experiment_id, entity_id, variants.len()).ok_or_else(|| {
            Error::InvalidExperiment(format!("experiment {experiment_id} has no variants"))
        })?;
        let computed = variants[index].variant_id().to_string();

        // Downgrade so other experiments in the same shard stay readable
        let per_experiment = self
            .assignments
            .entry(experiment_id.to_string())
            .or_default()
            .downgrade();
        let mut created = false;
        let variant_id = per_experiment
            .entry(entity_id.to_string())
            .or_insert_with(|| {
                created = true;
                computed
            })
            .value()
            .clone();
        drop(per_experiment);

        if created {
            debug!(
                experiment_id,
                entity_id,
                variant_id = variant_id.as_str(),
                "assigned entity"
            );
        }
        Ok((variant_id, created))
    }

    /// Look up an existing assignment without computing one.
    #[must_use]
    pub fn lookup(&self, experiment_id: &str, entity_id: &str) -> Option<String> {
        let per_experiment = self.assignments.get(experiment_id)?;
        let variant_id = per_experiment.get(entity_id).map(|v| v.value().clone());
        variant_id
    }

    /// All memoized assignments for an experiment, sorted by entity ID.
    #[must_use]
    pub fn assignments(&self, experiment_id: &str) -> Vec<Assignment> {
        let Some(per_experiment) = self.assignments.get(experiment_id) else {
            return Vec::new();
        };
        let mut out: Vec<Assignment> = per_experiment
            .iter()
            .map(|e| Assignment {
                experiment_id: experiment_id.to_string(),
                entity_id: e.key().clone(),
                variant_id: e.value().clone(),
            })
            .collect();
        out.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        out
    }

    /// Seed the cache with a persisted assignment (repository hydration).
    pub fn restore(&self, assignment: Assignment) {
        self.assignments
            .entry(assignment.experiment_id)
            .or_default()
            .insert(assignment.entity_id, assignment.variant_id);
    }

    /// Drop an assignment whose write-through failed.
    pub(crate) fn forget(&self, experiment_id: &str, entity_id: &str) {
        if let Some(per_experiment) = self.assignments.get(experiment_id) {
            per_experiment.remove(entity_id);
        }
    }

    /// Distinct assigned entities per variant.
    ///
    /// Every variant of the experiment is present, with 0 when nobody
    /// landed in it.
    #[must_use]
    pub fn sample_sizes(&self, experiment: &Experiment) -> BTreeMap<String, usize> {
        let mut sizes: BTreeMap<String, usize> = experiment
            .variants()
            .iter()
            .map(|v| (v.variant_id().to_string(), 0))
            .collect();

        if let Some(per_experiment) = self.assignments.get(experiment.experiment_id()) {
            for entry in per_experiment.iter() {
                *sizes.entry(entry.value().clone()).or_insert(0) += 1;
            }
        }
        sizes
    }
}
