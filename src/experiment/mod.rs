//! Experiment Tracking Schema and lifecycle components
//!
//! This module provides the records of an A/B experiment and the three
//! stateful components that operate on them.
//!
//! ## Schema Overview
//!
//! ```text
//! Experiment (1) ──< Variant (N, exactly one control)
//!      │
//!      ├──< Assignment (N) [entity -> variant, memoized]
//!      └──< MetricObservation (N) [append-only]
//!
//! LiftResult = derived view (control vs one treatment, one metric)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use lift_db::clock::SystemClock;
//! use lift_db::config::AssignmentPolicy;
//! use lift_db::experiment::{AssignmentEngine, ExperimentRegistry, NewExperiment};
//! use lift_db::ids::HashIdGenerator;
//!
//! let registry = ExperimentRegistry::new(Arc::new(SystemClock), Arc::new(HashIdGenerator::new()), 100);
//! let experiment = registry.create(NewExperiment::new(
//!     "Discount ladder",
//!     "Tiered discount offers for renewals",
//!     "Tiered offers lift renewal rate",
//!     "renewal_rate",
//! ))?;
//! registry.start(experiment.experiment_id(), None)?;
//!
//! let engine = AssignmentEngine::new(AssignmentPolicy::Always);
//! let variant = engine.assign(&experiment, "account-17")?;
//! assert_eq!(engine.assign(&experiment, "account-17")?, variant);
//! # Ok::<(), lift_db::Error>(())
//! ```

mod assignment;
mod experiment_record;
mod lift_record;
mod observation_record;
mod observation_store;
mod registry;
mod variant_record;

pub use assignment::{variant_index, Assignment, AssignmentEngine};
pub use experiment_record::{validate_variants, Experiment, ExperimentBuilder, ExperimentStatus};
pub use lift_record::{ArmSummary, LiftResult, Recommendation};
pub use observation_record::{MetricObservation, MetricType, NewObservation};
pub use observation_store::ObservationStore;
pub use registry::{ExperimentRegistry, NewExperiment};
pub use variant_record::Variant;

/// `DashMap` keyed with `FxHash`.
pub(crate) type FxDashMap<K, V> = dashmap::DashMap<K, V, rustc_hash::FxBuildHasher>;
