//! # Lift-DB: Embedded Experiment Tracking & Lift Measurement
//!
//! **Version**: 0.1.0
//!
//! Lift-DB runs controlled A/B comparisons between strategy variants:
//! it assigns entities to variants deterministically, records metric
//! observations, and turns them into lift, significance and an
//! adopt/reject recommendation.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Jidoka**: Significance is gated on a minimum sample size; an
//!   under-sampled comparison always says `continue_testing`
//! - **Poka-Yoke safety**: Exactly one control per experiment, validated at creation
//! - **Genchi Genbutsu**: Assignment is a stable hash, reproducible after restarts
//! - **Heijunka**: Policy thresholds live in configuration, not in the algorithms
//!
//! ## Components
//!
//! ```text
//! ExperimentRegistry ──> AssignmentEngine ──> ObservationStore ──> LiftAnalyzer
//!        (lifecycle)       (entity→variant)     (append-only)     (lift, p, decision)
//!                   \__________________ ExperimentService __________________/
//!                                   (write-through to a Repository)
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use lift_db::clock::SystemClock;
//! use lift_db::config::EngineConfig;
//! use lift_db::experiment::{MetricType, NewExperiment, NewObservation, Recommendation};
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
//! let exp = service
//!     .create_experiment(NewExperiment::new(
//!         "Outbound cadence",
//!         "Five-touch vs three-touch sequences",
//!         "Five touches raise meeting rate",
//!         "meeting_rate",
//!     ))
//!     .await?;
//!
//! for account in 0..10 {
//!     let variant = service.assign_entity(exp.experiment_id(), &format!("acct-{account}")).await?;
//!     service
//!         .record_observation(NewObservation::new(
//!             exp.experiment_id(),
//!             variant,
//!             "meeting_rate",
//!             MetricType::Conversion,
//!             1.0,
//!         ))
//!         .await?;
//! }
//!
//! // Ten observations are far below the 30-per-arm gate
//! for lift in service.calculate_lift(exp.experiment_id(), None)? {
//!     assert_eq!(lift.recommendation, Recommendation::ContinueTesting);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod analysis;
pub mod clock;
pub mod config;
pub mod error;
pub mod experiment;
pub mod ids;
pub mod repository;
pub mod service;

pub use error::{Error, Result};
