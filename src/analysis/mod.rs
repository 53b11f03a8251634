//! Lift analysis
//!
//! Aggregates observations per variant, computes absolute and relative
//! lift, runs a two-sample z-test, applies the adopt/reject policy, and
//! derives the dashboard summary and growth attribution.

mod dashboard;
mod growth;
mod lift;
pub mod stats;

pub use dashboard::{DashboardSummary, LiftEntry};
pub use growth::GrowthContribution;
pub use lift::LiftAnalyzer;
