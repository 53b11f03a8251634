//! Error types for Lift-DB
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Lift-DB error types
#[derive(Error, Debug)]
pub enum Error {
    /// Unknown experiment id
    #[error("Experiment not found: {0}")]
    ExperimentNotFound(String),

    /// Lift requested on an experiment without a control arm
    #[error("Experiment {0} has no control variant\nMark exactly one variant with is_control = true")]
    NoControlVariant(String),

    /// Not enough samples to run a significance test.
    ///
    /// Used internally by the lift analyzer; it degrades to a
    /// `continue_testing` recommendation instead of failing the call.
    #[error("Insufficient data: need {required} samples per variant, have control={control} treatment={treatment}")]
    InsufficientData {
        /// Minimum samples required per variant
        required: usize,
        /// Control sample size
        control: usize,
        /// Treatment sample size
        treatment: usize,
    },

    /// Variant set rejected at creation time
    #[error("Invalid experiment: {0}")]
    InvalidExperiment(String),

    /// Lifecycle transition not allowed from the current status
    #[error("Invalid transition for experiment {id}: {from} -> {to}")]
    InvalidTransition {
        /// Experiment id
        id: String,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// New assignment requested on a completed or cancelled experiment
    #[error("Experiment {0} is closed and does not accept new assignments")]
    ExperimentClosed(String),

    /// Observation tagged with a variant the experiment does not own
    #[error("Variant {variant_id} does not belong to experiment {experiment_id}")]
    UnknownVariant {
        /// Experiment id
        experiment_id: String,
        /// Offending variant id
        variant_id: String,
    },

    /// Observation failed validation (count, value)
    #[error("Invalid observation: {0}")]
    InvalidObservation(String),

    /// Configuration could not be parsed or is out of range
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backing repository failure
    #[error("Repository error: {0}")]
    Repository(String),

    /// JSON encoding/decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
