//! Variant Record - one arm of an experiment

use serde::{Deserialize, Serialize};

/// Variant Record represents one arm of an experiment.
///
/// Exactly one variant per experiment is the control; the others are
/// treatments measured against it.
///
/// `target_allocation_pct` documents the intended traffic share
/// (fractions should sum to about 1.0). Assignment does not read it:
/// entities are split uniformly across variants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Variant {
    variant_id: String,
    name: String,
    description: String,
    is_control: bool,
    target_allocation_pct: f64,
    playbook_id: Option<String>,
    playbook_version: Option<String>,
}

impl Variant {
    /// Create a new variant.
    ///
    /// # Arguments
    ///
    /// * `variant_id` - Identifier, unique within the experiment
    /// * `name` - Human-readable name
    /// * `is_control` - Whether this is the baseline arm
    /// * `target_allocation_pct` - Intended traffic share as a fraction
    #[must_use]
    pub fn new(
        variant_id: impl Into<String>,
        name: impl Into<String>,
        is_control: bool,
        target_allocation_pct: f64,
    ) -> Self {
        Self {
            variant_id: variant_id.into(),
            name: name.into(),
            description: String::new(),
            is_control,
            target_allocation_pct,
            playbook_id: None,
            playbook_version: None,
        }
    }

    /// Create the default control arm ("Control", 50%).
    #[must_use]
    pub fn control() -> Self {
        Self::new("control", "Control", true, 0.5).with_description("Baseline strategy")
    }

    /// Create the default treatment arm ("Treatment", 50%).
    #[must_use]
    pub fn treatment() -> Self {
        Self::new("treatment", "Treatment", false, 0.5).with_description("Strategy under test")
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Link the variant to an external playbook artifact.
    #[must_use]
    pub fn with_playbook(mut self, playbook_id: impl Into<String>, version: impl Into<String>) -> Self {
        self.playbook_id = Some(playbook_id.into());
        self.playbook_version = Some(version.into());
        self
    }

    /// Get the variant ID.
    #[must_use]
    pub fn variant_id(&self) -> &str {
        &self.variant_id
    }

    /// Get the variant name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether this variant is the control arm.
    #[must_use]
    pub const fn is_control(&self) -> bool {
        self.is_control
    }

    /// Get the intended traffic share.
    #[must_use]
    pub const fn target_allocation_pct(&self) -> f64 {
        self.target_allocation_pct
    }

    /// Get the linked playbook ID, if any.
    #[must_use]
    pub fn playbook_id(&self) -> Option<&str> {
        self.playbook_id.as_deref()
    }

    /// Get the linked playbook version, if any.
    #[must_use]
    pub fn playbook_version(&self) -> Option<&str> {
        self.playbook_version.as_deref()
    }
}
