//! Growth attribution - share of the growth target an experiment accounts for
//!
//! ```text
//! target_growth_value = baseline_arr × target_growth_pct
//! contribution_pct    = arr_impact / target_growth_value × 100
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::LiftAnalyzer;

/// Attribution of an ARR impact to the growth target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthContribution {
    /// Experiment ID.
    pub experiment_id: String,
    /// Experiment name.
    pub experiment_name: String,
    /// ARR impact attributed to the experiment.
    pub arr_impact: f64,
    /// Baseline ARR the target is expressed against.
    pub baseline_arr: f64,
    /// Target growth fraction.
    pub target_growth_pct: f64,
    /// `baseline_arr × target_growth_pct`.
    pub target_growth_value: f64,
    /// Share of the target in percent.
    pub contribution_pct: f64,
    /// Human-readable summary.
    pub interpretation: String,
}

impl LiftAnalyzer {
    /// Attribute `arr_impact` to the configured growth target.
    ///
    /// Returns `None` if the experiment does not exist.
    #[must_use]
    pub fn calculate_growth_contribution(&self, experiment_id: &str, arr_impact: f64) -> Option<GrowthContribution> {
        let Some(experiment) = self.registry.get(experiment_id) else {
            warn!(experiment_id, "growth contribution requested for unknown experiment");
            return None;
        };

        let baseline_arr = self.growth.baseline_arr;
        let target_growth_pct = self.growth.target_growth_pct;
        let target_growth_value = baseline_arr * target_growth_pct;
        let contribution_pct = if target_growth_value == 0.0 {
            0.0
        } else {
            arr_impact / target_growth_value * 100.0
        };

        let interpretation = interpret(
            experiment.name(),
            arr_impact,
            target_growth_pct,
            target_growth_value,
            contribution_pct,
        );

        Some(GrowthContribution {
            experiment_id: experiment.experiment_id().to_string(),
            experiment_name: experiment.name().to_string(),
            arr_impact,
            baseline_arr,
            target_growth_pct,
            target_growth_value,
            contribution_pct,
            interpretation,
        })
    }
}

fn interpret(
    name: &str,
    arr_impact: f64,
    target_growth_pct: f64,
    target_growth_value: f64,
    contribution_pct: f64,
) -> String {
    let role = if contribution_pct >= 10.0 {
        "a major driver of"
    } else if contribution_pct >= 1.0 {
        "a meaningful contributor to"
    } else if contribution_pct > 0.0 {
        "a marginal contributor to"
    } else {
        "not contributing to"
    };
    format!(
        "{name} adds {} ARR, {contribution_pct:.1}% of the {:.0}% growth target ({}): {role} the goal",
        format_usd(arr_impact),
        target_growth_pct * 100.0,
        format_usd(target_growth_value),
    )
}

/// Compact dollar amount: `$45.0M`, `$3.0B`, `$950K`, `$120`.
fn format_usd(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let abs = amount.abs();
    if abs >= 1e9 {
        format!("{sign}${:.1}B", abs / 1e9)
    } else if abs >= 1e6 {
        format!("{sign}${:.1}M", abs / 1e6)
    } else if abs >= 1e3 {
        format!("{sign}${:.0}K", abs / 1e3)
    } else {
        format!("{sign}${abs:.0}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(45_000_000.0), "$45.0M");
        assert_eq!(format_usd(3_000_000_000.0), "$3.0B");
        assert_eq!(format_usd(950_000.0), "$950K");
        assert_eq!(format_usd(120.0), "$120");
        assert_eq!(format_usd(-2_500_000.0), "-$2.5M");
    }

    #[test]
    fn test_interpretation_tiers() {
        assert!(interpret("X", 45e6, 0.15, 450e6, 10.0).contains("a major driver of"));
        assert!(interpret("X", 9e6, 0.15, 450e6, 2.0).contains("a meaningful contributor to"));
        assert!(interpret("X", 1e6, 0.15, 450e6, 0.2).contains("a marginal contributor to"));
        assert!(interpret("X", -1e6, 0.15, 450e6, -0.2).contains("not contributing to"));
    }

    #[test]
    fn test_interpretation_text() {
        let text = interpret("Pricing page", 45e6, 0.15, 450e6, 10.0);
        assert_eq!(
            text,
            "Pricing page adds $45.0M ARR, 10.0% of the 15% growth target ($450.0M): a major driver of the goal"
        );
    }
}
