//! Lift analysis integration tests
//!
//! Lift results, recommendations, dashboard summaries and growth
//! attribution through the service boundary.

use chrono::{TimeZone, Utc};
use lift_db::clock::FixedClock;
use lift_db::config::{EngineConfig, GrowthConfig};
use lift_db::experiment::{
    Experiment, MetricType, NewExperiment, NewObservation, Recommendation, Variant,
};
use lift_db::ids::HashIdGenerator;
use lift_db::repository::{MemoryRepository, Repository};
use lift_db::service::ExperimentService;
use lift_db::Error;
use std::sync::Arc;

// =============================================================================
// Helpers
// =============================================================================

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap()))
}

fn service(config: EngineConfig) -> ExperimentService<MemoryRepository> {
    ExperimentService::new(
        config,
        MemoryRepository::new(),
        clock(),
        Arc::new(HashIdGenerator::new()),
    )
    .unwrap()
}

async fn record_all(
    service: &ExperimentService<MemoryRepository>,
    experiment_id: &str,
    variant_id: &str,
    metric_id: &str,
    values: &[f64],
) {
    for &value in values {
        service
            .record_observation(NewObservation::new(
                experiment_id,
                variant_id,
                metric_id,
                MetricType::Continuous,
                value,
            ))
            .await
            .unwrap();
    }
}

fn alternating(n: usize, low: f64, high: f64) -> Vec<f64> {
    (0..n).map(|i| if i % 2 == 0 { low } else { high }).collect()
}

// =============================================================================
// Lift
// =============================================================================

#[tokio::test]
async fn test_lift_means_and_relative_lift() {
    let service = service(EngineConfig::default());
    let exp = service
        .create_experiment(NewExperiment::new("Means", "", "bigger deals", "deal_size"))
        .await
        .unwrap();
    let id = exp.experiment_id();

    record_all(&service, id, "control", "deal_size", &[10.0; 40]).await;
    record_all(&service, id, "treatment", "deal_size", &[12.0; 40]).await;

    let lifts = service.calculate_lift(id, None).unwrap();
    assert_eq!(lifts.len(), 1);
    let lift = &lifts[0];
    assert_eq!(lift.metric_id, "deal_size");
    assert_eq!(lift.control_variant_id(), "control");
    assert_eq!(lift.treatment_variant_id(), "treatment");
    assert!((lift.control.mean - 10.0).abs() < 1e-12);
    assert!((lift.treatment.mean - 12.0).abs() < 1e-12);
    assert!((lift.absolute_lift - 2.0).abs() < 1e-12);
    assert!((lift.relative_lift_pct - 20.0).abs() < 1e-9);
    assert_eq!(lift.control.sample_size, 40);
    assert_eq!(lift.calculated_at, Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap());
}

#[tokio::test]
async fn test_undersampled_continues_testing() {
    let service = service(EngineConfig::default());
    let exp = service
        .create_experiment(NewExperiment::new("Small", "", "h", "win_rate"))
        .await
        .unwrap();
    let id = exp.experiment_id();

    record_all(&service, id, "control", "win_rate", &alternating(20, 0.0, 1.0)).await;
    record_all(&service, id, "treatment", "win_rate", &[1.0; 20]).await;

    let lift = &service.calculate_lift(id, None).unwrap()[0];
    assert!(!lift.is_significant);
    assert!(lift.p_value.is_none());
    assert_eq!(lift.recommendation, Recommendation::ContinueTesting);
}

#[tokio::test]
async fn test_adopt_and_reject_per_treatment() {
    let service = service(EngineConfig::default());
    let exp = service
        .create_experiment(
            NewExperiment::new("Three arm", "", "h", "arr").variants(vec![
                Variant::new("winner", "Winner", false, 0.33),
                Variant::control(),
                Variant::new("loser", "Loser", false, 0.33),
            ]),
        )
        .await
        .unwrap();
    let id = exp.experiment_id();
    assert_eq!(exp.variants()[0].variant_id(), "control");

    record_all(&service, id, "control", "arr", &alternating(60, 95.0, 105.0)).await;
    record_all(&service, id, "winner", "arr", &alternating(60, 105.0, 115.0)).await;
    record_all(&service, id, "loser", "arr", &alternating(60, 85.0, 95.0)).await;

    let lifts = service.calculate_lift(id, None).unwrap();
    let by_variant: Vec<(&str, Recommendation)> = lifts
        .iter()
        .map(|l| (l.treatment_variant_id(), l.recommendation))
        .collect();
    assert_eq!(
        by_variant,
        [("winner", Recommendation::Adopt), ("loser", Recommendation::Reject)]
    );
    assert!(lifts.iter().all(|l| l.is_significant));
    assert!(lifts.iter().all(|l| l.confidence_level > 0.95));
}

#[tokio::test]
async fn test_lift_on_empty_metric() {
    let service = service(EngineConfig::default());
    let exp = service
        .create_experiment(NewExperiment::new("Empty", "", "h", "win_rate"))
        .await
        .unwrap();

    let lift = &service.calculate_lift(exp.experiment_id(), Some("never_recorded")).unwrap()[0];
    assert_eq!(lift.metric_id, "never_recorded");
    assert_eq!(lift.control.sample_size, 0);
    assert!(lift.relative_lift_pct.abs() < f64::EPSILON);
    assert_eq!(lift.recommendation, Recommendation::ContinueTesting);
}

#[tokio::test]
async fn test_no_control_variant_after_hydration() {
    let repository = MemoryRepository::new();
    let orphan = Experiment::builder("exp-orphan", "No control")
        .primary_metric("arr")
        .variant(Variant::new("a", "A", false, 0.5))
        .variant(Variant::new("b", "B", false, 0.5))
        .build();
    repository.save_experiment(&orphan).await.unwrap();

    let service = ExperimentService::open(
        EngineConfig::default(),
        repository,
        clock(),
        Arc::new(HashIdGenerator::new()),
    )
    .await
    .unwrap();

    assert!(matches!(
        service.calculate_lift("exp-orphan", None),
        Err(Error::NoControlVariant(_))
    ));
    assert!(matches!(
        service.summarize_for_dashboard("exp-orphan"),
        Err(Error::NoControlVariant(_))
    ));
    assert!(matches!(
        service.calculate_lift("exp-missing", None),
        Err(Error::ExperimentNotFound(_))
    ));
}

// =============================================================================
// Dashboard
// =============================================================================

#[tokio::test]
async fn test_dashboard_summary() {
    let service = service(EngineConfig::default());
    let exp = service
        .create_experiment(
            NewExperiment::new("Dashboard", "desc", "faster cycles", "win_rate")
                .segment("mid_market")
                .secondary_metric("cycle_days"),
        )
        .await
        .unwrap();
    let id = exp.experiment_id();
    service.start_experiment(id, None).await.unwrap();

    for i in 0..12 {
        service.assign_entity(id, &format!("acct-{i}")).await.unwrap();
    }
    record_all(&service, id, "control", "cycle_days", &[30.0, 34.0]).await;
    record_all(&service, id, "treatment", "cycle_days", &[25.0, 27.0]).await;

    let summary = service.summarize_for_dashboard(id).unwrap();
    assert_eq!(summary.name, "Dashboard");
    assert_eq!(summary.hypothesis, "faster cycles");
    assert_eq!(summary.segment.as_deref(), Some("mid_market"));
    assert_eq!(summary.secondary_metrics, ["cycle_days"]);
    assert!(summary.start_date.is_some());
    assert!(summary.end_date.is_none());
    assert_eq!(summary.sample_sizes.values().sum::<usize>(), 12);
    assert_eq!(summary.sample_sizes.len(), 2);

    let metrics: Vec<&str> = summary.lifts.iter().map(|l| l.metric_id.as_str()).collect();
    assert_eq!(metrics, ["win_rate", "cycle_days"]);
    let cycle = &summary.lifts[1];
    assert!((cycle.control_mean - 32.0).abs() < 1e-12);
    assert!((cycle.treatment_mean - 26.0).abs() < 1e-12);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["status"], "running");
    assert_eq!(json["lifts"][1]["recommendation"], "continue_testing");
    assert_eq!(json["sample_sizes"].as_object().unwrap().len(), 2);
}

// =============================================================================
// Growth attribution
// =============================================================================

#[tokio::test]
async fn test_growth_contribution_defaults() {
    let service = service(EngineConfig::default());
    let exp = service
        .create_experiment(NewExperiment::new("Pricing page", "", "h", "arr"))
        .await
        .unwrap();

    let growth = service
        .calculate_growth_contribution(exp.experiment_id(), 45_000_000.0)
        .unwrap();
    assert_eq!(growth.experiment_name, "Pricing page");
    assert!((growth.baseline_arr - 3e9).abs() < f64::EPSILON);
    assert!((growth.target_growth_value - 450e6).abs() < 1e-3);
    assert!((growth.contribution_pct - 10.0).abs() < 1e-9);
    assert_eq!(
        growth.interpretation,
        "Pricing page adds $45.0M ARR, 10.0% of the 15% growth target ($450.0M): a major driver of the goal"
    );
}

#[tokio::test]
async fn test_growth_contribution_custom_target() {
    let config = EngineConfig::default().with_growth(GrowthConfig {
        baseline_arr: 100e6,
        target_growth_pct: 0.20,
    });
    let service = service(config);
    let exp = service
        .create_experiment(NewExperiment::new("Small bet", "", "h", "arr"))
        .await
        .unwrap();

    let growth = service
        .calculate_growth_contribution(exp.experiment_id(), 500_000.0)
        .unwrap();
    assert!((growth.contribution_pct - 2.5).abs() < 1e-9);
    assert!(growth.interpretation.contains("a meaningful contributor to"));

    let negative = service
        .calculate_growth_contribution(exp.experiment_id(), -1_000.0)
        .unwrap();
    assert!(negative.contribution_pct < 0.0);
    assert!(negative.interpretation.contains("not contributing to"));
}
