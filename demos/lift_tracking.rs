//! Lift Tracking Example
//!
//! Runs one pricing-page experiment end to end: create, start, assign
//! accounts, record simulated deal sizes, then read the lift, dashboard
//! and growth attribution.
//!
//! Run with: RUST_LOG=lift_db=info cargo run --example lift_tracking

use std::sync::Arc;

use lift_db::clock::SystemClock;
use lift_db::config::EngineConfig;
use lift_db::experiment::{MetricType, NewExperiment, NewObservation};
use lift_db::ids::HashIdGenerator;
use lift_db::repository::MemoryRepository;
use lift_db::service::ExperimentService;
use rand::Rng;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> lift_db::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("=== Lift-DB Experiment Tracking ===\n");

    let service = ExperimentService::new(
        EngineConfig::default(),
        MemoryRepository::new(),
        Arc::new(SystemClock),
        Arc::new(HashIdGenerator::new()),
    )?;

    // -------------------------------------------------------------------------
    // 1. Create and start the experiment
    // -------------------------------------------------------------------------
    println!("1. Creating experiment...");
    let exp = service
        .create_experiment(
            NewExperiment::new(
                "Pricing page",
                "Value-based pricing page vs feature matrix",
                "Value framing raises average deal size",
                "deal_size",
            )
            .segment("mid_market")
            .secondary_metric("win_rate")
            .owner("growth-team"),
        )
        .await?;
    let id = exp.experiment_id().to_string();
    service.start_experiment(&id, None).await?;
    println!("   ID: {id}");
    println!("   Variants: {}", exp.variants().len());

    // -------------------------------------------------------------------------
    // 2. Assign accounts and record outcomes
    // -------------------------------------------------------------------------
    println!("\n2. Assigning 400 accounts and recording deals...");
    let mut rng = rand::thread_rng();
    for account in 0..400 {
        let entity = format!("acct-{account:04}");
        let variant = service.assign_entity(&id, &entity).await?;
        let base = if variant == "control" { 40_000.0 } else { 44_000.0 };
        let deal_size = base + rng.gen_range(-8_000.0_f64..8_000.0);
        let won = if rng.gen_bool(if variant == "control" { 0.20 } else { 0.23 }) {
            1.0
        } else {
            0.0
        };

        service
            .record_observation(
                NewObservation::new(&id, variant.as_str(), "deal_size", MetricType::Continuous, deal_size)
                    .account_id(entity.as_str()),
            )
            .await?;
        service
            .record_observation(
                NewObservation::new(&id, variant.as_str(), "win_rate", MetricType::Conversion, won)
                    .account_id(entity.as_str()),
            )
            .await?;
    }
    for (variant, n) in service.sample_sizes(&id)? {
        println!("   {variant}: {n} accounts");
    }

    // -------------------------------------------------------------------------
    // 3. Lift and recommendation
    // -------------------------------------------------------------------------
    println!("\n3. Lift on deal_size:");
    for lift in service.calculate_lift(&id, None)? {
        println!(
            "   {} vs {}: {:+.2}% (confidence {:.3}) -> {}",
            lift.treatment_variant_id(),
            lift.control_variant_id(),
            lift.relative_lift_pct,
            lift.confidence_level,
            lift.recommendation
        );
    }

    // -------------------------------------------------------------------------
    // 4. Dashboard and growth attribution
    // -------------------------------------------------------------------------
    println!("\n4. Dashboard summary:");
    let summary = service.summarize_for_dashboard(&id)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(growth) = service.calculate_growth_contribution(&id, 45_000_000.0) {
        println!("\n5. Growth attribution:");
        println!("   {}", growth.interpretation);
    }

    service.stop_experiment(&id, None).await?;
    println!("\n=== Done ===");
    Ok(())
}
