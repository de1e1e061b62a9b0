//! scenario-runner: headless pricing-scenario evaluator.
//!
//! Usage:
//!   scenario-runner --scenario scenario.json [--segments segments.json]
//!                   [--data-dir ./data] [--seed 42] [--json]
//!   scenario-runner --ipc-mode [--data-dir ./data] [--seed 42]

use anyhow::{Context, Result};
use elasticity_core::{
    config::ModelConfig,
    engine::{ScenarioEngine, ScenarioEvaluation},
    migration::MigrationMatrix,
    profile_mixer::{CohortSelection, ElasticityProfile, ProfileWeights},
    rng::RngBank,
    scenario::{Scenario, Segment},
    segment_axes::SegmentAxes,
    types::TierLabel,
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcRequest {
    Evaluate {
        scenario: Scenario,
        #[serde(default)]
        segments: Vec<Segment>,
    },
    Migration {
        scenario: Scenario,
    },
    Mix {
        /// `acquisition|engagement|monetization`, `*` for an unset axis.
        key: String,
        #[serde(default)]
        tier: TierLabel,
    },
    /// `"baseline"` or `{"archetype": "deal_hunter"}`.
    Cohort {
        cohort: CohortSelection,
        #[serde(default)]
        tier: TierLabel,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct EvaluationReport {
    evaluation_id: String,
    seed:          u64,
    scenario:      Scenario,
    #[serde(flatten)]
    evaluation:    ScenarioEvaluation,
}

#[derive(serde::Serialize)]
struct MigrationReport {
    evaluation_id: String,
    #[serde(flatten)]
    matrix:        MigrationMatrix,
}

#[derive(serde::Serialize)]
struct CohortReport {
    cohort:  CohortSelection,
    profile: ElasticityProfile,
}

#[derive(serde::Serialize)]
struct MixReport {
    key:     String,
    weights: ProfileWeights,
    profile: ElasticityProfile,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let json = args.iter().any(|a| a == "--json");
    let seed: Option<u64> = find_arg(&args, "--seed").and_then(|s| s.parse().ok());
    let data_dir = find_arg(&args, "--data-dir");

    let config = match data_dir {
        Some(dir) => ModelConfig::load(dir)?,
        None => ModelConfig::builtin(),
    };
    let engine = match seed {
        Some(seed) => ScenarioEngine::new(&config, seed),
        None => ScenarioEngine::from_entropy(&config),
    };

    if ipc_mode {
        return run_ipc_loop(&engine);
    }

    let scenario_path = find_arg(&args, "--scenario")
        .context("--scenario <path> is required outside --ipc-mode")?;
    let scenario: Scenario = read_json(scenario_path)?;
    let segments: Vec<Segment> = match find_arg(&args, "--segments") {
        Some(path) => read_json(path)?,
        None => vec![default_segment(&config, &scenario)],
    };

    let report = EvaluationReport {
        evaluation_id: uuid::Uuid::new_v4().to_string(),
        seed:          engine.seed(),
        evaluation:    engine.evaluate(&scenario, &segments)?,
        scenario,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report, data_dir.unwrap_or("(builtin)"));
    }

    Ok(())
}

fn run_ipc_loop(engine: &ScenarioEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();
    let mix_bank = RngBank::new(engine.seed());
    let mut mix_count = 0usize;

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let request: IpcRequest = match serde_json::from_str(&buffer) {
            Ok(r) => r,
            Err(e) => {
                write_error(&mut stdout, e)?;
                continue;
            }
        };

        let response = match request {
            IpcRequest::Quit => break,
            IpcRequest::Evaluate { scenario, segments } => {
                engine.evaluate(&scenario, &segments).map_err(anyhow::Error::from).and_then(|evaluation| {
                    Ok(serde_json::to_value(EvaluationReport {
                        evaluation_id: uuid::Uuid::new_v4().to_string(),
                        seed: engine.seed(),
                        scenario,
                        evaluation,
                    })?)
                })
            }
            IpcRequest::Migration { scenario } => {
                engine.predict_migration_matrix(&scenario).map_err(anyhow::Error::from).and_then(|matrix| {
                    Ok(serde_json::to_value(MigrationReport {
                        evaluation_id: uuid::Uuid::new_v4().to_string(),
                        matrix,
                    })?)
                })
            }
            IpcRequest::Mix { key, tier } => {
                let mut rng = mix_bank.for_segment(mix_count);
                mix_count += 1;
                key.parse::<SegmentAxes>()
                    .map_err(anyhow::Error::msg)
                    .and_then(|axes| {
                        let weights = engine.mixer().mix(&axes)?;
                        let profile = engine.mixer().blend(&weights, tier.tier(), &mut rng)?;
                        Ok(serde_json::to_value(MixReport { key, weights, profile })?)
                    })
            }
            IpcRequest::Cohort { cohort, tier } => {
                engine.cohort_profile(cohort, tier.tier()).map_err(anyhow::Error::from).and_then(|profile| {
                    Ok(serde_json::to_value(CohortReport { cohort, profile })?)
                })
            }
        };

        match response {
            Ok(value) => writeln!(stdout, "{value}")?,
            Err(e) => {
                log::warn!("runner: request failed: {e}");
                write_error(&mut stdout, e)?;
                continue;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn write_error(stdout: &mut io::Stdout, e: impl std::fmt::Display) -> Result<()> {
    let err_json = serde_json::json!({ "error": e.to_string() });
    writeln!(stdout, "{err_json}")?;
    stdout.flush()?;
    Ok(())
}

/// One reference-population segment named after the scenario's target,
/// at the scenario's segment elasticity.
fn default_segment(config: &ModelConfig, scenario: &Scenario) -> Segment {
    Segment::new(
        scenario.target_segment.clone(),
        config.acquisition.reference_population as u64,
        scenario.segment_elasticity,
    )
}

fn print_summary(report: &EvaluationReport, data_dir: &str) {
    let s = &report.scenario;
    let e = &report.evaluation;

    println!("=== SCENARIO ===");
    println!("  evaluation_id:  {}", report.evaluation_id);
    println!("  seed:           {}", report.seed);
    println!("  data_dir:       {data_dir}");
    println!("  price:          ${:.2}", s.new_price);
    println!("  price change:   {:+.1}%", s.price_change_pct());
    println!("  promo discount: {:.0}%", s.discount_pct());
    println!("  topology:       {}", e.tier_config);
    println!();

    println!("=== SEGMENTS ===");
    for seg in &e.segments {
        let peak = seg
            .repeat_loss
            .uplift_pp
            .values()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        println!(
            "  {:<28} size {:>8} | e {:+.2} | adds {:>8.1} (±{:.1}%) | peak repeat-loss {:+.2}pp",
            seg.name,
            seg.size,
            seg.elasticity,
            seg.acquisition.predicted_adds,
            seg.acquisition.confidence_pct,
            peak,
        );
    }
    println!("  total adds: {:.1}", e.total_predicted_adds());
    println!();

    println!("=== MIGRATION ({}) ===", e.tier_config);
    for (origin, row) in &e.migration.transitions {
        let cells: Vec<String> = row
            .iter()
            .filter(|(_, p)| **p > 0.0)
            .map(|(d, p)| format!("{}={p:.3}", d.as_str()))
            .collect();
        println!("  from {:<13} {}", origin.as_str(), cells.join("  "));
    }
}

fn find_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Cannot read {path}"))?;
    serde_json::from_str(&content).with_context(|| format!("Cannot parse {path}"))
}
