//! rb-dst: run a deterministic simulation against the heap ring buffer.
//!
//! # Usage
//!
//! ```bash
//! rb-dst --policy block --capacity 4 --iterations 10000 --seed 12345
//! rb-dst --model-check --json
//! RUST_LOG=rb_dst=debug rb-dst --fault-probability 0.3
//! ```
//!
//! Exits non-zero when an invariant is violated, the buffer diverges from
//! the model, or model checking finds a counterexample.

use std::process;

use clap::Parser;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rb_dst::{random_operations, run_dst_scenario, DeterministicRng, DstConfig, FaultConfig};
use rb_ring::{HeapRingBuffer, OverflowPolicy};
use rb_stateright::check_model;

/// Largest capacity the exhaustive model check is run at.
const MODEL_CAPACITY_MAX: usize = 3;

/// Messages the model check generates per configuration.
const MODEL_MESSAGES: u64 = 5;

/// Deterministic simulation runner for SPSC ring buffers.
#[derive(Parser, Debug)]
#[command(name = "rb-dst")]
#[command(about = "Deterministic simulation testing for SPSC ring buffers")]
struct Cli {
    /// Overflow policy: overwrite or block.
    #[arg(long, default_value_t = OverflowPolicy::Overwrite)]
    policy: OverflowPolicy,

    /// Buffer capacity.
    #[arg(long, default_value_t = 4)]
    capacity: usize,

    /// Number of operations (defaults to DST_ITERATIONS, then 1000).
    #[arg(long)]
    iterations: Option<usize>,

    /// DST seed (DST_SEED or random if not set).
    #[arg(long)]
    seed: Option<u64>,

    /// Probability of a fault at each operation boundary.
    #[arg(long, default_value_t = FaultConfig::default().probability)]
    fault_probability: f64,

    /// Also model check both policies exhaustively at small capacities.
    #[arg(long)]
    model_check: bool,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if !(0.0..=1.0).contains(&cli.fault_probability) {
        eprintln!(
            "Error: --fault-probability must be in [0, 1], got {}",
            cli.fault_probability
        );
        process::exit(2);
    }

    // --seed and --iterations replace their variables; the other is still read.
    let config = match DstConfig::resolve(cli.seed, cli.iterations) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    }
    .with_policy(cli.policy)
    .with_capacity(cli.capacity)
    .with_faults(FaultConfig::default().with_probability(cli.fault_probability));

    info!(
        seed = config.seed,
        policy = %config.policy,
        capacity = config.capacity,
        "starting DST run"
    );

    let operations = random_operations(&mut DeterministicRng::new(config.seed), config.iterations);
    let result = match run_dst_scenario::<HeapRingBuffer<u64>>(&config, operations) {
        Ok(result) => result,
        Err(e) => {
            if cli.json {
                let output = json!({
                    "passed": false,
                    "config": config,
                    "error": e.to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
            } else {
                eprintln!("Error: {e}");
            }
            process::exit(1);
        }
    };

    let models: Vec<_> = if cli.model_check {
        OverflowPolicy::ALL
            .into_iter()
            .flat_map(|policy| {
                (1..=MODEL_CAPACITY_MAX)
                    .map(move |capacity| check_model(policy, capacity, MODEL_MESSAGES))
            })
            .collect()
    } else {
        Vec::new()
    };

    let passed = result.passed && models.iter().all(|m| m.passed());

    if cli.json {
        let properties: Vec<serde_json::Value> = result
            .properties
            .iter()
            .map(|p| {
                json!({
                    "name": p.name,
                    "holds": p.holds,
                    "violation": p.violation,
                })
            })
            .collect();
        let model_checks: Vec<serde_json::Value> = models
            .iter()
            .map(|m| {
                json!({
                    "policy": m.policy,
                    "capacity": m.capacity,
                    "unique_states": m.unique_states,
                    "violated": m.violated,
                    "unreached": m.unreached,
                    "passed": m.passed(),
                })
            })
            .collect();

        let output = json!({
            "passed": passed,
            "config": config,
            "stats": result.stats,
            "divergence": result.divergence,
            "counterexample": result.counterexample.as_ref().map(|c| c.render_diagram()),
            "properties": properties,
            "fault_errors": result.fault_errors.len(),
            "model_checks": model_checks,
        });
        println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
    } else {
        println!("{}", result.format());
        for property in &result.properties {
            println!("  {}", property.format_status());
        }
        for model in &models {
            println!("{}", model.format());
        }
    }

    if !passed {
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from([
            "rb-dst",
            "--policy",
            "block",
            "--capacity",
            "8",
            "--seed",
            "7",
            "--fault-probability",
            "0.25",
            "--model-check",
            "--json",
        ]);
        assert_eq!(cli.policy, OverflowPolicy::Block);
        assert_eq!(cli.capacity, 8);
        assert_eq!(cli.seed, Some(7));
        assert!(cli.model_check && cli.json);
        assert!(cli.iterations.is_none());
    }

    #[test]
    fn test_cli_rejects_resize() {
        assert!(Cli::try_parse_from(["rb-dst", "--policy", "resize"]).is_err());
    }
}
