//! `overtake-eval`: evaluation sweeps over traffic densities and seeds.
//!
//! The decision layer and the scenario environment live in the core crate;
//! this binary only loads configuration, runs the sweep and writes the
//! artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use highway_overtake_core_rs::policy::DecisionSource;
use highway_overtake_core_rs::{
    evaluate_policy, EvaluationConfig, EvaluationReport, MetricsAggregator, RuleBasedPolicy,
    SafetyShield, ScenarioEnvironment, ShieldStatistics, ShieldedPolicy, TrafficDensity,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    /// Rule-based baseline
    RuleBased,
    /// Rule-based baseline filtered by the safety shield
    ShieldedRuleBased,
}

#[derive(Parser, Debug)]
#[command(
    name = "overtake-eval",
    about = "Evaluate highway overtaking policies over traffic densities and seeds",
    version
)]
struct Args {
    /// YAML configuration file (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for metrics_summary.json / episodes_detail.csv files
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,

    /// Episodes per (density, seed) run
    #[arg(long, default_value_t = 20)]
    episodes: usize,

    /// Traffic densities: level names or vehicle counts
    #[arg(long, value_delimiter = ',', default_values = ["low", "medium", "high"])]
    densities: Vec<String>,

    /// Base seeds; episode i of a run uses seed + i
    #[arg(long, value_delimiter = ',', default_values_t = [42u64])]
    seeds: Vec<u64>,

    #[arg(long, value_enum, default_value_t = PolicyArg::RuleBased)]
    policy: PolicyArg,

    /// Verbosity: -v, -vv
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(path: Option<&Path>) -> Result<EvaluationConfig> {
    let Some(path) = path else {
        return Ok(EvaluationConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: EvaluationConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(config.sanitized())
}

fn parse_density(value: &str) -> TrafficDensity {
    match value.parse::<usize>() {
        Ok(count) => TrafficDensity::Count(count),
        Err(_) => TrafficDensity::Named(value.to_string()),
    }
}

/// Result of one (density, seed) run
struct RunOutput {
    policy: String,
    metrics: MetricsAggregator,
    shield: Option<ShieldStatistics>,
}

fn run_once(config: &EvaluationConfig, policy: PolicyArg, episodes: usize, seed: u64) -> Result<RunOutput> {
    let mut env = ScenarioEnvironment::new(config);
    let baseline = RuleBasedPolicy::new(config);

    let output = match policy {
        PolicyArg::RuleBased => {
            let mut source = baseline;
            let metrics = evaluate_policy(&mut env, &mut source, config, episodes, Some(seed))?;
            RunOutput {
                policy: source.name().to_string(),
                metrics,
                shield: None,
            }
        }
        PolicyArg::ShieldedRuleBased => {
            let mut source = ShieldedPolicy::new(baseline, SafetyShield::new(config));
            let metrics = evaluate_policy(&mut env, &mut source, config, episodes, Some(seed))?;
            RunOutput {
                policy: source.name().to_string(),
                metrics,
                shield: Some(source.statistics()),
            }
        }
    };
    Ok(output)
}

/// Write the run's artifacts, returning the paths written
fn write_artifacts(dir: &Path, prefix: &str, report: &EvaluationReport) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut written = Vec::new();
    let mut write = |name: &str, contents: String| -> Result<()> {
        let path = dir.join(format!("{prefix}{name}"));
        fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
        Ok(())
    };

    write("metrics_summary.json", report.summary_json()?)?;
    write("episodes_detail.csv", report.episodes_csv())?;
    if report.shield.is_some() {
        write("shield_statistics.json", report.shield_json()?)?;
    }
    Ok(written)
}

fn run(args: &Args) -> Result<()> {
    let base = load_config(args.config.as_deref())?;

    for density in &args.densities {
        let mut config = base.clone();
        config.scenario.traffic_density = parse_density(density);
        let label = config.scenario.traffic_density.label();

        for &seed in &args.seeds {
            let output = run_once(&config, args.policy, args.episodes, seed)?;
            let prefix = format!("{}_{}_seed{}_", output.policy, label, seed);
            let report = EvaluationReport::new(
                output.policy.as_str(),
                prefix.trim_end_matches('_'),
                &config,
                &output.metrics,
                output.shield,
            )?;

            let written = write_artifacts(&args.output_dir, &prefix, &report)?;
            let s = &report.summary;
            info!(
                run = %report.run_id,
                policy = %output.policy,
                density = %label,
                seed,
                vehicles = config.scenario.traffic_density.vehicles_count(),
                success_rate = %format!("{:.2}%", s.success_rate),
                collision_rate = %format!("{:.2}%", s.collision_rate),
                violation_rate = %format!("{:.2}%", s.violation_rate),
                avg_reward = %format!("{:.2}", s.avg_reward),
                avg_speed = %format!("{:.2}", s.avg_speed),
                files = written.len(),
                "run complete"
            );
            if let Some(shield) = &report.shield {
                info!(
                    checks = shield.total_checks,
                    interventions = shield.total_interventions,
                    rate = %format!("{:.2}%", shield.intervention_rate),
                    fail_closed = shield.fail_closed,
                    "shield statistics"
                );
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    info!(
        policy = ?args.policy,
        episodes = args.episodes,
        densities = ?args.densities,
        seeds = ?args.seeds,
        "overtake-eval starting"
    );
    run(&args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(dir: &Path, policy: PolicyArg) -> Args {
        Args {
            config: None,
            output_dir: dir.to_path_buf(),
            episodes: 2,
            densities: vec!["low".into(), "12".into()],
            seeds: vec![3],
            policy,
            verbose: 0,
        }
    }

    #[test]
    fn test_cli_parses_sweep_flags() {
        let args = Args::try_parse_from([
            "overtake-eval",
            "--densities",
            "low,high",
            "--seeds",
            "1,2,3",
            "--policy",
            "shielded-rule-based",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.densities, vec!["low", "high"]);
        assert_eq!(args.seeds, vec![1, 2, 3]);
        assert_eq!(args.policy, PolicyArg::ShieldedRuleBased);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.episodes, 20);
    }

    #[test]
    fn test_density_values() {
        assert_eq!(parse_density("25"), TrafficDensity::Count(25));
        assert_eq!(parse_density("high"), TrafficDensity::Named("high".into()));
    }

    #[test]
    fn test_baseline_sweep_writes_prefixed_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        run(&args(dir.path(), PolicyArg::RuleBased)).unwrap();

        for prefix in ["baseline_low_seed3_", "baseline_12veh_seed3_"] {
            assert!(dir.path().join(format!("{prefix}metrics_summary.json")).exists());
            assert!(dir.path().join(format!("{prefix}episodes_detail.csv")).exists());
            assert!(!dir.path().join(format!("{prefix}shield_statistics.json")).exists());
        }

        let csv = fs::read_to_string(dir.path().join("baseline_low_seed3_episodes_detail.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_shielded_sweep_writes_shield_statistics() {
        let dir = tempfile::tempdir().unwrap();
        run(&args(dir.path(), PolicyArg::ShieldedRuleBased)).unwrap();

        let stats = fs::read_to_string(dir.path().join("baseline_safety_low_seed3_shield_statistics.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&stats).unwrap();
        assert!(value["total_checks"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_yaml_config_is_loaded_and_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "safety:\n  min_safe_distance: -5.0\novertaking_success:\n  maintain_steps: 12\nscenario:\n  traffic_density: high\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.safety.min_safe_distance, 15.0);
        assert_eq!(config.overtaking_success.maintain_steps, 12);
        assert_eq!(config.scenario.traffic_density.vehicles_count(), 30);
    }

    #[test]
    fn test_environment_file_layout_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env.yaml");
        fs::write(
            &path,
            "lanes_count: 4\ntraffic_density: low\nepisode:\n  duration: 60\n  policy_frequency: 1\nobservation:\n  vehicles_count: 6\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.scenario.lanes_count, 4);
        assert_eq!(config.scenario.traffic_density.vehicles_count(), 10);
        assert_eq!(config.scenario.duration, 60);
        assert_eq!(config.scenario.observed_vehicles, 5);
    }

    #[test]
    fn test_missing_config_reports_path() {
        let err = load_config(Some(Path::new("/nonexistent/overtake.yaml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/overtake.yaml"));
    }
}
