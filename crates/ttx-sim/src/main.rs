//! `ttx-sim` - operator tool for scenario authors
//!
//! - `validate <file>`: load a scenario and list every structural issue
//! - `simulate <file>`: play randomized sessions and check pacing
//! - `report <file>`: summarize a scenario

mod simulate;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use serde::Serialize;
use simulate::{run_simulator, SimulatorConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use ttx_engine::{InvestigationEngine, PacingPlan};
use ttx_scenario::{ScenarioModel, ValidationError};
use ttx_store::{FileSessionStore, DEFAULT_MAX_SESSIONS};

fn cli() -> Command {
    let file = Arg::new("file")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Scenario YAML file");
    let json = Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON");

    Command::new("ttx-sim")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Tabletop exercise scenario validator and simulator")
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate a scenario file")
                .arg(file.clone()),
        )
        .subcommand(
            Command::new("simulate")
                .about("Play randomized sessions against a scenario")
                .arg(file.clone())
                .arg(
                    Arg::new("sessions")
                        .long("sessions")
                        .default_value("100")
                        .value_parser(value_parser!(usize))
                        .help("Number of sessions to simulate"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("store")
                        .long("store")
                        .value_parser(value_parser!(PathBuf))
                        .help("Save finished sessions to this directory"),
                )
                .arg(json.clone()),
        )
        .subcommand(
            Command::new("report")
                .about("Summarize a scenario")
                .arg(file)
                .arg(json),
        )
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_scenario(path: &Path) -> Result<Result<ScenarioModel, ValidationError>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(ScenarioModel::load(&raw))
}

fn load_scenario(path: &Path) -> Result<ScenarioModel> {
    read_scenario(path)?.with_context(|| format!("invalid scenario {}", path.display()))
}

fn validate(path: &Path) -> Result<bool> {
    match read_scenario(path)? {
        Ok(model) => {
            println!(
                "{}: OK ({} phases, {} evidence items, budget {})",
                model.id(),
                model.phases().len(),
                model.evidence_count(),
                model.investigation_budget()
            );
            Ok(true)
        }
        Err(ValidationError::Malformed(e)) => {
            println!("{}: malformed: {e}", path.display());
            Ok(false)
        }
        Err(err) => {
            println!("{}: {} issue(s)", path.display(), err.issues().len());
            for issue in err.issues() {
                println!("  - {issue}");
            }
            Ok(false)
        }
    }
}

#[derive(Debug, Serialize)]
struct PhaseSummary {
    id: String,
    name: String,
    evidence: usize,
    points: f64,
}

#[derive(Debug, Serialize)]
struct ScenarioSummary {
    id: String,
    name: String,
    difficulty: String,
    phases: Vec<PhaseSummary>,
    genuine: usize,
    herrings: usize,
    red_herring_ratio: f64,
    budget: u32,
    planned_disclosures: u32,
    herring_quota: u32,
    max_score: f64,
}

fn summarize(model: &ScenarioModel) -> ScenarioSummary {
    let plan = PacingPlan::for_scenario(model);
    ScenarioSummary {
        id: model.id().to_string(),
        name: model.metadata().name.clone(),
        difficulty: format!("{:?}", model.metadata().difficulty).to_lowercase(),
        phases: model
            .phases()
            .iter()
            .map(|phase| PhaseSummary {
                id: phase.id.to_string(),
                name: phase.name.clone(),
                evidence: phase.evidence.len(),
                points: model.phase_points(phase),
            })
            .collect(),
        genuine: model.genuine_count(),
        herrings: model.herring_count(),
        red_herring_ratio: model.red_herring_ratio(),
        budget: model.investigation_budget(),
        planned_disclosures: plan.planned,
        herring_quota: plan.herring_quota,
        max_score: model.rubric().max_score,
    }
}

fn print_summary(summary: &ScenarioSummary) {
    println!("Scenario {} - {}", summary.id, summary.name);
    println!("  Difficulty: {}", summary.difficulty);
    println!("  Kill chain:");
    for phase in &summary.phases {
        println!(
            "    {} {} ({} evidence, {:.1} pts)",
            phase.id, phase.name, phase.evidence, phase.points
        );
    }
    println!(
        "  Evidence: {} genuine, {} red herrings (target ratio {:.2})",
        summary.genuine, summary.herrings, summary.red_herring_ratio
    );
    println!(
        "  Budget: {} ({} planned disclosures, {} herrings)",
        summary.budget, summary.planned_disclosures, summary.herring_quota
    );
    println!("  Max score: {:.1}", summary.max_score);
}

async fn simulate(
    path: &Path,
    config: SimulatorConfig,
    store_dir: Option<&PathBuf>,
    json: bool,
) -> Result<bool> {
    let engine = Arc::new(InvestigationEngine::new(Arc::new(load_scenario(path)?)));
    info!(
        scenario = %engine.scenario().id(),
        sessions = config.sessions,
        seed = config.seed,
        "starting simulation"
    );
    let (report, states) = run_simulator(Arc::clone(&engine), config).await?;

    if let Some(dir) = store_dir {
        let store = FileSessionStore::open(dir).await?;
        for state in &states {
            engine.save(&store, state).await?;
        }
        let pruned = store.prune(DEFAULT_MAX_SESSIONS).await?;
        info!(
            dir = %dir.display(),
            saved = states.len(),
            pruned = pruned.len(),
            "sessions stored"
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.generate_text());
    }
    Ok(report.passed())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let passed = match matches.subcommand() {
        Some(("validate", args)) => {
            let file = args
                .get_one::<PathBuf>("file")
                .context("missing scenario file")?;
            validate(file)?
        }
        Some(("simulate", args)) => {
            let file = args
                .get_one::<PathBuf>("file")
                .context("missing scenario file")?;
            let config = SimulatorConfig {
                sessions: args.get_one::<usize>("sessions").copied().unwrap_or(100),
                seed: args.get_one::<u64>("seed").copied().unwrap_or(42),
            };
            simulate(file, config, args.get_one::<PathBuf>("store"), args.get_flag("json")).await?
        }
        Some(("report", args)) => {
            let file = args
                .get_one::<PathBuf>("file")
                .context("missing scenario file")?;
            let summary = summarize(&load_scenario(file)?);
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
            true
        }
        _ => true,
    };

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ttx_test_utils::lanternfish;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn simulate_defaults_parse() {
        let matches = cli()
            .try_get_matches_from(["ttx-sim", "simulate", "scenario.yaml"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "simulate");
        assert_eq!(args.get_one::<usize>("sessions"), Some(&100));
        assert_eq!(args.get_one::<u64>("seed"), Some(&42));
        assert!(args.get_one::<PathBuf>("store").is_none());
    }

    #[test]
    fn lanternfish_summary() {
        let summary = summarize(&lanternfish());
        assert_eq!(summary.id, "LANTERN-01");
        assert_eq!(summary.phases.len(), 5);
        assert_eq!(summary.genuine, 12);
        assert_eq!(summary.herrings, 4);
        assert_eq!(summary.planned_disclosures, 16);
        assert_eq!(summary.max_score, 100.0);
    }
}
