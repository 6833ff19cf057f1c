mod common;
mod drive;
mod logic;
mod store;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use durian_game::ProgressionRules;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use common::scenario::{SCENARIO_KEYS, get_scenario, list_scenarios};
use common::split_csv;
use drive::{DriveOptions, run_drive, write_drive_report};
use logic::{GameTester, LogicTester, resolve_seed_inputs};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TestMode {
    /// Deterministic scenario runs on a simulated clock (fast)
    Logic,
    /// Real-time cultivation through the async driver with a save file
    Drive,
}

#[derive(Debug, Parser)]
#[command(name = "durian-tester", version = "0.1.0")]
#[command(about = "Automated QA for the Durian cultivation engine: scenarios and live driver runs")]
struct Args {
    /// Test mode: logic (simulated) or drive (real time)
    #[arg(long, value_enum, default_value_t = TestMode::Logic)]
    mode: TestMode,

    /// Scenarios to run (comma-separated, or "all")
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated integers or sweep:<base>:<count>)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per scenario (logic mode only)
    #[arg(long, default_value_t = 10)]
    iterations: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// JSON file overriding progression rules; missing fields keep defaults
    #[arg(long)]
    rules: Option<PathBuf>,

    // Drive-specific options
    /// Save file used by drive mode
    #[arg(long, default_value = "target/durian-save.json")]
    save_path: PathBuf,

    /// Accrual ticks to run before stopping (drive mode only)
    #[arg(long, default_value_t = 5)]
    ticks: u64,

    /// Skill to train while cultivating (drive mode only)
    #[arg(long)]
    skill: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();

    let rules = load_rules(args.rules.as_deref())?;
    let start_time = Instant::now();
    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;

    match args.mode {
        TestMode::Logic => {
            let scenarios = expand_scenarios(&args.scenarios);
            let game_tester = GameTester::new(rules, args.verbose);
            let all_results = run_logic_scenarios(&args, &scenarios, &seeds, &game_tester);

            write_reports(&args, &all_results, start_time)?;

            if all_results.iter().any(|r| !r.passed) {
                std::process::exit(1);
            }
        }
        TestMode::Drive => {
            let options = drive_options(&args, &seeds);
            let report = run_drive(rules, &options).await?;
            let mut output_target = OutputTarget::new(args.output.clone())?;
            write_drive_report(&mut output_target, &report, &args.report)?;
            output_target.flush_inner()?;
        }
    }

    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(output_target.writer(), "  {key:25} - {description}")?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🌿 Durian Automated Tester".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn load_rules(path: Option<&Path>) -> Result<ProgressionRules> {
    let Some(path) = path else {
        return Ok(ProgressionRules::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read rules file {}", path.display()))?;
    let rules = ProgressionRules::from_json(&raw)
        .with_context(|| format!("invalid rules in {}", path.display()))?;
    log::info!("loaded progression rules from {}", path.display());
    Ok(rules)
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.contains(&"all".to_string()) {
        scenarios.retain(|s| s != "all");
        for key in SCENARIO_KEYS {
            if !scenarios.iter().any(|s| s == key) {
                scenarios.push(key.to_string());
            }
        }
    }
    scenarios
}

fn drive_options(args: &Args, seeds: &[u64]) -> DriveOptions {
    DriveOptions {
        save_path: args.save_path.clone(),
        ticks: args.ticks,
        skill: args.skill.clone(),
        seed: seeds.first().copied().unwrap_or(1337),
        verbose: args.verbose,
    }
}

fn run_logic_scenarios(
    args: &Args,
    scenarios: &[String],
    logic_seeds: &[u64],
    game_tester: &GameTester,
) -> Vec<logic::ScenarioResult> {
    let mut results: Vec<logic::ScenarioResult> = Vec::new();
    if !matches!(args.mode, TestMode::Logic) {
        return results;
    }

    println!("{}", "🧠 Running Logic Tests".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let logic_tester = LogicTester::new(game_tester.clone(), args.verbose);

    for scenario_name in scenarios {
        if let Some(scenario) = get_scenario(scenario_name) {
            let scenario_results =
                logic_tester.run_scenario(&scenario, logic_seeds, args.iterations);
            results.extend(scenario_results);
        } else {
            eprintln!("⚠️  Unknown scenario: {}", scenario_name.yellow());
        }
    }

    results
}

fn write_reports(
    args: &Args,
    results: &[logic::ScenarioResult],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            if results.is_empty() {
                writeln!(&mut output_target, "[]")?;
            } else {
                logic::reports::generate_json_report(&mut output_target, results)?;
            }
        }
        "markdown" => {
            if results.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Durian Logic Test Results\n\n_No scenarios executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(&mut output_target, results)?;
            }
        }
        _ => {
            if results.is_empty() {
                writeln!(&mut output_target, "No logic scenarios executed.")?;
            } else {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            }
            let duration = start_time.elapsed();
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
        }
    }

    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::ScenarioResult;
    use std::time::Duration;
    use tempfile::TempDir;

    fn base_args() -> Args {
        Args {
            mode: TestMode::Logic,
            scenarios: "smoke".to_string(),
            list_scenarios: false,
            seeds: "1337".to_string(),
            iterations: 1,
            report: "json".to_string(),
            verbose: false,
            output: None,
            rules: None,
            save_path: PathBuf::from("target/durian-save.json"),
            ticks: 5,
            skill: None,
        }
    }

    fn sample_result(passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: "Smoke Test".to_string(),
            seed: 1337,
            passed,
            iterations_run: 1,
            successful_iterations: usize::from(passed),
            failures: if passed {
                vec![]
            } else {
                vec!["Iteration 1: no progress".to_string()]
            },
            average_duration: Duration::from_millis(5),
            performance_data: vec![Duration::from_millis(5)],
        }
    }

    #[test]
    fn expands_all_scenarios_keyword() {
        let expanded = expand_scenarios("all,smoke");
        assert_eq!(expanded[0], "smoke");
        assert_eq!(expanded.len(), SCENARIO_KEYS.len());
        assert!(expanded.contains(&"import-export".to_string()));
    }

    #[test]
    fn expand_scenarios_without_all_preserves_order() {
        let expanded = expand_scenarios("persistence,smoke");
        assert_eq!(expanded, vec!["persistence".to_string(), "smoke".to_string()]);
    }

    #[test]
    fn run_logic_scenarios_collects_results_per_seed() {
        let tester = GameTester::try_new(false);
        let scenarios = vec!["smoke".to_string(), "no-such-scenario".to_string()];
        let results = run_logic_scenarios(&base_args(), &scenarios, &[1, 2], &tester);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed), "{results:?}");
    }

    #[test]
    fn run_logic_scenarios_skips_in_drive_mode() {
        let tester = GameTester::try_new(false);
        let args = Args {
            mode: TestMode::Drive,
            ..base_args()
        };
        let results = run_logic_scenarios(&args, &["smoke".to_string()], &[42], &tester);
        assert!(results.is_empty());
    }

    #[test]
    fn write_reports_emits_json_output() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("report.json");
        let args = Args {
            output: Some(path.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");

        write_reports(&args, &[sample_result(true)], Instant::now()).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed[0]["scenario_name"], "Smoke Test");
    }

    #[test]
    fn write_reports_emits_markdown_report() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("report.md");
        let args = Args {
            report: "markdown".to_string(),
            output: Some(path.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("_No scenarios executed._"));

        write_reports(&args, &[sample_result(false)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("- **Failed**: 1"));
        assert!(content.contains("no progress"));
    }

    #[test]
    fn write_reports_console_includes_total_time() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("report.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(path.clone()),
            ..base_args()
        };
        write_reports(&args, &[sample_result(true)], Instant::now()).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Total time"));
        assert!(content.contains("Smoke Test"));
    }

    #[test]
    fn maybe_list_scenarios_writes_output() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("scenarios.txt");
        let args = Args {
            list_scenarios: true,
            output: Some(path.clone()),
            ..base_args()
        };
        assert!(maybe_list_scenarios(&args).unwrap());
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("Available scenarios"));
        assert!(content.contains("realm-climb"));
    }

    #[test]
    fn maybe_list_scenarios_returns_false_when_disabled() {
        assert!(!maybe_list_scenarios(&base_args()).unwrap());
    }

    #[test]
    fn load_rules_defaults_and_overrides() {
        assert_eq!(load_rules(None).unwrap(), ProgressionRules::default());

        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{ "normal_progress_delta": 7.5 }"#).unwrap();
        let rules = load_rules(Some(path.as_path())).unwrap();
        assert!((rules.normal_progress_delta - 7.5).abs() < f64::EPSILON);
        assert_eq!(
            rules.tick_interval_max_ms,
            ProgressionRules::default().tick_interval_max_ms
        );
    }

    #[test]
    fn load_rules_reports_context() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("missing.json");
        let err = load_rules(Some(missing.as_path())).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read rules file"));

        let invalid = dir.path().join("invalid.json");
        std::fs::write(&invalid, r#"{ "deviation_probability_percent": 250 }"#).unwrap();
        let err = load_rules(Some(invalid.as_path())).unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("invalid rules"));
        assert!(chain.contains("deviation_probability_percent"));
    }

    #[test]
    fn drive_options_take_first_seed() {
        let args = Args {
            skill: Some("adamant-body".to_string()),
            ticks: 9,
            ..base_args()
        };
        let options = drive_options(&args, &[77, 78]);
        assert_eq!(options.seed, 77);
        assert_eq!(options.ticks, 9);
        assert_eq!(options.skill.as_deref(), Some("adamant-body"));
    }

    #[test]
    fn output_target_stdout_writes() {
        let mut target = OutputTarget::new(None).unwrap();
        writeln!(target, "hello").unwrap();
        target.flush_inner().unwrap();
    }
}
