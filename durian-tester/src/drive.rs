use anyhow::{Context, Result};
use colored::Colorize;
use durian_game::{ProgressionRules, open_session, spawn_driver};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

use crate::store::FileStore;

/// Settings for a real-time driver run.
#[derive(Debug, Clone)]
pub struct DriveOptions {
    pub save_path: PathBuf,
    pub ticks: u64,
    pub skill: Option<String>,
    pub seed: u64,
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriveReport {
    pub save_path: String,
    pub seed: u64,
    pub ticks: u64,
    pub breakthroughs_attempted: usize,
    pub breakthroughs_succeeded: usize,
    pub character: String,
    pub realm: String,
    pub sub_level: u8,
    pub progress: f64,
    pub events: usize,
    pub latest_event: Option<String>,
}

/// Run the async driver against a file-backed save until `ticks` accrual
/// steps have executed, attempting a breakthrough whenever cultivation halts.
pub async fn run_drive(rules: ProgressionRules, options: &DriveOptions) -> Result<DriveReport> {
    let store = FileStore::new(&options.save_path);
    let session =
        open_session(store, rules, options.seed).context("invalid progression rules")?;
    let handle = spawn_driver(session);
    let mut updates = handle.subscribe();

    println!(
        "{} {} (save: {})",
        "🧘 Cultivating".bright_green().bold(),
        handle.state().snapshot.character.name,
        options.save_path.display()
    );
    handle.start(options.skill.clone());

    let mut attempted = 0;
    let mut succeeded = 0;
    let mut handled_tick = 0;
    let mut last_event = handle.state().snapshot.events.latest().map(|e| e.id);

    while handle.state().ticks < options.ticks {
        updates
            .changed()
            .await
            .context("cultivation driver stopped unexpectedly")?;
        let state = updates.borrow_and_update().clone();

        if options.verbose {
            let newest = state.snapshot.events.latest();
            if newest.map(|e| e.id) != last_event {
                last_event = newest.map(|e| e.id);
                if let Some(event) = newest {
                    println!("  [{}] {}: {}", state.ticks, event.title.bold(), event.description);
                }
            }
        }

        if state.ticks >= options.ticks {
            break;
        }
        if !state.cultivating && state.ticks > handled_tick {
            handled_tick = state.ticks;
            attempted += 1;
            let advanced = handle
                .attempt_breakthrough()
                .await
                .context("cultivation driver stopped unexpectedly")?;
            if advanced {
                succeeded += 1;
            }
            log::info!("breakthrough attempt {attempted}: advanced = {advanced}");
            handle.start(options.skill.clone());
        }
    }

    let ticks = handle.state().ticks;
    let final_snapshot = handle
        .shutdown()
        .await
        .context("cultivation driver stopped before shutdown")?;
    let character = &final_snapshot.character;
    Ok(DriveReport {
        save_path: options.save_path.display().to_string(),
        seed: options.seed,
        ticks,
        breakthroughs_attempted: attempted,
        breakthroughs_succeeded: succeeded,
        character: character.name.clone(),
        realm: character.realm.label().to_string(),
        sub_level: character.sub_level,
        progress: character.progress,
        events: final_snapshot.events.len(),
        latest_event: final_snapshot.events.latest().map(|e| e.title.clone()),
    })
}

pub fn write_drive_report<W: Write>(out: &mut W, report: &DriveReport, format: &str) -> Result<()> {
    match format {
        "json" => {
            serde_json::to_writer_pretty(&mut *out, report)?;
            writeln!(out)?;
        }
        "markdown" => {
            writeln!(out, "# Durian Drive Report\n")?;
            writeln!(out, "| Field | Value |")?;
            writeln!(out, "|---|---|")?;
            writeln!(out, "| Character | {} |", report.character)?;
            writeln!(out, "| Realm | {} {} |", report.realm, report.sub_level)?;
            writeln!(out, "| Progress | {:.1}% |", report.progress)?;
            writeln!(out, "| Ticks | {} |", report.ticks)?;
            writeln!(
                out,
                "| Breakthroughs | {}/{} |",
                report.breakthroughs_succeeded, report.breakthroughs_attempted
            )?;
            writeln!(out, "| Save | {} |", report.save_path)?;
        }
        _ => {
            writeln!(out, "{}", "📜 Drive Summary".bright_cyan().bold())?;
            writeln!(out, "{}", "================".cyan())?;
            writeln!(out, "Character: {}", report.character)?;
            writeln!(
                out,
                "Realm: {} {} ({:.1}%)",
                report.realm, report.sub_level, report.progress
            )?;
            writeln!(out, "Ticks: {}", report.ticks)?;
            writeln!(
                out,
                "Breakthroughs: {}/{}",
                report.breakthroughs_succeeded, report.breakthroughs_attempted
            )?;
            if let Some(latest) = &report.latest_event {
                writeln!(out, "Latest event: {latest}")?;
            }
            writeln!(out, "Save: {}", report.save_path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use durian_game::{PersistenceGateway, SnapshotStore};
    use tempfile::TempDir;

    fn fast_rules() -> ProgressionRules {
        ProgressionRules {
            tick_interval_min_ms: 1,
            tick_interval_max_ms: 2,
            ..ProgressionRules::default()
        }
    }

    fn options(dir: &TempDir, ticks: u64) -> DriveOptions {
        DriveOptions {
            save_path: dir.path().join("save.json"),
            ticks,
            skill: Some("adamant-body".to_string()),
            seed: 11,
            verbose: false,
        }
    }

    #[tokio::test]
    async fn drive_runs_requested_ticks_and_persists() {
        let dir = TempDir::new().expect("tempdir");
        let opts = options(&dir, 5);
        let report = run_drive(fast_rules(), &opts).await.unwrap();
        assert!(report.ticks >= 5);
        assert_eq!(report.character, "Nameless Wanderer");

        let store = FileStore::new(&opts.save_path);
        assert!(store.read().unwrap().is_some());
        let saved = PersistenceGateway::new(store).load(0);
        assert_eq!(saved.character.sub_level, report.sub_level);
    }

    #[tokio::test]
    async fn drive_breaks_through_when_progress_is_fast() {
        let dir = TempDir::new().expect("tempdir");
        let rules = ProgressionRules {
            normal_progress_delta: 100.0,
            deviation_probability_percent: 0.0,
            tribulation_probability_percent: 0.0,
            ..fast_rules()
        };
        let report = run_drive(rules, &options(&dir, 25)).await.unwrap();
        assert!(report.breakthroughs_succeeded >= 1);
        assert_ne!(report.realm, "Qi Refining");
    }

    #[tokio::test]
    async fn drive_rejects_invalid_rules() {
        let dir = TempDir::new().expect("tempdir");
        let rules = ProgressionRules {
            tick_interval_min_ms: 0,
            ..ProgressionRules::default()
        };
        let err = run_drive(rules, &options(&dir, 1)).await.unwrap_err();
        assert!(format!("{err:#}").contains("invalid progression rules"));
    }

    #[test]
    fn markdown_report_renders_table() {
        let report = DriveReport {
            save_path: "save.json".to_string(),
            seed: 1,
            ticks: 3,
            breakthroughs_attempted: 1,
            breakthroughs_succeeded: 1,
            character: "Meng Hao".to_string(),
            realm: "Foundation Establishment".to_string(),
            sub_level: 2,
            progress: 12.5,
            events: 4,
            latest_event: None,
        };
        let mut out = Vec::new();
        write_drive_report(&mut out, &report, "markdown").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("| Realm | Foundation Establishment 2 |"));
        assert!(text.contains("| Breakthroughs | 1/1 |"));
    }
}
