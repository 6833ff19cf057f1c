use anyhow::Result;

use super::TestScenario;
use crate::logic::{Probe, SimulationPlan, SimulationSummary};

pub fn deterministic_scenario() -> TestScenario {
    TestScenario::simulation(
        "Deterministic Replay",
        SimulationPlan::new(400)
            .with_focus("eight-wilds-sword")
            .with_auto_breakthrough()
            .with_probe(Probe::Replay)
            .with_expectation(replay_expectation),
    )
}

pub fn persistence_scenario() -> TestScenario {
    TestScenario::simulation(
        "Persistence Reload",
        SimulationPlan::new(150)
            .with_focus("adamant-body")
            .with_opening_item("qi-condensing-pill")
            .with_probe(Probe::Reload)
            .with_expectation(reload_expectation),
    )
}

pub fn import_export_scenario() -> TestScenario {
    TestScenario::simulation(
        "Import/Export Round Trip",
        SimulationPlan::new(200)
            .with_focus("purple-heaven-art")
            .with_probe(Probe::RoundTrip)
            .with_expectation(round_trip_expectation),
    )
}

fn replay_expectation(summary: &SimulationSummary) -> Result<()> {
    let replay = summary
        .replay_fingerprint
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("replay probe did not run"))?;
    anyhow::ensure!(
        replay == summary.fingerprint,
        "replay diverged: {} vs {}",
        summary.fingerprint,
        replay
    );
    Ok(())
}

fn reload_expectation(summary: &SimulationSummary) -> Result<()> {
    match summary.reload_matches {
        Some(true) => Ok(()),
        Some(false) => anyhow::bail!("reloaded player differs from the saved one"),
        None => anyhow::bail!("reload probe did not run"),
    }
}

fn round_trip_expectation(summary: &SimulationSummary) -> Result<()> {
    match summary.round_trip_matches {
        Some(true) => Ok(()),
        Some(false) => anyhow::bail!("imported player differs from the exported one"),
        None => anyhow::bail!("round-trip probe did not run"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::GameTester;

    #[test]
    fn durability_scenarios_pass() {
        let tester = GameTester::try_new(false);
        let checks: [(TestScenario, fn(&SimulationSummary) -> Result<()>); 3] = [
            (deterministic_scenario(), replay_expectation),
            (persistence_scenario(), reload_expectation),
            (import_export_scenario(), round_trip_expectation),
        ];
        for (scenario, expectation) in checks {
            let summary = tester.run_plan(&scenario.plan, 2024);
            expectation(&summary).unwrap();
        }
    }

    #[test]
    fn missing_probe_results_fail() {
        let summary = GameTester::try_new(false).run_plan(&SimulationPlan::new(1), 1);
        assert!(replay_expectation(&summary).is_err());
        assert!(reload_expectation(&summary).is_err());
        assert!(round_trip_expectation(&summary).is_err());
    }
}
