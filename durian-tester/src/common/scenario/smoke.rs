use anyhow::Result;

use super::TestScenario;
use crate::logic::{SimulationPlan, SimulationSummary};

pub fn smoke_scenario() -> TestScenario {
    TestScenario::simulation("Smoke Test", plan())
}

fn plan() -> SimulationPlan {
    SimulationPlan::new(60)
        .with_focus("purple-heaven-art")
        .with_opening_item("qi-condensing-pill")
        .with_expectation(smoke_expectation)
}

fn smoke_expectation(summary: &SimulationSummary) -> Result<()> {
    let character = &summary.final_state.character;
    anyhow::ensure!(
        summary.ticks_run > 0,
        "cultivation should tick at least once"
    );
    anyhow::ensure!(
        character.sub_level > 1 || character.progress > 0.0,
        "realm progress should move off zero, got {} {} at {:.1}",
        character.realm,
        character.sub_level,
        character.progress
    );
    anyhow::ensure!(
        summary.items_used == 1,
        "opening pill should be consumed"
    );
    anyhow::ensure!(
        !character.buffs.is_empty(),
        "condensing pill buff should still be active"
    );
    anyhow::ensure!(
        !summary.final_state.events.is_empty(),
        "event log should not be empty"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::GameTester;

    #[test]
    fn smoke_passes_for_a_few_seeds() {
        let tester = GameTester::try_new(false);
        let scenario = smoke_scenario();
        for seed in [1, 1337, u64::MAX] {
            let summary = tester.run_plan(&scenario.plan, seed);
            assert!(summary.violations.is_empty(), "{:?}", summary.violations);
            smoke_expectation(&summary).unwrap();
        }
    }
}
