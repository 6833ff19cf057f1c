use anyhow::Result;
use durian_game::Realm;
use durian_game::constants::MAX_EVENTS;

use super::TestScenario;
use crate::logic::{SimulationPlan, SimulationSummary};

const MASTERY_SKILL: &str = "adamant-body";

pub fn realm_climb_scenario() -> TestScenario {
    TestScenario::simulation(
        "Realm Climb",
        SimulationPlan::new(1_500)
            .with_auto_breakthrough()
            .with_expectation(climb_expectation),
    )
}

pub fn skill_mastery_scenario() -> TestScenario {
    TestScenario::simulation(
        "Skill Mastery",
        SimulationPlan::new(200)
            .with_focus(MASTERY_SKILL)
            .with_tuning(|rules| rules.skill_progress_delta = 5.0)
            .with_expectation(mastery_expectation),
    )
}

pub fn event_log_cap_scenario() -> TestScenario {
    TestScenario::simulation(
        "Event Log Cap",
        SimulationPlan::new(120)
            .with_tuning(|rules| rules.cultivation_notice_percent = 100.0)
            .with_expectation(event_log_expectation),
    )
}

fn climb_expectation(summary: &SimulationSummary) -> Result<()> {
    let character = &summary.final_state.character;
    anyhow::ensure!(summary.halts > 0, "cultivation never reached a peak");
    anyhow::ensure!(
        summary.breakthroughs_succeeded > 0,
        "no breakthrough succeeded in {} attempts",
        summary.breakthroughs_attempted
    );
    anyhow::ensure!(
        character.realm > Realm::QiRefining,
        "still in {} after {} ticks",
        character.realm,
        summary.ticks_run
    );
    anyhow::ensure!(
        character.attributes.health == character.attributes.max_health,
        "breakthrough should leave health refilled"
    );
    Ok(())
}

fn mastery_expectation(summary: &SimulationSummary) -> Result<()> {
    let snapshot = &summary.final_state;
    let skill = snapshot
        .skill(MASTERY_SKILL)
        .ok_or_else(|| anyhow::anyhow!("{MASTERY_SKILL} missing from skill list"))?;
    anyhow::ensure!(
        skill.level == skill.max_level,
        "{} stuck at level {}/{}",
        skill.name,
        skill.level,
        skill.max_level
    );
    anyhow::ensure!(
        (skill.progress - 100.0).abs() < f64::EPSILON,
        "maxed skill progress should saturate at 100, got {}",
        skill.progress
    );
    let untouched = snapshot
        .skills
        .iter()
        .filter(|other| other.id != MASTERY_SKILL)
        .all(|other| other.level == 1 && other.progress.abs() < f64::EPSILON);
    anyhow::ensure!(untouched, "only the focused skill should train");
    Ok(())
}

fn event_log_expectation(summary: &SimulationSummary) -> Result<()> {
    let events = &summary.final_state.events;
    anyhow::ensure!(
        summary.max_event_log_len == MAX_EVENTS,
        "log peaked at {} entries",
        summary.max_event_log_len
    );
    anyhow::ensure!(events.len() == MAX_EVENTS, "log holds {} entries", events.len());
    let ids: Vec<u64> = events.iter().map(|event| event.id.0).collect();
    anyhow::ensure!(
        ids.windows(2).all(|pair| pair[0] > pair[1]),
        "entries must be newest first"
    );
    anyhow::ensure!(
        events.iter().all(|event| event.id.0 != 0),
        "the opening story entry should have been evicted"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::GameTester;

    fn run(scenario: &TestScenario, seed: u64) -> SimulationSummary {
        let summary = GameTester::try_new(false).run_plan(&scenario.plan, seed);
        assert!(summary.violations.is_empty(), "{:?}", summary.violations);
        summary
    }

    #[test]
    fn realm_climb_advances() {
        let scenario = realm_climb_scenario();
        climb_expectation(&run(&scenario, 1337)).unwrap();
    }

    #[test]
    fn mastery_saturates_focused_skill() {
        let scenario = skill_mastery_scenario();
        mastery_expectation(&run(&scenario, 3)).unwrap();
    }

    #[test]
    fn event_log_stays_capped() {
        let scenario = event_log_cap_scenario();
        event_log_expectation(&run(&scenario, 8)).unwrap();
    }

    #[test]
    fn mastery_expectation_rejects_fresh_player() {
        let scenario = skill_mastery_scenario();
        let mut summary = run(&scenario, 3);
        summary.final_state = durian_game::PlayerSnapshot::new_game(0);
        assert!(mastery_expectation(&summary).is_err());
    }
}
