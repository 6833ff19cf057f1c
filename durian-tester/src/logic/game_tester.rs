use anyhow::Result;
use colored::Colorize;
use durian_game::constants::{MAX_EVENTS, MAX_PROGRESS, MAX_SUB_LEVEL};
use durian_game::{
    CultivationEngine, CultivationSession, ManualClock, MemoryStore, PersistenceGateway,
    PlayerSnapshot, ProgressionRules, export_save,
};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Wall-clock origin for simulated runs (2024-01-01T00:00:00Z).
pub const SIMULATION_EPOCH_MS: i64 = 1_704_067_200_000;

pub type Expectation = fn(&SimulationSummary) -> Result<()>;
pub type RulesTuning = fn(&mut ProgressionRules);

/// Extra checks performed once the main run finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Re-run the plan with the same seed and record its fingerprint.
    Replay,
    /// Reopen a session over the run's store and compare the loaded player.
    Reload,
    /// Export the final player and import it into a fresh session.
    RoundTrip,
}

#[derive(Clone)]
pub struct SimulationPlan {
    pub ticks: usize,
    pub focus_skill: Option<&'static str>,
    pub auto_breakthrough: bool,
    pub opening_items: Vec<&'static str>,
    pub tuning: Option<RulesTuning>,
    pub probes: Vec<Probe>,
    pub expectations: Vec<Expectation>,
}

impl std::fmt::Debug for SimulationPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationPlan")
            .field("ticks", &self.ticks)
            .field("focus_skill", &self.focus_skill)
            .field("auto_breakthrough", &self.auto_breakthrough)
            .field("opening_items", &self.opening_items)
            .field("probes", &self.probes)
            .field("expectations", &self.expectations.len())
            .finish_non_exhaustive()
    }
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(ticks: usize) -> Self {
        Self {
            ticks,
            focus_skill: None,
            auto_breakthrough: false,
            opening_items: Vec::new(),
            tuning: None,
            probes: Vec::new(),
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_focus(mut self, skill_id: &'static str) -> Self {
        self.focus_skill = Some(skill_id);
        self
    }

    #[must_use]
    pub fn with_auto_breakthrough(mut self) -> Self {
        self.auto_breakthrough = true;
        self
    }

    #[must_use]
    pub fn with_opening_item(mut self, item_id: &'static str) -> Self {
        self.opening_items.push(item_id);
        self
    }

    #[must_use]
    pub fn with_tuning(mut self, tuning: RulesTuning) -> Self {
        self.tuning = Some(tuning);
        self
    }

    #[must_use]
    pub fn with_probe(mut self, probe: Probe) -> Self {
        self.probes.push(probe);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: Expectation) -> Self {
        self.expectations.push(expectation);
        self
    }
}

#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub ticks_run: usize,
    pub deviations: usize,
    pub halts: usize,
    pub breakthroughs_attempted: usize,
    pub breakthroughs_succeeded: usize,
    pub items_used: usize,
    pub max_event_log_len: usize,
    pub violations: Vec<String>,
    pub final_state: PlayerSnapshot,
    pub fingerprint: String,
    pub replay_fingerprint: Option<String>,
    pub reload_matches: Option<bool>,
    pub round_trip_matches: Option<bool>,
}

/// Drives cultivation sessions against an in-memory store and a manual clock.
#[derive(Debug, Clone)]
pub struct GameTester {
    rules: ProgressionRules,
    verbose: bool,
}

impl GameTester {
    #[must_use]
    pub const fn new(rules: ProgressionRules, verbose: bool) -> Self {
        Self { rules, verbose }
    }

    #[must_use]
    pub fn try_new(verbose: bool) -> Self {
        Self::new(ProgressionRules::default(), verbose)
    }

    fn engine_for(&self, plan: &SimulationPlan) -> CultivationEngine {
        let mut rules = self.rules.clone();
        if let Some(tune) = plan.tuning {
            tune(&mut rules);
        }
        CultivationEngine::new(rules)
    }

    /// Execute a plan once for `seed`, including any requested probes.
    #[must_use]
    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> SimulationSummary {
        let store = MemoryStore::new();
        let mut summary = self.simulate(plan, seed, store.clone());

        for probe in &plan.probes {
            match probe {
                Probe::Replay => {
                    let replay = self.simulate(plan, seed, MemoryStore::new());
                    summary.replay_fingerprint = Some(replay.fingerprint);
                }
                Probe::Reload => {
                    let reopened = CultivationSession::open(
                        self.engine_for(plan),
                        PersistenceGateway::new(store.clone()),
                        ManualClock::starting_at(SIMULATION_EPOCH_MS),
                        seed,
                    );
                    let loaded = reopened.snapshot();
                    let matches = same_progression(&loaded, &summary.final_state)
                        && event_ids(&loaded) == event_ids(&summary.final_state);
                    summary.reload_matches = Some(matches);
                }
                Probe::RoundTrip => {
                    summary.round_trip_matches = Some(self.round_trip(plan, seed, &summary));
                }
            }
        }

        if self.verbose {
            println!(
                "    seed {} -> {} {} ({:.1}%), ticks {}, breakthroughs {}/{}, fingerprint {}",
                seed,
                summary.final_state.character.realm,
                summary.final_state.character.sub_level,
                summary.final_state.character.progress,
                summary.ticks_run,
                summary.breakthroughs_succeeded,
                summary.breakthroughs_attempted,
                summary.fingerprint.dimmed()
            );
        }
        summary
    }

    fn simulate(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        store: MemoryStore,
    ) -> SimulationSummary {
        let clock = ManualClock::starting_at(SIMULATION_EPOCH_MS);
        let mut session = CultivationSession::open(
            self.engine_for(plan),
            PersistenceGateway::new(store),
            clock.clone(),
            seed,
        );
        let focus = plan.focus_skill.map(str::to_string);
        let mut summary = SimulationSummary {
            seed,
            ticks_run: 0,
            deviations: 0,
            halts: 0,
            breakthroughs_attempted: 0,
            breakthroughs_succeeded: 0,
            items_used: 0,
            max_event_log_len: 0,
            violations: Vec::new(),
            final_state: PlayerSnapshot::default(),
            fingerprint: String::new(),
            replay_fingerprint: None,
            reload_matches: None,
            round_trip_matches: None,
        };

        session.start_cultivating(focus.clone());
        for item_id in &plan.opening_items {
            match session.use_item(item_id) {
                Ok(()) => summary.items_used += 1,
                Err(err) => summary
                    .violations
                    .push(format!("opening item {item_id} rejected: {err}")),
            }
        }

        for step in 0..plan.ticks {
            let delay = session.next_tick_delay();
            clock.advance(i64::try_from(delay.as_millis()).unwrap_or(i64::MAX));

            match session.tick() {
                Some(report) => {
                    summary.ticks_run += 1;
                    if report.deviated {
                        summary.deviations += 1;
                    }
                    if report.halted {
                        summary.halts += 1;
                    }
                }
                None if plan.auto_breakthrough => {
                    summary.breakthroughs_attempted += 1;
                    if session.attempt_breakthrough() {
                        summary.breakthroughs_succeeded += 1;
                    }
                    session.start_cultivating(focus.clone());
                }
                None => break,
            }

            let snapshot = session.snapshot();
            summary.max_event_log_len = summary.max_event_log_len.max(snapshot.events.len());
            for violation in check_invariants(&snapshot) {
                summary.violations.push(format!("step {step}: {violation}"));
            }
        }

        let final_state = session.into_snapshot();
        summary.fingerprint = fingerprint(&final_state);
        summary.final_state = (*final_state).clone();
        summary
    }

    fn round_trip(&self, plan: &SimulationPlan, seed: u64, summary: &SimulationSummary) -> bool {
        let Ok(blob) = export_save(&summary.final_state, SIMULATION_EPOCH_MS) else {
            return false;
        };
        let mut target = CultivationSession::open(
            self.engine_for(plan),
            PersistenceGateway::new(MemoryStore::new()),
            ManualClock::starting_at(SIMULATION_EPOCH_MS),
            seed.wrapping_add(1),
        );
        target.import(&blob).is_ok() && same_progression(&target.snapshot(), &summary.final_state)
    }
}

fn event_ids(snapshot: &PlayerSnapshot) -> Vec<u64> {
    snapshot.events.iter().map(|event| event.id.0).collect()
}

/// Everything but the event log, with progress compared within float noise.
pub fn same_progression(left: &PlayerSnapshot, right: &PlayerSnapshot) -> bool {
    let (a, b) = (&left.character, &right.character);
    let progress_close = |x: f64, y: f64| (x - y).abs() < 1e-9;
    a.name == b.name
        && a.realm == b.realm
        && a.sub_level == b.sub_level
        && progress_close(a.progress, b.progress)
        && a.attributes == b.attributes
        && left.skills.len() == right.skills.len()
        && left.skills.iter().zip(&right.skills).all(|(x, y)| {
            x.id == y.id && x.level == y.level && progress_close(x.progress, y.progress)
        })
        && left.currency == right.currency
        && left.inventory == right.inventory
}

pub fn check_invariants(snapshot: &PlayerSnapshot) -> Vec<String> {
    let character = &snapshot.character;
    let mut problems = Vec::new();
    if !(0.0..=MAX_PROGRESS).contains(&character.progress) {
        problems.push(format!("realm progress {} out of range", character.progress));
    }
    if !(1..=MAX_SUB_LEVEL).contains(&character.sub_level) {
        problems.push(format!("sub-level {} out of range", character.sub_level));
    }
    if character.attributes.health > character.attributes.max_health {
        problems.push("health above capacity".to_string());
    }
    if character.attributes.mana > character.attributes.max_mana {
        problems.push("mana above capacity".to_string());
    }
    for skill in &snapshot.skills {
        if !(1..=skill.max_level).contains(&skill.level) {
            problems.push(format!("skill {} level {} out of range", skill.id, skill.level));
        }
        if !(0.0..=MAX_PROGRESS).contains(&skill.progress) {
            problems.push(format!("skill {} progress {} out of range", skill.id, skill.progress));
        }
    }
    if snapshot.events.len() > MAX_EVENTS {
        problems.push(format!("event log holds {} entries", snapshot.events.len()));
    }
    problems
}

/// Stable digest of a snapshot's serialized form.
pub fn fingerprint(snapshot: &PlayerSnapshot) -> String {
    let bytes = serde_json::to_vec(snapshot).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    digest.iter().take(8).fold(String::with_capacity(16), |mut out, byte| {
        let _ = write!(out, "{byte:02x}");
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use durian_game::Realm;

    fn tester() -> GameTester {
        GameTester::try_new(false)
    }

    #[test]
    fn short_run_accrues_progress() {
        let plan = SimulationPlan::new(20).with_focus("purple-heaven-art");
        let summary = tester().run_plan(&plan, 9);
        assert_eq!(summary.ticks_run, 20);
        assert!(summary.violations.is_empty(), "{:?}", summary.violations);
        let character = &summary.final_state.character;
        assert!(character.sub_level > 1 || character.progress > 0.0);
        assert_eq!(summary.fingerprint.len(), 16);
    }

    #[test]
    fn unknown_opening_item_is_reported() {
        let plan = SimulationPlan::new(1).with_opening_item("phoenix-feather");
        let summary = tester().run_plan(&plan, 1);
        assert_eq!(summary.items_used, 0);
        assert_eq!(summary.violations.len(), 1);
    }

    #[test]
    fn auto_breakthrough_climbs_with_fast_rules() {
        let plan = SimulationPlan::new(200)
            .with_auto_breakthrough()
            .with_tuning(|rules| {
                rules.normal_progress_delta = 100.0;
                rules.deviation_probability_percent = 0.0;
                rules.tribulation_probability_percent = 0.0;
            });
        let summary = tester().run_plan(&plan, 5);
        assert!(summary.breakthroughs_succeeded >= 1);
        assert!(summary.final_state.character.realm > Realm::QiRefining);
        assert!(summary.violations.is_empty(), "{:?}", summary.violations);
    }

    #[test]
    fn probes_fill_in_their_results() {
        let plan = SimulationPlan::new(30)
            .with_probe(Probe::Replay)
            .with_probe(Probe::Reload)
            .with_probe(Probe::RoundTrip);
        let summary = tester().run_plan(&plan, 77);
        assert_eq!(summary.replay_fingerprint.as_ref(), Some(&summary.fingerprint));
        assert_eq!(summary.reload_matches, Some(true));
        assert_eq!(summary.round_trip_matches, Some(true));
    }

    #[test]
    fn invariant_check_flags_out_of_range_state() {
        let mut snapshot = PlayerSnapshot::new_game(0);
        assert!(check_invariants(&snapshot).is_empty());
        snapshot.character.progress = 140.0;
        snapshot.character.sub_level = 0;
        assert_eq!(check_invariants(&snapshot).len(), 2);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = PlayerSnapshot::new_game(0);
        let mut b = a.clone();
        assert_eq!(fingerprint(&a), fingerprint(&b));
        b.character.progress = 1.0;
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}
