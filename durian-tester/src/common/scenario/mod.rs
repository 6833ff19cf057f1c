use crate::logic::SimulationPlan;

pub mod durability;
pub mod progression;
pub mod smoke;

// Logic test scenario
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

/// Scenario keys in the order `all` expands to.
pub const SCENARIO_KEYS: [&str; 7] = [
    "smoke",
    "realm-climb",
    "skill-mastery",
    "event-log-cap",
    "deterministic",
    "persistence",
    "import-export",
];

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    match name.to_lowercase().as_str() {
        "smoke" => Some(smoke::smoke_scenario()),
        "realm-climb" | "climb" => Some(progression::realm_climb_scenario()),
        "skill-mastery" | "skills" => Some(progression::skill_mastery_scenario()),
        "event-log-cap" | "event-log" => Some(progression::event_log_cap_scenario()),
        "deterministic" | "determinism" => Some(durability::deterministic_scenario()),
        "persistence" | "reload" => Some(durability::persistence_scenario()),
        "import-export" | "round-trip" => Some(durability::import_export_scenario()),
        _ => None,
    }
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    vec![
        ("smoke", "Smoke Test"),
        ("realm-climb", "Realm Climb Through Breakthroughs"),
        ("skill-mastery", "Skill Mastery Cap"),
        ("event-log-cap", "Event Log Capacity"),
        ("deterministic", "Deterministic Replay"),
        ("persistence", "Persistence Reload"),
        ("import-export", "Save Import/Export Round Trip"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scenario_resolves() {
        for (key, _) in list_scenarios() {
            assert!(get_scenario(key).is_some(), "{key} should resolve");
        }
        assert_eq!(list_scenarios().len(), SCENARIO_KEYS.len());
    }

    #[test]
    fn aliases_and_case_are_accepted() {
        let by_alias = get_scenario("CLIMB").map(|s| s.name);
        assert_eq!(by_alias, get_scenario("realm-climb").map(|s| s.name));
        assert!(get_scenario("weather").is_none());
    }
}
