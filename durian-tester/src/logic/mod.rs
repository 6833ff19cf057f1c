pub mod game_tester;
pub mod reports;
pub mod seeds;
pub mod tester;

pub use game_tester::{GameTester, Probe, SimulationPlan, SimulationSummary};
pub use seeds::resolve_seed_inputs;
pub use tester::*;
