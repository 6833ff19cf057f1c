//! Centralized limits, defaults, and event keys for Durian progression logic.
//!
//! The tunable magnitudes live in [`crate::rules::ProgressionRules`]; the
//! values here are the structural bounds every rule set shares plus the
//! canonical defaults those rules start from.

// Debugging -----------------------------------------------------------------
pub(crate) const DEBUG_ENV_VAR: &str = "DURIAN_DEBUG_LOGS";

// Structural limits -----------------------------------------------------------
/// Progress ceiling for a single sub-level or skill level.
pub const MAX_PROGRESS: f64 = 100.0;
/// Highest sub-level inside a realm.
pub const MAX_SUB_LEVEL: u8 = 10;
/// Lowest sub-level inside a realm.
pub const MIN_SUB_LEVEL: u8 = 1;
/// Event log capacity; older entries are evicted first.
pub const MAX_EVENTS: usize = 50;
/// Inventory slots available to a fresh character.
pub const INVENTORY_SLOTS: usize = 20;

// Rule defaults ----------------------------------------------------------------
pub(crate) const NORMAL_PROGRESS_DELTA: f64 = 3.0;
pub(crate) const DEVIATION_PROBABILITY_PERCENT: f64 = 5.0;
pub(crate) const DEVIATION_PROGRESS_DELTA: f64 = -5.0;
pub(crate) const SKILL_PROGRESS_DELTA: f64 = 0.3;
pub(crate) const TRIBULATION_PROBABILITY_PERCENT: f64 = 5.0;
pub(crate) const TRIBULATION_PENALTY_PERCENT: f64 = 30.0;
pub(crate) const CULTIVATION_NOTICE_PERCENT: f64 = 30.0;
pub(crate) const BREAKTHROUGH_NOTICE_WINDOW_MS: i64 = 3_600_000;
pub(crate) const TICK_INTERVAL_MIN_MS: u64 = 1_000;
pub(crate) const TICK_INTERVAL_MAX_MS: u64 = 2_000;

// Breakthrough bonuses ----------------------------------------------------------
pub(crate) const BONUS_ATTACK: u32 = 50;
pub(crate) const BONUS_DEFENSE: u32 = 40;
pub(crate) const BONUS_SPIRIT: u32 = 60;
pub(crate) const BONUS_SPEED: u32 = 30;
pub(crate) const BONUS_HEALTH: u32 = 100;
pub(crate) const BONUS_MANA: u32 = 80;
pub(crate) const BONUS_INSIGHT: u32 = 5;

// Event keys ----------------------------------------------------------------------
pub const KEY_STORY_BEGIN: &str = "story.begin";
pub const KEY_SUB_LEVEL_UP: &str = "realm.sub-level-up";
pub const KEY_REALM_READY: &str = "realm.ready";
pub const KEY_BREAKTHROUGH: &str = "realm.breakthrough";
pub const KEY_TRIBULATION: &str = "realm.tribulation";
pub const KEY_SKILL_LEVEL_UP: &str = "skill.level-up";
pub const KEY_CULTIVATION_TICK: &str = "cultivation.tick";
pub const KEY_CULTIVATION_DEVIATION: &str = "cultivation.deviation";
pub const KEY_CULTIVATION_START: &str = "cultivation.start";
pub const KEY_CULTIVATION_STOP: &str = "cultivation.stop";
pub const KEY_CULTIVATION_PERFECTED: &str = "cultivation.perfected";
pub const KEY_ITEM_USED: &str = "item.used";
pub const KEY_ITEM_SOLD: &str = "item.sold";
pub const KEY_ITEM_ACQUIRED: &str = "item.acquired";
pub const KEY_SAVE_IMPORTED: &str = "system.import";
pub const KEY_SAVE_RESET: &str = "system.reset";
pub const KEY_CHARACTER_RENAMED: &str = "system.rename";

// Save format --------------------------------------------------------------------
/// Format tag stamped on exported saves.
pub const SAVE_FORMAT_ID: &str = "durian-cultivation-save";
/// Current save format version.
pub const SAVE_FORMAT_VERSION: u32 = 1;
