//! Durian Progression Engine
//!
//! Platform-agnostic core logic for the Durian idle cultivation game.
//! This crate provides the progression rules, player models, and the
//! persistence seam without UI or platform-specific dependencies.

pub mod character;
pub mod clock;
pub mod constants;
#[cfg(feature = "async")]
pub mod driver;
pub mod engine;
pub mod event;
pub mod event_log;
pub mod export;
pub mod inventory;
pub mod narrative;
pub mod numbers;
pub mod persistence;
pub mod realm;
pub mod rng;
pub mod rules;
pub mod save_codec;
pub mod session;
pub mod skill;
pub mod snapshot;

// Re-export commonly used types
pub use character::{
    Attributes, BuffKind, Character, CultivationBuff, CultivationPath, Element, ProfileError,
    RootQuality,
};
pub use clock::{Clock, ManualClock, SystemClock};
#[cfg(feature = "async")]
pub use driver::{DriverCommand, DriverHandle, DriverState, spawn_driver};
pub use engine::{BreakthroughOutcome, CultivationEngine, TickOutcome, roll_percent};
pub use event::{Event, EventId, EventKind, UiSurfaceHint};
pub use event_log::EventLog;
pub use export::{ImportError, export_save, import_save};
pub use inventory::{Currency, Inventory, InventoryError, Item, ItemEffect, ItemKind};
pub use persistence::{MemoryStore, PersistenceGateway, SnapshotStore};
pub use realm::{Realm, UnknownRealm};
pub use rng::{CountingRng, RngBundle, RngDraws};
pub use rules::{AttributeBonus, ProgressionRules, RulesError};
pub use save_codec::{CodecError, SaveEnvelope, decode_snapshot, encode_snapshot};
pub use session::{CultivationSession, TickReport};
pub use skill::{Rank, Skill, SkillEffect, SkillEffectKind, SkillKind};
pub use snapshot::PlayerSnapshot;

/// Open a session over `store` with default rules and the system clock.
///
/// # Errors
///
/// Returns `RulesError` if the supplied rules fail validation.
pub fn open_session<S: SnapshotStore>(
    store: S,
    rules: ProgressionRules,
    seed: u64,
) -> Result<CultivationSession<S, SystemClock>, RulesError> {
    rules.validate()?;
    Ok(CultivationSession::open(
        CultivationEngine::new(rules),
        PersistenceGateway::new(store),
        SystemClock,
        seed,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_session_rejects_invalid_rules() {
        let rules = ProgressionRules {
            deviation_probability_percent: -1.0,
            ..ProgressionRules::default()
        };
        assert!(open_session(MemoryStore::new(), rules, 1).is_err());
    }

    #[test]
    fn open_session_loads_stored_player() {
        let store = MemoryStore::new();
        let mut snapshot = PlayerSnapshot::new_game(0);
        snapshot.character.name = "Wang Lin".into();
        PersistenceGateway::new(store.clone()).save(&snapshot, 0);

        let session = open_session(store, ProgressionRules::default(), 1).unwrap();
        assert_eq!(session.snapshot().character.name, "Wang Lin");
        assert!(!session.is_cultivating());
    }
}
