//! Stateful cultivation session over the engine, a clock, and a save slot.

use std::sync::Arc;
use std::time::Duration;

use crate::character::ProfileError;
use crate::clock::Clock;
use crate::constants::{KEY_SAVE_IMPORTED, KEY_SAVE_RESET};
use crate::engine::{CultivationEngine, TickOutcome};
use crate::event::{Event, EventKind};
use crate::export::{ImportError, export_save, import_save};
use crate::inventory::{InventoryError, Item};
use crate::persistence::{PersistenceGateway, SnapshotStore};
use crate::rng::RngBundle;
use crate::save_codec::CodecError;
use crate::snapshot::PlayerSnapshot;

/// Summary of a driver tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub deviated: bool,
    pub realm_delta: f64,
    /// Accrual halted because the realm is perfected.
    pub halted: bool,
}

/// High-level session binding the engine to the current player state.
///
/// Every command computes a new snapshot, swaps it in wholesale, and hands it
/// to the persistence gateway.
#[derive(Debug)]
pub struct CultivationSession<S, C> {
    engine: CultivationEngine,
    snapshot: Arc<PlayerSnapshot>,
    rng: RngBundle,
    clock: C,
    gateway: PersistenceGateway<S>,
    cultivating: bool,
    focus_skill: Option<String>,
}

impl<S: SnapshotStore, C: Clock> CultivationSession<S, C> {
    /// Load the stored player (or a new game) and bind it to the engine.
    #[must_use]
    pub fn open(
        engine: CultivationEngine,
        gateway: PersistenceGateway<S>,
        clock: C,
        seed: u64,
    ) -> Self {
        let snapshot = gateway.load(clock.now_ms());
        Self {
            engine,
            snapshot: Arc::new(snapshot),
            rng: RngBundle::from_user_seed(seed),
            clock,
            gateway,
            cultivating: false,
            focus_skill: None,
        }
    }

    /// Current player state.
    #[must_use]
    pub fn snapshot(&self) -> Arc<PlayerSnapshot> {
        Arc::clone(&self.snapshot)
    }

    #[must_use]
    pub const fn engine(&self) -> &CultivationEngine {
        &self.engine
    }

    #[must_use]
    pub const fn rng(&self) -> &RngBundle {
        &self.rng
    }

    #[must_use]
    pub const fn is_cultivating(&self) -> bool {
        self.cultivating
    }

    /// Skill trained alongside realm progress while cultivating.
    #[must_use]
    pub fn focus_skill(&self) -> Option<&str> {
        self.focus_skill.as_deref()
    }

    /// Deterministically reseed every RNG stream.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = RngBundle::from_user_seed(seed);
    }

    fn commit(&mut self, next: PlayerSnapshot) {
        self.snapshot = Arc::new(next);
        self.gateway.save(&self.snapshot, self.clock.now_ms());
    }

    /// Begin cultivating, optionally training a skill. Returns `false` if already active.
    pub fn start_cultivating(&mut self, skill_id: Option<String>) -> bool {
        if self.cultivating {
            return false;
        }
        let skill_id = skill_id.filter(|id| self.snapshot.skill(id).is_some());
        let next = self
            .engine
            .start_cultivation(&self.snapshot, skill_id.as_deref(), self.clock.now_ms());
        log::info!("cultivation started (skill {skill_id:?})");
        self.cultivating = true;
        self.focus_skill = skill_id;
        self.commit(next);
        true
    }

    /// Stop cultivating. Returns `false` if nothing was running.
    pub fn stop_cultivating(&mut self) -> bool {
        if !self.cultivating {
            return false;
        }
        let next = self.engine.stop_cultivation(
            &self.snapshot,
            self.focus_skill.as_deref(),
            self.clock.now_ms(),
        );
        log::info!("cultivation stopped");
        self.cultivating = false;
        self.commit(next);
        true
    }

    /// Run one accrual step if cultivating.
    ///
    /// A realm that is already perfected accrues nothing. When the step (or
    /// the state it started from) leaves the realm perfected, cultivation
    /// halts and a notification is logged; breakthroughs stay an explicit
    /// command.
    pub fn tick(&mut self) -> Option<TickReport> {
        if !self.cultivating {
            return None;
        }
        let now = self.clock.now_ms();
        if CultivationEngine::check_for_tier_upgrade(&self.snapshot) {
            self.cultivating = false;
            log::info!("cultivation halted: realm already perfected");
            let next = self.engine.notify_perfected(&self.snapshot, now);
            self.commit(next);
            return Some(TickReport {
                deviated: false,
                realm_delta: 0.0,
                halted: true,
            });
        }
        let TickOutcome {
            snapshot,
            deviated,
            realm_delta,
            ready_for_breakthrough,
        } = self.engine.accrue_tick(
            &self.snapshot,
            self.focus_skill.as_deref(),
            &mut *self.rng.accrual(),
            &mut *self.rng.narrative(),
            now,
        );
        let next = if ready_for_breakthrough {
            self.cultivating = false;
            log::info!("cultivation halted: realm perfected");
            self.engine.notify_perfected(&snapshot, now)
        } else {
            snapshot
        };
        self.commit(next);
        Some(TickReport {
            deviated,
            realm_delta,
            halted: ready_for_breakthrough,
        })
    }

    /// Delay until the next tick, drawn from the schedule stream.
    pub fn next_tick_delay(&self) -> Duration {
        self.engine.next_tick_delay(&mut *self.rng.schedule())
    }

    /// Attempt a breakthrough. Returns whether the realm advanced.
    pub fn attempt_breakthrough(&mut self) -> bool {
        let outcome = self.engine.attempt_breakthrough(
            &self.snapshot,
            &mut *self.rng.tribulation(),
            self.clock.now_ms(),
        );
        if outcome.roll.is_some() {
            self.commit(outcome.snapshot);
        }
        outcome.succeeded
    }

    /// Train one skill directly, outside the cultivation loop.
    pub fn train_skill(&mut self, skill_id: &str, amount: f64) {
        let next = self
            .engine
            .add_skill_progress(&self.snapshot, skill_id, amount, self.clock.now_ms());
        if next != *self.snapshot {
            self.commit(next);
        }
    }

    /// # Errors
    ///
    /// Returns `InventoryError` when the item is missing or unusable.
    pub fn use_item(&mut self, item_id: &str) -> Result<(), InventoryError> {
        let next = self
            .engine
            .use_item(&self.snapshot, item_id, self.clock.now_ms())?;
        self.commit(next);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `InventoryError::NotFound` for unknown ids.
    pub fn sell_item(&mut self, item_id: &str) -> Result<(), InventoryError> {
        let next = self
            .engine
            .sell_item(&self.snapshot, item_id, self.clock.now_ms())?;
        self.commit(next);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `InventoryError::Full` when no slot is free.
    pub fn add_item(&mut self, item: Item) -> Result<(), InventoryError> {
        let next = self
            .engine
            .add_item(&self.snapshot, item, self.clock.now_ms())?;
        self.commit(next);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ProfileError::BlankName` for names that are empty once trimmed.
    pub fn rename_character(&mut self, name: &str) -> Result<(), ProfileError> {
        let next = CultivationEngine::rename_character(&self.snapshot, name, self.clock.now_ms())?;
        if next != *self.snapshot {
            log::info!("character renamed to {}", next.character.name);
            self.commit(next);
        }
        Ok(())
    }

    pub fn adjust_currency(&mut self, primary_delta: i64, secondary_delta: i64) {
        let next =
            CultivationEngine::adjust_currency(&self.snapshot, primary_delta, secondary_delta);
        self.commit(next);
    }

    /// # Errors
    ///
    /// Returns `CodecError` if the snapshot cannot be serialized.
    pub fn export(&self) -> Result<String, CodecError> {
        export_save(&self.snapshot, self.clock.now_ms())
    }

    /// Replace the player with an imported save. Cultivation stops.
    ///
    /// # Errors
    ///
    /// Returns `ImportError`; current state is left untouched on failure.
    pub fn import(&mut self, blob: &str) -> Result<(), ImportError> {
        let mut next = import_save(blob)?;
        let now = self.clock.now_ms();
        let id = next.allocate_event_id();
        next.events.push(Event::new(
            id,
            EventKind::System,
            KEY_SAVE_IMPORTED,
            "Save Imported",
            format!("The journey of {} resumes.", next.character.name),
            now,
        ));
        self.cultivating = false;
        self.focus_skill = None;
        log::info!("imported save for {}", next.character.name);
        self.commit(next);
        Ok(())
    }

    /// Clear stored state and start over.
    pub fn reset(&mut self) {
        self.gateway.reset();
        let now = self.clock.now_ms();
        let mut fresh = PlayerSnapshot::new_game(now);
        let id = fresh.allocate_event_id();
        fresh.events.push(Event::new(
            id,
            EventKind::System,
            KEY_SAVE_RESET,
            "A New Life",
            "All past cultivation is forgotten.",
            now,
        ));
        self.cultivating = false;
        self.focus_skill = None;
        log::info!("player state reset");
        self.commit(fresh);
    }

    /// Consume the session, returning the final player state.
    #[must_use]
    pub fn into_snapshot(self) -> Arc<PlayerSnapshot> {
        self.snapshot
    }
}
