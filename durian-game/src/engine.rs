//! Progression mutation engine.
//!
//! Every operation takes the current [`PlayerSnapshot`] by reference and
//! returns a new one. Randomness is always injected so callers (and tests)
//! control every roll.

use rand::Rng;
use serde_json::json;
use std::time::Duration;

use crate::character::{BuffKind, CultivationBuff, ProfileError};
use crate::constants::{
    DEBUG_ENV_VAR, KEY_BREAKTHROUGH, KEY_CHARACTER_RENAMED, KEY_CULTIVATION_DEVIATION,
    KEY_CULTIVATION_PERFECTED, KEY_CULTIVATION_START, KEY_CULTIVATION_STOP, KEY_CULTIVATION_TICK,
    KEY_ITEM_ACQUIRED, KEY_ITEM_SOLD, KEY_ITEM_USED, KEY_REALM_READY, KEY_SKILL_LEVEL_UP,
    KEY_SUB_LEVEL_UP, KEY_TRIBULATION, MAX_PROGRESS, MAX_SUB_LEVEL, MIN_SUB_LEVEL,
};
use crate::event::{Event, EventId, EventKind, UiSurfaceHint};
use crate::inventory::{InventoryError, Item, ItemEffect};
use crate::narrative;
use crate::numbers::percent_of;
use crate::rules::ProgressionRules;
use crate::snapshot::PlayerSnapshot;

/// Result of an explicit breakthrough attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakthroughOutcome {
    pub snapshot: PlayerSnapshot,
    pub succeeded: bool,
    /// Tribulation roll, when one was drawn.
    pub roll: Option<f64>,
}

/// Result of a single accrual step.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub snapshot: PlayerSnapshot,
    pub deviated: bool,
    /// Signed realm progress applied this tick.
    pub realm_delta: f64,
    /// The cultivator reached the peak and can attempt a breakthrough.
    pub ready_for_breakthrough: bool,
}

/// Applies [`ProgressionRules`] to player snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CultivationEngine {
    rules: ProgressionRules,
}

impl CultivationEngine {
    #[must_use]
    pub const fn new(rules: ProgressionRules) -> Self {
        Self { rules }
    }

    #[must_use]
    pub const fn rules(&self) -> &ProgressionRules {
        &self.rules
    }

    /// Add signed realm progress, carrying overflow into the next sub-level.
    ///
    /// Progress never drops below zero. At the top sub-level progress
    /// saturates at the cap and a single "ready" notice is logged per
    /// notice window.
    #[must_use]
    pub fn add_realm_progress(
        &self,
        snapshot: &PlayerSnapshot,
        amount: f64,
        now_ms: i64,
    ) -> PlayerSnapshot {
        let mut next = snapshot.clone();
        if !amount.is_finite() {
            return next;
        }
        next.character.progress = (next.character.progress + amount).max(0.0);

        while next.character.progress >= MAX_PROGRESS && next.character.sub_level < MAX_SUB_LEVEL
        {
            next.character.sub_level += 1;
            next.character.progress -= MAX_PROGRESS;
            let realm = next.character.realm;
            let sub_level = next.character.sub_level;
            log::debug!("sub-level advanced to {realm} {sub_level}");
            record(&mut next, |id| {
                Event::new(
                    id,
                    EventKind::Cultivation,
                    KEY_SUB_LEVEL_UP,
                    "Cultivation Advanced",
                    format!("Your cultivation rises to {realm}, level {sub_level}."),
                    now_ms,
                )
                .with_payload(json!({ "realm": realm.key(), "sub_level": sub_level }))
            });
        }

        if next.character.sub_level >= MAX_SUB_LEVEL && next.character.progress >= MAX_PROGRESS {
            next.character.progress = MAX_PROGRESS;
            if !self.ready_notice_recent(&next, now_ms) {
                let realm = next.character.realm;
                record(&mut next, |id| {
                    Event::new(
                        id,
                        EventKind::Breakthrough,
                        KEY_REALM_READY,
                        "Ready for Breakthrough",
                        format!(
                            "Your {realm} cultivation is perfected. You may attempt a breakthrough."
                        ),
                        now_ms,
                    )
                    .with_surface(UiSurfaceHint::Toast)
                });
            }
        }
        next
    }

    /// A ready notice counts only for the realm it was issued in.
    fn ready_notice_recent(&self, snapshot: &PlayerSnapshot, now_ms: i64) -> bool {
        let last_breakthrough = snapshot
            .events
            .latest_with_key(KEY_BREAKTHROUGH)
            .map(|event| event.id);
        snapshot
            .events
            .latest_with_key(KEY_REALM_READY)
            .is_some_and(|event| {
                last_breakthrough.is_none_or(|id| event.id > id)
                    && now_ms.saturating_sub(event.timestamp)
                        < self.rules.breakthrough_notice_window_ms
            })
    }

    /// Add progress to one skill. Unknown skills leave the snapshot unchanged.
    #[must_use]
    pub fn add_skill_progress(
        &self,
        snapshot: &PlayerSnapshot,
        skill_id: &str,
        amount: f64,
        now_ms: i64,
    ) -> PlayerSnapshot {
        let mut next = snapshot.clone();
        let Some(index) = next.skills.iter().position(|skill| skill.id == skill_id) else {
            return next;
        };
        if !amount.is_finite() {
            return next;
        }
        let mut level_ups = Vec::new();
        {
            let skill = &mut next.skills[index];
            skill.progress = (skill.progress + amount).max(0.0);
            while skill.progress >= MAX_PROGRESS && !skill.is_maxed() {
                skill.level += 1;
                skill.progress -= MAX_PROGRESS;
                level_ups.push(skill.level);
            }
            if skill.is_maxed() && skill.progress >= MAX_PROGRESS {
                skill.progress = MAX_PROGRESS;
            }
        }
        let name = next.skills[index].name.clone();
        for level in level_ups {
            log::debug!("skill {skill_id} reached level {level}");
            record(&mut next, |id| {
                Event::new(
                    id,
                    EventKind::Skill,
                    KEY_SKILL_LEVEL_UP,
                    "Skill Improved",
                    format!("{name} advances to level {level}."),
                    now_ms,
                )
                .with_payload(json!({ "skill_id": skill_id, "level": level }))
            });
        }
        next
    }

    /// Whether the cultivator stands at the top sub-level with full progress.
    #[must_use]
    pub fn check_for_tier_upgrade(snapshot: &PlayerSnapshot) -> bool {
        snapshot.character.is_at_peak()
    }

    /// Attempt to advance to the next realm.
    ///
    /// Ineligible snapshots and the terminal realm return unchanged with
    /// `succeeded == false` and no roll. Otherwise one tribulation roll is
    /// drawn: on failure progress drops by the penalty (floored at zero); on
    /// success the realm advances, sub-level and progress reset, and every
    /// attribute capacity grows by the configured bonus.
    pub fn attempt_breakthrough<R: Rng + ?Sized>(
        &self,
        snapshot: &PlayerSnapshot,
        rng: &mut R,
        now_ms: i64,
    ) -> BreakthroughOutcome {
        let unchanged = || BreakthroughOutcome {
            snapshot: snapshot.clone(),
            succeeded: false,
            roll: None,
        };
        if !Self::check_for_tier_upgrade(snapshot) {
            return unchanged();
        }
        let from = snapshot.character.realm;
        let Some(to) = from.next() else {
            return unchanged();
        };

        let roll = roll_percent(rng);
        let mut next = snapshot.clone();
        if roll < self.rules.tribulation_probability_percent {
            let penalty = self.rules.tribulation_penalty_points();
            next.character.progress = (next.character.progress - penalty).max(0.0);
            log::info!("tribulation struck at {from} (roll {roll:.2}); lost {penalty:.1} progress");
            record(&mut next, |id| {
                Event::new(
                    id,
                    EventKind::Tribulation,
                    KEY_TRIBULATION,
                    "Heavenly Tribulation",
                    format!(
                        "Lightning descends as you reach for {to}. Your foundation is shaken and you lose {penalty:.0} progress."
                    ),
                    now_ms,
                )
                .with_surface(UiSurfaceHint::Modal)
                .with_payload(json!({ "realm": from.key(), "penalty": penalty, "roll": roll }))
            });
            return BreakthroughOutcome {
                snapshot: next,
                succeeded: false,
                roll: Some(roll),
            };
        }

        next.character.realm = to;
        next.character.sub_level = MIN_SUB_LEVEL;
        next.character.progress = 0.0;
        next.character.attributes = next
            .character
            .attributes
            .with_bonus(&self.rules.tier_attribute_bonus);
        log::info!("breakthrough from {from} to {to} (roll {roll:.2})");
        record(&mut next, |id| {
            Event::new(
                id,
                EventKind::Breakthrough,
                KEY_BREAKTHROUGH,
                "Breakthrough!",
                format!("You break through from {from} to {to}. Your strength surges."),
                now_ms,
            )
            .with_surface(UiSurfaceHint::Modal)
            .with_payload(json!({ "from": from.key(), "to": to.key(), "roll": roll }))
        });
        BreakthroughOutcome {
            snapshot: next,
            succeeded: true,
            roll: Some(roll),
        }
    }

    /// Run one accrual step: a deviation or a normal gain, then skill progress.
    ///
    /// `accrual_rng` decides deviation; `narrative_rng` picks flavor text and
    /// whether a normal tick is narrated.
    pub fn accrue_tick<A, N>(
        &self,
        snapshot: &PlayerSnapshot,
        skill_id: Option<&str>,
        accrual_rng: &mut A,
        narrative_rng: &mut N,
        now_ms: i64,
    ) -> TickOutcome
    where
        A: Rng + ?Sized,
        N: Rng + ?Sized,
    {
        let mut next = snapshot.clone();
        next.character.buffs.retain(|buff| buff.is_active(now_ms));

        let deviated = roll_percent(accrual_rng) < self.rules.deviation_probability_percent;
        let realm_delta = if deviated {
            let line = narrative::deviation_line(narrative_rng);
            record(&mut next, |id| {
                Event::new(
                    id,
                    EventKind::Cultivation,
                    KEY_CULTIVATION_DEVIATION,
                    "Qi Deviation",
                    line,
                    now_ms,
                )
            });
            self.rules.deviation_progress_delta
        } else {
            let bonus = next.character.cultivation_speed_bonus(now_ms);
            if roll_percent(narrative_rng) < self.rules.cultivation_notice_percent {
                let line = narrative::success_line(narrative_rng);
                record(&mut next, |id| {
                    Event::new(
                        id,
                        EventKind::Cultivation,
                        KEY_CULTIVATION_TICK,
                        "Cultivation",
                        line,
                        now_ms,
                    )
                });
            }
            self.rules.normal_progress_delta * (1.0 + bonus / 100.0)
        };

        let mut next = self.add_realm_progress(&next, realm_delta, now_ms);
        if let Some(skill_id) = skill_id {
            next =
                self.add_skill_progress(&next, skill_id, self.rules.skill_progress_delta, now_ms);
        }
        let ready_for_breakthrough = Self::check_for_tier_upgrade(&next);

        if debug_log_enabled() {
            println!(
                "tick @{now_ms}: {} {} progress {:.2} (delta {realm_delta:+.2}, deviated {deviated}, ready {ready_for_breakthrough})",
                next.character.realm, next.character.sub_level, next.character.progress
            );
        }

        TickOutcome {
            snapshot: next,
            deviated,
            realm_delta,
            ready_for_breakthrough,
        }
    }

    /// Uniform delay before the next accrual tick.
    pub fn next_tick_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let min = self.rules.tick_interval_min_ms;
        let max = self.rules.tick_interval_max_ms.max(min);
        Duration::from_millis(rng.gen_range(min..=max))
    }

    /// Log the start of a cultivation session.
    #[must_use]
    pub fn start_cultivation(
        &self,
        snapshot: &PlayerSnapshot,
        skill_id: Option<&str>,
        now_ms: i64,
    ) -> PlayerSnapshot {
        let mut next = snapshot.clone();
        let method = method_name(snapshot, skill_id);
        record(&mut next, |id| {
            Event::new(
                id,
                EventKind::Cultivation,
                KEY_CULTIVATION_START,
                "Cultivation Begins",
                format!("You sit cross-legged and circulate the {method}."),
                now_ms,
            )
        });
        next
    }

    /// Log the end of a cultivation session.
    #[must_use]
    pub fn stop_cultivation(
        &self,
        snapshot: &PlayerSnapshot,
        skill_id: Option<&str>,
        now_ms: i64,
    ) -> PlayerSnapshot {
        let mut next = snapshot.clone();
        let method = method_name(snapshot, skill_id);
        record(&mut next, |id| {
            Event::new(
                id,
                EventKind::Cultivation,
                KEY_CULTIVATION_STOP,
                "Cultivation Ends",
                format!("You cease circulating the {method} and open your eyes."),
                now_ms,
            )
        });
        next
    }

    /// Notification logged when accrual halts because the realm is perfected.
    #[must_use]
    pub fn notify_perfected(&self, snapshot: &PlayerSnapshot, now_ms: i64) -> PlayerSnapshot {
        let mut next = snapshot.clone();
        let realm = next.character.realm;
        record(&mut next, |id| {
            Event::new(
                id,
                EventKind::System,
                KEY_CULTIVATION_PERFECTED,
                "Cultivation Perfected",
                format!(
                    "Your {realm} cultivation can grow no further. Attempt a breakthrough to continue."
                ),
                now_ms,
            )
            .with_surface(UiSurfaceHint::Toast)
        });
        next
    }

    /// Consume one unit of an item and apply its effects.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError` when the item is missing or not usable; the
    /// input snapshot is untouched in that case.
    pub fn use_item(
        &self,
        snapshot: &PlayerSnapshot,
        item_id: &str,
        now_ms: i64,
    ) -> Result<PlayerSnapshot, InventoryError> {
        let mut next = snapshot.clone();
        let item = next.inventory.consume_one(item_id)?;
        for effect in &item.effects {
            next = self.apply_item_effect(next, &item, *effect, now_ms);
        }
        Ok(next)
    }

    fn apply_item_effect(
        &self,
        mut next: PlayerSnapshot,
        item: &Item,
        effect: ItemEffect,
        now_ms: i64,
    ) -> PlayerSnapshot {
        let summary = match effect {
            ItemEffect::HealHealth { percent } => {
                let attrs = next.character.attributes;
                let restored = attrs.restore_health(percent_of(attrs.max_health, percent));
                let gained = restored.health.saturating_sub(attrs.health);
                next.character.attributes = restored;
                format!("You use {} and recover {gained} health.", item.name)
            }
            ItemEffect::HealMana { percent } => {
                let attrs = next.character.attributes;
                let restored = attrs.restore_mana(percent_of(attrs.max_mana, percent));
                let gained = restored.mana.saturating_sub(attrs.mana);
                next.character.attributes = restored;
                format!("You use {} and recover {gained} mana.", item.name)
            }
            ItemEffect::CultivationSpeed {
                percent,
                duration_ms,
            } => {
                next.character.buffs.push(CultivationBuff {
                    kind: BuffKind::CultivationSpeed,
                    percent,
                    expires_at: now_ms.saturating_add(duration_ms),
                    source: item.id.clone(),
                });
                format!(
                    "You use {} and your cultivation quickens by {percent:.0}%.",
                    item.name
                )
            }
            ItemEffect::AddCultivation { points } => {
                format!("You use {} and gain {points:.1} cultivation.", item.name)
            }
        };
        record(&mut next, |id| {
            Event::new(id, EventKind::Item, KEY_ITEM_USED, "Item Used", summary, now_ms)
                .with_payload(json!({ "item_id": item.id }))
        });
        match effect {
            ItemEffect::AddCultivation { points } => self.add_realm_progress(&next, points, now_ms),
            _ => next,
        }
    }

    /// Sell a whole stack for its value in spirit stones.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::NotFound` for unknown ids.
    pub fn sell_item(
        &self,
        snapshot: &PlayerSnapshot,
        item_id: &str,
        now_ms: i64,
    ) -> Result<PlayerSnapshot, InventoryError> {
        let mut next = snapshot.clone();
        let item = next.inventory.remove(item_id)?;
        let proceeds = item.value.saturating_mul(u64::from(item.quantity));
        next.currency.primary = next.currency.primary.saturating_add(proceeds);
        record(&mut next, |id| {
            Event::new(
                id,
                EventKind::Item,
                KEY_ITEM_SOLD,
                "Item Sold",
                format!(
                    "You sell {} x{} for {proceeds} spirit stones.",
                    item.name, item.quantity
                ),
                now_ms,
            )
        });
        Ok(next)
    }

    /// Put an item into the inventory.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Full` when no slot is available.
    pub fn add_item(
        &self,
        snapshot: &PlayerSnapshot,
        item: Item,
        now_ms: i64,
    ) -> Result<PlayerSnapshot, InventoryError> {
        let mut next = snapshot.clone();
        let description = format!("You obtain {} x{}.", item.name, item.quantity);
        next.inventory.add(item)?;
        record(&mut next, |id| {
            Event::new(
                id,
                EventKind::Item,
                KEY_ITEM_ACQUIRED,
                "Item Obtained",
                description,
                now_ms,
            )
        });
        Ok(next)
    }

    /// Apply signed currency deltas, flooring balances at zero.
    #[must_use]
    pub fn adjust_currency(
        snapshot: &PlayerSnapshot,
        primary_delta: i64,
        secondary_delta: i64,
    ) -> PlayerSnapshot {
        let mut next = snapshot.clone();
        next.currency = next.currency.adjusted(primary_delta, secondary_delta);
        next
    }

    /// Rename the cultivator, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::BlankName` when nothing is left after trimming.
    pub fn rename_character(
        snapshot: &PlayerSnapshot,
        name: &str,
        now_ms: i64,
    ) -> Result<PlayerSnapshot, ProfileError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProfileError::BlankName);
        }
        let mut next = snapshot.clone();
        if next.character.name == name {
            return Ok(next);
        }
        let previous = std::mem::replace(&mut next.character.name, name.to_string());
        record(&mut next, |id| {
            Event::new(
                id,
                EventKind::System,
                KEY_CHARACTER_RENAMED,
                "A New Name",
                format!("{previous} shall henceforth be known as {name}."),
                now_ms,
            )
        });
        Ok(next)
    }
}

/// Draw a roll uniformly from `[0, 100)`.
pub fn roll_percent<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen_range(0.0..100.0)
}

fn record(snapshot: &mut PlayerSnapshot, build: impl FnOnce(EventId) -> Event) {
    let id = snapshot.allocate_event_id();
    snapshot.events.push(build(id));
}

fn method_name(snapshot: &PlayerSnapshot, skill_id: Option<&str>) -> String {
    skill_id
        .and_then(|id| snapshot.skill(id))
        .map_or_else(|| "breathing method".to_string(), |skill| skill.name.clone())
}

#[cfg(debug_assertions)]
fn debug_log_enabled() -> bool {
    matches!(std::env::var(DEBUG_ENV_VAR), Ok(val) if val != "0")
}

#[cfg(not(debug_assertions))]
const fn debug_log_enabled() -> bool {
    false
}
