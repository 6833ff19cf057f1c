//! Aggregate player state replaced wholesale on every transition.
use serde::{Deserialize, Serialize};

use crate::character::Character;
use crate::constants::KEY_STORY_BEGIN;
use crate::event::{Event, EventId, EventKind};
use crate::event_log::EventLog;
use crate::inventory::{Currency, Inventory, starter_inventory};
use crate::skill::{Skill, default_skills};

/// Complete player state: cultivator, skills, history, and belongings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerSnapshot {
    pub character: Character,
    pub skills: Vec<Skill>,
    pub events: EventLog,
    pub currency: Currency,
    pub inventory: Inventory,
    /// Identifier handed to the next emitted event.
    pub next_event_id: u64,
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self::new_game(0)
    }
}

impl PlayerSnapshot {
    /// Fresh player state with the opening story event stamped at `now_ms`.
    #[must_use]
    pub fn new_game(now_ms: i64) -> Self {
        let mut snapshot = Self {
            character: Character::default(),
            skills: default_skills(),
            events: EventLog::new(),
            currency: Currency::default(),
            inventory: starter_inventory(),
            next_event_id: 0,
        };
        let id = snapshot.allocate_event_id();
        snapshot.events.push(Event::new(
            id,
            EventKind::Story,
            KEY_STORY_BEGIN,
            "The Path Begins",
            "You set foot on the road of cultivation, seeking the secret of immortality.",
            now_ms,
        ));
        snapshot
    }

    #[must_use]
    pub fn skill(&self, skill_id: &str) -> Option<&Skill> {
        self.skills.iter().find(|skill| skill.id == skill_id)
    }

    /// Reserve the next event identifier.
    pub fn allocate_event_id(&mut self) -> EventId {
        let id = EventId(self.next_event_id);
        self.next_event_id = self.next_event_id.saturating_add(1);
        id
    }

    /// Force bounded fields into range and keep event ids monotonic.
    ///
    /// Applied to state that arrives from storage or an import.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.character = self.character.normalized();
        self.skills = self.skills.into_iter().map(Skill::normalized).collect();
        let floor = self
            .events
            .iter()
            .map(|event| event.id.0.saturating_add(1))
            .max()
            .unwrap_or(0);
        self.next_event_id = self.next_event_id.max(floor);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realm::Realm;

    #[test]
    fn new_game_has_story_event_and_starter_kit() {
        let snapshot = PlayerSnapshot::new_game(1_700_000_000_000);
        assert_eq!(snapshot.events.len(), 1);
        let opening = snapshot.events.latest().unwrap();
        assert_eq!(opening.key, KEY_STORY_BEGIN);
        assert_eq!(opening.kind, EventKind::Story);
        assert_eq!(opening.timestamp, 1_700_000_000_000);
        assert_eq!(snapshot.next_event_id, 1);
        assert_eq!(snapshot.character.realm, Realm::QiRefining);
        assert_eq!(snapshot.skills.len(), 3);
        assert_eq!(snapshot.currency.primary, 100);
        assert_eq!(snapshot.currency.secondary, 5);
        assert_eq!(snapshot.inventory.items.len(), 2);
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let snapshot: PlayerSnapshot =
            serde_json::from_str(r#"{"character": {"name": "Lin"}}"#).unwrap();
        assert_eq!(snapshot.character.name, "Lin");
        assert_eq!(snapshot.character.sub_level, 1);
        assert_eq!(snapshot.skills.len(), 3);
    }

    #[test]
    fn normalized_repairs_event_counter() {
        let mut snapshot = PlayerSnapshot::new_game(0);
        snapshot.next_event_id = 0;
        let snapshot = snapshot.normalized();
        assert_eq!(snapshot.next_event_id, 1);
    }
}
