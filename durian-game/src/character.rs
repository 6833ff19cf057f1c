//! The player's cultivator: realm standing, attributes, and profile.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{MAX_PROGRESS, MAX_SUB_LEVEL, MIN_SUB_LEVEL};
use crate::realm::Realm;
use crate::rules::AttributeBonus;

/// Elemental affinity of a spirit root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Metal,
    Wood,
    Water,
    Fire,
    Earth,
    Wind,
    Thunder,
    Ice,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootQuality {
    #[default]
    Poor,
    Common,
    Good,
    Excellent,
    Heavenly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CultivationPath {
    #[default]
    Righteous,
    Demonic,
    Neutral,
}

/// Combat and cultivation attributes. `health` and `mana` never exceed their capacities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attributes {
    pub attack: u32,
    pub defense: u32,
    pub spirit: u32,
    pub speed: u32,
    pub health: u32,
    pub max_health: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub insight: u32,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            attack: 10,
            defense: 10,
            spirit: 15,
            speed: 10,
            health: 100,
            max_health: 100,
            mana: 50,
            max_mana: 50,
            insight: 10,
        }
    }
}

impl Attributes {
    /// Raise every capacity by the bonus and refill current pools.
    #[must_use]
    pub fn with_bonus(self, bonus: &AttributeBonus) -> Self {
        let max_health = self.max_health.saturating_add(bonus.health);
        let max_mana = self.max_mana.saturating_add(bonus.mana);
        Self {
            attack: self.attack.saturating_add(bonus.attack),
            defense: self.defense.saturating_add(bonus.defense),
            spirit: self.spirit.saturating_add(bonus.spirit),
            speed: self.speed.saturating_add(bonus.speed),
            health: max_health,
            max_health,
            mana: max_mana,
            max_mana,
            insight: self.insight.saturating_add(bonus.insight),
        }
    }

    /// Restore health, capped at capacity.
    #[must_use]
    pub fn restore_health(self, amount: u32) -> Self {
        Self {
            health: self.health.saturating_add(amount).min(self.max_health),
            ..self
        }
    }

    /// Restore mana, capped at capacity.
    #[must_use]
    pub fn restore_mana(self, amount: u32) -> Self {
        Self {
            mana: self.mana.saturating_add(amount).min(self.max_mana),
            ..self
        }
    }

    fn clamped(self) -> Self {
        Self {
            health: self.health.min(self.max_health),
            mana: self.mana.min(self.max_mana),
            ..self
        }
    }
}

/// Kind of temporary cultivation modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffKind {
    CultivationSpeed,
}

/// Temporary modifier granted by consumables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CultivationBuff {
    pub kind: BuffKind,
    pub percent: f64,
    /// Expiry as epoch milliseconds.
    pub expires_at: i64,
    #[serde(default)]
    pub source: String,
}

impl CultivationBuff {
    #[must_use]
    pub const fn is_active(&self, now_ms: i64) -> bool {
        self.expires_at > now_ms
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("character name cannot be blank")]
    BlankName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub realm: Realm,
    pub sub_level: u8,
    pub progress: f64,
    pub attributes: Attributes,
    pub age: u32,
    pub lifespan: u32,
    pub spirit_roots: Vec<Element>,
    pub spirit_root_quality: RootQuality,
    pub cultivation_path: CultivationPath,
    pub buffs: Vec<CultivationBuff>,
}

impl Default for Character {
    fn default() -> Self {
        Self {
            id: "player".to_string(),
            name: "Nameless Wanderer".to_string(),
            realm: Realm::QiRefining,
            sub_level: MIN_SUB_LEVEL,
            progress: 0.0,
            attributes: Attributes::default(),
            age: 16,
            lifespan: 100,
            spirit_roots: vec![Element::Wood],
            spirit_root_quality: RootQuality::Poor,
            cultivation_path: CultivationPath::Righteous,
            buffs: Vec::new(),
        }
    }
}

impl Character {
    /// Whether the cultivator sits at the top sub-level with full progress.
    #[must_use]
    pub fn is_at_peak(&self) -> bool {
        self.sub_level >= MAX_SUB_LEVEL && self.progress >= MAX_PROGRESS
    }

    /// Sum of active cultivation-speed bonuses, in percent.
    #[must_use]
    pub fn cultivation_speed_bonus(&self, now_ms: i64) -> f64 {
        self.buffs
            .iter()
            .filter(|buff| buff.kind == BuffKind::CultivationSpeed && buff.is_active(now_ms))
            .map(|buff| buff.percent)
            .sum()
    }

    /// Force every bounded field back into range. Used when state arrives from outside.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.sub_level = self.sub_level.clamp(MIN_SUB_LEVEL, MAX_SUB_LEVEL);
        self.progress = if self.progress.is_finite() {
            self.progress.clamp(0.0, MAX_PROGRESS)
        } else {
            0.0
        };
        self.attributes = self.attributes.clamped();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_matches_new_game() {
        let character = Character::default();
        assert_eq!(character.realm, Realm::QiRefining);
        assert_eq!(character.sub_level, 1);
        assert!(character.progress.abs() < f64::EPSILON);
        assert_eq!(character.attributes.spirit, 15);
        assert_eq!(character.attributes.max_mana, 50);
        assert_eq!(character.age, 16);
        assert!(!character.is_at_peak());
    }

    #[test]
    fn bonus_raises_capacity_and_refills() {
        let drained = Attributes {
            health: 12,
            mana: 3,
            ..Attributes::default()
        };
        let boosted = drained.with_bonus(&AttributeBonus::default());
        assert_eq!(boosted.attack, 60);
        assert_eq!(boosted.max_health, 200);
        assert_eq!(boosted.health, 200);
        assert_eq!(boosted.max_mana, 130);
        assert_eq!(boosted.mana, 130);
        assert_eq!(boosted.insight, 15);
    }

    #[test]
    fn restores_cap_at_capacity() {
        let attrs = Attributes {
            mana: 45,
            ..Attributes::default()
        };
        assert_eq!(attrs.restore_mana(12).mana, 50);
        assert_eq!(attrs.restore_health(5).health, 100);
    }

    #[test]
    fn buffs_expire_and_stack() {
        let character = Character {
            buffs: vec![
                CultivationBuff {
                    kind: BuffKind::CultivationSpeed,
                    percent: 30.0,
                    expires_at: 1_000,
                    source: "pill".into(),
                },
                CultivationBuff {
                    kind: BuffKind::CultivationSpeed,
                    percent: 20.0,
                    expires_at: 5_000,
                    source: "pill".into(),
                },
            ],
            ..Character::default()
        };
        assert!((character.cultivation_speed_bonus(500) - 50.0).abs() < f64::EPSILON);
        assert!((character.cultivation_speed_bonus(1_000) - 20.0).abs() < f64::EPSILON);
        assert!(character.cultivation_speed_bonus(9_000).abs() < f64::EPSILON);
    }

    #[test]
    fn normalized_clamps_out_of_range_fields() {
        let wild = Character {
            sub_level: 42,
            progress: f64::INFINITY,
            attributes: Attributes {
                health: 999,
                ..Attributes::default()
            },
            ..Character::default()
        }
        .normalized();
        assert_eq!(wild.sub_level, 10);
        assert!(wild.progress.abs() < f64::EPSILON);
        assert_eq!(wild.attributes.health, 100);
    }
}
