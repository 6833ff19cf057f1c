//! Secondary progression tracks with their own level caps.
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

use crate::constants::MAX_PROGRESS;

/// Inline capacity for static skill effects.
pub type SkillEffects = SmallVec<[SkillEffect; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    Cultivation,
    Combat,
    Body,
    Mental,
    Auxiliary,
}

/// Quality grade shared by skills and items.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    #[default]
    Mortal,
    Spirit,
    Earth,
    Heaven,
    Immortal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillEffectKind {
    AttackBonus,
    DefenseBonus,
    SpiritBonus,
    SpeedBonus,
    HealthBonus,
    CultivationSpeed,
}

/// Static effect descriptor. Effects are informational and never applied on level-up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillEffect {
    pub kind: SkillEffectKind,
    pub magnitude: f64,
}

impl SkillEffect {
    #[must_use]
    pub const fn new(kind: SkillEffectKind, magnitude: f64) -> Self {
        Self { kind, magnitude }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: SkillKind,
    #[serde(default)]
    pub rank: Rank,
    pub level: u8,
    pub max_level: u8,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub effects: SkillEffects,
}

impl Skill {
    #[must_use]
    pub const fn is_maxed(&self) -> bool {
        self.level >= self.max_level
    }

    /// Force level and progress back into range.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.max_level = self.max_level.max(1);
        self.level = self.level.clamp(1, self.max_level);
        self.progress = if self.progress.is_finite() {
            self.progress.clamp(0.0, MAX_PROGRESS)
        } else {
            0.0
        };
        self
    }
}

/// Skills every new cultivator starts with.
#[must_use]
pub fn default_skills() -> Vec<Skill> {
    vec![
        Skill {
            id: "purple-heaven-art".to_string(),
            name: "Purple Heaven Mystic Art".to_string(),
            description: "A breathing method that gathers purple qi at dawn.".to_string(),
            kind: SkillKind::Cultivation,
            rank: Rank::Earth,
            level: 1,
            max_level: 9,
            progress: 0.0,
            effects: smallvec![
                SkillEffect::new(SkillEffectKind::SpiritBonus, 5.0),
                SkillEffect::new(SkillEffectKind::CultivationSpeed, 10.0),
            ],
        },
        Skill {
            id: "eight-wilds-sword".to_string(),
            name: "Eight Wilds Sword Canon".to_string(),
            description: "Sword forms that sweep the eight directions.".to_string(),
            kind: SkillKind::Combat,
            rank: Rank::Spirit,
            level: 1,
            max_level: 7,
            progress: 0.0,
            effects: smallvec![
                SkillEffect::new(SkillEffectKind::AttackBonus, 8.0),
                SkillEffect::new(SkillEffectKind::SpeedBonus, 5.0),
            ],
        },
        Skill {
            id: "adamant-body".to_string(),
            name: "Adamant Body".to_string(),
            description: "Tempering that turns flesh to unbreakable vajra.".to_string(),
            kind: SkillKind::Body,
            rank: Rank::Spirit,
            level: 1,
            max_level: 5,
            progress: 0.0,
            effects: smallvec![
                SkillEffect::new(SkillEffectKind::HealthBonus, 15.0),
                SkillEffect::new(SkillEffectKind::DefenseBonus, 10.0),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_skills_have_distinct_caps() {
        let skills = default_skills();
        let caps: Vec<u8> = skills.iter().map(|s| s.max_level).collect();
        assert_eq!(caps, vec![9, 7, 5]);
        assert!(skills.iter().all(|s| s.level == 1 && s.progress.abs() < f64::EPSILON));
        assert!(skills.iter().all(|s| s.effects.len() == 2));
    }

    #[test]
    fn normalized_keeps_level_within_cap() {
        let skill = Skill {
            level: 12,
            progress: -4.0,
            ..default_skills().remove(2)
        }
        .normalized();
        assert_eq!(skill.level, 5);
        assert!(skill.is_maxed());
        assert!(skill.progress.abs() < f64::EPSILON);
    }
}
