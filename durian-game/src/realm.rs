//! Ordered cultivation realms.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse progression tier. Ascension is terminal.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Realm {
    #[default]
    QiRefining,
    Foundation,
    CoreFormation,
    NascentSoul,
    SpiritSevering,
    Void,
    Integration,
    Ascension,
}

impl Realm {
    /// All realms in ascending order.
    pub const ALL: [Self; 8] = [
        Self::QiRefining,
        Self::Foundation,
        Self::CoreFormation,
        Self::NascentSoul,
        Self::SpiritSevering,
        Self::Void,
        Self::Integration,
        Self::Ascension,
    ];

    /// Zero-based position in the ladder.
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize
    }

    /// The realm that follows, or `None` at the terminal realm.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::ALL.get(self.ordinal() + 1).copied()
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ascension)
    }

    /// Display label used in narration.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::QiRefining => "Qi Refining",
            Self::Foundation => "Foundation Establishment",
            Self::CoreFormation => "Core Formation",
            Self::NascentSoul => "Nascent Soul",
            Self::SpiritSevering => "Spirit Severing",
            Self::Void => "Void Refinement",
            Self::Integration => "Integration",
            Self::Ascension => "Ascension",
        }
    }

    /// Stable snake-case key, matching the serialized form.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::QiRefining => "qi_refining",
            Self::Foundation => "foundation",
            Self::CoreFormation => "core_formation",
            Self::NascentSoul => "nascent_soul",
            Self::SpiritSevering => "spirit_severing",
            Self::Void => "void",
            Self::Integration => "integration",
            Self::Ascension => "ascension",
        }
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a realm name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown realm: {0}")]
pub struct UnknownRealm(pub String);

impl FromStr for Realm {
    type Err = UnknownRealm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|realm| {
                realm.key().eq_ignore_ascii_case(needle)
                    || realm.label().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| UnknownRealm(s.to_string()))
    }
}
