//! Tunable progression parameters and their validation.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    BONUS_ATTACK, BONUS_DEFENSE, BONUS_HEALTH, BONUS_INSIGHT, BONUS_MANA, BONUS_SPEED,
    BONUS_SPIRIT, BREAKTHROUGH_NOTICE_WINDOW_MS, CULTIVATION_NOTICE_PERCENT,
    DEVIATION_PROBABILITY_PERCENT, DEVIATION_PROGRESS_DELTA, MAX_PROGRESS, NORMAL_PROGRESS_DELTA,
    SKILL_PROGRESS_DELTA, TICK_INTERVAL_MAX_MS, TICK_INTERVAL_MIN_MS,
    TRIBULATION_PENALTY_PERCENT, TRIBULATION_PROBABILITY_PERCENT,
};

/// Errors raised when a rule set violates its documented bounds.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("tick interval invalid (min {min}ms > max {max}ms)")]
    IntervalBounds { min: u64, max: u64 },
    #[error("tick interval minimum must be at least 1ms")]
    ZeroInterval,
    #[error("breakthrough notice window must not be negative (got {0}ms)")]
    NegativeWindow(i64),
    #[error("failed to parse progression rules: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Flat capacity increase granted on every successful breakthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeBonus {
    pub attack: u32,
    pub defense: u32,
    pub spirit: u32,
    pub speed: u32,
    pub health: u32,
    pub mana: u32,
    pub insight: u32,
}

impl Default for AttributeBonus {
    fn default() -> Self {
        Self {
            attack: BONUS_ATTACK,
            defense: BONUS_DEFENSE,
            spirit: BONUS_SPIRIT,
            speed: BONUS_SPEED,
            health: BONUS_HEALTH,
            mana: BONUS_MANA,
            insight: BONUS_INSIGHT,
        }
    }
}

/// Parameter set consumed by the mutation engine and the driver.
///
/// Probabilities are percentages in `[0, 100]`; a roll `r` drawn uniformly
/// from `[0, 100)` triggers the outcome when `r < p`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionRules {
    #[serde(default = "ProgressionRules::default_normal_progress_delta")]
    pub normal_progress_delta: f64,
    #[serde(default = "ProgressionRules::default_deviation_probability_percent")]
    pub deviation_probability_percent: f64,
    #[serde(default = "ProgressionRules::default_deviation_progress_delta")]
    pub deviation_progress_delta: f64,
    #[serde(default = "ProgressionRules::default_skill_progress_delta")]
    pub skill_progress_delta: f64,
    #[serde(default = "ProgressionRules::default_tribulation_probability_percent")]
    pub tribulation_probability_percent: f64,
    #[serde(default = "ProgressionRules::default_tribulation_penalty_percent")]
    pub tribulation_penalty_percent: f64,
    #[serde(default = "ProgressionRules::default_cultivation_notice_percent")]
    pub cultivation_notice_percent: f64,
    #[serde(default = "ProgressionRules::default_breakthrough_notice_window_ms")]
    pub breakthrough_notice_window_ms: i64,
    #[serde(default = "ProgressionRules::default_tick_interval_min_ms")]
    pub tick_interval_min_ms: u64,
    #[serde(default = "ProgressionRules::default_tick_interval_max_ms")]
    pub tick_interval_max_ms: u64,
    #[serde(default)]
    pub tier_attribute_bonus: AttributeBonus,
}

impl ProgressionRules {
    #[must_use]
    pub const fn default_normal_progress_delta() -> f64 {
        NORMAL_PROGRESS_DELTA
    }

    #[must_use]
    pub const fn default_deviation_probability_percent() -> f64 {
        DEVIATION_PROBABILITY_PERCENT
    }

    #[must_use]
    pub const fn default_deviation_progress_delta() -> f64 {
        DEVIATION_PROGRESS_DELTA
    }

    #[must_use]
    pub const fn default_skill_progress_delta() -> f64 {
        SKILL_PROGRESS_DELTA
    }

    #[must_use]
    pub const fn default_tribulation_probability_percent() -> f64 {
        TRIBULATION_PROBABILITY_PERCENT
    }

    #[must_use]
    pub const fn default_tribulation_penalty_percent() -> f64 {
        TRIBULATION_PENALTY_PERCENT
    }

    #[must_use]
    pub const fn default_cultivation_notice_percent() -> f64 {
        CULTIVATION_NOTICE_PERCENT
    }

    #[must_use]
    pub const fn default_breakthrough_notice_window_ms() -> i64 {
        BREAKTHROUGH_NOTICE_WINDOW_MS
    }

    #[must_use]
    pub const fn default_tick_interval_min_ms() -> u64 {
        TICK_INTERVAL_MIN_MS
    }

    #[must_use]
    pub const fn default_tick_interval_max_ms() -> u64 {
        TICK_INTERVAL_MAX_MS
    }

    /// Parse a rule set from JSON and validate it.
    ///
    /// Missing fields fall back to their canonical defaults.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::Parse` for malformed JSON, or the first bound
    /// violation reported by [`ProgressionRules::validate`].
    pub fn from_json(json: &str) -> Result<Self, RulesError> {
        let rules: Self = serde_json::from_str(json)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Validate rule invariants.
    ///
    /// # Errors
    ///
    /// Returns `RulesError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), RulesError> {
        check_range(
            "normal_progress_delta",
            self.normal_progress_delta,
            0.0,
            MAX_PROGRESS,
        )?;
        check_range(
            "deviation_probability_percent",
            self.deviation_probability_percent,
            0.0,
            100.0,
        )?;
        check_range(
            "deviation_progress_delta",
            self.deviation_progress_delta,
            -MAX_PROGRESS,
            0.0,
        )?;
        check_range(
            "skill_progress_delta",
            self.skill_progress_delta,
            0.0,
            MAX_PROGRESS,
        )?;
        check_range(
            "tribulation_probability_percent",
            self.tribulation_probability_percent,
            0.0,
            100.0,
        )?;
        check_range(
            "tribulation_penalty_percent",
            self.tribulation_penalty_percent,
            0.0,
            100.0,
        )?;
        check_range(
            "cultivation_notice_percent",
            self.cultivation_notice_percent,
            0.0,
            100.0,
        )?;
        if self.breakthrough_notice_window_ms < 0 {
            return Err(RulesError::NegativeWindow(
                self.breakthrough_notice_window_ms,
            ));
        }
        self.validate_interval()
    }

    fn validate_interval(&self) -> Result<(), RulesError> {
        if self.tick_interval_min_ms == 0 {
            return Err(RulesError::ZeroInterval);
        }
        if self.tick_interval_min_ms > self.tick_interval_max_ms {
            return Err(RulesError::IntervalBounds {
                min: self.tick_interval_min_ms,
                max: self.tick_interval_max_ms,
            });
        }
        Ok(())
    }

    /// Progress points removed by a failed tribulation.
    #[must_use]
    pub fn tribulation_penalty_points(&self) -> f64 {
        MAX_PROGRESS * self.tribulation_penalty_percent / 100.0
    }
}

impl Default for ProgressionRules {
    fn default() -> Self {
        Self {
            normal_progress_delta: Self::default_normal_progress_delta(),
            deviation_probability_percent: Self::default_deviation_probability_percent(),
            deviation_progress_delta: Self::default_deviation_progress_delta(),
            skill_progress_delta: Self::default_skill_progress_delta(),
            tribulation_probability_percent: Self::default_tribulation_probability_percent(),
            tribulation_penalty_percent: Self::default_tribulation_penalty_percent(),
            cultivation_notice_percent: Self::default_cultivation_notice_percent(),
            breakthrough_notice_window_ms: Self::default_breakthrough_notice_window_ms(),
            tick_interval_min_ms: Self::default_tick_interval_min_ms(),
            tick_interval_max_ms: Self::default_tick_interval_max_ms(),
            tier_attribute_bonus: AttributeBonus::default(),
        }
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), RulesError> {
    if !(min..=max).contains(&value) {
        return Err(RulesError::RangeViolation {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_canonical_and_valid() {
        let rules = ProgressionRules::default();
        assert!(rules.validate().is_ok());
        assert!((rules.normal_progress_delta - 3.0).abs() < f64::EPSILON);
        assert!((rules.deviation_progress_delta + 5.0).abs() < f64::EPSILON);
        assert!((rules.skill_progress_delta - 0.3).abs() < f64::EPSILON);
        assert!((rules.tribulation_penalty_points() - 30.0).abs() < f64::EPSILON);
        assert_eq!(rules.tier_attribute_bonus.health, 100);
        assert_eq!(rules.tier_attribute_bonus.insight, 5);
        assert_eq!(rules.breakthrough_notice_window_ms, 3_600_000);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let rules = ProgressionRules::from_json(r#"{"normal_progress_delta": 12.5}"#)
            .expect("partial rules parse");
        assert!((rules.normal_progress_delta - 12.5).abs() < f64::EPSILON);
        assert!((rules.tribulation_probability_percent - 5.0).abs() < f64::EPSILON);
        assert_eq!(rules.tick_interval_max_ms, 2_000);
    }

    #[test]
    fn validate_rejects_out_of_range_probability() {
        let rules = ProgressionRules {
            tribulation_probability_percent: 120.0,
            ..ProgressionRules::default()
        };
        let err = rules.validate().expect_err("probability above 100 rejected");
        assert!(matches!(
            err,
            RulesError::RangeViolation {
                field: "tribulation_probability_percent",
                ..
            }
        ));
    }

    #[test]
    fn validate_rejects_positive_deviation_and_nan() {
        let positive = ProgressionRules {
            deviation_progress_delta: 2.0,
            ..ProgressionRules::default()
        };
        assert!(positive.validate().is_err());

        let nan = ProgressionRules {
            normal_progress_delta: f64::NAN,
            ..ProgressionRules::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_interval() {
        let rules = ProgressionRules {
            tick_interval_min_ms: 3_000,
            tick_interval_max_ms: 1_000,
            ..ProgressionRules::default()
        };
        assert!(matches!(
            rules.validate(),
            Err(RulesError::IntervalBounds {
                min: 3_000,
                max: 1_000
            })
        ));
        let zero = ProgressionRules {
            tick_interval_min_ms: 0,
            ..ProgressionRules::default()
        };
        assert!(matches!(zero.validate(), Err(RulesError::ZeroInterval)));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(
            ProgressionRules::from_json("{not json"),
            Err(RulesError::Parse(_))
        ));
    }
}
