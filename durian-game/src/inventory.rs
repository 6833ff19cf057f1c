//! Consumables, treasures, and spirit-stone balances.
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use thiserror::Error;

use crate::constants::INVENTORY_SLOTS;
use crate::skill::Rank;

const FOUR_HOURS_MS: i64 = 4 * 60 * 60 * 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Pill,
    Material,
    Artifact,
    Talisman,
    Treasure,
}

/// Effect applied when an item is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemEffect {
    /// Restore a percentage of health capacity.
    HealHealth { percent: f64 },
    /// Restore a percentage of mana capacity.
    HealMana { percent: f64 },
    /// Grant flat realm progress points.
    AddCultivation { points: f64 },
    /// Temporary cultivation speed bonus.
    CultivationSpeed { percent: f64, duration_ms: i64 },
}

pub type ItemEffects = SmallVec<[ItemEffect; 2]>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub rank: Rank,
    #[serde(default)]
    pub stackable: bool,
    pub quantity: u32,
    #[serde(default)]
    pub effects: ItemEffects,
    /// Sale price per unit in spirit stones.
    #[serde(default)]
    pub value: u64,
    #[serde(default)]
    pub usable: bool,
}

impl Item {
    fn stacks_with(&self, other: &Self) -> bool {
        self.stackable && other.stackable && self.name == other.name && self.kind == other.kind
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("inventory is full ({capacity} slots)")]
    Full { capacity: usize },
    #[error("no item with id {0}")]
    NotFound(String),
    #[error("item {0} cannot be used")]
    NotUsable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default = "Inventory::default_max_size")]
    pub max_size: usize,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            max_size: Self::default_max_size(),
        }
    }
}

impl Inventory {
    #[must_use]
    pub const fn default_max_size() -> usize {
        INVENTORY_SLOTS
    }

    #[must_use]
    pub fn get(&self, item_id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == item_id)
    }

    /// Add an item, merging into an existing stack when possible.
    ///
    /// # Errors
    ///
    /// Returns `InventoryError::Full` when the item needs a new slot and none is free.
    pub fn add(&mut self, item: Item) -> Result<(), InventoryError> {
        if let Some(stack) = self.items.iter_mut().find(|held| held.stacks_with(&item)) {
            stack.quantity = stack.quantity.saturating_add(item.quantity);
            return Ok(());
        }
        if self.items.len() >= self.max_size {
            return Err(InventoryError::Full {
                capacity: self.max_size,
            });
        }
        self.items.push(item);
        Ok(())
    }

    /// Consume one unit of a usable item, returning its template.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids and `NotUsable` for items that cannot be consumed.
    pub fn consume_one(&mut self, item_id: &str) -> Result<Item, InventoryError> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| InventoryError::NotFound(item_id.to_string()))?;
        if !self.items[index].usable {
            return Err(InventoryError::NotUsable(item_id.to_string()));
        }
        let template = self.items[index].clone();
        let remaining = template.quantity.saturating_sub(1);
        if remaining == 0 {
            self.items.remove(index);
        } else {
            self.items[index].quantity = remaining;
        }
        Ok(template)
    }

    /// Remove a whole stack.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids.
    pub fn remove(&mut self, item_id: &str) -> Result<Item, InventoryError> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| InventoryError::NotFound(item_id.to_string()))?;
        Ok(self.items.remove(index))
    }
}

/// Spirit stones (primary) and spirit gems (secondary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Currency {
    pub primary: u64,
    pub secondary: u64,
}

impl Default for Currency {
    fn default() -> Self {
        Self {
            primary: 100,
            secondary: 5,
        }
    }
}

impl Currency {
    /// Apply signed deltas, flooring each balance at zero.
    #[must_use]
    pub const fn adjusted(self, primary_delta: i64, secondary_delta: i64) -> Self {
        Self {
            primary: self.primary.saturating_add_signed(primary_delta),
            secondary: self.secondary.saturating_add_signed(secondary_delta),
        }
    }
}

/// Items every new cultivator starts with.
#[must_use]
pub fn starter_inventory() -> Inventory {
    Inventory {
        items: vec![
            Item {
                id: "qi-condensing-pill".to_string(),
                name: "Qi Condensing Pill".to_string(),
                description: "Raises cultivation speed by 30% for four hours.".to_string(),
                kind: ItemKind::Pill,
                rank: Rank::Mortal,
                stackable: true,
                quantity: 3,
                effects: smallvec![ItemEffect::CultivationSpeed {
                    percent: 30.0,
                    duration_ms: FOUR_HOURS_MS,
                }],
                value: 50,
                usable: true,
            },
            Item {
                id: "qi-restoring-pill".to_string(),
                name: "Qi Restoring Pill".to_string(),
                description: "Restores a quarter of your mana.".to_string(),
                kind: ItemKind::Pill,
                rank: Rank::Mortal,
                stackable: true,
                quantity: 2,
                effects: smallvec![ItemEffect::HealMana { percent: 25.0 }],
                value: 30,
                usable: true,
            },
        ],
        max_size: INVENTORY_SLOTS,
    }
}
