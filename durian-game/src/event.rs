//! Narration events emitted by progression transitions.
//!
//! `key` is the mechanical descriptor used for de-duplication and by
//! presentation layers; `title` and `description` are ready-to-show text.

use serde::{Deserialize, Serialize};

/// Monotonic identifier assigned from the snapshot's event counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Cultivation,
    Breakthrough,
    Tribulation,
    Skill,
    Story,
    Item,
    System,
}

/// Hint for how a presentation layer should surface an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiSurfaceHint {
    Log,
    Toast,
    Modal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub kind: EventKind,
    pub key: String,
    pub title: String,
    pub description: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_surface_hint: Option<UiSurfaceHint>,
    /// Optional structured payload for downstream rendering.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl Event {
    #[must_use]
    pub fn new(
        id: EventId,
        kind: EventKind,
        key: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            id,
            kind,
            key: key.into(),
            title: title.into(),
            description: description.into(),
            timestamp,
            ui_surface_hint: Some(UiSurfaceHint::Log),
            payload: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub const fn with_surface(mut self, hint: UiSurfaceHint) -> Self {
        self.ui_surface_hint = Some(hint);
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}
