//! Bounded, most-recent-first event history.
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::MAX_EVENTS;
use crate::event::Event;

/// Append-only narration log. Index 0 is the newest entry; once the log
/// holds [`MAX_EVENTS`] entries the oldest are dropped silently.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EventLog {
    entries: Vec<Event>,
}

impl EventLog {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Prepend an event, evicting the oldest entries beyond capacity.
    pub fn push(&mut self, event: Event) {
        self.entries.insert(0, event);
        self.entries.truncate(MAX_EVENTS);
    }

    /// Copy of the log with `event` prepended.
    #[must_use]
    pub fn appended(&self, event: Event) -> Self {
        let mut next = self.clone();
        next.push(event);
        next
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest event, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&Event> {
        self.entries.first()
    }

    /// Newest event carrying the given key.
    #[must_use]
    pub fn latest_with_key(&self, key: &str) -> Option<&Event> {
        self.entries.iter().find(|event| event.key == key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.entries.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Event] {
        &self.entries
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<'de> Deserialize<'de> for EventLog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut entries = Vec::<Event>::deserialize(deserializer)?;
        entries.truncate(MAX_EVENTS);
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventId, EventKind};

    fn event(id: u64) -> Event {
        Event::new(EventId(id), EventKind::System, "test", "t", "d", 0)
    }

    #[test]
    fn push_is_most_recent_first() {
        let mut log = EventLog::new();
        log.push(event(1));
        log.push(event(2));
        assert_eq!(log.latest().map(|e| e.id), Some(EventId(2)));
        assert_eq!(log.as_slice()[1].id, EventId(1));
    }

    #[test]
    fn cap_evicts_oldest() {
        let mut log = EventLog::new();
        for id in 0..50 {
            log.push(event(id));
        }
        assert_eq!(log.len(), 50);
        let next = log.appended(event(50));
        assert_eq!(next.len(), 50);
        assert_eq!(next.latest().map(|e| e.id), Some(EventId(50)));
        assert!(next.iter().all(|e| e.id != EventId(0)));
        assert_eq!(log.len(), 50, "original log untouched");
        assert!(log.iter().any(|e| e.id == EventId(0)));
    }

    #[test]
    fn deserialize_truncates_oversized_history() {
        let raw: Vec<Event> = (0..60).map(event).collect();
        let json = serde_json::to_string(&raw).unwrap();
        let log: EventLog = serde_json::from_str(&json).unwrap();
        assert_eq!(log.len(), 50);
        assert_eq!(log.latest().map(|e| e.id), Some(EventId(0)));
    }

    #[test]
    fn latest_with_key_finds_newest_match() {
        let mut log = EventLog::new();
        log.push(Event::new(EventId(1), EventKind::Cultivation, "a", "", "", 10));
        log.push(Event::new(EventId(2), EventKind::Cultivation, "b", "", "", 20));
        log.push(Event::new(EventId(3), EventKind::Cultivation, "a", "", "", 30));
        assert_eq!(log.latest_with_key("a").map(|e| e.timestamp), Some(30));
        assert!(log.latest_with_key("missing").is_none());
    }
}
