//! Time-limited undo for destructive actions.
//!
//! Entries are kept newest-first. Each one stays usable for a fixed window
//! after it was pushed and is discarded afterwards whether or not it was
//! consumed. Expiry is checked against an explicit `now` so the caller owns
//! the clock.

use crate::config::UndoConfig;
use crate::model::Tile;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Payload captured before a tile is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileSnapshot {
    pub tile: Tile,
}

/// A reversible action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UndoEntry {
    TileDelete {
        timestamp: DateTime<Utc>,
        snapshot: TileSnapshot,
    },
    /// Reserved for container deletion; nothing produces it yet and it has
    /// no restoration.
    ContainerDelete {
        timestamp: DateTime<Utc>,
        snapshot: serde_json::Value,
    },
}

impl UndoEntry {
    pub fn tile_delete(tile: Tile, timestamp: DateTime<Utc>) -> Self {
        UndoEntry::TileDelete {
            timestamp,
            snapshot: TileSnapshot { tile },
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            UndoEntry::TileDelete { timestamp, .. }
            | UndoEntry::ContainerDelete { timestamp, .. } => *timestamp,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            UndoEntry::TileDelete { .. } => "tile_delete",
            UndoEntry::ContainerDelete { .. } => "container_delete",
        }
    }
}

/// Bounded newest-first stack of [`UndoEntry`] values.
#[derive(Debug, Clone)]
pub struct UndoStack {
    entries: VecDeque<UndoEntry>,
    capacity: usize,
    ttl: TimeDelta,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(&UndoConfig::default())
    }
}

impl UndoStack {
    pub fn new(config: &UndoConfig) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: config.max_entries.max(1),
            ttl: i64::try_from(config.ttl_ms)
                .ok()
                .and_then(TimeDelta::try_milliseconds)
                .unwrap_or(TimeDelta::MAX),
        }
    }

    /// Push an entry; the oldest entry is dropped once over capacity.
    pub fn push(&mut self, entry: UndoEntry) {
        log::debug!("ui/pushUndo type={}", entry.kind());
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    /// End of an entry's window; `None` when it lies beyond the calendar.
    fn deadline(&self, entry: &UndoEntry) -> Option<DateTime<Utc>> {
        entry.timestamp().checked_add_signed(self.ttl)
    }

    fn is_expired(&self, entry: &UndoEntry, now: DateTime<Utc>) -> bool {
        self.deadline(entry).is_some_and(|deadline| now >= deadline)
    }

    /// Drop every entry whose window has closed.
    pub fn clear_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|entry| {
            entry
                .timestamp()
                .checked_add_signed(ttl)
                .is_none_or(|deadline| now < deadline)
        });
        let removed = before - self.entries.len();
        if removed > 0 {
            log::debug!("ui/clearExpiredUndo removed={removed}");
        }
        removed
    }

    /// Remove and return the newest entry that is still inside its window.
    pub fn pop(&mut self, now: DateTime<Utc>) -> Option<UndoEntry> {
        while let Some(entry) = self.entries.pop_front() {
            if !self.is_expired(&entry, now) {
                return Some(entry);
            }
            log::debug!("ui/popUndo discarded expired {}", entry.kind());
        }
        log::debug!("ui/popUndo empty");
        None
    }

    /// The single entry offered to the user, if any.
    pub fn active(&self, now: DateTime<Utc>) -> Option<&UndoEntry> {
        self.entries.iter().find(|entry| !self.is_expired(entry, now))
    }

    /// Time left on the active entry; zero when there is none.
    pub fn remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        self.active(now)
            .map(|entry| match self.deadline(entry) {
                Some(deadline) => deadline.signed_duration_since(now),
                None => TimeDelta::MAX,
            })
            .unwrap_or_else(TimeDelta::zero)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
