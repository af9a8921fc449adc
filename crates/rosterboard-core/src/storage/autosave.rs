//! Debounced board persistence.
//!
//! Changes mark the saver dirty; a save happens once no further change has
//! arrived for the debounce interval. The caller owns the clock and calls
//! [`AutoSaver::maybe_save`] from its tick.

use super::snapshot::BoardPersistence;
use super::Storage;
use crate::model::BoardState;
use std::time::{Duration, Instant};

/// Tracks unsaved changes and decides when to write them.
pub struct AutoSaver<S: Storage> {
    persistence: BoardPersistence<S>,
    /// Quiet period required after the last change.
    debounce: Duration,
    /// Instant of the most recent unsaved change.
    last_change: Option<Instant>,
    /// Whether the board has unsaved changes.
    dirty: bool,
}

impl<S: Storage> AutoSaver<S> {
    pub fn new(persistence: BoardPersistence<S>) -> Self {
        let debounce = persistence.config().autosave_debounce();
        Self {
            persistence,
            debounce,
            last_change: None,
            dirty: false,
        }
    }

    pub fn set_debounce(&mut self, debounce: Duration) {
        self.debounce = debounce;
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn persistence(&self) -> &BoardPersistence<S> {
        &self.persistence
    }

    /// Record a change made at `now`; restarts the quiet period.
    pub fn mark_dirty(&mut self, now: Instant) {
        self.dirty = true;
        self.last_change = Some(now);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the quiet period has elapsed since the last change.
    pub fn should_save(&self, now: Instant) -> bool {
        if !self.dirty {
            return false;
        }
        match self.last_change {
            Some(last) => now.saturating_duration_since(last) >= self.debounce,
            None => true,
        }
    }

    /// Save if dirty and quiet. Returns true if a save was written.
    pub fn maybe_save(&mut self, now: Instant, state: &BoardState) -> bool {
        if !self.should_save(now) {
            return false;
        }
        self.save(now, state)
    }

    /// Save immediately. A failed write keeps the saver dirty so the next
    /// quiet period retries it.
    pub fn save(&mut self, now: Instant, state: &BoardState) -> bool {
        if self.persistence.save(state) {
            self.dirty = false;
            self.last_change = None;
            true
        } else {
            self.last_change = Some(now);
            false
        }
    }

    /// Write pending changes regardless of the quiet period.
    pub fn flush(&mut self, now: Instant, state: &BoardState) -> bool {
        if !self.dirty {
            return false;
        }
        self.save(now, state)
    }
}
