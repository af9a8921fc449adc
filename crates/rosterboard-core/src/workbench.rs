//! The orchestrating layer around the board store.
//!
//! A [`Workbench`] owns one running board: the store, interaction session,
//! drag and gesture controllers, and debounced persistence. Timers live with
//! the caller, which drives [`Workbench::tick`] (every
//! `UndoConfig::poll_interval` is enough).

use crate::config::BoardConfig;
use crate::drag::{DragController, DragEvent, DropAnimation, DropOutcome};
use crate::error::BoardResult;
use crate::gesture::{GestureKind, GestureTracker, PointerId};
use crate::model::{BoardMode, BoardState, TileId};
use crate::session::{ModalState, UiSession};
use crate::storage::{AutoSaver, BoardPersistence, Storage, StorageResult, normalize};
use crate::store::{BoardEvent, BoardStore};
use crate::undo::UndoEntry;
use chrono::{DateTime, TimeDelta, Utc};
use kurbo::Point;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Instant;

/// Result of an undo request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    /// A deleted tile was put back.
    Restored { tile_id: TileId },
    /// The entry has no restoration; it was consumed anyway.
    Unsupported { kind: &'static str },
    /// Nothing within its window to undo.
    Nothing,
}

/// One open board with its session and persistence.
pub struct Workbench<S: Storage> {
    store: BoardStore,
    session: UiSession,
    drag: DragController,
    gestures: GestureTracker,
    autosave: AutoSaver<S>,
    events: Receiver<BoardEvent>,
}

impl<S: Storage> Workbench<S> {
    /// Restore the stored board, or start the first-run board when nothing
    /// usable is stored.
    ///
    /// Fails with [`BoardError::NeedsRecovery`](crate::BoardError::NeedsRecovery)
    /// if required banks are missing; the caller must then [`reset`](Self::reset)
    /// the stored board.
    pub fn open(storage: Arc<S>, config: &BoardConfig, now: DateTime<Utc>) -> BoardResult<Self> {
        let persistence =
            BoardPersistence::new(storage, config.storage.clone(), config.layout.clone());
        let state = persistence.load().unwrap_or_else(|| {
            log::info!("workbench/first-run");
            normalize(BoardState::first_run(), &config.layout)
        });
        let mode = persistence.load_mode();
        Self::with_state(persistence, state, config, mode, now)
    }

    fn with_state(
        persistence: BoardPersistence<S>,
        state: BoardState,
        config: &BoardConfig,
        mode: Option<BoardMode>,
        now: DateTime<Utc>,
    ) -> BoardResult<Self> {
        let mut store = BoardStore::new(state, config.layout.clone());
        store.required_banks()?;
        let events = store.subscribe();

        let mut session = UiSession::new(&config.undo);
        if let Some(mode) = mode {
            session.mode = mode;
        }
        session.undo.clear_expired(now);

        log::info!(
            "workbench/open board={} mode={:?}",
            store.board().id,
            session.mode
        );
        Ok(Self {
            store,
            session,
            drag: DragController::new(),
            gestures: GestureTracker::new(),
            autosave: AutoSaver::new(persistence),
            events,
        })
    }

    /// Discard the stored board and start over from the first-run board.
    pub fn reset(storage: Arc<S>, config: &BoardConfig, now: DateTime<Utc>) -> BoardResult<Self> {
        let persistence =
            BoardPersistence::new(storage, config.storage.clone(), config.layout.clone());
        let state = normalize(BoardState::first_run(), &config.layout);
        log::warn!("workbench/reset board={}", state.board.id);
        persistence.save(&state);
        Self::with_state(persistence, state, config, None, now)
    }

    pub fn store(&self) -> &BoardStore {
        &self.store
    }

    /// Direct store access; changes are picked up by autosave on the next
    /// tick.
    pub fn store_mut(&mut self) -> &mut BoardStore {
        &mut self.store
    }

    pub fn session(&self) -> &UiSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut UiSession {
        &mut self.session
    }

    pub fn persistence(&self) -> &BoardPersistence<S> {
        self.autosave.persistence()
    }

    // ------------------------------------------------------------------
    // Pointer input

    /// Feed a tile drag lifecycle event.
    pub fn drag(&mut self, event: DragEvent) -> Option<DropOutcome> {
        self.drag.handle(&mut self.store, &mut self.session, event)
    }

    pub fn drop_animation(&self) -> DropAnimation {
        self.drag.drop_animation()
    }

    pub fn container_pointer_down(
        &mut self,
        container_id: &str,
        pointer_id: PointerId,
        kind: GestureKind,
        pointer: Point,
        zoom: f64,
    ) -> bool {
        self.gestures
            .pointer_down(&mut self.store, container_id, pointer_id, kind, pointer, zoom)
    }

    pub fn container_pointer_move(&mut self, pointer_id: PointerId, pointer: Point) -> bool {
        self.gestures.pointer_move(&mut self.store, pointer_id, pointer)
    }

    pub fn container_pointer_up(&mut self, pointer_id: PointerId) -> bool {
        self.gestures.pointer_up(pointer_id)
    }

    // ------------------------------------------------------------------
    // Undo

    /// Delete a tile, recording it for undo first.
    pub fn delete_tile_with_undo(&mut self, tile_id: &str, now: DateTime<Utc>) -> bool {
        let Some(tile) = self.store.tile(tile_id).cloned() else {
            log::debug!("workbench/delete-tile unknown id={tile_id}");
            return false;
        };
        self.session.undo.push(UndoEntry::tile_delete(tile, now));
        self.store.delete_tile(tile_id);

        if self.session.selected_tile_id.as_deref() == Some(tile_id) {
            self.session.select_tile(None);
        }
        let modal_on_tile = matches!(
            &self.session.modal,
            Some(ModalState::TileInfo { entity_id } | ModalState::DeleteConfirm { entity_id })
                if entity_id == tile_id
        );
        if modal_on_tile {
            self.session.close_modal();
        }
        true
    }

    /// Undo the most recent action still inside its window.
    pub fn undo(&mut self, now: DateTime<Utc>) -> UndoOutcome {
        let Some(entry) = self.session.undo.pop(now) else {
            log::debug!("undo/no-entry-to-restore");
            return UndoOutcome::Nothing;
        };
        match entry {
            UndoEntry::TileDelete { snapshot, .. } => {
                let tile_id = snapshot.tile.id.clone();
                if self.store.restore_tile(snapshot.tile) {
                    log::debug!("undo/restore-tile id={tile_id}");
                    UndoOutcome::Restored { tile_id }
                } else {
                    UndoOutcome::Nothing
                }
            }
            other => {
                log::warn!("undo/unsupported-entry-type {}", other.kind());
                UndoOutcome::Unsupported { kind: other.kind() }
            }
        }
    }

    /// Throw away the entry currently offered for undo.
    pub fn dismiss_undo(&mut self, now: DateTime<Utc>) -> Option<UndoEntry> {
        let discarded = self.session.undo.pop(now);
        log::debug!(
            "undo/dismiss discarded={:?}",
            discarded.as_ref().map(UndoEntry::kind)
        );
        discarded
    }

    pub fn active_undo(&self, now: DateTime<Utc>) -> Option<&UndoEntry> {
        self.session.undo.active(now)
    }

    pub fn undo_remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        self.session.undo.remaining(now)
    }

    // ------------------------------------------------------------------
    // Timers and persistence

    fn drain_events(&mut self, now: Instant) {
        let changes = self.events.try_iter().count();
        if changes > 0 {
            self.autosave.mark_dirty(now);
        }
    }

    /// Periodic housekeeping: expire undo entries and autosave once the
    /// board has been quiet long enough. Returns whether a save happened.
    pub fn tick(&mut self, wall: DateTime<Utc>, now: Instant) -> bool {
        self.drain_events(now);
        self.session.undo.clear_expired(wall);
        self.autosave.maybe_save(now, self.store.state())
    }

    /// Save pending changes immediately.
    pub fn flush(&mut self, now: Instant) -> bool {
        self.drain_events(now);
        self.autosave.flush(now, self.store.state())
    }

    pub fn has_unsaved_changes(&mut self, now: Instant) -> bool {
        self.drain_events(now);
        self.autosave.is_dirty()
    }

    pub fn set_mode(&mut self, mode: BoardMode) {
        self.session.set_mode(mode);
        self.autosave.persistence().save_mode(mode);
    }

    /// Replace the board with imported JSON. Returns false, leaving the
    /// board untouched, when the text is not a board.
    pub fn import_json(&mut self, json: &str) -> bool {
        let Some(state) = self.autosave.persistence().import_str(json) else {
            return false;
        };
        self.drag.cancel(&mut self.session);
        self.session.select_tile(None);
        self.session.close_modal();
        log::info!("workbench/import board={} tiles={}", state.board.id, state.tiles.len());
        self.store.load(state);
        true
    }

    pub fn export_json(&self) -> StorageResult<String> {
        self.autosave.persistence().export(self.store.state())
    }

    /// Run the load-time repairs over the live board and write the result
    /// back to storage. Returns whether the live board or its stored copy
    /// changed.
    pub fn repair(&mut self, now: Instant) -> bool {
        let repaired = normalize(self.store.snapshot(), self.autosave.persistence().layout());
        let live_changed = &repaired != self.store.state();
        if live_changed {
            self.store.load(repaired);
        }
        let stored_changed = !self.autosave.persistence().stored_matches(self.store.state());
        self.drain_events(now);
        self.autosave.save(now, self.store.state());

        if live_changed || stored_changed {
            log::warn!(
                "workbench/repair board={} live={live_changed} stored={stored_changed}",
                self.store.board().id
            );
        }
        live_changed || stored_changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FatigueState, TileType};
    use crate::storage::MemoryStorage;
    use crate::store::CreateTileInput;
    use std::time::Duration;

    fn open(storage: &Arc<MemoryStorage>) -> Workbench<MemoryStorage> {
        Workbench::open(storage.clone(), &BoardConfig::default(), Utc::now()).unwrap()
    }

    fn add_staff(bench: &mut Workbench<MemoryStorage>, name: &str) -> TileId {
        bench
            .store_mut()
            .create_tile(CreateTileInput {
                name: name.to_string(),
                tile_type: TileType::Staff,
                notes: Some("radio".to_string()),
            })
            .unwrap()
    }

    #[test]
    fn test_open_first_run() {
        let storage = Arc::new(MemoryStorage::new());
        let bench = open(&storage);

        assert_eq!(bench.store().board().name, "Chotolate Board");
        assert_eq!(bench.store().state().containers.len(), 1);
        assert_eq!(bench.session().mode, BoardMode::Setup);
    }

    #[test]
    fn test_changes_survive_reopen() {
        let storage = Arc::new(MemoryStorage::new());
        let mut bench = open(&storage);
        let aki = add_staff(&mut bench, "Aki");
        bench.set_mode(BoardMode::Command);

        let t0 = Instant::now();
        assert!(bench.has_unsaved_changes(t0));
        assert!(!bench.tick(Utc::now(), t0));
        assert!(bench.tick(Utc::now(), t0 + Duration::from_millis(500)));

        let reopened = open(&storage);
        assert_eq!(reopened.store().tile(&aki).unwrap().name, "Aki");
        assert_eq!(reopened.session().mode, BoardMode::Command);
    }

    #[test]
    fn test_delete_and_undo() {
        let storage = Arc::new(MemoryStorage::new());
        let mut bench = open(&storage);
        let aki = add_staff(&mut bench, "Aki");
        bench.store_mut().set_fatigue(&aki, FatigueState::Red);
        bench.session_mut().select_tile(Some(aki.clone()));
        bench
            .session_mut()
            .open_modal(ModalState::DeleteConfirm { entity_id: aki.clone() });

        let t0 = Utc::now();
        assert!(bench.delete_tile_with_undo(&aki, t0));
        assert!(bench.store().tile(&aki).is_none());
        assert!(bench.session().selected_tile_id.is_none());
        assert!(bench.session().modal.is_none());
        assert!(bench.active_undo(t0).is_some());

        let outcome = bench.undo(t0 + TimeDelta::seconds(3));
        assert_eq!(outcome, UndoOutcome::Restored { tile_id: aki.clone() });
        let tile = bench.store().tile(&aki).unwrap();
        assert_eq!(tile.fatigue_state, FatigueState::Red);
        assert_eq!(tile.notes, "radio");
    }

    #[test]
    fn test_undo_after_expiry_does_nothing() {
        let storage = Arc::new(MemoryStorage::new());
        let mut bench = open(&storage);
        let aki = add_staff(&mut bench, "Aki");

        let t0 = Utc::now();
        bench.delete_tile_with_undo(&aki, t0);
        let later = t0 + TimeDelta::milliseconds(10_000);
        bench.tick(later, Instant::now());

        assert!(bench.active_undo(later).is_none());
        assert_eq!(bench.undo(later), UndoOutcome::Nothing);
        assert!(bench.store().tile(&aki).is_none());
    }

    #[test]
    fn test_dismiss_undo() {
        let storage = Arc::new(MemoryStorage::new());
        let mut bench = open(&storage);
        let aki = add_staff(&mut bench, "Aki");
        let t0 = Utc::now();
        bench.delete_tile_with_undo(&aki, t0);

        assert!(bench.dismiss_undo(t0).is_some());
        assert_eq!(bench.undo(t0), UndoOutcome::Nothing);
    }

    #[test]
    fn test_container_delete_entry_is_unsupported() {
        let storage = Arc::new(MemoryStorage::new());
        let mut bench = open(&storage);
        let t0 = Utc::now();
        bench.session_mut().undo.push(UndoEntry::ContainerDelete {
            timestamp: t0,
            snapshot: serde_json::json!({}),
        });

        assert_eq!(
            bench.undo(t0),
            UndoOutcome::Unsupported {
                kind: "container_delete"
            }
        );
        assert!(bench.session().undo.is_empty());
    }

    #[test]
    fn test_import_replaces_board() {
        let storage = Arc::new(MemoryStorage::new());
        let mut source = open(&storage);
        add_staff(&mut source, "Aki");
        let json = source.export_json().unwrap();

        let other = Arc::new(MemoryStorage::new());
        let mut bench = open(&other);
        assert!(!bench.import_json("{\"nope\":true}"));
        assert!(bench.import_json(&json));
        assert_eq!(bench.store().board().id, source.store().board().id);
        assert!(bench.has_unsaved_changes(Instant::now()));
    }

    #[test]
    fn test_reset_replaces_stored_board() {
        let storage = Arc::new(MemoryStorage::new());
        let mut bench = open(&storage);
        add_staff(&mut bench, "Aki");
        bench.flush(Instant::now());

        let fresh = Workbench::reset(storage.clone(), &BoardConfig::default(), Utc::now()).unwrap();
        assert!(fresh.store().state().tiles.is_empty());
        assert!(open(&storage).store().state().tiles.is_empty());
    }

    #[test]
    fn test_repair_fixes_live_board() {
        let storage = Arc::new(MemoryStorage::new());
        let mut bench = open(&storage);
        // Nothing stored yet, so the first repair writes the board.
        assert!(bench.repair(Instant::now()));
        assert!(!bench.repair(Instant::now()));

        let kai = bench
            .store_mut()
            .create_tile(CreateTileInput {
                name: "Kai".to_string(),
                tile_type: TileType::Newcomer,
                notes: None,
            })
            .unwrap();
        let mut damaged = bench.store().snapshot();
        if let Some(tile) = damaged.tiles.get_mut(&kai) {
            tile.fatigue_state = FatigueState::Red;
        }
        bench.store_mut().load(damaged);

        assert!(bench.repair(Instant::now()));
        assert_eq!(bench.store().tile(&kai).unwrap().fatigue_state, FatigueState::Green);
        assert!(!bench.repair(Instant::now()));
        assert!(!bench.has_unsaved_changes(Instant::now()));
    }

    #[test]
    fn test_repair_rewrites_damaged_storage() {
        let storage = Arc::new(MemoryStorage::new());
        let damaged = serde_json::json!({
            "board": { "id": "b", "name": "Damaged" },
            "containers": {},
            "banks": { "bs": { "bankType": "staff" } },
            "tiles": {
                "t": { "name": "Kai", "tileType": "newcomer", "currentZoneId": "bs", "fatigueState": "red" }
            }
        })
        .to_string();
        let key = BoardConfig::default().storage.board_key();
        storage.save(&key, &damaged).unwrap();

        let mut bench = open(&storage);
        assert!(bench.repair(Instant::now()));

        let stored = storage.load(&key).unwrap();
        assert_ne!(stored, damaged);
        let value: serde_json::Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(value["banks"].as_object().unwrap().len(), 3);
        assert_eq!(value["tiles"]["t"]["fatigueState"], "green");
        assert_ne!(value["tiles"]["t"]["currentZoneId"], "bs");
        assert!(bench.persistence().stored_matches(bench.store().state()));
    }
}
