//! Versioned board snapshots on top of a [`Storage`] backend.
//!
//! The board is stored as an envelope `{version, savedAt, board, containers,
//! banks, tiles}` under the versioned board key; the interaction mode is a
//! bare JSON string under its own key. Reads never fail loudly: anything
//! unreadable is logged and reported as "nothing stored".

use super::repair::{decode_state, normalize};
use super::{Storage, StorageError, StorageResult};
use crate::config::{LayoutConfig, StorageConfig};
use crate::model::{BoardMode, BoardState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    version: u32,
    saved_at: DateTime<Utc>,
    #[serde(flatten)]
    state: &'a BoardState,
}

/// How a stored value was recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// Current envelope with a matching version.
    Envelope { version: u32, saved_at: String },
    /// Bare `{board, containers, banks, tiles}`, or an envelope from another
    /// version.
    Legacy,
}

fn has_payload_shape(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    let board_id = object
        .get("board")
        .and_then(Value::as_object)
        .and_then(|board| board.get("id"))
        .is_some_and(Value::is_string);
    board_id
        && ["containers", "banks", "tiles"]
            .iter()
            .all(|key| object.get(*key).is_some_and(Value::is_object))
}

/// Recognise a stored or imported value; `None` if it is not a board.
pub fn detect_format(value: &Value, version: u32) -> Option<SnapshotFormat> {
    if !has_payload_shape(value) {
        return None;
    }
    let stored_version = value.get("version").and_then(Value::as_u64);
    let saved_at = value.get("savedAt").and_then(Value::as_str);
    match (stored_version, saved_at) {
        (Some(stored), Some(saved_at)) if stored == u64::from(version) => {
            Some(SnapshotFormat::Envelope {
                version,
                saved_at: saved_at.to_string(),
            })
        }
        _ => Some(SnapshotFormat::Legacy),
    }
}

/// Parse and repair an arbitrary JSON value. Used for both restore and
/// user import.
pub fn import_state(value: &Value, version: u32, layout: &LayoutConfig) -> Option<BoardState> {
    let format = detect_format(value, version)?;
    log::debug!("storage/import format={format:?}");
    let state = decode_state(value, layout)?;
    Some(normalize(state, layout))
}

/// Serialize a snapshot as a pretty-printed envelope.
pub fn export_json(state: &BoardState, version: u32) -> StorageResult<String> {
    let envelope = Envelope {
        version,
        saved_at: Utc::now(),
        state,
    };
    serde_json::to_string_pretty(&envelope).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Board and mode persistence against one backend.
pub struct BoardPersistence<S: Storage> {
    storage: Arc<S>,
    config: StorageConfig,
    layout: LayoutConfig,
}

impl<S: Storage> BoardPersistence<S> {
    pub fn new(storage: Arc<S>, config: StorageConfig, layout: LayoutConfig) -> Self {
        Self {
            storage,
            config,
            layout,
        }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Restore the stored board, repaired. `None` when nothing usable is
    /// stored.
    pub fn load(&self) -> Option<BoardState> {
        let key = self.config.board_key();
        let value = self.load_value(&key)?;
        match import_state(&value, self.config.version, &self.layout) {
            Some(state) => {
                log::info!(
                    "storage/load-success key={key} board={} tiles={}",
                    state.board.id,
                    state.tiles.len()
                );
                Some(state)
            }
            None => {
                log::warn!("storage/load-invalid-shape key={key}");
                None
            }
        }
    }

    /// Whether the stored board is exactly what saving `state` would write,
    /// ignoring `savedAt`.
    pub fn stored_matches(&self, state: &BoardState) -> bool {
        let key = self.config.board_key();
        let Some(mut stored) = self.load_value(&key) else {
            return false;
        };
        let envelope = Envelope {
            version: self.config.version,
            saved_at: Utc::now(),
            state,
        };
        let Ok(mut expected) = serde_json::to_value(&envelope) else {
            return false;
        };
        for value in [&mut stored, &mut expected] {
            if let Some(object) = value.as_object_mut() {
                object.remove("savedAt");
            }
        }
        stored == expected
    }

    fn load_value(&self, key: &str) -> Option<Value> {
        let raw = match self.storage.load(key) {
            Ok(raw) => raw,
            Err(StorageError::NotFound(_)) => {
                log::debug!("storage/load-empty key={key}");
                return None;
            }
            Err(e) => {
                log::error!("storage/load-failed key={key}: {e}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("storage/load-failed key={key}: {e}");
                None
            }
        }
    }

    /// Write the board envelope. Failures are logged and reported as
    /// `false`; they never propagate.
    pub fn save(&self, state: &BoardState) -> bool {
        let key = self.config.board_key();
        let result = export_json(state, self.config.version)
            .and_then(|json| self.storage.save(&key, &json));
        match result {
            Ok(()) => {
                log::debug!(
                    "storage/save-success key={key} board={} tiles={}",
                    state.board.id,
                    state.tiles.len()
                );
                true
            }
            Err(e) => {
                log::error!("storage/save-failed key={key}: {e}");
                false
            }
        }
    }

    /// Parse text supplied by the user.
    pub fn import_str(&self, json: &str) -> Option<BoardState> {
        match serde_json::from_str::<Value>(json) {
            Ok(value) => import_state(&value, self.config.version, &self.layout),
            Err(e) => {
                log::warn!("storage/import-parse-failed: {e}");
                None
            }
        }
    }

    pub fn export(&self, state: &BoardState) -> StorageResult<String> {
        export_json(state, self.config.version)
    }

    pub fn load_mode(&self) -> Option<BoardMode> {
        let key = self.config.mode_key();
        let raw = self.storage.load(&key).ok()?;
        match serde_json::from_str(&raw) {
            Ok(mode) => Some(mode),
            Err(e) => {
                log::warn!("storage/load-mode-invalid key={key}: {e}");
                None
            }
        }
    }

    pub fn save_mode(&self, mode: BoardMode) -> bool {
        let key = self.config.mode_key();
        let result = serde_json::to_string(&mode)
            .map_err(|e| StorageError::Serialization(e.to_string()))
            .and_then(|json| self.storage.save(&key, &json));
        if let Err(e) = result {
            log::error!("storage/save-mode-failed key={key}: {e}");
            return false;
        }
        true
    }
}
