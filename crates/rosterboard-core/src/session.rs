//! Ephemeral interaction state: mode, search, selection, modal, drag, undo.
//!
//! Nothing here is part of the persisted board except the mode, which is
//! stored under its own key.

use crate::config::UndoConfig;
use crate::model::{BoardMode, TileId, TileType, ZoneId};
use crate::undo::UndoStack;
use kurbo::Vec2;

/// The dialog currently open, if any.
#[derive(Debug, Clone, PartialEq)]
pub enum ModalState {
    TileInfo { entity_id: TileId },
    TileCreate { tile_type: TileType },
    ContainerEdit { entity_id: ZoneId },
    DeleteConfirm { entity_id: TileId },
}

/// A tile being dragged.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub tile_id: TileId,
    pub origin_zone_id: ZoneId,
    /// Pointer offset from the drag origin.
    pub current_position: Vec2,
    pub active_drop_target_id: Option<ZoneId>,
}

/// Interaction state for one running board.
#[derive(Debug, Clone, Default)]
pub struct UiSession {
    pub mode: BoardMode,
    pub search_query: String,
    pub selected_tile_id: Option<TileId>,
    pub modal: Option<ModalState>,
    pub drag: Option<DragSession>,
    pub undo: UndoStack,
}

impl UiSession {
    pub fn new(undo: &UndoConfig) -> Self {
        Self {
            undo: UndoStack::new(undo),
            ..Default::default()
        }
    }

    pub fn set_mode(&mut self, mode: BoardMode) {
        log::debug!("ui/setMode {mode:?}");
        self.mode = mode;
    }

    pub fn set_search_query(&mut self, query: &str) {
        self.search_query = query.to_string();
    }

    /// Whether the trimmed query is non-empty.
    pub fn is_search_active(&self) -> bool {
        !self.search_query.trim().is_empty()
    }

    pub fn select_tile(&mut self, tile_id: Option<TileId>) {
        self.selected_tile_id = tile_id;
    }

    pub fn open_modal(&mut self, modal: ModalState) {
        log::debug!("ui/openModal {modal:?}");
        self.modal = Some(modal);
    }

    pub fn close_modal(&mut self) {
        self.modal = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let session = UiSession::new(&UndoConfig::default());
        assert_eq!(session.mode, BoardMode::Setup);
        assert!(!session.is_dragging());
        assert!(session.undo.is_empty());
    }

    #[test]
    fn test_search_active_ignores_whitespace() {
        let mut session = UiSession::default();
        session.set_search_query("   ");
        assert!(!session.is_search_active());
        session.set_search_query(" ki ");
        assert!(session.is_search_active());
    }

    #[test]
    fn test_modal_lifecycle() {
        let mut session = UiSession::default();
        session.open_modal(ModalState::TileCreate {
            tile_type: TileType::Newcomer,
        });
        assert!(session.modal.is_some());
        session.close_modal();
        assert!(session.modal.is_none());
    }
}
