//! Rosterboard core: a zone-based placement engine.
//!
//! Tiles (staff and newcomers) live in zones: three fixed triage banks and
//! any number of user-positioned containers. This crate owns the board
//! records, the rules for which tile may enter which zone, container
//! sizing, drag and gesture handling, time-limited undo, and the
//! load/repair/save pipeline. It has no timers or threads; the embedding
//! front end drives [`Workbench::tick`].

pub mod config;
pub mod drag;
pub mod error;
pub mod gesture;
pub mod model;
pub mod rules;
pub mod session;
pub mod sizing;
pub mod storage;
pub mod store;
pub mod undo;
pub mod workbench;

pub use config::{BoardConfig, ConfigError, LayoutConfig, StorageConfig, UndoConfig};
pub use drag::{
    DragController, DragEvent, DropAnimation, DropOutcome, DropTarget, resolve_drop_target,
};
pub use error::{BoardError, BoardResult};
pub use gesture::{ContainerGesture, GestureKind, GestureTracker, PointerId, ResizeDirection};
pub use model::{
    Bank, BankType, Board, BoardMode, BoardState, Container, FatigueState, Tile, TileType, ZoneRef,
};
pub use session::{DragSession, ModalState, UiSession};
pub use sizing::{ContainerMinSize, SectionVisibility, TileGrid};
pub use storage::{
    AutoSaver, BoardPersistence, FileStorage, MemoryStorage, Storage, StorageError, StorageResult,
};
pub use store::{
    BoardEvent, BoardStore, ContainerChanges, CreateContainerInput, CreateTileInput, TileChanges,
};
pub use undo::{UndoEntry, UndoStack};
pub use workbench::{UndoOutcome, Workbench};
