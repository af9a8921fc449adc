//! Board store: the single owner of board, zone and tile records.
//!
//! Every mutator runs to completion against the current [`BoardState`] and
//! then notifies subscribers. Mutators that receive an unknown id leave the
//! state untouched and return `false` (or `None`).

use crate::config::LayoutConfig;
use crate::error::{BoardError, BoardResult};
use crate::model::{
    Bank, BankType, Board, BoardState, Container, FatigueState, Tile, TileId, TileType, ZoneId,
    new_id,
};
use crate::rules;
use crate::sizing::{self, ContainerMinSize, SectionVisibility};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc::{Receiver, Sender, channel};

/// Name given to containers created without one.
pub const DEFAULT_CONTAINER_NAME: &str = "New Position";

/// Change notifications emitted after each applied mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    /// The whole state was replaced (restore or import).
    Loaded,
    BoardRenamed,
    ContainerCreated { id: ZoneId },
    ContainerUpdated { id: ZoneId },
    ContainerDeleted { id: ZoneId, reassigned: Vec<TileId> },
    TileCreated { id: TileId },
    TileUpdated { id: TileId },
    TileMoved { id: TileId, from: ZoneId, to: ZoneId },
    TileDeleted { id: TileId },
    TileRestored { id: TileId },
}

/// Optional overrides for a new container.
#[derive(Debug, Clone, Default)]
pub struct CreateContainerInput {
    pub name: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// Partial container update; `None` fields are left as they are.
#[derive(Debug, Clone, Default)]
pub struct ContainerChanges {
    pub name: Option<String>,
    pub accepts_staff: Option<bool>,
    pub accepts_newcomers: Option<bool>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub z_index: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CreateTileInput {
    pub name: String,
    pub tile_type: TileType,
    pub notes: Option<String>,
}

/// Partial tile update.
#[derive(Debug, Clone, Default)]
pub struct TileChanges {
    pub name: Option<String>,
    pub notes: Option<String>,
}

/// The three bank ids a working board needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredBanks {
    pub staff: ZoneId,
    pub newcomer: ZoneId,
    pub completed: ZoneId,
}

/// Owner of the canonical board records.
pub struct BoardStore {
    state: BoardState,
    layout: LayoutConfig,
    subscribers: Vec<Sender<BoardEvent>>,
}

impl BoardStore {
    /// Create a store around an existing state.
    pub fn new(state: BoardState, layout: LayoutConfig) -> Self {
        Self {
            state,
            layout,
            subscribers: Vec::new(),
        }
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&mut self) -> Receiver<BoardEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: BoardEvent) {
        // Dropped receivers are pruned on the next send.
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Copy of the canonical snapshot, suitable for persistence.
    pub fn snapshot(&self) -> BoardState {
        self.state.clone()
    }

    /// Replace the whole state.
    pub fn load(&mut self, state: BoardState) {
        log::debug!(
            "board/loadBoard id={} containers={} banks={} tiles={}",
            state.board.id,
            state.containers.len(),
            state.banks.len(),
            state.tiles.len()
        );
        self.state = state;
        self.emit(BoardEvent::Loaded);
    }

    // ------------------------------------------------------------------
    // Board

    pub fn board(&self) -> &Board {
        &self.state.board
    }

    pub fn rename_board(&mut self, name: &str) {
        log::debug!("board/updateBoardName {name:?}");
        self.state.board.name = name.to_string();
        self.state.board.updated_at = Utc::now();
        self.emit(BoardEvent::BoardRenamed);
    }

    // ------------------------------------------------------------------
    // Containers

    pub fn container(&self, id: &str) -> Option<&Container> {
        self.state.containers.get(id)
    }

    /// Containers from back to front.
    pub fn containers_by_z(&self) -> Vec<&Container> {
        let mut containers: Vec<&Container> = self.state.containers.values().collect();
        containers.sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.id.cmp(&b.id)));
        containers
    }

    /// Create a container on top of all others and return its id.
    pub fn create_container(&mut self, input: CreateContainerInput) -> ZoneId {
        let id = new_id();
        let now = Utc::now();
        let name = input
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONTAINER_NAME.to_string());
        let width = input.width.unwrap_or(self.layout.container_default_width);
        let height = input.height.unwrap_or(self.layout.container_default_height);

        let mut container = Container {
            id: id.clone(),
            board_id: self.state.board.id.clone(),
            name,
            accepts_staff: true,
            accepts_newcomers: true,
            x: input.x.unwrap_or(120.0),
            y: input.y.unwrap_or(120.0),
            width,
            height,
            z_index: self.state.max_z_index() + 1,
            created_at: now,
            updated_at: now,
        };
        let min = sizing::minimum_size(
            container.width,
            std::iter::empty(),
            visibility_of(&container),
            &self.layout,
        );
        container.width = container.width.max(min.min_width);
        container.height = container.height.max(min.min_height);

        log::debug!(
            "board/createContainer id={} name={:?} rect={:?}",
            id,
            container.name,
            container.rect()
        );
        self.state.containers.insert(id.clone(), container);
        self.emit(BoardEvent::ContainerCreated { id: id.clone() });
        id
    }

    /// Merge `changes` into a container. Rejected when the container is
    /// unknown or would accept no tile type. Tiles of a type the container
    /// stops accepting go back to their default bank; sizes never drop
    /// below the content minimum.
    pub fn update_container(&mut self, id: &str, changes: ContainerChanges) -> bool {
        let Some(current) = self.state.containers.get(id) else {
            log::debug!("board/updateContainer unknown id={id}");
            return false;
        };

        let mut next = current.clone();
        if let Some(name) = changes.name {
            next.name = name;
        }
        if let Some(accepts) = changes.accepts_staff {
            next.accepts_staff = accepts;
        }
        if let Some(accepts) = changes.accepts_newcomers {
            next.accepts_newcomers = accepts;
        }
        if !next.accepts_staff && !next.accepts_newcomers {
            log::debug!("board/updateContainer rejected id={id}: no accepted type left");
            return false;
        }
        if let Some(x) = changes.x {
            next.x = x;
        }
        if let Some(y) = changes.y {
            next.y = y;
        }
        if let Some(width) = changes.width {
            next.width = width;
        }
        if let Some(height) = changes.height {
            next.height = height;
        }
        if let Some(z_index) = changes.z_index {
            next.z_index = z_index;
        }
        let rejected: Vec<(TileId, TileType)> = self
            .state
            .tiles_in_zone(id)
            .into_iter()
            .filter(|tile| !rules::can_enter_container(tile.tile_type, &next))
            .map(|tile| (tile.id.clone(), tile.tile_type))
            .collect();
        next.updated_at = Utc::now();
        self.state.containers.insert(id.to_string(), next);

        for (tile_id, tile_type) in rejected {
            if let Some(bank_id) = self.state.default_bank_id(tile_type).cloned() {
                self.move_tile(&tile_id, &bank_id);
            }
        }
        if let Some(container) = self.state.containers.get(id) {
            let mut clamped = container.clone();
            clamp_to_contents(&self.state, &mut clamped, &self.layout);
            self.state.containers.insert(id.to_string(), clamped);
        }

        log::debug!("board/updateContainer id={id}");
        self.emit(BoardEvent::ContainerUpdated { id: id.to_string() });
        true
    }

    /// Reposition a container; coordinates are clamped to the board origin.
    pub fn move_container(&mut self, id: &str, x: f64, y: f64) -> bool {
        let Some(container) = self.state.containers.get_mut(id) else {
            return false;
        };
        container.x = x.max(0.0);
        container.y = y.max(0.0);
        container.updated_at = Utc::now();
        log::trace!("board/moveContainer id={id} x={x} y={y}");
        self.emit(BoardEvent::ContainerUpdated { id: id.to_string() });
        true
    }

    /// Resize a container, flooring both dimensions at the minimum required
    /// by its current tiles.
    pub fn resize_container(&mut self, id: &str, width: f64, height: f64) -> bool {
        let Some(current) = self.state.containers.get(id) else {
            return false;
        };
        let mut next = current.clone();
        next.width = width;
        next.height = height;
        clamp_to_contents(&self.state, &mut next, &self.layout);
        next.updated_at = Utc::now();
        log::trace!(
            "board/resizeContainer id={id} requested={width}x{height} applied={}x{}",
            next.width,
            next.height
        );
        self.state.containers.insert(id.to_string(), next);
        self.emit(BoardEvent::ContainerUpdated { id: id.to_string() });
        true
    }

    /// Enable or disable one section of a container. Disabling the last
    /// enabled section is refused; disabling a section sends its tiles back
    /// to their default bank. Returns the ids of the evicted tiles.
    pub fn set_container_accepts(
        &mut self,
        id: &str,
        tile_type: TileType,
        enabled: bool,
    ) -> BoardResult<Vec<TileId>> {
        let container = self
            .state
            .containers
            .get(id)
            .ok_or_else(|| BoardError::UnknownContainer(id.to_string()))?;
        let other_enabled = match tile_type {
            TileType::Staff => container.accepts_newcomers,
            TileType::Newcomer => container.accepts_staff,
        };
        if !enabled && !other_enabled {
            return Err(BoardError::NoAcceptedType(id.to_string()));
        }

        let changes = match tile_type {
            TileType::Staff => ContainerChanges {
                accepts_staff: Some(enabled),
                ..Default::default()
            },
            TileType::Newcomer => ContainerChanges {
                accepts_newcomers: Some(enabled),
                ..Default::default()
            },
        };
        let before: Vec<TileId> = self
            .state
            .tiles_in_zone(id)
            .into_iter()
            .filter(|tile| tile.tile_type == tile_type)
            .map(|tile| tile.id.clone())
            .collect();
        self.update_container(id, changes);

        Ok(before
            .into_iter()
            .filter(|tile_id| {
                self.state
                    .tiles
                    .get(tile_id)
                    .is_some_and(|tile| tile.current_zone_id != id)
            })
            .collect())
    }

    /// Remove a container and send its tiles to their default banks, each
    /// appended after the bank's current last tile.
    pub fn delete_container(&mut self, id: &str) -> bool {
        if !self.state.containers.contains_key(id) {
            log::debug!("board/deleteContainer unknown id={id}");
            return false;
        }

        let staff_bank = self.state.bank_id(BankType::Staff).cloned();
        let newcomer_bank = self.state.bank_id(BankType::Newcomer).cloned();
        let moving: Vec<(TileId, TileType)> = self
            .state
            .tiles_in_zone(id)
            .into_iter()
            .map(|tile| (tile.id.clone(), tile.tile_type))
            .collect();

        let needs_staff = moving.iter().any(|(_, t)| *t == TileType::Staff);
        let needs_newcomer = moving.iter().any(|(_, t)| *t == TileType::Newcomer);
        if (needs_staff && staff_bank.is_none()) || (needs_newcomer && newcomer_bank.is_none()) {
            log::warn!("board/deleteContainer id={id} refused: default bank missing");
            return false;
        }

        let now = Utc::now();
        let mut staff_order = staff_bank
            .as_deref()
            .map_or(-1, |bank| self.state.max_order_in_zone(bank));
        let mut newcomer_order = newcomer_bank
            .as_deref()
            .map_or(-1, |bank| self.state.max_order_in_zone(bank));

        for (tile_id, tile_type) in &moving {
            let (bank, order) = match tile_type {
                TileType::Staff => (&staff_bank, &mut staff_order),
                TileType::Newcomer => (&newcomer_bank, &mut newcomer_order),
            };
            let (Some(bank), Some(tile)) = (bank, self.state.tiles.get_mut(tile_id)) else {
                continue;
            };
            *order += 1;
            tile.current_zone_id = bank.clone();
            tile.order_index = *order;
            tile.updated_at = now;
        }
        self.state.containers.remove(id);

        let reassigned: Vec<TileId> = moving.into_iter().map(|(tile_id, _)| tile_id).collect();
        log::debug!("board/deleteContainer id={id} reassigned={}", reassigned.len());
        self.emit(BoardEvent::ContainerDeleted {
            id: id.to_string(),
            reassigned,
        });
        true
    }

    /// Stack a container above every other container.
    pub fn bring_to_front(&mut self, id: &str) -> bool {
        let top = self.state.max_z_index();
        let Some(container) = self.state.containers.get_mut(id) else {
            return false;
        };
        container.z_index = top + 1;
        container.updated_at = Utc::now();
        log::trace!("board/bringToFront id={id} z={}", top + 1);
        self.emit(BoardEvent::ContainerUpdated { id: id.to_string() });
        true
    }

    pub fn container_min_size(&self, id: &str) -> Option<ContainerMinSize> {
        let container = self.state.containers.get(id)?;
        Some(min_size_for(&self.state, container, container.width, &self.layout))
    }

    /// Minimum size of every container, keyed by id.
    pub fn container_min_sizes(&self) -> BTreeMap<ZoneId, ContainerMinSize> {
        self.state
            .containers
            .values()
            .map(|container| {
                let size = min_size_for(&self.state, container, container.width, &self.layout);
                (container.id.clone(), size)
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Banks and zones

    pub fn bank(&self, id: &str) -> Option<&Bank> {
        self.state.banks.get(id)
    }

    pub fn bank_by_type(&self, bank_type: BankType) -> Option<&Bank> {
        self.state
            .banks
            .values()
            .find(|bank| bank.bank_type == bank_type)
    }

    /// The three banks, or [`BoardError::NeedsRecovery`] naming those missing.
    pub fn required_banks(&self) -> BoardResult<RequiredBanks> {
        let missing: Vec<BankType> = BankType::ALL
            .into_iter()
            .filter(|&bank_type| self.state.bank_id(bank_type).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(BoardError::NeedsRecovery { missing });
        }
        let id_of = |bank_type| self.state.bank_id(bank_type).cloned().unwrap_or_default();
        Ok(RequiredBanks {
            staff: id_of(BankType::Staff),
            newcomer: id_of(BankType::Newcomer),
            completed: id_of(BankType::CompletedNewcomer),
        })
    }

    /// Whether `zone_id` currently accepts tiles of `tile_type`.
    pub fn zone_accepts(&self, zone_id: &str, tile_type: TileType) -> bool {
        rules::is_valid_zone(tile_type, zone_id, &self.state)
    }

    // ------------------------------------------------------------------
    // Tiles

    pub fn tile(&self, id: &str) -> Option<&Tile> {
        self.state.tiles.get(id)
    }

    pub fn tiles_in_zone(&self, zone_id: &str) -> Vec<&Tile> {
        self.state.tiles_in_zone(zone_id)
    }

    /// Number of tiles per occupied zone.
    pub fn tile_counts(&self) -> BTreeMap<ZoneId, usize> {
        let mut counts = BTreeMap::new();
        for tile in self.state.tiles.values() {
            *counts.entry(tile.current_zone_id.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Ids of tiles whose name contains `query`, ignoring case. A blank
    /// query matches nothing.
    pub fn search_matches(&self, query: &str) -> BTreeSet<TileId> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return BTreeSet::new();
        }
        self.state
            .tiles
            .values()
            .filter(|tile| tile.name.to_lowercase().contains(&query))
            .map(|tile| tile.id.clone())
            .collect()
    }

    /// Create a tile at the tail of its type's default bank.
    pub fn create_tile(&mut self, input: CreateTileInput) -> Option<TileId> {
        let Some(zone_id) = self.state.default_bank_id(input.tile_type).cloned() else {
            log::warn!(
                "board/createTile failed: no {} bank",
                input.tile_type.default_bank().as_str()
            );
            return None;
        };

        let id = new_id();
        let now = Utc::now();
        let tile = Tile {
            id: id.clone(),
            board_id: self.state.board.id.clone(),
            order_index: self.state.max_order_in_zone(&zone_id) + 1,
            current_zone_id: zone_id,
            name: input.name,
            tile_type: input.tile_type,
            fatigue_state: FatigueState::Green,
            notes: input.notes.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        log::debug!(
            "board/createTile id={} type={} zone={}",
            id,
            tile.tile_type.as_str(),
            tile.current_zone_id
        );
        self.state.tiles.insert(id.clone(), tile);
        self.emit(BoardEvent::TileCreated { id: id.clone() });
        Some(id)
    }

    pub fn update_tile(&mut self, id: &str, changes: TileChanges) -> bool {
        let Some(tile) = self.state.tiles.get_mut(id) else {
            return false;
        };
        if let Some(name) = changes.name {
            tile.name = name;
        }
        if let Some(notes) = changes.notes {
            tile.notes = notes;
        }
        tile.updated_at = Utc::now();
        log::debug!("board/updateTile id={id}");
        self.emit(BoardEvent::TileUpdated { id: id.to_string() });
        true
    }

    /// Move a tile to the tail of `target_zone_id`. Refused when the zone
    /// is unknown or rejects the tile type. A container that receives a
    /// tile grows to fit its new contents; it never shrinks here.
    pub fn move_tile(&mut self, id: &str, target_zone_id: &str) -> bool {
        let Some(tile) = self.state.tiles.get(id) else {
            log::debug!("board/moveTile unknown tile={id}");
            return false;
        };
        if self.state.zone(target_zone_id).is_none() {
            log::debug!("board/moveTile invalid-target-zone tile={id} zone={target_zone_id}");
            return false;
        }
        if !rules::is_valid_zone(tile.tile_type, target_zone_id, &self.state) {
            log::debug!(
                "board/moveTile rejected tile={id} type={} zone={target_zone_id}",
                tile.tile_type.as_str()
            );
            return false;
        }

        let from = tile.current_zone_id.clone();
        let order_index = self.state.max_order_in_zone(target_zone_id) + 1;
        let now = Utc::now();
        if let Some(tile) = self.state.tiles.get_mut(id) {
            tile.current_zone_id = target_zone_id.to_string();
            tile.order_index = order_index;
            tile.updated_at = now;
        }

        if let Some(container) = self.state.containers.get(target_zone_id) {
            let min = min_size_for(&self.state, container, container.width, &self.layout);
            if min.min_width > container.width || min.min_height > container.height {
                let mut grown = container.clone();
                grown.width = container.width.max(min.min_width);
                grown.height = container.height.max(min.min_height);
                grown.updated_at = now;
                log::debug!(
                    "board/moveTile grew container={} to {}x{}",
                    grown.id,
                    grown.width,
                    grown.height
                );
                self.state.containers.insert(grown.id.clone(), grown);
            }
        }

        log::debug!("board/moveTile tile={id} from={from} to={target_zone_id}");
        self.emit(BoardEvent::TileMoved {
            id: id.to_string(),
            from,
            to: target_zone_id.to_string(),
        });
        true
    }

    /// Reinsert a previously deleted tile. The original zone is reused when
    /// it still accepts the tile, otherwise the type's default bank.
    pub fn restore_tile(&mut self, snapshot: Tile) -> bool {
        let still_valid =
            rules::is_valid_zone(snapshot.tile_type, &snapshot.current_zone_id, &self.state);
        let zone_id = if still_valid {
            snapshot.current_zone_id.clone()
        } else {
            match self.state.default_bank_id(snapshot.tile_type) {
                Some(bank) => bank.clone(),
                None => {
                    log::warn!("board/restoreTile failed: no target zone for tile={}", snapshot.id);
                    return false;
                }
            }
        };

        let id = snapshot.id.clone();
        let tile = Tile {
            order_index: self.state.max_order_in_zone(&zone_id) + 1,
            current_zone_id: zone_id,
            updated_at: Utc::now(),
            ..snapshot
        };
        log::debug!("board/restoreTile id={} zone={}", id, tile.current_zone_id);
        self.state.tiles.insert(id.clone(), tile);
        if let Some(container) = self.state.containers.get(&self.state.tiles[&id].current_zone_id) {
            let mut grown = container.clone();
            clamp_to_contents(&self.state, &mut grown, &self.layout);
            if grown != *container {
                self.state.containers.insert(grown.id.clone(), grown);
            }
        }
        self.emit(BoardEvent::TileRestored { id });
        true
    }

    /// Advance a tile's fatigue GREEN -> YELLOW -> RED -> GREEN.
    pub fn cycle_fatigue(&mut self, id: &str) -> bool {
        let Some(tile) = self.state.tiles.get_mut(id) else {
            return false;
        };
        tile.fatigue_state = tile.fatigue_state.next();
        tile.updated_at = Utc::now();
        log::debug!("board/cycleFatigue id={id} -> {:?}", tile.fatigue_state);
        self.emit(BoardEvent::TileUpdated { id: id.to_string() });
        true
    }

    pub fn set_fatigue(&mut self, id: &str, fatigue_state: FatigueState) -> bool {
        let Some(tile) = self.state.tiles.get_mut(id) else {
            return false;
        };
        tile.fatigue_state = fatigue_state;
        tile.updated_at = Utc::now();
        log::debug!("board/setFatigue id={id} -> {fatigue_state:?}");
        self.emit(BoardEvent::TileUpdated { id: id.to_string() });
        true
    }

    /// Remove a tile and return it. Callers wanting undo capture the
    /// returned record.
    pub fn delete_tile(&mut self, id: &str) -> Option<Tile> {
        let removed = self.state.tiles.remove(id)?;
        log::debug!("board/deleteTile id={id}");
        self.emit(BoardEvent::TileDeleted { id: id.to_string() });
        Some(removed)
    }
}

fn visibility_of(container: &Container) -> SectionVisibility {
    SectionVisibility {
        show_staff_section: container.accepts_staff,
        show_newcomer_section: container.accepts_newcomers,
    }
}

fn min_size_for(
    state: &BoardState,
    container: &Container,
    width: f64,
    layout: &LayoutConfig,
) -> ContainerMinSize {
    let tiles = state
        .tiles
        .values()
        .filter(|tile| tile.current_zone_id == container.id);
    sizing::minimum_size(width, tiles, visibility_of(container), layout)
}

/// Floor a container's size at its content minimum: width first, then
/// height measured against the clamped width.
pub(crate) fn clamp_to_contents(
    state: &BoardState,
    container: &mut Container,
    layout: &LayoutConfig,
) {
    let horizontal = min_size_for(state, container, container.width, layout);
    container.width = container.width.max(horizontal.min_width);
    let vertical = min_size_for(state, container, container.width, layout);
    container.height = container.height.max(vertical.min_height);
}
