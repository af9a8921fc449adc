//! Board, zone and tile records.

use chrono::{DateTime, Utc};
use kurbo::Rect;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Identifier of the board record.
pub type BoardId = String;
/// Identifier of a zone (bank or container).
pub type ZoneId = String;
/// Identifier of a tile.
pub type TileId = String;

/// Name of the board created on first run.
pub const DEFAULT_BOARD_NAME: &str = "Chotolate Board";

/// Generate a fresh record identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Purpose of a fixed triage bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankType {
    Staff,
    Newcomer,
    CompletedNewcomer,
}

impl BankType {
    /// Every bank type, in the order they are synthesized on repair.
    pub const ALL: [BankType; 3] = [
        BankType::Staff,
        BankType::Newcomer,
        BankType::CompletedNewcomer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BankType::Staff => "staff",
            BankType::Newcomer => "newcomer",
            BankType::CompletedNewcomer => "completed_newcomer",
        }
    }

    /// Parse a wire name; unknown names yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "staff" => Some(BankType::Staff),
            "newcomer" => Some(BankType::Newcomer),
            "completed_newcomer" => Some(BankType::CompletedNewcomer),
            _ => None,
        }
    }
}

/// Kind of person a tile represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileType {
    Staff,
    Newcomer,
}

impl TileType {
    pub fn as_str(self) -> &'static str {
        match self {
            TileType::Staff => "staff",
            TileType::Newcomer => "newcomer",
        }
    }

    /// Lenient parse used when repairing stored data: anything that is not
    /// exactly `"staff"` is treated as a newcomer.
    pub fn coerce(value: Option<&str>) -> Self {
        match value {
            Some("staff") => TileType::Staff,
            _ => TileType::Newcomer,
        }
    }

    /// Bank a tile of this type lands in on creation or fallback.
    pub fn default_bank(self) -> BankType {
        match self {
            TileType::Staff => BankType::Staff,
            TileType::Newcomer => BankType::Newcomer,
        }
    }
}

/// Three-level fatigue status, tracked for staff only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatigueState {
    #[default]
    Green,
    Yellow,
    Red,
}

impl FatigueState {
    /// Cycle GREEN -> YELLOW -> RED -> GREEN.
    pub fn next(self) -> Self {
        match self {
            FatigueState::Green => FatigueState::Yellow,
            FatigueState::Yellow => FatigueState::Red,
            FatigueState::Red => FatigueState::Green,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "green" => Some(FatigueState::Green),
            "yellow" => Some(FatigueState::Yellow),
            "red" => Some(FatigueState::Red),
            _ => None,
        }
    }
}

/// Interaction mode of the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardMode {
    #[default]
    Setup,
    Command,
}

/// The singleton root record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A fixed triage zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bank {
    pub id: ZoneId,
    pub board_id: BoardId,
    pub bank_type: BankType,
}

/// A user-created, positioned zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: ZoneId,
    pub board_id: BoardId,
    pub name: String,
    pub accepts_staff: bool,
    pub accepts_newcomers: bool,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub z_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Container {
    /// Board-space rectangle covered by this container.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Whether the section for `tile_type` is enabled.
    pub fn accepts(&self, tile_type: TileType) -> bool {
        match tile_type {
            TileType::Staff => self.accepts_staff,
            TileType::Newcomer => self.accepts_newcomers,
        }
    }
}

/// A movable person record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tile {
    pub id: TileId,
    pub board_id: BoardId,
    pub current_zone_id: ZoneId,
    pub name: String,
    pub tile_type: TileType,
    pub fatigue_state: FatigueState,
    pub notes: String,
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Borrowed view of a zone.
#[derive(Debug, Clone, Copy)]
pub enum ZoneRef<'a> {
    Bank(&'a Bank),
    Container(&'a Container),
}

impl ZoneRef<'_> {
    pub fn id(&self) -> &str {
        match self {
            ZoneRef::Bank(bank) => &bank.id,
            ZoneRef::Container(container) => &container.id,
        }
    }
}

/// Canonical board snapshot: the unit that is persisted, imported and
/// exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardState {
    pub board: Board,
    pub containers: BTreeMap<ZoneId, Container>,
    pub banks: BTreeMap<ZoneId, Bank>,
    pub tiles: BTreeMap<TileId, Tile>,
}

impl BoardState {
    /// An empty board with the three banks and no containers.
    pub fn empty(name: &str) -> Self {
        let now = Utc::now();
        let board = Board {
            id: new_id(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        let banks = BankType::ALL
            .iter()
            .map(|&bank_type| {
                let id = new_id();
                let bank = Bank {
                    id: id.clone(),
                    board_id: board.id.clone(),
                    bank_type,
                };
                (id, bank)
            })
            .collect();

        Self {
            board,
            containers: BTreeMap::new(),
            banks,
            tiles: BTreeMap::new(),
        }
    }

    /// The board created on first run: three banks plus a starter container.
    pub fn first_run() -> Self {
        let mut state = Self::empty(DEFAULT_BOARD_NAME);
        let now = state.board.created_at;
        let id = new_id();
        state.containers.insert(
            id.clone(),
            Container {
                id,
                board_id: state.board.id.clone(),
                name: "Front Gate".to_string(),
                accepts_staff: true,
                accepts_newcomers: true,
                x: 80.0,
                y: 64.0,
                width: 520.0,
                height: 260.0,
                z_index: 1,
                created_at: now,
                updated_at: now,
            },
        );
        state
    }

    /// Resolve a zone id to a bank or container.
    pub fn zone(&self, zone_id: &str) -> Option<ZoneRef<'_>> {
        if let Some(container) = self.containers.get(zone_id) {
            return Some(ZoneRef::Container(container));
        }
        self.banks.get(zone_id).map(ZoneRef::Bank)
    }

    /// Id of the (first) bank of the given type.
    pub fn bank_id(&self, bank_type: BankType) -> Option<&ZoneId> {
        self.banks
            .values()
            .find(|bank| bank.bank_type == bank_type)
            .map(|bank| &bank.id)
    }

    /// Id of the default bank for a tile type.
    pub fn default_bank_id(&self, tile_type: TileType) -> Option<&ZoneId> {
        self.bank_id(tile_type.default_bank())
    }

    /// Highest `order_index` among tiles in `zone_id`, or -1 when empty.
    pub fn max_order_in_zone(&self, zone_id: &str) -> i64 {
        self.tiles
            .values()
            .filter(|tile| tile.current_zone_id == zone_id)
            .map(|tile| tile.order_index)
            .max()
            .unwrap_or(-1)
    }

    /// Highest container z-index, or 0 when there are no containers.
    pub fn max_z_index(&self) -> i64 {
        self.containers
            .values()
            .map(|container| container.z_index)
            .max()
            .unwrap_or(0)
    }

    /// Tiles currently in `zone_id`, in display order.
    pub fn tiles_in_zone(&self, zone_id: &str) -> Vec<&Tile> {
        let mut tiles: Vec<&Tile> = self
            .tiles
            .values()
            .filter(|tile| tile.current_zone_id == zone_id)
            .collect();
        tiles.sort_by(|a, b| a.order_index.cmp(&b.order_index).then_with(|| a.id.cmp(&b.id)));
        tiles
    }
}
