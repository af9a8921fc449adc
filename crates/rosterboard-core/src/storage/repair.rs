//! Lenient decoding and repair of stored snapshots.
//!
//! Stored and imported JSON is never trusted. [`decode_state`] reads it
//! field by field, substituting defaults for anything missing or malformed,
//! and [`normalize`] then restores the board invariants on the typed state.

use crate::config::LayoutConfig;
use crate::model::{
    Bank, BankType, Board, BoardState, Container, DEFAULT_BOARD_NAME, FatigueState, Tile,
    TileType, ZoneId, new_id,
};
use crate::rules;
use crate::store::{DEFAULT_CONTAINER_NAME, clamp_to_contents};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

type Object = Map<String, Value>;

fn text(object: &Object, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

fn flag(object: &Object, key: &str) -> Option<bool> {
    object.get(key).and_then(Value::as_bool)
}

fn number(object: &Object, key: &str) -> Option<f64> {
    object.get(key).and_then(Value::as_f64)
}

fn integer(object: &Object, key: &str) -> Option<i64> {
    let value = object.get(key)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|float| float.round() as i64))
}

fn timestamp(object: &Object, key: &str, fallback: DateTime<Utc>) -> DateTime<Utc> {
    object
        .get(key)
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
        .unwrap_or(fallback)
}

/// Entries of an id-keyed map that are objects; anything else is dropped.
fn records<'a>(
    map: &'a Object,
    kind: &'static str,
) -> impl Iterator<Item = (&'a String, &'a Object)> {
    map.iter().filter_map(move |(id, value)| match value.as_object() {
        Some(object) => Some((id, object)),
        None => {
            log::warn!("storage/repair-dropped-{kind} id={id}: not an object");
            None
        }
    })
}

/// Decode a `{board, containers, banks, tiles}` payload.
///
/// Returns `None` when the payload does not have that shape at all. Within
/// the shape every field is optional; map keys are the authoritative ids.
pub fn decode_state(payload: &Value, layout: &LayoutConfig) -> Option<BoardState> {
    let payload = payload.as_object()?;
    let board = payload.get("board")?.as_object()?;
    let board_id = board.get("id")?.as_str()?.to_string();
    let containers = payload.get("containers")?.as_object()?;
    let banks = payload.get("banks")?.as_object()?;
    let tiles = payload.get("tiles")?.as_object()?;

    let now = Utc::now();
    let created_at = timestamp(board, "createdAt", now);
    let board = Board {
        id: board_id.clone(),
        name: text(board, "name").unwrap_or_else(|| DEFAULT_BOARD_NAME.to_string()),
        created_at,
        updated_at: timestamp(board, "updatedAt", created_at),
    };

    let banks = records(banks, "bank")
        .filter_map(|(id, bank)| {
            let Some(bank_type) = text(bank, "bankType").as_deref().and_then(BankType::parse) else {
                log::warn!("storage/repair-dropped-bank id={id}: unknown bank type");
                return None;
            };
            let bank = Bank {
                id: id.clone(),
                board_id: text(bank, "boardId").unwrap_or_else(|| board_id.clone()),
                bank_type,
            };
            Some((id.clone(), bank))
        })
        .collect();

    let containers = records(containers, "container")
        .map(|(id, container)| {
            let created_at = timestamp(container, "createdAt", board.created_at);
            let container = Container {
                id: id.clone(),
                board_id: text(container, "boardId").unwrap_or_else(|| board_id.clone()),
                name: text(container, "name").unwrap_or_else(|| DEFAULT_CONTAINER_NAME.to_string()),
                accepts_staff: flag(container, "acceptsStaff").unwrap_or(true),
                accepts_newcomers: flag(container, "acceptsNewcomers").unwrap_or(true),
                x: number(container, "x").unwrap_or(0.0),
                y: number(container, "y").unwrap_or(0.0),
                width: number(container, "width").unwrap_or(layout.container_default_width),
                height: number(container, "height").unwrap_or(layout.container_default_height),
                z_index: integer(container, "zIndex").unwrap_or(1),
                created_at,
                updated_at: timestamp(container, "updatedAt", created_at),
            };
            (id.clone(), container)
        })
        .collect();

    let tiles = records(tiles, "tile")
        .map(|(id, tile)| {
            let created_at = timestamp(tile, "createdAt", board.created_at);
            let tile = Tile {
                id: id.clone(),
                board_id: text(tile, "boardId").unwrap_or_else(|| board_id.clone()),
                current_zone_id: text(tile, "currentZoneId").unwrap_or_default(),
                name: text(tile, "name").unwrap_or_default(),
                tile_type: TileType::coerce(tile.get("tileType").and_then(Value::as_str)),
                fatigue_state: text(tile, "fatigueState")
                    .as_deref()
                    .and_then(FatigueState::parse)
                    .unwrap_or_default(),
                notes: text(tile, "notes").unwrap_or_default(),
                order_index: integer(tile, "orderIndex").unwrap_or(0),
                created_at,
                updated_at: timestamp(tile, "updatedAt", created_at),
            };
            (id.clone(), tile)
        })
        .collect();

    Some(BoardState {
        board,
        containers,
        banks,
        tiles,
    })
}

/// Restore the board invariants. Idempotent.
///
/// - exactly one bank per type (duplicates fold onto the smallest id,
///   missing banks are synthesized)
/// - every container accepts at least one tile type
/// - every tile sits in a zone that accepts its type, else its default bank
/// - newcomer tiles are always green
/// - containers are at least as large as their contents require
pub fn normalize(mut state: BoardState, layout: &LayoutConfig) -> BoardState {
    collapse_duplicate_banks(&mut state);
    for bank_type in BankType::ALL {
        if state.bank_id(bank_type).is_none() {
            let id = new_id();
            log::info!("storage/repair-added-bank type={} id={id}", bank_type.as_str());
            state.banks.insert(
                id.clone(),
                Bank {
                    id,
                    board_id: state.board.id.clone(),
                    bank_type,
                },
            );
        }
    }

    for container in state.containers.values_mut() {
        if !container.accepts_staff && !container.accepts_newcomers {
            log::info!("storage/repair-container-accepts id={}", container.id);
            container.accepts_staff = true;
            container.accepts_newcomers = true;
        }
    }

    let misplaced: Vec<(String, ZoneId)> = state
        .tiles
        .values()
        .filter(|tile| !rules::is_valid_zone(tile.tile_type, &tile.current_zone_id, &state))
        .filter_map(|tile| {
            let bank = state.default_bank_id(tile.tile_type)?;
            Some((tile.id.clone(), bank.clone()))
        })
        .collect();
    for (tile_id, bank_id) in misplaced {
        if let Some(tile) = state.tiles.get_mut(&tile_id) {
            log::info!(
                "storage/repair-reassigned-tile id={tile_id} from={:?} to={bank_id}",
                tile.current_zone_id
            );
            tile.current_zone_id = bank_id;
        }
    }

    for tile in state.tiles.values_mut() {
        if tile.tile_type == TileType::Newcomer && tile.fatigue_state != FatigueState::Green {
            tile.fatigue_state = FatigueState::Green;
        }
    }

    let container_ids: Vec<ZoneId> = state.containers.keys().cloned().collect();
    for id in container_ids {
        let Some(current) = state.containers.get(&id) else {
            continue;
        };
        let mut clamped = current.clone();
        clamp_to_contents(&state, &mut clamped, layout);
        if clamped != *current {
            log::info!(
                "storage/repair-grew-container id={id} to {}x{}",
                clamped.width,
                clamped.height
            );
            state.containers.insert(id, clamped);
        }
    }

    state
}

/// Keep the first bank of each type and move tiles off the others.
fn collapse_duplicate_banks(state: &mut BoardState) {
    let mut kept: BTreeMap<BankType, ZoneId> = BTreeMap::new();
    let mut redirects: BTreeMap<ZoneId, ZoneId> = BTreeMap::new();
    for bank in state.banks.values() {
        match kept.get(&bank.bank_type) {
            Some(first) => {
                redirects.insert(bank.id.clone(), first.clone());
            }
            None => {
                kept.insert(bank.bank_type, bank.id.clone());
            }
        }
    }
    if redirects.is_empty() {
        return;
    }

    for (duplicate, first) in &redirects {
        log::warn!("storage/repair-merged-bank id={duplicate} into={first}");
        state.banks.remove(duplicate);
    }
    for tile in state.tiles.values_mut() {
        if let Some(first) = redirects.get(&tile.current_zone_id) {
            tile.current_zone_id = first.clone();
        }
    }
}
