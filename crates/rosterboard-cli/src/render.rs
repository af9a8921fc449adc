//! Plain-text board listing.

use rosterboard_core::{BankType, BoardStore, FatigueState, Tile, TileType};
use std::io::{self, Write};

/// First eight characters of an id; enough to reference it on the command line.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn tile_line(tile: &Tile) -> String {
    let marker = match (tile.tile_type, tile.fatigue_state) {
        (TileType::Newcomer, _) => "new",
        (TileType::Staff, FatigueState::Green) => "ok ",
        (TileType::Staff, FatigueState::Yellow) => "tir",
        (TileType::Staff, FatigueState::Red) => "OUT",
    };
    let mut line = format!("    [{marker}] {}  {}", short_id(&tile.id), tile.name);
    if !tile.notes.is_empty() {
        line.push_str(&format!("  ({})", tile.notes));
    }
    line
}

pub fn board(store: &BoardStore, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{}", store.board().name)?;

    for bank_type in BankType::ALL {
        let Some(bank) = store.bank_by_type(bank_type) else {
            writeln!(out, "  bank {} (missing)", bank_type.as_str())?;
            continue;
        };
        let tiles = store.tiles_in_zone(&bank.id);
        writeln!(out, "  bank {} [{}]", bank_type.as_str(), tiles.len())?;
        for tile in tiles {
            writeln!(out, "{}", tile_line(tile))?;
        }
    }

    let min_sizes = store.container_min_sizes();
    for container in store.containers_by_z().into_iter().rev() {
        let tiles = store.tiles_in_zone(&container.id);
        let accepts = match (container.accepts_staff, container.accepts_newcomers) {
            (true, true) => "staff+newcomer",
            (true, false) => "staff",
            (false, true) => "newcomer",
            (false, false) => "nothing",
        };
        writeln!(
            out,
            "  {} {:?} [{}] z{} at ({}, {}) {}x{} accepts {}",
            short_id(&container.id),
            container.name,
            tiles.len(),
            container.z_index,
            container.x,
            container.y,
            container.width,
            container.height,
            accepts,
        )?;
        if let Some(min) = min_sizes.get(&container.id) {
            writeln!(
                out,
                "    min {}x{}, {} column(s)",
                min.min_width, min.min_height, min.columns
            )?;
        }
        for tile in tiles {
            writeln!(out, "{}", tile_line(tile))?;
        }
    }
    Ok(())
}
