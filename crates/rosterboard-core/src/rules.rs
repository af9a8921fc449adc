//! Placement rules: which tile types may occupy which zones.

use crate::model::{BankType, BoardState, Container, TileType, ZoneRef};

/// Staff only enter the staff bank; newcomers enter either newcomer bank.
pub fn can_enter_bank(tile_type: TileType, bank_type: BankType) -> bool {
    match tile_type {
        TileType::Staff => bank_type == BankType::Staff,
        TileType::Newcomer => {
            matches!(bank_type, BankType::Newcomer | BankType::CompletedNewcomer)
        }
    }
}

pub fn can_enter_container(tile_type: TileType, container: &Container) -> bool {
    container.accepts(tile_type)
}

pub fn can_enter_zone(tile_type: TileType, zone: ZoneRef<'_>) -> bool {
    match zone {
        ZoneRef::Bank(bank) => can_enter_bank(tile_type, bank.bank_type),
        ZoneRef::Container(container) => can_enter_container(tile_type, container),
    }
}

/// Whether `zone_id` names an existing zone that accepts `tile_type`.
/// Unknown ids are never valid.
pub fn is_valid_zone(tile_type: TileType, zone_id: &str, state: &BoardState) -> bool {
    state
        .zone(zone_id)
        .is_some_and(|zone| can_enter_zone(tile_type, zone))
}
