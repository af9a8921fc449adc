//! Cross-module behaviour of the placement engine.

use chrono::{TimeDelta, Utc};
use kurbo::{Point, Rect};
use rosterboard_core::storage::{export_json, import_state, normalize};
use rosterboard_core::{
    BankType, BoardConfig, BoardState, BoardStore, ContainerChanges, CreateContainerInput,
    CreateTileInput, DropTarget, FatigueState, LayoutConfig, MemoryStorage, TileType, UndoOutcome,
    Workbench, resolve_drop_target, rules,
};
use serde_json::json;
use std::sync::Arc;

fn store() -> BoardStore {
    BoardStore::new(BoardState::first_run(), LayoutConfig::default())
}

fn tile(store: &mut BoardStore, name: &str, tile_type: TileType) -> String {
    store
        .create_tile(CreateTileInput {
            name: name.to_string(),
            tile_type,
            notes: None,
        })
        .unwrap()
}

/// A board with one container per accepted-type combination.
fn store_with_variants() -> (BoardStore, Vec<String>) {
    let mut store = store();
    let both = store.containers_by_z()[0].id.clone();
    let staff_only = store.create_container(CreateContainerInput::default());
    store.update_container(
        &staff_only,
        ContainerChanges {
            accepts_newcomers: Some(false),
            ..Default::default()
        },
    );
    let newcomers_only = store.create_container(CreateContainerInput::default());
    store.update_container(
        &newcomers_only,
        ContainerChanges {
            accepts_staff: Some(false),
            ..Default::default()
        },
    );

    let mut zones: Vec<String> = store.state().banks.keys().cloned().collect();
    zones.extend([both, staff_only, newcomers_only, "missing".to_string()]);
    (store, zones)
}

#[test]
fn move_succeeds_exactly_when_zone_is_valid() {
    for tile_type in [TileType::Staff, TileType::Newcomer] {
        let (mut store, zones) = store_with_variants();
        for zone in &zones {
            let id = tile(&mut store, "T", tile_type);
            let others_max = store
                .tiles_in_zone(zone)
                .iter()
                .map(|t| t.order_index)
                .max();
            let valid = rules::is_valid_zone(tile_type, zone, store.state());

            let moved = store.move_tile(&id, zone);
            assert_eq!(moved, valid, "{tile_type:?} -> {zone}");
            if moved {
                let placed = store.tile(&id).unwrap();
                assert_eq!(&placed.current_zone_id, zone);
                if let Some(max) = others_max {
                    assert!(placed.order_index > max);
                }
            }
        }
    }
}

#[test]
fn containers_never_drop_below_minimum() {
    let mut store = store();
    let gate = store.containers_by_z()[0].id.clone();
    store.resize_container(&gate, 0.0, 0.0);

    for i in 0..11 {
        let tile_type = if i % 3 == 0 { TileType::Newcomer } else { TileType::Staff };
        let id = tile(&mut store, &format!("T{i}"), tile_type);
        store.move_tile(&id, &gate);

        let container = store.container(&gate).unwrap();
        let min = store.container_min_size(&gate).unwrap();
        assert!(container.width >= min.min_width);
        assert!(container.height >= min.min_height);
    }

    for (width, height) in [(0.0, 0.0), (900.0, 10.0), (230.0, 2000.0), (-5.0, -5.0)] {
        store.resize_container(&gate, width, height);
        let container = store.container(&gate).unwrap();
        let min = store.container_min_size(&gate).unwrap();
        assert!(container.width >= min.min_width);
        assert!(container.height >= min.min_height);
    }
}

#[test]
fn deleting_container_sends_tiles_to_their_banks() {
    let mut store = store();
    let gate = store.containers_by_z()[0].id.clone();
    let banks = store.required_banks().unwrap();
    tile(&mut store, "Already staff", TileType::Staff);
    tile(&mut store, "Already newcomer", TileType::Newcomer);

    let (staff_n, newcomer_m) = (3, 2);
    for i in 0..staff_n {
        let id = tile(&mut store, &format!("S{i}"), TileType::Staff);
        store.move_tile(&id, &gate);
    }
    for i in 0..newcomer_m {
        let id = tile(&mut store, &format!("N{i}"), TileType::Newcomer);
        store.move_tile(&id, &gate);
    }
    let staff_before = store.tiles_in_zone(&banks.staff).len();
    let newcomer_before = store.tiles_in_zone(&banks.newcomer).len();

    assert!(store.delete_container(&gate));

    let staff = store.tiles_in_zone(&banks.staff);
    let newcomers = store.tiles_in_zone(&banks.newcomer);
    assert_eq!(staff.len(), staff_before + staff_n);
    assert_eq!(newcomers.len(), newcomer_before + newcomer_m);
    for zone in [staff, newcomers] {
        let orders: Vec<i64> = zone.iter().map(|t| t.order_index).collect();
        assert!(orders.windows(2).all(|pair| pair[0] < pair[1]), "{orders:?}");
    }
}

#[test]
fn undo_restores_deleted_tile() {
    let storage = Arc::new(MemoryStorage::new());
    let mut bench = Workbench::open(storage, &BoardConfig::default(), Utc::now()).unwrap();
    let gate = bench.store().containers_by_z()[0].id.clone();
    let kai = tile(bench.store_mut(), "Kai", TileType::Newcomer);
    bench.store_mut().move_tile(&kai, &gate);
    let original = bench.store().tile(&kai).unwrap().clone();

    let t0 = Utc::now();
    bench.delete_tile_with_undo(&kai, t0);
    assert_eq!(
        bench.undo(t0 + TimeDelta::milliseconds(9_999)),
        UndoOutcome::Restored { tile_id: kai.clone() }
    );
    let restored = bench.store().tile(&kai).unwrap();
    assert_eq!(restored.name, original.name);
    assert_eq!(restored.notes, original.notes);
    assert_eq!(restored.fatigue_state, original.fatigue_state);
    assert_eq!(restored.tile_type, original.tile_type);
    assert_eq!(restored.current_zone_id, gate);
}

#[test]
fn undo_falls_back_when_zone_no_longer_accepts() {
    let storage = Arc::new(MemoryStorage::new());
    let mut bench = Workbench::open(storage, &BoardConfig::default(), Utc::now()).unwrap();
    let gate = bench.store().containers_by_z()[0].id.clone();
    let kai = tile(bench.store_mut(), "Kai", TileType::Newcomer);
    bench.store_mut().move_tile(&kai, &gate);

    let t0 = Utc::now();
    bench.delete_tile_with_undo(&kai, t0);
    bench
        .store_mut()
        .set_container_accepts(&gate, TileType::Newcomer, false)
        .unwrap();
    bench.undo(t0);

    let newcomer_bank = bench.store().required_banks().unwrap().newcomer;
    assert_eq!(bench.store().tile(&kai).unwrap().current_zone_id, newcomer_bank);
}

#[test]
fn undo_entry_expires_at_ttl() {
    let storage = Arc::new(MemoryStorage::new());
    let mut bench = Workbench::open(storage, &BoardConfig::default(), Utc::now()).unwrap();
    let aki = tile(bench.store_mut(), "Aki", TileType::Staff);

    let t0 = Utc::now();
    bench.delete_tile_with_undo(&aki, t0);
    let deadline = t0 + TimeDelta::milliseconds(10_000);
    assert!(bench.active_undo(deadline).is_none());
    assert_eq!(bench.undo(deadline), UndoOutcome::Nothing);
    assert!(bench.store().tile(&aki).is_none());
}

#[test]
fn export_import_is_lossless_after_normalize() {
    let layout = LayoutConfig::default();
    let mut store = store();
    let gate = store.containers_by_z()[0].id.clone();
    let aki = tile(&mut store, "Aki", TileType::Staff);
    store.move_tile(&aki, &gate);
    store.set_fatigue(&aki, FatigueState::Red);
    tile(&mut store, "Kai", TileType::Newcomer);
    store.create_container(CreateContainerInput {
        name: Some("Back Door".to_string()),
        x: Some(700.5),
        ..Default::default()
    });
    let snapshot = store.snapshot();

    let json = export_json(&snapshot, 1).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let imported = import_state(&value, 1, &layout).unwrap();
    assert_eq!(imported, normalize(snapshot, &layout));
}

#[test]
fn export_import_keeps_fractional_coordinates() {
    let layout = LayoutConfig::default();
    let mut store = store();
    let gate = store.containers_by_z()[0].id.clone();

    for i in 1..500 {
        let x = 37.0 * i as f64 / 3.7;
        let y = 0.47022908180196965 * i as f64 / 1.25;
        store.move_container(&gate, x, y);
        let snapshot = store.snapshot();

        let json = export_json(&snapshot, 1).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let imported = import_state(&value, 1, &layout).unwrap();
        let container = &imported.containers[&gate];
        assert_eq!((container.x, container.y), (x, y), "step {i}");
        assert_eq!(imported, normalize(snapshot, &layout));
    }
}

#[test]
fn normalize_is_idempotent_on_damaged_input() {
    let layout = LayoutConfig::default();
    let value = json!({
        "board": { "id": "b" },
        "containers": {
            "c1": { "acceptsStaff": false, "acceptsNewcomers": false, "width": 1, "height": 1 }
        },
        "banks": {
            "s1": { "bankType": "staff" },
            "s2": { "bankType": "staff" }
        },
        "tiles": {
            "t1": { "tileType": "staff", "currentZoneId": "s2", "fatigueState": "red" },
            "t2": { "tileType": "newcomer", "currentZoneId": "nowhere", "fatigueState": "yellow" },
            "t3": { "tileType": "ghost", "currentZoneId": "c1" }
        }
    });

    let once = import_state(&value, 1, &layout).unwrap();
    let twice = normalize(once.clone(), &layout);
    assert_eq!(once, twice);
    assert_eq!(once.banks.len(), 3);
}

#[test]
fn container_outranks_bank_under_pointer() {
    let targets = [
        DropTarget {
            zone_id: "staff-bank".to_string(),
            rect: Rect::new(0.0, 0.0, 800.0, 600.0),
            priority: 1,
        },
        DropTarget {
            zone_id: "container-a".to_string(),
            rect: Rect::new(100.0, 100.0, 400.0, 400.0),
            priority: 101,
        },
    ];
    let hit = resolve_drop_target(Point::new(200.0, 200.0), &targets).unwrap();
    assert_eq!(hit.zone_id, "container-a");
}

#[test]
fn staff_tile_rejected_by_staff_closed_container() {
    let mut store = store();
    let aki = tile(&mut store, "Aki", TileType::Staff);
    let banks = store.required_banks().unwrap();

    let created = store.tile(&aki).unwrap();
    assert_eq!(created.current_zone_id, banks.staff);
    assert_eq!(created.order_index, 0);
    assert_eq!(created.fatigue_state, FatigueState::Green);

    let closed = store.create_container(CreateContainerInput::default());
    store.update_container(
        &closed,
        ContainerChanges {
            accepts_staff: Some(false),
            ..Default::default()
        },
    );
    assert!(!store.move_tile(&aki, &closed));
    assert_eq!(store.tile(&aki).unwrap().current_zone_id, banks.staff);
}

#[test]
fn import_moves_red_newcomer_out_of_staff_only_container() {
    let value = json!({
        "version": 1,
        "savedAt": "2024-05-01T08:00:00.000Z",
        "board": { "id": "b", "name": "Imported", "createdAt": "2024-05-01T08:00:00.000Z", "updatedAt": "2024-05-01T08:00:00.000Z" },
        "containers": {
            "gate": {
                "id": "gate", "boardId": "b", "name": "Gate",
                "acceptsStaff": true, "acceptsNewcomers": false,
                "x": 0, "y": 0, "width": 400, "height": 300, "zIndex": 1,
                "createdAt": "2024-05-01T08:00:00.000Z", "updatedAt": "2024-05-01T08:00:00.000Z"
            }
        },
        "banks": {
            "bs": { "id": "bs", "boardId": "b", "bankType": "staff" },
            "bn": { "id": "bn", "boardId": "b", "bankType": "newcomer" },
            "bc": { "id": "bc", "boardId": "b", "bankType": "completed_newcomer" }
        },
        "tiles": {
            "t": {
                "id": "t", "boardId": "b", "currentZoneId": "gate", "name": "Kai",
                "tileType": "newcomer", "fatigueState": "red", "notes": "",
                "orderIndex": 0,
                "createdAt": "2024-05-01T08:00:00.000Z", "updatedAt": "2024-05-01T08:00:00.000Z"
            }
        }
    });

    let state = import_state(&value, 1, &LayoutConfig::default()).unwrap();
    let kai = &state.tiles["t"];
    assert_eq!(kai.current_zone_id, "bn");
    assert_eq!(kai.fatigue_state, FatigueState::Green);
    assert_eq!(state.bank_id(BankType::Newcomer).map(String::as_str), Some("bn"));
}
