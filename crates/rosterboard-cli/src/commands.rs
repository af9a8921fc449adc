//! Board commands shared by one-shot invocations and the interactive shell.

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use clap::{Subcommand, ValueEnum};
use rosterboard_core::{
    BankType, BoardMode, ContainerChanges, CreateContainerInput, CreateTileInput, FatigueState,
    Storage, TileChanges, TileType, UndoOutcome, Workbench,
};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use crate::render;

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Create the first-run board, replacing any stored board when forced
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Print the board, zone by zone
    Show {
        /// Print the raw snapshot instead
        #[arg(long)]
        json: bool,
    },
    /// Rename the board
    RenameBoard { name: String },
    /// Add a tile to its default bank
    AddTile {
        name: String,
        #[arg(long, value_enum, default_value_t = KindArg::Staff)]
        kind: KindArg,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Change a tile's name or notes
    EditTile {
        tile: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Move a tile into a bank or container
    Move { tile: String, zone: String },
    /// Cycle a tile's fatigue, or set it directly
    Fatigue {
        tile: String,
        #[arg(long, value_enum)]
        set: Option<FatigueArg>,
    },
    /// Delete a tile (undoable inside the shell)
    DeleteTile { tile: String },
    /// Add a container on top of the others
    AddContainer {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        x: Option<f64>,
        #[arg(long)]
        y: Option<f64>,
        #[arg(long)]
        width: Option<f64>,
        #[arg(long)]
        height: Option<f64>,
    },
    /// Rename a container
    RenameContainer { container: String, name: String },
    /// Enable or disable one section of a container
    Accepts {
        container: String,
        #[arg(value_enum)]
        kind: KindArg,
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Reposition a container
    MoveContainer { container: String, x: f64, y: f64 },
    /// Resize a container (never below what its tiles need)
    ResizeContainer {
        container: String,
        width: f64,
        height: f64,
    },
    /// Stack a container above all others
    Front { container: String },
    /// Delete a container, sending its tiles back to their banks
    DeleteContainer { container: String },
    /// List tiles whose name contains the query
    Search { query: String },
    /// Replace the board with a JSON file
    Import { file: PathBuf },
    /// Write the board as JSON to a file, or to stdout
    Export { file: Option<PathBuf> },
    /// Re-run the load-time repairs over the stored board
    Repair,
    /// Show or set the interaction mode
    Mode {
        #[arg(value_enum)]
        mode: Option<ModeArg>,
    },
    /// Restore the most recently deleted tile (shell only)
    Undo,
    /// Drop the pending undo (shell only)
    Dismiss,
    /// Run commands interactively, one per line
    Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    Staff,
    Newcomer,
}

impl From<KindArg> for TileType {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Staff => TileType::Staff,
            KindArg::Newcomer => TileType::Newcomer,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatigueArg {
    Green,
    Yellow,
    Red,
}

impl From<FatigueArg> for FatigueState {
    fn from(fatigue: FatigueArg) -> Self {
        match fatigue {
            FatigueArg::Green => FatigueState::Green,
            FatigueArg::Yellow => FatigueState::Yellow,
            FatigueArg::Red => FatigueState::Red,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Setup,
    Command,
}

impl From<ModeArg> for BoardMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Setup => BoardMode::Setup,
            ModeArg::Command => BoardMode::Command,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

/// Find a tile by exact id, unique id prefix, or case-insensitive name.
pub fn resolve_tile<S: Storage>(bench: &Workbench<S>, reference: &str) -> Result<String> {
    require_reference(reference, "tile")?;
    let tiles = &bench.store().state().tiles;
    if tiles.contains_key(reference) {
        return Ok(reference.to_string());
    }
    let matches: Vec<&String> = tiles
        .values()
        .filter(|tile| tile.id.starts_with(reference) || tile.name.eq_ignore_ascii_case(reference))
        .map(|tile| &tile.id)
        .collect();
    unique(matches, "tile", reference)
}

/// Find a container by exact id, unique id prefix, or case-insensitive name.
pub fn resolve_container<S: Storage>(bench: &Workbench<S>, reference: &str) -> Result<String> {
    require_reference(reference, "container")?;
    let containers = &bench.store().state().containers;
    if containers.contains_key(reference) {
        return Ok(reference.to_string());
    }
    let matches: Vec<&String> = containers
        .values()
        .filter(|c| c.id.starts_with(reference) || c.name.eq_ignore_ascii_case(reference))
        .map(|c| &c.id)
        .collect();
    unique(matches, "container", reference)
}

/// A zone is a bank named by its type (`staff`, `newcomer`,
/// `completed_newcomer`) or any container reference.
pub fn resolve_zone<S: Storage>(bench: &Workbench<S>, reference: &str) -> Result<String> {
    require_reference(reference, "zone")?;
    if let Some(bank_type) = BankType::parse(&reference.to_ascii_lowercase()) {
        if let Some(bank) = bench.store().bank_by_type(bank_type) {
            return Ok(bank.id.clone());
        }
    }
    if bench.store().bank(reference).is_some() {
        return Ok(reference.to_string());
    }
    resolve_container(bench, reference)
}

/// An empty reference is a prefix of every id.
fn require_reference(reference: &str, kind: &str) -> Result<()> {
    if reference.trim().is_empty() {
        bail!("no {kind} given");
    }
    Ok(())
}

fn unique(matches: Vec<&String>, kind: &str, reference: &str) -> Result<String> {
    match matches.as_slice() {
        [id] => Ok((*id).clone()),
        [] => Err(anyhow!("no {kind} matches {reference:?}")),
        _ => Err(anyhow!("{reference:?} matches {} {kind}s", matches.len())),
    }
}

fn applied(ok: bool, what: &str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        bail!("{what} was not applied")
    }
}

/// Run one command against an open board.
pub fn execute<S: Storage>(
    command: Commands,
    bench: &mut Workbench<S>,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Commands::Init { .. } | Commands::Shell => {
            bail!("this command cannot run inside an open board")
        }
        Commands::Show { json } => {
            if json {
                writeln!(out, "{}", bench.export_json()?)?;
            } else {
                render::board(bench.store(), out)?;
            }
        }
        Commands::RenameBoard { name } => {
            bench.store_mut().rename_board(&name);
        }
        Commands::AddTile { name, kind, notes } => {
            let id = bench
                .store_mut()
                .create_tile(CreateTileInput {
                    name,
                    tile_type: kind.into(),
                    notes,
                })
                .ok_or_else(|| anyhow!("no bank for {:?} tiles", kind))?;
            writeln!(out, "{id}")?;
        }
        Commands::EditTile { tile, name, notes } => {
            let id = resolve_tile(bench, &tile)?;
            bench.store_mut().update_tile(&id, TileChanges { name, notes });
        }
        Commands::Move { tile, zone } => {
            let id = resolve_tile(bench, &tile)?;
            let zone_id = resolve_zone(bench, &zone)?;
            let tile_type = bench
                .store()
                .tile(&id)
                .map(|tile| tile.tile_type)
                .ok_or_else(|| anyhow!("tile {id} vanished"))?;
            if !bench.store().zone_accepts(&zone_id, tile_type) {
                bail!("{} tiles cannot be placed in {zone}", tile_type.as_str());
            }
            applied(bench.store_mut().move_tile(&id, &zone_id), "move")?;
        }
        Commands::Fatigue { tile, set } => {
            let id = resolve_tile(bench, &tile)?;
            let ok = match set {
                Some(fatigue) => bench.store_mut().set_fatigue(&id, fatigue.into()),
                None => bench.store_mut().cycle_fatigue(&id),
            };
            applied(ok, "fatigue change")?;
        }
        Commands::DeleteTile { tile } => {
            let id = resolve_tile(bench, &tile)?;
            bench.delete_tile_with_undo(&id, Utc::now());
            writeln!(out, "deleted {id}")?;
        }
        Commands::AddContainer {
            name,
            x,
            y,
            width,
            height,
        } => {
            let id = bench.store_mut().create_container(CreateContainerInput {
                name,
                x,
                y,
                width,
                height,
            });
            writeln!(out, "{id}")?;
        }
        Commands::RenameContainer { container, name } => {
            let id = resolve_container(bench, &container)?;
            let changes = ContainerChanges {
                name: Some(name),
                ..Default::default()
            };
            applied(bench.store_mut().update_container(&id, changes), "rename")?;
        }
        Commands::Accepts {
            container,
            kind,
            state,
        } => {
            let id = resolve_container(bench, &container)?;
            let evicted = bench
                .store_mut()
                .set_container_accepts(&id, kind.into(), state == Toggle::On)?;
            if !evicted.is_empty() {
                writeln!(out, "returned {} tile(s) to their bank", evicted.len())?;
            }
        }
        Commands::MoveContainer { container, x, y } => {
            let id = resolve_container(bench, &container)?;
            bench.store_mut().move_container(&id, x, y);
        }
        Commands::ResizeContainer {
            container,
            width,
            height,
        } => {
            let id = resolve_container(bench, &container)?;
            bench.store_mut().resize_container(&id, width, height);
            if let Some(container) = bench.store().container(&id) {
                writeln!(out, "{}x{}", container.width, container.height)?;
            }
        }
        Commands::Front { container } => {
            let id = resolve_container(bench, &container)?;
            bench.store_mut().bring_to_front(&id);
        }
        Commands::DeleteContainer { container } => {
            let id = resolve_container(bench, &container)?;
            applied(bench.store_mut().delete_container(&id), "container delete")?;
        }
        Commands::Search { query } => {
            for id in bench.store().search_matches(&query) {
                if let Some(tile) = bench.store().tile(&id) {
                    writeln!(out, "{}  {}", render::short_id(&tile.id), tile.name)?;
                }
            }
        }
        Commands::Import { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            if !bench.import_json(&json) {
                bail!("{} is not a board file", file.display());
            }
        }
        Commands::Export { file } => {
            let json = bench.export_json()?;
            match file {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => writeln!(out, "{json}")?,
            }
        }
        Commands::Repair => {
            if bench.repair(Instant::now()) {
                writeln!(out, "repaired")?;
            } else {
                writeln!(out, "nothing to repair")?;
            }
        }
        Commands::Mode { mode } => match mode {
            Some(mode) => bench.set_mode(mode.into()),
            None => writeln!(out, "{:?}", bench.session().mode)?,
        },
        Commands::Undo => match bench.undo(Utc::now()) {
            UndoOutcome::Restored { tile_id } => writeln!(out, "restored {tile_id}")?,
            UndoOutcome::Unsupported { kind } => bail!("cannot undo {kind}"),
            UndoOutcome::Nothing => writeln!(out, "nothing to undo")?,
        },
        Commands::Dismiss => {
            bench.dismiss_undo(Utc::now());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosterboard_core::{BoardConfig, MemoryStorage};
    use std::sync::Arc;

    fn bench() -> Workbench<MemoryStorage> {
        let storage = Arc::new(MemoryStorage::new());
        Workbench::open(storage, &BoardConfig::default(), Utc::now()).unwrap()
    }

    fn run(bench: &mut Workbench<MemoryStorage>, command: Commands) -> Result<String> {
        let mut out = Vec::new();
        execute(command, bench, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_add_and_move_by_name() {
        let mut bench = bench();
        run(
            &mut bench,
            Commands::AddTile {
                name: "Aki".to_string(),
                kind: KindArg::Staff,
                notes: None,
            },
        )
        .unwrap();
        run(
            &mut bench,
            Commands::Move {
                tile: "aki".to_string(),
                zone: "Front Gate".to_string(),
            },
        )
        .unwrap();

        let gate = resolve_container(&bench, "front gate").unwrap();
        let aki = resolve_tile(&bench, "Aki").unwrap();
        assert_eq!(bench.store().tile(&aki).unwrap().current_zone_id, gate);
    }

    #[test]
    fn test_rejected_move_is_an_error() {
        let mut bench = bench();
        run(
            &mut bench,
            Commands::AddTile {
                name: "Kai".to_string(),
                kind: KindArg::Newcomer,
                notes: None,
            },
        )
        .unwrap();

        let result = run(
            &mut bench,
            Commands::Move {
                tile: "Kai".to_string(),
                zone: "staff".to_string(),
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_delete_then_undo() {
        let mut bench = bench();
        run(
            &mut bench,
            Commands::AddTile {
                name: "Aki".to_string(),
                kind: KindArg::Staff,
                notes: None,
            },
        )
        .unwrap();
        run(&mut bench, Commands::DeleteTile { tile: "Aki".to_string() }).unwrap();
        assert!(resolve_tile(&bench, "Aki").is_err());

        let out = run(&mut bench, Commands::Undo).unwrap();
        assert!(out.starts_with("restored"));
        assert!(resolve_tile(&bench, "Aki").is_ok());
    }

    #[test]
    fn test_resolve_zone_by_bank_type() {
        let bench = bench();
        let staff = bench.store().bank_by_type(BankType::Staff).unwrap().id.clone();
        assert_eq!(resolve_zone(&bench, "STAFF").unwrap(), staff);
        assert!(resolve_zone(&bench, "nowhere").is_err());
    }

    #[test]
    fn test_disabling_last_section_fails() {
        let mut bench = bench();
        run(
            &mut bench,
            Commands::Accepts {
                container: "Front Gate".to_string(),
                kind: KindArg::Staff,
                state: Toggle::Off,
            },
        )
        .unwrap();
        let result = run(
            &mut bench,
            Commands::Accepts {
                container: "Front Gate".to_string(),
                kind: KindArg::Newcomer,
                state: Toggle::Off,
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_repair_writes_board_back() {
        let storage = Arc::new(MemoryStorage::new());
        let key = BoardConfig::default().storage.board_key();
        let damaged = r#"{
            "board": { "id": "b", "name": "Damaged" },
            "containers": {},
            "banks": { "bs": { "bankType": "staff" } },
            "tiles": {
                "t": { "name": "Kai", "tileType": "newcomer", "currentZoneId": "bs", "fatigueState": "red" }
            }
        }"#;
        storage.save(&key, damaged).unwrap();
        let mut bench = Workbench::open(storage.clone(), &BoardConfig::default(), Utc::now()).unwrap();

        assert_eq!(run(&mut bench, Commands::Repair).unwrap(), "repaired\n");
        let stored = storage.load(&key).unwrap();
        assert!(stored.contains("\"newcomer\""));
        assert!(stored.contains("\"completed_newcomer\""));
        assert!(!stored.contains("\"red\""));
        assert_eq!(run(&mut bench, Commands::Repair).unwrap(), "nothing to repair\n");
    }

    #[test]
    fn test_empty_reference_is_rejected() {
        let mut bench = bench();
        for name in ["Aki", "Mina"] {
            run(
                &mut bench,
                Commands::AddTile {
                    name: name.to_string(),
                    kind: KindArg::Staff,
                    notes: None,
                },
            )
            .unwrap();
        }

        let err = resolve_tile(&bench, "").unwrap_err();
        assert_eq!(err.to_string(), "no tile given");
        assert!(resolve_container(&bench, "  ").is_err());
        let err = run(
            &mut bench,
            Commands::Move {
                tile: String::new(),
                zone: "staff".to_string(),
            },
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "no tile given");
        assert!(resolve_tile(&bench, "aki").is_ok());
    }
}
