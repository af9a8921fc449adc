//! `rosterboard`: headless front end for a Rosterboard board.
//!
//! # Usage
//!
//! ```bash
//! rosterboard init
//! rosterboard add-tile "Aki" --kind staff
//! rosterboard move aki "Front Gate"
//! rosterboard show
//! rosterboard shell            # interactive, with undo
//! ```
//!
//! `RUST_LOG=debug` prints every board action.

// CLI tools are expected to print to stdout/stderr
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod commands;
mod render;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rosterboard_core::{BoardConfig, BoardError, FileStorage, Storage, Workbench};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::commands::{Commands, execute};

#[derive(Parser, Debug)]
#[command(name = "rosterboard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the board files (default: platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// JSON configuration file overriding layout, undo and storage settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// One line typed into the shell.
#[derive(Parser, Debug)]
#[command(name = "rosterboard", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => BoardConfig::from_file(path)?,
        None => BoardConfig::default(),
    };
    let storage = Arc::new(match cli.data_dir {
        Some(dir) => FileStorage::new(dir)?,
        None => FileStorage::default_location()?,
    });
    log::info!("Using board data in {}", storage.base_path().display());

    match cli.command {
        Commands::Init { force } => init(storage, &config, force),
        Commands::Shell => {
            let mut bench = open(storage, &config)?;
            shell(&mut bench, io::stdin().lock(), &mut io::stdout())
        }
        Commands::Undo | Commands::Dismiss => {
            anyhow::bail!("undo only exists within a session; use `rosterboard shell`")
        }
        command => {
            let mut bench = open(storage, &config)?;
            execute(command, &mut bench, &mut io::stdout())?;
            bench.flush(Instant::now());
            Ok(())
        }
    }
}

fn open<S: Storage>(storage: Arc<S>, config: &BoardConfig) -> Result<Workbench<S>> {
    match Workbench::open(storage, config, Utc::now()) {
        Ok(bench) => Ok(bench),
        Err(e @ BoardError::NeedsRecovery { .. }) => {
            Err(e).context("Board data needs recovery; run `rosterboard init --force` to reset")
        }
        Err(e) => Err(e.into()),
    }
}

fn init<S: Storage>(storage: Arc<S>, config: &BoardConfig, force: bool) -> Result<()> {
    let key = config.storage.board_key();
    if storage.exists(&key)? && !force {
        anyhow::bail!("a board already exists; pass --force to replace it");
    }
    let bench = Workbench::reset(storage, config, Utc::now())?;
    println!("created {:?} ({})", bench.store().board().name, bench.store().board().id);
    Ok(())
}

/// Split a line into words; double quotes group words containing spaces.
fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;
    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    words.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        words.push(current);
    }
    words
}

/// Read commands until end of input or `quit`. Undo stays available for its
/// window; the board is autosaved between commands and flushed on exit.
fn shell<S: Storage>(
    bench: &mut Workbench<S>,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        let words = split_words(&line);
        match words.first().map(String::as_str) {
            None => {}
            Some("quit" | "exit") => break,
            Some(_) => match ShellLine::try_parse_from(&words) {
                Ok(parsed) => {
                    if let Err(e) = execute(parsed.command, bench, out) {
                        writeln!(out, "error: {e:#}")?;
                    }
                }
                Err(e) => writeln!(out, "{e}")?,
            },
        }

        let now = Utc::now();
        bench.tick(now, Instant::now());
        if let Some(entry) = bench.active_undo(now) {
            let seconds = bench.undo_remaining(now).num_milliseconds() as f64 / 1000.0;
            writeln!(out, "({} undoable for {seconds:.1}s)", entry.kind())?;
        }
    }
    bench.flush(Instant::now());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosterboard_core::MemoryStorage;
    use tempfile::tempdir;

    #[test]
    fn test_split_words() {
        assert_eq!(
            split_words(r#"move "Front Gate" aki"#),
            vec!["move", "Front Gate", "aki"]
        );
        assert_eq!(split_words("  show   "), vec!["show"]);
        assert_eq!(split_words(r#"add-tile """#), vec!["add-tile", ""]);
    }

    #[test]
    fn test_shell_session() {
        let storage = Arc::new(MemoryStorage::new());
        let config = BoardConfig::default();
        let mut bench = Workbench::open(storage.clone(), &config, Utc::now()).unwrap();
        let script = "add-tile Aki\n\
                      move Aki \"Front Gate\"\n\
                      delete-tile Aki\n\
                      undo\n\
                      bogus\n\
                      quit\n\
                      add-tile Never\n";
        let mut out = Vec::new();
        shell(&mut bench, script.as_bytes(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("restored"));
        assert!(text.contains("tile_delete undoable"));
        let reopened = Workbench::open(storage, &BoardConfig::default(), Utc::now()).unwrap();
        let names: Vec<&str> = reopened
            .store()
            .state()
            .tiles
            .values()
            .map(|tile| tile.name.as_str())
            .collect();
        assert_eq!(names, vec!["Aki"]);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path().to_path_buf()).unwrap());
        let config = BoardConfig::default();

        init(storage.clone(), &config, false).unwrap();
        assert!(init(storage.clone(), &config, false).is_err());
        init(storage, &config, true).unwrap();
    }
}
