//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `bubble_core` linkage.
//! - Exercise config loading, logging setup and database bootstrap once.
//!
//! Usage: `bubble_cli [config.toml]`

use bubble_core::{init_logging_from_config, open_db_with, CoreConfig};
use log::info;
use rusqlite::Connection;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run(std::env::args_os().nth(1).map(PathBuf::from)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("bubble_cli: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: Option<PathBuf>) -> Result<(), String> {
    let config = match config_path {
        Some(path) => CoreConfig::load_from(&path).map_err(|err| err.to_string())?,
        None => CoreConfig::default(),
    };

    let logging_active = init_logging_from_config(&config.logging)?;
    let conn = open_db_with(&config.database).map_err(|err| err.to_string())?;
    let schema_version = schema_version(&conn).map_err(|err| err.to_string())?;

    info!("event=cli_probe module=cli status=ok schema_version={schema_version}");
    println!("bubble_core ping={}", bubble_core::ping());
    println!("bubble_core version={}", bubble_core::core_version());
    println!("bubble_core schema_version={schema_version}");
    println!("bubble_core logging={}", if logging_active { "file" } else { "off" });
    Ok(())
}

fn schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
}
