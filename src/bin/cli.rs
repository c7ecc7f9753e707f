#![cfg(not(tarpaulin_include))]

use aspenlog::config::Config;
use aspenlog::credentials::open_store;
use aspenlog::downloader::{ExportTable, to_csv, write_export};
use aspenlog::floors::{FloorElevationInput, validate_floor_elevations};
use aspenlog::height_zone::{compute_height_zones, validate_zone_assignments};
use aspenlog::loader::{self, FloorRow};
use aspenlog::saving::load_snapshot;
use clap::{Parser, Subcommand, ValueHint};

use std::path::{Path, PathBuf};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(author, version, about = "Floor tables, height zones and stored credentials for aspenlog")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that floor elevations never decrease, and optionally clear sea level
    Validate {
        #[arg(value_hint = ValueHint::FilePath)]
        floors: PathBuf,
        #[arg(allow_negative_numbers = true)]
        sea_level: Option<f64>,
    },

    /// Print the consolidated height zones as CSV
    Zones {
        #[arg(value_hint = ValueHint::FilePath)]
        floors: PathBuf,
    },

    /// Write the consolidated height zones to a CSV file
    Export {
        #[arg(value_hint = ValueHint::FilePath)]
        floors: PathBuf,
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,
        #[arg(default_value = "zones.csv")]
        name: String,
    },

    /// Read or store the bearer token
    Token {
        #[command(subcommand)]
        action: Stored,
    },

    /// Read or store the backend connection address
    Address {
        #[command(subcommand)]
        action: Stored,
    },

    /// Print a saved project snapshot
    Snapshot {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum Stored {
    Get,
    Set { value: String },
}

fn main() -> Result<()> {
    let config = Config::from_env();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match Cli::parse().command {
        Command::Validate { floors, sea_level } => validate(&floors, sea_level),
        Command::Zones { floors } => {
            let table = zone_table(&floors)?;
            println!("{}", to_csv(&table));
            Ok(())
        }
        Command::Export { floors, dir, name } => export(&floors, &dir, &name),
        Command::Token { action } => {
            let store = open_store(&config)?;
            match action {
                Stored::Get => println!("{}", store.get_token()?),
                Stored::Set { value } => {
                    store.set_token(&value)?;
                    println!("Token stored");
                }
            }
            Ok(())
        }
        Command::Address { action } => {
            let store = open_store(&config)?;
            match action {
                Stored::Get => println!("{}", store.get_connection_address()?),
                Stored::Set { value } => {
                    store.set_connection_address(&value)?;
                    println!("Connection address set to {}", value);
                }
            }
            Ok(())
        }
        Command::Snapshot { file } => {
            let snapshot = load_snapshot(&file)?;
            println!("Saved at {}", snapshot.saved_at.to_rfc3339());
            if let Some(id) = snapshot.save_file_id {
                println!("Save file {}", id);
            }
            println!("{}", serde_json::to_string_pretty(&snapshot.project)?);
            Ok(())
        }
    }
}

fn validate(path: &Path, sea_level: Option<f64>) -> Result<()> {
    let rows: Vec<FloorRow> = loader::from_csv(path)?;
    let elevations: Vec<Option<f64>> = rows.iter().map(|row| row.elevation).collect();

    match sea_level {
        Some(sea_level) => {
            let input = FloorElevationInput::from_elevations(sea_level, &elevations)?;
            match input.validate() {
                Ok(()) => println!("ok: {} floors", rows.len()),
                Err(e) => println!("invalid: {}", e),
            }
        }
        None => {
            if validate_floor_elevations(&elevations) {
                println!("ok: {} floors", rows.len());
            } else {
                println!("invalid: Floor elevations are invalid. They must increase progressively.");
            }
        }
    }

    Ok(())
}

fn zone_table(path: &Path) -> Result<ExportTable> {
    let rows = loader::from_csv(path)?;
    let assignments = loader::zone_assignments(&rows)?;
    validate_zone_assignments(&assignments)?;

    let zones = compute_height_zones(&assignments)
        .into_iter()
        .map(|zone| vec![zone.zone_index as f64, zone.top_elevation])
        .collect();

    Ok(ExportTable::new(&["Height Zone", "Elevation"], zones))
}

fn export(path: &Path, dir: &Path, name: &str) -> Result<()> {
    let table = zone_table(path)?;
    let written = write_export(dir, name, to_csv(&table).as_bytes())?;
    println!("Wrote {}", written.display());
    Ok(())
}
