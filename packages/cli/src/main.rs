#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the damage photo map.
//!
//! ```text
//! damage_map load
//! damage_map list [--from DATE] [--to DATE] [--submitter NAME] [--priority P]
//!                 [--search TEXT] [--bbox W,S,E,N] [--jurisdiction NAME] [--json]
//! damage_map set-priority <id> <priority>
//! damage_map clear-priority <id>
//! damage_map states
//! damage_map profile <user> <location>
//! ```
//!
//! The photo export is read from S3 by default. Set `DAMAGE_MAP_SOURCE=http`
//! to go through the document-fetch proxy instead, or pass `--file` to read
//! a local export. Priority overrides and profiles live in the `SQLite`
//! side-store at `DAMAGE_MAP_DB` (default `data/overrides.db`), scoped to
//! the user in `DAMAGE_MAP_USER_ID`.

mod args;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use damage_map_database::{
    DB_PATH_ENV, DEFAULT_DB_PATH, SqliteOverrideStore, SqliteProfileResolver, open_db,
    profiles::set_location,
};
use damage_map_geography::Jurisdiction;
use damage_map_geography_models::STATES;
use damage_map_overrides::{Reconciler, StaticIdentity};
use damage_map_photo_models::{BoundingBox, FilterUpdate, PhotoRecord, Priority};
use damage_map_source::file::FileDocumentSource;
use damage_map_source::http::HttpDocumentSource;
use damage_map_source::s3::S3DocumentSource;
use damage_map_source::{DocumentSource, Normalizer, parse_alias_toml};
use damage_map_store::{PhotoStore, StoreConfig};

/// Environment variable selecting the photo export backend.
const SOURCE_ENV: &str = "DAMAGE_MAP_SOURCE";

#[derive(Parser)]
#[command(
    name = "damage_map",
    about = "Load, filter, and triage damage-assessment photos"
)]
struct Cli {
    /// Read the photo export from a local JSON file instead of S3/HTTP
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// TOML file overriding the field alias table
    #[arg(long, global = true)]
    aliases: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the export and print summary counts
    Load,
    /// List the photos that pass the given filters
    List {
        /// Earliest capture date (inclusive)
        #[arg(long, value_parser = args::parse_from)]
        from: Option<DateTime<Utc>>,
        /// Latest capture date (inclusive; a bare date covers the whole day)
        #[arg(long, value_parser = args::parse_to)]
        to: Option<DateTime<Utc>>,
        /// Exact submitter name
        #[arg(long)]
        submitter: Option<String>,
        /// high, medium or low
        #[arg(long, value_parser = args::parse_priority)]
        priority: Option<Priority>,
        /// Case-insensitive text search
        #[arg(long)]
        search: Option<String>,
        /// Restrict to west,south,east,north
        #[arg(long, value_parser = args::parse_bbox, allow_hyphen_values = true)]
        bbox: Option<BoundingBox>,
        /// Override the profile jurisdiction (state name, abbreviation, or
        /// "United States")
        #[arg(long)]
        jurisdiction: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Set your priority for a photo
    SetPriority {
        /// Photo ID
        id: String,
        /// high, medium or low
        #[arg(value_parser = args::parse_priority)]
        priority: Priority,
    },
    /// Remove your priority override for a photo
    ClearPriority {
        /// Photo ID
        id: String,
    },
    /// List the jurisdiction table
    States,
    /// Assign a user's jurisdiction
    Profile {
        /// User ID
        user: String,
        /// State name, abbreviation, or "United States"
        location: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let command = match cli.command {
        Commands::States => {
            print_states();
            return Ok(());
        }
        Commands::Profile { user, location } => {
            let db = open_db(&db_path()).await?;
            set_location(db.as_ref(), &user, &location).await?;
            let jurisdiction = Jurisdiction::from_name(&location);
            if jurisdiction.is_fallback() {
                eprintln!(
                    "Warning: {location:?} is not a known jurisdiction; {user} will see all photos"
                );
            }
            println!("{user} -> {}", jurisdiction.name());
            return Ok(());
        }
        command => command,
    };

    let store = build_store(cli.file.as_deref(), cli.aliases.as_deref()).await?;
    let summary = store.load().await?;

    match command {
        Commands::Load => {
            println!(
                "Source records:     {}",
                summary.records + summary.duplicates_dropped
            );
            println!("Loaded:             {}", summary.records);
            println!("Duplicate ids:      {}", summary.duplicates_dropped);
            println!("Overrides applied:  {}", summary.overrides_applied);
            println!("Jurisdiction:       {}", store.jurisdiction().name());
            println!("Visible:            {}", store.visible_photos().len());
            print_priority_counts(&store.all_photos());
        }
        Commands::List {
            from,
            to,
            submitter,
            priority,
            search,
            bbox,
            jurisdiction,
            json,
        } => {
            if let Some(name) = jurisdiction {
                store.set_jurisdiction(Jurisdiction::from_name(&name));
            }
            store.set_selected_region(bbox);
            store.update_filters(FilterUpdate {
                start_date: Some(from),
                end_date: Some(to),
                submitter: Some(submitter),
                priority: Some(priority),
                search_text: Some(search),
            });

            let visible = store.visible_photos();
            if json {
                println!("{}", serde_json::to_string_pretty(&visible)?);
            } else {
                print_photos(&visible);
            }
        }
        Commands::SetPriority { id, priority } => {
            store.set_priority(&id, priority).await?;
            println!("Set priority of photo {id} to {priority}");
        }
        Commands::ClearPriority { id } => {
            store.clear_priority(&id).await?;
            println!("Cleared priority override of photo {id}");
        }
        Commands::States | Commands::Profile { .. } => {}
    }

    Ok(())
}

fn db_path() -> PathBuf {
    std::env::var(DB_PATH_ENV)
        .map_or_else(|_| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from)
}

fn document_source(
    file: Option<&Path>,
) -> Result<Arc<dyn DocumentSource>, Box<dyn std::error::Error>> {
    if let Some(path) = file {
        return Ok(Arc::new(FileDocumentSource::new(path)));
    }

    let backend = std::env::var(SOURCE_ENV).unwrap_or_else(|_| "s3".to_string());
    match backend.trim().to_lowercase().as_str() {
        "s3" => Ok(Arc::new(S3DocumentSource::from_env()?)),
        "http" => Ok(Arc::new(HttpDocumentSource::from_env()?)),
        other => Err(format!("unknown {SOURCE_ENV} {other:?} (expected s3 or http)").into()),
    }
}

async fn build_store(
    file: Option<&Path>,
    aliases: Option<&Path>,
) -> Result<PhotoStore, Box<dyn std::error::Error>> {
    let source = document_source(file)?;

    let normalizer = match aliases {
        Some(path) => {
            let toml_str = tokio::fs::read_to_string(path).await?;
            Normalizer::new(parse_alias_toml(&toml_str)?)
        }
        None => Normalizer::default(),
    };

    let db = open_db(&db_path()).await?;
    let identity = StaticIdentity::from_env();
    let user_id = identity.user_id().map(ToString::to_string);
    if user_id.is_none() {
        log::warn!("DAMAGE_MAP_USER_ID is not set; priority overrides are disabled");
    }

    let reconciler = Reconciler::new(
        Arc::new(SqliteOverrideStore::new(db.clone())),
        Arc::new(identity),
    );

    Ok(PhotoStore::builder(source, reconciler)
        .normalizer(normalizer)
        .profile_resolver(Arc::new(SqliteProfileResolver::new(db, user_id)))
        .config(StoreConfig::from_env())
        .build())
}

fn print_states() {
    println!(
        "{:<16} {:<5} {:>10} {:>9} {:>10} {:>9}",
        "STATE", "ABBR", "WEST", "SOUTH", "EAST", "NORTH"
    );
    println!("{}", "-".repeat(64));
    for state in STATES {
        let b = &state.bounds;
        println!(
            "{:<16} {:<5} {:>10.4} {:>9.4} {:>10.4} {:>9.4}",
            state.name, state.abbr, b.west, b.south, b.east, b.north
        );
    }
    println!("\n{} state(s)", STATES.len());
}

fn print_priority_counts(photos: &[PhotoRecord]) {
    for priority in Priority::all() {
        let count = photos
            .iter()
            .filter(|p| p.priority == Some(*priority))
            .count();
        println!("  {:<8} {count}", priority.as_ref());
    }
    let unset = photos.iter().filter(|p| p.priority.is_none()).count();
    println!("  {:<8} {unset}", "(none)");
}

fn print_photos(photos: &[PhotoRecord]) {
    if photos.is_empty() {
        println!("No photos match.");
        return;
    }

    println!(
        "{:<24} {:<20} {:<8} {:>9} {:>10} {:<16} DESCRIPTION",
        "ID", "TIMESTAMP", "PRIORITY", "LAT", "LNG", "SUBMITTER"
    );
    println!("{}", "-".repeat(110));

    for photo in photos {
        let priority = photo.priority.as_ref().map_or("-", AsRef::as_ref);
        let timestamp = photo.timestamp.get(..19).unwrap_or(&photo.timestamp);
        let description: String = photo.description.chars().take(40).collect();
        println!(
            "{:<24} {:<20} {:<8} {:>9.4} {:>10.4} {:<16} {}",
            photo.id,
            timestamp,
            priority,
            photo.latitude,
            photo.longitude,
            photo.submitter,
            description
        );
    }

    println!("\n{} photo(s)", photos.len());
}
