pub mod aggregate;
pub mod note;
pub mod schema;
pub mod sync;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use everki_core::{Config, DirectoryNoteSource, FlashcardStore, LinePattern, Params, SqliteStore};

#[derive(Parser)]
#[command(
    name = "everki",
    about = "Turn note lines into flashcards without duplicates",
    version
)]
pub struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(short, long, global = true, env = "EVERKI_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create flashcards from every matching note line
    Sync,
    /// Move matching lines from source notes into the staging note
    Aggregate,
    /// Manage record types
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
    /// Manage source notes
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },
}

#[derive(Subcommand)]
pub enum SchemaCommands {
    /// Register a record type and its fields
    Add {
        /// Record type name
        name: String,
        /// Field names, in order
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// List record types
    List,
}

#[derive(Subcommand)]
pub enum NoteCommands {
    /// Create a note holding the given lines
    Add {
        /// Note title
        title: String,
        /// Note lines
        lines: Vec<String>,
    },
}

pub fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit.or_else(Config::default_path) {
        Some(path) => Ok(path),
        None => bail!("no config directory on this platform; pass --config"),
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    Config::load(path).with_context(|| format!("loading {}", path.display()))
}

pub async fn open_store(config: &Config) -> Result<SqliteStore> {
    SqliteStore::open(&config.store.path)
        .await
        .with_context(|| format!("opening collection {}", config.store.path.display()))
}

pub async fn open_source(config: &Config) -> Result<DirectoryNoteSource> {
    DirectoryNoteSource::open(&config.source.notes_dir)
        .await
        .with_context(|| format!("opening notes in {}", config.source.notes_dir.display()))
}

/// Compiles the configured pattern against the configured record type.
pub async fn load_pattern(params: &Params, store: &dyn FlashcardStore) -> Result<LinePattern> {
    let Some(schema) = store.schema(&params.note_type).await? else {
        bail!(
            "unknown record type '{}'; register it with 'everki schema add'",
            params.note_type
        );
    };
    Ok(LinePattern::compile(&params.parsing_regex, &schema)?)
}
