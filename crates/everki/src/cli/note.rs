use std::path::Path;

use anyhow::Result;

use everki_core::markup::render_document;
use everki_core::NoteSource;

use super::{load_config, open_source};

pub async fn run_add(config_path: &Path, title: &str, lines: &[String]) -> Result<()> {
    let config = load_config(config_path)?;
    let source = open_source(&config).await?;

    let handle = source.create_document(title, &render_document(lines)).await?;

    println!("{}", handle.id);
    Ok(())
}
