use std::path::Path;

use anyhow::Result;

use everki_core::RecordSchema;

use super::{load_config, open_store};

pub async fn run_add(config_path: &Path, name: &str, fields: Vec<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config).await?;

    let schema = RecordSchema::new(name, fields);
    store.register_record_type(&schema).await?;

    println!("Registered {}: {}", schema.name, schema.fields.join(", "));
    Ok(())
}

pub async fn run_list(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config).await?;

    for schema in store.list_record_types().await? {
        println!("{}: {}", schema.name, schema.fields.join(", "));
    }
    Ok(())
}
