use std::path::Path;

use anyhow::Result;

use everki_core::Synchronizer;

use super::{load_config, open_source, open_store};

pub async fn run(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config).await?;
    let source = open_source(&config).await?;

    let synchronizer = Synchronizer::prepare(&config.params, &store).await?;
    let report = synchronizer.run(&source).await?;

    print!("{report}");
    Ok(())
}
