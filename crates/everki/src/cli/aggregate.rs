use std::path::Path;

use anyhow::Result;

use everki_core::Aggregator;

use super::{load_config, load_pattern, open_source, open_store};

pub async fn run(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config).await?;
    let source = open_source(&config).await?;

    let pattern = load_pattern(&config.params, &store).await?;
    let report = Aggregator::new(&config.params, pattern).run(&source).await?;

    print!("{report}");
    Ok(())
}
