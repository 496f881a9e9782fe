mod cli;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands, NoteCommands, SchemaCommands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli::config_path(cli.config)?;

    match cli.command {
        Commands::Sync => cli::sync::run(&config_path).await,
        Commands::Aggregate => cli::aggregate::run(&config_path).await,
        Commands::Schema { command } => match command {
            SchemaCommands::Add { name, fields } => {
                cli::schema::run_add(&config_path, &name, fields).await
            }
            SchemaCommands::List => cli::schema::run_list(&config_path).await,
        },
        Commands::Note { command } => match command {
            NoteCommands::Add { title, lines } => {
                cli::note::run_add(&config_path, &title, &lines).await
            }
        },
    }
}
