use anyhow::Result;
use clap::Parser;

use nexus::cli::commands::{
    barcode::BarcodeParseCommand, config::ConfigShowCommand, serve::ServeCommand,
    show_usage, templates::TemplatesCommand,
};
use nexus::cli::{BarcodeCommands, Cli, Commands, ConfigCommands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default behavior: no subcommand - explain how to get started
        None => show_usage(),
        Some(Commands::Serve { listen }) => {
            nexus::init_config()?;
            tokio::runtime::Runtime::new()?.block_on(async {
                ServeCommand::new(listen).execute().await
            })
        }
        Some(Commands::Templates { traveler_type }) => {
            TemplatesCommand::new(traveler_type).execute()
        }
        Some(Commands::Barcode {
            command: BarcodeCommands::Parse { data },
        }) => BarcodeParseCommand::new(data).execute(),
        Some(Commands::Config {
            command: ConfigCommands::Show,
        }) => ConfigShowCommand.execute(),
    }
}
