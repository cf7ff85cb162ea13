//! Inspect and edit the persistent JSON configuration file.

use clap::{Args, Subcommand};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the current configuration as JSON
    Show,

    /// Print the path of the config file
    Path,

    /// Set the storage root directory
    SetStorageRoot {
        /// New storage root path
        path: std::path::PathBuf,
    },
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = riffwork_config::Config::load_default()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommand::Path => {
            println!("{}", riffwork_config::paths::config_file_path().display());
        }
        ConfigCommand::SetStorageRoot { path } => {
            let mut config = riffwork_config::Config::load_default()?;
            config.data.storage_root = path.clone();
            config.save_default()?;
            println!("storage root set to {}", path.display());
        }
    }

    Ok(())
}
