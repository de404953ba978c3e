use clap::{Args, Subcommand};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::OutputFormat;
use crate::config::Config;

const DEFAULT_CONFIG: &str = r#"# fitsync configuration

# Path to the SQLite cache (default: platform data dir/fitsync/fitsync.db)
# database_path: fitsync.db

# Tracing filter, overridden by RUST_LOG
# log_filter: fitsync=info

# Signed-in account
account:
  # user_id: your-account-id
  # display_name: Your Name

# Remote document store
remote:
  # Document API base URL; without it the tree lives in a local Automerge file
  # url: https://fit.example.com/api
  # api_key: your-api-key
  # document_path: remote.automerge
  timeout_secs: 30
  auto_sync: false
"#;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        config_path: Option<PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => print_config(config),
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let path = config_path.unwrap_or_else(Config::default_config_path);
                if write_default_config(&path)? {
                    println!("Created config file: {}", path.display());
                    println!("\nEdit this file to customize your settings.");
                } else {
                    println!("Config file already exists: {}", path.display());
                    println!("Use 'fitsync config show' to view current configuration.");
                }
                Ok(())
            }
        }
    }
}

fn print_config(config: &Config) {
    println!("Configuration");
    println!("=============\n");

    if let Some(path) = &config.config_file {
        println!("Config file: {}", path.display());
    } else {
        println!(
            "Config file: {} (not found)",
            Config::default_config_path().display()
        );
    }
    println!();

    println!("database_path: {}", config.database_path.value.display());
    println!("  source: {}", config.database_path.source);
    println!();

    println!("log_filter: {}", config.log_filter.value);
    println!("  source: {}", config.log_filter.source);
    println!();

    println!(
        "account.user_id: {}",
        config.account.user_id.as_deref().unwrap_or("(not set)")
    );
    println!(
        "remote.url: {}",
        config.remote.url.as_deref().unwrap_or("(local)")
    );
    println!("remote.document_path: {}", config.document_path().display());
    println!("remote.auto_sync: {}", config.remote.auto_sync);
}

/// Writes the commented default config; returns false if the file exists.
fn write_default_config(path: &Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = fs::File::create(path)?;
    file.write_all(DEFAULT_CONFIG.as_bytes())?;
    Ok(true)
}
