//! Sync CLI commands for reconciling the remote tree into the cache.

use clap::{Args, Subcommand};

use super::{App, OutputFormat};
use crate::config::Config;

/// Sync with the remote document store
#[derive(Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum SyncSubcommand {
    /// Show remote configuration and local cache counts
    Status,
}

impl SyncCommand {
    pub async fn run(&self, app: &App, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            None => self.sync(app).await,
            Some(SyncSubcommand::Status) => self.status(app, config).await,
        }
    }

    async fn sync(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let handle = app.engine().spawn();
        let cancel = handle.cancel_token();
        let join = handle.join();
        tokio::pin!(join);

        // Ctrl-C stops the pass at the next step boundary
        let report = tokio::select! {
            result = &mut join => result?,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                join.await?
            }
        };

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => {
                println!("Sync complete.\n");
                print!("{}", report);
            }
        }
        Ok(())
    }

    async fn status(&self, app: &App, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        match app.session.identity() {
            Some(identity) => println!("Account:   {}", identity.user_id),
            None => println!("Account:   (not signed in)"),
        }
        match &config.remote.url {
            Some(url) => println!("Remote:    {}", url),
            None => println!("Remote:    {} (local)", config.document_path().display()),
        }
        println!(
            "Auto-sync: {}",
            if config.remote.auto_sync {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!();

        let exercises = app.cache.exercises().list().await?.len();
        println!("Cached exercises: {}", exercises);
        if app.session.is_signed_in() {
            let repo = app.routines();
            println!("Cached routines:  {}", repo.routines().await?.len());
            println!("Cached workouts:  {}", repo.progress().await?.len());
        }
        Ok(())
    }
}
