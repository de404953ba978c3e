use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fitsync::commands::{
    App, ConfigCommand, ProfileCommand, ProgressCommand, ProgressSubcommand, RoutineCommand,
    RoutineSubcommand, SyncCommand,
};
use fitsync::config::Config;
use fitsync::sync::try_auto_sync;

#[derive(Parser)]
#[command(name = "fitsync")]
#[command(version)]
#[command(about = "A workout routine tracker with remote sync", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or edit the user profile
    Profile(ProfileCommand),

    /// Manage workout routines
    Routine(RoutineCommand),

    /// Log and review completed workouts
    Progress(ProgressCommand),

    /// Sync with the remote document store
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Save config path for init command
    let cli_config_path = cli.config.clone();

    // Load configuration
    let config = Config::load(cli.config)?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.value.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let command = match cli.command {
        Some(Commands::Config(cmd)) => return cmd.run(&config, cli_config_path),
        Some(command) => command,
        None => {
            println!("Use --help to see available commands");
            return Ok(());
        }
    };

    let app = App::open(&config).await?;

    // Auto-sync BEFORE read commands
    if is_read_command(&command) {
        try_auto_sync(&config, &app.engine()).await;
    }

    match command {
        Commands::Profile(cmd) => cmd.run(&app).await,
        Commands::Routine(cmd) => cmd.run(&app).await,
        Commands::Progress(cmd) => cmd.run(&app).await,
        Commands::Sync(cmd) => cmd.run(&app, &config).await,
        Commands::Config(_) => Ok(()),
    }
}

/// Returns true if the command reads cached views that should be fresh.
fn is_read_command(cmd: &Commands) -> bool {
    matches!(
        cmd,
        Commands::Routine(r) if matches!(r.command,
            RoutineSubcommand::List { .. }
            | RoutineSubcommand::Show { .. }
            | RoutineSubcommand::Plan { .. })
    ) || matches!(
        cmd,
        Commands::Progress(p) if matches!(p.command, ProgressSubcommand::List { .. })
    )
}
