use chrono::{Datelike, Utc};
use clap::{Args, Subcommand};

use super::{App, OutputFormat};

#[derive(Args)]
pub struct ProgressCommand {
    #[command(subcommand)]
    pub command: ProgressSubcommand,
}

#[derive(Subcommand)]
pub enum ProgressSubcommand {
    /// Run a routine's workout plan and log it as completed
    Log {
        /// Routine key
        routine: i64,
    },

    /// List completed workouts
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ProgressCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let repo = app.routines();

        match &self.command {
            ProgressSubcommand::Log { routine } => {
                let plan = repo.workout_plan(*routine).await?;
                print!("{}", plan);

                let progress = repo.complete_workout(plan.routine.id).await?;
                println!(
                    "\nLogged workout: {} ({:.1} min, {} exercise(s))",
                    plan.routine.name,
                    progress.total_duration,
                    progress.completed_exercises.len()
                );
                Ok(())
            }

            ProgressSubcommand::List { format } => {
                let entries = repo.progress().await?;

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&entries)?);
                    }
                    OutputFormat::Text => {
                        if entries.is_empty() {
                            println!("No workouts logged");
                        } else {
                            for entry in &entries {
                                println!("{}", entry);
                            }
                        }

                        let today = Utc::now().date_naive();
                        let this_month = repo
                            .completed_in_month(today.year(), today.month())
                            .await?;
                        println!("\nThis month: {} workout(s)", this_month);
                    }
                }
                Ok(())
            }
        }
    }
}
