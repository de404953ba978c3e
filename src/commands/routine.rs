use chrono::Utc;
use clap::{Args, Subcommand};
use std::io::{self, Write};

use super::{App, OutputFormat};
use crate::models::Exercise;
use crate::sync::ExerciseEntry;

#[derive(Args)]
pub struct RoutineCommand {
    #[command(subcommand)]
    pub command: RoutineSubcommand,
}

#[derive(Subcommand)]
pub enum RoutineSubcommand {
    /// Create a new routine
    Create {
        /// Name of the routine
        name: String,

        /// Exercise as NAME:SERIES:REPS[:MINUTES] (can be repeated)
        #[arg(long = "exercise", value_name = "EXERCISE", value_parser = parse_exercise_entry)]
        exercises: Vec<ExerciseEntry>,
    },

    /// Add an exercise to a routine
    AddExercise {
        /// Routine key
        routine: i64,

        /// Exercise name
        name: String,

        /// Number of series
        #[arg(long)]
        series: i32,

        /// Repetitions per series
        #[arg(long)]
        reps: i32,

        /// Duration in minutes
        #[arg(long)]
        duration: Option<f64>,

        /// Exercise category
        #[arg(long)]
        category: Option<String>,

        /// Exercise description
        #[arg(long)]
        description: Option<String>,

        /// Demonstration GIF URL
        #[arg(long)]
        gif_url: Option<String>,
    },

    /// List routines
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show routine details
    Show {
        /// Routine key
        routine: i64,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the workout plan for a routine
    Plan {
        /// Routine key
        routine: i64,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete a routine
    Delete {
        /// Routine key
        routine: i64,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl RoutineCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let repo = app.routines();

        match &self.command {
            RoutineSubcommand::Create { name, exercises } => {
                let remote_id = repo
                    .create_routine_with_exercises(name, Utc::now(), exercises)
                    .await?;

                println!("Created routine: {} ({})", name, remote_id);
                for entry in exercises {
                    println!("  - {} {}x{}", entry.exercise, entry.series, entry.reps);
                }
                Ok(())
            }

            RoutineSubcommand::AddExercise {
                routine,
                name,
                series,
                reps,
                duration,
                category,
                description,
                gif_url,
            } => {
                let view = repo.routine(*routine).await?;

                let mut exercise = Exercise::new(name.as_str());
                exercise.category = category.clone();
                exercise.description = description.clone();
                exercise.gif_url = gif_url.clone();

                repo.add_exercise_with_relation(
                    &view.routine.remote_id,
                    &exercise,
                    *series,
                    *reps,
                    *duration,
                )
                .await?;

                println!("Added exercise to '{}':", view.routine.name);
                println!("  {} {}x{}", exercise, series, reps);
                Ok(())
            }

            RoutineSubcommand::List { format } => {
                let routines = repo.routines().await?;

                if routines.is_empty() {
                    println!("No routines found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&routines)?);
                    }
                    OutputFormat::Text => {
                        println!("{:<6}  {:<30}  {:<10}  EXERCISES", "KEY", "NAME", "CREATED");
                        println!("{}", "-".repeat(70));
                        for view in &routines {
                            let name = truncate(&view.routine.name, 30);
                            println!(
                                "{:<6}  {:<30}  {:<10}  {}",
                                view.routine.id,
                                name,
                                view.routine.created_at.format("%Y-%m-%d"),
                                view.exercises.len()
                            );
                        }
                        println!("\nTotal: {} routine(s)", routines.len());
                    }
                }
                Ok(())
            }

            RoutineSubcommand::Show { routine, format } => {
                let view = repo.routine(*routine).await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&view)?);
                    }
                    OutputFormat::Text => print!("{}", view),
                }
                Ok(())
            }

            RoutineSubcommand::Plan { routine, format } => {
                let plan = repo.workout_plan(*routine).await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&plan)?);
                    }
                    OutputFormat::Text => print!("{}", plan),
                }
                Ok(())
            }

            RoutineSubcommand::Delete { routine, force } => {
                let view = repo.routine(*routine).await?;

                // Confirm deletion unless --force is used
                if !force {
                    print!("Delete routine '{}'? [y/N] ", view.routine.name);
                    io::stdout().flush()?;

                    let mut input = String::new();
                    io::stdin().read_line(&mut input)?;

                    if !input.trim().eq_ignore_ascii_case("y") {
                        println!("Deletion cancelled.");
                        return Ok(());
                    }
                }

                repo.delete_routine(view.routine.id).await?;
                println!("Deleted routine: {}", view.routine.name);
                Ok(())
            }
        }
    }
}

/// Parses `NAME:SERIES:REPS[:MINUTES]` into an exercise entry.
fn parse_exercise_entry(s: &str) -> Result<ExerciseEntry, String> {
    let parts: Vec<&str> = s.split(':').map(str::trim).collect();
    if !(3..=4).contains(&parts.len()) {
        return Err(format!(
            "Invalid exercise format: '{}'. Expected NAME:SERIES:REPS[:MINUTES]",
            s
        ));
    }

    let name = parts[0];
    if name.is_empty() {
        return Err("Exercise name cannot be empty".to_string());
    }
    let series: i32 = parts[1]
        .parse()
        .map_err(|_| format!("Invalid series: '{}'", parts[1]))?;
    let reps: i32 = parts[2]
        .parse()
        .map_err(|_| format!("Invalid reps: '{}'", parts[2]))?;

    let mut entry = ExerciseEntry::new(Exercise::new(name), series, reps);
    if let Some(minutes) = parts.get(3) {
        let minutes: f64 = minutes
            .parse()
            .map_err(|_| format!("Invalid duration: '{}'", minutes))?;
        entry = entry.with_duration(minutes);
    }
    Ok(entry)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exercise_entry() {
        let entry = parse_exercise_entry("Bench Press:3:10").unwrap();
        assert_eq!(entry.exercise.name, "Bench Press");
        assert_eq!(entry.series, 3);
        assert_eq!(entry.reps, 10);
        assert_eq!(entry.duration, None);
    }

    #[test]
    fn test_parse_exercise_entry_with_duration() {
        let entry = parse_exercise_entry("Plank : 1 : 1 : 1.5").unwrap();
        assert_eq!(entry.exercise.name, "Plank");
        assert_eq!(entry.duration, Some(1.5));
    }

    #[test]
    fn test_parse_exercise_entry_rejects_bad_input() {
        assert!(parse_exercise_entry("Squat").is_err());
        assert!(parse_exercise_entry(":3:10").is_err());
        assert!(parse_exercise_entry("Squat:three:10").is_err());
        assert!(parse_exercise_entry("Squat:3:10:long").is_err());
        assert!(parse_exercise_entry("Squat:3:10:1:2").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Push Day", 30), "Push Day");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
    }
}
