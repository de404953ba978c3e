use clap::{Args, Subcommand};

use super::{App, OutputFormat};
use crate::models::User;

#[derive(Args)]
pub struct ProfileCommand {
    #[command(subcommand)]
    pub command: ProfileSubcommand,
}

#[derive(Subcommand)]
pub enum ProfileSubcommand {
    /// Show the signed-in user's profile
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Submit the profile form
    Save {
        /// Display name (defaults to the current one)
        #[arg(long)]
        name: Option<String>,

        /// Age in years
        #[arg(long)]
        age: i32,

        /// Weight in kg
        #[arg(long)]
        weight: f64,

        /// Height in cm
        #[arg(long)]
        height: f64,

        /// Experience level (e.g., beginner, intermediate, advanced)
        #[arg(long)]
        experience: String,

        /// Training goal
        #[arg(long)]
        goal: String,

        /// Profile photo URI
        #[arg(long)]
        photo_url: Option<String>,
    },
}

impl ProfileCommand {
    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        let repo = app.profiles();

        match &self.command {
            ProfileSubcommand::Show { format } => {
                repo.ensure_user_local().await?;
                match repo.get_profile().await? {
                    Some(user) => match format {
                        OutputFormat::Json => {
                            println!("{}", serde_json::to_string_pretty(&user)?);
                        }
                        OutputFormat::Text => print!("{}", user),
                    },
                    None => println!("No profile found"),
                }
                Ok(())
            }

            ProfileSubcommand::Save {
                name,
                age,
                weight,
                height,
                experience,
                goal,
                photo_url,
            } => {
                repo.ensure_user_local().await?;
                let current = repo.get_profile().await?;
                let identity = app.session.require()?;

                let name = name
                    .clone()
                    .or_else(|| current.map(|u| u.name))
                    .or_else(|| identity.display_name.clone())
                    .unwrap_or_default();

                let mut profile = User::new(&identity.user_id, name)
                    .with_age(*age)
                    .with_weight(*weight)
                    .with_height(*height)
                    .with_experience_level(experience.as_str())
                    .with_goal(goal.as_str());
                if let Some(url) = photo_url {
                    profile = profile.with_photo_url(url.as_str());
                }

                let saved = repo.save_profile(&profile).await?;
                println!("Saved profile:");
                print!("{}", saved);
                Ok(())
            }
        }
    }
}
