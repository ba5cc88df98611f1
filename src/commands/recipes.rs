use clap::Args;

use super::{connect, OutputFormat};
use crate::config::Config;

#[derive(Args)]
pub struct RecipesCommand {
    /// Show a single recipe by exact name
    pub name: Option<String>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl RecipesCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let client = connect(config).await?;
        let snapshot = client.registry().snapshot();

        if let Some(name) = &self.name {
            let recipe = snapshot
                .recipe_by_name(name)
                .ok_or_else(|| format!("Recipe not found: {}", name))?;
            match self.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(recipe)?),
                OutputFormat::Text => print!("{}", recipe),
            }
            return Ok(());
        }

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(snapshot.recipes())?);
            }
            OutputFormat::Text => {
                if snapshot.recipes().is_empty() {
                    println!("No recipes.");
                    return Ok(());
                }
                for recipe in snapshot.recipes() {
                    match recipe.total_time() {
                        Some(total) => println!("{:<40} {} min", recipe.name, total),
                        None => println!("{}", recipe.name),
                    }
                }
            }
        }

        Ok(())
    }
}
