use clap::Args;

use super::{connect, OutputFormat};
use crate::config::Config;

#[derive(Args)]
pub struct MealsCommand {
    /// Day to show: YYYY-MM-DD, RFC 3339, or epoch milliseconds (default: today)
    #[arg(long, short)]
    pub date: Option<String>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl MealsCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let client = connect(config).await?;

        let meals = match self.date.as_deref() {
            Some(date) => match date.parse::<i64>() {
                Ok(millis) => client.meals_for_date(millis)?,
                Err(_) => client.meals_for_date(date)?,
            },
            None => client.meals_for_today(),
        };

        let registry = client.registry();

        match self.format {
            OutputFormat::Json => {
                let output: Vec<_> = meals
                    .iter()
                    .map(|meal| {
                        serde_json::json!({
                            "meal": meal,
                            "recipe": registry.recipe_for(meal).map(|r| r.name),
                            "label": registry.label_for(meal).map(|l| l.name),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Text => {
                if meals.is_empty() {
                    println!("No meals planned.");
                    return Ok(());
                }
                for meal in &meals {
                    let label = registry
                        .label_for(meal)
                        .map(|l| format!("[{}] ", l.name))
                        .unwrap_or_default();
                    println!("{}{}", label, meal);
                    if let Some(recipe) = registry.recipe_for(meal) {
                        println!("    recipe: {}", recipe.name);
                    }
                }
            }
        }

        Ok(())
    }
}
