use clap::Args;

use grocer_core::ShoppingList;

use super::{connect, OutputFormat};
use crate::config::Config;

#[derive(Args)]
pub struct ListsCommand {
    /// Only show this list (name or id)
    pub list: Option<String>,

    /// Hide checked items
    #[arg(long)]
    pub unchecked: bool,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

impl ListsCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let client = connect(config).await?;

        let lists: Vec<ShoppingList> = match &self.list {
            Some(key) => vec![super::find_list(&client, key)?],
            None => client.lists(),
        };

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&lists)?);
            }
            OutputFormat::Text => {
                if lists.is_empty() {
                    println!("No shopping lists.");
                    return Ok(());
                }
                for list in &lists {
                    print_list(list, self.unchecked);
                }
            }
        }

        Ok(())
    }
}

pub fn print_list(list: &ShoppingList, unchecked_only: bool) {
    println!("{}", list.name);
    println!("{}", "=".repeat(44));

    let items: Vec<_> = list
        .items
        .iter()
        .filter(|i| !unchecked_only || !i.checked())
        .collect();

    if items.is_empty() {
        println!("No items.");
    } else {
        for item in &items {
            println!("{}", item);
        }
    }

    let remaining = list.unchecked_items().count();
    println!("\n{} of {} item(s) remaining\n", remaining, list.items.len());
}
