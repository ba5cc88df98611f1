use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{
    ConfigCommand, ItemCommand, ListsCommand, MealsCommand, RecipesCommand, WatchCommand,
};
use config::Config;

#[derive(Parser)]
#[command(name = "grocer")]
#[command(version)]
#[command(about = "Shopping lists and meal plans from the command line", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show shopping lists and their items
    Lists(ListsCommand),

    /// Show planned meals for a day
    Meals(MealsCommand),

    /// Edit an item on a shopping list
    Item(ItemCommand),

    /// Show recipes
    Recipes(RecipesCommand),

    /// Print lists whenever the server reports a change
    Watch(WatchCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grocer=info,grocer_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Lists(cmd)) => cmd.run(&config).await?,
        Some(Commands::Meals(cmd)) => cmd.run(&config).await?,
        Some(Commands::Item(cmd)) => cmd.run(&config).await?,
        Some(Commands::Recipes(cmd)) => cmd.run(&config).await?,
        Some(Commands::Watch(cmd)) => cmd.run(&config).await?,
        Some(Commands::Config(cmd)) => cmd.run(&config)?,
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item_edit() {
        let cli = Cli::try_parse_from([
            "grocer", "item", "--list", "Groceries", "--item", "Eggs", "--checked", "true",
            "--sort-index", "3",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Item(cmd)) => {
                assert_eq!(cmd.list, "Groceries");
                assert_eq!(cmd.item, "Eggs");
                assert_eq!(cmd.checked, Some(true));
                assert_eq!(cmd.sort_index, Some(3));
                assert!(cmd.name.is_none());
            }
            _ => panic!("expected item command"),
        }
    }

    #[test]
    fn test_parse_meals_with_date_and_global_config() {
        let cli =
            Cli::try_parse_from(["grocer", "meals", "--date", "2025-03-15", "-c", "/tmp/g.yaml"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/g.yaml")));
        match cli.command {
            Some(Commands::Meals(cmd)) => assert_eq!(cmd.date.as_deref(), Some("2025-03-15")),
            _ => panic!("expected meals command"),
        }
    }

    #[test]
    fn test_checked_rejects_non_boolean() {
        let result = Cli::try_parse_from([
            "grocer", "item", "--list", "Groceries", "--item", "Eggs", "--checked", "maybe",
        ]);
        assert!(result.is_err());
    }
}
