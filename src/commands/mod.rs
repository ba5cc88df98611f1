mod config_cmd;
mod item;
mod lists;
mod meals;
mod recipes;
mod watch;

pub use config_cmd::{ConfigCommand, OutputFormat};
pub use item::ItemCommand;
pub use lists::ListsCommand;
pub use meals::MealsCommand;
pub use recipes::RecipesCommand;
pub use watch::WatchCommand;

use grocer_core::{GrocerClient, HttpTransport, ShoppingList};

use crate::config::Config;

/// Logs in with the configured account and loads the current state.
pub async fn connect(
    config: &Config,
) -> Result<GrocerClient<HttpTransport>, Box<dyn std::error::Error>> {
    let credentials = config.credentials()?;
    let transport = HttpTransport::new(config.server_url.value.clone())?;
    let client = GrocerClient::login(transport, &credentials, config.time_zone()).await?;
    Ok(client)
}

/// Finds a list by exact name, falling back to identifier.
pub fn find_list(
    client: &GrocerClient<HttpTransport>,
    key: &str,
) -> Result<ShoppingList, Box<dyn std::error::Error>> {
    client
        .list_by_name(key)
        .or_else(|| client.list_by_id(key))
        .ok_or_else(|| format!("List not found: {}", key).into())
}
