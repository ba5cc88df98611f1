use clap::Args;

use super::{connect, find_list};
use crate::config::Config;

#[derive(Args)]
pub struct ItemCommand {
    /// List containing the item (name or id)
    #[arg(long, short)]
    pub list: String,

    /// Item to edit (name or id)
    #[arg(long, short)]
    pub item: String,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New quantity
    #[arg(long, short)]
    pub quantity: Option<String>,

    /// New details
    #[arg(long)]
    pub details: Option<String>,

    /// Mark checked (true) or unchecked (false)
    #[arg(long)]
    pub checked: Option<bool>,

    /// New category
    #[arg(long)]
    pub category: Option<String>,

    /// New position in the list
    #[arg(long)]
    pub sort_index: Option<i32>,
}

impl ItemCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let client = connect(config).await?;
        let list = find_list(&client, &self.list)?;

        let mut item = list
            .item_by_name(&self.item)
            .or_else(|| list.item_by_id(&self.item))
            .cloned()
            .ok_or_else(|| format!("Item not found in {}: {}", list.name, self.item))?;

        if let Some(name) = &self.name {
            item.set_name(name.as_str());
        }
        if let Some(quantity) = &self.quantity {
            item.set_quantity(quantity.as_str())?;
        }
        if let Some(details) = &self.details {
            item.set_details(details.as_str());
        }
        if let Some(checked) = self.checked {
            item.set_checked(checked);
        }
        if let Some(category) = &self.category {
            item.set_category_match_id(category.as_str());
        }
        if let Some(index) = self.sort_index {
            item.set_manual_sort_index(index);
        }

        if !item.has_pending_changes() {
            println!("Nothing to change.");
            return Ok(());
        }

        let changed = item.pending_fields().len();
        match client.save(&mut item).await? {
            Some(ack) => println!(
                "Saved {} change(s) to {} (status {})",
                changed, item, ack.status
            ),
            None => println!("Nothing to change."),
        }

        Ok(())
    }
}
