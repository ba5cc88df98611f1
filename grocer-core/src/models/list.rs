use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use super::item::Item;
use crate::sync::protocol::ListRecord;

/// A shopping list as of the last snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingList {
    pub identifier: String,
    pub name: String,
    pub items: Vec<Item>,
}

impl ShoppingList {
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            items: Vec::new(),
        }
    }

    /// Builds a list from its wire record.
    ///
    /// Items without a list id are attached to this list.
    pub fn from_record(record: ListRecord) -> Self {
        let identifier = record
            .identifier
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let items = record
            .items
            .into_iter()
            .map(|mut item| {
                if item.list_id.as_deref().map_or(true, str::is_empty) {
                    item.list_id = Some(identifier.clone());
                }
                Item::from_record(item)
            })
            .collect();

        Self {
            identifier,
            name: record.name,
            items,
        }
    }

    pub fn item_by_id(&self, identifier: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.identifier() == identifier)
    }

    /// First item whose name matches exactly.
    pub fn item_by_name(&self, name: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.name() == name)
    }

    pub fn unchecked_items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|i| !i.checked())
    }
}

impl fmt::Display for ShoppingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.len()))?;
        for item in &self.items {
            writeln!(f, "  {}", item)?;
        }
        Ok(())
    }
}
