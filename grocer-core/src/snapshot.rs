//! Decoded account state.
//!
//! A [`Snapshot`] is built once per fetch and never mutated afterwards.
//! Recipes and labels are kept in server order with an id index on the
//! side. When an identifier repeats, the later entry replaces the earlier
//! one in place.

use std::collections::HashMap;

use tracing::debug;

use crate::models::{Item, Meal, MealPlanLabel, Recipe, ShoppingList};
use crate::sync::protocol::UserDataResponse;
use crate::sync::SyncError;

/// Everything the server knows about the account as of one fetch.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    lists: Vec<ShoppingList>,
    planned_meals: Vec<Meal>,
    recipes: Vec<Recipe>,
    recipe_index: HashMap<String, usize>,
    labels: Vec<MealPlanLabel>,
    label_index: HashMap<String, usize>,
}

impl Snapshot {
    pub fn new(
        lists: Vec<ShoppingList>,
        planned_meals: Vec<Meal>,
        recipes: Vec<Recipe>,
        labels: Vec<MealPlanLabel>,
    ) -> Self {
        let (recipes, recipe_index) = index_last_wins(recipes, |r| r.identifier.clone());
        let (labels, label_index) = index_last_wins(labels, |l| l.identifier.clone());
        Self {
            lists,
            planned_meals,
            recipes,
            recipe_index,
            labels,
            label_index,
        }
    }

    /// Decodes a full user-data payload.
    pub fn decode(data: &[u8]) -> Result<Self, SyncError> {
        let response =
            UserDataResponse::decode(data).map_err(|e| SyncError::DecodeError(e.to_string()))?;
        Ok(Self::from_response(response))
    }

    /// Builds a snapshot from a decoded response. Missing sections are empty.
    pub fn from_response(response: UserDataResponse) -> Self {
        let lists: Vec<ShoppingList> = response
            .shopping_lists_response
            .map(|r| r.new_lists)
            .unwrap_or_default()
            .into_iter()
            .map(ShoppingList::from_record)
            .collect();

        let (events, labels) = response
            .meal_planning_calendar_response
            .map(|c| (c.events, c.labels))
            .unwrap_or_default();
        let planned_meals: Vec<Meal> = events.into_iter().map(Meal::from_record).collect();

        let recipes: Vec<Recipe> = response
            .recipe_data_response
            .map(|r| r.recipes)
            .unwrap_or_default()
            .into_iter()
            .map(Recipe::from_record)
            .collect();

        debug!(
            "Decoded snapshot: {} list(s), {} meal(s), {} recipe(s), {} label(s)",
            lists.len(),
            planned_meals.len(),
            recipes.len(),
            labels.len()
        );

        Self::new(lists, planned_meals, recipes, labels)
    }

    pub fn lists(&self) -> &[ShoppingList] {
        &self.lists
    }

    pub fn planned_meals(&self) -> &[Meal] {
        &self.planned_meals
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn meal_plan_labels(&self) -> &[MealPlanLabel] {
        &self.labels
    }

    pub fn list_by_id(&self, identifier: &str) -> Option<&ShoppingList> {
        self.lists.iter().find(|l| l.identifier == identifier)
    }

    /// First list whose name matches exactly.
    pub fn list_by_name(&self, name: &str) -> Option<&ShoppingList> {
        self.lists.iter().find(|l| l.name == name)
    }

    pub fn recipe_by_id(&self, identifier: &str) -> Option<&Recipe> {
        self.recipe_index.get(identifier).map(|&i| &self.recipes[i])
    }

    /// First recipe whose name matches exactly.
    pub fn recipe_by_name(&self, name: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.name == name)
    }

    pub fn label_by_id(&self, identifier: &str) -> Option<&MealPlanLabel> {
        self.label_index.get(identifier).map(|&i| &self.labels[i])
    }

    /// Recipe a meal points at, if it still exists.
    pub fn recipe_for(&self, meal: &Meal) -> Option<&Recipe> {
        meal.recipe_id
            .as_deref()
            .and_then(|id| self.recipe_by_id(id))
    }

    /// Label a meal points at, if it still exists.
    pub fn label_for(&self, meal: &Meal) -> Option<&MealPlanLabel> {
        meal.label_id.as_deref().and_then(|id| self.label_by_id(id))
    }

    /// List an item belongs to, if it is assigned and still exists.
    pub fn list_for(&self, item: &Item) -> Option<&ShoppingList> {
        item.list_id().and_then(|id| self.list_by_id(id))
    }
}

fn index_last_wins<T>(
    entries: Vec<T>,
    key: impl Fn(&T) -> String,
) -> (Vec<T>, HashMap<String, usize>) {
    let mut ordered: Vec<T> = Vec::with_capacity(entries.len());
    let mut index = HashMap::with_capacity(entries.len());
    for entry in entries {
        let id = key(&entry);
        match index.get(&id) {
            Some(&pos) => ordered[pos] = entry,
            None => {
                index.insert(id, ordered.len());
                ordered.push(entry);
            }
        }
    }
    (ordered, index)
}
