mod error;
mod item;
mod list;
mod meal;
mod recipe;

pub use error::ModelError;
pub use item::{FieldValue, Item, ItemField, NewItem, DEFAULT_CATEGORY};
pub use list::ShoppingList;
pub use meal::{Meal, MealPlanLabel};
pub use recipe::{Recipe, RecipeIngredient};
