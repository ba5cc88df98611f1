use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::sync::protocol::RecipeRecord;

/// One line of a recipe's ingredient list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecipeIngredient {
    pub identifier: String,
    pub raw_ingredient: String,
    pub name: String,
    pub quantity: String,
    pub note: Option<String>,
    pub is_heading: bool,
}

impl fmt::Display for RecipeIngredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.raw_ingredient.is_empty() {
            return write!(f, "{}", self.raw_ingredient);
        }
        if self.quantity.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} {}", self.quantity, self.name)
        }
    }
}

/// A recipe. Read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub identifier: String,
    pub name: String,
    pub icon: Option<String>,
    pub note: Option<String>,
    pub source_name: Option<String>,
    pub source_url: Option<String>,
    pub ingredients: Vec<RecipeIngredient>,
    pub preparation_steps: Vec<String>,
    pub photo_ids: Vec<String>,
    pub photo_urls: Vec<String>,
    pub ad_campaign_id: Option<String>,
    pub scale_factor: Option<f64>,
    pub rating: Option<i32>,
    pub nutritional_info: Option<String>,
    /// minutes
    pub cook_time: Option<i32>,
    /// minutes
    pub prep_time: Option<i32>,
    pub servings: Option<String>,
    pub paprika_identifier: Option<String>,
    pub recipe_data_id: Option<String>,
    /// Modification time in seconds since the epoch, as sent
    #[serde(rename = "timestamp")]
    pub timestamp_value: f64,
    /// Creation time in seconds since the epoch, as sent
    #[serde(rename = "creationTimestamp")]
    pub creation_timestamp_value: f64,
}

impl Recipe {
    pub fn from_record(record: RecipeRecord) -> Self {
        Self {
            identifier: record
                .identifier
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: record.name,
            icon: record.icon,
            note: record.note,
            source_name: record.source_name,
            source_url: record.source_url,
            ingredients: record.ingredients,
            preparation_steps: record.preparation_steps,
            photo_ids: record.photo_ids,
            photo_urls: record.photo_urls,
            ad_campaign_id: record.ad_campaign_id,
            scale_factor: record.scale_factor,
            rating: record.rating,
            nutritional_info: record.nutritional_info,
            cook_time: record.cook_time,
            prep_time: record.prep_time,
            servings: record.servings,
            paprika_identifier: record.paprika_identifier,
            recipe_data_id: record.recipe_data_id,
            timestamp_value: record.timestamp,
            creation_timestamp_value: record.creation_timestamp,
        }
    }

    /// Last modification time.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        seconds_to_datetime(self.timestamp_value)
    }

    pub fn creation_timestamp(&self) -> Option<DateTime<Utc>> {
        seconds_to_datetime(self.creation_timestamp_value)
    }

    pub fn total_time(&self) -> Option<i32> {
        match (self.prep_time, self.cook_time) {
            (Some(prep), Some(cook)) => Some(prep.saturating_add(cook)),
            (Some(prep), None) => Some(prep),
            (None, Some(cook)) => Some(cook),
            (None, None) => None,
        }
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.len()))?;

        if let Some(servings) = &self.servings {
            writeln!(f, "Servings: {}", servings)?;
        }
        if let Some(total) = self.total_time() {
            writeln!(f, "Time: {} min", total)?;
        }

        if !self.ingredients.is_empty() {
            writeln!(f, "\nIngredients:")?;
            for ingredient in &self.ingredients {
                if ingredient.is_heading {
                    writeln!(f, "  {}", ingredient.name)?;
                } else {
                    writeln!(f, "  - {}", ingredient)?;
                }
            }
        }

        if !self.preparation_steps.is_empty() {
            writeln!(f, "\nSteps:")?;
            for (i, step) in self.preparation_steps.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, step)?;
            }
        }

        Ok(())
    }
}

fn seconds_to_datetime(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((seconds * 1000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> RecipeRecord {
        RecipeRecord {
            identifier: Some("r1".to_string()),
            name: "Pancakes".to_string(),
            timestamp: 1_700_000_000.5,
            creation_timestamp: 1_600_000_000.0,
            prep_time: Some(10),
            cook_time: Some(15),
            ingredients: vec![RecipeIngredient {
                identifier: "i1".to_string(),
                raw_ingredient: "2 cups flour".to_string(),
                name: "flour".to_string(),
                quantity: "2 cups".to_string(),
                ..RecipeIngredient::default()
            }],
            preparation_steps: vec!["Mix".to_string(), "Fry".to_string()],
            ..RecipeRecord::default()
        }
    }

    #[test]
    fn test_from_record() {
        let recipe = Recipe::from_record(record());
        assert_eq!(recipe.identifier, "r1");
        assert_eq!(recipe.ingredients.len(), 1);
        assert_eq!(recipe.total_time(), Some(25));
    }

    #[test]
    fn test_total_time_saturates() {
        let mut recipe = Recipe::from_record(record());
        recipe.prep_time = Some(i32::MAX);
        recipe.cook_time = Some(30);
        assert_eq!(recipe.total_time(), Some(i32::MAX));

        recipe.prep_time = None;
        assert_eq!(recipe.total_time(), Some(30));
    }

    #[test]
    fn test_derived_timestamps() {
        let recipe = Recipe::from_record(record());
        let ts = recipe.timestamp().unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_millis(), 500);
        assert_eq!(
            recipe.creation_timestamp().unwrap().timestamp(),
            1_600_000_000
        );
    }

    #[test]
    fn test_display_lists_ingredients_and_steps() {
        let output = format!("{}", Recipe::from_record(record()));
        assert!(output.contains("Pancakes"));
        assert!(output.contains("- 2 cups flour"));
        assert!(output.contains("2. Fry"));
    }
}
