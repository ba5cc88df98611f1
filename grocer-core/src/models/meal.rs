use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::sync::protocol::CalendarEventRecord;

/// A label that groups planned meals (e.g. "Breakfast").
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MealPlanLabel {
    pub identifier: String,
    pub name: String,
    pub hex_color: String,
    pub sort_index: i32,
    pub calendar_id: Option<String>,
    pub logical_timestamp: i64,
}

/// A planned meal. Read-only.
///
/// The recipe and label are referenced by id and resolved against the
/// registry on access, so either side can be replaced independently.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub identifier: String,
    pub logical_timestamp: i64,
    pub calendar_id: Option<String>,
    /// Date as sent by the server (`YYYY-MM-DD`)
    #[serde(rename = "date")]
    pub date_string: String,
    #[serde(rename = "title")]
    pub name: String,
    pub details: Option<String>,
    pub recipe_id: Option<String>,
    pub label_id: Option<String>,
    pub label_sort_index: Option<i32>,
    pub order_added_sort_index: Option<i32>,
    pub recipe_scale_factor: Option<f64>,
    /// Calendar day parsed from `date_string`; `None` if unparseable
    #[serde(skip)]
    pub date: Option<NaiveDate>,
}

impl Meal {
    pub fn from_record(record: CalendarEventRecord) -> Self {
        let date = parse_calendar_date(&record.date);
        Self {
            identifier: record
                .identifier
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            logical_timestamp: record.logical_timestamp,
            calendar_id: record.calendar_id,
            date_string: record.date,
            name: record.title,
            details: record.details,
            recipe_id: record.recipe_id.filter(|id| !id.is_empty()),
            label_id: record.label_id.filter(|id| !id.is_empty()),
            label_sort_index: record.label_sort_index,
            order_added_sort_index: record.order_added_sort_index,
            recipe_scale_factor: record.recipe_scale_factor,
            date,
        }
    }

    pub fn is_on(&self, day: NaiveDate) -> bool {
        self.date == Some(day)
    }
}

impl fmt::Display for Meal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date_string, self.name)?;
        if let Some(details) = &self.details {
            if !details.is_empty() {
                write!(f, " ({})", details)?;
            }
        }
        Ok(())
    }
}

/// Parses a server calendar date.
///
/// Calendar events carry a plain day, so no time zone shift applies.
/// Full RFC 3339 timestamps are accepted and reduced to the day in their
/// own offset.
pub(crate) fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
}
