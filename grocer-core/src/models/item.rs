//! Mutable shopping-list items with dirty-field tracking.
//!
//! Every write goes through a setter that records which field changed.
//! The pending markers are later turned into server operations by
//! [`crate::operations::OperationBatch`]. Markers are appended, not
//! deduplicated: writing the same field twice yields two markers.

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use super::error::ModelError;
use super::list::ShoppingList;
use crate::sync::protocol::ListItemRecord;

/// Category assigned to items that have not been categorized.
pub const DEFAULT_CATEGORY: &str = "other";

/// Fields of a list item addressable through [`Item::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemField {
    Identifier,
    ListId,
    Name,
    Quantity,
    Details,
    Checked,
    CategoryMatchId,
    ManualSortIndex,
    UserId,
}

impl ItemField {
    /// Field name as it appears in serialized item records.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemField::Identifier => "identifier",
            ItemField::ListId => "listId",
            ItemField::Name => "name",
            ItemField::Quantity => "quantity",
            ItemField::Details => "details",
            ItemField::Checked => "checked",
            ItemField::CategoryMatchId => "categoryMatchId",
            ItemField::ManualSortIndex => "manualSortIndex",
            ItemField::UserId => "userId",
        }
    }

    /// Server handler that applies a change to this field.
    ///
    /// Fields without a handler never produce an operation.
    pub fn handler_id(&self) -> Option<&'static str> {
        match self {
            ItemField::Name => Some("set-list-item-name"),
            ItemField::Quantity => Some("set-list-item-quantity"),
            ItemField::Details => Some("set-list-item-details"),
            ItemField::Checked => Some("set-list-item-checked"),
            ItemField::CategoryMatchId => Some("set-list-item-category-match-id"),
            ItemField::ManualSortIndex => Some("set-list-item-sort-order"),
            ItemField::Identifier | ItemField::ListId | ItemField::UserId => None,
        }
    }
}

impl fmt::Display for ItemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loosely typed value for [`Item::set`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl FieldValue {
    fn kind(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Number(_) => "number",
            FieldValue::Bool(_) => "boolean",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Number(f64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Number(f64::from(value))
    }
}

/// Caller-supplied fields for a brand new item.
#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub identifier: Option<String>,
    pub list_id: Option<String>,
    pub name: String,
    pub quantity: String,
    pub details: String,
    pub checked: bool,
    pub category_match_id: Option<String>,
    pub manual_sort_index: i32,
    pub user_id: Option<String>,
}

impl NewItem {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn in_list(mut self, list_id: impl Into<String>) -> Self {
        self.list_id = Some(list_id.into());
        self
    }

    pub fn with_quantity(mut self, quantity: impl Into<String>) -> Self {
        self.quantity = quantity.into();
        self
    }
}

/// A shopping-list item.
///
/// `identifier` and `user_id` are fixed at construction and `list_id` can be
/// assigned once. All other fields are freely writable and tracked.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    identifier: String,
    list_id: Option<String>,
    name: String,
    quantity: String,
    details: String,
    checked: bool,
    category_match_id: String,
    manual_sort_index: i32,
    user_id: Option<String>,
    #[serde(skip)]
    pending: Vec<ItemField>,
}

impl Item {
    /// Creates an item from caller-supplied fields, generating an identifier
    /// when none is given. No fields are marked dirty.
    pub fn new(fields: NewItem) -> Self {
        Self {
            identifier: fields
                .identifier
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            list_id: fields.list_id,
            name: fields.name,
            quantity: fields.quantity,
            details: fields.details,
            checked: fields.checked,
            category_match_id: fields
                .category_match_id
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            manual_sort_index: fields.manual_sort_index,
            user_id: fields.user_id,
            pending: Vec::new(),
        }
    }

    /// Builds an item from a decoded wire record.
    pub fn from_record(record: ListItemRecord) -> Self {
        Self::new(NewItem {
            identifier: record.identifier.filter(|id| !id.is_empty()),
            list_id: record.list_id.filter(|id| !id.is_empty()),
            name: record.name,
            quantity: record.quantity,
            details: record.details,
            checked: record.checked,
            category_match_id: record.category_match_id.filter(|c| !c.is_empty()),
            manual_sort_index: record.manual_sort_index,
            user_id: record.user_id,
        })
    }

    /// Converts the item back into its wire record.
    pub fn to_record(&self) -> ListItemRecord {
        ListItemRecord {
            identifier: Some(self.identifier.clone()),
            list_id: self.list_id.clone(),
            name: self.name.clone(),
            quantity: self.quantity.clone(),
            details: self.details.clone(),
            checked: self.checked,
            category_match_id: Some(self.category_match_id.clone()),
            manual_sort_index: self.manual_sort_index,
            user_id: self.user_id.clone(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn list_id(&self) -> Option<&str> {
        self.list_id.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> &str {
        &self.quantity
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn checked(&self) -> bool {
        self.checked
    }

    pub fn category_match_id(&self) -> &str {
        &self.category_match_id
    }

    pub fn manual_sort_index(&self) -> i32 {
        self.manual_sort_index
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Fields written since the last successful save, in write order.
    pub fn pending_fields(&self) -> &[ItemField] {
        &self.pending
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drops all pending markers without touching field values.
    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }

    /// Writes a field from a loosely typed value.
    ///
    /// Applies the same checks as the typed setters: immutable fields are
    /// rejected, `checked` only takes booleans, `manualSortIndex` only takes
    /// integral numbers and numeric quantities are stored as text.
    pub fn set(&mut self, field: ItemField, value: impl Into<FieldValue>) -> Result<(), ModelError> {
        let value = value.into();
        match field {
            ItemField::Identifier => Err(ModelError::InvariantViolation(
                "cannot update an item identifier".to_string(),
            )),
            ItemField::UserId => Err(ModelError::InvariantViolation(
                "cannot set the user id of an item after creation".to_string(),
            )),
            ItemField::ListId => {
                let list_id = expect_text(field, value)?;
                self.set_list_id(list_id)
            }
            ItemField::Name => {
                self.set_name(expect_text(field, value)?);
                Ok(())
            }
            ItemField::Quantity => self.set_quantity(value),
            ItemField::Details => {
                self.set_details(expect_text(field, value)?);
                Ok(())
            }
            ItemField::Checked => match value {
                FieldValue::Bool(checked) => {
                    self.set_checked(checked);
                    Ok(())
                }
                other => Err(ModelError::Validation(format!(
                    "checked must be a boolean, got {}",
                    other.kind()
                ))),
            },
            ItemField::CategoryMatchId => {
                self.set_category_match_id(expect_text(field, value)?);
                Ok(())
            }
            ItemField::ManualSortIndex => {
                let index = match value {
                    FieldValue::Number(n)
                        if n.fract() == 0.0
                            && n >= f64::from(i32::MIN)
                            && n <= f64::from(i32::MAX) =>
                    {
                        n as i32
                    }
                    other => {
                        return Err(ModelError::Validation(format!(
                            "sort index must be an integral number, got {}",
                            describe(&other)
                        )))
                    }
                };
                self.set_manual_sort_index(index);
                Ok(())
            }
        }
    }

    /// Assigns the item to a list. Only allowed while no list is set.
    pub fn set_list_id(&mut self, list_id: impl Into<String>) -> Result<(), ModelError> {
        if self.list_id.is_some() {
            return Err(ModelError::InvariantViolation(
                "cannot move items between lists".to_string(),
            ));
        }
        self.list_id = Some(list_id.into());
        self.mark(ItemField::ListId);
        Ok(())
    }

    /// Assigns the item to `list` by its identifier.
    pub fn assign_to(&mut self, list: &ShoppingList) -> Result<(), ModelError> {
        self.set_list_id(list.identifier.clone())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.mark(ItemField::Name);
    }

    /// Sets the quantity. Numbers are stored as the service's web client
    /// prints them: decimal between 1e-6 and 1e21, exponent form outside.
    pub fn set_quantity(&mut self, quantity: impl Into<FieldValue>) -> Result<(), ModelError> {
        self.quantity = match quantity.into() {
            FieldValue::Text(text) => text,
            FieldValue::Number(n) => number_text(n),
            FieldValue::Bool(_) => {
                return Err(ModelError::Validation(
                    "quantity must be text or a number, got boolean".to_string(),
                ))
            }
        };
        self.mark(ItemField::Quantity);
        Ok(())
    }

    pub fn set_details(&mut self, details: impl Into<String>) {
        self.details = details.into();
        self.mark(ItemField::Details);
    }

    pub fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
        self.mark(ItemField::Checked);
    }

    pub fn set_category_match_id(&mut self, category: impl Into<String>) {
        self.category_match_id = category.into();
        self.mark(ItemField::CategoryMatchId);
    }

    pub fn set_manual_sort_index(&mut self, index: i32) {
        self.manual_sort_index = index;
        self.mark(ItemField::ManualSortIndex);
    }

    /// Current value of `field` in its wire form.
    ///
    /// Booleans are encoded as `y`/`n`. Returns `None` only for an unset
    /// list or user id.
    pub fn wire_value(&self, field: ItemField) -> Option<String> {
        match field {
            ItemField::Identifier => Some(self.identifier.clone()),
            ItemField::ListId => self.list_id.clone(),
            ItemField::Name => Some(self.name.clone()),
            ItemField::Quantity => Some(self.quantity.clone()),
            ItemField::Details => Some(self.details.clone()),
            ItemField::Checked => Some(if self.checked { "y" } else { "n" }.to_string()),
            ItemField::CategoryMatchId => Some(self.category_match_id.clone()),
            ItemField::ManualSortIndex => Some(self.manual_sort_index.to_string()),
            ItemField::UserId => self.user_id.clone(),
        }
    }

    fn mark(&mut self, field: ItemField) {
        self.pending.push(field);
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let check = if self.checked { "[x]" } else { "[ ]" };
        if self.quantity.is_empty() {
            write!(f, "{} {}", check, self.name)?;
        } else {
            write!(f, "{} {} ({})", check, self.name, self.quantity)?;
        }
        if !self.details.is_empty() {
            write!(f, " - {}", self.details)?;
        }
        Ok(())
    }
}

fn expect_text(field: ItemField, value: FieldValue) -> Result<String, ModelError> {
    match value {
        FieldValue::Text(text) => Ok(text),
        other => Err(ModelError::Validation(format!(
            "{} must be text, got {}",
            field,
            other.kind()
        ))),
    }
}

/// Shortest round-trip digits, written as `1e+21` or `1.5e-7` when the
/// magnitude is at least 1e21 or below 1e-6.
fn number_text(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = n.abs();
    if n.is_nan() || (1e-6..1e21).contains(&magnitude) {
        return n.to_string();
    }
    let text = format!("{:e}", n);
    match text.split_once('e') {
        Some((digits, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", digits, exponent)
        }
        _ => text,
    }
}

fn describe(value: &FieldValue) -> String {
    match value {
        FieldValue::Number(n) => n.to_string(),
        other => other.kind().to_string(),
    }
}
