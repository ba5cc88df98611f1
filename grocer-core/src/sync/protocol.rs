//! Wire types for the shopping-list service.
//!
//! Payloads are CBOR-encoded records. Field names use camelCase to match
//! the server schema. Every field is optional on decode and falls back to
//! its zero value, so absent sub-sections decode as empty collections.

use serde::{Deserialize, Serialize};

use crate::models::{MealPlanLabel, RecipeIngredient};

/// Text frame the client sends to keep the listener socket alive.
pub const HEARTBEAT_FRAME: &str = "--heartbeat--";

/// Text frame the server pushes when account state changed.
pub const REFRESH_FRAME: &str = "refresh-shopping-lists";

/// Full account state returned by the user-data endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserDataResponse {
    pub shopping_lists_response: Option<ShoppingListsResponse>,
    pub meal_planning_calendar_response: Option<CalendarResponse>,
    pub recipe_data_response: Option<RecipeDataResponse>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShoppingListsResponse {
    pub new_lists: Vec<ListRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListRecord {
    pub identifier: Option<String>,
    pub name: String,
    pub items: Vec<ListItemRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListItemRecord {
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

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalendarResponse {
    pub events: Vec<CalendarEventRecord>,
    pub labels: Vec<MealPlanLabel>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalendarEventRecord {
    pub identifier: Option<String>,
    pub logical_timestamp: i64,
    pub calendar_id: Option<String>,
    pub date: String,
    pub title: String,
    pub details: Option<String>,
    pub recipe_id: Option<String>,
    pub label_id: Option<String>,
    pub label_sort_index: Option<i32>,
    pub order_added_sort_index: Option<i32>,
    pub recipe_scale_factor: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecipeDataResponse {
    pub recipes: Vec<RecipeRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecipeRecord {
    pub identifier: Option<String>,
    pub timestamp: f64,
    pub name: String,
    pub icon: Option<String>,
    pub note: Option<String>,
    pub source_name: Option<String>,
    pub source_url: Option<String>,
    pub ingredients: Vec<RecipeIngredient>,
    pub preparation_steps: Vec<String>,
    pub photo_ids: Vec<String>,
    pub ad_campaign_id: Option<String>,
    pub photo_urls: Vec<String>,
    pub scale_factor: Option<f64>,
    pub rating: Option<i32>,
    pub creation_timestamp: f64,
    pub nutritional_info: Option<String>,
    pub cook_time: Option<i32>,
    pub prep_time: Option<i32>,
    pub servings: Option<String>,
    pub paprika_identifier: Option<String>,
    pub recipe_data_id: Option<String>,
}

/// Metadata shared by every list operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperationMetadata {
    pub operation_id: String,
    pub handler_id: String,
    pub user_id: String,
}

/// A single field mutation on a list item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListOperationRecord {
    pub metadata: OperationMetadata,
    pub list_id: String,
    pub list_item_id: String,
    pub updated_value: String,
}

/// Ordered batch of operations accepted by the update endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListOperationList {
    pub operations: Vec<ListOperationRecord>,
}

/// Response from the login endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub signed_user_id: String,
    pub user_id: String,
}

impl UserDataResponse {
    /// Encode as CBOR bytes.
    pub fn encode(&self) -> Result<Vec<u8>, ciborium::ser::Error<std::io::Error>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)?;
        Ok(buf)
    }

    /// Decode from CBOR bytes.
    pub fn decode(data: &[u8]) -> Result<Self, ciborium::de::Error<std::io::Error>> {
        ciborium::from_reader(data)
    }
}

impl ListOperationList {
    /// Encode as CBOR bytes.
    pub fn encode(&self) -> Result<Vec<u8>, ciborium::ser::Error<std::io::Error>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)?;
        Ok(buf)
    }

    /// Decode from CBOR bytes.
    pub fn decode(data: &[u8]) -> Result<Self, ciborium::de::Error<std::io::Error>> {
        ciborium::from_reader(data)
    }
}

/// Generate a random client id identifying this device to the server.
pub fn generate_client_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_client_id() {
        let id1 = generate_client_id();
        let id2 = generate_client_id();
        assert_ne!(id1, id2);
        assert!(uuid::Uuid::parse_str(&id1).is_ok());
    }

    #[test]
    fn test_empty_user_data_decodes_to_empty_sections() {
        let encoded = UserDataResponse::default().encode().unwrap();
        let decoded = UserDataResponse::decode(&encoded).unwrap();

        assert!(decoded.shopping_lists_response.is_none());
        assert!(decoded.meal_planning_calendar_response.is_none());
        assert!(decoded.recipe_data_response.is_none());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        // A map holding only the list section, with a bare list inside.
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Partial {
            shopping_lists_response: PartialLists,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct PartialLists {
            new_lists: Vec<PartialList>,
        }
        #[derive(Serialize)]
        struct PartialList {
            name: String,
        }

        let mut buf = Vec::new();
        ciborium::into_writer(
            &Partial {
                shopping_lists_response: PartialLists {
                    new_lists: vec![PartialList {
                        name: "Groceries".to_string(),
                    }],
                },
            },
            &mut buf,
        )
        .unwrap();

        let decoded = UserDataResponse::decode(&buf).unwrap();
        let lists = decoded.shopping_lists_response.unwrap().new_lists;
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].name, "Groceries");
        assert!(lists[0].identifier.is_none());
        assert!(lists[0].items.is_empty());
        assert!(decoded.recipe_data_response.is_none());
    }

    #[test]
    fn test_operation_list_encode_decode() {
        let list = ListOperationList {
            operations: vec![ListOperationRecord {
                metadata: OperationMetadata {
                    operation_id: "op1".to_string(),
                    handler_id: "set-list-item-name".to_string(),
                    user_id: "user1".to_string(),
                },
                list_id: "list1".to_string(),
                list_item_id: "item1".to_string(),
                updated_value: "Milk".to_string(),
            }],
        };

        let encoded = list.encode().unwrap();
        let decoded = ListOperationList::decode(&encoded).unwrap();
        assert_eq!(decoded, list);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(UserDataResponse::decode(b"not cbor").is_err());
        assert!(ListOperationList::decode(&[]).is_err());
    }

    #[test]
    fn test_login_response_from_json() {
        let body = r#"{"signed_user_id":"signed","user_id":"u1","is_premium_user":true}"#;
        let login: LoginResponse = serde_json::from_str(body).unwrap();
        assert_eq!(login.signed_user_id, "signed");
        assert_eq!(login.user_id, "u1");
    }
}
