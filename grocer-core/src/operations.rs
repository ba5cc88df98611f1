//! Translation of pending item changes into server operations.

use tracing::debug;
use uuid::Uuid;

use crate::models::{Item, ModelError};
use crate::sync::protocol::{ListOperationList, ListOperationRecord, OperationMetadata};
use crate::sync::SyncError;

/// One named field mutation destined for the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub operation_id: String,
    pub handler_id: String,
    pub user_id: String,
    pub list_id: String,
    pub item_id: String,
    pub updated_value: String,
}

impl Operation {
    fn to_record(&self) -> ListOperationRecord {
        ListOperationRecord {
            metadata: OperationMetadata {
                operation_id: self.operation_id.clone(),
                handler_id: self.handler_id.clone(),
                user_id: self.user_id.clone(),
            },
            list_id: self.list_id.clone(),
            list_item_id: self.item_id.clone(),
            updated_value: self.updated_value.clone(),
        }
    }

    fn from_record(record: ListOperationRecord) -> Self {
        Self {
            operation_id: record.metadata.operation_id,
            handler_id: record.metadata.handler_id,
            user_id: record.metadata.user_id,
            list_id: record.list_id,
            item_id: record.list_item_id,
            updated_value: record.updated_value,
        }
    }
}

/// Ordered operations submitted together as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationBatch {
    operations: Vec<Operation>,
}

impl OperationBatch {
    /// Builds one operation per pending marker on `item`, in marker order.
    ///
    /// Values are read from the item now, not when the field was marked.
    /// Markers for fields without a server handler are skipped. `user_id`
    /// is the id of the session performing the change.
    pub fn from_item(item: &Item, user_id: &str) -> Result<Self, ModelError> {
        let mut operations = Vec::with_capacity(item.pending_fields().len());

        for &field in item.pending_fields() {
            let Some(handler_id) = field.handler_id() else {
                debug!("No handler for {}, skipping", field);
                continue;
            };

            let list_id = item.list_id().ok_or_else(|| {
                ModelError::Validation(format!(
                    "item {} is not assigned to a list",
                    item.identifier()
                ))
            })?;

            operations.push(Operation {
                operation_id: Uuid::new_v4().to_string(),
                handler_id: handler_id.to_string(),
                user_id: user_id.to_string(),
                list_id: list_id.to_string(),
                item_id: item.identifier().to_string(),
                updated_value: item.wire_value(field).unwrap_or_default(),
            });
        }

        Ok(Self { operations })
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Serializes the batch for the update endpoint.
    pub fn encode(&self) -> Result<Vec<u8>, SyncError> {
        ListOperationList {
            operations: self.operations.iter().map(Operation::to_record).collect(),
        }
        .encode()
        .map_err(|e| SyncError::EncodeError(e.to_string()))
    }

    pub fn decode(data: &[u8]) -> Result<Self, SyncError> {
        let list =
            ListOperationList::decode(data).map_err(|e| SyncError::DecodeError(e.to_string()))?;
        Ok(Self {
            operations: list
                .operations
                .into_iter()
                .map(Operation::from_record)
                .collect(),
        })
    }
}
