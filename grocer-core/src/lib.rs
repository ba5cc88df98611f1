//! Grocer Core Library
//!
//! Client-side mirror of a shopping-list and meal-planning account: decoded
//! snapshots, an atomically refreshed registry, dirty-tracked items and the
//! channels that submit changes and listen for pushes.

pub mod models;
pub mod operations;
pub mod registry;
pub mod snapshot;
pub mod sync;

pub use models::{
    FieldValue, Item, ItemField, Meal, MealPlanLabel, ModelError, NewItem, Recipe,
    RecipeIngredient, ShoppingList, DEFAULT_CATEGORY,
};
pub use operations::{Operation, OperationBatch};
pub use registry::{DateQuery, EntityRegistry, Zone};
pub use snapshot::Snapshot;
pub use sync::{
    Acknowledgement, ConnectionState, Credentials, GrocerClient, HttpTransport, ListsUpdated,
    RealtimeChannel, RealtimeConfig, ReconnectPolicy, Session, SyncError, Transport, WsConnector,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
