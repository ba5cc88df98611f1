//! Account-level client tying the transport, registry and listener together.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::error::SyncError;
use super::realtime::{listener_url, Connector, PushHandler, RealtimeChannel, RealtimeConfig};
use super::transport::{Acknowledgement, Credentials, Session, Transport};
use crate::models::{Item, Meal, ModelError, NewItem, ShoppingList};
use crate::operations::OperationBatch;
use crate::registry::{DateQuery, EntityRegistry, Zone};
use crate::snapshot::Snapshot;

/// Buffered notifications per subscriber before the oldest are dropped.
const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// Sent after a push-triggered refresh has replaced the registry contents.
#[derive(Debug, Clone)]
pub struct ListsUpdated {
    pub lists: Vec<ShoppingList>,
}

struct Shared<T> {
    transport: T,
    session: Session,
    registry: EntityRegistry,
    updates: broadcast::Sender<ListsUpdated>,
}

impl<T: Transport> Shared<T> {
    async fn refresh(&self) -> Result<Vec<ShoppingList>, SyncError> {
        let bytes = self.transport.fetch_user_data(&self.session).await?;
        let snapshot = Snapshot::decode(&bytes)?;
        let current = self.registry.refresh(snapshot);
        Ok(current.lists().to_vec())
    }
}

impl<T: Transport> PushHandler for Shared<T> {
    async fn on_refresh_push(&self) {
        match self.refresh().await {
            Ok(lists) => {
                // No subscribers is not an error.
                let _ = self.updates.send(ListsUpdated { lists });
            }
            Err(e) => warn!("Push-triggered refresh failed: {}", e),
        }
    }
}

/// Client for one account session.
///
/// Cloning is cheap; clones share the session, registry and subscribers.
pub struct GrocerClient<T: Transport> {
    shared: Arc<Shared<T>>,
}

impl<T: Transport> Clone for GrocerClient<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Transport> GrocerClient<T> {
    /// Logs in and performs the initial load.
    pub async fn login(
        transport: T,
        credentials: &Credentials,
        zone: impl Into<Zone>,
    ) -> Result<Self, SyncError> {
        let session = transport.login(credentials).await?;
        info!("Logged in as user {}", session.user_id);

        let client = Self::with_session(transport, session, EntityRegistry::new(zone));
        client.refresh().await?;
        Ok(client)
    }

    /// Wraps an existing session without contacting the server.
    pub fn with_session(transport: T, session: Session, registry: EntityRegistry) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                transport,
                session,
                registry,
                updates,
            }),
        }
    }

    pub fn session(&self) -> &Session {
        &self.shared.session
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.shared.registry
    }

    /// Fetches the latest state, swaps it into the registry and returns the
    /// lists in server order.
    pub async fn refresh(&self) -> Result<Vec<ShoppingList>, SyncError> {
        self.shared.refresh().await
    }

    /// Current lists without contacting the server.
    pub fn lists(&self) -> Vec<ShoppingList> {
        self.shared.registry.lists()
    }

    pub fn list_by_id(&self, identifier: &str) -> Option<ShoppingList> {
        self.shared.registry.list_by_id(identifier)
    }

    pub fn list_by_name(&self, name: &str) -> Option<ShoppingList> {
        self.shared.registry.list_by_name(name)
    }

    pub fn meals_for_date(&self, date: impl Into<DateQuery>) -> Result<Vec<Meal>, ModelError> {
        self.shared.registry.meals_for_date(date)
    }

    pub fn meals_for_today(&self) -> Vec<Meal> {
        self.shared.registry.meals_for_today()
    }

    /// Builds a new item owned by this session's user unless another owner
    /// is given.
    pub fn create_item(&self, mut fields: NewItem) -> Item {
        if fields.user_id.is_none() {
            fields.user_id = Some(self.shared.session.user_id.clone());
        }
        Item::new(fields)
    }

    /// Submits the item's pending changes as one batch.
    ///
    /// Returns `None` when nothing needed submitting. Pending markers are
    /// cleared only after the server accepts the batch, so a failed save can
    /// be retried as is.
    pub async fn save(&self, item: &mut Item) -> Result<Option<Acknowledgement>, SyncError> {
        let batch = OperationBatch::from_item(item, &self.shared.session.user_id)?;

        if batch.is_empty() {
            item.discard_pending();
            return Ok(None);
        }

        let payload = batch.encode()?;
        debug!(
            "Submitting {} operation(s) for item {}",
            batch.len(),
            item.identifier()
        );

        let ack = self
            .shared
            .transport
            .submit_operations(&self.shared.session, payload)
            .await?;

        item.discard_pending();
        Ok(Some(ack))
    }

    /// Receiver for list updates triggered by server pushes.
    pub fn subscribe(&self) -> broadcast::Receiver<ListsUpdated> {
        self.shared.updates.subscribe()
    }

    /// Starts listening for pushes. Each push refreshes this client.
    pub fn start_realtime<C: Connector>(
        &self,
        connector: C,
        server_url: &str,
        config: RealtimeConfig,
    ) -> RealtimeChannel {
        let url = listener_url(server_url, &self.shared.session);
        RealtimeChannel::spawn(connector, url, Arc::clone(&self.shared), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use crate::sync::protocol::{
        ListItemRecord, ListRecord, ShoppingListsResponse, UserDataResponse,
    };
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeTransport {
        snapshot: Mutex<Vec<u8>>,
        submitted: Mutex<Vec<Vec<u8>>>,
        fetches: AtomicUsize,
        reject_submit: AtomicBool,
    }

    impl FakeTransport {
        fn serving(lists: Vec<ListRecord>) -> Self {
            let transport = Self::default();
            transport.serve(lists);
            transport
        }

        fn serve(&self, lists: Vec<ListRecord>) {
            let response = UserDataResponse {
                shopping_lists_response: Some(ShoppingListsResponse { new_lists: lists }),
                ..UserDataResponse::default()
            };
            *self.snapshot.lock().unwrap() = response.encode().unwrap();
        }
    }

    impl Transport for FakeTransport {
        async fn login(&self, credentials: &Credentials) -> Result<Session, SyncError> {
            if credentials.password != "secret" {
                return Err(SyncError::TransportError(
                    "Server returned status 401 Unauthorized".to_string(),
                ));
            }
            Ok(session())
        }

        async fn fetch_user_data(&self, _session: &Session) -> Result<Vec<u8>, SyncError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.snapshot.lock().unwrap().clone())
        }

        async fn submit_operations(
            &self,
            _session: &Session,
            batch: Vec<u8>,
        ) -> Result<Acknowledgement, SyncError> {
            if self.reject_submit.load(Ordering::SeqCst) {
                return Err(SyncError::TransportError("rejected".to_string()));
            }
            self.submitted.lock().unwrap().push(batch);
            Ok(Acknowledgement { status: 200 })
        }
    }

    fn session() -> Session {
        Session {
            signed_user_id: "signed-1".to_string(),
            user_id: "user-1".to_string(),
            client_id: "client-1".to_string(),
        }
    }

    fn groceries(name: &str) -> ListRecord {
        ListRecord {
            identifier: Some("list-1".to_string()),
            name: name.to_string(),
            items: vec![ListItemRecord {
                identifier: Some("item-1".to_string()),
                name: "Eggs".to_string(),
                user_id: Some("user-1".to_string()),
                ..ListItemRecord::default()
            }],
        }
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    async fn logged_in() -> GrocerClient<FakeTransport> {
        GrocerClient::login(
            FakeTransport::serving(vec![groceries("Groceries")]),
            &Credentials::new("me@example.com", "secret"),
            utc(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_login_performs_initial_load() {
        let client = logged_in().await;
        assert_eq!(client.session().user_id, "user-1");
        assert_eq!(client.shared.transport.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(client.lists().len(), 1);
        assert!(client.list_by_name("Groceries").is_some());
    }

    #[tokio::test]
    async fn test_login_failure_is_transport_error() {
        let result = GrocerClient::login(
            FakeTransport::default(),
            &Credentials::new("me@example.com", "wrong"),
            utc(),
        )
        .await;
        assert!(matches!(result, Err(SyncError::TransportError(_))));
    }

    #[tokio::test]
    async fn test_refresh_returns_new_lists() {
        let client = logged_in().await;
        client.shared.transport.serve(vec![groceries("Weekly")]);

        let lists = client.refresh().await.unwrap();
        assert_eq!(lists[0].name, "Weekly");
        assert_eq!(client.list_by_id("list-1").unwrap().name, "Weekly");
    }

    #[tokio::test]
    async fn test_malformed_snapshot_leaves_registry_untouched() {
        let client = logged_in().await;
        *client.shared.transport.snapshot.lock().unwrap() = b"\xff\x00".to_vec();

        let err = client.refresh().await.unwrap_err();
        assert!(matches!(err, SyncError::DecodeError(_)));
        assert_eq!(client.lists()[0].name, "Groceries");
    }

    #[tokio::test]
    async fn test_save_submits_batch_and_clears_pending() {
        let client = logged_in().await;
        let mut item = client.list_by_id("list-1").unwrap().items[0].clone();
        item.set_name("Milk");
        item.set_checked(true);

        let ack = client.save(&mut item).await.unwrap();
        assert_eq!(ack, Some(Acknowledgement { status: 200 }));
        assert!(!item.has_pending_changes());

        let submitted = client.shared.transport.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        let batch = OperationBatch::decode(&submitted[0]).unwrap();
        let handlers: Vec<&str> = batch
            .operations()
            .iter()
            .map(|op| op.handler_id.as_str())
            .collect();
        assert_eq!(handlers, vec!["set-list-item-name", "set-list-item-checked"]);
        assert!(batch.operations().iter().all(|op| op.user_id == "user-1"));
    }

    #[tokio::test]
    async fn test_failed_save_keeps_pending() {
        let client = logged_in().await;
        client.shared.transport.reject_submit.store(true, Ordering::SeqCst);
        let mut item = client.list_by_id("list-1").unwrap().items[0].clone();
        item.set_name("Milk");

        let err = client.save(&mut item).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(item.name(), "Milk");
        assert!(item.has_pending_changes());
    }

    #[tokio::test]
    async fn test_save_without_changes_submits_nothing() {
        let client = logged_in().await;
        let mut item = client.list_by_id("list-1").unwrap().items[0].clone();

        assert_eq!(client.save(&mut item).await.unwrap(), None);
        assert!(client.shared.transport.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_unassigned_item_is_model_error() {
        let client = logged_in().await;
        let mut item = client.create_item(NewItem::named("Bread"));
        item.set_quantity(2).unwrap();

        let err = client.save(&mut item).await.unwrap_err();
        assert!(matches!(err, SyncError::Model(ModelError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_item_defaults_owner() {
        let client = logged_in().await;
        let item = client.create_item(NewItem::named("Bread").in_list("list-1"));
        assert_eq!(item.user_id(), Some("user-1"));

        let other = client.create_item(NewItem {
            user_id: Some("someone".to_string()),
            ..NewItem::named("Jam")
        });
        assert_eq!(other.user_id(), Some("someone"));
    }

    #[tokio::test]
    async fn test_push_refreshes_before_notifying() {
        let client = logged_in().await;
        let mut updates = client.subscribe();
        client.shared.transport.serve(vec![groceries("Pushed")]);

        client.shared.on_refresh_push().await;

        let update = updates.recv().await.unwrap();
        assert_eq!(update.lists[0].name, "Pushed");
        assert_eq!(client.lists()[0].name, "Pushed");
        assert!(updates.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_push_refresh_sends_nothing() {
        let client = logged_in().await;
        let mut updates = client.subscribe();
        *client.shared.transport.snapshot.lock().unwrap() = b"\xff\x00".to_vec();

        client.shared.on_refresh_push().await;
        assert!(updates.try_recv().is_err());
    }
}
