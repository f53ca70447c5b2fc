//! Client composition root
//!
//! Builds and wires the notification components for one session: the REST
//! backend, the subscription hub, the store and the push transport. All
//! wiring is explicit dependency injection; nothing is process-global, so
//! several independent sessions can coexist in one process.

use std::sync::Arc;
use std::time::Duration;

use crate::api::{ListQuery, NotificationApi, NotificationBackend};
use crate::config::Args;
use crate::hub::{Subscription, SubscriptionHub};
use crate::session::SessionContext;
use crate::store::NotificationStore;
use crate::transport::{ConnectionState, NotificationTransport, SseConnector, StreamConnector};
use crate::types::Result;

/// One user session's notification client
pub struct Courier {
    hub: Arc<SubscriptionHub>,
    store: Arc<NotificationStore>,
    transport: Arc<NotificationTransport>,
    backend: Arc<dyn NotificationBackend>,
    /// Store wiring registrations, kept for the session lifetime
    _wiring: Vec<Subscription>,
}

impl Courier {
    /// Build a client against the real backend
    pub fn new(args: &Args, session: Arc<SessionContext>) -> Self {
        let backend: Arc<dyn NotificationBackend> = Arc::new(NotificationApi::new(
            &args.api_url,
            Arc::clone(&session),
            Duration::from_millis(args.request_timeout_ms),
        ));
        let connector: Arc<dyn StreamConnector> =
            Arc::new(SseConnector::new(args.stream_url(), session));

        Self::with_parts(
            backend,
            connector,
            Duration::from_millis(args.reconnect_delay_ms),
        )
    }

    /// Build a client from explicit parts (tests, alternate transports)
    pub fn with_parts(
        backend: Arc<dyn NotificationBackend>,
        connector: Arc<dyn StreamConnector>,
        reconnect_delay: Duration,
    ) -> Self {
        let hub = Arc::new(SubscriptionHub::new());
        let store = Arc::new(NotificationStore::new(Arc::clone(&backend)));
        let transport = Arc::new(NotificationTransport::new(
            connector,
            Arc::clone(&hub),
            reconnect_delay,
        ));

        // Store wiring registers first so it runs before any consumer
        // listener and those see up-to-date store state
        let mut wiring = Vec::new();
        {
            let store = Arc::clone(&store);
            wiring.push(hub.subscribe_notifications(move |record| store.append(record.clone())));
        }
        {
            let store = Arc::clone(&store);
            wiring.push(hub.subscribe_unread_count(move |count| store.set_unread_count(count)));
        }

        Self {
            hub,
            store,
            transport,
            backend,
            _wiring: wiring,
        }
    }

    /// Bulk-load the mailbox; failures are returned for an explicit retry
    pub async fn sync(&self, query: ListQuery) -> Result<()> {
        self.store.load_initial(query).await
    }

    /// Open the push connection (idempotent)
    pub fn start(&self) {
        self.transport.start();
    }

    /// Close the push connection and cancel any pending reconnect
    pub async fn stop(&self) {
        self.transport.stop().await;
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.transport.state()
    }

    pub fn hub(&self) -> &Arc<SubscriptionHub> {
        &self.hub
    }

    pub fn store(&self) -> &Arc<NotificationStore> {
        &self.store
    }

    pub fn backend(&self) -> &Arc<dyn NotificationBackend> {
        &self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio_test::assert_ok;

    use crate::api::mock::{sample_record, MockApi};
    use crate::transport::{MockConnector, ScriptedConnection};

    fn client_with_held_stream() -> (Courier, Arc<MockApi>, Arc<MockConnector>) {
        let api = Arc::new(MockApi::new());
        let connector = Arc::new(MockConnector::with_script(vec![ScriptedConnection::Held]));
        let client = Courier::with_parts(
            Arc::clone(&api) as Arc<dyn NotificationBackend>,
            Arc::clone(&connector) as Arc<dyn StreamConnector>,
            Duration::from_millis(5000),
        );
        (client, api, connector)
    }

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_urgent_notification_reaches_store() {
        let (client, _api, connector) = client_with_held_stream();
        client.start();
        settle().await;
        assert_eq!(client.connection_state(), ConnectionState::Connected);

        let frame = serde_json::json!({
            "kind": "notification",
            "payload": {
                "id": "n1",
                "user_id": "emp-42",
                "category": "security_alert",
                "title": "New sign-in",
                "message": "A new device signed in to your account",
                "priority": "URGENT",
                "read": false,
                "created_at": "2026-03-01T12:00:00Z"
            }
        })
        .to_string();
        connector.push_line(frame);
        settle().await;

        assert_eq!(client.store().unread_count(), 1);
        assert_eq!(client.store().snapshot()[0].id, "n1");

        client.stop().await;
    }

    #[tokio::test]
    async fn test_count_frame_overrides_store_counter() {
        let (client, _api, connector) = client_with_held_stream();
        client.start();
        settle().await;

        connector.push_line(
            serde_json::json!({"kind": "unread_count", "payload": 9}).to_string(),
        );
        settle().await;

        assert_eq!(client.store().unread_count(), 9);
        client.stop().await;
    }

    #[tokio::test]
    async fn test_consumer_listener_sees_store_already_updated() {
        let (client, _api, connector) = client_with_held_stream();

        let observed = Arc::new(Mutex::new(Vec::new()));
        let sub = {
            let observed = Arc::clone(&observed);
            let store = Arc::clone(client.store());
            client.hub().subscribe_notifications(move |record| {
                observed
                    .lock()
                    .unwrap()
                    .push((record.id.clone(), store.unread_count()));
            })
        };

        client.start();
        settle().await;
        connector.push_line(
            serde_json::json!({
                "kind": "notification",
                "payload": {
                    "id": "n1",
                    "user_id": "emp-42",
                    "category": "transaction_received",
                    "title": "Transfer",
                    "message": "You received $5.00",
                    "priority": "LOW",
                    "read": false,
                    "created_at": "2026-03-01T12:00:00Z"
                }
            })
            .to_string(),
        );
        settle().await;

        // Store wiring ran first: the consumer saw the incremented counter
        assert_eq!(*observed.lock().unwrap(), vec![("n1".to_string(), 1)]);

        sub.unsubscribe();
        client.stop().await;
    }

    #[tokio::test]
    async fn test_sync_loads_mailbox_through_backend() {
        let api = Arc::new(MockApi::new().with_records(vec![
            sample_record("n2", false),
            sample_record("n1", true),
        ]));
        let connector = Arc::new(MockConnector::new());
        let client = Courier::with_parts(
            Arc::clone(&api) as Arc<dyn NotificationBackend>,
            connector as Arc<dyn StreamConnector>,
            Duration::from_millis(5000),
        );

        tokio_test::assert_ok!(client.sync(ListQuery::default()).await);
        assert_eq!(client.store().len(), 2);
        assert_eq!(client.store().unread_count(), 1);
        assert_eq!(api.list_calls(), 1);
    }
}
