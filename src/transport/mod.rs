//! Notification push transport
//!
//! Owns the single live push connection for a session. Inbound frames are
//! decoded and handed to the [`SubscriptionHub`]; connection loss schedules
//! exactly one reconnect attempt after a fixed delay, indefinitely, until
//! `stop()` is called. The wire connection is abstracted behind
//! [`StreamConnector`] so the transport runs against an SSE stream in
//! production and an in-memory stream in tests (or a different transport
//! entirely) without touching store or hub logic.

pub mod mock;
pub mod sse;

pub use mock::{MockConnector, ScriptedConnection};
pub use sse::SseConnector;

use async_trait::async_trait;
use futures::Stream;
use futures_util::StreamExt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::hub::SubscriptionHub;
use crate::types::{PushFrame, Result};

/// Stream of raw frame lines from one push connection
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Minimal push-connection abstraction
///
/// `connect` opens one connection and returns the line stream; the stream
/// ending or yielding an error means the connection is gone.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self) -> Result<FrameStream>;
}

/// Connection lifecycle state, owned exclusively by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    ReconnectPending = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::ReconnectPending,
            _ => Self::Disconnected,
        }
    }
}

/// Push transport: at most one active connection per session
pub struct NotificationTransport {
    connector: Arc<dyn StreamConnector>,
    hub: Arc<SubscriptionHub>,
    reconnect_delay: Duration,
    state: AtomicU8,
    shutdown: Mutex<Option<watch::Sender<bool>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationTransport {
    pub fn new(
        connector: Arc<dyn StreamConnector>,
        hub: Arc<SubscriptionHub>,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            connector,
            hub,
            reconnect_delay,
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
            shutdown: Mutex::new(None),
            task: Mutex::new(None),
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Open the push connection
    ///
    /// Idempotent: a no-op while a connection attempt, live connection or
    /// scheduled reconnect exists.
    pub fn start(self: &Arc<Self>) {
        if self
            .state
            .compare_exchange(
                ConnectionState::Disconnected as u8,
                ConnectionState::Connecting as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            debug!("transport already running, start ignored");
            return;
        }

        let (tx, rx) = watch::channel(false);
        *self.shutdown.lock().unwrap() = Some(tx);

        let transport = Arc::clone(self);
        let handle = tokio::spawn(async move {
            transport.run(rx).await;
        });
        *self.task.lock().unwrap() = Some(handle);
    }

    /// Close the connection and cancel any pending reconnect
    ///
    /// Idempotent and safe from any state; waits for the connection task to
    /// finish so a following `start()` opens a fresh connection.
    pub async fn stop(&self) {
        let sender = self.shutdown.lock().unwrap().take();
        if let Some(tx) = sender {
            let _ = tx.send(true);
        }

        let handle = self.task.lock().unwrap().take();
        if let Some(handle) = handle {
            if handle.await.is_err() {
                warn!("transport task terminated abnormally");
            }
        }
        self.set_state(ConnectionState::Disconnected);
    }

    async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        'session: loop {
            self.set_state(ConnectionState::Connecting);
            let connected = tokio::select! {
                _ = shutdown.changed() => break 'session,
                result = self.connector.connect() => result,
            };

            match connected {
                Ok(mut frames) => {
                    self.set_state(ConnectionState::Connected);
                    info!("push stream connected");
                    loop {
                        tokio::select! {
                            _ = shutdown.changed() => break 'session,
                            frame = frames.next() => match frame {
                                Some(Ok(line)) => self.handle_line(&line),
                                Some(Err(e)) => {
                                    warn!(error = %e, "push stream error");
                                    break;
                                }
                                None => {
                                    info!("push stream closed by server");
                                    break;
                                }
                            }
                        }
                    }
                }
                Err(e) => warn!(error = %e, "push connection attempt failed"),
            }

            // One reconnect attempt per loss, after a fixed delay, forever
            self.set_state(ConnectionState::ReconnectPending);
            debug!(
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "reconnect scheduled"
            );
            tokio::select! {
                _ = shutdown.changed() => break 'session,
                () = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
        self.set_state(ConnectionState::Disconnected);
    }

    /// Decode one frame line and publish it; malformed input is discarded
    fn handle_line(&self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        match serde_json::from_str::<PushFrame>(line) {
            Ok(PushFrame::Notification(record)) => {
                debug!(id = %record.id, priority = %record.priority, "notification frame");
                self.hub.publish_notification(&record);
            }
            Ok(PushFrame::UnreadCount(count)) => {
                debug!(count, "unread-count frame");
                self.hub.publish_unread_count(count);
            }
            Err(e) => warn!(error = %e, "discarding malformed push frame"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use crate::types::NotificationRecord;

    fn notification_json(id: &str, priority: &str) -> String {
        serde_json::json!({
            "kind": "notification",
            "payload": {
                "id": id,
                "user_id": "emp-42",
                "category": "transaction_received",
                "title": "You received a transfer",
                "message": "Jordan sent you $25.00",
                "priority": priority,
                "read": false,
                "created_at": "2026-03-01T12:00:00Z"
            }
        })
        .to_string()
    }

    fn unread_json(count: u64) -> String {
        serde_json::json!({"kind": "unread_count", "payload": count}).to_string()
    }

    struct Fixture {
        connector: Arc<MockConnector>,
        transport: Arc<NotificationTransport>,
        records: Arc<StdMutex<Vec<NotificationRecord>>>,
        counts: Arc<StdMutex<Vec<u64>>>,
    }

    fn fixture(script: Vec<ScriptedConnection>, delay_ms: u64) -> Fixture {
        let connector = Arc::new(MockConnector::with_script(script));
        let hub = Arc::new(SubscriptionHub::new());

        let records = Arc::new(StdMutex::new(Vec::new()));
        let counts = Arc::new(StdMutex::new(Vec::new()));
        {
            let records = Arc::clone(&records);
            hub.subscribe_notifications(move |r| records.lock().unwrap().push(r.clone()));
        }
        {
            let counts = Arc::clone(&counts);
            hub.subscribe_unread_count(move |c| counts.lock().unwrap().push(c));
        }

        let transport = Arc::new(NotificationTransport::new(
            Arc::clone(&connector) as Arc<dyn StreamConnector>,
            hub,
            Duration::from_millis(delay_ms),
        ));

        Fixture {
            connector,
            transport,
            records,
            counts,
        }
    }

    /// Let the connection task run until it blocks
    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_frames_flow_to_subscribers() {
        let fx = fixture(vec![ScriptedConnection::Held], 5000);
        fx.transport.start();
        settle().await;
        assert_eq!(fx.transport.state(), ConnectionState::Connected);

        fx.connector.push_line(notification_json("n1", "URGENT"));
        fx.connector.push_line(notification_json("n2", "LOW"));
        fx.connector.push_line(unread_json(2));
        settle().await;

        let records = fx.records.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "n1");
        assert_eq!(records[1].id, "n2");
        drop(records);
        assert_eq!(*fx.counts.lock().unwrap(), vec![2]);

        fx.transport.stop().await;
    }

    #[tokio::test]
    async fn test_malformed_frames_discarded_without_dropping_connection() {
        let fx = fixture(vec![ScriptedConnection::Held], 5000);
        fx.transport.start();
        settle().await;

        fx.connector.push_line("this is not json");
        fx.connector.push_line(r#"{"kind": "presence", "payload": 1}"#);
        fx.connector.push_line(notification_json("n1", "MEDIUM"));
        settle().await;

        assert_eq!(fx.transport.state(), ConnectionState::Connected);
        let records = fx.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "n1");
        drop(records);

        fx.transport.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_waits_exactly_the_fixed_delay() {
        // Empty script: every connection attempt fails
        let fx = fixture(vec![], 5000);
        fx.transport.start();
        settle().await;

        assert_eq!(fx.connector.connect_attempts(), 1);
        assert_eq!(fx.transport.state(), ConnectionState::ReconnectPending);

        tokio::time::advance(Duration::from_millis(4999)).await;
        settle().await;
        assert_eq!(fx.connector.connect_attempts(), 1);

        tokio::time::advance(Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(fx.connector.connect_attempts(), 2);

        // Exactly one attempt per scheduled reconnect
        settle().await;
        assert_eq!(fx.connector.connect_attempts(), 2);

        fx.transport.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_close_triggers_reconnect() {
        let fx = fixture(
            vec![
                ScriptedConnection::Frames(vec![Ok(unread_json(4))]),
                ScriptedConnection::Held,
            ],
            5000,
        );
        fx.transport.start();
        settle().await;

        // First connection delivered its frame, then the server closed it
        assert_eq!(*fx.counts.lock().unwrap(), vec![4]);
        assert_eq!(fx.connector.connect_attempts(), 1);
        assert_eq!(fx.transport.state(), ConnectionState::ReconnectPending);

        tokio::time::advance(Duration::from_millis(5000)).await;
        settle().await;
        assert_eq!(fx.connector.connect_attempts(), 2);
        assert_eq!(fx.transport.state(), ConnectionState::Connected);

        fx.transport.stop().await;
    }

    #[tokio::test]
    async fn test_stream_error_schedules_reconnect() {
        let fx = fixture(vec![ScriptedConnection::Held], 5000);
        fx.transport.start();
        settle().await;
        assert_eq!(fx.transport.state(), ConnectionState::Connected);

        fx.connector.push_error("connection reset");
        settle().await;
        assert_eq!(fx.transport.state(), ConnectionState::ReconnectPending);

        fx.transport.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_reconnect() {
        let fx = fixture(vec![], 5000);
        fx.transport.start();
        settle().await;
        assert_eq!(fx.transport.state(), ConnectionState::ReconnectPending);

        fx.transport.stop().await;
        assert_eq!(fx.transport.state(), ConnectionState::Disconnected);

        tokio::time::advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(fx.connector.connect_attempts(), 1);
    }

    #[tokio::test]
    async fn test_start_is_idempotent_while_running() {
        let fx = fixture(vec![ScriptedConnection::Held], 5000);
        fx.transport.start();
        settle().await;
        assert_eq!(fx.transport.state(), ConnectionState::Connected);

        fx.transport.start();
        settle().await;
        assert_eq!(fx.connector.connect_attempts(), 1);

        fx.transport.stop().await;
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_from_any_state() {
        let fx = fixture(vec![ScriptedConnection::Held], 5000);

        // Never started
        fx.transport.stop().await;
        assert_eq!(fx.transport.state(), ConnectionState::Disconnected);

        fx.transport.start();
        settle().await;
        fx.transport.stop().await;
        fx.transport.stop().await;
        assert_eq!(fx.transport.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_restart_after_stop_opens_fresh_connection() {
        let fx = fixture(
            vec![ScriptedConnection::Held, ScriptedConnection::Held],
            5000,
        );
        fx.transport.start();
        settle().await;
        fx.transport.stop().await;

        fx.transport.start();
        settle().await;
        assert_eq!(fx.connector.connect_attempts(), 2);
        assert_eq!(fx.transport.state(), ConnectionState::Connected);

        fx.transport.stop().await;
    }
}
