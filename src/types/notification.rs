//! Notification records and push frames
//!
//! Wire types shared by the REST API and the push stream. Records are
//! created server-side and delivered either in bulk (initial fetch) or
//! one at a time over the push connection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Closed set of notification categories produced by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// Money arrived from another employee
    TransactionReceived,
    /// Outgoing transfer was posted
    TransactionSent,
    /// Someone requested money from this user
    MoneyRequestReceived,
    /// A money request this user sent was approved
    MoneyRequestApproved,
    /// A money request this user sent was declined
    MoneyRequestDeclined,
    /// A contribution was made to an event this user participates in
    EventContribution,
    /// An event funding deadline is close
    EventDeadlineApproaching,
    /// An event was closed and settled
    EventClosed,
    /// Platform maintenance announcement
    SystemMaintenance,
    /// Security-relevant account activity
    SecurityAlert,
}

/// Notification priority, ordered from least to most important
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
    Urgent,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "LOW"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::High => write!(f, "HIGH"),
            Priority::Urgent => write!(f, "URGENT"),
        }
    }
}

/// A single notification in a user's mailbox
///
/// The `id` is server-assigned and unique per mailbox. `data` carries
/// category-specific references (transaction id, event id, ...) that the
/// client treats as opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub user_id: String,
    pub category: NotificationCategory,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub read: bool,
    /// Category-specific payload, opaque to the client
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    /// Server-side expiry; never enforced client-side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// One discrete message on the push connection
///
/// Frames arrive as newline-delimited JSON: `{"kind": ..., "payload": ...}`.
/// Unknown kinds fail to parse here and are discarded by the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum PushFrame {
    /// A new notification for the connected user
    Notification(Box<NotificationRecord>),
    /// Server-authoritative unread counter
    UnreadCount(u64),
}
