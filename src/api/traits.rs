//! Core trait for the notification REST surface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{NotificationCategory, NotificationRecord, Priority, Result};

/// Query parameters for listing notifications
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListQuery {
    /// Only return unread records
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unread_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl ListQuery {
    pub fn unread_only() -> Self {
        Self {
            unread_only: true,
            ..Self::default()
        }
    }

    pub fn with_page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}

/// One page of a user's mailbox, most recent first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPage {
    pub notifications: Vec<NotificationRecord>,
    /// Total matching records server-side
    pub count: u64,
    pub has_more: bool,
}

/// Privileged broadcast to many recipients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastRequest {
    pub category: NotificationCategory,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub priority: Priority,
    /// Restrict delivery to holders of any of these roles (empty = all users)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_roles: Vec<String>,
}

/// The notification endpoints consumed by the client
///
/// Implementations must be side-effect-faithful: a 2xx from a mutation
/// endpoint means the server applied it.
#[async_trait]
pub trait NotificationBackend: Send + Sync {
    /// `GET /notifications`
    async fn list(&self, query: ListQuery) -> Result<NotificationPage>;

    /// `GET /notifications/unread-count`
    async fn unread_count(&self) -> Result<u64>;

    /// `PUT /notifications/{id}/read`
    async fn mark_read(&self, id: &str) -> Result<()>;

    /// `PUT /notifications/mark-all-read`, returns the number marked
    async fn mark_all_read(&self) -> Result<u64>;

    /// `DELETE /notifications/{id}`
    async fn delete(&self, id: &str) -> Result<()>;

    /// `POST /notifications/test` (non-production only)
    async fn send_test(&self) -> Result<NotificationRecord>;

    /// `POST /notifications/broadcast` (privileged), returns recipient count
    async fn broadcast(&self, request: BroadcastRequest) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // reqwest encodes `query(&T)` through serde; serde_json is a faithful
    // stand-in for asserting which fields are skipped.
    #[test]
    fn test_list_query_skips_defaults() {
        let query = ListQuery::unread_only().with_page(50, 100);
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["unread_only"], true);
        assert_eq!(value["limit"], 50);
        assert_eq!(value["offset"], 100);

        let value = serde_json::to_value(ListQuery::default()).unwrap();
        assert_eq!(value, serde_json::json!({}));
    }
}
