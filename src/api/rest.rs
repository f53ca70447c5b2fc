//! REST implementation of the notification API.

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::traits::{BroadcastRequest, ListQuery, NotificationBackend, NotificationPage};
use crate::session::SessionContext;
use crate::types::{CourierError, NotificationRecord, Result};

/// Notification API client
///
/// Thin typed wrapper over the backend's REST surface. Paths are fixed;
/// the base URL comes from configuration.
pub struct NotificationApi {
    client: Client,
    base_url: String,
    session: Arc<SessionContext>,
}

#[derive(Debug, Deserialize)]
struct UnreadCountResponse {
    unread_count: u64,
}

#[derive(Debug, Deserialize)]
struct MarkAllReadResponse {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct TestResponse {
    notification: NotificationRecord,
}

#[derive(Debug, Deserialize)]
struct BroadcastResponse {
    recipients_count: u64,
}

impl NotificationApi {
    /// Create a new API client
    pub fn new(base_url: impl Into<String>, session: Arc<SessionContext>, timeout: Duration) -> Self {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    fn notifications_url(&self) -> String {
        format!("{}/notifications", self.base_url)
    }

    fn notification_url(&self, id: &str, suffix: &str) -> String {
        format!("{}/notifications/{}{}", self.base_url, id, suffix)
    }

    fn auth_header(&self) -> String {
        self.session.bearer()
    }

    /// Map a non-2xx response to a courier error
    async fn error_for(response: Response) -> CourierError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                CourierError::Auth(format!("HTTP {}: {}", status.as_u16(), body))
            }
            StatusCode::NOT_FOUND => CourierError::NotFound(body),
            _ => CourierError::Api {
                status: status.as_u16(),
                message: body,
            },
        }
    }
}

#[async_trait]
impl NotificationBackend for NotificationApi {
    async fn list(&self, query: ListQuery) -> Result<NotificationPage> {
        let response = self
            .client
            .get(self.notifications_url())
            .header(header::AUTHORIZATION, self.auth_header())
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let page: NotificationPage = response.json().await?;
        debug!(
            returned = page.notifications.len(),
            total = page.count,
            "fetched notification page"
        );
        Ok(page)
    }

    async fn unread_count(&self) -> Result<u64> {
        let url = format!("{}/unread-count", self.notifications_url());
        let response = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, self.auth_header())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body: UnreadCountResponse = response.json().await?;
        Ok(body.unread_count)
    }

    async fn mark_read(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .put(self.notification_url(id, "/read"))
            .header(header::AUTHORIZATION, self.auth_header())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<u64> {
        let url = format!("{}/mark-all-read", self.notifications_url());
        let response = self
            .client
            .put(url)
            .header(header::AUTHORIZATION, self.auth_header())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body: MarkAllReadResponse = response.json().await?;
        Ok(body.count)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.notification_url(id, ""))
            .header(header::AUTHORIZATION, self.auth_header())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }
        Ok(())
    }

    async fn send_test(&self) -> Result<NotificationRecord> {
        let url = format!("{}/test", self.notifications_url());
        let response = self
            .client
            .post(url)
            .header(header::AUTHORIZATION, self.auth_header())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body: TestResponse = response.json().await?;
        Ok(body.notification)
    }

    async fn broadcast(&self, request: BroadcastRequest) -> Result<u64> {
        let url = format!("{}/broadcast", self.notifications_url());
        let response = self
            .client
            .post(url)
            .header(header::AUTHORIZATION, self.auth_header())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body: BroadcastResponse = response.json().await?;
        Ok(body.recipients_count)
    }
}
