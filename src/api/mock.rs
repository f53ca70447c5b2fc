//! Mock notification API for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

use super::traits::{BroadcastRequest, ListQuery, NotificationBackend, NotificationPage};
use crate::types::{CourierError, NotificationCategory, NotificationRecord, Priority, Result};

/// Configurable in-memory API for unit tests
///
/// Records every mutation call so tests can assert confirmation traffic,
/// and can be switched into a failing mode to exercise the
/// optimistic-without-rollback paths.
pub struct MockApi {
    records: Mutex<Vec<NotificationRecord>>,
    unread: AtomicU64,
    failing: AtomicBool,
    recipients: u64,
    list_calls: AtomicU32,
    mark_read_calls: AtomicU32,
    mark_all_read_calls: AtomicU32,
    delete_calls: AtomicU32,
    marked_ids: Mutex<Vec<String>>,
    deleted_ids: Mutex<Vec<String>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            unread: AtomicU64::new(0),
            failing: AtomicBool::new(false),
            recipients: 0,
            list_calls: AtomicU32::new(0),
            mark_read_calls: AtomicU32::new(0),
            mark_all_read_calls: AtomicU32::new(0),
            delete_calls: AtomicU32::new(0),
            marked_ids: Mutex::new(Vec::new()),
            deleted_ids: Mutex::new(Vec::new()),
        }
    }

    /// Seed the mailbox returned by `list`, most recent first
    pub fn with_records(self, records: Vec<NotificationRecord>) -> Self {
        let unread = records.iter().filter(|r| !r.read).count() as u64;
        *self.records.lock().unwrap() = records;
        self.unread.store(unread, Ordering::SeqCst);
        self
    }

    /// Set the recipient count reported by `broadcast`
    pub fn with_recipients(mut self, recipients: u64) -> Self {
        self.recipients = recipients;
        self
    }

    /// Switch every endpoint into a failing mode (HTTP 500)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn mark_read_calls(&self) -> u32 {
        self.mark_read_calls.load(Ordering::SeqCst)
    }

    pub fn mark_all_read_calls(&self) -> u32 {
        self.mark_all_read_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> u32 {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Ids passed to `mark_read`, in call order
    pub fn marked_ids(&self) -> Vec<String> {
        self.marked_ids.lock().unwrap().clone()
    }

    /// Ids passed to `delete`, in call order
    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted_ids.lock().unwrap().clone()
    }

    fn check_failing(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CourierError::Api {
                status: 500,
                message: "mock failure".into(),
            });
        }
        Ok(())
    }
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a notification record for tests
pub fn sample_record(id: &str, read: bool) -> NotificationRecord {
    NotificationRecord {
        id: id.to_string(),
        user_id: "emp-42".into(),
        category: NotificationCategory::TransactionReceived,
        title: format!("Notification {id}"),
        message: "You received a transfer".into(),
        priority: Priority::Medium,
        read,
        data: HashMap::new(),
        created_at: Utc::now(),
        expires_at: None,
    }
}

#[async_trait]
impl NotificationBackend for MockApi {
    async fn list(&self, query: ListQuery) -> Result<NotificationPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;

        let records = self.records.lock().unwrap();
        let matching: Vec<NotificationRecord> = records
            .iter()
            .filter(|r| !query.unread_only || !r.read)
            .cloned()
            .collect();
        let count = matching.len() as u64;

        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let page: Vec<NotificationRecord> =
            matching.into_iter().skip(offset).take(limit).collect();
        let has_more = offset + page.len() < count as usize;

        Ok(NotificationPage {
            notifications: page,
            count,
            has_more,
        })
    }

    async fn unread_count(&self) -> Result<u64> {
        self.check_failing()?;
        Ok(self.unread.load(Ordering::SeqCst))
    }

    async fn mark_read(&self, id: &str) -> Result<()> {
        self.mark_read_calls.fetch_add(1, Ordering::SeqCst);
        self.marked_ids.lock().unwrap().push(id.to_string());
        self.check_failing()?;

        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.iter_mut().find(|r| r.id == id) {
            if !record.read {
                record.read = true;
                self.unread.fetch_sub(1, Ordering::SeqCst);
            }
            Ok(())
        } else {
            Err(CourierError::NotFound(id.to_string()))
        }
    }

    async fn mark_all_read(&self) -> Result<u64> {
        self.mark_all_read_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;

        let mut records = self.records.lock().unwrap();
        let mut marked = 0;
        for record in records.iter_mut().filter(|r| !r.read) {
            record.read = true;
            marked += 1;
        }
        self.unread.store(0, Ordering::SeqCst);
        Ok(marked)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.deleted_ids.lock().unwrap().push(id.to_string());
        self.check_failing()?;

        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(CourierError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn send_test(&self) -> Result<NotificationRecord> {
        self.check_failing()?;
        Ok(sample_record("test-notification", false))
    }

    async fn broadcast(&self, _request: BroadcastRequest) -> Result<u64> {
        self.check_failing()?;
        Ok(self.recipients)
    }
}
