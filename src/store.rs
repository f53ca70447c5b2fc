//! Notification store
//!
//! Authoritative client-side view of the current user's mailbox: an
//! ordered collection (most recent first) plus the unread counter.
//! User mutations are applied optimistically, then confirmed against the
//! backend; a failed confirmation is surfaced to the caller but the local
//! state is NOT rolled back (the next bulk load reconciles).

use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::api::{ListQuery, NotificationBackend};
use crate::types::{CourierError, NotificationRecord, Result};

#[derive(Default)]
struct StoreState {
    /// Most recent first; stable for untouched records
    records: Vec<NotificationRecord>,
    unread: u64,
}

/// In-memory mirror of the user's mailbox
pub struct NotificationStore {
    state: Mutex<StoreState>,
    backend: Arc<dyn NotificationBackend>,
}

impl NotificationStore {
    pub fn new(backend: Arc<dyn NotificationBackend>) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            backend,
        }
    }

    /// Bulk-load the mailbox and unread counter
    ///
    /// Replaces local state on success. On failure local state is left
    /// untouched and the error is returned for an explicit, user-triggered
    /// retry; there is no automatic retry.
    pub async fn load_initial(&self, query: ListQuery) -> Result<()> {
        let page = self.backend.list(query).await?;
        let unread = self.backend.unread_count().await?;

        let mut state = self.state.lock().unwrap();
        debug!(
            records = page.notifications.len(),
            unread, "mailbox loaded"
        );
        state.records = page.notifications;
        state.unread = unread;
        Ok(())
    }

    /// Append a record arriving from the push stream or a later page
    pub fn append(&self, record: NotificationRecord) {
        let mut state = self.state.lock().unwrap();
        if !record.read {
            state.unread += 1;
        }
        debug!(id = %record.id, unread = state.unread, "notification appended");
        state.records.insert(0, record);
    }

    /// Server-authoritative unread counter override (count frames)
    pub fn set_unread_count(&self, count: u64) {
        let mut state = self.state.lock().unwrap();
        state.unread = count;
    }

    /// Mark one record read
    ///
    /// Idempotent on an already-read record (no counter change, no backend
    /// call). Unknown ids are a domain error and issue no backend call.
    pub async fn mark_read(&self, id: &str) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            let Some(record) = state.records.iter_mut().find(|r| r.id == id) else {
                return Err(CourierError::NotFound(id.to_string()));
            };
            if record.read {
                return Ok(());
            }
            record.read = true;
            state.unread = state.unread.saturating_sub(1);
        }

        // Optimistic state stands even if confirmation fails
        if let Err(e) = self.backend.mark_read(id).await {
            warn!(id, error = %e, "mark-read confirmation failed, keeping local state");
            return Err(e);
        }
        Ok(())
    }

    /// Mark every held record read and zero the counter
    pub async fn mark_all_read(&self) -> Result<u64> {
        let marked = {
            let mut state = self.state.lock().unwrap();
            let mut marked = 0u64;
            for record in state.records.iter_mut().filter(|r| !r.read) {
                record.read = true;
                marked += 1;
            }
            state.unread = 0;
            marked
        };

        match self.backend.mark_all_read().await {
            Ok(count) => Ok(count),
            Err(e) => {
                warn!(marked, error = %e, "mark-all-read confirmation failed, keeping local state");
                Err(e)
            }
        }
    }

    /// Remove one record
    ///
    /// Optimistic removal; a failed backend delete is reported but the
    /// record is not restored. Unknown ids are a domain error and issue no
    /// backend call.
    pub async fn delete(&self, id: &str) -> Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            let Some(position) = state.records.iter().position(|r| r.id == id) else {
                return Err(CourierError::NotFound(id.to_string()));
            };
            let removed = state.records.remove(position);
            if !removed.read {
                state.unread = state.unread.saturating_sub(1);
            }
            debug!(id, unread = state.unread, "notification removed");
        }

        if let Err(e) = self.backend.delete(id).await {
            warn!(id, error = %e, "delete confirmation failed, keeping local state");
            return Err(e);
        }
        Ok(())
    }

    /// Copy of the ordered collection, most recent first
    pub fn snapshot(&self) -> Vec<NotificationRecord> {
        self.state.lock().unwrap().records.clone()
    }

    pub fn get(&self, id: &str) -> Option<NotificationRecord> {
        self.state
            .lock()
            .unwrap()
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().records.is_empty()
    }

    pub fn unread_count(&self) -> u64 {
        self.state.lock().unwrap().unread
    }
}
