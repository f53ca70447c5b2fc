//! Notification REST API layer
//!
//! Trait-based seam over the backend's notification endpoints so the
//! store and client can be exercised without a network:
//! - `NotificationApi`: reqwest implementation against the real backend
//! - `MockApi`: configurable in-memory implementation for tests

pub mod mock;
pub mod rest;
pub mod traits;

pub use mock::MockApi;
pub use rest::NotificationApi;
pub use traits::{BroadcastRequest, ListQuery, NotificationBackend, NotificationPage};
