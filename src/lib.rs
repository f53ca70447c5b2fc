//! courier - real-time notification client for the internal banking platform
//!
//! courier mirrors a user's notification mailbox on the client: it keeps one
//! live push connection to the backend, fans inbound events out to
//! subscribers, and maintains an optimistic in-memory view of the mailbox
//! that user actions mutate ahead of backend confirmation.
//!
//! ## Components
//!
//! - **Transport**: one push connection per session, fixed-delay reconnect
//! - **Hub**: registration-order fan-out to independent listeners
//! - **Store**: ordered mailbox mirror with an unread counter
//! - **Api**: typed REST client for the notification endpoints
//! - **Access**: pure visibility filter for the navigation menu

pub mod access;
pub mod api;
pub mod client;
pub mod config;
pub mod hub;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;

pub use client::Courier;
pub use config::{Args, Command};
pub use types::{CourierError, Result};
