//! Configuration for courier
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// courier - real-time notification client for the internal banking platform
#[derive(Parser, Debug, Clone)]
#[command(name = "courier")]
#[command(about = "Real-time notification client for the internal banking platform")]
pub struct Args {
    /// Base URL of the platform API
    #[arg(long, env = "COURIER_API_URL", default_value = "http://localhost:8080/api")]
    pub api_url: String,

    /// Push stream URL override
    /// Defaults to <api-url>/notifications/stream
    #[arg(long, env = "COURIER_STREAM_URL")]
    pub stream_url: Option<String>,

    /// Session token issued by the platform auth service
    #[arg(long, env = "COURIER_SESSION_TOKEN")]
    pub session_token: Option<String>,

    /// Delay before a reconnect attempt, in milliseconds
    #[arg(long, env = "COURIER_RECONNECT_DELAY_MS", default_value = "5000")]
    pub reconnect_delay_ms: u64,

    /// Request timeout for REST calls, in milliseconds
    #[arg(long, env = "COURIER_REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Page size for mailbox fetches
    #[arg(long, env = "COURIER_PAGE_LIMIT", default_value = "50")]
    pub page_limit: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Unique identifier for this client instance
    #[arg(long, env = "COURIER_CLIENT_ID", default_value_t = Uuid::new_v4())]
    pub client_id: Uuid,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Connect to the push stream and print notifications as they arrive
    Tail {
        /// Skip the initial mailbox fetch
        #[arg(long)]
        no_backlog: bool,
    },
    /// List notifications in the mailbox
    List {
        /// Only unread notifications
        #[arg(long)]
        unread_only: bool,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
    },
    /// Print the unread count
    UnreadCount,
    /// Mark one notification read
    MarkRead { id: String },
    /// Mark every notification read
    MarkAllRead,
    /// Delete one notification
    Delete { id: String },
    /// Request a test notification (non-production backends only)
    Test,
    /// Send a notification to many users (requires broadcast privileges)
    Broadcast {
        #[arg(long)]
        title: String,
        #[arg(long)]
        message: String,
        /// Category in wire form, e.g. system_maintenance
        #[arg(long, default_value = "system_maintenance")]
        category: String,
        /// Priority in wire form: LOW, MEDIUM, HIGH or URGENT
        #[arg(long, default_value = "MEDIUM")]
        priority: String,
        /// Restrict delivery to holders of any of these roles
        #[arg(long)]
        role: Vec<String>,
    },
}

impl Args {
    /// Effective push stream URL (falls back to the well-known path)
    pub fn stream_url(&self) -> String {
        match &self.stream_url {
            Some(url) => url.clone(),
            None => format!(
                "{}/notifications/stream",
                self.api_url.trim_end_matches('/')
            ),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self
            .session_token
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .is_empty()
        {
            return Err("COURIER_SESSION_TOKEN is required".to_string());
        }

        if self.reconnect_delay_ms == 0 {
            return Err("COURIER_RECONNECT_DELAY_MS must be greater than zero".to_string());
        }

        if self.page_limit == 0 {
            return Err("COURIER_PAGE_LIMIT must be greater than zero".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["courier", "--session-token", "tok"];
        argv.extend_from_slice(extra);
        argv.push("unread-count");
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.api_url, "http://localhost:8080/api");
        assert_eq!(args.reconnect_delay_ms, 5000);
        assert_eq!(args.request_timeout_ms, 30000);
        assert_eq!(args.page_limit, 50);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_stream_url_derived_from_api_url() {
        let args = parse(&["--api-url", "https://bank.internal/api/"]);
        assert_eq!(
            args.stream_url(),
            "https://bank.internal/api/notifications/stream"
        );

        let args = parse(&["--stream-url", "https://push.internal/stream"]);
        assert_eq!(args.stream_url(), "https://push.internal/stream");
    }

    #[test]
    fn test_validate_requires_token() {
        let args = Args::try_parse_from(["courier", "unread-count"]).unwrap();
        assert!(args.validate().is_err());

        let args = Args::try_parse_from(["courier", "--session-token", "  ", "unread-count"])
            .unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_delay() {
        let args = parse(&["--reconnect-delay-ms", "0"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_broadcast_arguments() {
        let args = Args::try_parse_from([
            "courier",
            "--session-token",
            "tok",
            "broadcast",
            "--title",
            "Maintenance",
            "--message",
            "Saturday downtime",
            "--priority",
            "HIGH",
            "--role",
            "ADMIN",
            "--role",
            "EMPLOYEE",
        ])
        .unwrap();

        match args.command {
            Command::Broadcast {
                title,
                priority,
                role,
                ..
            } => {
                assert_eq!(title, "Maintenance");
                assert_eq!(priority, "HIGH");
                assert_eq!(role, vec!["ADMIN".to_string(), "EMPLOYEE".to_string()]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
