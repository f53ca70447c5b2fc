//! courier - notification client CLI for the internal banking platform

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courier::api::{BroadcastRequest, ListQuery, NotificationApi, NotificationBackend};
use courier::config::{Args, Command};
use courier::session::SessionContext;
use courier::types::{NotificationCategory, NotificationRecord, Priority};
use courier::Courier;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("courier={},info", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let token = args.session_token.clone().unwrap_or_default();
    let session = match SessionContext::from_token(token) {
        Ok(session) => Arc::new(session),
        Err(e) => {
            error!("Session error: {}", e);
            std::process::exit(1);
        }
    };
    if session.is_expired() {
        warn!("Session token is expired; the backend will reject calls");
    }

    match args.command.clone() {
        Command::Tail { no_backlog } => tail(&args, session, no_backlog).await,
        Command::List {
            unread_only,
            limit,
            offset,
        } => {
            let api = api_for(&args, session);
            let query = ListQuery {
                unread_only,
                limit: limit.or(Some(args.page_limit)),
                offset,
            };
            let page = api.list(query).await?;
            for record in &page.notifications {
                print_record(record);
            }
            println!(
                "{} of {} notification(s) shown{}",
                page.notifications.len(),
                page.count,
                if page.has_more {
                    ", more available (use --offset)"
                } else {
                    ""
                }
            );
            Ok(())
        }
        Command::UnreadCount => {
            let api = api_for(&args, session);
            println!("{}", api.unread_count().await?);
            Ok(())
        }
        Command::MarkRead { id } => {
            let api = api_for(&args, session);
            api.mark_read(&id).await?;
            println!("marked {id} read");
            Ok(())
        }
        Command::MarkAllRead => {
            let api = api_for(&args, session);
            let count = api.mark_all_read().await?;
            println!("marked {count} notification(s) read");
            Ok(())
        }
        Command::Delete { id } => {
            let api = api_for(&args, session);
            api.delete(&id).await?;
            println!("deleted {id}");
            Ok(())
        }
        Command::Test => {
            let api = api_for(&args, session);
            let record = api.send_test().await?;
            print_record(&record);
            Ok(())
        }
        Command::Broadcast {
            title,
            message,
            category,
            priority,
            role,
        } => {
            let category: NotificationCategory = parse_wire("category", &category)?;
            let priority: Priority = parse_wire("priority", &priority)?;

            let api = api_for(&args, session);
            let recipients = api
                .broadcast(BroadcastRequest {
                    category,
                    title,
                    message,
                    priority,
                    target_roles: role,
                })
                .await?;
            println!("broadcast delivered to {recipients} recipient(s)");
            Ok(())
        }
    }
}

/// Stream notifications to the terminal until Ctrl-C
async fn tail(args: &Args, session: Arc<SessionContext>, no_backlog: bool) -> anyhow::Result<()> {
    let client = Courier::new(args, Arc::clone(&session));

    info!("======================================");
    info!("  courier - notification client");
    info!("======================================");
    info!(
        "User: {} ({})",
        session.user().display_name,
        session.user().user_id
    );
    info!("API: {}", args.api_url);
    info!("Stream: {}", args.stream_url());
    info!("Client ID: {}", args.client_id);
    info!("Reconnect delay: {}ms", args.reconnect_delay_ms);
    info!("======================================");

    if !no_backlog {
        let query = ListQuery::default().with_page(args.page_limit, 0);
        if let Err(e) = client.sync(query).await {
            error!("Initial mailbox load failed: {} (re-run to retry)", e);
            std::process::exit(1);
        }
        // Oldest first so the newest ends up nearest the prompt
        for record in client.store().snapshot().iter().rev() {
            print_record(record);
        }
        info!(unread = client.store().unread_count(), "mailbox loaded");
    }

    let _notifications = client
        .hub()
        .subscribe_notifications(|record| print_record(record));
    let _counts = client
        .hub()
        .subscribe_unread_count(|count| info!(unread = count, "unread count changed"));

    client.start();
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    client.stop().await;
    Ok(())
}

fn api_for(args: &Args, session: Arc<SessionContext>) -> NotificationApi {
    NotificationApi::new(
        &args.api_url,
        session,
        Duration::from_millis(args.request_timeout_ms),
    )
}

/// Parse a wire-form enum value (e.g. "URGENT", "system_maintenance")
fn parse_wire<T: serde::de::DeserializeOwned>(kind: &str, value: &str) -> anyhow::Result<T> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| anyhow::anyhow!("invalid {kind}: {value}"))
}

fn print_record(record: &NotificationRecord) {
    println!(
        "{} [{}] {}: {} (id {})",
        record.created_at.format("%Y-%m-%d %H:%M:%S"),
        record.priority,
        record.title,
        record.message,
        record.id
    );
}
