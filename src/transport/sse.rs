//! Server-sent-event stream connector
//!
//! Opens the push endpoint with `Accept: text/event-stream` and turns the
//! byte stream into frame lines. The framing is tolerant: plain
//! newline-delimited JSON and SSE `data:`-prefixed lines both yield
//! payloads; comment/keepalive lines and the other SSE fields are skipped.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, Stream};
use futures_util::StreamExt;
use reqwest::{header, Client};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{FrameStream, StreamConnector};
use crate::session::SessionContext;
use crate::types::{CourierError, Result};

/// Production connector for the push stream endpoint
pub struct SseConnector {
    client: Client,
    url: String,
    session: Arc<SessionContext>,
}

impl SseConnector {
    pub fn new(url: impl Into<String>, session: Arc<SessionContext>) -> Self {
        // No request timeout: the stream is long-lived by design
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            url: url.into(),
            session,
        }
    }
}

#[async_trait]
impl StreamConnector for SseConnector {
    async fn connect(&self) -> Result<FrameStream> {
        debug!(url = %self.url, "opening push stream");

        let response = self
            .client
            .get(&self.url)
            .header(header::ACCEPT, "text/event-stream")
            .header(header::AUTHORIZATION, self.session.bearer())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(CourierError::Api { status, message });
        }

        Ok(Box::pin(frame_lines(response.bytes_stream())))
    }
}

struct Framer<S> {
    source: Pin<Box<S>>,
    buffer: String,
    pending: VecDeque<String>,
    done: bool,
}

/// Split a byte stream into frame payload lines
///
/// Lines may arrive fragmented across chunks; a final unterminated line is
/// flushed when the stream ends. A source error is surfaced once, then the
/// stream ends (the transport owns reconnection).
pub(crate) fn frame_lines<S, E>(bytes: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let framer = Framer {
        source: Box::pin(bytes),
        buffer: String::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(framer, |mut framer| async move {
        loop {
            if let Some(line) = framer.pending.pop_front() {
                return Some((Ok(line), framer));
            }
            if framer.done {
                return None;
            }

            match framer.source.next().await {
                Some(Ok(chunk)) => {
                    framer.buffer.push_str(&String::from_utf8_lossy(&chunk));
                    while let Some(pos) = framer.buffer.find('\n') {
                        let raw: String = framer.buffer.drain(..=pos).collect();
                        if let Some(payload) = payload_of(&raw) {
                            framer.pending.push_back(payload);
                        }
                    }
                }
                Some(Err(e)) => {
                    framer.done = true;
                    return Some((Err(CourierError::Transport(e.to_string())), framer));
                }
                None => {
                    framer.done = true;
                    let tail = std::mem::take(&mut framer.buffer);
                    if let Some(payload) = payload_of(&tail) {
                        framer.pending.push_back(payload);
                    }
                }
            }
        }
    })
}

/// Extract the frame payload from one raw line, if it carries one
fn payload_of(raw: &str) -> Option<String> {
    let line = raw.trim_end_matches(['\n', '\r']);
    if line.is_empty() {
        return None;
    }
    // SSE comment, used by the server as a keepalive
    if line.starts_with(':') {
        return None;
    }
    if let Some(rest) = line.strip_prefix("data:") {
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        return (!rest.is_empty()).then(|| rest.to_string());
    }
    // Non-data SSE fields carry no payload
    if line.starts_with("event:") || line.starts_with("id:") || line.starts_with("retry:") {
        return None;
    }
    Some(line.to_string())
}
