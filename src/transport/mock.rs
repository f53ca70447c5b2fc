//! Mock stream connector for testing.

use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{FrameStream, StreamConnector};
use crate::types::{CourierError, Result};

/// One scripted outcome for a `connect()` call
pub enum ScriptedConnection {
    /// The connection attempt itself fails
    Fail(String),
    /// The stream yields these items, then the server closes it
    Frames(Vec<Result<String>>),
    /// The stream stays open; drive it with `push_line`/`push_error`/
    /// `close_stream`
    Held,
}

/// Scripted connector for transport tests
///
/// Each `connect()` consumes the next scripted connection; an exhausted
/// script fails the attempt, which keeps reconnect loops countable.
pub struct MockConnector {
    script: Mutex<VecDeque<ScriptedConnection>>,
    connect_attempts: AtomicU32,
    feed: Mutex<Option<mpsc::UnboundedSender<Result<String>>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::with_script(Vec::new())
    }

    pub fn with_script(script: Vec<ScriptedConnection>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            connect_attempts: AtomicU32::new(0),
            feed: Mutex::new(None),
        }
    }

    /// Queue another scripted connection
    pub fn push_session(&self, connection: ScriptedConnection) {
        self.script.lock().unwrap().push_back(connection);
    }

    /// Number of `connect()` calls observed
    pub fn connect_attempts(&self) -> u32 {
        self.connect_attempts.load(Ordering::SeqCst)
    }

    /// Feed a frame line into the currently held stream
    pub fn push_line(&self, line: impl Into<String>) {
        self.feed
            .lock()
            .unwrap()
            .as_ref()
            .expect("no held connection")
            .send(Ok(line.into()))
            .expect("held stream dropped");
    }

    /// Feed a transport error into the currently held stream
    pub fn push_error(&self, message: impl Into<String>) {
        self.feed
            .lock()
            .unwrap()
            .as_ref()
            .expect("no held connection")
            .send(Err(CourierError::Transport(message.into())))
            .expect("held stream dropped");
    }

    /// End the currently held stream, simulating a server close
    pub fn close_stream(&self) {
        *self.feed.lock().unwrap() = None;
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamConnector for MockConnector {
    async fn connect(&self) -> Result<FrameStream> {
        self.connect_attempts.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(ScriptedConnection::Fail(message)) => Err(CourierError::Transport(message)),
            Some(ScriptedConnection::Frames(items)) => Ok(Box::pin(stream::iter(items))),
            Some(ScriptedConnection::Held) => {
                let (tx, rx) = mpsc::unbounded_channel();
                *self.feed.lock().unwrap() = Some(tx);
                Ok(Box::pin(UnboundedReceiverStream::new(rx)))
            }
            None => Err(CourierError::Transport("no scripted connection".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_scripted_outcomes_in_order() {
        let connector = MockConnector::with_script(vec![
            ScriptedConnection::Fail("refused".into()),
            ScriptedConnection::Frames(vec![Ok("a".into()), Ok("b".into())]),
        ]);

        assert!(connector.connect().await.is_err());

        let mut stream = connector.connect().await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), "a");
        assert_eq!(stream.next().await.unwrap().unwrap(), "b");
        assert!(stream.next().await.is_none());

        // Script exhausted
        assert!(connector.connect().await.is_err());
        assert_eq!(connector.connect_attempts(), 3);
    }

    #[tokio::test]
    async fn test_held_stream_feed_and_close() {
        let connector = MockConnector::with_script(vec![ScriptedConnection::Held]);
        let mut stream = connector.connect().await.unwrap();

        connector.push_line("frame");
        assert_eq!(stream.next().await.unwrap().unwrap(), "frame");

        connector.close_stream();
        assert!(stream.next().await.is_none());
    }
}
