pub mod protocol;

use crate::model::LiveSample;
use futures::{SinkExt, StreamExt};
use protocol::ControlMessage;
use std::collections::HashSet;
use std::fmt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Push channel errors
#[derive(Debug)]
pub enum ChannelError {
    /// Connection establishment failed
    Transport(String),
    /// `open()` called while the channel is already open
    AlreadyOpen,
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelError::Transport(e) => write!(f, "push channel transport failure: {}", e),
            ChannelError::AlreadyOpen => write!(f, "push channel is already open"),
        }
    }
}

impl std::error::Error for ChannelError {}

/// Push channel connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Closed,
    Open,
}

struct ChannelHandle {
    control_tx: mpsc::UnboundedSender<ControlMessage>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

/// One long-lived WebSocket push connection.
///
/// State machine: Closed → open() → Connecting → Open → (transport error
/// or close()) → Closed. The Connecting phase lives entirely inside the
/// `open()` await (the handshake completes before it returns), so
/// `ChannelState` only ever exposes Closed and Open. Control messages
/// enqueued before the writer task drains them are buffered in order and
/// flushed once the socket is up; while Closed they are dropped with a
/// log line, never fatal. Transport errors tear the connection down;
/// reconnection policy belongs to the caller.
pub struct PushChannel {
    url: String,
    inner: Option<ChannelHandle>,
}

impl PushChannel {
    pub fn new(url: String) -> Self {
        Self { url, inner: None }
    }

    pub fn state(&self) -> ChannelState {
        match &self.inner {
            Some(handle) if !handle.reader.is_finished() => ChannelState::Open,
            _ => ChannelState::Closed,
        }
    }

    /// Connect and spawn the reader/writer tasks.
    ///
    /// Returns the inbound-event receiver; it yields one LiveSample per
    /// well-formed push message and ends when the transport closes.
    /// Malformed or semantically invalid frames are logged and dropped.
    pub async fn open(
        &mut self,
    ) -> Result<mpsc::UnboundedReceiver<LiveSample>, ChannelError> {
        if self.inner.is_some() {
            return Err(ChannelError::AlreadyOpen);
        }

        info!(url = %self.url, "Connecting push channel");
        let (socket, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;
        info!("Push channel connected");

        let (mut write, mut read) = socket.split();
        let (control_tx, mut control_rx) = mpsc::unbounded_channel::<ControlMessage>();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<LiveSample>();

        let writer = tokio::spawn(async move {
            while let Some(msg) = control_rx.recv().await {
                let json = match serde_json::to_string(&msg) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "Failed to encode control message");
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(json)).await {
                    warn!(error = %e, "Push channel send failed");
                    break;
                }
            }
        });

        let reader = tokio::spawn(async move {
            while let Some(item) = read.next().await {
                match item {
                    Ok(Message::Text(text)) => match protocol::decode_sample(&text) {
                        Ok(sample) => {
                            if event_tx.send(sample).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Dropping bad push message");
                        }
                    },
                    Ok(Message::Close(_)) => {
                        info!("Push channel closed by server");
                        break;
                    }
                    Ok(_) => {
                        // Ignore binary, ping, pong frames
                    }
                    Err(e) => {
                        warn!(error = %e, "Push channel read error");
                        break;
                    }
                }
            }
        });

        self.inner = Some(ChannelHandle {
            control_tx,
            reader,
            writer,
        });
        Ok(event_rx)
    }

    /// Best-effort subscribe; no-op while Closed
    pub fn subscribe(&self, names: &HashSet<String>) {
        if names.is_empty() {
            return;
        }
        self.send_control(ControlMessage::subscribe(names));
    }

    /// Best-effort unsubscribe; no-op while Closed
    pub fn unsubscribe(&self, names: &HashSet<String>) {
        if names.is_empty() {
            return;
        }
        self.send_control(ControlMessage::unsubscribe(names));
    }

    fn send_control(&self, msg: ControlMessage) {
        match &self.inner {
            Some(handle) => {
                // Fails only when the writer task has exited (transport
                // gone), which degrades to a no-op like Closed.
                if handle.control_tx.send(msg).is_err() {
                    debug!("Push channel writer gone, dropping control message");
                }
            }
            None => {
                debug!("Push channel closed, dropping control message");
            }
        }
    }

    /// Tear down the connection; idempotent
    pub fn close(&mut self) {
        if let Some(handle) = self.inner.take() {
            handle.reader.abort();
            handle.writer.abort();
            info!("Push channel closed");
        }
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.close();
    }
}
