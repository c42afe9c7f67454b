//! Single WebSocket connection to the backend event stream.
//!
//! One connection maps to one socket lifetime. The run loop above owns
//! reconnection: when the socket drops, a [`ConnectionEvent::Closed`] is
//! surfaced and the loop dials again after the configured delay. Outbound
//! sends are best-effort; while disconnected they fail fast and the caller
//! decides whether the loss matters.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use url::Url;

use argus_protocol::{decode_inbound, encode_outbound, Envelope, InboundMessage, OutboundMessage};

use crate::error::{ClientError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// What the receive loop surfaces to the run loop.
#[derive(Debug)]
pub enum ConnectionEvent {
    Message(Envelope<InboundMessage>),
    Closed,
}

pub struct ConsoleConnection {
    url: Url,
    connect_timeout: Duration,
    state: Arc<RwLock<ConnectionState>>,
    writer: Arc<Mutex<Option<WsWriter>>>,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
    events_rx: Arc<Mutex<mpsc::UnboundedReceiver<ConnectionEvent>>>,
    recv_task: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
}

impl ConsoleConnection {
    pub fn new(url: &str, connect_timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|error| ClientError::InvalidUrl(error.to_string()))?;
        if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
            return Err(ClientError::InvalidUrl(format!(
                "expected ws:// or wss:// scheme, got {}",
                parsed.scheme()
            )));
        }
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Ok(Self {
            url: parsed,
            connect_timeout,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            writer: Arc::new(Mutex::new(None)),
            events_tx,
            events_rx: Arc::new(Mutex::new(events_rx)),
            recv_task: Arc::new(Mutex::new(None)),
        })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Dial the backend and start the background receive loop.
    pub async fn connect(&self) -> Result<()> {
        let mut state_guard = self.state.write().await;
        if *state_guard == ConnectionState::Connected {
            return Err(ClientError::AlreadyConnected);
        }
        *state_guard = ConnectionState::Connecting;
        drop(state_guard);

        let dialed = timeout(self.connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| ClientError::Timeout(self.connect_timeout));
        let connected = match dialed {
            Ok(Ok(connected)) => connected,
            Ok(Err(error)) => {
                *self.state.write().await = ConnectionState::Disconnected;
                return Err(ClientError::WebSocket(error.to_string()));
            }
            Err(error) => {
                *self.state.write().await = ConnectionState::Disconnected;
                return Err(error);
            }
        };

        let (stream, _response) = connected;
        let (writer, mut reader) = stream.split();
        *self.writer.lock().await = Some(writer);
        *self.state.write().await = ConnectionState::Connected;

        let events_tx = self.events_tx.clone();
        let state = Arc::clone(&self.state);
        let url = self.url.to_string();

        let task = tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                match frame {
                    Ok(Message::Text(text)) => match decode_inbound(text.as_str()) {
                        Ok(Some(envelope)) => {
                            if events_tx.send(ConnectionEvent::Message(envelope)).is_err() {
                                break;
                            }
                        }
                        Ok(None) => {
                            debug!("unrecognized message type from {url}, ignoring");
                        }
                        Err(error) => {
                            warn!("malformed message from {url}: {error}");
                        }
                    },
                    Ok(Message::Ping(payload)) => {
                        debug!("ping from {url} ({} bytes)", payload.len());
                    }
                    Ok(Message::Pong(_)) => {}
                    Ok(Message::Close(_)) => break,
                    Ok(Message::Binary(_)) => {}
                    Ok(Message::Frame(_)) => {}
                    Err(error) => {
                        warn!("websocket read error on {url}: {error}");
                        break;
                    }
                }
            }

            *state.write().await = ConnectionState::Disconnected;
            let _ = events_tx.send(ConnectionEvent::Closed);
        });

        *self.recv_task.lock().await = Some(task);
        Ok(())
    }

    /// Close the socket and stop the receive loop.
    pub async fn disconnect(&self) -> Result<()> {
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.send(Message::Close(None)).await;
        }
        if let Some(task) = self.recv_task.lock().await.take() {
            task.abort();
        }
        *self.state.write().await = ConnectionState::Disconnected;
        Ok(())
    }

    /// Send one outbound message. Fails fast while disconnected; delivery
    /// after a successful write is still not guaranteed.
    pub async fn send(&self, message: &OutboundMessage) -> Result<()> {
        if self.state().await != ConnectionState::Connected {
            return Err(ClientError::NotConnected);
        }
        let text = encode_outbound(message)?;
        let mut writer_guard = self.writer.lock().await;
        let writer = writer_guard.as_mut().ok_or(ClientError::NotConnected)?;
        writer
            .send(Message::Text(text.into()))
            .await
            .map_err(|error| ClientError::WebSocket(error.to_string()))
    }

    /// Next event from the receive loop. `None` means the channel closed,
    /// which only happens when the connection is dropped.
    pub async fn recv(&self) -> Option<ConnectionEvent> {
        self.events_rx.lock().await.recv().await
    }
}
