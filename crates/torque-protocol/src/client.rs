//! WebSocket Client for the Torque Sensor
//!
//! [`SensorClient`] holds the sensor address. [`SensorClient::connect`]
//! opens a [`SensorConnection`], which splits into a reader for device
//! frames and a writer for commands so both can be driven concurrently.

use crate::error::ProtocolError;
use crate::message::{Command, SensorMessage};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

/// Default timeout for opening the connection
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection settings for one sensor
#[derive(Debug, Clone)]
pub struct SensorClient {
    /// WebSocket URL (e.g. `ws://192.168.5.1:81/`)
    url: String,
    /// Connect timeout
    timeout: Duration,
}

impl SensorClient {
    /// Create a new client for `url`
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }

    /// Set connect timeout
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Sensor URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Open the WebSocket
    pub async fn connect(&self) -> Result<SensorConnection, ProtocolError> {
        info!("Connecting to torque sensor at {}", self.url);

        let connect = connect_async(self.url.as_str());
        let (ws_stream, _response) = tokio::time::timeout(self.timeout, connect)
            .await
            .map_err(|_| ProtocolError::Connection {
                url: self.url.clone(),
                reason: format!("timed out after {:?}", self.timeout),
            })?
            .map_err(|e| ProtocolError::Connection {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        info!("Connected to torque sensor at {}", self.url);
        Ok(SensorConnection { ws_stream })
    }
}

/// An open sensor connection
pub struct SensorConnection {
    ws_stream: WsStream,
}

impl SensorConnection {
    /// Split into independent reader and writer halves
    pub fn split(self) -> (CommandWriter, MessageReader) {
        let (sink, stream) = self.ws_stream.split();
        (CommandWriter { sink }, MessageReader { stream })
    }
}

/// Sending half of a sensor connection
pub struct CommandWriter {
    sink: SplitSink<WsStream, Message>,
}

impl CommandWriter {
    /// Send one command frame
    pub async fn send(&mut self, command: &Command) -> Result<(), ProtocolError> {
        let text = command.encode();
        debug!("Sending command {}", text);
        self.sink.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Close the connection
    pub async fn close(&mut self) -> Result<(), ProtocolError> {
        self.sink.close().await?;
        Ok(())
    }
}

/// Receiving half of a sensor connection
pub struct MessageReader {
    stream: SplitStream<WsStream>,
}

impl MessageReader {
    /// Next device frame.
    ///
    /// Returns `None` once the connection is closed. Frames that fail to
    /// parse are returned as errors; the connection stays usable.
    pub async fn next_message(&mut self) -> Option<Result<SensorMessage, ProtocolError>> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Text(text)) => return Some(SensorMessage::parse(&text)),
                Ok(Message::Binary(bytes)) => {
                    trace!("Ignoring {} byte binary frame", bytes.len());
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Ok(Message::Close(frame)) => {
                    info!(?frame, "Sensor closed the connection");
                    return None;
                }
                Err(e) => {
                    warn!("Sensor receive error: {}", e);
                    return Some(Err(e.into()));
                }
            }
        }
        None
    }
}
