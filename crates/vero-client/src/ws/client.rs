//! WebSocket client for the appliance event feed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use serde_json::json;
use shared_bus::EventPublisher;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::engine_io::{EnginePacket, SocketPacket};
use crate::error::ClientError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

/// Maximum time to open the socket and finish the Engine.IO and Socket.IO
/// handshakes.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A running event feed.
///
/// One background task reads the socket and publishes every event envelope
/// to the bus. The feed never reconnects: once the socket drops, waiters on
/// the bus simply run into their timeouts.
#[derive(Debug)]
pub struct EventFeed {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    connected: Arc<AtomicBool>,
}

impl EventFeed {
    /// Connect to `url`, complete the handshakes, and start publishing.
    ///
    /// `token` is sent as Socket.IO connect auth when present.
    pub async fn connect<P>(url: &Url, token: Option<&str>, publisher: Arc<P>) -> Result<Self, ClientError>
    where
        P: EventPublisher + ?Sized + 'static,
    {
        let connect = async {
            let (ws_stream, _) = connect_async(url.as_str()).await?;
            let (mut write, mut read) = ws_stream.split();
            handshake(&mut write, &mut read, token).await?;
            Ok::<_, ClientError>((write, read))
        };
        let (write, read) = tokio::time::timeout(CONNECT_TIMEOUT, connect)
            .await
            .map_err(|_| ClientError::Feed("connection timed out".to_string()))??;

        info!(url = %url, "Event feed connected");

        let connected = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run_feed(write, read, publisher, connected.clone(), shutdown_rx));

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            task,
            connected,
        })
    }

    /// Whether the socket is still open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Stop the feed and wait for the reader task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            debug!(error = %e, "Event feed task ended abnormally");
        }
        self.connected.store(false, Ordering::Release);
    }
}

impl Drop for EventFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Wait for the Engine.IO open packet, then join the default namespace.
async fn handshake(write: &mut WsWrite, read: &mut WsRead, token: Option<&str>) -> Result<(), ClientError> {
    let mut opened = false;

    while let Some(frame) = read.next().await {
        let text = match frame? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        match EnginePacket::decode(text.as_str())? {
            EnginePacket::Open(handshake) => {
                debug!(sid = %handshake.sid, ping_interval = handshake.ping_interval, "Engine.IO open");
                opened = true;
                let auth = token.map(|t| json!({ "token": t }));
                let connect = EnginePacket::Message(SocketPacket::Connect(auth));
                write.send(Message::Text(connect.encode().into())).await?;
            }
            EnginePacket::Ping => {
                write.send(Message::Text(EnginePacket::Pong.encode().into())).await?;
            }
            EnginePacket::Message(SocketPacket::Connect(_)) if opened => return Ok(()),
            EnginePacket::Message(SocketPacket::ConnectError(data)) => {
                return Err(ClientError::Feed(format!("namespace connect refused: {data}")));
            }
            EnginePacket::Close => break,
            other => debug!(packet = ?other, "Ignoring packet during handshake"),
        }
    }

    Err(ClientError::Feed("socket closed during handshake".to_string()))
}

/// Read loop: answer pings, publish events, stop on close or shutdown.
async fn run_feed<P>(
    mut write: WsWrite,
    mut read: WsRead,
    publisher: Arc<P>,
    connected: Arc<AtomicBool>,
    mut shutdown_rx: oneshot::Receiver<()>,
) where
    P: EventPublisher + ?Sized,
{
    loop {
        let frame = tokio::select! {
            _ = &mut shutdown_rx => {
                let close = EnginePacket::Message(SocketPacket::Disconnect);
                let _ = write.send(Message::Text(close.encode().into())).await;
                let _ = write.close().await;
                debug!("Event feed shut down");
                break;
            }
            frame = read.next() => frame,
        };

        match frame {
            Some(Ok(Message::Text(text))) => {
                if !handle_text(text.as_str(), &mut write, publisher.as_ref()).await {
                    break;
                }
            }
            Some(Ok(Message::Ping(data))) => {
                let _ = write.send(Message::Pong(data)).await;
            }
            Some(Ok(Message::Close(_))) | None => {
                info!("Event feed closed by appliance");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!(error = %e, "Event feed read failed");
                break;
            }
        }
    }

    connected.store(false, Ordering::Release);
}

/// Handle one text frame. Returns `false` when the feed should stop.
async fn handle_text<P>(text: &str, write: &mut WsWrite, publisher: &P) -> bool
where
    P: EventPublisher + ?Sized,
{
    let packet = match EnginePacket::decode(text) {
        Ok(packet) => packet,
        Err(e) => {
            warn!(error = %e, "Dropping undecodable frame");
            return true;
        }
    };

    match packet {
        EnginePacket::Ping => {
            if let Err(e) = write.send(Message::Text(EnginePacket::Pong.encode().into())).await {
                warn!(error = %e, "Failed to answer ping");
                return false;
            }
        }
        EnginePacket::Message(SocketPacket::Disconnect) | EnginePacket::Close => {
            info!("Event feed disconnected by appliance");
            return false;
        }
        EnginePacket::Message(packet) => {
            if let Some(envelope) = packet.into_envelope() {
                publisher.publish(envelope).await;
            }
        }
        _ => {}
    }
    true
}
