//! Websocket push feed from the sensor backend.
//!
//! Speaks just enough of the socket.io websocket transport to stay
//! connected (open ack, ping/pong) and hands event packets to
//! [`decode_push_frame`]. Plain JSON text frames are accepted as well.
//! Disconnects are retried after a fixed delay; gaps are not detected.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use sawi_telemetry::{decode_push_frame, PushFrame};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// How one inbound text frame is handled.
#[derive(Debug, PartialEq, Eq)]
pub enum Inbound<'a> {
    /// engine.io open; answer with a namespace connect.
    Open,
    /// engine.io ping; answer with a pong.
    Ping,
    /// Connect ack, disconnect, noop and the like.
    Control,
    /// Candidate push frame.
    Payload(&'a str),
}

pub fn classify(text: &str) -> Inbound<'_> {
    let t = text.trim();
    if t == "2" {
        return Inbound::Ping;
    }
    if t.starts_with("42") || t.starts_with('{') || t.starts_with('[') {
        return Inbound::Payload(t);
    }
    if t.starts_with('0') {
        return Inbound::Open;
    }
    Inbound::Control
}

enum ConnectionEnd {
    Disconnected,
    PumpClosed,
}

/// Spawn the feed task. It exits only when the pump side of `tx` is gone.
pub fn spawn_ws_feed(
    url: String,
    reconnect: Duration,
    tx: mpsc::Sender<PushFrame>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match connect_async(url.as_str()).await {
                Ok((ws, _resp)) => {
                    info!(%url, "push feed connected");
                    if let ConnectionEnd::PumpClosed = run_connection(ws, &tx).await {
                        debug!("push queue closed; feed exiting");
                        return;
                    }
                    warn!(%url, "push feed disconnected");
                }
                Err(e) => warn!(%url, error = %e, "push feed connect failed"),
            }
            tokio::time::sleep(reconnect).await;
        }
    })
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn run_connection(ws: WsStream, tx: &mpsc::Sender<PushFrame>) -> ConnectionEnd {
    let (mut write, mut read) = ws.split();

    while let Some(msg) = read.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "push feed read error");
                break;
            }
        };

        let reply = match classify(&text) {
            Inbound::Ping => Some("3"),
            Inbound::Open => Some("40"),
            Inbound::Control => None,
            Inbound::Payload(body) => {
                match decode_push_frame(body) {
                    Ok(Some(frame)) => {
                        if tx.send(frame).await.is_err() {
                            return ConnectionEnd::PumpClosed;
                        }
                    }
                    Ok(None) => debug!("push frame ignored"),
                    Err(e) => warn!(error = %e, "malformed push frame skipped"),
                }
                None
            }
        };

        if let Some(reply) = reply {
            if write.send(Message::Text(reply.to_string())).await.is_err() {
                break;
            }
        }
    }

    ConnectionEnd::Disconnected
}
