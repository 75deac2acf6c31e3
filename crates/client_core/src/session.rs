//! Realtime connection session.
//!
//! One persistent websocket per authenticated session, owned by an explicit
//! `ConnectionSession` value with a start/stop lifecycle rather than ambient
//! global state. The reader performs no business logic: frames are parsed
//! into typed `InboundEvent`s and forwarded over a bounded channel to the
//! client's single dispatch loop.
//!
//! Reconnection is a first-class state machine
//! (`Disconnected -> Connecting -> Connected`) with exponential backoff.
//! Re-entering `Connected` after a drop carries `resync: true` so the
//! dispatcher can refresh state the client missed while offline.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use serde_json::Value;
use shared::{
    domain::{ConversationId, UserId},
    error::ApiException,
    protocol::ServerEvent,
};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsFrame};
use tracing::{info, warn};

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Capacity of the inbound event queue between the socket reader and the
/// dispatch loop.
pub const INBOUND_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Typed events delivered to the dispatch loop.
#[derive(Debug)]
pub enum InboundEvent {
    Message {
        conversation_id: ConversationId,
        payload: Value,
    },
    Presence {
        user_id: UserId,
        online: bool,
    },
    StateChanged {
        state: ConnectionState,
        /// True when re-entering `Connected` after a previous connection,
        /// i.e. events may have been missed and state should be refreshed.
        resync: bool,
    },
    ChannelError(String),
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub server_url: String,
    pub access_token: String,
}

pub struct ConnectionSession {
    task: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl ConnectionSession {
    /// Spawn the connection task. Events flow into `events` until `stop` is
    /// called or the receiving side goes away.
    pub fn start(config: ConnectionConfig, events: mpsc::Sender<InboundEvent>) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_connection(config, events, shutdown_rx));
        Self { task, shutdown }
    }

    pub fn stop(self) {
        let _ = self.shutdown.send(true);
        self.task.abort();
    }
}

pub fn websocket_url(server_url: &str, access_token: &str) -> Result<String> {
    let ws_base = if let Some(rest) = server_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = server_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(anyhow!("server_url must start with http:// or https://"));
    };
    Ok(format!(
        "{}/ws?token={access_token}",
        ws_base.trim_end_matches('/')
    ))
}

async fn run_connection(
    config: ConnectionConfig,
    events: mpsc::Sender<InboundEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let ws_url = match websocket_url(&config.server_url, &config.access_token) {
        Ok(url) => url,
        Err(err) => {
            let _ = events
                .send(InboundEvent::ChannelError(err.to_string()))
                .await;
            let _ = events
                .send(InboundEvent::StateChanged {
                    state: ConnectionState::Disconnected,
                    resync: false,
                })
                .await;
            return;
        }
    };

    let mut backoff = INITIAL_BACKOFF;
    let mut had_connection = false;

    loop {
        if *shutdown.borrow() {
            return;
        }

        if send_event(
            &events,
            InboundEvent::StateChanged {
                state: ConnectionState::Connecting,
                resync: false,
            },
        )
        .await
        .is_err()
        {
            return;
        }

        match connect_async(&ws_url).await.context("websocket connect failed") {
            Ok((stream, _)) => {
                backoff = INITIAL_BACKOFF;
                let resync = had_connection;
                had_connection = true;
                info!(resync, "realtime: channel connected");
                if send_event(
                    &events,
                    InboundEvent::StateChanged {
                        state: ConnectionState::Connected,
                        resync,
                    },
                )
                .await
                .is_err()
                {
                    return;
                }

                let (_, mut reader) = stream.split();
                loop {
                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                return;
                            }
                        }
                        frame = reader.next() => match frame {
                            Some(Ok(WsFrame::Text(text))) => {
                                if forward_frame(&events, &text).await.is_err() {
                                    return;
                                }
                            }
                            Some(Ok(WsFrame::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(err)) => {
                                warn!("realtime: receive failed: {err}");
                                break;
                            }
                        }
                    }
                }

                if send_event(
                    &events,
                    InboundEvent::StateChanged {
                        state: ConnectionState::Disconnected,
                        resync: false,
                    },
                )
                .await
                .is_err()
                {
                    return;
                }
            }
            Err(err) => {
                warn!("realtime: {err:#}");
                if send_event(
                    &events,
                    InboundEvent::StateChanged {
                        state: ConnectionState::Disconnected,
                        resync: false,
                    },
                )
                .await
                .is_err()
                {
                    return;
                }
            }
        }

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return;
                }
            }
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

/// Parse one websocket frame and forward it as a typed event. Parse failures
/// are surfaced as channel errors, never as panics or dropped connections.
async fn forward_frame(
    events: &mpsc::Sender<InboundEvent>,
    text: &str,
) -> std::result::Result<(), mpsc::error::SendError<InboundEvent>> {
    let event = match serde_json::from_str::<ServerEvent>(text) {
        Ok(ServerEvent::Message {
            conversation_id,
            message,
        }) => InboundEvent::Message {
            conversation_id,
            payload: message,
        },
        Ok(ServerEvent::Presence { user_id, status }) => InboundEvent::Presence {
            user_id,
            online: status.is_online(),
        },
        Ok(ServerEvent::Error(api_error)) => {
            InboundEvent::ChannelError(ApiException::from(api_error).to_string())
        }
        Err(err) => InboundEvent::ChannelError(format!("invalid server event: {err}")),
    };
    events.send(event).await
}

async fn send_event(
    events: &mpsc::Sender<InboundEvent>,
    event: InboundEvent,
) -> std::result::Result<(), mpsc::error::SendError<InboundEvent>> {
    events.send(event).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_url_swaps_scheme_and_appends_token() {
        assert_eq!(
            websocket_url("https://hr.example.com", "tok").unwrap(),
            "wss://hr.example.com/ws?token=tok"
        );
        assert_eq!(
            websocket_url("http://127.0.0.1:8080/", "tok").unwrap(),
            "ws://127.0.0.1:8080/ws?token=tok"
        );
    }

    #[test]
    fn websocket_url_rejects_unknown_schemes() {
        assert!(websocket_url("ftp://example.com", "tok").is_err());
    }

    #[tokio::test]
    async fn frames_are_forwarded_as_typed_events() {
        let (tx, mut rx) = mpsc::channel(8);

        forward_frame(
            &tx,
            r#"{"type":"message","payload":{"conversation_id":"c1","message":{"id":"m1","text":"hi"}}}"#,
        )
        .await
        .expect("send");
        match rx.recv().await.expect("event") {
            InboundEvent::Message {
                conversation_id, ..
            } => assert_eq!(conversation_id.0, "c1"),
            other => panic!("unexpected event: {other:?}"),
        }

        forward_frame(
            &tx,
            r#"{"type":"presence","payload":{"user_id":"u1","status":"online"}}"#,
        )
        .await
        .expect("send");
        match rx.recv().await.expect("event") {
            InboundEvent::Presence { user_id, online } => {
                assert_eq!(user_id.0, "u1");
                assert!(online);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_presence_status_maps_to_offline() {
        let (tx, mut rx) = mpsc::channel(8);
        forward_frame(
            &tx,
            r#"{"type":"presence","payload":{"user_id":"u1","status":"away"}}"#,
        )
        .await
        .expect("send");
        match rx.recv().await.expect("event") {
            InboundEvent::Presence { online, .. } => assert!(!online),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_frames_become_channel_errors() {
        let (tx, mut rx) = mpsc::channel(8);
        forward_frame(&tx, "not json at all").await.expect("send");
        match rx.recv().await.expect("event") {
            InboundEvent::ChannelError(message) => {
                assert!(message.contains("invalid server event"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
