//! WebSocket lifecycle for the live score channel.
//!
//! A connection joins exactly one room, then publishes `score_update` events
//! and receives everything fanned out to that room. Delivery is best-effort:
//! a dropped connection simply stops receiving until the client reconnects
//! and re-joins, recovering missed state from the persisted record.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use tracing::{info, warn};

use crate::{
    dao::models::Category,
    dto::{
        validation::{validate_age_group, validate_mark},
        ws::{ScoreUpdateBroadcast, ScoringInboundMessage, ScoringOutboundMessage},
    },
    services::{events, scoring_service},
    state::SharedState,
};

const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Internal error type for socket send operations.
#[derive(Debug, Error)]
enum SocketError {
    /// Writer channel closed - connection should be terminated immediately.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Handle the full lifecycle for an individual scoring WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(JOIN_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("websocket join timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let inbound = match ScoringInboundMessage::from_json_str(&initial_message) {
        Ok(message) => message,
        Err(err) => {
            warn!(error = %err, "failed to parse scoring message");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let ScoringInboundMessage::Join { gender, age_group } = inbound else {
        warn!("first message was not a room join");
        let _ = outbound_tx.send(Message::Close(None));
        finalize(writer_task, outbound_tx).await;
        return;
    };

    if validate_age_group(&age_group).is_err() {
        let _ = send_message_to_socket(
            &outbound_tx,
            &ScoringOutboundMessage::Rejected {
                message: format!("invalid age group `{age_group}`"),
            },
        );
        let _ = outbound_tx.send(Message::Close(None));
        finalize(writer_task, outbound_tx).await;
        return;
    }

    let category = Category::new(gender, age_group);
    let room_id = category.room_id();
    let room_receiver = state.rooms().subscribe(&room_id);

    info!(room = %room_id, "scoring client joined");

    if send_message_to_socket(
        &outbound_tx,
        &ScoringOutboundMessage::Joined {
            room: room_id.clone(),
        },
    )
    .is_err()
    {
        finalize(writer_task, outbound_tx).await;
        return;
    }

    // Forward room broadcasts to this connection until either side goes away.
    // A lagging subscriber skips missed events; there is no replay.
    let forward_tx = outbound_tx.clone();
    let forward_room = room_id.clone();
    let forwarder_task = tokio::spawn(async move {
        let mut stream = BroadcastStream::new(room_receiver);
        loop {
            tokio::select! {
                _ = forward_tx.closed() => break,
                item = stream.next() => match item {
                    Some(Ok(event)) => {
                        let message = ScoringOutboundMessage::from(event);
                        if send_message_to_socket(&forward_tx, &message).is_err() {
                            break;
                        }
                    }
                    Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                        warn!(room = %forward_room, skipped, "subscriber lagging; skipping missed room events");
                    }
                    None => break,
                }
            }
        }
    });

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match ScoringInboundMessage::from_json_str(&text) {
                Ok(ScoringInboundMessage::ScoreUpdate {
                    player_id,
                    player_name,
                    judge_type,
                    score,
                }) => {
                    if validate_mark(score).is_err() {
                        let _ = send_message_to_socket(
                            &outbound_tx,
                            &ScoringOutboundMessage::Rejected {
                                message: format!("score {score} outside [0, 10]"),
                            },
                        );
                        continue;
                    }

                    let update = ScoreUpdateBroadcast {
                        room: room_id.clone(),
                        player_id,
                        player_name,
                        judge_type,
                        score,
                    };
                    events::broadcast_score_update(&state, update.clone());
                    scoring_service::merge_live_update(&state, &category, &update).await;
                }
                Ok(ScoringInboundMessage::Join { .. }) => {
                    let _ = send_message_to_socket(
                        &outbound_tx,
                        &ScoringOutboundMessage::Rejected {
                            message: "already joined a room".into(),
                        },
                    );
                }
                Ok(ScoringInboundMessage::Unknown) => {
                    warn!(room = %room_id, "ignoring unknown scoring message");
                }
                Err(err) => {
                    warn!(room = %room_id, error = %err, "failed to parse scoring message");
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(room = %room_id, "scoring client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(room = %room_id, error = %err, "websocket error");
                break;
            }
        }
    }

    forwarder_task.abort();
    info!(room = %room_id, "scoring client disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Serialization failures are permanent (a bug in this code) and are logged
/// rather than retried; a closed writer channel is returned to the caller so
/// the connection can be torn down.
fn send_message_to_socket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
) -> Result<(), SocketError>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}` (permanent error, not retrying)");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| SocketError::ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
