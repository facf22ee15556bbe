//! Auto-reconnecting push subscription.
//!
//! Maintains a persistent WebSocket connection to the server's progress
//! endpoint and feeds `task_update` envelopes into the store. Any close —
//! clean, error-induced, or a failed dial — schedules a reconnect after a
//! fixed delay with no backoff and no retry ceiling: the server is a
//! co-located local process whose restarts are brief. Teardown cancels the
//! pending delay and closes the socket exactly once.

use std::time::Duration;

use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::store::{StoreOp, TaskStore};
use crate::transport::PushEnvelope;
use crate::types::Event;

/// Why a connection attempt or session ended.
enum SessionEnd {
    /// Server closed or the stream errored; reconnect after the delay
    Lost(String),
    /// Teardown requested; leave the loop
    Teardown,
}

/// Spawn the background task that maintains the push subscription.
pub(crate) fn spawn_push_client(
    url: Url,
    store: TaskStore,
    event_tx: tokio::sync::broadcast::Sender<Event>,
    reconnect_delay: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let end = tokio::select! {
                _ = cancel.cancelled() => SessionEnd::Teardown,
                conn = tokio_tungstenite::connect_async(url.as_str()) => match conn {
                    Ok((socket, _response)) => {
                        tracing::info!(url = %url, "push subscription established");
                        event_tx.send(Event::PushConnected).ok();

                        let end = read_session(socket, &store, &cancel).await;
                        if let SessionEnd::Lost(reason) = &end {
                            tracing::info!(reason = %reason, "push subscription lost");
                            event_tx
                                .send(Event::PushDisconnected {
                                    reason: reason.clone(),
                                })
                                .ok();
                        }
                        end
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "push connect failed, retrying after delay");
                        SessionEnd::Lost(format!("connect failed: {}", e))
                    }
                }
            };

            if matches!(end, SessionEnd::Teardown) {
                break;
            }

            // Fixed delay before the next attempt; teardown interrupts it.
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(reconnect_delay) => {}
            }
        }

        tracing::debug!("push client stopped");
    })
}

/// Read frames until the connection ends or teardown is requested.
async fn read_session<S>(
    mut socket: tokio_tungstenite::WebSocketStream<S>,
    store: &TaskStore,
    cancel: &CancellationToken,
) -> SessionEnd
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                // The one and only close of this socket.
                socket.close(None).await.ok();
                return SessionEnd::Teardown;
            }
            frame = socket.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    dispatch_frame(&text, store).await;
                }
                Some(Ok(Message::Close(_))) => {
                    return SessionEnd::Lost("closed by server".to_string());
                }
                Some(Ok(_)) => {
                    // Binary/ping/pong frames carry no task state.
                }
                Some(Err(e)) => {
                    return SessionEnd::Lost(format!("socket error: {}", e));
                }
                None => {
                    return SessionEnd::Lost("stream ended".to_string());
                }
            }
        }
    }
}

/// Parse one text frame and feed any task update into the store.
///
/// Malformed payloads are logged and skipped; message types other than
/// `task_update` are ignored without error.
async fn dispatch_frame(text: &str, store: &TaskStore) {
    match serde_json::from_str::<PushEnvelope>(text) {
        Ok(PushEnvelope::TaskUpdate { data }) => {
            store.apply(StoreOp::PushUpdate(data)).await;
        }
        Ok(PushEnvelope::Ignored) => {
            tracing::trace!("ignoring push message of unrelated type");
        }
        Err(e) => {
            tracing::warn!(error = %e, "malformed push payload, skipping");
        }
    }
}
