//! The `/ws/agentqa` endpoint
//!
//! Each connection gets its own session id. Prompts are handled one at a
//! time; frames that arrive mid-turn are queued, and a close while a turn is
//! in flight cancels that turn.

use crate::agents::SessionId;
use crate::dispatch::Dispatcher;
use crate::observability::metrics;
use crate::server::with_state;
use futures_util::{SinkExt, Stream, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;
use warp::ws::{Message, WebSocket, Ws};
use warp::Filter;

pub fn ws_route(
    dispatcher: Arc<Dispatcher>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path!("ws" / "agentqa")
        .and(warp::ws())
        .and(with_state(dispatcher))
        .map(|ws: Ws, dispatcher: Arc<Dispatcher>| {
            ws.on_upgrade(move |socket| handle_socket(socket, dispatcher))
        })
}

async fn handle_socket(socket: WebSocket, dispatcher: Arc<Dispatcher>) {
    let session = Uuid::new_v4();
    metrics().connection_opened();
    info!(session = %session, "WebSocket connection established");

    let span = crate::session_span!(session = %session);
    run_session(socket, session, dispatcher).instrument(span).await;

    metrics().connection_closed();
}

/// Prompts held while a turn is in flight; further frames are dropped
const MAX_QUEUED_PROMPTS: usize = 32;

fn enqueue(backlog: &mut VecDeque<String>, text: String) -> bool {
    if backlog.len() >= MAX_QUEUED_PROMPTS {
        return false;
    }
    backlog.push_back(text);
    true
}

enum Inbound {
    Text(String),
    Ignored,
    Closed,
}

fn classify_frame(frame: Option<Result<Message, warp::Error>>) -> Inbound {
    match frame {
        None => Inbound::Closed,
        Some(Err(e)) => {
            debug!(error = %e, "WebSocket read failed");
            Inbound::Closed
        }
        Some(Ok(message)) if message.is_close() => Inbound::Closed,
        Some(Ok(message)) => match message.to_str() {
            Ok(text) => Inbound::Text(text.to_string()),
            Err(()) => Inbound::Ignored,
        },
    }
}

async fn next_text<S>(rx: &mut S) -> Option<String>
where
    S: Stream<Item = Result<Message, warp::Error>> + Unpin,
{
    loop {
        match classify_frame(rx.next().await) {
            Inbound::Text(text) => return Some(text),
            Inbound::Ignored => continue,
            Inbound::Closed => return None,
        }
    }
}

async fn run_session(socket: WebSocket, session: SessionId, dispatcher: Arc<Dispatcher>) {
    let (mut tx, mut rx) = socket.split();
    let mut backlog: VecDeque<String> = VecDeque::new();

    loop {
        let text = match backlog.pop_front() {
            Some(text) => text,
            None => match next_text(&mut rx).await {
                Some(text) => text,
                None => break,
            },
        };
        debug!(session = %session, len = text.len(), "Received message");

        let turn = dispatcher.handle_text(session, &text);
        tokio::pin!(turn);

        let reply = loop {
            tokio::select! {
                reply = &mut turn => break Some(reply),
                frame = rx.next() => match classify_frame(frame) {
                    Inbound::Text(queued) => {
                        if !enqueue(&mut backlog, queued) {
                            warn!(
                                session = %session,
                                limit = MAX_QUEUED_PROMPTS,
                                "Prompt queue full, dropping frame"
                            );
                        }
                    }
                    Inbound::Ignored => {}
                    Inbound::Closed => break None,
                },
            }
        };

        let Some(reply) = reply else {
            warn!(session = %session, "Client disconnected mid-turn, turn cancelled");
            break;
        };

        if let Err(e) = tx.send(Message::text(reply.into_text())).await {
            debug!(session = %session, error = %e, "Reply could not be delivered");
            break;
        }
    }

    info!(session = %session, "Client disconnected");

    match dispatcher.reset(session).await {
        Ok(()) => debug!(session = %session, "Session state cleared"),
        Err(e) => {
            error!(session = %session, error = %e, "Failed to reset session state");
            let payload = e.to_client_json().to_string();
            if tx.send(Message::text(payload)).await.is_err() {
                debug!(session = %session, "Connection already closed, reset error not delivered");
            }
        }
    }

    let _ = tx.close().await;
}
