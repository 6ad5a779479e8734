// Tally
// Copyright (C) 2025 Throneless Tech

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{ConnectInfo, State},
    response::IntoResponse,
};
use chrono::Local;
use futures::{SinkExt, StreamExt};
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, error, warn};

use tally_common::{
    error::{Result, TallyError},
    socket::{MessageEvent, SocketMessage},
};

use crate::api::{self, ApiState, CheckInOutcome, LeaderboardRow};
use crate::commands::Command;

const UNKNOWN_USER: &str = "unknown user";

/// Handle on one bridge connection: a writer channel for outbound frames
/// and the identity lookups still waiting for a response.
#[derive(Clone)]
pub struct Session {
    outbound: mpsc::Sender<SocketMessage>,
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Option<String>>>>>,
    seq: Arc<AtomicU64>,
}

impl Session {
    fn new(outbound: mpsc::Sender<SocketMessage>) -> Self {
        Self {
            outbound,
            pending: Arc::new(Mutex::new(HashMap::new())),
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn send_message(&self, channel_id: &str, text: &str) -> Result<()> {
        self.outbound
            .send(SocketMessage::SendMessage {
                channel_id: channel_id.to_owned(),
                text: text.to_owned(),
            })
            .await
            .map_err(|err| TallyError::Gateway(err.to_string()))
    }

    /// Ask the bridge to resolve a user id to a display name. Resolves to
    /// an error if the connection goes away first.
    pub async fn resolve_user(&self, user_id: &str) -> Result<Option<String>> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(seq, tx);

        self.outbound
            .send(SocketMessage::ResolveUser {
                seq,
                user_id: user_id.to_owned(),
            })
            .await
            .map_err(|err| TallyError::Gateway(err.to_string()))?;

        Ok(rx.await?)
    }

    async fn complete_resolution(&self, seq: u64, display_name: Option<String>) {
        if let Some(tx) = self.pending.lock().await.remove(&seq) {
            let _ = tx.send(display_name);
        } else {
            warn!(seq, "resolution response with no pending request");
        }
    }
}

pub async fn handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<ApiState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, addr, state))
}

async fn handle_socket(socket: WebSocket, who: SocketAddr, state: ApiState) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound, mut outbound_rx) = mpsc::channel::<SocketMessage>(100);
    let session = Session::new(outbound);

    let writer = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(err) => {
                    error!("Failed to serialize outbound frame: {}", err);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                error!("Client {who} abruptly disconnected");
                return;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(_) => {
                error!("Client {who} abruptly disconnected");
                break;
            }
        };
        match process_message(msg, who, &state, &session).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Websocket closed");
                break;
            }
            Err(err) => {
                error!("Error parsing message from {who}: {}", err);
                break;
            }
        }
    }

    // Dropping the session drops the pending map; outstanding lookups
    // resolve as failures.
    writer.abort();
}

async fn process_message(
    msg: Message,
    who: SocketAddr,
    state: &ApiState,
    session: &Session,
) -> Result<bool> {
    match msg {
        Message::Text(t) => {
            debug!(">>> {who} sent str: {t:?}");
            let contents: SocketMessage = serde_json::from_slice(t.as_bytes())?;
            match contents {
                SocketMessage::MessageEvent(event) => {
                    // One task per inbound message; handlers share nothing
                    // in-process.
                    let db = state.db.clone();
                    let session = session.clone();
                    tokio::spawn(async move {
                        handle_event(event, db, session).await;
                    });
                }
                SocketMessage::ResolveUserResponse { seq, display_name } => {
                    session.complete_resolution(seq, display_name).await;
                }
                _ => {
                    warn!("Unexpected frame from {who}");
                }
            }
            Ok(true)
        }
        Message::Binary(d) => {
            debug!(">>> {} sent {} bytes: {:?}", who, d.len(), d);
            warn!("Server doesn't accept binary frames");
            Ok(true)
        }
        Message::Close(c) => {
            if let Some(cf) = c {
                debug!(
                    ">>> {} sent close with code {} and reason `{}`",
                    who, cf.code, cf.reason
                );
                match cf.code {
                    1000 => Ok(false), // 1000 is code for "Normal"
                    _ => Err(TallyError::WebsocketClose),
                }
            } else {
                debug!(">>> {who} somehow sent close message without CloseFrame");
                Err(TallyError::WebsocketClose)
            }
        }
        Message::Pong(v) => {
            debug!(">>> {who} sent pong with {v:?}");
            Ok(true)
        }
        Message::Ping(v) => {
            debug!(">>> {who} sent ping with {v:?}");
            Ok(true)
        }
    }
}

async fn handle_event(event: MessageEvent, db: DatabaseConnection, session: Session) {
    if event.sender_is_bot {
        debug!(sender =% event.sender_id, "ignoring message from bot account");
        return;
    }

    let Some(command) = Command::parse(&event.body) else {
        return;
    };

    let today = Local::now().date_naive();
    let reply = match command {
        Command::CheckIn => match api::check_in(&event.sender_id, today, &db).await {
            Ok(CheckInOutcome::Recorded { streak }) => {
                format!("Check-in recorded! You're on a {streak}-day streak.")
            }
            Ok(CheckInOutcome::AlreadyCheckedIn) => "You already checked in today!".to_owned(),
            Err(err) => {
                error!("Failed to record check-in: {}", err);
                "Something went wrong recording your check-in.".to_owned()
            }
        },
        Command::JoinDate => match api::join_date(&event.sender_id, &db).await {
            Ok(Some(join_date)) => format!("You first checked in on {join_date}."),
            Ok(None) => "No check-in record found for you yet.".to_owned(),
            Err(err) => {
                error!("Failed to look up join date: {}", err);
                "Something went wrong looking up your join date.".to_owned()
            }
        },
        Command::Leaderboard => match api::leaderboard(&db).await {
            Ok(rows) if rows.is_empty() => "No check-ins recorded yet.".to_owned(),
            Ok(rows) => format_leaderboard(&rows, &session).await,
            Err(err) => {
                error!("Failed to fetch leaderboard: {}", err);
                "Something went wrong fetching the leaderboard.".to_owned()
            }
        },
    };

    if let Err(err) = session.send_message(&event.channel_id, &reply).await {
        warn!("Problem with replying to message: {:?}", err);
    }
}

/// Resolve display names one row at a time, in rank order. A failed
/// lookup only degrades its own row.
async fn format_leaderboard(rows: &[LeaderboardRow], session: &Session) -> String {
    let mut reply = "Check-in leaderboard (top 50)\n".to_owned();
    for (rank, row) in rows.iter().enumerate() {
        let name = match session.resolve_user(&row.user_id).await {
            Ok(Some(name)) if !name.is_empty() => name,
            Ok(_) => UNKNOWN_USER.to_owned(),
            Err(err) => {
                warn!(user_id =% row.user_id, "failed to resolve display name: {:?}", err);
                UNKNOWN_USER.to_owned()
            }
        };
        reply.push_str(&format!("{}. {} - {} days\n", rank + 1, name, row.streak));
    }
    reply
}

#[cfg(test)]
mod test_socket {
    use axum_test::TestWebSocket;
    use serde_json::json;

    use crate::utils::get_test_socket;

    use tally_common::socket::SocketMessage;

    async fn send_event(ws: &mut TestWebSocket, sender_id: &str, body: &str, is_bot: bool) {
        ws.send_json(&json!({
            "message_type": "MessageEvent",
            "data": {
                "channel_id": "general",
                "sender_id": sender_id,
                "sender_is_bot": is_bot,
                "body": body,
            }
        }))
        .await;
    }

    async fn receive_reply(ws: &mut TestWebSocket) -> (String, String) {
        match ws.receive_json::<SocketMessage>().await {
            SocketMessage::SendMessage { channel_id, text } => (channel_id, text),
            other => panic!("expected SendMessage, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn it_should_reply_to_a_check_in() {
        let mut ws = get_test_socket().await;

        send_event(&mut ws, "ada", "check-in", false).await;

        let (channel_id, text) = receive_reply(&mut ws).await;
        assert_eq!(channel_id, "general");
        assert!(text.contains("1-day streak"));
    }

    #[tokio::test]
    async fn it_should_refuse_a_duplicate_check_in() {
        let mut ws = get_test_socket().await;

        send_event(&mut ws, "ada", "check-in", false).await;
        receive_reply(&mut ws).await;

        send_event(&mut ws, "ada", "CHECK-IN", false).await;
        let (_, text) = receive_reply(&mut ws).await;
        assert!(text.contains("already checked in"));
    }

    #[tokio::test]
    async fn it_should_ignore_bots_and_unrecognized_text() {
        let mut ws = get_test_socket().await;

        // Neither of these may produce a reply or a check-in record.
        send_event(&mut ws, "bot", "check-in", true).await;
        send_event(&mut ws, "ada", "hello there", false).await;

        send_event(&mut ws, "ada", "join-date", false).await;
        let (_, text) = receive_reply(&mut ws).await;
        assert!(text.contains("No check-in record"));
    }

    #[tokio::test]
    async fn it_should_report_the_join_date() {
        let mut ws = get_test_socket().await;

        send_event(&mut ws, "ada", "check-in", false).await;
        receive_reply(&mut ws).await;

        send_event(&mut ws, "ada", "join-date", false).await;
        let (_, text) = receive_reply(&mut ws).await;
        assert!(text.contains("You first checked in on"));
    }

    #[tokio::test]
    async fn it_should_resolve_names_on_the_leaderboard() {
        let mut ws = get_test_socket().await;

        send_event(&mut ws, "ada", "check-in", false).await;
        receive_reply(&mut ws).await;

        send_event(&mut ws, "ada", "leaderboard", false).await;

        let (seq, user_id) = match ws.receive_json::<SocketMessage>().await {
            SocketMessage::ResolveUser { seq, user_id } => (seq, user_id),
            other => panic!("expected ResolveUser, got {other:?}"),
        };
        assert_eq!(user_id, "ada");

        ws.send_json(&json!({
            "message_type": "ResolveUserResponse",
            "data": { "seq": seq, "display_name": "Ada" }
        }))
        .await;

        let (_, text) = receive_reply(&mut ws).await;
        assert!(text.contains("1. Ada - 1 days"));
    }

    #[tokio::test]
    async fn it_should_degrade_to_a_placeholder_name() {
        let mut ws = get_test_socket().await;

        send_event(&mut ws, "ada", "check-in", false).await;
        receive_reply(&mut ws).await;

        send_event(&mut ws, "ada", "leaderboard", false).await;

        let seq = match ws.receive_json::<SocketMessage>().await {
            SocketMessage::ResolveUser { seq, .. } => seq,
            other => panic!("expected ResolveUser, got {other:?}"),
        };

        ws.send_json(&json!({
            "message_type": "ResolveUserResponse",
            "data": { "seq": seq, "display_name": null }
        }))
        .await;

        let (_, text) = receive_reply(&mut ws).await;
        assert!(text.contains("1. unknown user - 1 days"));
    }

    #[tokio::test]
    async fn it_should_report_an_empty_leaderboard() {
        let mut ws = get_test_socket().await;

        send_event(&mut ws, "ada", "leaderboard", false).await;
        let (_, text) = receive_reply(&mut ws).await;
        assert!(text.contains("No check-ins recorded yet"));
    }
}
