use serde::{Deserialize, Serialize};

/// One inbound chat message as delivered by the platform bridge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageEvent {
    pub channel_id: String,
    pub sender_id: String,
    pub sender_is_bot: bool,
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "message_type", content = "data")]
pub enum SocketMessage {
    MessageEvent(MessageEvent),
    SendMessage {
        channel_id: String,
        text: String,
    },
    ResolveUser {
        seq: u64,
        user_id: String,
    },
    ResolveUserResponse {
        seq: u64,
        display_name: Option<String>,
    },
}
