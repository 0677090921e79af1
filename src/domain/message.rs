use serde::{Deserialize, Serialize};

/// Message identity: a client-generated correlation id until the server
/// assigns a durable one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageId {
    Local(String),
    Server(String),
}

impl MessageId {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Local(id) | Self::Server(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MessageKind {
    #[default]
    Text,
    System,
}

/// Delivery state of a message as seen by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeliveryState {
    /// Appended optimistically, server has not acknowledged yet.
    Pending,
    #[default]
    Sent,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: String,
    pub sender_name: String,
    pub body: String,
    pub created_at_ms: i64,
    pub kind: MessageKind,
    pub reply_to: Option<String>,
    pub reactions: Vec<Reaction>,
    pub delivery: DeliveryState,
}

impl Message {
    /// Returns the text to display, prefixed for system notices and
    /// suffixed with a delivery marker when not yet confirmed.
    pub fn display_content(&self) -> String {
        let body = match self.kind {
            MessageKind::Text => self.body.clone(),
            MessageKind::System => format!("[{}]", self.body),
        };

        match self.delivery {
            DeliveryState::Sent => body,
            DeliveryState::Pending => format!("{body} (sending…)"),
            DeliveryState::Failed => format!("{body} (not sent)"),
        }
    }

    pub fn is_from(&self, user_id: &str) -> bool {
        self.sender_id == user_id
    }
}

/// Orders messages by creation time, keeping arrival order for ties.
pub fn sort_chronologically(messages: &mut [Message]) {
    messages.sort_by_key(|message| message.created_at_ms);
}
