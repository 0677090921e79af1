//! Use case for posting a message to a conversation.
//!
//! Provides the `MessageSender` seam and the validation rules applied before
//! anything is shown optimistically or sent over the wire.

use async_trait::async_trait;

use crate::domain::{
    chat_session_state::SendAck, conversation::ConversationRef, notice::UiNotice,
    session::SessionUser,
};

/// Command to post a message to a specific conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageCommand {
    pub conversation: ConversationRef,
    pub text: String,
    /// Local correlation id echoed to the server as `clientId`.
    pub correlation_id: String,
}

/// Errors reported by the transport behind `MessageSender`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendMessageSourceError {
    Unauthorized,
    /// The caller is not a member of the target group or channel.
    Forbidden,
    ConversationNotFound,
    Unavailable,
    InvalidData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendMessageError {
    /// Message text is empty after trimming whitespace.
    EmptyMessage,
    /// No active session; the user has to sign in first.
    LoginRequired,
    /// Posting requires membership in the group or channel.
    NotAMember,
    /// No conversation is open or its history is still loading.
    NoActiveConversation,
    Unauthorized,
    ConversationNotFound,
    TemporarilyUnavailable,
    DataContractViolation,
}

impl SendMessageError {
    pub fn notice(&self) -> UiNotice {
        match self {
            Self::EmptyMessage => UiNotice::FieldError {
                field: "message",
                message: "Type a message first.".to_owned(),
            },
            Self::LoginRequired => UiNotice::LoginRequired,
            Self::NotAMember => UiNotice::Banner {
                message: "Join this group to post messages.".to_owned(),
                retryable: false,
            },
            Self::NoActiveConversation => UiNotice::Banner {
                message: "Open a conversation before sending.".to_owned(),
                retryable: false,
            },
            Self::Unauthorized => UiNotice::SessionExpired,
            Self::ConversationNotFound => UiNotice::Banner {
                message: "This conversation no longer exists.".to_owned(),
                retryable: false,
            },
            Self::TemporarilyUnavailable => {
                UiNotice::banner("Message not delivered. Try sending it again.")
            }
            Self::DataContractViolation => UiNotice::Banner {
                message: "The server reply could not be understood.".to_owned(),
                retryable: false,
            },
        }
    }
}

#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Posts `text` and returns the server's durable record of it.
    async fn send_message(
        &self,
        conversation: &ConversationRef,
        text: &str,
        correlation_id: &str,
    ) -> Result<SendAck, SendMessageSourceError>;
}

/// Checks whether `text` may be sent by `author`; returns the trimmed body.
///
/// Runs before the optimistic append so a rejected message never appears.
pub fn validate_outgoing<'a>(
    author: Option<&SessionUser>,
    text: &'a str,
) -> Result<&'a str, SendMessageError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SendMessageError::EmptyMessage);
    }
    if author.is_none() {
        return Err(SendMessageError::LoginRequired);
    }
    Ok(text)
}

pub async fn send_message(
    sender: &dyn MessageSender,
    command: SendMessageCommand,
) -> Result<SendAck, SendMessageError> {
    let text = command.text.trim();
    if text.is_empty() {
        return Err(SendMessageError::EmptyMessage);
    }

    sender
        .send_message(&command.conversation, text, &command.correlation_id)
        .await
        .map_err(map_source_error)
}

fn map_source_error(error: SendMessageSourceError) -> SendMessageError {
    match error {
        SendMessageSourceError::Unauthorized => SendMessageError::Unauthorized,
        SendMessageSourceError::Forbidden => SendMessageError::NotAMember,
        SendMessageSourceError::ConversationNotFound => SendMessageError::ConversationNotFound,
        SendMessageSourceError::Unavailable => SendMessageError::TemporarilyUnavailable,
        SendMessageSourceError::InvalidData => SendMessageError::DataContractViolation,
    }
}
