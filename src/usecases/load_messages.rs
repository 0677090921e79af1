use async_trait::async_trait;

use crate::domain::{
    conversation::ConversationRef,
    message::{sort_chronologically, Message},
    notice::UiNotice,
};

const DEFAULT_MESSAGES_PAGE_SIZE: usize = 50;
const MAX_MESSAGES_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadMessagesQuery {
    pub conversation: ConversationRef,
    pub limit: usize,
}

impl LoadMessagesQuery {
    pub fn new(conversation: ConversationRef) -> Self {
        Self {
            conversation,
            limit: DEFAULT_MESSAGES_PAGE_SIZE,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn normalized_limit(&self) -> usize {
        match self.limit {
            0 => DEFAULT_MESSAGES_PAGE_SIZE,
            value if value > MAX_MESSAGES_PAGE_SIZE => MAX_MESSAGES_PAGE_SIZE,
            value => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadMessagesOutput {
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagesSourceError {
    Unauthorized,
    Unavailable,
    InvalidData,
    ConversationNotFound,
}

#[async_trait]
pub trait MessagesSource: Send + Sync {
    async fn list_messages(
        &self,
        conversation: &ConversationRef,
        limit: usize,
    ) -> Result<Vec<Message>, MessagesSourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadMessagesError {
    Unauthorized,
    TemporarilyUnavailable,
    DataContractViolation,
    ConversationNotFound,
}

impl LoadMessagesError {
    pub fn notice(&self) -> UiNotice {
        match self {
            Self::Unauthorized => UiNotice::SessionExpired,
            Self::TemporarilyUnavailable => {
                UiNotice::banner("Messages are unavailable right now. Try again shortly.")
            }
            Self::DataContractViolation => UiNotice::Banner {
                message: "The server returned messages in an unexpected format.".to_owned(),
                retryable: false,
            },
            Self::ConversationNotFound => UiNotice::Banner {
                message: "This conversation no longer exists.".to_owned(),
                retryable: false,
            },
        }
    }
}

/// Fetches the most recent page of history, oldest first.
pub async fn load_messages(
    source: &dyn MessagesSource,
    query: LoadMessagesQuery,
) -> Result<LoadMessagesOutput, LoadMessagesError> {
    let limit = query.normalized_limit();
    let mut messages = source
        .list_messages(&query.conversation, limit)
        .await
        .map_err(map_source_error)?;

    sort_chronologically(&mut messages);
    Ok(LoadMessagesOutput { messages })
}

fn map_source_error(error: MessagesSourceError) -> LoadMessagesError {
    match error {
        MessagesSourceError::Unauthorized => LoadMessagesError::Unauthorized,
        MessagesSourceError::Unavailable => LoadMessagesError::TemporarilyUnavailable,
        MessagesSourceError::InvalidData => LoadMessagesError::DataContractViolation,
        MessagesSourceError::ConversationNotFound => LoadMessagesError::ConversationNotFound,
    }
}
