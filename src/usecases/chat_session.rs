//! Drives a single open conversation: loading history and posting messages
//! through the optimistic send pipeline.
//!
//! Each step is split into a synchronous `begin_*` half that updates state
//! immediately and a `finish_*` half that applies the network result, so a
//! response that arrives after the user switched away is dropped.

use crate::{
    domain::{
        chat_session_state::{ChatSessionState, LoadTicket, SendAck, SendTicket},
        conversation::ConversationSummary,
        notice::UiNotice,
        session::SessionUser,
    },
    infra::contracts::Clock,
    usecases::{
        load_messages::{
            load_messages, LoadMessagesError, LoadMessagesOutput, LoadMessagesQuery,
            MessagesSource,
        },
        send_message::{
            send_message, validate_outgoing, MessageSender, SendMessageCommand, SendMessageError,
        },
    },
};

/// A send that has been shown optimistically and awaits the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    pub ticket: SendTicket,
    pub text: String,
}

pub struct ChatSession<'a> {
    state: ChatSessionState,
    messages: &'a dyn MessagesSource,
    sender: &'a dyn MessageSender,
    clock: &'a dyn Clock,
    history_limit: usize,
    can_post: bool,
    notice: Option<UiNotice>,
}

impl<'a> ChatSession<'a> {
    pub fn new(
        messages: &'a dyn MessagesSource,
        sender: &'a dyn MessageSender,
        clock: &'a dyn Clock,
        history_limit: usize,
        viewport_rows: usize,
    ) -> Self {
        Self {
            state: ChatSessionState::new(viewport_rows),
            messages,
            sender,
            clock,
            history_limit,
            can_post: false,
            notice: None,
        }
    }

    pub fn state(&self) -> &ChatSessionState {
        &self.state
    }

    pub fn notice(&self) -> Option<&UiNotice> {
        self.notice.as_ref()
    }

    pub async fn open(&mut self, summary: &ConversationSummary) {
        let ticket = self.begin_open(summary);
        let result = load_messages(
            self.messages,
            LoadMessagesQuery::new(ticket.conversation.clone()).with_limit(self.history_limit),
        )
        .await;
        self.finish_open(&ticket, result);
    }

    pub fn begin_open(&mut self, summary: &ConversationSummary) -> LoadTicket {
        self.notice = None;
        self.can_post = summary.conversation.is_ai() || summary.is_member;
        self.state
            .select(summary.conversation.clone(), summary.title.clone())
    }

    pub fn finish_open(
        &mut self,
        ticket: &LoadTicket,
        result: Result<LoadMessagesOutput, LoadMessagesError>,
    ) {
        let notice = result.as_ref().err().map(LoadMessagesError::notice);
        if self
            .state
            .apply_loaded(ticket, result.map(|output| output.messages))
        {
            if let Some(notice) = notice {
                tracing::warn!(code = "CHAT_HISTORY_FAILED", conversation = %ticket.conversation, "history load failed");
                self.notice = Some(notice);
            }
        } else {
            tracing::debug!(conversation = %ticket.conversation, "discarded stale history response");
        }
    }

    /// Validates and submits `text`, returning once the server has answered.
    pub async fn submit(
        &mut self,
        author: Option<&SessionUser>,
        text: &str,
    ) -> Result<(), SendMessageError> {
        let pending = self.begin_submit(author, text)?;
        let result = send_message(
            self.sender,
            SendMessageCommand {
                conversation: pending.ticket.conversation.clone(),
                text: pending.text.clone(),
                correlation_id: pending.ticket.correlation_id.clone(),
            },
        )
        .await;
        self.finish_submit(&pending, result)
    }

    /// Validates `text` and appends it optimistically.
    ///
    /// On rejection nothing is appended and the sender is never called.
    pub fn begin_submit(
        &mut self,
        author: Option<&SessionUser>,
        text: &str,
    ) -> Result<PendingSend, SendMessageError> {
        self.notice = None;
        let outcome = validate_outgoing(author, text).and_then(|body| {
            let author = author.ok_or(SendMessageError::LoginRequired)?;
            if !self.can_post {
                return Err(SendMessageError::NotAMember);
            }
            self.state
                .begin_send(author, body, self.clock.now_unix_ms())
                .map(|ticket| PendingSend {
                    ticket,
                    text: body.to_owned(),
                })
                .ok_or(SendMessageError::NoActiveConversation)
        });

        outcome.map_err(|error| {
            self.notice = Some(error.notice());
            error
        })
    }

    pub fn finish_submit(
        &mut self,
        pending: &PendingSend,
        result: Result<SendAck, SendMessageError>,
    ) -> Result<(), SendMessageError> {
        match result {
            Ok(ack) => {
                tracing::debug!(
                    conversation = %pending.ticket.conversation,
                    message_id = ack.message.id.as_str(),
                    "send acknowledged"
                );
                if !self.state.apply_ack(&pending.ticket, ack) {
                    tracing::debug!(conversation = %pending.ticket.conversation, "discarded late send acknowledgment");
                }
                Ok(())
            }
            Err(error) => {
                tracing::warn!(
                    code = "CHAT_SEND_FAILED",
                    conversation = %pending.ticket.conversation,
                    error = ?error,
                    "message not delivered"
                );
                if self.state.apply_send_failure(&pending.ticket) {
                    self.notice = Some(error.notice());
                }
                Err(error)
            }
        }
    }
}
