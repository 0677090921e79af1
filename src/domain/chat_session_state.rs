//! Per-conversation message list with optimistic sends.
//!
//! Every selection bumps a load epoch. Tickets handed out for loads and
//! sends remember the epoch they were issued in; results carrying a stale
//! ticket are discarded, so a slow response can never write into a
//! conversation the user has already left (or re-opened).

use uuid::Uuid;

use super::{
    conversation::ConversationRef,
    message::{sort_chronologically, DeliveryState, Message, MessageId, MessageKind},
    session::SessionUser,
};

const DEFAULT_VIEWPORT_ROWS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Idle,
    Loading,
    Ready,
    Sending,
    /// Load failed; the list is empty and an error indicator is shown.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub conversation: ConversationRef,
    epoch: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTicket {
    pub conversation: ConversationRef,
    pub correlation_id: String,
    epoch: u64,
}

/// Server acknowledgment of a sent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendAck {
    pub message: Message,
    /// Companion reply produced by the AI assistant, if any.
    pub assistant_reply: Option<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSessionState {
    conversation: Option<ConversationRef>,
    title: String,
    epoch: u64,
    messages: Vec<Message>,
    phase: ChatPhase,
    pending: Vec<String>,
    selected_index: Option<usize>,
    scroll_offset: usize,
    viewport_rows: usize,
}

impl Default for ChatSessionState {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWPORT_ROWS)
    }
}

impl ChatSessionState {
    pub fn new(viewport_rows: usize) -> Self {
        Self {
            conversation: None,
            title: String::new(),
            epoch: 0,
            messages: Vec::new(),
            phase: ChatPhase::Idle,
            pending: Vec::new(),
            selected_index: None,
            scroll_offset: 0,
            viewport_rows: viewport_rows.max(1),
        }
    }

    pub fn conversation(&self) -> Option<&ConversationRef> {
        self.conversation.as_ref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> ChatPhase {
        self.phase
    }

    /// The tail of the list that fits the viewport, ending at the anchored
    /// (newest) message.
    pub fn visible_messages(&self) -> &[Message] {
        let end = self
            .selected_index
            .map_or(0, |index| index + 1)
            .min(self.messages.len());
        &self.messages[self.scroll_offset.min(end)..end]
    }

    /// Switches to `conversation`. The list is cleared before any fetch so
    /// no stale messages are shown.
    pub fn select(&mut self, conversation: ConversationRef, title: impl Into<String>) -> LoadTicket {
        self.epoch += 1;
        self.conversation = Some(conversation.clone());
        self.title = title.into();
        self.pending.clear();
        self.phase = ChatPhase::Loading;
        self.replace_messages(Vec::new());

        LoadTicket {
            conversation,
            epoch: self.epoch,
        }
    }

    /// Applies a finished history fetch. Returns `false` if the ticket is stale.
    pub fn apply_loaded<E>(&mut self, ticket: &LoadTicket, result: Result<Vec<Message>, E>) -> bool {
        if !self.is_current(&ticket.conversation, ticket.epoch) {
            return false;
        }

        match result {
            Ok(mut messages) => {
                sort_chronologically(&mut messages);
                self.replace_messages(messages);
                self.phase = self.settled_phase();
            }
            Err(_) => {
                self.replace_messages(Vec::new());
                self.phase = ChatPhase::Error;
            }
        }

        true
    }

    /// Appends `body` immediately under a local correlation id.
    ///
    /// Returns `None` when no conversation is open or history is still loading.
    pub fn begin_send(
        &mut self,
        author: &SessionUser,
        body: &str,
        now_unix_ms: i64,
    ) -> Option<SendTicket> {
        let conversation = self.conversation.clone()?;
        if self.phase == ChatPhase::Loading {
            return None;
        }

        let correlation_id = format!("local-{}", Uuid::new_v4());
        let optimistic = Message {
            id: MessageId::Local(correlation_id.clone()),
            sender_id: author.id.clone(),
            sender_name: author.name.clone(),
            body: body.to_owned(),
            created_at_ms: now_unix_ms,
            kind: MessageKind::Text,
            reply_to: None,
            reactions: Vec::new(),
            delivery: DeliveryState::Pending,
        };

        let mut messages = std::mem::take(&mut self.messages);
        messages.push(optimistic);
        self.replace_messages(messages);
        self.pending.push(correlation_id.clone());
        self.phase = ChatPhase::Sending;

        Some(SendTicket {
            conversation,
            correlation_id,
            epoch: self.epoch,
        })
    }

    /// Reconciles a server acknowledgment with its optimistic entry.
    ///
    /// The local entry is replaced in place by the durable record, so a sent
    /// message is never shown twice and never disappears.
    pub fn apply_ack(&mut self, ticket: &SendTicket, ack: SendAck) -> bool {
        if !self.is_current(&ticket.conversation, ticket.epoch) {
            return false;
        }
        self.pending.retain(|id| *id != ticket.correlation_id);

        let mut messages = std::mem::take(&mut self.messages);
        let mut confirmed = ack.message;
        confirmed.delivery = DeliveryState::Sent;

        let local_id = MessageId::Local(ticket.correlation_id.clone());
        let position = messages.iter().position(|message| message.id == local_id);
        // An ack without a timestamp keeps the optimistic send time.
        if confirmed.created_at_ms == 0 {
            if let Some(index) = position {
                confirmed.created_at_ms = messages[index].created_at_ms;
            }
        }
        let sent_at_ms = confirmed.created_at_ms;
        match position {
            Some(index) => messages[index] = confirmed,
            None => push_unique(&mut messages, confirmed),
        }

        if let Some(mut reply) = ack.assistant_reply {
            reply.delivery = DeliveryState::Sent;
            if reply.created_at_ms == 0 {
                reply.created_at_ms = sent_at_ms;
            }
            push_unique(&mut messages, reply);
        }

        sort_chronologically(&mut messages);
        self.replace_messages(messages);
        self.phase = self.settled_phase();
        true
    }

    /// Marks the optimistic entry as failed; it stays visible.
    pub fn apply_send_failure(&mut self, ticket: &SendTicket) -> bool {
        if !self.is_current(&ticket.conversation, ticket.epoch) {
            return false;
        }
        self.pending.retain(|id| *id != ticket.correlation_id);

        let local_id = MessageId::Local(ticket.correlation_id.clone());
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == local_id) {
            message.delivery = DeliveryState::Failed;
        }

        self.phase = self.settled_phase();
        true
    }

    fn is_current(&self, conversation: &ConversationRef, epoch: u64) -> bool {
        self.epoch == epoch && self.conversation.as_ref() == Some(conversation)
    }

    fn settled_phase(&self) -> ChatPhase {
        if self.pending.is_empty() {
            ChatPhase::Ready
        } else {
            ChatPhase::Sending
        }
    }

    fn replace_messages(&mut self, messages: Vec<Message>) {
        let length_changed = messages.len() != self.messages.len();
        self.messages = messages;
        if length_changed || self.messages.is_empty() {
            self.scroll_to_latest();
        }
    }

    fn scroll_to_latest(&mut self) {
        self.selected_index = self.messages.len().checked_sub(1);
        self.scroll_offset = self.messages.len().saturating_sub(self.viewport_rows);
    }
}

fn push_unique(messages: &mut Vec<Message>, message: Message) {
    if !messages.iter().any(|existing| existing.id == message.id) {
        messages.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> SessionUser {
        SessionUser {
            id: "u1".to_owned(),
            name: "Ada".to_owned(),
            email: "ada@example.com".to_owned(),
            role: "student".to_owned(),
            avatar_ref: None,
        }
    }

    fn server_message(id: &str, body: &str, created_at_ms: i64) -> Message {
        Message {
            id: MessageId::Server(id.to_owned()),
            sender_id: "u2".to_owned(),
            sender_name: "Grace".to_owned(),
            body: body.to_owned(),
            created_at_ms,
            kind: MessageKind::Text,
            reply_to: None,
            reactions: Vec::new(),
            delivery: DeliveryState::Sent,
        }
    }

    fn ready_state(conversation: ConversationRef, messages: Vec<Message>) -> ChatSessionState {
        let mut state = ChatSessionState::default();
        let ticket = state.select(conversation, "Chat");
        assert!(state.apply_loaded::<()>(&ticket, Ok(messages)));
        state
    }

    #[test]
    fn default_state_is_idle_and_empty() {
        let state = ChatSessionState::default();

        assert_eq!(state.phase(), ChatPhase::Idle);
        assert!(state.conversation().is_none());
        assert!(state.messages().is_empty());
        assert_eq!(state.selected_index, None);
    }

    #[test]
    fn selecting_clears_messages_before_any_response() {
        let mut state = ready_state(
            ConversationRef::study_group("a"),
            vec![server_message("m1", "hello", 1)],
        );

        let _ticket = state.select(ConversationRef::study_group("b"), "B");

        assert!(state.messages().is_empty());
        assert_eq!(state.phase(), ChatPhase::Loading);
        assert_eq!(state.conversation(), Some(&ConversationRef::study_group("b")));
    }

    #[test]
    fn loaded_messages_are_sorted_ascending() {
        let state = ready_state(
            ConversationRef::channel("c"),
            vec![server_message("m2", "second", 20), server_message("m1", "first", 10)],
        );

        let bodies: Vec<&str> = state.messages().iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
        assert_eq!(state.phase(), ChatPhase::Ready);
        assert_eq!(state.selected_index, Some(1));
    }

    #[test]
    fn failed_load_leaves_empty_list_with_error_phase() {
        let mut state = ChatSessionState::default();
        let ticket = state.select(ConversationRef::channel("c"), "C");

        assert!(state.apply_loaded::<&str>(&ticket, Err("boom")));

        assert_eq!(state.phase(), ChatPhase::Error);
        assert!(state.messages().is_empty());
    }

    #[test]
    fn late_load_for_previous_conversation_is_discarded() {
        let mut state = ChatSessionState::default();
        let ticket_a = state.select(ConversationRef::study_group("a"), "A");
        let _ticket_b = state.select(ConversationRef::study_group("b"), "B");

        let applied =
            state.apply_loaded::<()>(&ticket_a, Ok(vec![server_message("m1", "from a", 1)]));

        assert!(!applied);
        assert!(state.messages().is_empty());
        assert_eq!(state.phase(), ChatPhase::Loading);
    }

    #[test]
    fn superseded_load_of_same_conversation_is_discarded() {
        let mut state = ChatSessionState::default();
        let first = state.select(ConversationRef::channel("c"), "C");
        let second = state.select(ConversationRef::channel("c"), "C");

        assert!(!state.apply_loaded::<()>(&first, Ok(vec![server_message("old", "old", 1)])));
        assert!(state.apply_loaded::<()>(&second, Ok(vec![server_message("new", "new", 2)])));
        assert_eq!(state.messages()[0].body, "new");
    }

    #[test]
    fn optimistic_send_appears_immediately() {
        let mut state = ready_state(ConversationRef::channel("c"), vec![server_message("m1", "hi", 1)]);

        let ticket = state.begin_send(&author(), "hello there", 5).expect("send allowed");

        let last = state.messages().last().expect("appended");
        assert_eq!(last.body, "hello there");
        assert_eq!(last.kind, MessageKind::Text);
        assert_eq!(last.delivery, DeliveryState::Pending);
        assert_eq!(last.id, MessageId::Local(ticket.correlation_id.clone()));
        assert_eq!(state.phase(), ChatPhase::Sending);
        assert_eq!(state.selected_index, Some(1));
    }

    #[test]
    fn send_is_refused_without_conversation_or_while_loading() {
        let mut idle = ChatSessionState::default();
        assert!(idle.begin_send(&author(), "x", 0).is_none());

        let mut loading = ChatSessionState::default();
        let _ticket = loading.select(ConversationRef::ai(), "AI");
        assert!(loading.begin_send(&author(), "x", 0).is_none());
    }

    #[test]
    fn ack_replaces_optimistic_entry_without_duplication() {
        let mut state = ready_state(ConversationRef::channel("c"), vec![]);
        let ticket = state.begin_send(&author(), "hello", 5).expect("send allowed");

        let mut durable = server_message("srv-1", "hello", 6);
        durable.sender_id = "u1".to_owned();
        assert!(state.apply_ack(
            &ticket,
            SendAck {
                message: durable,
                assistant_reply: None,
            }
        ));

        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].id, MessageId::Server("srv-1".to_owned()));
        assert_eq!(state.messages()[0].body, "hello");
        assert_eq!(state.phase(), ChatPhase::Ready);
    }

    #[test]
    fn ai_ack_appends_assistant_reply_after_user_message() {
        let mut state = ready_state(ConversationRef::ai(), vec![]);
        let ticket = state.begin_send(&author(), "explain osmosis", 5).expect("send allowed");

        state.apply_ack(
            &ticket,
            SendAck {
                message: server_message("q1", "explain osmosis", 5),
                assistant_reply: Some(server_message("a1", "Osmosis is...", 7)),
            },
        );

        let bodies: Vec<&str> = state.messages().iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["explain osmosis", "Osmosis is..."]);
        assert_eq!(state.selected_index, Some(1));
    }

    #[test]
    fn ack_after_switching_away_is_discarded() {
        let mut state = ready_state(ConversationRef::study_group("a"), vec![]);
        let ticket = state.begin_send(&author(), "hello", 5).expect("send allowed");
        let _load = state.select(ConversationRef::study_group("b"), "B");

        let applied = state.apply_ack(
            &ticket,
            SendAck {
                message: server_message("srv-1", "hello", 6),
                assistant_reply: None,
            },
        );

        assert!(!applied);
        assert!(state.messages().is_empty());
    }

    #[test]
    fn failed_send_keeps_message_marked_failed() {
        let mut state = ready_state(ConversationRef::channel("c"), vec![]);
        let ticket = state.begin_send(&author(), "hello", 5).expect("send allowed");

        assert!(state.apply_send_failure(&ticket));

        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].delivery, DeliveryState::Failed);
        assert_eq!(state.phase(), ChatPhase::Ready);
    }

    #[test]
    fn phase_stays_sending_until_every_send_settles() {
        let mut state = ready_state(ConversationRef::channel("c"), vec![]);
        let first = state.begin_send(&author(), "one", 1).expect("send allowed");
        let _second = state.begin_send(&author(), "two", 2).expect("send allowed");

        state.apply_ack(
            &first,
            SendAck {
                message: server_message("s1", "one", 1),
                assistant_reply: None,
            },
        );

        assert_eq!(state.phase(), ChatPhase::Sending);
        assert_eq!(state.pending.len(), 1);
    }

    #[test]
    fn view_follows_tail_when_list_outgrows_viewport() {
        let mut state = ChatSessionState::new(3);
        let ticket = state.select(ConversationRef::channel("c"), "C");
        let history: Vec<Message> = (0..5)
            .map(|i| server_message(&format!("m{i}"), &format!("msg {i}"), i))
            .collect();
        state.apply_loaded::<()>(&ticket, Ok(history));

        assert_eq!(state.scroll_offset, 2);
        assert_eq!(state.visible_messages().len(), 3);

        state.begin_send(&author(), "newest", 10).expect("send allowed");

        assert_eq!(state.scroll_offset, 3);
        assert_eq!(state.visible_messages().last().map(|m| m.body.as_str()), Some("newest"));
    }

    #[test]
    fn ack_without_timestamp_keeps_send_time_and_position() {
        let mut state = ready_state(
            ConversationRef::channel("c"),
            vec![server_message("m1", "earlier", 1_000)],
        );
        let ticket = state.begin_send(&author(), "latest", 5_000).expect("send allowed");

        state.apply_ack(
            &ticket,
            SendAck {
                message: server_message("srv-1", "latest", 0),
                assistant_reply: None,
            },
        );

        let last = state.messages().last().expect("message kept");
        assert_eq!(last.id, MessageId::Server("srv-1".to_owned()));
        assert_eq!(last.created_at_ms, 5_000);
    }

    #[test]
    fn assistant_reply_without_timestamp_follows_question() {
        let mut state = ready_state(ConversationRef::ai(), vec![server_message("m1", "old", 1_000)]);
        let ticket = state.begin_send(&author(), "why?", 5_000).expect("send allowed");

        state.apply_ack(
            &ticket,
            SendAck {
                message: server_message("q1", "why?", 0),
                assistant_reply: Some(server_message("a1", "because", 0)),
            },
        );

        let bodies: Vec<&str> = state.messages().iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["old", "why?", "because"]);
    }
}
