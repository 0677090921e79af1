use super::conversation::ConversationSummary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationListUiState {
    Loading,
    Ready,
    Empty,
}

/// Sidebar of conversations. The first entry is selected whenever the list
/// is non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationListState {
    ui_state: ConversationListUiState,
    conversations: Vec<ConversationSummary>,
    selected_index: Option<usize>,
}

impl Default for ConversationListState {
    fn default() -> Self {
        Self {
            ui_state: ConversationListUiState::Loading,
            conversations: Vec::new(),
            selected_index: None,
        }
    }
}

impl ConversationListState {
    pub fn ui_state(&self) -> ConversationListUiState {
        self.ui_state.clone()
    }

    pub fn conversations(&self) -> &[ConversationSummary] {
        &self.conversations
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected_index
    }

    pub fn set_ready(&mut self, conversations: Vec<ConversationSummary>) {
        if conversations.is_empty() {
            self.ui_state = ConversationListUiState::Empty;
            self.conversations.clear();
            self.selected_index = None;
            return;
        }

        self.ui_state = ConversationListUiState::Ready;
        self.conversations = conversations;
        self.selected_index = Some(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::ConversationRef;

    fn group(id: &str, title: &str) -> ConversationSummary {
        ConversationSummary {
            conversation: ConversationRef::study_group(id),
            title: title.to_owned(),
            last_message_preview: None,
            last_message_unix_ms: None,
            unread_count: 0,
            is_member: true,
        }
    }

    #[test]
    fn default_state_is_loading_without_selection() {
        let state = ConversationListState::default();

        assert_eq!(state.ui_state(), ConversationListUiState::Loading);
        assert!(state.conversations().is_empty());
        assert_eq!(state.selected_index(), None);
    }

    #[test]
    fn set_ready_with_data_selects_first_item() {
        let mut state = ConversationListState::default();

        state.set_ready(vec![group("1", "Physics"), group("2", "Biology")]);

        assert_eq!(state.ui_state(), ConversationListUiState::Ready);
        assert_eq!(state.selected_index(), Some(0));
        assert_eq!(state.conversations()[0].conversation.id, "1");
    }

    #[test]
    fn set_ready_with_empty_list_transitions_to_empty_state() {
        let mut state = ConversationListState::default();
        state.set_ready(vec![group("1", "Physics")]);

        state.set_ready(vec![]);

        assert_eq!(state.ui_state(), ConversationListUiState::Empty);
        assert!(state.conversations().is_empty());
        assert_eq!(state.selected_index(), None);
    }
}
