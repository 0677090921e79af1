use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of chat context, used for routing and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversationKind {
    /// Private conversation with the AI study assistant.
    Ai,
    StudyGroup,
    Channel,
}

impl ConversationKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::StudyGroup => "group",
            Self::Channel => "channel",
        }
    }
}

/// Identity of a conversation. Two refs are the same conversation only if
/// both kind and id match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationRef {
    pub kind: ConversationKind,
    pub id: String,
}

impl ConversationRef {
    pub const AI_ASSISTANT_ID: &'static str = "assistant";

    pub fn ai() -> Self {
        Self {
            kind: ConversationKind::Ai,
            id: Self::AI_ASSISTANT_ID.to_owned(),
        }
    }

    pub fn study_group(id: impl Into<String>) -> Self {
        Self {
            kind: ConversationKind::StudyGroup,
            id: id.into(),
        }
    }

    pub fn channel(id: impl Into<String>) -> Self {
        Self {
            kind: ConversationKind::Channel,
            id: id.into(),
        }
    }

    pub fn is_ai(&self) -> bool {
        self.kind == ConversationKind::Ai
    }
}

impl fmt::Display for ConversationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.label(), self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub conversation: ConversationRef,
    pub title: String,
    pub last_message_preview: Option<String>,
    pub last_message_unix_ms: Option<i64>,
    pub unread_count: u32,
    /// Whether the current user may post here.
    pub is_member: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_includes_kind() {
        assert_ne!(ConversationRef::study_group("x"), ConversationRef::channel("x"));
    }

    #[test]
    fn displays_as_kind_and_id() {
        assert_eq!(ConversationRef::channel("c1").to_string(), "channel:c1");
        assert_eq!(ConversationRef::ai().to_string(), "ai:assistant");
    }
}
