use serde::{Deserialize, Serialize};

use super::{conversation::ConversationRef, session::SessionUser};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommunityKind {
    StudyGroup,
    Channel,
}

/// A study group or channel as listed in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupOrChannel {
    pub id: String,
    pub kind: CommunityKind,
    pub name: String,
    pub subject: Option<String>,
    pub description: String,
    pub member_ids: Vec<String>,
    pub is_private: bool,
    pub created_at_ms: Option<i64>,
    /// Owner first, then additional admins.
    pub admin_ids: Vec<String>,
    pub last_activity: Option<LastActivity>,
}

/// Latest message seen in a group or channel, for conversation previews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastActivity {
    pub preview: String,
    pub at_unix_ms: Option<i64>,
    pub unread_count: u32,
}

impl GroupOrChannel {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.member_ids.iter().any(|id| id == user_id) || self.admin_ids.iter().any(|id| id == user_id)
    }

    /// Group admins and platform admins may manage the group.
    pub fn is_admin(&self, user: &SessionUser) -> bool {
        user.is_admin() || self.admin_ids.iter().any(|id| *id == user.id)
    }

    pub fn member_count(&self) -> usize {
        self.member_ids.len()
    }

    pub fn conversation(&self) -> ConversationRef {
        match self.kind {
            CommunityKind::StudyGroup => ConversationRef::study_group(&self.id),
            CommunityKind::Channel => ConversationRef::channel(&self.id),
        }
    }

    /// Case-insensitive substring match over name, subject and description.
    /// `needle` must already be lowercase.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self
                .subject
                .as_deref()
                .is_some_and(|subject| subject.to_lowercase().contains(needle))
            || self.description.to_lowercase().contains(needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> GroupOrChannel {
        GroupOrChannel {
            id: "g1".to_owned(),
            kind: CommunityKind::StudyGroup,
            name: "Linear Algebra".to_owned(),
            subject: Some("Mathematics".to_owned()),
            description: "Weekly problem sets".to_owned(),
            member_ids: vec!["u2".to_owned()],
            is_private: false,
            created_at_ms: None,
            admin_ids: vec!["u1".to_owned()],
            last_activity: None,
        }
    }

    fn user(id: &str, role: &str) -> SessionUser {
        SessionUser {
            id: id.to_owned(),
            name: id.to_owned(),
            email: format!("{id}@example.com"),
            role: role.to_owned(),
            avatar_ref: None,
        }
    }

    #[test]
    fn owner_counts_as_member() {
        assert!(group().is_member("u1"));
        assert!(group().is_member("u2"));
        assert!(!group().is_member("u3"));
    }

    #[test]
    fn admin_check_covers_group_and_platform_admins() {
        assert!(group().is_admin(&user("u1", "student")));
        assert!(!group().is_admin(&user("u2", "student")));
        assert!(group().is_admin(&user("u9", "admin")));
    }

    #[test]
    fn matches_subject_and_description() {
        assert!(group().matches_lowercase("math"));
        assert!(group().matches_lowercase("problem"));
        assert!(!group().matches_lowercase("chemistry"));
    }

    #[test]
    fn conversation_follows_kind() {
        assert_eq!(group().conversation(), ConversationRef::study_group("g1"));
    }
}
