use crate::domain::{
    conversation::{ConversationRef, ConversationSummary},
    feed::{Collection, FeedSnapshot},
    group::{CommunityKind, GroupOrChannel},
    session::SessionUser,
};

pub const AI_ASSISTANT_TITLE: &str = "AI Study Assistant";

/// Builds the conversation list: the AI assistant first, then the user's
/// study groups, then channels they joined. Placeholder items never appear.
pub fn build_conversations(
    snapshot: &FeedSnapshot,
    user: Option<&SessionUser>,
) -> Vec<ConversationSummary> {
    let mut conversations = vec![ConversationSummary {
        conversation: ConversationRef::ai(),
        title: AI_ASSISTANT_TITLE.to_owned(),
        last_message_preview: None,
        last_message_unix_ms: None,
        unread_count: 0,
        is_member: true,
    }];

    let Some(user) = user else {
        return conversations;
    };

    let mut seen: Vec<&str> = Vec::new();
    let groups = snapshot
        .my_groups
        .iter()
        .flatten()
        .chain(live_items(&snapshot.groups))
        .filter(|item| item.kind == CommunityKind::StudyGroup && item.is_member(&user.id));
    let channels = live_items(&snapshot.channels).filter(|item| item.is_member(&user.id));

    for item in groups.chain(channels) {
        if seen.contains(&item.id.as_str()) {
            continue;
        }
        seen.push(&item.id);
        conversations.push(summary_for(item, true));
    }

    conversations
}

/// Summary for a group or channel opened directly, member or not.
pub fn summary_for(item: &GroupOrChannel, is_member: bool) -> ConversationSummary {
    let activity = item.last_activity.as_ref();
    ConversationSummary {
        conversation: item.conversation(),
        title: item.name.clone(),
        last_message_preview: activity.map(|activity| activity.preview.clone()),
        last_message_unix_ms: activity.and_then(|activity| activity.at_unix_ms),
        unread_count: activity.map_or(0, |activity| activity.unread_count),
        is_member,
    }
}

fn live_items(collection: &Collection) -> impl Iterator<Item = &GroupOrChannel> {
    let items: &[GroupOrChannel] = if collection.is_placeholder() {
        &[]
    } else {
        collection.data()
    };
    items.iter()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        feed::Sourced,
        group::LastActivity,
        placeholders::{demo_channels, demo_study_groups},
    };

    fn item(id: &str, kind: CommunityKind, members: &[&str]) -> GroupOrChannel {
        GroupOrChannel {
            id: id.to_owned(),
            kind,
            name: format!("Name {id}"),
            subject: None,
            description: String::new(),
            member_ids: members.iter().map(|m| (*m).to_owned()).collect(),
            is_private: false,
            created_at_ms: None,
            admin_ids: Vec::new(),
            last_activity: None,
        }
    }

    fn user() -> SessionUser {
        SessionUser {
            id: "u1".to_owned(),
            name: "Ana".to_owned(),
            email: "ana@example.com".to_owned(),
            role: "student".to_owned(),
            avatar_ref: None,
        }
    }

    #[test]
    fn anonymous_user_sees_only_the_assistant() {
        let snapshot = FeedSnapshot {
            groups: Sourced::Live(vec![item("g1", CommunityKind::StudyGroup, &["u1"])]),
            channels: Sourced::Live(vec![]),
            my_groups: None,
        };

        let conversations = build_conversations(&snapshot, None);

        assert_eq!(conversations.len(), 1);
        assert!(conversations[0].conversation.is_ai());
    }

    #[test]
    fn lists_joined_groups_then_channels_without_duplicates() {
        let mut mine = item("g1", CommunityKind::StudyGroup, &["u1"]);
        mine.last_activity = Some(LastActivity {
            preview: "see you".to_owned(),
            at_unix_ms: Some(9),
            unread_count: 2,
        });
        let snapshot = FeedSnapshot {
            groups: Sourced::Live(vec![
                item("g1", CommunityKind::StudyGroup, &["u1"]),
                item("g2", CommunityKind::StudyGroup, &["u2"]),
            ]),
            channels: Sourced::Live(vec![
                item("c1", CommunityKind::Channel, &["u1"]),
                item("c2", CommunityKind::Channel, &[]),
            ]),
            my_groups: Some(vec![mine]),
        };

        let conversations = build_conversations(&snapshot, Some(&user()));

        let refs: Vec<String> = conversations
            .iter()
            .map(|summary| summary.conversation.to_string())
            .collect();
        assert_eq!(refs.len(), 3);
        assert_eq!(conversations[1].conversation, ConversationRef::study_group("g1"));
        assert_eq!(conversations[1].unread_count, 2);
        assert_eq!(conversations[2].conversation, ConversationRef::channel("c1"));
    }

    #[test]
    fn placeholder_items_are_not_conversations() {
        let snapshot = FeedSnapshot {
            groups: Sourced::Placeholder(demo_study_groups()),
            channels: Sourced::Placeholder(demo_channels()),
            my_groups: Some(vec![]),
        };

        let conversations = build_conversations(&snapshot, Some(&user()));

        assert_eq!(conversations.len(), 1);
    }
}
