//! Static demo collections shown when the backend has nothing to list yet.

use super::group::{CommunityKind, GroupOrChannel};

pub const PLACEHOLDER_ID_PREFIX: &str = "demo-";

pub fn demo_study_groups() -> Vec<GroupOrChannel> {
    vec![
        demo(
            "demo-group-1",
            CommunityKind::StudyGroup,
            "Calculus Study Circle",
            "Mathematics",
            "Work through limits, derivatives and integrals together.",
        ),
        demo(
            "demo-group-2",
            CommunityKind::StudyGroup,
            "Organic Chemistry Crew",
            "Chemistry",
            "Reaction mechanisms, flashcards and exam prep.",
        ),
    ]
}

pub fn demo_channels() -> Vec<GroupOrChannel> {
    vec![
        demo(
            "demo-channel-1",
            CommunityKind::Channel,
            "General",
            "Community",
            "Introduce yourself and find study partners.",
        ),
        demo(
            "demo-channel-2",
            CommunityKind::Channel,
            "Exam Tips",
            "Study Skills",
            "Share revision techniques that work for you.",
        ),
    ]
}

pub fn is_placeholder_id(id: &str) -> bool {
    id.starts_with(PLACEHOLDER_ID_PREFIX)
}

fn demo(
    id: &str,
    kind: CommunityKind,
    name: &str,
    subject: &str,
    description: &str,
) -> GroupOrChannel {
    GroupOrChannel {
        id: id.to_owned(),
        kind,
        name: name.to_owned(),
        subject: Some(subject.to_owned()),
        description: description.to_owned(),
        member_ids: Vec::new(),
        is_private: false,
        created_at_ms: None,
        admin_ids: Vec::new(),
        last_activity: None,
    }
}
