//! Plain-text rendering of the feed, the conversation list and notices.

use crate::domain::{
    conversation::ConversationSummary,
    conversation_list_state::{ConversationListState, ConversationListUiState},
    feed::{actions_for, Collection, FeedSnapshot, Sourced},
    group::GroupOrChannel,
    notice::UiNotice,
    session::SessionUser,
};

const PREVIEW_CHARS: usize = 48;

pub fn render_feed(snapshot: &FeedSnapshot, user: Option<&SessionUser>) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(mine) = &snapshot.my_groups {
        lines.push("My groups".to_owned());
        if mine.is_empty() {
            lines.push("  (you have not joined any groups yet)".to_owned());
        }
        for item in mine {
            lines.push(item_line(Sourced::Live(item), user));
        }
        lines.push(String::new());
    }

    section(&mut lines, "Study groups", &snapshot.groups, user);
    lines.push(String::new());
    section(&mut lines, "Channels", &snapshot.channels, user);

    lines
}

fn section(lines: &mut Vec<String>, title: &str, collection: &Collection, user: Option<&SessionUser>) {
    match collection {
        Sourced::Live(_) => lines.push(title.to_owned()),
        Sourced::Placeholder(_) => lines.push(format!("{title} (sample data)")),
    }

    if collection.data().is_empty() {
        lines.push("  (nothing matches)".to_owned());
    }
    for item in collection.data() {
        let item = match collection {
            Sourced::Live(_) => Sourced::Live(item),
            Sourced::Placeholder(_) => Sourced::Placeholder(item),
        };
        lines.push(item_line(item, user));
    }
}

fn item_line(item: Sourced<&GroupOrChannel>, user: Option<&SessionUser>) -> String {
    let group = *item.data();
    let actions = actions_for(item, user);

    let mut tags = Vec::new();
    if group.is_private {
        tags.push("private");
    }
    if actions.can_leave {
        tags.push("member");
    }
    if actions.can_delete {
        tags.push("admin");
    }
    if actions.can_dismiss {
        tags.push("demo");
    }

    let subject = group
        .subject
        .as_deref()
        .map(|subject| format!(" [{subject}]"))
        .unwrap_or_default();
    let tags = if tags.is_empty() {
        String::new()
    } else {
        format!(" ({})", tags.join(", "))
    };

    format!(
        "  {id:<26} {name}{subject} - {count} members{tags}",
        id = group.id,
        name = group.name,
        count = group.member_count(),
    )
}

pub fn render_conversations(state: &ConversationListState) -> Vec<String> {
    match state.ui_state() {
        ConversationListUiState::Loading => vec!["Loading conversations...".to_owned()],
        ConversationListUiState::Empty => vec!["No conversations yet.".to_owned()],
        ConversationListUiState::Ready => {
            let selected = state.selected_index();
            state
                .conversations()
                .iter()
                .enumerate()
                .map(|(index, summary)| {
                    let marker = if Some(index) == selected { '>' } else { ' ' };
                    format!("{marker} {}", conversation_line(summary))
                })
                .collect()
        }
    }
}

fn conversation_line(summary: &ConversationSummary) -> String {
    let unread = if summary.unread_count > 0 {
        format!(" ({} unread)", summary.unread_count)
    } else {
        String::new()
    };
    let preview = summary
        .last_message_preview
        .as_deref()
        .map(|preview| format!(" - {}", truncate(preview, PREVIEW_CHARS)))
        .unwrap_or_default();

    format!(
        "{:<8} {}{unread}{preview}   [{}]",
        summary.conversation.kind.label(),
        summary.title,
        summary.conversation
    )
}

pub fn render_notice(notice: &UiNotice) -> String {
    match notice {
        UiNotice::FieldError { .. } => format!("invalid input: {notice}"),
        _ => format!("! {notice}"),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    let single_line = text.lines().next().unwrap_or_default();
    if single_line.chars().count() <= max_chars {
        return single_line.to_owned();
    }
    let cut: String = single_line.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{cut}…")
}
