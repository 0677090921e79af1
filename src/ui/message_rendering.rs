//! Message list rendering.
//!
//! Produces plain text lines:
//! - a header line (time + sender) for the first message of a run,
//!   body lines indented below it
//! - consecutive messages from the same sender show the name only once
//! - date separators between messages from different days

use chrono::{Local, LocalResult, NaiveDate, TimeZone};

use crate::domain::message::Message;

const BODY_INDENT: &str = "      ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageListElement {
    /// Date separator line, e.g. "--- 14 Feb 2026 ---".
    DateSeparator(String),
    Message {
        time: String,
        sender: Option<String>,
        content: String,
    },
}

/// Groups consecutive messages from the same sender and inserts date
/// separators. Messages sent by `own_user_id` are attributed to "You".
pub fn build_message_list_elements(
    messages: &[Message],
    own_user_id: Option<&str>,
) -> Vec<MessageListElement> {
    let mut elements = Vec::new();
    let mut prev_date: Option<NaiveDate> = None;
    let mut prev_sender: Option<&str> = None;

    for message in messages {
        let msg_date = timestamp_to_date(message.created_at_ms);

        if prev_date != Some(msg_date) {
            elements.push(MessageListElement::DateSeparator(format_date(msg_date)));
            prev_sender = None;
        }

        let sender_name = effective_sender_name(message, own_user_id);
        let sender = (prev_sender != Some(sender_name)).then(|| sender_name.to_owned());

        elements.push(MessageListElement::Message {
            time: format_time(message.created_at_ms),
            sender,
            content: message.display_content(),
        });

        prev_date = Some(msg_date);
        prev_sender = Some(sender_name);
    }

    elements
}

pub fn render_lines(elements: &[MessageListElement]) -> Vec<String> {
    let mut lines = Vec::new();

    for element in elements {
        match element {
            MessageListElement::DateSeparator(date) => {
                lines.push(String::new());
                lines.push(format!("--- {date} ---"));
            }
            MessageListElement::Message {
                time,
                sender: Some(sender),
                content,
            } => {
                lines.push(format!("{time:>5} {sender}:"));
                if content.is_empty() {
                    lines.push(format!("{BODY_INDENT}[Empty message]"));
                }
                lines.extend(content.lines().map(|line| format!("{BODY_INDENT}{line}")));
            }
            MessageListElement::Message {
                time,
                sender: None,
                content,
            } => {
                let mut content_lines = content.lines();
                let first = content_lines.next().unwrap_or("[Empty message]");
                lines.push(format!("{time:>5} {first}"));
                lines.extend(content_lines.map(|line| format!("{BODY_INDENT}{line}")));
            }
        }
    }

    lines
}

fn effective_sender_name<'a>(message: &'a Message, own_user_id: Option<&str>) -> &'a str {
    match own_user_id {
        Some(own) if message.is_from(own) => "You",
        _ => &message.sender_name,
    }
}

fn timestamp_to_date(timestamp_ms: i64) -> NaiveDate {
    match Local.timestamp_millis_opt(timestamp_ms) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.date_naive(),
        LocalResult::None => Local::now().date_naive(),
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%-d %b %Y").to_string()
}

fn format_time(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.format("%H:%M").to_string(),
        LocalResult::None => "??:??".to_owned(),
    }
}
