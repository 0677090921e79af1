//! Wire shapes of the REST API and their conversion into domain types.
//!
//! The backend returns populated references inconsistently: a member or
//! sender is either a bare id or an embedded user object. Both forms are
//! accepted.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{
        chat_session_state::SendAck,
        conversation::ConversationRef,
        group::{CommunityKind, GroupOrChannel, LastActivity},
        message::{DeliveryState, Message, MessageId, MessageKind, Reaction},
        session::SessionUser,
    },
    infra::credentials::AuthGrant,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RefDto {
    Id(String),
    Object {
        #[serde(alias = "_id")]
        id: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        avatar: Option<String>,
    },
}

impl RefDto {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) | Self::Object { id, .. } => id,
        }
    }

    fn name(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::Object { name, .. } => name.as_deref(),
        }
    }
}

/// A `members[]` entry: `"id"`, `{user, role}` or an embedded user.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MemberRefDto {
    Id(String),
    Entry {
        user: RefDto,
        #[serde(default)]
        role: Option<String>,
    },
    User(RefDto),
}

impl MemberRefDto {
    fn user_id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Entry { user, .. } | Self::User(user) => user.id(),
        }
    }

    fn is_admin_entry(&self) -> bool {
        matches!(self, Self::Entry { role: Some(role), .. } if matches!(role.as_str(), "admin" | "owner" | "creator"))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessageDto {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDto {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub members: Vec<MemberRefDto>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, alias = "owner")]
    pub creator: Option<RefDto>,
    #[serde(default)]
    pub admins: Vec<RefDto>,
    #[serde(default)]
    pub last_message: Option<LastMessageDto>,
    #[serde(default)]
    pub unread_count: Option<u32>,
}

impl GroupDto {
    pub fn into_domain(self, kind: CommunityKind) -> GroupOrChannel {
        let mut admin_ids: Vec<String> = self
            .creator
            .iter()
            .chain(self.admins.iter())
            .map(|admin| admin.id().to_owned())
            .collect();
        for member in self.members.iter().filter(|m| m.is_admin_entry()) {
            admin_ids.push(member.user_id().to_owned());
        }
        admin_ids.dedup();

        let last_activity = self.last_message.map(|last| LastActivity {
            preview: last.content.unwrap_or_default(),
            at_unix_ms: last.created_at.as_deref().and_then(parse_timestamp_ms),
            unread_count: self.unread_count.unwrap_or(0),
        });

        GroupOrChannel {
            id: self.id,
            kind,
            name: self.name,
            subject: self.subject.filter(|subject| !subject.is_empty()),
            description: self.description.unwrap_or_default(),
            member_ids: self
                .members
                .iter()
                .map(|member| member.user_id().to_owned())
                .collect(),
            is_private: self.is_private,
            created_at_ms: self.created_at.as_deref().and_then(parse_timestamp_ms),
            admin_ids,
            last_activity,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupsEnvelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default, alias = "studyGroups", alias = "data")]
    pub groups: Option<Vec<GroupDto>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelsEnvelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default, alias = "data")]
    pub channels: Option<Vec<GroupDto>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReactionDto {
    pub emoji: String,
    pub user: RefDto,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub sender: Option<RefDto>,
    /// AI history uses `role` instead of a sender.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(alias = "message", alias = "text")]
    pub content: String,
    #[serde(default, alias = "timestamp")]
    pub created_at: Option<String>,
    #[serde(default, alias = "messageType")]
    pub r#type: Option<String>,
    #[serde(default)]
    pub reply_to: Option<RefDto>,
    #[serde(default)]
    pub reactions: Vec<ReactionDto>,
}

impl MessageDto {
    pub fn into_domain(self) -> Message {
        let (sender_id, sender_name) = match (&self.sender, self.role.as_deref()) {
            (Some(sender), _) => (
                sender.id().to_owned(),
                sender.name().unwrap_or("Unknown").to_owned(),
            ),
            (None, Some("assistant" | "ai")) => (
                ConversationRef::AI_ASSISTANT_ID.to_owned(),
                "StudyBuddy AI".to_owned(),
            ),
            (None, _) => (String::new(), "You".to_owned()),
        };

        let kind = match self.r#type.as_deref() {
            Some("system") => MessageKind::System,
            _ => MessageKind::Text,
        };

        Message {
            id: MessageId::Server(self.id),
            sender_id,
            sender_name,
            body: self.content,
            created_at_ms: self
                .created_at
                .as_deref()
                .and_then(parse_timestamp_ms)
                .unwrap_or(0),
            kind,
            reply_to: self.reply_to.map(|reply| reply.id().to_owned()),
            reactions: self
                .reactions
                .into_iter()
                .map(|reaction| Reaction {
                    emoji: reaction.emoji,
                    user_id: reaction.user.id().to_owned(),
                })
                .collect(),
            delivery: DeliveryState::Sent,
        }
    }

    /// Attributes an AI-history entry without a sender to the signed-in user.
    pub fn into_domain_for(self, user: Option<&SessionUser>) -> Message {
        let mut message = self.into_domain();
        if message.sender_id.is_empty() {
            if let Some(user) = user {
                message.sender_id = user.id.clone();
                message.sender_name = user.name.clone();
            }
        }
        message
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessagesEnvelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default, alias = "history", alias = "data")]
    pub messages: Option<Vec<MessageDto>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageBody<'a> {
    pub content: &'a str,
    pub client_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiChatBody<'a> {
    pub message: &'a str,
    pub client_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostedMessageEnvelope {
    #[serde(default, alias = "data")]
    pub message: Option<MessageDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiReplyEnvelope {
    #[serde(default)]
    pub user_message: Option<MessageDto>,
    #[serde(default)]
    pub ai_message: Option<MessageDto>,
}

impl AiReplyEnvelope {
    pub fn into_ack(self, user: &SessionUser) -> Option<SendAck> {
        let message = self.user_message?.into_domain_for(Some(user));
        let assistant_reply = self.ai_message.map(MessageDto::into_domain);
        Some(SendAck {
            message,
            assistant_reply,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserDto {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl From<UserDto> for SessionUser {
    fn from(user: UserDto) -> Self {
        let email = user.email.unwrap_or_default();
        Self {
            name: user
                .name
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| email.clone()),
            id: user.id,
            email,
            role: user.role.unwrap_or_else(|| "student".to_owned()),
            avatar_ref: user.avatar,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginEnvelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<Value>,
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: Option<UserDto>,
}

impl LoginEnvelope {
    pub fn into_grant(self) -> Option<AuthGrant> {
        if self.success == Some(false) {
            return None;
        }
        Some(AuthGrant {
            token: self.token.filter(|token| !token.is_empty())?,
            refresh_token: self.refresh_token,
            user: self.user?.into(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadEnvelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub document: Option<Value>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub user: Option<UserDto>,
}

pub fn parse_timestamp_ms(raw: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.timestamp_millis())
        .ok()
        .or_else(|| raw.parse::<i64>().ok())
}

/// Extracts a human-readable message from an envelope's `message` field.
pub fn envelope_message(message: Option<&Value>) -> Option<String> {
    match message? {
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => map.get("message").and_then(Value::as_str).map(str::to_owned),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn group_accepts_mixed_member_references() {
        let dto: GroupDto = serde_json::from_value(json!({
            "_id": "g1",
            "name": "Calculus",
            "subject": "Math",
            "members": [
                "u1",
                {"user": {"_id": "u2", "name": "Ben"}, "role": "admin"},
                {"_id": "u3", "name": "Cy"}
            ],
            "creator": {"_id": "u9", "name": "Owner"},
            "isPrivate": true,
            "createdAt": "2024-03-01T10:00:00.000Z"
        }))
        .expect("group should decode");

        let group = dto.into_domain(CommunityKind::StudyGroup);

        assert_eq!(group.member_ids, vec!["u1", "u2", "u3"]);
        assert_eq!(group.admin_ids, vec!["u9", "u2"]);
        assert!(group.is_private);
        assert_eq!(group.created_at_ms, Some(1_709_287_200_000));
        assert_eq!(group.description, "");
    }

    #[test]
    fn groups_envelope_tolerates_missing_list() {
        let envelope: GroupsEnvelope =
            serde_json::from_value(json!({"success": true})).expect("decode");

        assert!(envelope.groups.is_none());
    }

    #[test]
    fn message_with_populated_sender() {
        let dto: MessageDto = serde_json::from_value(json!({
            "_id": "m1",
            "sender": {"_id": "u1", "name": "Ana"},
            "content": "hello",
            "createdAt": "2024-03-01T10:00:01.000Z",
            "reactions": [{"emoji": "👍", "user": "u2"}]
        }))
        .expect("message should decode");

        let message = dto.into_domain();

        assert_eq!(message.id, MessageId::Server("m1".to_owned()));
        assert_eq!(message.sender_name, "Ana");
        assert_eq!(message.created_at_ms, 1_709_287_201_000);
        assert_eq!(message.reactions[0].user_id, "u2");
    }

    #[test]
    fn ai_reply_envelope_yields_ack_with_assistant_reply() {
        let envelope: AiReplyEnvelope = serde_json::from_value(json!({
            "success": true,
            "userMessage": {"_id": "m1", "role": "user", "content": "hi", "timestamp": "2024-03-01T10:00:00Z"},
            "aiMessage": {"_id": "m2", "role": "assistant", "content": "Hello!", "timestamp": "2024-03-01T10:00:02Z"}
        }))
        .expect("decode");
        let user = SessionUser {
            id: "u1".to_owned(),
            name: "Ana".to_owned(),
            email: "ana@example.com".to_owned(),
            role: "student".to_owned(),
            avatar_ref: None,
        };

        let ack = envelope.into_ack(&user).expect("ack");

        assert_eq!(ack.message.sender_id, "u1");
        let reply = ack.assistant_reply.expect("assistant reply");
        assert_eq!(reply.sender_id, ConversationRef::AI_ASSISTANT_ID);
    }

    #[test]
    fn login_envelope_requires_token_and_user() {
        let complete: LoginEnvelope = serde_json::from_value(json!({
            "success": true,
            "token": "t",
            "refreshToken": "r",
            "user": {"_id": "u1", "email": "ana@example.com"}
        }))
        .expect("decode");
        let missing_user: LoginEnvelope =
            serde_json::from_value(json!({"success": true, "token": "t"})).expect("decode");

        let grant = complete.into_grant().expect("grant");
        assert_eq!(grant.user.name, "ana@example.com");
        assert_eq!(grant.user.role, "student");
        assert!(missing_user.into_grant().is_none());
    }

    #[test]
    fn timestamps_accept_rfc3339_and_epoch_millis() {
        assert_eq!(parse_timestamp_ms("1970-01-01T00:00:01Z"), Some(1_000));
        assert_eq!(parse_timestamp_ms("1500"), Some(1_500));
        assert_eq!(parse_timestamp_ms("yesterday"), None);
    }

    #[test]
    fn envelope_message_reads_nested_errors() {
        assert_eq!(
            envelope_message(Some(&json!("Already a member"))),
            Some("Already a member".to_owned())
        );
        assert_eq!(
            envelope_message(Some(&json!({"message": "nested"}))),
            Some("nested".to_owned())
        );
    }
}
