//! `ApiClient`-backed implementations of the usecase seams.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::{
    api::{
        client::{ApiClient, ApiError, ApiErrorKind, Resource},
        dto::{
            envelope_message, AiChatBody, AiReplyEnvelope, ChannelsEnvelope, GroupsEnvelope,
            LoginBody, LoginEnvelope, MessageDto, MessagesEnvelope, PostMessageBody,
            PostedMessageEnvelope, UploadEnvelope,
        },
    },
    domain::{
        chat_session_state::SendAck,
        conversation::{ConversationKind, ConversationRef},
        group::{CommunityKind, GroupOrChannel},
        message::Message,
        upload::{UploadCandidate, UploadKind},
    },
    infra::credentials::{AuthGrant, AuthState},
    usecases::{
        list_resources::{ResourceKind, ResourceSource, ResourceSourceError},
        load_feed::{FeedSource, FeedSourceError},
        load_messages::{MessagesSource, MessagesSourceError},
        login::{AuthBackend, AuthBackendError},
        membership::{MembershipAction, MembershipBackend, MembershipSourceError},
        send_message::{MessageSender, SendMessageSourceError},
        upload_document::{DocumentUploader, UploadReceipt, UploadSourceError},
    },
};

const MY_GROUPS_PATH: &str = "/study-groups/my-groups";
const AI_HISTORY_PATH: &str = "/chat/history";
const AI_MESSAGE_PATH: &str = "/chat/message";
const LOGIN_PATH: &str = "/auth/login";
const DOCUMENT_UPLOAD_PATH: &str = "/documents/upload";
const AVATAR_UPLOAD_PATH: &str = "/auth/avatar";

#[derive(Clone)]
pub struct StudyBuddyApi {
    api: ApiClient,
    auth: AuthState,
}

impl StudyBuddyApi {
    pub fn new(api: ApiClient, auth: AuthState) -> Self {
        Self { api, auth }
    }

    fn messages_path(conversation: &ConversationRef) -> String {
        match conversation.kind {
            ConversationKind::Ai => AI_HISTORY_PATH.to_owned(),
            ConversationKind::StudyGroup => {
                format!("{}/{}/messages", Resource::StudyGroups.path(), conversation.id)
            }
            ConversationKind::Channel => {
                format!("{}/{}/messages", Resource::Channels.path(), conversation.id)
            }
        }
    }
}

fn community_resource(kind: CommunityKind) -> Resource {
    match kind {
        CommunityKind::StudyGroup => Resource::StudyGroups,
        CommunityKind::Channel => Resource::Channels,
    }
}

fn is_forbidden(error: &ApiError) -> bool {
    error.status == Some(403)
}

fn feed_error(error: ApiError) -> FeedSourceError {
    match error.kind {
        ApiErrorKind::Unauthorized => FeedSourceError::Unauthorized,
        ApiErrorKind::Decode => FeedSourceError::InvalidData,
        _ => FeedSourceError::Unavailable,
    }
}

fn groups_from(
    envelope: GroupsEnvelope,
    kind: CommunityKind,
) -> Result<Vec<GroupOrChannel>, FeedSourceError> {
    if envelope.success == Some(false) {
        return Err(FeedSourceError::Unavailable);
    }
    Ok(envelope
        .groups
        .unwrap_or_default()
        .into_iter()
        .map(|dto| dto.into_domain(kind))
        .collect())
}

#[async_trait]
impl FeedSource for StudyBuddyApi {
    async fn list_study_groups(&self) -> Result<Vec<GroupOrChannel>, FeedSourceError> {
        let response = self
            .api
            .list::<GroupsEnvelope>(Resource::StudyGroups)
            .await
            .map_err(feed_error)?;
        groups_from(response.data, CommunityKind::StudyGroup)
    }

    async fn list_channels(&self) -> Result<Vec<GroupOrChannel>, FeedSourceError> {
        let envelope = self
            .api
            .list::<ChannelsEnvelope>(Resource::Channels)
            .await
            .map_err(feed_error)?
            .data;
        if envelope.success == Some(false) {
            return Err(FeedSourceError::Unavailable);
        }
        Ok(envelope
            .channels
            .unwrap_or_default()
            .into_iter()
            .map(|dto| dto.into_domain(CommunityKind::Channel))
            .collect())
    }

    async fn list_my_groups(&self) -> Result<Vec<GroupOrChannel>, FeedSourceError> {
        let response = self
            .api
            .get_json::<GroupsEnvelope>(MY_GROUPS_PATH)
            .await
            .map_err(feed_error)?;
        groups_from(response.data, CommunityKind::StudyGroup)
    }
}

#[async_trait]
impl MessagesSource for StudyBuddyApi {
    async fn list_messages(
        &self,
        conversation: &ConversationRef,
        limit: usize,
    ) -> Result<Vec<Message>, MessagesSourceError> {
        let response = self
            .api
            .get_json_with_query::<MessagesEnvelope>(
                &Self::messages_path(conversation),
                &[("limit", limit.to_string())],
            )
            .await
            .map_err(|error| match error.kind {
                ApiErrorKind::Unauthorized => MessagesSourceError::Unauthorized,
                ApiErrorKind::NotFound => MessagesSourceError::ConversationNotFound,
                ApiErrorKind::Decode => MessagesSourceError::InvalidData,
                _ => MessagesSourceError::Unavailable,
            })?;

        let envelope = response.data;
        if envelope.success == Some(false) {
            return Err(MessagesSourceError::Unavailable);
        }

        let user = self.auth.session_user();
        Ok(envelope
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|dto| dto.into_domain_for(user.as_ref()))
            .collect())
    }
}

fn send_error(error: ApiError) -> SendMessageSourceError {
    if is_forbidden(&error) {
        return SendMessageSourceError::Forbidden;
    }
    match error.kind {
        ApiErrorKind::Unauthorized => SendMessageSourceError::Unauthorized,
        ApiErrorKind::NotFound => SendMessageSourceError::ConversationNotFound,
        ApiErrorKind::Decode => SendMessageSourceError::InvalidData,
        _ => SendMessageSourceError::Unavailable,
    }
}

#[async_trait]
impl MessageSender for StudyBuddyApi {
    async fn send_message(
        &self,
        conversation: &ConversationRef,
        text: &str,
        correlation_id: &str,
    ) -> Result<SendAck, SendMessageSourceError> {
        if conversation.is_ai() {
            let user = self
                .auth
                .session_user()
                .ok_or(SendMessageSourceError::Unauthorized)?;
            let body = AiChatBody {
                message: text,
                client_id: correlation_id,
            };
            let response = self
                .api
                .post_json::<_, AiReplyEnvelope>(AI_MESSAGE_PATH, &body)
                .await
                .map_err(send_error)?;
            return response
                .data
                .into_ack(&user)
                .ok_or(SendMessageSourceError::InvalidData);
        }

        let body = PostMessageBody {
            content: text,
            client_id: correlation_id,
        };
        let response = self
            .api
            .post_json::<_, PostedMessageEnvelope>(&Self::messages_path(conversation), &body)
            .await
            .map_err(send_error)?;

        let message = response
            .data
            .message
            .map(MessageDto::into_domain)
            .ok_or(SendMessageSourceError::InvalidData)?;
        Ok(SendAck {
            message,
            assistant_reply: None,
        })
    }
}

#[async_trait]
impl MembershipBackend for StudyBuddyApi {
    async fn apply(
        &self,
        kind: CommunityKind,
        id: &str,
        action: MembershipAction,
    ) -> Result<(), MembershipSourceError> {
        let resource = community_resource(kind);
        let result = match action {
            MembershipAction::Join => self.api.join::<Value>(resource, id).await,
            MembershipAction::Leave => self.api.leave::<Value>(resource, id).await,
            MembershipAction::Delete => self.api.delete::<Value>(resource, id).await,
        };

        let response = result.map_err(|error| {
            if is_forbidden(&error) {
                return MembershipSourceError::Forbidden;
            }
            match error.kind {
                ApiErrorKind::Unauthorized => MembershipSourceError::Unauthorized,
                ApiErrorKind::NotFound => MembershipSourceError::NotFound,
                ApiErrorKind::Validation => MembershipSourceError::Rejected {
                    message: error.message,
                },
                _ => MembershipSourceError::Unavailable,
            }
        })?;

        if response.data.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(MembershipSourceError::Rejected {
                message: envelope_message(response.data.get("message"))
                    .unwrap_or_else(|| format!("could not {}", action.label())),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for StudyBuddyApi {
    async fn login(&self, email: &str, password: &str) -> Result<AuthGrant, AuthBackendError> {
        let response = self
            .api
            .post_json::<_, LoginEnvelope>(LOGIN_PATH, &LoginBody { email, password })
            .await
            .map_err(|error| match error.kind {
                ApiErrorKind::Unauthorized | ApiErrorKind::Validation => {
                    AuthBackendError::InvalidCredentials
                }
                ApiErrorKind::Timeout => AuthBackendError::Timeout,
                ApiErrorKind::Network => AuthBackendError::Unavailable,
                _ => AuthBackendError::Transient {
                    message: error.message,
                },
            })?;

        let envelope = response.data;
        let rejection = envelope_message(envelope.message.as_ref());
        envelope.into_grant().ok_or_else(|| AuthBackendError::Transient {
            message: rejection.unwrap_or_else(|| "login response was incomplete".to_owned()),
        })
    }
}

#[async_trait]
impl DocumentUploader for StudyBuddyApi {
    async fn upload(
        &self,
        candidate: &UploadCandidate,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, UploadSourceError> {
        let part = Part::bytes(bytes)
            .file_name(candidate.file_name.clone())
            .mime_str(candidate.mime_type)
            .map_err(|_| UploadSourceError::InvalidData)?;
        let form = Form::new().part(candidate.kind.form_field(), part);
        let path = match candidate.kind {
            UploadKind::Document => DOCUMENT_UPLOAD_PATH,
            UploadKind::Avatar => AVATAR_UPLOAD_PATH,
        };

        let envelope = self
            .api
            .post_multipart::<UploadEnvelope>(path, form)
            .await
            .map_err(|error| match error.kind {
                ApiErrorKind::Unauthorized => UploadSourceError::Unauthorized,
                ApiErrorKind::Validation => UploadSourceError::Rejected {
                    message: error.message,
                },
                ApiErrorKind::Decode => UploadSourceError::InvalidData,
                _ => UploadSourceError::Unavailable,
            })?
            .data;

        if envelope.success == Some(false) {
            return Err(UploadSourceError::Rejected {
                message: envelope_message(envelope.message.as_ref())
                    .unwrap_or_else(|| "upload rejected".to_owned()),
            });
        }

        let document = envelope.document.unwrap_or(Value::Null);
        let field = |key: &str| document.get(key).and_then(Value::as_str).map(str::to_owned);
        Ok(UploadReceipt {
            id: field("_id").or_else(|| field("id")),
            title: field("title")
                .or_else(|| field("originalName"))
                .unwrap_or_else(|| candidate.file_name.clone()),
            url: envelope
                .avatar
                .or_else(|| envelope.user.and_then(|user| user.avatar))
                .or_else(|| field("url")),
        })
    }
}

#[async_trait]
impl ResourceSource for StudyBuddyApi {
    async fn list_raw(&self, kind: ResourceKind) -> Result<Value, ResourceSourceError> {
        let resource = match kind {
            ResourceKind::Notes => Resource::StudyNotes,
            ResourceKind::Quizzes => Resource::Quizzes,
            ResourceKind::Flashcards => Resource::Flashcards,
            ResourceKind::Documents => Resource::Documents,
        };
        self.api
            .list::<Value>(resource)
            .await
            .map(|response| response.data)
            .map_err(|error| match error.kind {
                ApiErrorKind::Unauthorized => ResourceSourceError::Unauthorized,
                ApiErrorKind::Decode => ResourceSourceError::InvalidData,
                _ => ResourceSourceError::Unavailable,
            })
    }
}
