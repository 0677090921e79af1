//! Join, leave and delete for study groups and channels.
//!
//! Permission checks run locally against the last feed snapshot so obvious
//! refusals never reach the server; the server remains authoritative for
//! items the snapshot does not know about.

use async_trait::async_trait;

use crate::{
    domain::{
        feed::{actions_for, FeedResource, FeedSnapshot, Sourced},
        group::CommunityKind,
        notice::UiNotice,
        placeholders::is_placeholder_id,
        session::SessionUser,
    },
    infra::cache::LocalCache,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipAction {
    Join,
    Leave,
    Delete,
}

impl MembershipAction {
    pub fn label(self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipCommand {
    pub kind: CommunityKind,
    pub id: String,
    pub action: MembershipAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipSourceError {
    Unauthorized,
    Forbidden,
    NotFound,
    Rejected { message: String },
    Unavailable,
}

#[async_trait]
pub trait MembershipBackend: Send + Sync {
    async fn apply(
        &self,
        kind: CommunityKind,
        id: &str,
        action: MembershipAction,
    ) -> Result<(), MembershipSourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipError {
    LoginRequired,
    /// Demo items exist only on this device.
    PlaceholderItem,
    AlreadyMember,
    NotAMember,
    NotPermitted,
    NotFound,
    Rejected { message: String },
    Unauthorized,
    TemporarilyUnavailable,
}

impl MembershipError {
    pub fn notice(&self) -> UiNotice {
        let fixed = |message: &str| UiNotice::Banner {
            message: message.to_owned(),
            retryable: false,
        };
        match self {
            Self::LoginRequired => UiNotice::LoginRequired,
            Self::Unauthorized => UiNotice::SessionExpired,
            Self::PlaceholderItem => fixed("Demo items cannot be changed. Dismiss them instead."),
            Self::AlreadyMember => fixed("You are already a member."),
            Self::NotAMember => fixed("You are not a member."),
            Self::NotPermitted => fixed("Only admins can delete this."),
            Self::NotFound => fixed("It no longer exists."),
            Self::Rejected { message } => fixed(message),
            Self::TemporarilyUnavailable => UiNotice::banner("The server is unavailable. Try again."),
        }
    }
}

pub async fn change_membership(
    backend: &dyn MembershipBackend,
    cache: &LocalCache,
    snapshot: &FeedSnapshot,
    user: Option<&SessionUser>,
    command: MembershipCommand,
) -> Result<(), MembershipError> {
    let user = user.ok_or(MembershipError::LoginRequired)?;
    if is_placeholder_id(&command.id) {
        return Err(MembershipError::PlaceholderItem);
    }
    check_permission(snapshot, user, &command)?;

    backend
        .apply(command.kind, &command.id, command.action)
        .await
        .map_err(map_source_error)?;

    let listing = match command.kind {
        CommunityKind::StudyGroup => FeedResource::StudyGroups,
        CommunityKind::Channel => FeedResource::Channels,
    };
    cache.clear(listing.cache_key());
    cache.clear(FeedResource::MyGroups.cache_key());

    tracing::info!(
        code = "MEMBERSHIP_CHANGED",
        action = command.action.label(),
        id = %command.id,
        "membership updated"
    );
    Ok(())
}

fn check_permission(
    snapshot: &FeedSnapshot,
    user: &SessionUser,
    command: &MembershipCommand,
) -> Result<(), MembershipError> {
    let Some(item) = snapshot.find(&command.id) else {
        return Ok(());
    };
    if matches!(item, Sourced::Placeholder(_)) {
        return Err(MembershipError::PlaceholderItem);
    }

    let actions = actions_for(item, Some(user));
    match command.action {
        MembershipAction::Join if !actions.can_join => Err(MembershipError::AlreadyMember),
        MembershipAction::Leave if !actions.can_leave => Err(MembershipError::NotAMember),
        MembershipAction::Delete if !actions.can_delete => Err(MembershipError::NotPermitted),
        _ => Ok(()),
    }
}

fn map_source_error(error: MembershipSourceError) -> MembershipError {
    match error {
        MembershipSourceError::Unauthorized => MembershipError::Unauthorized,
        MembershipSourceError::Forbidden => MembershipError::NotPermitted,
        MembershipSourceError::NotFound => MembershipError::NotFound,
        MembershipSourceError::Rejected { message } => MembershipError::Rejected { message },
        MembershipSourceError::Unavailable => MembershipError::TemporarilyUnavailable,
    }
}
