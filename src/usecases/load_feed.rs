//! Resolves the study-group and channel feed from cache, network and
//! placeholder data.
//!
//! Each resource type is resolved on its own: a fresh cache entry is used
//! verbatim, otherwise the type is fetched. Fetches run concurrently and
//! are captured individually, so one failing endpoint never blanks the
//! others. Empty or failed public listings fall back to placeholder data,
//! which is never written to the cache.

use async_trait::async_trait;

use crate::{
    domain::{
        feed::{Collection, FeedResource, FeedSnapshot, Sourced},
        group::GroupOrChannel,
        notice::UiNotice,
        placeholders::{demo_channels, demo_study_groups},
    },
    infra::cache::LocalCache,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSourceError {
    Unauthorized,
    Unavailable,
    InvalidData,
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn list_study_groups(&self) -> Result<Vec<GroupOrChannel>, FeedSourceError>;
    async fn list_channels(&self) -> Result<Vec<GroupOrChannel>, FeedSourceError>;
    /// Groups the signed-in user belongs to.
    async fn list_my_groups(&self) -> Result<Vec<GroupOrChannel>, FeedSourceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadFeedQuery {
    /// User-initiated refresh: bypass and invalidate the cache.
    pub force_refresh: bool,
    pub signed_in: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFailure {
    pub resource: FeedResource,
    pub error: FeedSourceError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedOutcome {
    pub snapshot: FeedSnapshot,
    pub failures: Vec<FeedFailure>,
    /// Number of requests actually issued.
    pub network_calls: usize,
}

impl FeedOutcome {
    pub fn notice(&self) -> Option<UiNotice> {
        if self
            .failures
            .iter()
            .any(|failure| failure.error == FeedSourceError::Unauthorized)
        {
            return Some(UiNotice::SessionExpired);
        }

        let labels: Vec<&str> = self
            .failures
            .iter()
            .map(|failure| failure.resource.label())
            .collect();

        (!labels.is_empty()).then(|| {
            UiNotice::banner(format!(
                "Could not load {}; showing what is available.",
                labels.join(", ")
            ))
        })
    }
}

enum Resolution {
    Cached(Vec<GroupOrChannel>),
    Fetched(Result<Vec<GroupOrChannel>, FeedSourceError>),
    Skipped,
}

impl Resolution {
    fn is_network(&self) -> bool {
        matches!(self, Self::Fetched(_))
    }
}

pub async fn load_feed(
    source: &dyn FeedSource,
    cache: &LocalCache,
    query: LoadFeedQuery,
) -> FeedOutcome {
    if query.force_refresh {
        for resource in FeedResource::ALL {
            cache.clear(resource.cache_key());
        }
    }

    let cached_groups = cache.get::<Vec<GroupOrChannel>>(FeedResource::StudyGroups.cache_key());
    let cached_channels = cache.get::<Vec<GroupOrChannel>>(FeedResource::Channels.cache_key());
    let cached_mine = query
        .signed_in
        .then(|| cache.get::<Vec<GroupOrChannel>>(FeedResource::MyGroups.cache_key()))
        .flatten();

    let groups = async {
        match cached_groups {
            Some(items) => Resolution::Cached(items),
            None => Resolution::Fetched(source.list_study_groups().await),
        }
    };
    let channels = async {
        match cached_channels {
            Some(items) => Resolution::Cached(items),
            None => Resolution::Fetched(source.list_channels().await),
        }
    };
    let mine = async {
        match (query.signed_in, cached_mine) {
            (false, _) => Resolution::Skipped,
            (true, Some(items)) => Resolution::Cached(items),
            (true, None) => Resolution::Fetched(source.list_my_groups().await),
        }
    };

    let (groups, channels, mine) = tokio::join!(groups, channels, mine);

    let network_calls = [&groups, &channels, &mine]
        .into_iter()
        .filter(|resolution| resolution.is_network())
        .count();

    let mut failures = Vec::new();
    let snapshot = FeedSnapshot {
        groups: resolve_public(
            FeedResource::StudyGroups,
            groups,
            cache,
            demo_study_groups,
            &mut failures,
        ),
        channels: resolve_public(
            FeedResource::Channels,
            channels,
            cache,
            demo_channels,
            &mut failures,
        ),
        my_groups: resolve_mine(mine, cache, &mut failures),
    };

    tracing::debug!(
        network_calls,
        failures = failures.len(),
        groups_placeholder = snapshot.groups.is_placeholder(),
        channels_placeholder = snapshot.channels.is_placeholder(),
        "feed resolved"
    );

    FeedOutcome {
        snapshot,
        failures,
        network_calls,
    }
}

fn resolve_public(
    resource: FeedResource,
    resolution: Resolution,
    cache: &LocalCache,
    placeholder: fn() -> Vec<GroupOrChannel>,
    failures: &mut Vec<FeedFailure>,
) -> Collection {
    match resolution {
        Resolution::Cached(items) => Sourced::Live(items),
        Resolution::Fetched(Ok(items)) if !items.is_empty() => {
            cache.set(resource.cache_key(), &items);
            Sourced::Live(items)
        }
        Resolution::Fetched(Ok(_)) | Resolution::Skipped => Sourced::Placeholder(placeholder()),
        Resolution::Fetched(Err(error)) => {
            tracing::warn!(
                code = "FEED_FETCH_FAILED",
                resource = resource.label(),
                error = ?error,
                "falling back to placeholder data"
            );
            failures.push(FeedFailure { resource, error });
            Sourced::Placeholder(placeholder())
        }
    }
}

fn resolve_mine(
    resolution: Resolution,
    cache: &LocalCache,
    failures: &mut Vec<FeedFailure>,
) -> Option<Vec<GroupOrChannel>> {
    match resolution {
        Resolution::Skipped => None,
        Resolution::Cached(items) => Some(items),
        Resolution::Fetched(Ok(items)) => {
            cache.set(FeedResource::MyGroups.cache_key(), &items);
            Some(items)
        }
        Resolution::Fetched(Err(error)) => {
            tracing::warn!(code = "FEED_FETCH_FAILED", resource = "my groups", error = ?error, "user groups unavailable");
            failures.push(FeedFailure {
                resource: FeedResource::MyGroups,
                error,
            });
            Some(Vec::new())
        }
    }
}
