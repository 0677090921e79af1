use async_trait::async_trait;
use serde_json::Value;

use crate::domain::notice::UiNotice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Notes,
    Quizzes,
    Flashcards,
    Documents,
}

impl ResourceKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Notes => "notes",
            Self::Quizzes => "quizzes",
            Self::Flashcards => "flashcards",
            Self::Documents => "documents",
        }
    }

    /// Envelope field holding the list, tried before falling back to `data`.
    pub fn envelope_field(self) -> &'static str {
        match self {
            Self::Notes => "notes",
            Self::Quizzes => "quizzes",
            Self::Flashcards => "flashcards",
            Self::Documents => "documents",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceItem {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSourceError {
    Unauthorized,
    Unavailable,
    InvalidData,
}

#[async_trait]
pub trait ResourceSource: Send + Sync {
    async fn list_raw(&self, kind: ResourceKind) -> Result<Value, ResourceSourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListResourcesError {
    LoginRequired,
    Unauthorized,
    TemporarilyUnavailable,
    DataContractViolation,
}

impl ListResourcesError {
    pub fn notice(&self) -> UiNotice {
        match self {
            Self::LoginRequired => UiNotice::LoginRequired,
            Self::Unauthorized => UiNotice::SessionExpired,
            Self::TemporarilyUnavailable => UiNotice::banner("Could not load the list. Try again."),
            Self::DataContractViolation => UiNotice::Banner {
                message: "The server returned an unexpected list format.".to_owned(),
                retryable: false,
            },
        }
    }
}

/// Lists the user's study material. Items are passed through untouched
/// apart from picking an id and a display title.
pub async fn list_resources(
    source: &dyn ResourceSource,
    signed_in: bool,
    kind: ResourceKind,
) -> Result<Vec<ResourceItem>, ListResourcesError> {
    if !signed_in {
        return Err(ListResourcesError::LoginRequired);
    }

    let raw = source.list_raw(kind).await.map_err(map_source_error)?;
    extract_items(&raw, kind).ok_or(ListResourcesError::DataContractViolation)
}

fn extract_items(raw: &Value, kind: ResourceKind) -> Option<Vec<ResourceItem>> {
    let list = match raw {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get(kind.envelope_field())
            .or_else(|| map.get("data"))?
            .as_array()?,
        _ => return None,
    };

    Some(
        list.iter()
            .filter_map(|item| {
                let id = ["_id", "id"]
                    .iter()
                    .find_map(|key| item.get(key).and_then(Value::as_str))?;
                let title = ["title", "name", "question", "front", "originalName"]
                    .iter()
                    .find_map(|key| item.get(key).and_then(Value::as_str))
                    .unwrap_or("(untitled)");
                Some(ResourceItem {
                    id: id.to_owned(),
                    title: title.to_owned(),
                })
            })
            .collect(),
    )
}

fn map_source_error(error: ResourceSourceError) -> ListResourcesError {
    match error {
        ResourceSourceError::Unauthorized => ListResourcesError::Unauthorized,
        ResourceSourceError::Unavailable => ListResourcesError::TemporarilyUnavailable,
        ResourceSourceError::InvalidData => ListResourcesError::DataContractViolation,
    }
}
