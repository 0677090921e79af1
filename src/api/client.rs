//! HTTP facade over the StudyBuddy REST API.
//!
//! Every request carries the current bearer credential when one exists.
//! A 401 answer invalidates the credential through the injected provider,
//! which in turn notifies the app so it can route back to login.

use std::{fmt, sync::Arc, time::Duration};

use reqwest::{multipart::Form, Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::infra::{
    config::ApiConfig, credentials::CredentialProvider, error::AppError, secrets::redact_text,
};

/// REST resource families exposed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Auth,
    Channels,
    Chat,
    Documents,
    Flashcards,
    Newsletter,
    Quizzes,
    StudyGroups,
    StudyNotes,
}

impl Resource {
    pub fn path(self) -> &'static str {
        match self {
            Self::Auth => "/auth",
            Self::Channels => "/channels",
            Self::Chat => "/chat",
            Self::Documents => "/documents",
            Self::Flashcards => "/flashcards",
            Self::Newsletter => "/newsletter",
            Self::Quizzes => "/quizzes",
            Self::StudyGroups => "/study-groups",
            Self::StudyNotes => "/study-notes",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Unauthorized,
    Timeout,
    Network,
    NotFound,
    Validation,
    Server,
    Http,
    Decode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    fn new(kind: ApiErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{:?} (HTTP {status}): {}", self.kind, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self, AppError> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(AppError::HttpClientBuild)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            credentials,
        })
    }

    pub async fn list<T: DeserializeOwned>(&self, resource: Resource) -> Result<ApiResponse<T>, ApiError> {
        self.get_json(resource.path()).await
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        resource: Resource,
        id: &str,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.get_json(&format!("{}/{}", resource.path(), id)).await
    }

    pub async fn create<B, T>(&self, resource: Resource, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post_json(resource.path(), body).await
    }

    pub async fn join<T: DeserializeOwned>(
        &self,
        resource: Resource,
        id: &str,
    ) -> Result<ApiResponse<T>, ApiError> {
        let path = format!("{}/{}/join", resource.path(), id);
        self.execute(Method::POST, &path, |request| request).await
    }

    pub async fn leave<T: DeserializeOwned>(
        &self,
        resource: Resource,
        id: &str,
    ) -> Result<ApiResponse<T>, ApiError> {
        let path = format!("{}/{}/leave", resource.path(), id);
        self.execute(Method::POST, &path, |request| request).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        resource: Resource,
        id: &str,
    ) -> Result<ApiResponse<T>, ApiError> {
        let path = format!("{}/{}", resource.path(), id);
        self.execute(Method::DELETE, &path, |request| request).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, ApiError> {
        self.execute(Method::GET, path, |request| request).await
    }

    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ApiResponse<T>, ApiError> {
        self.execute(Method::GET, path, |request| request.query(query))
            .await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(Method::POST, path, |request| request.json(body))
            .await
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.execute(Method::POST, path, |request| request.multipart(form))
            .await
    }

    async fn execute<T, F>(&self, method: Method, path: &str, customize: F) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = customize(self.http.request(method.clone(), &url));
        let authenticated = match self.credentials.bearer_token() {
            Some(token) => {
                request = request.bearer_auth(token);
                true
            }
            None => false,
        };

        let response = request.send().await.map_err(|error| {
            let mapped = map_transport_error(&error);
            tracing::warn!(
                code = "API_TRANSPORT_FAILED",
                %method,
                path,
                kind = ?mapped.kind,
                "request did not complete"
            );
            mapped
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| map_transport_error(&error))?;

        tracing::debug!(%method, path, status = status.as_u16(), "api response received");

        if status == StatusCode::UNAUTHORIZED {
            if authenticated {
                self.credentials.invalidate();
            }
            return Err(error_from_body(ApiErrorKind::Unauthorized, status, &body));
        }

        if !status.is_success() {
            let error = error_from_body(kind_for_status(status), status, &body);
            tracing::warn!(
                code = "API_REQUEST_REJECTED",
                %method,
                path,
                status = status.as_u16(),
                message = %redact_text(&error.message),
                "request rejected by server"
            );
            return Err(error);
        }

        let data = serde_json::from_slice(&body).map_err(|error| {
            ApiError::new(
                ApiErrorKind::Decode,
                Some(status.as_u16()),
                format!("unexpected response shape: {error}"),
            )
        })?;

        Ok(ApiResponse {
            data,
            status: status.as_u16(),
        })
    }
}

fn map_transport_error(error: &reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::new(ApiErrorKind::Timeout, None, "the server took too long to respond")
    } else if error.is_decode() {
        ApiError::new(ApiErrorKind::Decode, None, error.to_string())
    } else {
        ApiError::new(ApiErrorKind::Network, None, "could not reach the server")
    }
}

fn kind_for_status(status: StatusCode) -> ApiErrorKind {
    match status {
        StatusCode::UNAUTHORIZED => ApiErrorKind::Unauthorized,
        StatusCode::NOT_FOUND => ApiErrorKind::NotFound,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::CONFLICT => {
            ApiErrorKind::Validation
        }
        status if status.is_server_error() => ApiErrorKind::Server,
        _ => ApiErrorKind::Http,
    }
}

fn error_from_body(kind: ApiErrorKind, status: StatusCode, body: &[u8]) -> ApiError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message.or(body.error))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_owned()
        });

    ApiError::new(kind, Some(status.as_u16()), message)
}
