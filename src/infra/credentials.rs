//! Credential storage and the auth-state provider handed to the API client.
//!
//! Invalidation is an explicit event: every subscriber receives
//! `AuthEvent::SessionExpired` and decides how to route the user back to
//! the login flow.

use std::sync::{mpsc, Arc, Mutex};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::Deserialize;

use crate::{
    domain::session::SessionUser,
    infra::contracts::{Clock, LocalStore},
};

const TOKEN_KEY: &str = "token";
const REFRESH_TOKEN_KEY: &str = "refreshToken";
const USER_KEY: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    SessionExpired,
}

pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
    /// Drops the stored credential after the server rejected it.
    fn invalidate(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGrant {
    pub token: String,
    pub refresh_token: Option<String>,
    pub user: SessionUser,
}

#[derive(Clone)]
pub struct AuthState {
    store: Arc<dyn LocalStore>,
    clock: Arc<dyn Clock>,
    subscribers: Arc<Mutex<Vec<mpsc::Sender<AuthEvent>>>>,
}

impl AuthState {
    pub fn new(store: Arc<dyn LocalStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn subscribe(&self) -> mpsc::Receiver<AuthEvent> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }

    pub fn store_grant(&self, grant: &AuthGrant) -> anyhow::Result<()> {
        self.store.set_item(TOKEN_KEY, &grant.token)?;
        match grant.refresh_token.as_deref() {
            Some(refresh) => self.store.set_item(REFRESH_TOKEN_KEY, refresh)?,
            None => self.store.remove_item(REFRESH_TOKEN_KEY)?,
        }
        self.store
            .set_item(USER_KEY, &serde_json::to_string(&grant.user)?)?;

        self.notify(AuthEvent::SignedIn);
        Ok(())
    }

    /// Removes every stored credential. Returns whether a token was present.
    pub fn sign_out(&self) -> anyhow::Result<bool> {
        let had_token = self.raw_token().is_some();
        self.clear_credentials()?;
        self.notify(AuthEvent::SignedOut);
        Ok(had_token)
    }

    pub fn has_session(&self) -> bool {
        self.bearer_token().is_some()
    }

    /// The signed-in user: the stored profile, or the token's claims when
    /// no profile was stored.
    pub fn session_user(&self) -> Option<SessionUser> {
        let token = self.bearer_token()?;

        let stored = self
            .store
            .get_item(USER_KEY)
            .ok()
            .flatten()
            .and_then(|raw| serde_json::from_str::<SessionUser>(&raw).ok());

        stored.or_else(|| decode_claims(&token).and_then(TokenClaims::into_user))
    }

    fn raw_token(&self) -> Option<String> {
        match self.store.get_item(TOKEN_KEY) {
            Ok(token) => token.filter(|token| !token.is_empty()),
            Err(error) => {
                tracing::warn!(error = %error, "credential read failed");
                None
            }
        }
    }

    fn clear_credentials(&self) -> anyhow::Result<()> {
        self.store.remove_item(TOKEN_KEY)?;
        self.store.remove_item(REFRESH_TOKEN_KEY)?;
        self.store.remove_item(USER_KEY)?;
        Ok(())
    }

    fn notify(&self, event: AuthEvent) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|sub| sub.send(event).is_ok());
        }
    }
}

impl CredentialProvider for AuthState {
    fn bearer_token(&self) -> Option<String> {
        let token = self.raw_token()?;

        let expired = decode_claims(&token)
            .and_then(|claims| claims.exp)
            .is_some_and(|exp| exp.saturating_mul(1_000) <= self.clock.now_unix_ms());

        if expired {
            tracing::debug!("stored token is past its expiry");
            return None;
        }

        Some(token)
    }

    fn invalidate(&self) {
        if let Err(error) = self.clear_credentials() {
            tracing::warn!(error = %error, "failed to clear credentials after rejection");
        }
        tracing::info!(code = "AUTH_SESSION_EXPIRED", "credential rejected by server");
        self.notify(AuthEvent::SessionExpired);
    }
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    #[serde(alias = "userId", alias = "_id")]
    id: Option<String>,
    name: Option<String>,
    email: Option<String>,
    role: Option<String>,
    exp: Option<i64>,
}

impl TokenClaims {
    fn into_user(self) -> Option<SessionUser> {
        Some(SessionUser {
            id: self.id?,
            name: self.name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            role: self.role.unwrap_or_else(|| "student".to_owned()),
            avatar_ref: None,
        })
    }
}

fn decode_claims(token: &str) -> Option<TokenClaims> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{infra::local_store::MemoryLocalStore, test_support::ManualClock};

    fn token_with(claims: &str) -> String {
        format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", URL_SAFE_NO_PAD.encode(claims))
    }

    fn user() -> SessionUser {
        SessionUser {
            id: "u1".to_owned(),
            name: "Ada".to_owned(),
            email: "ada@example.com".to_owned(),
            role: "student".to_owned(),
            avatar_ref: None,
        }
    }

    fn state_at(now_ms: i64) -> (AuthState, Arc<MemoryLocalStore>) {
        let store = Arc::new(MemoryLocalStore::new());
        let state = AuthState::new(store.clone(), Arc::new(ManualClock::new(now_ms)));
        (state, store)
    }

    #[test]
    fn no_token_means_unauthenticated() {
        let (state, _) = state_at(0);

        assert_eq!(state.bearer_token(), None);
        assert!(!state.has_session());
        assert_eq!(state.session_user(), None);
    }

    #[test]
    fn stored_grant_is_used_as_bearer_and_profile() {
        let (state, store) = state_at(0);
        state
            .store_grant(&AuthGrant {
                token: "opaque".to_owned(),
                refresh_token: Some("refresh".to_owned()),
                user: user(),
            })
            .expect("store grant");

        assert_eq!(state.bearer_token(), Some("opaque".to_owned()));
        assert_eq!(
            store.get_item(REFRESH_TOKEN_KEY).expect("read"),
            Some("refresh".to_owned())
        );
        assert_eq!(state.session_user(), Some(user()));
    }

    #[test]
    fn falls_back_to_token_claims_without_stored_profile() {
        let (state, store) = state_at(0);
        store
            .set_item(
                "token",
                &token_with(r#"{"userId":"u9","name":"Grace","role":"admin"}"#),
            )
            .expect("write");

        let user = state.session_user().expect("user from claims");

        assert_eq!(user.id, "u9");
        assert_eq!(user.name, "Grace");
        assert!(user.is_admin());
    }

    #[test]
    fn expired_token_is_treated_as_absent() {
        let (state, store) = state_at(2_000_000);
        store
            .set_item("token", &token_with(r#"{"id":"u1","exp":1000}"#))
            .expect("write");

        assert_eq!(state.bearer_token(), None);
    }

    #[test]
    fn invalidate_clears_credentials_and_notifies_subscribers() {
        let (state, _) = state_at(0);
        state
            .store_grant(&AuthGrant {
                token: "opaque".to_owned(),
                refresh_token: None,
                user: user(),
            })
            .expect("store grant");
        let events = state.subscribe();

        state.invalidate();

        assert_eq!(state.bearer_token(), None);
        assert_eq!(state.session_user(), None);
        assert_eq!(events.try_recv(), Ok(AuthEvent::SessionExpired));
    }

    #[test]
    fn sign_out_reports_whether_a_session_existed() {
        let (state, _) = state_at(0);

        assert!(!state.sign_out().expect("sign out"));

        state
            .store_grant(&AuthGrant {
                token: "opaque".to_owned(),
                refresh_token: None,
                user: user(),
            })
            .expect("store grant");

        assert!(state.sign_out().expect("sign out"));
        assert!(!state.has_session());
    }
}
