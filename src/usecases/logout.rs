use crate::infra::{cache::LocalCache, credentials::AuthState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub session_removed: bool,
    pub cache_entries_removed: usize,
}

/// Drops the stored session and every cached listing. Safe to repeat.
pub fn logout_and_reset(auth: &AuthState, cache: &LocalCache) -> anyhow::Result<LogoutOutcome> {
    let session_removed = auth.sign_out()?;
    let cache_entries_removed = cache.clear_all();

    tracing::info!(
        code = "AUTH_SIGNED_OUT",
        session_removed,
        cache_entries_removed,
        "local session cleared"
    );

    Ok(LogoutOutcome {
        session_removed,
        cache_entries_removed,
    })
}
