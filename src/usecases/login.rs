use std::io;

use async_trait::async_trait;

use crate::infra::{
    credentials::{AuthGrant, AuthState},
    secrets::redact_text,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub email_attempts: usize,
    pub password_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            email_attempts: 3,
            password_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthBackendError {
    InvalidCredentials,
    Timeout,
    Unavailable,
    Transient { message: String },
}

#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthGrant, AuthBackendError>;
}

pub trait AuthTerminal {
    fn print_line(&mut self, line: &str) -> io::Result<()>;
    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
    fn prompt_secret(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

pub struct StdTerminal;

impl AuthTerminal for StdTerminal {
    fn print_line(&mut self, line: &str) -> io::Result<()> {
        println!("{line}");
        Ok(())
    }

    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        use std::io::Write;

        print!("{prompt}");
        io::stdout().flush()?;

        let mut line = String::new();
        let bytes = io::stdin().read_line(&mut line)?;
        if bytes == 0 {
            return Ok(None);
        }

        Ok(Some(line.trim().to_owned()))
    }

    fn prompt_secret(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match rpassword::prompt_password(prompt) {
            Ok(password) => Ok(Some(password)),
            Err(source) if source.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(source) => Err(source),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated { user_name: String },
    ExitWithGuidance,
}

/// Prompts for email and password, exchanges them for a session and
/// persists it. Each step gets a bounded number of attempts.
pub async fn run_guided_login(
    terminal: &mut dyn AuthTerminal,
    backend: &dyn AuthBackend,
    auth: &AuthState,
    retry_policy: &RetryPolicy,
) -> anyhow::Result<LoginOutcome> {
    terminal.print_line("Sign in to StudyBuddy.")?;

    let Some(email) = collect_email(terminal, retry_policy.email_attempts)? else {
        return Ok(LoginOutcome::ExitWithGuidance);
    };

    for attempt in 1..=retry_policy.password_attempts {
        let Some(password) = terminal.prompt_secret("Password: ")? else {
            terminal.print_line("Input cancelled (EOF). Run `studybuddy login` to retry.")?;
            return Ok(LoginOutcome::ExitWithGuidance);
        };

        let attempts_left = retry_policy.password_attempts.saturating_sub(attempt);
        if password.is_empty() {
            terminal.print_line(&format!(
                "Password cannot be empty. Attempts left: {attempts_left}"
            ))?;
            continue;
        }

        match backend.login(&email, &password).await {
            Ok(grant) => {
                auth.store_grant(&grant)?;
                tracing::info!(code = "AUTH_SIGNED_IN", user_id = %grant.user.id, "signed in");
                terminal.print_line(&format!("Signed in as {}.", grant.user.name))?;
                return Ok(LoginOutcome::Authenticated {
                    user_name: grant.user.name,
                });
            }
            Err(error) => {
                if !report_backend_error(terminal, error, attempts_left)? {
                    return Ok(LoginOutcome::ExitWithGuidance);
                }
            }
        }
    }

    terminal.print_line("Sign-in failed too many times. Run `studybuddy login` later.")?;
    Ok(LoginOutcome::ExitWithGuidance)
}

fn collect_email(terminal: &mut dyn AuthTerminal, attempts: usize) -> io::Result<Option<String>> {
    for attempt in 1..=attempts {
        let Some(email) = terminal.prompt_line("Email: ")? else {
            terminal.print_line("Input cancelled (EOF). Run `studybuddy login` to retry.")?;
            return Ok(None);
        };

        if !is_valid_email(&email) {
            terminal.print_line(&format!(
                "Enter a valid email address, e.g. name@example.com. Attempts left: {}",
                attempts.saturating_sub(attempt)
            ))?;
            continue;
        }

        return Ok(Some(email));
    }

    terminal.print_line("Email step failed too many times.")?;
    Ok(None)
}

fn report_backend_error(
    terminal: &mut dyn AuthTerminal,
    error: AuthBackendError,
    attempts_left: usize,
) -> io::Result<bool> {
    match error {
        AuthBackendError::InvalidCredentials => {
            terminal.print_line(&format!(
                "AUTH_INVALID_CREDENTIALS: Email or password is incorrect. Attempts left: {attempts_left}"
            ))?;
            Ok(attempts_left > 0)
        }
        AuthBackendError::Timeout => {
            terminal.print_line(&format!(
                "AUTH_TIMEOUT: The server did not answer in time. Attempts left: {attempts_left}"
            ))?;
            Ok(attempts_left > 0)
        }
        AuthBackendError::Unavailable => {
            terminal.print_line(
                "AUTH_UNAVAILABLE: The server cannot be reached. Check the api base_url and retry later.",
            )?;
            Ok(false)
        }
        AuthBackendError::Transient { message } => {
            terminal.print_line(&format!(
                "AUTH_FAILED: {}. Attempts left: {attempts_left}",
                redact_text(&message)
            ))?;
            Ok(attempts_left > 0)
        }
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Arc, sync::Mutex};

    use super::*;
    use crate::{
        domain::session::SessionUser,
        infra::{contracts::LocalStore, credentials::AuthEvent, local_store::MemoryLocalStore},
        test_support::ManualClock,
    };

    struct FakeTerminal {
        inputs: VecDeque<Option<String>>,
        output: Vec<String>,
    }

    impl FakeTerminal {
        fn new(inputs: Vec<Option<&str>>) -> Self {
            Self {
                inputs: inputs
                    .into_iter()
                    .map(|item| item.map(|value| value.to_owned()))
                    .collect(),
                output: Vec::new(),
            }
        }
    }

    impl AuthTerminal for FakeTerminal {
        fn print_line(&mut self, line: &str) -> io::Result<()> {
            self.output.push(line.to_owned());
            Ok(())
        }

        fn prompt_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
            Ok(self.inputs.pop_front().flatten())
        }

        fn prompt_secret(&mut self, _prompt: &str) -> io::Result<Option<String>> {
            Ok(self.inputs.pop_front().flatten())
        }
    }

    struct FakeBackend {
        results: Mutex<VecDeque<Result<AuthGrant, AuthBackendError>>>,
        attempts: Mutex<Vec<(String, String)>>,
    }

    impl FakeBackend {
        fn new(results: Vec<Result<AuthGrant, AuthBackendError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                attempts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AuthBackend for FakeBackend {
        async fn login(&self, email: &str, password: &str) -> Result<AuthGrant, AuthBackendError> {
            self.attempts
                .lock()
                .expect("attempts lock")
                .push((email.to_owned(), password.to_owned()));
            self.results
                .lock()
                .expect("results lock")
                .pop_front()
                .expect("missing backend result")
        }
    }

    fn grant() -> AuthGrant {
        AuthGrant {
            token: "opaque-token".to_owned(),
            refresh_token: Some("refresh".to_owned()),
            user: SessionUser {
                id: "u1".to_owned(),
                name: "Ana".to_owned(),
                email: "ana@example.com".to_owned(),
                role: "student".to_owned(),
                avatar_ref: None,
            },
        }
    }

    fn auth_state() -> (AuthState, Arc<MemoryLocalStore>) {
        let store = Arc::new(MemoryLocalStore::new());
        let auth = AuthState::new(store.clone(), Arc::new(ManualClock::new(0)));
        (auth, store)
    }

    #[tokio::test]
    async fn happy_path_persists_grant_and_emits_signed_in() {
        let mut terminal = FakeTerminal::new(vec![Some("ana@example.com"), Some("s3cret")]);
        let backend = FakeBackend::new(vec![Ok(grant())]);
        let (auth, store) = auth_state();
        let events = auth.subscribe();

        let outcome = run_guided_login(&mut terminal, &backend, &auth, &RetryPolicy::default())
            .await
            .expect("login should complete");

        assert_eq!(
            outcome,
            LoginOutcome::Authenticated {
                user_name: "Ana".to_owned()
            }
        );
        assert_eq!(
            store.get_item("token").expect("read token"),
            Some("opaque-token".to_owned())
        );
        assert_eq!(auth.session_user().map(|user| user.id), Some("u1".to_owned()));
        assert_eq!(events.try_recv(), Ok(AuthEvent::SignedIn));
    }

    #[tokio::test]
    async fn invalid_email_is_reprompted_without_calling_backend() {
        let mut terminal = FakeTerminal::new(vec![
            Some("not-an-email"),
            Some("ana@example.com"),
            Some("s3cret"),
        ]);
        let backend = FakeBackend::new(vec![Ok(grant())]);
        let (auth, _) = auth_state();

        let outcome = run_guided_login(&mut terminal, &backend, &auth, &RetryPolicy::default())
            .await
            .expect("login should complete");

        assert!(matches!(outcome, LoginOutcome::Authenticated { .. }));
        assert_eq!(backend.attempts.lock().expect("attempts lock").len(), 1);
        assert!(terminal
            .output
            .iter()
            .any(|line| line.contains("valid email")));
    }

    #[tokio::test]
    async fn wrong_password_retries_then_succeeds() {
        let mut terminal = FakeTerminal::new(vec![
            Some("ana@example.com"),
            Some("wrong"),
            Some("right"),
        ]);
        let backend = FakeBackend::new(vec![
            Err(AuthBackendError::InvalidCredentials),
            Ok(grant()),
        ]);
        let (auth, _) = auth_state();

        let outcome = run_guided_login(&mut terminal, &backend, &auth, &RetryPolicy::default())
            .await
            .expect("login should complete");

        assert!(matches!(outcome, LoginOutcome::Authenticated { .. }));
        assert!(terminal
            .output
            .iter()
            .any(|line| line.starts_with("AUTH_INVALID_CREDENTIALS")));
    }

    #[tokio::test]
    async fn unavailable_backend_exits_with_guidance() {
        let mut terminal = FakeTerminal::new(vec![Some("ana@example.com"), Some("s3cret")]);
        let backend = FakeBackend::new(vec![Err(AuthBackendError::Unavailable)]);
        let (auth, _) = auth_state();

        let outcome = run_guided_login(&mut terminal, &backend, &auth, &RetryPolicy::default())
            .await
            .expect("login should complete");

        assert_eq!(outcome, LoginOutcome::ExitWithGuidance);
        assert!(!auth.has_session());
    }

    #[tokio::test]
    async fn eof_at_email_prompt_exits() {
        let mut terminal = FakeTerminal::new(vec![None]);
        let backend = FakeBackend::new(vec![]);
        let (auth, _) = auth_state();

        let outcome = run_guided_login(&mut terminal, &backend, &auth, &RetryPolicy::default())
            .await
            .expect("login should complete");

        assert_eq!(outcome, LoginOutcome::ExitWithGuidance);
    }

    #[tokio::test]
    async fn transient_error_message_is_redacted() {
        let mut terminal = FakeTerminal::new(vec![Some("ana@example.com"), Some("pw"), None]);
        let backend = FakeBackend::new(vec![Err(AuthBackendError::Transient {
            message: "bad token=abc".to_owned(),
        })]);
        let (auth, _) = auth_state();

        run_guided_login(&mut terminal, &backend, &auth, &RetryPolicy::default())
            .await
            .expect("login should complete");

        let line = terminal
            .output
            .iter()
            .find(|line| line.starts_with("AUTH_FAILED"))
            .expect("transient error should be reported");
        assert!(!line.contains("abc"));
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a b@c.io"));
    }
}
