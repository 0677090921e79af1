//! What the user is told when something goes wrong, grouped by origin.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiNotice {
    /// A required input is missing or malformed; shown next to the field.
    FieldError { field: &'static str, message: String },
    /// The action needs a signed-in user.
    LoginRequired,
    /// The stored credential was rejected; the user is sent back to login.
    SessionExpired,
    /// Network, timeout or server trouble. Dismissable, optionally retryable.
    Banner { message: String, retryable: bool },
    /// Nothing to show; rendered explicitly instead of a blank screen.
    EmptyState { what: String },
}

impl UiNotice {
    pub fn banner(message: impl Into<String>) -> Self {
        Self::Banner {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Banner { retryable: true, .. })
    }
}

impl fmt::Display for UiNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldError { field, message } => write!(f, "{field}: {message}"),
            Self::LoginRequired => f.write_str("Please log in to continue (studybuddy login)."),
            Self::SessionExpired => {
                f.write_str("Your session has expired. Please log in again (studybuddy login).")
            }
            Self::Banner { message, retryable } => {
                if *retryable {
                    write!(f, "{message} Run the command again to retry.")
                } else {
                    f.write_str(message)
                }
            }
            Self::EmptyState { what } => write!(f, "No {what} yet."),
        }
    }
}
