use serde::{Deserialize, Serialize};

/// The signed-in user as known to the client.
///
/// Owned by the auth backend; the client only reads it for message
/// attribution and permission checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub avatar_ref: Option<String>,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }
}
