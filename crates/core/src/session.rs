//! Explicit signed-in context.
//!
//! Handlers and commands receive a [`Session`] value instead of reading a
//! process-wide "current user", so tests can build one directly.

use clubhouse_api::{Account, ServiceError, SessionResponse};
use clubhouse_backend::{Backend, BackendError};

/// The signed-in member behind an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: Account,
    pub access_token: String,
    pub is_admin: bool,
}

impl Session {
    /// Resolve `access_token` into a session: the account from the auth
    /// service, the admin flag from the member's profile row.
    pub async fn resolve(backend: &dyn Backend, access_token: &str) -> Result<Self, ServiceError> {
        let user = backend.get_user(access_token).await.map_err(token_error)?;

        // A missing or unreadable profile means no admin rights, not a failed login.
        let is_admin = match backend.get_profile(Some(access_token), &user.id).await {
            Ok(profile) => profile.is_some_and(|p| p.is_admin),
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "profile lookup failed");
                false
            }
        };

        Ok(Self {
            user,
            access_token: access_token.to_string(),
            is_admin,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// Fail with `Forbidden` unless this member is an admin.
    pub fn require_admin(&self) -> Result<&Self, ServiceError> {
        if self.is_admin {
            Ok(self)
        } else {
            Err(ServiceError::Forbidden("admin access required".into()))
        }
    }

    pub fn to_response(&self) -> SessionResponse {
        SessionResponse {
            user_id: self.user.id.clone(),
            email: self.user.email.clone(),
            display_name: self.user.display_name.clone(),
            is_admin: self.is_admin,
        }
    }
}

/// A token the auth service refuses is a bad login; an outage is not.
fn token_error(e: BackendError) -> ServiceError {
    match e {
        BackendError::Rejected { status: 400..=499, message } => ServiceError::Unauthorized(message),
        other => other.into(),
    }
}
