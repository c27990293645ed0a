//! Access to the hosted backend that owns every row and every account.
//!
//! The site never stores anything itself: invites, accounts, profiles,
//! projects and contact messages all live behind the [`Backend`] trait.
//! [`RestBackend`] talks to the real service over HTTP; [`MemoryBackend`]
//! keeps everything in process for tests and local development.

pub mod error;
pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use clubhouse_api::{
    Account, AuthSession, ContactMessage, InviteCode, NewContactMessage, NewProject, Profile,
    Project,
};

pub use error::BackendError;
pub use memory::MemoryBackend;
pub use rest::RestBackend;

/// Account creation request; `display_name` travels as user metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// Capabilities the site needs from the hosted service.
///
/// Table operations take the caller's access token so the service can apply
/// its row-level policies; `None` means the anonymous (public) key is used.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Short label for logs and the health endpoint.
    fn name(&self) -> &str;

    // ── Invites ───────────────────────────────────────────────────────────

    /// Look up the invite matching `code` that has not been used yet.
    async fn find_unused_invite(&self, code: &str) -> Result<Option<InviteCode>, BackendError>;

    /// Mark `code` as used and assign it to `user_id`.
    async fn consume_invite(
        &self,
        token: &str,
        code: &str,
        user_id: &str,
    ) -> Result<InviteCode, BackendError>;

    // ── Auth ──────────────────────────────────────────────────────────────

    /// Register an account; the service e-mails a one-time code to confirm it.
    async fn sign_up(&self, req: &SignUpRequest) -> Result<Account, BackendError>;

    /// Confirm a pending signup with the one-time code sent to `email`.
    async fn verify_signup_otp(&self, email: &str, token: &str)
    -> Result<AuthSession, BackendError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError>;

    /// E-mail a recovery link pointing at `redirect_to`.
    async fn send_password_recovery(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), BackendError>;

    async fn get_user(&self, token: &str) -> Result<Account, BackendError>;

    async fn update_password(&self, token: &str, new_password: &str)
    -> Result<Account, BackendError>;

    async fn sign_out(&self, token: &str) -> Result<(), BackendError>;

    // ── Profiles ──────────────────────────────────────────────────────────

    async fn get_profile(
        &self,
        token: Option<&str>,
        user_id: &str,
    ) -> Result<Option<Profile>, BackendError>;

    async fn list_profiles(&self, token: &str) -> Result<Vec<Profile>, BackendError>;

    // ── Projects ──────────────────────────────────────────────────────────

    /// All projects, newest first.
    async fn list_projects(&self, token: Option<&str>) -> Result<Vec<Project>, BackendError>;

    async fn insert_project(&self, token: &str, project: &NewProject)
    -> Result<Project, BackendError>;

    async fn delete_project(&self, token: &str, id: &str) -> Result<(), BackendError>;

    // ── Contact messages ──────────────────────────────────────────────────

    async fn insert_contact_message(&self, message: &NewContactMessage)
    -> Result<(), BackendError>;

    /// All messages, newest first.
    async fn list_contact_messages(&self, token: &str)
    -> Result<Vec<ContactMessage>, BackendError>;

    async fn delete_contact_message(&self, token: &str, id: &str) -> Result<(), BackendError>;
}
