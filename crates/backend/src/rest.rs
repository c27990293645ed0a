use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use clubhouse_api::{
    Account, AuthSession, ContactMessage, InviteCode, NewContactMessage, NewProject, Profile,
    Project,
};

use crate::{Backend, BackendError, SignUpRequest};

/// HTTP client for a Supabase-style service: `/auth/v1` for accounts and
/// `/rest/v1/<table>` for rows.
///
/// Every request carries the project's public `apikey`; the bearer token is
/// the caller's access token when one is given and the public key otherwise.
pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl std::fmt::Debug for RestBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestBackend")
            .field("base_url", &self.base_url)
            .field("anon_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl RestBackend {
    /// Create a new client with the given base URL, public key and timeout.
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, anon_key))
    }

    /// Create from an existing `reqwest::Client` (e.g. shared in tests).
    pub fn with_client(client: reqwest::Client, base_url: &str, anon_key: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, url: String, token: Option<&str>) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token.unwrap_or(&self.anon_key))
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        token: Option<&str>,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, BackendError> {
        let resp = self
            .request(Method::GET, self.table_url(table), token)
            .query(&[("select", "*")])
            .query(filters)
            .send()
            .await?;
        parse_response(resp).await
    }

    async fn delete_by_id(&self, table: &str, token: &str, id: &str) -> Result<(), BackendError> {
        let resp = self
            .request(Method::DELETE, self.table_url(table), Some(token))
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        check_status(resp).await.map(drop)
    }
}

// ── Wire shapes of the auth service ────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    user_metadata: Option<WireMetadata>,
}

#[derive(Debug, Deserialize)]
struct WireMetadata {
    #[serde(default)]
    display_name: Option<String>,
}

impl From<WireUser> for Account {
    fn from(user: WireUser) -> Self {
        Account {
            id: user.id,
            email: user.email.unwrap_or_default(),
            display_name: user.user_metadata.and_then(|m| m.display_name),
            email_confirmed_at: user.email_confirmed_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireSession {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    user: WireUser,
}

impl From<WireSession> for AuthSession {
    fn from(session: WireSession) -> Self {
        AuthSession {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            expires_in: session.expires_in,
            user: session.user.into(),
        }
    }
}

/// Signup answers with a session when auto-confirm is on, with the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpReply {
    Session(WireSession),
    User(WireUser),
}

#[async_trait]
impl Backend for RestBackend {
    fn name(&self) -> &str {
        "rest"
    }

    // ── Invites ───────────────────────────────────────────────────────────

    async fn find_unused_invite(&self, code: &str) -> Result<Option<InviteCode>, BackendError> {
        let rows: Vec<InviteCode> = self
            .select(
                "invite_codes",
                None,
                &[
                    ("code", format!("eq.{code}")),
                    ("is_used", "eq.false".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn consume_invite(
        &self,
        token: &str,
        code: &str,
        user_id: &str,
    ) -> Result<InviteCode, BackendError> {
        let resp = self
            .request(Method::PATCH, self.table_url("invite_codes"), Some(token))
            .header("Prefer", "return=representation")
            .query(&[("code", format!("eq.{code}"))])
            .json(&serde_json::json!({ "is_used": true, "assigned_to": user_id }))
            .send()
            .await?;
        let rows: Vec<InviteCode> = parse_response(resp).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::rejected(404, format!("invite code {code} not found")))
    }

    // ── Auth ──────────────────────────────────────────────────────────────

    async fn sign_up(&self, req: &SignUpRequest) -> Result<Account, BackendError> {
        let resp = self
            .request(Method::POST, self.auth_url("/signup"), None)
            .json(&serde_json::json!({
                "email": req.email,
                "password": req.password,
                "data": { "display_name": req.display_name },
            }))
            .send()
            .await?;
        let reply: SignUpReply = parse_response(resp).await?;
        Ok(match reply {
            SignUpReply::Session(session) => session.user.into(),
            SignUpReply::User(user) => user.into(),
        })
    }

    async fn verify_signup_otp(
        &self,
        email: &str,
        token: &str,
    ) -> Result<AuthSession, BackendError> {
        let resp = self
            .request(Method::POST, self.auth_url("/verify"), None)
            .json(&serde_json::json!({ "type": "signup", "email": email, "token": token }))
            .send()
            .await?;
        let session: WireSession = parse_response(resp).await?;
        Ok(session.into())
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let resp = self
            .request(Method::POST, self.auth_url("/token"), None)
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        let session: WireSession = parse_response(resp).await?;
        Ok(session.into())
    }

    async fn send_password_recovery(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), BackendError> {
        let resp = self
            .request(Method::POST, self.auth_url("/recover"), None)
            .query(&[("redirect_to", redirect_to)])
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await?;
        check_status(resp).await.map(drop)
    }

    async fn get_user(&self, token: &str) -> Result<Account, BackendError> {
        let resp = self
            .request(Method::GET, self.auth_url("/user"), Some(token))
            .send()
            .await?;
        let user: WireUser = parse_response(resp).await?;
        Ok(user.into())
    }

    async fn update_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<Account, BackendError> {
        let resp = self
            .request(Method::PUT, self.auth_url("/user"), Some(token))
            .json(&serde_json::json!({ "password": new_password }))
            .send()
            .await?;
        let user: WireUser = parse_response(resp).await?;
        Ok(user.into())
    }

    async fn sign_out(&self, token: &str) -> Result<(), BackendError> {
        let resp = self
            .request(Method::POST, self.auth_url("/logout"), Some(token))
            .send()
            .await?;
        check_status(resp).await.map(drop)
    }

    // ── Profiles ──────────────────────────────────────────────────────────

    async fn get_profile(
        &self,
        token: Option<&str>,
        user_id: &str,
    ) -> Result<Option<Profile>, BackendError> {
        let rows: Vec<Profile> = self
            .select("profiles", token, &[("id", format!("eq.{user_id}"))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn list_profiles(&self, token: &str) -> Result<Vec<Profile>, BackendError> {
        self.select("profiles", Some(token), &[]).await
    }

    // ── Projects ──────────────────────────────────────────────────────────

    async fn list_projects(&self, token: Option<&str>) -> Result<Vec<Project>, BackendError> {
        self.select(
            "projects",
            token,
            &[("order", "created_at.desc".to_string())],
        )
        .await
    }

    async fn insert_project(
        &self,
        token: &str,
        project: &NewProject,
    ) -> Result<Project, BackendError> {
        let resp = self
            .request(Method::POST, self.table_url("projects"), Some(token))
            .header("Prefer", "return=representation")
            .json(&[project])
            .send()
            .await?;
        let rows: Vec<Project> = parse_response(resp).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("insert returned no project row".into()))
    }

    async fn delete_project(&self, token: &str, id: &str) -> Result<(), BackendError> {
        self.delete_by_id("projects", token, id).await
    }

    // ── Contact messages ──────────────────────────────────────────────────

    async fn insert_contact_message(
        &self,
        message: &NewContactMessage,
    ) -> Result<(), BackendError> {
        // Anonymous visitors may insert but not read back, so ask for no body.
        let resp = self
            .request(Method::POST, self.table_url("contact_messages"), None)
            .header("Prefer", "return=minimal")
            .json(&[message])
            .send()
            .await?;
        check_status(resp).await.map(drop)
    }

    async fn list_contact_messages(
        &self,
        token: &str,
    ) -> Result<Vec<ContactMessage>, BackendError> {
        self.select(
            "contact_messages",
            Some(token),
            &[("order", "created_at.desc".to_string())],
        )
        .await
    }

    async fn delete_contact_message(&self, token: &str, id: &str) -> Result<(), BackendError> {
        self.delete_by_id("contact_messages", token, id).await
    }
}

/// Return the response on 2xx, or a [`BackendError::Rejected`] carrying the
/// service's own error message.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    tracing::debug!(status = status.as_u16(), "backend rejected request");
    Err(BackendError::rejected(
        status.as_u16(),
        error_message(status, &body),
    ))
}

/// Parse an HTTP response: return the deserialized body on 2xx.
async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, BackendError> {
    let resp = check_status(resp).await?;
    Ok(resp.json().await?)
}

/// Pull the human-readable message out of an auth (`msg`, `error_description`)
/// or table (`message`) error body.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["msg", "message", "error_description", "error"] {
            if let Some(text) = value
                .get(key)
                .and_then(serde_json::Value::as_str)
                .filter(|text| !text.trim().is_empty())
            {
                return text.to_string();
            }
        }
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}
