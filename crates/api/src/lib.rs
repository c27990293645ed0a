//! Shared entity types, request/response types, and validation for the clubhouse site.
//!
//! This crate is the **single source of truth** for everything that crosses a
//! boundary: rows read from the hosted backend, and JSON exchanged between the
//! server and the web front end. TypeScript types are generated via `ts-rs`.
//!
//! To regenerate TypeScript types:
//!   cargo test -p clubhouse-api --features ts -- export_typescript --nocapture

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod service;

// ─── Shared Enums ────────────────────────────────────────────────────────────

/// Where a member enrollment currently stands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum EnrollmentStep {
    #[default]
    AwaitingCode,
    AwaitingDetails,
    AwaitingOtp,
    Completed,
}

impl EnrollmentStep {
    pub fn as_str(&self) -> &str {
        match self {
            Self::AwaitingCode => "awaiting_code",
            Self::AwaitingDetails => "awaiting_details",
            Self::AwaitingOtp => "awaiting_otp",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for EnrollmentStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Backend rows ────────────────────────────────────────────────────────────

/// Single-use token gating signup (`invite_codes` table).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct InviteCode {
    pub code: String,
    pub is_used: bool,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

/// An account as known to the backend's auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Account {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Name shown on published projects: display name, or the email when unset.
    pub fn author_name(&self) -> &str {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.email)
    }

    pub fn is_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some()
    }
}

/// Per-user authorization record (`profiles` table).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

/// Showcased member project (`projects` table).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub github_url: Option<String>,
    pub author_name: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a project; id and timestamp are assigned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub github_url: Option<String>,
    pub author_name: String,
    pub user_id: String,
}

/// Inbound message from the contact form (`contact_messages` table).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ContactMessage {
    pub id: String,
    pub name: String,
    pub email: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a contact message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub content: String,
}

/// Tokens and account returned by the auth service after login or OTP confirmation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: Account,
}

// ─── Navigation ──────────────────────────────────────────────────────────────

/// Client-side navigation to perform after an operation completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Redirect {
    pub to: String,
    pub after_ms: u64,
}

impl Redirect {
    pub fn new(to: impl Into<String>, after: std::time::Duration) -> Self {
        Self {
            to: to.into(),
            after_ms: u64::try_from(after.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

// ─── Contact ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub content: String,
}

// ─── Projects ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct CreateProjectRequest {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub github_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ProjectListResponse {
    pub projects: Vec<Project>,
}

// ─── Auth ────────────────────────────────────────────────────────────────────

/// Email + password login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct LoginResponse {
    pub session: AuthSession,
    pub redirect: Redirect,
}

/// Ask for a password recovery link.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Set a new password for the user owning the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

/// Result of an auth action that only navigates afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub redirect: Option<Redirect>,
}

/// Who is signed in, as resolved from the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SessionResponse {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub is_admin: bool,
}

// ─── Enrollment ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct VerifyCodeRequest {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SubmitDetailsRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct VerifyOtpRequest {
    pub token: String,
}

/// Snapshot of one enrollment wizard after the last action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct EnrollmentResponse {
    pub id: String,
    pub step: EnrollmentStep,
    pub status: String,
    /// Message of the last failed attempt, cleared by the next success.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub redirect: Option<Redirect>,
    /// Only set once completed; `false` flags an invite that still needs manual consumption.
    #[serde(default)]
    pub invite_consumed: Option<bool>,
}

// ─── Admin ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct DashboardStats {
    pub total_members: u64,
    pub total_projects: u64,
    pub total_messages: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct DashboardResponse {
    pub members: Vec<Profile>,
    pub projects: Vec<Project>,
    pub messages: Vec<ContactMessage>,
    pub stats: DashboardStats,
}

// ─── Generic responses ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend: String,
}

// ─── Service Error ───────────────────────────────────────────────────────────

/// Framework-agnostic service error.
///
/// Each variant maps to an HTTP status code. The server converts this into a
/// JSON response; the CLI prints the message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ServiceError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    /// The remote service could not be reached or answered garbage.
    Unavailable(String),
    Internal(String),
}

impl ServiceError {
    /// HTTP status code as a `u16`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Unavailable(_) => 502,
            Self::Internal(_) => 500,
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::Unavailable(m)
            | Self::Internal(m) => m,
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ServiceError {}

/// JSON error shape `{ "error": "..." }` returned by all error responses.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ApiError {
    pub error: String,
}

impl From<&ServiceError> for ApiError {
    fn from(e: &ServiceError) -> Self {
        Self {
            error: e.message().to_string(),
        }
    }
}


// ─── TypeScript generation ───────────────────────────────────────────────────

#[cfg(all(test, feature = "ts"))]
mod ts_export {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use ts_rs::TS;

    /// Run with: cargo test -p clubhouse-api --features ts -- export_typescript --nocapture
    #[test]
    fn export_typescript() {
        let out_dir =
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../web/src/api-types.generated.ts");

        let cfg = ts_rs::Config::new().with_large_int("number");
        let mut parts: Vec<String> = Vec::new();
        parts.push("// AUTO-GENERATED by clubhouse-api — DO NOT EDIT".to_string());
        parts.push(
            "// Regenerate with: cargo test -p clubhouse-api --features ts -- export_typescript"
                .to_string(),
        );
        parts.push(String::new());

        // Structs: `type X = {...}` → `export interface X {...}`
        // Enums/unions: `type X = "a" | "b"` → `export type X = "a" | "b"`
        macro_rules! collect_ts {
            ($($t:ty),+ $(,)?) => {
                $(
                    let decl = <$t>::decl(&cfg);
                    let decl = if decl.contains(" = {") {
                        decl
                            .replacen("type ", "export interface ", 1)
                            .replace(" = {", " {")
                            .trim_end_matches(';')
                            .to_string()
                    } else {
                        decl
                            .replacen("type ", "export type ", 1)
                            .trim_end_matches(';')
                            .to_string()
                    };
                    parts.push(decl);
                    parts.push(String::new());
                )+
            };
        }

        collect_ts!(
            EnrollmentStep,
            InviteCode,
            Account,
            Profile,
            Project,
            ContactMessage,
            AuthSession,
            Redirect,
            ContactRequest,
            CreateProjectRequest,
            ProjectListResponse,
            LoginRequest,
            LoginResponse,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            StatusResponse,
            SessionResponse,
            VerifyCodeRequest,
            SubmitDetailsRequest,
            VerifyOtpRequest,
            EnrollmentResponse,
            DashboardStats,
            DashboardResponse,
            OkResponse,
            HealthResponse,
            ApiError,
        );

        let content = parts.join("\n");

        if let Some(parent) = out_dir.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let mut file = std::fs::File::create(&out_dir)
            .unwrap_or_else(|e| panic!("Failed to create {}: {}", out_dir.display(), e));
        file.write_all(content.as_bytes())
            .unwrap_or_else(|e| panic!("Failed to write {}: {}", out_dir.display(), e));

        println!("Generated TypeScript types at: {}", out_dir.display());
    }
}
