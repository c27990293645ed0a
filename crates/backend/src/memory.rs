//! In-process stand-in for the hosted service.
//!
//! Mirrors the observable behavior the site depends on: pending accounts
//! confirmed by an e-mailed one-time code, password grants, recovery links,
//! and row policies that keep anonymous callers away from member and admin
//! data. Mail is not sent; it lands in an outbox tests can read.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use clubhouse_api::{
    Account, AuthSession, ContactMessage, InviteCode, NewContactMessage, NewProject, Profile,
    Project,
};

use crate::{Backend, BackendError, SignUpRequest};

const MIN_PASSWORD_LEN: usize = 6;
const SESSION_TTL_SECS: u64 = 3600;

/// What kind of mail the auth service would have sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailKind {
    SignupOtp,
    Recovery { redirect_to: String },
}

/// A message the auth service "sent".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub kind: MailKind,
    /// OTP for signups, access token for recovery links.
    pub token: String,
}

#[derive(Debug, Clone)]
struct StoredAccount {
    account: Account,
    password: String,
}

#[derive(Debug, Default)]
struct State {
    invites: BTreeMap<String, InviteCode>,
    accounts: HashMap<String, StoredAccount>,
    pending_otps: HashMap<String, String>,
    sessions: HashMap<String, String>,
    profiles: BTreeMap<String, Profile>,
    projects: Vec<Project>,
    messages: Vec<ContactMessage>,
    outbox: Vec<Mail>,
    signups: Vec<SignUpRequest>,
    calls: usize,
    fixed_otp: Option<String>,
    offline: bool,
    reject_invite_updates: bool,
}

impl State {
    fn account_by_email(&self, email: &str) -> Option<&StoredAccount> {
        self.accounts
            .values()
            .find(|stored| stored.account.email.eq_ignore_ascii_case(email))
    }

    fn user_for(&self, token: &str) -> Result<Account, BackendError> {
        self.sessions
            .get(token)
            .and_then(|user_id| self.accounts.get(user_id))
            .map(|stored| stored.account.clone())
            .ok_or_else(|| {
                BackendError::rejected(401, "invalid JWT: unable to parse or verify signature")
            })
    }

    fn is_admin(&self, user_id: &str) -> bool {
        self.profiles.get(user_id).is_some_and(|p| p.is_admin)
    }

    fn require_admin(&self, token: &str) -> Result<Account, BackendError> {
        let user = self.user_for(token)?;
        if !self.is_admin(&user.id) {
            return Err(permission_denied());
        }
        Ok(user)
    }

    fn open_session(&mut self, account: Account) -> AuthSession {
        let access_token = format!("mem_{}", uuid::Uuid::new_v4().simple());
        self.sessions.insert(access_token.clone(), account.id.clone());
        AuthSession {
            access_token,
            refresh_token: Some(uuid::Uuid::new_v4().simple().to_string()),
            expires_in: Some(SESSION_TTL_SECS),
            user: account,
        }
    }

    fn next_otp(&self) -> String {
        self.fixed_otp.clone().unwrap_or_else(|| {
            let n = uuid::Uuid::new_v4().as_u128() % 100_000_000;
            format!("{n:08}")
        })
    }
}

fn permission_denied() -> BackendError {
    BackendError::rejected(403, "permission denied by row-level security policy")
}

/// Thread-safe in-memory [`Backend`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("memory backend mutex poisoned")
    }

    /// Lock state for one remote call, failing like a dead network when offline.
    fn call(&self) -> Result<std::sync::MutexGuard<'_, State>, BackendError> {
        let mut state = self.state();
        state.calls += 1;
        if state.offline {
            return Err(BackendError::Transport("connection refused".into()));
        }
        Ok(state)
    }

    // ── Seeding ───────────────────────────────────────────────────────────

    /// Every signup OTP will be `otp` instead of a random 8-digit code.
    pub fn with_fixed_otp(self, otp: &str) -> Self {
        self.state().fixed_otp = Some(otp.to_string());
        self
    }

    pub fn add_invite(&self, code: &str, is_used: bool) {
        self.state().invites.insert(
            code.to_string(),
            InviteCode {
                code: code.to_string(),
                is_used,
                assigned_to: None,
            },
        );
    }

    /// Create a confirmed account with its profile row.
    pub fn add_member(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
        is_admin: bool,
    ) -> Account {
        let account = Account {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_lowercase(),
            display_name: display_name.map(String::from),
            email_confirmed_at: Some(Utc::now()),
        };
        let mut state = self.state();
        state.profiles.insert(
            account.id.clone(),
            Profile {
                id: account.id.clone(),
                email: Some(account.email.clone()),
                is_admin,
            },
        );
        state.accounts.insert(
            account.id.clone(),
            StoredAccount {
                account: account.clone(),
                password: password.to_string(),
            },
        );
        account
    }

    // ── Fault injection ───────────────────────────────────────────────────

    /// While offline every call fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// Make invite updates fail while leaving every other call working.
    pub fn reject_invite_updates(&self, reject: bool) {
        self.state().reject_invite_updates = reject;
    }

    // ── Inspection ────────────────────────────────────────────────────────

    pub fn invite(&self, code: &str) -> Option<InviteCode> {
        self.state().invites.get(code).cloned()
    }

    pub fn account(&self, email: &str) -> Option<Account> {
        self.state()
            .account_by_email(email)
            .map(|stored| stored.account.clone())
    }

    /// Most recent OTP mailed to `email`.
    pub fn last_otp(&self, email: &str) -> Option<String> {
        self.last_mail(email, |kind| matches!(kind, MailKind::SignupOtp))
    }

    /// Access token from the most recent recovery link mailed to `email`.
    pub fn last_recovery_token(&self, email: &str) -> Option<String> {
        self.last_mail(email, |kind| matches!(kind, MailKind::Recovery { .. }))
    }

    fn last_mail(&self, email: &str, kind: impl Fn(&MailKind) -> bool) -> Option<String> {
        self.state()
            .outbox
            .iter()
            .rev()
            .find(|mail| mail.to.eq_ignore_ascii_case(email) && kind(&mail.kind))
            .map(|mail| mail.token.clone())
    }

    pub fn outbox(&self) -> Vec<Mail> {
        self.state().outbox.clone()
    }

    /// Signup requests in the order they were received.
    pub fn signups(&self) -> Vec<SignUpRequest> {
        self.state().signups.clone()
    }

    /// Number of remote calls made so far, failed ones included.
    pub fn call_count(&self) -> usize {
        self.state().calls
    }

    /// Access tokens issued and not yet signed out.
    pub fn live_sessions(&self) -> usize {
        self.state().sessions.len()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    // ── Invites ───────────────────────────────────────────────────────────

    async fn find_unused_invite(&self, code: &str) -> Result<Option<InviteCode>, BackendError> {
        let state = self.call()?;
        Ok(state.invites.get(code).filter(|i| !i.is_used).cloned())
    }

    async fn consume_invite(
        &self,
        token: &str,
        code: &str,
        user_id: &str,
    ) -> Result<InviteCode, BackendError> {
        let mut state = self.call()?;
        state.user_for(token)?;
        if state.reject_invite_updates {
            return Err(permission_denied());
        }
        let invite = state
            .invites
            .get_mut(code)
            .ok_or_else(|| BackendError::rejected(404, format!("invite code {code} not found")))?;
        invite.is_used = true;
        invite.assigned_to = Some(user_id.to_string());
        Ok(invite.clone())
    }

    // ── Auth ──────────────────────────────────────────────────────────────

    async fn sign_up(&self, req: &SignUpRequest) -> Result<Account, BackendError> {
        let mut state = self.call()?;
        state.signups.push(req.clone());

        let email = req.email.trim().to_lowercase();
        if req.password.len() < MIN_PASSWORD_LEN {
            return Err(BackendError::rejected(
                422,
                format!("Password should be at least {MIN_PASSWORD_LEN} characters."),
            ));
        }

        let existing = state.account_by_email(&email).cloned();
        let account = match existing {
            Some(existing) if existing.account.is_confirmed() => {
                return Err(BackendError::rejected(422, "User already registered"));
            }
            // Unconfirmed signups are replaced and get a fresh code.
            Some(mut existing) => {
                existing.password = req.password.clone();
                existing.account.display_name = Some(req.display_name.clone());
                let account = existing.account.clone();
                state.accounts.insert(account.id.clone(), existing);
                account
            }
            None => {
                let account = Account {
                    id: uuid::Uuid::new_v4().to_string(),
                    email: email.clone(),
                    display_name: Some(req.display_name.clone()),
                    email_confirmed_at: None,
                };
                state.accounts.insert(
                    account.id.clone(),
                    StoredAccount {
                        account: account.clone(),
                        password: req.password.clone(),
                    },
                );
                state.profiles.insert(
                    account.id.clone(),
                    Profile {
                        id: account.id.clone(),
                        email: Some(email.clone()),
                        is_admin: false,
                    },
                );
                account
            }
        };

        let otp = state.next_otp();
        state.pending_otps.insert(email.clone(), otp.clone());
        tracing::info!(to = %email, otp = %otp, "memory backend: signup OTP mail queued");
        state.outbox.push(Mail {
            to: email,
            kind: MailKind::SignupOtp,
            token: otp,
        });
        Ok(account)
    }

    async fn verify_signup_otp(
        &self,
        email: &str,
        token: &str,
    ) -> Result<AuthSession, BackendError> {
        let mut state = self.call()?;
        let email = email.trim().to_lowercase();
        let expected = state.pending_otps.get(&email);
        if expected.map(String::as_str) != Some(token) {
            return Err(BackendError::rejected(403, "Token has expired or is invalid"));
        }
        state.pending_otps.remove(&email);

        let user_id = state
            .account_by_email(&email)
            .map(|stored| stored.account.id.clone())
            .ok_or_else(|| BackendError::rejected(404, "User not found"))?;
        let stored = state
            .accounts
            .get_mut(&user_id)
            .ok_or_else(|| BackendError::rejected(404, "User not found"))?;
        stored.account.email_confirmed_at = Some(Utc::now());
        let account = stored.account.clone();
        Ok(state.open_session(account))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let mut state = self.call()?;
        let stored = state
            .account_by_email(email.trim())
            .filter(|stored| stored.password == password)
            .cloned()
            .ok_or_else(|| BackendError::rejected(400, "Invalid login credentials"))?;
        if !stored.account.is_confirmed() {
            return Err(BackendError::rejected(400, "Email not confirmed"));
        }
        Ok(state.open_session(stored.account))
    }

    async fn send_password_recovery(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), BackendError> {
        let mut state = self.call()?;
        // Unknown addresses succeed silently so accounts cannot be enumerated.
        let Some(stored) = state.account_by_email(email.trim()).cloned() else {
            return Ok(());
        };
        let session = state.open_session(stored.account.clone());
        tracing::info!(to = %stored.account.email, %redirect_to, "memory backend: recovery mail queued");
        state.outbox.push(Mail {
            to: stored.account.email,
            kind: MailKind::Recovery {
                redirect_to: redirect_to.to_string(),
            },
            token: session.access_token,
        });
        Ok(())
    }

    async fn get_user(&self, token: &str) -> Result<Account, BackendError> {
        self.call()?.user_for(token)
    }

    async fn update_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<Account, BackendError> {
        let mut state = self.call()?;
        let user = state.user_for(token)?;
        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(BackendError::rejected(
                422,
                format!("Password should be at least {MIN_PASSWORD_LEN} characters."),
            ));
        }
        if let Some(stored) = state.accounts.get_mut(&user.id) {
            stored.password = new_password.to_string();
        }
        Ok(user)
    }

    async fn sign_out(&self, token: &str) -> Result<(), BackendError> {
        let mut state = self.call()?;
        state.user_for(token)?;
        state.sessions.remove(token);
        Ok(())
    }

    // ── Profiles ──────────────────────────────────────────────────────────

    async fn get_profile(
        &self,
        token: Option<&str>,
        user_id: &str,
    ) -> Result<Option<Profile>, BackendError> {
        let state = self.call()?;
        let Some(token) = token else {
            return Ok(None);
        };
        let caller = state.user_for(token)?;
        if caller.id != user_id && !state.is_admin(&caller.id) {
            return Ok(None);
        }
        Ok(state.profiles.get(user_id).cloned())
    }

    async fn list_profiles(&self, token: &str) -> Result<Vec<Profile>, BackendError> {
        let state = self.call()?;
        state.require_admin(token)?;
        Ok(state.profiles.values().cloned().collect())
    }

    // ── Projects ──────────────────────────────────────────────────────────

    async fn list_projects(&self, _token: Option<&str>) -> Result<Vec<Project>, BackendError> {
        let state = self.call()?;
        let mut projects = state.projects.clone();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    async fn insert_project(
        &self,
        token: &str,
        project: &NewProject,
    ) -> Result<Project, BackendError> {
        let mut state = self.call()?;
        let caller = state.user_for(token)?;
        if caller.id != project.user_id {
            return Err(permission_denied());
        }
        let row = Project {
            id: uuid::Uuid::new_v4().to_string(),
            title: project.title.clone(),
            description: project.description.clone(),
            github_url: project.github_url.clone(),
            author_name: project.author_name.clone(),
            user_id: project.user_id.clone(),
            created_at: Utc::now(),
        };
        state.projects.push(row.clone());
        Ok(row)
    }

    async fn delete_project(&self, token: &str, id: &str) -> Result<(), BackendError> {
        let mut state = self.call()?;
        state.require_admin(token)?;
        state.projects.retain(|p| p.id != id);
        Ok(())
    }

    // ── Contact messages ──────────────────────────────────────────────────

    async fn insert_contact_message(
        &self,
        message: &NewContactMessage,
    ) -> Result<(), BackendError> {
        let mut state = self.call()?;
        state.messages.push(ContactMessage {
            id: uuid::Uuid::new_v4().to_string(),
            name: message.name.clone(),
            email: message.email.clone(),
            content: message.content.clone(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_contact_messages(
        &self,
        token: &str,
    ) -> Result<Vec<ContactMessage>, BackendError> {
        let state = self.call()?;
        state.require_admin(token)?;
        let mut messages = state.messages.clone();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(messages)
    }

    async fn delete_contact_message(&self, token: &str, id: &str) -> Result<(), BackendError> {
        let mut state = self.call()?;
        state.require_admin(token)?;
        state.messages.retain(|m| m.id != id);
        Ok(())
    }
}
