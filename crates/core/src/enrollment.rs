//! Invite-gated member enrollment.
//!
//! A new member needs an unused invite code, then account details, then the
//! one-time code the auth service mails them. The invite is consumed only
//! after the one-time code is confirmed.
//!
//! ```text
//! AwaitingCode --CodeAccepted--> AwaitingDetails --AccountCreated--> AwaitingOtp --OtpConfirmed--> Completed
//!      ^ Failed                       ^ Failed                            ^ Failed
//! ```
//!
//! [`transition`] is the pure state function; [`Enrollment`] holds the form
//! state and performs exactly one backend call per user action.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use clubhouse_api::{EnrollmentResponse, Redirect, ServiceError, service};
use clubhouse_backend::{Backend, BackendError, SignUpRequest};
use thiserror::Error;

pub use clubhouse_api::EnrollmentStep as Step;

/// Delay before sending a freshly enrolled member to the landing page.
pub const COMPLETION_REDIRECT_DELAY: Duration = Duration::from_secs(2);

pub const STATUS_SCANNING: &str = "scanning clearance code…";
pub const STATUS_CODE_ACCEPTED: &str = "code accepted. enter details.";
pub const STATUS_DISPATCHING: &str = "dispatching security OTP…";
pub const STATUS_OTP_SENT: &str = "OTP dispatched.";
pub const STATUS_CONFIRMING: &str = "confirming OTP…";
pub const STATUS_COMPLETE: &str = "enrollment complete.";

/// Why an enrollment action did not advance the wizard.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnrollmentError {
    /// Input rejected before any remote call.
    #[error("{0}")]
    Validation(String),

    /// No unused invite matches the code.
    #[error("invalid or used code.")]
    InvalidCode,

    /// The backend refused the request; `message` is its own wording.
    #[error("{message}")]
    Remote { status: u16, message: String },

    /// The backend could not be reached.
    #[error("{0}")]
    Transport(String),
}

impl EnrollmentError {
    /// HTTP status to report for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::InvalidCode => 400,
            Self::Remote { status, .. } if (400..500).contains(status) => *status,
            Self::Remote { .. } | Self::Transport(_) => 502,
        }
    }
}

impl From<BackendError> for EnrollmentError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Rejected { status, message } => Self::Remote { status, message },
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<ServiceError> for EnrollmentError {
    fn from(e: ServiceError) -> Self {
        Self::Validation(e.message().to_string())
    }
}

/// Result of one remote call, fed into [`transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    CodeAccepted,
    AccountCreated,
    OtpConfirmed,
    Failed(String),
}

/// Next step after `event`. Failures and out-of-order events never move the wizard.
pub fn transition(step: Step, event: &Event) -> Step {
    match (step, event) {
        (Step::AwaitingCode, Event::CodeAccepted) => Step::AwaitingDetails,
        (Step::AwaitingDetails, Event::AccountCreated) => Step::AwaitingOtp,
        (Step::AwaitingOtp, Event::OtpConfirmed) => Step::Completed,
        (step, _) => step,
    }
}

/// Status shown while the remote call for `step` is in flight.
pub fn pending_status(step: Step) -> Option<&'static str> {
    match step {
        Step::AwaitingCode => Some(STATUS_SCANNING),
        Step::AwaitingDetails => Some(STATUS_DISPATCHING),
        Step::AwaitingOtp => Some(STATUS_CONFIRMING),
        Step::Completed => None,
    }
}

/// Callback invoked with every new status line.
#[derive(Clone, Default)]
struct StatusObserver(Option<Arc<dyn Fn(&str) + Send + Sync>>);

impl fmt::Debug for StatusObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0.is_some() { "StatusObserver(set)" } else { "StatusObserver(none)" })
    }
}

/// What a finished enrollment produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub user_id: String,
    /// `false` when the account was confirmed but marking the invite used failed.
    pub invite_consumed: bool,
    pub redirect: Redirect,
}

/// One enrollment wizard: the current step plus the form fields entered so far.
///
/// The password is handed to the backend and never kept.
#[derive(Debug, Clone, Default)]
pub struct Enrollment {
    step: Step,
    invite_code: String,
    full_name: String,
    email: String,
    status: String,
    last_error: Option<String>,
    completion: Option<Completion>,
    observer: StatusObserver,
}

impl Enrollment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    /// Feedback line for the user, updated before and after every call.
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn invite_code(&self) -> &str {
        &self.invite_code
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }

    /// Call `observer` with each status line as it is set, including the
    /// in-flight ones set before a remote call starts.
    pub fn on_status(&mut self, observer: impl Fn(&str) + Send + Sync + 'static) {
        self.observer = StatusObserver(Some(Arc::new(observer)));
    }

    /// Drop every field and start over from the invite code. The status observer stays.
    pub fn reset(&mut self) {
        let observer = std::mem::take(&mut self.observer);
        *self = Self {
            observer,
            ..Self::default()
        };
        self.set_status("");
    }

    /// Step 1: check the invite code is known and unused.
    pub async fn verify_code(
        &mut self,
        backend: &dyn Backend,
        code: &str,
    ) -> Result<Step, EnrollmentError> {
        self.expect_step(Step::AwaitingCode)?;
        let code = service::require("invite code", code).map_err(|e| self.fail(e.into()))?;

        self.set_status(STATUS_SCANNING);
        match backend.find_unused_invite(&code).await {
            Ok(Some(invite)) => {
                self.invite_code = invite.code;
                Ok(self.advance(Event::CodeAccepted, STATUS_CODE_ACCEPTED))
            }
            Ok(None) => {
                tracing::info!(code = %code, "invite code rejected");
                Err(self.fail(EnrollmentError::InvalidCode))
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Step 2: create the account; the backend mails the one-time code.
    pub async fn submit_details(
        &mut self,
        backend: &dyn Backend,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Step, EnrollmentError> {
        self.expect_step(Step::AwaitingDetails)?;
        let req = details_request(full_name, email, password).map_err(|e| self.fail(e))?;

        self.set_status(STATUS_DISPATCHING);
        match backend.sign_up(&req).await {
            Ok(account) => {
                tracing::info!(user_id = %account.id, "enrollment account created");
                self.full_name = req.display_name;
                self.email = req.email;
                Ok(self.advance(Event::AccountCreated, STATUS_OTP_SENT))
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Step 3: confirm the account, then consume the invite.
    pub async fn verify_otp(
        &mut self,
        backend: &dyn Backend,
        token: &str,
    ) -> Result<Step, EnrollmentError> {
        self.expect_step(Step::AwaitingOtp)?;
        let token = service::validate_otp(token).map_err(|e| self.fail(e.into()))?;

        self.set_status(STATUS_CONFIRMING);
        let session = match backend.verify_signup_otp(&self.email, &token).await {
            Ok(session) => session,
            Err(e) => return Err(self.fail(e.into())),
        };
        let user_id = session.user.id.clone();

        // Not transactional with the confirmation above: if this fails the
        // account stays confirmed and the code stays reusable.
        let consumed = backend
            .consume_invite(&session.access_token, &self.invite_code, &user_id)
            .await;
        let status = match &consumed {
            Ok(_) => STATUS_COMPLETE.to_string(),
            Err(e) => {
                tracing::warn!(
                    code = %self.invite_code,
                    user_id = %user_id,
                    error = %e,
                    "account confirmed but invite code was not marked used"
                );
                format!("{STATUS_COMPLETE} invite code could not be marked used: {e}")
            }
        };

        self.completion = Some(Completion {
            user_id,
            invite_consumed: consumed.is_ok(),
            redirect: Redirect::new("/", COMPLETION_REDIRECT_DELAY),
        });
        Ok(self.advance(Event::OtpConfirmed, &status))
    }

    /// Snapshot for the HTTP API.
    pub fn to_response(&self, id: &str) -> EnrollmentResponse {
        EnrollmentResponse {
            id: id.to_string(),
            step: self.step,
            status: self.status.clone(),
            error: self.last_error.clone(),
            redirect: self.completion.as_ref().map(|c| c.redirect.clone()),
            invite_consumed: self.completion.as_ref().map(|c| c.invite_consumed),
        }
    }

    /// Out-of-step calls leave status and last error untouched.
    fn expect_step(&self, expected: Step) -> Result<(), EnrollmentError> {
        if self.step == expected {
            return Ok(());
        }
        Err(EnrollmentError::Validation(format!(
            "enrollment is {}, not {expected}",
            self.step
        )))
    }

    fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
        if let Some(observer) = &self.observer.0 {
            observer(status);
        }
    }

    fn advance(&mut self, event: Event, status: &str) -> Step {
        self.step = transition(self.step, &event);
        self.last_error = None;
        self.set_status(status);
        self.step
    }

    fn fail(&mut self, err: EnrollmentError) -> EnrollmentError {
        let message = err.to_string();
        self.step = transition(self.step, &Event::Failed(message.clone()));
        self.last_error = Some(message.clone());
        self.set_status(&message);
        err
    }
}

fn details_request(
    full_name: &str,
    email: &str,
    password: &str,
) -> Result<SignUpRequest, EnrollmentError> {
    let display_name = service::require("full name", full_name)?;
    let email = service::validate_email(email)?;
    service::validate_password(password)?;
    Ok(SignUpRequest {
        email,
        password: password.to_string(),
        display_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clubhouse_backend::MemoryBackend;

    const ALL_STEPS: [Step; 4] = [
        Step::AwaitingCode,
        Step::AwaitingDetails,
        Step::AwaitingOtp,
        Step::Completed,
    ];

    fn backend() -> MemoryBackend {
        let backend = MemoryBackend::new().with_fixed_otp("12345678");
        backend.add_invite("ABC123", false);
        backend.add_invite("USED01", true);
        backend
    }

    async fn at_otp_step(backend: &MemoryBackend) -> Enrollment {
        let mut wizard = Enrollment::new();
        wizard.verify_code(backend, "ABC123").await.unwrap();
        wizard
            .submit_details(backend, "Jane Doe", "jane@x.edu", "pw123456")
            .await
            .unwrap();
        wizard
    }

    #[test]
    fn failures_never_move_any_step() {
        for step in ALL_STEPS {
            assert_eq!(transition(step, &Event::Failed("boom".into())), step);
        }
    }

    #[test]
    fn events_only_apply_to_their_own_step() {
        assert_eq!(
            transition(Step::AwaitingCode, &Event::CodeAccepted),
            Step::AwaitingDetails
        );
        assert_eq!(
            transition(Step::AwaitingDetails, &Event::AccountCreated),
            Step::AwaitingOtp
        );
        assert_eq!(
            transition(Step::AwaitingOtp, &Event::OtpConfirmed),
            Step::Completed
        );
        assert_eq!(
            transition(Step::AwaitingCode, &Event::OtpConfirmed),
            Step::AwaitingCode
        );
        assert_eq!(
            transition(Step::Completed, &Event::CodeAccepted),
            Step::Completed
        );
    }

    #[tokio::test]
    async fn full_enrollment_consumes_the_invite() {
        let backend = backend();
        let mut wizard = Enrollment::new();

        assert_eq!(
            wizard.verify_code(&backend, "ABC123").await.unwrap(),
            Step::AwaitingDetails
        );
        assert_eq!(wizard.status(), STATUS_CODE_ACCEPTED);

        assert_eq!(
            wizard
                .submit_details(&backend, "Jane Doe", "jane@x.edu", "pw123456")
                .await
                .unwrap(),
            Step::AwaitingOtp
        );
        let signups = backend.signups();
        assert_eq!(signups.len(), 1);
        assert_eq!(signups[0].email, "jane@x.edu");
        assert_eq!(signups[0].password, "pw123456");
        assert_eq!(signups[0].display_name, "Jane Doe");

        let err = wizard.verify_otp(&backend, "00000000").await.unwrap_err();
        assert!(matches!(err, EnrollmentError::Remote { status: 403, .. }));
        assert_eq!(wizard.step(), Step::AwaitingOtp);
        assert!(!backend.invite("ABC123").unwrap().is_used);

        assert_eq!(
            wizard.verify_otp(&backend, "12345678").await.unwrap(),
            Step::Completed
        );
        let account = backend.account("jane@x.edu").unwrap();
        let invite = backend.invite("ABC123").unwrap();
        assert!(invite.is_used);
        assert_eq!(invite.assigned_to.as_deref(), Some(account.id.as_str()));

        let completion = wizard.completion().unwrap();
        assert_eq!(completion.user_id, account.id);
        assert!(completion.invite_consumed);
        assert_eq!(completion.redirect, Redirect::new("/", COMPLETION_REDIRECT_DELAY));
        assert_eq!(wizard.status(), STATUS_COMPLETE);
    }

    #[tokio::test]
    async fn used_code_fails_on_every_retry() {
        let backend = backend();
        let mut wizard = Enrollment::new();
        for _ in 0..3 {
            let err = wizard.verify_code(&backend, "USED01").await.unwrap_err();
            assert_eq!(err, EnrollmentError::InvalidCode);
            assert_eq!(wizard.step(), Step::AwaitingCode);
            assert_eq!(wizard.last_error(), Some("invalid or used code."));
        }
        assert!(backend.invite("USED01").unwrap().assigned_to.is_none());
    }

    #[tokio::test]
    async fn blank_code_is_rejected_without_a_remote_call() {
        let backend = backend();
        let mut wizard = Enrollment::new();
        let err = wizard.verify_code(&backend, "   ").await.unwrap_err();
        assert!(matches!(err, EnrollmentError::Validation(_)));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn lookup_transport_failure_keeps_step_and_message() {
        let backend = backend();
        backend.set_offline(true);
        let mut wizard = Enrollment::new();
        let err = wizard.verify_code(&backend, "ABC123").await.unwrap_err();
        assert!(matches!(err, EnrollmentError::Transport(_)));
        assert_eq!(err.status_code(), 502);
        assert_eq!(wizard.step(), Step::AwaitingCode);
        assert_eq!(wizard.status(), "backend unreachable: connection refused");

        backend.set_offline(false);
        assert_eq!(
            wizard.verify_code(&backend, "ABC123").await.unwrap(),
            Step::AwaitingDetails
        );
        assert_eq!(wizard.last_error(), None);
    }

    #[tokio::test]
    async fn missing_details_are_caught_before_signup() {
        let backend = backend();
        let mut wizard = Enrollment::new();
        wizard.verify_code(&backend, "ABC123").await.unwrap();
        let calls = backend.call_count();

        for (name, email, password) in [
            ("", "jane@x.edu", "pw123456"),
            ("Jane Doe", "", "pw123456"),
            ("Jane Doe", "jane@x.edu", ""),
        ] {
            let err = wizard
                .submit_details(&backend, name, email, password)
                .await
                .unwrap_err();
            assert!(matches!(err, EnrollmentError::Validation(_)));
            assert_eq!(wizard.step(), Step::AwaitingDetails);
        }
        assert_eq!(backend.call_count(), calls);
    }

    #[tokio::test]
    async fn rejected_signup_surfaces_backend_message() {
        let backend = backend();
        backend.add_member("jane@x.edu", "pw123456", None, false);
        let mut wizard = Enrollment::new();
        wizard.verify_code(&backend, "ABC123").await.unwrap();

        let err = wizard
            .submit_details(&backend, "Jane Doe", "jane@x.edu", "pw123456")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User already registered");
        assert_eq!(wizard.step(), Step::AwaitingDetails);
        assert_eq!(wizard.status(), "User already registered");
    }

    #[tokio::test]
    async fn actions_out_of_order_are_rejected() {
        let backend = backend();
        let mut wizard = Enrollment::new();
        let err = wizard.verify_otp(&backend, "12345678").await.unwrap_err();
        assert!(matches!(err, EnrollmentError::Validation(_)));
        assert_eq!(wizard.step(), Step::AwaitingCode);
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn finished_enrollment_ignores_late_actions() {
        let backend = backend();
        let mut wizard = at_otp_step(&backend).await;
        wizard.verify_otp(&backend, "12345678").await.unwrap();
        let calls = backend.call_count();

        let err = wizard.verify_code(&backend, "ABC123").await.unwrap_err();
        assert!(matches!(err, EnrollmentError::Validation(_)));
        assert_eq!(wizard.step(), Step::Completed);
        assert_eq!(wizard.status(), STATUS_COMPLETE);
        assert_eq!(wizard.last_error(), None);
        assert_eq!(wizard.to_response("w1").error, None);
        assert_eq!(backend.call_count(), calls);
    }

    #[tokio::test]
    async fn in_flight_status_is_published_before_each_call() {
        let backend = Arc::new(backend());
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut wizard = Enrollment::new();
        {
            let backend = backend.clone();
            let seen = seen.clone();
            wizard.on_status(move |status| {
                seen.lock()
                    .unwrap()
                    .push((status.to_string(), backend.call_count()));
            });
        }

        wizard.verify_code(backend.as_ref(), "ABC123").await.unwrap();
        wizard
            .submit_details(backend.as_ref(), "Jane Doe", "jane@x.edu", "pw123456")
            .await
            .unwrap();
        wizard.verify_otp(backend.as_ref(), "12345678").await.unwrap();

        let seen = seen.lock().unwrap().clone();
        let expected: [(&str, usize); 6] = [
            (STATUS_SCANNING, 0),
            (STATUS_CODE_ACCEPTED, 1),
            (STATUS_DISPATCHING, 1),
            (STATUS_OTP_SENT, 2),
            (STATUS_CONFIRMING, 2),
            (STATUS_COMPLETE, 4),
        ];
        assert_eq!(
            seen,
            expected
                .iter()
                .map(|(s, n)| (s.to_string(), *n))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn pending_status_per_step() {
        assert_eq!(pending_status(Step::AwaitingCode), Some(STATUS_SCANNING));
        assert_eq!(pending_status(Step::AwaitingDetails), Some(STATUS_DISPATCHING));
        assert_eq!(pending_status(Step::AwaitingOtp), Some(STATUS_CONFIRMING));
        assert_eq!(pending_status(Step::Completed), None);
    }

    #[tokio::test]
    async fn overlong_otp_is_rejected_locally() {
        let backend = backend();
        let mut wizard = at_otp_step(&backend).await;
        let calls = backend.call_count();
        let err = wizard.verify_otp(&backend, "123456789").await.unwrap_err();
        assert!(matches!(err, EnrollmentError::Validation(_)));
        assert_eq!(backend.call_count(), calls);
    }

    #[tokio::test]
    async fn failed_invite_update_is_flagged_not_hidden() {
        let backend = backend();
        let mut wizard = at_otp_step(&backend).await;
        backend.reject_invite_updates(true);

        assert_eq!(
            wizard.verify_otp(&backend, "12345678").await.unwrap(),
            Step::Completed
        );
        let completion = wizard.completion().unwrap();
        assert!(!completion.invite_consumed);
        assert!(wizard.status().contains("could not be marked used"));
        assert!(!backend.invite("ABC123").unwrap().is_used);

        let response = wizard.to_response("w1");
        assert_eq!(response.invite_consumed, Some(false));
    }

    #[tokio::test]
    async fn reset_clears_the_form() {
        let backend = backend();
        let mut wizard = at_otp_step(&backend).await;
        wizard.reset();
        assert_eq!(wizard.step(), Step::AwaitingCode);
        assert_eq!(wizard.invite_code(), "");
        assert_eq!(wizard.email(), "");
        assert_eq!(wizard.status(), "");
    }
}
