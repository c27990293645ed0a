//! Member sign-in, sign-out, and password recovery.

use std::time::Duration;

use clubhouse_api::{LoginRequest, LoginResponse, Redirect, ServiceError, StatusResponse, service};
use clubhouse_backend::Backend;

use crate::Session;

pub const LOGIN_REDIRECT_DELAY: Duration = Duration::from_millis(1500);
pub const RESET_REDIRECT_DELAY: Duration = Duration::from_secs(2);

/// Path of the page that receives recovery links.
pub const RESET_PASSWORD_PATH: &str = "/reset-password";

pub async fn login(backend: &dyn Backend, req: &LoginRequest) -> Result<LoginResponse, ServiceError> {
    let email = service::validate_email(&req.email)?;
    service::validate_password(&req.password)?;
    let session = backend
        .sign_in_with_password(&email, &req.password)
        .await?;
    tracing::info!(user_id = %session.user.id, "member signed in");
    Ok(LoginResponse {
        session,
        redirect: Redirect::new("/", LOGIN_REDIRECT_DELAY),
    })
}

/// Ask the backend to mail a recovery link that lands on `<site_url>/reset-password`.
pub async fn forgot_password(
    backend: &dyn Backend,
    email: &str,
    site_url: &str,
) -> Result<StatusResponse, ServiceError> {
    let email = service::validate_email(email)?;
    let redirect_to = format!("{}{RESET_PASSWORD_PATH}", site_url.trim_end_matches('/'));
    backend.send_password_recovery(&email, &redirect_to).await?;
    Ok(StatusResponse {
        status: "recovery link dispatched to email.".into(),
        redirect: None,
    })
}

/// Set a new password for the user owning `access_token` (usually the token
/// carried by a recovery link).
pub async fn reset_password(
    backend: &dyn Backend,
    access_token: &str,
    new_password: &str,
) -> Result<StatusResponse, ServiceError> {
    service::validate_password(new_password)?;
    let user = backend.update_password(access_token, new_password).await?;
    tracing::info!(user_id = %user.id, "password updated");
    Ok(StatusResponse {
        status: "password updated.".into(),
        redirect: Some(Redirect::new("/login", RESET_REDIRECT_DELAY)),
    })
}

pub async fn logout(backend: &dyn Backend, session: &Session) -> Result<(), ServiceError> {
    backend.sign_out(&session.access_token).await?;
    tracing::info!(user_id = %session.user_id(), "member signed out");
    Ok(())
}
