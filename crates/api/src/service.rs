//! Shared input validation — framework-agnostic pure functions.
//!
//! Both the server handlers and the CLI call these before any remote call is
//! made, so an empty field never costs a round trip to the backend.

use crate::ServiceError;

/// Longest one-time code the auth service sends.
pub const OTP_MAX_LEN: usize = 8;

/// Trim a required form field, rejecting blanks.
pub fn require(field: &str, value: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::BadRequest(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Validate and normalize an email address. Returns the lowercased, trimmed email.
pub fn validate_email(email: &str) -> Result<String, ServiceError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ServiceError::BadRequest("email is required".into()));
    }
    let valid = email.len() <= 254
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !valid {
        return Err(ServiceError::BadRequest("invalid email address".into()));
    }
    Ok(email)
}

/// Passwords are only checked for presence; strength rules belong to the auth service.
pub fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.is_empty() {
        return Err(ServiceError::BadRequest("password is required".into()));
    }
    Ok(())
}

/// Validate a one-time code: non-empty, alphanumeric, at most [`OTP_MAX_LEN`] characters.
pub fn validate_otp(token: &str) -> Result<String, ServiceError> {
    let token = require("token", token)?;
    if token.chars().count() > OTP_MAX_LEN {
        return Err(ServiceError::BadRequest(format!(
            "token must be at most {OTP_MAX_LEN} characters"
        )));
    }
    if !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ServiceError::BadRequest(
            "token must contain only letters and digits".into(),
        ));
    }
    Ok(token)
}

/// Optional repository link. Blank becomes `None`; anything else must be http(s).
pub fn validate_repo_url(url: Option<&str>) -> Result<Option<String>, ServiceError> {
    let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) else {
        return Ok(None);
    };
    let host = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match host {
        Some(rest) if !rest.is_empty() && !rest.contains(char::is_whitespace) => {
            Ok(Some(url.to_string()))
        }
        _ => Err(ServiceError::BadRequest(
            "repository url must be an http(s) link".into(),
        )),
    }
}
