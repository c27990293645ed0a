use std::io::Write;

use anyhow::{Result, bail};
use clubhouse_api::LoginRequest;
use clubhouse_backend::Backend;
use clubhouse_core::{Session, auth};

use crate::prompt::Prompt;

/// Check credentials and print who they belong to.
///
/// The CLI keeps no session between runs, so the token is signed out again
/// before returning.
pub async fn run_login(
    backend: &dyn Backend,
    email: Option<String>,
    prompt: &mut dyn Prompt,
    out: &mut dyn Write,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt.input("email")?,
    };
    let password = prompt.secret("password")?;
    let resp = auth::login(backend, &LoginRequest { email, password }).await?;
    let session = Session::resolve(backend, &resp.session.access_token).await?;

    writeln!(out, "access granted. welcome, {}.", session.user.author_name())?;
    if session.is_admin {
        writeln!(out, "admin dashboard unlocked.")?;
    }
    auth::logout(backend, &session).await?;
    writeln!(out, "credentials verified; no session is kept.")?;
    Ok(())
}

/// Mail a recovery link for `email`.
pub async fn run_forgot_password(
    backend: &dyn Backend,
    site_url: &str,
    email: Option<String>,
    prompt: &mut dyn Prompt,
    out: &mut dyn Write,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt.input("email")?,
    };
    let resp = auth::forgot_password(backend, &email, site_url).await?;
    writeln!(out, "{}", resp.status)?;
    Ok(())
}

/// Set a new password using the token from a recovery link.
pub async fn run_reset_password(
    backend: &dyn Backend,
    token: &str,
    prompt: &mut dyn Prompt,
    out: &mut dyn Write,
) -> Result<()> {
    let password = prompt.secret("new password")?;
    let confirm = prompt.secret("confirm password")?;
    if password != confirm {
        bail!("passwords do not match");
    }
    let resp = auth::reset_password(backend, token, &password).await?;
    writeln!(out, "{}", resp.status)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Scripted;
    use clubhouse_backend::MemoryBackend;

    #[tokio::test]
    async fn login_greets_by_display_name() {
        let backend = MemoryBackend::new();
        backend.add_member("jane@x.edu", "pw123456", Some("Jane Doe"), true);
        let mut out = Vec::new();

        run_login(
            &backend,
            Some("jane@x.edu".into()),
            &mut Scripted::new(&["pw123456"]),
            &mut out,
        )
        .await
        .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("access granted. welcome, Jane Doe."));
        assert!(out.contains("admin dashboard unlocked."));
        assert!(out.ends_with("credentials verified; no session is kept.\n"));
    }

    #[tokio::test]
    async fn login_leaves_no_live_token() {
        let backend = MemoryBackend::new();
        backend.add_member("jane@x.edu", "pw123456", None, false);
        let before = backend
            .sign_in_with_password("jane@x.edu", "pw123456")
            .await
            .unwrap();

        run_login(
            &backend,
            Some("jane@x.edu".into()),
            &mut Scripted::new(&["pw123456"]),
            &mut Vec::new(),
        )
        .await
        .unwrap();

        assert_eq!(backend.live_sessions(), 1);
        assert!(backend.get_user(&before.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn recovery_then_reset() {
        let backend = MemoryBackend::new();
        backend.add_member("jane@x.edu", "pw123456", None, false);
        let mut out = Vec::new();

        run_forgot_password(
            &backend,
            "https://club.example",
            None,
            &mut Scripted::new(&["jane@x.edu"]),
            &mut out,
        )
        .await
        .unwrap();
        let token = backend.last_recovery_token("jane@x.edu").unwrap();

        let err = run_reset_password(
            &backend,
            &token,
            &mut Scripted::new(&["new-secret", "typo"]),
            &mut out,
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "passwords do not match");

        run_reset_password(
            &backend,
            &token,
            &mut Scripted::new(&["new-secret", "new-secret"]),
            &mut out,
        )
        .await
        .unwrap();
        assert!(
            backend
                .sign_in_with_password("jane@x.edu", "new-secret")
                .await
                .is_ok()
        );
    }
}
