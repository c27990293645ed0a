//! Interactive enrollment: invite code, account details, then the mailed OTP.

use std::io::Write;

use anyhow::Result;
use clubhouse_backend::Backend;
use clubhouse_core::enrollment::{Completion, pending_status};
use clubhouse_core::{Enrollment, Step};

use crate::prompt::Prompt;

/// Print what the next backend call is doing before it starts.
fn announce(wizard: &Enrollment, out: &mut dyn Write) -> std::io::Result<()> {
    match pending_status(wizard.step()) {
        Some(status) => writeln!(out, "{status}"),
        None => Ok(()),
    }
}

/// Drive the wizard until it completes. Failed steps are reported and asked again.
pub async fn run_join(
    backend: &dyn Backend,
    prompt: &mut dyn Prompt,
    out: &mut dyn Write,
) -> Result<Completion> {
    let mut wizard = Enrollment::new();
    writeln!(out, "clubhouse enrollment. invitation required.")?;

    loop {
        let result = match wizard.step() {
            Step::AwaitingCode => {
                let code = prompt.input("clearance code")?;
                announce(&wizard, out)?;
                wizard.verify_code(backend, &code).await
            }
            Step::AwaitingDetails => {
                let full_name = prompt.input("full name")?;
                let email = prompt.input("email")?;
                let password = prompt.secret("password")?;
                announce(&wizard, out)?;
                wizard
                    .submit_details(backend, &full_name, &email, &password)
                    .await
            }
            Step::AwaitingOtp => {
                writeln!(out, "check {} for the security OTP.", wizard.email())?;
                let token = prompt.input("OTP")?;
                announce(&wizard, out)?;
                wizard.verify_otp(backend, &token).await
            }
            Step::Completed => break,
        };

        match result {
            Ok(_) => writeln!(out, "{}", wizard.status())?,
            Err(e) => writeln!(out, "error: {e}")?,
        }
    }

    match wizard.completion() {
        Some(done) => Ok(done.clone()),
        None => anyhow::bail!("enrollment finished without a completion record"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Scripted;
    use clubhouse_backend::MemoryBackend;

    #[tokio::test]
    async fn retries_until_complete() {
        let backend = MemoryBackend::new().with_fixed_otp("12345678");
        backend.add_invite("USED01", true);
        backend.add_invite("ABC123", false);
        let mut prompt = Scripted::new(&[
            "USED01",
            "ABC123",
            "Jane Doe",
            "jane@x.edu",
            "pw123456",
            "00000000",
            "12345678",
        ]);
        let mut out = Vec::new();

        let done = run_join(&backend, &mut prompt, &mut out).await.unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(done.invite_consumed);
        assert_eq!(done.redirect.to, "/");
        assert!(out.starts_with(
            "clubhouse enrollment. invitation required.\nscanning clearance code…\nerror: invalid or used code.\n"
        ));
        assert!(out.contains("dispatching security OTP…\nOTP dispatched.\n"));
        assert!(out.contains("confirming OTP…\nenrollment complete.\n"));
        assert!(out.contains("error: Token has expired or is invalid"));
        assert!(out.ends_with("enrollment complete.\n"));
        assert!(backend.invite("ABC123").unwrap().is_used);
    }

    #[tokio::test]
    async fn gives_up_when_input_ends() {
        let backend = MemoryBackend::new();
        let mut prompt = Scripted::new(&["NOPE"]);
        let mut out = Vec::new();

        let err = run_join(&backend, &mut prompt, &mut out).await.unwrap_err();
        assert!(err.to_string().contains("clearance code"));
    }
}
