//! Seed data for the in-memory backend.

use anyhow::bail;
use clubhouse_backend::MemoryBackend;

/// Comma-separated invite codes to create unused.
pub const DEV_INVITES_ENV: &str = "CLUBHOUSE_DEV_INVITES";
/// `email:password` of an admin account to create.
pub const DEV_ADMIN_ENV: &str = "CLUBHOUSE_DEV_ADMIN";

/// Load invites and an admin into a fresh memory backend.
pub fn seed(backend: &MemoryBackend, invites: Option<&str>, admin: Option<&str>) -> anyhow::Result<()> {
    if let Some(admin) = admin {
        let Some((email, password)) = admin.split_once(':') else {
            bail!("{DEV_ADMIN_ENV} must look like email:password");
        };
        let (email, password) = (email.trim(), password.trim());
        if email.is_empty() || password.is_empty() {
            bail!("{DEV_ADMIN_ENV} needs both an email and a password");
        }
        let account = backend.add_member(email, password, None, true);
        tracing::info!(email = %account.email, "dev admin seeded");
    }

    let codes: Vec<&str> = invites
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .collect();
    for code in &codes {
        backend.add_invite(code, false);
    }
    if !codes.is_empty() {
        tracing::info!(codes = %codes.join(","), "dev invite codes seeded");
    }
    Ok(())
}
