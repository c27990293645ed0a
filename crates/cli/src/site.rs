use std::io::Write;

use anyhow::Result;
use clubhouse_api::ContactRequest;
use clubhouse_backend::Backend;
use clubhouse_core::{contact, showcase};

use crate::prompt::Prompt;

/// Send a message through the contact form.
pub async fn run_contact(
    backend: &dyn Backend,
    prompt: &mut dyn Prompt,
    out: &mut dyn Write,
) -> Result<()> {
    let req = ContactRequest {
        name: prompt.input("name")?,
        email: prompt.input("email")?,
        content: prompt.input("message")?,
    };
    contact::submit_contact(backend, &req).await?;
    writeln!(out, "{}", contact::STATUS_SENT)?;
    Ok(())
}

/// Print the project showcase, newest first.
pub async fn run_projects(backend: &dyn Backend, out: &mut dyn Write) -> Result<()> {
    let projects = showcase::list_projects(backend, None).await?;
    if projects.is_empty() {
        writeln!(out, "no projects yet.")?;
        return Ok(());
    }
    for project in projects {
        writeln!(
            out,
            "{}  {}  by {}",
            project.created_at.format("%Y-%m-%d"),
            project.title,
            project.author_name
        )?;
        writeln!(out, "    {}", project.description)?;
        if let Some(url) = project.github_url {
            writeln!(out, "    {url}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Scripted;
    use clubhouse_backend::MemoryBackend;

    #[tokio::test]
    async fn contact_reports_validation_errors() {
        let backend = MemoryBackend::new();
        let mut out = Vec::new();

        let err = run_contact(
            &backend,
            &mut Scripted::new(&["Sam", "not-an-email", "hi"]),
            &mut out,
        )
        .await
        .unwrap_err();
        assert_eq!(backend.call_count(), 0);
        assert!(!err.to_string().is_empty());

        run_contact(
            &backend,
            &mut Scripted::new(&["Sam", "sam@x.edu", "hi"]),
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "message transmitted.\n");
    }

    #[tokio::test]
    async fn empty_showcase() {
        let backend = MemoryBackend::new();
        let mut out = Vec::new();
        run_projects(&backend, &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "no projects yet.\n");
    }
}
