//! Admin dashboard: members, projects, and the contact inbox.

use clubhouse_api::{DashboardResponse, DashboardStats, ServiceError};
use clubhouse_backend::Backend;

use crate::Session;

fn count(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

/// Everything the dashboard shows, in one pass.
pub async fn dashboard(
    backend: &dyn Backend,
    session: &Session,
) -> Result<DashboardResponse, ServiceError> {
    let session = session.require_admin()?;
    let token = session.access_token.as_str();

    let members = backend.list_profiles(token).await?;
    let projects = backend.list_projects(Some(token)).await?;
    let messages = backend.list_contact_messages(token).await?;

    let stats = DashboardStats {
        total_members: count(members.len()),
        total_projects: count(projects.len()),
        total_messages: count(messages.len()),
    };
    Ok(DashboardResponse {
        members,
        projects,
        messages,
        stats,
    })
}

/// Wipe a contact message from the inbox.
pub async fn delete_message(
    backend: &dyn Backend,
    session: &Session,
    id: &str,
) -> Result<(), ServiceError> {
    session.require_admin()?;
    backend
        .delete_contact_message(&session.access_token, id)
        .await?;
    tracing::info!(message_id = %id, admin = %session.user_id(), "contact message removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clubhouse_api::ContactRequest;
    use clubhouse_backend::MemoryBackend;

    async fn session_for(backend: &MemoryBackend, email: &str) -> Session {
        let auth = backend
            .sign_in_with_password(email, "pw123456")
            .await
            .unwrap();
        Session::resolve(backend, &auth.access_token).await.unwrap()
    }

    async fn leave_message(backend: &MemoryBackend, content: &str) {
        crate::contact::submit_contact(
            backend,
            &ContactRequest {
                name: "Visitor".into(),
                email: "visitor@x.edu".into(),
                content: content.into(),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn dashboard_counts_everything() {
        let backend = MemoryBackend::new();
        backend.add_member("admin@x.edu", "pw123456", None, true);
        backend.add_member("jane@x.edu", "pw123456", None, false);
        leave_message(&backend, "first").await;
        leave_message(&backend, "second").await;

        let admin = session_for(&backend, "admin@x.edu").await;
        let board = dashboard(&backend, &admin).await.unwrap();
        assert_eq!(
            board.stats,
            DashboardStats {
                total_members: 2,
                total_projects: 0,
                total_messages: 2,
            }
        );
        assert!(board.messages[0].created_at >= board.messages[1].created_at);
    }

    #[tokio::test]
    async fn members_are_kept_out() {
        let backend = MemoryBackend::new();
        backend.add_member("jane@x.edu", "pw123456", None, false);
        let jane = session_for(&backend, "jane@x.edu").await;

        let err = dashboard(&backend, &jane).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
        let err = delete_message(&backend, &jane, "any").await.unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn deleting_a_message_empties_the_inbox() {
        let backend = MemoryBackend::new();
        backend.add_member("admin@x.edu", "pw123456", None, true);
        leave_message(&backend, "hello").await;
        let admin = session_for(&backend, "admin@x.edu").await;

        let id = dashboard(&backend, &admin).await.unwrap().messages[0].id.clone();
        delete_message(&backend, &admin, &id).await.unwrap();
        assert_eq!(dashboard(&backend, &admin).await.unwrap().stats.total_messages, 0);
    }
}
