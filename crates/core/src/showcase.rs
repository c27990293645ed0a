//! Member project showcase.

use clubhouse_api::{CreateProjectRequest, NewProject, Project, ServiceError, service};
use clubhouse_backend::Backend;

use crate::Session;

/// Every project, newest first. Anyone may read the showcase.
pub async fn list_projects(
    backend: &dyn Backend,
    session: Option<&Session>,
) -> Result<Vec<Project>, ServiceError> {
    let token = session.map(|s| s.access_token.as_str());
    Ok(backend.list_projects(token).await?)
}

/// Publish a project under the signed-in member's name.
pub async fn publish_project(
    backend: &dyn Backend,
    session: &Session,
    req: &CreateProjectRequest,
) -> Result<Project, ServiceError> {
    let project = NewProject {
        title: service::require("title", &req.title)?,
        description: service::require("description", &req.description)?,
        github_url: service::validate_repo_url(req.github_url.as_deref())?,
        author_name: session.user.author_name().to_string(),
        user_id: session.user_id().to_string(),
    };
    let created = backend
        .insert_project(&session.access_token, &project)
        .await?;
    tracing::info!(project_id = %created.id, user_id = %created.user_id, "project published");
    Ok(created)
}

/// Remove a project. Admins only.
pub async fn delete_project(
    backend: &dyn Backend,
    session: &Session,
    id: &str,
) -> Result<(), ServiceError> {
    session.require_admin()?;
    backend.delete_project(&session.access_token, id).await?;
    tracing::info!(project_id = %id, admin = %session.user_id(), "project removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clubhouse_backend::MemoryBackend;

    async fn session_for(backend: &MemoryBackend, email: &str) -> Session {
        let auth = backend
            .sign_in_with_password(email, "pw123456")
            .await
            .unwrap();
        Session::resolve(backend, &auth.access_token).await.unwrap()
    }

    fn request(title: &str, github_url: Option<&str>) -> CreateProjectRequest {
        CreateProjectRequest {
            title: title.into(),
            description: "a line-following robot".into(),
            github_url: github_url.map(String::from),
        }
    }

    #[tokio::test]
    async fn author_falls_back_to_email() {
        let backend = MemoryBackend::new();
        backend.add_member("jane@x.edu", "pw123456", Some("Jane Doe"), false);
        backend.add_member("sam@x.edu", "pw123456", None, false);

        let jane = session_for(&backend, "jane@x.edu").await;
        let sam = session_for(&backend, "sam@x.edu").await;

        let named = publish_project(&backend, &jane, &request("Rover", None))
            .await
            .unwrap();
        assert_eq!(named.author_name, "Jane Doe");
        assert_eq!(named.user_id, jane.user.id);

        let unnamed = publish_project(
            &backend,
            &sam,
            &request("Drone", Some("https://github.com/sam/drone")),
        )
        .await
        .unwrap();
        assert_eq!(unnamed.author_name, "sam@x.edu");

        let listed = list_projects(&backend, None).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at >= listed[1].created_at);
    }

    #[tokio::test]
    async fn bad_repo_url_is_rejected() {
        let backend = MemoryBackend::new();
        backend.add_member("jane@x.edu", "pw123456", None, false);
        let jane = session_for(&backend, "jane@x.edu").await;

        let err = publish_project(&backend, &jane, &request("Rover", Some("ftp://x")))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn only_admins_delete() {
        let backend = MemoryBackend::new();
        backend.add_member("jane@x.edu", "pw123456", None, false);
        backend.add_member("admin@x.edu", "pw123456", None, true);
        let jane = session_for(&backend, "jane@x.edu").await;
        let admin = session_for(&backend, "admin@x.edu").await;

        let project = publish_project(&backend, &jane, &request("Rover", None))
            .await
            .unwrap();

        let err = delete_project(&backend, &jane, &project.id).await.unwrap_err();
        assert_eq!(err.status_code(), 403);

        delete_project(&backend, &admin, &project.id).await.unwrap();
        assert!(list_projects(&backend, None).await.unwrap().is_empty());
    }
}
