use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use clubhouse_api::{CreateProjectRequest, OkResponse, Project, ProjectListResponse};
use clubhouse_core::showcase;

use super::auth::{MaybeSession, MemberSession};
use crate::error::ApiErr;
use crate::state::SharedBackend;

/// GET /api/projects — the showcase, newest first.
pub async fn list(
    State(backend): State<SharedBackend>,
    MaybeSession(session): MaybeSession,
) -> Result<Json<ProjectListResponse>, ApiErr> {
    let projects = showcase::list_projects(backend.as_ref(), session.as_ref()).await?;
    Ok(Json(ProjectListResponse { projects }))
}

/// POST /api/projects — publish under the caller's name.
pub async fn create(
    State(backend): State<SharedBackend>,
    MemberSession(session): MemberSession,
    Json(req): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), ApiErr> {
    let project = showcase::publish_project(backend.as_ref(), &session, &req).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// DELETE /api/projects/{id} — admins only.
pub async fn delete(
    State(backend): State<SharedBackend>,
    MemberSession(session): MemberSession,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    showcase::delete_project(backend.as_ref(), &session, &id).await?;
    Ok(Json(OkResponse { ok: true }))
}
