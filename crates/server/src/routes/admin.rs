use axum::{
    Json,
    extract::{Path, State},
};
use clubhouse_api::{DashboardResponse, OkResponse};
use clubhouse_core::{admin, showcase};

use super::auth::MemberSession;
use crate::error::ApiErr;
use crate::state::SharedBackend;

/// GET /api/admin/dashboard — members, projects, inbox and counts.
pub async fn dashboard(
    State(backend): State<SharedBackend>,
    MemberSession(session): MemberSession,
) -> Result<Json<DashboardResponse>, ApiErr> {
    Ok(Json(admin::dashboard(backend.as_ref(), &session).await?))
}

/// DELETE /api/admin/projects/{id}
pub async fn delete_project(
    State(backend): State<SharedBackend>,
    MemberSession(session): MemberSession,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    showcase::delete_project(backend.as_ref(), &session, &id).await?;
    Ok(Json(OkResponse { ok: true }))
}

/// DELETE /api/admin/messages/{id}
pub async fn delete_message(
    State(backend): State<SharedBackend>,
    MemberSession(session): MemberSession,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    admin::delete_message(backend.as_ref(), &session, &id).await?;
    Ok(Json(OkResponse { ok: true }))
}
