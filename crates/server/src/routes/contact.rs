use axum::{Json, extract::State, http::StatusCode};
use clubhouse_api::{ContactRequest, StatusResponse};
use clubhouse_core::contact;

use crate::error::ApiErr;
use crate::state::SharedBackend;

/// POST /api/contact — store a message from the public contact form.
pub async fn submit(
    State(backend): State<SharedBackend>,
    Json(req): Json<ContactRequest>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiErr> {
    contact::submit_contact(backend.as_ref(), &req).await?;
    Ok((
        StatusCode::CREATED,
        Json(StatusResponse {
            status: contact::STATUS_SENT.to_string(),
            redirect: None,
        }),
    ))
}
