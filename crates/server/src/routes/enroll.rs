//! Enrollment wizard over HTTP.
//!
//! Each wizard lives in server memory under a random id. Step endpoints
//! always answer with the wizard snapshot; a failed step keeps the current
//! step and carries the error text, with the HTTP status of the failure.
//! A completed wizard is dropped from the store once its final snapshot
//! has been sent.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use clubhouse_api::{
    EnrollmentResponse, SubmitDetailsRequest, VerifyCodeRequest, VerifyOtpRequest,
};
use clubhouse_core::{Enrollment, EnrollmentError, Step};
use uuid::Uuid;

use crate::error::ApiErr;
use crate::state::{Enrollments, Entry, SharedBackend};

type Snapshot = (StatusCode, Json<EnrollmentResponse>);

fn find(enrollments: &Enrollments, id: &Uuid) -> Result<Entry, ApiErr> {
    enrollments
        .get(id)
        .ok_or_else(|| ApiErr::not_found("enrollment not found"))
}

/// Publish the wizard's snapshot and retire it once enrollment is done.
fn settle(
    enrollments: &Enrollments,
    id: &Uuid,
    entry: &Entry,
    wizard: &Enrollment,
    result: Result<Step, EnrollmentError>,
) -> Snapshot {
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_GATEWAY),
    };
    let snapshot = wizard.to_response(&id.to_string());
    entry.publish(snapshot.clone());
    if wizard.step() == Step::Completed {
        enrollments.remove(id);
        tracing::debug!(%id, open = enrollments.open_count(), "enrollment retired");
    }
    (status, Json(snapshot))
}

/// POST /api/enroll — open a fresh wizard.
pub async fn start(State(enrollments): State<Enrollments>) -> Snapshot {
    let (id, entry) = enrollments.start();
    tracing::debug!(%id, open = enrollments.open_count(), "enrollment started");
    (StatusCode::CREATED, Json(entry.current()))
}

/// GET /api/enroll/{id}
///
/// Reads the published snapshot, so it answers while a step is in flight.
pub async fn show(
    State(enrollments): State<Enrollments>,
    Path(id): Path<Uuid>,
) -> Result<Json<EnrollmentResponse>, ApiErr> {
    Ok(Json(find(&enrollments, &id)?.current()))
}

/// POST /api/enroll/{id}/code
pub async fn verify_code(
    State(backend): State<SharedBackend>,
    State(enrollments): State<Enrollments>,
    Path(id): Path<Uuid>,
    Json(req): Json<VerifyCodeRequest>,
) -> Result<Snapshot, ApiErr> {
    let entry = find(&enrollments, &id)?;
    let mut wizard = entry.wizard.lock().await;
    let result = wizard.verify_code(backend.as_ref(), &req.code).await;
    Ok(settle(&enrollments, &id, &entry, &wizard, result))
}

/// POST /api/enroll/{id}/details
pub async fn submit_details(
    State(backend): State<SharedBackend>,
    State(enrollments): State<Enrollments>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitDetailsRequest>,
) -> Result<Snapshot, ApiErr> {
    let entry = find(&enrollments, &id)?;
    let mut wizard = entry.wizard.lock().await;
    let result = wizard
        .submit_details(backend.as_ref(), &req.full_name, &req.email, &req.password)
        .await;
    Ok(settle(&enrollments, &id, &entry, &wizard, result))
}

/// POST /api/enroll/{id}/otp
pub async fn verify_otp(
    State(backend): State<SharedBackend>,
    State(enrollments): State<Enrollments>,
    Path(id): Path<Uuid>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Snapshot, ApiErr> {
    let entry = find(&enrollments, &id)?;
    let mut wizard = entry.wizard.lock().await;
    let result = wizard.verify_otp(backend.as_ref(), &req.token).await;
    Ok(settle(&enrollments, &id, &entry, &wizard, result))
}

/// DELETE /api/enroll/{id} — discard the form and start over at the code step.
pub async fn reset(
    State(enrollments): State<Enrollments>,
    Path(id): Path<Uuid>,
) -> Result<Json<EnrollmentResponse>, ApiErr> {
    let entry = find(&enrollments, &id)?;
    let mut wizard = entry.wizard.lock().await;
    wizard.reset();
    let snapshot = wizard.to_response(&id.to_string());
    entry.publish(snapshot.clone());
    Ok(Json(snapshot))
}
