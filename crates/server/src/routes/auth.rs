use axum::{
    Json,
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, request::Parts},
};
use clubhouse_api::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, OkResponse, ResetPasswordRequest,
    SessionResponse, StatusResponse,
};
use clubhouse_core::{Session, auth};

use crate::error::ApiErr;
use crate::state::{AppConfig, SharedBackend};

// ---------------------------------------------------------------------------
// Session extractors
// ---------------------------------------------------------------------------

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Signed-in member, resolved from `Authorization: Bearer <access token>`.
pub struct MemberSession(pub Session);

impl<S> FromRequestParts<S> for MemberSession
where
    S: Send + Sync,
    SharedBackend: FromRef<S>,
{
    type Rejection = ApiErr;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let backend = SharedBackend::from_ref(state);
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiErr::unauthorized("missing or invalid Authorization header"))?;
        Ok(Self(Session::resolve(backend.as_ref(), token).await?))
    }
}

/// Like [`MemberSession`] but anonymous callers get `None`.
pub struct MaybeSession(pub Option<Session>);

impl<S> FromRequestParts<S> for MaybeSession
where
    S: Send + Sync,
    SharedBackend: FromRef<S>,
{
    type Rejection = ApiErr;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if bearer_token(&parts.headers).is_none() {
            return Ok(Self(None));
        }
        let MemberSession(session) = MemberSession::from_request_parts(parts, state).await?;
        Ok(Self(Some(session)))
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/auth/login
pub async fn login(
    State(backend): State<SharedBackend>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiErr> {
    Ok(Json(auth::login(backend.as_ref(), &req).await?))
}

/// POST /api/auth/logout
pub async fn logout(
    State(backend): State<SharedBackend>,
    MemberSession(session): MemberSession,
) -> Result<Json<OkResponse>, ApiErr> {
    auth::logout(backend.as_ref(), &session).await?;
    Ok(Json(OkResponse { ok: true }))
}

/// POST /api/auth/forgot-password
pub async fn forgot_password(
    State(backend): State<SharedBackend>,
    State(config): State<AppConfig>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<StatusResponse>, ApiErr> {
    Ok(Json(
        auth::forgot_password(backend.as_ref(), &req.email, &config.base_url).await?,
    ))
}

/// POST /api/auth/reset-password — bearer is the token from the recovery link.
pub async fn reset_password(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<StatusResponse>, ApiErr> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiErr::unauthorized("recovery link is missing or expired"))?;
    Ok(Json(
        auth::reset_password(backend.as_ref(), token, &req.new_password).await?,
    ))
}

/// GET /api/auth/me
pub async fn me(MemberSession(session): MemberSession) -> Json<SessionResponse> {
    Json(session.to_response())
}
