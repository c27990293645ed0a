pub mod admin;
pub mod auth;
pub mod contact;
pub mod enroll;
pub mod health;
pub mod projects;

use std::path::Path;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// JSON API, mounted under `/api`.
pub fn api() -> Router<AppState> {
    Router::new()
        // Health
        .route("/health", get(health::health))
        // Contact
        .route("/contact", post(contact::submit))
        // Showcase
        .route("/projects", get(projects::list).post(projects::create))
        .route("/projects/{id}", delete(projects::delete))
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/me", get(auth::me))
        // Enrollment wizard
        .route("/enroll", post(enroll::start))
        .route("/enroll/{id}", get(enroll::show).delete(enroll::reset))
        .route("/enroll/{id}/code", post(enroll::verify_code))
        .route("/enroll/{id}/details", post(enroll::submit_details))
        .route("/enroll/{id}/otp", post(enroll::verify_otp))
        // Admin
        .route("/admin/dashboard", get(admin::dashboard))
        .route("/admin/projects/{id}", delete(admin::delete_project))
        .route("/admin/messages/{id}", delete(admin::delete_message))
}

/// Full application: API plus the static site when `web_dir` exists.
pub fn app(state: AppState, web_dir: Option<&Path>) -> Router {
    let mut app = Router::new().nest("/api", api());

    if let Some(web_dir) = web_dir.filter(|dir| dir.exists()) {
        tracing::info!("serving static files from {}", web_dir.display());
        let index_html = web_dir.join("index.html");
        app = app.fallback_service(ServeDir::new(web_dir).fallback(ServeFile::new(index_html)));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
