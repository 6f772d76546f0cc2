//! Route definitions for the feedback API
//!
//! This module configures all HTTP routes and maps them to their respective
//! handlers. It creates the Axum router with the application state.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::database::AppState;
use crate::handler::{
    delete_feedback, feedback_form, get_feedback, issue_csrf_token, list_feedback,
    submit_feedback, update_feedback,
};

use crate::middleware::admin_auth;
use axum::middleware;

/// Body limit for submissions. Raised above the upload size cap so an
/// oversized file reaches the attachment processor's own policy (swallowed
/// failure) instead of bouncing as `413` at the framework edge.
const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// - `GET /feedback/form` - Pre-filled submission form view (public)
/// - `GET /api/feedback/token` - CSRF token issuance (public)
/// - `POST /api/feedback` - Feedback submission (CSRF-checked in handler)
/// - `GET /api/admin/feedback` - Admin listing with status filter/pagination
/// - `GET /api/admin/feedback/{id}` - Admin detail
/// - `PATCH /api/admin/feedback/{id}` - Admin edit (status, comments)
/// - `DELETE /api/admin/feedback/{id}` - Admin delete (releases attachment)
///
/// # Arguments
///
/// * `state` - Application state containing the shared database, the
///   attachment store, and the CSRF token
pub fn create_app(state: AppState) -> Router {
    // Admin routes sit behind the authorization check
    let admin_routes = Router::new()
        .route("/feedback", get(list_feedback))
        .route(
            "/feedback/{id}",
            get(get_feedback).patch(update_feedback).delete(delete_feedback),
        )
        .layer(middleware::from_fn(admin_auth));

    Router::new()
        .route("/feedback/form", get(feedback_form))
        .route("/api/feedback", post(submit_feedback))
        .route("/api/feedback/token", get(issue_csrf_token))
        // Mount admin routes under /api/admin
        .nest("/api/admin", admin_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        // Inject the application state into all handlers
        .with_state(state)
}
