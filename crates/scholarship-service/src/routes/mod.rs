//! HTTP routes for the scholarship service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::errors::ScError;
use crate::handlers::{
    self, auth, files, interviews, notifications, periods, reports, scoring, students, users,
};
use crate::middleware::{http_metrics_middleware, require_auth};
use crate::services::{auth_service, FileStore};
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Request timeout applied to every route.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra bytes the upload route accepts beyond `max_upload_bytes`, so that
/// slightly oversized files reach the handler and get a descriptive 413.
const UPLOAD_BODY_SLACK: usize = 64 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: PgPool,

    /// Service configuration.
    pub config: Config,

    /// Object storage for uploaded documents.
    pub file_store: Arc<dyn FileStore>,

    /// Bcrypt hash at the configured cost, verified against for unknown emails.
    pub dummy_password_hash: String,
}

impl AppState {
    /// Build the shared state, hashing the login dummy password once.
    pub fn new(
        pool: PgPool,
        config: Config,
        file_store: Arc<dyn FileStore>,
    ) -> Result<Self, ScError> {
        let dummy_password_hash = auth_service::dummy_password_hash(config.bcrypt_cost)?;
        Ok(AppState {
            pool,
            config,
            file_store,
            dummy_password_hash,
        })
    }
}

/// Build the application routes.
///
/// - `/health`, `/ready`, `/metrics` - unversioned operational endpoints
/// - `/api/v1/auth/register`, `/api/v1/auth/login` - public
/// - everything else under `/api/v1` - requires a session
/// - TraceLayer, a 30 second timeout, and HTTP metrics on every route
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let upload_limit = state
        .config
        .max_upload_bytes
        .saturating_add(UPLOAD_BODY_SLACK);

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        // Session
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/me", get(auth::get_me))
        // Users
        .route("/api/v1/users", get(users::list_users).post(users::create_user))
        .route("/api/v1/users/:user_id", patch(users::update_user))
        // Periods
        .route(
            "/api/v1/periods",
            get(periods::list_periods).post(periods::create_period),
        )
        .route("/api/v1/periods/current", get(periods::current_period))
        .route("/api/v1/periods/:period_id", patch(periods::update_period))
        .route(
            "/api/v1/periods/:period_id/activate",
            post(periods::activate_period),
        )
        .route(
            "/api/v1/periods/:period_id/students",
            get(students::list_period_students),
        )
        .route(
            "/api/v1/periods/:period_id/students/:student_id/status",
            patch(students::update_status),
        )
        .route(
            "/api/v1/periods/:period_id/students/:student_id/scores",
            get(scoring::score_matrix).put(scoring::submit_scores),
        )
        .route(
            "/api/v1/periods/:period_id/questions",
            get(scoring::list_questions).post(scoring::create_question),
        )
        .route(
            "/api/v1/periods/:period_id/statistics",
            get(reports::period_statistics),
        )
        .route(
            "/api/v1/questions/:question_id",
            patch(scoring::update_question).delete(scoring::delete_question),
        )
        // Applicant self-service
        .route(
            "/api/v1/students/me",
            get(students::get_my_profile).put(students::upsert_my_profile),
        )
        .route(
            "/api/v1/students/me/registrations",
            post(students::register_for_current_period),
        )
        .route("/api/v1/students/me/status", get(students::my_status))
        .route("/api/v1/students/me/booking", get(interviews::my_booking))
        .route(
            "/api/v1/students/me/files",
            get(files::list_my_documents)
                .post(files::upload_document)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/v1/students/me/files/:file_id",
            delete(files::delete_my_document),
        )
        // Staff views of applicants
        .route("/api/v1/students/:student_id", get(students::student_detail))
        .route(
            "/api/v1/students/:student_id/files",
            get(files::list_student_documents),
        )
        .route(
            "/api/v1/files/:file_id/content",
            get(files::download_document),
        )
        // Interviews
        .route(
            "/api/v1/interviews",
            get(interviews::list_interviews).post(interviews::create_interview),
        )
        .route(
            "/api/v1/interviews/:interview_id",
            get(interviews::interview_detail).delete(interviews::delete_interview),
        )
        .route(
            "/api/v1/interviews/:interview_id/slots",
            post(interviews::append_slot),
        )
        .route(
            "/api/v1/interviews/:interview_id/slots/:number",
            delete(interviews::delete_slot),
        )
        .route(
            "/api/v1/interviews/:interview_id/slots/:number/booking",
            post(interviews::book_slot).delete(interviews::cancel_booking),
        )
        .route(
            "/api/v1/interviews/:interview_id/participants",
            post(interviews::add_participant),
        )
        .route(
            "/api/v1/interviews/:interview_id/participants/:user_id",
            delete(interviews::remove_participant),
        )
        .route(
            "/api/v1/interviews/:interview_id/notes/:student_id",
            get(interviews::list_notes).put(interviews::upsert_note),
        )
        // Notifications
        .route(
            "/api/v1/notifications",
            get(notifications::list_notifications),
        )
        .route(
            "/api/v1/notifications/:notification_id/read",
            post(notifications::mark_read),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer (innermost)
    // 2. TraceLayer
    // 3. http_metrics_middleware (outermost, sees framework rejections too)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(middleware::from_fn(http_metrics_middleware))
}
