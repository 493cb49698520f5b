// Axum web server layer

use axum::{
    error_handling::HandleErrorLayer, extract::Request, http::StatusCode, BoxError, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

pub mod handlers;
pub mod requests;
pub mod responses;

use crate::aggregate::AggregationEngine;
use crate::auth::credentials::CredentialStore;
use crate::auth::token::TokenIssuer;
use crate::core::errors::RegistrarError;
use crate::core::models::{
    Assessment, AssessmentDraft, AssessmentId, AssessmentResult, AssessmentUpdate, Course,
    CourseDraft, CourseId, CourseUpdate, Enrollment, EnrollmentDraft, EnrollmentId,
    EnrollmentUpdate, ResultDraft, ResultId, ResultUpdate, Snapshot, User, UserDraft, UserId,
    UserUpdate,
};

pub use crate::config::Config;

/// Application state containing all shared dependencies
///
/// All components are wrapped in Arc for shared ownership across async tasks.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RelationalStore + Send + Sync>,
    pub credentials: Arc<CredentialStore>,
    pub tokens: Arc<TokenIssuer>,
    pub aggregator: Arc<AggregationEngine>,
    pub config: Arc<Config>,
}

/// The single authoritative data store guarding the five entity tables
///
/// Every mutation is atomic with respect to concurrent mutations on the same
/// or related rows, including the course delete cascade. Invariant checks
/// (uniqueness, referential existence, score bounds) run inside the same
/// critical section as the write they guard: either the whole mutation
/// succeeds or none of it is persisted.
#[async_trait::async_trait]
pub trait RelationalStore: Send + Sync {
    // Users
    async fn create_user(&self, draft: UserDraft) -> Result<User, RegistrarError>;
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RegistrarError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RegistrarError>;
    async fn list_users(&self) -> Result<Vec<User>, RegistrarError>;
    async fn update_user(&self, id: UserId, update: UserUpdate) -> Result<User, RegistrarError>;
    async fn delete_user(&self, id: UserId) -> Result<(), RegistrarError>;

    // Courses
    async fn create_course(&self, draft: CourseDraft) -> Result<Course, RegistrarError>;
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, RegistrarError>;
    async fn list_courses(&self) -> Result<Vec<Course>, RegistrarError>;
    async fn update_course(
        &self,
        id: CourseId,
        update: CourseUpdate,
    ) -> Result<Course, RegistrarError>;
    /// Deletes the course together with its assessments, their results, and
    /// its enrollments, as one atomic unit
    async fn delete_course(&self, id: CourseId) -> Result<(), RegistrarError>;
    async fn set_course_media(
        &self,
        id: CourseId,
        media_url: &str,
    ) -> Result<Course, RegistrarError>;

    // Assessments
    async fn create_assessment(&self, draft: AssessmentDraft)
        -> Result<Assessment, RegistrarError>;
    async fn get_assessment(&self, id: AssessmentId) -> Result<Option<Assessment>, RegistrarError>;
    async fn list_assessments(&self) -> Result<Vec<Assessment>, RegistrarError>;
    async fn assessments_for_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<Assessment>, RegistrarError>;
    async fn update_assessment(
        &self,
        id: AssessmentId,
        update: AssessmentUpdate,
    ) -> Result<Assessment, RegistrarError>;
    async fn delete_assessment(&self, id: AssessmentId) -> Result<(), RegistrarError>;

    // Enrollments
    async fn create_enrollment(
        &self,
        draft: EnrollmentDraft,
    ) -> Result<Enrollment, RegistrarError>;
    async fn get_enrollment(&self, id: EnrollmentId)
        -> Result<Option<Enrollment>, RegistrarError>;
    async fn list_enrollments(&self) -> Result<Vec<Enrollment>, RegistrarError>;
    async fn update_enrollment(
        &self,
        id: EnrollmentId,
        update: EnrollmentUpdate,
    ) -> Result<Enrollment, RegistrarError>;
    async fn delete_enrollment(&self, id: EnrollmentId) -> Result<(), RegistrarError>;

    // Results
    async fn create_result(&self, draft: ResultDraft)
        -> Result<AssessmentResult, RegistrarError>;
    async fn get_result(&self, id: ResultId) -> Result<Option<AssessmentResult>, RegistrarError>;
    async fn list_results(&self) -> Result<Vec<AssessmentResult>, RegistrarError>;
    async fn update_result(
        &self,
        id: ResultId,
        update: ResultUpdate,
    ) -> Result<AssessmentResult, RegistrarError>;
    async fn delete_result(&self, id: ResultId) -> Result<(), RegistrarError>;

    /// Consistent point-in-time copy of all tables for read-only joins
    async fn snapshot(&self) -> Result<Snapshot, RegistrarError>;

    /// Liveness probe for the health endpoint
    async fn ping(&self) -> Result<(), RegistrarError>;
}

/// Create the Axum router with all routes and middleware
///
/// Middleware stack (outermost to innermost):
/// - Request timeout (tower::timeout) behind a HandleErrorLayer
/// - Body size limit (tower-http::limit)
/// - Request tracing (tower-http::trace)
/// - Auth middleware on every route except `/health` and `/v1/auth/*`
pub fn create_router(
    app_state: AppState,
    auth_state: Option<Arc<crate::auth::auth_middleware::AuthState>>,
) -> Router {
    use axum::routing::{get, post};
    use axum::{extract::State, middleware::Next};

    let mut router = Router::new()
        // Identity
        .route("/v1/auth/register", post(handlers::register_handler))
        .route("/v1/auth/login", post(handlers::login_handler))
        // Users
        .route(
            "/v1/users",
            get(handlers::list_users_handler).post(handlers::create_user_handler),
        )
        .route(
            "/v1/users/:id",
            get(handlers::get_user_handler)
                .put(handlers::update_user_handler)
                .delete(handlers::delete_user_handler),
        )
        // Courses
        .route(
            "/v1/courses",
            get(handlers::list_courses_handler).post(handlers::create_course_handler),
        )
        .route(
            "/v1/courses/:id",
            get(handlers::get_course_handler)
                .put(handlers::update_course_handler)
                .delete(handlers::delete_course_handler),
        )
        // Assessments
        .route(
            "/v1/assessments",
            get(handlers::list_assessments_handler).post(handlers::create_assessment_handler),
        )
        .route(
            "/v1/assessments/bycourse/:course_id",
            get(handlers::assessments_by_course_handler),
        )
        .route(
            "/v1/assessments/:id",
            get(handlers::get_assessment_handler)
                .put(handlers::update_assessment_handler)
                .delete(handlers::delete_assessment_handler),
        )
        // Enrollments
        .route(
            "/v1/enrollments",
            get(handlers::list_enrollments_handler).post(handlers::create_enrollment_handler),
        )
        .route(
            "/v1/enrollments/user/:user_id",
            get(handlers::enrolled_courses_handler),
        )
        .route(
            "/v1/enrollments/:id",
            get(handlers::get_enrollment_handler)
                .put(handlers::update_enrollment_handler)
                .delete(handlers::delete_enrollment_handler),
        )
        // Results and projections
        .route(
            "/v1/results",
            get(handlers::list_results_handler).post(handlers::create_result_handler),
        )
        .route(
            "/v1/results/user/:user_id",
            get(handlers::results_for_user_handler),
        )
        .route("/v1/results/filter", get(handlers::filtered_results_handler))
        .route(
            "/v1/results/detailed",
            get(handlers::detailed_results_handler),
        )
        .route(
            "/v1/results/:id",
            get(handlers::get_result_handler)
                .put(handlers::update_result_handler)
                .delete(handlers::delete_result_handler),
        )
        // Role probes
        .route(
            "/v1/roles/instructor",
            get(handlers::instructor_probe_handler),
        )
        .route("/v1/roles/student", get(handlers::student_probe_handler))
        // Media
        .route("/v1/media/save", post(handlers::save_media_handler))
        // Health
        .route("/health", get(handlers::health_handler));

    // Apply auth middleware to protected routes only
    if let Some(auth_state) = auth_state {
        router = router.route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            |state: State<Arc<crate::auth::auth_middleware::AuthState>>,
             request: Request,
             next: Next| async move {
                // Health and the credential endpoints are reachable without a token
                let path = request.uri().path();
                if path == "/health" || path.starts_with("/v1/auth/") {
                    return Ok(next.run(request).await);
                }

                crate::auth::auth_middleware::auth_middleware(state, request, next).await
            },
        ));
    }

    let body_limit = app_state.config.body_size_limit_bytes;
    let timeout_secs = app_state.config.request_timeout_secs;

    router = router
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(body_limit));

    // HandleErrorLayer must come BEFORE timeout to catch the timeout error
    let middleware_stack = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|e: BoxError| async move {
            let status = if e.is::<tower::timeout::error::Elapsed>() {
                StatusCode::REQUEST_TIMEOUT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string())
        }))
        .timeout(Duration::from_secs(timeout_secs))
        .into_inner();

    router.layer(middleware_stack).with_state(app_state)
}
