// Request handlers for all API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::aggregate::{DetailedResultRow, UserResultRow};
use crate::api::requests::{
    AssessmentCreateRequest, AssessmentUpdateRequest, CourseCreateRequest, CourseUpdateRequest,
    EnrollmentCreateRequest, EnrollmentUpdateRequest, LoginRequest, MediaSaveRequest,
    RegisterRequest, ResultCreateRequest, ResultFilterQuery, ResultUpdateRequest,
    UserCreateRequest, UserUpdateRequest,
};
use crate::api::responses::{ApiError, HealthResponse, ProbeResponse, TokenResponse};
use crate::api::AppState;
use crate::auth::credentials::Password;
use crate::auth::gate::{require_role, resolve_actor};
use crate::auth::token::Claims;
use crate::core::errors::RegistrarError;
use crate::core::models::{
    Assessment, AssessmentDraft, AssessmentId, AssessmentResult, AssessmentUpdate, Course,
    CourseDraft, CourseId, CourseUpdate, Enrollment, EnrollmentDraft, EnrollmentId,
    EnrollmentUpdate, ResultDraft, ResultId, ResultUpdate, Role, User, UserDraft, UserId,
    UserUpdate,
};

// --- Identity ---

/// POST /v1/auth/register - create an account and return a token
pub async fn register_handler(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    let password_hash = state.credentials.hash(&Password::new(&payload.password))?;

    let user = state
        .store
        .create_user(UserDraft {
            name: payload.name,
            email: payload.email,
            password_hash,
            role: payload.role,
        })
        .await?;

    tracing::info!(user_id = %user.user_id, role = %user.role, "User registered");

    let token = state.tokens.issue(&user)?;
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

/// POST /v1/auth/login - verify credentials and return a token
///
/// Unknown email and wrong password both collapse into the same uniform
/// Unauthorized response.
pub async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .store
        .find_user_by_email(&payload.email)
        .await?
        .ok_or(RegistrarError::Unauthorized)?;

    let password = Password::new(&payload.password);
    if !state.credentials.verify(&password, &user.password_hash) {
        tracing::warn!(email = %payload.email, "Login rejected");
        return Err(ApiError::from(RegistrarError::Unauthorized));
    }

    let token = state.tokens.issue(&user)?;
    Ok(Json(TokenResponse { token }))
}

// --- Users ---

pub async fn list_users_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.store.list_users().await?))
}

pub async fn create_user_handler(
    State(state): State<AppState>,
    Json(payload): Json<UserCreateRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let password_hash = state.credentials.hash(&Password::new(&payload.password))?;

    let user = state
        .store
        .create_user(UserDraft {
            name: payload.name,
            email: payload.email,
            password_hash,
            role: payload.role,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .store
        .get_user(id)
        .await?
        .ok_or(RegistrarError::NotFound)?;
    Ok(Json(user))
}

pub async fn update_user_handler(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(payload): Json<UserUpdateRequest>,
) -> Result<Json<User>, ApiError> {
    let password_hash = state.credentials.hash(&Password::new(&payload.password))?;

    let user = state
        .store
        .update_user(
            id,
            UserUpdate {
                name: payload.name,
                email: payload.email,
                password_hash,
                role: payload.role,
            },
        )
        .await?;
    Ok(Json(user))
}

pub async fn delete_user_handler(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Courses ---

pub async fn list_courses_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Course>>, ApiError> {
    Ok(Json(state.store.list_courses().await?))
}

/// POST /v1/courses - instructor only
///
/// Ownership comes from the validated claims, never from the payload: the
/// created course always belongs to the caller.
pub async fn create_course_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CourseCreateRequest>,
) -> Result<(StatusCode, Json<Course>), ApiError> {
    let actor = resolve_actor(state.store.as_ref(), &claims, Role::Instructor).await?;

    let course = state
        .store
        .create_course(CourseDraft {
            title: payload.title,
            description: payload.description,
            media_url: payload.media_url,
            instructor_id: actor.user_id,
        })
        .await?;

    tracing::info!(course_id = %course.course_id, instructor_id = %actor.user_id, "Course created");
    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn get_course_handler(
    State(state): State<AppState>,
    Path(id): Path<CourseId>,
) -> Result<Json<Course>, ApiError> {
    let course = state
        .store
        .get_course(id)
        .await?
        .ok_or(RegistrarError::NotFound)?;
    Ok(Json(course))
}

pub async fn update_course_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<CourseId>,
    Json(payload): Json<CourseUpdateRequest>,
) -> Result<Json<Course>, ApiError> {
    require_role(&claims, Role::Instructor)?;

    let course = state
        .store
        .update_course(
            id,
            CourseUpdate {
                title: payload.title,
                description: payload.description,
                media_url: payload.media_url,
                instructor_id: payload.instructor_id,
            },
        )
        .await?;
    Ok(Json(course))
}

/// DELETE /v1/courses/:id - instructor only
///
/// Removes the course, its assessments, those assessments' results, and its
/// enrollments as one atomic unit.
pub async fn delete_course_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<CourseId>,
) -> Result<StatusCode, ApiError> {
    require_role(&claims, Role::Instructor)?;

    state.store.delete_course(id).await?;
    tracing::info!(course_id = %id, "Course deleted with cascade");
    Ok(StatusCode::NO_CONTENT)
}

// --- Assessments ---

pub async fn list_assessments_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Assessment>>, ApiError> {
    Ok(Json(state.store.list_assessments().await?))
}

pub async fn create_assessment_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AssessmentCreateRequest>,
) -> Result<(StatusCode, Json<Assessment>), ApiError> {
    require_role(&claims, Role::Instructor)?;

    let assessment = state
        .store
        .create_assessment(AssessmentDraft {
            course_id: payload.course_id,
            title: payload.title,
            questions: payload.questions,
            max_score: payload.max_score,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(assessment)))
}

pub async fn assessments_by_course_handler(
    State(state): State<AppState>,
    Path(course_id): Path<CourseId>,
) -> Result<Json<Vec<Assessment>>, ApiError> {
    Ok(Json(state.store.assessments_for_course(course_id).await?))
}

pub async fn get_assessment_handler(
    State(state): State<AppState>,
    Path(id): Path<AssessmentId>,
) -> Result<Json<Assessment>, ApiError> {
    let assessment = state
        .store
        .get_assessment(id)
        .await?
        .ok_or(RegistrarError::NotFound)?;
    Ok(Json(assessment))
}

pub async fn update_assessment_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<AssessmentId>,
    Json(payload): Json<AssessmentUpdateRequest>,
) -> Result<Json<Assessment>, ApiError> {
    require_role(&claims, Role::Instructor)?;

    let assessment = state
        .store
        .update_assessment(
            id,
            AssessmentUpdate {
                course_id: payload.course_id,
                title: payload.title,
                questions: payload.questions,
                max_score: payload.max_score,
            },
        )
        .await?;
    Ok(Json(assessment))
}

pub async fn delete_assessment_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<AssessmentId>,
) -> Result<StatusCode, ApiError> {
    require_role(&claims, Role::Instructor)?;

    state.store.delete_assessment(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Enrollments ---

pub async fn list_enrollments_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Enrollment>>, ApiError> {
    Ok(Json(state.store.list_enrollments().await?))
}

pub async fn create_enrollment_handler(
    State(state): State<AppState>,
    Json(payload): Json<EnrollmentCreateRequest>,
) -> Result<(StatusCode, Json<Enrollment>), ApiError> {
    let enrollment = state
        .store
        .create_enrollment(EnrollmentDraft {
            user_id: payload.user_id,
            course_id: payload.course_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// GET /v1/enrollments/user/:user_id - courses the user is enrolled in
pub async fn enrolled_courses_handler(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<Course>>, ApiError> {
    Ok(Json(state.aggregator.enrolled_courses(user_id).await?))
}

pub async fn get_enrollment_handler(
    State(state): State<AppState>,
    Path(id): Path<EnrollmentId>,
) -> Result<Json<Enrollment>, ApiError> {
    let enrollment = state
        .store
        .get_enrollment(id)
        .await?
        .ok_or(RegistrarError::NotFound)?;
    Ok(Json(enrollment))
}

pub async fn update_enrollment_handler(
    State(state): State<AppState>,
    Path(id): Path<EnrollmentId>,
    Json(payload): Json<EnrollmentUpdateRequest>,
) -> Result<Json<Enrollment>, ApiError> {
    let enrollment = state
        .store
        .update_enrollment(
            id,
            EnrollmentUpdate {
                user_id: payload.user_id,
                course_id: payload.course_id,
            },
        )
        .await?;
    Ok(Json(enrollment))
}

pub async fn delete_enrollment_handler(
    State(state): State<AppState>,
    Path(id): Path<EnrollmentId>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_enrollment(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Results and projections ---

pub async fn list_results_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<AssessmentResult>>, ApiError> {
    Ok(Json(state.store.list_results().await?))
}

pub async fn create_result_handler(
    State(state): State<AppState>,
    Json(payload): Json<ResultCreateRequest>,
) -> Result<(StatusCode, Json<AssessmentResult>), ApiError> {
    let result = state
        .store
        .create_result(ResultDraft {
            assessment_id: payload.assessment_id,
            user_id: payload.user_id,
            score: payload.score,
            attempt_date: payload.attempt_date,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /v1/results/user/:user_id - the user's results joined with assessment
/// and course titles
pub async fn results_for_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<UserResultRow>>, ApiError> {
    Ok(Json(state.aggregator.results_for_user(user_id).await?))
}

/// GET /v1/results/filter?user_id=&course_id= - AND-combined optional filters
pub async fn filtered_results_handler(
    State(state): State<AppState>,
    Query(query): Query<ResultFilterQuery>,
) -> Result<Json<Vec<DetailedResultRow>>, ApiError> {
    Ok(Json(
        state
            .aggregator
            .filtered_results(query.user_id, query.course_id)
            .await?,
    ))
}

/// GET /v1/results/detailed - every result with full user and course context
pub async fn detailed_results_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<DetailedResultRow>>, ApiError> {
    Ok(Json(state.aggregator.detailed_results().await?))
}

pub async fn get_result_handler(
    State(state): State<AppState>,
    Path(id): Path<ResultId>,
) -> Result<Json<AssessmentResult>, ApiError> {
    let result = state
        .store
        .get_result(id)
        .await?
        .ok_or(RegistrarError::NotFound)?;
    Ok(Json(result))
}

pub async fn update_result_handler(
    State(state): State<AppState>,
    Path(id): Path<ResultId>,
    Json(payload): Json<ResultUpdateRequest>,
) -> Result<Json<AssessmentResult>, ApiError> {
    let result = state
        .store
        .update_result(
            id,
            ResultUpdate {
                assessment_id: payload.assessment_id,
                user_id: payload.user_id,
                score: payload.score,
                attempt_date: payload.attempt_date,
            },
        )
        .await?;
    Ok(Json(result))
}

pub async fn delete_result_handler(
    State(state): State<AppState>,
    Path(id): Path<ResultId>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_result(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Role probes ---

pub async fn instructor_probe_handler(
    Extension(claims): Extension<Claims>,
) -> Result<Json<ProbeResponse>, ApiError> {
    require_role(&claims, Role::Instructor)?;
    Ok(Json(ProbeResponse {
        message: "Instructor access confirmed".to_string(),
    }))
}

pub async fn student_probe_handler(
    Extension(claims): Extension<Claims>,
) -> Result<Json<ProbeResponse>, ApiError> {
    require_role(&claims, Role::Student)?;
    Ok(Json(ProbeResponse {
        message: "Student access confirmed".to_string(),
    }))
}

// --- Media ---

/// POST /v1/media/save - instructor only; attaches a media url to a course
pub async fn save_media_handler(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<MediaSaveRequest>,
) -> Result<Json<Course>, ApiError> {
    require_role(&claims, Role::Instructor)?;

    let course = state
        .store
        .set_course_media(payload.course_id, &payload.media_url)
        .await?;
    Ok(Json(course))
}

// --- Health ---

/// GET /health - liveness probe, reachable without a token
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, ApiError> {
    let store_status = match state.store.ping().await {
        Ok(()) => "ok",
        Err(_) => "unavailable",
    };

    Ok(Json(HealthResponse {
        status: if store_status == "ok" {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        store: store_status.to_string(),
    }))
}
