// Request payload types for API endpoints
//
// Create payloads intentionally omit server-assigned identifiers; update
// payloads carry the full replacement record. Plaintext passwords arrive
// here and are hashed before anything touches the store.

use crate::core::models::{AssessmentId, CourseId, Role, UserId};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UserCreateRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct UserUpdateRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct CourseCreateRequest {
    pub title: String,
    pub description: String,
    pub media_url: String,
    // No instructor_id: ownership comes from the authenticated claims
}

#[derive(Debug, Deserialize)]
pub struct CourseUpdateRequest {
    pub title: String,
    pub description: String,
    pub media_url: String,
    pub instructor_id: UserId,
}

#[derive(Debug, Deserialize)]
pub struct AssessmentCreateRequest {
    pub course_id: CourseId,
    pub title: String,
    pub questions: String,
    pub max_score: u32,
}

#[derive(Debug, Deserialize)]
pub struct AssessmentUpdateRequest {
    pub course_id: CourseId,
    pub title: String,
    pub questions: String,
    pub max_score: u32,
}

#[derive(Debug, Deserialize)]
pub struct EnrollmentCreateRequest {
    pub user_id: UserId,
    pub course_id: CourseId,
}

#[derive(Debug, Deserialize)]
pub struct EnrollmentUpdateRequest {
    pub user_id: UserId,
    pub course_id: CourseId,
}

#[derive(Debug, Deserialize)]
pub struct ResultCreateRequest {
    pub assessment_id: AssessmentId,
    pub user_id: UserId,
    pub score: u32,
    pub attempt_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ResultUpdateRequest {
    pub assessment_id: AssessmentId,
    pub user_id: UserId,
    pub score: u32,
    pub attempt_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct MediaSaveRequest {
    pub course_id: CourseId,
    pub media_url: String,
}

/// Query parameters for the filtered results projection; both filters are
/// independently optional and AND-combined
#[derive(Debug, Default, Deserialize)]
pub struct ResultFilterQuery {
    pub user_id: Option<UserId>,
    pub course_id: Option<CourseId>,
}
