// Domain entities and kernel input boundary objects

use crate::core::errors::RegistrarError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The two flat roles the platform knows. Anything else is rejected at the
/// boundary rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Instructor,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Instructor => "Instructor",
            Role::Student => "Student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RegistrarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Instructor" => Ok(Role::Instructor),
            "Student" => Ok(Role::Student),
            other => Err(RegistrarError::Validation(format!(
                "unknown role '{}': expected Instructor or Student",
                other
            ))),
        }
    }
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Mint a fresh random identifier
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(UserId);
uuid_id!(CourseId);
uuid_id!(AssessmentId);
uuid_id!(ResultId);

/// Enrollment rows use a store-assigned monotone integer, not a uuid
pub type EnrollmentId = i64;

/// A platform user. The password hash never leaves the process: the field is
/// skipped on serialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub course_id: CourseId,
    pub title: String,
    pub description: String,
    pub media_url: String,
    pub instructor_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub assessment_id: AssessmentId,
    pub course_id: CourseId,
    pub title: String,
    /// Opaque question blob; the kernel never interprets it
    pub questions: String,
    pub max_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub result_id: ResultId,
    pub assessment_id: AssessmentId,
    pub user_id: UserId,
    pub score: u32,
    pub attempt_date: DateTime<Utc>,
}

// --- Input boundary objects ---
//
// Drafts intentionally omit server-assigned identifiers; the store generates
// the id at creation time and returns it. Updates carry the full replacement
// record (no partial patch semantics).

#[derive(Debug, Clone)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct CourseDraft {
    pub title: String,
    pub description: String,
    pub media_url: String,
    pub instructor_id: UserId,
}

#[derive(Debug, Clone)]
pub struct CourseUpdate {
    pub title: String,
    pub description: String,
    pub media_url: String,
    pub instructor_id: UserId,
}

#[derive(Debug, Clone)]
pub struct AssessmentDraft {
    pub course_id: CourseId,
    pub title: String,
    pub questions: String,
    pub max_score: u32,
}

#[derive(Debug, Clone)]
pub struct AssessmentUpdate {
    pub course_id: CourseId,
    pub title: String,
    pub questions: String,
    pub max_score: u32,
}

#[derive(Debug, Clone)]
pub struct EnrollmentDraft {
    pub user_id: UserId,
    pub course_id: CourseId,
}

#[derive(Debug, Clone)]
pub struct EnrollmentUpdate {
    pub user_id: UserId,
    pub course_id: CourseId,
}

#[derive(Debug, Clone)]
pub struct ResultDraft {
    pub assessment_id: AssessmentId,
    pub user_id: UserId,
    pub score: u32,
    pub attempt_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ResultUpdate {
    pub assessment_id: AssessmentId,
    pub user_id: UserId,
    pub score: u32,
    pub attempt_date: DateTime<Utc>,
}

/// Consistent point-in-time copy of every table, taken under one read lock.
/// The aggregation engine joins over this instead of issuing row-by-row
/// lookups that could interleave with a cascade.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub courses: Vec<Course>,
    pub assessments: Vec<Assessment>,
    pub enrollments: Vec<Enrollment>,
    pub results: Vec<AssessmentResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!("Instructor".parse::<Role>().unwrap(), Role::Instructor);
        assert_eq!("Student".parse::<Role>().unwrap(), Role::Student);
        assert_eq!(Role::Instructor.to_string(), "Instructor");
    }

    #[test]
    fn test_role_rejects_unknown_value() {
        let err = "Admin".parse::<Role>().unwrap_err();
        match err {
            RegistrarError::Validation(detail) => assert!(detail.contains("Admin")),
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(UserId::generate(), UserId::generate());
        assert_ne!(CourseId::generate(), CourseId::generate());
    }

    #[test]
    fn test_user_serialization_omits_password_hash() {
        let user = User {
            user_id: UserId::generate(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$2b$12$secret".to_string(),
            role: Role::Student,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("$2b$12$secret"));
    }
}
