//! In-process relational store
//!
//! The five entity tables live behind a single `tokio::sync::RwLock`. Every
//! mutating operation takes the write lock, runs its invariant checks, and
//! applies the whole mutation inside that one critical section: a concurrent
//! reader observes either the pre- or post-state, never a half-applied
//! cascade, and two racing mutations on the same rows serialize so exactly
//! one of them can win a uniqueness check.

use crate::api::RelationalStore;
use crate::core::errors::RegistrarError;
use crate::core::models::{
    Assessment, AssessmentDraft, AssessmentId, AssessmentResult, AssessmentUpdate, Course,
    CourseDraft, CourseId, CourseUpdate, Enrollment, EnrollmentDraft, EnrollmentId,
    EnrollmentUpdate, ResultDraft, ResultId, ResultUpdate, Snapshot, User, UserDraft, UserId,
    UserUpdate,
};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, User>,
    courses: HashMap<CourseId, Course>,
    assessments: HashMap<AssessmentId, Assessment>,
    enrollments: BTreeMap<EnrollmentId, Enrollment>,
    results: HashMap<ResultId, AssessmentResult>,
    next_enrollment_id: EnrollmentId,
}

impl Tables {
    fn email_taken(&self, email: &str, exclude: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.user_id) != exclude)
    }

    fn require_user(&self, id: UserId) -> Result<(), RegistrarError> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(RegistrarError::Validation(format!("unknown user id {}", id)))
        }
    }

    fn require_course(&self, id: CourseId) -> Result<(), RegistrarError> {
        if self.courses.contains_key(&id) {
            Ok(())
        } else {
            Err(RegistrarError::Validation(format!(
                "unknown course id {}",
                id
            )))
        }
    }

    fn enrollment_pair_taken(
        &self,
        user_id: UserId,
        course_id: CourseId,
        exclude: Option<EnrollmentId>,
    ) -> bool {
        self.enrollments
            .values()
            .any(|e| e.user_id == user_id && e.course_id == course_id && Some(e.id) != exclude)
    }

    /// Score must stay within the referenced assessment's maximum
    fn check_score_bounds(
        &self,
        assessment_id: AssessmentId,
        score: u32,
    ) -> Result<(), RegistrarError> {
        let assessment = self.assessments.get(&assessment_id).ok_or_else(|| {
            RegistrarError::Validation(format!("unknown assessment id {}", assessment_id))
        })?;
        if score > assessment.max_score {
            return Err(RegistrarError::Validation(format!(
                "score {} exceeds assessment max score {}",
                score, assessment.max_score
            )));
        }
        Ok(())
    }
}

/// The single authoritative store instance
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RelationalStore for MemoryStore {
    // --- Users ---

    async fn create_user(&self, draft: UserDraft) -> Result<User, RegistrarError> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&draft.email, None) {
            return Err(RegistrarError::Conflict(
                "a user with this email already exists".to_string(),
            ));
        }
        let user = User {
            user_id: UserId::generate(),
            name: draft.name,
            email: draft.email,
            password_hash: draft.password_hash,
            role: draft.role,
        };
        tables.users.insert(user.user_id, user.clone());
        debug!(user_id = %user.user_id, "user created");
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RegistrarError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RegistrarError> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, RegistrarError> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn update_user(&self, id: UserId, update: UserUpdate) -> Result<User, RegistrarError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&id) {
            return Err(RegistrarError::NotFound);
        }
        if tables.email_taken(&update.email, Some(id)) {
            return Err(RegistrarError::Conflict(
                "a user with this email already exists".to_string(),
            ));
        }
        let user = User {
            user_id: id,
            name: update.name,
            email: update.email,
            password_hash: update.password_hash,
            role: update.role,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, id: UserId) -> Result<(), RegistrarError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&id) {
            return Err(RegistrarError::NotFound);
        }
        // Referential closure: a referenced user cannot be removed
        if tables.courses.values().any(|c| c.instructor_id == id) {
            return Err(RegistrarError::Conflict(
                "user still instructs one or more courses".to_string(),
            ));
        }
        if tables.enrollments.values().any(|e| e.user_id == id) {
            return Err(RegistrarError::Conflict(
                "user still has enrollments".to_string(),
            ));
        }
        if tables.results.values().any(|r| r.user_id == id) {
            return Err(RegistrarError::Conflict(
                "user still has assessment results".to_string(),
            ));
        }
        tables.users.remove(&id);
        Ok(())
    }

    // --- Courses ---

    async fn create_course(&self, draft: CourseDraft) -> Result<Course, RegistrarError> {
        let mut tables = self.tables.write().await;
        tables.require_user(draft.instructor_id)?;
        let course = Course {
            course_id: CourseId::generate(),
            title: draft.title,
            description: draft.description,
            media_url: draft.media_url,
            instructor_id: draft.instructor_id,
        };
        tables.courses.insert(course.course_id, course.clone());
        debug!(course_id = %course.course_id, instructor_id = %course.instructor_id, "course created");
        Ok(course)
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, RegistrarError> {
        Ok(self.tables.read().await.courses.get(&id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, RegistrarError> {
        Ok(self.tables.read().await.courses.values().cloned().collect())
    }

    async fn update_course(
        &self,
        id: CourseId,
        update: CourseUpdate,
    ) -> Result<Course, RegistrarError> {
        let mut tables = self.tables.write().await;
        if !tables.courses.contains_key(&id) {
            return Err(RegistrarError::NotFound);
        }
        tables.require_user(update.instructor_id)?;
        let course = Course {
            course_id: id,
            title: update.title,
            description: update.description,
            media_url: update.media_url,
            instructor_id: update.instructor_id,
        };
        tables.courses.insert(id, course.clone());
        Ok(course)
    }

    async fn delete_course(&self, id: CourseId) -> Result<(), RegistrarError> {
        let mut tables = self.tables.write().await;
        if tables.courses.remove(&id).is_none() {
            return Err(RegistrarError::NotFound);
        }

        // Cascade inside the same critical section: assessments of the
        // course, results of those assessments, and enrollments in the
        // course all go with it. Readers never observe the course gone
        // while a dependent row remains.
        let doomed_assessments: Vec<AssessmentId> = tables
            .assessments
            .values()
            .filter(|a| a.course_id == id)
            .map(|a| a.assessment_id)
            .collect();
        for assessment_id in &doomed_assessments {
            tables.assessments.remove(assessment_id);
        }
        tables
            .results
            .retain(|_, r| !doomed_assessments.contains(&r.assessment_id));
        tables.enrollments.retain(|_, e| e.course_id != id);

        debug!(
            course_id = %id,
            cascaded_assessments = doomed_assessments.len(),
            "course deleted with cascade"
        );
        Ok(())
    }

    async fn set_course_media(
        &self,
        id: CourseId,
        media_url: &str,
    ) -> Result<Course, RegistrarError> {
        let mut tables = self.tables.write().await;
        let course = tables.courses.get_mut(&id).ok_or(RegistrarError::NotFound)?;
        course.media_url = media_url.to_string();
        Ok(course.clone())
    }

    // --- Assessments ---

    async fn create_assessment(
        &self,
        draft: AssessmentDraft,
    ) -> Result<Assessment, RegistrarError> {
        let mut tables = self.tables.write().await;
        tables.require_course(draft.course_id)?;
        let assessment = Assessment {
            assessment_id: AssessmentId::generate(),
            course_id: draft.course_id,
            title: draft.title,
            questions: draft.questions,
            max_score: draft.max_score,
        };
        tables
            .assessments
            .insert(assessment.assessment_id, assessment.clone());
        Ok(assessment)
    }

    async fn get_assessment(
        &self,
        id: AssessmentId,
    ) -> Result<Option<Assessment>, RegistrarError> {
        Ok(self.tables.read().await.assessments.get(&id).cloned())
    }

    async fn list_assessments(&self) -> Result<Vec<Assessment>, RegistrarError> {
        Ok(self
            .tables
            .read()
            .await
            .assessments
            .values()
            .cloned()
            .collect())
    }

    async fn assessments_for_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<Assessment>, RegistrarError> {
        Ok(self
            .tables
            .read()
            .await
            .assessments
            .values()
            .filter(|a| a.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn update_assessment(
        &self,
        id: AssessmentId,
        update: AssessmentUpdate,
    ) -> Result<Assessment, RegistrarError> {
        let mut tables = self.tables.write().await;
        if !tables.assessments.contains_key(&id) {
            return Err(RegistrarError::NotFound);
        }
        tables.require_course(update.course_id)?;
        let assessment = Assessment {
            assessment_id: id,
            course_id: update.course_id,
            title: update.title,
            questions: update.questions,
            max_score: update.max_score,
        };
        tables.assessments.insert(id, assessment.clone());
        Ok(assessment)
    }

    async fn delete_assessment(&self, id: AssessmentId) -> Result<(), RegistrarError> {
        let mut tables = self.tables.write().await;
        if tables.assessments.remove(&id).is_none() {
            return Err(RegistrarError::NotFound);
        }
        // Results of a removed assessment go with it
        tables.results.retain(|_, r| r.assessment_id != id);
        Ok(())
    }

    // --- Enrollments ---

    async fn create_enrollment(
        &self,
        draft: EnrollmentDraft,
    ) -> Result<Enrollment, RegistrarError> {
        let mut tables = self.tables.write().await;
        tables.require_user(draft.user_id)?;
        tables.require_course(draft.course_id)?;
        if tables.enrollment_pair_taken(draft.user_id, draft.course_id, None) {
            return Err(RegistrarError::Conflict(
                "user is already enrolled in this course".to_string(),
            ));
        }
        tables.next_enrollment_id += 1;
        let enrollment = Enrollment {
            id: tables.next_enrollment_id,
            user_id: draft.user_id,
            course_id: draft.course_id,
        };
        tables.enrollments.insert(enrollment.id, enrollment.clone());
        debug!(enrollment_id = enrollment.id, "enrollment created");
        Ok(enrollment)
    }

    async fn get_enrollment(
        &self,
        id: EnrollmentId,
    ) -> Result<Option<Enrollment>, RegistrarError> {
        Ok(self.tables.read().await.enrollments.get(&id).cloned())
    }

    async fn list_enrollments(&self) -> Result<Vec<Enrollment>, RegistrarError> {
        Ok(self
            .tables
            .read()
            .await
            .enrollments
            .values()
            .cloned()
            .collect())
    }

    async fn update_enrollment(
        &self,
        id: EnrollmentId,
        update: EnrollmentUpdate,
    ) -> Result<Enrollment, RegistrarError> {
        let mut tables = self.tables.write().await;
        if !tables.enrollments.contains_key(&id) {
            return Err(RegistrarError::NotFound);
        }
        tables.require_user(update.user_id)?;
        tables.require_course(update.course_id)?;
        if tables.enrollment_pair_taken(update.user_id, update.course_id, Some(id)) {
            return Err(RegistrarError::Conflict(
                "user is already enrolled in this course".to_string(),
            ));
        }
        let enrollment = Enrollment {
            id,
            user_id: update.user_id,
            course_id: update.course_id,
        };
        tables.enrollments.insert(id, enrollment.clone());
        Ok(enrollment)
    }

    async fn delete_enrollment(&self, id: EnrollmentId) -> Result<(), RegistrarError> {
        let mut tables = self.tables.write().await;
        if tables.enrollments.remove(&id).is_none() {
            return Err(RegistrarError::NotFound);
        }
        Ok(())
    }

    // --- Results ---

    async fn create_result(
        &self,
        draft: ResultDraft,
    ) -> Result<AssessmentResult, RegistrarError> {
        let mut tables = self.tables.write().await;
        tables.require_user(draft.user_id)?;
        tables.check_score_bounds(draft.assessment_id, draft.score)?;
        let result = AssessmentResult {
            result_id: ResultId::generate(),
            assessment_id: draft.assessment_id,
            user_id: draft.user_id,
            score: draft.score,
            attempt_date: draft.attempt_date,
        };
        tables.results.insert(result.result_id, result.clone());
        Ok(result)
    }

    async fn get_result(
        &self,
        id: ResultId,
    ) -> Result<Option<AssessmentResult>, RegistrarError> {
        Ok(self.tables.read().await.results.get(&id).cloned())
    }

    async fn list_results(&self) -> Result<Vec<AssessmentResult>, RegistrarError> {
        Ok(self.tables.read().await.results.values().cloned().collect())
    }

    async fn update_result(
        &self,
        id: ResultId,
        update: ResultUpdate,
    ) -> Result<AssessmentResult, RegistrarError> {
        let mut tables = self.tables.write().await;
        if !tables.results.contains_key(&id) {
            return Err(RegistrarError::NotFound);
        }
        tables.require_user(update.user_id)?;
        tables.check_score_bounds(update.assessment_id, update.score)?;
        let result = AssessmentResult {
            result_id: id,
            assessment_id: update.assessment_id,
            user_id: update.user_id,
            score: update.score,
            attempt_date: update.attempt_date,
        };
        tables.results.insert(id, result.clone());
        Ok(result)
    }

    async fn delete_result(&self, id: ResultId) -> Result<(), RegistrarError> {
        let mut tables = self.tables.write().await;
        if tables.results.remove(&id).is_none() {
            return Err(RegistrarError::NotFound);
        }
        Ok(())
    }

    // --- Views ---

    async fn snapshot(&self) -> Result<Snapshot, RegistrarError> {
        let tables = self.tables.read().await;
        Ok(Snapshot {
            users: tables.users.values().cloned().collect(),
            courses: tables.courses.values().cloned().collect(),
            assessments: tables.assessments.values().cloned().collect(),
            enrollments: tables.enrollments.values().cloned().collect(),
            results: tables.results.values().cloned().collect(),
        })
    }

    async fn ping(&self) -> Result<(), RegistrarError> {
        // Taking the read lock proves the store is not wedged
        let _ = self.tables.read().await;
        Ok(())
    }
}
