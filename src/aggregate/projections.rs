//! Read-only denormalized projections
//!
//! Joins run over a single store snapshot, so a projection reflects one
//! consistent point in time even while mutations are in flight. Nothing in
//! this module writes to the store. Row order is unspecified; callers
//! wanting a specific order sort for themselves.

use crate::api::RelationalStore;
use crate::core::errors::RegistrarError;
use crate::core::models::{
    Assessment, AssessmentId, Course, CourseId, ResultId, Snapshot, User, UserId,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Result row enriched for a single user's view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserResultRow {
    pub result_id: ResultId,
    pub score: u32,
    pub attempt_date: DateTime<Utc>,
    pub assessment_title: String,
    pub course_id: CourseId,
    pub course_title: String,
}

/// Result row enriched with course and user context for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedResultRow {
    pub result_id: ResultId,
    pub score: u32,
    pub attempt_date: DateTime<Utc>,
    pub assessment_title: String,
    pub course_title: String,
    pub course_id: CourseId,
    pub user_name: String,
    pub user_id: UserId,
}

/// Produces joined views of the entity graph without mutating it
pub struct AggregationEngine {
    store: Arc<dyn RelationalStore + Send + Sync>,
}

impl AggregationEngine {
    pub fn new(store: Arc<dyn RelationalStore + Send + Sync>) -> Self {
        Self { store }
    }

    /// Result -> Assessment -> Course, filtered to one user
    pub async fn results_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<UserResultRow>, RegistrarError> {
        let snapshot = self.store.snapshot().await?;
        let assessments = index_assessments(&snapshot);
        let courses = index_courses(&snapshot);

        let rows = snapshot
            .results
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter_map(|r| {
                let assessment = assessments.get(&r.assessment_id)?;
                let course = courses.get(&assessment.course_id)?;
                Some(UserResultRow {
                    result_id: r.result_id,
                    score: r.score,
                    attempt_date: r.attempt_date,
                    assessment_title: assessment.title.clone(),
                    course_id: course.course_id,
                    course_title: course.title.clone(),
                })
            })
            .collect();
        Ok(rows)
    }

    /// Result -> Assessment -> Course -> User, with optional AND-combined
    /// filters on user and course
    pub async fn filtered_results(
        &self,
        user_id: Option<UserId>,
        course_id: Option<CourseId>,
    ) -> Result<Vec<DetailedResultRow>, RegistrarError> {
        let snapshot = self.store.snapshot().await?;
        let assessments = index_assessments(&snapshot);
        let courses = index_courses(&snapshot);
        let users = index_users(&snapshot);

        let rows = snapshot
            .results
            .iter()
            .filter(|r| user_id.map_or(true, |id| r.user_id == id))
            .filter_map(|r| {
                let assessment = assessments.get(&r.assessment_id)?;
                let course = courses.get(&assessment.course_id)?;
                let user = users.get(&r.user_id)?;
                Some(DetailedResultRow {
                    result_id: r.result_id,
                    score: r.score,
                    attempt_date: r.attempt_date,
                    assessment_title: assessment.title.clone(),
                    course_title: course.title.clone(),
                    course_id: course.course_id,
                    user_name: user.name.clone(),
                    user_id: user.user_id,
                })
            })
            .filter(|row| course_id.map_or(true, |id| row.course_id == id))
            .collect();
        Ok(rows)
    }

    /// Unfiltered detailed view
    pub async fn detailed_results(&self) -> Result<Vec<DetailedResultRow>, RegistrarError> {
        self.filtered_results(None, None).await
    }

    /// Courses a user is enrolled in
    pub async fn enrolled_courses(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Course>, RegistrarError> {
        let snapshot = self.store.snapshot().await?;
        let courses = index_courses(&snapshot);

        let rows = snapshot
            .enrollments
            .iter()
            .filter(|e| e.user_id == user_id)
            .filter_map(|e| courses.get(&e.course_id).map(|c| (*c).clone()))
            .collect();
        Ok(rows)
    }
}

fn index_assessments(snapshot: &Snapshot) -> HashMap<AssessmentId, &Assessment> {
    snapshot
        .assessments
        .iter()
        .map(|a| (a.assessment_id, a))
        .collect()
}

fn index_courses(snapshot: &Snapshot) -> HashMap<CourseId, &Course> {
    snapshot.courses.iter().map(|c| (c.course_id, c)).collect()
}

fn index_users(snapshot: &Snapshot) -> HashMap<UserId, &User> {
    snapshot.users.iter().map(|u| (u.user_id, u)).collect()
}
