// Integration tests for the relational store: uniqueness, referential
// existence, cascade atomicity, and not-found semantics

use chrono::Utc;
use registrar::api::RelationalStore;
use registrar::core::errors::RegistrarError;
use registrar::core::models::{
    AssessmentDraft, AssessmentId, CourseDraft, CourseId, EnrollmentDraft, EnrollmentUpdate,
    ResultDraft, ResultUpdate, Role, UserDraft, UserId, UserUpdate,
};
use registrar::state::store::MemoryStore;
use std::sync::Arc;

fn user_draft(name: &str, email: &str, role: Role) -> UserDraft {
    UserDraft {
        name: name.to_string(),
        email: email.to_string(),
        password_hash: "$2b$04$placeholderhashvalue".to_string(),
        role,
    }
}

fn course_draft(title: &str, instructor_id: UserId) -> CourseDraft {
    CourseDraft {
        title: title.to_string(),
        description: "desc".to_string(),
        media_url: String::new(),
        instructor_id,
    }
}

fn assessment_draft(course_id: CourseId, title: &str, max_score: u32) -> AssessmentDraft {
    AssessmentDraft {
        course_id,
        title: title.to_string(),
        questions: "[]".to_string(),
        max_score,
    }
}

fn result_draft(assessment_id: AssessmentId, user_id: UserId, score: u32) -> ResultDraft {
    ResultDraft {
        assessment_id,
        user_id,
        score,
        attempt_date: Utc::now(),
    }
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let store = MemoryStore::new();
    store
        .create_user(user_draft("Ada", "ada@example.com", Role::Student))
        .await
        .unwrap();

    let err = store
        .create_user(user_draft("Other Ada", "ada@example.com", Role::Instructor))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistrarError::Conflict(_)));
}

#[tokio::test]
async fn test_update_cannot_steal_existing_email() {
    let store = MemoryStore::new();
    store
        .create_user(user_draft("Ada", "ada@example.com", Role::Student))
        .await
        .unwrap();
    let grace = store
        .create_user(user_draft("Grace", "grace@example.com", Role::Student))
        .await
        .unwrap();

    let err = store
        .update_user(
            grace.user_id,
            UserUpdate {
                name: "Grace".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: grace.password_hash.clone(),
                role: Role::Student,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RegistrarError::Conflict(_)));

    // Keeping one's own email through an update is not a conflict
    let updated = store
        .update_user(
            grace.user_id,
            UserUpdate {
                name: "Grace Hopper".to_string(),
                email: "grace@example.com".to_string(),
                password_hash: grace.password_hash,
                role: Role::Student,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Grace Hopper");
}

#[tokio::test]
async fn test_course_requires_existing_instructor() {
    let store = MemoryStore::new();
    let err = store
        .create_course(course_draft("Orphan course", UserId::generate()))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistrarError::Validation(_)));
}

#[tokio::test]
async fn test_enrollment_requires_existing_user_and_course() {
    let store = MemoryStore::new();
    let instructor = store
        .create_user(user_draft("Inst", "inst@example.com", Role::Instructor))
        .await
        .unwrap();
    let course = store
        .create_course(course_draft("Rust 101", instructor.user_id))
        .await
        .unwrap();

    let err = store
        .create_enrollment(EnrollmentDraft {
            user_id: UserId::generate(),
            course_id: course.course_id,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RegistrarError::Validation(_)));

    let err = store
        .create_enrollment(EnrollmentDraft {
            user_id: instructor.user_id,
            course_id: CourseId::generate(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RegistrarError::Validation(_)));
}

#[tokio::test]
async fn test_duplicate_enrollment_is_rejected_then_allowed_after_delete() {
    let store = MemoryStore::new();
    let instructor = store
        .create_user(user_draft("Inst", "inst@example.com", Role::Instructor))
        .await
        .unwrap();
    let student = store
        .create_user(user_draft("Stu", "stu@example.com", Role::Student))
        .await
        .unwrap();
    let course = store
        .create_course(course_draft("Rust 101", instructor.user_id))
        .await
        .unwrap();

    let draft = EnrollmentDraft {
        user_id: student.user_id,
        course_id: course.course_id,
    };
    let enrollment = store.create_enrollment(draft.clone()).await.unwrap();

    let err = store.create_enrollment(draft.clone()).await.unwrap_err();
    assert!(matches!(err, RegistrarError::Conflict(_)));

    // Once the pair is gone, re-enrolling is fine again
    store.delete_enrollment(enrollment.id).await.unwrap();
    store.create_enrollment(draft).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_duplicate_enrollment_admits_exactly_one() {
    let store = Arc::new(MemoryStore::new());
    let instructor = store
        .create_user(user_draft("Inst", "inst@example.com", Role::Instructor))
        .await
        .unwrap();
    let student = store
        .create_user(user_draft("Stu", "stu@example.com", Role::Student))
        .await
        .unwrap();
    let course = store
        .create_course(course_draft("Rust 101", instructor.user_id))
        .await
        .unwrap();

    let draft = EnrollmentDraft {
        user_id: student.user_id,
        course_id: course.course_id,
    };

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let draft = draft.clone();
        handles.push(tokio::spawn(
            async move { store.create_enrollment(draft).await },
        ));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1, "exactly one racing enrollment may win");
    assert_eq!(store.list_enrollments().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_course_delete_cascades_atomically() {
    let store = MemoryStore::new();
    let instructor = store
        .create_user(user_draft("Inst", "inst@example.com", Role::Instructor))
        .await
        .unwrap();
    let student = store
        .create_user(user_draft("Stu", "stu@example.com", Role::Student))
        .await
        .unwrap();

    let doomed = store
        .create_course(course_draft("Doomed", instructor.user_id))
        .await
        .unwrap();
    let survivor = store
        .create_course(course_draft("Survivor", instructor.user_id))
        .await
        .unwrap();

    let doomed_a = store
        .create_assessment(assessment_draft(doomed.course_id, "Quiz 1", 100))
        .await
        .unwrap();
    let doomed_b = store
        .create_assessment(assessment_draft(doomed.course_id, "Quiz 2", 50))
        .await
        .unwrap();
    let kept = store
        .create_assessment(assessment_draft(survivor.course_id, "Final", 100))
        .await
        .unwrap();

    store
        .create_result(result_draft(doomed_a.assessment_id, student.user_id, 80))
        .await
        .unwrap();
    store
        .create_result(result_draft(doomed_b.assessment_id, student.user_id, 40))
        .await
        .unwrap();
    let kept_result = store
        .create_result(result_draft(kept.assessment_id, student.user_id, 90))
        .await
        .unwrap();

    store
        .create_enrollment(EnrollmentDraft {
            user_id: student.user_id,
            course_id: doomed.course_id,
        })
        .await
        .unwrap();
    let kept_enrollment = store
        .create_enrollment(EnrollmentDraft {
            user_id: student.user_id,
            course_id: survivor.course_id,
        })
        .await
        .unwrap();

    store.delete_course(doomed.course_id).await.unwrap();

    // Everything under the deleted course is gone
    assert!(store.get_course(doomed.course_id).await.unwrap().is_none());
    assert!(store
        .get_assessment(doomed_a.assessment_id)
        .await
        .unwrap()
        .is_none());
    assert!(store
        .get_assessment(doomed_b.assessment_id)
        .await
        .unwrap()
        .is_none());
    assert_eq!(store.list_results().await.unwrap().len(), 1);
    assert_eq!(store.list_enrollments().await.unwrap().len(), 1);

    // Unrelated rows are untouched
    assert!(store.get_course(survivor.course_id).await.unwrap().is_some());
    assert!(store
        .get_assessment(kept.assessment_id)
        .await
        .unwrap()
        .is_some());
    assert!(store
        .get_result(kept_result.result_id)
        .await
        .unwrap()
        .is_some());
    assert!(store
        .get_enrollment(kept_enrollment.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_concurrent_reader_never_observes_partial_cascade() {
    let store = Arc::new(MemoryStore::new());
    let instructor = store
        .create_user(user_draft("Inst", "inst@example.com", Role::Instructor))
        .await
        .unwrap();
    let student = store
        .create_user(user_draft("Stu", "stu@example.com", Role::Student))
        .await
        .unwrap();
    let course = store
        .create_course(course_draft("Doomed", instructor.user_id))
        .await
        .unwrap();

    let mut doomed_assessments = Vec::new();
    for title in ["Quiz 1", "Quiz 2", "Quiz 3"] {
        let assessment = store
            .create_assessment(assessment_draft(course.course_id, title, 100))
            .await
            .unwrap();
        store
            .create_result(result_draft(assessment.assessment_id, student.user_id, 50))
            .await
            .unwrap();
        doomed_assessments.push(assessment.assessment_id);
    }
    store
        .create_enrollment(EnrollmentDraft {
            user_id: student.user_id,
            course_id: course.course_id,
        })
        .await
        .unwrap();

    // 3 assessments + 3 results + 1 enrollment hang off the course
    let dependent_rows = 7;
    let doomed_course = course.course_id;

    // Snapshot continuously while the delete runs: every observation must be
    // the complete pre-state or the complete post-state, never a mix
    let reader = {
        let store = store.clone();
        let doomed_assessments = doomed_assessments.clone();
        tokio::spawn(async move {
            loop {
                let snap = store.snapshot().await.unwrap();
                let course_present =
                    snap.courses.iter().any(|c| c.course_id == doomed_course);
                let dependents = snap
                    .assessments
                    .iter()
                    .filter(|a| a.course_id == doomed_course)
                    .count()
                    + snap
                        .results
                        .iter()
                        .filter(|r| doomed_assessments.contains(&r.assessment_id))
                        .count()
                    + snap
                        .enrollments
                        .iter()
                        .filter(|e| e.course_id == doomed_course)
                        .count();

                if course_present {
                    assert_eq!(dependents, dependent_rows, "pre-state must be complete");
                } else {
                    assert_eq!(dependents, 0, "course gone implies dependents gone");
                    break;
                }
                tokio::task::yield_now().await;
            }
        })
    };

    tokio::task::yield_now().await;
    store.delete_course(doomed_course).await.unwrap();
    reader.await.unwrap();
}

#[tokio::test]
async fn test_assessment_delete_removes_its_results() {
    let store = MemoryStore::new();
    let instructor = store
        .create_user(user_draft("Inst", "inst@example.com", Role::Instructor))
        .await
        .unwrap();
    let student = store
        .create_user(user_draft("Stu", "stu@example.com", Role::Student))
        .await
        .unwrap();
    let course = store
        .create_course(course_draft("Rust 101", instructor.user_id))
        .await
        .unwrap();
    let assessment = store
        .create_assessment(assessment_draft(course.course_id, "Quiz", 100))
        .await
        .unwrap();
    let result = store
        .create_result(result_draft(assessment.assessment_id, student.user_id, 70))
        .await
        .unwrap();

    store.delete_assessment(assessment.assessment_id).await.unwrap();
    assert!(store.get_result(result.result_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_referenced_user_cannot_be_deleted() {
    let store = MemoryStore::new();
    let instructor = store
        .create_user(user_draft("Inst", "inst@example.com", Role::Instructor))
        .await
        .unwrap();
    let course = store
        .create_course(course_draft("Rust 101", instructor.user_id))
        .await
        .unwrap();

    let err = store.delete_user(instructor.user_id).await.unwrap_err();
    assert!(matches!(err, RegistrarError::Conflict(_)));

    // After the referencing course is gone, the delete goes through
    store.delete_course(course.course_id).await.unwrap();
    store.delete_user(instructor.user_id).await.unwrap();
}

#[tokio::test]
async fn test_score_bounds_are_enforced() {
    let store = MemoryStore::new();
    let instructor = store
        .create_user(user_draft("Inst", "inst@example.com", Role::Instructor))
        .await
        .unwrap();
    let student = store
        .create_user(user_draft("Stu", "stu@example.com", Role::Student))
        .await
        .unwrap();
    let course = store
        .create_course(course_draft("Rust 101", instructor.user_id))
        .await
        .unwrap();
    let assessment = store
        .create_assessment(assessment_draft(course.course_id, "Quiz", 50))
        .await
        .unwrap();

    let err = store
        .create_result(result_draft(assessment.assessment_id, student.user_id, 51))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistrarError::Validation(_)));

    // Exactly at the maximum is allowed
    let result = store
        .create_result(result_draft(assessment.assessment_id, student.user_id, 50))
        .await
        .unwrap();

    // The bound applies on update too
    let err = store
        .update_result(
            result.result_id,
            ResultUpdate {
                assessment_id: assessment.assessment_id,
                user_id: student.user_id,
                score: 999,
                attempt_date: result.attempt_date,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RegistrarError::Validation(_)));
}

#[tokio::test]
async fn test_missing_rows_get_none_updates_get_not_found() {
    let store = MemoryStore::new();

    assert!(store.get_user(UserId::generate()).await.unwrap().is_none());
    assert!(store
        .get_course(CourseId::generate())
        .await
        .unwrap()
        .is_none());
    assert!(store.get_enrollment(42).await.unwrap().is_none());

    let err = store.delete_course(CourseId::generate()).await.unwrap_err();
    assert!(matches!(err, RegistrarError::NotFound));

    let err = store
        .update_enrollment(
            42,
            EnrollmentUpdate {
                user_id: UserId::generate(),
                course_id: CourseId::generate(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RegistrarError::NotFound));
}

#[tokio::test]
async fn test_enrollment_ids_are_monotone() {
    let store = MemoryStore::new();
    let instructor = store
        .create_user(user_draft("Inst", "inst@example.com", Role::Instructor))
        .await
        .unwrap();
    let a = store
        .create_user(user_draft("A", "a@example.com", Role::Student))
        .await
        .unwrap();
    let b = store
        .create_user(user_draft("B", "b@example.com", Role::Student))
        .await
        .unwrap();
    let course = store
        .create_course(course_draft("Rust 101", instructor.user_id))
        .await
        .unwrap();

    let first = store
        .create_enrollment(EnrollmentDraft {
            user_id: a.user_id,
            course_id: course.course_id,
        })
        .await
        .unwrap();
    let second = store
        .create_enrollment(EnrollmentDraft {
            user_id: b.user_id,
            course_id: course.course_id,
        })
        .await
        .unwrap();
    assert!(second.id > first.id);
}
