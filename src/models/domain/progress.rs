use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Copy, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// Per-(user, lesson) progress row. Created on first lesson view, mutated
/// by the video-progress ping and the time-spent tracker.
///
/// `module_id`/`subject_id` are copied from the lesson at write time so the
/// module and subject recomputes stay single-collection queries.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LessonProgress {
    pub id: String,
    pub user_id: String,
    pub lesson_id: String,
    pub module_id: String,
    pub subject_id: String,
    pub video_watched_seconds: f64,
    /// Monotonic: never reverts to false once set.
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub time_spent_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl LessonProgress {
    pub fn new(user_id: &str, lesson_id: &str, module_id: &str, subject_id: &str) -> Self {
        LessonProgress {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            lesson_id: lesson_id.to_string(),
            module_id: module_id.to_string(),
            subject_id: subject_id.to_string(),
            video_watched_seconds: 0.0,
            is_completed: false,
            completed_at: None,
            time_spent_seconds: 0,
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }
}

/// Per-(user, module) rollup. Derived entirely from the user's
/// LessonProgress rows in the module; recomputed, never independently
/// mutated.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ModuleProgress {
    pub id: String,
    pub user_id: String,
    pub module_id: String,
    pub subject_id: String,
    pub completed_lessons: i64,
    pub total_lessons: i64,
    pub progress_percent: f64,
    pub status: ProgressStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

/// Per-(user, subject) rollup, derived from the user's ModuleProgress rows.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SubjectProgress {
    pub id: String,
    pub user_id: String,
    pub subject_id: String,
    /// Unweighted mean of the module percentages.
    pub progress_percent: f64,
    pub status: ProgressStatus,
    pub total_time_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_accessed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_status_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&ProgressStatus::NotStarted).unwrap(),
            "\"NOT_STARTED\""
        );
        assert_eq!(
            serde_json::to_string(&ProgressStatus::InProgress).unwrap(),
            "\"IN_PROGRESS\""
        );
        assert_eq!(
            serde_json::to_string(&ProgressStatus::Completed).unwrap(),
            "\"COMPLETED\""
        );
    }

    #[test]
    fn new_lesson_progress_starts_empty() {
        let progress = LessonProgress::new("user-1", "lesson-1", "module-1", "subject-1");

        assert_eq!(progress.video_watched_seconds, 0.0);
        assert!(!progress.is_completed);
        assert!(progress.completed_at.is_none());
        assert_eq!(progress.time_spent_seconds, 0);
    }
}
