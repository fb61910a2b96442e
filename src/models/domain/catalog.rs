use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level FE-1 subject (e.g. Contract, Tort, Constitutional).
///
/// Catalog entities are owned by the content-management flows and are
/// read-only inputs here.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Module {
    pub id: String,
    pub subject_id: String,
    pub title: String,
    pub order: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Lesson {
    pub id: String,
    pub module_id: String,
    pub subject_id: String,
    pub title: String,
    /// Duration of the lesson video in seconds. None for lessons whose
    /// video has not been ingested yet; auto-completion never triggers
    /// for those.
    pub video_duration_seconds: Option<f64>,
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lesson_round_trip_preserves_optional_duration() {
        let lesson = Lesson {
            id: "lesson-1".to_string(),
            module_id: "module-1".to_string(),
            subject_id: "subject-1".to_string(),
            title: "Offer and Acceptance".to_string(),
            video_duration_seconds: None,
            published: true,
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        };

        let json = serde_json::to_string(&lesson).expect("lesson should serialize");
        let parsed: Lesson = serde_json::from_str(&json).expect("lesson should deserialize");

        assert_eq!(parsed.video_duration_seconds, None);
        assert!(parsed.published);
    }
}
