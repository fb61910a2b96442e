use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Criterion-by-criterion examiner feedback, as returned by the grader.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EssayFeedback {
    pub issue_identification: String,
    pub law: String,
    pub application: String,
    pub structure: String,
}

/// The grading collaborator's verdict for one answer. Deserialized
/// straight from the grader's JSON reply; applied to an attempt exactly
/// once.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EssayGrade {
    pub score: i32,
    pub band: String,
    pub feedback: EssayFeedback,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub sample_answer: String,
    #[serde(default)]
    pub tokens_used: i64,
}

/// One user's answer to one essay question, either inside a simulation
/// (`is_simulation` set, `simulation_id` present) or standalone practice.
///
/// Immutable after creation except for the grading fields, which are
/// populated exactly once when the owning simulation finishes.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct EssayAttempt {
    pub id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation_id: Option<String>,
    pub question_id: String,
    pub answer_text: String,
    pub word_count: i64,
    pub time_taken_seconds: i64,
    pub is_simulation: bool,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<EssayFeedback>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strengths: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub improvements: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl EssayAttempt {
    pub fn new_simulation_attempt(
        user_id: &str,
        simulation_id: &str,
        question_id: &str,
        answer_text: String,
        word_count: i64,
        time_taken_seconds: i64,
    ) -> Self {
        EssayAttempt {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            simulation_id: Some(simulation_id.to_string()),
            question_id: question_id.to_string(),
            answer_text,
            word_count,
            time_taken_seconds,
            is_simulation: true,
            submitted_at: Utc::now(),
            ai_score: None,
            band: None,
            feedback: None,
            strengths: None,
            improvements: None,
            sample_answer: None,
            tokens_used: None,
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }

    pub fn is_graded(&self) -> bool {
        self.ai_score.is_some()
    }
}
