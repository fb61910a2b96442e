use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ephemeral per-question stopwatch. One active timer per (user, question)
/// during a simulation; consumed when the answer is submitted.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuestionTimer {
    pub id: String,
    pub user_id: String,
    pub simulation_id: String,
    pub question_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl QuestionTimer {
    pub fn start(user_id: &str, simulation_id: &str, question_id: &str) -> Self {
        QuestionTimer {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            simulation_id: simulation_id.to_string(),
            question_id: question_id.to_string(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Elapsed whole seconds between start and end, zero while running.
    /// Clock skew can make the difference negative; clamp instead of
    /// recording negative durations.
    pub fn elapsed_seconds(&self) -> i64 {
        match self.ended_at {
            Some(ended_at) => (ended_at - self.started_at).num_seconds().max(0),
            None => 0,
        }
    }
}
