use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Copy, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimulationStatus {
    InProgress,
    Completed,
    Failed,
}

/// One timed 5-question mock exam attempt.
///
/// `question_ids` is frozen at creation and is the authoritative ordering
/// for "next question" navigation. Once `ended_at` is set the simulation is
/// terminal and no further mutation is permitted.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Simulation {
    pub id: String,
    pub user_id: String,
    pub question_ids: Vec<String>,
    pub status: SimulationStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Simulation {
    pub fn new(user_id: &str, question_ids: Vec<String>) -> Self {
        Simulation {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            question_ids,
            status: SimulationStatus::InProgress,
            started_at: Utc::now(),
            ended_at: None,
            overall_score: None,
            passed: None,
            failure_reason: None,
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_simulation_is_running_and_ungraded() {
        let sim = Simulation::new("user-1", vec!["q1".into(), "q2".into()]);

        assert_eq!(sim.status, SimulationStatus::InProgress);
        assert!(!sim.is_ended());
        assert!(sim.overall_score.is_none());
        assert!(sim.passed.is_none());
    }

    #[test]
    fn simulation_round_trip_preserves_question_order() {
        let sim = Simulation::new(
            "user-1",
            vec!["q3".into(), "q1".into(), "q5".into(), "q2".into(), "q4".into()],
        );

        let json = serde_json::to_string(&sim).expect("simulation should serialize");
        let parsed: Simulation = serde_json::from_str(&json).expect("simulation should deserialize");

        assert_eq!(parsed.question_ids, sim.question_ids);
        assert_eq!(parsed.status, SimulationStatus::InProgress);
    }
}
