use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VideoProgressRequest {
    #[validate(range(min = 0.0, message = "currentTimeSeconds must be non-negative"))]
    pub current_time_seconds: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TimeSpentRequest {
    #[validate(range(min = 0, message = "secondsSpent must be non-negative"))]
    pub seconds_spent: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1))]
    pub question_id: String,

    #[validate(length(min = 1, message = "answerText must not be empty"))]
    pub answer_text: String,

    #[validate(length(min = 1))]
    pub timer_id: String,

    pub current_question_index: usize,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FailSimulationRequest {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionIndexQuery {
    pub index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_progress_rejects_negative_time() {
        let request = VideoProgressRequest {
            current_time_seconds: -1.0,
        };
        assert!(request.validate().is_err());

        let request = VideoProgressRequest {
            current_time_seconds: 0.0,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn submit_answer_rejects_empty_answer() {
        let request = SubmitAnswerRequest {
            question_id: "q-1".to_string(),
            answer_text: "".to_string(),
            timer_id: "t-1".to_string(),
            current_question_index: 0,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn requests_deserialize_from_camel_case() {
        let request: SubmitAnswerRequest = serde_json::from_str(
            r#"{
                "questionId": "q-1",
                "answerText": "The rule in Rylands v Fletcher...",
                "timerId": "t-1",
                "currentQuestionIndex": 2
            }"#,
        )
        .expect("request should deserialize");

        assert_eq!(request.question_id, "q-1");
        assert_eq!(request.current_question_index, 2);
    }
}
