use serde::Serialize;

use crate::{
    constants::{APP_PASS_THRESHOLD, EXAM_TIME_BUDGET_SECONDS, SIMULATION_QUESTION_COUNT},
    models::domain::{EssayAttempt, EssayFeedback, EssayQuestion, ModuleProgress},
    services::progress_service::SubjectOverview,
    services::simulation_service::{
        FinishedSimulation, QuestionView, StartedSimulation, SubmittedAnswer,
    },
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDto {
    pub id: String,
    pub subject_name: String,
    pub year: Option<i32>,
    pub question_number: Option<i32>,
    pub text: String,
}

impl From<EssayQuestion> for QuestionDto {
    fn from(question: EssayQuestion) -> Self {
        QuestionDto {
            id: question.id,
            subject_name: question.subject_name,
            year: question.year,
            question_number: question.question_number,
            text: question.text,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSimulationResponse {
    pub simulation_id: String,
    pub question: QuestionDto,
    pub question_index: usize,
    pub total_questions: usize,
    pub timer_id: String,
    pub time_budget_seconds: i64,
}

impl From<StartedSimulation> for StartSimulationResponse {
    fn from(started: StartedSimulation) -> Self {
        StartSimulationResponse {
            simulation_id: started.simulation.id,
            question: started.first_question.into(),
            question_index: 0,
            total_questions: SIMULATION_QUESTION_COUNT,
            timer_id: started.timer.id,
            time_budget_seconds: EXAM_TIME_BUDGET_SECONDS,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerResponse {
    pub answered_count: i64,
    pub has_next_question: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_timer_id: Option<String>,
}

impl From<SubmittedAnswer> for SubmitAnswerResponse {
    fn from(submitted: SubmittedAnswer) -> Self {
        SubmitAnswerResponse {
            answered_count: submitted.answered_count,
            has_next_question: submitted.has_next_question,
            next_question_index: submitted.next_question_index,
            next_timer_id: submitted.next_timer.map(|t| t.id),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionViewResponse {
    pub question: QuestionDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_answer: Option<String>,
    pub can_edit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question_id: Option<String>,
    pub is_last_question: bool,
}

impl From<QuestionView> for QuestionViewResponse {
    fn from(view: QuestionView) -> Self {
        QuestionViewResponse {
            question: view.question.into(),
            prior_answer: view.prior_answer,
            can_edit: view.can_edit,
            next_question_id: view.next_question_id,
            is_last_question: view.is_last_question,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedAttemptDto {
    pub question_id: String,
    pub word_count: i64,
    pub time_taken_seconds: i64,
    pub score: Option<i32>,
    pub band: Option<String>,
    pub feedback: Option<EssayFeedback>,
    pub strengths: Option<Vec<String>>,
    pub improvements: Option<Vec<String>>,
    pub sample_answer: Option<String>,
}

impl From<EssayAttempt> for GradedAttemptDto {
    fn from(attempt: EssayAttempt) -> Self {
        GradedAttemptDto {
            question_id: attempt.question_id,
            word_count: attempt.word_count,
            time_taken_seconds: attempt.time_taken_seconds,
            score: attempt.ai_score,
            band: attempt.band,
            feedback: attempt.feedback,
            strengths: attempt.strengths,
            improvements: attempt.improvements,
            sample_answer: attempt.sample_answer,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishSimulationResponse {
    pub overall_score: i32,
    pub passed: bool,
    pub app_pass_threshold: i32,
    pub total_time_seconds: i64,
    pub average_time_per_question: f64,
    pub attempts: Vec<GradedAttemptDto>,
}

impl From<FinishedSimulation> for FinishSimulationResponse {
    fn from(finished: FinishedSimulation) -> Self {
        FinishSimulationResponse {
            overall_score: finished.overall_score,
            passed: finished.passed,
            app_pass_threshold: APP_PASS_THRESHOLD,
            total_time_seconds: finished.total_time_seconds,
            average_time_per_question: finished.average_time_per_question,
            attempts: finished.attempts.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgressDto {
    pub module_id: String,
    pub completed_lessons: i64,
    pub total_lessons: i64,
    pub progress_percent: f64,
    pub status: crate::models::domain::ProgressStatus,
}

impl From<ModuleProgress> for ModuleProgressDto {
    fn from(progress: ModuleProgress) -> Self {
        ModuleProgressDto {
            module_id: progress.module_id,
            completed_lessons: progress.completed_lessons,
            total_lessons: progress.total_lessons,
            progress_percent: progress.progress_percent,
            status: progress.status,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectProgressResponse {
    pub subject_id: String,
    pub progress_percent: f64,
    pub status: crate::models::domain::ProgressStatus,
    pub total_time_seconds: i64,
    pub modules: Vec<ModuleProgressDto>,
}

impl SubjectProgressResponse {
    pub fn from_overview(subject_id: &str, overview: SubjectOverview) -> Self {
        let (percent, status, total_time) = match &overview.subject {
            Some(subject) => (
                subject.progress_percent,
                subject.status,
                subject.total_time_seconds,
            ),
            None => (0.0, crate::models::domain::ProgressStatus::NotStarted, 0),
        };

        SubjectProgressResponse {
            subject_id: subject_id.to_string(),
            progress_percent: percent,
            status,
            total_time_seconds: total_time,
            modules: overview.modules.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::Simulation;
    use crate::models::domain::{EssayQuestion, QuestionTimer};

    fn question(id: &str) -> EssayQuestion {
        EssayQuestion {
            id: id.to_string(),
            subject_id: "subject-1".to_string(),
            subject_name: "Contract".to_string(),
            year: Some(2019),
            question_number: Some(3),
            text: "Discuss the postal rule.".to_string(),
            created_at: None,
            modified_at: None,
        }
    }

    #[test]
    fn start_response_carries_exam_budget_and_length() {
        let simulation = Simulation::new("user-1", vec!["q1".into(), "q2".into()]);
        let timer = QuestionTimer::start("user-1", &simulation.id, "q1");
        let started = StartedSimulation {
            simulation,
            first_question: question("q1"),
            timer,
        };

        let response: StartSimulationResponse = started.into();
        assert_eq!(response.time_budget_seconds, 10_800);
        assert_eq!(response.total_questions, 5);
        assert_eq!(response.question_index, 0);
    }

    #[test]
    fn finish_response_surfaces_app_pass_threshold() {
        let finished = FinishedSimulation {
            overall_score: 63,
            passed: true,
            total_time_seconds: 9000,
            average_time_per_question: 1800.0,
            attempts: vec![],
        };

        let response: FinishSimulationResponse = finished.into();
        assert_eq!(response.app_pass_threshold, 80);
        assert!(response.passed);
    }
}
