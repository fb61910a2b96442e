use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use fe1_prep_server::{
    errors::{AppError, AppResult},
    models::domain::{
        EssayAttempt, EssayFeedback, EssayGrade, EssayQuestion, QuestionTimer, Simulation,
        SimulationStatus,
    },
    repositories::{
        EssayAttemptRepository, EssayQuestionRepository, QuestionTimerRepository,
        SimulationRepository,
    },
    services::{EssayGrader, GradeEssayInput, SimulationService},
};

fn question(id: &str, year: Option<i32>) -> EssayQuestion {
    EssayQuestion {
        id: id.to_string(),
        subject_id: "subject-1".to_string(),
        subject_name: "Contract".to_string(),
        year,
        question_number: Some(1),
        text: format!("Discuss the issues raised in question {}.", id),
        created_at: None,
        modified_at: None,
    }
}

struct InMemoryQuestionRepository {
    questions: Vec<EssayQuestion>,
}

#[async_trait]
impl EssayQuestionRepository for InMemoryQuestionRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<EssayQuestion>> {
        Ok(self.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn count_dated(&self) -> AppResult<i64> {
        Ok(self.questions.iter().filter(|q| q.year.is_some()).count() as i64)
    }

    async fn sample_dated(&self, size: usize) -> AppResult<Vec<EssayQuestion>> {
        // Deterministic stand-in for $sample: first `size` dated questions.
        Ok(self
            .questions
            .iter()
            .filter(|q| q.year.is_some())
            .take(size)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct InMemorySimulationRepository {
    rows: Arc<RwLock<HashMap<String, Simulation>>>,
}

#[async_trait]
impl SimulationRepository for InMemorySimulationRepository {
    async fn create(&self, simulation: Simulation) -> AppResult<Simulation> {
        let mut rows = self.rows.write().await;
        rows.insert(simulation.id.clone(), simulation.clone());
        Ok(simulation)
    }

    async fn find_for_user(&self, id: &str, user_id: &str) -> AppResult<Option<Simulation>> {
        let rows = self.rows.read().await;
        Ok(rows.get(id).filter(|s| s.user_id == user_id).cloned())
    }

    async fn complete(
        &self,
        id: &str,
        overall_score: i32,
        passed: bool,
        ended_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(id) {
            Some(sim) if sim.ended_at.is_none() => {
                sim.status = SimulationStatus::Completed;
                sim.ended_at = Some(ended_at);
                sim.overall_score = Some(overall_score);
                sim.passed = Some(passed);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn fail(&self, id: &str, reason: &str, ended_at: DateTime<Utc>) -> AppResult<bool> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(id) {
            Some(sim) if sim.ended_at.is_none() => {
                sim.status = SimulationStatus::Failed;
                sim.ended_at = Some(ended_at);
                sim.overall_score = Some(0);
                sim.passed = Some(false);
                sim.failure_reason = Some(reason.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
struct InMemoryEssayAttemptRepository {
    rows: Arc<RwLock<Vec<EssayAttempt>>>,
}

#[async_trait]
impl EssayAttemptRepository for InMemoryEssayAttemptRepository {
    async fn create(&self, attempt: EssayAttempt) -> AppResult<EssayAttempt> {
        let mut rows = self.rows.write().await;
        // Mirror of the unique (simulation_id, question_id) index.
        if attempt.is_simulation
            && rows.iter().any(|r| {
                r.simulation_id == attempt.simulation_id && r.question_id == attempt.question_id
            })
        {
            return Err(AppError::Conflict(format!(
                "An answer has already been submitted for question '{}' in this simulation",
                attempt.question_id
            )));
        }
        rows.push(attempt.clone());
        Ok(attempt)
    }

    async fn find_one(
        &self,
        simulation_id: &str,
        question_id: &str,
    ) -> AppResult<Option<EssayAttempt>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .find(|r| {
                r.simulation_id.as_deref() == Some(simulation_id) && r.question_id == question_id
            })
            .cloned())
    }

    async fn find_by_simulation(&self, simulation_id: &str) -> AppResult<Vec<EssayAttempt>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|r| r.simulation_id.as_deref() == Some(simulation_id))
            .cloned()
            .collect())
    }

    async fn count_by_simulation(&self, simulation_id: &str) -> AppResult<i64> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|r| r.simulation_id.as_deref() == Some(simulation_id))
            .count() as i64)
    }

    async fn record_grade(&self, attempt_id: &str, grade: &EssayGrade) -> AppResult<()> {
        let mut rows = self.rows.write().await;
        if let Some(row) = rows
            .iter_mut()
            .find(|r| r.id == attempt_id && r.ai_score.is_none())
        {
            row.ai_score = Some(grade.score);
            row.band = Some(grade.band.clone());
            row.feedback = Some(grade.feedback.clone());
            row.strengths = Some(grade.strengths.clone());
            row.improvements = Some(grade.improvements.clone());
            row.sample_answer = Some(grade.sample_answer.clone());
            row.tokens_used = Some(grade.tokens_used);
        }
        Ok(())
    }
}

#[derive(Default)]
struct InMemoryTimerRepository {
    rows: Arc<RwLock<HashMap<String, QuestionTimer>>>,
}

#[async_trait]
impl QuestionTimerRepository for InMemoryTimerRepository {
    async fn create(&self, timer: QuestionTimer) -> AppResult<QuestionTimer> {
        let mut rows = self.rows.write().await;
        rows.insert(timer.id.clone(), timer.clone());
        Ok(timer)
    }

    async fn close(
        &self,
        timer_id: &str,
        user_id: &str,
        ended_at: DateTime<Utc>,
    ) -> AppResult<Option<QuestionTimer>> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(timer_id) {
            Some(timer) if timer.user_id == user_id && timer.ended_at.is_none() => {
                timer.ended_at = Some(ended_at);
                Ok(Some(timer.clone()))
            }
            _ => Ok(None),
        }
    }
}

/// Scores keyed by answer text; optionally fails for one answer. The
/// first-failure flag lets a retry succeed after a transient outage.
struct ScriptedGrader {
    scores: HashMap<String, i32>,
    fail_for_answer: Option<String>,
    fail_once: AtomicBool,
}

impl ScriptedGrader {
    fn with_scores(scores: HashMap<String, i32>) -> Self {
        Self {
            scores,
            fail_for_answer: None,
            fail_once: AtomicBool::new(false),
        }
    }

    fn failing_once_for(scores: HashMap<String, i32>, answer: &str) -> Self {
        Self {
            scores,
            fail_for_answer: Some(answer.to_string()),
            fail_once: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl EssayGrader for ScriptedGrader {
    async fn grade(&self, input: GradeEssayInput) -> AppResult<EssayGrade> {
        if self.fail_for_answer.as_deref() == Some(input.answer_text.as_str())
            && self.fail_once.swap(false, Ordering::SeqCst)
        {
            return Err(AppError::Upstream("grader unavailable".to_string()));
        }

        let score = *self.scores.get(&input.answer_text).unwrap_or(&50);
        Ok(EssayGrade {
            score,
            band: "Competent".to_string(),
            feedback: EssayFeedback {
                issue_identification: "Issues identified.".to_string(),
                law: "Authority cited.".to_string(),
                application: "Applied to facts.".to_string(),
                structure: "Clear structure.".to_string(),
            },
            strengths: vec!["Clarity".to_string()],
            improvements: vec!["More authority".to_string()],
            sample_answer: "- outline".to_string(),
            tokens_used: 900,
        })
    }
}

struct Harness {
    service: SimulationService,
    simulations: Arc<RwLock<HashMap<String, Simulation>>>,
    attempts: Arc<RwLock<Vec<EssayAttempt>>>,
}

fn harness_with(pool_size: usize, grader: ScriptedGrader) -> Harness {
    let questions: Vec<EssayQuestion> = (0..pool_size)
        .map(|i| question(&format!("q{}", i), Some(2015 + i as i32)))
        .collect();

    let simulations = InMemorySimulationRepository::default();
    let attempts = InMemoryEssayAttemptRepository::default();
    let timers = InMemoryTimerRepository::default();

    let sim_rows = Arc::clone(&simulations.rows);
    let attempt_rows = Arc::clone(&attempts.rows);

    Harness {
        service: SimulationService::new(
            Arc::new(simulations),
            Arc::new(attempts),
            Arc::new(InMemoryQuestionRepository { questions }),
            Arc::new(timers),
            Arc::new(grader),
        ),
        simulations: sim_rows,
        attempts: attempt_rows,
    }
}

fn words(n: usize) -> String {
    vec!["lorem"; n].join(" ")
}

const USER: &str = "user-1";

/// Starts an exam and submits answers for the first `count` questions,
/// returning (simulation_id, ordered question ids, answers submitted).
async fn start_and_submit(h: &Harness, answers: &[String]) -> (String, Vec<String>) {
    let started = h.service.start(USER).await.unwrap();
    let simulation_id = started.simulation.id.clone();
    let question_ids = started.simulation.question_ids.clone();

    let mut timer_id = started.timer.id.clone();
    for (index, answer) in answers.iter().enumerate() {
        let submitted = h
            .service
            .submit_answer(
                USER,
                &simulation_id,
                &question_ids[index],
                answer,
                &timer_id,
                index,
            )
            .await
            .unwrap();
        if let Some(next_timer) = submitted.next_timer {
            timer_id = next_timer.id;
        }
    }

    (simulation_id, question_ids)
}

#[tokio::test]
async fn start_requires_five_dated_questions() {
    let h = harness_with(4, ScriptedGrader::with_scores(HashMap::new()));

    let err = h.service.start(USER).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn start_freezes_five_distinct_questions_and_starts_first_timer() {
    let h = harness_with(8, ScriptedGrader::with_scores(HashMap::new()));

    let started = h.service.start(USER).await.unwrap();
    assert_eq!(started.simulation.question_ids.len(), 5);

    let mut unique = started.simulation.question_ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 5, "question ids must be distinct");

    assert_eq!(started.timer.question_id, started.simulation.question_ids[0]);
    assert!(started.timer.ended_at.is_none());
    assert_eq!(started.simulation.status, SimulationStatus::InProgress);
}

#[tokio::test]
async fn duplicate_submission_is_conflict_and_leaves_one_row() {
    let h = harness_with(5, ScriptedGrader::with_scores(HashMap::new()));
    let (simulation_id, question_ids) = start_and_submit(&h, &[words(50)]).await;

    let err = h
        .service
        .submit_answer(
            USER,
            &simulation_id,
            &question_ids[0],
            "second attempt at the same question",
            "any-timer",
            0,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(h.attempts.read().await.len(), 1);
}

#[tokio::test]
async fn submit_records_word_count_and_defers_grading() {
    let h = harness_with(5, ScriptedGrader::with_scores(HashMap::new()));
    let (_, _) = start_and_submit(&h, &[words(120)]).await;

    let rows = h.attempts.read().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].word_count, 120);
    assert!(rows[0].is_simulation);
    assert!(rows[0].ai_score.is_none(), "grading is deferred to finish");
}

#[tokio::test]
async fn submit_to_foreign_simulation_is_not_found() {
    let h = harness_with(5, ScriptedGrader::with_scores(HashMap::new()));
    let started = h.service.start(USER).await.unwrap();

    let err = h
        .service
        .submit_answer(
            "someone-else",
            &started.simulation.id,
            &started.simulation.question_ids[0],
            "answer",
            &started.timer.id,
            0,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn get_question_navigates_frozen_order() {
    let h = harness_with(5, ScriptedGrader::with_scores(HashMap::new()));
    let (simulation_id, question_ids) = start_and_submit(&h, &[words(40)]).await;

    // Already answered: read-only, next id comes from the frozen list.
    let view = h
        .service
        .get_question(USER, &simulation_id, &question_ids[0], 0)
        .await
        .unwrap();
    assert!(!view.can_edit);
    assert!(view.prior_answer.is_some());
    assert_eq!(view.next_question_id.as_ref(), Some(&question_ids[1]));
    assert!(!view.is_last_question);

    // Unanswered question is editable; index 4 is the last.
    let view = h
        .service
        .get_question(USER, &simulation_id, &question_ids[4], 4)
        .await
        .unwrap();
    assert!(view.can_edit);
    assert!(view.prior_answer.is_none());
    assert!(view.next_question_id.is_none());
    assert!(view.is_last_question);

    // Index and id must agree with the frozen ordering.
    let err = h
        .service
        .get_question(USER, &simulation_id, &question_ids[2], 0)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn finish_requires_all_five_answers() {
    let h = harness_with(5, ScriptedGrader::with_scores(HashMap::new()));
    let (simulation_id, _) = start_and_submit(&h, &[words(30), words(30), words(30)]).await;

    let err = h.service.finish(USER, &simulation_id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn full_run_scores_rounded_mean_of_grades() {
    // Five answers of the given word lengths, graded 60/70/80/90/100.
    let answers: Vec<String> = [120, 80, 200, 150, 90].iter().map(|n| words(*n)).collect();
    let scores: HashMap<String, i32> = answers
        .iter()
        .cloned()
        .zip([60, 70, 80, 90, 100])
        .collect();

    let h = harness_with(5, ScriptedGrader::with_scores(scores));
    let (simulation_id, _) = start_and_submit(&h, &answers).await;

    let finished = h.service.finish(USER, &simulation_id).await.unwrap();
    assert_eq!(finished.overall_score, 80);
    assert!(finished.passed);
    assert_eq!(finished.attempts.len(), 5);
    assert!(finished.attempts.iter().all(|a| a.ai_score.is_some()));

    let word_counts: Vec<i64> = finished.attempts.iter().map(|a| a.word_count).collect();
    assert_eq!(word_counts, vec![120, 80, 200, 150, 90]);

    let sims = h.simulations.read().await;
    let sim = sims.get(&simulation_id).unwrap();
    assert_eq!(sim.status, SimulationStatus::Completed);
    assert_eq!(sim.overall_score, Some(80));
    assert_eq!(sim.passed, Some(true));
    assert!(sim.ended_at.is_some());
}

#[tokio::test]
async fn pass_verdict_uses_fifty_not_the_app_bar() {
    for (uniform_score, expect_pass) in [(49, false), (50, true), (80, true)] {
        let answers: Vec<String> = (0..5).map(|i| words(20 + i)).collect();
        let scores: HashMap<String, i32> = answers
            .iter()
            .cloned()
            .map(|a| (a, uniform_score))
            .collect();

        let h = harness_with(5, ScriptedGrader::with_scores(scores));
        let (simulation_id, _) = start_and_submit(&h, &answers).await;

        let finished = h.service.finish(USER, &simulation_id).await.unwrap();
        assert_eq!(finished.overall_score, uniform_score);
        assert_eq!(
            finished.passed, expect_pass,
            "score {} should pass={}",
            uniform_score, expect_pass
        );
    }
    assert_eq!(SimulationService::app_pass_threshold(), 80);
}

#[tokio::test]
async fn grading_fan_out_is_all_or_nothing() {
    let answers: Vec<String> = (0..5).map(|i| words(60 + i)).collect();
    let scores: HashMap<String, i32> =
        answers.iter().cloned().map(|a| (a, 75)).collect();
    let grader = ScriptedGrader::failing_once_for(scores, &answers[2]);

    let h = harness_with(5, grader);
    let (simulation_id, _) = start_and_submit(&h, &answers).await;

    let err = h.service.finish(USER, &simulation_id).await.unwrap_err();
    assert!(matches!(err, AppError::Upstream(_)));

    // Zero attempts graded, simulation still running.
    {
        let rows = h.attempts.read().await;
        assert!(rows.iter().all(|a| a.ai_score.is_none()));
        let sims = h.simulations.read().await;
        let sim = sims.get(&simulation_id).unwrap();
        assert_eq!(sim.status, SimulationStatus::InProgress);
        assert!(sim.ended_at.is_none());
    }

    // The outage was transient; the retry grades everything.
    let finished = h.service.finish(USER, &simulation_id).await.unwrap();
    assert_eq!(finished.overall_score, 75);
    assert!(finished.passed);
}

#[tokio::test]
async fn fail_zeroes_score_without_grading() {
    let h = harness_with(5, ScriptedGrader::with_scores(HashMap::new()));
    let (simulation_id, _) =
        start_and_submit(&h, &[words(50), words(60), words(70)]).await;

    h.service
        .fail(USER, &simulation_id, "left window")
        .await
        .unwrap();

    let sims = h.simulations.read().await;
    let sim = sims.get(&simulation_id).unwrap();
    assert_eq!(sim.status, SimulationStatus::Failed);
    assert_eq!(sim.overall_score, Some(0));
    assert_eq!(sim.passed, Some(false));
    assert!(sim.ended_at.is_some());
    assert_eq!(sim.failure_reason.as_deref(), Some("left window"));

    // The three submitted answers stay ungraded.
    let rows = h.attempts.read().await;
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|a| a.ai_score.is_none()));
}

#[tokio::test]
async fn finish_after_fail_is_conflict() {
    let h = harness_with(5, ScriptedGrader::with_scores(HashMap::new()));
    let (simulation_id, _) = start_and_submit(&h, &[words(40), words(45)]).await;

    h.service
        .fail(USER, &simulation_id, "left window")
        .await
        .unwrap();

    let err = h.service.finish(USER, &simulation_id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = h
        .service
        .fail(USER, &simulation_id, "again")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn submit_after_finish_is_conflict() {
    let answers: Vec<String> = (0..5).map(|i| words(30 + i)).collect();
    let scores: HashMap<String, i32> =
        answers.iter().cloned().map(|a| (a, 65)).collect();

    let h = harness_with(6, ScriptedGrader::with_scores(scores));
    let (simulation_id, question_ids) = start_and_submit(&h, &answers).await;

    h.service.finish(USER, &simulation_id).await.unwrap();

    let err = h
        .service
        .submit_answer(
            USER,
            &simulation_id,
            &question_ids[0],
            "late answer",
            "any-timer",
            0,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}
