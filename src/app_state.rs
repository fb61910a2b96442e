use std::{sync::Arc, time::Duration};

use crate::{
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        MongoCatalogRepository, MongoEssayAttemptRepository, MongoEssayQuestionRepository,
        MongoLessonProgressRepository, MongoModuleProgressRepository,
        MongoQuestionTimerRepository, MongoSimulationRepository, MongoSubjectProgressRepository,
    },
    services::{OpenAiEssayGrader, ProgressService, SimulationService},
};

#[derive(Clone)]
pub struct AppState {
    pub progress_service: Arc<ProgressService>,
    pub simulation_service: Arc<SimulationService>,
    pub db: Database,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let catalog_repository = Arc::new(MongoCatalogRepository::new(&db));

        let lesson_progress_repository = Arc::new(MongoLessonProgressRepository::new(&db));
        lesson_progress_repository.ensure_indexes().await?;
        let module_progress_repository = Arc::new(MongoModuleProgressRepository::new(&db));
        module_progress_repository.ensure_indexes().await?;
        let subject_progress_repository = Arc::new(MongoSubjectProgressRepository::new(&db));
        subject_progress_repository.ensure_indexes().await?;

        let progress_service = Arc::new(ProgressService::new(
            catalog_repository,
            lesson_progress_repository,
            module_progress_repository,
            subject_progress_repository,
        ));

        let question_repository = Arc::new(MongoEssayQuestionRepository::new(&db));
        question_repository.ensure_indexes().await?;
        let simulation_repository = Arc::new(MongoSimulationRepository::new(&db));
        simulation_repository.ensure_indexes().await?;
        let attempt_repository = Arc::new(MongoEssayAttemptRepository::new(&db));
        attempt_repository.ensure_indexes().await?;
        let timer_repository = Arc::new(MongoQuestionTimerRepository::new(&db));
        timer_repository.ensure_indexes().await?;

        let grader = Arc::new(OpenAiEssayGrader::new(
            &config.openai_api_key,
            &config.grading_model,
            Duration::from_secs(config.grading_timeout_seconds),
        ));

        let simulation_service = Arc::new(SimulationService::new(
            simulation_repository,
            attempt_repository,
            question_repository,
            timer_repository,
            grader,
        ));

        Ok(Self {
            progress_service,
            simulation_service,
            db,
            config: Arc::new(config),
        })
    }
}
