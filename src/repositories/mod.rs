pub mod catalog_repository;
pub mod essay_attempt_repository;
pub mod essay_question_repository;
pub mod lesson_progress_repository;
pub mod module_progress_repository;
pub mod question_timer_repository;
pub mod simulation_repository;
pub mod subject_progress_repository;

pub use catalog_repository::{CatalogRepository, MongoCatalogRepository};
pub use essay_attempt_repository::{EssayAttemptRepository, MongoEssayAttemptRepository};
pub use essay_question_repository::{EssayQuestionRepository, MongoEssayQuestionRepository};
pub use lesson_progress_repository::{LessonProgressRepository, MongoLessonProgressRepository};
pub use module_progress_repository::{ModuleProgressRepository, MongoModuleProgressRepository};
pub use question_timer_repository::{MongoQuestionTimerRepository, QuestionTimerRepository};
pub use simulation_repository::{MongoSimulationRepository, SimulationRepository};
pub use subject_progress_repository::{MongoSubjectProgressRepository, SubjectProgressRepository};

#[cfg(test)]
pub use catalog_repository::MockCatalogRepository;
#[cfg(test)]
pub use essay_attempt_repository::MockEssayAttemptRepository;
#[cfg(test)]
pub use essay_question_repository::MockEssayQuestionRepository;
#[cfg(test)]
pub use lesson_progress_repository::MockLessonProgressRepository;
#[cfg(test)]
pub use module_progress_repository::MockModuleProgressRepository;
#[cfg(test)]
pub use question_timer_repository::MockQuestionTimerRepository;
#[cfg(test)]
pub use simulation_repository::MockSimulationRepository;
#[cfg(test)]
pub use subject_progress_repository::MockSubjectProgressRepository;
