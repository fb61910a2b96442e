pub mod catalog;
pub mod essay_attempt;
pub mod essay_question;
pub mod progress;
pub mod question_timer;
pub mod simulation;

pub use catalog::{Lesson, Module, Subject};
pub use essay_attempt::{EssayAttempt, EssayFeedback, EssayGrade};
pub use essay_question::EssayQuestion;
pub use progress::{LessonProgress, ModuleProgress, ProgressStatus, SubjectProgress};
pub use question_timer::QuestionTimer;
pub use simulation::{Simulation, SimulationStatus};
