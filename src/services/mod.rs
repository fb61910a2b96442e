pub mod grading_service;
pub mod progress_service;
pub mod simulation_service;

pub use grading_service::{EssayGrader, GradeEssayInput, OpenAiEssayGrader};
pub use progress_service::ProgressService;
pub use simulation_service::SimulationService;
