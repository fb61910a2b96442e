pub mod grading_prompt;

/// Fraction of a lesson video that must be watched before the lesson
/// auto-completes.
pub const VIDEO_COMPLETION_THRESHOLD: f64 = 0.9;

/// Total time budget for a full mock exam, in seconds (3 hours).
pub const EXAM_TIME_BUDGET_SECONDS: i64 = 10_800;

/// Number of essay questions in every simulation.
pub const SIMULATION_QUESTION_COUNT: usize = 5;

/// Overall score at or above which a simulation counts as a pass. Matches
/// the real FE-1 pass mark.
pub const REAL_PASS_THRESHOLD: i32 = 50;

/// Stricter bar surfaced to the UI for "excellence" labelling. Does not
/// affect the pass/fail verdict.
pub const APP_PASS_THRESHOLD: i32 = 80;
