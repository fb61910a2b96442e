use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    constants::VIDEO_COMPLETION_THRESHOLD,
    errors::{AppError, AppResult},
    models::domain::{
        progress::ProgressStatus, Lesson, LessonProgress, ModuleProgress, SubjectProgress,
    },
    repositories::{
        CatalogRepository, LessonProgressRepository, ModuleProgressRepository,
        SubjectProgressRepository,
    },
};

/// Completion percentage of a parent with `completed` of `total` children.
fn completion_percent(completed: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    completed as f64 / total as f64 * 100.0
}

/// Unweighted mean. Subject progress deliberately averages module
/// percentages rather than weighting by lesson count, mirroring how the
/// product has always reported it.
fn mean_percent(percents: &[f64]) -> f64 {
    if percents.is_empty() {
        return 0.0;
    }
    percents.iter().sum::<f64>() / percents.len() as f64
}

/// Shared status rule for both rollup levels: COMPLETED iff every child is
/// completed and there is at least one child; IN_PROGRESS iff anything has
/// started; NOT_STARTED otherwise.
fn rollup_status(children_completed: i64, children_total: i64, any_progress: bool) -> ProgressStatus {
    if children_total > 0 && children_completed == children_total {
        ProgressStatus::Completed
    } else if children_completed > 0 || any_progress {
        ProgressStatus::InProgress
    } else {
        ProgressStatus::NotStarted
    }
}

/// Whether a watch position completes the lesson. Unknown duration never
/// completes; that has to stay explicit rather than defaulting.
fn video_completes(current_time_seconds: f64, video_duration_seconds: Option<f64>) -> bool {
    match video_duration_seconds {
        Some(duration) => current_time_seconds >= duration * VIDEO_COMPLETION_THRESHOLD,
        None => false,
    }
}

pub struct SubjectOverview {
    pub subject: Option<SubjectProgress>,
    pub modules: Vec<ModuleProgress>,
}

/// Maintains the Lesson -> Module -> Subject completion hierarchy.
/// Every recompute re-reads current child state, so repeated or
/// interleaved cascades converge on the same result.
pub struct ProgressService {
    catalog: Arc<dyn CatalogRepository>,
    lesson_progress: Arc<dyn LessonProgressRepository>,
    module_progress: Arc<dyn ModuleProgressRepository>,
    subject_progress: Arc<dyn SubjectProgressRepository>,
}

impl ProgressService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        lesson_progress: Arc<dyn LessonProgressRepository>,
        module_progress: Arc<dyn ModuleProgressRepository>,
        subject_progress: Arc<dyn SubjectProgressRepository>,
    ) -> Self {
        Self {
            catalog,
            lesson_progress,
            module_progress,
            subject_progress,
        }
    }

    async fn require_lesson(&self, lesson_id: &str) -> AppResult<Lesson> {
        self.catalog
            .find_lesson(lesson_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lesson with id '{}' not found", lesson_id)))
    }

    /// First-view bookkeeping: creates the LessonProgress row if absent
    /// and bumps last_accessed_at on the module and subject rows without
    /// recomputing percentages. Safe to call on every visit.
    pub async fn record_lesson_access(&self, user_id: &str, lesson_id: &str) -> AppResult<()> {
        let lesson = self.require_lesson(lesson_id).await?;
        let template =
            LessonProgress::new(user_id, lesson_id, &lesson.module_id, &lesson.subject_id);

        self.lesson_progress.ensure_exists(&template).await?;

        let now = Utc::now();
        self.module_progress
            .touch_access(user_id, &lesson.module_id, &lesson.subject_id, now)
            .await?;
        self.subject_progress
            .touch_access(user_id, &lesson.subject_id, now)
            .await?;

        Ok(())
    }

    /// Video-position ping. Cascades a module + subject recompute only
    /// when this particular ping pushed the lesson over the completion
    /// threshold.
    pub async fn record_video_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
        current_time_seconds: f64,
    ) -> AppResult<()> {
        if !current_time_seconds.is_finite() || current_time_seconds < 0.0 {
            return Err(AppError::Validation(
                "currentTimeSeconds must be a non-negative number".to_string(),
            ));
        }

        let lesson = self.require_lesson(lesson_id).await?;
        let completes = video_completes(current_time_seconds, lesson.video_duration_seconds);
        let template =
            LessonProgress::new(user_id, lesson_id, &lesson.module_id, &lesson.subject_id);

        let transitioned = self
            .lesson_progress
            .apply_video_progress(&template, current_time_seconds, completes, Utc::now())
            .await?;

        if transitioned {
            log::info!(
                "Lesson {} completed for user {}; recomputing rollups",
                lesson_id,
                user_id
            );
            self.recompute_module(user_id, &lesson.module_id).await?;
            self.recompute_subject(user_id, &lesson.subject_id).await?;
        }

        Ok(())
    }

    /// Accumulates study time against the lesson. Feeds the subject-level
    /// total; never cascades a status change.
    pub async fn record_time_spent(
        &self,
        user_id: &str,
        lesson_id: &str,
        seconds: i64,
    ) -> AppResult<()> {
        if seconds < 0 {
            return Err(AppError::Validation(
                "secondsSpent must be non-negative".to_string(),
            ));
        }

        let lesson = self.require_lesson(lesson_id).await?;
        let template =
            LessonProgress::new(user_id, lesson_id, &lesson.module_id, &lesson.subject_id);

        self.lesson_progress.add_time_spent(&template, seconds).await
    }

    /// Recompute one module's rollup from its lesson rows. Idempotent:
    /// the result depends only on current child state.
    pub async fn recompute_module(
        &self,
        user_id: &str,
        module_id: &str,
    ) -> AppResult<ModuleProgress> {
        let module = self.catalog.find_module(module_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Module with id '{}' not found", module_id))
        })?;

        let total = self.catalog.count_published_lessons(module_id).await?;
        let completed = self.lesson_progress.count_completed(user_id, module_id).await?;
        let any_started = self.lesson_progress.any_started(user_id, module_id).await?;

        let progress = ModuleProgress {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            module_id: module_id.to_string(),
            subject_id: module.subject_id.clone(),
            completed_lessons: completed,
            total_lessons: total,
            progress_percent: completion_percent(completed, total),
            status: rollup_status(completed, total, any_started),
            last_accessed_at: None,
            created_at: None,
            modified_at: Some(Utc::now()),
        };

        self.module_progress.upsert(&progress).await?;
        Ok(progress)
    }

    /// Recompute one subject's rollup from freshly read module rows.
    /// Modules with no progress row count as zero percent.
    pub async fn recompute_subject(
        &self,
        user_id: &str,
        subject_id: &str,
    ) -> AppResult<SubjectProgress> {
        let subject = self.catalog.find_subject(subject_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("Subject with id '{}' not found", subject_id))
        })?;

        let modules = self.catalog.list_modules_by_subject(subject_id).await?;
        let rows = self.module_progress.find_by_subject(user_id, subject_id).await?;

        let mut percents = Vec::with_capacity(modules.len());
        let mut completed_modules = 0_i64;
        for module in &modules {
            let row = rows.iter().find(|r| r.module_id == module.id);
            percents.push(row.map(|r| r.progress_percent).unwrap_or(0.0));
            if row.map(|r| r.status) == Some(ProgressStatus::Completed) {
                completed_modules += 1;
            }
        }

        let any_progress = percents.iter().any(|p| *p > 0.0);
        let total_time = self.lesson_progress.sum_time_spent(user_id, subject_id).await?;

        let progress = SubjectProgress {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            subject_id: subject.id.clone(),
            progress_percent: mean_percent(&percents),
            status: rollup_status(completed_modules, modules.len() as i64, any_progress),
            total_time_seconds: total_time,
            last_accessed_at: Some(Utc::now()),
            created_at: None,
            modified_at: Some(Utc::now()),
        };

        self.subject_progress.upsert(&progress).await?;
        Ok(progress)
    }

    pub async fn get_subject_overview(
        &self,
        user_id: &str,
        subject_id: &str,
    ) -> AppResult<SubjectOverview> {
        if self.catalog.find_subject(subject_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Subject with id '{}' not found",
                subject_id
            )));
        }

        let subject = self.subject_progress.find(user_id, subject_id).await?;
        let modules = self.module_progress.find_by_subject(user_id, subject_id).await?;

        Ok(SubjectOverview { subject, modules })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_percent_handles_empty_module() {
        assert_eq!(completion_percent(0, 0), 0.0);
        assert_eq!(completion_percent(3, 4), 75.0);
        assert_eq!(completion_percent(4, 4), 100.0);
    }

    #[test]
    fn mean_percent_is_unweighted() {
        assert_eq!(mean_percent(&[100.0, 50.0, 0.0]), 50.0);
        assert_eq!(mean_percent(&[]), 0.0);
    }

    #[test]
    fn rollup_status_follows_invariant() {
        assert_eq!(rollup_status(0, 0, false), ProgressStatus::NotStarted);
        assert_eq!(rollup_status(0, 4, false), ProgressStatus::NotStarted);
        assert_eq!(rollup_status(0, 4, true), ProgressStatus::InProgress);
        assert_eq!(rollup_status(2, 4, true), ProgressStatus::InProgress);
        assert_eq!(rollup_status(4, 4, true), ProgressStatus::Completed);
        // Empty parents are never COMPLETED.
        assert_eq!(rollup_status(0, 0, true), ProgressStatus::InProgress);
    }

    #[test]
    fn video_completes_at_ninety_percent_boundary() {
        assert!(!video_completes(89.0, Some(100.0)));
        assert!(video_completes(90.0, Some(100.0)));
        assert!(video_completes(100.0, Some(100.0)));
    }

    #[test]
    fn unknown_duration_never_completes() {
        assert!(!video_completes(10_000.0, None));
    }
}
