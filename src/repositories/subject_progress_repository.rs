use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::Database,
    errors::AppResult,
    models::domain::{progress::ProgressStatus, SubjectProgress},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubjectProgressRepository: Send + Sync {
    async fn find(&self, user_id: &str, subject_id: &str) -> AppResult<Option<SubjectProgress>>;
    /// Idempotent write of a freshly recomputed rollup row.
    async fn upsert(&self, progress: &SubjectProgress) -> AppResult<()>;
    /// Bump last_accessed_at without touching the computed fields.
    async fn touch_access(&self, user_id: &str, subject_id: &str, now: DateTime<Utc>)
        -> AppResult<()>;
}

pub struct MongoSubjectProgressRepository {
    collection: Collection<SubjectProgress>,
}

impl MongoSubjectProgressRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("subject_progress");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for subject_progress collection");

        let user_subject_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "subject_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_subject_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(user_subject_index).await?;

        Ok(())
    }
}

fn status_str(status: ProgressStatus) -> &'static str {
    match status {
        ProgressStatus::NotStarted => "NOT_STARTED",
        ProgressStatus::InProgress => "IN_PROGRESS",
        ProgressStatus::Completed => "COMPLETED",
    }
}

#[async_trait]
impl SubjectProgressRepository for MongoSubjectProgressRepository {
    async fn find(&self, user_id: &str, subject_id: &str) -> AppResult<Option<SubjectProgress>> {
        let progress = self
            .collection
            .find_one(doc! { "user_id": user_id, "subject_id": subject_id })
            .await?;
        Ok(progress)
    }

    async fn upsert(&self, progress: &SubjectProgress) -> AppResult<()> {
        let now = progress.modified_at.unwrap_or_else(Utc::now);
        self.collection
            .update_one(
                doc! { "user_id": &progress.user_id, "subject_id": &progress.subject_id },
                doc! {
                    "$set": {
                        "progress_percent": progress.progress_percent,
                        "status": status_str(progress.status),
                        "total_time_seconds": progress.total_time_seconds,
                        "last_accessed_at": now.to_rfc3339(),
                        "modified_at": now.to_rfc3339(),
                    },
                    "$setOnInsert": {
                        "id": &progress.id,
                        "created_at": now.to_rfc3339(),
                    },
                },
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn touch_access(
        &self,
        user_id: &str,
        subject_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.collection
            .update_one(
                doc! { "user_id": user_id, "subject_id": subject_id },
                doc! {
                    "$set": {
                        "last_accessed_at": now.to_rfc3339(),
                        "modified_at": now.to_rfc3339(),
                    },
                    "$setOnInsert": {
                        "id": uuid::Uuid::new_v4().to_string(),
                        "progress_percent": 0.0_f64,
                        "status": status_str(ProgressStatus::NotStarted),
                        "total_time_seconds": 0_i64,
                        "created_at": now.to_rfc3339(),
                    },
                },
            )
            .upsert(true)
            .await?;
        Ok(())
    }
}
