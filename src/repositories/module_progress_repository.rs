use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::Database,
    errors::AppResult,
    models::domain::{progress::ProgressStatus, ModuleProgress},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModuleProgressRepository: Send + Sync {
    async fn find_by_subject(&self, user_id: &str, subject_id: &str)
        -> AppResult<Vec<ModuleProgress>>;
    /// Idempotent write of a freshly recomputed rollup row.
    async fn upsert(&self, progress: &ModuleProgress) -> AppResult<()>;
    /// Bump last_accessed_at without touching the computed fields.
    async fn touch_access(
        &self,
        user_id: &str,
        module_id: &str,
        subject_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()>;
}

pub struct MongoModuleProgressRepository {
    collection: Collection<ModuleProgress>,
}

impl MongoModuleProgressRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("module_progress");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for module_progress collection");

        let user_module_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "module_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_module_unique".to_string())
                    .build(),
            )
            .build();

        let user_subject_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "subject_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_subject".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(user_module_index).await?;
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
impl ModuleProgressRepository for MongoModuleProgressRepository {
    async fn find_by_subject(
        &self,
        user_id: &str,
        subject_id: &str,
    ) -> AppResult<Vec<ModuleProgress>> {
        let rows = self
            .collection
            .find(doc! { "user_id": user_id, "subject_id": subject_id })
            .await?
            .try_collect()
            .await?;
        Ok(rows)
    }

    async fn upsert(&self, progress: &ModuleProgress) -> AppResult<()> {
        let now = progress.modified_at.unwrap_or_else(Utc::now);
        self.collection
            .update_one(
                doc! { "user_id": &progress.user_id, "module_id": &progress.module_id },
                doc! {
                    "$set": {
                        "subject_id": &progress.subject_id,
                        "completed_lessons": progress.completed_lessons,
                        "total_lessons": progress.total_lessons,
                        "progress_percent": progress.progress_percent,
                        "status": status_str(progress.status),
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
        module_id: &str,
        subject_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.collection
            .update_one(
                doc! { "user_id": user_id, "module_id": module_id },
                doc! {
                    "$set": {
                        "last_accessed_at": now.to_rfc3339(),
                        "modified_at": now.to_rfc3339(),
                    },
                    "$setOnInsert": {
                        "id": uuid::Uuid::new_v4().to_string(),
                        "subject_id": subject_id,
                        "completed_lessons": 0_i64,
                        "total_lessons": 0_i64,
                        "progress_percent": 0.0_f64,
                        "status": status_str(ProgressStatus::NotStarted),
                        "created_at": now.to_rfc3339(),
                    },
                },
            )
            .upsert(true)
            .await?;
        Ok(())
    }
}
