use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::LessonProgress};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LessonProgressRepository: Send + Sync {
    /// Create-if-absent. A no-op when the row already exists, so repeat
    /// lesson visits never error.
    async fn ensure_exists(&self, template: &LessonProgress) -> AppResult<()>;

    /// Upsert the watch position and, when `completes` is set, flip
    /// `is_completed` exactly once. Returns true iff this call caused the
    /// not-completed -> completed transition.
    async fn apply_video_progress(
        &self,
        template: &LessonProgress,
        watched_seconds: f64,
        completes: bool,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Accumulate study time on the row ($inc semantics).
    async fn add_time_spent(&self, template: &LessonProgress, seconds: i64) -> AppResult<()>;

    async fn count_completed(&self, user_id: &str, module_id: &str) -> AppResult<i64>;
    /// True when any lesson in the module has nonzero watch time or is
    /// completed for this user.
    async fn any_started(&self, user_id: &str, module_id: &str) -> AppResult<bool>;
    async fn sum_time_spent(&self, user_id: &str, subject_id: &str) -> AppResult<i64>;
}

pub struct MongoLessonProgressRepository {
    collection: Collection<LessonProgress>,
}

impl MongoLessonProgressRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("lesson_progress");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for lesson_progress collection");

        let user_lesson_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "lesson_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("user_lesson_unique".to_string())
                    .build(),
            )
            .build();

        let user_module_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "module_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_module".to_string())
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

        self.collection.create_index(user_lesson_index).await?;
        self.collection.create_index(user_module_index).await?;
        self.collection.create_index(user_subject_index).await?;

        Ok(())
    }

    fn identity_on_insert(template: &LessonProgress) -> mongodb::bson::Document {
        doc! {
            "id": &template.id,
            "module_id": &template.module_id,
            "subject_id": &template.subject_id,
            "is_completed": false,
            "time_spent_seconds": 0_i64,
            "created_at": template
                .created_at
                .unwrap_or_else(Utc::now)
                .to_rfc3339(),
        }
    }
}

#[async_trait]
impl LessonProgressRepository for MongoLessonProgressRepository {
    async fn ensure_exists(&self, template: &LessonProgress) -> AppResult<()> {
        let on_insert = doc! {
            "id": &template.id,
            "module_id": &template.module_id,
            "subject_id": &template.subject_id,
            "video_watched_seconds": template.video_watched_seconds,
            "is_completed": false,
            "time_spent_seconds": 0_i64,
            "created_at": template.created_at.unwrap_or_else(Utc::now).to_rfc3339(),
            "modified_at": template.modified_at.unwrap_or_else(Utc::now).to_rfc3339(),
        };
        self.collection
            .update_one(
                doc! { "user_id": &template.user_id, "lesson_id": &template.lesson_id },
                doc! { "$setOnInsert": on_insert },
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn apply_video_progress(
        &self,
        template: &LessonProgress,
        watched_seconds: f64,
        completes: bool,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.collection
            .update_one(
                doc! { "user_id": &template.user_id, "lesson_id": &template.lesson_id },
                doc! {
                    "$set": {
                        "video_watched_seconds": watched_seconds,
                        "modified_at": now.to_rfc3339(),
                    },
                    "$setOnInsert": Self::identity_on_insert(template),
                },
            )
            .upsert(true)
            .await?;

        if !completes {
            return Ok(false);
        }

        // Completion is monotonic: the filter only matches rows that are
        // not yet completed, so the flip happens at most once and the
        // modified count tells us whether this ping caused it.
        let result = self
            .collection
            .update_one(
                doc! {
                    "user_id": &template.user_id,
                    "lesson_id": &template.lesson_id,
                    "is_completed": false,
                },
                doc! {
                    "$set": {
                        "is_completed": true,
                        "completed_at": now.to_rfc3339(),
                        "modified_at": now.to_rfc3339(),
                    },
                },
            )
            .await?;

        Ok(result.modified_count == 1)
    }

    async fn add_time_spent(&self, template: &LessonProgress, seconds: i64) -> AppResult<()> {
        let mut on_insert = Self::identity_on_insert(template);
        on_insert.remove("time_spent_seconds");
        on_insert.insert("video_watched_seconds", 0.0_f64);

        self.collection
            .update_one(
                doc! { "user_id": &template.user_id, "lesson_id": &template.lesson_id },
                doc! {
                    "$inc": { "time_spent_seconds": seconds },
                    "$set": { "modified_at": Utc::now().to_rfc3339() },
                    "$setOnInsert": on_insert,
                },
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn count_completed(&self, user_id: &str, module_id: &str) -> AppResult<i64> {
        let count = self
            .collection
            .count_documents(doc! {
                "user_id": user_id,
                "module_id": module_id,
                "is_completed": true,
            })
            .await?;
        Ok(count as i64)
    }

    async fn any_started(&self, user_id: &str, module_id: &str) -> AppResult<bool> {
        let row = self
            .collection
            .find_one(doc! {
                "user_id": user_id,
                "module_id": module_id,
                "$or": [
                    { "is_completed": true },
                    { "video_watched_seconds": { "$gt": 0.0 } },
                ],
            })
            .await?;
        Ok(row.is_some())
    }

    async fn sum_time_spent(&self, user_id: &str, subject_id: &str) -> AppResult<i64> {
        let pipeline = vec![
            doc! { "$match": { "user_id": user_id, "subject_id": subject_id } },
            doc! { "$group": { "_id": null, "total": { "$sum": "$time_spent_seconds" } } },
        ];

        let mut cursor = self.collection.aggregate(pipeline).await?;
        if let Some(row) = cursor.try_next().await? {
            let total = row
                .get_i64("total")
                .or_else(|_| row.get_i32("total").map(i64::from))
                .unwrap_or(0);
            return Ok(total);
        }
        Ok(0)
    }
}
