use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{
    bson::doc,
    options::{IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{db::Database, errors::AppResult, models::domain::QuestionTimer};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuestionTimerRepository: Send + Sync {
    async fn create(&self, timer: QuestionTimer) -> AppResult<QuestionTimer>;
    /// Stop the timer and return it with both timestamps set. None when
    /// the timer does not exist, belongs to another user, or was already
    /// consumed.
    async fn close(
        &self,
        timer_id: &str,
        user_id: &str,
        ended_at: DateTime<Utc>,
    ) -> AppResult<Option<QuestionTimer>>;
}

pub struct MongoQuestionTimerRepository {
    collection: Collection<QuestionTimer>,
}

impl MongoQuestionTimerRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("question_timers");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for question_timers collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;

        Ok(())
    }
}

#[async_trait]
impl QuestionTimerRepository for MongoQuestionTimerRepository {
    async fn create(&self, timer: QuestionTimer) -> AppResult<QuestionTimer> {
        self.collection.insert_one(&timer).await?;
        Ok(timer)
    }

    async fn close(
        &self,
        timer_id: &str,
        user_id: &str,
        ended_at: DateTime<Utc>,
    ) -> AppResult<Option<QuestionTimer>> {
        let timer = self
            .collection
            .find_one_and_update(
                doc! { "id": timer_id, "user_id": user_id, "ended_at": null },
                doc! { "$set": { "ended_at": ended_at.to_rfc3339() } },
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(timer)
    }
}
