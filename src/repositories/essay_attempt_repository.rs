use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{is_duplicate_key, AppError, AppResult},
    models::domain::{EssayAttempt, EssayGrade},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EssayAttemptRepository: Send + Sync {
    /// Insert a new attempt. A second submission for the same
    /// (simulation, question) pair violates the unique index and surfaces
    /// as Conflict, never as a duplicate row.
    async fn create(&self, attempt: EssayAttempt) -> AppResult<EssayAttempt>;
    async fn find_one(
        &self,
        simulation_id: &str,
        question_id: &str,
    ) -> AppResult<Option<EssayAttempt>>;
    async fn find_by_simulation(&self, simulation_id: &str) -> AppResult<Vec<EssayAttempt>>;
    async fn count_by_simulation(&self, simulation_id: &str) -> AppResult<i64>;
    /// Populate the grading fields of one attempt. The ai_score: null
    /// guard makes the write single-shot.
    async fn record_grade(&self, attempt_id: &str, grade: &EssayGrade) -> AppResult<()>;
}

pub struct MongoEssayAttemptRepository {
    collection: Collection<EssayAttempt>,
}

impl MongoEssayAttemptRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("essay_attempts");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for essay_attempts collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        // Partial so the uniqueness only binds simulation attempts;
        // standalone practice may answer the same question repeatedly.
        let simulation_question_index = IndexModel::builder()
            .keys(doc! { "simulation_id": 1, "question_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(doc! { "is_simulation": true })
                    .name("simulation_question_unique".to_string())
                    .build(),
            )
            .build();

        let user_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "submitted_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("user_submitted".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(simulation_question_index).await?;
        self.collection.create_index(user_index).await?;

        Ok(())
    }
}

#[async_trait]
impl EssayAttemptRepository for MongoEssayAttemptRepository {
    async fn create(&self, attempt: EssayAttempt) -> AppResult<EssayAttempt> {
        match self.collection.insert_one(&attempt).await {
            Ok(_) => Ok(attempt),
            Err(err) if is_duplicate_key(&err) => Err(AppError::Conflict(format!(
                "An answer has already been submitted for question '{}' in this simulation",
                attempt.question_id
            ))),
            Err(err) => Err(err.into()),
        }
    }

    async fn find_one(
        &self,
        simulation_id: &str,
        question_id: &str,
    ) -> AppResult<Option<EssayAttempt>> {
        let attempt = self
            .collection
            .find_one(doc! { "simulation_id": simulation_id, "question_id": question_id })
            .await?;
        Ok(attempt)
    }

    async fn find_by_simulation(&self, simulation_id: &str) -> AppResult<Vec<EssayAttempt>> {
        let attempts = self
            .collection
            .find(doc! { "simulation_id": simulation_id })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn count_by_simulation(&self, simulation_id: &str) -> AppResult<i64> {
        let count = self
            .collection
            .count_documents(doc! { "simulation_id": simulation_id })
            .await?;
        Ok(count as i64)
    }

    async fn record_grade(&self, attempt_id: &str, grade: &EssayGrade) -> AppResult<()> {
        let feedback = to_bson(&grade.feedback)?;
        let strengths = to_bson(&grade.strengths)?;
        let improvements = to_bson(&grade.improvements)?;

        self.collection
            .update_one(
                doc! { "id": attempt_id, "ai_score": null },
                doc! {
                    "$set": {
                        "ai_score": grade.score,
                        "band": &grade.band,
                        "feedback": feedback,
                        "strengths": strengths,
                        "improvements": improvements,
                        "sample_answer": &grade.sample_answer,
                        "tokens_used": grade.tokens_used,
                        "modified_at": Utc::now().to_rfc3339(),
                    },
                },
            )
            .await?;
        Ok(())
    }
}
