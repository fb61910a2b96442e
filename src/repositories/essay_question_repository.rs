use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, from_document},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{db::Database, errors::AppResult, models::domain::EssayQuestion};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EssayQuestionRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<EssayQuestion>>;
    /// Questions eligible for simulations: those with a known paper year.
    async fn count_dated(&self) -> AppResult<i64>;
    /// Uniform random sample (without replacement) of eligible questions.
    async fn sample_dated(&self, size: usize) -> AppResult<Vec<EssayQuestion>>;
}

pub struct MongoEssayQuestionRepository {
    collection: Collection<EssayQuestion>,
}

impl MongoEssayQuestionRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("essay_questions");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for essay_questions collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let year_index = IndexModel::builder()
            .keys(doc! { "year": 1 })
            .options(IndexOptions::builder().name("year".to_string()).build())
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(year_index).await?;

        Ok(())
    }
}

#[async_trait]
impl EssayQuestionRepository for MongoEssayQuestionRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<EssayQuestion>> {
        let question = self.collection.find_one(doc! { "id": id }).await?;
        Ok(question)
    }

    async fn count_dated(&self) -> AppResult<i64> {
        let count = self
            .collection
            .count_documents(doc! { "year": { "$ne": null } })
            .await?;
        Ok(count as i64)
    }

    async fn sample_dated(&self, size: usize) -> AppResult<Vec<EssayQuestion>> {
        // $sample draws uniformly without replacement, so the randomness
        // lives server-side and the selection stays one round trip.
        let pipeline = vec![
            doc! { "$match": { "year": { "$ne": null } } },
            doc! { "$sample": { "size": size as i64 } },
        ];

        let docs: Vec<mongodb::bson::Document> =
            self.collection.aggregate(pipeline).await?.try_collect().await?;

        let mut questions = Vec::with_capacity(docs.len());
        for d in docs {
            let question = from_document(d).map_err(|e| {
                crate::errors::AppError::InternalError(format!(
                    "Failed to decode essay question: {}",
                    e
                ))
            })?;
            questions.push(question);
        }

        Ok(questions)
    }
}
