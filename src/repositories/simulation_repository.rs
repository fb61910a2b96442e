use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{db::Database, errors::AppResult, models::domain::Simulation};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SimulationRepository: Send + Sync {
    async fn create(&self, simulation: Simulation) -> AppResult<Simulation>;
    /// Scoped lookup: a simulation that exists but belongs to another user
    /// is indistinguishable from one that does not exist.
    async fn find_for_user(&self, id: &str, user_id: &str) -> AppResult<Option<Simulation>>;
    /// Terminal transition to COMPLETED. Returns false when the simulation
    /// had already ended (the guard lost a race).
    async fn complete(
        &self,
        id: &str,
        overall_score: i32,
        passed: bool,
        ended_at: DateTime<Utc>,
    ) -> AppResult<bool>;
    /// Terminal transition to FAILED. Returns false when already ended.
    async fn fail(&self, id: &str, reason: &str, ended_at: DateTime<Utc>) -> AppResult<bool>;
}

pub struct MongoSimulationRepository {
    collection: Collection<Simulation>,
}

impl MongoSimulationRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("simulations");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for simulations collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let user_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "started_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("user_started".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(user_index).await?;

        Ok(())
    }
}

#[async_trait]
impl SimulationRepository for MongoSimulationRepository {
    async fn create(&self, simulation: Simulation) -> AppResult<Simulation> {
        self.collection.insert_one(&simulation).await?;
        Ok(simulation)
    }

    async fn find_for_user(&self, id: &str, user_id: &str) -> AppResult<Option<Simulation>> {
        let simulation = self
            .collection
            .find_one(doc! { "id": id, "user_id": user_id })
            .await?;
        Ok(simulation)
    }

    async fn complete(
        &self,
        id: &str,
        overall_score: i32,
        passed: bool,
        ended_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        // ended_at: null in the filter makes the terminal transition
        // single-shot even under concurrent finish/fail calls.
        let result = self
            .collection
            .update_one(
                doc! { "id": id, "ended_at": null },
                doc! {
                    "$set": {
                        "status": "COMPLETED",
                        "ended_at": ended_at.to_rfc3339(),
                        "overall_score": overall_score,
                        "passed": passed,
                        "modified_at": ended_at.to_rfc3339(),
                    },
                },
            )
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn fail(&self, id: &str, reason: &str, ended_at: DateTime<Utc>) -> AppResult<bool> {
        let result = self
            .collection
            .update_one(
                doc! { "id": id, "ended_at": null },
                doc! {
                    "$set": {
                        "status": "FAILED",
                        "ended_at": ended_at.to_rfc3339(),
                        "overall_score": 0_i32,
                        "passed": false,
                        "failure_reason": reason,
                        "modified_at": ended_at.to_rfc3339(),
                    },
                },
            )
            .await?;
        Ok(result.modified_count == 1)
    }
}
