use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Collection};

use crate::{
    db::Database,
    errors::AppResult,
    models::domain::{Lesson, Module, Subject},
};

/// Read-only access to the subject/module/lesson catalog. The catalog is
/// written by the content-management flows, not by this core.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_subject(&self, id: &str) -> AppResult<Option<Subject>>;
    async fn find_module(&self, id: &str) -> AppResult<Option<Module>>;
    async fn find_lesson(&self, id: &str) -> AppResult<Option<Lesson>>;
    async fn count_published_lessons(&self, module_id: &str) -> AppResult<i64>;
    async fn list_modules_by_subject(&self, subject_id: &str) -> AppResult<Vec<Module>>;
}

pub struct MongoCatalogRepository {
    subjects: Collection<Subject>,
    modules: Collection<Module>,
    lessons: Collection<Lesson>,
}

impl MongoCatalogRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            subjects: db.get_collection("subjects"),
            modules: db.get_collection("modules"),
            lessons: db.get_collection("lessons"),
        }
    }
}

#[async_trait]
impl CatalogRepository for MongoCatalogRepository {
    async fn find_subject(&self, id: &str) -> AppResult<Option<Subject>> {
        let subject = self.subjects.find_one(doc! { "id": id }).await?;
        Ok(subject)
    }

    async fn find_module(&self, id: &str) -> AppResult<Option<Module>> {
        let module = self.modules.find_one(doc! { "id": id }).await?;
        Ok(module)
    }

    async fn find_lesson(&self, id: &str) -> AppResult<Option<Lesson>> {
        let lesson = self.lessons.find_one(doc! { "id": id }).await?;
        Ok(lesson)
    }

    async fn count_published_lessons(&self, module_id: &str) -> AppResult<i64> {
        let count = self
            .lessons
            .count_documents(doc! { "module_id": module_id, "published": true })
            .await?;
        Ok(count as i64)
    }

    async fn list_modules_by_subject(&self, subject_id: &str) -> AppResult<Vec<Module>> {
        let modules = self
            .modules
            .find(doc! { "subject_id": subject_id })
            .sort(doc! { "order": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(modules)
    }
}
