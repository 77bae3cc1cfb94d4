use crate::{
    db::DbPool,
    entities::{
        category::{self, Entity as Category},
        EntityStatus,
    },
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CreateCategory {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Category directory with soft delete.
#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DbPool>,
}

impl CategoryService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateCategory) -> Result<category::Model, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Category name is required".to_string(),
            ));
        }

        category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description),
            status: Set(EntityStatus::Active.as_str().to_string()),
            created_at: Set(Utc::now()),
            updated_at: Set(Some(Utc::now())),
        }
        .insert(&*self.db)
        .await
        .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        category_id: Uuid,
        patch: UpdateCategory,
    ) -> Result<category::Model, ServiceError> {
        let existing = self.get(category_id).await?;

        let mut active: category::ActiveModel = existing.into();
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Category name is required".to_string(),
                ));
            }
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = patch.description {
            active.description = Set(Some(description));
        }
        active.updated_at = Set(Some(Utc::now()));

        active.update(&*self.db).await.map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn deactivate(&self, category_id: Uuid) -> Result<category::Model, ServiceError> {
        self.set_status(category_id, EntityStatus::Inactive).await
    }

    #[instrument(skip(self))]
    pub async fn activate(&self, category_id: Uuid) -> Result<category::Model, ServiceError> {
        self.set_status(category_id, EntityStatus::Active).await
    }

    async fn set_status(
        &self,
        category_id: Uuid,
        status: EntityStatus,
    ) -> Result<category::Model, ServiceError> {
        let existing = self.get(category_id).await?;
        if existing.status == status.as_str() {
            return Ok(existing);
        }
        let mut active: category::ActiveModel = existing.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await.map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, category_id: Uuid) -> Result<category::Model, ServiceError> {
        Category::find_by_id(category_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Category with ID {} not found", category_id))
            })
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        status: Option<EntityStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<category::Model>, u64), ServiceError> {
        let mut find = Category::find();
        if let Some(status) = status {
            find = find.filter(category::Column::Status.eq(status.as_str()));
        }

        let paginator = find
            .order_by_asc(category::Column::Name)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }
}
