use crate::{
    db::DbPool,
    entities::{
        staff_member::{self, Entity as StaffMember},
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
pub struct CreateStaffMember {
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateStaffMember {
    pub name: Option<String>,
    pub role: Option<String>,
}

/// Staff directory with soft delete. Email is the stable identifier and
/// cannot be changed after creation.
#[derive(Clone)]
pub struct StaffService {
    db: Arc<DbPool>,
}

impl StaffService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        input: CreateStaffMember,
    ) -> Result<staff_member::Model, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Staff name is required".to_string(),
            ));
        }
        let email = input.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(ServiceError::ValidationError(
                "Staff email is required".to_string(),
            ));
        }

        let existing = StaffMember::find()
            .filter(staff_member::Column::Email.eq(&email))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A staff member with email {} already exists",
                email
            )));
        }

        staff_member::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            email: Set(email),
            role: Set(input.role),
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
        staff_id: Uuid,
        patch: UpdateStaffMember,
    ) -> Result<staff_member::Model, ServiceError> {
        let existing = self.get(staff_id).await?;

        let mut active: staff_member::ActiveModel = existing.into();
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Staff name is required".to_string(),
                ));
            }
            active.name = Set(name.trim().to_string());
        }
        if let Some(role) = patch.role {
            active.role = Set(role);
        }
        active.updated_at = Set(Some(Utc::now()));

        active.update(&*self.db).await.map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn deactivate(&self, staff_id: Uuid) -> Result<staff_member::Model, ServiceError> {
        self.set_status(staff_id, EntityStatus::Inactive).await
    }

    #[instrument(skip(self))]
    pub async fn activate(&self, staff_id: Uuid) -> Result<staff_member::Model, ServiceError> {
        self.set_status(staff_id, EntityStatus::Active).await
    }

    async fn set_status(
        &self,
        staff_id: Uuid,
        status: EntityStatus,
    ) -> Result<staff_member::Model, ServiceError> {
        let existing = self.get(staff_id).await?;
        if existing.status == status.as_str() {
            return Ok(existing);
        }
        let mut active: staff_member::ActiveModel = existing.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await.map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, staff_id: Uuid) -> Result<staff_member::Model, ServiceError> {
        StaffMember::find_by_id(staff_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Staff member with ID {} not found", staff_id))
            })
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        status: Option<EntityStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<staff_member::Model>, u64), ServiceError> {
        let mut find = StaffMember::find();
        if let Some(status) = status {
            find = find.filter(staff_member::Column::Status.eq(status.as_str()));
        }

        let paginator = find
            .order_by_asc(staff_member::Column::Name)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }
}
