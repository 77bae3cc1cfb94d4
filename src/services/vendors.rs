use crate::{
    db::DbPool,
    entities::{
        vendor::{self, Entity as Vendor},
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
pub struct CreateVendor {
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateVendor {
    pub name: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Vendor directory with soft delete.
#[derive(Clone)]
pub struct VendorService {
    db: Arc<DbPool>,
}

impl VendorService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateVendor) -> Result<vendor::Model, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Vendor name is required".to_string(),
            ));
        }

        vendor::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            contact_person: Set(input.contact_person),
            email: Set(input.email),
            phone: Set(input.phone),
            address: Set(input.address),
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
        vendor_id: Uuid,
        patch: UpdateVendor,
    ) -> Result<vendor::Model, ServiceError> {
        let existing = self.get(vendor_id).await?;

        let mut active: vendor::ActiveModel = existing.into();
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Vendor name is required".to_string(),
                ));
            }
            active.name = Set(name.trim().to_string());
        }
        if let Some(contact_person) = patch.contact_person {
            active.contact_person = Set(Some(contact_person));
        }
        if let Some(email) = patch.email {
            active.email = Set(Some(email));
        }
        if let Some(phone) = patch.phone {
            active.phone = Set(Some(phone));
        }
        if let Some(address) = patch.address {
            active.address = Set(Some(address));
        }
        active.updated_at = Set(Some(Utc::now()));

        active.update(&*self.db).await.map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn deactivate(&self, vendor_id: Uuid) -> Result<vendor::Model, ServiceError> {
        self.set_status(vendor_id, EntityStatus::Inactive).await
    }

    #[instrument(skip(self))]
    pub async fn activate(&self, vendor_id: Uuid) -> Result<vendor::Model, ServiceError> {
        self.set_status(vendor_id, EntityStatus::Active).await
    }

    async fn set_status(
        &self,
        vendor_id: Uuid,
        status: EntityStatus,
    ) -> Result<vendor::Model, ServiceError> {
        let existing = self.get(vendor_id).await?;
        if existing.status == status.as_str() {
            return Ok(existing);
        }
        let mut active: vendor::ActiveModel = existing.into();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Some(Utc::now()));
        active.update(&*self.db).await.map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, vendor_id: Uuid) -> Result<vendor::Model, ServiceError> {
        Vendor::find_by_id(vendor_id)
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Vendor with ID {} not found", vendor_id))
            })
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        status: Option<EntityStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<vendor::Model>, u64), ServiceError> {
        let mut find = Vendor::find();
        if let Some(status) = status {
            find = find.filter(vendor::Column::Status.eq(status.as_str()));
        }

        let paginator = find
            .order_by_asc(vendor::Column::Name)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }
}
