//! Read-only port onto the office network.
//!
//! Offices are managed elsewhere; the delivery core only needs identity and
//! coverage lookups.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::office::{self, Entity as OfficeEntity};
use crate::errors::ServiceError;

#[async_trait]
pub trait OfficeDirectory: Send + Sync {
    async fn office(&self, id: Uuid) -> Result<Option<office::Model>, ServiceError>;

    /// Active office serving an address: the ward's own office, else the city hub.
    async fn resolve_coverage(
        &self,
        city: &str,
        ward: Option<&str>,
    ) -> Result<Option<office::Model>, ServiceError>;

    /// The office when it exists and is active.
    async fn active_office(&self, id: Uuid) -> Result<office::Model, ServiceError> {
        match self.office(id).await? {
            Some(office) if office.is_active => Ok(office),
            Some(office) => Err(ServiceError::ValidationError(format!(
                "office {} is not active",
                office.code
            ))),
            None => Err(ServiceError::NotFound(format!("office {} not found", id))),
        }
    }
}

/// [`OfficeDirectory`] over the `offices` table
#[derive(Clone)]
pub struct DbOfficeDirectory {
    db_pool: Arc<DbPool>,
}

impl DbOfficeDirectory {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl OfficeDirectory for DbOfficeDirectory {
    async fn office(&self, id: Uuid) -> Result<Option<office::Model>, ServiceError> {
        Ok(OfficeEntity::find_by_id(id).one(&*self.db_pool).await?)
    }

    #[instrument(skip(self))]
    async fn resolve_coverage(
        &self,
        city: &str,
        ward: Option<&str>,
    ) -> Result<Option<office::Model>, ServiceError> {
        let in_city = OfficeEntity::find()
            .filter(office::Column::City.eq(city.trim()))
            .filter(office::Column::IsActive.eq(true))
            .order_by_asc(office::Column::Code)
            .all(&*self.db_pool)
            .await?;

        let ward = ward.map(str::trim).filter(|w| !w.is_empty());
        let ward_office = ward.and_then(|w| {
            in_city
                .iter()
                .find(|o| o.ward.as_deref().map_or(false, |ow| ow.eq_ignore_ascii_case(w)))
        });
        let resolved = ward_office
            .or_else(|| in_city.iter().find(|o| o.ward.is_none()))
            .cloned();

        debug!(
            city,
            ward = ?ward,
            office = ?resolved.as_ref().map(|o| &o.code),
            "resolved coverage"
        );
        Ok(resolved)
    }
}
