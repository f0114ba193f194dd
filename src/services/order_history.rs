use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::order::OrderStatus;
use crate::entities::order_history::{self, Entity as OrderHistoryEntity, HistoryAction};
use crate::errors::ServiceError;

/// One audit row to append alongside a status change
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub order_id: Uuid,
    pub action: HistoryAction,
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
    pub from_office_id: Option<Uuid>,
    pub to_office_id: Option<Uuid>,
    pub shipment_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    pub note: Option<String>,
    pub action_time: DateTime<Utc>,
}

/// Inserts a history row on `conn`, which is expected to be the transaction
/// carrying the status change.
pub(crate) async fn append<C: ConnectionTrait>(
    conn: &C,
    entry: HistoryEntry,
) -> Result<order_history::Model, ServiceError> {
    if entry.action_time > Utc::now() {
        return Err(ServiceError::ValidationError(format!(
            "history for order {} cannot be dated in the future",
            entry.order_id
        )));
    }

    let row = order_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(entry.order_id),
        from_office_id: Set(entry.from_office_id),
        to_office_id: Set(entry.to_office_id),
        shipment_id: Set(entry.shipment_id),
        action: Set(entry.action),
        from_status: Set(entry.from_status),
        to_status: Set(entry.to_status),
        actor_id: Set(entry.actor_id),
        note: Set(entry.note),
        action_time: Set(entry.action_time),
    };

    row.insert(conn).await.map_err(|e| {
        error!(error = %e, order_id = %entry.order_id, "Failed to append order history");
        ServiceError::DatabaseError(e)
    })
}

/// Read side of the audit trail
#[derive(Clone)]
pub struct OrderHistoryService {
    db_pool: Arc<DbPool>,
}

impl OrderHistoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Rows for one order, oldest first.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn list_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<order_history::Model>, ServiceError> {
        OrderHistoryEntity::find()
            .filter(order_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_history::Column::ActionTime)
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to load order history");
                ServiceError::DatabaseError(e)
            })
    }

    /// Rows written by one shipment's pickup, start and finish.
    #[instrument(skip(self), fields(shipment_id = %shipment_id))]
    pub async fn list_for_shipment(
        &self,
        shipment_id: Uuid,
    ) -> Result<Vec<order_history::Model>, ServiceError> {
        Ok(OrderHistoryEntity::find()
            .filter(order_history::Column::ShipmentId.eq(shipment_id))
            .order_by_asc(order_history::Column::ActionTime)
            .all(&*self.db_pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use chrono::Duration;

    fn entry(order_id: Uuid, at: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry {
            order_id,
            action: HistoryAction::Created,
            from_status: None,
            to_status: OrderStatus::Draft,
            from_office_id: None,
            to_office_id: None,
            shipment_id: None,
            actor_id: None,
            note: None,
            action_time: at,
        }
    }

    #[tokio::test]
    async fn future_dated_rows_are_refused() {
        let db = establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .unwrap();
        run_migrations(&db).await.unwrap();
        let order_id = Uuid::new_v4();

        let err = append(&db, entry(order_id, Utc::now() + Duration::minutes(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));

        append(&db, entry(order_id, Utc::now() - Duration::seconds(1)))
            .await
            .unwrap();
        let service = OrderHistoryService::new(Arc::new(db));
        assert_eq!(service.list_for_order(order_id).await.unwrap().len(), 1);
    }
}
