//! Shipment dispatcher: batches confirmed orders onto a driver's trip and
//! cascades trip status onto every linked order.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{Actor, ActorRole};
use crate::db::DbPool;
use crate::entities::order::{self, OrderStatus};
use crate::entities::shipment::{self, Entity as ShipmentEntity, ShipmentStatus};
use crate::entities::shipment_order::{self, Entity as ShipmentOrderEntity};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::metrics::{PICKUP_ITEMS_SKIPPED, SHIPMENT_PICKUPS};
use crate::services::orders::{lock_order, transition_order, TransitionContext};
use crate::services::page_window;

const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PickUpRequest {
    pub vehicle_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub order_ids: Vec<Uuid>,
}

/// Why an order was left out of a pickup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    NotFound,
    /// Not `confirmed`
    InvalidState,
    /// Confirmed at another office
    OfficeMismatch,
    /// Listed twice in the same request
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Accepted,
    Skipped { reason: SkipReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PickupItem {
    pub order_id: Uuid,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

/// Per-order result of a pickup
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PickupOutcome {
    /// `None` when every listed order was skipped; no shipment is opened then.
    pub shipment_id: Option<Uuid>,
    pub items: Vec<PickupItem>,
}

impl PickupOutcome {
    pub fn accepted(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.items
            .iter()
            .filter(|item| item.outcome == ItemOutcome::Accepted)
            .map(|item| item.order_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FinishStatus {
    Completed,
    Cancelled,
}

impl From<FinishStatus> for ShipmentStatus {
    fn from(status: FinishStatus) -> Self {
        match status {
            FinishStatus::Completed => ShipmentStatus::Completed,
            FinishStatus::Cancelled => ShipmentStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct FinishRequest {
    pub status: FinishStatus,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListShipmentsQuery {
    pub status: Option<ShipmentStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Shipment together with the ids of the orders it carries
#[derive(Debug, Clone)]
pub struct ShipmentDetail {
    pub shipment: shipment::Model,
    pub order_ids: Vec<Uuid>,
}

/// Loads every order linked to a shipment, locked, in link order.
async fn linked_orders(
    txn: &DatabaseTransaction,
    shipment_id: Uuid,
) -> Result<Vec<order::Model>, ServiceError> {
    let links = ShipmentOrderEntity::find()
        .filter(shipment_order::Column::ShipmentId.eq(shipment_id))
        .order_by_asc(shipment_order::Column::CreatedAt)
        .all(txn)
        .await?;

    let mut orders = Vec::with_capacity(links.len());
    for link in links {
        let order = lock_order(txn, link.order_id).await?.ok_or_else(|| {
            ServiceError::InternalError(format!(
                "shipment {} links missing order {}",
                shipment_id, link.order_id
            ))
        })?;
        orders.push(order);
    }
    Ok(orders)
}

/// Loads a shipment for update and checks the actor drives it.
async fn lock_owned_shipment<C: ConnectionTrait>(
    conn: &C,
    actor: &Actor,
    shipment_id: Uuid,
) -> Result<shipment::Model, ServiceError> {
    let shipment = ShipmentEntity::find_by_id(shipment_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("shipment {} not found", shipment_id)))?;
    if shipment.driver_id != actor.user_id && actor.role != ActorRole::Admin {
        return Err(ServiceError::Forbidden(format!(
            "shipment {} belongs to another driver",
            shipment_id
        )));
    }
    Ok(shipment)
}

/// Version-guarded shipment status write.
async fn write_shipment_status<C: ConnectionTrait>(
    conn: &C,
    current: &shipment::Model,
    changes: shipment::ActiveModel,
) -> Result<(), ServiceError> {
    let result = ShipmentEntity::update_many()
        .set(changes)
        .filter(shipment::Column::Id.eq(current.id))
        .filter(shipment::Column::Version.eq(current.version))
        .exec(conn)
        .await
        .map_err(|e| {
            error!(error = %e, shipment_id = %current.id, "Failed to update shipment");
            ServiceError::DatabaseError(e)
        })?;
    if result.rows_affected != 1 {
        warn!(shipment_id = %current.id, "Shipment changed concurrently");
        return Err(ServiceError::ConcurrentModification(current.id));
    }
    Ok(())
}

#[derive(Clone)]
pub struct ShipmentService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ShipmentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn publish(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            event_sender.send_or_log(event).await;
        }
    }

    async fn publish_cascade(&self, shipment_id: Uuid, changes: &[(Uuid, OrderStatus, OrderStatus)]) {
        for (order_id, from, to) in changes {
            self.publish(Event::OrderStatusChanged {
                order_id: *order_id,
                from: *from,
                to: *to,
                shipment_id: Some(shipment_id),
            })
            .await;
        }
    }

    /// Opens a pending shipment for the driver and picks up every listed order
    /// confirmed at the driver's office. Other orders are skipped and reported.
    /// If nothing is accepted the shipment is not kept and `shipment_id` is `None`.
    #[instrument(skip(self, request), fields(driver_id = %actor.user_id, requested = request.order_ids.len()))]
    pub async fn pick_up(
        &self,
        actor: &Actor,
        request: PickUpRequest,
    ) -> Result<PickupOutcome, ServiceError> {
        request.validate()?;
        let driver_office = actor.require_office()?;
        let db = &*self.db_pool;
        let now = Utc::now();
        let shipment_id = Uuid::new_v4();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for pickup");
            ServiceError::DatabaseError(e)
        })?;

        shipment::ActiveModel {
            id: Set(shipment_id),
            driver_id: Set(actor.user_id),
            vehicle_id: Set(request.vehicle_id),
            office_id: Set(driver_office),
            status: Set(ShipmentStatus::Pending),
            start_time: Set(None),
            end_time: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            version: Set(1),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, shipment_id = %shipment_id, "Failed to create shipment");
            ServiceError::DatabaseError(e)
        })?;

        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(request.order_ids.len());
        let mut cascaded = Vec::new();

        for order_id in request.order_ids {
            let skip = |reason: SkipReason| PickupItem {
                order_id,
                outcome: ItemOutcome::Skipped { reason },
            };
            if !seen.insert(order_id) {
                items.push(skip(SkipReason::Duplicate));
                continue;
            }
            let order = match lock_order(&txn, order_id).await? {
                Some(order) => order,
                None => {
                    items.push(skip(SkipReason::NotFound));
                    continue;
                }
            };
            if order.status != OrderStatus::Confirmed {
                items.push(skip(SkipReason::InvalidState));
                continue;
            }
            if order.origin_office_id != Some(driver_office) {
                items.push(skip(SkipReason::OfficeMismatch));
                continue;
            }

            let updated = transition_order(
                &txn,
                order,
                OrderStatus::PickedUp,
                TransitionContext {
                    actor_id: Some(actor.user_id),
                    shipment_id: Some(shipment_id),
                    from_office_id: Some(driver_office),
                    ..Default::default()
                },
            )
            .await?;
            shipment_order::ActiveModel {
                id: Set(Uuid::new_v4()),
                shipment_id: Set(shipment_id),
                order_id: Set(order_id),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;

            cascaded.push((order_id, OrderStatus::Confirmed, updated.status));
            items.push(PickupItem {
                order_id,
                outcome: ItemOutcome::Accepted,
            });
        }

        for item in &items {
            if let ItemOutcome::Skipped { reason } = item.outcome {
                let reason: &'static str = reason.into();
                PICKUP_ITEMS_SKIPPED.with_label_values(&[reason]).inc();
                warn!(order_id = %item.order_id, reason, "Order skipped at pickup");
            }
        }

        if cascaded.is_empty() {
            txn.rollback().await?;
            warn!(skipped = items.len(), "Pickup accepted no orders; no shipment opened");
            return Ok(PickupOutcome {
                shipment_id: None,
                items,
            });
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, shipment_id = %shipment_id, "Failed to commit pickup");
            ServiceError::DatabaseError(e)
        })?;

        SHIPMENT_PICKUPS.inc();
        info!(
            shipment_id = %shipment_id,
            accepted = cascaded.len(),
            skipped = items.len() - cascaded.len(),
            "Shipment created"
        );
        self.publish(Event::ShipmentCreated {
            shipment_id,
            driver_id: actor.user_id,
            order_count: cascaded.len(),
        })
        .await;
        self.publish_cascade(shipment_id, &cascaded).await;

        Ok(PickupOutcome {
            shipment_id: Some(shipment_id),
            items,
        })
    }

    /// `pending -> in_transit`; every linked order moves `picked_up -> in_transit`.
    #[instrument(skip(self), fields(shipment_id = %shipment_id, driver_id = %actor.user_id))]
    pub async fn start(
        &self,
        actor: &Actor,
        shipment_id: Uuid,
    ) -> Result<shipment::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let current = lock_owned_shipment(&txn, actor, shipment_id).await?;
        if !current.status.can_transition_to(ShipmentStatus::InTransit) {
            return Err(ServiceError::InvalidState(format!(
                "shipment {} is {}",
                shipment_id, current.status
            )));
        }

        let now = Utc::now();
        write_shipment_status(
            &txn,
            &current,
            shipment::ActiveModel {
                status: Set(ShipmentStatus::InTransit),
                start_time: Set(Some(now)),
                updated_at: Set(now),
                version: Set(current.version + 1),
                ..Default::default()
            },
        )
        .await?;

        let mut cascaded = Vec::new();
        for order in linked_orders(&txn, shipment_id).await? {
            let (order_id, from) = (order.id, order.status);
            transition_order(
                &txn,
                order,
                OrderStatus::InTransit,
                TransitionContext {
                    actor_id: Some(actor.user_id),
                    shipment_id: Some(shipment_id),
                    from_office_id: Some(current.office_id),
                    ..Default::default()
                },
            )
            .await?;
            cascaded.push((order_id, from, OrderStatus::InTransit));
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, shipment_id = %shipment_id, "Failed to commit shipment start");
            ServiceError::DatabaseError(e)
        })?;

        info!(shipment_id = %shipment_id, orders = cascaded.len(), "Shipment started");
        self.publish(Event::ShipmentStarted {
            shipment_id,
            started_at: now,
        })
        .await;
        self.publish_cascade(shipment_id, &cascaded).await;

        Ok(shipment::Model {
            status: ShipmentStatus::InTransit,
            start_time: Some(now),
            updated_at: now,
            version: current.version + 1,
            ..current
        })
    }

    /// Completes or cancels a trip. Completion requires `in_transit` and lands
    /// orders at their destination office; cancellation returns them.
    #[instrument(skip(self, request), fields(shipment_id = %shipment_id, status = ?request.status))]
    pub async fn finish(
        &self,
        actor: &Actor,
        shipment_id: Uuid,
        request: FinishRequest,
    ) -> Result<shipment::Model, ServiceError> {
        request.validate()?;
        let target = ShipmentStatus::from(request.status);

        let txn = self.db_pool.begin().await?;
        let current = lock_owned_shipment(&txn, actor, shipment_id).await?;
        if !current.status.can_transition_to(target) {
            return Err(ServiceError::InvalidState(format!(
                "shipment {} is {}, cannot become {}",
                shipment_id, current.status, target
            )));
        }

        let now = Utc::now();
        let end_time = current.start_time.map_or(now, |start| start.max(now));
        write_shipment_status(
            &txn,
            &current,
            shipment::ActiveModel {
                status: Set(target),
                end_time: Set(Some(end_time)),
                updated_at: Set(now),
                version: Set(current.version + 1),
                ..Default::default()
            },
        )
        .await?;

        let mut cascaded = Vec::new();
        for order in linked_orders(&txn, shipment_id).await? {
            let (order_id, from) = (order.id, order.status);
            let (to, to_office_id) = match request.status {
                FinishStatus::Completed => {
                    (OrderStatus::ArrivedAtOffice, Some(order.destination_office_id))
                }
                FinishStatus::Cancelled => (OrderStatus::Returned, Some(current.office_id)),
            };
            transition_order(
                &txn,
                order,
                to,
                TransitionContext {
                    actor_id: Some(actor.user_id),
                    shipment_id: Some(shipment_id),
                    from_office_id: Some(current.office_id),
                    to_office_id,
                    note: request.note.clone(),
                    ..Default::default()
                },
            )
            .await?;
            cascaded.push((order_id, from, to));
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, shipment_id = %shipment_id, "Failed to commit shipment finish");
            ServiceError::DatabaseError(e)
        })?;

        info!(shipment_id = %shipment_id, status = %target, orders = cascaded.len(), "Shipment finished");
        self.publish(Event::ShipmentFinished {
            shipment_id,
            status: target,
            finished_at: end_time,
        })
        .await;
        self.publish_cascade(shipment_id, &cascaded).await;

        Ok(shipment::Model {
            status: target,
            end_time: Some(end_time),
            updated_at: now,
            version: current.version + 1,
            ..current
        })
    }

    /// Drivers may only read their own shipments.
    #[instrument(skip(self), fields(shipment_id = %shipment_id))]
    pub async fn get_shipment(
        &self,
        actor: &Actor,
        shipment_id: Uuid,
    ) -> Result<ShipmentDetail, ServiceError> {
        let db = &*self.db_pool;
        let shipment = ShipmentEntity::find_by_id(shipment_id)
            .one(db)
            .await?
            .filter(|s| actor.role != ActorRole::Driver || s.driver_id == actor.user_id)
            .ok_or_else(|| ServiceError::NotFound(format!("shipment {} not found", shipment_id)))?;

        let order_ids = ShipmentOrderEntity::find()
            .filter(shipment_order::Column::ShipmentId.eq(shipment_id))
            .order_by_asc(shipment_order::Column::CreatedAt)
            .all(db)
            .await?
            .into_iter()
            .map(|link| link.order_id)
            .collect();

        Ok(ShipmentDetail {
            shipment,
            order_ids,
        })
    }

    /// A driver's trips, newest first.
    #[instrument(skip(self, query), fields(driver_id = %driver_id))]
    pub async fn list_driver_shipments(
        &self,
        driver_id: Uuid,
        query: ListShipmentsQuery,
    ) -> Result<(Vec<shipment::Model>, u64, u64, u64), ServiceError> {
        let (page, per_page) = page_window(query.page, query.per_page, MAX_PAGE_SIZE);
        let mut select = ShipmentEntity::find().filter(shipment::Column::DriverId.eq(driver_id));
        if let Some(status) = query.status {
            select = select.filter(shipment::Column::Status.eq(status));
        }

        let paginator = select
            .order_by_desc(shipment::Column::CreatedAt)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await?;
        let shipments = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, driver_id = %driver_id, "Failed to list shipments");
            ServiceError::DatabaseError(e)
        })?;
        Ok((shipments, total, page, per_page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipped_items_serialize_with_reason() {
        let item = PickupItem {
            order_id: Uuid::nil(),
            outcome: ItemOutcome::Skipped {
                reason: SkipReason::OfficeMismatch,
            },
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["reason"], "office_mismatch");
    }

    #[tokio::test]
    async fn shipment_write_with_stale_version_is_refused() {
        use crate::db::{establish_connection_with_config, run_migrations, DbConfig};

        let db = establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .unwrap();
        run_migrations(&db).await.unwrap();
        let now = Utc::now();
        let snapshot = shipment::Model {
            id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            vehicle_id: None,
            office_id: Uuid::new_v4(),
            status: ShipmentStatus::Pending,
            start_time: None,
            end_time: None,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        shipment::ActiveModel::from(snapshot.clone())
            .reset_all()
            .insert(&db)
            .await
            .unwrap();

        let start = || shipment::ActiveModel {
            status: Set(ShipmentStatus::InTransit),
            start_time: Set(Some(now)),
            version: Set(snapshot.version + 1),
            ..Default::default()
        };
        write_shipment_status(&db, &snapshot, start()).await.unwrap();
        assert!(matches!(
            write_shipment_status(&db, &snapshot, start()).await,
            Err(ServiceError::ConcurrentModification(id)) if id == snapshot.id
        ));

        let stored = ShipmentEntity::find_by_id(snapshot.id)
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.status, ShipmentStatus::InTransit);
    }

    #[test]
    fn finish_status_maps_to_terminal_shipment_status() {
        assert_eq!(
            ShipmentStatus::from(FinishStatus::Completed),
            ShipmentStatus::Completed
        );
        assert!(!ShipmentStatus::from(FinishStatus::Cancelled).is_active());
    }
}
