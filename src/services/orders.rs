use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Condition, Expr},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::auth::Actor;
use crate::db::DbPool;
use crate::entities::order::{
    self, Entity as OrderEntity, OrderChannel, OrderStatus, Payer, PaymentMethod, PaymentStatus,
};
use crate::entities::order_history::{self, HistoryAction};
use crate::entities::promotion::{self, Entity as PromotionEntity};
use crate::entities::shipping_collection;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::metrics::{DELIVERIES, ORDERS_CREATED, ORDER_TRANSITIONS};
use crate::services::fees::{self, FeeQuote, QuoteRequest};
use crate::services::offices::OfficeDirectory;
use crate::services::order_history::{self as history, HistoryEntry, OrderHistoryService};
use crate::services::{non_negative_decimal, page_window, positive_decimal};

const MAX_PAGE_SIZE: u64 = 100;

/// Request to create a new order
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 100))]
    pub sender_name: String,
    #[validate(length(min = 6, max = 20))]
    pub sender_phone: String,
    #[validate(length(min = 1, max = 100))]
    pub sender_city: String,
    #[validate(length(max = 100))]
    pub sender_ward: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub sender_address: String,

    #[validate(length(min = 1, max = 100))]
    pub recipient_name: String,
    #[validate(length(min = 6, max = 20))]
    pub recipient_phone: String,
    #[validate(length(min = 1, max = 100))]
    pub recipient_city: String,
    #[validate(length(max = 100))]
    pub recipient_ward: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub recipient_address: String,

    /// Weight in kilograms
    #[validate(custom = "positive_decimal")]
    pub weight: Decimal,
    pub service_type_id: Uuid,
    #[validate(custom = "non_negative_decimal")]
    pub cod_amount: Decimal,
    pub payer: Payer,
    pub payment_method: PaymentMethod,
    #[validate(length(min = 1, max = 50))]
    pub promotion_code: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Changes allowed while an order is still a draft
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateDraftRequest {
    #[validate(custom = "positive_decimal")]
    pub weight: Option<Decimal>,
    pub service_type_id: Option<Uuid>,
    #[validate(custom = "non_negative_decimal")]
    pub cod_amount: Option<Decimal>,
    #[validate(length(min = 1, max = 100))]
    pub recipient_city: Option<String>,
    #[validate(length(max = 100))]
    pub recipient_ward: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub recipient_address: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ConfirmOrderRequest {
    /// Defaults to the confirming operator's office
    pub origin_office_id: Option<Uuid>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CancelOrderRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct DeliverOrderRequest {
    /// Cash handed over by the recipient
    #[validate(custom = "non_negative_decimal")]
    pub amount_collected: Decimal,
    #[validate(length(min = 1, max = 100))]
    pub actual_recipient: String,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
    /// Matches either the origin or the destination office
    pub office_id: Option<Uuid>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Result of a delivery: the order and the COD collection recorded with it
#[derive(Debug, Clone)]
pub struct Delivery {
    pub order: order::Model,
    pub collection: shipping_collection::Model,
}

/// Fields written together with a status change
#[derive(Debug, Clone, Default)]
pub(crate) struct TransitionContext {
    pub actor_id: Option<Uuid>,
    pub shipment_id: Option<Uuid>,
    pub from_office_id: Option<Uuid>,
    pub to_office_id: Option<Uuid>,
    pub note: Option<String>,
    /// Set on confirmation
    pub origin_office_id: Option<Uuid>,
    /// Set on delivery
    pub actual_recipient: Option<String>,
}

/// Loads an order for update; the row lock is a no-op on SQLite.
pub(crate) async fn lock_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Option<order::Model>, ServiceError> {
    OrderEntity::find_by_id(order_id)
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to lock order");
            ServiceError::DatabaseError(e)
        })
}

/// Moves `order` to `to` with a version-guarded update and appends the history row.
///
/// Returns the order as written. `ConcurrentModification` when another writer
/// bumped the version since `order` was read.
pub(crate) async fn transition_order<C: ConnectionTrait>(
    conn: &C,
    order: order::Model,
    to: OrderStatus,
    ctx: TransitionContext,
) -> Result<order::Model, ServiceError> {
    let from = order.status;
    from.transition_to(to).map_err(|e| {
        ServiceError::InvalidState(format!("order {}: {}", order.tracking_number, e))
    })?;

    let now = Utc::now();
    let mut updated = order.clone();
    updated.status = to;
    updated.version = order.version + 1;
    updated.updated_at = now;

    let mut changes = order::ActiveModel {
        status: Set(to),
        version: Set(updated.version),
        updated_at: Set(now),
        ..Default::default()
    };
    if let Some(origin) = ctx.origin_office_id {
        changes.origin_office_id = Set(Some(origin));
        updated.origin_office_id = Some(origin);
    }
    if to == OrderStatus::Delivered {
        changes.delivered_at = Set(Some(now));
        changes.actual_recipient = Set(ctx.actual_recipient.clone());
        updated.delivered_at = Some(now);
        updated.actual_recipient = ctx.actual_recipient.clone();
    }

    let result = OrderEntity::update_many()
        .set(changes)
        .filter(order::Column::Id.eq(order.id))
        .filter(order::Column::Version.eq(order.version))
        .exec(conn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %order.id, "Failed to update order status");
            ServiceError::DatabaseError(e)
        })?;
    if result.rows_affected != 1 {
        warn!(order_id = %order.id, version = order.version, "Order changed concurrently");
        return Err(ServiceError::ConcurrentModification(order.id));
    }

    history::append(
        conn,
        HistoryEntry {
            order_id: order.id,
            action: HistoryAction::for_status(to),
            from_status: Some(from),
            to_status: to,
            from_office_id: ctx.from_office_id,
            to_office_id: ctx.to_office_id,
            shipment_id: ctx.shipment_id,
            actor_id: ctx.actor_id,
            note: ctx.note,
            action_time: now,
        },
    )
    .await?;

    ORDER_TRANSITIONS.with_label_values(&[to.as_str()]).inc();
    info!(order_id = %order.id, from = %from, to = %to, "Order status changed");
    Ok(updated)
}

/// `TRK` + UTC date + 8 hex digits
pub fn generate_tracking_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("TRK{}{}", now.format("%Y%m%d"), suffix)
}

fn channel_for(actor: &Actor) -> OrderChannel {
    if actor.role.is_back_office() {
        OrderChannel::BackOffice
    } else {
        OrderChannel::Checkout
    }
}

/// Senders see only their own orders; staff see all.
fn ensure_visible(actor: &Actor, order: &order::Model) -> Result<(), ServiceError> {
    use crate::auth::ActorRole;
    match actor.role {
        ActorRole::Customer | ActorRole::Shop if order.created_by != actor.user_id => Err(
            ServiceError::NotFound(format!("order {} not found", order.id)),
        ),
        _ => Ok(()),
    }
}

/// Only the creator or back-office staff may edit, submit or cancel.
fn ensure_editable_by(actor: &Actor, order: &order::Model) -> Result<(), ServiceError> {
    if order.created_by == actor.user_id || actor.role.is_back_office() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "order {} belongs to another sender",
            order.tracking_number
        )))
    }
}

/// Service for the order lifecycle
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    offices: Arc<dyn OfficeDirectory>,
    history: OrderHistoryService,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        offices: Arc<dyn OfficeDirectory>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        let history = OrderHistoryService::new(db_pool.clone());
        Self {
            db_pool,
            offices,
            history,
            event_sender,
        }
    }

    async fn publish(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            event_sender.send_or_log(event).await;
        }
    }

    async fn publish_transition(&self, before: OrderStatus, after: &order::Model) {
        self.publish(Event::OrderStatusChanged {
            order_id: after.id,
            from: before,
            to: after.status,
            shipment_id: None,
        })
        .await;
    }

    /// Creates an order priced from the rate table. Checkout channels start in
    /// `draft`, back-office channels in `pending`.
    #[instrument(skip(self, request), fields(user_id = %actor.user_id, service_type_id = %request.service_type_id))]
    pub async fn create_order(
        &self,
        actor: &Actor,
        request: CreateOrderRequest,
    ) -> Result<order::Model, ServiceError> {
        request.validate()?;

        let destination = self
            .offices
            .resolve_coverage(&request.recipient_city, request.recipient_ward.as_deref())
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "no office covers {}",
                    request.recipient_city
                ))
            })?;

        let db = &*self.db_pool;
        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let initial_status = channel_for(actor).initial_status();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let quote_request = QuoteRequest {
            weight: request.weight,
            service_type_id: request.service_type_id,
            sender_region: request.sender_city.clone(),
            recipient_region: request.recipient_city.clone(),
        };
        let quote = fees::quote_on(&txn, &quote_request, request.promotion_code.as_deref(), now)
            .await?;
        if let Some(reason) = &quote.promotion_rejection {
            info!(order_id = %order_id, ?reason, "Promotion not applied");
        }
        if let Some(promotion_id) = quote.promotion_id {
            consume_promotion(&txn, promotion_id).await?;
        }

        let order_model = order::ActiveModel {
            id: Set(order_id),
            tracking_number: Set(generate_tracking_number(now)),
            sender_name: Set(request.sender_name),
            sender_phone: Set(request.sender_phone),
            sender_city: Set(request.sender_city),
            sender_ward: Set(request.sender_ward),
            sender_address: Set(request.sender_address),
            recipient_name: Set(request.recipient_name),
            recipient_phone: Set(request.recipient_phone),
            recipient_city: Set(request.recipient_city),
            recipient_ward: Set(request.recipient_ward),
            recipient_address: Set(request.recipient_address),
            weight: Set(request.weight),
            service_type_id: Set(request.service_type_id),
            shipping_fee: Set(quote.shipping_fee),
            discount_amount: Set(quote.discount),
            promotion_id: Set(quote.promotion_id),
            cod_amount: Set(request.cod_amount),
            payer: Set(request.payer),
            payment_method: Set(request.payment_method),
            payment_status: Set(PaymentStatus::Unpaid),
            status: Set(initial_status),
            origin_office_id: Set(None),
            destination_office_id: Set(destination.id),
            created_by: Set(actor.user_id),
            actual_recipient: Set(None),
            delivered_at: Set(None),
            notes: Set(request.notes),
            created_at: Set(now),
            updated_at: Set(now),
            version: Set(1),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to create order in database");
            ServiceError::DatabaseError(e)
        })?;

        history::append(
            &txn,
            HistoryEntry {
                order_id,
                action: HistoryAction::Created,
                from_status: None,
                to_status: initial_status,
                from_office_id: None,
                to_office_id: Some(destination.id),
                shipment_id: None,
                actor_id: Some(actor.user_id),
                note: None,
                action_time: now,
            },
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order creation transaction");
            ServiceError::DatabaseError(e)
        })?;

        ORDERS_CREATED.inc();
        info!(
            order_id = %order_id,
            tracking_number = %order_model.tracking_number,
            status = %initial_status,
            "Order created successfully"
        );

        self.publish(Event::OrderCreated {
            order_id,
            tracking_number: order_model.tracking_number.clone(),
            status: initial_status,
        })
        .await;

        Ok(order_model)
    }

    /// Re-prices a draft after its weight, tier, COD or recipient changed.
    ///
    /// Works on a snapshot; the write is guarded by the snapshot's version.
    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn update_draft(
        &self,
        actor: &Actor,
        order_id: Uuid,
        request: UpdateDraftRequest,
    ) -> Result<order::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;

        let current = OrderEntity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))?;
        ensure_editable_by(actor, &current)?;
        if current.status != OrderStatus::Draft {
            return Err(ServiceError::InvalidState(format!(
                "order {} is {}, only drafts can be edited",
                current.tracking_number, current.status
            )));
        }

        let mut next = current.clone();
        if let Some(weight) = request.weight {
            next.weight = weight;
        }
        if let Some(service_type_id) = request.service_type_id {
            next.service_type_id = service_type_id;
        }
        if let Some(cod_amount) = request.cod_amount {
            next.cod_amount = cod_amount;
        }
        if let Some(notes) = request.notes {
            next.notes = Some(notes);
        }
        let recipient_moved = request.recipient_city.is_some() || request.recipient_ward.is_some();
        if let Some(city) = request.recipient_city {
            next.recipient_city = city;
        }
        if let Some(ward) = request.recipient_ward {
            next.recipient_ward = Some(ward).filter(|w| !w.trim().is_empty());
        }
        if let Some(address) = request.recipient_address {
            next.recipient_address = address;
        }
        if recipient_moved {
            let destination = self
                .offices
                .resolve_coverage(&next.recipient_city, next.recipient_ward.as_deref())
                .await?
                .ok_or_else(|| {
                    ServiceError::ValidationError(format!("no office covers {}", next.recipient_city))
                })?;
            next.destination_office_id = destination.id;
        }

        let txn = db.begin().await?;
        let quote = self.reprice(&txn, &next).await?;
        next.shipping_fee = quote.shipping_fee;
        next.discount_amount = quote.discount;
        next.version = current.version + 1;
        next.updated_at = Utc::now();

        let changes = order::ActiveModel {
            weight: Set(next.weight),
            service_type_id: Set(next.service_type_id),
            cod_amount: Set(next.cod_amount),
            notes: Set(next.notes.clone()),
            recipient_city: Set(next.recipient_city.clone()),
            recipient_ward: Set(next.recipient_ward.clone()),
            recipient_address: Set(next.recipient_address.clone()),
            destination_office_id: Set(next.destination_office_id),
            shipping_fee: Set(next.shipping_fee),
            discount_amount: Set(next.discount_amount),
            version: Set(next.version),
            updated_at: Set(next.updated_at),
            ..Default::default()
        };
        let result = OrderEntity::update_many()
            .set(changes)
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Version.eq(current.version))
            .filter(order::Column::Status.eq(OrderStatus::Draft))
            .exec(&txn)
            .await?;
        if result.rows_affected != 1 {
            return Err(ServiceError::ConcurrentModification(order_id));
        }

        txn.commit().await?;
        info!(order_id = %order_id, fee = %next.shipping_fee, "Draft order updated");
        Ok(next)
    }

    /// Keeps the promotion the draft already holds, re-checking only its amount rules.
    async fn reprice<C: ConnectionTrait>(
        &self,
        conn: &C,
        order: &order::Model,
    ) -> Result<FeeQuote, ServiceError> {
        let rate = fees::load_rate(
            conn,
            &QuoteRequest {
                weight: order.weight,
                service_type_id: order.service_type_id,
                sender_region: order.sender_city.clone(),
                recipient_region: order.recipient_city.clone(),
            },
        )
        .await?;
        let mut quote = fees::quote_fee(&rate, order.weight, None, Utc::now());

        if let Some(promotion_id) = order.promotion_id {
            if let Some(promotion) = PromotionEntity::find_by_id(promotion_id).one(conn).await? {
                let discount = fees::apply_promotion_terms(&promotion, quote.shipping_fee).discount();
                quote.discount = discount;
                quote.payable = (quote.shipping_fee - discount).max(Decimal::ZERO);
            }
        }
        Ok(quote)
    }

    /// `draft -> pending`
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn submit_order(
        &self,
        actor: &Actor,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;
        let current = lock_order(&txn, order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))?;
        ensure_editable_by(actor, &current)?;

        let before = current.status;
        let updated = transition_order(
            &txn,
            current,
            OrderStatus::Pending,
            TransitionContext {
                actor_id: Some(actor.user_id),
                ..Default::default()
            },
        )
        .await?;
        txn.commit().await?;

        self.publish_transition(before, &updated).await;
        Ok(updated)
    }

    /// `pending -> confirmed`, assigning the origin office.
    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn confirm_order(
        &self,
        actor: &Actor,
        order_id: Uuid,
        request: ConfirmOrderRequest,
    ) -> Result<order::Model, ServiceError> {
        request.validate()?;
        let origin_office_id = request
            .origin_office_id
            .or(actor.office_id)
            .ok_or_else(|| {
                ServiceError::ValidationError("an origin office is required".to_string())
            })?;
        if !actor.role.spans_offices() && actor.office_id != Some(origin_office_id) {
            return Err(ServiceError::Forbidden(format!(
                "cannot confirm orders into office {}",
                origin_office_id
            )));
        }
        let origin = self.offices.active_office(origin_office_id).await?;

        let txn = self.db_pool.begin().await?;
        let current = lock_order(&txn, order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))?;

        let before = current.status;
        let updated = transition_order(
            &txn,
            current,
            OrderStatus::Confirmed,
            TransitionContext {
                actor_id: Some(actor.user_id),
                to_office_id: Some(origin.id),
                origin_office_id: Some(origin.id),
                note: request.note,
                ..Default::default()
            },
        )
        .await?;
        txn.commit().await?;

        self.publish_transition(before, &updated).await;
        Ok(updated)
    }

    /// `draft | pending | confirmed -> cancelled`
    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn cancel_order(
        &self,
        actor: &Actor,
        order_id: Uuid,
        request: CancelOrderRequest,
    ) -> Result<order::Model, ServiceError> {
        request.validate()?;
        let txn = self.db_pool.begin().await?;
        let current = lock_order(&txn, order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))?;
        ensure_editable_by(actor, &current)?;

        let before = current.status;
        let from_office_id = current.origin_office_id;
        let updated = transition_order(
            &txn,
            current,
            OrderStatus::Cancelled,
            TransitionContext {
                actor_id: Some(actor.user_id),
                from_office_id,
                note: request.reason,
                ..Default::default()
            },
        )
        .await?;
        txn.commit().await?;

        self.publish_transition(before, &updated).await;
        Ok(updated)
    }

    /// `arrived_at_office -> delivered`, recording the COD the agent collected.
    #[instrument(skip(self, request), fields(order_id = %order_id, agent_id = %actor.user_id))]
    pub async fn deliver_order(
        &self,
        actor: &Actor,
        order_id: Uuid,
        request: DeliverOrderRequest,
    ) -> Result<Delivery, ServiceError> {
        request.validate()?;
        let agent_office = actor.require_office()?;

        let txn = self.db_pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for delivery");
            ServiceError::DatabaseError(e)
        })?;
        let current = lock_order(&txn, order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))?;
        if current.destination_office_id != agent_office {
            return Err(ServiceError::Forbidden(format!(
                "order {} is delivered by another office",
                current.tracking_number
            )));
        }

        // Cash on a no-COD order could never be submitted or reconciled.
        if current.cod_amount.is_zero() && request.amount_collected > Decimal::ZERO {
            return Err(ServiceError::ValidationError(format!(
                "order {} carries no COD; nothing may be collected",
                current.tracking_number
            )));
        }

        let before = current.status;
        let expected = current.cod_amount;
        let destination = current.destination_office_id;
        let updated = transition_order(
            &txn,
            current,
            OrderStatus::Delivered,
            TransitionContext {
                actor_id: Some(actor.user_id),
                from_office_id: Some(destination),
                note: request.note,
                actual_recipient: Some(request.actual_recipient),
                ..Default::default()
            },
        )
        .await?;

        let collection = shipping_collection::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            agent_id: Set(actor.user_id),
            office_id: Set(agent_office),
            amount_collected: Set(request.amount_collected),
            expected_amount: Set(expected),
            discrepancy: Set(request.amount_collected - expected),
            payment_submission_id: Set(None),
            collected_at: Set(updated.delivered_at.unwrap_or_else(Utc::now)),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to record COD collection");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit delivery");
            ServiceError::DatabaseError(e)
        })?;

        DELIVERIES.inc();
        if !collection.discrepancy.is_zero() {
            warn!(
                order_id = %order_id,
                discrepancy = %collection.discrepancy,
                "Collected COD differs from expected"
            );
        }
        self.publish_transition(before, &updated).await;

        Ok(Delivery {
            order: updated,
            collection,
        })
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(
        &self,
        actor: &Actor,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to fetch order from database");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))?;
        ensure_visible(actor, &order)?;
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn get_by_tracking_number(
        &self,
        actor: &Actor,
        tracking_number: &str,
    ) -> Result<order::Model, ServiceError> {
        let order = OrderEntity::find()
            .filter(order::Column::TrackingNumber.eq(tracking_number.trim().to_uppercase()))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", tracking_number)))?;
        ensure_visible(actor, &order)?;
        Ok(order)
    }

    /// Lists orders newest first. Senders only see their own.
    #[instrument(skip(self, query))]
    pub async fn list_orders(
        &self,
        actor: &Actor,
        query: ListOrdersQuery,
    ) -> Result<(Vec<order::Model>, u64, u64, u64), ServiceError> {
        use crate::auth::ActorRole;
        let (page, per_page) = page_window(query.page, query.per_page, MAX_PAGE_SIZE);

        let mut select = OrderEntity::find();
        if let Some(status) = query.status {
            select = select.filter(order::Column::Status.eq(status));
        }
        if let Some(office_id) = query.office_id {
            select = select.filter(
                Condition::any()
                    .add(order::Column::OriginOfficeId.eq(office_id))
                    .add(order::Column::DestinationOfficeId.eq(office_id)),
            );
        }
        if matches!(actor.role, ActorRole::Customer | ActorRole::Shop) {
            select = select.filter(order::Column::CreatedBy.eq(actor.user_id));
        }

        let paginator = select
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await.map_err(|e| {
            error!(error = %e, "Failed to count orders");
            ServiceError::DatabaseError(e)
        })?;
        let orders = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, page, per_page, "Failed to fetch orders page");
            ServiceError::DatabaseError(e)
        })?;

        Ok((orders, total, page, per_page))
    }

    /// Audit trail of one order, oldest first.
    pub async fn order_history(
        &self,
        actor: &Actor,
        order_id: Uuid,
    ) -> Result<Vec<order_history::Model>, ServiceError> {
        self.get_order(actor, order_id).await?;
        self.history.list_for_order(order_id).await
    }
}

/// Counts one use of a promotion, refusing once its limit is reached.
async fn consume_promotion<C: ConnectionTrait>(
    conn: &C,
    promotion_id: Uuid,
) -> Result<(), ServiceError> {
    let result = PromotionEntity::update_many()
        .col_expr(
            promotion::Column::UsageCount,
            Expr::col(promotion::Column::UsageCount).add(1),
        )
        .filter(promotion::Column::Id.eq(promotion_id))
        .filter(
            Condition::any()
                .add(promotion::Column::UsageLimit.is_null())
                .add(Expr::col(promotion::Column::UsageCount).lt(Expr::col(promotion::Column::UsageLimit))),
        )
        .exec(conn)
        .await?;

    if result.rows_affected != 1 {
        return Err(ServiceError::Conflict(format!(
            "promotion {} has reached its usage limit",
            promotion_id
        )));
    }
    Ok(())
}
