use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::auth::Actor;
use crate::db::DbPool;
use crate::entities::order::OrderStatus;
use crate::entities::payment_submission::{
    self, Entity as PaymentSubmissionEntity, SubmissionStatus,
};
use crate::entities::shipping_collection::{self, Entity as ShippingCollectionEntity};
use crate::entities::transaction::{self, TransactionKind, TransactionPurpose};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::metrics::{COD_SUBMISSIONS, RECONCILIATIONS};
use crate::services::orders::lock_order;
use crate::services::transactions::{self as ledger, NewLedgerEntry};
use crate::services::{non_negative_decimal, page_window};

const MAX_PAGE_SIZE: u64 = 100;

/// Cash hand-over from a delivery agent to their office
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SubmitCodRequest {
    #[validate(length(min = 1, max = 500))]
    pub order_ids: Vec<Uuid>,
    #[validate(custom = "non_negative_decimal")]
    pub total_amount_submitted: Decimal,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReconcileRequest {
    pub status: SubmissionStatus,
    /// Amount actually accepted; required for `adjusted`
    #[validate(custom = "non_negative_decimal")]
    pub adjusted_amount: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub submission: payment_submission::Model,
    /// Revenue transfer posted with the reconciliation
    pub ledger_entry: Option<transaction::Model>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListSubmissionsQuery {
    /// Ignored for office-bound staff
    pub office_id: Option<Uuid>,
    pub status: Option<SubmissionStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// COD position of one office
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CodBalance {
    pub office_id: Uuid,
    /// Cash collected on delivery
    pub collected: Decimal,
    /// Declared in non-rejected submissions
    pub submitted: Decimal,
    /// Declared in submissions awaiting reconciliation
    pub pending: Decimal,
    /// Accepted by confirmed or adjusted submissions
    pub reconciled: Decimal,
    /// Collected but not yet in any live submission
    pub outstanding: Decimal,
}

#[derive(Clone)]
pub struct PaymentSubmissionService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl PaymentSubmissionService {
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

    /// Batches the agent's delivered COD orders into one pending submission.
    /// Any ineligible order fails the whole batch.
    #[instrument(skip(self, request), fields(agent_id = %actor.user_id, orders = request.order_ids.len()))]
    pub async fn submit(
        &self,
        actor: &Actor,
        request: SubmitCodRequest,
    ) -> Result<payment_submission::Model, ServiceError> {
        request.validate()?;
        let office_id = actor.require_office()?;

        let mut seen = HashSet::new();
        if let Some(dup) = request.order_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(ServiceError::ValidationError(format!(
                "order {} is listed more than once",
                dup
            )));
        }

        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for COD submission");
            ServiceError::DatabaseError(e)
        })?;

        let mut expected = Decimal::ZERO;
        for order_id in &request.order_ids {
            let order = lock_order(&txn, *order_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))?;
            if order.status != OrderStatus::Delivered {
                return Err(ServiceError::InvalidState(format!(
                    "order {} is {}, not delivered",
                    order.tracking_number, order.status
                )));
            }
            if order.cod_amount <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "order {} has no COD to submit",
                    order.tracking_number
                )));
            }
            if order.destination_office_id != office_id {
                return Err(ServiceError::Forbidden(format!(
                    "order {} was delivered by another office",
                    order.tracking_number
                )));
            }

            let collection = ShippingCollectionEntity::find()
                .filter(shipping_collection::Column::OrderId.eq(*order_id))
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::InvalidState(format!(
                        "order {} has no recorded collection",
                        order.tracking_number
                    ))
                })?;
            if let Some(existing) = collection.payment_submission_id {
                return Err(ServiceError::Conflict(format!(
                    "order {} is already in submission {}",
                    order.tracking_number, existing
                )));
            }
            expected += collection.amount_collected;
        }

        let now = Utc::now();
        let submission_id = Uuid::new_v4();
        let discrepancy = request.total_amount_submitted - expected;
        let order_ids = serde_json::to_value(&request.order_ids)
            .map_err(|e| ServiceError::InternalError(format!("order id list: {}", e)))?;

        let submission = payment_submission::ActiveModel {
            id: Set(submission_id),
            office_id: Set(office_id),
            submitted_by: Set(actor.user_id),
            order_ids: Set(order_ids),
            total_amount_submitted: Set(request.total_amount_submitted),
            expected_amount: Set(expected),
            discrepancy: Set(discrepancy),
            adjusted_amount: Set(None),
            status: Set(SubmissionStatus::Pending),
            notes: Set(request.notes),
            reconciliation_notes: Set(None),
            reconciled_by: Set(None),
            reconciled_at: Set(None),
            submitted_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, submission_id = %submission_id, "Failed to create payment submission");
            ServiceError::DatabaseError(e)
        })?;

        let claimed = ShippingCollectionEntity::update_many()
            .set(shipping_collection::ActiveModel {
                payment_submission_id: Set(Some(submission_id)),
                ..Default::default()
            })
            .filter(shipping_collection::Column::OrderId.is_in(request.order_ids.clone()))
            .filter(shipping_collection::Column::PaymentSubmissionId.is_null())
            .exec(&txn)
            .await?;
        if claimed.rows_affected != request.order_ids.len() as u64 {
            return Err(ServiceError::Conflict(
                "some orders were submitted concurrently".to_string(),
            ));
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, submission_id = %submission_id, "Failed to commit payment submission");
            ServiceError::DatabaseError(e)
        })?;

        COD_SUBMISSIONS.inc();
        if discrepancy.is_zero() {
            info!(submission_id = %submission_id, expected = %expected, "COD submitted");
        } else {
            warn!(
                submission_id = %submission_id,
                expected = %expected,
                submitted = %submission.total_amount_submitted,
                discrepancy = %discrepancy,
                "COD submitted with discrepancy"
            );
        }
        self.publish(Event::PaymentSubmitted {
            submission_id,
            office_id,
            total_amount_submitted: submission.total_amount_submitted,
            discrepancy,
        })
        .await;

        Ok(submission)
    }

    /// Settles a pending submission. Confirmed and adjusted submissions post a
    /// revenue transfer in the same transaction; rejection releases the orders
    /// for resubmission.
    #[instrument(skip(self, request), fields(submission_id = %submission_id, status = ?request.status))]
    pub async fn reconcile(
        &self,
        actor: &Actor,
        submission_id: Uuid,
        request: ReconcileRequest,
    ) -> Result<ReconcileOutcome, ServiceError> {
        request.validate()?;
        match (request.status, request.adjusted_amount) {
            (SubmissionStatus::Pending, _) => {
                return Err(ServiceError::ValidationError(
                    "a submission cannot be reconciled back to pending".to_string(),
                ))
            }
            (SubmissionStatus::Adjusted, None) => {
                return Err(ServiceError::ValidationError(
                    "adjusted_amount is required for an adjustment".to_string(),
                ))
            }
            (SubmissionStatus::Confirmed | SubmissionStatus::Rejected, Some(_)) => {
                return Err(ServiceError::ValidationError(
                    "adjusted_amount is only accepted for an adjustment".to_string(),
                ))
            }
            _ => {}
        }

        let txn = self.db_pool.begin().await?;
        let current = PaymentSubmissionEntity::find_by_id(submission_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("payment submission {} not found", submission_id))
            })?;
        if !actor.role.spans_offices() && actor.office_id != Some(current.office_id) {
            return Err(ServiceError::Forbidden(format!(
                "submission {} belongs to another office",
                submission_id
            )));
        }
        if !current.status.can_transition_to(request.status) {
            return Err(ServiceError::InvalidState(format!(
                "submission {} is already {}",
                submission_id,
                current.status.as_str()
            )));
        }

        let now = Utc::now();
        let updated = PaymentSubmissionEntity::update_many()
            .set(payment_submission::ActiveModel {
                status: Set(request.status),
                adjusted_amount: Set(request.adjusted_amount),
                reconciliation_notes: Set(request.notes.clone()),
                reconciled_by: Set(Some(actor.user_id)),
                reconciled_at: Set(Some(now)),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(payment_submission::Column::Id.eq(submission_id))
            .filter(payment_submission::Column::Status.eq(SubmissionStatus::Pending))
            .exec(&txn)
            .await?;
        if updated.rows_affected != 1 {
            return Err(ServiceError::ConcurrentModification(submission_id));
        }

        let submission = payment_submission::Model {
            status: request.status,
            adjusted_amount: request.adjusted_amount,
            reconciliation_notes: request.notes,
            reconciled_by: Some(actor.user_id),
            reconciled_at: Some(now),
            updated_at: now,
            ..current
        };

        if request.status == SubmissionStatus::Rejected {
            ShippingCollectionEntity::update_many()
                .set(shipping_collection::ActiveModel {
                    payment_submission_id: Set(None),
                    ..Default::default()
                })
                .filter(shipping_collection::Column::PaymentSubmissionId.eq(submission_id))
                .exec(&txn)
                .await?;
        }

        let amount = submission.accepted_amount();
        let ledger_entry = if submission.status.posts_revenue() && amount > Decimal::ZERO {
            Some(
                ledger::post(
                    &txn,
                    NewLedgerEntry {
                        kind: TransactionKind::Income,
                        purpose: TransactionPurpose::RevenueTransfer,
                        amount,
                        order_id: None,
                        office_id: Some(submission.office_id),
                        payment_submission_id: Some(submission_id),
                        description: Some(format!("COD submission {}", submission_id)),
                        created_by: actor.user_id,
                    },
                )
                .await?,
            )
        } else {
            None
        };

        txn.commit().await.map_err(|e| {
            error!(error = %e, submission_id = %submission_id, "Failed to commit reconciliation");
            ServiceError::DatabaseError(e)
        })?;

        RECONCILIATIONS
            .with_label_values(&[submission.status.as_str()])
            .inc();
        info!(submission_id = %submission_id, status = ?submission.status, "Submission reconciled");
        self.publish(Event::SubmissionReconciled {
            submission_id,
            status: submission.status,
        })
        .await;
        if let Some(entry) = &ledger_entry {
            self.publish(Event::LedgerEntryPosted {
                transaction_id: entry.id,
                amount: entry.amount,
            })
            .await;
        }

        Ok(ReconcileOutcome {
            submission,
            ledger_entry,
        })
    }

    #[instrument(skip(self), fields(submission_id = %submission_id))]
    pub async fn get_submission(
        &self,
        actor: &Actor,
        submission_id: Uuid,
    ) -> Result<payment_submission::Model, ServiceError> {
        PaymentSubmissionEntity::find_by_id(submission_id)
            .one(&*self.db_pool)
            .await?
            .filter(|s| actor.role.spans_offices() || actor.office_id == Some(s.office_id))
            .ok_or_else(|| {
                ServiceError::NotFound(format!("payment submission {} not found", submission_id))
            })
    }

    #[instrument(skip(self, query))]
    pub async fn list_submissions(
        &self,
        actor: &Actor,
        query: ListSubmissionsQuery,
    ) -> Result<(Vec<payment_submission::Model>, u64, u64, u64), ServiceError> {
        let (page, per_page) = page_window(query.page, query.per_page, MAX_PAGE_SIZE);
        let office_id = if actor.role.spans_offices() {
            query.office_id
        } else {
            Some(actor.require_office()?)
        };

        let mut select = PaymentSubmissionEntity::find();
        if let Some(office_id) = office_id {
            select = select.filter(payment_submission::Column::OfficeId.eq(office_id));
        }
        if let Some(status) = query.status {
            select = select.filter(payment_submission::Column::Status.eq(status));
        }

        let paginator = select
            .order_by_desc(payment_submission::Column::SubmittedAt)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, "Failed to list payment submissions");
            ServiceError::DatabaseError(e)
        })?;
        Ok((items, total, page, per_page))
    }

    /// Sums an office's collections and submissions.
    #[instrument(skip(self), fields(office_id = %office_id))]
    pub async fn office_cod_balance(
        &self,
        actor: &Actor,
        office_id: Uuid,
    ) -> Result<CodBalance, ServiceError> {
        if !actor.role.spans_offices() && actor.office_id != Some(office_id) {
            return Err(ServiceError::Forbidden(format!(
                "cannot view the balance of office {}",
                office_id
            )));
        }
        let db = &*self.db_pool;

        let collections = ShippingCollectionEntity::find()
            .filter(shipping_collection::Column::OfficeId.eq(office_id))
            .all(db)
            .await?;
        let submissions = PaymentSubmissionEntity::find()
            .filter(payment_submission::Column::OfficeId.eq(office_id))
            .all(db)
            .await?;

        let collected: Decimal = collections.iter().map(|c| c.amount_collected).sum();
        let outstanding: Decimal = collections
            .iter()
            .filter(|c| c.payment_submission_id.is_none())
            .map(|c| c.amount_collected)
            .sum();
        let submitted: Decimal = submissions
            .iter()
            .filter(|s| s.status != SubmissionStatus::Rejected)
            .map(|s| s.total_amount_submitted)
            .sum();
        let pending: Decimal = submissions
            .iter()
            .filter(|s| s.status == SubmissionStatus::Pending)
            .map(|s| s.total_amount_submitted)
            .sum();
        let reconciled: Decimal = submissions
            .iter()
            .filter(|s| s.status.posts_revenue())
            .map(|s| s.accepted_amount())
            .sum();

        Ok(CodBalance {
            office_id,
            collected,
            submitted,
            pending,
            reconciled,
            outstanding,
        })
    }
}
