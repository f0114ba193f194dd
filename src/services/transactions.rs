use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::auth::Actor;
use crate::db::DbPool;
use crate::entities::transaction::{
    self, Entity as TransactionEntity, TransactionKind, TransactionPurpose, TransactionStatus,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::metrics::LEDGER_ENTRIES;
use crate::services::{page_window, positive_decimal};

const MAX_PAGE_SIZE: u64 = 100;

/// Entry to post in the finance ledger
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub kind: TransactionKind,
    pub purpose: TransactionPurpose,
    pub amount: Decimal,
    pub order_id: Option<Uuid>,
    pub office_id: Option<Uuid>,
    pub payment_submission_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_by: Uuid,
}

/// Inserts a `pending` ledger entry on `conn`, usually the caller's open transaction.
pub(crate) async fn post<C: ConnectionTrait>(
    conn: &C,
    entry: NewLedgerEntry,
) -> Result<transaction::Model, ServiceError> {
    if entry.amount <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "ledger amount must be greater than zero".to_string(),
        ));
    }

    let model = transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        kind: Set(entry.kind),
        purpose: Set(entry.purpose),
        amount: Set(entry.amount),
        order_id: Set(entry.order_id),
        office_id: Set(entry.office_id),
        payment_submission_id: Set(entry.payment_submission_id),
        status: Set(TransactionStatus::Pending),
        description: Set(entry.description),
        created_by: Set(entry.created_by),
        resolved_by: Set(None),
        resolved_at: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to post ledger entry");
        ServiceError::DatabaseError(e)
    })?;

    LEDGER_ENTRIES.inc();
    info!(
        transaction_id = %model.id,
        purpose = %model.purpose,
        amount = %model.amount,
        "Ledger entry posted"
    );
    Ok(model)
}

/// Manual ledger entry posted by finance
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RecordLedgerEntryRequest {
    pub kind: TransactionKind,
    /// `revenue_transfer` is reserved for submission reconciliation
    pub purpose: TransactionPurpose,
    #[validate(custom = "positive_decimal")]
    pub amount: Decimal,
    pub order_id: Option<Uuid>,
    pub office_id: Option<Uuid>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ListLedgerQuery {
    pub office_id: Option<Uuid>,
    pub status: Option<TransactionStatus>,
    pub purpose: Option<TransactionPurpose>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Finance ledger
#[derive(Clone)]
pub struct TransactionLedger {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl TransactionLedger {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Posts a stand-alone `pending` entry (refunds, expenses, service income).
    #[instrument(skip(self, request), fields(actor_id = %actor.user_id, purpose = ?request.purpose))]
    pub async fn record(
        &self,
        actor: &Actor,
        request: RecordLedgerEntryRequest,
    ) -> Result<transaction::Model, ServiceError> {
        request.validate()?;
        if request.purpose == TransactionPurpose::RevenueTransfer {
            return Err(ServiceError::ValidationError(
                "revenue transfers are posted by submission reconciliation".to_string(),
            ));
        }
        let entry = NewLedgerEntry {
            kind: request.kind,
            purpose: request.purpose,
            amount: request.amount,
            order_id: request.order_id,
            office_id: request.office_id,
            payment_submission_id: None,
            description: request.description,
            created_by: actor.user_id,
        };
        let model = post(&*self.db_pool, entry).await?;
        if let Some(event_sender) = &self.event_sender {
            event_sender
                .send_or_log(Event::LedgerEntryPosted {
                    transaction_id: model.id,
                    amount: model.amount,
                })
                .await;
        }
        Ok(model)
    }

    /// Entries newest first. Office-bound staff only see their own office.
    #[instrument(skip(self, query))]
    pub async fn list(
        &self,
        actor: &Actor,
        query: ListLedgerQuery,
    ) -> Result<(Vec<transaction::Model>, u64, u64, u64), ServiceError> {
        let (page, per_page) = page_window(query.page, query.per_page, MAX_PAGE_SIZE);
        let office_id = if actor.role.spans_offices() {
            query.office_id
        } else {
            Some(actor.require_office()?)
        };

        let mut select = TransactionEntity::find();
        if let Some(office_id) = office_id {
            select = select.filter(transaction::Column::OfficeId.eq(office_id));
        }
        if let Some(status) = query.status {
            select = select.filter(transaction::Column::Status.eq(status));
        }
        if let Some(purpose) = query.purpose {
            select = select.filter(transaction::Column::Purpose.eq(purpose));
        }

        let paginator = select
            .order_by_desc(transaction::Column::CreatedAt)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await.map_err(|e| {
            error!(error = %e, "Failed to list ledger entries");
            ServiceError::DatabaseError(e)
        })?;
        Ok((items, total, page, per_page))
    }

    #[instrument(skip(self), fields(transaction_id = %id))]
    pub async fn confirm(
        &self,
        actor: &Actor,
        id: Uuid,
    ) -> Result<transaction::Model, ServiceError> {
        self.resolve(actor, id, TransactionStatus::Confirmed).await
    }

    #[instrument(skip(self), fields(transaction_id = %id))]
    pub async fn reject(&self, actor: &Actor, id: Uuid) -> Result<transaction::Model, ServiceError> {
        self.resolve(actor, id, TransactionStatus::Rejected).await
    }

    async fn resolve(
        &self,
        actor: &Actor,
        id: Uuid,
        status: TransactionStatus,
    ) -> Result<transaction::Model, ServiceError> {
        let db = &*self.db_pool;
        let entry = TransactionEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("transaction {} not found", id)))?;
        if entry.status != TransactionStatus::Pending {
            return Err(ServiceError::InvalidState(format!(
                "transaction {} is already {}",
                id, entry.status
            )));
        }

        let now = Utc::now();
        let result = TransactionEntity::update_many()
            .set(transaction::ActiveModel {
                status: Set(status),
                resolved_by: Set(Some(actor.user_id)),
                resolved_at: Set(Some(now)),
                ..Default::default()
            })
            .filter(transaction::Column::Id.eq(id))
            .filter(transaction::Column::Status.eq(TransactionStatus::Pending))
            .exec(db)
            .await?;
        if result.rows_affected != 1 {
            return Err(ServiceError::ConcurrentModification(id));
        }

        info!(transaction_id = %id, status = %status, "Ledger entry resolved");
        Ok(transaction::Model {
            status,
            resolved_by: Some(actor.user_id),
            resolved_at: Some(now),
            ..entry
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ActorRole;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    async fn ledger() -> TransactionLedger {
        let db = establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .unwrap();
        run_migrations(&db).await.unwrap();
        TransactionLedger::new(Arc::new(db), None)
    }

    fn entry(amount: Decimal) -> RecordLedgerEntryRequest {
        RecordLedgerEntryRequest {
            kind: TransactionKind::Expense,
            purpose: TransactionPurpose::OfficeExpense,
            amount,
            order_id: None,
            office_id: Some(Uuid::new_v4()),
            description: Some("fuel".into()),
        }
    }

    fn finance() -> Actor {
        Actor::new(Uuid::new_v4(), ActorRole::Finance, None)
    }

    #[tokio::test]
    async fn non_positive_amounts_are_refused() {
        let ledger = ledger().await;
        assert_matches!(
            ledger.record(&finance(), entry(dec!(0))).await,
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            post(&*ledger.db_pool, NewLedgerEntry {
                kind: TransactionKind::Income,
                purpose: TransactionPurpose::RevenueTransfer,
                amount: dec!(-5),
                order_id: None,
                office_id: None,
                payment_submission_id: None,
                description: None,
                created_by: Uuid::new_v4(),
            })
            .await,
            Err(ServiceError::ValidationError(_))
        );
    }

    #[tokio::test]
    async fn revenue_transfers_cannot_be_recorded_by_hand() {
        let ledger = ledger().await;
        let mut transfer = entry(dec!(500000));
        transfer.kind = TransactionKind::Income;
        transfer.purpose = TransactionPurpose::RevenueTransfer;
        assert_matches!(
            ledger.record(&finance(), transfer).await,
            Err(ServiceError::ValidationError(_))
        );

        let actor = finance();
        let refund = ledger
            .record(
                &actor,
                RecordLedgerEntryRequest {
                    purpose: TransactionPurpose::Refund,
                    ..entry(dec!(12000))
                },
            )
            .await
            .unwrap();
        assert_eq!(refund.created_by, actor.user_id);
        assert_eq!(refund.status, TransactionStatus::Pending);
        assert!(refund.payment_submission_id.is_none());
    }

    #[tokio::test]
    async fn pending_entry_resolves_once() {
        let ledger = ledger().await;
        let finance = finance();
        let posted = ledger.record(&finance, entry(dec!(150000))).await.unwrap();
        assert_eq!(posted.status, TransactionStatus::Pending);

        let confirmed = ledger.confirm(&finance, posted.id).await.unwrap();
        assert_eq!(confirmed.status, TransactionStatus::Confirmed);
        assert_eq!(confirmed.resolved_by, Some(finance.user_id));

        assert_matches!(
            ledger.reject(&finance, posted.id).await,
            Err(ServiceError::InvalidState(_))
        );
    }

    #[tokio::test]
    async fn office_staff_see_only_their_office() {
        let ledger = ledger().await;
        let mine = entry(dec!(10));
        let office_id = mine.office_id.unwrap();
        ledger.record(&finance(), mine).await.unwrap();
        ledger.record(&finance(), entry(dec!(20))).await.unwrap();

        let manager = Actor::new(Uuid::new_v4(), ActorRole::OfficeManager, Some(office_id));
        let (items, total, _, _) = ledger
            .list(&manager, ListLedgerQuery::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].amount, dec!(10));

        let (_, total, _, _) = ledger
            .list(&finance(), ListLedgerQuery::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
    }
}
