use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "adjusted")]
    Adjusted,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl SubmissionStatus {
    /// Only a pending submission can be reconciled, and only into a final state.
    pub fn can_transition_to(self, next: SubmissionStatus) -> bool {
        use SubmissionStatus::*;
        match self {
            Pending => matches!(next, Confirmed | Adjusted | Rejected),
            Confirmed | Adjusted | Rejected => false,
        }
    }

    /// Whether reaching this status moves money to finance.
    pub fn posts_revenue(self) -> bool {
        match self {
            SubmissionStatus::Confirmed | SubmissionStatus::Adjusted => true,
            SubmissionStatus::Pending | SubmissionStatus::Rejected => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Confirmed => "confirmed",
            SubmissionStatus::Adjusted => "adjusted",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_submissions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub office_id: Uuid,
    pub submitted_by: Uuid,
    /// JSON array of order ids in this batch.
    pub order_ids: Json,
    pub total_amount_submitted: Decimal,
    /// Sum of `amount_collected` over the batched collections.
    pub expected_amount: Decimal,
    /// `total_amount_submitted - expected_amount`
    pub discrepancy: Decimal,
    /// Amount finance accepted when reconciling as adjusted.
    pub adjusted_amount: Option<Decimal>,
    pub status: SubmissionStatus,
    pub notes: Option<String>,
    pub reconciliation_notes: Option<String>,
    pub reconciled_by: Option<Uuid>,
    pub reconciled_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn order_id_list(&self) -> Vec<Uuid> {
        serde_json::from_value(self.order_ids.clone()).unwrap_or_default()
    }

    /// Amount finance takes over once reconciled.
    pub fn accepted_amount(&self) -> Decimal {
        match self.status {
            SubmissionStatus::Adjusted => {
                self.adjusted_amount.unwrap_or(self.total_amount_submitted)
            }
            _ => self.total_amount_submitted,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;

    #[test]
    fn only_pending_submissions_reconcile() {
        for next in SubmissionStatus::iter() {
            assert_eq!(
                SubmissionStatus::Pending.can_transition_to(next),
                next != SubmissionStatus::Pending
            );
            assert!(!SubmissionStatus::Rejected.can_transition_to(next));
            assert!(!SubmissionStatus::Confirmed.can_transition_to(next));
        }
    }

    #[test]
    fn rejection_posts_nothing() {
        assert!(SubmissionStatus::Confirmed.posts_revenue());
        assert!(SubmissionStatus::Adjusted.posts_revenue());
        assert!(!SubmissionStatus::Rejected.posts_revenue());
    }
}
