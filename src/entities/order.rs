use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle of a parcel.
///
/// ```text
/// draft -> pending -> confirmed -> picked_up -> in_transit -> arrived_at_office -> delivered
///   \         \           \            \            \
///    +---------+-----------+-> cancelled +-----------+-> returned
/// ```
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
pub enum OrderStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "picked_up")]
    PickedUp,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "arrived_at_office")]
    ArrivedAtOffice,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "returned")]
    Returned,
}

/// Rejected edge of the order status graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot move order from {from} to {to}")]
pub struct InvalidTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl From<InvalidTransition> for crate::errors::ServiceError {
    fn from(err: InvalidTransition) -> Self {
        crate::errors::ServiceError::InvalidState(err.to_string())
    }
}

impl OrderStatus {
    /// The edges of the lifecycle graph.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match self {
            Draft => matches!(next, Pending | Cancelled),
            Pending => matches!(next, Confirmed | Cancelled),
            Confirmed => matches!(next, PickedUp | Cancelled),
            PickedUp => matches!(next, InTransit | Returned),
            InTransit => matches!(next, ArrivedAtOffice | Returned),
            ArrivedAtOffice => matches!(next, Delivered),
            Delivered | Cancelled | Returned => false,
        }
    }

    pub fn transition_to(self, next: OrderStatus) -> Result<OrderStatus, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Returned
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::PickedUp => "picked_up",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::ArrivedAtOffice => "arrived_at_office",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel an order is created through; decides its initial status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderChannel {
    /// Customer or shop checkout; starts as a draft.
    Checkout,
    /// Entered by office staff; starts pending.
    BackOffice,
}

impl OrderChannel {
    pub fn initial_status(self) -> OrderStatus {
        match self {
            OrderChannel::Checkout => OrderStatus::Draft,
            OrderChannel::BackOffice => OrderStatus::Pending,
        }
    }
}

/// Who pays the shipping fee.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum Payer {
    #[sea_orm(string_value = "customer")]
    Customer,
    #[sea_orm(string_value = "shop")]
    Shop,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "bank_transfer")]
    BankTransfer,
    #[sea_orm(string_value = "wallet")]
    Wallet,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "unpaid")]
    Unpaid,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub tracking_number: String,

    pub sender_name: String,
    pub sender_phone: String,
    pub sender_city: String,
    pub sender_ward: Option<String>,
    pub sender_address: String,

    pub recipient_name: String,
    pub recipient_phone: String,
    pub recipient_city: String,
    pub recipient_ward: Option<String>,
    pub recipient_address: String,

    pub weight: Decimal,
    pub service_type_id: Uuid,
    pub shipping_fee: Decimal,
    pub discount_amount: Decimal,
    pub promotion_id: Option<Uuid>,
    /// Fixed once the order leaves `draft`.
    pub cod_amount: Decimal,
    pub payer: Payer,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,

    pub status: OrderStatus,
    pub origin_office_id: Option<Uuid>,
    pub destination_office_id: Uuid,
    pub created_by: Uuid,
    pub actual_recipient: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

impl Model {
    /// Shipping fee after the promotion discount, never negative.
    pub fn payable_fee(&self) -> Decimal {
        (self.shipping_fee - self.discount_amount).max(Decimal::ZERO)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_history::Entity")]
    Histories,
    #[sea_orm(has_many = "super::shipment_order::Entity")]
    ShipmentLinks,
    #[sea_orm(has_one = "super::shipping_collection::Entity")]
    Collection,
}

impl Related<super::order_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Histories.def()
    }
}

impl Related<super::shipment_order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShipmentLinks.def()
    }
}

impl Related<super::shipping_collection::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Collection.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use sea_orm::Iterable;

    #[rstest]
    #[case(OrderStatus::Draft, OrderStatus::Pending)]
    #[case(OrderStatus::Draft, OrderStatus::Cancelled)]
    #[case(OrderStatus::Pending, OrderStatus::Confirmed)]
    #[case(OrderStatus::Pending, OrderStatus::Cancelled)]
    #[case(OrderStatus::Confirmed, OrderStatus::PickedUp)]
    #[case(OrderStatus::Confirmed, OrderStatus::Cancelled)]
    #[case(OrderStatus::PickedUp, OrderStatus::InTransit)]
    #[case(OrderStatus::PickedUp, OrderStatus::Returned)]
    #[case(OrderStatus::InTransit, OrderStatus::ArrivedAtOffice)]
    #[case(OrderStatus::InTransit, OrderStatus::Returned)]
    #[case(OrderStatus::ArrivedAtOffice, OrderStatus::Delivered)]
    fn allowed_edges(#[case] from: OrderStatus, #[case] to: OrderStatus) {
        assert!(from.can_transition_to(to));
        assert_eq!(from.transition_to(to), Ok(to));
    }

    #[rstest]
    #[case(OrderStatus::Draft, OrderStatus::Confirmed)]
    #[case(OrderStatus::Pending, OrderStatus::PickedUp)]
    #[case(OrderStatus::Confirmed, OrderStatus::Delivered)]
    #[case(OrderStatus::PickedUp, OrderStatus::Cancelled)]
    #[case(OrderStatus::InTransit, OrderStatus::Delivered)]
    #[case(OrderStatus::ArrivedAtOffice, OrderStatus::Returned)]
    #[case(OrderStatus::Delivered, OrderStatus::Returned)]
    #[case(OrderStatus::Cancelled, OrderStatus::Pending)]
    #[case(OrderStatus::Returned, OrderStatus::InTransit)]
    fn rejected_edges(#[case] from: OrderStatus, #[case] to: OrderStatus) {
        assert_eq!(
            from.transition_to(to),
            Err(InvalidTransition { from, to })
        );
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        for from in OrderStatus::iter().filter(|s| s.is_terminal()) {
            assert!(OrderStatus::iter().all(|to| !from.can_transition_to(to)));
        }
    }

    #[test]
    fn no_self_loops() {
        for status in OrderStatus::iter() {
            assert!(!status.can_transition_to(status));
        }
    }

    /// Every path into `delivered` passes through `confirmed`.
    #[test]
    fn delivered_is_unreachable_without_confirmed() {
        let mut reachable = vec![OrderStatus::Draft, OrderStatus::Pending];
        let mut frontier = reachable.clone();
        while let Some(from) = frontier.pop() {
            for to in OrderStatus::iter() {
                if to != OrderStatus::Confirmed
                    && from.can_transition_to(to)
                    && !reachable.contains(&to)
                {
                    reachable.push(to);
                    frontier.push(to);
                }
            }
        }
        assert!(!reachable.contains(&OrderStatus::Delivered));
    }

    #[test]
    fn channel_decides_initial_status() {
        assert_eq!(OrderChannel::Checkout.initial_status(), OrderStatus::Draft);
        assert_eq!(
            OrderChannel::BackOffice.initial_status(),
            OrderStatus::Pending
        );
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::ArrivedAtOffice).unwrap(),
            "\"arrived_at_office\""
        );
        assert_eq!(OrderStatus::PickedUp.to_string(), "picked_up");
    }
}
