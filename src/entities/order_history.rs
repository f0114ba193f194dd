use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::order::OrderStatus;

/// What happened to the order in a history row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    #[sea_orm(string_value = "created")]
    Created,
    #[sea_orm(string_value = "submitted")]
    Submitted,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "picked_up")]
    PickedUp,
    #[sea_orm(string_value = "shipping")]
    Shipping,
    #[sea_orm(string_value = "imported")]
    Imported,
    #[sea_orm(string_value = "returned")]
    Returned,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl HistoryAction {
    /// The action recorded when an order lands in `status`.
    pub fn for_status(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Draft => HistoryAction::Created,
            OrderStatus::Pending => HistoryAction::Submitted,
            OrderStatus::Confirmed => HistoryAction::Confirmed,
            OrderStatus::PickedUp => HistoryAction::PickedUp,
            OrderStatus::InTransit => HistoryAction::Shipping,
            OrderStatus::ArrivedAtOffice => HistoryAction::Imported,
            OrderStatus::Delivered => HistoryAction::Delivered,
            OrderStatus::Cancelled => HistoryAction::Cancelled,
            OrderStatus::Returned => HistoryAction::Returned,
        }
    }
}

/// Append-only audit row. Never updated or deleted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_histories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub from_office_id: Option<Uuid>,
    pub to_office_id: Option<Uuid>,
    pub shipment_id: Option<Uuid>,
    pub action: HistoryAction,
    pub from_status: Option<OrderStatus>,
    pub to_status: OrderStatus,
    pub actor_id: Option<Uuid>,
    pub note: Option<String>,
    pub action_time: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipment_cascades_use_dispatch_actions() {
        assert_eq!(
            HistoryAction::for_status(OrderStatus::InTransit),
            HistoryAction::Shipping
        );
        assert_eq!(
            HistoryAction::for_status(OrderStatus::ArrivedAtOffice),
            HistoryAction::Imported
        );
        assert_eq!(
            HistoryAction::for_status(OrderStatus::Returned),
            HistoryAction::Returned
        );
    }
}
