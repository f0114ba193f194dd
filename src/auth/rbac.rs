/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Roles carried in the bearer token and the actions each role may perform.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Role of the calling principal, as asserted by the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Customer,
    Shop,
    Operator,
    Driver,
    DeliveryAgent,
    OfficeManager,
    Finance,
    Admin,
}

/// Operations exposed by the API, used to gate route groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    QuoteFee,
    ViewPromotions,
    CreateOrder,
    ManageDraft,
    ConfirmOrder,
    CancelOrder,
    ViewOrders,
    DeliverOrder,
    DispatchShipment,
    ViewShipments,
    SubmitCod,
    ViewSubmissions,
    ReconcileSubmission,
    ViewLedger,
    RecordLedgerEntry,
    ResolveLedgerEntry,
}

impl ActorRole {
    pub fn permits(self, action: Action) -> bool {
        use Action::*;
        match self {
            ActorRole::Admin => true,
            ActorRole::Customer | ActorRole::Shop => matches!(
                action,
                QuoteFee | ViewPromotions | CreateOrder | ManageDraft | CancelOrder | ViewOrders
            ),
            ActorRole::Operator => matches!(
                action,
                QuoteFee
                    | ViewPromotions
                    | CreateOrder
                    | ManageDraft
                    | ConfirmOrder
                    | CancelOrder
                    | ViewOrders
                    | ViewShipments
            ),
            ActorRole::Driver => matches!(action, DispatchShipment | ViewShipments | ViewOrders),
            ActorRole::DeliveryAgent => {
                matches!(action, DeliverOrder | SubmitCod | ViewOrders | ViewSubmissions)
            }
            ActorRole::OfficeManager => matches!(
                action,
                QuoteFee
                    | ViewPromotions
                    | CreateOrder
                    | ManageDraft
                    | ConfirmOrder
                    | CancelOrder
                    | ViewOrders
                    | ViewShipments
                    | ViewSubmissions
                    | ReconcileSubmission
                    | ViewLedger
            ),
            ActorRole::Finance => matches!(
                action,
                ViewOrders
                    | ViewSubmissions
                    | ReconcileSubmission
                    | ViewLedger
                    | RecordLedgerEntry
                    | ResolveLedgerEntry
            ),
        }
    }

    /// Staff who handle orders on behalf of senders.
    pub fn is_back_office(self) -> bool {
        matches!(
            self,
            ActorRole::Operator | ActorRole::OfficeManager | ActorRole::Admin
        )
    }

    /// Roles whose authority is not limited to their own office.
    pub fn spans_offices(self) -> bool {
        matches!(self, ActorRole::Finance | ActorRole::Admin)
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActorRole::Customer => "customer",
            ActorRole::Shop => "shop",
            ActorRole::Operator => "operator",
            ActorRole::Driver => "driver",
            ActorRole::DeliveryAgent => "delivery_agent",
            ActorRole::OfficeManager => "office_manager",
            ActorRole::Finance => "finance",
            ActorRole::Admin => "admin",
        };
        f.write_str(name)
    }
}
