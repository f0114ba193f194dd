pub mod extract;
pub mod fees;
pub mod orders;
pub mod payment_submissions;
pub mod shipments;
pub mod transactions;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    fees::FeeService,
    offices::{DbOfficeDirectory, OfficeDirectory},
    order_history::OrderHistoryService,
    orders::OrderService,
    payment_submissions::PaymentSubmissionService,
    shipments::ShipmentService,
    transactions::TransactionLedger,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub fees: Arc<FeeService>,
    pub orders: Arc<OrderService>,
    pub history: Arc<OrderHistoryService>,
    pub shipments: Arc<ShipmentService>,
    pub submissions: Arc<PaymentSubmissionService>,
    pub ledger: Arc<TransactionLedger>,
}

impl AppServices {
    /// Wires every service onto one pool and event channel.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        config: &AppConfig,
    ) -> Self {
        let offices: Arc<dyn OfficeDirectory> = Arc::new(DbOfficeDirectory::new(db_pool.clone()));
        Self::with_office_directory(db_pool, event_sender, config, offices)
    }

    /// Same as [`AppServices::new`] with a caller-supplied office directory.
    pub fn with_office_directory(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        config: &AppConfig,
        offices: Arc<dyn OfficeDirectory>,
    ) -> Self {
        Self {
            fees: Arc::new(FeeService::new(
                db_pool.clone(),
                config.promotion_page_size,
                config.promotion_max_page_size,
            )),
            orders: Arc::new(OrderService::new(
                db_pool.clone(),
                offices,
                event_sender.clone(),
            )),
            history: Arc::new(OrderHistoryService::new(db_pool.clone())),
            shipments: Arc::new(ShipmentService::new(db_pool.clone(), event_sender.clone())),
            submissions: Arc::new(PaymentSubmissionService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            ledger: Arc::new(TransactionLedger::new(db_pool, event_sender)),
        }
    }
}
