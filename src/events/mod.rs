use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::entities::order::OrderStatus;
use crate::entities::payment_submission::SubmissionStatus;
use crate::entities::shipment::ShipmentStatus;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends after a commit; a closed channel only costs the notification.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("{}", e);
        }
    }
}

/// Facts published after the owning database transaction commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: Uuid,
        tracking_number: String,
        status: OrderStatus,
    },
    OrderStatusChanged {
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        shipment_id: Option<Uuid>,
    },
    ShipmentCreated {
        shipment_id: Uuid,
        driver_id: Uuid,
        order_count: usize,
    },
    ShipmentStarted {
        shipment_id: Uuid,
        started_at: DateTime<Utc>,
    },
    ShipmentFinished {
        shipment_id: Uuid,
        status: ShipmentStatus,
        finished_at: DateTime<Utc>,
    },
    PaymentSubmitted {
        submission_id: Uuid,
        office_id: Uuid,
        total_amount_submitted: Decimal,
        discrepancy: Decimal,
    },
    SubmissionReconciled {
        submission_id: Uuid,
        status: SubmissionStatus,
    },
    LedgerEntryPosted {
        transaction_id: Uuid,
        amount: Decimal,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::OrderCreated { .. } => "order_created",
            Event::OrderStatusChanged { .. } => "order_status_changed",
            Event::ShipmentCreated { .. } => "shipment_created",
            Event::ShipmentStarted { .. } => "shipment_started",
            Event::ShipmentFinished { .. } => "shipment_finished",
            Event::PaymentSubmitted { .. } => "payment_submitted",
            Event::SubmissionReconciled { .. } => "submission_reconciled",
            Event::LedgerEntryPosted { .. } => "ledger_entry_posted",
        }
    }
}

/// Drains the channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::PaymentSubmitted {
                submission_id,
                discrepancy,
                ..
            } if !discrepancy.is_zero() => {
                warn!(
                    submission_id = %submission_id,
                    discrepancy = %discrepancy,
                    "payment submission does not match collected COD"
                );
            }
            _ => {}
        }

        match serde_json::to_string(&event) {
            Ok(payload) => info!(event = event.name(), %payload, "domain event"),
            Err(e) => debug!(event = event.name(), error = %e, "event not serializable"),
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sender_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let event = Event::ShipmentStarted {
            shipment_id: Uuid::new_v4(),
            started_at: Utc::now(),
        };
        sender.send(event.clone()).await.unwrap();
        assert_eq!(rx.recv().await, Some(event));
    }

    #[tokio::test]
    async fn send_to_closed_channel_is_an_error() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        let result = sender
            .send(Event::LedgerEntryPosted {
                transaction_id: Uuid::new_v4(),
                amount: Decimal::ONE,
            })
            .await;
        assert!(result.is_err());
    }
}
