use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted after successful writes. The background consumer
/// turns them into structured audit log lines; delivery is best-effort and
/// carries no ordering or durability guarantees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Customer events
    CustomerCreated(Uuid),
    CustomerUpdated(Uuid),
    CustomerDeleted(Uuid),
    CustomerGroupCreated(Uuid),

    // Quotation events
    QuotationCreated(Uuid),
    QuotationUpdated(Uuid),
    QuotationStatusChanged {
        quotation_id: Uuid,
        old_status: String,
        new_status: String,
    },
    QuotationConverted {
        quotation_id: Uuid,
        order_id: Uuid,
    },

    // Order events
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Return events
    ReturnCreated(Uuid),
    ReturnApproved(Uuid),
    ReturnRejected(Uuid),
    ReturnCompleted {
        return_id: Uuid,
        refund_amount: rust_decimal::Decimal,
    },

    // Invoice events
    InvoiceIssued(Uuid),
    InvoicePaymentRecorded {
        invoice_id: Uuid,
        payment_id: Uuid,
        amount: rust_decimal::Decimal,
    },
    InvoiceVoided(Uuid),

    // Staff events
    StaffCreated(Uuid),
    ProjectAssigned {
        staff_id: Uuid,
        project_id: Uuid,
    },

    // Session events
    SignInLinkIssued {
        user_id: Uuid,
    },
    SessionIssued {
        user_id: Uuid,
    },
}

impl Event {
    /// Short machine-readable name used in audit log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::CustomerCreated(_) => "customer.created",
            Event::CustomerUpdated(_) => "customer.updated",
            Event::CustomerDeleted(_) => "customer.deleted",
            Event::CustomerGroupCreated(_) => "customer_group.created",
            Event::QuotationCreated(_) => "quotation.created",
            Event::QuotationUpdated(_) => "quotation.updated",
            Event::QuotationStatusChanged { .. } => "quotation.status_changed",
            Event::QuotationConverted { .. } => "quotation.converted",
            Event::OrderCreated(_) => "order.created",
            Event::OrderStatusChanged { .. } => "order.status_changed",
            Event::ReturnCreated(_) => "return.created",
            Event::ReturnApproved(_) => "return.approved",
            Event::ReturnRejected(_) => "return.rejected",
            Event::ReturnCompleted { .. } => "return.completed",
            Event::InvoiceIssued(_) => "invoice.issued",
            Event::InvoicePaymentRecorded { .. } => "invoice.payment_recorded",
            Event::InvoiceVoided(_) => "invoice.voided",
            Event::StaffCreated(_) => "staff.created",
            Event::ProjectAssigned { .. } => "project.assigned",
            Event::SignInLinkIssued { .. } => "session.link_issued",
            Event::SessionIssued { .. } => "session.issued",
        }
    }
}

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
}

/// Drains the event channel, writing one audit line per event. Runs until
/// every sender is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match serde_json::to_string(&event) {
            Ok(payload) => info!(kind = event.kind(), payload = %payload, "domain event"),
            Err(e) => warn!(kind = event.kind(), error = %e, "failed to serialize event"),
        }
    }
    info!("Event channel closed; audit consumer exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_the_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        let id = Uuid::new_v4();
        sender.send(Event::CustomerCreated(id)).await.unwrap();

        match rx.recv().await {
            Some(Event::CustomerCreated(received)) => assert_eq!(received, id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        assert!(sender.send(Event::CustomerDeleted(Uuid::new_v4())).await.is_err());
    }

    #[test]
    fn kinds_are_stable_identifiers() {
        assert_eq!(Event::ReturnCreated(Uuid::new_v4()).kind(), "return.created");
        assert_eq!(
            Event::QuotationConverted {
                quotation_id: Uuid::new_v4(),
                order_id: Uuid::new_v4(),
            }
            .kind(),
            "quotation.converted"
        );
    }
}
