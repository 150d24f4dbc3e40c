use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Domain events emitted by the services after successful state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Estimate events
    EstimateCreated(Uuid),
    EstimateUpdated(Uuid),
    EstimateDeleted(Uuid),
    EstimateStatusChanged {
        estimate_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Catalog events
    MaterialAdded {
        material_id: Uuid,
        sku: String,
    },
    MaterialPriceChanged {
        material_id: Uuid,
        old_price: Decimal,
        new_price: Decimal,
    },

    // Billing events
    SubscriptionCreated(Uuid),
    SubscriptionCanceled(Uuid),
    InvoiceRecorded(Uuid),

    // Assistant events
    BlueprintAnalyzed(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
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

/// Drains the event channel, logging each event. Integrations that need to
/// fan events out (webhooks, analytics) hook in here.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        debug!(?event, "processing event");
    }
    info!("Event processor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender
            .send(Event::EstimateCreated(Uuid::new_v4()))
            .await
            .expect("send should succeed");

        assert!(matches!(
            rx.recv().await,
            Some(Event::EstimateCreated(_))
        ));
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender.send(Event::EstimateDeleted(Uuid::new_v4())).await;
        assert!(result.is_err());
    }
}
