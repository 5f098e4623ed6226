//! Structured logging of presentation-thread domain events.

use tokio::sync::broadcast::{self, error::RecvError};

use snaptext_core::events::DomainEvent;

/// Log every event until the presentation thread stops. Returns how many
/// events were logged.
pub async fn run_event_log(mut events: broadcast::Receiver<DomainEvent>) -> usize {
    let mut logged = 0;
    loop {
        match events.recv().await {
            Ok(event) => {
                tracing::info!(
                    kind = event.kind(),
                    invocation = ?event.invocation(),
                    "Domain event"
                );
                logged += 1;
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event log fell behind, events skipped");
            }
            Err(RecvError::Closed) => break,
        }
    }
    tracing::debug!(logged, "Event log finished");
    logged
}
